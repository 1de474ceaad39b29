//! Thin wrappers over `dialoguer` prompts.
//!
//! Each prompt blocks on stdin, so it runs on the blocking pool and the
//! caller stays interruptible.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

async fn blocking<T, F>(ask: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(ask).await??)
}

pub(crate) async fn text(label: &str, allow_empty: bool) -> anyhow::Result<String> {
    let label = label.to_string();
    let answer: String = blocking(move || {
        Input::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .allow_empty(allow_empty)
            .interact_text()
    })
    .await?;
    Ok(answer.trim().to_string())
}

pub(crate) async fn confirm(label: &str, default: bool) -> anyhow::Result<bool> {
    let label = label.to_string();
    blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .default(default)
            .interact()
    })
    .await
}

/// `None` when the user picks the trailing "Exit" entry or presses Esc.
pub(crate) async fn choose(title: &str, items: &[String]) -> anyhow::Result<Option<usize>> {
    let title = title.to_string();
    let count = items.len();
    let mut labels = items.to_vec();
    labels.push("Exit".to_string());
    let picked = blocking(move || {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(title)
            .items(&labels)
            .default(0)
            .interact_opt()
    })
    .await?;
    Ok(picked.filter(|&i| i < count))
}
