//! `mosaic analyze`: run a prompt template over one extracted document.

use console::style;
use mosaic_analysis::{categorize_models, size_hint, AnalysisWorkspace, OllamaClient, ReportMetadata};
use mosaic_core::AppConfig;

use crate::prompt;

const PREVIEW_CHARS: usize = 300;
const PREVIEW_LINES: usize = 10;

#[derive(Debug, Default)]
pub(crate) struct AnalyzeArgs {
    pub prompt: Option<String>,
    pub data: Option<String>,
    pub model: Option<String>,
}

async fn pick(title: &str, options: Vec<String>, empty_hint: &str) -> anyhow::Result<String> {
    if options.is_empty() {
        anyhow::bail!("{empty_hint}");
    }
    match prompt::choose(title, &options).await? {
        Some(i) => Ok(options[i].clone()),
        None => anyhow::bail!("cancelled"),
    }
}

/// Installed models grouped by category, or the configured default when
/// Ollama lists nothing and the user accepts it.
async fn pick_model(ollama: &OllamaClient, default: &str) -> anyhow::Result<String> {
    let models = match ollama.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!(error = %e, "could not list ollama models");
            Vec::new()
        }
    };

    if models.is_empty() {
        println!("{}", style("No Ollama models found. Start `ollama serve` and `ollama pull qwen:0.5b`.").yellow());
        if prompt::confirm(&format!("Use default ({default}) anyway?"), false).await? {
            return Ok(default.to_string());
        }
        anyhow::bail!("no model selected");
    }

    let catalog = categorize_models(&models);
    for (category, names) in catalog.groups() {
        println!("{}", style(category.label()).bold());
        for name in names {
            println!("    {name:<30} {}", size_hint(name));
        }
    }
    let ordered: Vec<String> = catalog.ordered().into_iter().map(str::to_owned).collect();
    pick("Select LLM model", ordered, "no model available").await
}

fn preview(data: &str) -> String {
    let head: String = data.chars().take(PREVIEW_CHARS).collect();
    let head = if head.len() < data.len() {
        format!("{head}...")
    } else {
        head
    };
    head.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n")
}

pub(crate) async fn run_analyze(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let workspace = AnalysisWorkspace::new(&config.prompts_dir, &config.results_dir);
    let interactive = args.prompt.is_none() || args.data.is_none();

    let prompt_name = match args.prompt {
        Some(name) => name,
        None => pick(
            "Select analysis prompt",
            workspace.list_prompts()?,
            &format!("no prompts found in {}", config.prompts_dir.display()),
        )
        .await?,
    };
    let data_file = match args.data {
        Some(name) => name,
        None => pick(
            "Select data file",
            workspace.list_data_files()?,
            "no result files found; run `mosaic extract` first",
        )
        .await?,
    };

    let client = OllamaClient::new(&config.ollama_url, &config.ollama_model)?;
    let model = match args.model {
        Some(model) => model,
        None if interactive => pick_model(&client, &config.ollama_model).await?,
        None => config.ollama_model.clone(),
    };
    let client = OllamaClient::new(&config.ollama_url, &model)?;

    let template = workspace.read_prompt(&prompt_name)?;
    println!("{} Prompt loaded ({} characters)", style("✓").green(), template.len());
    let data = workspace.read_data(&data_file)?;
    println!("{} Data loaded ({} characters)", style("✓").green(), data.len());
    println!("{}", style(preview(&data)).dim());

    if !client.is_available().await {
        println!(
            "{}",
            style(format!("Ollama does not answer at {}", config.ollama_url)).yellow()
        );
    }

    println!("{} Running {model}...", style("→").cyan());
    let answer = client.analyze(&template, &data).await;
    println!("\n{answer}\n");

    let path = workspace.save_report(
        &answer,
        &ReportMetadata {
            prompt: &prompt_name,
            data_file: &data_file,
            model: client.model(),
        },
    )?;
    println!("{} Analysis saved: {}", style("✓").green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_bounded() {
        let data = "x\n".repeat(400);
        let shown = preview(&data);
        assert!(shown.lines().count() <= PREVIEW_LINES);
        assert_eq!(preview("{}"), "{}");
    }
}
