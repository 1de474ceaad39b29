//! `mosaic extract`: resolve platforms and identities, then run the orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use mosaic_core::{
    build_targets, estimate_duration, load_credentials, parse_platform_selection, AppConfig,
    IdentityInput, PlatformId,
};
use mosaic_extract::{
    CandidatePicker, ClientSettings, ConsoleReporter, DefaultClientFactory, FixedPicker,
    Orchestrator, PromptPicker, Reporter, ResultsStore, SuccessClass,
};

use crate::prompt;

#[derive(Debug, Default)]
pub(crate) struct ExtractArgs {
    pub pattern: Option<String>,
    pub platforms: Option<String>,
    pub select: Option<String>,
    pub results_dir: Option<PathBuf>,
}

/// Interactive platform answer: empty means all; anything unparseable also
/// means all, flagged so the caller can warn.
pub(crate) fn platforms_from_answer(answer: &str) -> (Vec<PlatformId>, bool) {
    if answer.trim().is_empty() {
        return (PlatformId::ALL.to_vec(), false);
    }
    match parse_platform_selection(answer) {
        Ok(platforms) => (platforms, false),
        Err(_) => (PlatformId::ALL.to_vec(), true),
    }
}

pub(crate) fn print_platforms() {
    println!("{}", style("Supported platforms").cyan().bold());
    for platform in PlatformId::ALL {
        println!(
            "  {}. {} {:<14} ~{}s",
            platform.number(),
            platform.icon(),
            platform.name(),
            platform.typical_duration().as_secs()
        );
    }
}

async fn ask_platforms(reporter: &dyn Reporter) -> anyhow::Result<Vec<PlatformId>> {
    print_platforms();
    let answer = prompt::text(
        "Platforms (numbers or names, comma separated; empty = all)",
        true,
    )
    .await?;
    let (platforms, fell_back) = platforms_from_answer(&answer);
    if fell_back {
        reporter.warning("Invalid platform selection, using all platforms");
    }
    Ok(platforms)
}

async fn ask_identities(platforms: &[PlatformId]) -> anyhow::Result<IdentityInput> {
    if platforms.len() == 1 || prompt::confirm("Use the same username on every platform?", true).await? {
        return Ok(IdentityInput::Same(prompt::text("Username / pattern", false).await?));
    }

    let mut map = HashMap::new();
    for &platform in platforms {
        let identity = prompt::text(
            &format!("{} {} username", platform.icon(), platform.name()),
            false,
        )
        .await?;
        map.insert(platform, identity);
    }
    Ok(IdentityInput::PerPlatform(map))
}

pub(crate) async fn run_extract(config: &AppConfig, args: ExtractArgs) -> anyhow::Result<()> {
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new());

    let mut credentials = load_credentials(&config.credentials_path)?;
    credentials.apply_env_overrides(|key| std::env::var(key))?;

    let platforms = match args.platforms.as_deref() {
        Some(raw) => parse_platform_selection(raw)?,
        None => ask_platforms(reporter.as_ref()).await?,
    };
    let identities = match args.pattern {
        Some(pattern) => IdentityInput::Same(pattern),
        None => ask_identities(&platforms).await?,
    };
    let targets = build_targets(&platforms, &identities)?;

    let estimate = estimate_duration(&platforms);
    reporter.info(&format!(
        "{} platform(s) selected, estimated time ~{}s",
        platforms.len(),
        estimate.as_secs()
    ));

    let picker: Arc<dyn CandidatePicker> = match args.select {
        Some(selection) => Arc::new(FixedPicker(selection)),
        None => Arc::new(PromptPicker),
    };
    let factory = DefaultClientFactory::new(
        credentials,
        ClientSettings::from_config(config),
        Arc::clone(&reporter),
        picker,
    );
    let results_dir = args
        .results_dir
        .unwrap_or_else(|| config.results_dir.clone());
    let store = ResultsStore::new(results_dir, config.staging_dir.clone());
    let orchestrator = Orchestrator::new(
        Box::new(factory),
        store,
        Arc::clone(&reporter),
        config.platform_cooldown(),
    );

    let summary = orchestrator.run(&targets).await;
    summary.report(reporter.as_ref());

    if summary.classification() == SuccessClass::None {
        anyhow::bail!("no platform produced a result");
    }
    Ok(())
}
