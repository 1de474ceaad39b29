//! Runs the selected platforms one after another and aggregates outcomes.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use mosaic_core::{ExtractionTarget, PlatformId};

use crate::error::ExtractError;
use crate::persist::ResultsStore;
use crate::reporter::Reporter;
use crate::resolver::ClientFactory;

/// Final record for one platform.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub platform: PlatformId,
    pub identity: String,
    pub success: bool,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessClass {
    None,
    Partial,
    All,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub duration: Duration,
    /// One entry per platform, in the order platforms first ran.
    pub outcomes: Vec<ExtractionOutcome>,
}

impl RunSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    #[must_use]
    pub fn classification(&self) -> SuccessClass {
        match self.succeeded() {
            0 => SuccessClass::None,
            n if n == self.outcomes.len() => SuccessClass::All,
            _ => SuccessClass::Partial,
        }
    }

    /// Emit the end-of-run summary through `reporter`.
    pub fn report(&self, reporter: &dyn Reporter) {
        reporter.header("EXTRACTION SUMMARY");
        reporter.info(&format!(
            "Total time: {:.1}s",
            self.duration.as_secs_f64()
        ));
        for outcome in &self.outcomes {
            let label = format!("{} {}", outcome.platform.icon(), outcome.platform);
            match (&outcome.path, &outcome.error) {
                (Some(path), _) => {
                    reporter.success(&format!("{label}: saved to {}", path.display()));
                }
                (None, Some(error)) => reporter.failure(&format!("{label}: {error}")),
                (None, None) => reporter.failure(&format!("{label}: failed")),
            }
        }

        let total = self.outcomes.len();
        let succeeded = self.succeeded();
        match self.classification() {
            SuccessClass::All => {
                reporter.success(&format!("All {total} extraction(s) completed successfully"));
            }
            SuccessClass::Partial => reporter.warning(&format!(
                "{succeeded}/{total} extraction(s) succeeded"
            )),
            SuccessClass::None => reporter.failure("No extraction succeeded"),
        }
    }
}

pub struct Orchestrator {
    factory: Box<dyn ClientFactory>,
    store: ResultsStore,
    reporter: Arc<dyn Reporter>,
    cooldown: Duration,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        factory: Box<dyn ClientFactory>,
        store: ResultsStore,
        reporter: Arc<dyn Reporter>,
        cooldown: Duration,
    ) -> Self {
        Self {
            factory,
            store,
            reporter,
            cooldown,
        }
    }

    /// Run every target in order. A failing or panicking platform is
    /// recorded and the run moves on.
    pub async fn run(&self, targets: &[ExtractionTarget]) -> RunSummary {
        let started = Instant::now();
        let mut outcomes: Vec<ExtractionOutcome> = Vec::with_capacity(targets.len());
        let total = targets.len();

        for (i, target) in targets.iter().enumerate() {
            self.reporter.step(&format!(
                "[{}/{total}] {} {} for '{}'",
                i + 1,
                target.platform.icon(),
                target.platform,
                target.identity
            ));

            let outcome = match self.run_one(target).await {
                Ok(path) => {
                    tracing::info!(platform = %target.platform, path = %path.display(), "extraction stored");
                    self.reporter
                        .success(&format!("Results saved: {}", path.display()));
                    ExtractionOutcome {
                        platform: target.platform,
                        identity: target.identity.clone(),
                        success: true,
                        path: Some(path),
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(platform = %target.platform, error = %e, "extraction failed");
                    self.reporter
                        .failure(&format!("{} extraction failed: {e}", target.platform));
                    ExtractionOutcome {
                        platform: target.platform,
                        identity: target.identity.clone(),
                        success: false,
                        path: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            record(&mut outcomes, outcome);

            if i + 1 < total && !self.cooldown.is_zero() {
                tokio::time::sleep(self.cooldown).await;
            }
        }

        RunSummary {
            duration: started.elapsed(),
            outcomes,
        }
    }

    async fn run_one(&self, target: &ExtractionTarget) -> Result<PathBuf, ExtractError> {
        let client = self.factory.build(target.platform)?;
        AssertUnwindSafe(client.run(&target.identity, &self.store))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ExtractError::Panicked(panic_message(&*payload))))
    }
}

/// Last write wins per platform; first-run order is kept.
fn record(outcomes: &mut Vec<ExtractionOutcome>, outcome: ExtractionOutcome) {
    match outcomes.iter_mut().find(|o| o.platform == outcome.platform) {
        Some(existing) => *existing = outcome,
        None => outcomes.push(outcome),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::platforms::PlatformClient;
    use crate::reporter::{EventKind, RecordingReporter};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct FakeClient {
        platform: PlatformId,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl PlatformClient for FakeClient {
        fn platform(&self) -> PlatformId {
            self.platform
        }

        async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
            match self.behaviour {
                Behaviour::Succeed => Ok(json!({ "identity": identity })),
                Behaviour::Fail => Err(ExtractError::NotFound {
                    what: format!("user {identity}"),
                }),
                Behaviour::Panic => panic!("client blew up"),
            }
        }
    }

    struct FakeFactory {
        behaviours: Vec<(PlatformId, Behaviour)>,
        builds: Arc<AtomicUsize>,
    }

    impl ClientFactory for FakeFactory {
        fn build(&self, platform: PlatformId) -> Result<Box<dyn PlatformClient>, ExtractError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if platform == PlatformId::Youtube {
                return Err(ExtractError::MissingCredentials {
                    platform,
                    hint: "no key".to_string(),
                });
            }
            let behaviour = self
                .behaviours
                .iter()
                .find(|(p, _)| *p == platform)
                .map_or(Behaviour::Succeed, |(_, b)| *b);
            Ok(Box::new(FakeClient {
                platform,
                behaviour,
            }))
        }
    }

    fn target(platform: PlatformId, identity: &str) -> ExtractionTarget {
        ExtractionTarget {
            platform,
            identity: identity.to_string(),
        }
    }

    fn orchestrator(
        dir: &std::path::Path,
        behaviours: Vec<(PlatformId, Behaviour)>,
        reporter: Arc<RecordingReporter>,
    ) -> (Orchestrator, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = FakeFactory {
            behaviours,
            builds: Arc::clone(&builds),
        };
        let store = ResultsStore::new(dir.join("results"), dir.join("staging"));
        (
            Orchestrator::new(Box::new(factory), store, reporter, Duration::ZERO),
            builds,
        )
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Arc::new(RecordingReporter::new());
        let (orchestrator, builds) = orchestrator(
            dir.path(),
            vec![
                (PlatformId::Reddit, Behaviour::Fail),
                (PlatformId::Medium, Behaviour::Panic),
            ],
            reporter.clone(),
        );

        let summary = orchestrator
            .run(&[
                target(PlatformId::Github, "octocat"),
                target(PlatformId::Reddit, "ghost"),
                target(PlatformId::Medium, "writer"),
                target(PlatformId::Youtube, "chan"),
            ])
            .await;

        assert_eq!(builds.load(Ordering::SeqCst), 4);
        assert_eq!(summary.outcomes.len(), 4);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.classification(), SuccessClass::Partial);

        let github = &summary.outcomes[0];
        assert!(github.success);
        assert!(github.path.as_ref().is_some_and(|p| p.exists()));

        let medium = &summary.outcomes[2];
        assert!(!medium.success);
        assert!(medium.error.as_deref().is_some_and(|e| e.contains("client blew up")));

        let youtube = &summary.outcomes[3];
        assert!(youtube.path.is_none());
        assert!(youtube.error.as_deref().is_some_and(|e| e.contains("credentials")));

        assert_eq!(reporter.messages(EventKind::Failure).len(), 3);
    }

    #[tokio::test]
    async fn failed_platform_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _) = orchestrator(
            dir.path(),
            vec![(PlatformId::Reddit, Behaviour::Fail)],
            Arc::new(RecordingReporter::new()),
        );
        let summary = orchestrator.run(&[target(PlatformId::Reddit, "ghost")]).await;
        assert_eq!(summary.classification(), SuccessClass::None);
        assert!(!dir.path().join("results").exists());
    }

    #[tokio::test]
    async fn repeated_platform_keeps_last_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _) =
            orchestrator(dir.path(), Vec::new(), Arc::new(RecordingReporter::new()));
        let summary = orchestrator
            .run(&[
                target(PlatformId::Github, "first"),
                target(PlatformId::Bluesky, "b"),
                target(PlatformId::Github, "second"),
            ])
            .await;
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.outcomes[0].platform, PlatformId::Github);
        assert_eq!(summary.outcomes[0].identity, "second");
        assert_eq!(summary.classification(), SuccessClass::All);
    }

    #[test]
    fn empty_run_is_classified_as_none() {
        let summary = RunSummary {
            duration: Duration::ZERO,
            outcomes: Vec::new(),
        };
        assert_eq!(summary.classification(), SuccessClass::None);
    }

    #[test]
    fn summary_report_lists_every_platform() {
        let reporter = RecordingReporter::new();
        let summary = RunSummary {
            duration: Duration::from_millis(1500),
            outcomes: vec![
                ExtractionOutcome {
                    platform: PlatformId::Github,
                    identity: "octocat".to_string(),
                    success: true,
                    path: Some(PathBuf::from("results/github_octocat_20240101000000.json")),
                    error: None,
                },
                ExtractionOutcome {
                    platform: PlatformId::Reddit,
                    identity: "octocat".to_string(),
                    success: false,
                    path: None,
                    error: Some("user octocat not found".to_string()),
                },
            ],
        };
        summary.report(&reporter);
        assert!(reporter.messages(EventKind::Info)[0].contains("1.5s"));
        assert_eq!(reporter.messages(EventKind::Success).len(), 1);
        assert_eq!(reporter.messages(EventKind::Warning), vec!["1/2 extraction(s) succeeded"]);
    }

    #[test]
    fn piped_summary_keeps_saved_paths_and_outcomes() {
        use crate::reporter::capture::Pipe;
        use crate::reporter::ConsoleReporter;

        let (out, err) = (Pipe::default(), Pipe::default());
        let reporter = ConsoleReporter::with_writers(Box::new(out.clone()), Box::new(err.clone()));
        let summary = RunSummary {
            duration: Duration::from_secs(2),
            outcomes: vec![ExtractionOutcome {
                platform: PlatformId::Github,
                identity: "octocat".to_string(),
                success: true,
                path: Some(PathBuf::from("results/github_octocat_20240101000000.json")),
                error: None,
            }],
        };
        summary.report(&reporter);

        let stdout = out.contents();
        assert!(stdout.contains("EXTRACTION SUMMARY"));
        assert!(stdout.contains("Total time: 2.0s"));
        assert!(stdout.contains("github: saved to results/github_octocat_20240101000000.json"));
        assert!(stdout.contains("All 1 extraction(s) completed successfully"));
        assert!(err.contents().is_empty());
    }
}
