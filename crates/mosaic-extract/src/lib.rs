//! Extraction engine: one async client per platform, a shared HTTP layer,
//! bounded pagination, result persistence and the sequential orchestrator.

pub mod error;
pub mod http;
pub mod orchestrator;
pub mod pagination;
pub mod persist;
pub mod platforms;
pub mod reporter;
pub mod resolver;
pub mod selection;

pub use error::ExtractError;
pub use http::{ClientSettings, HttpClient};
pub use orchestrator::{ExtractionOutcome, Orchestrator, RunSummary, SuccessClass};
pub use persist::ResultsStore;
pub use platforms::PlatformClient;
pub use reporter::{ConsoleReporter, EventKind, ProgressEvent, RecordingReporter, Reporter};
pub use resolver::{ClientFactory, DefaultClientFactory};
pub use selection::{parse_selection, CandidatePicker, FixedPicker, PromptPicker, Selection};
