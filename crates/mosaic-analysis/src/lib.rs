//! Optional analysis phase: feed an extracted document and a prompt template
//! to a local Ollama model and keep the answer as a text report.

pub mod models;
pub mod ollama;
pub mod workspace;

pub use models::{categorize_models, size_hint, ModelCatalog, ModelCategory};
pub use ollama::{GenerationOptions, OllamaClient};
pub use workspace::{report_filename, AnalysisWorkspace, ReportMetadata};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("prompt not found: {path}")]
    PromptNotFound { path: String },

    #[error("data file not found: {path}")]
    DataFileNotFound { path: String },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
