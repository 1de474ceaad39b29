//! Prompt templates, extracted documents and saved reports on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::AnalysisError;

const RULE_WIDTH: usize = 60;

/// Directories the analysis phase reads from and writes to.
#[derive(Debug, Clone)]
pub struct AnalysisWorkspace {
    prompts_dir: PathBuf,
    results_dir: PathBuf,
}

/// What goes into a report header.
#[derive(Debug, Clone)]
pub struct ReportMetadata<'a> {
    pub prompt: &'a str,
    pub data_file: &'a str,
    pub model: &'a str,
}

fn io_error(path: &Path, source: std::io::Error) -> AnalysisError {
    AnalysisError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Sorted file names in `dir` with the given extension. A missing directory
/// is an empty listing.
fn list_with_extension(dir: &Path, extension: &str, stem_only: bool) -> Result<Vec<String>, AnalysisError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let name = if stem_only {
            path.file_stem()
        } else {
            path.file_name()
        };
        if let Some(name) = name.and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

impl AnalysisWorkspace {
    #[must_use]
    pub fn new(prompts_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Prompt names (`*.md` stems).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Io`] if the directory cannot be listed.
    pub fn list_prompts(&self) -> Result<Vec<String>, AnalysisError> {
        list_with_extension(&self.prompts_dir, "md", true)
    }

    /// Extracted documents (`*.json` file names).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Io`] if the directory cannot be listed.
    pub fn list_data_files(&self) -> Result<Vec<String>, AnalysisError> {
        list_with_extension(&self.results_dir, "json", false)
    }

    /// # Errors
    ///
    /// [`AnalysisError::PromptNotFound`] when `{name}.md` does not exist.
    pub fn read_prompt(&self, name: &str) -> Result<String, AnalysisError> {
        let path = self.prompts_dir.join(format!("{name}.md"));
        if !path.is_file() {
            return Err(AnalysisError::PromptNotFound {
                path: path.display().to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))
    }

    /// The document re-serialized as pretty JSON, ready to append to a prompt.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::DataFileNotFound`] when the file is missing, or
    /// [`AnalysisError::Json`] when it is not JSON.
    pub fn read_data(&self, file_name: &str) -> Result<String, AnalysisError> {
        let path = self.results_dir.join(file_name);
        if !path.is_file() {
            return Err(AnalysisError::DataFileNotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Write the answer under a metadata header into the results directory.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Io`] if the directory or file cannot be written.
    pub fn save_report(
        &self,
        answer: &str,
        metadata: &ReportMetadata<'_>,
    ) -> Result<PathBuf, AnalysisError> {
        let now = Local::now();
        std::fs::create_dir_all(&self.results_dir).map_err(|e| io_error(&self.results_dir, e))?;
        let path = self.results_dir.join(report_filename(metadata.prompt, now));
        std::fs::write(&path, render_report(answer, metadata, now)).map_err(|e| io_error(&path, e))?;
        tracing::debug!(path = %path.display(), "analysis report written");
        Ok(path)
    }
}

/// `analysis_{prompt}_{YYYYMMDD_HHMMSS}.txt`
#[must_use]
pub fn report_filename(prompt: &str, now: DateTime<Local>) -> String {
    format!("analysis_{prompt}_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

fn render_report(answer: &str, metadata: &ReportMetadata<'_>, now: DateTime<Local>) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\nMOSAIC Analysis Report\n{rule}\n\n\
         Prompt:    {}\n\
         Data:      {}\n\
         Model:     {}\n\
         Date:      {}\n\
         \n{rule}\n\n{answer}",
        metadata.prompt,
        metadata.data_file,
        metadata.model,
        now.format("%Y-%m-%d %H:%M:%S"),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn workspace(dir: &Path) -> AnalysisWorkspace {
        AnalysisWorkspace::new(dir.join("prompts"), dir.join("results"))
    }

    #[test]
    fn listings_filter_by_extension_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path());
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("prompts/profile.md"), "Describe").unwrap();
        std::fs::write(dir.path().join("prompts/activity.md"), "Summarize").unwrap();
        std::fs::write(dir.path().join("prompts/notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("results/github_a_20240101000000.json"), "{}").unwrap();
        std::fs::write(dir.path().join("results/analysis_x.txt"), "ignored").unwrap();

        assert_eq!(ws.list_prompts().unwrap(), vec!["activity", "profile"]);
        assert_eq!(
            ws.list_data_files().unwrap(),
            vec!["github_a_20240101000000.json"]
        );
    }

    #[test]
    fn missing_directories_list_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path());
        assert!(ws.list_prompts().unwrap().is_empty());
        assert!(ws.list_data_files().unwrap().is_empty());
    }

    #[test]
    fn missing_prompt_and_data_are_typed_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path());
        assert!(matches!(
            ws.read_prompt("absent"),
            Err(AnalysisError::PromptNotFound { .. })
        ));
        assert!(matches!(
            ws.read_data("absent.json"),
            Err(AnalysisError::DataFileNotFound { .. })
        ));
    }

    #[test]
    fn data_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path());
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("results/doc.json"), r#"{"a":1}"#).unwrap();
        assert_eq!(ws.read_data("doc.json").unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn report_has_metadata_header() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(dir.path());
        let path = ws
            .save_report(
                "Looks like a security researcher.",
                &ReportMetadata {
                    prompt: "profile",
                    data_file: "github_a.json",
                    model: "qwen:0.5b",
                },
            )
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("analysis_profile_") && name.ends_with(".txt"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with(&"=".repeat(60)));
        assert!(body.contains("Prompt:    profile\n"));
        assert!(body.contains("Data:      github_a.json\n"));
        assert!(body.contains("Model:     qwen:0.5b\n"));
        assert!(body.ends_with("Looks like a security researcher."));
    }

    #[test]
    fn report_filename_uses_local_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(report_filename("osint", now), "analysis_osint_20240309_140507.txt");
    }
}
