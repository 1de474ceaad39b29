//! Multi-select of search candidates (Stack Overflow users, YouTube channels).

use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

/// Indices chosen from a candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Zero-based, in the order the user typed them, without duplicates.
    pub indices: Vec<usize>,
    /// True when the input was unusable and the first candidate was picked instead.
    pub fell_back: bool,
}

/// Parse a comma-separated list of 1-based indices against `count` candidates.
///
/// Empty input selects every candidate. Out-of-range parts are skipped.
/// Input that yields nothing usable falls back to the first candidate, so
/// the selection is never empty while `count > 0`.
#[must_use]
pub fn parse_selection(input: &str, count: usize) -> Selection {
    if count == 0 {
        return Selection {
            indices: Vec::new(),
            fell_back: false,
        };
    }

    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return Selection {
            indices: (0..count).collect(),
            fell_back: false,
        };
    }

    let mut indices = Vec::new();
    let mut parse_failed = false;
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => {
                if !indices.contains(&(n - 1)) {
                    indices.push(n - 1);
                }
            }
            Ok(_) => {}
            Err(_) => parse_failed = true,
        }
    }

    if parse_failed || indices.is_empty() {
        return Selection {
            indices: vec![0],
            fell_back: true,
        };
    }

    Selection {
        indices,
        fell_back: false,
    }
}

/// Chooses which search candidates to extract.
#[async_trait]
pub trait CandidatePicker: Send + Sync {
    /// `labels` are display strings, one per candidate, in ranking order.
    async fn pick(&self, title: &str, labels: &[String]) -> Selection;
}

/// Asks on the terminal.
#[derive(Debug, Default)]
pub struct PromptPicker;

#[async_trait]
impl CandidatePicker for PromptPicker {
    async fn pick(&self, title: &str, labels: &[String]) -> Selection {
        println!("\n{title}");
        for (i, label) in labels.iter().enumerate() {
            println!("  {}. {label}", i + 1);
        }

        // The prompt blocks on stdin; keep it off the async worker threads.
        let answer = tokio::task::spawn_blocking(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Select numbers separated by commas (empty = all)")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();

        parse_selection(&answer, labels.len())
    }
}

/// Applies a selection string fixed up front (`--select`), for unattended runs.
#[derive(Debug, Clone)]
pub struct FixedPicker(pub String);

impl Default for FixedPicker {
    fn default() -> Self {
        Self("all".to_string())
    }
}

#[async_trait]
impl CandidatePicker for FixedPicker {
    async fn pick(&self, title: &str, labels: &[String]) -> Selection {
        tracing::debug!(title, candidates = labels.len(), selection = %self.0, "applying fixed selection");
        parse_selection(&self.0, labels.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_listed_indices() {
        let selection = parse_selection("1,3", 5);
        assert_eq!(selection.indices, vec![0, 2]);
        assert!(!selection.fell_back);
    }

    #[test]
    fn empty_input_selects_all() {
        assert_eq!(parse_selection("", 5).indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(parse_selection("  ", 2).indices, vec![0, 1]);
        assert_eq!(parse_selection("all", 3).indices, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_falls_back_to_first() {
        let selection = parse_selection("99", 5);
        assert_eq!(selection.indices, vec![0]);
        assert!(selection.fell_back);
    }

    #[test]
    fn non_numeric_falls_back_to_first() {
        let selection = parse_selection("1,abc", 5);
        assert_eq!(selection.indices, vec![0]);
        assert!(selection.fell_back);
    }

    #[test]
    fn out_of_range_parts_are_skipped_when_others_are_valid() {
        let selection = parse_selection("2,0,9", 3);
        assert_eq!(selection.indices, vec![1]);
        assert!(!selection.fell_back);
    }

    #[test]
    fn duplicates_are_removed() {
        assert_eq!(parse_selection("2,2,1", 3).indices, vec![1, 0]);
    }

    #[test]
    fn no_candidates_means_empty_selection() {
        let selection = parse_selection("1", 0);
        assert!(selection.indices.is_empty());
        assert!(!selection.fell_back);
    }

    #[tokio::test]
    async fn fixed_picker_defaults_to_all() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(FixedPicker::default().pick("t", &labels).await.indices, vec![0, 1]);
        assert_eq!(FixedPicker("2".to_string()).pick("t", &labels).await.indices, vec![1]);
    }
}
