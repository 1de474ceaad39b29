use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One of the eight supported extraction platforms.
///
/// The declaration order is the stable numbering used on the command line
/// (`1` = Stack Overflow … `8` = Telegram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    StackOverflow,
    Youtube,
    Github,
    Bluesky,
    Mastodon,
    Reddit,
    Medium,
    Telegram,
}

impl PlatformId {
    pub const ALL: [PlatformId; 8] = [
        PlatformId::StackOverflow,
        PlatformId::Youtube,
        PlatformId::Github,
        PlatformId::Bluesky,
        PlatformId::Mastodon,
        PlatformId::Reddit,
        PlatformId::Medium,
        PlatformId::Telegram,
    ];

    /// Lowercase name used in filenames, logs, and on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PlatformId::StackOverflow => "stackoverflow",
            PlatformId::Youtube => "youtube",
            PlatformId::Github => "github",
            PlatformId::Bluesky => "bluesky",
            PlatformId::Mastodon => "mastodon",
            PlatformId::Reddit => "reddit",
            PlatformId::Medium => "medium",
            PlatformId::Telegram => "telegram",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            PlatformId::StackOverflow => "📚",
            PlatformId::Youtube => "📺",
            PlatformId::Github => "🐙",
            PlatformId::Bluesky => "🦋",
            PlatformId::Mastodon => "🐘",
            PlatformId::Reddit => "👽",
            PlatformId::Medium => "📰",
            PlatformId::Telegram => "✈️",
        }
    }

    /// 1-based menu number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            PlatformId::StackOverflow => 1,
            PlatformId::Youtube => 2,
            PlatformId::Github => 3,
            PlatformId::Bluesky => 4,
            PlatformId::Mastodon => 5,
            PlatformId::Reddit => 6,
            PlatformId::Medium => 7,
            PlatformId::Telegram => 8,
        }
    }

    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.number() == number)
    }

    /// Case-insensitive lookup by platform name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Typical wall-clock time for one extraction, used for the pre-run estimate.
    #[must_use]
    pub fn typical_duration(self) -> Duration {
        let secs = match self {
            PlatformId::StackOverflow => 10,
            PlatformId::Youtube => 15,
            PlatformId::Github | PlatformId::Reddit => 8,
            PlatformId::Bluesky | PlatformId::Mastodon => 12,
            PlatformId::Medium => 5,
            PlatformId::Telegram => 20,
        };
        Duration::from_secs(secs)
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a `--platforms` value: `all`, or a comma-separated list mixing
/// menu numbers and names (`1,github,7`).
///
/// Unknown parts are skipped. Duplicates keep their first position.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPlatformSelection`] when no part names a
/// known platform.
pub fn parse_platform_selection(input: &str) -> Result<Vec<PlatformId>, ConfigError> {
    if input.trim().eq_ignore_ascii_case("all") {
        return Ok(PlatformId::ALL.to_vec());
    }

    let mut selected = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let platform = if part.chars().all(|c| c.is_ascii_digit()) {
            part.parse::<u8>().ok().and_then(PlatformId::from_number)
        } else {
            PlatformId::from_name(part)
        };

        match platform {
            Some(p) if !selected.contains(&p) => selected.push(p),
            Some(_) => {}
            None => tracing::debug!(part, "ignoring unknown platform"),
        }
    }

    if selected.is_empty() {
        return Err(ConfigError::InvalidPlatformSelection {
            input: input.to_string(),
        });
    }
    Ok(selected)
}

/// Sum of typical durations for the given platforms.
#[must_use]
pub fn estimate_duration(platforms: &[PlatformId]) -> Duration {
    platforms.iter().map(|p| p.typical_duration()).sum()
}
