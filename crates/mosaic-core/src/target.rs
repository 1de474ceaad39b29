use std::collections::HashMap;

use crate::platform::PlatformId;
use crate::ConfigError;

/// One platform/identity pair to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTarget {
    pub platform: PlatformId,
    pub identity: String,
}

/// How identities were supplied for a run.
#[derive(Debug, Clone)]
pub enum IdentityInput {
    /// The same handle on every selected platform.
    Same(String),
    /// A handle per platform; every selected platform must be present.
    PerPlatform(HashMap<PlatformId, String>),
}

/// Pair each selected platform with its identity, preserving selection order.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] if an identity is blank or a selected
/// platform has no identity in a per-platform map.
pub fn build_targets(
    platforms: &[PlatformId],
    identities: &IdentityInput,
) -> Result<Vec<ExtractionTarget>, ConfigError> {
    platforms
        .iter()
        .map(|&platform| {
            let identity = match identities {
                IdentityInput::Same(identity) => identity.as_str(),
                IdentityInput::PerPlatform(map) => map.get(&platform).map_or("", String::as_str),
            };
            let identity = identity.trim();
            if identity.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "no username configured for {platform}"
                )));
            }
            Ok(ExtractionTarget {
                platform,
                identity: identity.to_string(),
            })
        })
        .collect()
}
