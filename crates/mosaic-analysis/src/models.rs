//! Grouping of installed models by expected speed and quality.

const POC_MARKERS: [&str; 3] = ["qwen:0.5b", "qwen2:0.5b", "tinyllama"];
const PRODUCTION_MARKERS: [&str; 4] = ["mistral", "llama3", "qwen:7b", "qwen2:7b"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCategory {
    /// Small and fast, good enough for a proof of concept.
    Poc,
    Production,
    Other,
}

impl ModelCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ModelCategory::Poc => "🚀 PoC / Debug (fast)",
            ModelCategory::Production => "🎯 Production (quality)",
            ModelCategory::Other => "🔬 Other",
        }
    }

    #[must_use]
    pub fn of(model: &str) -> Self {
        let lower = model.to_lowercase();
        if POC_MARKERS.iter().any(|m| lower.contains(m)) {
            ModelCategory::Poc
        } else if PRODUCTION_MARKERS.iter().any(|m| lower.contains(m)) {
            ModelCategory::Production
        } else {
            ModelCategory::Other
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    pub poc: Vec<String>,
    pub production: Vec<String>,
    pub other: Vec<String>,
}

impl ModelCatalog {
    /// Non-empty groups in display order.
    #[must_use]
    pub fn groups(&self) -> Vec<(ModelCategory, &[String])> {
        [
            (ModelCategory::Poc, self.poc.as_slice()),
            (ModelCategory::Production, self.production.as_slice()),
            (ModelCategory::Other, self.other.as_slice()),
        ]
        .into_iter()
        .filter(|(_, models)| !models.is_empty())
        .collect()
    }

    /// Models flattened in display order, matching menu numbering.
    #[must_use]
    pub fn ordered(&self) -> Vec<&str> {
        self.groups()
            .into_iter()
            .flat_map(|(_, models)| models.iter().map(String::as_str))
            .collect()
    }
}

#[must_use]
pub fn categorize_models(models: &[String]) -> ModelCatalog {
    let mut catalog = ModelCatalog::default();
    for model in models {
        let bucket = match ModelCategory::of(model) {
            ModelCategory::Poc => &mut catalog.poc,
            ModelCategory::Production => &mut catalog.production,
            ModelCategory::Other => &mut catalog.other,
        };
        bucket.push(model.clone());
    }
    catalog
}

/// Rough response-time hint shown next to a model name.
#[must_use]
pub fn size_hint(model: &str) -> &'static str {
    let lower = model.to_lowercase();
    if lower.contains("qwen:0.5b") || lower.contains("qwen2:0.5b") {
        "⚡ 2-5s"
    } else if lower.contains("mistral") || lower.contains("llama3") {
        "🐢 30-60s"
    } else if [":1b", ":3b", ":7b"].iter().any(|s| lower.contains(s)) {
        "⏱️ 10-45s"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn models_are_grouped_by_marker() {
        let catalog = categorize_models(&names(&[
            "qwen:0.5b",
            "mistral:7b-instruct",
            "TinyLlama:latest",
            "phi3:mini",
            "qwen2:7b",
        ]));
        assert_eq!(catalog.poc, names(&["qwen:0.5b", "TinyLlama:latest"]));
        assert_eq!(catalog.production, names(&["mistral:7b-instruct", "qwen2:7b"]));
        assert_eq!(catalog.other, names(&["phi3:mini"]));
    }

    #[test]
    fn ordered_skips_empty_groups() {
        let catalog = categorize_models(&names(&["phi3:mini", "tinyllama"]));
        assert_eq!(catalog.groups().len(), 2);
        assert_eq!(catalog.ordered(), vec!["tinyllama", "phi3:mini"]);
    }

    #[test]
    fn size_hints_follow_model_family() {
        assert_eq!(size_hint("qwen:0.5b"), "⚡ 2-5s");
        assert_eq!(size_hint("llama3:8b"), "🐢 30-60s");
        assert_eq!(size_hint("gemma:7b"), "⏱️ 10-45s");
        assert_eq!(size_hint("phi3:mini"), "");
    }
}
