//! Options accepted by [`PassRunner::analyze`](crate::semantic::PassRunner::analyze).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid options value: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pass selection and output filtering.
///
/// Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOptions {
    /// Run only these pass ids; `None` runs every registered pass
    pub passes: Option<Vec<String>>,
    /// Pass ids to leave out
    pub skip: Vec<String>,
    /// Keep hint diagnostics in the output
    pub include_hints: bool,
}

impl AnalyzeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from TOML
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_str(&content)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn only<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passes = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn skip(mut self, id: impl Into<String>) -> Self {
        self.skip.push(id.into());
        self
    }

    pub fn include_hints(mut self, include: bool) -> Self {
        self.include_hints = include;
        self
    }

    /// Whether a pass id survives selection and exclusion
    pub fn selects(&self, id: &str) -> bool {
        let selected = self
            .passes
            .as_ref()
            .map_or(true, |passes| passes.iter().any(|p| p == id));
        selected && !self.skip.iter().any(|s| s == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = AnalyzeOptions::load_from_str("").expect("empty options");
        assert_eq!(options, AnalyzeOptions::default());
        assert!(!options.include_hints);
        assert!(options.selects("anything"));
    }

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
passes = ["unused-symbols", "type-coherence"]
skip = ["type-coherence"]
includeHints = true
"#;
        let options = AnalyzeOptions::load_from_str(toml).expect("should parse");
        assert!(options.include_hints);
        assert!(options.selects("unused-symbols"));
        assert!(!options.selects("type-coherence"));
        assert!(!options.selects("cyclic-dependencies"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let options = AnalyzeOptions::load_from_str("maxErrors = 10\n[format]\ncolor = true\n")
            .expect("unknown keys are fine");
        assert_eq!(options, AnalyzeOptions::default());

        let json = serde_json::json!({ "skip": ["intent-coherence"], "verbose": true });
        let options = AnalyzeOptions::from_json(json).expect("unknown keys are fine");
        assert_eq!(options.skip, vec!["intent-coherence".to_string()]);
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let result = AnalyzeOptions::load_from_str("includeHints = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_builder() {
        let options = AnalyzeOptions::new()
            .only(["unused-symbols"])
            .skip("cyclic-dependencies")
            .include_hints(true);
        assert_eq!(options.passes, Some(vec!["unused-symbols".to_string()]));
        assert!(options.selects("unused-symbols"));
        assert!(!options.selects("cyclic-dependencies"));
    }

    #[test]
    fn test_missing_file() {
        let result = AnalyzeOptions::load_from_file(Path::new("/nonexistent/isl-options.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
