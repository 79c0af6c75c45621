//! Persisted workspace settings
//!
//! A settings document holds, per configuration, its name, parameters,
//! stopwords and synonyms, plus the selected configuration and the language.
//! Decoding validates the whole document and reports every problem at once;
//! nothing is applied unless it is valid.

use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::SettingsError,
    model::{Configuration, Language, ModelParameters, Registry, StopwordSet, SynonymTable},
};

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsFormat {
    #[default]
    Json,
    Cbor,
}

impl SettingsFormat {
    /// `.cbor` files are CBOR, everything else JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("cbor") => SettingsFormat::Cbor,
            _ => SettingsFormat::Json,
        }
    }
}

/// Persisted form of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSettings {
    pub name: String,
    pub parameters: ModelParameters,
    pub stopwords: StopwordSet,
    pub synonyms: SynonymTable,
}

impl ConfigurationSettings {
    pub fn capture(config: &Configuration) -> Self {
        Self {
            name: config.name().to_string(),
            parameters: config.parameters.read().clone(),
            stopwords: config.stopwords.read().clone(),
            synonyms: config.synonyms.read().clone(),
        }
    }

    pub fn to_configuration(&self) -> Configuration {
        Configuration::from_parts(
            &self.name,
            self.parameters.clone(),
            self.stopwords.clone(),
            self.synonyms.clone(),
        )
    }
}

/// Persisted form of the whole registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub language: Language,
    pub selected: String,
    pub configurations: Vec<ConfigurationSettings>,
}

impl Settings {
    pub fn capture(registry: &Registry) -> Self {
        Self {
            language: registry.language(),
            selected: registry.selected_name().to_string(),
            configurations: registry.iter().map(ConfigurationSettings::capture).collect(),
        }
    }

    /// Every problem that would make this document unusable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.configurations.is_empty() {
            problems.push("at least one configuration is required".to_string());
        }
        let mut seen = HashSet::new();
        for config in &self.configurations {
            if config.name.trim().is_empty() {
                problems.push("configuration names must not be empty".to_string());
            }
            if !seen.insert(config.name.as_str()) {
                problems.push(format!("duplicate configuration \"{}\"", config.name));
            }
            problems.extend(
                config
                    .parameters
                    .validate()
                    .into_iter()
                    .map(|p| format!("configuration \"{}\": {}", config.name, p)),
            );
        }
        if !seen.contains(self.selected.as_str()) {
            problems.push(format!(
                "selected configuration \"{}\" does not exist",
                self.selected
            ));
        }
        problems
    }

    pub fn encode(&self, format: SettingsFormat) -> Result<Vec<u8>, SettingsError> {
        match format {
            SettingsFormat::Json => serde_json::to_vec_pretty(self).map_err(|e| SettingsError::Encode(e.to_string())),
            SettingsFormat::Cbor => serde_cbor::to_vec(self).map_err(|e| SettingsError::Encode(e.to_string())),
        }
    }

    /// Parse and validate
    /// Malformed input, duplicate keys and missing fields are reported the
    /// same way as out-of-range values.
    pub fn decode(bytes: &[u8], format: SettingsFormat) -> Result<Self, SettingsError> {
        let parsed: Result<Settings, String> = match format {
            SettingsFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            SettingsFormat::Cbor => serde_cbor::from_slice(bytes).map_err(|e| e.to_string()),
        };
        let settings = parsed.map_err(|problem| {
            warn!(%problem, "settings could not be parsed");
            SettingsError::Rejected {
                problems: vec![problem],
            }
        })?;
        let problems = settings.validate();
        if !problems.is_empty() {
            warn!(count = problems.len(), "settings rejected");
            return Err(SettingsError::Rejected { problems });
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path, format: SettingsFormat) -> Result<(), SettingsError> {
        let bytes = self.encode(format)?;
        fs::write(path, bytes)?;
        debug!(path = %path.display(), "settings written");
        Ok(())
    }

    pub fn load(path: &Path, format: SettingsFormat) -> Result<Self, SettingsError> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes, format)
    }

    /// Fresh configurations built from this document, in order
    pub fn to_configurations(&self) -> Vec<Configuration> {
        self.configurations
            .iter()
            .map(ConfigurationSettings::to_configuration)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{corpus::CorpusVersionTracker, model::Algorithm};

    fn registry() -> Registry {
        let mut r = Registry::new(CorpusVersionTracker::new(), Language::English);
        r.selected().parameters.write().topic_count = 3;
        r.add("Config 2");
        {
            let config = r.selected();
            let mut p = config.parameters.write();
            p.algorithm = Algorithm::Nmf;
            p.topic_count = 7;
            config.stopwords.write().add_extra("lorem");
            config.synonyms.write().insert("colour", "color");
        }
        r.switch("Config 1");
        r
    }

    #[test]
    fn json_and_cbor_round_trip() {
        let settings = Settings::capture(&registry());
        for format in [SettingsFormat::Json, SettingsFormat::Cbor] {
            let bytes = settings.encode(format).unwrap();
            let decoded = Settings::decode(&bytes, format).unwrap();
            assert_eq!(decoded, settings);
            assert_eq!(decoded.selected, "Config 1");
            assert_eq!(decoded.configurations[1].parameters.topic_count, 7);
            assert!(decoded.configurations[1].stopwords.extra.contains("lorem"));
        }
    }

    #[test]
    fn duplicate_and_missing_keys_are_rejected() {
        let duplicate_synonym = r#"{
            "language": "english",
            "selected": "a",
            "configurations": [{
                "name": "a",
                "parameters": {"algorithm": "lda", "topic_count": 2, "iterations": 5, "alpha": 0.1, "beta": 0.1, "seed": 1},
                "stopwords": {"base": [], "extra": []},
                "synonyms": {"cars": "car", "cars": "auto"}
            }]
        }"#;
        let err = Settings::decode(duplicate_synonym.as_bytes(), SettingsFormat::Json).unwrap_err();
        assert!(err.problems()[0].contains("duplicate key"));

        let duplicate_field = r#"{"language": "english", "language": "german", "selected": "a", "configurations": []}"#;
        let err = Settings::decode(duplicate_field.as_bytes(), SettingsFormat::Json).unwrap_err();
        assert!(err.problems()[0].contains("duplicate field"));

        let missing = r#"{"language": "english", "configurations": []}"#;
        let err = Settings::decode(missing.as_bytes(), SettingsFormat::Json).unwrap_err();
        assert!(err.problems()[0].contains("missing field"));
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut settings = Settings::capture(&registry());
        settings.selected = "nope".into();
        settings.configurations[1].name = "Config 1".into();
        settings.configurations[0].parameters.topic_count = 0;
        let problems = settings.validate();
        assert_eq!(problems.len(), 3, "{problems:?}");

        let bytes = settings.encode(SettingsFormat::Json).unwrap();
        match Settings::decode(&bytes, SettingsFormat::Json) {
            Err(SettingsError::Rejected { problems }) => assert_eq!(problems.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SettingsFormat::from_path(Path::new("a.CBOR")), SettingsFormat::Cbor);
        assert_eq!(SettingsFormat::from_path(Path::new("a.json")), SettingsFormat::Json);
        assert_eq!(SettingsFormat::from_path(Path::new("settings")), SettingsFormat::Json);
    }
}
