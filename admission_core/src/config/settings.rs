use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::files::rules::{
    RuleSet, ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, DANGEROUS_EXTENSIONS, MAX_FILE_SIZE_BYTES,
    MAX_FOLDER_SIZE_BYTES,
};

const DEFAULT_CONFIG_FILE: &str = "admission.toml";
const ENV_PREFIX: &str = "ADMISSION";
const LIST_KEYS: [&str; 3] = ["dangerous_extensions", "allowed_extensions", "allowed_mime_types"];

/// Overridable admission rules. The defaults are the production rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub max_file_size_bytes: u64,
    pub max_folder_size_bytes: u64,
    pub dangerous_extensions: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub allowed_mime_types: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            max_folder_size_bytes: MAX_FOLDER_SIZE_BYTES,
            dangerous_extensions: sorted(DANGEROUS_EXTENSIONS.iter().copied()),
            allowed_extensions: sorted(ALLOWED_EXTENSIONS.iter().copied()),
            allowed_mime_types: sorted(ALLOWED_MIME_TYPES.iter().copied()),
        }
    }
}

impl From<&RuleSet> for AdmissionConfig {
    fn from(rules: &RuleSet) -> Self {
        Self {
            max_file_size_bytes: rules.max_file_size_bytes,
            max_folder_size_bytes: rules.max_folder_size_bytes,
            dangerous_extensions: sorted(rules.dangerous_extensions.iter().map(String::as_str)),
            allowed_extensions: sorted(rules.allowed_extensions.iter().map(String::as_str)),
            allowed_mime_types: sorted(rules.allowed_mime_types.iter().map(String::as_str)),
        }
    }
}

fn sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut values: Vec<String> = values.map(str::to_string).collect();
    values.sort();
    values
}

impl AdmissionConfig {
    /// Defaults, then `admission.toml` in the working directory if present,
    /// then `ADMISSION_*` environment variables.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_optional(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Like [`load_from`](Self::load_from), but a missing file means defaults.
    fn load_optional(path: &Path) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AdmissionConfig::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path).required(true));
        }

        Self::finish(builder.add_source(env_source()))
    }

    /// Defaults, then the given file (which must exist), then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(Config::try_from(&AdmissionConfig::default())?)
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(env_source());

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> std::result::Result<Self, ConfigError> {
        let config: AdmissionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::info!(
            max_file_size_bytes = config.max_file_size_bytes,
            max_folder_size_bytes = config.max_folder_size_bytes,
            dangerous = config.dangerous_extensions.len(),
            allowed = config.allowed_extensions.len(),
            mime_types = config.allowed_mime_types.len(),
            "Admission rules loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_file_size_bytes == 0 {
            return Err(ConfigError::Message(
                "Max file size must be greater than 0".to_string(),
            ));
        }

        if self.max_folder_size_bytes == 0 {
            return Err(ConfigError::Message(
                "Max folder size must be greater than 0".to_string(),
            ));
        }

        if self.max_folder_size_bytes < self.max_file_size_bytes {
            return Err(ConfigError::Message(
                "Max folder size cannot be smaller than max file size".to_string(),
            ));
        }

        let overlap = self.rules().overlapping_extensions();
        if !overlap.is_empty() {
            tracing::warn!(
                extensions = ?overlap,
                "Extensions listed as both dangerous and allowed; they will be blocked"
            );
        }

        Ok(())
    }

    pub fn rules(&self) -> RuleSet {
        RuleSet::builder()
            .max_file_size_bytes(self.max_file_size_bytes)
            .max_folder_size_bytes(self.max_folder_size_bytes)
            .dangerous_extensions(&self.dangerous_extensions)
            .allowed_extensions(&self.allowed_extensions)
            .allowed_mime_types(&self.allowed_mime_types)
            .build()
    }

    pub fn into_rules(self) -> RuleSet {
        self.rules()
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_source() -> Environment {
    LIST_KEYS.iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};
    use std::io::Write;

    // Loading reads process-wide `ADMISSION_*` variables; tests that load or
    // set them take this lock.
    static ENV_LOCK: Mutex<()> = const_mutex(());

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admission.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = AdmissionConfig::default();
        assert_eq!(config.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_folder_size_bytes, 500 * 1024 * 1024);
        assert!(config.allowed_extensions.contains(&String::new()));
        assert!(config.validate().is_ok());
        assert_eq!(config.rules(), RuleSet::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AdmissionConfig::default();

        config.max_file_size_bytes = 0;
        assert!(config.validate().is_err());

        config = AdmissionConfig::default();
        config.max_folder_size_bytes = 0;
        assert!(config.validate().is_err());

        config = AdmissionConfig::default();
        config.max_folder_size_bytes = config.max_file_size_bytes - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlap_is_allowed_but_dangerous_wins() {
        let mut config = AdmissionConfig::default();
        config.allowed_extensions.push(".exe".to_string());

        assert!(config.validate().is_ok());
        assert_eq!(config.rules().overlapping_extensions(), vec![".exe".to_string()]);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let _env = ENV_LOCK.lock();
        let (_dir, path) = write_config(
            r#"
max_file_size_bytes = 1048576
allowed_extensions = ["", "TXT", "md"]
"#,
        );

        let config = AdmissionConfig::load_from(&path).expect("config should load");
        assert_eq!(config.max_file_size_bytes, 1_048_576);
        assert_eq!(config.max_folder_size_bytes, MAX_FOLDER_SIZE_BYTES);

        let rules = config.into_rules();
        assert!(rules.is_allowed_extension(".txt"));
        assert!(rules.is_allowed_extension(".md"));
        assert!(!rules.is_allowed_extension(".pdf"));
        assert!(rules.is_dangerous_extension(".exe"));
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let _env = ENV_LOCK.lock();
        let (_dir, path) = write_config("max_file_size_bytes = 0\n");
        assert!(AdmissionConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let _env = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        assert!(AdmissionConfig::load_from(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_to_toml_lists_effective_rules() {
        let rendered = AdmissionConfig::from(&RuleSet::default()).to_toml().unwrap();
        assert!(rendered.contains("max_file_size_bytes = 52428800"));
        assert!(rendered.contains("\".exe\""));

        let parsed: AdmissionConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, AdmissionConfig::default());
    }

    #[test]
    fn test_environment_variable_support() {
        let _env = ENV_LOCK.lock();
        let (_dir, path) = write_config("max_folder_size_bytes = 1048576\n");

        std::env::set_var("ADMISSION_MAX_FILE_SIZE_BYTES", "2048");
        std::env::set_var("ADMISSION_ALLOWED_EXTENSIONS", "txt,.MD");

        let loaded = AdmissionConfig::load_from(&path);

        std::env::remove_var("ADMISSION_MAX_FILE_SIZE_BYTES");
        std::env::remove_var("ADMISSION_ALLOWED_EXTENSIONS");

        let config = loaded.expect("environment overrides should load");
        assert_eq!(config.max_file_size_bytes, 2048);
        assert_eq!(config.max_folder_size_bytes, 1_048_576);

        let rules = config.rules();
        assert_eq!(rules.max_file_size_bytes, 2048);
        assert_eq!(rules.allowed_extensions.len(), 2);
        assert!(rules.is_allowed_extension(".txt"));
        assert!(rules.is_allowed_extension(".md"));
        assert!(!rules.is_allowed_extension(".pdf"));
        assert!(rules.is_dangerous_extension(".exe"));
    }

    #[test]
    fn test_default_file_is_the_toml_file_checked() {
        let _env = ENV_LOCK.lock();
        let (dir, path) = write_config("max_file_size_bytes = 2048\n");
        std::fs::write(dir.path().join("admission.json"), r#"{"max_file_size_bytes": 4096}"#).unwrap();

        let config = AdmissionConfig::load_optional(&path).expect("config should load");
        assert_eq!(config.max_file_size_bytes, 2048);
    }

    #[test]
    fn test_missing_default_file_means_defaults() {
        let _env = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admission.json"), r#"{"max_file_size_bytes": 4096}"#).unwrap();

        let config = AdmissionConfig::load_optional(&dir.path().join("admission.toml")).expect("defaults should load");
        assert_eq!(config, AdmissionConfig::default());
    }
}
