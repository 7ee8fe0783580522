use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ast::Target;
use crate::options::{self, Options};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// User settings read from `config.toml`.
///
/// ```toml
/// default_target = "search"
/// format = "json"
///
/// [defaults]
/// tenant = 42
/// statuses = ["open", "pending"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_target: Target,
    pub format: OutputFormat,
    /// Option values applied before any supplied on the command line.
    pub defaults: toml::Table,
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bqlc")
            .join("config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn default_options(&self) -> Result<Options> {
        Ok(options::from_toml_table(&self.defaults)?)
    }
}

/// Read an option file: JSON for `.json`, TOML otherwise.
pub fn load_options_file(path: &Path) -> Result<Options> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        let map = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("{} must contain a JSON object", path.display()))?;
        Ok(options::from_json_map(map)?)
    } else {
        let table: toml::Table =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(options::from_toml_table(&table)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionValue, Scalar};

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
default_target = "search"
format = "json"

[defaults]
tenant = 42
statuses = ["open", "pending"]
"#,
        )
        .unwrap();

        assert_eq!(config.default_target, Target::Search);
        assert_eq!(config.format, OutputFormat::Json);

        let defaults = config.default_options().unwrap();
        assert_eq!(defaults["tenant"], OptionValue::Scalar(Scalar::Int(42)));
        assert_eq!(defaults["statuses"], OptionValue::list(["open", "pending"]));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.default_target, Target::Sql);
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.default_options().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("bqlc-test-does-not-exist.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_target, Target::Sql);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!(Config::parse("default_target = \"mongo\"").is_err());
    }

    #[test]
    fn test_load_options_files() {
        let dir = std::env::temp_dir().join(format!("bqlc-options-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json = dir.join("opts.json");
        std::fs::write(&json, r#"{"a": 1, "ids": [1, null, 3], "gone": null}"#).unwrap();
        let opts = load_options_file(&json).unwrap();
        assert_eq!(opts["a"], OptionValue::Scalar(Scalar::Int(1)));
        assert_eq!(
            opts["ids"],
            OptionValue::List(vec![Some(Scalar::Int(1)), None, Some(Scalar::Int(3))])
        );
        assert_eq!(opts["gone"], OptionValue::Null);

        let toml = dir.join("opts.toml");
        std::fs::write(&toml, "name = \"bob\"\nratio = 0.5\n").unwrap();
        let opts = load_options_file(&toml).unwrap();
        assert_eq!(opts["name"], OptionValue::Scalar(Scalar::Text("bob".into())));
        assert_eq!(opts["ratio"], OptionValue::Scalar(Scalar::Float(0.5)));

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "[1, 2]").unwrap();
        assert!(load_options_file(&bad).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
