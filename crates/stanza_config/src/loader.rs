//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SiteConfig;
use serde::Deserialize;
use std::path::Path;

/// The configuration file name looked for in a project directory.
pub const CONFIG_FILE_NAME: &str = "stanza.toml";

#[derive(Deserialize)]
struct ConfigFile {
    site: SiteConfig,
}

/// Loads and validates a `stanza.toml` configuration from a project
/// directory.
pub fn load_config(project_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `stanza.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SiteConfig, ConfigError> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&file.site)?;
    Ok(file.site)
}

fn validate_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::MissingField("site.name".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternType;
    use stanza_common::AttributeValue;
    use std::path::PathBuf;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[site]
name = "demo"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.pattern_type, PatternType::Glob);
        assert!(config.attributes.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[site]
name = "demo"
output_dir = "public"
state_dir = ".stanza"
pattern_type = "legacy"
text_extensions = ["md", "html"]

[site.attributes]
base_url = "https://example.com"
drafts = false
revision = 4
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.state_dir, PathBuf::from(".stanza"));
        assert_eq!(config.pattern_type, PatternType::Legacy);
        assert_eq!(config.text_extensions, vec!["md", "html"]);
        assert_eq!(
            config.attributes.get("base_url"),
            Some(&AttributeValue::from("https://example.com"))
        );
        assert_eq!(
            config.attributes.get("drafts"),
            Some(&AttributeValue::from(false))
        );
        assert_eq!(
            config.attributes.get("revision"),
            Some(&AttributeValue::from(4i64))
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let toml = r#"
[site]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(field) if field == "site.name"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = load_config_from_str("[site\nname = demo").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[site]\nname = \"on-disk\"\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.name, "on-disk");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
