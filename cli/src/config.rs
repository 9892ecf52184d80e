use std::path::{Path, PathBuf};

use batch::EncodeOptions;
use docmark::CompileOptions;
use serde::Deserialize;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "docmark.toml";

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub compile: CompileOptions,
    pub batch: EncodeOptions,
}

impl Config {
    pub fn parse(text: &str) -> Result<Config, String> {
        toml::from_str(text).map_err(|e| format!("TOML parse error: {}", e))
    }

    /// Read the explicit config file, or `docmark.toml` if it exists, or
    /// fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Config, String> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.is_file() {
                    return Ok(Config::default());
                }
                path
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        Config::parse(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmark::IndexUnit;
    use std::io::Write;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections() {
        let config = Config::parse(
            "[compile]\nindex_unit = \"utf16\"\n\n[batch]\ncode_font = \"Roboto Mono\"\n",
        )
        .unwrap();
        assert_eq!(config.compile.base_index, 1);
        assert_eq!(config.compile.index_unit, IndexUnit::Utf16);
        assert_eq!(config.batch.code_font, "Roboto Mono");
        assert_eq!(config.batch.bullet_preset, "BULLET_DISC_CIRCLE_SQUARE");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("[compile]\nbase = 3\n").unwrap_err();
        assert!(err.contains("TOML parse error"), "{}", err);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compile]\nbase_index = 42").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.compile.base_index, 42);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.starts_with("cannot read"), "{}", err);
    }
}
