//! Optional TOML configuration for the `seqn` binary.
//!
//! Passed with `--config seqn.toml`. Every key is optional, and a flag given
//! on the command line wins over the file.
//!
//! # Example
//!
//! ```toml
//! output = "json"
//! duration_unit = "ms"
//! decimal_precision = 3
//! ```

use std::path::Path;

use serde::Deserialize;
use seqn_core::time::DEFAULT_DECIMAL_PRECISION;
use seqn_core::DurationUnit;

use crate::OutputFormat;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Contents of a config file as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// `"text"` or `"json"`.
    pub output: Option<String>,
    /// Unit for bare numbers in `seqn time parse`.
    pub duration_unit: Option<String>,
    /// Fractional-second digits kept by `seqn time calendar`.
    pub decimal_precision: Option<usize>,
}

/// Effective settings after merging the file with command-line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub output: OutputFormat,
    pub duration_unit: DurationUnit,
    pub decimal_precision: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output: OutputFormat::Text,
            duration_unit: DurationUnit::Seconds,
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config file from `path`.
///
/// Returns a human-readable error string on failure.
pub fn read_config(path: &Path) -> Result<ConfigFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

impl ConfigFile {
    /// Merge onto the defaults. `output_flag` is the `--output` value when it
    /// was given explicitly.
    pub fn resolve(&self, output_flag: Option<OutputFormat>) -> Result<Settings, String> {
        let mut settings = Settings::default();

        if let Some(output) = &self.output {
            settings.output = match output.to_ascii_lowercase().as_str() {
                "text" => OutputFormat::Text,
                "json" => OutputFormat::Json,
                other => {
                    return Err(format!(
                        "invalid output '{}' in config: expected text or json",
                        other
                    ))
                }
            };
        }
        if let Some(flag) = output_flag {
            settings.output = flag;
        }

        if let Some(unit) = &self.duration_unit {
            settings.duration_unit = unit
                .parse()
                .map_err(|e| format!("invalid duration_unit in config: {}", e))?;
        }
        if let Some(precision) = self.decimal_precision {
            settings.decimal_precision = precision;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(file.resolve(None).unwrap(), Settings::default());
    }

    #[test]
    fn file_values_apply() {
        let file: ConfigFile =
            toml::from_str("output = \"json\"\nduration_unit = \"ms\"\ndecimal_precision = 3\n")
                .unwrap();
        let settings = file.resolve(None).unwrap();
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.duration_unit, DurationUnit::Milliseconds);
        assert_eq!(settings.decimal_precision, 3);
    }

    #[test]
    fn flag_wins_over_file() {
        let file: ConfigFile = toml::from_str("output = \"json\"\n").unwrap();
        let settings = file.resolve(Some(OutputFormat::Text)).unwrap();
        assert_eq!(settings.output, OutputFormat::Text);
    }

    #[test]
    fn bad_unit_is_reported() {
        let file: ConfigFile = toml::from_str("duration_unit = \"fortnights\"\n").unwrap();
        let err = file.resolve(None).unwrap_err();
        assert!(err.contains("duration_unit"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(toml::from_str::<ConfigFile>("colour = \"red\"\n").is_err());
    }
}
