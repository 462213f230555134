// src/config/mod.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use url::Url;

/// Full tool configuration. Every field has a default matching the report
/// pages this tool was written for, so running without a config file works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub selectors: SelectorConfig,
    /// Fixed UTC offset such as `+10:00` for the rendered local time.
    /// Absent means the machine's local timezone.
    pub timezone: Option<String>,
    /// Tooltip attached to the localized-time element.
    pub tooltip: String,
    /// Shared visual classes added to every table.
    pub table_classes: Vec<String>,
    pub classification: ClassificationConfig,
    pub interactive: InteractiveConfig,
    pub library: LibraryConfig,
}

/// CSS selectors locating the two timestamp display elements.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub utc_time: String,
    pub local_time: String,
}

/// Rules deciding which tables stay static. Evaluated in order, first hit
/// wins; the column threshold applies only when no heading rule matched.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    pub static_headings: Vec<HeadingRule>,
    pub max_static_columns: usize,
}

/// A heading substring that forces a table static, optionally keeping the
/// search box.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadingRule {
    pub contains: String,
    #[serde(default)]
    pub searchable: bool,
}

/// Knobs for fully interactive tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractiveConfig {
    pub page_length: u32,
    /// Selectable page sizes; an "All" entry is appended automatically.
    pub length_sizes: Vec<u32>,
    /// Column ordered ascending by default when its header is present.
    pub default_order_column: String,
}

/// How the enhanced page reaches the table-enhancement library.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    /// Global constructor the loader snippet hands each table to.
    pub constructor: String,
    /// Stylesheet URLs injected into `<head>` when missing.
    pub styles: Vec<String>,
    /// Script URLs injected into `<head>` when missing.
    pub scripts: Vec<String>,
    /// Append the loader snippet before `</body>`.
    pub inject_loader: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            selectors: SelectorConfig::default(),
            timezone: None,
            tooltip: "Report time in your local timezone".to_string(),
            table_classes: vec![
                "table".to_string(),
                "table-striped".to_string(),
                "table-hover".to_string(),
            ],
            classification: ClassificationConfig::default(),
            interactive: InteractiveConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            utc_time: "#utc-time".to_string(),
            local_time: "#local-time".to_string(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        ClassificationConfig {
            // "Historical Releases" before "Summary": a heading mentioning
            // both stays searchable.
            static_headings: vec![
                HeadingRule {
                    contains: "Historical Releases".to_string(),
                    searchable: true,
                },
                HeadingRule {
                    contains: "Summary".to_string(),
                    searchable: false,
                },
                HeadingRule {
                    contains: "Current Release Context".to_string(),
                    searchable: false,
                },
            ],
            max_static_columns: 3,
        }
    }
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        InteractiveConfig {
            page_length: 25,
            length_sizes: vec![10, 25, 50, 100],
            default_order_column: "Extension".to_string(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            constructor: "DataTable".to_string(),
            styles: Vec::new(),
            scripts: Vec::new(),
            inject_loader: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, or the defaults when `path` is
    /// `None`. The result is validated either way.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                serde_yaml::from_str(&text)
                    .with_context(|| format!("parsing config file {}", p.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(tz) = &self.timezone {
            parse_fixed_offset(tz)?;
        }
        if !is_js_path(&self.library.constructor) {
            bail!(
                "library constructor `{}` is not a plain identifier path",
                self.library.constructor
            );
        }
        for u in self.library.styles.iter().chain(&self.library.scripts) {
            Url::parse(u).with_context(|| format!("invalid library URL `{}`", u))?;
        }
        if self.classification.max_static_columns == 0 {
            bail!("classification.max_static_columns must be at least 1");
        }
        Ok(())
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset string into a chrono `FixedOffset`.
pub fn parse_fixed_offset(s: &str) -> Result<chrono::FixedOffset> {
    let raw = s.trim();
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1i32, &raw[1..]),
        Some(b'-') => (-1i32, &raw[1..]),
        _ => bail!("timezone `{}` must start with `+` or `-`", s),
    };
    let (hh, mm) = rest
        .split_once(':')
        .with_context(|| format!("timezone `{}` must look like +HH:MM", s))?;
    let hours: i32 = hh
        .parse()
        .with_context(|| format!("bad hour field in timezone `{}`", s))?;
    let minutes: i32 = mm
        .parse()
        .with_context(|| format!("bad minute field in timezone `{}`", s))?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("timezone `{}` is out of range", s);
    }
    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("timezone `{}` is out of range", s))
}

/// The loader snippet interpolates this name into JavaScript, so only allow
/// dotted identifier paths such as `DataTable` or `$.fn.dataTable`.
fn is_js_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().expect("defaults must validate");
    }

    #[test]
    fn parses_partial_yaml_over_defaults() -> Result<()> {
        let text = r#"
timezone: "+10:00"
interactive:
  page_length: 50
"#;
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        assert_eq!(config.interactive.page_length, 50);
        // untouched sections keep their defaults
        assert_eq!(config.selectors.utc_time, "#utc-time");
        assert_eq!(config.classification.max_static_columns, 3);
        Ok(())
    }

    #[test]
    fn offset_parsing() -> Result<()> {
        assert_eq!(parse_fixed_offset("+10:00")?.local_minus_utc(), 36_000);
        assert_eq!(parse_fixed_offset("-05:30")?.local_minus_utc(), -19_800);
        assert!(parse_fixed_offset("10:00").is_err());
        assert!(parse_fixed_offset("+25:00").is_err());
        assert!(parse_fixed_offset("+aa:00").is_err());
        assert!(parse_fixed_offset("+-1:00").is_err());
        Ok(())
    }

    #[test]
    fn rejects_script_injection_in_constructor() {
        let mut config = Config::default();
        config.library.constructor = "alert(1);//".to_string();
        assert!(config.validate().is_err());
        config.library.constructor = "$.fn.dataTable".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_library_url() {
        let mut config = Config::default();
        config.library.styles = vec!["not a url".to_string()];
        assert!(config.validate().is_err());
    }
}
