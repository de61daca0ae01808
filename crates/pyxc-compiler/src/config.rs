//! config.rs : configuration de la traduction.
//!
//! Couches, de la plus faible à la plus forte :
//! - defaults (`TranspileConfig::default()`)
//! - fichier `pyxc.toml` (`TranspileConfig::load`)
//! - ENV `PYXC_*` (`apply_env`)
//! - overrides CLI (`CliOverrides`, appliqués avec `apply_cli_overrides`)
//!
//! ENV supportés (tous facultatifs) :
//!   PYXC_INDENT_WIDTH=<1..=16>
//!   PYXC_INT_TYPE=long long|int|int64_t
//!   PYXC_HEADER_COMMENT=0|1

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_INDENT_WIDTH: &str = "PYXC_INDENT_WIDTH";
pub const ENV_INT_TYPE: &str = "PYXC_INT_TYPE";
pub const ENV_HEADER_COMMENT: &str = "PYXC_HEADER_COMMENT";

/// Nom de fichier cherché par la CLI dans le répertoire courant.
pub const CONFIG_FILE_NAME: &str = "pyxc.toml";

const MAX_INDENT_WIDTH: usize = 16;

/* ─────────────────────────── Types publics ─────────────────────────── */

/// Représentation C++ des valeurs Integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntType {
    #[default]
    #[serde(rename = "long long")]
    LongLong,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "int64_t")]
    Int64,
}

impl IntType {
    /// Spelling C++ utilisé dans les déclarations.
    pub const fn as_cpp(self) -> &'static str {
        match self {
            Self::LongLong => "long long",
            Self::Int => "int",
            Self::Int64 => "std::int64_t",
        }
    }

    pub const fn needs_cstdint(self) -> bool {
        matches!(self, Self::Int64)
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LongLong => "long long",
            Self::Int => "int",
            Self::Int64 => "int64_t",
        })
    }
}

impl FromStr for IntType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match norm.as_str() {
            "long long" | "longlong" => Ok(Self::LongLong),
            "int" => Ok(Self::Int),
            "int64_t" | "std::int64_t" | "int64" => Ok(Self::Int64),
            _ => Err(ConfigError::invalid("int_type", s, "expected `long long`, `int` or `int64_t`")),
        }
    }
}

/// Réglages de génération/émission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspileConfig {
    /// Espaces par niveau d'indentation dans le C++ produit.
    pub indent_width: usize,
    pub int_type: IntType,
    /// Commentaire "generated by" en tête de fichier.
    pub header_comment: bool,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            int_type: IntType::LongLong,
            header_comment: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for `{key}`: {reason}")]
    InvalidValue { key: String, value: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, value: impl fmt::Display, reason: &str) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            value: value.to_string(),
            reason: reason.to_owned(),
        }
    }
}

/* ─────────────────────── Overrides (CLI / couches) ─────────────────────── */

/// Overrides "dernier mot" fournis par la CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub indent_width: Option<usize>,
    pub int_type: Option<IntType>,
    pub header_comment: Option<bool>,
}

impl TranspileConfig {
    /// Lit et valide un `pyxc.toml`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        log::debug!("config: loaded {}", path.display());
        Ok(cfg)
    }

    /// Parse un texte TOML (chemin fictif `<inline>` dans les erreurs).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults + ENV.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Applique les variables `PYXC_*` du processus.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Comme `apply_env`, avec une source de variables injectable (tests).
    pub fn apply_env_from(mut self, get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = get(ENV_INDENT_WIDTH) {
            self.indent_width = parse_usize(&v).ok_or_else(|| ConfigError::invalid(ENV_INDENT_WIDTH, &v, "expected an integer"))?;
        }
        if let Some(v) = get(ENV_INT_TYPE) {
            self.int_type = v.parse().map_err(|_| {
                ConfigError::invalid(ENV_INT_TYPE, &v, "expected `long long`, `int` or `int64_t`")
            })?;
        }
        if let Some(v) = get(ENV_HEADER_COMMENT) {
            self.header_comment = parse_bool(&v).ok_or_else(|| ConfigError::invalid(ENV_HEADER_COMMENT, &v, "expected 0/1, true/false, yes/no or on/off"))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn apply_cli_overrides(&mut self, o: &CliOverrides) {
        if let Some(x) = o.indent_width   { self.indent_width = x; }
        if let Some(x) = o.int_type       { self.int_type = x; }
        if let Some(x) = o.header_comment { self.header_comment = x; }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indent_width == 0 || self.indent_width > MAX_INDENT_WIDTH {
            return Err(ConfigError::invalid(
                "indent_width",
                self.indent_width,
                "must be between 1 and 16",
            ));
        }
        Ok(())
    }
}

/* ────────────────────────── Parsing d'ENV ────────────────────────── */

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_usize(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok()
}

/* ───────────────────────────── Tests ───────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_sane() {
        let c = TranspileConfig::default();
        assert_eq!(c.indent_width, 4);
        assert_eq!(c.int_type, IntType::LongLong);
        assert!(c.header_comment);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn toml_fields_are_optional() {
        let c = TranspileConfig::from_toml_str("int_type = \"int64_t\"\n").unwrap();
        assert_eq!(c.int_type, IntType::Int64);
        assert_eq!(c.indent_width, 4);

        let c = TranspileConfig::from_toml_str("indent_width = 2\nheader_comment = false\nint_type = \"long long\"").unwrap();
        assert_eq!(c.indent_width, 2);
        assert!(!c.header_comment);
    }

    #[test]
    fn toml_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(TranspileConfig::from_toml_str("indent = 2"), Err(ConfigError::Toml { .. })));
        assert!(matches!(TranspileConfig::from_toml_str("int_type = \"short\""), Err(ConfigError::Toml { .. })));
        assert!(matches!(
            TranspileConfig::from_toml_str("indent_width = 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn env_overrides_defaults() {
        let c = TranspileConfig::default()
            .apply_env_from(env(&[(ENV_INDENT_WIDTH, "2"), (ENV_INT_TYPE, "int"), (ENV_HEADER_COMMENT, "off")]))
            .unwrap();
        assert_eq!(c, TranspileConfig { indent_width: 2, int_type: IntType::Int, header_comment: false });
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let err = TranspileConfig::default().apply_env_from(env(&[(ENV_HEADER_COMMENT, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("PYXC_HEADER_COMMENT"), "{err}");
        let err = TranspileConfig::default().apply_env_from(env(&[(ENV_INDENT_WIDTH, "40")])).unwrap_err();
        assert!(err.to_string().contains("between 1 and 16"), "{err}");
    }

    #[test]
    fn cli_overrides_last_word() {
        let mut c = TranspileConfig::default().apply_env_from(env(&[(ENV_INT_TYPE, "int")])).unwrap();
        c.apply_cli_overrides(&CliOverrides { int_type: Some(IntType::Int64), ..CliOverrides::default() });
        assert_eq!(c.int_type, IntType::Int64);
        assert_eq!(c.indent_width, 4);
    }

    #[test]
    fn int_type_parse() {
        assert_eq!("long  long".parse::<IntType>().unwrap(), IntType::LongLong);
        assert_eq!("std::int64_t".parse::<IntType>().unwrap(), IntType::Int64);
        assert!("float".parse::<IntType>().is_err());
        assert_eq!(IntType::Int64.as_cpp(), "std::int64_t");
    }
}
