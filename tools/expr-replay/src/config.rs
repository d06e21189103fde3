//! Replay configuration and expression definitions
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then `EXPR_REPLAY_` environment variables. Nested keys use a double
//! underscore, e.g. `EXPR_REPLAY_EXPRESSION__HISTORY_LIMIT=500`.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use voltage_expr::{parse_postfix, tokenize, Expression, ExpressionConfig};

pub const ENV_PREFIX: &str = "EXPR_REPLAY_";

/// How each replayed record is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// CSV column holding the record time
    pub time_column: String,
    pub format: OutputFormat,
    /// Used when the definition carries no `config` of its own
    pub expression: ExpressionConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            time_column: "time".to_string(),
            format: OutputFormat::Text,
            expression: ExpressionConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Load configuration from an optional YAML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load replay configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_column.trim().is_empty() {
            bail!("time_column must not be empty");
        }
        self.expression.validate()?;
        Ok(())
    }
}

/// Postfix items as a YAML list, or a single whitespace-separated string
#[derive(Debug, Clone, PartialEq)]
pub enum Postfix {
    Items(Vec<String>),
    Source(String),
}

impl Postfix {
    fn items(&self) -> Result<Vec<String>> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Source(source) => Ok(tokenize(source)?),
        }
    }
}

impl<'de> Deserialize<'de> for Postfix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PostfixVisitor;

        impl<'de> Visitor<'de> for PostfixVisitor {
            type Value = Postfix;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of postfix items or a postfix string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Postfix, E> {
                Ok(Postfix::Source(v.to_string()))
            }

            // list items are read as raw scalars so `3` stays the text "3"
            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Postfix, A::Error> {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element::<String>()? {
                    items.push(item);
                }
                Ok(Postfix::Items(items))
            }
        }

        deserializer.deserialize_any(PostfixVisitor)
    }
}

/// A named postfix expression as stored on disk
#[derive(Debug, Clone, Deserialize)]
pub struct Definition {
    pub name: String,
    pub postfix: Postfix,
    #[serde(default)]
    pub config: Option<ExpressionConfig>,
}

impl Definition {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read definition: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid definition: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build and link the expression
    pub fn compile(&self, fallback: &ExpressionConfig) -> Result<Expression> {
        let config = self.config.clone().unwrap_or_else(|| fallback.clone());
        let items = self.postfix.items()?;
        let expr = parse_postfix(&items, config)
            .with_context(|| format!("Failed to compile expression '{}'", self.name))?;
        expr.validate()
            .with_context(|| format!("Expression '{}' is not balanced", self.name))?;
        Ok(expr)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_definition_item_list() {
        let definition = Definition::from_yaml(
            r#"
name: avg_power
postfix: [P, 3, RunningAverage, 1000, /]
"#,
        )
        .unwrap();
        assert_eq!(
            definition.postfix,
            Postfix::Items(
                ["P", "3", "RunningAverage", "1000", "/"]
                    .map(String::from)
                    .to_vec()
            )
        );
        assert!(definition.config.is_none());

        let expr = definition.compile(&ExpressionConfig::default()).unwrap();
        assert!(expr.is_stateful());
        assert_eq!(expr.variable_names().collect::<Vec<_>>(), vec!["P"]);
    }

    #[test]
    fn test_definition_source_string_and_config() {
        let definition = Definition::from_yaml(
            r#"
name: label
postfix: '"kW " P &'
config:
  history_limit: 10
"#,
        )
        .unwrap();
        let expr = definition.compile(&ExpressionConfig::default()).unwrap();
        assert_eq!(expr.config().history_limit, 10);
        assert_eq!(expr.config().synch_resolution_ns, 1_000_000_000);
    }

    #[test]
    fn test_unbalanced_definition_is_rejected() {
        let definition = Definition::from_yaml("name: broken\npostfix: [1, 2]\n").unwrap();
        let err = definition.compile(&ExpressionConfig::default()).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_config_file_layer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "time_column: ts\nformat: json\nexpression:\n  synch_resolution_ns: 60000000000"
        )
        .unwrap();

        let config = ReplayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.time_column, "ts");
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.expression.synch_resolution_ns, 60_000_000_000);
        assert_eq!(config.expression.history_limit, 100_000);
    }

    #[test]
    fn test_config_rejects_invalid_limits() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "expression:\n  history_limit: 0").unwrap();
        assert!(ReplayConfig::load(Some(file.path())).is_err());

        let missing = Path::new("/nonexistent/replay.yaml");
        assert!(ReplayConfig::load(Some(missing)).is_err());
    }
}
