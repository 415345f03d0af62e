//! Settings for the command-line translator: environment first, then
//! arguments on top.
use std::env;

use strum_macros::{Display, EnumString};

use crate::to_spel::{MappingError, OperatorMap, PrinterConfig};

pub const CONTEXT_VAR: &str = "MSSQL_SPEL_CONTEXT";
pub const FORMAT_VAR: &str = "MSSQL_SPEL_FORMAT";
pub const MAP_VAR: &str = "MSSQL_SPEL_MAP";
pub const LOG_VAR: &str = "MSSQL_SPEL_LOG";

pub const USAGE: &str = "\
Usage: mssql_spel [OPTIONS] [CLAUSE]

Translates a T-SQL WHERE/HAVING clause or CASE expression to Spring EL.
Reads the clause from stdin when CLAUSE is omitted.

Options:
  --context <PREFIX>   Variable prefix, empty for bare names [default: #root]
  --format <FORMAT>    Output format: text or json [default: text]
  --map <KEY=TEXT>     Override an operator's text, e.g. --map 'EQ= eq '
                       (repeatable; KEY is a tag such as EQ/AND/LIKE or a
                       SQL operator such as = or <>)
  --version            Print version
  -h, --help           Print help

Environment:
  MSSQL_SPEL_CONTEXT, MSSQL_SPEL_FORMAT, MSSQL_SPEL_LOG (default: warn),
  MSSQL_SPEL_MAP (';'-separated KEY=TEXT entries), RUST_LOG";

#[derive(Display, EnumString, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// `Spring EL: <expression>`
    #[default]
    Text,
    /// A JSON record with the input, parsed tree and expression
    Json,
}

/// What the arguments asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Convert,
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown output format `{0}`, expected text or json")]
    UnknownFormat(String),
    #[error("Missing value for {0}")]
    MissingValue(String),
    #[error("Unexpected argument `{0}`")]
    UnexpectedArgument(String),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub printer: PrinterConfig,
    pub format: OutputFormat,
    /// Filter used when RUST_LOG is unset
    pub log_level: String,
    /// None means read stdin
    pub clause: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            format: OutputFormat::default(),
            log_level: "warn".to_string(),
            clause: None,
        }
    }
}

fn parse_format(value: &str) -> Result<OutputFormat, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::UnknownFormat(value.to_string()))
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Like [Settings::from_env] with a custom variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        if let Some(context) = var(CONTEXT_VAR) {
            settings.printer.context = context;
        }
        if let Some(format) = var(FORMAT_VAR) {
            settings.format = parse_format(&format)?;
        }
        if let Some(map) = var(MAP_VAR) {
            settings
                .printer
                .operators
                .apply(map.split(';').filter(|entry| !entry.is_empty()))?;
        }
        if let Some(level) = var(LOG_VAR) {
            settings.log_level = level;
        }
        Ok(settings)
    }

    /// Applies command-line arguments (without the program name). Help and
    ///  version stop processing immediately.
    pub fn apply_args(
        &mut self,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Action, ConfigError> {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
            };
            match arg.as_str() {
                "-h" | "--help" => return Ok(Action::Help),
                "--version" => return Ok(Action::Version),
                "--context" => self.printer.context = value("--context")?,
                "--format" => self.format = parse_format(&value("--format")?)?,
                "--map" => {
                    let entry = value("--map")?;
                    let (tag, text) = OperatorMap::parse_override(&entry)?;
                    self.printer.operators.insert(tag, text);
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnexpectedArgument(arg.clone()));
                }
                _ if self.clause.is_some() => {
                    return Err(ConfigError::UnexpectedArgument(arg.clone()));
                }
                _ => self.clause = Some(arg.clone()),
            }
        }
        Ok(Action::Convert)
    }
}
