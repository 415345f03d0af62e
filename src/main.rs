use std::{io::Read, process::ExitCode};

use mssql_spel::{
    ast::Expression,
    config::{Action, ConfigError, OutputFormat, Settings, USAGE},
    parser, render_with,
};
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Output of `--format json`
#[derive(Serialize)]
struct Record<'a> {
    input: &'a str,
    parsed: &'a Expression,
    spring_el: &'a str,
}

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parse(#[from] parser::Error),
    #[error("Failed to read the clause from stdin: {0}")]
    Input(#[from] std::io::Error),
    #[error("Failed to encode the result: {0}")]
    Output(#[from] serde_json::Error),
}

impl Failure {
    fn exit_code(&self) -> ExitCode {
        match self {
            // Operator mapping problems are conversion errors
            Failure::Config(ConfigError::Mapping(_)) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(level))
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn settings() -> Result<(Settings, Action), Failure> {
    let mut settings = Settings::from_env()?;
    let action = settings.apply_args(std::env::args().skip(1))?;
    Ok((settings, action))
}

fn run(settings: &Settings) -> Result<String, Failure> {
    let input = match &settings.clause {
        Some(clause) => clause.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim().to_string()
        }
    };
    debug!(%input, format = %settings.format, "converting");

    let tree = parser::parse(&input)?;
    let spring_el = render_with(&tree, &settings.printer);

    Ok(match settings.format {
        OutputFormat::Text => format!("Spring EL: {spring_el}"),
        OutputFormat::Json => serde_json::to_string_pretty(&Record {
            input: &input,
            parsed: &tree,
            spring_el: &spring_el,
        })?,
    })
}

fn main() -> ExitCode {
    let (settings, action) = match settings() {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {e}\n\n{USAGE}");
            return e.exit_code();
        }
    };
    init_logging(&settings.log_level);

    match action {
        Action::Help => println!("{USAGE}"),
        Action::Version => println!("mssql_spel {}", env!("CARGO_PKG_VERSION")),
        Action::Convert => match run(&settings) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                error!(error = %e, "conversion failed");
                eprintln!("Error: {e}");
                return e.exit_code();
            }
        },
    }
    ExitCode::SUCCESS
}
