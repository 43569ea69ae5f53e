use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use certcheck_core::units::parse_range;
use certcheck_core::{
    Certificate, CertificateType, Comparator, EngineConfig, OverallStatus, Specification, Tables,
    check_product_match, convert, normalize_unit, parse_value,
};
use certcheck_oracle::{ChatOracle, OracleConfig, RetryPolicy};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod display;

#[derive(Parser)]
#[command(name = "certcheck")]
#[command(about = "Compare supplier certificates (COA, COCA, COC) against product specifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Alternative alias/unit tables (JSON); defaults to the built-in set
    #[arg(long, global = true, env = "CERTCHECK_TABLES")]
    tables: Option<PathBuf>,

    /// Engine thresholds (JSON); omitted fields keep their defaults
    #[arg(long, global = true, env = "CERTCHECK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a certificate against a specification.
    ///
    /// Exit status: 0 PASS, 1 FAIL, 2 REVIEW, 3 error.
    Compare(CompareArgs),

    /// Run the product-identity pre-check on two product names
    Precheck {
        /// Product name on the specification
        spec_name: String,
        /// Product name on the certificate
        cert_name: String,
    },

    /// Show how a raw certificate value is parsed
    ParseValue {
        /// Raw value text, e.g. "<0.5", "ND", "7.90 - 8.20"
        raw: String,
    },

    /// Convert a value between units
    Convert {
        #[arg(allow_negative_numbers = true)]
        value: f64,
        from: String,
        to: String,
    },
}

#[derive(Args)]
struct CompareArgs {
    /// Specification JSON file
    #[arg(long)]
    spec: PathBuf,

    /// Certificate JSON file
    #[arg(long)]
    cert: PathBuf,

    /// Certificate type
    #[arg(long, default_value = "COA")]
    cert_type: CertificateType,

    /// Skip the alignment oracle and use the name matcher only
    #[arg(long)]
    offline: bool,

    /// Print the result record as JSON instead of a card
    #[arg(long)]
    json: bool,

    /// Measurement-temperature gap (°C) tolerated before a parameter goes to REVIEW
    #[arg(long)]
    temperature_tolerance: Option<f64>,

    /// Overall oracle time limit in seconds, retries included
    #[arg(long)]
    oracle_timeout: Option<u64>,

    #[command(flatten)]
    oracle: OracleArgs,
}

#[derive(Args)]
struct OracleArgs {
    /// Chat-completions API root
    #[arg(long, env = "CERTCHECK_ORACLE_URL")]
    oracle_url: Option<String>,

    /// API key for the oracle endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "CERTCHECK_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Sampling temperature
    #[arg(long, env = "CERTCHECK_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    /// Attempts per oracle call, including the first
    #[arg(long, default_value_t = 3)]
    attempts: u32,
}

impl OracleArgs {
    /// An oracle is used only when an endpoint or key was supplied.
    fn configured(&self) -> bool {
        self.oracle_url.is_some() || self.api_key.is_some()
    }

    fn to_config(&self, request_timeout: Duration) -> OracleConfig {
        let defaults = OracleConfig::default();
        OracleConfig {
            base_url: self.oracle_url.clone().unwrap_or(defaults.base_url),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            request_timeout,
            retry: RetryPolicy {
                max_attempts: self.attempts,
                ..RetryPolicy::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let tables = load_tables(cli.tables.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Compare(args) => cmd_compare(args, tables, config).await,
        Command::Precheck {
            spec_name,
            cert_name,
        } => {
            let verdict =
                check_product_match(&spec_name, &cert_name, &tables, &config);
            print!("{}", display::render_precheck(&verdict));
            Ok(ExitCode::from(if verdict.mismatch { 1 } else { 0 }))
        }
        Command::ParseValue { raw } => {
            let parsed = parse_value(&raw, &tables);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            if let Some((lo, hi)) = parse_range(&raw) {
                println!("range: {lo} – {hi}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Convert { value, from, to } => {
            let converted = convert(value, &from, &to, &tables)
                .with_context(|| format!("converting {value} {from} to {to}"))?;
            println!("{converted} {}", normalize_unit(&to, &tables));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_compare(
    args: CompareArgs,
    tables: Arc<Tables>,
    mut config: EngineConfig,
) -> anyhow::Result<ExitCode> {
    let spec: Specification = read_json(&args.spec)?;
    let cert: Certificate = read_json(&args.cert)?;

    if let Some(t) = args.temperature_tolerance {
        config.temperature_tolerance_c = t;
    }
    if let Some(secs) = args.oracle_timeout {
        config.oracle_timeout_secs = secs;
    }

    let mut comparator = Comparator::new().with_tables(tables).with_config(config);
    if args.offline {
        info!("offline: name matcher only");
    } else if args.oracle.configured() {
        let oracle = ChatOracle::new(args.oracle.to_config(comparator.config().oracle_timeout()))
            .context("building oracle client")?;
        comparator = comparator.with_oracle(Arc::new(oracle));
    } else {
        warn!("no oracle endpoint or API key configured; using name matcher only");
    }

    let result = comparator
        .compare(&spec, &cert, args.cert_type)
        .await
        .context("invalid input documents")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", display::render_result(&result));
    }

    Ok(ExitCode::from(match result.overall_status {
        OverallStatus::Pass => 0,
        OverallStatus::Fail => 1,
        OverallStatus::Review => 2,
    }))
}

fn load_tables(path: Option<&Path>) -> anyhow::Result<Arc<Tables>> {
    match path {
        Some(p) => Ok(Arc::new(Tables::from_path(p)?)),
        None => Ok(Tables::builtin()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(p) => {
            let config: EngineConfig = read_json(p)?;
            info!(path = %p.display(), ?config, "loaded engine config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compare_flags_parse() {
        let cli = Cli::try_parse_from([
            "certcheck",
            "compare",
            "--spec",
            "spec.json",
            "--cert",
            "cert.json",
            "--cert-type",
            "coc",
            "--offline",
            "--temperature-tolerance",
            "5",
        ])
        .unwrap();
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.cert_type, CertificateType::Coc);
        assert!(args.offline);
        assert_eq!(args.temperature_tolerance, Some(5.0));
        assert_eq!(args.oracle.attempts, 3);
    }

    #[test]
    fn engine_config_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("certcheck-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "temperature_tolerance_c": 0.5, "min_prefix_len": 4 }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.temperature_tolerance_c, 0.5);
        assert_eq!(config.min_prefix_len, 4);
        assert_eq!(config.oracle_timeout_secs, 60);

        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
        assert!(load_config(Some(Path::new("/nonexistent/config.json"))).is_err());

        let cli = Cli::try_parse_from(["certcheck", "precheck", "a", "b", "--config", "c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn unknown_cert_type_rejected() {
        let parsed = Cli::try_parse_from([
            "certcheck",
            "compare",
            "--spec",
            "s.json",
            "--cert",
            "c.json",
            "--cert-type",
            "invoice",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn oracle_config_from_flags() {
        let args = OracleArgs {
            oracle_url: Some("http://localhost:11434/v1".into()),
            api_key: None,
            model: "llama3".into(),
            temperature: 0.0,
            max_tokens: 2048,
            attempts: 5,
        };
        assert!(args.configured());
        let config = args.to_config(Duration::from_secs(30));
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
