//! One-shot command line front end for the DNS health analysis engine.
//!
//! Prints the analysis report as JSON on stdout; diagnostics go to stderr.
//!
//! ```text
//! dns-doctor example.com
//! dns-doctor example.com --checks ns,mx,spf --pretty
//! dns-doctor example.com --tld-data ./detailed_tlds.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dns_doctor_engine::{AnalyzerEngine, TldRegistry};

#[derive(Parser, Debug)]
#[command(name = "dns-doctor", version, about = "DNS health analyzer")]
struct Cli {
    /// Domain to analyze (e.g. example.com).
    domain: String,

    /// Comma-separated subset of checks to run (default: all).
    ///
    /// Recognized: ns, soa, a, aaaa, mx, spf, txt, cname, ptr, caa, dmarc,
    /// dkim, glue, dnssec, axfr, wildcard, www, domain_status.
    #[arg(long, value_delimiter = ',')]
    checks: Vec<String>,

    /// Path to a TLD nameserver JSON file (default: embedded data).
    #[arg(long, value_name = "FILE")]
    tld_data: Option<PathBuf>,

    /// Pretty-print the report JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let registry = match &cli.tld_data {
        Some(path) => match TldRegistry::from_file(path) {
            Ok(registry) => registry,
            Err(err) => {
                log::warn!("Falling back to embedded TLD data: {err}");
                TldRegistry::builtin()
            }
        },
        None => TldRegistry::builtin(),
    };

    let engine = AnalyzerEngine::new(registry);
    let report = match engine.analyze(&cli.domain, &cli.checks).await {
        Ok(report) => report,
        Err(err) => {
            match serde_json::to_string(&err) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            return ExitCode::from(2);
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Failed to serialize report: {err}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_checks_split_on_commas() {
        let cli = Cli::parse_from(["dns-doctor", "example.com", "--checks", "ns,mx,spf"]);
        assert_eq!(cli.checks, vec!["ns", "mx", "spf"]);
        assert_eq!(cli.domain, "example.com");
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dns-doctor", "example.com"]);
        assert!(cli.checks.is_empty());
        assert!(cli.tld_data.is_none());
        assert!(!cli.pretty);
    }
}
