//! tapcert - provision a local interception CA and a signed server
//! certificate for one domain.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tapcert_ca::{ensure_config, issue_ca, issue_leaf, CaIdentity, CaPaths, CertificateInfo, LeafIdentity};

/// Provision a local certificate authority and issue a server certificate
/// for a single domain, for TLS interception testing.
///
/// Configuration templates are created on first use and never overwritten;
/// the CA itself is regenerated on every run, so re-running the tool
/// rotates the CA and invalidates previously issued certificates.
#[derive(Parser, Debug)]
#[command(name = "tapcert")]
#[command(author, version, about)]
struct Cli {
    /// Domain to issue the server certificate for
    #[arg(long, default_value = "api.openai.com")]
    domain: String,

    /// Storage directory for CA artifacts
    #[arg(long, default_value = "ca")]
    dir: PathBuf,

    /// Emit a JSON issuance summary instead of progress output
    #[arg(long)]
    json: bool,

    /// Increase log verbosity
    #[arg(short, long)]
    verbose: bool,
}

/// Machine-readable summary of one provisioning run.
#[derive(Serialize)]
struct IssueSummary {
    domain: String,
    ca_certificate: PathBuf,
    certificate: PathBuf,
    private_key: PathBuf,
    ca: CertificateInfo,
    leaf: CertificateInfo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let paths = CaPaths::new(&cli.dir);

    ensure_config(&paths, &cli.domain)?;

    if !cli.json {
        println!("{}", "Generating CA certificate...".bright_cyan());
    }
    let ca = issue_ca(&paths)?;

    if !cli.json {
        println!(
            "{}",
            format!("Issuing server certificate for {}...", cli.domain).bright_cyan()
        );
    }
    let leaf = issue_leaf(&paths, &cli.domain)?;

    if cli.json {
        let summary = IssueSummary {
            domain: leaf.domain.clone(),
            ca_certificate: paths.ca_cert(),
            certificate: leaf.cert_path.clone(),
            private_key: leaf.key_path.clone(),
            ca: ca.info.clone(),
            leaf: leaf.info.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&paths, &ca, &leaf);
    }

    Ok(())
}

fn print_summary(paths: &CaPaths, ca: &CaIdentity, leaf: &LeafIdentity) {
    println!();
    println!(
        "  {} {}",
        "CA certificate".bright_white(),
        paths.ca_cert().display().to_string().dimmed()
    );
    println!(
        "  {} {}",
        "server cert  ".bright_white(),
        leaf.cert_path.display().to_string().dimmed()
    );
    println!(
        "  {} {}",
        "server key   ".bright_white(),
        leaf.key_path.display().to_string().dimmed()
    );
    println!(
        "  {} {}",
        "valid until  ".bright_white(),
        leaf.info.not_after.format("%Y-%m-%d").to_string().dimmed()
    );
    println!();
    println!(
        "{}",
        format!("All certificates generated; trust {} to intercept {}.", ca.info.subject, leaf.domain)
            .bright_green()
    );
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
