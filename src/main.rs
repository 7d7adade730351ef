//! dossier: automated forensic triage for suspect PDF files

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dossier_core::DossierConfig;
use dossier_oracle::{AnthropicOracle, DecisionClient, Oracle, ScriptedOracle};
use dossier_tools::{ToolBench, ToolManifest};
use dossier_triage::{Investigator, InvestigatorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "dossier",
    about = "Automated forensic triage for suspect PDF files"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, default_value = "dossier.toml")]
    config: PathBuf,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Investigate one or more candidate files
    Scan {
        /// Candidate PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Root directory for per-case session output
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Override the interrogation step cap
        #[arg(long)]
        max_steps: Option<u32>,
        /// Run without the remote oracle; every case closes with a
        /// conservative scripted walkthrough
        #[arg(long, default_value_t = false)]
        offline: bool,
        /// Skip the hashing/URL extraction pass
        #[arg(long, default_value_t = false)]
        no_extract: bool,
    },
    /// Print the tool manifest as the oracle sees it
    Manifest,
    /// Print the effective configuration as TOML
    Config,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    let mut config = DossierConfig::load(&cli.config);

    match cli.command {
        Commands::Scan {
            files,
            output_dir,
            max_steps,
            offline,
            no_extract,
        } => {
            if let Some(dir) = output_dir {
                config.output.root = dir.display().to_string();
            }
            if let Some(cap) = max_steps {
                config.limits.max_steps = cap;
            }
            run_scan(config, files, offline, no_extract).await?;
        }
        Commands::Manifest => {
            let manifest = ToolManifest::new();
            println!("{}", serde_json::to_string_pretty(&manifest.for_oracle())?);
        }
        Commands::Config => {
            print!("{}", config.to_toml());
        }
        Commands::Version => {
            println!("dossier v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Stderr logging always; an extra non-ANSI file layer when requested.
/// The guard must stay alive until exit so buffered lines flush.
fn init_tracing(
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dossier=info".into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "dossier.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            Ok(None)
        }
    }
}

async fn run_scan(
    config: DossierConfig,
    files: Vec<PathBuf>,
    offline: bool,
    no_extract: bool,
) -> anyhow::Result<()> {
    // In offline mode each case gets its own scripted oracle since the
    // walkthrough responses are consumed as they are served.
    let shared_oracle: Option<Arc<dyn Oracle>> = if offline {
        info!("offline mode: cases close with the scripted walkthrough");
        None
    } else {
        Some(remote_oracle(&config)?)
    };

    let output_root = PathBuf::from(&config.output.root);
    std::fs::create_dir_all(&output_root)
        .with_context(|| format!("cannot create output root {}", output_root.display()))?;

    let total = files.len();
    let jobs = files.into_iter().map(|file| {
        let oracle = shared_oracle
            .clone()
            .unwrap_or_else(|| Arc::new(ScriptedOracle::conservative_walkthrough()));
        let config = config.clone();
        let output_root = output_root.clone();
        async move { investigate_file(&file, oracle, &config, &output_root, no_extract).await }
    });
    let outcomes = futures::future::join_all(jobs).await;

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    info!(total, failed, "scan finished");
    if failed > 0 {
        anyhow::bail!("{} of {} investigations failed", failed, total);
    }
    Ok(())
}

async fn investigate_file(
    path: &Path,
    oracle: Arc<dyn Oracle>,
    config: &DossierConfig,
    output_root: &Path,
    no_extract: bool,
) -> anyhow::Result<()> {
    // Extraction is a collaborator, not a gate: its failure is logged
    // and the investigation proceeds without the metadata.
    let extraction = if no_extract {
        None
    } else {
        match dossier_extract::extract(path).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "extraction failed; continuing without it");
                None
            }
        }
    };

    let session_dir = session_dir_for(output_root, path);
    std::fs::create_dir_all(&session_dir)
        .with_context(|| format!("cannot create session dir {}", session_dir.display()))?;

    let bench = ToolBench::new(config, session_dir.clone());
    let client = DecisionClient::new(oracle);
    let investigator = Investigator::new(client, bench, InvestigatorConfig::from_config(config));

    let report = match investigator.run(path, extraction).await {
        Ok(report) => report,
        Err(e) => {
            error!(file = %path.display(), error = %e, "investigation aborted");
            return Err(e.into());
        }
    };

    let report_path = session_dir.join("report.json");
    std::fs::write(&report_path, report.to_json_pretty()?)
        .with_context(|| format!("cannot write {}", report_path.display()))?;
    println!(
        "{}: {} ({}, {} steps) -> {}",
        path.display(),
        report.verdict,
        report.termination_reason,
        report.step_count,
        report_path.display()
    );
    Ok(())
}

/// `<root>/<file_stem>_<timestamp>/`, one directory per case.
fn session_dir_for(output_root: &Path, file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "candidate".to_string());
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    output_root.join(format!("{}_{}", stem, stamp))
}

fn remote_oracle(config: &DossierConfig) -> anyhow::Result<Arc<dyn Oracle>> {
    let api_key = std::env::var(&config.oracle.api_key_env).with_context(|| {
        format!(
            "{} is not set; export it or pass --offline",
            config.oracle.api_key_env
        )
    })?;
    let mut oracle = AnthropicOracle::new(api_key, config.oracle.model.clone())
        .with_max_tokens(config.oracle.max_tokens);
    if !config.oracle.base_url.is_empty() {
        oracle = oracle.with_base_url(config.oracle.base_url.clone());
    }
    info!(model = %config.oracle.model, "using the Anthropic oracle");
    Ok(Arc::new(oracle))
}
