use anyhow::{bail, Context, Result};
use clap::Parser;
use handy_reaper::{
    check_username, default_platforms, filter_platforms, load_proxy_list, print_banner,
    print_summary, save_report, validate_platforms, ProxyConfig, ReaperConfig, ReportAssembler,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "handy-reaper",
    version,
    about = "🔥 HANDY REAPER - username reconnaissance across social platforms"
)]
struct Args {
    /// Target username to investigate
    username: String,

    /// HTTP/SOCKS proxy for every request
    #[arg(long)]
    proxy: Option<String>,

    /// File with one proxy per line, rotated round-robin
    #[arg(long)]
    proxy_list: Option<PathBuf>,

    /// Output directory for the JSON report
    #[arg(long, default_value = "reports")]
    output_dir: PathBuf,

    /// Don't save results
    #[arg(long)]
    no_save: bool,

    /// Domain to run DNS reconnaissance on (repeatable)
    #[arg(long = "domain")]
    domains: Vec<String>,

    /// Comma-separated platform names to check (case-insensitive)
    #[arg(long, value_delimiter = ',')]
    platforms: Option<Vec<String>>,

    /// Probes launched together per batch
    #[arg(long)]
    batch_size: Option<usize>,
}

fn setup_tracing() {
    // tokio-console replaces normal logging when requested
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        info!("tokio-console enabled on port 6669");
        return;
    }

    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,handy_reaper=debug"))
    };

    let log_path =
        std::env::var("REAPER_LOG_FILE").unwrap_or_else(|_| "osint_reaper.log".to_string());
    let (file_layer, file_error) =
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(Mutex::new(file))
                        .with_filter(env_filter()),
                ),
                None,
            ),
            Err(e) => (None, Some(e)),
        };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!("Not writing log file {}: {}", log_path, e);
    }
}

fn proxy_config(args: &Args) -> Result<ProxyConfig> {
    let mut config = match &args.proxy_list {
        Some(path) => {
            let proxies = load_proxy_list(path)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to load proxy list")?;
            ProxyConfig::with_rotation(proxies)
        }
        None => ProxyConfig::default(),
    };

    if let Some(proxy) = &args.proxy {
        config.enabled = true;
        config.static_proxy = Some(proxy.clone());
    }

    Ok(config)
}

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} platforms ({percent}%) {msg}";

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("#>-"),
    );
    Ok(progress)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    setup_tracing();

    let args = Args::parse();
    if let Err(e) = check_username(&args.username) {
        bail!(e);
    }
    let username = args.username.as_str();
    print_banner();

    let mut config = ReaperConfig::from_env();
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size.max(1);
    }

    let platforms = filter_platforms(default_platforms(), args.platforms.as_deref());
    validate_platforms(&platforms).map_err(|e| anyhow::anyhow!(e))?;

    let assembler = ReportAssembler::new(config.clone(), proxy_config(&args)?)
        .with_progress(progress_bar(platforms.len())?);

    info!(
        "Scanning {} platforms in batches of {} ({} attempts each, {} req/{}s per platform)",
        platforms.len(),
        config.batch_size,
        config.max_retries,
        config.max_requests,
        config.time_window.as_secs()
    );

    let report = tokio::select! {
        report = assembler.run(username, &platforms, &args.domains) => report,
        _ = tokio::signal::ctrl_c() => {
            info!("Scan interrupted by user");
            return Ok(());
        }
    };

    print_summary(&report);

    if !args.no_save {
        match save_report(&report, username, &args.output_dir) {
            Ok(path) => println!("📄 Full report: {}", path.display()),
            Err(e) => error!("Failed to save report: {}", e),
        }
    }

    Ok(())
}
