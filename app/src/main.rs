use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tablescope_adapters::export::DirectoryExporter;
use tablescope_adapters::http::HttpConsoleBackend;
use tablescope_core::config::{self, ConsoleConfig};
use tablescope_core::connectivity::{ConnectionIndicator, ConnectivityMonitor};
use tablescope_core::session::SessionController;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tablescope=info";

type TuiRunner = fn(
    SessionController<HttpConsoleBackend>,
    Vec<u32>,
    &Handle,
) -> Result<(), tablescope_tui::TuiError>;

#[derive(Parser, Debug, Default)]
#[command(version, about = "Terminal console for browsing remote SQLite databases", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Base URL of the console API, e.g. http://127.0.0.1:3000/api
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    /// Directory CSV exports are written to
    #[arg(long)]
    export_dir: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<ConsoleConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_default()?,
        };

        if let Some(api_url) = &self.api_url {
            config.api_url.clone_from(api_url);
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(export_dir) = &self.export_dir {
            config.export_dir = Some(export_dir.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        config.normalize();
        Ok(config)
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    report_subscriber_install(installed, &mut std::io::stderr())
}

fn report_subscriber_install(
    installed: Result<(), Box<dyn std::error::Error + Send + Sync>>,
    out: &mut impl Write,
) -> Result<(), std::io::Error> {
    if let Err(error) = installed {
        writeln!(out, "tablescope: logging disabled, subscriber install failed: {error}")?;
    }
    Ok(())
}

fn run_app(config: &ConsoleConfig, run_tui: TuiRunner) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let backend = Arc::new(HttpConsoleBackend::new(&config.api_url)?);
    let indicator = ConnectionIndicator::new();
    let mut monitor = {
        let _guard = runtime.enter();
        ConnectivityMonitor::new(Arc::clone(&backend), indicator.clone())
            .spawn(config.poll_interval())
    };

    tracing::info!(api_url = %backend.base_url(), "starting console session");
    let session = SessionController::new(
        backend,
        Box::new(DirectoryExporter::new(config.export_dir())),
        indicator,
        config.page_size,
    );

    let result = run_tui(session, config.page_size_options.clone(), runtime.handle());
    monitor.stop();
    result?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(config.log_file.as_deref())?;
    run_app(&config, tablescope_tui::run)
}
