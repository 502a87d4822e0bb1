mod app;
mod config;
mod event;
mod net;
mod theme;
mod ui;

use app::ConsoleApp;
use clap::Parser;
use config::{store, ConsoleConfig};
use eframe::egui;
use net::ConsoleClient;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use theme::Theme;
use tracing_subscriber::EnvFilter;
use ui::runtime::PageRuntime;

const DEMO_PAGE: &str = include_str!("ui/pages/create_report.json");

#[derive(Debug, Parser)]
#[command(name = "reportdesk", version, about = "Desktop console for the report builder")]
struct Cli {
    /// Config file; defaults to ~/.reportdesk/config.json.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Page description to load instead of the configured one.
    #[arg(long)]
    page: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    debounce_ms: Option<u64>,
    /// Write the effective config back to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut ConsoleConfig) {
        if let Some(page) = &self.page {
            config.page_file = Some(page.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.search_debounce_ms = debounce_ms;
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reportdesk=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(store::default_path);
    let mut config = store::load(&config_path)?;
    cli.apply(&mut config);

    if cli.write_default_config {
        store::save(&config_path, &config)?;
        tracing::info!(path = %config_path.display(), "config written");
        return Ok(());
    }

    let (page_source, raw_page) = match &config.page_file {
        Some(path) => (path.display().to_string(), fs::read_to_string(path)?),
        None => ("demo page".to_string(), DEMO_PAGE.to_string()),
    };

    let mut page_runtime = PageRuntime::new(config.page_settings());
    if let Err(err) = page_runtime.load_page_json(&raw_page) {
        tracing::error!(source = %page_source, %err, "page did not load");
    }

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("reportdesk-runtime")
        .build()?;

    let client = runtime.block_on(async {
        ConsoleClient::new(&config.base_url, config.method_override_field.clone(), tx)
    })?;

    let app = ConsoleApp::new(rx, client, page_runtime, page_source);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Report Desk",
        native_options,
        Box::new(move |creation_context| {
            Theme::default().apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
