//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use brandscan_core::{ScanOrchestrator, ScanPhase, ScanProgress, ScanServices};
use brandscan_services::GatewayClient;
use brandscan_shared::{
    AppConfig, BrandScanResult, ScanDepth, ScanOptions, config_file_path, init_config,
    load_config, validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// brandscan — structured brand intelligence for any web domain.
#[derive(Parser)]
#[command(
    name = "brandscan",
    version,
    about = "Scan a web domain into structured products, pricing, features, and assets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a full scan of a domain.
    Scan {
        /// Domain to scan, e.g. example.com.
        domain: String,

        /// Research depth: quick or thorough.
        #[arg(long, default_value = "thorough")]
        depth: String,

        /// Maximum pages fetched during discovery.
        #[arg(long)]
        max_pages: Option<usize>,

        /// Brand identifier to persist results under. Enables the sync phase.
        #[arg(long)]
        brand_id: Option<String>,

        /// Skip persisting results even when a brand id is given.
        #[arg(long)]
        skip_sync: bool,

        /// Print the full result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Run a shallow five-page scan with no persistence.
    Quick {
        /// Domain to scan, e.g. example.com.
        domain: String,

        /// Print the full result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brandscan=info",
        1 => "brandscan=debug",
        _ => "brandscan=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scan {
            domain,
            depth,
            max_pages,
            brand_id,
            skip_sync,
            json,
        } => {
            cmd_scan(
                &domain,
                &depth,
                max_pages,
                brand_id,
                skip_sync,
                json,
            )
            .await
        }
        Command::Quick { domain, json } => cmd_quick(&domain, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Scan commands
// ---------------------------------------------------------------------------

async fn cmd_scan(
    domain: &str,
    depth: &str,
    max_pages: Option<usize>,
    brand_id: Option<String>,
    skip_sync: bool,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let depth: ScanDepth = depth.parse().map_err(|e: String| eyre!(e))?;
    let options = ScanOptions {
        depth,
        max_pages: max_pages.unwrap_or(config.defaults.max_pages),
        brand_id,
        skip_sync,
    };

    info!(domain, depth = ?options.depth, max_pages = options.max_pages, "starting scan");

    let orchestrator = build_orchestrator(&config)?;
    let progress = CliProgress::new();
    let result = orchestrator.scan_brand(domain, options, &progress).await;
    progress.finish();

    report(&result, json)
}

async fn cmd_quick(domain: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    info!(domain, "starting quick scan");

    let orchestrator = build_orchestrator(&config)?;
    let progress = CliProgress::new();
    let result = orchestrator
        .scan_brand(domain, ScanOptions::quick(), &progress)
        .await;
    progress.finish();

    report(&result, json)
}

fn build_orchestrator(config: &AppConfig) -> Result<ScanOrchestrator> {
    let gateway = Arc::new(GatewayClient::from_config(config)?);
    let services = ScanServices {
        search: gateway.clone(),
        companies: gateway.clone(),
        scraper: gateway.clone(),
        completion: gateway.clone(),
        store: gateway,
    };
    Ok(ScanOrchestrator::new(services, config))
}

fn report(result: &BrandScanResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&summary_json(result))?);
        return Ok(());
    }

    println!();
    println!("  Scan complete for {}", result.brand.domain);
    println!("  Scan ID:     {}", result.scan_id);
    println!("  Brand:       {} ({})", result.brand.name, result.brand.business_type);
    println!("  Products:    {}", result.products.len());
    println!(
        "  Pricing:     {}",
        result
            .pricing
            .as_ref()
            .map(|p| format!("{} ({} tiers)", p.pricing.model, p.pricing.tiers.len()))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Features:    {}", result.features.len());
    println!("  Assets:      {}", result.assets.len());
    println!("  Confidence:  {:.2}", result.confidence);
    if result.synced_entities > 0 {
        println!("  Synced:      {} entities", result.synced_entities);
    }
    println!("  Time:        {:.1}s", result.duration.as_secs_f64());
    if !result.errors.is_empty() {
        println!();
        println!("  Completed with {} warning(s):", result.errors.len());
        for error in &result.errors {
            println!("    - {error}");
        }
    }
    let needs_review = result.products.iter().filter(|p| p.needs_review).count();
    if needs_review > 0 {
        println!("  {needs_review} product(s) need manual review.");
    }
    println!();

    Ok(())
}

/// JSON view of the scan result for scripted callers.
fn summary_json(result: &BrandScanResult) -> serde_json::Value {
    serde_json::json!({
        "scan_id": result.scan_id,
        "brand": result.brand,
        "products": result.products,
        "pricing": result.pricing,
        "features": result.features,
        "assets": result.assets,
        "confidence": result.confidence,
        "duration_secs": result.duration.as_secs_f64(),
        "errors": result.errors,
        "synced_entities": result.synced_entities,
    })
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created at {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;
    println!("# resolved from {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Scan progress rendered as an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ScanProgress for CliProgress {
    fn phase_started(&self, phase: ScanPhase) {
        let message = match phase {
            ScanPhase::Research => "Researching brand context...",
            ScanPhase::Discovery => "Discovering site pages...",
            ScanPhase::Extraction => "Extracting products and pricing...",
            ScanPhase::Validation => "Validating extracted entities...",
            ScanPhase::Sync => "Persisting results...",
        };
        self.spinner.set_message(message);
    }

    fn phase_completed(&self, phase: ScanPhase, duration: std::time::Duration) {
        self.spinner
            .println(format!("  {phase} done in {:.1}s", duration.as_secs_f64()));
    }
}
