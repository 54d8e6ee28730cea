//! ProfileFan - concurrent customer profile aggregation
//!
//! A CLI tool that seeds latency-bearing in-memory backends and assembles
//! composite customer profiles by fanning lookups out concurrently, or fans
//! an update request out to the backends it touches.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, request parsing, backend failure, etc.)
//!   2 - Customer not found

mod aggregate;
mod backend;
mod cli;
mod config;
mod error;
mod models;
mod report;

use aggregate::{build_runtime, JoinStrategy, ProfileEngine};
use anyhow::{bail, Context, Result};
use backend::{MemoryBackends, Seeder};
use cli::{Args, Command, OutputFormat};
use config::Config;
use models::{CompositeProfile, CustomerId, UpdateRequest};
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit code for a customer with no identity record.
const EXIT_NOT_FOUND: i32 = 2;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    init_logging(&args);

    info!("ProfileFan v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let mut config = load_config(&args);
    config.merge_with_args(&args);

    let runtime = match build_runtime(&config.pool) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start worker pool: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker pool: {} threads", config.pool.worker_threads);

    let exit_code = match runtime.block_on(run(args, config)) {
        Ok(code) => code,
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            1
        }
    };

    drop(runtime);
    std::process::exit(exit_code);
}

/// Handle --init-config: generate a default .profilefan.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize latency, pool size, and seeding.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Config {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        match Config::load(config_path) {
            Ok(config) => return config,
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                return Config::default();
            }
        }
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            config
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Config::default()
        }
    }
}

/// Seed the backends and run the selected command. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let format = config.general.format;

    let stubs = MemoryBackends::new(&config.latency);
    let today = chrono::Local::now().date_naive();
    Seeder::new(config.seed.rng_seed, today).seed(&stubs, config.seed.customers);
    for kind in &args.fail {
        warn!("Injecting failures into the {} backend", kind);
        stubs.fail(*kind);
    }
    let engine = ProfileEngine::new(stubs.backends());

    let Some(command) = args.command else {
        bail!("No command given");
    };

    let code = match command {
        Command::List => {
            let customers = engine.list_customers().await?;
            match format {
                OutputFormat::Text => print!("{}", report::generate_customers_text(&customers)),
                OutputFormat::Json => println!("{}", report::generate_json(&customers)?),
            }
            0
        }
        Command::Show { id, join } => {
            let strategy = join.unwrap_or(config.general.join);
            let profile = engine.fetch_profile(CustomerId(id), strategy).await?;
            print_profile(CustomerId(id), profile.as_ref(), format)?
        }
        Command::Compare { id } => compare_strategies(&engine, CustomerId(id)).await?,
        Command::Update { id, request } => {
            let request = read_request(&request)?;
            engine.update_customer(CustomerId(id), &request).await?;
            let profile = engine
                .fetch_profile(CustomerId(id), config.general.join)
                .await?;
            print_profile(CustomerId(id), profile.as_ref(), format)?
        }
        Command::Replace { id, request } => {
            let request = read_request(&request)?;
            engine.replace_customer(CustomerId(id), &request).await?;
            let profile = engine
                .fetch_profile(CustomerId(id), config.general.join)
                .await?;
            print_profile(CustomerId(id), profile.as_ref(), format)?
        }
    };

    debug!("Backend calls (lookups/updates): {}", stubs.call_summary());
    info!(
        "Operation duration {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(code)
}

/// Print a profile, or report that the customer does not exist.
fn print_profile(
    id: CustomerId,
    profile: Option<&CompositeProfile>,
    format: OutputFormat,
) -> Result<i32> {
    let Some(profile) = profile else {
        eprintln!("Customer {} not found", id);
        return Ok(EXIT_NOT_FOUND);
    };

    match format {
        OutputFormat::Text => print!("{}", report::generate_profile_text(profile)),
        OutputFormat::Json => println!("{}", report::generate_json(profile)?),
    }
    Ok(0)
}

/// Read a profile with every strategy and report whether they agree.
async fn compare_strategies(engine: &ProfileEngine, id: CustomerId) -> Result<i32> {
    let strategies = [
        JoinStrategy::Sequential,
        JoinStrategy::Incremental,
        JoinStrategy::Barrier,
    ];
    let mut results = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        let started = Instant::now();
        let profile = engine.fetch_profile(id, strategy).await?;
        println!(
            "{:<12} {:.2}s  {}",
            strategy.to_string(),
            started.elapsed().as_secs_f64(),
            if profile.is_some() { "profile" } else { "not found" }
        );
        results.push(profile);
    }

    if results.iter().any(|profile| profile != &results[0]) {
        bail!("Read strategies produced different profiles for customer {}", id);
    }
    println!("✅ All read strategies produced identical results.");

    Ok(if results[0].is_some() { 0 } else { EXIT_NOT_FOUND })
}

/// Parse an update request from a file, or stdin when the path is `-`.
fn read_request(path: &Path) -> Result<UpdateRequest> {
    let content = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))?
    };

    let request: UpdateRequest =
        serde_json::from_str(&content).context("Failed to parse update request")?;
    if request.is_empty() {
        warn!("Update request carries no fields");
    }
    Ok(request)
}
