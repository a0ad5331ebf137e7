use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{DbOptions, ModuleEntry, ModuleRegistry, RunOptions, ShutdownOptions};
use modkit_db::{ConnectOpts, DbHandle};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use api_ingress::{ApiIngress, ApiIngressConfig};
use light_control::{LightControl, LightControlConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as `sqlite::memory:` (query string preserved).
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    let (head, query) = match dsn.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (dsn, None),
    };
    let with_query = |base: String| match query {
        Some(q) => format!("{base}?{q}"),
        None => base,
    };

    if head.eq_ignore_ascii_case("sqlite::memory:") || head.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(with_query("sqlite::memory:".to_string()));
    }
    let path_str = head
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {dsn})"))?;

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    Ok(with_query(format!(
        "sqlite://{}",
        p.to_string_lossy().replace('\\', "/")
    )))
}

/// Streetlight Server - accounts, light readings and on/off decisions over HTTP
#[derive(Parser)]
#[command(name = "streetlight-server")]
#[command(about = "Streetlight Server - light intensity tracking and control API")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database and a throwaway token secret
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    apply_module_overrides(&mut config, &args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(home_dir = %config.server.home_dir, "Streetlight Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

/// Fill in module settings derived from the server section and CLI flags.
fn apply_module_overrides(config: &mut AppConfig, args: &CliArgs) {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let ingress = config.module_config_mut("api_ingress");
    if args.port.is_some() || !ingress.contains_key("bind_addr") {
        ingress.insert("bind_addr".into(), serde_json::Value::String(bind_addr));
    }

    let light = config.module_config_mut("light_control");
    let has_secret = light
        .get("jwt_secret")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.trim().is_empty());
    if args.mock && !has_secret {
        light.insert(
            "jwt_secret".into(),
            serde_json::Value::String(nanoid::nanoid!(48)),
        );
    }
}

async fn connect_db(db_config: &DatabaseConfig, base_dir: &Path) -> Result<DbHandle> {
    let raw = db_config.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    let dsn = if raw.starts_with("sqlite:") {
        absolutize_sqlite_dsn(raw, base_dir)?
    } else {
        raw.to_owned()
    };

    let connect_opts = ConnectOpts {
        max_conns: db_config.max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: db_config
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
        ..Default::default()
    };

    tracing::info!(dsn = %dsn, "Connecting to database");
    let db = DbHandle::connect(&dsn, connect_opts)
        .await
        .with_context(|| format!("Failed to connect to database '{dsn}'"))?;
    tracing::info!(engine = ?db.engine(), "Connected DB backend");
    Ok(db)
}

fn build_registry() -> Result<ModuleRegistry> {
    let ingress = Arc::new(ApiIngress::default());
    let light = Arc::new(LightControl::default());

    let registry = ModuleRegistry::builder()
        .register(
            ModuleEntry::new("api_ingress", ingress.clone())
                .with_rest_host(ingress.clone())
                .with_stateful(ingress),
        )
        .register(
            ModuleEntry::new(LightControl::NAME, light.clone())
                .depends_on(&["api_ingress"])
                .with_db(light.clone())
                .with_rest(light),
        )
        .build()?;
    Ok(registry)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let base_dir = PathBuf::from(&config.server.home_dir);
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("light_control requires a database section"))?;
    let db = Arc::new(connect_db(&db_config, &base_dir).await?);

    let run_options = RunOptions {
        modules_cfg: Arc::new(AppConfigProvider::new(config)),
        db: DbOptions::Existing(db),
        shutdown: ShutdownOptions::Signals,
        registry: build_registry()?,
    };

    modkit::run(run_options).await
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let db = config
        .database
        .as_ref()
        .ok_or_else(|| anyhow!("database section is missing"))?;
    if db.url.trim().is_empty() {
        return Err(anyhow!("database.url is empty"));
    }

    let ingress: ApiIngressConfig = module_section(config, "api_ingress")?;
    ingress
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("Invalid api_ingress.bind_addr '{}'", ingress.bind_addr))?;

    let light: LightControlConfig = module_section(config, LightControl::NAME)?;
    light.validate()?;

    build_registry()?;

    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn module_section<T: serde::de::DeserializeOwned>(config: &AppConfig, name: &str) -> Result<T> {
    let value = config
        .modules
        .get(name)
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    serde_json::from_value(value).with_context(|| format!("invalid modules.{name} config"))
}
