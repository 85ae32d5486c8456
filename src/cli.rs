//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_store::MemoryStore;
use crate::domain::config_validation::{StorageBackend, storage_backend, validate_server_config};
use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::JournalStore;

#[derive(Parser, Debug)]
#[command(name = "tradejournal", about = "Day-trading journal REST server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Read a password from stdin and print its argon2 hash
    HashPassword,
    /// Check a server configuration file without starting anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::HashPassword => run_hash_password(),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: JournalError) -> ExitCode {
    error!("{err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, JournalError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Opens the store named by `[storage] backend`.
pub fn open_store(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn JournalStore + Send + Sync>, JournalError> {
    match storage_backend(config)? {
        StorageBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            use crate::adapters::sqlite_store::SqliteStore;
            let store = SqliteStore::from_config(config)?;
            info!("using sqlite store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => Err(JournalError::ConfigInvalid {
            section: "storage".to_string(),
            key: "backend".to_string(),
            reason: "built without the sqlite feature".to_string(),
        }),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let result = load_config(config_path).and_then(|config| validate_server_config(&config));
    match result {
        Ok(()) => {
            println!("OK: {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_serve(config_path: &Path) -> ExitCode {
    #[cfg(feature = "web")]
    {
        match serve(config_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        error!("web feature is required for serve");
        ExitCode::FAILURE
    }
}

#[cfg(feature = "web")]
fn serve(config_path: &Path) -> Result<(), JournalError> {
    use crate::adapters::web::demo::{DEFAULT_DEMO_PASSWORD, seed_demo_data};
    use crate::adapters::web::{AppState, WebSettings, build_router};
    use crate::domain::config_validation::listen_addr;

    let config = load_config(config_path)?;
    validate_server_config(&config)?;

    let addr = listen_addr(&config)?;
    let settings = WebSettings::from_config(&config)?;
    let store = open_store(&config)?;

    if config.get_bool("demo", "enabled", false) {
        let password = config.get_string_or("demo", "password", DEFAULT_DEMO_PASSWORD);
        seed_demo_data(store.as_ref(), &password)?;
    }

    if let Some(dir) = &settings.static_dir {
        info!(dir = %dir.display(), "serving static frontend");
    }
    let router = build_router(AppState { store }, &settings)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok::<(), JournalError>(())
    })
}

#[cfg(feature = "web")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn run_hash_password() -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::auth::hash_password;
        use std::io::{self, BufRead};

        eprintln!("Enter password to hash:");
        let password = match io::stdin().lock().lines().next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return fail(JournalError::Io(e)),
            None => String::new(),
        };
        if password.is_empty() {
            return fail(JournalError::validation("password", "must not be empty"));
        }

        match hash_password(&password) {
            Ok(hash) => {
                println!("{hash}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        error!("web feature is required for hash-password");
        ExitCode::FAILURE
    }
}
