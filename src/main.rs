mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command, LogLevel};
use hidelist::config::Config;
use hidelist::db::{HideDb, MemoryDb, SqliteDb};
use hidelist::ipc_client::IpcClient;
use hidelist::ipc_server::IpcServer;
use hidelist::policy::LoggingPolicy;
use hidelist::procfs::ProcFs;
use hidelist::protocol::Status;
use hidelist::HideController;
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level)?;

    // Validate arguments
    if let Err(e) = args.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::ShowConfig => show_config(args.config.as_deref()),
        Command::ValidateConfig { path } => validate_config(&path),
        Command::Daemon { ephemeral } => {
            let config = Config::load(args.config.as_deref())?;
            run_daemon(config, ephemeral).await
        }
        command => {
            let config = Config::load(args.config.as_deref())?;
            let client = IpcClient::new(config.socket_path);
            let succeeded = tokio::task::spawn_blocking(move || run_client(&client, command))
                .await
                .context("Client task failed")??;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_logging(log_level: &LogLevel) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    // Set log level
    builder.filter_level(log_level.clone().into());

    #[cfg(target_os = "linux")]
    {
        // On Linux, use systemd-compatible format
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "<{}>[{}] {}: {}",
                match record.level() {
                    log::Level::Error => 3,
                    log::Level::Warn => 4,
                    log::Level::Info => 6,
                    log::Level::Debug => 7,
                    log::Level::Trace => 7,
                },
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                record.args()
            )
        });
    }

    #[cfg(not(target_os = "linux"))]
    {
        builder.format_timestamp_secs();
    }

    builder.init();
    Ok(())
}

fn check_root_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } != 0 {
        return Err(anyhow::anyhow!(
            "hidelist daemon requires root privileges to inspect and kill processes.\n\
            Please run it as root"
        ));
    }
    Ok(())
}

async fn run_daemon(config: Config, ephemeral: bool) -> Result<()> {
    check_root_privileges()?;

    info!("hidelist daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db: Arc<dyn HideDb> = if ephemeral {
        info!("Ephemeral mode: rules are kept in memory only");
        Arc::new(MemoryDb::new())
    } else {
        info!("Database: {}", config.database.display());
        Arc::new(
            SqliteDb::open(&config.database)
                .with_context(|| format!("Failed to open {}", config.database.display()))?,
        )
    };
    let procs = Arc::new(ProcFs::new(config.proc_dir.clone()));
    let controller = HideController::new(config, db, procs, Arc::new(LoggingPolicy));

    // Restore the persisted enable state
    let restore = controller.clone();
    match tokio::task::spawn_blocking(move || restore.check_and_maybe_enable(false)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to restore hiding: {}", e),
        Err(e) => warn!("Restore task failed: {}", e),
    }

    let server = Arc::new(IpcServer::new(controller.clone()));
    let listener = server.bind()?;

    // Handle shutdown gracefully
    let shutdown_result = tokio::select! {
        result = Arc::clone(&server).serve(listener) => {
            if let Err(e) = &result {
                error!("Control server failed: {:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting gracefully");
            Ok(())
        }
    };

    info!("hidelist daemon shutting down");
    if let Err(e) = tokio::task::spawn_blocking(move || controller.shutdown()).await {
        warn!("Shutdown task failed: {}", e);
    }
    server.remove_socket();
    shutdown_result
}

/// Send one request and print the outcome. Returns whether it succeeded.
fn run_client(client: &IpcClient, command: Command) -> Result<bool> {
    let status = match command {
        Command::Enable { late_props } => {
            let status = client.enable(late_props)?;
            report(status, "Hiding enabled")
        }
        Command::Disable => report(client.disable()?, "Hiding disabled"),
        Command::Add { package, process } => {
            let process = process.unwrap_or_default();
            let status = client.add(&package, &process)?;
            report(status, &format!("Added [{}]", rule_label(&package, &process)))
        }
        Command::Rm { package, process } => {
            let process = process.unwrap_or_default();
            let status = client.remove(&package, &process)?;
            report(status, &format!("Removed [{}]", rule_label(&package, &process)))
        }
        Command::Ls { json } => {
            let (status, rules) = client.list()?;
            if status == Status::Success {
                if json {
                    println!("{}", serde_json::to_string_pretty(&rules)?);
                } else {
                    for rule in &rules {
                        println!("{}", rule.to_record());
                    }
                }
                true
            } else {
                report(status, "")
            }
        }
        Command::Status => {
            let status = client.status()?;
            println!("{}", status);
            status == Status::IsEnabled
        }
        Command::Daemon { .. } | Command::ShowConfig | Command::ValidateConfig { .. } => {
            return Err(anyhow::anyhow!("not a client command"))
        }
    };
    Ok(status)
}

fn report(status: Status, success_msg: &str) -> bool {
    if status == Status::Success {
        println!("{}", success_msg);
        true
    } else {
        eprintln!("{}", status);
        false
    }
}

fn rule_label(package: &str, process: &str) -> String {
    if process.is_empty() {
        package.to_string()
    } else {
        format!("{}/{}", package, process)
    }
}

fn show_config(path: Option<&Path>) -> Result<()> {
    let config = Config::load(path)?;

    println!("hidelist Configuration");
    println!("======================");
    println!();
    print!("{}", serde_yaml::to_string(&config)?);
    if let Some(sdk) = config.sdk_int() {
        println!("# effective sdk_int: {}", sdk);
    }
    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    Config::from_file(config_path)
        .with_context(|| format!("Invalid configuration file: {}", config_path.display()))?;
    println!("✓ Configuration file is valid: {}", config_path.display());
    Ok(())
}
