use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hidelist")]
#[command(about = "Hide-list daemon and control client for a root-management agent")]
#[command(version)]
pub struct Args {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Configuration file path (optional)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the hide daemon and its control socket
    Daemon {
        /// Keep rules and settings in memory instead of the database
        #[arg(long)]
        ephemeral: bool,
    },

    /// Enable hiding
    Enable {
        /// Also apply properties only settable after boot
        #[arg(long)]
        late_props: bool,
    },

    /// Disable hiding
    Disable,

    /// Add a package (and optionally one of its processes) to the hide list
    Add {
        package: String,
        /// Defaults to the package name
        process: Option<String>,
    },

    /// Remove a rule, or every rule of a package when no process is given
    Rm {
        package: String,
        process: Option<String>,
    },

    /// Print the hide list
    Ls {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether hiding is enabled
    Status,

    /// Show the effective configuration and exit
    ShowConfig,

    /// Validate a configuration file and exit
    ValidateConfig { path: PathBuf },
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::Add { package, .. } | Command::Rm { package, .. } if package.is_empty() => {
                Err(anyhow::anyhow!("Package name must not be empty"))
            }
            Command::ValidateConfig { path } if path.as_os_str().is_empty() => {
                Err(anyhow::anyhow!("Configuration path must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_default_process() {
        let args = Args::try_parse_from(["hidelist", "add", "com.example.app"]).unwrap();
        match args.command {
            Command::Add { package, process } => {
                assert_eq!(package, "com.example.app");
                assert_eq!(process, None);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["hidelist", "ls", "--json", "--log-level", "debug"]).unwrap();
        assert!(matches!(args.command, Command::Ls { json: true }));
        assert!(matches!(args.log_level, LogLevel::Debug));
    }

    #[test]
    fn test_empty_package_rejected() {
        let args = Args::try_parse_from(["hidelist", "rm", ""]).unwrap();
        assert!(args.validate().is_err());
    }
}
