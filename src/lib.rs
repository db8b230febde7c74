pub mod config;
pub mod db;
pub mod error;
pub mod hide;
pub mod hide_rule;
pub mod ipc_client;
pub mod ipc_server;
pub mod matcher;
pub mod monitor;
pub mod policy;
pub mod procfs;
pub mod protocol;
pub mod types;
pub mod uid_map;

pub use error::{HideError, Result};
pub use hide::HideController;
pub use hide_rule::HideRule;
