use crate::config::{DEFAULT_PORT, DEFAULT_START_ON_LAUNCH, default_port, default_start_on_launch};

use serde::{Deserialize, Serialize};

/// UDP command service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Preferred port for incoming commands.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether to start listening as soon as the app launches.
    #[serde(default = "default_start_on_launch")]
    pub start_on_launch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            start_on_launch: DEFAULT_START_ON_LAUNCH,
        }
    }
}
