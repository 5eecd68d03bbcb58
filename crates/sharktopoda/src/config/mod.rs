#[allow(clippy::module_inception)]
mod config;
mod server_config;

pub(crate) use {config::Config, server_config::ServerConfig};

pub(crate) const DEFAULT_PORT: u16 = 8800;
pub(crate) const DEFAULT_START_ON_LAUNCH: bool = true;

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn default_start_on_launch() -> bool {
    DEFAULT_START_ON_LAUNCH
}
