use std::{net::SocketAddr, path::PathBuf};

use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    /// Directory of frontend assets served for unmatched paths
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}
