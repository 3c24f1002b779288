use std::{env, net::SocketAddr, path::PathBuf};

use anyhow::Context;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CHECKPOINT_DIR: &str = "lfw_skipconn_model";
pub const DEFAULT_NAMES_PATH: &str = "lfw_names.txt";

/// Where the service listens and what it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub checkpoint_dir: PathBuf,
    pub names_path: PathBuf,
}

impl ServiceConfig {
    /// Reads the configuration from the `HOST`, `PORT`, `CHECKPOINT_DIR` and `NAMES_PATH`
    /// environment variables, falling back to the defaults for the unset ones.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("PORT") {
            Ok(port) => port.parse().with_context(|| format!("invalid PORT {port:?}"))?,
            Err(_) => DEFAULT_PORT,
        };

        let addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid HOST {host:?}"))?;

        Ok(Self {
            addr,
            checkpoint_dir: env::var_os("CHECKPOINT_DIR")
                .map_or_else(|| DEFAULT_CHECKPOINT_DIR.into(), PathBuf::from),
            names_path: env::var_os("NAMES_PATH")
                .map_or_else(|| DEFAULT_NAMES_PATH.into(), PathBuf::from),
        })
    }
}
