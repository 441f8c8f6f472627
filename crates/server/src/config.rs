use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Process configuration, fixed for the lifetime of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding settings and the response cache
    pub data_dir: PathBuf,
    pub listen_addr: SocketAddr,
    /// Emby server base URL, e.g. `http://127.0.0.1:8096`
    pub emby_url: String,
    pub emby_api_key: String,
}

impl Config {
    pub fn new(
        data_dir: PathBuf,
        listen_addr: SocketAddr,
        emby_url: String,
        emby_api_key: String,
    ) -> Self {
        Self {
            data_dir,
            listen_addr,
            emby_url,
            emby_api_key,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.toml")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("danmu.cache.json")
    }
}
