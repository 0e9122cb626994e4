// Environment-driven configuration

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data/mintbook";
pub const DEFAULT_STARTING_BALANCE: f64 = 1000.0;
pub const DEFAULT_INITIAL_LIQUIDITY: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the HTTP server
    pub addr: SocketAddr,

    /// Directory for the sled database
    pub data_dir: PathBuf,

    /// Balance granted to every newly registered user
    pub starting_balance: f64,

    /// Default pool seed for newly created markets
    pub initial_liquidity: f64,
}

impl Config {
    pub fn from_env() -> Self {
        let addr = std::env::var("MINTBOOK_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let data_dir = std::env::var("MINTBOOK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let starting_balance = std::env::var("MINTBOOK_STARTING_BALANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STARTING_BALANCE);

        let initial_liquidity = std::env::var("MINTBOOK_INITIAL_LIQUIDITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INITIAL_LIQUIDITY);

        Self {
            addr,
            data_dir,
            starting_balance,
            initial_liquidity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            starting_balance: DEFAULT_STARTING_BALANCE,
            initial_liquidity: DEFAULT_INITIAL_LIQUIDITY,
        }
    }
}
