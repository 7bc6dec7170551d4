use std::env;
use std::net::SocketAddr;

/// Runtime settings read from the environment (after dotenvy has loaded
/// `.env` in main).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Seconds between sweep ticks. Defaults to one hour.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()?;

        let sweep_interval_secs = match env::var("SWEEP_INTERVAL_SECS") {
            Ok(s) => s.parse()?,
            Err(_) => 3600,
        };

        Ok(Self {
            database_url,
            bind_addr,
            sweep_interval_secs,
        })
    }
}
