use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Minutes a pending appointment holds its slot before expiring.
    pub confirmation_hold_minutes: i64,
    /// Step between generated candidate start times.
    pub slot_granularity_minutes: i32,
    /// Seconds between expiration sweeps.
    pub sweep_interval_secs: u64,
    /// Fixed salon UTC offset in minutes; the whole system runs in one salon
    /// timezone, so "today" for the same-day cutoff is derived from this.
    pub salon_utc_offset_minutes: i32,
}

impl BookingConfig {
    /// The slot loop steps by granularity and the sweeper ticks on the
    /// interval; zero for either would never make progress.
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.confirmation_hold_minutes > 0,
            "BOOKING_HOLD_MINUTES must be positive"
        );
        anyhow::ensure!(
            self.slot_granularity_minutes > 0,
            "BOOKING_SLOT_GRANULARITY_MINUTES must be positive"
        );
        anyhow::ensure!(
            self.sweep_interval_secs > 0,
            "BOOKING_SWEEP_INTERVAL_SECS must be positive"
        );
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10),
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1),
        };

        let confirmation_hold_minutes = match env::var("BOOKING_HOLD_MINUTES") {
            Ok(val) => val.parse().context("Failed to parse BOOKING_HOLD_MINUTES")?,
            Err(_) => crate::db::models::DEFAULT_CONFIRMATION_HOLD_MINUTES,
        };
        let slot_granularity_minutes = match env::var("BOOKING_SLOT_GRANULARITY_MINUTES") {
            Ok(val) => val
                .parse()
                .context("Failed to parse BOOKING_SLOT_GRANULARITY_MINUTES")?,
            Err(_) => crate::scheduling::availability::DEFAULT_SLOT_GRANULARITY_MINUTES,
        };
        let sweep_interval_secs = match env::var("BOOKING_SWEEP_INTERVAL_SECS") {
            Ok(val) => val.parse().context("Failed to parse BOOKING_SWEEP_INTERVAL_SECS")?,
            Err(_) => 3600,
        };
        let salon_utc_offset_minutes = match env::var("SALON_UTC_OFFSET_MINUTES") {
            Ok(val) => val.parse().context("Failed to parse SALON_UTC_OFFSET_MINUTES")?,
            Err(_) => 0,
        };

        let booking = BookingConfig {
            confirmation_hold_minutes,
            slot_granularity_minutes,
            sweep_interval_secs,
            salon_utc_offset_minutes,
        };
        booking.validate()?;

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            booking,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    /// Current wall-clock time in the salon's fixed timezone.
    pub fn salon_now(&self) -> time::OffsetDateTime {
        let offset = time::UtcOffset::from_whole_seconds(self.booking.salon_utc_offset_minutes * 60)
            .unwrap_or(time::UtcOffset::UTC);
        time::OffsetDateTime::now_utc().to_offset(offset)
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config is not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(hold: i64, granularity: i32, sweep: u64) -> BookingConfig {
        BookingConfig {
            confirmation_hold_minutes: hold,
            slot_granularity_minutes: granularity,
            sweep_interval_secs: sweep,
            salon_utc_offset_minutes: 0,
        }
    }

    #[test]
    fn booking_config_rejects_non_positive_values() {
        assert!(booking(30, 5, 3600).validate().is_ok());
        assert!(booking(0, 5, 3600).validate().is_err());
        assert!(booking(30, 0, 3600).validate().is_err());
        assert!(booking(30, 5, 0).validate().is_err());
    }
}
