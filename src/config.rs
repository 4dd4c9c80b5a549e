//! Configuration for the GeoGuardian engine
//!
//! CLI arguments and environment variable handling using clap. The
//! surrounding API server parses these and hands them to
//! [`Engine::from_args`](crate::engine::Engine::from_args).

use clap::Parser;

/// GeoGuardian - geofence evaluation and alert engine
#[derive(Parser, Debug, Clone)]
#[command(name = "geoguardian")]
#[command(about = "Geofence evaluation and alert engine for the GeoGuardian safety network")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "geoguardian")]
    pub mongodb_db: String,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// Enable development mode (in-memory store, no-op notification sender)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Timeout for a single notification delivery attempt, in milliseconds
    #[arg(long, env = "DELIVERY_TIMEOUT_MS", default_value = "10000")]
    pub delivery_timeout_ms: u64,

    /// Maximum delivery attempts per recipient before marking failed
    #[arg(long, env = "DELIVERY_MAX_ATTEMPTS", default_value = "3")]
    pub delivery_max_attempts: u32,

    /// Initial delivery retry backoff, in milliseconds (doubles per attempt)
    #[arg(long, env = "DELIVERY_BACKOFF_MS", default_value = "500")]
    pub delivery_backoff_ms: u64,

    /// Interval between auto-resolve sweeps, in seconds
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "60")]
    pub sweep_interval_secs: u64,

    /// Tolerated clock skew when rejecting out-of-order samples, in seconds
    #[arg(long, env = "CLOCK_SKEW_TOLERANCE_SECS", default_value = "30")]
    pub clock_skew_tolerance_secs: i64,

    /// Battery percentage at or below which a low-battery alert fires
    /// (0 disables low-battery alerts)
    #[arg(long, env = "LOW_BATTERY_THRESHOLD", default_value = "15")]
    pub low_battery_threshold: u8,
}

/// NATS connection configuration
#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,
}

impl Args {
    /// Load `.env` (when present) and parse arguments
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.delivery_max_attempts == 0 {
            return Err("DELIVERY_MAX_ATTEMPTS must be at least 1".to_string());
        }

        if self.low_battery_threshold > 100 {
            return Err("LOW_BATTERY_THRESHOLD must be a percentage (0-100)".to_string());
        }

        if self.clock_skew_tolerance_secs < 0 {
            return Err("CLOCK_SKEW_TOLERANCE_SECS must not be negative".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args::parse_from(["geoguardian"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let args = default_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.delivery_max_attempts, 3);
        assert_eq!(args.low_battery_threshold, 15);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut args = default_args();
        args.delivery_max_attempts = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_threshold_over_100_rejected() {
        let mut args = default_args();
        args.low_battery_threshold = 101;
        assert!(args.validate().is_err());
    }
}
