//! Configuration loader for the `aquamon` telemetry service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). By consolidating configuration logic
//! here, we avoid scattering `env::var` calls throughout the codebase.
//! Every variable has a default: an unconfigured install still ingests and
//! logs, it just runs with forwarding and alerting disabled.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::notify::SmtpSettings;
use crate::thresholds::Thresholds;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read a string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Serial device path for the sensor stream.
    pub serial_port: String,

    /// Serial line rate.
    pub baud_rate: u32,

    /// Bound on a single serial read before the loop re-polls.
    pub read_timeout: Duration,

    /// Port for the secondary HTTP ingestion endpoint.
    pub http_port: u16,

    /// Remote telemetry endpoint URL.
    pub thingspeak_url: String,

    /// Remote telemetry write key; empty disables forwarding.
    pub thingspeak_api_key: String,

    /// Alert mail recipients; empty disables alerting.
    pub alert_recipients: Vec<String>,

    /// Minimum gap between alerts for the same parameter.
    pub alert_cooldown: Duration,

    /// Durable store for serial readings.
    pub log_csv: PathBuf,

    /// Durable store for the HTTP ingestion path.
    pub server_log: PathBuf,

    /// SMTP relay settings; `None` disables alerting.
    pub smtp: Option<SmtpSettings>,

    /// Safety threshold table.
    pub thresholds: Thresholds,
}

/// Load configuration from environment variables with defaults.
///
/// Optional, with defaults:
/// - `SERIAL_PORT` (`/dev/ttyUSB0`), `BAUDRATE` (`9600`),
///   `SERIAL_READ_TIMEOUT_SECONDS` (`2`)
/// - `THINGSPEAK_URL`, `THINGSPEAK_API_KEY` (empty = forwarding disabled)
/// - `ALERT_RECIPIENTS` (comma-separated), `ALERT_COOLDOWN_SECONDS` (`600`)
/// - `LOG_CSV` (`logs/sensor_log.csv`), `SERVER_LOG` (`logs/server_data.csv`)
/// - `HTTP_PORT` (`5000`)
/// - `EMAIL_USER`/`EMAIL_PASS` (both unset = alerting disabled),
///   `EMAIL_SMTP` (`smtp.gmail.com`), `EMAIL_PORT` (`587`)
/// - `PH_MIN`/`PH_MAX`/`TURBIDITY_MAX`/`CHLORINE_MIN`/`HUMIDITY_MIN`/
///   `HUMIDITY_MAX` (see [`Thresholds::default`])
///
/// Returns an error if any set variable fails to parse.
pub fn load_from_env() -> Result<Config> {
    // ---
    let serial_port = env_or!("SERIAL_PORT", "/dev/ttyUSB0");
    let baud_rate = parse_env!("BAUDRATE", u32, 9600);
    let read_timeout = Duration::from_secs(parse_env!("SERIAL_READ_TIMEOUT_SECONDS", u64, 2));
    let http_port = parse_env!("HTTP_PORT", u16, 5000);

    let thingspeak_url = env_or!("THINGSPEAK_URL", "https://api.thingspeak.com/update");
    let thingspeak_api_key = env_or!("THINGSPEAK_API_KEY", "");

    let alert_recipients = parse_recipients(&env_or!("ALERT_RECIPIENTS", ""));
    let alert_cooldown = Duration::from_secs(parse_env!("ALERT_COOLDOWN_SECONDS", u64, 600));

    let log_csv = PathBuf::from(env_or!("LOG_CSV", "logs/sensor_log.csv"));
    let server_log = PathBuf::from(env_or!("SERVER_LOG", "logs/server_data.csv"));

    let smtp = match (env::var("EMAIL_USER").ok(), env::var("EMAIL_PASS").ok()) {
        (Some(user), Some(password)) => Some(SmtpSettings {
            host: env_or!("EMAIL_SMTP", "smtp.gmail.com"),
            port: parse_env!("EMAIL_PORT", u16, 587),
            user,
            password,
        }),
        _ => None,
    };

    let defaults = Thresholds::default();
    let thresholds = Thresholds {
        ph_min: parse_env!("PH_MIN", f64, defaults.ph_min),
        ph_max: parse_env!("PH_MAX", f64, defaults.ph_max),
        turbidity_max: parse_env!("TURBIDITY_MAX", f64, defaults.turbidity_max),
        chlorine_min: parse_env!("CHLORINE_MIN", f64, defaults.chlorine_min),
        humidity_min: parse_env!("HUMIDITY_MIN", f64, defaults.humidity_min),
        humidity_max: parse_env!("HUMIDITY_MAX", f64, defaults.humidity_max),
    };

    Ok(Config {
        serial_port,
        baud_rate,
        read_timeout,
        http_port,
        thingspeak_url,
        thingspeak_api_key,
        alert_recipients,
        alert_cooldown,
        log_csv,
        server_log,
        smtp,
        thresholds,
    })
}

/// Split a comma-separated recipient list, dropping empty entries.
fn parse_recipients(raw: &str) -> Vec<String> {
    // ---
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the telemetry key and SMTP password while showing everything
    /// else that was loaded.
    pub fn log_config(&self) {
        // ---
        let masked_key = if self.thingspeak_api_key.is_empty() {
            "(unset)"
        } else {
            "****"
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  SERIAL_PORT        : {}", self.serial_port);
        tracing::info!("  BAUDRATE           : {}", self.baud_rate);
        tracing::info!("  HTTP_PORT          : {}", self.http_port);
        tracing::info!("  THINGSPEAK_URL     : {}", self.thingspeak_url);
        tracing::info!("  THINGSPEAK_API_KEY : {}", masked_key);
        tracing::info!("  ALERT_RECIPIENTS   : {}", self.alert_recipients.join(", "));
        tracing::info!("  ALERT_COOLDOWN     : {}s", self.alert_cooldown.as_secs());
        tracing::info!("  LOG_CSV            : {}", self.log_csv.display());
        tracing::info!("  SERVER_LOG         : {}", self.server_log.display());
        match &self.smtp {
            Some(smtp) => {
                tracing::info!("  EMAIL_SMTP         : {}:{}", smtp.host, smtp.port);
                tracing::info!("  EMAIL_USER         : {}", smtp.user);
                tracing::info!("  EMAIL_PASS         : ****");
            }
            None => tracing::info!("  EMAIL              : (not configured)"),
        }
        tracing::info!(
            "  THRESHOLDS         : pH [{}, {}], turbidity <= {}, chlorine >= {}, humidity [{}, {}]",
            self.thresholds.ph_min,
            self.thresholds.ph_max,
            self.thresholds.turbidity_max,
            self.thresholds.chlorine_min,
            self.thresholds.humidity_min,
            self.thresholds.humidity_max,
        );
    }
}
