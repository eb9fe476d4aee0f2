//! Configuration types and CLI options.
//!
//! `Config` enumerates every option both services recognize. It is parsed once
//! from flags / environment variables, validated once, and then passed around
//! immutably (worker processes receive it serialized).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::constants::*;
use crate::error_handling::ConfigError;

/// Logging level for the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

fn default_terminal_domains() -> Vec<String> {
    DEFAULT_TERMINAL_DOMAINS
        .iter()
        .map(|d| d.to_string())
        .collect()
}

/// Every option recognized by the checker and the pusher.
///
/// Each flag can also be supplied through the environment variable of the
/// same upper-case name (`CHECK_URL`, `HTTP_TIMEOUT`, ...).
#[derive(Debug, Clone, PartialEq, Args, Serialize, Deserialize)]
pub struct Config {
    /// URL probed before topping up the worker pool
    #[arg(long, env = "CHECK_URL", default_value = DEFAULT_CHECK_URL)]
    pub check_url: String,

    /// Per-request timeout in seconds for resolver fetches and the health probe
    #[arg(long, env = "HTTP_TIMEOUT", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,

    /// Number of worker processes (checker) or concurrent deliveries (pusher)
    #[arg(long, env = "WORKER_POOL_SIZE", default_value_t = DEFAULT_WORKER_POOL_SIZE)]
    pub worker_pool_size: usize,

    /// Supervisor / pusher tick interval in seconds
    #[arg(long, env = "SLEEP", default_value_t = DEFAULT_SLEEP_SECS)]
    pub sleep: u64,

    /// Bounded wait of a single queue take, in seconds
    #[arg(long, env = "QUEUE_TAKE_TIMEOUT", default_value_t = DEFAULT_QUEUE_TAKE_TIMEOUT_SECS)]
    pub queue_take_timeout: u64,

    /// Maximum number of hops recorded for one URL
    #[arg(long, env = "MAX_REDIRECTS", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// User-Agent header sent by the resolver (empty string sends none)
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Delay in seconds before a failed check is taken again
    #[arg(long, env = "RECHECK_DELAY", default_value_t = DEFAULT_RECHECK_DELAY_SECS)]
    pub recheck_delay: u64,

    /// Pusher cooldown in seconds after an unhandled loop failure
    #[arg(long, env = "SLEEP_ON_FAIL", default_value_t = DEFAULT_SLEEP_ON_FAIL_SECS)]
    pub sleep_on_fail: u64,

    /// Hosts (and their subdomains) that end a walk without fetching
    #[arg(
        long,
        env = "TERMINAL_DOMAINS",
        value_delimiter = ',',
        default_values_t = default_terminal_domains()
    )]
    pub terminal_domains: Vec<String>,

    /// Timeout in seconds of one callback delivery
    #[arg(
        long,
        env = "HTTP_CONNECTION_TIMEOUT",
        default_value_t = DEFAULT_HTTP_CONNECTION_TIMEOUT_SECS
    )]
    pub http_connection_timeout: u64,

    /// Redis URL of the task queue
    #[arg(long, env = "QUEUE_URL", default_value = DEFAULT_QUEUE_URL)]
    pub queue_url: String,

    /// Key prefix of every tube stored in Redis
    #[arg(long, env = "QUEUE_PREFIX", default_value = DEFAULT_QUEUE_PREFIX)]
    pub queue_prefix: String,

    /// Tube the checker takes URLs from (and requeues rechecks to)
    #[arg(long, env = "INPUT_TUBE", default_value = DEFAULT_INPUT_TUBE)]
    pub input_tube: String,

    /// Tube finished check results are put to
    #[arg(long, env = "OUTPUT_TUBE", default_value = DEFAULT_OUTPUT_TUBE)]
    pub output_tube: String,

    /// Tube the pusher takes notifications from
    #[arg(long, env = "PUSH_TUBE", default_value = DEFAULT_PUSH_TUBE)]
    pub push_tube: String,

    /// Seconds a taken task stays claimed before the queue hands it out again
    #[arg(
        long,
        env = "QUEUE_CLAIM_TIMEOUT",
        default_value_t = DEFAULT_QUEUE_CLAIM_TIMEOUT_SECS
    )]
    pub queue_claim_timeout: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Write the process id to this file on startup
    #[arg(long, env = "PIDFILE")]
    pub pidfile: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            sleep: DEFAULT_SLEEP_SECS,
            queue_take_timeout: DEFAULT_QUEUE_TAKE_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            recheck_delay: DEFAULT_RECHECK_DELAY_SECS,
            sleep_on_fail: DEFAULT_SLEEP_ON_FAIL_SECS,
            terminal_domains: default_terminal_domains(),
            http_connection_timeout: DEFAULT_HTTP_CONNECTION_TIMEOUT_SECS,
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            queue_prefix: DEFAULT_QUEUE_PREFIX.to_string(),
            input_tube: DEFAULT_INPUT_TUBE.to_string(),
            output_tube: DEFAULT_OUTPUT_TUBE.to_string(),
            push_tube: DEFAULT_PUSH_TUBE.to_string(),
            queue_claim_timeout: DEFAULT_QUEUE_CLAIM_TIMEOUT_SECS,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            pidfile: None,
        }
    }
}

impl Config {
    /// Checks the option set once at startup.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_pool_size == 0 {
            return Err(ConfigError::NotPositive("WORKER_POOL_SIZE"));
        }
        if self.max_redirects == 0 {
            return Err(ConfigError::NotPositive("MAX_REDIRECTS"));
        }
        if self.http_timeout == 0 {
            return Err(ConfigError::NotPositive("HTTP_TIMEOUT"));
        }
        if self.http_connection_timeout == 0 {
            return Err(ConfigError::NotPositive("HTTP_CONNECTION_TIMEOUT"));
        }
        if self.queue_claim_timeout == 0 {
            return Err(ConfigError::NotPositive("QUEUE_CLAIM_TIMEOUT"));
        }
        url::Url::parse(&self.check_url).map_err(|e| ConfigError::InvalidUrl {
            option: "CHECK_URL",
            value: self.check_url.clone(),
            reason: e.to_string(),
        })?;
        for (option, name) in [
            ("INPUT_TUBE", &self.input_tube),
            ("OUTPUT_TUBE", &self.output_tube),
            ("PUSH_TUBE", &self.push_tube),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::Empty(option));
            }
        }
        if self.input_tube == self.output_tube {
            return Err(ConfigError::SameTube(self.input_tube.clone()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.sleep)
    }

    pub fn queue_take_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_take_timeout)
    }

    pub fn recheck_delay(&self) -> Duration {
        Duration::from_secs(self.recheck_delay)
    }

    pub fn sleep_on_fail(&self) -> Duration {
        Duration::from_secs(self.sleep_on_fail)
    }

    pub fn http_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connection_timeout)
    }

    pub fn queue_claim_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_claim_timeout)
    }

    /// User-Agent to send, `None` when configured empty.
    pub fn user_agent(&self) -> Option<&str> {
        let ua = self.user_agent.trim();
        (!ua.is_empty()).then_some(ua)
    }
}
