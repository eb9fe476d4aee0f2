//! Configuration constants.
//!
//! Defaults for every recognized option plus fixed operational limits that are
//! not exposed as options.

use std::time::Duration;

/// Default URL probed by the supervisor to decide whether the network is up.
pub const DEFAULT_CHECK_URL: &str = "http://www.google.com/";
/// Default per-request timeout in seconds (resolver fetches and health probe)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 3;
/// Default number of checker worker processes (also the pusher's in-flight limit)
pub const DEFAULT_WORKER_POOL_SIZE: usize = 10;
/// Default supervisor / pusher tick interval in seconds
pub const DEFAULT_SLEEP_SECS: u64 = 10;
/// Default bounded wait of a single `take` in seconds
pub const DEFAULT_QUEUE_TAKE_TIMEOUT_SECS: u64 = 1;
/// Default maximum number of hops recorded for one walk
pub const DEFAULT_MAX_REDIRECTS: usize = 30;
/// Default delay before a failed check is taken again, in seconds
pub const DEFAULT_RECHECK_DELAY_SECS: u64 = 300;
/// Default cooldown after an unhandled pusher loop failure, in seconds
pub const DEFAULT_SLEEP_ON_FAIL_SECS: u64 = 10;
/// Default timeout of one callback delivery, in seconds
pub const DEFAULT_HTTP_CONNECTION_TIMEOUT_SECS: u64 = 5;
/// Default lifetime of a claim on a taken task before the queue hands it out again
pub const DEFAULT_QUEUE_CLAIM_TIMEOUT_SECS: u64 = 300;

/// Hosts that end a walk before any fetch: social network landing pages
/// that only ever bounce an anonymous client to a login form.
pub const DEFAULT_TERMINAL_DOMAINS: &[&str] = &["odnoklassniki.ru", "ok.ru"];

pub const DEFAULT_QUEUE_URL: &str = "redis://127.0.0.1:6379/";
pub const DEFAULT_QUEUE_PREFIX: &str = "redirect_checker";
pub const DEFAULT_INPUT_TUBE: &str = "check";
pub const DEFAULT_OUTPUT_TUBE: &str = "checked";
pub const DEFAULT_PUSH_TUBE: &str = "push";

/// Default User-Agent string for resolver fetches.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Maximum response body size in bytes (2MB).
/// Larger bodies are truncated before meta-refresh and counter scanning.
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Store base used to rewrite app-store deep links into fetchable URLs
pub const MARKET_BASE_URL: &str = "http://play.google.com/store/apps/";

/// Environment variable carrying the serialized `Config` into worker processes
pub const WORKER_CONFIG_ENV: &str = "REDIRECT_CHECKER_WORKER_CONFIG";

/// Exit status offset for a run stopped by a signal (128 + signal number)
pub const SIGNAL_EXIT_CODE_OFFSET: i32 = 128;

/// Interval at which a blocking `take` re-polls the Redis backend
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Retry strategy for establishing queue connections
/// Initial delay in milliseconds before first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of retry attempts (including initial attempt)
pub const RETRY_MAX_ATTEMPTS: usize = 5;
