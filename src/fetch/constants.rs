//! Constants for the fetch module (timeouts, courtesy delay, client identity).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout for one fetch (30 seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Lower bound of the default courtesy delay.
pub const DEFAULT_COURTESY_MIN_MS: u64 = 500;

/// Upper bound of the default courtesy delay.
pub const DEFAULT_COURTESY_MAX_MS: u64 = 2000;

/// Browser User-Agent sent with every request; some form hosts reject unknown clients.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
