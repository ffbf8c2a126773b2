//! Shared configuration constants for tarantula
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default number of concurrent legs (workers)
pub const DEFAULT_LEGS: usize = 10;

/// Default number of fetches a single leg performs before it is recycled
///
/// Browser legs accumulate memory over many navigations, so they are torn
/// down and relaunched after this many uses.
pub const DEFAULT_MAX_USES: u32 = 10;

/// Default request timeout for a single fetch: 30 seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// How long a rendered page may take to reach `document.readyState == "complete"`
pub const DEFAULT_DOM_TIMEOUT_MS: u64 = 5000;

/// Interval between DOM readiness probes
pub const DEFAULT_DOM_POLL_MS: u64 = 250;

/// Grace period added on top of the fetch timeout before the orchestrator
/// gives up on a leg that never reported back
pub const FETCH_TIMEOUT_GRACE_SECS: u64 = 5;

/// Capacity of the optional broadcast event bus
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1000;

/// User agent sent by default
///
/// Kept deliberately old-fashioned; some sites serve a simpler, link-rich
/// markup to legacy browsers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 6.0)";

/// Prefix for per-leg chromium profile directories
pub const BROWSER_PROFILE_PREFIX: &str = "tarantula_leg";

/// Extra allowance for a browser leg's first fetch, which launches chromium
pub const BROWSER_LAUNCH_GRACE_SECS: u64 = 60;
