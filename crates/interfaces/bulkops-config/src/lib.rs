//! Central configuration constants for runtime limits and defaults.

/// Default number of item actions allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Minimum allowed concurrency. One means strictly sequential issuance.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency.
pub const MAX_CONCURRENCY: usize = 32;

/// Default per-request timeout for the REST client, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Capacity of the progress event channel handed to UIs.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Clamps a requested concurrency into `[MIN_CONCURRENCY, MAX_CONCURRENCY]`.
pub fn clamp_concurrency(v: usize) -> usize {
    v.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_concurrency(0), MIN_CONCURRENCY);
        assert_eq!(clamp_concurrency(7), 7);
        assert_eq!(clamp_concurrency(1000), MAX_CONCURRENCY);
    }
}
