use std::sync::OnceLock;
use std::time::Instant;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Get monotonic milliseconds since first use.
///
/// Frame timestamps and staleness checks need a clock that never jumps
/// backwards, so wall time is not used here.
pub fn monotonic_ms() -> u64 {
    let start = PROCESS_START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

/// Calculate elapsed milliseconds between two monotonic timestamps
pub fn elapsed_ms(earlier: u64, later: u64) -> u64 {
    later.saturating_sub(earlier)
}
