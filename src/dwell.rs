use std::time::Duration;

const DEFAULT_DWELL_MS: u64 = 5_000;

/// Per-image display time for an event, keyed by how many images it carries.
///
/// Events with few images dwell longer so a one-image event does not flash
/// past; crowded events speed up to keep the total rotation time flat.
/// Counts outside the expected 1..=6 range fall back to the default.
pub fn dwell_for(image_count: usize) -> Duration {
    let ms = match image_count {
        1 => 10_000,
        2 => 8_000,
        3 => 6_000,
        4 => 5_000,
        5 => 4_500,
        6 => 4_000,
        _ => DEFAULT_DWELL_MS,
    };
    Duration::from_millis(ms)
}
