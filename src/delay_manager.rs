use std::time::Duration;
use std::thread;
use rand::Rng;
use log::debug;

/// Sleeps for `base` plus up to half of it again, so consecutive page loads
/// do not land on a fixed cadence.
pub fn page_delay(base: Duration) {
    let delay = jittered(base);
    if delay.is_zero() {
        return;
    }
    debug!("Waiting for {} ms (page settle)...", delay.as_millis());
    thread::sleep(delay);
}

fn jittered(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(base_ms + rng.gen_range(0..=base_ms / 2))
}
