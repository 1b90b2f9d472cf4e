//! Hold-time law: the steadier the bearing, the longer the press

use super::config::NavigationConfig;
use std::time::Duration;

/// Hold duration for a bearing with angular spread `std_dev` (degrees).
///
/// Linear between `max_hold` at `stable_std_deg` and `min_hold` at
/// `relock_std_deg`, clamped to those extremes outside the band.
pub fn hold_for_spread(std_dev: f64, cfg: &NavigationConfig) -> Duration {
    let (lo, hi) = (cfg.stable_std_deg, cfg.relock_std_deg);
    let (min, max) = (cfg.min_hold_secs, cfg.max_hold_secs);

    let secs = if std_dev <= lo || hi <= lo {
        max
    } else if std_dev >= hi {
        min
    } else {
        let t = (std_dev - lo) / (hi - lo);
        max - t * (max - min)
    };
    Duration::from_secs_f64(secs.max(0.0))
}
