//! Silence watchdog for the icon heartbeat

use crate::providers::LivenessNotifier;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type AlertFn = Box<dyn Fn(Duration) + Send + Sync>;

#[derive(Debug, Default)]
struct Watch {
    last_seen: Option<Duration>,
    alerted: bool,
}

/// Calls `alert` once when no heartbeat arrived for `timeout`.
///
/// The alert re-arms on the next heartbeat. Delivery (webhook, mail, ...)
/// is up to the callback.
pub struct WatchdogNotifier {
    timeout: Duration,
    watch: Mutex<Watch>,
    alert: AlertFn,
}

impl WatchdogNotifier {
    pub fn new(timeout: Duration, alert: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        Self {
            timeout,
            watch: Mutex::new(Watch::default()),
            alert: Box::new(alert),
        }
    }
}

impl LivenessNotifier for WatchdogNotifier {
    fn update(&self, at: Duration) {
        let mut watch = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        watch.last_seen = Some(at);
        watch.alerted = false;
    }

    fn check_and_notify(&self, now: Duration) {
        let silence = {
            let mut watch = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
            let last = *watch.last_seen.get_or_insert(now);
            let silence = now.saturating_sub(last);
            if watch.alerted || silence < self.timeout {
                return;
            }
            watch.alerted = true;
            silence
        };

        tracing::warn!(silence_secs = silence.as_secs_f64(), "icon not seen for too long");
        (self.alert)(silence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn s(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    #[test]
    fn test_alerts_once_per_silence() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let dog = WatchdogNotifier::new(s(60), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dog.update(s(0));
        dog.check_and_notify(s(30));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        dog.check_and_notify(s(61));
        dog.check_and_notify(s(90));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        dog.update(s(100));
        dog.check_and_notify(s(170));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_silence_counts_from_first_check() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let dog = WatchdogNotifier::new(s(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dog.check_and_notify(s(500));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        dog.check_and_notify(s(511));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
