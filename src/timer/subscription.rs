//! Subscriber bookkeeping for timers.

use super::types::TimerEvent;
use std::panic::{self, AssertUnwindSafe};

pub(crate) type EventCallback = Box<dyn FnMut(&TimerEvent<'_>) + Send>;

/// Receipt for a subscription. Pass it back to
/// [`super::TimerRegistry::unsubscribe`] to stop deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    pub(crate) timer: String,
    pub(crate) key: u64,
}

impl SubscriptionToken {
    /// Id of the timer this token subscribes to.
    pub fn timer_id(&self) -> &str {
        &self.timer
    }
}

/// Ordered subscriber list of a single timer.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Vec<(u64, EventCallback)>,
}

impl Subscribers {
    pub(crate) fn insert(&mut self, key: u64, callback: EventCallback) {
        self.entries.push((key, callback));
    }

    pub(crate) fn remove(&mut self, key: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Delivers `event` to every subscriber once, in subscription order.
    ///
    /// A panicking subscriber is logged and stays subscribed; it neither stops
    /// the delivery to the others nor the timer loop.
    pub(crate) fn notify(&mut self, event: &TimerEvent<'_>) {
        for (key, callback) in self.entries.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if let Err(payload) = outcome {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(
                    timer = event.id(),
                    subscriber = *key,
                    %reason,
                    "timer subscriber panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_remove_reports_presence() {
        let mut subs = Subscribers::default();
        subs.insert(1, Box::new(|_| {}));
        assert!(subs.remove(1));
        assert!(!subs.remove(1));
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscribers::default();
        subs.insert(1, Box::new(|_| panic!("boom")));
        let sink = Arc::clone(&seen);
        subs.insert(
            2,
            Box::new(move |event| {
                if let TimerEvent::Tick { seconds, .. } = event {
                    sink.lock().unwrap().push(*seconds);
                }
            }),
        );

        subs.notify(&TimerEvent::Tick { id: "t", seconds: 3 });
        subs.notify(&TimerEvent::Tick { id: "t", seconds: 2 });

        assert_eq!(*seen.lock().unwrap(), vec![3, 2]);
        assert_eq!(subs.len(), 2);
    }
}
