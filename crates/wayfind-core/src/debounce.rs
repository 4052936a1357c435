//! Debouncing of rapid input streams (search-as-you-type).
//!
//! A [`Debouncer`] owns a background task. Each [`Debouncer::notify`] records
//! the latest value and restarts the quiet-period timer; once no new value
//! has arrived for the configured delay, the callback fires exactly once with
//! the last value. Callbacks run one at a time on the background task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// Default quiet period before a typed value is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

enum Signal<T> {
    Notify(T, Instant),
    Cancel,
}

/// Delays delivery of a value until input has been quiet for `delay`.
///
/// Dropping the debouncer stops its task; a value still waiting for its
/// quiet period is discarded.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Signal<T>>,
    delay: Duration,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawns the timer task on the current Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `delay` - Quiet period D
    /// * `on_settled` - Invoked with the last value of each quiet period
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F>(delay: Duration, on_settled: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(delay, rx, on_settled));
        Self { tx, delay }
    }

    /// Records `value` as the latest input and restarts the timer.
    ///
    /// The quiet period is measured from this call, not from when the
    /// background task gets to see the value.
    pub fn notify(&self, value: T) {
        // Send only fails once the task is gone, i.e. the runtime shut down
        let _ = self.tx.send(Signal::Notify(value, Instant::now()));
    }

    /// Drops the pending value, if any, without firing.
    pub fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

async fn run<T, F>(delay: Duration, mut rx: mpsc::UnboundedReceiver<Signal<T>>, mut on_settled: F)
where
    F: FnMut(T),
{
    let mut pending: Option<(T, Instant)> = None;

    loop {
        let Some((value, deadline)) = pending.take() else {
            match rx.recv().await {
                Some(Signal::Notify(value, at)) => pending = Some((value, at + delay)),
                Some(Signal::Cancel) => {}
                None => break,
            }
            continue;
        };

        tokio::select! {
            biased;

            signal = rx.recv() => match signal {
                // Issued after the quiet period ended: the old value had settled
                Some(Signal::Notify(next, at)) if at >= deadline => {
                    on_settled(value);
                    pending = Some((next, at + delay));
                }
                Some(Signal::Notify(next, at)) => pending = Some((next, at + delay)),
                Some(Signal::Cancel) => {
                    tracing::debug!("[Debounce] pending value cancelled");
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                tracing::debug!("[Debounce] input settled after {:?}", delay);
                on_settled(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn recording_debouncer(
        delay: Duration,
    ) -> (Debouncer<String>, mpsc::UnboundedReceiver<(String, Instant)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::spawn(delay, move |text: String| {
            let _ = tx.send((text, Instant::now()));
        });
        (debouncer, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_settles_once_with_last_text() {
        let start = Instant::now();
        let (debouncer, mut rx) = recording_debouncer(Duration::from_millis(150));

        debouncer.notify("S".to_string());
        sleep(Duration::from_millis(50)).await;
        debouncer.notify("St".to_string());
        sleep(Duration::from_millis(50)).await;
        debouncer.notify("Sta".to_string());

        sleep(Duration::from_millis(149)).await;
        assert!(rx.try_recv().is_err(), "fired before the quiet period ended");

        let (text, at) = rx.recv().await.unwrap();
        assert_eq!(text, "Sta");
        assert_eq!(at - start, Duration::from_millis(250));

        sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err(), "fired more than once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_inputs_each_settle() {
        let (debouncer, mut rx) = recording_debouncer(Duration::from_millis(150));

        debouncer.notify("first".to_string());
        sleep(Duration::from_millis(200)).await;
        debouncer.notify("second".to_string());
        sleep(Duration::from_millis(200)).await;

        assert_eq!(rx.try_recv().unwrap().0, "first");
        assert_eq!(rx.try_recv().unwrap().0, "second");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_exactly_at_delay_starts_new_period() {
        let (debouncer, mut rx) = recording_debouncer(Duration::from_millis(150));

        debouncer.notify("a".to_string());
        sleep(Duration::from_millis(150)).await;
        debouncer.notify("b".to_string());
        sleep(Duration::from_millis(300)).await;

        let fired: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok().map(|(t, _)| t)).collect();
        assert_eq!(fired, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_value() {
        let (debouncer, mut rx) = recording_debouncer(Duration::from_millis(150));

        debouncer.notify("typo".to_string());
        sleep(Duration::from_millis(20)).await;
        debouncer.cancel();
        sleep(Duration::from_millis(500)).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_pending_value() {
        let (debouncer, mut rx) = recording_debouncer(Duration::from_millis(150));
        debouncer.notify("gone".to_string());
        drop(debouncer);
        sleep(Duration::from_millis(500)).await;

        // Channel closes once the task has exited with nothing delivered
        assert!(rx.recv().await.is_none());
    }
}
