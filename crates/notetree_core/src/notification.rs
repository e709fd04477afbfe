//! Transient status messages for the presentation layer.
//!
//! # Responsibility
//! - Hold at most one message and publish changes to subscribers.
//! - Hide the message once its expiry timer fires.
//!
//! # Invariants
//! - Posting replaces the current message and restarts the timer; messages
//!   never queue.
//! - A superseded timer can never hide a newer message: it is aborted on
//!   replacement and also checks the message generation before hiding.
//! - Expiry requires a running tokio runtime; without one the message stays
//!   visible until replaced or dismissed.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default display window for a posted message.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(10);

/// The single message slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub visible: bool,
    /// Bumped on every post; identifies which timer owns the slot.
    pub generation: u64,
}

/// Publishes short-lived notifications with automatic expiry.
pub struct NotificationChannel {
    slot: Arc<watch::Sender<Notification>>,
    expiry: Duration,
    timer: Option<JoinHandle<()>>,
}

impl NotificationChannel {
    pub fn new(expiry: Duration) -> Self {
        let (sender, _receiver) = watch::channel(Notification::default());
        Self {
            slot: Arc::new(sender),
            expiry,
            timer: None,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Current message state.
    pub fn current(&self) -> Notification {
        self.slot.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.slot.borrow().visible
    }

    /// Change feed for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<Notification> {
        self.slot.subscribe()
    }

    /// Shows `text`, replacing any current message, and restarts expiry.
    pub fn post(&mut self, text: impl Into<String>) {
        self.cancel_timer();

        let text = text.into();
        let mut generation = 0;
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.text = text;
            slot.visible = true;
            generation = slot.generation;
        });
        debug!("event=notification_post module=notification status=ok generation={generation}");

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "event=notification_post module=notification status=degraded reason=no_runtime generation={generation}"
                );
                return;
            }
        };

        let slot = Arc::clone(&self.slot);
        let expiry = self.expiry;
        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(expiry).await;
            slot.send_if_modified(|current| {
                if current.generation != generation || !current.visible {
                    return false;
                }
                current.visible = false;
                true
            });
        }));
    }

    /// Hides the current message immediately.
    pub fn dismiss(&mut self) {
        self.cancel_timer();
        self.slot.send_if_modified(|current| {
            let changed = current.visible;
            current.visible = false;
            changed
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY)
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationChannel, DEFAULT_EXPIRY};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn message_expires_after_window() {
        let mut channel = NotificationChannel::default();
        channel.post("Note created successfully!");
        assert!(channel.is_visible());

        tokio::time::sleep(DEFAULT_EXPIRY - Duration::from_millis(1)).await;
        assert!(channel.is_visible());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let current = channel.current();
        assert!(!current.visible);
        assert_eq!(current.text, "Note created successfully!");
    }

    #[tokio::test(start_paused = true)]
    async fn repost_restarts_the_window_and_replaces_text() {
        let mut channel = NotificationChannel::new(Duration::from_secs(10));
        channel.post("X");
        tokio::time::sleep(Duration::from_secs(5)).await;
        channel.post("Y");

        tokio::time::sleep(Duration::from_secs(6)).await;
        let current = channel.current();
        assert_eq!(current.text, "Y");
        assert!(current.visible);
        assert_eq!(current.generation, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!channel.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_post_and_expiry() {
        let mut channel = NotificationChannel::new(Duration::from_secs(1));
        let mut receiver = channel.subscribe();
        channel.post("hello");
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().visible);

        receiver.changed().await.unwrap();
        assert!(!receiver.borrow_and_update().visible);
    }

    #[tokio::test]
    async fn dismiss_hides_immediately() {
        let mut channel = NotificationChannel::default();
        channel.post("bye");
        channel.dismiss();
        assert!(!channel.is_visible());
    }

    #[test]
    fn post_without_runtime_stays_visible() {
        let mut channel = NotificationChannel::default();
        channel.post("no runtime");
        assert!(channel.is_visible());
    }
}
