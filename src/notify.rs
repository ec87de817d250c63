//! Hand-off of fired reminders to the notification output.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Always raise a visible notification, even when spoken.
    AlwaysNotify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub reminder_id: String,
    pub message: String,
    pub priority: Priority,
    pub mode: DeliveryMode,
}

impl Notification {
    /// Reminders are always delivered at high priority with a visible notification.
    pub fn reminder(reminder_id: &str, message: &str) -> Self {
        Self {
            reminder_id: reminder_id.to_string(),
            message: message.to_string(),
            priority: Priority::High,
            mode: DeliveryMode::AlwaysNotify,
        }
    }
}

/// Output queue. Fire-and-forget: the engine never waits for delivery.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

/// Pushes notifications into a tokio channel drained by the host.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn enqueue(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::warn!("notification receiver dropped, reminder not delivered");
        }
    }
}
