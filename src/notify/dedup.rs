use std::sync::Arc;
use tokio::sync::Mutex;

use super::notifier::Notifier;

/// Suppresses an alert identical to the last one sent. No expiry.
pub struct NotificationGate {
    notifier: Arc<dyn Notifier>,
    last_sent: Mutex<Option<String>>,
}

impl NotificationGate {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            last_sent: Mutex::new(None),
        }
    }

    /// Returns whether the text was handed to the notifier.
    pub async fn notify_if_new(&self, text: &str) -> bool {
        {
            let mut last_sent = self.last_sent.lock().await;
            if last_sent.as_deref() == Some(text) {
                tracing::debug!("Suppressing repeated notification: {}", text);
                return false;
            }
            // At-most-once: remembered even if delivery below fails.
            *last_sent = Some(text.to_string());
        }

        if let Err(e) = self.notifier.send(text).await {
            tracing::warn!("Failed to deliver notification: {}", e);
        }

        true
    }

    pub async fn last_sent(&self) -> Option<String> {
        self.last_sent.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BotError;
    use crate::notify::notifier::MockNotifier;

    #[tokio::test]
    async fn test_repeated_text_sent_once() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|text| text == "X")
            .times(1)
            .returning(|_| Ok(()));

        let gate = NotificationGate::new(Arc::new(notifier));
        assert!(gate.notify_if_new("X").await);
        assert!(!gate.notify_if_new("X").await);
    }

    #[tokio::test]
    async fn test_different_texts_both_sent() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(2).returning(|_| Ok(()));

        let gate = NotificationGate::new(Arc::new(notifier));
        assert!(gate.notify_if_new("X").await);
        assert!(gate.notify_if_new("Y").await);
        assert_eq!(gate.last_sent().await.as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn test_alternating_texts_are_not_suppressed() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(3).returning(|_| Ok(()));

        let gate = NotificationGate::new(Arc::new(notifier));
        gate.notify_if_new("X").await;
        gate.notify_if_new("Y").await;
        assert!(gate.notify_if_new("X").await);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_dedups() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_| Err(BotError::Transport("down".to_string())));

        let gate = NotificationGate::new(Arc::new(notifier));
        assert!(gate.notify_if_new("X").await);
        assert!(!gate.notify_if_new("X").await);
    }
}
