//! Outbound notifications.
//!
//! Operations publish a [`Notification`] after their transaction commits. A
//! dispatcher task drains the channel and hands every event to the registered
//! notifiers, so delivery never delays or fails the request that caused it.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::money::{Cents, from_cents};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TransferCompleted {
        reference: String,
        sender_email: String,
        receiver_email: String,
        amount: Cents,
        plan: String,
    },
    DepositCredited {
        reference: String,
        email: String,
        amount: Cents,
    },
    WithdrawalRequested {
        reference: String,
        email: String,
        amount: Cents,
    },
}

impl Notification {
    pub fn reference(&self) -> &str {
        match self {
            Notification::TransferCompleted { reference, .. }
            | Notification::DepositCredited { reference, .. }
            | Notification::WithdrawalRequested { reference, .. } => reference,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &Notification);
}

/// Writes every event to the log. Stands in for email delivery.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &Notification) {
        match event {
            Notification::TransferCompleted {
                reference,
                sender_email,
                receiver_email,
                amount,
                plan,
            } => {
                info!(
                    reference = %reference,
                    from = %sender_email,
                    to = %receiver_email,
                    amount = %from_cents(*amount),
                    plan = %plan,
                    "transfer notification"
                );
            }
            Notification::DepositCredited {
                reference,
                email,
                amount,
            } => {
                info!(reference = %reference, to = %email, amount = %from_cents(*amount), "deposit notification");
            }
            Notification::WithdrawalRequested {
                reference,
                email,
                amount,
            } => {
                info!(reference = %reference, to = %email, amount = %from_cents(*amount), "withdrawal notification");
            }
        }
    }
}

/// Registry of notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub async fn notify_all(&self, event: &Notification) {
        for notifier in &self.notifiers {
            notifier.notify(event).await;
        }
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

/// Sending half handed to services.
#[derive(Clone)]
pub struct NotificationPublisher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: Notification) {
        if let Err(e) = self.tx.send(event) {
            warn!(reference = %e.0.reference(), "notification dropped, dispatcher is gone");
        }
    }
}

/// Drain `rx` until every publisher is dropped.
pub fn spawn_dispatcher(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    registry: NotifierRegistry,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            registry.notify_all(&event).await;
        }
        info!("notification dispatcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recording(Arc<Mutex<Vec<Notification>>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, event: &Notification) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_to_every_notifier() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Recording(Arc::clone(&seen))));
        registry.register(Box::new(LogNotifier));
        assert_eq!(registry.len(), 2);

        let (publisher, rx) = NotificationPublisher::channel();
        let handle = spawn_dispatcher(rx, registry);

        publisher.publish(Notification::DepositCredited {
            reference: "REF1".into(),
            email: "a@example.com".into(),
            amount: 500,
        });
        drop(publisher);
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reference(), "REF1");
    }

    #[tokio::test]
    async fn publishing_without_dispatcher_does_not_panic() {
        let (publisher, rx) = NotificationPublisher::channel();
        drop(rx);
        publisher.publish(Notification::WithdrawalRequested {
            reference: "REF2".into(),
            email: "b@example.com".into(),
            amount: 100,
        });
    }
}
