//! Notification channel between the native auth backend and the accounts screen.
//!
//! The backend only ever talks to the session layer through named events;
//! the single outbound command is [`AuthBackend::login`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

pub mod helper;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    LoginProgress,
    LoginComplete,
    AccountAdded,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::LoginProgress => "login-progress",
            EventKind::LoginComplete => "login-complete",
            EventKind::AccountAdded => "account-added",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "login-progress" => Some(EventKind::LoginProgress),
            "login-complete" => Some(EventKind::LoginComplete),
            "account-added" => Some(EventKind::AccountAdded),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub event: EventKind,
    pub payload: Value,
}

/// Push channel the backend emits on. Registering a listener may suspend.
pub trait NotificationChannel: Clone + Send + Sync + 'static {
    fn listen(
        &self,
        event: EventKind,
    ) -> impl Future<Output = Result<Subscription, String>> + Send;
}

/// The one command the session layer sends to the backend.
pub trait AuthBackend: Clone + Send + Sync + 'static {
    fn login(&self) -> impl Future<Output = Result<(), String>> + Send;
}

/// Receiving end of one listener. Dropping it unregisters the listener as well.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    event: EventKind,
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Subscription {
    /// Next buffered notification without waiting.
    pub fn try_next(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub async fn next(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn release(mut self) {
        self.rx.close();
        debug!("released {} listener #{}", self.event.name(), self.id);
    }
}

struct Listener {
    event: EventKind,
    tx: mpsc::UnboundedSender<Notification>,
}

#[derive(Default)]
struct HubInner {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

/// In-process fan-out for backend events.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every live listener of `event`, returning how many were reached.
    pub async fn emit(&self, event: EventKind, payload: Value) -> usize {
        let mut listeners = self.inner.listeners.lock().await;
        listeners.retain(|listener| !listener.tx.is_closed());
        let mut reached = 0;
        for listener in listeners.iter().filter(|l| l.event == event) {
            let notification = Notification {
                event,
                payload: payload.clone(),
            };
            if listener.tx.send(notification).is_ok() {
                reached += 1;
            }
        }
        debug!("emit {}: {} listener(s)", event.name(), reached);
        reached
    }

    /// Live listeners for `event`; released ones are pruned first.
    #[cfg(test)]
    pub async fn listener_count(&self, event: EventKind) -> usize {
        let mut listeners = self.inner.listeners.lock().await;
        listeners.retain(|listener| !listener.tx.is_closed());
        listeners.iter().filter(|l| l.event == event).count()
    }
}

impl NotificationChannel for EventHub {
    async fn listen(&self, event: EventKind) -> Result<Subscription, String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .await
            .push(Listener { event, tx });
        debug!("registered {} listener #{}", event.name(), id);
        Ok(Subscription { id, event, rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_match_the_wire() {
        for kind in [
            EventKind::LoginProgress,
            EventKind::LoginComplete,
            EventKind::AccountAdded,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("login-failed"), None);
    }

    #[tokio::test]
    async fn emits_only_to_matching_listeners_in_order() {
        let hub = EventHub::new();
        let mut progress = hub.listen(EventKind::LoginProgress).await.unwrap();
        let mut complete = hub.listen(EventKind::LoginComplete).await.unwrap();

        assert_eq!(hub.emit(EventKind::LoginProgress, json!("one")).await, 1);
        assert_eq!(hub.emit(EventKind::LoginProgress, json!("two")).await, 1);

        assert_eq!(progress.next().await.unwrap().payload, json!("one"));
        assert_eq!(progress.next().await.unwrap().payload, json!("two"));
        assert!(progress.try_next().is_none());
        assert!(complete.try_next().is_none());
    }

    #[tokio::test]
    async fn emit_without_listeners_reaches_nobody() {
        let hub = EventHub::new();
        assert_eq!(hub.emit(EventKind::AccountAdded, json!({})).await, 0);
    }

    #[tokio::test]
    async fn released_and_dropped_listeners_are_pruned() {
        let hub = EventHub::new();
        let first = hub.listen(EventKind::LoginComplete).await.unwrap();
        let second = hub.listen(EventKind::LoginComplete).await.unwrap();
        assert_eq!(hub.listener_count(EventKind::LoginComplete).await, 2);

        first.release();
        assert_eq!(hub.listener_count(EventKind::LoginComplete).await, 1);

        drop(second);
        assert_eq!(hub.emit(EventKind::LoginComplete, Value::Null).await, 0);
        assert_eq!(hub.listener_count(EventKind::LoginComplete).await, 0);
    }
}
