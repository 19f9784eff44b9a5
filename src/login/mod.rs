use log::{debug, error, info};
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::backend::AuthBackend;
use crate::session::SessionStore;

pub const LOGIN_PROMPT: &str = "Starting login...";

/// Fires the backend login command and tracks whether it is still running.
///
/// The button label is owned by the progress/complete event stream; this only
/// seeds it with [`LOGIN_PROMPT`] and never touches it again.
#[derive(Debug, Default)]
pub struct LoginTrigger {
    busy: bool,
    outcome: Option<oneshot::Receiver<Result<(), String>>>,
}

impl LoginTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn trigger<B: AuthBackend>(
        &mut self,
        store: &mut SessionStore,
        backend: &B,
        handle: &Handle,
    ) {
        if self.busy {
            debug!("login: already in progress");
            return;
        }
        self.busy = true;
        store.set_login_status_text(LOGIN_PROMPT);

        let backend = backend.clone();
        let (tx, rx) = oneshot::channel();
        handle.spawn(async move {
            let result = backend.login().await;
            if tx.send(result).is_err() {
                debug!("login: result dropped after detach");
            }
        });
        self.outcome = Some(rx);
        info!("login: requested");
    }

    /// Collect the command outcome once it has resolved. Failures are logged here.
    pub fn poll(&mut self) -> Option<Result<(), String>> {
        let rx = self.outcome.as_mut()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err("login task ended without a result".into()),
        };
        self.outcome = None;
        self.busy = false;
        match &result {
            Ok(()) => info!("login: command finished"),
            Err(err) => error!("login failed: {err}"),
        }
        Some(result)
    }

    /// Forget an outstanding login, e.g. when the screen goes away.
    pub fn detach(&mut self) {
        if self.outcome.take().is_some() {
            debug!("login: detached from pending command");
        }
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use crate::backend::{EventHub, EventKind};
    use crate::session::DEFAULT_LOGIN_LABEL;
    use crate::sync::{SessionSync, SyncState};

    #[derive(Clone)]
    struct GatedBackend {
        gate: Arc<Notify>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl GatedBackend {
        fn new(fail: bool) -> Self {
            Self {
                gate: Arc::new(Notify::new()),
                calls: Arc::new(AtomicUsize::new(0)),
                fail,
            }
        }
    }

    impl AuthBackend for GatedBackend {
        async fn login(&self) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.fail {
                Err("user closed the login window".into())
            } else {
                Ok(())
            }
        }
    }

    async fn wait_for_outcome(login: &mut LoginTrigger) -> Result<(), String> {
        for _ in 0..50 {
            if let Some(result) = login.poll() {
                return result;
            }
            tokio::task::yield_now().await;
        }
        panic!("login never resolved");
    }

    #[tokio::test]
    async fn label_follows_events_and_busy_follows_command() {
        let hub = EventHub::new();
        let mut store = SessionStore::default();
        let mut sync = SessionSync::new(hub.clone());
        sync.activate(&Handle::current());
        while sync.state() == SyncState::Activating {
            sync.pump(&mut store);
            tokio::task::yield_now().await;
        }
        assert_eq!(store.login_status_text(), DEFAULT_LOGIN_LABEL);

        let backend = GatedBackend::new(false);
        let mut login = LoginTrigger::new();
        login.trigger(&mut store, &backend, &Handle::current());
        assert!(login.is_busy());
        assert_eq!(store.login_status_text(), LOGIN_PROMPT);

        hub.emit(EventKind::LoginProgress, json!("Waiting for browser..."))
            .await;
        sync.pump(&mut store);
        assert_eq!(store.login_status_text(), "Waiting for browser...");

        hub.emit(EventKind::LoginComplete, Value::Null).await;
        sync.pump(&mut store);
        assert_eq!(store.login_status_text(), DEFAULT_LOGIN_LABEL);
        assert!(login.is_busy());
        assert!(login.poll().is_none());

        backend.gate.notify_one();
        assert!(wait_for_outcome(&mut login).await.is_ok());
        assert!(!login.is_busy());
    }

    #[tokio::test]
    async fn failure_clears_busy_and_keeps_label() {
        let mut store = SessionStore::default();
        let backend = GatedBackend::new(true);
        let mut login = LoginTrigger::new();
        login.trigger(&mut store, &backend, &Handle::current());
        store.set_login_status_text("Getting Token...");

        backend.gate.notify_one();
        let err = wait_for_outcome(&mut login).await.unwrap_err();
        assert!(err.contains("closed the login window"));
        assert!(!login.is_busy());
        assert_eq!(store.login_status_text(), "Getting Token...");
    }

    #[tokio::test]
    async fn second_trigger_while_busy_is_ignored() {
        let mut store = SessionStore::default();
        let backend = GatedBackend::new(false);
        let mut login = LoginTrigger::new();
        login.trigger(&mut store, &backend, &Handle::current());
        login.trigger(&mut store, &backend, &Handle::current());

        backend.gate.notify_one();
        wait_for_outcome(&mut login).await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detach_unsticks_busy_flag() {
        let mut store = SessionStore::default();
        let backend = GatedBackend::new(false);
        let mut login = LoginTrigger::new();
        login.trigger(&mut store, &backend, &Handle::current());

        login.detach();
        assert!(!login.is_busy());
        assert!(login.poll().is_none());
        login.detach();
    }

    #[tokio::test]
    async fn command_finishing_after_detach_is_discarded() {
        let mut store = SessionStore::default();
        let backend = GatedBackend::new(false);
        let mut login = LoginTrigger::new();
        login.trigger(&mut store, &backend, &Handle::current());
        tokio::task::yield_now().await;
        login.detach();

        backend.gate.notify_one();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(login.poll().is_none());
        assert!(!login.is_busy());
    }
}
