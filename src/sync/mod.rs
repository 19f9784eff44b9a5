//! Bridges backend notifications into the [`SessionStore`] for as long as the
//! accounts screen is mounted.
//!
//! Registration runs on the tokio runtime; everything that touches the store
//! happens in [`SessionSync::pump`] on the thread that owns it, so store
//! mutations never interleave. Each listener buffers from the moment it is
//! registered, which is what keeps notifications from being lost while the
//! other listeners are still registering.

use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::backend::{EventKind, Notification, NotificationChannel, Subscription};
use crate::session::SessionStore;
use crate::session::normalize::AccountPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Activating,
    Active,
    Released,
}

struct Subscriptions {
    progress: Subscription,
    account_added: Subscription,
    complete: Subscription,
}

impl Subscriptions {
    fn release(self) {
        self.progress.release();
        self.account_added.release();
        self.complete.release();
    }
}

enum Lifecycle {
    Idle,
    Activating {
        task: JoinHandle<()>,
        ready: oneshot::Receiver<Subscriptions>,
    },
    Active(Subscriptions),
    Released,
}

pub struct SessionSync<C> {
    channel: C,
    lifecycle: Lifecycle,
}

impl<C: NotificationChannel> SessionSync<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        match self.lifecycle {
            Lifecycle::Idle => SyncState::Idle,
            Lifecycle::Activating { .. } => SyncState::Activating,
            Lifecycle::Active(_) => SyncState::Active,
            Lifecycle::Released => SyncState::Released,
        }
    }

    /// Start registering the three listeners. Only the first call does anything.
    pub fn activate(&mut self, handle: &Handle) {
        if !matches!(self.lifecycle, Lifecycle::Idle) {
            debug!("sync: activate ignored in state {:?}", self.state());
            return;
        }
        let channel = self.channel.clone();
        let (tx, ready) = oneshot::channel();
        let task = handle.spawn(async move {
            match register(&channel).await {
                Ok(subscriptions) => {
                    if tx.send(subscriptions).is_err() {
                        debug!("sync: released before registration finished");
                    }
                }
                Err(err) => error!("sync: failed to register listeners: {err}"),
            }
        });
        self.lifecycle = Lifecycle::Activating { task, ready };
        info!("sync: registering backend listeners");
    }

    /// Apply every buffered notification to `store`, returning how many were applied.
    pub fn pump(&mut self, store: &mut SessionStore) -> usize {
        if let Lifecycle::Activating { ready, .. } = &mut self.lifecycle {
            match ready.try_recv() {
                Ok(subscriptions) => {
                    info!("sync: backend listeners active");
                    self.lifecycle = Lifecycle::Active(subscriptions);
                }
                Err(TryRecvError::Empty) => return 0,
                Err(TryRecvError::Closed) => {
                    warn!("sync: registration ended without listeners");
                    self.lifecycle = Lifecycle::Released;
                    return 0;
                }
            }
        }

        let Lifecycle::Active(subscriptions) = &mut self.lifecycle else {
            return 0;
        };
        // Completion is drained last so a label reset wins over progress in the same batch.
        let mut applied = 0;
        for subscription in [
            &mut subscriptions.progress,
            &mut subscriptions.account_added,
            &mut subscriptions.complete,
        ] {
            while let Some(notification) = subscription.try_next() {
                apply_notification(store, notification);
                applied += 1;
            }
        }
        applied
    }

    /// Release every listener. Safe in any state, including mid-registration.
    pub fn deactivate(&mut self) {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::Idle => debug!("sync: deactivated before activation"),
            Lifecycle::Activating { task, ready } => {
                task.abort();
                // Dropping the receiver drops any listeners already handed over.
                drop(ready);
                info!("sync: registration cancelled");
            }
            Lifecycle::Active(subscriptions) => {
                subscriptions.release();
                info!("sync: backend listeners released");
            }
            Lifecycle::Released => debug!("sync: already released"),
        }
    }
}

async fn register<C: NotificationChannel>(channel: &C) -> Result<Subscriptions, String> {
    let (progress, complete, account_added) = tokio::try_join!(
        channel.listen(EventKind::LoginProgress),
        channel.listen(EventKind::LoginComplete),
        channel.listen(EventKind::AccountAdded),
    )?;
    Ok(Subscriptions {
        progress,
        account_added,
        complete,
    })
}

fn apply_notification(store: &mut SessionStore, notification: Notification) {
    match notification.event {
        EventKind::LoginProgress => match notification.payload.as_str() {
            Some(text) => store.set_login_status_text(text),
            None => warn!(
                "sync: ignoring login-progress with non-text payload {}",
                notification.payload
            ),
        },
        EventKind::LoginComplete => store.reset_login_status_text(),
        EventKind::AccountAdded => {
            match serde_json::from_value::<AccountPayload>(notification.payload) {
                Ok(payload) => store.apply_account_added(&payload),
                Err(err) => warn!("sync: ignoring malformed account-added payload: {err}"),
            }
        }
    }
}
