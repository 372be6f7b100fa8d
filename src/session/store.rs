use super::error::SessionError;
use crate::persistence::User;
use crate::shared::fs_atomic::{atomic_write_json, remove_file_if_exists};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(User),
    SignedOut,
}

#[derive(Debug, Default)]
struct SessionState {
    current: Option<User>,
    subscribers: Vec<(u64, Sender<SessionEvent>)>,
    next_subscriber_id: u64,
}

/// Holds the authenticated identity for one session and notifies
/// subscribers when it changes. Shared as `Arc<SessionStore>`.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<SessionState>,
    persist_path: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store mirrored to `path`, restoring any previously saved user.
    pub fn persistent(path: &Path) -> Result<Self, SessionError> {
        let current = match fs::read_to_string(path) {
            Ok(raw) => Some(serde_json::from_str::<User>(&raw).map_err(|source| {
                SessionError::Parse {
                    path: path.display().to_string(),
                    source,
                }
            })?),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(SessionError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self {
            state: Mutex::new(SessionState {
                current,
                ..SessionState::default()
            }),
            persist_path: Some(path.to_path_buf()),
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().current.clone()
    }

    pub fn require_user(&self) -> Result<User, SessionError> {
        self.current_user().ok_or(SessionError::NotAuthenticated)
    }

    pub fn sign_in(&self, user: User) -> Result<(), SessionError> {
        if let Some(path) = self.persist_path.as_ref() {
            atomic_write_json(path, &user).map_err(|source| SessionError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        let mut state = self.lock();
        state.current = Some(user.clone());
        publish(&mut state, SessionEvent::SignedIn(user));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), SessionError> {
        if let Some(path) = self.persist_path.as_ref() {
            remove_file_if_exists(path).map_err(|source| SessionError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        let mut state = self.lock();
        let was_signed_in = state.current.take().is_some();
        if was_signed_in {
            publish(&mut state, SessionEvent::SignedOut);
        }
        Ok(())
    }

    pub fn subscribe(self: &Arc<Self>) -> SessionSubscription {
        let (sender, receiver) = mpsc::channel();
        let mut state = self.lock();
        let id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.push((id, sender));
        SessionSubscription {
            id,
            receiver,
            store: Arc::downgrade(self),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn remove_subscriber(&self, id: u64) {
        self.lock()
            .subscribers
            .retain(|(subscriber_id, _)| *subscriber_id != id);
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn publish(state: &mut SessionState, event: SessionEvent) {
    // Subscribers whose receiver is gone are pruned on send failure.
    state
        .subscribers
        .retain(|(_, sender)| sender.send(event.clone()).is_ok());
}

/// Receiving end of a session subscription. Dropping it, or calling
/// [`SessionSubscription::unsubscribe`], detaches it from the store.
#[derive(Debug)]
pub struct SessionSubscription {
    id: u64,
    receiver: Receiver<SessionEvent>,
    store: Weak<SessionStore>,
}

impl SessionSubscription {
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_subscriber(self.id);
        }
    }
}
