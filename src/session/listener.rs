use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::models::SessionState;

/// Something interested in session transitions.
///
/// Listeners are called synchronously, in registration order, and only when the
/// state actually changes. They never see `SessionState::Unknown`.
pub trait StateListener: Send + Sync {
    fn notify(&self, state: SessionState);
}

impl<F> StateListener for F
where
    F: Fn(SessionState) + Send + Sync,
{
    fn notify(&self, state: SessionState) {
        self(state)
    }
}

/// Handle returned on registration, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn StateListener>)>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: Arc<dyn StateListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Copy of the current listeners, so they can be called without holding any lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn StateListener>> {
        self.listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

/// Deliver `state` to every listener. A panicking listener is logged and skipped.
pub(crate) fn notify_all(listeners: &[Arc<dyn StateListener>], state: SessionState) {
    for (index, listener) in listeners.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| listener.notify(state))).is_err() {
            warn!(
                listener_index = index,
                state = %state,
                "session listener panicked; continuing with the remaining listeners"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listeners_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        for name in ["first", "second", "third"] {
            let calls = calls.clone();
            registry.add(Arc::new(move |state: SessionState| {
                calls.lock().unwrap().push((name, state));
            }));
        }

        notify_all(&registry.snapshot(), SessionState::Authenticated);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("first", SessionState::Authenticated),
                ("second", SessionState::Authenticated),
                ("third", SessionState::Authenticated),
            ]
        );
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = ListenerRegistry::default();
        registry.add(Arc::new(|_: SessionState| {
            panic!("broken listener");
        }));
        let counter = calls.clone();
        registry.add(Arc::new(move |_: SessionState| {
            *counter.lock().unwrap() += 1;
        }));

        notify_all(&registry.snapshot(), SessionState::Unauthenticated);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let mut registry = ListenerRegistry::default();
        let id = registry.add(Arc::new(|_: SessionState| {}));
        let other = registry.add(Arc::new(|_: SessionState| {}));
        assert_ne!(id, other);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
