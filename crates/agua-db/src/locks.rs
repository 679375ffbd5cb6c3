//! # Per-Client Critical Sections
//!
//! Every mutation of a client's vouchers or subscription runs while holding
//! that client's async mutex, on top of its SQLite transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ClientLocks (shared by every clone of Database)                        │
//! │                                                                         │
//! │  "client-a" ──► Arc<Mutex<()>>   ◄── allocate_payment   (holds)         │
//! │                                  ◄── place_order credit (waits)         │
//! │  "client-b" ──► Arc<Mutex<()>>   ◄── allocate_payment   (holds)         │
//! │                                                                         │
//! │  Different clients never wait on each other.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tokio mutex is not reentrant: a service that holds a client's lock
//! must call the transaction-level helpers, never another locking service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of per-client async mutexes.
///
/// An entry lives only while some task holds or waits on it.
#[derive(Debug, Clone, Default)]
pub struct ClientLocks {
    inner: Arc<Mutex<Registry>>,
}

impl ClientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `client_id`. Released on drop.
    pub async fn lock(&self, client_id: &str) -> ClientGuard {
        let guard = self.handle(client_id).lock_owned().await;

        ClientGuard {
            guard: Some(guard),
            client_id: client_id.to_string(),
            locks: self.clone(),
        }
    }

    /// Number of clients currently held or awaited.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, client_id: &str) -> Arc<AsyncMutex<()>> {
        self.registry()
            .entry(client_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the entry of `client_id` if the registry holds the last handle.
    fn release(&self, client_id: &str) {
        let mut registry = self.registry();
        let idle = registry
            .get(client_id)
            .is_some_and(|handle| Arc::strong_count(handle) == 1);
        if idle {
            registry.remove(client_id);
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Entries are inserted and removed whole, so a poisoned map is still consistent
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive access to one client. Unlocks and prunes the registry on drop.
#[derive(Debug)]
pub struct ClientGuard {
    guard: Option<OwnedMutexGuard<()>>,
    client_id: String,
    locks: ClientLocks,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        // Unlock first so our handle no longer counts
        self.guard.take();
        self.locks.release(&self.client_id);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_client_is_exclusive() {
        let locks = ClientLocks::new();
        let guard = locks.lock("c-1").await;

        assert!(locks.handle("c-1").try_lock().is_err());

        drop(guard);
        assert!(locks.handle("c-1").try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_different_clients_do_not_block() {
        let locks = ClientLocks::new();
        let _a = locks.lock("c-1").await;
        let _b = locks.lock("c-2").await;

        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_clients_leave_the_registry() {
        let locks = ClientLocks::new();

        for n in 0..100 {
            let _guard = locks.lock(&format!("c-{n}")).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_another_task_waits() {
        let locks = ClientLocks::new();
        let first = locks.lock("c-1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock("c-1").await;
            })
        };
        // Let the waiter register its handle
        while Arc::strong_count(&locks.handle("c-1")) < 4 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
