use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use evaka_finance_core::domain::person::PersonId;

type Registry = Arc<Mutex<HashMap<PersonId, Arc<AsyncMutex<()>>>>>;

/// In-process registry of one lock per head of family. Holding the guard means
/// no other generation run reads or writes that head's decisions.
///
/// An entry lives only while a guard for that head is held or awaited.
#[derive(Default)]
pub struct HeadOfFamilyLocks {
    locks: Registry,
}

pub struct HeadOfFamilyGuard {
    pub head_of_family: PersonId,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl HeadOfFamilyLocks {
    pub async fn acquire(&self, head_of_family: PersonId) -> HeadOfFamilyGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(head_of_family).or_default())
        };
        HeadOfFamilyGuard {
            head_of_family,
            registry: Arc::clone(&self.locks),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of heads of family with a held or awaited lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for HeadOfFamilyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // only the registry itself still refers to the lock: nobody is waiting
        if locks.get(&self.head_of_family).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.head_of_family);
        }
    }
}
