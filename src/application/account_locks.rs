//! Per-account mutation guard.
//!
//! Balance and subscription updates are read-then-write sequences that the
//! store alone does not serialize. Every mutation of one account's ledger or
//! subscription runs while holding that account's guard; different accounts
//! never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::TelegramId;

type LockTable = Arc<Mutex<HashMap<TelegramId, Arc<AsyncMutex<()>>>>>;

/// Keyed mutex table. Entries are removed when the last holder releases them.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    table: LockTable,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `identity`'s account.
    pub async fn lock(&self, identity: TelegramId) -> AccountGuard {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(identity).or_default().clone()
        };
        let guard = entry.lock_owned().await;
        AccountGuard {
            identity,
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Number of accounts currently locked or awaited.
    pub fn active(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one account, released on drop.
#[derive(Debug)]
pub struct AccountGuard {
    identity: TelegramId,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AccountGuard {
    pub fn identity(&self) -> TelegramId {
        self.identity
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // The table and this guard hold the only references: nobody is waiting.
        if let Some(entry) = table.get(&self.identity) {
            if Arc::strong_count(entry) == 2 {
                table.remove(&self.identity);
            }
        }
        self.guard.take();
    }
}
