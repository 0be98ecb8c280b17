//! Per-entity exclusive locks for read-modify-write sequences.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
  identity::{StudentId, SupervisorId},
  thesis::ThesisId,
};

/// An entity whose state a lifecycle operation reads and then conditionally
/// writes.
///
/// The derived `Ord` is the global acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
  Supervisor(SupervisorId),
  Thesis(ThesisId),
  Student(StudentId),
}

/// Guards returned by [`KeyedLocks::acquire`]; everything unlocks on drop.
pub struct LockSet {
  _guards: Vec<OwnedMutexGuard<()>>,
}

/// A table of async mutexes, one per [`LockKey`] in use.
///
/// Operations on different keys never contend.
#[derive(Default)]
pub struct KeyedLocks {
  table: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
  pub fn new() -> Self { Self::default() }

  /// Lock every key in `keys`, in [`LockKey`] order so that two callers
  /// can never wait on each other.
  pub async fn acquire(
    &self,
    keys: impl IntoIterator<Item = LockKey>,
  ) -> LockSet {
    let mut keys: Vec<LockKey> = keys.into_iter().collect();
    keys.sort_unstable();
    keys.dedup();

    let locks: Vec<Arc<Mutex<()>>> = {
      let mut table = self.table.lock().await;
      // Entries nobody else holds a handle to are idle.
      table.retain(|_, lock| Arc::strong_count(lock) > 1);
      keys
        .iter()
        .map(|key| {
          Arc::clone(
            table
              .entry(*key)
              .or_insert_with(|| Arc::new(Mutex::new(()))),
          )
        })
        .collect()
    };

    let mut guards = Vec::with_capacity(locks.len());
    for lock in locks {
      guards.push(lock.lock_owned().await);
    }
    LockSet { _guards: guards }
  }

  #[cfg(test)]
  async fn tracked(&self) -> usize { self.table.lock().await.len() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_key_is_exclusive() {
    let locks = Arc::new(KeyedLocks::new());
    let held = locks.acquire([LockKey::Thesis(ThesisId(1))]).await;

    let contender = {
      let locks = Arc::clone(&locks);
      tokio::spawn(async move {
        locks.acquire([LockKey::Thesis(ThesisId(1))]).await;
      })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());

    drop(held);
    contender.await.unwrap();
  }

  #[tokio::test]
  async fn different_keys_do_not_block() {
    let locks = KeyedLocks::new();
    let _a = locks.acquire([LockKey::Thesis(ThesisId(1))]).await;

    let b = tokio::time::timeout(
      Duration::from_millis(100),
      locks.acquire([LockKey::Thesis(ThesisId(2))]),
    )
    .await;
    assert!(b.is_ok());
  }

  #[tokio::test]
  async fn duplicate_keys_are_locked_once() {
    let locks = KeyedLocks::new();
    let key = LockKey::Student(StudentId(4));
    let result = tokio::time::timeout(
      Duration::from_millis(100),
      locks.acquire([key, key]),
    )
    .await;
    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn opposite_orders_do_not_deadlock() {
    let locks = Arc::new(KeyedLocks::new());
    let a = LockKey::Supervisor(SupervisorId(1));
    let b = LockKey::Thesis(ThesisId(1));

    let mut tasks = Vec::new();
    for i in 0..50 {
      let locks = Arc::clone(&locks);
      let keys = if i % 2 == 0 { [a, b] } else { [b, a] };
      tasks.push(tokio::spawn(async move {
        let _held = locks.acquire(keys).await;
        tokio::task::yield_now().await;
      }));
    }

    for task in tasks {
      tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("no deadlock")
        .unwrap();
    }
  }

  #[tokio::test]
  async fn idle_entries_are_pruned() {
    let locks = KeyedLocks::new();
    drop(locks.acquire([LockKey::Thesis(ThesisId(1))]).await);
    drop(locks.acquire([LockKey::Thesis(ThesisId(2))]).await);
    assert_eq!(locks.tracked().await, 1);
  }
}
