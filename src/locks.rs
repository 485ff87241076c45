// Per-game lock manager: serializes async critical sections by game id.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

/// Serializes load-decide-persist sections per game while letting different
/// games run in parallel.
///
/// tokio's mutex wakes waiters in FIFO order, so operations on one game run
/// in submission order and a failed operation never poisons the queue. The
/// map entry is reaped once nobody holds or awaits the lock, bounding
/// memory to the set of games with in-flight work.
#[derive(Default)]
pub struct GameLocks {
    entries: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `game_id`. No acquisition timeout;
    /// callers enforce their own deadlines at the boundary.
    pub async fn with_lock<F, Fut, T>(&self, game_id: Uuid, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let entry = {
            let mut entries = self.entries.lock().await;
            entries.entry(game_id).or_default().clone()
        };

        let result = {
            let _guard = entry.lock().await;
            f().await
        };

        let mut entries = self.entries.lock().await;
        if let Some(current) = entries.get(&game_id) {
            // Two strong refs mean the map's and ours: nobody else is queued.
            // Cloning requires the map mutex we hold, so the check is exact.
            if Arc::ptr_eq(current, &entry) && Arc::strong_count(current) == 2 {
                entries.remove(&game_id);
            }
        }
        result
    }

    /// Number of games with a live lock entry.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    #[tokio::test]
    async fn same_game_operations_are_serialized_in_order() {
        let locks = Arc::new(GameLocks::new());
        let game_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::new();
        for i in 0..4u32 {
            let locks = locks.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                locks
                    .with_lock(game_id, || async {
                        tx.send((i, "enter")).unwrap();
                        sleep(Duration::from_millis(10)).await;
                        tx.send((i, "exit")).unwrap();
                    })
                    .await;
            }));
            // stagger submissions so queue order is deterministic
            sleep(Duration::from_millis(5)).await;
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        // every enter is immediately followed by its own exit
        for pair in events.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0);
            assert_eq!(pair[0].1, "enter");
            assert_eq!(pair[1].1, "exit");
        }
        let order: Vec<u32> = events.iter().step_by(2).map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn different_games_run_concurrently() {
        let locks = Arc::new(GameLocks::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let locks_a = locks.clone();
        let tx_a = tx.clone();
        let a = tokio::spawn(async move {
            locks_a
                .with_lock(first, || async {
                    tx_a.send("a-enter").unwrap();
                    sleep(Duration::from_millis(50)).await;
                    tx_a.send("a-exit").unwrap();
                })
                .await;
        });

        // give task a time to take its lock
        sleep(Duration::from_millis(10)).await;

        let locks_b = locks.clone();
        let tx_b = tx.clone();
        let b = tokio::spawn(async move {
            locks_b
                .with_lock(second, || async {
                    tx_b.send("b-enter").unwrap();
                    tx_b.send("b-exit").unwrap();
                })
                .await;
        });

        a.await.unwrap();
        b.await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        // b entered its critical section while a was still inside its own
        assert_eq!(events, vec!["a-enter", "b-enter", "b-exit", "a-exit"]);
    }

    #[tokio::test]
    async fn a_failed_operation_does_not_poison_the_queue() {
        let locks = GameLocks::new();
        let game_id = Uuid::new_v4();

        let failed: Result<(), &str> = locks.with_lock(game_id, || async { Err("boom") }).await;
        assert!(failed.is_err());

        let ok = locks.with_lock(game_id, || async { 42 }).await;
        assert_eq!(ok, 42);
    }

    #[tokio::test]
    async fn entries_are_reaped_once_the_queue_drains() {
        let locks = Arc::new(GameLocks::new());
        let game_id = Uuid::new_v4();

        locks.with_lock(game_id, || async {}).await;
        assert_eq!(locks.entry_count().await, 0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                locks
                    .with_lock(game_id, || async {
                        sleep(Duration::from_millis(1)).await;
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(locks.entry_count().await, 0);
    }
}
