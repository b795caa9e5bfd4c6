//! Collapses concurrent identical computations into one in-flight call.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Singleflight coordinator.
///
/// The first caller for a key becomes the leader and runs the computation;
/// callers arriving while it is in flight wait and receive the leader's
/// result, success or failure alike. Nothing is cached past the burst: once
/// the leader publishes, the key is clear and the next call starts fresh. A
/// leader that disappears without publishing (panic, cancellation) wakes its
/// followers, and one of them takes over.
pub struct Singleflight<K, V> {
    inflight: Mutex<HashMap<K, broadcast::Sender<V>>>,
}

impl<K, V> Singleflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `compute` for `key`, or wait for the identical in-flight call.
    pub async fn run<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        loop {
            let waiter = {
                let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
                match inflight.get(&key) {
                    Some(leader) => Some(leader.subscribe()),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        inflight.insert(key.clone(), sender);
                        None
                    }
                }
            };

            match waiter {
                Some(mut receiver) => match receiver.recv().await {
                    Ok(value) => return value,
                    // Leader vanished without publishing; contend again.
                    Err(_) => continue,
                },
                None => break,
            }
        }

        // Leadership: make sure the key is cleared even if `compute` panics
        // or this future is dropped at an await point.
        let lead = Lead {
            flight: self,
            key: &key,
        };
        let value = compute().await;
        lead.publish(value.clone());
        value
    }
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

struct Lead<'a, K: Eq + Hash, V> {
    flight: &'a Singleflight<K, V>,
    key: &'a K,
}

impl<K: Eq + Hash, V> Lead<'_, K, V> {
    fn take_sender(&self) -> Option<broadcast::Sender<V>> {
        self.flight
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key)
    }

    fn publish(self, value: V) {
        if let Some(sender) = self.take_sender() {
            // No waiting followers is fine.
            let _ = sender.send(value);
        }
        std::mem::forget(self);
    }
}

impl<K: Eq + Hash, V> Drop for Lead<'_, K, V> {
    fn drop(&mut self) {
        // Abandoned without publishing: clear the key so followers retry.
        let _ = self.take_sender();
    }
}

#[cfg(test)]
mod tests {
    use super::Singleflight;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn burst_executes_compute_once() {
        let flight = Arc::new(Singleflight::<String, usize>::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let executions = Arc::clone(&executions);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    flight
                        .run("token:a@example.com".to_string(), || async {
                            executions.fetch_add(1, Ordering::SeqCst);
                            // Hold the flight open so the burst overlaps.
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            42
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.expect("task"), 42);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let flight = Singleflight::<String, String>::new();
        let first = flight.run("a".to_string(), || async { "one".to_string() });
        let second = flight.run("b".to_string(), || async { "two".to_string() });
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, "one");
        assert_eq!(second, "two");
    }

    #[tokio::test]
    async fn failures_are_shared_but_not_cached() {
        let flight = Singleflight::<String, Result<String, String>>::new();

        let failed = flight
            .run("key".to_string(), || async { Err("boom".to_string()) })
            .await;
        assert_eq!(failed, Err("boom".to_string()));

        // The burst is over; the next call computes fresh.
        let recovered = flight
            .run("key".to_string(), || async { Ok("fine".to_string()) })
            .await;
        assert_eq!(recovered, Ok("fine".to_string()));
    }

    #[tokio::test]
    async fn sequential_calls_each_execute() {
        let flight = Singleflight::<String, usize>::new();
        let executions = AtomicUsize::new(0);
        for _ in 0..3 {
            flight
                .run("key".to_string(), || async {
                    executions.fetch_add(1, Ordering::SeqCst)
                })
                .await;
        }
        assert_eq!(executions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn abandoned_leader_unblocks_followers() {
        let flight = Arc::new(Singleflight::<String, usize>::new());

        let leader = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run("key".to_string(), || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        1
                    })
                    .await
            })
        };
        // Let the leader claim the key, then kill it mid-flight.
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();
        let _ = leader.await;

        let value = tokio::time::timeout(
            Duration::from_secs(5),
            flight.run("key".to_string(), || async { 2 }),
        )
        .await
        .expect("follower must not deadlock");
        assert_eq!(value, 2);
    }
}
