use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Admits a single holder at a time to the entity store.
///
/// Waiters are admitted in arrival order, so every operation that runs under the gate
/// observes the effects of all operations admitted before it.
#[derive(Debug, Clone, Default)]
pub struct SerialGate {
    lock: Arc<Mutex<()>>,
}

/// Held while inside the gate. Dropping it lets the next waiter in,
/// whichever way the holder leaves (return, error, panic or cancellation).
#[derive(Debug)]
pub struct GatePermit {
    _guard: OwnedMutexGuard<()>,
}

impl SerialGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the gate is free and takes it.
    pub async fn acquire(&self) -> GatePermit {
        GatePermit {
            _guard: self.lock.clone().lock_owned().await,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use tokio::time::timeout;

    use super::SerialGate;

    #[tokio::test]
    async fn holders_never_overlap() {
        let gate = SerialGate::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let most_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let inside = inside.clone();
                let most_inside = most_inside.clone();

                tokio::spawn(async move {
                    let _permit = gate.acquire().await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    most_inside.fetch_max(now, Ordering::SeqCst);

                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.expect("task finishes");
        }

        assert_eq!(most_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_holder_releases_the_gate() {
        let gate = SerialGate::new();
        let held = gate.clone();

        let result = tokio::spawn(async move {
            let _permit = held.acquire().await;
            panic!("business logic blew up");
        })
        .await;

        assert!(result.is_err());
        assert!(timeout(Duration::from_secs(1), gate.acquire()).await.is_ok());
    }
}
