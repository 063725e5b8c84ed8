//! Optimistic state with exact rollback
//!
//! ```text
//!   snapshot + apply ──> publish ──> wait for wire ──> send
//!                                                      │
//!                              ok ──> settle ──────────┤
//!                              err ─> restore snapshot ┘
//! ```
//!
//! Mutations on one resource go out one at a time, in the order they were
//! applied. A failure restores that mutation's own snapshot, which also
//! discards every mutation applied after it; those are reported as
//! [`Outcome::Superseded`] and never sent.
//!
//! A settle may replace the value with what the server returned. While later
//! mutations are still queued, that result is held back on the wire as the
//! confirmed value and each queued mutation replays its change onto it before
//! sending. The published value keeps showing the optimistic chain until the
//! queue drains, and every snapshot a queued mutation rolls back to is
//! server-confirmed.

use crate::scope::ViewScope;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::debug;
use wblog_core::Result;

/// Result of a mutation that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// Sent and accepted by the server
    Applied(R),
    /// Never sent: discarded by an earlier failure's rollback, or the view
    /// was already closed
    Superseded,
}

impl<R> Outcome<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// One optimistically mutated resource
pub struct Optimistic<T> {
    state: watch::Sender<T>,
    /// Held for the duration of each request. Carries the confirmed value
    /// that queued mutations replay onto.
    wire: Mutex<Option<T>>,
    /// Mutations applied so far
    staged: AtomicU64,
    /// Mutations that have reached the wire
    reached: AtomicU64,
    /// Bumped by every rollback
    rollbacks: AtomicU64,
    scope: ViewScope,
}

struct Staged<T, I> {
    seq: u64,
    generation: u64,
    snapshot: T,
    /// Value right after this mutation's own apply
    own: T,
    intent: I,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(initial: T, scope: ViewScope) -> Self {
        Self {
            state: watch::channel(initial).0,
            wire: Mutex::new(None),
            staged: AtomicU64::new(0),
            reached: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            scope,
        }
    }

    pub fn get(&self) -> T {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.state.subscribe()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Overwrite with server truth. Waits for the request in flight; if
    /// mutations are queued behind it they replay onto `value`.
    /// Returns false once the view is closed.
    pub async fn replace(&self, value: T) -> bool {
        if !self.scope.is_open() {
            return false;
        }
        let mut confirmed = self.wire.lock().await;
        self.confirm(value, &mut confirmed);
        true
    }

    /// Run one optimistic mutation.
    ///
    /// `apply` edits the local value and returns what to send. It runs again
    /// if an earlier mutation's server result has to be replayed onto. `send`
    /// performs the request; `settle` folds the server's answer into the value.
    pub async fn mutate<I, R, F, Fut>(
        &self,
        mut apply: impl FnMut(&mut T) -> I,
        send: F,
        settle: impl FnOnce(&mut T, &R),
    ) -> Result<Outcome<R>>
    where
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if !self.scope.is_open() {
            return Ok(Outcome::Superseded);
        }

        // Staging happens under the watch lock, so a concurrent rollback or
        // settle lands either entirely before or entirely after.
        let mut stage = None;
        self.state.send_modify(|value| {
            let seq = self.staged.fetch_add(1, Ordering::AcqRel);
            let generation = self.rollbacks.load(Ordering::Acquire);
            let snapshot = value.clone();
            let intent = apply(value);
            stage = Some(Staged {
                seq,
                generation,
                snapshot,
                own: value.clone(),
                intent,
            });
        });
        let Some(mut stage) = stage else {
            return Ok(Outcome::Superseded);
        };

        let mut confirmed = self.wire.lock().await;
        self.reached.store(stage.seq + 1, Ordering::Release);
        if self.rollbacks.load(Ordering::Acquire) != stage.generation {
            debug!("mutation discarded by an earlier rollback");
            if let Some(base) = confirmed.take() {
                self.confirm(base, &mut confirmed);
            }
            return Ok(Outcome::Superseded);
        }

        if let Some(base) = confirmed.take() {
            debug!(seq = stage.seq, "replaying onto confirmed value");
            let mut own = base.clone();
            stage.intent = apply(&mut own);
            stage.snapshot = base;
            stage.own = own;
        }

        let Staged {
            snapshot,
            mut own,
            intent,
            ..
        } = stage;
        match send(intent).await {
            Ok(answer) => {
                settle(&mut own, &answer);
                self.confirm(own, &mut confirmed);
                Ok(Outcome::Applied(answer))
            }
            Err(error) => {
                let open = self.scope.is_open();
                self.state.send_if_modified(|value| {
                    self.rollbacks.fetch_add(1, Ordering::AcqRel);
                    if open {
                        *value = snapshot;
                    }
                    open
                });
                debug!(error = %error, "mutation rolled back");
                Err(error)
            }
        }
    }

    /// Publish a confirmed value, or hold it on the wire while queued
    /// mutations still have to replay onto it
    fn confirm(&self, value: T, held: &mut Option<T>) {
        let open = self.scope.is_open();
        self.state.send_if_modified(|current| {
            if self.queued() {
                *held = Some(value);
                false
            } else if open {
                *current = value;
                true
            } else {
                false
            }
        });
    }

    /// Whether mutations applied earlier are still waiting for the wire
    fn queued(&self) -> bool {
        self.staged.load(Ordering::Acquire) > self.reached.load(Ordering::Acquire)
    }
}

/// Move a counter one step, never below zero
pub fn step(count: u64, up: bool) -> u64 {
    if up {
        count.saturating_add(1)
    } else {
        count.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;
    use wblog_core::Error;

    fn failing() -> Error {
        Error::Network("reset".to_string())
    }

    #[tokio::test]
    async fn test_success_keeps_and_settles() {
        let counter = Optimistic::new(10u64, ViewScope::new());
        let mut seen = counter.subscribe();

        let outcome = counter
            .mutate(
                |n| {
                    *n += 1;
                    *n
                },
                |sent| async move { Ok::<_, Error>(sent * 2) },
                |n, answer| *n += answer,
            )
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Applied(22));
        assert_eq!(counter.get(), 33);
        assert!(seen.has_changed().unwrap());
        assert_eq!(*seen.borrow_and_update(), 33);
    }

    #[tokio::test]
    async fn test_failure_restores_snapshot() {
        let value = Optimistic::new(vec![1, 2, 3], ViewScope::new());

        let err = value
            .mutate(
                |v| v.retain(|x| *x != 2),
                |_| async { Err::<(), _>(failing()) },
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert_eq!(value.get(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_discards_queued_mutations() {
        let flag = Optimistic::new(false, ViewScope::new());
        let sends = AtomicUsize::new(0);
        let (release, held) = oneshot::channel::<()>();

        let first = flag.mutate(
            |f| {
                *f = !*f;
                *f
            },
            |_| async {
                sends.fetch_add(1, Ordering::SeqCst);
                let _ = held.await;
                Err::<(), _>(failing())
            },
            |_, _| {},
        );
        let second = flag.mutate(
            |f| {
                *f = !*f;
                *f
            },
            |_| async {
                sends.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(())
            },
            |_, _| {},
        );

        let (first, second, _) = tokio::join!(first, second, async {
            let _ = release.send(());
        });

        assert!(first.is_err());
        assert_eq!(second.unwrap(), Outcome::Superseded);
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert!(!flag.get());
    }

    #[tokio::test]
    async fn test_mutations_after_rollback_proceed() {
        let flag = Optimistic::new(false, ViewScope::new());
        let toggle = |f: &mut bool| {
            *f = !*f;
        };

        let _ = flag
            .mutate(toggle, |_| async { Err::<(), _>(failing()) }, |_, _| {})
            .await;
        let outcome = flag
            .mutate(toggle, |_| async { Ok::<_, Error>(()) }, |_, _| {})
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert!(flag.get());
    }

    #[tokio::test]
    async fn test_closed_scope_suppresses_writes() {
        let scope = ViewScope::new();
        let value = Optimistic::new(1u64, scope.clone());
        let (release, held) = oneshot::channel::<()>();

        let pending = value.mutate(
            |n| *n = 5,
            |_| async {
                let _ = held.await;
                Err::<(), _>(failing())
            },
            |_, _| {},
        );
        let (result, _) = tokio::join!(pending, async {
            scope.close();
            let _ = release.send(());
        });

        assert!(result.is_err());
        // the optimistic write stays; the rollback was suppressed
        assert_eq!(value.get(), 5);
        assert!(!value.replace(9).await);
        assert_eq!(
            value
                .mutate(|n| *n = 7, |_| async { Ok::<_, Error>(()) }, |_, _| {})
                .await
                .unwrap(),
            Outcome::Superseded
        );
    }

    #[tokio::test]
    async fn test_queued_mutation_replays_onto_server_result() {
        let list = Optimistic::new(vec![7u32], ViewScope::new());
        let (release, held) = oneshot::channel::<()>();

        let add = list.mutate(
            |v| v.insert(0, 0),
            |_| async {
                let _ = held.await;
                Ok::<_, Error>(vec![50, 7])
            },
            |v, fresh| *v = fresh.clone(),
        );
        let remove = list.mutate(
            |v| v.retain(|x| *x != 7),
            |_| async { Ok::<_, Error>(()) },
            |_, _| {},
        );

        let (add, remove, shown) = tokio::join!(add, remove, async {
            let shown = list.get();
            let _ = release.send(());
            shown
        });

        assert_eq!(shown, vec![0]);
        assert!(add.unwrap().is_applied());
        assert!(remove.unwrap().is_applied());
        assert_eq!(list.get(), vec![50]);
    }

    #[tokio::test]
    async fn test_replayed_failure_restores_server_result() {
        let list = Optimistic::new(vec![7u32], ViewScope::new());
        let (release, held) = oneshot::channel::<()>();

        let add = list.mutate(
            |v| v.insert(0, 0),
            |_| async {
                let _ = held.await;
                Ok::<_, Error>(vec![50, 7])
            },
            |v, fresh| *v = fresh.clone(),
        );
        let remove = list.mutate(
            |v| v.retain(|x| *x != 7),
            |_| async { Err::<(), _>(failing()) },
            |_, _| {},
        );

        let (add, remove, _) = tokio::join!(add, remove, async {
            let _ = release.send(());
        });

        assert!(add.is_ok());
        assert!(remove.is_err());
        assert_eq!(list.get(), vec![50, 7]);
    }

    #[tokio::test]
    async fn test_replay_recomputes_intent() {
        let flag = Optimistic::new(false, ViewScope::new());
        let (release, held) = oneshot::channel::<()>();
        let flip = |f: &mut bool| {
            *f = !*f;
            *f
        };

        // the server reports the flag still off after the first request
        let first = flag.mutate(
            flip,
            |_| async {
                let _ = held.await;
                Ok::<_, Error>(false)
            },
            |f, server| *f = *server,
        );
        let second = flag.mutate(flip, |sent| async move { Ok::<_, Error>(sent) }, |_, _| {});

        let (_, second, _) = tokio::join!(first, second, async {
            let _ = release.send(());
        });

        assert_eq!(second.unwrap(), Outcome::Applied(true));
        assert!(flag.get());
    }

    #[tokio::test]
    async fn test_replace_waits_for_queue() {
        let list = Optimistic::new(vec![1u32], ViewScope::new());
        let (release, held) = oneshot::channel::<()>();

        let first = list.mutate(
            |v| v.push(2),
            |_| async {
                let _ = held.await;
                Ok::<_, Error>(())
            },
            |_, _| {},
        );
        let reload = list.replace(vec![1, 2, 3]);
        let second = list.mutate(|v| v.push(4), |_| async { Ok::<_, Error>(()) }, |_, _| {});

        let (_, replaced, _, _) = tokio::join!(first, reload, second, async {
            let _ = release.send(());
        });

        assert!(replaced);
        assert_eq!(list.get(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_step_floor() {
        assert_eq!(step(0, false), 0);
        assert_eq!(step(0, true), 1);
        assert_eq!(step(3, false), 2);
    }
}
