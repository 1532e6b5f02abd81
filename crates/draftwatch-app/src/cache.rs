// Recommendation cache: compute-if-absent with a freshness window and at
// most one outstanding computation per key.
//
// Shared between the monitor tick and the recommendation tasks it spawns,
// so the slot map sits behind a std mutex that is never held across an
// await.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use draftwatch_core::protocol::RecommendationKey;
use draftwatch_core::DraftError;

type Outcome<R> = Result<R, DraftError>;

enum Slot<R> {
    Ready {
        value: R,
        computed_at: Instant,
    },
    InFlight {
        id: u64,
        done: watch::Receiver<Option<Outcome<R>>>,
    },
}

struct Slots<R> {
    entries: HashMap<RecommendationKey, Slot<R>>,
    next_id: u64,
}

/// Cheap to clone; clones share the same slots.
pub struct RecommendationCache<R> {
    freshness: Duration,
    slots: Arc<Mutex<Slots<R>>>,
}

impl<R> Clone for RecommendationCache<R> {
    fn clone(&self) -> Self {
        RecommendationCache {
            freshness: self.freshness,
            slots: Arc::clone(&self.slots),
        }
    }
}

enum Claim<R> {
    Fresh(R),
    Wait(watch::Receiver<Option<Outcome<R>>>),
    Owner(InFlightGuard<R>),
}

impl<R> RecommendationCache<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn new(freshness: Duration) -> Self {
        RecommendationCache {
            freshness,
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Return the cached result for `key`, joining or starting the
    /// computation when there is no fresh one.
    ///
    /// The slot is claimed before this returns, so a second call made right
    /// after (even before the first future is polled) joins the same
    /// computation. Inserting a new slot evicts completed entries more than
    /// one round (`league_size` picks) behind `current_overall`. A failed or
    /// dropped computation leaves nothing cached; the next call retries.
    pub fn get_or_compute<F, Fut>(
        &self,
        key: RecommendationKey,
        current_overall: u32,
        league_size: u32,
        compute: F,
    ) -> impl Future<Output = Outcome<R>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let cache = self.clone();
        let first = cache.claim(key, current_overall, league_size);

        async move {
            let mut claim = first;
            let guard = loop {
                match claim {
                    Claim::Fresh(value) => return Ok(value),
                    Claim::Owner(guard) => break guard,
                    Claim::Wait(mut done) => {
                        let outcome = done
                            .wait_for(Option::is_some)
                            .await
                            .ok()
                            .and_then(|outcome| (*outcome).clone());
                        if let Some(outcome) = outcome {
                            return outcome;
                        }
                        debug!(?key, "in-flight recommendation was abandoned, retrying");
                        claim = cache.claim(key, current_overall, league_size);
                    }
                }
            };

            let outcome = compute()
                .await
                .map_err(|e| DraftError::RecommendationCompute(format!("{e:#}")));
            guard.finish(outcome)
        }
    }

    /// The fresh completed result for `key`, if any.
    pub fn peek(&self, key: &RecommendationKey) -> Option<R> {
        match self.lock().entries.get(key) {
            Some(Slot::Ready { value, computed_at }) if computed_at.elapsed() < self.freshness => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn is_in_flight(&self, key: &RecommendationKey) -> bool {
        matches!(self.lock().entries.get(key), Some(Slot::InFlight { .. }))
    }

    /// Number of slots, completed or in flight.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Slots<R>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn claim(&self, key: RecommendationKey, current_overall: u32, league_size: u32) -> Claim<R> {
        let mut slots = self.lock();
        match slots.entries.get(&key) {
            Some(Slot::Ready { value, computed_at }) if computed_at.elapsed() < self.freshness => {
                return Claim::Fresh(value.clone());
            }
            Some(Slot::InFlight { done, .. }) => return Claim::Wait(done.clone()),
            _ => {}
        }

        slots.entries.retain(|k, slot| {
            let behind = matches!(slot, Slot::Ready { .. })
                && k.overall.saturating_add(league_size) < current_overall;
            if behind {
                debug!(key = ?k, "evicting recommendation");
            }
            !behind
        });

        let id = slots.next_id;
        slots.next_id += 1;
        let (tx, rx) = watch::channel(None);
        slots.entries.insert(key, Slot::InFlight { id, done: rx });

        Claim::Owner(InFlightGuard {
            cache: self.clone(),
            key,
            id,
            tx,
            finished: false,
        })
    }
}

/// Owns an in-flight slot. Dropping it unfinished releases the slot.
struct InFlightGuard<R> {
    cache: RecommendationCache<R>,
    key: RecommendationKey,
    id: u64,
    tx: watch::Sender<Option<Outcome<R>>>,
    finished: bool,
}

impl<R> InFlightGuard<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn finish(mut self, outcome: Outcome<R>) -> Outcome<R> {
        {
            let mut slots = self.cache.lock();
            let ours = matches!(
                slots.entries.get(&self.key),
                Some(Slot::InFlight { id, .. }) if *id == self.id
            );
            if ours {
                match &outcome {
                    Ok(value) => {
                        slots.entries.insert(
                            self.key,
                            Slot::Ready {
                                value: value.clone(),
                                computed_at: Instant::now(),
                            },
                        );
                    }
                    Err(_) => {
                        slots.entries.remove(&self.key);
                    }
                }
            }
        }
        self.finished = true;
        self.tx.send_replace(Some(outcome.clone()));
        outcome
    }
}

impl<R> Drop for InFlightGuard<R> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut slots = self
            .cache
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if matches!(
            slots.entries.get(&self.key),
            Some(Slot::InFlight { id, .. }) if *id == self.id
        ) {
            slots.entries.remove(&self.key);
        }
    }
}
