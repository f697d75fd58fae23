//! Completion handles for find operations (spec §3 `FindStatus`/
//! `FindAllStatus`, §4.7 "Find-one state machine", §9 "Async completion").
//!
//! A [`FindStatus`] is produced the instant a find begins and is completed
//! exactly once, either synchronously (a cache hit) or after an async
//! remote round trip. The single-completion guarantee comes from
//! [`tokio::sync::oneshot`]: a [`FindStatusCompleter`] is consumed by
//! `complete`, so the type system -- not a runtime flag -- rules out a
//! second completion.

use tokio::sync::oneshot;

use crate::error::DialogStoreError;

/// How a find call was resolved.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Resolved from the cache without touching the remote table.
    Cached(T),
    /// Resolved after a remote fetch.
    Fetched(T),
    /// The remote table reported no matching record.
    Absent,
    /// Decode or the remote table failed.
    Failed(DialogStoreError),
}

impl<T> Outcome<T> {
    /// The resolved value, if this outcome carries one.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Cached(value) | Outcome::Fetched(value) => Some(value),
            Outcome::Absent | Outcome::Failed(_) => None,
        }
    }

    /// True if this outcome was resolved without a remote round trip.
    pub fn is_cached(&self) -> bool {
        matches!(self, Outcome::Cached(_))
    }
}

/// A one-shot handle completed exactly once by the datastore that issued
/// the find, and awaited exactly once by the caller.
pub struct FindStatus<T> {
    receiver: oneshot::Receiver<Outcome<T>>,
}

/// The write half of a [`FindStatus`], held by the datastore orchestration
/// code until it has an [`Outcome`] to deliver.
pub struct FindStatusCompleter<T> {
    sender: oneshot::Sender<Outcome<T>>,
}

/// Creates a pending find status and its completer.
pub fn pending<T>() -> (FindStatusCompleter<T>, FindStatus<T>) {
    let (sender, receiver) = oneshot::channel();
    (FindStatusCompleter { sender }, FindStatus { receiver })
}

impl<T> FindStatus<T> {
    /// Creates an already-completed status, for the synchronous cache-hit
    /// path where no channel round trip is needed.
    pub fn ready(outcome: Outcome<T>) -> Self {
        let (completer, status) = pending();
        completer.complete(outcome);
        status
    }

    /// Waits for the datastore to complete this find.
    ///
    /// A dropped completer (the datastore task panicked or was cancelled
    /// before completing) surfaces as [`Outcome::Failed`] rather than a
    /// hang.
    pub async fn wait(self) -> Outcome<T> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Failed(DialogStoreError::RemoteFailure(
                "find was dropped before completing".to_string(),
            )),
        }
    }
}

impl<T> FindStatusCompleter<T> {
    /// Completes the paired [`FindStatus`] with `outcome`. Consumes `self`,
    /// so a completer can deliver at most one outcome.
    pub fn complete(self, outcome: Outcome<T>) {
        // The receiver may already be gone if the caller dropped the
        // status; that's not this completer's problem to report.
        let _ = self.sender.send(outcome);
    }
}

/// `find_all` is the same completion shape as `find_one`, just carrying a
/// batch of values (spec §3: "`FindStatus` / `FindAllStatus`").
pub type FindAllStatus<T> = FindStatus<Vec<T>>;

/// See [`FindAllStatus`].
pub type FindAllStatusCompleter<T> = FindStatusCompleter<Vec<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn it_delivers_exactly_one_completion() {
        let (completer, status) = pending::<i32>();
        completer.complete(Outcome::Cached(42));
        let outcome = status.wait().await;
        assert!(matches!(outcome, Outcome::Cached(42)));
    }

    #[tokio::test]
    async fn it_reports_a_dropped_completer_as_failed() {
        let (completer, status) = pending::<i32>();
        drop(completer);
        let outcome = status.wait().await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn it_builds_an_already_ready_status_for_cache_hits() {
        let status = FindStatus::ready(Outcome::Cached(7));
        assert!(matches!(status.wait().await, Outcome::Cached(7)));
    }
}
