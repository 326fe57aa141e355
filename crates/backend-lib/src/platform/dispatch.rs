// ============================
// crates/backend-lib/src/platform/dispatch.rs
// ============================
//! Fan-out/join over a set of platforms.
//!
//! [`gather`] launches one task per participating platform on a `JoinSet` and
//! joins every one of them before returning, so no participant is ever left
//! running after the caller has moved on. Each participant yields exactly one
//! [`Outcome`]. [`merge`] then applies an operation's [`MergePolicy`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use metrics::counter;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{Operation, Platform, PlatformError};
use crate::metrics::DISPATCH_FAILURES;

/// Result of one participant in a fan-out
#[derive(Debug)]
pub struct Outcome<T> {
    /// Registration index of the participant
    pub index: usize,
    pub platform: String,
    pub result: Result<T, PlatformError>,
}

/// How the outcomes of a fan-out are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Any failure fails the whole call; partial results are discarded
    FailFast,
    /// Failures are logged and skipped unless every participant failed
    BestEffort,
}

/// Run `call` against every platform in `participants` concurrently.
///
/// Returns one outcome per participant, ordered by registration index.
/// Backend errors are wrapped with the platform name and `operation`; a
/// panicking backend becomes [`PlatformError::Panicked`].
pub async fn gather<T, F, Fut>(
    participants: &[Arc<dyn Platform>],
    operation: Operation,
    call: F,
) -> Vec<Outcome<T>>
where
    T: Send + 'static,
    F: Fn(Arc<dyn Platform>) -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let mut set = JoinSet::new();

    for (index, platform) in participants.iter().enumerate() {
        let name = platform.name().to_string();
        let fut = call(Arc::clone(platform));
        set.spawn(async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(PlatformError::backend(&name, operation, err)),
                Err(_) => Err(PlatformError::Panicked {
                    platform: name.clone(),
                    operation,
                }),
            };
            Outcome {
                index,
                platform: name,
                result,
            }
        });
    }

    let mut outcomes = Vec::with_capacity(participants.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            // Tasks are never aborted and panics are caught inside the task,
            // so this only fires if the runtime is shutting down.
            Err(err) => warn!(%operation, error = %err, "dispatch task failed to join"),
        }
    }

    outcomes.sort_by_key(|outcome| outcome.index);
    outcomes
}

/// Combine the outcomes of a fan-out according to `policy`.
///
/// Successful lists are concatenated in registration order. Zero outcomes
/// merge to an empty list.
pub fn merge<T>(
    outcomes: Vec<Outcome<Vec<T>>>,
    operation: Operation,
    policy: MergePolicy,
) -> Result<Vec<T>, PlatformError> {
    let total = outcomes.len();
    let mut merged = Vec::new();
    let mut errors = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(list) => merged.extend(list),
            Err(err) => {
                counter!(DISPATCH_FAILURES, "operation" => operation.as_str()).increment(1);
                errors.push(err);
            },
        }
    }

    if errors.is_empty() {
        return Ok(merged);
    }

    match policy {
        MergePolicy::FailFast => Err(PlatformError::join(errors)),
        MergePolicy::BestEffort if errors.len() == total => Err(PlatformError::join(errors)),
        MergePolicy::BestEffort => {
            for err in &errors {
                debug!(%operation, error = %err, "platform excluded from result");
            }
            Ok(merged)
        },
    }
}

/// Fan `call` out over `participants`, merge under `policy`, and stable-sort
/// the merged list with `compare`.
pub async fn dispatch<T, F, Fut, C>(
    participants: &[Arc<dyn Platform>],
    operation: Operation,
    policy: MergePolicy,
    call: F,
    compare: C,
) -> Result<Vec<T>, PlatformError>
where
    T: Send + 'static,
    F: Fn(Arc<dyn Platform>) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
    C: FnMut(&T, &T) -> std::cmp::Ordering,
{
    let outcomes = gather(participants, operation, call).await;
    let mut merged = merge(outcomes, operation, policy)?;
    // `sort_by` is stable, equal keys keep registration order
    merged.sort_by(compare);
    Ok(merged)
}
