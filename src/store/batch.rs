use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tracing::{debug, warn};

use super::outcome::{BatchResult, FailedEntity};
use super::scaling::ThroughputScaler;
use crate::client::DocumentClient;
use crate::core::{Result, StoreError};

/// Cooperative cancellation signal for a batch call.
///
/// Observed between retry rounds: in-flight calls of the current round run
/// to completion, no further round starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call knobs for the batch engine.
///
/// The defaults match the engine's native behavior: retry rate-limited
/// entities immediately and indefinitely until a round comes back clear.
/// The cap exists so callers facing a persistently throttling backend can
/// bound the loop explicitly rather than rely on it clearing.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Maximum number of retry rounds after the initial attempt.
    /// `None` retries until no outcome is rate-limited.
    pub max_retry_rounds: Option<usize>,
    cancellation: Option<CancellationFlag>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retry_rounds(mut self, rounds: usize) -> Self {
        self.max_retry_rounds = Some(rounds);
        self
    }

    pub fn cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationFlag::is_cancelled)
    }
}

/// Fans a batch of entities out to independent single-entity operations,
/// retries the rate-limited subset until it clears, and aggregates the
/// final success/failure sets.
///
/// The scaler is consulted before any operation runs; if it upscaled, the
/// recorded throughput is restored on every exit path, including error
/// propagation.
pub(crate) async fn execute_batch<T, C, F, Fut>(
    entities: Vec<T>,
    scaler: &ThroughputScaler<'_, C>,
    options: &BatchOptions,
    op: F,
) -> Result<BatchResult<T>>
where
    C: DocumentClient + ?Sized,
    F: Fn(T) -> Fut,
    Fut: Future<Output = (T, Result<()>)>,
{
    if entities.is_empty() {
        return Ok(BatchResult::empty());
    }

    let lease = match scaler.maybe_upscale(entities.len()).await {
        Ok(lease) => lease,
        // A classified failure while scaling abandons the batch; there is
        // no lease yet, so nothing to restore.
        Err(err) => {
            return match err.as_client() {
                Some(cause) => Ok(BatchResult::from_abandonment(entities, cause)),
                None => Err(err),
            };
        }
    };

    let outcome = run_rounds(entities, options, &op).await;

    if let Some(lease) = lease {
        if let Err(restore_err) = scaler.restore(lease).await {
            match (&outcome, restore_err) {
                // The per-entity outcomes are already settled; a failed
                // restore must not destroy them.
                (Ok(_), StoreError::Client(cause)) => {
                    warn!(error = %cause, "throughput restoration failed after batch");
                }
                (Ok(_), fatal) => return Err(fatal),
                // The rounds error wins; the restore failure is only logged.
                (Err(_), restore_err) => {
                    warn!(error = %restore_err, "throughput restoration failed during batch abandonment");
                }
            }
        }
    }

    outcome
}

/// The fan-out/fan-in retry loop. Iterative by construction: each pass
/// issues one concurrent round for the currently pending entities, and
/// only the newest attempt per entity determines its classification.
async fn run_rounds<T, F, Fut>(
    entities: Vec<T>,
    options: &BatchOptions,
    op: &F,
) -> Result<BatchResult<T>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = (T, Result<()>)>,
{
    let mut result = BatchResult::empty();
    let mut pending = entities;
    let mut retry_round: usize = 0;

    loop {
        let attempts = join_all(pending.drain(..).map(|entity| op(entity))).await;

        let mut throttled = Vec::new();
        for (entity, outcome) in attempts {
            match outcome {
                Ok(()) => result.succeeded.push(entity),
                Err(StoreError::Client(error)) if error.is_rate_limited() => {
                    throttled.push(FailedEntity { entity, error });
                }
                Err(StoreError::Client(error)) => {
                    result.failed.push(FailedEntity { entity, error });
                }
                // Unclassified failures are not folded into the result;
                // they surface to the caller (after throughput cleanup).
                Err(fatal) => return Err(fatal),
            }
        }

        if throttled.is_empty() {
            break;
        }

        if options.is_cancelled() {
            warn!(
                remaining = throttled.len(),
                "batch cancelled with rate-limited entities outstanding"
            );
            result.failed.extend(throttled);
            break;
        }

        if let Some(cap) = options.max_retry_rounds {
            if retry_round >= cap {
                warn!(
                    cap,
                    remaining = throttled.len(),
                    "retry-round cap reached with entities still rate-limited"
                );
                result.failed.extend(throttled);
                break;
            }
        }

        retry_round += 1;
        debug!(
            round = retry_round,
            retrying = throttled.len(),
            "retrying rate-limited subset"
        );
        pending = throttled.into_iter().map(|failed| failed.entity).collect();
    }

    Ok(result)
}
