use std::time::Duration;

use crate::nutrition::Macros;

use super::{EstimatorError, NutritionEstimator};

/// Retry discipline for the estimation call: a fixed pause between attempts,
/// bounded by `max_attempts`. At least one attempt always runs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Outcome of a bounded estimation run. An all-zero triple from the estimator is
/// treated as a miss and retried like a failure; exhausting attempts on zeros and
/// exhausting them on errors are reported as distinct outcomes so callers never
/// mistake a broken estimator for a zero-nutrition meal.
#[derive(Debug)]
pub enum EstimateOutcome {
    Estimated(Macros),
    AllZero,
    Failed(EstimatorError),
}

impl EstimateOutcome {
    /// The usable triple: zeros unless the run actually produced an estimate.
    pub fn macros(&self) -> Macros {
        match self {
            EstimateOutcome::Estimated(m) => *m,
            EstimateOutcome::AllZero | EstimateOutcome::Failed(_) => Macros::ZERO,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, EstimateOutcome::Estimated(_))
    }
}

/// Calls the estimator until it produces a non-degenerate triple or the attempt
/// budget runs out. A run that ends without a usable estimate is classified by its
/// final attempt: degenerate result or hard error.
pub async fn estimate_with_retry(
    estimator: &dyn NutritionEstimator,
    image: &[u8],
    policy: &RetryPolicy,
) -> EstimateOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error: Option<EstimatorError> = None;

    for attempt in 1..=max_attempts {
        match estimator.estimate(image).await {
            Ok(m) if m.is_zero() => {
                tracing::warn!(attempt, max_attempts, "estimator returned all zeros, retrying");
                last_error = None;
            }
            Ok(m) => return EstimateOutcome::Estimated(m),
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "estimation attempt failed");
                last_error = Some(e);
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    match last_error {
        Some(e) => EstimateOutcome::Failed(e),
        None => EstimateOutcome::AllZero,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct ScriptedEstimator {
        responses: Mutex<VecDeque<Result<Macros, EstimatorError>>>,
        calls: AtomicU32,
    }

    impl ScriptedEstimator {
        fn new(responses: Vec<Result<Macros, EstimatorError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NutritionEstimator for ScriptedEstimator {
        async fn estimate(&self, _image: &[u8]) -> Result<Macros, EstimatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                // Scripts shorter than the attempt budget keep yielding zeros.
                .unwrap_or(Ok(Macros::ZERO))
        }
    }

    fn no_backoff(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn returns_first_nonzero_result() {
        let est = ScriptedEstimator::new(vec![
            Ok(Macros::ZERO),
            Ok(Macros::ZERO),
            Ok(Macros::new(25, 30, 15)),
        ]);

        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        match outcome {
            EstimateOutcome::Estimated(m) => assert_eq!(m, Macros::new(25, 30, 15)),
            other => panic!("expected an estimate, got {other:?}"),
        }
        assert_eq!(est.calls(), 3);
    }

    #[tokio::test]
    async fn stops_after_first_success() {
        let est = ScriptedEstimator::new(vec![Ok(Macros::new(10, 20, 5))]);

        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        assert!(outcome.is_estimated());
        assert_eq!(est.calls(), 1);
    }

    #[tokio::test]
    async fn all_zero_attempts_exhaust_to_all_zero() {
        let est = ScriptedEstimator::new(vec![
            Ok(Macros::ZERO),
            Ok(Macros::ZERO),
            Ok(Macros::ZERO),
        ]);

        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        assert!(matches!(outcome, EstimateOutcome::AllZero), "got {outcome:?}");
        assert_eq!(outcome.macros(), Macros::ZERO);
        assert_eq!(est.calls(), 3);
    }

    #[tokio::test]
    async fn persistent_errors_exhaust_to_failed() {
        let est = ScriptedEstimator::new(vec![
            Err(EstimatorError::Api("boom".into())),
            Err(EstimatorError::Api("boom".into())),
            Err(EstimatorError::Api("boom".into())),
        ]);

        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        assert!(matches!(outcome, EstimateOutcome::Failed(_)), "got {outcome:?}");
        assert_eq!(outcome.macros(), Macros::ZERO);
        assert_eq!(est.calls(), 3);
    }

    #[tokio::test]
    async fn final_attempt_classifies_mixed_runs() {
        let est = ScriptedEstimator::new(vec![
            Err(EstimatorError::Api("boom".into())),
            Ok(Macros::ZERO),
            Ok(Macros::ZERO),
        ]);
        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        assert!(matches!(outcome, EstimateOutcome::AllZero), "got {outcome:?}");

        let est = ScriptedEstimator::new(vec![
            Ok(Macros::ZERO),
            Err(EstimatorError::Api("boom".into())),
            Err(EstimatorError::Api("boom".into())),
        ]);
        let outcome = estimate_with_retry(&est, b"img", &no_backoff(3)).await;
        assert!(matches!(outcome, EstimateOutcome::Failed(_)), "got {outcome:?}");
    }

    #[tokio::test]
    async fn zero_attempt_budget_still_runs_once() {
        let est = ScriptedEstimator::new(vec![Ok(Macros::new(1, 2, 3))]);

        let outcome = estimate_with_retry(&est, b"img", &no_backoff(0)).await;
        assert!(outcome.is_estimated());
        assert_eq!(est.calls(), 1);
    }
}
