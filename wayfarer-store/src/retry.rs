use std::future::Future;

use wayfarer_core::error::LedgerError;

/// Outcome of a single optimistic attempt.
pub(crate) enum Attempt<T> {
    /// The writes landed.
    Commit(T),
    /// Another writer won the version race. Carries the conflict error to
    /// surface if every attempt loses.
    LostRace(LedgerError),
}

/// Drive an optimistic read-validate-write attempt up to `attempts` times
/// (always at least once). Domain errors from an attempt abort
/// immediately; only a lost race consumes retry budget. When the budget
/// runs out, the last race's conflict error is returned.
pub(crate) async fn with_retries<T, F, Fut>(attempts: u32, mut attempt_fn: F) -> Result<T, LedgerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, LedgerError>>,
{
    let mut conflict = None;
    for attempt in 0..attempts.max(1) {
        match attempt_fn(attempt).await? {
            Attempt::Commit(value) => return Ok(value),
            Attempt::LostRace(err) => conflict = Some(err),
        }
    }
    Err(conflict.unwrap_or_else(|| LedgerError::Storage("retry budget exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use uuid::Uuid;

    fn lost(tour_id: Uuid) -> LedgerError {
        LedgerError::ConcurrencyConflict { tour_id }
    }

    #[tokio::test]
    async fn lands_after_losing_early_races() {
        let tour_id = Uuid::new_v4();
        let calls = Cell::new(0u32);

        let result = with_retries(3, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 2 {
                    Ok(Attempt::LostRace(lost(tour_id)))
                } else {
                    Ok(Attempt::Commit("landed"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "landed");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_conflict_with_tour_id() {
        let tour_id = Uuid::new_v4();
        let calls = Cell::new(0u32);

        let result: Result<(), _> = with_retries(3, |_| {
            calls.set(calls.get() + 1);
            async move { Ok(Attempt::LostRace(lost(tour_id))) }
        })
        .await;

        // Exactly the configured number of attempts, no more.
        assert_eq!(calls.get(), 3);
        match result.unwrap_err() {
            LedgerError::ConcurrencyConflict { tour_id: reported } => {
                assert_eq!(reported, tour_id)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn domain_errors_do_not_consume_retries() {
        let calls = Cell::new(0u32);

        let result: Result<(), _> = with_retries(3, |_| {
            calls.set(calls.get() + 1);
            async move {
                Err(LedgerError::InvalidInput(
                    "party size must be a positive integer".to_string(),
                ))
            }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result.unwrap_err(), LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn zero_budget_still_runs_one_attempt() {
        let calls = Cell::new(0u32);

        let result = with_retries(0, |_| {
            calls.set(calls.get() + 1);
            async move { Ok(Attempt::Commit(())) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.get(), 1);
    }
}
