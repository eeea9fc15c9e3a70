//! Fan-out/fan-in helpers.
//!
//! Two policies are used across the caches: the aggregate store and the DLC
//! decode batch fail as soon as any branch fails, while the offer decode batch
//! keeps going and records a failed branch as absent.

use std::fmt::Display;
use std::future::Future;

use futures::future::{join_all, try_join_all};
use tracing::warn;

/// Run every future concurrently. Resolves with all results in input order,
/// or with the first error, dropping the branches still in flight.
pub async fn join_fail_fast<I, F, T, E>(branches: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(branches).await
}

/// Run every future concurrently. A failed branch becomes `None`; the others
/// still complete.
pub async fn join_tolerant<I, F, T, E>(branches: I) -> Vec<Option<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    join_all(branches)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "branch failed, continuing without it");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn fail_fast_returns_first_error() {
        let result: Result<Vec<u32>, String> = join_fail_fast((1..=3).map(|i| async move {
            if i == 2 {
                Err("bad".to_string())
            } else {
                Ok(i)
            }
        }))
        .await;
        assert_eq!(result, Err("bad".to_string()));
    }

    #[tokio::test]
    async fn fail_fast_keeps_input_order() {
        let result: Result<Vec<usize>, String> =
            join_fail_fast((0..4).map(|i| async move { Ok(i * 10) })).await;
        assert_eq!(result, Ok(vec![0, 10, 20, 30]));
    }

    #[tokio::test]
    async fn tolerant_runs_every_branch() {
        let ran = AtomicUsize::new(0);
        let results = join_tolerant((0..5).map(|i| {
            let ran = &ran;
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                if i == 2 {
                    Err(format!("branch {i} failed"))
                } else {
                    Ok(i)
                }
            }
        }))
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 5);
        assert_eq!(results, vec![Some(0), Some(1), None, Some(3), Some(4)]);
    }
}
