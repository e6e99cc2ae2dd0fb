use crate::domain::entities::error::BackendError;

/// Runs backend work on the blocking pool so the UI loop keeps rendering.
pub async fn run_blocking<F, T>(f: F) -> Result<T, BackendError>
where
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(err) => {
            log::error!("blocking task failed: {err}");
            Err(BackendError::unknown(format!("background task failed: {err}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_results_through() {
        let value = run_blocking(|| Ok::<_, BackendError>(21 * 2))
            .await
            .expect("should run");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn panics_become_unknown_errors() {
        let err = run_blocking(|| -> Result<(), BackendError> { panic!("boom") })
            .await
            .expect_err("should fail");
        assert!(err.is_unknown());
    }
}
