use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trailing-edge debounce for keystrokes: only the last call within the
/// delay settles.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Sleeps for the delay. True when no newer call arrived meanwhile.
    pub async fn settle(&self) -> bool {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_the_last_call_settles() {
        let debouncer = Debouncer::from_millis(20);
        let (first, second) = tokio::join!(debouncer.settle(), debouncer.settle());
        assert!(!first);
        assert!(second);
    }

    #[tokio::test]
    async fn spaced_calls_all_settle() {
        let debouncer = Debouncer::from_millis(5);
        assert!(debouncer.settle().await);
        assert!(debouncer.settle().await);
    }
}
