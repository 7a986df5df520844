use std::time::Duration;

use async_trait::async_trait;

/// Pause awaited between two questions.
#[async_trait]
pub trait TransitionDelay: Send + Sync {
    async fn wait(&self);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioDelay(pub Duration);

#[async_trait]
impl TransitionDelay for TokioDelay {
    async fn wait(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl TransitionDelay for NoDelay {
    async fn wait(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_delay_sleeps_for_its_duration() {
        let start = tokio::time::Instant::now();
        TokioDelay(Duration::from_millis(1500)).wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_does_not_advance_time() {
        let start = tokio::time::Instant::now();
        NoDelay.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
