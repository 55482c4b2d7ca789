use std::time::Duration;

use async_trait::async_trait;

/// Suspension point of the collector loop
///
/// Production code sleeps on the tokio timer; tests substitute an
/// implementation that returns immediately and records what was requested.
#[async_trait]
pub trait Sleeper: Send {
    async fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
