//! Message delivery abstraction

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers an already rendered message. Implementations must not retry.
    async fn send(&self, text: &str) -> Result<()>;
}
