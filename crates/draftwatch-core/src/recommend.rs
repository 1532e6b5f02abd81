// Seam for the downstream recommendation engine.

use async_trait::async_trait;

use crate::protocol::{Recommendation, RecommendationContext};

/// Opaque, costly pick recommender. Implementations may call external,
/// rate-limited services; the monitor funnels every call through the
/// recommendation cache so one decision point costs at most one call.
#[async_trait]
pub trait RecommendationEngine: Send + Sync {
    async fn recommend(&self, context: RecommendationContext) -> anyhow::Result<Recommendation>;
}
