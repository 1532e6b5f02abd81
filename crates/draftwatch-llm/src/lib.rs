pub mod client;
pub mod prompt;
pub mod recommender;

pub use client::{ClaudeClient, Completion, LlmClient};
pub use recommender::LlmRecommender;
