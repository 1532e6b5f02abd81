pub mod cache;
pub mod monitor;
pub mod source;
pub mod state;

pub use cache::RecommendationCache;
pub use monitor::{DraftMonitor, MonitorCommand, MonitorHandle, MonitorSettings};
pub use source::{DraftSource, EspnDraftSource, SourceError};
