// Library root for the draft monitor's pure core: pick model, snake-order
// arithmetic, turn prediction, new-pick detection, protocol types and
// configuration.

pub mod config;
pub mod draft;
pub mod error;
pub mod protocol;
pub mod recommend;

pub use error::DraftError;
