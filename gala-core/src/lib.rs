mod bidder;
mod broadcaster;
mod config;
mod gate;

pub use bidder::*;
pub use broadcaster::*;
pub use config::*;
pub use gate::*;

/// Identifies a row in the entity store. Zero means "none".
pub type PrimaryKey = i64;
