//! Systems - logic that runs over actors and world events each tick

mod actors;
mod harvest;

pub use actors::*;
pub use harvest::*;
