//! Core data models for the reporting engine.

mod aggregate;
mod leaderboard;
mod reconciliation;
mod record;
mod report;
mod window;

pub use aggregate::*;
pub use leaderboard::*;
pub use reconciliation::*;
pub use record::*;
pub use report::*;
pub use window::*;
