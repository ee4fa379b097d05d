//! Rule correlation forest for host log analysis.
//!
//! This crate provides:
//! - Level-ordered rule forest with category roots and arena node storage
//! - Directive-driven placement (by signature, by level, by group)
//! - Backlink wiring over shared match histories for windowed correlation
//! - In-place rule replacement with descendant re-attachment
//! - Atomic generation publication for lock-free serving reads

pub mod definition;
pub mod engine;
pub mod error;
pub mod forest;
pub mod history;
pub mod placement;
pub mod reload;
pub mod wiring;

pub use definition::{BacklinkDirective, DefinitionBuilder, PlacementDirective, RuleDefinition};
pub use engine::{Generation, RuleEngine};
pub use error::{DefinitionError, PlacementError};
pub use forest::{DepthFirst, NodeId, RuleForest, RuleNode};
pub use history::MatchHistory;
