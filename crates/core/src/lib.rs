pub mod config;
pub mod error;
pub mod event;
pub mod rule;

pub use config::CorrelationConfig;
pub use error::*;
pub use event::*;
pub use rule::*;
