//! AI components

pub mod fsm;
pub mod perception;
pub mod schedule;


// Re-export all components
pub use fsm::*;
pub use perception::*;
pub use schedule::*;
