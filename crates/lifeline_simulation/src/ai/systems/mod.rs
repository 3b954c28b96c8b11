//! AI systems (threats → reactions → tasks → decisions → carry pin)

pub mod carry;
pub mod controller;
pub mod effects;
pub mod reactions;
pub mod tasks;
pub mod threats;

// Re-export all systems
pub use carry::*;
pub use controller::*;
pub use effects::*;
pub use reactions::*;
pub use tasks::*;
pub use threats::*;
