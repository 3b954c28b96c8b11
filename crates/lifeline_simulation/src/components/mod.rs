//! ECS компоненты и ресурсы агентов
//!
//! Организация по доменам:
//! - agent: Agent, Humanoid tag, AgentTuning, derived stats
//! - movement: MovementActuator контракт, NavAgent, SpeedControl
//! - world: GroundProbe, PatrolWaypoints, FallenRoster

pub mod agent;
pub mod movement;
pub mod world;

// Re-exports для удобного импорта
pub use agent::*;
pub use movement::*;
pub use world::*;
