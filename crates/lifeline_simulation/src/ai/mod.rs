//! AI decision-making module
//!
//! FSM агента (Idle/Walk/Escape/Carry/Carried/Fall/Raising/Death),
//! escape planner, rescue evaluator, отложенные задачи.

use bevy::prelude::*;

pub mod components;
pub mod escape;
pub mod events;
pub mod rescue;
pub mod systems;

// Re-export основных типов
pub use components::*;
pub use escape::{choose_escape_point, escape_direction, EscapeRoute};
pub use events::*;
pub use rescue::{best_ally_to_follow, plan_rescue, AllyView, RescueParams, RescuePlan};
pub use systems::*;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate для детерминизма.
/// Порядок выполнения:
/// 1. update_threat_registry: PerceptionEvent → ThreatRegistry
/// 2. handle_*: внешние сигналы (fall, boost, teleport, light)
/// 3. run_scheduled_tasks: ResumeIdle, ReviveTimeout, LightOff, TeleportCooldown
/// 4. agent_controller: rescue / dispatch по state
/// 5. advance_navigation: NavAgent step
/// 6. pin_carried_agents: несомые на anchor carrier'а (после движения)
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PerceptionEvent>()
            .add_event::<FallSignal>()
            .add_event::<ReviveBoost>()
            .add_event::<TeleportRequest>()
            .add_event::<LightCommand>()
            .add_event::<AgentCue>()
            .add_event::<AgentFell>()
            .add_event::<StateChanged>()
            .add_event::<AgentRevived>()
            .register_type::<AgentFsm>()
            .register_type::<ThreatRegistry>()
            .register_type::<CarryLink>()
            .register_type::<ScheduledTasks>()
            .add_systems(
                FixedUpdate,
                (
                    update_threat_registry,
                    handle_fall_signals,
                    handle_revive_boosts,
                    handle_teleports,
                    handle_light_commands,
                    run_scheduled_tasks,
                    agent_controller,
                    crate::navigation::advance_navigation,
                    pin_carried_agents,
                )
                    .chain(), // Последовательное выполнение для детерминизма
            );
    }
}
