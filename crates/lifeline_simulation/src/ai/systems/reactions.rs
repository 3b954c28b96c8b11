//! Реакции на внешние сигналы: падение, буст revive, телепорт, light.

use bevy::prelude::*;

use crate::ai::{AgentState, FallSignal, LightCommand, ReviveBoost, TaskPurpose, TeleportRequest, VisualCue};
use super::carry::release_carry;
use super::effects::{transition_to, AgentQuery, StateSinks};

/// System: FallSignal → Fall
///
/// Игнорируется в Death, Carried и уже упавшим. Carrier сначала опускает ally.
pub fn handle_fall_signals(
    mut signals: EventReader<FallSignal>,
    mut agents: Query<AgentQuery>,
    mut sinks: StateSinks,
) {
    for signal in signals.read() {
        let Ok(state) = agents.get(signal.entity).map(|agent| agent.fsm.state()) else {
            continue;
        };
        if matches!(state, AgentState::Death | AgentState::Carried | AgentState::Fall) {
            continue;
        }

        if state == AgentState::Carry {
            let carrying = agents.get(signal.entity).ok().and_then(|agent| agent.link.carrying);
            if let Some(ally) = carrying {
                if let Ok([mut carrier, mut carried]) = agents.get_many_mut([signal.entity, ally]) {
                    release_carry(&mut carrier, &mut carried, &mut sinks);
                }
            }
        }

        let Ok(mut agent) = agents.get_mut(signal.entity) else {
            continue;
        };
        // Ally мог пропасть до release
        agent.link.carrying = None;
        crate::log_info(&format!("{} упал ({:?})", agent.agent.name, state));
        transition_to(&mut agent, AgentState::Fall, &mut sinks);
    }
}

/// System: ReviveBoost → rise duration / factor
pub fn handle_revive_boosts(mut boosts: EventReader<ReviveBoost>, mut agents: Query<AgentQuery>) {
    for boost in boosts.read() {
        let Ok(mut agent) = agents.get_mut(boost.entity) else {
            continue;
        };
        if agent.fsm.boost_rise(boost.factor) {
            crate::log(&format!(
                "{}: revive x{} (rise {:.2}s)",
                agent.agent.name, boost.factor, agent.fsm.rise_duration
            ));
        }
    }
}

/// System: TeleportRequest → позиция + teleporting флаг на cooldown
pub fn handle_teleports(mut requests: EventReader<TeleportRequest>, mut agents: Query<AgentQuery>) {
    for request in requests.read() {
        let Ok(mut agent) = agents.get_mut(request.entity) else {
            continue;
        };
        if matches!(agent.fsm.state(), AgentState::Death | AgentState::Carried) {
            continue;
        }

        agent.transform.translation = request.position;
        agent.agent.teleporting = true;
        let cooldown = agent.tuning.teleport_cooldown;
        agent.tasks.schedule(TaskPurpose::TeleportCooldown, cooldown);
    }
}

/// System: LightCommand (Disable: с задержкой, Enable: сразу и отменяет Disable)
pub fn handle_light_commands(
    mut commands: EventReader<LightCommand>,
    mut agents: Query<AgentQuery>,
    mut sinks: StateSinks,
) {
    for command in commands.read() {
        let entity = match *command {
            LightCommand::Enable { entity } | LightCommand::Disable { entity } => entity,
        };
        let Ok(mut agent) = agents.get_mut(entity) else {
            continue;
        };
        if agent.fsm.state().is_dead() {
            continue;
        }

        match command {
            LightCommand::Enable { .. } => {
                agent.tasks.cancel(TaskPurpose::LightOff);
                agent.agent.light_enabled = true;
                sinks.cue(entity, VisualCue::LightOn);
            }
            LightCommand::Disable { .. } => {
                let delay = agent.tuning.light_off_delay;
                agent.tasks.schedule(TaskPurpose::LightOff, delay);
            }
        }
    }
}
