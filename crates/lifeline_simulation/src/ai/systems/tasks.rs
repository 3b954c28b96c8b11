//! Отложенные задачи агентов (ResumeIdle, ReviveTimeout, LightOff, TeleportCooldown)

use bevy::prelude::*;

use crate::ai::{AgentState, TaskPurpose, VisualCue};
use super::effects::{transition_to, AgentQuery, AgentQueryItem, StateSinks};

/// Выполнить сработавшую задачу (условия перепроверяются в момент срабатывания)
fn run_task(agent: &mut AgentQueryItem, purpose: TaskPurpose, sinks: &mut StateSinks) {
    match purpose {
        TaskPurpose::ResumeIdle => {
            let state = agent.fsm.state();
            if !agent.registry.has_hostiles() && !state.is_incapacitated() && state != AgentState::Carry {
                transition_to(agent, AgentState::Idle, sinks);
            }
        }
        TaskPurpose::ReviveTimeout => {
            if agent.fsm.state() == AgentState::Raising {
                crate::log(&format!("{}: помощь прервалась, обратно в Fall", agent.agent.name));
                transition_to(agent, AgentState::Fall, sinks);
            }
        }
        TaskPurpose::LightOff => {
            agent.agent.light_enabled = false;
            sinks.cue(agent.entity, VisualCue::LightOff);
        }
        TaskPurpose::TeleportCooldown => {
            agent.agent.teleporting = false;
        }
    }
}

/// System: тик таймеров задач, мёртвые агенты пропускаются целиком
pub fn run_scheduled_tasks(time: Res<Time<Fixed>>, mut agents: Query<AgentQuery>, mut sinks: StateSinks) {
    let delta = time.delta_secs();

    for mut agent in agents.iter_mut() {
        if agent.fsm.state().is_dead() {
            continue;
        }

        let fired = agent.tasks.tick(delta);
        for purpose in fired {
            run_task(&mut agent, purpose, &mut sinks);
        }
    }
}
