//! Парные операции helper ↔ ally: carry start/release, revive tick, pin к anchor
//!
//! Обе стороны валидируются до первой мутации: либо меняются оба агента,
//! либо ни один.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::ai::{AgentRevived, AgentState, TaskPurpose, VisualCue};
use super::effects::{apply_transition, transition_to, AgentQuery, AgentQueryItem, StateSinks};

/// Мировая точка крепления несомого
fn anchor_position(carrier: &Transform, offset: Vec3) -> Vec3 {
    carrier.translation + carrier.rotation * offset
}

/// Начать переноску. false: одна из сторон не может (никто не изменился).
pub fn begin_carry(carrier: &mut AgentQueryItem, ally: &mut AgentQueryItem, sinks: &mut StateSinks) -> bool {
    let valid = carrier.fsm.state().can_transition_to(AgentState::Carry)
        && ally.fsm.state().can_transition_to(AgentState::Carried)
        && carrier.link.carrying.is_none()
        && carrier.link.carried_by.is_none()
        && ally.link.carried_by.is_none()
        && ally.link.carrying.is_none();

    if !valid {
        return false;
    }

    transition_to(ally, AgentState::Carried, sinks);
    transition_to(carrier, AgentState::Carry, sinks);

    carrier.link.carrying = Some(ally.entity);
    ally.link.carried_by = Some(carrier.entity);

    ally.transform.translation = anchor_position(&carrier.transform, carrier.tuning.carry_anchor());
    ally.transform.rotation = carrier.transform.rotation;

    crate::log_info(&format!(
        "{} подобрал {} (carry)",
        carrier.agent.name, ally.agent.name
    ));
    true
}

/// Опустить несомого на землю (ally → Fall). State carrier'а меняет вызывающий.
pub fn release_carry(carrier: &mut AgentQueryItem, ally: &mut AgentQueryItem, sinks: &mut StateSinks) -> bool {
    let linked = carrier.link.carrying == Some(ally.entity) && ally.link.carried_by == Some(carrier.entity);
    if !linked {
        return false;
    }

    carrier.link.carrying = None;
    ally.link.carried_by = None;

    let mut ground = anchor_position(&carrier.transform, carrier.tuning.carry_anchor());
    ground.y = carrier.transform.translation.y;
    ally.transform.translation = ground;

    sinks.cue(carrier.entity, VisualCue::PutDown);
    transition_to(ally, AgentState::Fall, sinks);

    crate::log_info(&format!(
        "{} опустил {} на землю",
        carrier.agent.name, ally.agent.name
    ));
    true
}

/// Один тик revive от helper'а. true: ally поднят на этом тике.
///
/// Каждый тик перезапускает ReviveTimeout ally: помощь прервалась → обратно в Fall.
pub fn revive_step(
    helper: &mut AgentQueryItem,
    ally: &mut AgentQueryItem,
    delta: f32,
    sinks: &mut StateSinks,
) -> bool {
    let tuning = ally.tuning;
    let Some(tick) = ally.fsm.revive_tick(delta, tuning) else {
        return false;
    };

    for transition in tick.transitions {
        apply_transition(ally, transition, sinks);
    }

    if !tick.completed {
        ally.tasks.schedule(TaskPurpose::ReviveTimeout, tuning.revive_timeout);
        return false;
    }

    ally.tasks.cancel(TaskPurpose::ReviveTimeout);
    helper.agent.help_count += 1;
    sinks.revived.write(AgentRevived {
        helper: helper.entity,
        ally: ally.entity,
    });

    crate::log_info(&format!(
        "{} поднял {} (help_count = {})",
        helper.agent.name, ally.agent.name, helper.agent.help_count
    ));
    true
}

/// System: несомые агенты едут на anchor carrier'а; порванные связи чинятся
///
/// Carried без живой связи → Fall (как release). Carry без ally → Idle.
pub fn pin_carried_agents(mut agents: Query<AgentQuery>, mut sinks: StateSinks) {
    // Snapshot carrier'ов: (anchor, rotation, кого несёт)
    let carriers: HashMap<Entity, (Vec3, Quat, Option<Entity>)> = agents
        .iter()
        .filter(|agent| agent.fsm.state() == AgentState::Carry)
        .map(|agent| {
            let anchor = anchor_position(agent.transform, agent.tuning.carry_anchor());
            (agent.entity, (anchor, agent.transform.rotation, agent.link.carrying))
        })
        .collect();

    let carried: HashMap<Entity, Option<Entity>> = agents
        .iter()
        .filter(|agent| agent.fsm.state() == AgentState::Carried)
        .map(|agent| (agent.entity, agent.link.carried_by))
        .collect();

    for mut agent in agents.iter_mut() {
        match agent.fsm.state() {
            AgentState::Carried => {
                let carrier = agent.link.carried_by.and_then(|carrier| {
                    carriers
                        .get(&carrier)
                        .filter(|(_, _, carrying)| *carrying == Some(agent.entity))
                });

                match carrier {
                    Some(&(anchor, rotation, _)) => {
                        agent.transform.translation = anchor;
                        agent.transform.rotation = rotation;
                    }
                    None => {
                        crate::log_warning(&format!(
                            "{}: carrier пропал, падаем",
                            agent.agent.name
                        ));
                        agent.link.carried_by = None;
                        transition_to(&mut agent, AgentState::Fall, &mut sinks);
                    }
                }
            }
            AgentState::Carry => {
                let holds_ally = agent.link.carrying.is_some_and(|ally| {
                    carried.get(&ally) == Some(&Some(agent.entity))
                });
                if !holds_ally {
                    crate::log_warning(&format!(
                        "{}: несомый пропал, carry отменён",
                        agent.agent.name
                    ));
                    agent.link.carrying = None;
                    transition_to(&mut agent, AgentState::Idle, &mut sinks);
                }
            }
            _ => {}
        }
    }
}
