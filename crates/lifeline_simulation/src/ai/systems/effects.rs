//! Общая query агента + применение эффектов входа в state
//!
//! Все системы меняют state только через `transition_to`, чтобы каждый
//! принятый переход давал ровно один набор эффектов.

use bevy::ecs::query::QueryData;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::ai::{
    AgentCue, AgentFell, AgentFsm, AgentRevived, AgentState, CarryLink, ScheduledTasks,
    StateChanged, StateEffect, ThreatRegistry, Transition, VisualCue,
};
use crate::components::{Agent, AgentTuning, FallenRoster, MovementActuator, NavAgent};

/// Всё состояние одного агента (одна query на все AI системы)
#[derive(QueryData)]
#[query_data(mutable)]
pub struct AgentQuery {
    pub entity: Entity,
    pub agent: &'static mut Agent,
    pub fsm: &'static mut AgentFsm,
    pub registry: &'static mut ThreatRegistry,
    pub link: &'static mut CarryLink,
    pub tasks: &'static mut ScheduledTasks,
    pub nav: &'static mut NavAgent,
    pub transform: &'static mut Transform,
    pub tuning: &'static AgentTuning,
}

/// Куда уходят эффекты переходов (roster + исходящие events)
#[derive(SystemParam)]
pub struct StateSinks<'w> {
    pub roster: ResMut<'w, FallenRoster>,
    pub cues: EventWriter<'w, AgentCue>,
    pub fell: EventWriter<'w, AgentFell>,
    pub changes: EventWriter<'w, StateChanged>,
    pub revived: EventWriter<'w, AgentRevived>,
}

impl StateSinks<'_> {
    pub fn cue(&mut self, entity: Entity, cue: VisualCue) {
        self.cues.write(AgentCue { entity, cue });
    }
}

/// Применить эффекты уже принятого перехода
pub fn apply_transition(agent: &mut AgentQueryItem, transition: Transition, sinks: &mut StateSinks) {
    let entity = agent.entity;

    for effect in transition.effects() {
        match effect {
            StateEffect::Cue(cue) => sinks.cue(entity, cue),
            StateEffect::StopNavigation => agent.nav.set_stopped(true),
            StateEffect::ResumeNavigation => agent.nav.set_stopped(false),
            StateEffect::HaltInPlace => {
                let here = agent.transform.translation;
                agent.nav.set_destination(here);
            }
            StateEffect::RegisterFallen => sinks.roster.register(entity),
            StateEffect::UnregisterFallen => sinks.roster.unregister(entity),
            StateEffect::NotifyFell => {
                sinks.fell.write(AgentFell { entity });
            }
            StateEffect::CancelAllTasks => agent.tasks.cancel_all(),
        }
    }

    sinks.changes.write(StateChanged {
        entity,
        from: transition.from,
        to: transition.to,
    });

    crate::log(&format!(
        "{} ({:?}): {:?} → {:?}",
        agent.agent.name, entity, transition.from, transition.to
    ));
}

/// Попробовать перейти в `next`. false: переход запрещён (ничего не изменилось).
pub fn transition_to(agent: &mut AgentQueryItem, next: AgentState, sinks: &mut StateSinks) -> bool {
    let tuning = agent.tuning;
    match agent.fsm.change_state(next, tuning) {
        Some(transition) => {
            apply_transition(agent, transition, sinks);
            true
        }
        None => false,
    }
}
