//! Perception: PerceptionEvent → ThreatRegistry (+ реакции на появление/потерю врагов)

use bevy::prelude::*;
use rand::Rng;

use crate::ai::{AgentState, PerceptionEvent, TaskPurpose};
use crate::components::{Humanoid, Perceived};
use crate::DeterministicRng;
use super::effects::{transition_to, AgentQuery, AgentQueryItem, StateSinks};

/// Последний враг пропал → через random(min..max) вернуться в Idle
fn schedule_resume_idle(agent: &mut AgentQueryItem, rng: &mut DeterministicRng) {
    let (low, high) = {
        let t = agent.tuning;
        (t.min_escape_time.min(t.max_escape_time), t.max_escape_time.max(t.min_escape_time))
    };
    let delay = rng.rng.gen_range(low..=high);
    agent.tasks.schedule(TaskPurpose::ResumeIdle, delay);
}

/// System: обработка PerceptionEvent + чистка despawned entities
///
/// Враг вошёл → Escape (кроме Carry). Последний враг вышел → ResumeIdle.
/// Мёртвые observer'ы не обновляют registry.
pub fn update_threat_registry(
    mut events: EventReader<PerceptionEvent>,
    mut agents: Query<AgentQuery>,
    humanoids: Query<&Humanoid>,
    mut rng: ResMut<DeterministicRng>,
    mut sinks: StateSinks,
) {
    for event in events.read() {
        match *event {
            PerceptionEvent::Entered { observer, other } => {
                if observer == other {
                    continue;
                }
                let Ok(mut agent) = agents.get_mut(observer) else {
                    continue;
                };
                if agent.fsm.state().is_dead() {
                    continue;
                }
                // Без тега или Decoy: не враг и не союзник
                let Some(perceived) = humanoids.get(other).ok().and_then(|h| h.perceived_as()) else {
                    continue;
                };

                if !agent.registry.insert(other, perceived) {
                    continue;
                }

                if perceived == Perceived::Hostile {
                    agent.tasks.cancel(TaskPurpose::ResumeIdle);
                    crate::log(&format!(
                        "{} заметил врага {:?}",
                        agent.agent.name, other
                    ));
                    if agent.fsm.state() != AgentState::Carry {
                        transition_to(&mut agent, AgentState::Escape, &mut sinks);
                    }
                }
            }
            PerceptionEvent::Exited { observer, other } => {
                let Ok(mut agent) = agents.get_mut(observer) else {
                    continue;
                };
                if agent.fsm.state().is_dead() {
                    continue;
                }

                if agent.registry.remove(other) == Some(Perceived::Hostile)
                    && !agent.registry.has_hostiles()
                {
                    schedule_resume_idle(&mut agent, &mut rng);
                }
            }
        }
    }

    // Despawned entities: выкидываем из registry (сенсор мог не прислать Exited)
    for mut agent in agents.iter_mut() {
        if agent.fsm.state().is_dead() {
            continue;
        }
        let had_hostiles = agent.registry.has_hostiles();
        let removed = agent.registry.retain(|entity| humanoids.contains(entity));
        if removed == 0 {
            continue;
        }

        crate::log(&format!(
            "{}: убрано {} устаревших entities из registry",
            agent.agent.name, removed
        ));
        if had_hostiles && !agent.registry.has_hostiles() {
            schedule_resume_idle(&mut agent, &mut rng);
        }
    }
}
