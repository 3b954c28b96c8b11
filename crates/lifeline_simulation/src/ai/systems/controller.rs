//! Per-tick решение агента: rescue → dispatch по state
//!
//! Первый проход работает с одним агентом и snapshot'ом остальных,
//! парные операции (revive, carry, release) копятся как intents и
//! применяются вторым проходом через get_many_mut.

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashMap;

use crate::ai::escape::{choose_escape_point, escape_direction};
use crate::ai::rescue::{best_ally_to_follow, plan_rescue, AllyView, RescueParams, RescuePlan};
use crate::ai::AgentState;
use crate::components::{steer_towards, GroundMap, MovementActuator, PatrolWaypoints};
use crate::DeterministicRng;
use super::carry::{begin_carry, release_carry, revive_step};
use super::effects::{transition_to, AgentQuery, AgentQueryItem, StateSinks};

/// Парная операция, отложенная до второго прохода
#[derive(Debug, Clone, Copy, PartialEq)]
enum Intent {
    Revive { helper: Entity, ally: Entity },
    Carry { helper: Entity, ally: Entity },
    /// Опустить ally и перейти в `then`
    Release { carrier: Entity, then: AgentState },
}

/// Патруль: идём к текущему waypoint, дошли → случайный следующий
fn walk_patrol(agent: &mut AgentQueryItem, waypoints: &PatrolWaypoints, rng: &mut DeterministicRng, delta: f32) {
    if waypoints.points.is_empty() {
        return;
    }
    let count = waypoints.points.len();
    let target = waypoints.points[agent.fsm.patrol_index % count];
    let acceleration = agent.tuning.acceleration;

    steer_towards(&mut *agent.nav, &mut agent.fsm.speed, target, delta, acceleration);

    if agent.nav.remaining_distance() <= agent.nav.stopping_distance() && !agent.nav.is_path_pending() {
        agent.fsm.patrol_index = rng.rng.gen_range(0..count);
    }
}

/// Escape/Carry: бежим от врагов (нет врагов → по текущему heading)
fn flee(
    agent: &mut AgentQueryItem,
    hostiles: &[Vec3],
    ground: &GroundMap,
    waypoints: &PatrolWaypoints,
    rng: &mut DeterministicRng,
    delta: f32,
) {
    let position = agent.transform.translation;
    let forward = *agent.transform.forward();
    let right = *agent.transform.right();

    let mut direction = escape_direction(position, hostiles, forward);
    if direction == Vec3::ZERO {
        direction = forward;
    }

    let route = choose_escape_point(position, direction, right, ground, agent.tuning.escape_distance);
    let target = match route.point() {
        Some(point) => point,
        None => {
            crate::log_warning(&format!(
                "{}: нет escape точки с землёй, бежим к waypoint",
                agent.agent.name
            ));
            if waypoints.points.is_empty() {
                return;
            }
            let index = rng.rng.gen_range(0..waypoints.points.len());
            waypoints.points[index]
        }
    };

    let acceleration = agent.tuning.acceleration;
    steer_towards(&mut *agent.nav, &mut agent.fsm.speed, target, delta, acceleration);
}

/// System: главный цикл решений агентов
pub fn agent_controller(
    time: Res<Time<Fixed>>,
    mut agents: Query<AgentQuery>,
    others: Query<&Transform, Without<crate::ai::AgentFsm>>,
    waypoints: Res<PatrolWaypoints>,
    ground: Res<GroundMap>,
    mut rng: ResMut<DeterministicRng>,
    mut sinks: StateSinks,
) {
    let delta = time.delta_secs();

    // Snapshot всех агентов на начало тика
    let peers: HashMap<Entity, (Vec3, AgentState)> = agents
        .iter()
        .map(|agent| (agent.entity, (agent.transform.translation, agent.fsm.state())))
        .collect();

    let mut intents = Vec::new();

    for mut agent in agents.iter_mut() {
        let state = agent.fsm.state();
        if state.is_dead() {
            continue;
        }

        agent.agent.lived_time += delta;

        let allies: Vec<AllyView> = agent
            .registry
            .allies()
            .iter()
            .filter_map(|&entity| {
                peers.get(&entity).map(|&(position, state)| AllyView {
                    entity,
                    position,
                    state,
                })
            })
            .collect();
        let hostiles: Vec<Vec3> = agent
            .registry
            .hostiles()
            .iter()
            .filter_map(|&entity| others.get(entity).ok().map(|transform| transform.translation))
            .collect();

        if matches!(state, AgentState::Idle | AgentState::Walk | AgentState::Escape) {
            let params = RescueParams::from(agent.tuning);
            let position = agent.transform.translation;

            if let Some(plan) = plan_rescue(position, state, &allies, &hostiles, &params) {
                match plan {
                    RescuePlan::Approach { position, .. } => {
                        let acceleration = agent.tuning.acceleration;
                        steer_towards(&mut *agent.nav, &mut agent.fsm.speed, position, delta, acceleration);
                    }
                    RescuePlan::Revive { ally } => intents.push(Intent::Revive {
                        helper: agent.entity,
                        ally,
                    }),
                    RescuePlan::Carry { ally } => intents.push(Intent::Carry {
                        helper: agent.entity,
                        ally,
                    }),
                }
                continue;
            }
        }

        match state {
            AgentState::Idle => {
                let tuning = agent.tuning;
                let roll = rng.rng.gen_range(0..1000) < tuning.idle_walk_chance_per_mille;
                let tick = agent.fsm.tick_idle(delta, tuning, roll);

                agent.transform.rotate_y(tick.yaw_degrees.to_radians());
                let speed = agent.fsm.speed.current;
                agent.nav.set_speed(speed);

                if tick.start_walking {
                    transition_to(&mut agent, AgentState::Walk, &mut sinks);
                }
            }
            AgentState::Walk => walk_patrol(&mut agent, &waypoints, &mut rng, delta),
            AgentState::Escape => flee(&mut agent, &hostiles, &ground, &waypoints, &mut rng, delta),
            AgentState::Carry => {
                if hostiles.is_empty() {
                    intents.push(Intent::Release {
                        carrier: agent.entity,
                        then: AgentState::Idle,
                    });
                } else {
                    flee(&mut agent, &hostiles, &ground, &waypoints, &mut rng, delta);
                }
            }
            AgentState::Fall => {
                if agent.fsm.tick_fall(delta) {
                    crate::log_info(&format!("{} не дождался помощи", agent.agent.name));
                    transition_to(&mut agent, AgentState::Death, &mut sinks);
                } else if !allies.is_empty() {
                    let position = agent.transform.translation;
                    if let Some(target) = best_ally_to_follow(position, &allies) {
                        let acceleration = agent.tuning.acceleration;
                        steer_towards(&mut *agent.nav, &mut agent.fsm.speed, target.position, delta, acceleration);
                    }
                } else {
                    walk_patrol(&mut agent, &waypoints, &mut rng, delta);
                }
            }
            // Carried едет на anchor (pin_carried_agents), Raising ждёт helper'а
            AgentState::Carried | AgentState::Raising | AgentState::Death => {}
        }
    }

    for intent in intents {
        match intent {
            Intent::Revive { helper, ally } => {
                if let Ok([mut helper, mut ally]) = agents.get_many_mut([helper, ally]) {
                    revive_step(&mut helper, &mut ally, delta, &mut sinks);
                }
            }
            Intent::Carry { helper, ally } => {
                if let Ok([mut helper, mut ally]) = agents.get_many_mut([helper, ally]) {
                    begin_carry(&mut helper, &mut ally, &mut sinks);
                }
            }
            Intent::Release { carrier, then } => {
                let carrying = agents.get(carrier).ok().and_then(|agent| agent.link.carrying);
                if let Some(ally) = carrying {
                    if let Ok([mut carrier, mut ally]) = agents.get_many_mut([carrier, ally]) {
                        release_carry(&mut carrier, &mut ally, &mut sinks);
                    }
                }
                if let Ok(mut carrier) = agents.get_mut(carrier) {
                    carrier.link.carrying = None;
                    transition_to(&mut carrier, then, &mut sinks);
                }
            }
        }
    }
}
