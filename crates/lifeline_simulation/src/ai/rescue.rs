//! Rescue evaluator: кого спасать, можно ли подойти, revive или carry
//!
//! Чистые функции поверх snapshot'а позиций (ECS не трогаем).
//! Решение применяет agent_controller.

use bevy::prelude::*;
use crate::ai::AgentState;
use crate::components::AgentTuning;

/// Snapshot видимого союзника на момент тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllyView {
    pub entity: Entity,
    pub position: Vec3,
    pub state: AgentState,
}

/// Дистанции и угол rescue (из AgentTuning helper'а)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescueParams {
    pub help_distance: f32,
    pub carry_distance: f32,
    pub safe_distance: f32,
    pub cone_degrees: f32,
}

impl From<&AgentTuning> for RescueParams {
    fn from(tuning: &AgentTuning) -> Self {
        Self {
            help_distance: tuning.help_distance,
            carry_distance: tuning.carry_distance,
            safe_distance: tuning.safe_distance,
            cone_degrees: tuning.rescue_cone_degrees,
        }
    }
}

/// Решение rescue на этот тик
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RescuePlan {
    /// Далеко: идём к ally
    Approach { ally: Entity, position: Vec3 },
    /// Рядом, враг не близко к ally: поднимаем
    Revive { ally: Entity },
    /// Рядом, враг близко к ally: хватаем и несём
    Carry { ally: Entity },
}

impl RescuePlan {
    pub fn ally(&self) -> Entity {
        match *self {
            RescuePlan::Approach { ally, .. } | RescuePlan::Revive { ally } | RescuePlan::Carry { ally } => ally,
        }
    }
}

/// Ближайший упавший (Fall/Raising) союзник + дистанция до него
///
/// При равных дистанциях выигрывает первый в списке.
pub fn nearest_fallen_ally(helper: Vec3, allies: &[AllyView]) -> Option<(AllyView, f32)> {
    let mut best: Option<(AllyView, f32)> = None;

    for ally in allies {
        if ally.state.is_dead() || !ally.state.is_fallen() {
            continue;
        }
        let distance = helper.distance(ally.position);
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((*ally, distance));
        }
    }

    best
}

/// Дистанция от точки до ближайшего врага (INFINITY если врагов нет)
pub fn nearest_hostile_distance(point: Vec3, hostiles: &[Vec3]) -> f32 {
    hostiles
        .iter()
        .map(|&hostile| hostile.distance(point))
        .fold(f32::INFINITY, f32::min)
}

/// Враг "на пути": ближе к helper'у чем ally И внутри конуса helper → ally
///
/// Абсолютные дистанции не важны: ближний враг в конусе блокирует всегда.
pub fn hostile_blocks_path(helper: Vec3, ally: Vec3, hostiles: &[Vec3], cone_degrees: f32) -> bool {
    let to_ally = ally - helper;
    let ally_distance = to_ally.length();

    hostiles.iter().any(|&hostile| {
        let to_hostile = hostile - helper;
        let hostile_distance = to_hostile.length();
        if hostile_distance >= ally_distance {
            return false;
        }
        // Враг в точке helper'а: угол не определён, считаем что на пути
        if hostile_distance < f32::EPSILON {
            return true;
        }
        to_hostile.angle_between(to_ally).to_degrees() < cone_degrees
    })
}

/// Полная оценка rescue для helper'а
///
/// None: спасать некого или путь/ally небезопасны; тогда работает обычный dispatch.
pub fn plan_rescue(
    helper: Vec3,
    helper_state: AgentState,
    allies: &[AllyView],
    hostiles: &[Vec3],
    params: &RescueParams,
) -> Option<RescuePlan> {
    let (ally, ally_distance) = nearest_fallen_ally(helper, allies)?;

    if hostile_blocks_path(helper, ally.position, hostiles, params.cone_degrees) {
        return None;
    }

    let hostile_to_ally = nearest_hostile_distance(ally.position, hostiles);
    if hostile_to_ally < params.safe_distance {
        return None;
    }

    if ally_distance >= params.help_distance {
        return Some(RescuePlan::Approach {
            ally: ally.entity,
            position: ally.position,
        });
    }

    let can_carry = helper_state.can_transition_to(AgentState::Carry)
        && ally.state.can_transition_to(AgentState::Carried);

    if hostile_to_ally < params.carry_distance && can_carry {
        Some(RescuePlan::Carry { ally: ally.entity })
    } else {
        Some(RescuePlan::Revive { ally: ally.entity })
    }
}

/// К кому ползти упавшему агенту
///
/// Сначала стоящие союзники (ближайший из них), только если стоящих нет :
/// ближайший из упавших. Мёртвые пропускаются.
pub fn best_ally_to_follow(position: Vec3, allies: &[AllyView]) -> Option<AllyView> {
    let mut found_standing = false;
    let mut best: Option<(AllyView, f32)> = None;

    for ally in allies {
        if ally.state.is_dead() {
            continue;
        }
        let distance = position.distance(ally.position);
        let standing = !ally.state.is_fallen();

        if standing && !found_standing {
            found_standing = true;
            best = Some((*ally, distance));
        } else if standing == found_standing
            && best.map_or(true, |(_, best_distance)| distance < best_distance)
        {
            best = Some((*ally, distance));
        }
    }

    best.map(|(ally, _)| ally)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ally(index: u32, position: Vec3, state: AgentState) -> AllyView {
        AllyView {
            entity: Entity::from_raw(index),
            position,
            state,
        }
    }

    fn params(help: f32, carry: f32, safe: f32) -> RescueParams {
        RescueParams {
            help_distance: help,
            carry_distance: carry,
            safe_distance: safe,
            cone_degrees: 45.0,
        }
    }

    #[test]
    fn test_distant_hostile_means_revive() {
        let fallen = ally(1, Vec3::new(3.0, 0.0, 0.0), AgentState::Fall);
        let hostile = Vec3::new(3.0, 0.0, 10.0);

        let plan = plan_rescue(Vec3::ZERO, AgentState::Walk, &[fallen], &[hostile], &params(5.0, 2.0, 0.5));
        assert_eq!(plan, Some(RescuePlan::Revive { ally: fallen.entity }));
    }

    #[test]
    fn test_hostile_next_to_ally_means_carry() {
        let fallen = ally(1, Vec3::new(3.0, 0.0, 0.0), AgentState::Fall);
        let hostile = Vec3::new(4.0, 0.0, 0.0);

        let plan = plan_rescue(Vec3::ZERO, AgentState::Walk, &[fallen], &[hostile], &params(5.0, 2.0, 0.5));
        assert_eq!(plan, Some(RescuePlan::Carry { ally: fallen.entity }));
    }

    #[test]
    fn test_far_ally_is_approached() {
        let fallen = ally(1, Vec3::new(0.0, 0.0, 12.0), AgentState::Fall);

        let plan = plan_rescue(Vec3::ZERO, AgentState::Idle, &[fallen], &[], &params(2.0, 4.0, 1.0));
        assert_eq!(
            plan,
            Some(RescuePlan::Approach {
                ally: fallen.entity,
                position: fallen.position,
            })
        );
    }

    #[test]
    fn test_hostile_in_cone_blocks_regardless_of_distance() {
        let fallen = ally(1, Vec3::new(100.0, 0.0, 0.0), AgentState::Fall);
        // 20° от линии на ally, ближе чем ally, но далеко от обоих
        let hostile = Quat::from_rotation_y(20f32.to_radians()) * Vec3::X * 60.0;

        let plan = plan_rescue(Vec3::ZERO, AgentState::Walk, &[fallen], &[hostile], &params(5.0, 2.0, 0.5));
        assert_eq!(plan, None);
        assert!(hostile_blocks_path(Vec3::ZERO, fallen.position, &[hostile], 45.0));
    }

    #[test]
    fn test_hostile_outside_cone_or_farther_does_not_block() {
        let ally_position = Vec3::new(10.0, 0.0, 0.0);
        let wide = Quat::from_rotation_y(60f32.to_radians()) * Vec3::X * 5.0;
        let behind_ally = Vec3::new(15.0, 0.0, 0.0);

        assert!(!hostile_blocks_path(Vec3::ZERO, ally_position, &[wide], 45.0));
        assert!(!hostile_blocks_path(Vec3::ZERO, ally_position, &[behind_ally], 45.0));
        assert!(hostile_blocks_path(Vec3::ZERO, ally_position, &[Vec3::ZERO], 45.0));
    }

    #[test]
    fn test_hostile_too_close_to_ally_rejects() {
        let fallen = ally(1, Vec3::new(1.0, 0.0, 0.0), AgentState::Fall);
        // Сзади ally: вне конуса для helper'а (дальше ally), но в 0.3 от него
        let hostile = Vec3::new(1.3, 0.0, 0.0);

        let plan = plan_rescue(Vec3::ZERO, AgentState::Walk, &[fallen], &[hostile], &params(2.0, 4.0, 1.0));
        assert_eq!(plan, None);
    }

    #[test]
    fn test_only_fallen_allies_are_rescued() {
        let allies = [
            ally(1, Vec3::X, AgentState::Walk),
            ally(2, Vec3::Z, AgentState::Death),
            ally(3, Vec3::NEG_X, AgentState::Carried),
        ];
        assert_eq!(plan_rescue(Vec3::ZERO, AgentState::Idle, &allies, &[], &params(5.0, 2.0, 0.5)), None);
    }

    #[test]
    fn test_nearest_fallen_wins() {
        let allies = [
            ally(1, Vec3::new(4.0, 0.0, 0.0), AgentState::Fall),
            ally(2, Vec3::new(0.0, 0.0, 2.0), AgentState::Raising),
            ally(3, Vec3::new(1.0, 0.0, 0.0), AgentState::Idle),
        ];
        let (nearest, distance) = nearest_fallen_ally(Vec3::ZERO, &allies).unwrap();
        assert_eq!(nearest.entity, Entity::from_raw(2));
        assert_eq!(distance, 2.0);
    }

    #[test]
    fn test_raising_ally_is_revived_not_carried() {
        let raising = ally(1, Vec3::new(1.0, 0.0, 0.0), AgentState::Raising);
        let hostile = Vec3::new(2.5, 0.0, 0.0);

        let plan = plan_rescue(Vec3::ZERO, AgentState::Idle, &[raising], &[hostile], &params(2.0, 4.0, 1.0));
        assert_eq!(plan, Some(RescuePlan::Revive { ally: raising.entity }));
    }

    #[test]
    fn test_follow_prefers_standing_over_nearer_fallen() {
        let allies = [
            ally(1, Vec3::new(1.0, 0.0, 0.0), AgentState::Fall),
            ally(2, Vec3::new(9.0, 0.0, 0.0), AgentState::Walk),
            ally(3, Vec3::new(6.0, 0.0, 0.0), AgentState::Idle),
            ally(4, Vec3::new(0.5, 0.0, 0.0), AgentState::Death),
        ];
        let best = best_ally_to_follow(Vec3::ZERO, &allies).unwrap();
        assert_eq!(best.entity, Entity::from_raw(3));
    }

    #[test]
    fn test_follow_falls_back_to_nearest_fallen() {
        let allies = [
            ally(1, Vec3::new(5.0, 0.0, 0.0), AgentState::Fall),
            ally(2, Vec3::new(2.0, 0.0, 0.0), AgentState::Raising),
        ];
        let best = best_ally_to_follow(Vec3::ZERO, &allies).unwrap();
        assert_eq!(best.entity, Entity::from_raw(2));
        assert!(best_ally_to_follow(Vec3::ZERO, &[]).is_none());
    }
}
