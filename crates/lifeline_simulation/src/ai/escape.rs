//! Escape planner: направление побега от врагов + выбор точки с землёй
//!
//! Чистые функции (без ECS), вызываются из agent_controller для Escape/Carry.

use bevy::prelude::*;
use crate::components::GroundMap;

/// Враги ближе этого считаются "в агенте" и не влияют на направление
const MIN_HOSTILE_DISTANCE: f32 = 1e-4;

/// Направление побега (unit vector) или Vec3::ZERO если врагов нет
///
/// Каждый враг даёт единичный вектор "агент → враг" с весом 1/distance,
/// среднее разворачивается. Вырожденное среднее (враги симметрично или все
/// в точке агента) → текущий forward.
pub fn escape_direction(position: Vec3, hostiles: &[Vec3], forward: Vec3) -> Vec3 {
    if hostiles.is_empty() {
        return Vec3::ZERO;
    }

    let mut approach = Vec3::ZERO;
    for &hostile in hostiles {
        let to_hostile = hostile - position;
        let distance = to_hostile.length();
        if distance < MIN_HOSTILE_DISTANCE {
            continue;
        }
        approach += (to_hostile / distance) / distance;
    }
    approach /= hostiles.len() as f32;

    match (-approach).try_normalize() {
        Some(direction) => direction,
        None => forward.try_normalize().unwrap_or(Vec3::NEG_Z),
    }
}

/// Куда бежать
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EscapeRoute {
    /// Прямо по escape direction
    Direct(Vec3),
    /// Вбок (right или left агента): прямо обрыв
    Lateral(Vec3),
    /// Ни одна точка не над землёй → fallback на patrol waypoint
    NoRoute,
}

impl EscapeRoute {
    pub fn point(&self) -> Option<Vec3> {
        match *self {
            EscapeRoute::Direct(point) | EscapeRoute::Lateral(point) => Some(point),
            EscapeRoute::NoRoute => None,
        }
    }
}

/// Выбрать escape точку: direct → right → left
pub fn choose_escape_point(
    position: Vec3,
    direction: Vec3,
    right: Vec3,
    ground: &GroundMap,
    distance: f32,
) -> EscapeRoute {
    let direct = position + direction * distance;
    if ground.has_ground_below(direct) {
        return EscapeRoute::Direct(direct);
    }

    for side in [right, -right] {
        let point = position + side * distance;
        if ground.has_ground_below(point) {
            return EscapeRoute::Lateral(point);
        }
    }

    EscapeRoute::NoRoute
}
