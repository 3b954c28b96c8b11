//! Movement компоненты: MovementActuator контракт, headless NavAgent, speed shaping

use bevy::prelude::*;
use crate::components::SpeedRange;

/// Контракт навигации, которым пользуется FSM
///
/// Pathfinding живёт снаружи (NavMesh host или headless NavAgent).
/// FSM только выбирает destination и скорость.
pub trait MovementActuator {
    fn set_speed(&mut self, speed: f32);
    fn set_destination(&mut self, point: Vec3);
    fn remaining_distance(&self) -> f32;
    fn is_path_pending(&self) -> bool;
    fn stopping_distance(&self) -> f32;
    fn set_stopped(&mut self, stopped: bool);
}

/// Headless навигационный агент (прямая линия до destination)
///
/// Новый destination считается "pending" до следующего navigation step,
/// как у NavMeshAgent пока путь не посчитан.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct NavAgent {
    pub speed: f32,
    pub destination: Option<Vec3>,
    pub remaining_distance: f32,
    pub path_pending: bool,
    pub stopping_distance: f32,
    pub is_stopped: bool,
    /// Velocity последнего step (для анимации)
    pub velocity: Vec3,
}

impl Default for NavAgent {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl NavAgent {
    pub fn new(stopping_distance: f32) -> Self {
        Self {
            speed: 0.0,
            destination: None,
            remaining_distance: 0.0,
            path_pending: false,
            stopping_distance,
            is_stopped: false,
            velocity: Vec3::ZERO,
        }
    }

    pub fn current_speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Один navigation step: двигает `position` к destination
    pub fn step(&mut self, position: &mut Vec3, delta: f32) {
        self.path_pending = false;

        let Some(destination) = self.destination else {
            self.velocity = Vec3::ZERO;
            self.remaining_distance = 0.0;
            return;
        };

        let to_target = destination - *position;
        let distance = to_target.length();

        if self.is_stopped || distance <= self.stopping_distance || delta <= 0.0 {
            self.velocity = Vec3::ZERO;
            self.remaining_distance = distance;
            return;
        }

        let travel = (self.speed.max(0.0) * delta).min(distance);
        let direction = to_target / distance;
        *position += direction * travel;

        self.velocity = direction * (travel / delta);
        self.remaining_distance = distance - travel;
    }
}

impl MovementActuator for NavAgent {
    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn set_destination(&mut self, point: Vec3) {
        if self.destination != Some(point) {
            self.destination = Some(point);
            self.path_pending = true;
        }
    }

    fn remaining_distance(&self) -> f32 {
        self.remaining_distance
    }

    fn is_path_pending(&self) -> bool {
        self.path_pending
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.is_stopped = stopped;
        if stopped {
            self.velocity = Vec3::ZERO;
        }
    }
}

/// Текущая скорость + активный bracket
///
/// Инвариант после accelerate: min ≤ current ≤ max
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct SpeedControl {
    pub current: f32,
    pub min: f32,
    pub max: f32,
}

impl SpeedControl {
    pub fn new(range: SpeedRange) -> Self {
        let mut control = Self { current: 0.0, min: 0.0, max: 0.0 };
        control.set_bracket(range);
        control.current = control.min;
        control
    }

    /// Сменить bracket (current не трогаем, зажмётся на следующем accelerate)
    pub fn set_bracket(&mut self, range: SpeedRange) {
        self.min = range.min.min(range.max);
        self.max = range.max.max(range.min);
    }

    /// Разгон перед set_destination, возвращает скорость для actuator
    pub fn accelerate(&mut self, delta: f32, acceleration: f32) -> f32 {
        self.current = (self.current + delta * acceleration).max(self.min).min(self.max);
        self.current
    }

    /// Затухание в Idle: [0, max]
    pub fn decelerate(&mut self, delta: f32, deceleration: f32) {
        self.current = (self.current - delta * deceleration).max(0.0).min(self.max);
    }
}

/// Запросить движение к точке с разгоном в пределах bracket
pub fn steer_towards<M: MovementActuator>(
    actuator: &mut M,
    speed: &mut SpeedControl,
    target: Vec3,
    delta: f32,
    acceleration: f32,
) {
    let next_speed = speed.accelerate(delta, acceleration);
    actuator.set_speed(next_speed);
    actuator.set_destination(target);
}
