//! Базовые компоненты агентов: Agent, Humanoid, AgentTuning, derived stats

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Агент (NPC под управлением FSM)
///
/// Счётчики растут монотонно пока агент жив (Death замораживает всё).
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct Agent {
    pub name: String,
    /// Сколько секунд агент прожил (не растёт в Death)
    pub lived_time: f32,
    /// Сколько раз агент довёл revive до конца
    pub help_count: u32,
    /// Point light над головой (визуальный toggle)
    pub light_enabled: bool,
    /// true в течение teleport cooldown после телепорта
    pub teleporting: bool,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            light_enabled: true,
            ..default()
        }
    }

    /// Read-only проекция наград (ничего не хранится отдельно)
    pub fn stats(&self, tuning: &AgentTuning) -> AgentStats {
        AgentStats {
            name: self.name.clone(),
            help_count: self.help_count,
            earned_money: reward(self.help_count, 10, 50, tuning.money_multiplier),
            earned_experience: reward(self.help_count, 5, 25, tuning.experience_multiplier),
            survived_time: self.lived_time + tuning.survived_time_offset,
        }
    }
}

/// `(help_count * per_help + base) * multiplier`, большие значения упираются в u32::MAX
fn reward(help_count: u32, per_help: u32, base: u32, multiplier: u32) -> u32 {
    help_count
        .saturating_mul(per_help)
        .saturating_add(base)
        .saturating_mul(multiplier)
}

/// Итоги агента для экрана поражения / summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStats {
    pub name: String,
    pub help_count: u32,
    pub earned_money: u32,
    pub earned_experience: u32,
    pub survived_time: f32,
}

/// Тег humanoid-сущности, по нему perception классифицирует "кто вошёл в сенсор"
///
/// Резолвится один раз при PerceptionEvent, не каждый тик.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub enum Humanoid {
    /// Другой агент (союзник)
    Agent,
    /// Враг: от него убегают
    Hostile,
    /// Приманка: выглядит как агент, но не союзник и не враг
    Decoy,
}

/// Как агент воспринимает другую сущность
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perceived {
    Ally,
    Hostile,
}

impl Humanoid {
    pub fn perceived_as(self) -> Option<Perceived> {
        match self {
            Humanoid::Agent => Some(Perceived::Ally),
            Humanoid::Hostile => Some(Perceived::Hostile),
            Humanoid::Decoy => None,
        }
    }
}

/// Диапазон скорости (min..max) для одного state bracket
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f32,
    pub max: f32,
}

impl SpeedRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Параметры агента (скорости, таймеры, дистанции rescue)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct AgentTuning {
    /// Bracket скорости на ногах (Idle/Walk/Escape/Carry)
    pub standing_speed: SpeedRange,
    /// Bracket скорости ползком (Fall)
    pub crawling_speed: SpeedRange,
    /// Разгон (units/sec за секунду) перед каждым set_destination
    pub acceleration: f32,
    /// Затухание скорости в Idle (units/sec за секунду)
    pub idle_deceleration: f32,
    /// Время revive от Fall до Idle (секунды непрерывной помощи)
    pub fall_to_rise: f32,
    /// Время от Fall до Death
    pub fall_to_death: f32,
    /// Idle → Walk по таймауту
    pub idle_to_walk: f32,
    /// Шанс Idle → Walk за тик (из 1000)
    pub idle_walk_chance_per_mille: u32,
    /// Скорость поворота в Idle (градусы/сек)
    pub idle_yaw_speed: f32,
    /// Через сколько секунд Idle-поворот меняет направление
    pub idle_yaw_flip_interval: f32,
    /// Дистанция escape точки
    pub escape_distance: f32,
    /// Сколько ещё убегать после потери последнего врага (random в диапазоне)
    pub min_escape_time: f32,
    pub max_escape_time: f32,
    /// Дистанция revive (helper → ally)
    pub help_distance: f32,
    /// Враг ближе этого к ally → хватаем и несём вместо revive
    pub carry_distance: f32,
    /// Враг ближе этого к ally → не подходим вообще
    pub safe_distance: f32,
    /// Угол конуса "враг на пути" (градусы)
    pub rescue_cone_degrees: f32,
    /// Revive не продлён за это время → обратно в Fall
    pub revive_timeout: f32,
    pub light_off_delay: f32,
    pub teleport_cooldown: f32,
    /// Точка крепления несомого агента (local space carrier'а)
    pub carry_anchor: [f32; 3],
    /// NavAgent stopping distance
    pub stopping_distance: f32,
    pub money_multiplier: u32,
    pub experience_multiplier: u32,
    pub survived_time_offset: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            standing_speed: SpeedRange::new(5.0, 8.0),
            crawling_speed: SpeedRange::new(2.0, 3.0),
            acceleration: 3.0,
            idle_deceleration: 1.0,
            fall_to_rise: 3.0,
            fall_to_death: 30.0,
            idle_to_walk: 5.0,
            idle_walk_chance_per_mille: 5,
            idle_yaw_speed: 5.0,
            idle_yaw_flip_interval: 3.0,
            escape_distance: 25.0,
            min_escape_time: 2.0,
            max_escape_time: 4.0,
            help_distance: 2.0,
            carry_distance: 4.0,
            safe_distance: 1.0,
            rescue_cone_degrees: 45.0,
            revive_timeout: 0.5,
            light_off_delay: 0.5,
            teleport_cooldown: 0.3,
            carry_anchor: [0.0, 1.6, 0.0],
            stopping_distance: 0.5,
            money_multiplier: 1,
            experience_multiplier: 1,
            survived_time_offset: 0.2,
        }
    }
}

impl AgentTuning {
    pub fn carry_anchor(&self) -> Vec3 {
        Vec3::from_array(self.carry_anchor)
    }
}

const NAME_POOL: &[&str] = &[
    "Alex", "Blaze", "Cody", "Dash", "Echo", "Finn", "Gale", "Hex", "Ivy", "Jinx", "Kai",
    "Lumen", "Milo", "Nova", "Orin", "Pip", "Quill", "Rook", "Sky", "Tess", "Uma", "Vex",
    "Wren", "Yuki", "Zed",
];

/// Случайное имя из пула
pub fn random_name(rng: &mut impl Rng) -> String {
    let index = rng.gen_range(0..NAME_POOL.len());
    NAME_POOL[index].to_string()
}
