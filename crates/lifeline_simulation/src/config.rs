//! SimulationConfig: seed, tick rate, tuning по умолчанию, waypoints (JSON)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::components::{AgentTuning, SpeedRange};
use crate::logger::LogLevel;

/// Допустимая частота тика: период от 0.1 мс до 1 с
pub const MIN_TICK_HZ: f64 = 1.0;
pub const MAX_TICK_HZ: f64 = 10_000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Конфиг headless симуляции
///
/// Все поля опциональны в JSON (serde default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Частота FixedUpdate (Hz)
    pub tick_hz: f64,
    pub log_level: LogLevel,
    /// Tuning для всех заспавненных агентов
    pub tuning: AgentTuning,
    pub waypoints: Vec<[f32; 3]>,
    pub agent_count: usize,
    pub hostile_count: usize,
    /// Сколько тиков гонять в headless runner
    pub ticks: u32,
    /// Радиус proximity сенсора агентов
    pub sensor_radius: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_hz: 60.0,
            log_level: LogLevel::Info,
            tuning: AgentTuning::default(),
            waypoints: vec![
                [-15.0, 0.0, -15.0],
                [15.0, 0.0, -15.0],
                [15.0, 0.0, 15.0],
                [-15.0, 0.0, 15.0],
            ],
            agent_count: 4,
            hostile_count: 2,
            ticks: 3600,
            sensor_radius: 12.0,
        }
    }
}

fn check_bracket(name: &str, range: SpeedRange) -> Result<(), ConfigError> {
    if range.min < 0.0 || range.min > range.max {
        return Err(ConfigError::Invalid(format!(
            "{}: expected 0 <= min <= max, got {}..{}",
            name, range.min, range.max
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ConfigError::Invalid(format!("{} must be >= 0, got {}", name, value)));
    }
    Ok(())
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_HZ..=MAX_TICK_HZ).contains(&self.tick_hz) {
            return Err(ConfigError::Invalid(format!(
                "tick_hz must be in [{}, {}], got {}",
                MIN_TICK_HZ, MAX_TICK_HZ, self.tick_hz
            )));
        }

        let tuning = &self.tuning;
        check_bracket("standing_speed", tuning.standing_speed)?;
        check_bracket("crawling_speed", tuning.crawling_speed)?;

        for (name, value) in [
            ("acceleration", tuning.acceleration),
            ("idle_deceleration", tuning.idle_deceleration),
            ("fall_to_rise", tuning.fall_to_rise),
            ("fall_to_death", tuning.fall_to_death),
            ("idle_to_walk", tuning.idle_to_walk),
            ("idle_yaw_flip_interval", tuning.idle_yaw_flip_interval),
            ("escape_distance", tuning.escape_distance),
            ("min_escape_time", tuning.min_escape_time),
            ("max_escape_time", tuning.max_escape_time),
            ("help_distance", tuning.help_distance),
            ("carry_distance", tuning.carry_distance),
            ("safe_distance", tuning.safe_distance),
            ("revive_timeout", tuning.revive_timeout),
            ("light_off_delay", tuning.light_off_delay),
            ("teleport_cooldown", tuning.teleport_cooldown),
            ("stopping_distance", tuning.stopping_distance),
            ("sensor_radius", self.sensor_radius),
        ] {
            check_non_negative(name, value)?;
        }

        if tuning.min_escape_time > tuning.max_escape_time {
            return Err(ConfigError::Invalid(format!(
                "min_escape_time ({}) > max_escape_time ({})",
                tuning.min_escape_time, tuning.max_escape_time
            )));
        }

        if !(tuning.rescue_cone_degrees > 0.0 && tuning.rescue_cone_degrees <= 180.0) {
            return Err(ConfigError::Invalid(format!(
                "rescue_cone_degrees must be in (0, 180], got {}",
                tuning.rescue_cone_degrees
            )));
        }

        if tuning.idle_walk_chance_per_mille > 1000 {
            return Err(ConfigError::Invalid(format!(
                "idle_walk_chance_per_mille must be <= 1000, got {}",
                tuning.idle_walk_chance_per_mille
            )));
        }

        if tuning.safe_distance >= tuning.carry_distance {
            crate::log_warning(&format!(
                "safe_distance ({}) >= carry_distance ({}): carry никогда не сработает",
                tuning.safe_distance, tuning.carry_distance
            ));
        }

        Ok(())
    }

    /// Период fixed тика. Конфиг собранный в коде мог не пройти validate,
    /// поэтому частота зажимается в допустимый диапазон (NaN → 60 Hz).
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz.is_nan() {
            60.0
        } else {
            self.tick_hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ)
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    pub fn waypoint_positions(&self) -> Vec<Vec3> {
        self.waypoints.iter().copied().map(Vec3::from_array).collect()
    }
}
