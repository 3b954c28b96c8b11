//! AI Events: входящие сигналы извне и исходящие уведомления
//!
//! Входящие: PerceptionEvent (trigger сенсора), FallSignal, ReviveBoost,
//! TeleportRequest, LightCommand.
//! Исходящие: AgentCue (визуал), AgentFell, StateChanged, AgentRevived.

use bevy::prelude::*;
use crate::ai::{AgentState, VisualCue};

/// Сигнал сенсора агента (proximity trigger)
///
/// Классификация other (враг/союзник/приманка): через Humanoid tag,
/// один раз при обработке события.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionEvent {
    /// other вошёл в сенсор observer'а
    Entered { observer: Entity, other: Entity },
    /// other вышел из сенсора (или исчез)
    Exited { observer: Entity, other: Entity },
}

/// Внешний сигнал "агент упал" (урон, ловушка, враг догнал)
#[derive(Event, Debug, Clone, Copy)]
pub struct FallSignal {
    pub entity: Entity,
}

/// Буст: revive агента в `factor` раз быстрее
#[derive(Event, Debug, Clone, Copy)]
pub struct ReviveBoost {
    pub entity: Entity,
    pub factor: u32,
}

/// Телепорт агента в точку
#[derive(Event, Debug, Clone, Copy)]
pub struct TeleportRequest {
    pub entity: Entity,
    pub position: Vec3,
}

/// Управление light агента (Disable срабатывает с задержкой)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    Enable { entity: Entity },
    Disable { entity: Entity },
}

/// Visual cue для презентации (анимация, VFX, звук)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentCue {
    pub entity: Entity,
    pub cue: VisualCue,
}

/// Агент упал (подписчики: UI, spawner, счётчики)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentFell {
    pub entity: Entity,
}

/// Любой принятый переход FSM
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    pub entity: Entity,
    pub from: AgentState,
    pub to: AgentState,
}

/// Revive завершён: helper поднял ally
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentRevived {
    pub helper: Entity,
    pub ally: Entity,
}
