//! FSM агента: состояния, таблица переходов, таймеры, эффекты входа в state

use bevy::prelude::*;
use crate::components::{AgentTuning, SpeedControl};

/// Состояния агента (ровно одно на агента)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum AgentState {
    /// Стоит, крутится на месте, ждёт таймаута
    #[default]
    Idle,
    /// Патрулирует по waypoints
    Walk,
    /// Убегает от врагов
    Escape,
    /// Несёт упавшего союзника и убегает
    Carry,
    /// Его несут (позиция = anchor carrier'а)
    Carried,
    /// Упал: ползёт, ждёт помощи, истекает таймер смерти
    Fall,
    /// Его поднимают прямо сейчас
    Raising,
    /// Мёртв, FSM отключен навсегда
    Death,
}

impl AgentState {
    /// Таблица переходов. Всё что не разрешено: no-op.
    ///
    /// Death поглощает всё, Carried выходит только в Fall.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;

        if self == next {
            return false;
        }

        match (self, next) {
            (Death, _) => false,
            (Carried, Fall) => true,
            (Carried, _) => false,
            (Fall, Death | Idle | Carried | Raising) => true,
            (Fall, _) => false,
            (Raising, Fall | Idle) => true,
            (Raising, _) => false,
            (Idle, Walk | Escape | Carry | Carried | Fall) => true,
            (Walk, Idle | Escape | Carry | Fall) => true,
            (Escape, Idle | Carry | Fall) => true,
            (Carry, Idle | Fall) => true,
            _ => false,
        }
    }

    /// Упал и ждёт помощи (кандидат на rescue)
    pub fn is_fallen(self) -> bool {
        matches!(self, AgentState::Fall | AgentState::Raising)
    }

    /// Не может действовать сам
    pub fn is_incapacitated(self) -> bool {
        matches!(
            self,
            AgentState::Fall | AgentState::Raising | AgentState::Carried | AgentState::Death
        )
    }

    pub fn is_dead(self) -> bool {
        self == AgentState::Death
    }
}

/// Визуальные cues (fire-and-forget, анимации/звуки снаружи)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum VisualCue {
    StandUp,
    Walk,
    Flee,
    PickUp,
    Carried,
    Collapse,
    Raising,
    Death,
    PutDown,
    LightOn,
    LightOff,
}

/// Побочные эффекты входа в state (применяет система, в FSM только описание)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEffect {
    Cue(VisualCue),
    StopNavigation,
    ResumeNavigation,
    /// Destination = текущая позиция
    HaltInPlace,
    RegisterFallen,
    UnregisterFallen,
    /// AgentFell подписчикам
    NotifyFell,
    CancelAllTasks,
}

/// Принятый переход from → to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AgentState,
    pub to: AgentState,
}

impl Transition {
    pub fn effects(&self) -> Vec<StateEffect> {
        use StateEffect::*;

        match self.to {
            AgentState::Idle => vec![Cue(VisualCue::StandUp), UnregisterFallen],
            AgentState::Walk => vec![Cue(VisualCue::Walk)],
            AgentState::Escape => vec![Cue(VisualCue::Flee)],
            AgentState::Carry => vec![Cue(VisualCue::PickUp)],
            AgentState::Carried => vec![Cue(VisualCue::Carried), StopNavigation],
            AgentState::Fall => {
                let mut effects = vec![Cue(VisualCue::Collapse), RegisterFallen, NotifyFell];
                if self.from == AgentState::Carried {
                    effects.push(ResumeNavigation);
                }
                effects
            }
            AgentState::Raising => vec![Cue(VisualCue::Raising)],
            AgentState::Death => vec![
                CancelAllTasks,
                HaltInPlace,
                UnregisterFallen,
                Cue(VisualCue::Death),
            ],
        }
    }
}

/// Idle таймеры: до Walk и до смены направления поворота
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct IdleClock {
    pub elapsed: f32,
    pub since_flip: f32,
    /// +1 / -1
    pub yaw_sign: f32,
}

impl Default for IdleClock {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            since_flip: 0.0,
            yaw_sign: 1.0,
        }
    }
}

/// Результат Idle тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleTick {
    /// Поворот вокруг Y за тик (градусы)
    pub yaw_degrees: f32,
    pub start_walking: bool,
}

/// Результат одного revive тика
#[derive(Debug, Clone, PartialEq)]
pub struct ReviveTick {
    /// 0..=1
    pub progress: f32,
    pub completed: bool,
    pub transitions: Vec<Transition>,
}

/// FSM агента: state + таймеры + speed bracket
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AgentFsm {
    state: AgentState,
    /// Полная длительность revive (делится бустами)
    pub rise_duration: f32,
    pub rise_remaining: f32,
    pub death_remaining: f32,
    pub idle: IdleClock,
    pub speed: SpeedControl,
    /// Индекс текущего patrol waypoint
    pub patrol_index: usize,
}

impl AgentFsm {
    pub fn new(tuning: &AgentTuning) -> Self {
        Self {
            state: AgentState::Idle,
            rise_duration: tuning.fall_to_rise,
            rise_remaining: tuning.fall_to_rise,
            death_remaining: tuning.fall_to_death,
            idle: IdleClock::default(),
            speed: SpeedControl::new(tuning.standing_speed),
            patrol_index: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Попытка перехода. None: переход запрещён таблицей (ничего не изменилось).
    ///
    /// Внутренние сбросы (speed bracket, таймеры Fall, idle clock) делаются здесь,
    /// внешние эффекты возвращаются через Transition::effects.
    pub fn change_state(&mut self, next: AgentState, tuning: &AgentTuning) -> Option<Transition> {
        if !self.state.can_transition_to(next) {
            return None;
        }

        let transition = Transition {
            from: self.state,
            to: next,
        };
        self.state = next;

        match next {
            AgentState::Idle => {
                self.speed.set_bracket(tuning.standing_speed);
                self.idle.elapsed = 0.0;
            }
            AgentState::Fall => {
                self.speed.set_bracket(tuning.crawling_speed);
                self.speed.current = self.speed.min;
                // Любой вход в Fall (и прерванный revive тоже) начинает таймеры заново
                self.rise_remaining = self.rise_duration;
                self.death_remaining = tuning.fall_to_death;
            }
            _ => {}
        }

        Some(transition)
    }

    /// Idle тик: таймеры, осцилляция поворота, затухание скорости
    ///
    /// `roll_hit`: выпал ли случайный шанс уйти в Walk на этом тике.
    pub fn tick_idle(&mut self, delta: f32, tuning: &AgentTuning, roll_hit: bool) -> IdleTick {
        self.idle.since_flip += delta;
        self.idle.elapsed += delta;

        if self.idle.since_flip > tuning.idle_yaw_flip_interval {
            self.idle.yaw_sign = -self.idle.yaw_sign;
            self.idle.since_flip = 0.0;
        }

        let yaw_degrees = tuning.idle_yaw_speed * delta * self.idle.yaw_sign;
        let start_walking = roll_hit || self.idle.elapsed >= tuning.idle_to_walk;
        if start_walking {
            self.idle.elapsed = 0.0;
        }

        self.speed.decelerate(delta, tuning.idle_deceleration);

        IdleTick {
            yaw_degrees,
            start_walking,
        }
    }

    /// Fall тик: уменьшает таймер смерти, true: пора умирать
    pub fn tick_fall(&mut self, delta: f32) -> bool {
        self.death_remaining -= delta;
        self.death_remaining <= 0.0
    }

    /// Один тик помощи от другого агента
    ///
    /// None: агент не в Fall/Raising (мёртв, несут, уже стоит): помощь отклонена.
    pub fn revive_tick(&mut self, delta: f32, tuning: &AgentTuning) -> Option<ReviveTick> {
        if !self.state.is_fallen() {
            return None;
        }

        let mut transitions = Vec::new();
        if let Some(t) = self.change_state(AgentState::Raising, tuning) {
            transitions.push(t);
        }

        self.rise_remaining -= delta;

        let completed = self.rise_remaining <= 0.0;
        if completed {
            self.rise_remaining = 0.0;
            if let Some(t) = self.change_state(AgentState::Idle, tuning) {
                transitions.push(t);
            }
        }

        Some(ReviveTick {
            progress: self.rise_progress(),
            completed,
            transitions,
        })
    }

    /// Прогресс revive 0..=1
    pub fn rise_progress(&self) -> f32 {
        if self.rise_duration <= 0.0 {
            return 1.0;
        }
        (1.0 - self.rise_remaining / self.rise_duration).clamp(0.0, 1.0)
    }

    /// Буст: revive в `factor` раз быстрее. Прогресс в процентах сохраняется.
    pub fn boost_rise(&mut self, factor: u32) -> bool {
        if factor == 0 || self.state.is_dead() {
            return false;
        }
        let factor = factor as f32;
        self.rise_duration /= factor;
        self.rise_remaining /= factor;
        true
    }
}
