//! Отложенные задачи агента (вместо корутин "подожди N секунд")
//!
//! Ключ: назначение задачи. Повторный schedule того же назначения
//! отменяет предыдущую (debounce).

use bevy::prelude::*;

/// Назначение отложенной задачи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum TaskPurpose {
    /// Враги пропали → через random(min..max) вернуться в Idle
    ResumeIdle,
    /// Revive не продлили → обратно в Fall
    ReviveTimeout,
    /// Выключить light
    LightOff,
    /// Снять флаг teleporting
    TeleportCooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ScheduledTask {
    pub purpose: TaskPurpose,
    pub remaining: f32,
}

#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct ScheduledTasks {
    tasks: Vec<ScheduledTask>,
}

impl ScheduledTasks {
    /// Запланировать (отменяет прошлую задачу с тем же purpose)
    pub fn schedule(&mut self, purpose: TaskPurpose, delay: f32) {
        self.cancel(purpose);
        self.tasks.push(ScheduledTask {
            purpose,
            remaining: delay.max(0.0),
        });
    }

    pub fn cancel(&mut self, purpose: TaskPurpose) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.purpose != purpose);
        before != self.tasks.len()
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, purpose: TaskPurpose) -> bool {
        self.tasks.iter().any(|task| task.purpose == purpose)
    }

    pub fn remaining(&self, purpose: TaskPurpose) -> Option<f32> {
        self.tasks
            .iter()
            .find(|task| task.purpose == purpose)
            .map(|task| task.remaining)
    }

    /// Продвинуть время. Возвращает сработавшие задачи в порядке планирования.
    pub fn tick(&mut self, delta: f32) -> Vec<TaskPurpose> {
        let mut fired = Vec::new();

        self.tasks.retain_mut(|task| {
            task.remaining -= delta;
            if task.remaining <= 0.0 {
                fired.push(task.purpose);
                false
            } else {
                true
            }
        });

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_fires_after_delay() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskPurpose::ResumeIdle, 1.0);

        assert!(tasks.tick(0.5).is_empty());
        assert_eq!(tasks.tick(0.5), vec![TaskPurpose::ResumeIdle]);
        assert!(!tasks.is_pending(TaskPurpose::ResumeIdle));
    }

    #[test]
    fn test_reschedule_cancels_previous() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskPurpose::ReviveTimeout, 0.5);
        tasks.tick(0.25);
        tasks.schedule(TaskPurpose::ReviveTimeout, 0.5);

        // Первая задача сработала бы здесь
        assert!(tasks.tick(0.25).is_empty());
        assert_eq!(tasks.remaining(TaskPurpose::ReviveTimeout), Some(0.25));
        assert_eq!(tasks.tick(0.25), vec![TaskPurpose::ReviveTimeout]);
    }

    #[test]
    fn test_purposes_are_independent() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskPurpose::LightOff, 0.5);
        tasks.schedule(TaskPurpose::TeleportCooldown, 0.25);

        assert!(tasks.cancel(TaskPurpose::LightOff));
        assert!(!tasks.cancel(TaskPurpose::LightOff));
        assert_eq!(tasks.tick(0.25), vec![TaskPurpose::TeleportCooldown]);
    }

    #[test]
    fn test_cancel_all() {
        let mut tasks = ScheduledTasks::default();
        tasks.schedule(TaskPurpose::LightOff, 0.5);
        tasks.schedule(TaskPurpose::ResumeIdle, 3.0);
        tasks.cancel_all();

        assert!(tasks.tick(10.0).is_empty());
    }
}
