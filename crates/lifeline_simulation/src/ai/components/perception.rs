//! Perception компоненты: ThreatRegistry (кого агент видит), CarryLink

use bevy::prelude::*;
use crate::components::Perceived;

/// Component: враги и союзники в радиусе сенсора
///
/// Обновляется только через PerceptionEvent (Entered/Exited).
/// Инвариант: entity не может быть одновременно в hostiles и allies.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct ThreatRegistry {
    hostiles: Vec<Entity>,
    allies: Vec<Entity>,
}

impl ThreatRegistry {
    /// Добавить entity. false: уже есть (в любом из списков).
    pub fn insert(&mut self, entity: Entity, perceived: Perceived) -> bool {
        if self.contains(entity) {
            return false;
        }
        match perceived {
            Perceived::Hostile => self.hostiles.push(entity),
            Perceived::Ally => self.allies.push(entity),
        }
        true
    }

    /// Убрать entity, вернуть откуда убрали
    pub fn remove(&mut self, entity: Entity) -> Option<Perceived> {
        if let Some(index) = self.hostiles.iter().position(|&e| e == entity) {
            self.hostiles.remove(index);
            return Some(Perceived::Hostile);
        }
        if let Some(index) = self.allies.iter().position(|&e| e == entity) {
            self.allies.remove(index);
            return Some(Perceived::Ally);
        }
        None
    }

    /// Вычистить entities, для которых `keep` вернул false. Возвращает сколько удалено.
    pub fn retain(&mut self, mut keep: impl FnMut(Entity) -> bool) -> usize {
        let before = self.hostiles.len() + self.allies.len();
        self.hostiles.retain(|&e| keep(e));
        self.allies.retain(|&e| keep(e));
        before - (self.hostiles.len() + self.allies.len())
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.hostiles.contains(&entity) || self.allies.contains(&entity)
    }

    pub fn hostiles(&self) -> &[Entity] {
        &self.hostiles
    }

    pub fn allies(&self) -> &[Entity] {
        &self.allies
    }

    pub fn has_hostiles(&self) -> bool {
        !self.hostiles.is_empty()
    }
}

/// Component: связь переноски
///
/// Carrier: `carrying = Some(ally)`, несомый: `carried_by = Some(carrier)`.
/// Обе стороны меняются одной операцией (ai::systems::carry).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct CarryLink {
    pub carrying: Option<Entity>,
    pub carried_by: Option<Entity>,
}
