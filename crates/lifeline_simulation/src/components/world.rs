//! World ресурсы: patrol waypoints, ground probe, fallen roster

use bevy::prelude::*;
use crate::components::AgentTuning;

/// Есть ли земля под точкой (короткий probe вниз)
///
/// Реализация снаружи: raycast по коллайдерам, navmesh sample, heightmap.
pub trait GroundProbe: Send + Sync {
    fn has_ground_below(&self, point: Vec3) -> bool;
}

impl<F> GroundProbe for F
where
    F: Fn(Vec3) -> bool + Send + Sync,
{
    fn has_ground_below(&self, point: Vec3) -> bool {
        self(point)
    }
}

/// Бесконечная плоскость (земля везде)
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround;

impl GroundProbe for FlatGround {
    fn has_ground_below(&self, _point: Vec3) -> bool {
        true
    }
}

/// Прямоугольная арена в XZ (за краем обрыв)
#[derive(Debug, Clone, Copy)]
pub struct ArenaGround {
    pub min: Vec2,
    pub max: Vec2,
}

impl ArenaGround {
    pub fn centered(half_extent: f32) -> Self {
        Self {
            min: Vec2::splat(-half_extent),
            max: Vec2::splat(half_extent),
        }
    }
}

impl GroundProbe for ArenaGround {
    fn has_ground_below(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.y && point.z <= self.max.y
    }
}

/// Resource: активный ground probe
#[derive(Resource)]
pub struct GroundMap(pub Box<dyn GroundProbe>);

impl Default for GroundMap {
    fn default() -> Self {
        Self(Box::new(FlatGround))
    }
}

impl GroundMap {
    pub fn new(probe: impl GroundProbe + 'static) -> Self {
        Self(Box::new(probe))
    }

    pub fn has_ground_below(&self, point: Vec3) -> bool {
        self.0.has_ground_below(point)
    }
}

/// Resource: точки патрулирования (spawn points уровня)
#[derive(Resource, Debug, Clone, Default)]
pub struct PatrolWaypoints {
    pub points: Vec<Vec3>,
}

impl PatrolWaypoints {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }
}

/// Resource: упавшие агенты (для внешних систем: pointer, UI highlight)
///
/// Порядок регистрации сохраняется, дубликатов нет.
#[derive(Resource, Debug, Clone, Default)]
pub struct FallenRoster {
    entities: Vec<Entity>,
}

impl FallenRoster {
    pub fn register(&mut self, entity: Entity) {
        if !self.entities.contains(&entity) {
            self.entities.push(entity);
        }
    }

    pub fn unregister(&mut self, entity: Entity) {
        self.entities.retain(|&e| e != entity);
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Resource: tuning для новых агентов (из SimulationConfig)
#[derive(Resource, Debug, Clone, Default)]
pub struct DefaultTuning(pub AgentTuning);
