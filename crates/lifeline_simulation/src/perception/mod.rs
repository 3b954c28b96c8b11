//! Headless proximity sensors → PerceptionEvent
//!
//! Заменяет trigger-коллайдер сенсора: каждый тик считаем кто в радиусе,
//! сравниваем с прошлым тиком, шлём Entered/Exited.
//! BTree-коллекции → порядок events не зависит от хэшей.

use bevy::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::ai::{update_threat_registry, PerceptionEvent};
use crate::components::Humanoid;

/// Сенсор агента (сфера радиуса `radius`)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct ProximitySensor {
    pub radius: f32,
}

impl Default for ProximitySensor {
    fn default() -> Self {
        Self { radius: 12.0 }
    }
}

/// Resource: кто в чьём сенсоре (observer → others)
#[derive(Resource, Debug, Default)]
pub struct SensorTracking {
    pub inside: BTreeMap<Entity, BTreeSet<Entity>>,
}

/// System: пересчитать сенсоры и отправить разницу
///
/// Exited идут раньше Entered для одного observer'а.
pub fn poll_proximity_sensors(
    sensors: Query<(Entity, &ProximitySensor, &Transform)>,
    humanoids: Query<(Entity, &Transform), With<Humanoid>>,
    mut tracking: ResMut<SensorTracking>,
    mut events: EventWriter<PerceptionEvent>,
) {
    let mut targets: Vec<(Entity, Vec3)> = humanoids
        .iter()
        .map(|(entity, transform)| (entity, transform.translation))
        .collect();
    targets.sort_by_key(|(entity, _)| *entity);

    let mut observers: Vec<(Entity, f32, Vec3)> = sensors
        .iter()
        .map(|(entity, sensor, transform)| (entity, sensor.radius, transform.translation))
        .collect();
    observers.sort_by_key(|(entity, _, _)| *entity);

    // Сенсоры, которые пропали, больше ничего не отслеживают
    let alive: BTreeSet<Entity> = observers.iter().map(|(entity, _, _)| *entity).collect();
    tracking.inside.retain(|observer, _| alive.contains(observer));

    for (observer, radius, position) in observers {
        let current: BTreeSet<Entity> = targets
            .iter()
            .filter(|(other, other_position)| *other != observer && position.distance(*other_position) <= radius)
            .map(|(other, _)| *other)
            .collect();

        let previous = tracking.inside.entry(observer).or_default();

        for &other in previous.difference(&current) {
            events.write(PerceptionEvent::Exited { observer, other });
        }
        for &other in current.difference(previous) {
            events.write(PerceptionEvent::Entered { observer, other });
        }

        *previous = current;
    }
}

/// Opt-in plugin: headless сенсоры вместо внешнего trigger source
pub struct ProximitySensorPlugin;

impl Plugin for ProximitySensorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SensorTracking>()
            .register_type::<ProximitySensor>()
            .add_systems(FixedUpdate, poll_proximity_sensors.before(update_threat_registry));
    }
}
