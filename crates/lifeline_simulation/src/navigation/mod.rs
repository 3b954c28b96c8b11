//! Headless навигация: NavAgent step → Transform
//!
//! Pathfinding снаружи (NavMesh host) заменяет эту систему своей,
//! FSM видит только MovementActuator.
//!
//! Детерминизм: FixedUpdate, прямая линия без коллизий.

use bevy::prelude::*;
use crate::ai::{AgentFsm, AgentState};
use crate::components::NavAgent;

/// Горизонтальная скорость ниже этого не разворачивает агента
const MIN_TURN_SPEED: f32 = 1e-3;

/// System: продвинуть всех NavAgent'ов и развернуть по направлению движения
///
/// Idle агент докатывается по инерции, но поворотом управляет FSM (осцилляция).
pub fn advance_navigation(
    mut query: Query<(&mut NavAgent, &mut Transform, Option<&AgentFsm>)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut nav, mut transform, fsm) in query.iter_mut() {
        let mut position = transform.translation;
        nav.step(&mut position, delta);
        transform.translation = position;

        let idle = fsm.is_some_and(|fsm| fsm.state() == AgentState::Idle);
        let heading = Vec3::new(nav.velocity.x, 0.0, nav.velocity.z);
        if !idle && heading.length() > MIN_TURN_SPEED {
            transform.look_to(heading, Vec3::Y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MovementActuator;
    use std::time::Duration;

    #[test]
    fn test_navigation_moves_and_faces_destination() {
        let mut app = App::new();
        app.insert_resource(Time::<Fixed>::default());
        app.add_systems(Update, advance_navigation);

        let mut nav = NavAgent::new(0.1);
        nav.set_speed(2.0);
        nav.set_destination(Vec3::new(10.0, 0.0, 0.0));
        let entity = app.world_mut().spawn((nav, Transform::default())).id();

        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(Duration::from_millis(500));
        app.update();

        let transform = app.world().get::<Transform>(entity).unwrap();
        assert!((transform.translation.x - 1.0).abs() < 1e-4);
        assert!((*transform.forward() - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_idle_agent_glides_without_turning() {
        let mut app = App::new();
        app.insert_resource(Time::<Fixed>::default());
        app.add_systems(Update, advance_navigation);

        let mut nav = NavAgent::new(0.1);
        nav.set_speed(2.0);
        nav.set_destination(Vec3::new(10.0, 0.0, 0.0));
        let facing = Transform::default().looking_to(Vec3::Z, Vec3::Y);
        let fsm = AgentFsm::new(&crate::components::AgentTuning::default());
        let entity = app.world_mut().spawn((nav, facing, fsm)).id();

        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(Duration::from_millis(500));
        app.update();

        let transform = app.world().get::<Transform>(entity).unwrap();
        assert!((transform.translation.x - 1.0).abs() < 1e-4);
        assert!((*transform.forward() - Vec3::Z).length() < 1e-4);
    }
}
