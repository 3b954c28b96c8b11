//! Headless симуляция Lifeline
//!
//! Агенты патрулируют арену, враги ходят по кругу и сбивают тех, кого догнали.
//! Первый аргумент: путь к JSON конфигу (опционально).

use bevy::prelude::*;
use lifeline_simulation::{
    create_headless_app_with, hostile_bundle, log_error, log_info, spawn_agent, Agent, AgentFsm,
    AgentState, AgentTuning, FallSignal, ProximitySensor, ProximitySensorPlugin,
    SimulationConfig,
};

/// Враг ходит по окружности вокруг центра арены
#[derive(Component)]
struct Orbit {
    radius: f32,
    angular_speed: f32,
    phase: f32,
}

/// Враг ближе этого к стоящему агенту → агент падает
const KNOCK_DOWN_DISTANCE: f32 = 1.0;

fn move_hostiles(time: Res<Time<Fixed>>, mut hostiles: Query<(&mut Orbit, &mut Transform)>) {
    for (mut orbit, mut transform) in hostiles.iter_mut() {
        orbit.phase += orbit.angular_speed * time.delta_secs();
        transform.translation = Vec3::new(orbit.phase.cos(), 0.0, orbit.phase.sin()) * orbit.radius;
    }
}

fn knock_down_agents(
    hostiles: Query<&Transform, With<Orbit>>,
    agents: Query<(Entity, &Transform, &AgentFsm)>,
    mut signals: EventWriter<FallSignal>,
) {
    for (entity, transform, fsm) in agents.iter() {
        if fsm.state().is_incapacitated() {
            continue;
        }
        let caught = hostiles
            .iter()
            .any(|hostile| hostile.translation.distance(transform.translation) < KNOCK_DOWN_DISTANCE);
        if caught {
            signals.write(FallSignal { entity });
        }
    }
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match SimulationConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                lifeline_simulation::init_logger();
                log_error(&format!("config {}: {}", path, err));
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };

    let mut app = create_headless_app_with(config.clone());
    app.add_plugins(ProximitySensorPlugin)
        .add_systems(
            FixedUpdate,
            (move_hostiles, knock_down_agents)
                .chain()
                .before(lifeline_simulation::perception::poll_proximity_sensors),
        );

    log_info(&format!("Starting Lifeline headless simulation (seed: {})", config.seed));

    let waypoints = config.waypoint_positions();
    for i in 0..config.agent_count {
        let position = waypoints
            .get(i % waypoints.len().max(1))
            .copied()
            .unwrap_or(Vec3::ZERO);
        let entity = spawn_agent(app.world_mut(), position);
        app.world_mut()
            .entity_mut(entity)
            .insert(ProximitySensor { radius: config.sensor_radius });
    }

    for i in 0..config.hostile_count {
        let phase = i as f32 * std::f32::consts::TAU / config.hostile_count as f32;
        app.world_mut().spawn((
            hostile_bundle(Vec3::ZERO),
            Orbit {
                radius: 10.0,
                angular_speed: 0.4,
                phase,
            },
        ));
    }

    for tick in 0..config.ticks {
        app.update();

        if tick % 600 == 0 {
            let mut query = app.world_mut().query::<&AgentFsm>();
            let fallen = query.iter(app.world()).filter(|fsm| fsm.state().is_fallen()).count();
            let dead = query.iter(app.world()).filter(|fsm| fsm.state() == AgentState::Death).count();
            log_info(&format!("Tick {}: {} fallen, {} dead", tick, fallen, dead));
        }
    }

    let mut query = app
        .world_mut()
        .query_filtered::<(&Agent, &AgentTuning), With<AgentFsm>>();
    let stats: Vec<_> = query
        .iter(app.world())
        .map(|(agent, tuning)| agent.stats(tuning))
        .collect();

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{}", json),
        Err(err) => log_error(&format!("stats: {}", err)),
    }
}
