//! Lifeline Simulation Core
//!
//! ECS-симуляция на Bevy 0.16: автономные агенты убегают от врагов,
//! поднимают и выносят упавших союзников.
//!
//! Движок-агностично: навигация, сенсоры и земля приходят через
//! MovementActuator / PerceptionEvent / GroundProbe. В headless режиме
//! их заменяют NavAgent, ProximitySensorPlugin и FlatGround.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod components;
pub mod config;
pub mod logger;
pub mod navigation;
pub mod perception;

// Re-export базовых типов для удобства
pub use ai::{
    AIPlugin, AgentCue, AgentFell, AgentFsm, AgentRevived, AgentState, CarryLink, FallSignal,
    LightCommand, PerceptionEvent, ReviveBoost, ScheduledTasks, StateChanged, TaskPurpose,
    TeleportRequest, ThreatRegistry, VisualCue,
};
pub use components::*;
pub use config::{ConfigError, SimulationConfig};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogPrinter,
};
pub use perception::{ProximitySensor, ProximitySensorPlugin, SensorTracking};

/// Главный plugin симуляции (ресурсы мира + AI)
#[derive(Default)]
pub struct SimulationPlugin {
    pub config: SimulationConfig,
}

impl SimulationPlugin {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;
        set_log_level(config.log_level);

        app
            // Fixed timestep для simulation tick
            .insert_resource(Time::<Fixed>::from_duration(config.tick_period()))
            // Детерминистичный RNG (seed из конфига)
            .insert_resource(DeterministicRng::new(config.seed))
            .insert_resource(PatrolWaypoints::new(config.waypoint_positions()))
            .insert_resource(DefaultTuning(config.tuning.clone()))
            // GroundMap мог поставить host до plugin'а
            .init_resource::<GroundMap>()
            .init_resource::<FallenRoster>()
            .register_type::<Agent>()
            .register_type::<AgentTuning>()
            .register_type::<Humanoid>()
            .register_type::<NavAgent>()
            .add_plugins(AIPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Каждый `app.update()` (кроме первого) = ровно один FixedUpdate тик.
pub fn create_headless_app(seed: u64) -> App {
    create_headless_app_with(SimulationConfig {
        seed,
        ..default()
    })
}

pub fn create_headless_app_with(config: SimulationConfig) -> App {
    let mut app = App::new();
    init_logger();

    let tick = config.tick_period();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(tick))
        .add_plugins(SimulationPlugin::new(config));

    app
}

/// Все компоненты агента (без сенсора)
pub fn agent_bundle(name: impl Into<String>, position: Vec3, tuning: AgentTuning) -> impl Bundle {
    (
        Agent::new(name),
        Humanoid::Agent,
        AgentFsm::new(&tuning),
        ThreatRegistry::default(),
        CarryLink::default(),
        ScheduledTasks::default(),
        NavAgent::new(tuning.stopping_distance),
        Transform::from_translation(position),
        tuning,
    )
}

/// Враг: только тег + позиция (поведение врагов снаружи)
pub fn hostile_bundle(position: Vec3) -> impl Bundle {
    (Humanoid::Hostile, Transform::from_translation(position))
}

/// Заспавнить агента с DefaultTuning и случайным именем
pub fn spawn_agent(world: &mut World, position: Vec3) -> Entity {
    let tuning = world
        .get_resource::<DefaultTuning>()
        .map(|tuning| tuning.0.clone())
        .unwrap_or_default();
    let name = world
        .get_resource_mut::<DeterministicRng>()
        .map(|mut rng| random_name(&mut rng.rng))
        .unwrap_or_else(|| "Agent".to_string());

    let entity = world.spawn(agent_bundle(name.clone(), position, tuning)).id();
    log(&format!("spawn {} ({:?}) at {:?}", name, entity, position));
    entity
}

/// Snapshot мира для сравнения детерминизма
/// (упрощённая версия, полная в bevy_save будет позже)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
