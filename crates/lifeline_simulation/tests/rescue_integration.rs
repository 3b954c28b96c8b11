//! Rescue integration test
//!
//! Headless App с SimulationPlugin, сенсоры: вручную через PerceptionEvent.
//!
//! Проверяем:
//! - Escape при появлении врага, возврат в Idle после потери
//! - Revive до конца → help_count
//! - Carry меняет обоих агентов, release при падении carrier'а
//! - Death поглощает всё

use bevy::prelude::*;
use lifeline_simulation::*;

/// Tuning без случайных Idle → Walk (сценарии не должны зависеть от roll'ов)
fn calm_tuning() -> AgentTuning {
    AgentTuning {
        idle_walk_chance_per_mille: 0,
        idle_to_walk: 1000.0,
        ..default()
    }
}

/// Helper: App + первый update (delta 0, FixedUpdate ещё не тикает)
fn create_rescue_app() -> App {
    let mut app = create_headless_app(42);
    app.update();
    app
}

fn spawn(app: &mut App, name: &str, position: Vec3, tuning: AgentTuning) -> Entity {
    app.world_mut().spawn(agent_bundle(name, position, tuning)).id()
}

fn see(app: &mut App, observer: Entity, other: Entity) {
    app.world_mut().send_event(PerceptionEvent::Entered { observer, other });
}

fn state(app: &App, entity: Entity) -> AgentState {
    app.world().get::<AgentFsm>(entity).unwrap().state()
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

#[test]
fn test_hostile_triggers_escape_then_resume_idle() {
    let mut app = create_rescue_app();
    let tuning = AgentTuning {
        min_escape_time: 0.1,
        max_escape_time: 0.2,
        ..calm_tuning()
    };
    let agent = spawn(&mut app, "Nova", Vec3::ZERO, tuning);
    let hostile = app.world_mut().spawn(hostile_bundle(Vec3::new(3.0, 0.0, 0.0))).id();

    see(&mut app, agent, hostile);
    app.update();
    assert_eq!(state(&app, agent), AgentState::Escape);

    // Убегает от врага (враг по +X)
    run_ticks(&mut app, 30);
    let position = app.world().get::<Transform>(agent).unwrap().translation;
    assert!(position.x < 0.0, "agent did not flee: {:?}", position);

    app.world_mut().send_event(PerceptionEvent::Exited { observer: agent, other: hostile });
    app.update();
    assert!(app
        .world()
        .get::<ScheduledTasks>(agent)
        .unwrap()
        .is_pending(TaskPurpose::ResumeIdle));

    // 0.2с = 12 тиков, с запасом
    run_ticks(&mut app, 20);
    assert_eq!(state(&app, agent), AgentState::Idle);
}

#[test]
fn test_decoy_is_ignored() {
    let mut app = create_rescue_app();
    let agent = spawn(&mut app, "Nova", Vec3::ZERO, calm_tuning());
    let decoy = app
        .world_mut()
        .spawn((Humanoid::Decoy, Transform::from_xyz(1.0, 0.0, 0.0)))
        .id();

    see(&mut app, agent, decoy);
    app.update();

    let registry = app.world().get::<ThreatRegistry>(agent).unwrap();
    assert!(!registry.contains(decoy));
    assert_eq!(state(&app, agent), AgentState::Idle);
}

#[test]
fn test_revive_completes_and_counts_help() {
    let mut app = create_rescue_app();
    let tuning = AgentTuning {
        fall_to_rise: 0.5,
        ..calm_tuning()
    };
    let helper = spawn(&mut app, "Helper", Vec3::ZERO, tuning.clone());
    let ally = spawn(&mut app, "Ally", Vec3::new(1.0, 0.0, 0.0), tuning);

    see(&mut app, helper, ally);
    see(&mut app, ally, helper);
    app.world_mut().send_event(FallSignal { entity: ally });
    app.update();

    assert_eq!(state(&app, ally), AgentState::Raising);
    assert!(app.world().resource::<FallenRoster>().contains(ally));

    let mut last_progress = 0.0;
    for _ in 0..60 {
        app.update();
        let fsm = app.world().get::<AgentFsm>(ally).unwrap();
        if fsm.state() == AgentState::Idle {
            break;
        }
        assert!(fsm.rise_progress() >= last_progress);
        last_progress = fsm.rise_progress();
    }

    assert_eq!(state(&app, ally), AgentState::Idle);
    assert_eq!(app.world().get::<Agent>(helper).unwrap().help_count, 1);
    assert_eq!(app.world().get::<Agent>(ally).unwrap().help_count, 0);
    assert!(app.world().resource::<FallenRoster>().is_empty());
}

#[test]
fn test_interrupted_revive_reverts_to_fall() {
    let mut app = create_rescue_app();
    let tuning = AgentTuning {
        fall_to_rise: 2.0,
        ..calm_tuning()
    };
    let helper = spawn(&mut app, "Helper", Vec3::ZERO, tuning.clone());
    let ally = spawn(&mut app, "Ally", Vec3::new(1.0, 0.0, 0.0), tuning);

    see(&mut app, helper, ally);
    app.world_mut().send_event(FallSignal { entity: ally });
    run_ticks(&mut app, 10);
    assert_eq!(state(&app, ally), AgentState::Raising);

    // Helper сам падает: помощь прерывается
    app.world_mut().send_event(FallSignal { entity: helper });
    app.update();
    assert_eq!(state(&app, helper), AgentState::Fall);

    assert!(app.world().get::<AgentFsm>(ally).unwrap().rise_progress() > 0.0);
    // revive_timeout 0.5с = 30 тиков
    run_ticks(&mut app, 31);
    let fsm = app.world().get::<AgentFsm>(ally).unwrap();
    assert_eq!(fsm.state(), AgentState::Fall);
    // Новый Fall: revive с нуля, таймер смерти почти полный
    assert_eq!(fsm.rise_progress(), 0.0);
    let full = AgentTuning::default().fall_to_death;
    assert!(full - fsm.death_remaining < 0.1, "death_remaining = {}", fsm.death_remaining);
}

#[test]
fn test_carry_updates_both_agents() {
    let mut app = create_rescue_app();
    let helper = spawn(&mut app, "Helper", Vec3::ZERO, calm_tuning());
    let ally = spawn(&mut app, "Ally", Vec3::new(1.0, 0.0, 0.0), calm_tuning());
    let hostile = app.world_mut().spawn(hostile_bundle(Vec3::new(2.5, 0.0, 0.0))).id();

    see(&mut app, helper, ally);
    see(&mut app, helper, hostile);
    app.world_mut().send_event(FallSignal { entity: ally });
    app.update();

    assert_eq!(state(&app, helper), AgentState::Carry);
    assert_eq!(state(&app, ally), AgentState::Carried);
    assert_eq!(app.world().get::<CarryLink>(helper).unwrap().carrying, Some(ally));
    assert_eq!(app.world().get::<CarryLink>(ally).unwrap().carried_by, Some(helper));

    // Несомый едет на anchor carrier'а
    run_ticks(&mut app, 20);
    let carrier = *app.world().get::<Transform>(helper).unwrap();
    let carried = app.world().get::<Transform>(ally).unwrap().translation;
    let anchor = carrier.translation + carrier.rotation * AgentTuning::default().carry_anchor();
    assert!((carried - anchor).length() < 1e-4);

    // Fall signal для Carried игнорируется
    app.world_mut().send_event(FallSignal { entity: ally });
    app.update();
    assert_eq!(state(&app, ally), AgentState::Carried);

    // Carrier падает → ally опущен, обе связи сняты
    app.world_mut().send_event(FallSignal { entity: helper });
    app.update();
    assert_eq!(state(&app, helper), AgentState::Fall);
    assert_eq!(state(&app, ally), AgentState::Fall);
    assert_eq!(*app.world().get::<CarryLink>(helper).unwrap(), CarryLink::default());
    assert_eq!(*app.world().get::<CarryLink>(ally).unwrap(), CarryLink::default());
}

#[test]
fn test_carrier_releases_when_hostiles_gone() {
    let mut app = create_rescue_app();
    let helper = spawn(&mut app, "Helper", Vec3::ZERO, calm_tuning());
    let ally = spawn(&mut app, "Ally", Vec3::new(1.0, 0.0, 0.0), calm_tuning());
    let hostile = app.world_mut().spawn(hostile_bundle(Vec3::new(2.5, 0.0, 0.0))).id();

    see(&mut app, helper, ally);
    see(&mut app, helper, hostile);
    app.world_mut().send_event(FallSignal { entity: ally });
    app.update();
    assert_eq!(state(&app, helper), AgentState::Carry);

    app.world_mut().despawn(hostile);
    app.update();

    assert_eq!(state(&app, helper), AgentState::Idle);
    assert_eq!(state(&app, ally), AgentState::Fall);
    assert!(app.world().resource::<FallenRoster>().contains(ally));

    // Опущенный ally рядом, врагов нет → helper сразу поднимает
    app.update();
    assert_eq!(state(&app, ally), AgentState::Raising);
}

#[test]
fn test_death_is_absorbing() {
    let mut app = create_rescue_app();
    let tuning = AgentTuning {
        fall_to_death: 0.2,
        ..calm_tuning()
    };
    let agent = spawn(&mut app, "Nova", Vec3::ZERO, tuning);
    let hostile = app.world_mut().spawn(hostile_bundle(Vec3::new(3.0, 0.0, 0.0))).id();

    app.world_mut().send_event(FallSignal { entity: agent });
    run_ticks(&mut app, 20);
    assert_eq!(state(&app, agent), AgentState::Death);
    assert!(!app.world().resource::<FallenRoster>().contains(agent));

    run_ticks(&mut app, 2);
    let before = (
        world_snapshot::<AgentFsm>(app.world_mut()),
        world_snapshot::<Agent>(app.world_mut()),
        world_snapshot::<ScheduledTasks>(app.world_mut()),
        world_snapshot::<Transform>(app.world_mut()),
    );

    // Ничего из этого не должно иметь эффекта
    see(&mut app, agent, hostile);
    let world = app.world_mut();
    world.send_event(FallSignal { entity: agent });
    world.send_event(ReviveBoost { entity: agent, factor: 4 });
    world.send_event(TeleportRequest {
        entity: agent,
        position: Vec3::new(50.0, 0.0, 0.0),
    });
    world.send_event(LightCommand::Disable { entity: agent });
    run_ticks(&mut app, 60);

    let after = (
        world_snapshot::<AgentFsm>(app.world_mut()),
        world_snapshot::<Agent>(app.world_mut()),
        world_snapshot::<ScheduledTasks>(app.world_mut()),
        world_snapshot::<Transform>(app.world_mut()),
    );
    assert_eq!(before, after);
}

fn destination(app: &App, entity: Entity) -> Option<Vec3> {
    app.world().get::<NavAgent>(entity).unwrap().destination
}

#[test]
fn test_walk_picks_next_waypoint_on_arrival() {
    let mut app = create_rescue_app();
    let start = Vec3::new(0.0, 0.0, 0.0);
    let far = Vec3::new(12.0, 0.0, -4.0);
    app.world_mut()
        .insert_resource(PatrolWaypoints::new(vec![start, far]));

    let tuning = AgentTuning {
        idle_walk_chance_per_mille: 1000,
        ..calm_tuning()
    };
    let agent = spawn(&mut app, "Nova", start, tuning);

    app.update();
    assert_eq!(state(&app, agent), AgentState::Walk);

    // Первый waypoint под ногами: дошли → случайный следующий, рано или поздно дальний
    let mut picked_far = false;
    for _ in 0..30 {
        app.update();
        if destination(&app, agent) == Some(far) {
            picked_far = true;
            break;
        }
        assert_eq!(destination(&app, agent), Some(start));
    }
    assert!(picked_far, "agent never left the reached waypoint");

    // По дороге к дальнему waypoint цель не меняется
    run_ticks(&mut app, 10);
    assert_eq!(destination(&app, agent), Some(far));
    let position = app.world().get::<Transform>(agent).unwrap().translation;
    assert!(position.distance(far) < start.distance(far));
}

#[test]
fn test_escape_without_ground_falls_back_to_waypoint() {
    let mut app = create_rescue_app();
    app.world_mut()
        .insert_resource(GroundMap::new(ArenaGround::centered(5.0)));

    let agent = spawn(&mut app, "Nova", Vec3::ZERO, calm_tuning());
    let hostile = app.world_mut().spawn(hostile_bundle(Vec3::new(3.0, 0.0, 0.0))).id();

    see(&mut app, agent, hostile);
    run_ticks(&mut app, 2);
    assert_eq!(state(&app, agent), AgentState::Escape);

    // 25 единиц в любую сторону за краем арены 5x5 → patrol waypoint
    let target = destination(&app, agent).expect("escape must pick a destination");
    let waypoints = &app.world().resource::<PatrolWaypoints>().points;
    assert!(waypoints.contains(&target), "{:?} not in {:?}", target, waypoints);
}

#[test]
fn test_fallen_agent_crawls_to_standing_ally() {
    let mut app = create_rescue_app();
    let fallen = spawn(&mut app, "Fallen", Vec3::ZERO, calm_tuning());
    let ally_position = Vec3::new(6.0, 0.0, 0.0);
    let ally = spawn(&mut app, "Ally", ally_position, calm_tuning());

    see(&mut app, fallen, ally);
    app.world_mut().send_event(FallSignal { entity: fallen });
    app.update();

    assert_eq!(state(&app, fallen), AgentState::Fall);
    assert_eq!(destination(&app, fallen), Some(ally_position));

    run_ticks(&mut app, 30);
    let position = app.world().get::<Transform>(fallen).unwrap().translation;
    assert!(position.x > 0.5, "fallen agent did not crawl: {:?}", position);
}

#[test]
fn test_fallen_agent_without_allies_patrols() {
    let mut app = create_rescue_app();
    let waypoint = Vec3::new(-8.0, 0.0, 3.0);
    app.world_mut()
        .insert_resource(PatrolWaypoints::new(vec![waypoint]));
    let fallen = spawn(&mut app, "Fallen", Vec3::ZERO, calm_tuning());

    app.world_mut().send_event(FallSignal { entity: fallen });
    app.update();

    assert_eq!(state(&app, fallen), AgentState::Fall);
    assert_eq!(destination(&app, fallen), Some(waypoint));
}
