//! Tick-by-tick integration tests: movement playback, idle loops, atlas
//! loading and eviction, and path constraint against the occupancy index.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy_ecs::prelude::*;

use sheetwalk::components::animation::{
    AnimationMode, AnimationState, SheetAtlas, SpriteFrame, SpriteSheet,
};
use sheetwalk::components::direction::Direction;
use sheetwalk::components::mapposition::MapPosition;
use sheetwalk::components::occupant::{Disposition, Occupant};
use sheetwalk::components::rotation::Rotation;
use sheetwalk::components::tween::{IdleAnimation, MoveAnimation};
use sheetwalk::components::zindex::ZIndex;
use sheetwalk::events::atlas::AtlasEvicted;
use sheetwalk::events::movement::MoveRequested;
use sheetwalk::pathing::{ConstrainOptions, Waypoint, constrain_path, find_movement_path};
use sheetwalk::resources::animationconfig::AnimationConfig;
use sheetwalk::resources::atlascache::AtlasCache;
use sheetwalk::resources::gridgeometry::GridGeometry;
use sheetwalk::resources::occupancy::OccupancyMap;
use sheetwalk::resources::texturestore::{
    TextureHandle, TextureLoader, TextureStore, setup_texture_loader, shutdown_texture_loader,
};
use sheetwalk::runtime::{build_schedule, build_world, tick};

const EPSILON: f32 = 1e-3;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_world(config: AnimationConfig) -> (World, Schedule) {
    let mut world = build_world(config, GridGeometry::default());
    world
        .resource_mut::<TextureStore>()
        .insert(TextureHandle::new("hero.png", 128, 128));
    (world, build_schedule())
}

fn spawn_hero(world: &mut World) -> Entity {
    world
        .spawn((
            MapPosition::new(0.0, 0.0),
            AnimationState::new(Direction::Down),
            SpriteSheet::new("hero.png", "dlru", 4),
            Rotation::default(),
            ZIndex::default(),
        ))
        .id()
}

fn request(world: &mut World, event: MoveRequested) {
    world.trigger(event);
    world.flush();
}

fn state(world: &World, e: Entity) -> AnimationState {
    *world.get::<AnimationState>(e).unwrap()
}

#[test]
fn walking_move_cycles_frames_then_rests() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);
    assert_eq!(world.get::<SpriteFrame>(hero).unwrap().animation, "down");

    // two cells at walk speed 4 take half a second
    request(&mut world, MoveRequested::to(hero, 200.0, 0.0));
    assert_eq!(world.get::<Rotation>(hero).unwrap().degrees, 270.0);

    tick(&mut world, &mut schedule, 0.125);
    assert!(approx_eq(world.get::<MapPosition>(hero).unwrap().x, 50.0));
    let s = state(&world, hero);
    assert_eq!(s.mode(), AnimationMode::Walk);
    assert_eq!(s.direction, Direction::Right);
    assert_eq!(s.frame_index, 1);
    let frame = world.get::<SpriteFrame>(hero).unwrap().clone();
    let atlas = world.get::<SheetAtlas>(hero).unwrap().atlas.clone();
    assert_eq!(frame.animation, "right");
    assert_eq!(frame.frame_id, atlas.sequence("right").unwrap()[1]);

    tick(&mut world, &mut schedule, 0.5);
    assert!(approx_eq(world.get::<MapPosition>(hero).unwrap().x, 200.0));
    assert!(world.get::<MoveAnimation>(hero).is_none());
    let s = state(&world, hero);
    assert!(s.idle);
    assert_eq!(s.frame_index, 0);
    assert_eq!(s.direction, Direction::Right);
}

#[test]
fn entity_without_rotation_faces_its_movement() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = world
        .spawn((
            MapPosition::new(0.0, 0.0),
            AnimationState::new(Direction::Down),
            SpriteSheet::new("hero.png", "dlru", 4),
        ))
        .id();
    tick(&mut world, &mut schedule, 0.0);

    request(&mut world, MoveRequested::to(hero, 200.0, 0.0));
    tick(&mut world, &mut schedule, 0.125);
    let s = state(&world, hero);
    assert!(!s.idle);
    assert_eq!(s.direction, Direction::Right);
    assert_eq!(s.frame_index, 1);
    assert_eq!(world.get::<SpriteFrame>(hero).unwrap().animation, "right");

    tick(&mut world, &mut schedule, 0.5);
    let s = state(&world, hero);
    assert!(s.idle);
    assert_eq!(s.direction, Direction::Right);

    request(&mut world, MoveRequested::teleport(hero, 0.0, 300.0));
    tick(&mut world, &mut schedule, 0.0);
    assert_eq!(state(&world, hero).direction, Direction::Right);
}

#[test]
fn long_move_runs() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);

    request(&mut world, MoveRequested::to(hero, 0.0, 600.0));
    let mv = world.get::<MoveAnimation>(hero).unwrap();
    assert!(approx_eq(mv.current.duration, 0.75));

    tick(&mut world, &mut schedule, 0.25);
    let s = state(&world, hero);
    assert_eq!(s.mode(), AnimationMode::Run);
    assert_eq!(s.direction, Direction::Down);
    assert_eq!(*world.get::<ZIndex>(hero).unwrap(), ZIndex(6));
    // no run art on this sheet
    assert_eq!(world.get::<SpriteFrame>(hero).unwrap().animation, "down");
}

#[test]
fn speed_multiplier_scales_duration() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);
    request(
        &mut world,
        MoveRequested::to(hero, 200.0, 0.0).with_speed_multiplier(2.0),
    );
    let mv = world.get::<MoveAnimation>(hero).unwrap();
    assert!(approx_eq(mv.current.duration, 0.25));
}

#[test]
fn movement_preempts_idle_loop_only() {
    let mut config = AnimationConfig::default();
    config.play_idle_animations = true;
    let (mut world, mut schedule) = make_world(config);
    let hero = spawn_hero(&mut world);

    tick(&mut world, &mut schedule, 0.0);
    assert_eq!(world.get::<IdleAnimation>(hero).unwrap().frames, 4);

    tick(&mut world, &mut schedule, 0.9);
    let s = state(&world, hero);
    assert!(s.idle);
    assert_eq!(s.frame_index, 1);

    request(&mut world, MoveRequested::to(hero, 100.0, 0.0));
    assert!(world.get::<IdleAnimation>(hero).is_none());
    assert!(!state(&world, hero).idle);

    // a second request keeps the positional animation and queues behind it
    request(&mut world, MoveRequested::to(hero, 100.0, 100.0));
    let mv = world.get::<MoveAnimation>(hero).unwrap();
    assert_eq!(mv.queued.len(), 1);
    assert_eq!(mv.current.to_x, 100.0);

    // both legs finish, then the idle loop comes back
    for _ in 0..4 {
        tick(&mut world, &mut schedule, 0.125);
    }
    assert!(world.get::<MoveAnimation>(hero).is_none());
    assert!(world.get::<IdleAnimation>(hero).is_some());
}

#[test]
fn chained_legs_turn_and_sort_at_each_start() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);

    request(&mut world, MoveRequested::to(hero, 100.0, 0.0));
    request(&mut world, MoveRequested::to(hero, 100.0, 100.0));

    tick(&mut world, &mut schedule, 0.25);
    let pos = *world.get::<MapPosition>(hero).unwrap();
    assert!(approx_eq(pos.x, 100.0) && approx_eq(pos.y, 0.0));
    assert_eq!(world.get::<Rotation>(hero).unwrap().degrees, 0.0);
    assert_eq!(*world.get::<ZIndex>(hero).unwrap(), ZIndex(1));
    assert!(!state(&world, hero).idle);

    tick(&mut world, &mut schedule, 0.125);
    assert!(approx_eq(world.get::<MapPosition>(hero).unwrap().y, 50.0));
    let s = state(&world, hero);
    assert_eq!(s.direction, Direction::Down);
    assert_eq!(s.frame_index, 1);

    tick(&mut world, &mut schedule, 0.125);
    assert!(world.get::<MoveAnimation>(hero).is_none());
    assert!(state(&world, hero).idle);
}

#[test]
fn teleport_cancels_movement() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);

    request(&mut world, MoveRequested::to(hero, 400.0, 0.0));
    tick(&mut world, &mut schedule, 0.1);
    request(&mut world, MoveRequested::teleport(hero, 0.0, 300.0));
    tick(&mut world, &mut schedule, 0.1);

    let pos = *world.get::<MapPosition>(hero).unwrap();
    assert_eq!((pos.x, pos.y), (0.0, 300.0));
    assert_eq!(*world.get::<ZIndex>(hero).unwrap(), ZIndex(3));
    let s = state(&world, hero);
    assert!(s.idle);
    assert_eq!(s.frame_index, 0);
    assert_eq!(s.direction, Direction::Right);
}

struct CountingLoader {
    loads: Arc<AtomicUsize>,
}

impl TextureLoader for CountingLoader {
    fn load_texture(&mut self, source: &str) -> Option<TextureHandle> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if source == "missing.png" {
            return None;
        }
        Some(TextureHandle::new(source, 128, 128))
    }
}

fn tick_until(world: &mut World, schedule: &mut Schedule, done: impl Fn(&World) -> bool) -> bool {
    for _ in 0..500 {
        tick(world, schedule, 0.0);
        if done(world) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn pending_atlas_is_shared_by_all_requesters() {
    let mut world = build_world(AnimationConfig::default(), GridGeometry::default());
    let mut schedule = build_schedule();
    let loads = Arc::new(AtomicUsize::new(0));
    setup_texture_loader(
        &mut world,
        CountingLoader {
            loads: loads.clone(),
        },
    );
    let a = world
        .spawn((
            AnimationState::new(Direction::Down),
            SpriteSheet::new("npc.png", "eight", 4),
        ))
        .id();
    let b = world
        .spawn((
            AnimationState::new(Direction::Left),
            SpriteSheet::new("npc.png", "eight", 4),
        ))
        .id();

    tick(&mut world, &mut schedule, 0.0);
    let key = SpriteSheet::new("npc.png", "eight", 4).key();
    assert!(world.resource::<AtlasCache>().is_pending(&key));
    assert!(world.get::<SheetAtlas>(a).is_none());

    let attached = tick_until(&mut world, &mut schedule, |w| {
        w.get::<SheetAtlas>(a).is_some() && w.get::<SheetAtlas>(b).is_some()
    });
    assert!(attached);
    let atlas_a = world.get::<SheetAtlas>(a).unwrap().atlas.clone();
    let atlas_b = world.get::<SheetAtlas>(b).unwrap().atlas.clone();
    assert!(Arc::ptr_eq(&atlas_a, &atlas_b));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(world.resource::<AtlasCache>().owners(&key).len(), 2);
    assert_eq!(world.get::<SpriteFrame>(b).unwrap().animation, "left");

    shutdown_texture_loader(&mut world);
}

#[test]
fn failed_load_shows_placeholder() {
    let mut world = build_world(AnimationConfig::default(), GridGeometry::default());
    let mut schedule = build_schedule();
    setup_texture_loader(
        &mut world,
        CountingLoader {
            loads: Arc::new(AtomicUsize::new(0)),
        },
    );
    let e = world
        .spawn((
            AnimationState::new(Direction::Up),
            SpriteSheet::new("missing.png", "dlru", 4),
        ))
        .id();

    let attached = tick_until(&mut world, &mut schedule, |w| w.get::<SpriteFrame>(e).is_some());
    assert!(attached);
    let atlas = world.get::<SheetAtlas>(e).unwrap().atlas.clone();
    assert_eq!(atlas.frames().len(), 1);
    assert_eq!(world.get::<SpriteFrame>(e).unwrap().animation, "up");

    shutdown_texture_loader(&mut world);
}

#[test]
fn unloaded_texture_evicts_and_owner_refreshes() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let evictions = Arc::new(Mutex::new(Vec::new()));
    let seen = evictions.clone();
    world.add_observer(move |trigger: On<AtlasEvicted>| {
        seen.lock().unwrap().push(trigger.event().owners.clone());
    });
    world.flush();

    let hero = spawn_hero(&mut world);
    tick(&mut world, &mut schedule, 0.0);
    let old = world.get::<SheetAtlas>(hero).unwrap().clone();

    assert!(world.resource_mut::<TextureStore>().unload("hero.png"));
    tick(&mut world, &mut schedule, 0.0);
    assert_eq!(*evictions.lock().unwrap(), vec![vec![hero]]);
    let flagged = world.get::<SheetAtlas>(hero).unwrap();
    assert!(flagged.stale);
    // the old atlas keeps serving frames until a texture is back
    assert!(Arc::ptr_eq(&flagged.atlas, &old.atlas));
    assert!(world.get::<SpriteFrame>(hero).is_some());

    let fresh = TextureHandle::new("hero.png", 128, 128);
    let fresh_id = fresh.id();
    world.resource_mut::<TextureStore>().insert(fresh);
    tick(&mut world, &mut schedule, 0.0);
    let refreshed = world.get::<SheetAtlas>(hero).unwrap();
    assert!(!refreshed.stale);
    assert_eq!(refreshed.texture_id, fresh_id);
    assert!(!Arc::ptr_eq(&refreshed.atlas, &old.atlas));
    assert_eq!(world.get::<SpriteFrame>(hero).unwrap().texture_id, fresh_id);

    let key = old.key().clone();
    world.despawn(hero);
    tick(&mut world, &mut schedule, 0.0);
    assert!(world.resource::<AtlasCache>().owners(&key).is_empty());
}

#[test]
fn occupants_constrain_requested_path() {
    let (mut world, mut schedule) = make_world(AnimationConfig::default());
    let hero = spawn_hero(&mut world);
    world
        .entity_mut(hero)
        .insert(Occupant::new(Disposition::Friendly));
    world.spawn((
        MapPosition::new(300.0, 0.0),
        Occupant::new(Disposition::Hostile),
    ));
    world.spawn((
        MapPosition::new(0.0, 200.0),
        Occupant::new(Disposition::Friendly),
    ));
    tick(&mut world, &mut schedule, 0.0);

    let grid = *world.resource::<GridGeometry>();
    let solve = |world: &World, to: (f32, f32)| {
        let map = world.resource::<OccupancyMap>();
        let config = world.resource::<AnimationConfig>();
        let host = map.view(hero, Some(Occupant::new(Disposition::Friendly)), grid, config);
        let requested = [Waypoint::new(0.0, 0.0), Waypoint::new(to.0, to.1)];
        let filtered = find_movement_path(&host, &requested);
        constrain_path(&host, &filtered, &ConstrainOptions::default())
    };

    let (path, constrained) = solve(&world, (500.0, 0.0));
    assert!(constrained);
    assert_eq!(path.last().map(|w| (w.x, w.y)), Some((200.0, 0.0)));

    // allies do not block by default
    let (path, constrained) = solve(&world, (0.0, 400.0));
    assert!(!constrained);
    assert_eq!(path.last().map(|w| (w.x, w.y)), Some((0.0, 400.0)));

    let (path, _) = solve(&world, (500.0, 0.0));
    for waypoint in path.iter().skip(1) {
        request(&mut world, MoveRequested::to(hero, waypoint.x, waypoint.y));
    }
    for _ in 0..10 {
        tick(&mut world, &mut schedule, 0.1);
    }
    let pos = *world.get::<MapPosition>(hero).unwrap();
    assert_eq!((pos.x, pos.y), (200.0, 0.0));
}
