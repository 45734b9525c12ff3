//! Integration tests for the full step loop.
//!
//! These tests drive `Simulation::step` with button sets and check the
//! resulting state and events end-to-end:
//! - Movement against walls and the jump hold cap
//! - Tile bumps, payload release, brick breaking, multi-coin blocks
//! - Power-ups, damage and death
//! - Stomps, shells and combo scoring
//! - Pipes and swimming

use glam::{IVec2, Vec2};
use tilegrid::{ContainedItem, TileMaterial};

use crate::animation::Pose;
use crate::config::{Character, SimConfig};
use crate::enemy::{self, EnemyKind, EnemyState, ShellMotion};
use crate::entity::{Entity, EntityId, EntityTag};
use crate::input::Buttons;
use crate::item::ItemKind;
use crate::output::{GameEvent, ShotCause};
use crate::pipe::PipeDirection;
use crate::power::{PowerState, PowerTier};
use crate::simulation::Simulation;

use super::helpers::{
    count_events, drain_events, hero, hero_id, play, run, run_until, CourseBuilder, FLOOR_Y,
};

// =============================================================================
// Setup Helpers
// =============================================================================

/// Make player 0 big (or fire) without going through a pickup.
fn empower(sim: &mut Simulation, tier: PowerTier) {
    let id = hero_id(sim);
    let tiles = sim.tiles().clone();
    let p = sim
        .level_mut()
        .get_mut(id)
        .and_then(Entity::as_player_mut)
        .expect("player exists");
    p.power = PowerState::new(tier);
    p.refit_hitbox(&tiles);
}

/// Move player 0 so its bottom-left corner is at `feet`.
fn place_hero(sim: &mut Simulation, feet: Vec2, velocity: Vec2, on_ground: bool) {
    let id = hero_id(sim);
    let body = sim
        .level_mut()
        .get_mut(id)
        .map(Entity::body_mut)
        .expect("player exists");
    let size = body.bounds.size;
    body.bounds.min = Vec2::new(feet.x, feet.y - size.y);
    body.velocity = velocity;
    body.on_ground = on_ground;
}

fn first_of(sim: &Simulation, tag: EntityTag) -> EntityId {
    sim.level()
        .live_of(tag)
        .next()
        .map(Entity::id)
        .expect("entity of tag exists")
}

// =============================================================================
// Movement
// =============================================================================

#[test]
fn run_into_wall_stops_flush_against_it() {
    let mut sim = CourseBuilder::flat(30)
        .solid(10, 12, TileMaterial::Hard)
        .solid(10, 11, TileMaterial::Hard)
        .sim();
    run(&mut sim, Buttons::empty(), 5);

    let reached = run_until(&mut sim, Buttons::RIGHT | Buttons::RUN, 200, |s| {
        hero(s).body.bounds.right() >= 160.0
    });
    assert!(reached.is_some());
    run(&mut sim, Buttons::RIGHT | Buttons::RUN, 3);

    let p = hero(&sim);
    assert_eq!(p.body.bounds.right(), 160.0);
    assert_eq!(p.body.velocity.x, 0.0);
    assert_eq!(p.body.bounds.bottom(), FLOOR_Y);
    assert!(p.body.on_ground);
}

#[test]
fn jump_drive_stops_at_the_hold_cap() {
    let mut sim = CourseBuilder::flat(20).sim();
    run(&mut sim, Buttons::empty(), 5);
    let config = sim.config().clone();
    let gravity = config.physics.gravity;
    let cap = config.physics.jump_hold_frames as usize;

    let mut speeds = Vec::new();
    for _ in 0..cap + 10 {
        sim.step(&[Buttons::JUMP]);
        speeds.push(hero(&sim).body.velocity.y);
        assert!(hero(&sim).body.timers.jump_hold <= config.physics.jump_hold_frames);
    }

    // Frames 1..cap are driven to the same speed
    for pair in speeds[1..cap].windows(2) {
        assert!((pair[0] - pair[1]).abs() < 1e-5);
    }
    // From the cap on, only gravity acts even though jump is still held
    for pair in speeds[cap - 1..].windows(2) {
        assert!((pair[1] - pair[0] - gravity).abs() < 1e-5, "{speeds:?}");
    }
}

#[test]
fn releasing_jump_cuts_the_jump_short() {
    let mut held = CourseBuilder::flat(20).sim();
    let mut tapped = CourseBuilder::flat(20).sim();
    run(&mut held, Buttons::empty(), 5);
    run(&mut tapped, Buttons::empty(), 5);

    let mut peak_held = f32::MAX;
    let mut peak_tapped = f32::MAX;
    for frame in 0..40 {
        held.step(&[Buttons::JUMP]);
        tapped.step(&[if frame < 2 { Buttons::JUMP } else { Buttons::empty() }]);
        peak_held = peak_held.min(hero(&held).body.bounds.top());
        peak_tapped = peak_tapped.min(hero(&tapped).body.bounds.top());
    }
    assert!(peak_held < peak_tapped);
}

#[test]
fn sustained_run_charges_pspeed() {
    let mut sim = CourseBuilder::flat(200).sim();
    run(&mut sim, Buttons::RIGHT | Buttons::RUN, 150);
    let p = hero(&sim);
    let physics = &sim.config().physics;
    assert_eq!(p.body.timers.run, physics.max_run_timer);
    assert!(p.body.velocity.x > physics.run_speed);
}

// =============================================================================
// Tiles
// =============================================================================

#[test]
fn bonked_item_block_releases_item_at_apex() {
    let mut sim = CourseBuilder::flat(20)
        .block(2, 9, TileMaterial::Question, Some(ContainedItem::Mushroom))
        .sim();
    run(&mut sim, Buttons::empty(), 5);
    let tile = sim.tiles().at(IVec2::new(2, 9)).expect("block exists");

    let bumped_after = run_until(&mut sim, Buttons::JUMP, 60, |s| {
        s.tiles().get(tile).is_some_and(tilegrid::Tile::is_bouncing)
    })
    .expect("block is bumped");
    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::TileBumped { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::ItemSpawned { .. })),
        0
    );

    let spawned_after = run_until(&mut sim, Buttons::JUMP, 30, |s| {
        s.level().live_of(EntityTag::Item).next().is_some()
    })
    .expect("item spawns");
    assert!(spawned_after > 0, "bumped after {bumped_after} frames");

    let item = sim.level().live_of(EntityTag::Item).next().and_then(Entity::as_item).unwrap();
    assert_eq!(item.kind, ItemKind::Mushroom);
    assert_eq!(item.body.bounds.bottom(), 144.0);
    assert_eq!(item.body.bounds.left(), 32.0);
    assert!(!item.collectible());
    assert!(sim.tiles().get(tile).unwrap().is_hit());
}

#[test]
fn small_player_only_bounces_bricks() {
    let mut sim = CourseBuilder::flat(20).solid(2, 9, TileMaterial::Brick).sim();
    play(&mut sim, &[(Buttons::empty(), 5), (Buttons::JUMP, 30)]);
    let tile = sim.tiles().at(IVec2::new(2, 9)).unwrap();
    assert!(!sim.tiles().get(tile).unwrap().is_broken());
    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::TileBumped { .. })),
        1
    );
}

#[test]
fn bonking_a_hard_block_still_reports_the_hit() {
    let mut sim = CourseBuilder::flat(20).solid(2, 9, TileMaterial::Hard).sim();
    play(&mut sim, &[(Buttons::empty(), 5), (Buttons::JUMP, 30)]);
    let tile = sim.tiles().at(IVec2::new(2, 9)).unwrap();
    assert!(!sim.tiles().get(tile).unwrap().is_bouncing());

    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::TileBonked { tile: t, .. } if *t == tile)),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::TileBumped { .. })),
        0
    );
}

#[test]
fn big_player_breaks_bricks_into_debris() {
    let mut sim = CourseBuilder::flat(20).solid(2, 8, TileMaterial::Brick).sim();
    empower(&mut sim, PowerTier::Big);
    run(&mut sim, Buttons::empty(), 5);
    let tile = sim.tiles().at(IVec2::new(2, 8)).unwrap();
    let active = sim.tiles().active_len();

    let broke = run_until(&mut sim, Buttons::JUMP, 60, |s| {
        s.tiles().get(tile).is_some_and(tilegrid::Tile::is_broken)
    });
    assert!(broke.is_some());
    sim.step(&[Buttons::JUMP]);
    assert_eq!(sim.level().live_of(EntityTag::Particle).count(), 4);
    assert_eq!(sim.tiles().active_len(), active - 1);

    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::TileBroken { .. })),
        1
    );

    // Debris expires and the tile stays broken
    run(&mut sim, Buttons::empty(), 120);
    assert_eq!(sim.level().live_of(EntityTag::Particle).count(), 0);
    assert!(sim.tiles().get(tile).unwrap().is_broken());
}

#[test]
fn multi_coin_block_pays_out_until_spent() {
    let mut sim = CourseBuilder::flat(20)
        .coin_block(2, 9, TileMaterial::Brick, 3)
        .sim();
    run(&mut sim, Buttons::empty(), 5);
    for _ in 0..5 {
        play(&mut sim, &[(Buttons::JUMP, 30), (Buttons::empty(), 15)]);
    }

    let p = hero(&sim);
    assert_eq!(p.coins, 3);
    assert_eq!(p.score, 3 * u64::from(sim.config().scoring.coin));
    let tile = sim.tiles().at(IVec2::new(2, 9)).unwrap();
    assert!(sim.tiles().get(tile).unwrap().is_hit());
}

#[test]
fn enemy_on_bumped_tile_is_knocked_off() {
    let mut sim = CourseBuilder::flat(20)
        .solid(1, 9, TileMaterial::Ground)
        .solid(2, 9, TileMaterial::Brick)
        .solid(3, 9, TileMaterial::Ground)
        .enemy(2, 8, EnemyKind::Goomba)
        .sim();
    run(&mut sim, Buttons::empty(), 5);
    let goomba = first_of(&sim, EntityTag::Enemy);

    run(&mut sim, Buttons::JUMP, 30);
    let events = drain_events(&sim);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyShot {
            enemy,
            cause: ShotCause::Bump { .. }
        } if *enemy == goomba
    )));
}

// =============================================================================
// Power
// =============================================================================

#[test]
fn mushroom_grows_player_after_the_flicker_queue() {
    let mut sim = CourseBuilder::flat(40).item(5, 12, ItemKind::Mushroom).sim();
    let collected = run_until(&mut sim, Buttons::RIGHT, 200, |s| {
        hero(s).power.is_transforming()
    });
    assert!(collected.is_some());
    assert!(hero(&sim).power.freezes_input());
    assert_eq!(hero(&sim).power.tier(), PowerTier::Small);

    run(&mut sim, Buttons::empty(), 40);
    let p = hero(&sim);
    assert_eq!(p.power.tier(), PowerTier::Big);
    assert_eq!(p.body.bounds.height(), 32.0);
    assert_eq!(p.body.bounds.bottom(), FLOOR_Y);

    let events = drain_events(&sim);
    assert!(events.contains(&GameEvent::PowerChanged {
        player: hero_id(&sim),
        from: PowerTier::Small,
        to: PowerTier::Big,
    }));
    assert!(events.contains(&GameEvent::ScoreAwarded {
        player: hero_id(&sim),
        points: sim.config().scoring.power_up,
    }));
}

fn overlapped_tiles(sim: &Simulation) -> Vec<IVec2> {
    let bounds = hero(sim).body.bounds;
    sim.tiles()
        .iter()
        .filter(|(_, tile)| !tile.is_broken() && tile.bounds().intersects(&bounds))
        .map(|(_, tile)| tile.cell())
        .collect()
}

#[test]
fn growing_in_a_low_tunnel_keeps_player_crouched() {
    // One tile of headroom from column 0 to 15
    let mut course = CourseBuilder::flat(40).item(5, 12, ItemKind::Mushroom);
    for x in 0..16 {
        course = course.solid(x, 11, TileMaterial::Hard);
    }
    let mut sim = course.sim();
    let collected = run_until(&mut sim, Buttons::RIGHT, 200, |s| {
        hero(s).power.is_transforming()
    });
    assert!(collected.is_some());
    run(&mut sim, Buttons::empty(), 60);

    let p = hero(&sim);
    assert_eq!(p.power.tier(), PowerTier::Big);
    assert!(p.motion.crouching);
    assert_eq!(p.frame.pose, Pose::Crouch);
    assert_eq!(p.body.bounds.height(), 16.0);
    assert_eq!(p.body.bounds.bottom(), FLOOR_Y);
    assert!(overlapped_tiles(&sim).is_empty());

    // The ceiling still holds
    run(&mut sim, Buttons::JUMP, 20);
    assert!(hero(&sim).body.bounds.top() >= 192.0);
    assert!(overlapped_tiles(&sim).is_empty());

    // Stands up once clear of the tunnel
    let cleared = run_until(&mut sim, Buttons::RIGHT, 400, |s| {
        hero(s).body.bounds.left() > 16.0 * 16.0 && hero(s).body.on_ground
    });
    assert!(cleared.is_some());
    run(&mut sim, Buttons::RIGHT, 1);
    let p = hero(&sim);
    assert!(!p.motion.crouching);
    assert_eq!(p.body.bounds.height(), 32.0);
    assert!(overlapped_tiles(&sim).is_empty());
}

#[test]
fn standing_up_under_a_ceiling_is_refused() {
    // Spawn cell has a hard tile right above it
    let mut sim = CourseBuilder::flat(20).solid(2, 11, TileMaterial::Hard).sim();
    empower(&mut sim, PowerTier::Big);
    assert!(hero(&sim).motion.crouching);
    assert_eq!(hero(&sim).body.bounds.height(), 16.0);

    run(&mut sim, Buttons::empty(), 5);
    let p = hero(&sim);
    assert!(p.motion.crouching);
    assert_eq!(p.body.bounds.height(), 16.0);
    assert!(overlapped_tiles(&sim).is_empty());
}

#[test]
fn fire_player_throws_at_most_two_fireballs() {
    let mut sim = CourseBuilder::flat(60).sim();
    empower(&mut sim, PowerTier::Fire);
    run(&mut sim, Buttons::empty(), 5);

    play(
        &mut sim,
        &[
            (Buttons::RUN, 1),
            (Buttons::empty(), 1),
            (Buttons::RUN, 1),
            (Buttons::empty(), 1),
            (Buttons::RUN, 1),
            (Buttons::empty(), 1),
        ],
    );
    let id = hero_id(&sim);
    assert_eq!(sim.level().fireballs_of(id), 2);
    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::FireballThrown { .. })),
        2
    );
    assert_eq!(hero(&sim).frame.pose, Pose::FireThrow);
}

#[test]
fn fireball_thrown_into_an_adjacent_wall_fizzles() {
    let mut sim = CourseBuilder::flat(20).solid(5, 12, TileMaterial::Hard).sim();
    empower(&mut sim, PowerTier::Fire);
    // Right edge flush with the wall's left edge at x = 80
    place_hero(&mut sim, Vec2::new(64.0, FLOOR_Y), Vec2::ZERO, true);
    run(&mut sim, Buttons::RIGHT, 3);
    assert_eq!(hero(&sim).body.bounds.right(), 80.0);
    drain_events(&sim);

    play(&mut sim, &[(Buttons::RIGHT | Buttons::RUN, 1), (Buttons::RIGHT, 1)]);
    assert_eq!(sim.level().fireballs_of(hero_id(&sim)), 0);
    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::FireballThrown { .. })),
        0
    );
}

#[test]
fn fireball_shoots_the_first_enemy_it_touches() {
    let mut sim = CourseBuilder::flat(60).enemy(12, 12, EnemyKind::Spiny).sim();
    empower(&mut sim, PowerTier::Fire);
    run(&mut sim, Buttons::empty(), 5);
    play(&mut sim, &[(Buttons::RUN, 1), (Buttons::empty(), 60)]);

    let events = drain_events(&sim);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyShot {
            cause: ShotCause::Fireball { .. },
            ..
        }
    )));
    assert_eq!(sim.level().fireballs_of(hero_id(&sim)), 0);
}

#[test]
fn small_player_touching_an_enemy_dies() {
    let mut sim = CourseBuilder::flat(30).enemy(8, 12, EnemyKind::Goomba).sim();
    let lives = hero(&sim).lives;

    let died = run_until(&mut sim, Buttons::empty(), 400, |s| hero(s).power.is_dead());
    assert!(died.is_some());
    let p = hero(&sim);
    assert_eq!(p.lives, lives - 1);
    assert!(!p.controls_enabled);
    assert!(p.body.velocity.y < 0.0);
    let top = p.body.bounds.top();

    // The death arc starts on the next frame and ignores input
    sim.step(&[Buttons::RIGHT | Buttons::JUMP]);
    let p = hero(&sim);
    assert!(p.body.bounds.top() < top);
    assert_eq!(p.body.velocity.x, 0.0);
    assert_eq!(p.frame.pose, Pose::Dead);

    let events = drain_events(&sim);
    assert!(events.contains(&GameEvent::PlayerDied {
        player: hero_id(&sim),
        lives: lives - 1,
    }));
}

#[test]
fn big_player_shrinks_and_survives_contact() {
    let mut sim = CourseBuilder::flat(30).enemy(8, 12, EnemyKind::Goomba).sim();
    empower(&mut sim, PowerTier::Big);
    let lives = hero(&sim).lives;

    run(&mut sim, Buttons::empty(), 400);
    let p = hero(&sim);
    assert!(!p.power.is_dead());
    assert_eq!(p.power.tier(), PowerTier::Small);
    assert_eq!(p.lives, lives);

    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::PlayerHurt { .. })),
        1
    );
}

#[test]
fn landing_on_spiny_hurts() {
    let mut sim = CourseBuilder::flat(30).enemy(8, 12, EnemyKind::Spiny).sim();
    place_hero(&mut sim, Vec2::new(126.0, 170.0), Vec2::new(0.0, 2.0), false);
    run(&mut sim, Buttons::empty(), 20);
    assert!(hero(&sim).power.is_dead());
}

#[test]
fn falling_into_a_pit_kills_any_tier() {
    let mut sim = CourseBuilder::flat(30).gap(4, 8).sim();
    empower(&mut sim, PowerTier::Fire);
    let died = run_until(&mut sim, Buttons::RIGHT, 300, |s| hero(s).power.is_dead());
    assert!(died.is_some());
}

// =============================================================================
// Enemies
// =============================================================================

#[test]
fn stomping_a_goomba_flattens_it_and_bounces() {
    let mut sim = CourseBuilder::flat(30).enemy(8, 12, EnemyKind::Goomba).sim();
    place_hero(&mut sim, Vec2::new(126.0, 170.0), Vec2::new(0.0, 2.0), false);
    let goomba = first_of(&sim, EntityTag::Enemy);

    let stomped = run_until(&mut sim, Buttons::empty(), 30, |s| {
        s.level()
            .get(goomba)
            .and_then(Entity::as_enemy)
            .is_some_and(|e| matches!(e.state, EnemyState::Stomped { .. }))
    });
    assert!(stomped.is_some());
    assert!(hero(&sim).body.velocity.y < 0.0);
    assert!(!hero(&sim).power.is_dead());

    let events = drain_events(&sim);
    assert!(events.contains(&GameEvent::ScoreAwarded {
        player: hero_id(&sim),
        points: 100,
    }));

    // Flattened enemies are removed once their timer runs out
    run(&mut sim, Buttons::empty(), 40);
    assert!(sim.level().get(goomba).is_none());
}

#[test]
fn kicked_shell_chains_kills_with_rising_combo() {
    let mut sim = CourseBuilder::flat(40)
        .enemy(6, 12, EnemyKind::KoopaTroopa)
        .enemy(12, 12, EnemyKind::Goomba)
        .enemy(13, 12, EnemyKind::Goomba)
        .sim();
    let config = sim.config().clone();
    let shell = first_of(&sim, EntityTag::Enemy);
    {
        let koopa = sim
            .level_mut()
            .get_mut(shell)
            .and_then(Entity::as_enemy_mut)
            .unwrap();
        enemy::stomp(koopa, 1.0, &config);
        assert!(matches!(koopa.state, EnemyState::Shell(ShellMotion::Idle { .. })));
    }

    let kicked = run_until(&mut sim, Buttons::RIGHT, 120, |s| {
        s.level()
            .get(shell)
            .and_then(Entity::as_enemy)
            .is_some_and(|e| e.is_sliding_shell())
    });
    assert!(kicked.is_some());
    run(&mut sim, Buttons::empty(), 60);

    let kicker = hero_id(&sim);
    let events = drain_events(&sim);
    let shell_kills = count_events(&events, |e| {
        matches!(
            e,
            GameEvent::EnemyShot {
                cause: ShotCause::Shell { kicker: Some(k), .. },
                ..
            } if *k == kicker
        )
    });
    assert_eq!(shell_kills, 2);

    let points: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ScoreAwarded { player, points } if *player == kicker => Some(*points),
            _ => None,
        })
        .collect();
    assert_eq!(points, vec![config.scoring.kick, 100, 200]);
}

#[test]
fn idle_shell_wakes_back_into_patrol() {
    let mut sim = CourseBuilder::flat(60).enemy(30, 12, EnemyKind::KoopaTroopa).sim();
    let config = sim.config().clone();
    let koopa = first_of(&sim, EntityTag::Enemy);
    if let Some(e) = sim.level_mut().get_mut(koopa).and_then(Entity::as_enemy_mut) {
        enemy::stomp(e, 1.0, &config);
    }
    run(&mut sim, Buttons::empty(), config.durations.shell_wake_frames as usize + 1);
    let e = sim.level().get(koopa).and_then(Entity::as_enemy).unwrap();
    assert_eq!(e.state, EnemyState::Patrol);
    assert_eq!(e.body.bounds.size, EnemyKind::KoopaTroopa.size());
}

#[test]
fn star_player_shoots_enemies_on_contact() {
    let mut sim = CourseBuilder::flat(30).enemy(8, 12, EnemyKind::Spiny).sim();
    let id = hero_id(&sim);
    let rules = crate::power::PowerRules::from_config(sim.config());
    if let Some(p) = sim.level_mut().get_mut(id).and_then(Entity::as_player_mut) {
        p.power.collect(crate::power::PowerUp::Star, &rules);
    }
    run(&mut sim, Buttons::empty(), 300);
    assert!(!hero(&sim).power.is_dead());
    let events = drain_events(&sim);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyShot {
            cause: ShotCause::Star { .. },
            ..
        }
    )));
}

// =============================================================================
// Pipes
// =============================================================================

fn pipe_course() -> CourseBuilder {
    CourseBuilder::flat(30)
        .solid(4, 11, TileMaterial::Hard)
        .solid(5, 11, TileMaterial::Hard)
        .solid(4, 12, TileMaterial::Hard)
        .solid(5, 12, TileMaterial::Hard)
        .pipe(4, 11, PipeDirection::Down, (20, 12))
}

#[test]
fn down_pipe_transports_to_the_exit() {
    let mut sim = pipe_course().sim();
    place_hero(&mut sim, Vec2::new(72.0, 176.0), Vec2::ZERO, true);

    sim.step(&[Buttons::DOWN]);
    assert!(hero(&sim).pipe.is_some());
    assert_eq!(sim.pipes().claimant(0), Some(hero_id(&sim)));

    let frames = sim.config().durations.pipe_frames as usize;
    run(&mut sim, Buttons::empty(), 2 * frames + 8);
    let p = hero(&sim);
    assert!(p.pipe.is_none());
    assert_eq!(p.body.bounds.bottom(), FLOOR_Y);
    assert_eq!(p.body.bounds.left(), 320.0);
    assert_eq!(sim.pipes().claimant(0), None);

    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::PipeEntered { pipe: 0, .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::PipeExited { pipe: 0, .. })),
        1
    );
}

#[test]
fn claimed_pipe_refuses_a_second_traveller() {
    let mut sim = pipe_course()
        .players(&[Character::Mario, Character::Luigi])
        .sim();
    for slot in 0..2 {
        let id = sim.player(slot).unwrap().0;
        let body = sim.level_mut().get_mut(id).map(Entity::body_mut).unwrap();
        body.bounds.min = Vec2::new(72.0, 160.0);
        body.velocity = Vec2::ZERO;
        body.on_ground = true;
    }

    sim.step(&[Buttons::DOWN, Buttons::DOWN]);
    let (first, p0) = sim.player(0).unwrap();
    let (_, p1) = sim.player(1).unwrap();
    assert!(p0.pipe.is_some());
    assert!(p1.pipe.is_none());
    assert_eq!(sim.pipes().claimant(0), Some(first));
}

// =============================================================================
// Water and coins
// =============================================================================

#[test]
fn underwater_jump_presses_are_strokes() {
    let mut sim = CourseBuilder::flat(20).underwater().sim();
    run(&mut sim, Buttons::empty(), 5);
    play(&mut sim, &[(Buttons::JUMP, 1), (Buttons::empty(), 5)]);
    assert!(hero(&sim).motion.swimming);
    assert!(!hero(&sim).body.on_ground);
    assert_eq!(hero(&sim).frame.pose, Pose::Swim);

    // A stroke in mid-water pushes upward again
    sim.step(&[Buttons::JUMP]);
    assert!(hero(&sim).body.velocity.y < 0.0);
}

#[test]
fn coins_buy_extra_lives() {
    let mut config = SimConfig::default();
    config.scoring.coins_per_life = 2;
    let mut sim = CourseBuilder::flat(30)
        .item(4, 12, ItemKind::Coin)
        .item(6, 12, ItemKind::Coin)
        .config(config)
        .sim();
    let lives = hero(&sim).lives;
    run(&mut sim, Buttons::RIGHT, 80);

    let p = hero(&sim);
    assert_eq!(p.lives, lives + 1);
    assert_eq!(p.coins, 0);
    assert_eq!(sim.level().live_of(EntityTag::Item).count(), 0);
    let events = drain_events(&sim);
    assert_eq!(
        count_events(&events, |e| matches!(e, GameEvent::LifeGained { .. })),
        1
    );
}
