//! Integration tests for the trail lifecycle.
//!
//! These drive both trail strategies through the public API the way a
//! simulation would: fire projectiles into slots, move them, remove them,
//! and check what ends up drawable.

use std::collections::BTreeSet;

use projectile_trails::prelude::*;
use projectile_trails::{MeshBufferPool, SegmentBudget, SparseDenseIndex, SwapRemove};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn earth_launcher(count: usize) -> Launcher {
    Launcher {
        max_projectile_count: count,
        starting_velocity: 100.0,
        lifetime: 3.0,
        gravity: Vec3::new(0.0, -9.8, 0.0),
    }
}

fn lobbed(x: f32) -> ProjectileState {
    ProjectileState::launched(Vec3::new(x, 0.0, 0.0), Vec3::new(60.0, 60.0, 0.0))
}

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn test_budget_matches_closed_form() {
    let gravity = Vec3::new(0.0, -9.8, 0.0);
    let cases = [(100.0f32, 3.0f32, 20.0f32), (10.0, 1.0, 20.0), (35.0, 2.5, 1.5)];
    for (v0, lifetime, segment_length) in cases {
        let budget = SegmentBudget::new(v0, lifetime, gravity, segment_length).unwrap();

        let length = v0 * lifetime + (gravity.length() * lifetime * lifetime) * 0.5;
        let segments = (length / segment_length).ceil() as u32;
        assert_eq!(budget.max_path_length().to_bits(), length.to_bits());
        assert_eq!(budget.max_segments(), segments);
        assert_eq!(budget.dt().to_bits(), (lifetime / segments as f32).to_bits());
    }
}

#[test]
fn test_default_launcher_budget() {
    let budget = SegmentBudget::for_launcher(&earth_launcher(1), &TrailConfig::default()).unwrap();
    assert_eq!(budget.max_segments(), 18);
    assert!((budget.dt() - 3.0 / 18.0).abs() < 1e-7);
}

// ============================================================================
// Reference resimulation
// ============================================================================

/// Straightforward rebuild of the decimated waypoint list, independent of
/// the crate's builder.
fn reference_waypoints(
    start: Vec3,
    velocity: Vec3,
    gravity: Vec3,
    budget: &SegmentBudget,
    min_angle: f32,
) -> Vec<(Vec3, f32)> {
    let dt = budget.dt();
    let mut p = start;
    let mut v = velocity;
    let mut samples = vec![(p, v.normalize(), 0.0f32)];
    for i in 1..=budget.max_segments() {
        p += v * dt + 0.5 * gravity * dt * dt;
        v += gravity * dt;
        samples.push((p, v.normalize(), i as f32 * dt));
    }

    let mut kept = vec![(samples[0].0, samples[0].2)];
    let mut last_dir = samples[0].1;
    let mut last_emitted = true;
    for &(pos, dir, t) in &samples[1..] {
        let denom = (last_dir.length_squared() * dir.length_squared()).sqrt();
        let angle = (last_dir.dot(dir) / denom).clamp(-1.0, 1.0).acos().to_degrees();
        if angle >= min_angle {
            kept.push((pos, t));
            last_dir = dir;
            last_emitted = true;
        } else {
            last_emitted = false;
        }
    }
    if kept.len() > 1 && !last_emitted {
        let &(pos, _, t) = samples.last().unwrap();
        kept.push((pos, t));
    }
    kept
}

#[test]
fn test_short_vertical_shot_has_no_segments() {
    let launcher = Launcher {
        max_projectile_count: 1,
        starting_velocity: 10.0,
        lifetime: 1.0,
        gravity: Vec3::new(0.0, -9.8, 0.0),
    };
    let config = TrailConfig::default().with_segment_length(20.0).with_min_angle(15.0);
    let mut registry = TrailRegistry::new(&launcher, config).unwrap();

    assert_eq!(registry.budget().max_segments(), 1);
    assert_eq!(registry.budget().dt(), 1.0);

    let state = ProjectileState::launched(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0));
    let reference = reference_waypoints(
        state.position,
        state.velocity,
        launcher.gravity,
        registry.budget(),
        15.0,
    );
    assert_eq!(reference.len(), 1);

    assert_eq!(registry.created(0, &state, 0.0), Ok(None));
    assert!(registry.is_live(0));
    assert!(!registry.is_active(0));
    assert_eq!(registry.draw_list().count(), 0);
    assert_eq!(registry.pool().stats().allocations, 0);
}

#[test]
fn test_curved_shot_matches_reference() {
    let launcher = earth_launcher(2);
    let mut registry = TrailRegistry::new(&launcher, TrailConfig::default()).unwrap();
    let state = lobbed(5.0);

    let reference = reference_waypoints(
        state.position,
        state.velocity,
        launcher.gravity,
        registry.budget(),
        15.0,
    );
    assert!(reference.len() >= 2);

    registry.created(1, &state, 4.0).unwrap();
    let buffer = registry.buffer(1).unwrap();
    assert_eq!(buffer.segment_count() as usize, reference.len() - 1);
    assert!(buffer.segment_count() <= registry.budget().max_segments());

    for (i, (position, time)) in reference.iter().enumerate() {
        for side in 0..2 {
            let vertex = 2 * i + side;
            assert!((buffer.positions()[vertex] - *position).length() < 1e-3);
            // First trail of the session, so uv.x is pure simulation time.
            assert!((buffer.uvs()[vertex].x - time).abs() < 1e-5);
            assert_eq!(buffer.uvs()[vertex].y, side as f32);
        }
    }
}

#[test]
fn test_straight_path_takes_no_buffer() {
    let launcher = Launcher {
        gravity: Vec3::ZERO,
        ..earth_launcher(4)
    };
    let mut registry = TrailRegistry::new(&launcher, TrailConfig::default()).unwrap();

    for slot in 0..4 {
        let state = ProjectileState::launched(Vec3::ZERO, Vec3::new(slot as f32 + 1.0, 0.0, 50.0));
        assert_eq!(registry.created(slot, &state, 0.0), Ok(None));
    }
    let stats = registry.pool().stats();
    assert_eq!(stats.allocations, 0);
    assert_eq!(stats.in_use, 0);
    assert_eq!(registry.active_count(), 0);

    // Hidden slots still follow the lifecycle.
    registry.moved(2, &lobbed(0.0)).unwrap();
    registry.removed(2).unwrap();
    assert!(!registry.is_live(2));
}

// ============================================================================
// Pool reuse
// ============================================================================

#[test]
fn test_released_buffer_is_reused() {
    let mut registry = TrailRegistry::new(&earth_launcher(4), TrailConfig::default()).unwrap();

    let first = registry.created(0, &lobbed(0.0), 0.0).unwrap().unwrap();
    registry.removed(0).unwrap();
    let second = registry.created(3, &lobbed(9.0), 1.0).unwrap().unwrap();

    assert_eq!(first, second);
    let stats = registry.pool().stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.reuses, 1);
}

#[test]
fn test_pool_get_put_get_identity() {
    let mut pool = MeshBufferPool::new();
    let a = pool.get(6).unwrap();
    let id = a.id();
    pool.put(a);
    let b = pool.get(6).unwrap();
    assert_eq!(b.id(), id);
    assert!(!b.is_visible());

    let c = pool.get(7).unwrap();
    assert_ne!(c.id(), id);
}

#[test]
fn test_pool_ceiling_rejection_keeps_lifecycle_valid() {
    let config = TrailConfig::default().with_max_pool_buffers(1);
    let mut registry = TrailRegistry::new(&earth_launcher(4), config).unwrap();
    let start = 2.0;

    registry.created(0, &lobbed(0.0), start).unwrap();
    let steep = ProjectileState::launched(Vec3::ZERO, Vec3::new(30.0, 70.0, 0.0));

    let mut log = EventLog::new();
    log.created(1, steep, start + 1.0);
    log.moved(1, steep.at_lifetime(0.5));
    log.removed(1, steep.at_lifetime(1.0));

    // Only the creation is reported; the slot's later events still apply.
    let err = log.deliver(&mut registry).unwrap_err();
    assert!(matches!(err, TrailError::PoolExhausted { max_buffers: 1, .. }));
    assert!(registry.is_live(1));
    assert!(!registry.is_active(1));
    assert_eq!(log.deliver(&mut registry), Ok(2));
    assert!(!registry.is_live(1));

    let stats = registry.pool().stats();
    assert_eq!(stats.in_use, 1);
    assert_eq!(registry.pool().total_buffers(), 1);
    assert_eq!(registry.clock().start_time(), Some(start));
    assert_eq!(registry.active_count(), 1);
}

// ============================================================================
// Randomized lifecycles
// ============================================================================

#[test]
fn test_random_interleavings_registry() {
    let mut rng = StdRng::seed_from_u64(0x7a11);
    let capacity = 24;
    let mut registry =
        TrailRegistry::new(&earth_launcher(capacity), TrailConfig::default()).unwrap();
    let mut live = vec![false; capacity];
    let mut visible = BTreeSet::new();
    let mut now = 0.0f32;

    for _ in 0..2_000 {
        let slot = rng.gen_range(0..capacity);
        now += 0.016;

        if live[slot] {
            if rng.gen_bool(0.6) {
                let state = lobbed(0.0).at_lifetime(rng.gen_range(0.0..3.0));
                registry.moved(slot, &state).unwrap();
            } else {
                registry.removed(slot).unwrap();
                live[slot] = false;
                visible.remove(&slot);
            }
        } else {
            let velocity = Vec3::new(
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
            );
            let state = ProjectileState::launched(Vec3::ZERO, velocity);
            if registry.created(slot, &state, now).unwrap().is_some() {
                visible.insert(slot);
            }
            live[slot] = true;

            // A second creation for the same slot is always refused.
            assert_eq!(
                registry.created(slot, &state, now),
                Err(TrailError::SlotAlreadyActive(slot))
            );
        }

        let drawn: BTreeSet<_> = registry.draw_list().map(|(slot, _)| slot).collect();
        assert_eq!(drawn, visible);
        assert_eq!(registry.active_count(), visible.len());

        let stats = registry.pool().stats();
        assert_eq!(stats.in_use, visible.len());
        assert!(stats.high_water <= capacity);

        for (_, buffer) in registry.draw_list() {
            assert!(buffer.is_visible());
            assert!(buffer.segment_count() >= 1);
            assert!(buffer.segment_count() <= registry.budget().max_segments());
            assert_eq!(buffer.vertex_count(), 2 + 2 * buffer.segment_count() as usize);
            assert_eq!(buffer.index_count(), 6 * buffer.segment_count() as usize);
        }
    }

    registry.clear();
    assert_eq!(registry.pool().stats().in_use, 0);
    assert_eq!(registry.draw_list().count(), 0);
}

#[test]
fn test_random_interleavings_instanced() {
    let mut rng = StdRng::seed_from_u64(42);
    let capacity = 32;
    let mut batch =
        InstancedTrailBatch::new(&earth_launcher(capacity), &TrailConfig::default()).unwrap();
    let mut expected: BTreeSet<usize> = BTreeSet::new();

    for step in 0..3_000 {
        let slot = rng.gen_range(0..capacity);
        if expected.contains(&slot) {
            if rng.gen_bool(0.5) {
                batch.moved(slot, &lobbed(0.0).at_lifetime(step as f32 * 0.01)).unwrap();
            } else {
                batch.removed(slot).unwrap();
                expected.remove(&slot);
            }
        } else {
            batch.created(slot, &lobbed(slot as f32)).unwrap();
            expected.insert(slot);
        }

        let draw = batch.draw_batch();
        assert_eq!(draw.instance_count as usize, expected.len());

        // Every live slot owns exactly one packed row, and rows hold its data.
        let mut rows = BTreeSet::new();
        for &slot in &expected {
            let row = batch.row(slot).unwrap();
            assert!(row < expected.len());
            assert!(rows.insert(row));
            assert_eq!(draw.transforms[row].w_axis.x, slot as f32);
        }
    }
}

// ============================================================================
// Swap-erase
// ============================================================================

#[test]
fn test_swap_erase_postconditions() {
    let mut index = SparseDenseIndex::new(10);
    for slot in [7, 2, 9, 4, 0] {
        index.insert(slot).unwrap();
    }

    let before: Vec<_> = index.slots().collect();
    let removed_row = index.row(2).unwrap();
    let last_slot = *before.last().unwrap();

    let swap = index.remove(2).unwrap();
    assert_eq!(swap, SwapRemove { row: removed_row, moved_from: Some(before.len() - 1) });
    assert_eq!(index.len(), before.len() - 1);
    assert_eq!(index.row(last_slot), Some(removed_row));
    assert!(!index.contains(2));

    // Rows not involved keep their positions.
    for (row, slot) in before.iter().enumerate() {
        if *slot != 2 && *slot != last_slot {
            assert_eq!(index.row(*slot), Some(row));
        }
    }
}

// ============================================================================
// Event delivery
// ============================================================================

#[test]
fn test_event_log_drives_registry() {
    let mut registry = TrailRegistry::new(&earth_launcher(4), TrailConfig::default()).unwrap();
    let mut log = EventLog::new();

    log.created(0, lobbed(0.0), 1.0);
    log.created(1, lobbed(1.0), 1.5);
    log.moved(0, lobbed(0.0).at_lifetime(0.5));
    log.removed(1, lobbed(1.0));
    assert_eq!(log.deliver(&mut registry), Ok(4));
    assert!(log.is_empty());

    assert!(registry.is_active(0));
    assert!(!registry.is_live(1));
    assert_eq!(registry.draw_params().start_time, 1.0);

    // A bad event stops delivery; the rest waits for the next call.
    log.removed(3, lobbed(3.0));
    log.created(2, lobbed(2.0), 2.0);
    assert_eq!(log.deliver(&mut registry), Err(TrailError::SlotNotActive(3)));
    assert_eq!(log.len(), 1);
    assert_eq!(log.deliver(&mut registry), Ok(1));
    assert!(registry.is_active(2));
}

#[test]
fn test_event_log_drives_both_strategies() {
    let launcher = earth_launcher(8);
    let mut registry = TrailRegistry::new(&launcher, TrailConfig::default()).unwrap();
    let mut batch = InstancedTrailBatch::new(&launcher, &TrailConfig::default()).unwrap();

    let fill = |log: &mut EventLog| {
        for slot in 0..5 {
            log.created(slot, lobbed(slot as f32), slot as f32);
        }
        log.removed(1, lobbed(1.0));
        log.removed(3, lobbed(3.0));
    };

    let mut log = EventLog::new();
    fill(&mut log);
    log.deliver(&mut registry).unwrap();
    fill(&mut log);
    log.deliver(&mut batch).unwrap();

    let drawn: Vec<_> = registry.draw_list().map(|(slot, _)| slot).collect();
    assert_eq!(drawn, vec![0, 2, 4]);
    assert_eq!(batch.active_count(), 3);
    for slot in [0, 2, 4] {
        assert!(batch.is_active(slot));
    }
}
