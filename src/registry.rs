//! One mesh per trail.
//!
//! [`TrailRegistry`] turns every fired projectile into its own ribbon mesh.
//! The whole path is resimulated and tessellated when the projectile is
//! created, so `moved` events carry no work; on removal the mesh goes back
//! to the pool for the next trail with the same segment count.
//!
//! # Slot states
//!
//! ```text
//!            created (segments > 0)
//! Inactive ─────────────────────────► Active ──┐
//!    ▲  │                                      │ removed
//!    │  │ created (no segments, pool full)     │ (buffer back to pool)
//!    │  └──────────────► Hidden ───────────────┤
//!    └─────────────────────────────────────────┘
//! ```

use crate::config::TrailConfig;
use crate::error::{ConfigError, TrailError};
use crate::events::TrailListener;
use crate::geometry::{BufferId, TrailGeometryBuffer};
use crate::pool::MeshBufferPool;
use crate::projectile::{Ballistic, Launcher, ProjectileState, Stepper};
use crate::ribbon::RibbonBuilder;
use crate::sampler::SegmentBudget;
use crate::time::TrailClock;

/// Per-draw shader parameters shared by every trail mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailDrawParams {
    pub width: f32,
    pub trail_offset: f32,
    /// Host time of the first trail; the shader subtracts it from its clock.
    pub start_time: f32,
}

#[derive(Debug)]
enum SlotState {
    Inactive,
    /// Created, but the path was too straight to draw.
    Hidden,
    Active(TrailGeometryBuffer),
}

/// Slot-indexed store of live trail meshes.
pub struct TrailRegistry<S: Stepper = Ballistic> {
    config: TrailConfig,
    stepper: S,
    builder: RibbonBuilder,
    pool: MeshBufferPool,
    slots: Vec<SlotState>,
    active: usize,
    clock: TrailClock,
}

impl TrailRegistry<Ballistic> {
    /// Registry integrating with the launcher's gravity.
    pub fn new(launcher: &Launcher, config: TrailConfig) -> Result<Self, ConfigError> {
        Self::with_stepper(launcher, config, launcher.ballistic())
    }
}

impl<S: Stepper> TrailRegistry<S> {
    /// Registry resimulating paths with a custom `stepper`.
    pub fn with_stepper(
        launcher: &Launcher,
        config: TrailConfig,
        stepper: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let budget = SegmentBudget::for_launcher(launcher, &config)?;
        let builder = RibbonBuilder::new(budget, config.min_between_segment_angle);
        let pool = match config.max_pool_buffers {
            Some(max) => MeshBufferPool::with_max_buffers(max),
            None => MeshBufferPool::new(),
        };

        let mut slots = Vec::with_capacity(launcher.max_projectile_count);
        slots.resize_with(launcher.max_projectile_count, || SlotState::Inactive);

        log::debug!(
            "trail registry: {} slots, up to {} segments per trail, dt {}",
            launcher.max_projectile_count,
            budget.max_segments(),
            budget.dt()
        );

        Ok(Self {
            config,
            stepper,
            builder,
            pool,
            slots,
            active: 0,
            clock: TrailClock::new(),
        })
    }

    /// Build the trail for a projectile fired into `slot` at host time `now`.
    ///
    /// Returns the id of the buffer holding the trail, or `None` when the
    /// path decimated to nothing and no buffer was taken.
    ///
    /// When the pool ceiling rejects the trail the slot is left hidden, like
    /// a straight path, so `moved` and `removed` for it are still accepted.
    /// Pool and clock are untouched and the error is returned. Every other
    /// error changes nothing.
    pub fn created(
        &mut self,
        slot: usize,
        state: &ProjectileState,
        now: f32,
    ) -> Result<Option<BufferId>, TrailError> {
        match self.slot(slot)? {
            SlotState::Inactive => {}
            _ => {
                log::warn!("created event for live slot {}", slot);
                return Err(TrailError::SlotAlreadyActive(slot));
            }
        }

        let creation_time = now - self.clock.start_time().unwrap_or(now);
        let Some(ribbon) = self.builder.build(&self.stepper, state, creation_time) else {
            self.clock.mark(now);
            self.slots[slot] = SlotState::Hidden;
            log::debug!("slot {}: straight path, no trail", slot);
            return Ok(None);
        };

        let mut buffer = match self.pool.get(ribbon.segment_count) {
            Ok(buffer) => buffer,
            Err(e) => {
                // The projectile still lives upstream; its later events stay valid.
                self.slots[slot] = SlotState::Hidden;
                log::warn!("slot {}: trail rejected: {}", slot, e);
                return Err(e);
            }
        };
        ribbon.write_to(&mut buffer);
        self.clock.mark(now);

        let id = buffer.id();
        log::debug!(
            "slot {}: trail with {} segments",
            slot,
            buffer.segment_count()
        );
        self.slots[slot] = SlotState::Active(buffer);
        self.active += 1;
        Ok(Some(id))
    }

    /// Nothing to update: the full path was built at creation.
    pub fn moved(&mut self, slot: usize, _state: &ProjectileState) -> Result<(), TrailError> {
        match self.slot(slot)? {
            SlotState::Inactive => Err(TrailError::SlotNotActive(slot)),
            _ => Ok(()),
        }
    }

    /// Release the trail of `slot`, returning its buffer to the pool.
    pub fn removed(&mut self, slot: usize) -> Result<(), TrailError> {
        if let SlotState::Inactive = self.slot(slot)? {
            log::warn!("removed event for idle slot {}", slot);
            return Err(TrailError::SlotNotActive(slot));
        }

        let previous = std::mem::replace(&mut self.slots[slot], SlotState::Inactive);
        if let SlotState::Active(buffer) = previous {
            log::debug!("slot {}: trail released", slot);
            self.pool.put(buffer);
            self.active -= 1;
        }
        Ok(())
    }

    /// Return every live buffer to the pool and reset all slots.
    pub fn clear(&mut self) {
        for state in &mut self.slots {
            if let SlotState::Active(buffer) = std::mem::replace(state, SlotState::Inactive) {
                self.pool.put(buffer);
            }
        }
        self.active = 0;
    }

    /// Visible trails in slot order, for the per-frame draw.
    pub fn draw_list(&self) -> impl Iterator<Item = (usize, &TrailGeometryBuffer)> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, state)| match state {
            SlotState::Active(buffer) => Some((slot, buffer)),
            _ => None,
        })
    }

    pub fn draw_params(&self) -> TrailDrawParams {
        TrailDrawParams {
            width: self.config.width,
            trail_offset: self.config.trail_offset,
            start_time: self.clock.start_time().unwrap_or(0.0),
        }
    }

    /// Number of slots holding a visible trail.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Whether `slot` holds a visible trail.
    pub fn is_active(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(SlotState::Active(_)))
    }

    /// Whether `slot` has seen `created` but not yet `removed`.
    pub fn is_live(&self, slot: usize) -> bool {
        !matches!(self.slots.get(slot), None | Some(SlotState::Inactive))
    }

    pub fn buffer(&self, slot: usize) -> Option<&TrailGeometryBuffer> {
        match self.slots.get(slot) {
            Some(SlotState::Active(buffer)) => Some(buffer),
            _ => None,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn pool(&self) -> &MeshBufferPool {
        &self.pool
    }

    pub fn budget(&self) -> &SegmentBudget {
        self.builder.budget()
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn clock(&self) -> &TrailClock {
        &self.clock
    }

    fn slot(&self, slot: usize) -> Result<&SlotState, TrailError> {
        self.slots.get(slot).ok_or(TrailError::SlotOutOfRange {
            slot,
            capacity: self.slots.len(),
        })
    }
}

impl<S: Stepper> TrailListener for TrailRegistry<S> {
    fn on_created(
        &mut self,
        slot: usize,
        state: &ProjectileState,
        time: f32,
    ) -> Result<(), TrailError> {
        self.created(slot, state, time).map(|_| ())
    }

    fn on_moved(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError> {
        self.moved(slot, state)
    }

    fn on_removed(&mut self, slot: usize, _state: &ProjectileState) -> Result<(), TrailError> {
        self.removed(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn launcher() -> Launcher {
        Launcher {
            max_projectile_count: 8,
            starting_velocity: 100.0,
            lifetime: 3.0,
            gravity: Vec3::new(0.0, -9.8, 0.0),
        }
    }

    fn curved() -> ProjectileState {
        ProjectileState::launched(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0))
    }

    fn straight() -> ProjectileState {
        ProjectileState::launched(Vec3::ZERO, Vec3::new(0.0, -100.0, 0.0))
    }

    #[test]
    fn test_create_and_remove() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        let id = registry.created(2, &curved(), 10.0).unwrap().unwrap();

        assert_eq!(registry.active_count(), 1);
        assert!(registry.is_active(2));
        let buffer = registry.buffer(2).unwrap();
        assert_eq!(buffer.id(), id);
        assert!(buffer.is_visible());

        registry.moved(2, &curved().at_lifetime(0.5)).unwrap();
        registry.removed(2).unwrap();
        assert_eq!(registry.active_count(), 0);
        assert!(!registry.is_live(2));
        assert_eq!(registry.pool().stats().free, 1);
    }

    #[test]
    fn test_reuses_buffer_for_same_shape() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        let first = registry.created(0, &curved(), 0.0).unwrap().unwrap();
        registry.removed(0).unwrap();
        let second = registry.created(5, &curved(), 1.0).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.pool().stats().allocations, 1);
    }

    #[test]
    fn test_straight_path_takes_no_buffer() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        assert_eq!(registry.created(1, &straight(), 0.0).unwrap(), None);
        assert_eq!(registry.pool().stats().allocations, 0);
        assert!(registry.is_live(1));
        assert!(!registry.is_active(1));
        assert_eq!(registry.active_count(), 0);

        // moved/removed are harmless for a hidden slot
        registry.moved(1, &straight()).unwrap();
        registry.removed(1).unwrap();
        assert!(!registry.is_live(1));
    }

    #[test]
    fn test_lifecycle_violations() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        assert_eq!(registry.removed(3), Err(TrailError::SlotNotActive(3)));
        assert_eq!(registry.moved(3, &curved()), Err(TrailError::SlotNotActive(3)));

        registry.created(3, &curved(), 0.0).unwrap();
        assert_eq!(
            registry.created(3, &curved(), 0.0),
            Err(TrailError::SlotAlreadyActive(3))
        );
        assert_eq!(registry.pool().stats().in_use, 1);

        registry.created(4, &straight(), 0.0).unwrap();
        assert_eq!(
            registry.created(4, &curved(), 0.0),
            Err(TrailError::SlotAlreadyActive(4))
        );

        assert!(matches!(
            registry.created(8, &curved(), 0.0),
            Err(TrailError::SlotOutOfRange { slot: 8, capacity: 8 })
        ));
    }

    #[test]
    fn test_rejected_creation_hides_slot() {
        let config = TrailConfig::default().with_max_pool_buffers(1);
        let mut registry = TrailRegistry::new(&launcher(), config).unwrap();
        registry.created(0, &curved(), 4.0).unwrap();

        let steep = ProjectileState::launched(Vec3::ZERO, Vec3::new(30.0, 60.0, 0.0));
        let err = registry.created(1, &steep, 5.0).unwrap_err();
        assert!(matches!(err, TrailError::PoolExhausted { .. }));
        assert!(registry.is_live(1));
        assert!(!registry.is_active(1));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.pool().stats().in_use, 1);
        assert_eq!(registry.pool().total_buffers(), 1);
        assert_eq!(registry.clock().start_time(), Some(4.0));

        // The rest of the projectile's lifecycle is accepted.
        registry.moved(1, &steep.at_lifetime(0.5)).unwrap();
        registry.removed(1).unwrap();
        assert!(!registry.is_live(1));
        assert_eq!(registry.pool().stats().in_use, 1);
        assert_eq!(registry.pool().total_buffers(), 1);

        // A second created while hidden is still a violation.
        assert!(matches!(
            registry.created(2, &steep, 6.0),
            Err(TrailError::PoolExhausted { .. })
        ));
        assert_eq!(
            registry.created(2, &steep, 6.0),
            Err(TrailError::SlotAlreadyActive(2))
        );
    }

    #[test]
    fn test_uv_time_is_session_local() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        registry.created(0, &straight(), 3.0).unwrap();
        registry.created(1, &curved(), 5.0).unwrap();

        assert_eq!(registry.draw_params().start_time, 3.0);
        let buffer = registry.buffer(1).unwrap();
        assert_eq!(buffer.uvs()[0].x, 2.0);
    }

    #[test]
    fn test_draw_list_and_clear() {
        let mut registry = TrailRegistry::new(&launcher(), TrailConfig::default()).unwrap();
        registry.created(6, &curved(), 0.0).unwrap();
        registry.created(1, &curved(), 0.0).unwrap();
        registry.created(3, &straight(), 0.0).unwrap();

        let slots: Vec<_> = registry.draw_list().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![1, 6]);

        registry.clear();
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.draw_list().count(), 0);
        assert_eq!(registry.pool().stats().free, 2);
        assert!(!registry.is_live(3));
    }
}
