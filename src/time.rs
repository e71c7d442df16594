//! Session time for trail animation.
//!
//! Trail shaders scroll their pattern by `uv.x`, which is measured from the
//! moment the first trail of the session was created. Using one shared
//! origin keeps the animation continuous across trails instead of restarting
//! it for every projectile.
//!
//! # Example
//!
//! ```ignore
//! let mut clock = TrailClock::new();
//! let local = clock.mark(host_time_seconds);
//! // `local` is 0.0 for the very first trail
//! ```

/// Remembers when the first trail of the session was created.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrailClock {
    start: Option<f32>,
}

impl TrailClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trail created at host time `now` and return its
    /// session-local creation time.
    ///
    /// The first call fixes the session origin.
    pub fn mark(&mut self, now: f32) -> f32 {
        let start = *self.start.get_or_insert(now);
        now - start
    }

    /// Host time of the first trail, if any trail was created yet.
    #[inline]
    pub fn start_time(&self) -> Option<f32> {
        self.start
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    /// Session-local time for host time `now`, 0 before the first trail.
    pub fn local(&self, now: f32) -> f32 {
        self.start.map_or(0.0, |start| now - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mark_fixes_origin() {
        let mut clock = TrailClock::new();
        assert!(!clock.is_started());
        assert_eq!(clock.local(5.0), 0.0);

        assert_eq!(clock.mark(2.0), 0.0);
        assert_eq!(clock.start_time(), Some(2.0));
        assert_eq!(clock.mark(3.5), 1.5);
        assert_eq!(clock.start_time(), Some(2.0));
        assert_eq!(clock.local(4.0), 2.0);
    }
}
