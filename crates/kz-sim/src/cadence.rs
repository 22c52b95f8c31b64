/// A periodic activity on the simulated time axis.
///
/// Firing is tracked by the index of the last boundary `k * period` that
/// fired, never by an accumulated time, so floating-point error in the
/// caller's clock cannot shift the phase. A boundary is considered reached
/// when `t / period` is within [`Cadence::TOLERANCE`] periods of it.
///
/// Boundaries that were skipped (ticks longer than the period) are not
/// caught up: the next firing jumps straight to the current boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Cadence {
    period: f64,
    last_index: Option<u64>,
}

impl Cadence {
    /// Relative tolerance, in periods, when flooring `t / period`.
    pub const TOLERANCE: f64 = 1e-9;

    /// A cadence that has never fired.
    pub fn new(period: f64) -> Self {
        Self {
            period,
            last_index: None,
        }
    }

    /// The period in simulated seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Index of the last boundary at or before `t`.
    pub fn index_at(&self, t: f64) -> u64 {
        (t / self.period + Self::TOLERANCE).floor().max(0.0) as u64
    }

    /// Whether `t` has reached a boundary that has not fired yet.
    pub fn is_due(&self, t: f64) -> bool {
        match self.last_index {
            None => true,
            Some(last) => self.index_at(t) > last,
        }
    }

    /// Anchor the cadence at the boundary at or before `t`.
    pub fn mark(&mut self, t: f64) {
        self.last_index = Some(self.index_at(t));
    }

    /// Fire if due, re-anchoring at `t`. Returns whether it fired.
    pub fn fire_if_due(&mut self, t: f64) -> bool {
        let due = self.is_due(t);
        if due {
            self.mark(t);
        }
        due
    }

    /// Simulated time of the boundary that fired last, `floor(t / period) * period`.
    pub fn last_fired(&self) -> Option<f64> {
        self.last_index.map(|k| k as f64 * self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_cadence_is_due() {
        let c = Cadence::new(0.5);
        assert!(c.is_due(0.0));
        assert_eq!(c.last_fired(), None);
    }

    #[test]
    fn anchors_on_the_floor_not_the_firing_time() {
        let mut c = Cadence::new(0.2);
        c.mark(0.0);
        assert!(!c.fire_if_due(0.19));
        assert!(c.fire_if_due(0.23));
        let anchor = c.last_fired().unwrap();
        assert!((anchor - 0.2).abs() < 1e-12);
        assert!(!c.is_due(0.39));
        assert!(c.is_due(0.4));
    }

    #[test]
    fn accumulated_time_still_hits_the_boundary() {
        // 0.1 added ten times is 0.9999999999999999.
        let t = (0..10).fold(0.0, |acc, _| acc + 0.1);
        assert!(t < 1.0);
        let mut c = Cadence::new(0.1);
        c.mark(0.9);
        assert!(c.fire_if_due(t));
        assert_eq!(c.index_at(t), 10);
    }

    #[test]
    fn skipped_boundaries_are_not_caught_up() {
        let mut c = Cadence::new(0.1);
        c.mark(0.0);
        assert!(c.fire_if_due(0.35));
        assert!(!c.fire_if_due(0.36));
        assert!(c.fire_if_due(0.4));
    }

    proptest! {
        #[test]
        fn ticks_no_longer_than_the_period_fire_every_boundary_once(
            period in 0.001f64..1.0,
            ratio in 0.01f64..=1.0,
            ticks in 1usize..2000,
        ) {
            let dt = period * ratio;
            let mut c = Cadence::new(period);
            let mut fired = Vec::new();
            for i in 0..ticks {
                let t = i as f64 * dt;
                if c.fire_if_due(t) {
                    fired.push(c.index_at(t));
                }
            }
            let expected: Vec<u64> = (0..fired.len() as u64).collect();
            prop_assert_eq!(&fired, &expected);
            let last_t = (ticks - 1) as f64 * dt;
            prop_assert_eq!(fired.len() as u64, c.index_at(last_t) + 1);
        }

        #[test]
        fn last_fired_never_exceeds_the_firing_time(
            period in 0.001f64..1.0,
            t in 0.0f64..100.0,
        ) {
            let mut c = Cadence::new(period);
            c.mark(t);
            let anchor = c.last_fired().unwrap();
            prop_assert!(anchor <= t + period * Cadence::TOLERANCE * 2.0);
            prop_assert!(t - anchor < period * (1.0 + 1e-9));
        }
    }
}
