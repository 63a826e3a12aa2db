//! Timed soil absorption: a cancellable schedule that removes droplets at a
//! fixed rate.

/// Result of one absorption step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbsorptionStep {
    /// Absorption is not active.
    Idle,
    /// Still running; `removed` droplets went this step.
    Running { removed: usize },
    /// Population ran dry; absorption switched itself off.
    Completed { removed: usize },
}

/// Removal schedule. Owns no droplets; the manager applies the removals.
#[derive(Clone, Debug)]
pub struct Absorption {
    active: bool,
    /// Removals per second.
    rate: f32,
    elapsed: f32,
}

impl Absorption {
    pub fn new(rate: f32) -> Self {
        Self {
            active: false,
            rate: rate.max(f32::MIN_POSITIVE),
            elapsed: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Seconds between removals.
    pub fn interval(&self) -> f32 {
        1.0 / self.rate
    }

    /// Change the removal rate. Non-positive rates are ignored.
    pub fn set_rate(&mut self, rate: f32) -> bool {
        if rate <= 0.0 || !rate.is_finite() {
            log::warn!("Ignoring absorption rate {}; must be positive", rate);
            return false;
        }
        self.rate = rate;
        true
    }

    /// Begin removing. The first removal is due on the next step.
    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.elapsed = self.interval();
        }
    }

    /// Cancel. Takes effect on the next step.
    pub fn stop(&mut self) {
        self.active = false;
        self.elapsed = 0.0;
    }

    /// Advance by `dt` and return how many removals are due.
    pub fn advance(&mut self, dt: f32) -> usize {
        if !self.active {
            return 0;
        }
        self.elapsed += dt.max(0.0);
        let interval = self.interval();
        let due = (self.elapsed / interval).floor();
        self.elapsed -= due * interval;
        due as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_removal_is_immediate() {
        let mut a = Absorption::new(4.0);
        a.start();
        assert_eq!(a.advance(0.0), 1);
        assert_eq!(a.advance(0.125), 0);
        assert_eq!(a.advance(0.125), 1);
        assert_eq!(a.advance(0.75), 3);
    }

    #[test]
    fn test_stopped_schedule_removes_nothing() {
        let mut a = Absorption::new(10.0);
        assert_eq!(a.advance(5.0), 0);
        a.start();
        a.stop();
        assert_eq!(a.advance(5.0), 0);
    }

    #[test]
    fn test_bad_rate_ignored() {
        let mut a = Absorption::new(4.0);
        assert!(!a.set_rate(0.0));
        assert!(!a.set_rate(f32::NAN));
        assert_eq!(a.rate(), 4.0);
        assert!(a.set_rate(2.0));
        assert_eq!(a.interval(), 0.5);
    }
}
