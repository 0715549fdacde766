//! When diagnostics need data that the step would otherwise skip.

/// Decides, per timestep, whether the charge density must be summed
/// across patches. Skipping it on other steps saves one reduction.
pub trait ChargeAccumulation {
    fn needs_charge_accumulation(&self, step: u64) -> bool;
}

/// Every `every` steps, from `start` up to and including `end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSelection {
    pub every: u64,
    pub start: u64,
    pub end: u64,
}

impl TimeSelection {
    pub fn new(every: u64) -> Self {
        TimeSelection { every, start: 0, end: u64::MAX }
    }

    /// Selects no step at all.
    pub fn never() -> Self {
        TimeSelection { every: 0, start: 0, end: 0 }
    }

    pub fn between(mut self, start: u64, end: u64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn contains(&self, step: u64) -> bool {
        self.every > 0 && step >= self.start && step <= self.end && (step - self.start) % self.every == 0
    }
}

impl ChargeAccumulation for TimeSelection {
    fn needs_charge_accumulation(&self, step: u64) -> bool {
        self.contains(step)
    }
}

impl<F> ChargeAccumulation for F where F: Fn(u64) -> bool {
    fn needs_charge_accumulation(&self, step: u64) -> bool {
        self(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_periodic_steps() {
        let sel = TimeSelection::new(10).between(5, 45);
        let steps: Vec<u64> = (0..60).filter(|&s| sel.needs_charge_accumulation(s)).collect();
        assert_eq!(steps, vec![5, 15, 25, 35, 45]);
        assert!(!TimeSelection::never().contains(0));
    }

    #[test]
    fn closures_are_predicates() {
        let odd = |step: u64| step % 2 == 1;
        assert!(odd.needs_charge_accumulation(3));
        assert!(!odd.needs_charge_accumulation(4));
    }
}
