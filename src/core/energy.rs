/// Energy pool spent on faction storylines.
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyPool {
    current: u32,
    max: u32,
}

impl EnergyPool {
    /// A full pool of `max` energy.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.current >= cost
    }

    /// Spend `cost` if the pool covers it. Returns whether it did.
    pub fn spend(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            debug!(current = self.current, cost, "not enough energy");
            return false;
        }
        self.current -= cost;
        true
    }

    /// Add energy, capped at the pool's maximum.
    pub fn restore(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }
}

impl Default for EnergyPool {
    fn default() -> Self {
        Self::full(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_until_empty() {
        let mut pool = EnergyPool::default();
        assert!(pool.spend(1));
        assert!(pool.spend(2));
        assert_eq!(pool.current(), 0);
        assert!(!pool.spend(1));
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn restore_is_capped() {
        let mut pool = EnergyPool::full(3);
        pool.spend(2);
        pool.restore(10);
        assert_eq!(pool.current(), 3);
    }
}
