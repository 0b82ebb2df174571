//! Bounded history window
//!
//! Keeps the most recent readings in arrival order for display.
//! The oldest reading is evicted once capacity is exceeded.

use std::collections::VecDeque;

use super::types::Reading;

/// Default number of readings kept for display
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Fixed-capacity FIFO of readings, oldest first
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl HistoryWindow {
    /// Create an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, returning the evicted oldest reading if the window was full
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.readings.len() >= self.capacity {
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        evicted
    }

    /// Replace the contents with a newest-first batch (as returned by a history query)
    ///
    /// Only the `capacity` newest readings are kept, stored oldest first.
    pub fn replace_newest_first(&mut self, newest_first: Vec<Reading>) {
        self.readings.clear();
        self.readings
            .extend(newest_first.into_iter().take(self.capacity).rev());
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Copy of the window, oldest first
    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64) -> Reading {
        Reading::new(temperature, 0.2, false)
    }

    #[test]
    fn test_push_within_capacity() {
        let mut window = HistoryWindow::new(3);
        assert!(window.push(reading(1.0)).is_none());
        assert!(window.push(reading(2.0)).is_none());
        assert_eq!(window.len(), 2);
        assert_eq!(window.latest().unwrap().temperature, 2.0);
    }

    #[test]
    fn test_twenty_first_arrival_evicts_first() {
        let mut window = HistoryWindow::default();
        for i in 0..20 {
            assert!(window.push(reading(i as f64)).is_none());
        }

        let evicted = window.push(reading(20.0)).unwrap();
        assert_eq!(evicted.temperature, 0.0);
        assert_eq!(window.len(), 20);

        let temps: Vec<f64> = window.iter().map(|r| r.temperature).collect();
        let expected: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        assert_eq!(temps, expected);
    }

    #[test]
    fn test_many_arrivals_keep_most_recent_in_order() {
        let mut window = HistoryWindow::default();
        for i in 0..57 {
            window.push(reading(i as f64));
        }

        let temps: Vec<f64> = window.iter().map(|r| r.temperature).collect();
        let expected: Vec<f64> = (37..57).map(|i| i as f64).collect();
        assert_eq!(temps, expected);
    }

    #[test]
    fn test_replace_newest_first_reverses() {
        let mut window = HistoryWindow::new(3);
        window.push(reading(99.0));

        window.replace_newest_first(vec![reading(5.0), reading(4.0), reading(3.0), reading(2.0)]);

        let temps: Vec<f64> = window.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![3.0, 4.0, 5.0]);
        assert_eq!(window.latest().unwrap().temperature, 5.0);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut window = HistoryWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(reading(1.0));
        window.push(reading(2.0));
        assert_eq!(window.to_vec().len(), 1);
    }
}
