//! Occupancy tracking for one limited operator type.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Tracks reserved occupancy windows of an operator type with `limit` instances.
///
/// Maintains the invariant that `busy_periods` is sorted by start cycle. Windows
/// are half-open `[start, end)` and may overlap as long as no cycle is covered by
/// more than `limit` of them.
#[derive(Clone, Debug)]
pub struct ResourceSchedule {
    /// Operator type name (for debugging)
    pub operator_type: String,
    /// Number of instances that may be occupied at the same cycle
    pub limit: u32,
    /// Reserved (start, end) windows, sorted by start
    pub busy_periods: Vec<(u32, u32)>,
}

impl ResourceSchedule {
    pub fn new(operator_type: String, limit: u32) -> Self {
        Self {
            operator_type,
            limit,
            busy_periods: Vec::new(),
        }
    }

    /// Number of reserved windows covering `cycle`.
    pub fn usage_at(&self, cycle: u32) -> u32 {
        let started = self.busy_periods.partition_point(|(s, _)| *s <= cycle);
        self.busy_periods[..started]
            .iter()
            .filter(|(_, end)| *end > cycle)
            .count() as u32
    }

    /// Reserve one instance for `[start, start + latency)` and return the end.
    ///
    /// Zero-latency windows are empty and reserve nothing. Returns None, leaving
    /// the schedule unchanged, if the end does not fit in a `u32` cycle.
    pub fn reserve(&mut self, start: u32, latency: u32) -> Option<u32> {
        let end = start.checked_add(latency)?;
        if latency == 0 {
            return Some(end);
        }
        // Insert after existing windows with the same start to keep insertion order stable
        let idx = self.busy_periods.partition_point(|(s, _)| *s <= start);
        self.busy_periods.insert(idx, (start, end));
        Some(end)
    }

    /// First cycle in `[start, end)` at which every instance is occupied,
    /// with the earliest end among the windows covering it.
    ///
    /// Sweeps the windows that start inside the range in order, keeping the
    /// ends of the windows still open in a min-heap. Usage only rises where a
    /// window starts, so `start` and those window starts are the only candidates.
    fn first_saturated_cycle(&self, start: u32, end: u32) -> Option<(u32, Option<u32>)> {
        let first_inside = self.busy_periods.partition_point(|(s, _)| *s <= start);
        let mut open: BinaryHeap<Reverse<u32>> = self.busy_periods[..first_inside]
            .iter()
            .filter(|(_, e)| *e > start)
            .map(|(_, e)| Reverse(*e))
            .collect();
        let earliest_release = |open: &BinaryHeap<Reverse<u32>>| open.peek().map(|r| r.0);

        if open.len() as u32 >= self.limit {
            return Some((start, earliest_release(&open)));
        }

        for &(s, e) in &self.busy_periods[first_inside..] {
            if s >= end {
                break;
            }
            while open.peek().is_some_and(|Reverse(closed)| *closed <= s) {
                open.pop();
            }
            open.push(Reverse(e));
            if open.len() as u32 >= self.limit {
                return Some((s, earliest_release(&open)));
            }
        }
        None
    }

    /// Check if an instance is free for the full window starting at `start`.
    pub fn is_available(&self, start: u32, latency: u32) -> bool {
        latency == 0
            || self
                .first_saturated_cycle(start, start.saturating_add(latency))
                .is_none()
    }

    /// Find the earliest cycle at or after `from` where a window of `latency`
    /// cycles fits.
    ///
    /// When a saturated cycle blocks the candidate window, no start before the
    /// earliest end among the windows covering that cycle can succeed, so the
    /// search jumps straight there. Requires `limit >= 1`.
    pub fn next_available_time(&self, from: u32, latency: u32) -> u32 {
        if latency == 0 {
            return from;
        }

        let mut candidate = from;
        while let Some((_, release)) =
            self.first_saturated_cycle(candidate, candidate.saturating_add(latency))
        {
            match release {
                Some(release) => candidate = release,
                // Saturated with nothing reserved: only a limit of 0 gets here
                None => break,
            }
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_schedule() {
        let schedule = ResourceSchedule::new("mem".to_string(), 1);
        assert_eq!(schedule.next_available_time(5, 3), 5);
        assert!(schedule.is_available(0, 10));
    }

    #[test]
    fn test_single_instance_serializes() {
        let mut schedule = ResourceSchedule::new("mem".to_string(), 1);
        schedule.reserve(0, 1);

        assert!(!schedule.is_available(0, 1));
        assert_eq!(schedule.next_available_time(0, 1), 1);
    }

    #[test]
    fn test_window_must_fit_entirely() {
        let mut schedule = ResourceSchedule::new("mem".to_string(), 1);
        schedule.reserve(4, 2); // busy [4, 6)

        assert!(schedule.is_available(1, 3)); // [1, 4) ends before
        assert!(!schedule.is_available(2, 3)); // [2, 5) overlaps at 4
        assert_eq!(schedule.next_available_time(2, 3), 6);
        assert_eq!(schedule.next_available_time(0, 4), 0);
    }

    #[test]
    fn test_limit_allows_overlap() {
        let mut schedule = ResourceSchedule::new("alu".to_string(), 2);
        schedule.reserve(0, 3);
        assert!(schedule.is_available(1, 3));

        schedule.reserve(1, 3);
        assert_eq!(schedule.usage_at(2), 2);
        assert_eq!(schedule.usage_at(3), 1);
        // First window frees at 3
        assert_eq!(schedule.next_available_time(0, 2), 3);
    }

    #[test]
    fn test_gap_between_reservations() {
        let mut schedule = ResourceSchedule::new("mem".to_string(), 1);
        schedule.reserve(0, 2);
        schedule.reserve(5, 2);

        // [2, 5) is free: a 3-cycle window fits, a 4-cycle window does not
        assert_eq!(schedule.next_available_time(0, 3), 2);
        assert_eq!(schedule.next_available_time(0, 4), 7);
    }

    #[test]
    fn test_zero_latency_reserves_nothing() {
        let mut schedule = ResourceSchedule::new("wire".to_string(), 1);
        schedule.reserve(0, 0);

        assert!(schedule.busy_periods.is_empty());
        assert!(schedule.is_available(0, 1));
    }

    #[test]
    fn test_windows_closing_inside_the_range_free_an_instance() {
        let mut schedule = ResourceSchedule::new("alu".to_string(), 2);
        schedule.reserve(0, 2);
        schedule.reserve(2, 2);
        schedule.reserve(1, 1);
        assert_eq!(schedule.busy_periods, vec![(0, 2), (1, 2), (2, 4)]);

        // Cycle 1 is full; from cycle 2 on only [2, 4) is open
        assert!(!schedule.is_available(1, 1));
        assert!(schedule.is_available(2, 2));
        assert_eq!(schedule.next_available_time(0, 3), 2);
        assert_eq!(schedule.usage_at(1), 2);
        assert_eq!(schedule.usage_at(2), 1);
    }

    #[test]
    fn test_reserve_rejects_window_past_cycle_range() {
        let mut schedule = ResourceSchedule::new("mem".to_string(), 1);
        assert_eq!(schedule.reserve(3_000_000_000, 3_000_000_000), None);
        assert!(schedule.busy_periods.is_empty());

        assert_eq!(schedule.reserve(0, 3_000_000_000), Some(3_000_000_000));
        assert_eq!(schedule.reserve(u32::MAX, 0), Some(u32::MAX));
        // Candidate windows reaching past the cycle range are clipped while searching
        assert_eq!(
            schedule.next_available_time(1, 3_000_000_000),
            3_000_000_000
        );
    }

    #[test]
    fn test_busy_periods_stay_sorted() {
        let mut schedule = ResourceSchedule::new("mem".to_string(), 3);
        schedule.reserve(7, 1);
        schedule.reserve(2, 1);
        schedule.reserve(4, 1);

        assert_eq!(schedule.busy_periods, vec![(2, 3), (4, 5), (7, 8)]);
    }
}
