/// Per-slice counts over the last `N` buckets, stored in a circular buffer.
///
/// Slot `bucket_index % N` holds the count of `bucket_index` for every
/// bucket in the window `[head - N + 1, head]`. Older buckets are not
/// representable and count as zero. Slots are zeroed when the head
/// advances past them, so [`BucketRing::sliding_sum`] is always the plain
/// sum of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRing {
    counts: Vec<i64>,
    head_bucket_index: u64,
}

impl BucketRing {
    /// Creates an all-zero ring whose head is `head_bucket_index`.
    /// A capacity of zero is treated as one.
    pub fn new(num_buckets: usize, head_bucket_index: u64) -> Self {
        Self {
            counts: vec![0; num_buckets.max(1)],
            head_bucket_index,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.counts.len()
    }

    pub fn head_bucket_index(&self) -> u64 {
        self.head_bucket_index
    }

    fn slot(&self, bucket_index: u64) -> usize {
        (bucket_index % self.counts.len() as u64) as usize
    }

    /// Moves the head forward to `target_index`, zeroing the buckets that
    /// fall out of the window. Targets at or behind the head are ignored.
    pub fn advance_to(&mut self, target_index: u64) {
        if target_index <= self.head_bucket_index {
            return;
        }
        let steps = (target_index - self.head_bucket_index).min(self.counts.len() as u64);
        for i in 1..=steps {
            let slot = self.slot(self.head_bucket_index + i);
            self.counts[slot] = 0;
        }
        self.head_bucket_index = target_index;
    }

    /// Adds `delta` to the head bucket, saturating at `i64::MAX`.
    /// Non-positive deltas are ignored; counts never decrease.
    pub fn increment_current(&mut self, delta: i64) {
        if delta <= 0 {
            return;
        }
        let slot = self.slot(self.head_bucket_index);
        self.counts[slot] = self.counts[slot].saturating_add(delta);
    }

    pub fn current_count(&self) -> i64 {
        self.counts[self.slot(self.head_bucket_index)]
    }

    /// Sum of the window `[head - N + 1, head]`, including the bucket
    /// currently being filled.
    pub fn sliding_sum(&self) -> i64 {
        self.counts.iter().fold(0i64, |acc, c| acc.saturating_add(*c))
    }

    /// Sliding sum of the window ending at `head_bucket_index`, read
    /// without moving the ring.
    pub fn sliding_sum_at(&self, head_bucket_index: u64) -> i64 {
        let span = self.counts.len() as u64 - 1;
        (head_bucket_index.saturating_sub(span)..=head_bucket_index)
            .map(|bucket| self.count_at(bucket))
            .fold(0i64, |acc, c| acc.saturating_add(c))
    }

    pub fn is_all_zero(&self) -> bool {
        self.counts.iter().all(|c| *c == 0)
    }

    /// Count recorded for an absolute bucket; zero outside the window.
    pub fn count_at(&self, bucket_index: u64) -> i64 {
        if bucket_index > self.head_bucket_index
            || self.head_bucket_index - bucket_index >= self.counts.len() as u64
        {
            return 0;
        }
        self.counts[self.slot(bucket_index)]
    }

    /// Window counts ordered from the oldest bucket to the head.
    pub fn counts_oldest_first(&self) -> Vec<i64> {
        (0..self.counts.len() as u64)
            .rev()
            .map(|back| {
                self.head_bucket_index
                    .checked_sub(back)
                    .map_or(0, |bucket| self.count_at(bucket))
            })
            .collect()
    }

    /// True when no bucket of this ring is still inside a window whose
    /// head is `current_bucket`.
    pub fn is_stale(&self, current_bucket: u64) -> bool {
        current_bucket.saturating_sub(self.head_bucket_index) >= self.counts.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_land_in_head_bucket() {
        let mut ring = BucketRing::new(3, 5);
        ring.increment_current(2);
        ring.increment_current(1);
        assert_eq!(ring.current_count(), 3);
        assert_eq!(ring.count_at(5), 3);
        assert_eq!(ring.sliding_sum(), 3);
    }

    #[test]
    fn advance_keeps_buckets_still_in_window() {
        let mut ring = BucketRing::new(3, 0);
        ring.increment_current(3);
        ring.advance_to(1);
        ring.increment_current(1);
        assert_eq!(ring.counts_oldest_first(), vec![0, 3, 1]);
        assert_eq!(ring.sliding_sum(), 4);

        // bucket 0 leaves the window at head 3, bucket 1 stays
        ring.advance_to(3);
        ring.increment_current(1);
        assert_eq!(ring.counts_oldest_first(), vec![1, 0, 1]);
        assert_eq!(ring.sliding_sum(), 2);
    }

    #[test]
    fn advance_past_whole_window_clears_ring() {
        let mut ring = BucketRing::new(2, 10);
        ring.increment_current(5);
        ring.advance_to(11);
        ring.increment_current(7);
        ring.advance_to(100);
        assert!(ring.is_all_zero());
        assert_eq!(ring.head_bucket_index(), 100);
        assert_eq!(ring.sliding_sum(), 0);
    }

    #[test]
    fn backwards_advance_is_ignored() {
        let mut ring = BucketRing::new(2, 4);
        ring.increment_current(1);
        ring.advance_to(2);
        ring.increment_current(1);
        assert_eq!(ring.head_bucket_index(), 4);
        assert_eq!(ring.count_at(4), 2);
        assert_eq!(ring.count_at(2), 0);
    }

    #[test]
    fn counts_saturate() {
        let mut ring = BucketRing::new(2, 0);
        ring.increment_current(i64::MAX);
        ring.increment_current(1);
        assert_eq!(ring.current_count(), i64::MAX);
        ring.advance_to(1);
        ring.increment_current(i64::MAX);
        assert_eq!(ring.sliding_sum(), i64::MAX);
        ring.increment_current(-5);
        assert_eq!(ring.current_count(), i64::MAX);
    }

    #[test]
    fn zero_capacity_behaves_as_single_bucket() {
        let mut ring = BucketRing::new(0, 0);
        assert_eq!(ring.num_buckets(), 1);
        ring.increment_current(1);
        ring.advance_to(1);
        assert!(ring.is_all_zero());
    }

    #[test]
    fn staleness_tracks_window_span() {
        let ring = BucketRing::new(2, 3);
        assert!(!ring.is_stale(3));
        assert!(!ring.is_stale(4));
        assert!(ring.is_stale(5));
        assert!(!ring.is_stale(1));
    }

    #[test]
    fn sum_at_later_head_leaves_ring_untouched() {
        let mut ring = BucketRing::new(3, 0);
        ring.increment_current(3);
        ring.advance_to(1);
        ring.increment_current(1);

        assert_eq!(ring.sliding_sum_at(1), 4);
        assert_eq!(ring.sliding_sum_at(2), 4);
        assert_eq!(ring.sliding_sum_at(3), 1);
        assert_eq!(ring.sliding_sum_at(4), 0);
        assert_eq!(ring.head_bucket_index(), 1);
        assert_eq!(ring.sliding_sum(), 4);
    }

    #[test]
    fn early_window_reports_missing_buckets_as_zero() {
        let mut ring = BucketRing::new(4, 1);
        ring.increment_current(2);
        assert_eq!(ring.counts_oldest_first(), vec![0, 0, 0, 2]);
    }
}
