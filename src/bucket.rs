use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

use crate::{
    bracket_open, close_boundary, minute_key, Candlestick, MinuteKey, OverflowPolicy, Sample,
};

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Added,
    /// The bucket was full and the overflow policy discarded this sample. For
    /// `DropOldest` that is the evicted head, the new sample was added.
    Overflow(Sample),
    /// The sample belongs to another bracket and was not added. The bucket has
    /// to be rolled over first.
    Mismatch,
}

/// Accumulates the samples of one instrument for the current interval.
#[derive(Debug)]
pub struct MinuteBucket {
    interval: Duration,
    key: MinuteKey,
    opened_at: DateTime<Utc>,
    samples: VecDeque<Sample>,
    capacity: usize,
    overflow: OverflowPolicy,
    // Close timestamp of the last candlestick compacted from this bucket.
    closed_through: Option<DateTime<Utc>>,
    retired: bool,
}

impl MinuteBucket {
    pub fn new(
        interval: Duration,
        capacity: usize,
        overflow: OverflowPolicy,
        time: DateTime<Utc>,
    ) -> Self {
        MinuteBucket {
            interval,
            key: minute_key(interval, time),
            opened_at: bracket_open(interval, time),
            samples: VecDeque::with_capacity(capacity),
            capacity,
            overflow,
            closed_through: None,
            retired: false,
        }
    }

    pub fn key(&self) -> MinuteKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn last_sample_time(&self) -> Option<DateTime<Utc>> {
        self.samples.back().map(|sample| sample.time)
    }

    pub fn add(&mut self, sample: Sample) -> AddResult {
        // Keys repeat every day, the bracket start does not.
        if minute_key(self.interval, sample.time) != self.key
            || bracket_open(self.interval, sample.time) != self.opened_at
        {
            return AddResult::Mismatch;
        }

        if self.samples.len() >= self.capacity {
            match self.overflow {
                OverflowPolicy::DropNewest => return AddResult::Overflow(sample),
                OverflowPolicy::DropOldest => {
                    let evicted = self.samples.pop_front();
                    self.samples.push_back(sample);
                    if let Some(evicted) = evicted {
                        return AddResult::Overflow(evicted);
                    }
                    return AddResult::Added;
                }
                OverflowPolicy::Unbounded => {}
            }
        }

        self.samples.push_back(sample);
        AddResult::Added
    }

    /// Whether `time` is behind what this bucket already covers: either before
    /// the last candlestick it produced, or before the bracket it is filling.
    /// Rolling over to such a time would close a bracket early.
    pub fn is_late(&self, time: DateTime<Utc>) -> bool {
        if matches!(self.closed_through, Some(closed) if time < closed) {
            return true;
        }
        !self.samples.is_empty() && time < self.opened_at
    }

    pub fn compact(&self) -> Option<Candlestick> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;

        let open_timestamp = bracket_open(self.interval, first.time);
        let mut high_price = first.price;
        let mut low_price = first.price;
        for sample in self.samples.iter() {
            high_price = high_price.max(sample.price);
            low_price = low_price.min(sample.price);
        }

        Some(Candlestick {
            open_timestamp,
            close_timestamp: close_boundary(self.interval, open_timestamp),
            open_price: first.price,
            high_price,
            low_price,
            closing_price: last.price,
            samples: self.samples.len(),
        })
    }

    pub fn reset(&mut self, time: DateTime<Utc>) {
        self.samples.clear();
        self.key = minute_key(self.interval, time);
        self.opened_at = bracket_open(self.interval, time);
    }

    /// Compact and reset in one step. Callers hold the bucket's lock across
    /// this call.
    pub fn flush_and_reset(&mut self, time: DateTime<Utc>) -> Option<Candlestick> {
        let candlestick = self.compact();
        if let Some(candlestick) = &candlestick {
            self.closed_through = Some(candlestick.close_timestamp);
        }
        self.reset(time);
        candlestick
    }

    /// Drops all pending samples and marks the bucket dead. Returns the number
    /// of samples discarded.
    pub(crate) fn retire(&mut self) -> usize {
        let discarded = self.samples.len();
        self.samples.clear();
        self.retired = true;
        discarded
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.ymd(2019, 3, 5).and_hms(h, m, s)
    }

    fn sample(time: DateTime<Utc>, price: rust_decimal::Decimal) -> Sample {
        Sample { price, time }
    }

    fn bucket(capacity: usize, overflow: OverflowPolicy) -> MinuteBucket {
        MinuteBucket::new(Duration::minutes(1), capacity, overflow, at(13, 0, 0))
    }

    #[test]
    fn compact_ohlc_in_insertion_order() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        // out of timestamp order on purpose, closing follows insertion
        for (s, price) in [(5, dec!(10)), (40, dec!(15)), (20, dec!(8)), (10, dec!(12))] {
            assert_eq!(bucket.add(sample(at(13, 0, s), price)), AddResult::Added);
        }

        let candle = bucket.compact().unwrap();
        assert_eq!(candle.open_price, dec!(10));
        assert_eq!(candle.high_price, dec!(15));
        assert_eq!(candle.low_price, dec!(8));
        assert_eq!(candle.closing_price, dec!(12));
        assert_eq!(candle.open_timestamp, at(13, 0, 0));
        assert_eq!(candle.close_timestamp, at(13, 1, 0));
        assert_eq!(candle.samples, 4);
        // compacting does not consume
        assert_eq!(bucket.len(), 4);
    }

    #[test]
    fn empty_bucket_compacts_to_nothing() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        assert!(bucket.compact().is_none());
        assert!(bucket.flush_and_reset(at(13, 5, 0)).is_none());
        assert!(bucket.last_sample_time().is_none());
    }

    #[test]
    fn mismatch_does_not_add() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        assert_eq!(bucket.add(sample(at(13, 0, 59), dec!(1))), AddResult::Added);
        assert_eq!(bucket.add(sample(at(13, 1, 0), dec!(2))), AddResult::Mismatch);
        assert_eq!(bucket.len(), 1);

        let candle = bucket.flush_and_reset(at(13, 1, 0)).unwrap();
        assert_eq!(candle.closing_price, dec!(1));
        assert!(bucket.is_empty());
        assert_eq!(bucket.key(), minute_key(Duration::minutes(1), at(13, 1, 0)));
        assert_eq!(bucket.add(sample(at(13, 1, 0), dec!(2))), AddResult::Added);
        assert_eq!(bucket.last_sample_time(), Some(at(13, 1, 0)));
    }

    #[test]
    fn late_samples() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        assert!(!bucket.is_late(at(12, 59, 0)));
        let _ = bucket.add(sample(at(13, 0, 10), dec!(1)));
        assert!(bucket.is_late(at(12, 59, 59)));
        assert!(!bucket.is_late(at(13, 1, 0)));

        let _ = bucket.flush_and_reset(at(13, 1, 0));
        assert!(bucket.is_late(at(13, 0, 30)));
        assert!(!bucket.is_late(at(13, 1, 30)));
    }

    #[test]
    fn same_key_next_day_is_a_mismatch() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        let _ = bucket.add(sample(at(13, 0, 1), dec!(1)));
        let tomorrow = at(13, 0, 1) + Duration::days(1);
        assert_eq!(bucket.add(sample(tomorrow, dec!(2))), AddResult::Mismatch);
    }

    #[test]
    fn drop_newest_keeps_open() {
        let mut bucket = bucket(2, OverflowPolicy::DropNewest);
        assert_eq!(bucket.add(sample(at(13, 0, 1), dec!(1))), AddResult::Added);
        assert_eq!(bucket.add(sample(at(13, 0, 2), dec!(2))), AddResult::Added);
        let third = sample(at(13, 0, 3), dec!(3));
        assert_eq!(bucket.add(third), AddResult::Overflow(third));
        assert_eq!(bucket.len(), 2);
        let candle = bucket.compact().unwrap();
        assert_eq!(candle.open_price, dec!(1));
        assert_eq!(candle.closing_price, dec!(2));
    }

    #[test]
    fn drop_oldest_keeps_close() {
        let mut bucket = bucket(2, OverflowPolicy::DropOldest);
        let first = sample(at(13, 0, 1), dec!(1));
        assert_eq!(bucket.add(first), AddResult::Added);
        assert_eq!(bucket.add(sample(at(13, 0, 2), dec!(2))), AddResult::Added);
        assert_eq!(bucket.add(sample(at(13, 0, 3), dec!(3))), AddResult::Overflow(first));
        let candle = bucket.compact().unwrap();
        assert_eq!(candle.open_price, dec!(2));
        assert_eq!(candle.closing_price, dec!(3));
        assert_eq!(candle.samples, 2);
    }

    #[test]
    fn unbounded_grows() {
        let mut bucket = bucket(2, OverflowPolicy::Unbounded);
        for s in 0..10 {
            assert_eq!(bucket.add(sample(at(13, 0, s), dec!(1))), AddResult::Added);
        }
        assert_eq!(bucket.len(), 10);
    }

    #[test]
    fn retire_discards() {
        let mut bucket = bucket(60, OverflowPolicy::DropNewest);
        let _ = bucket.add(sample(at(13, 0, 1), dec!(1)));
        let _ = bucket.add(sample(at(13, 0, 2), dec!(1)));
        assert_eq!(bucket.retire(), 2);
        assert!(bucket.is_retired());
        assert!(bucket.compact().is_none());
    }
}
