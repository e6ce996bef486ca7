use chrono::{DateTime, Duration, Utc};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    AddResult, Candlestick, CandlestickStore, Clock, ConfigError, EventKind, Instrument,
    InstrumentEvent, InstrumentRegistry, Isin, MinuteBucket, OverflowPolicy, Quote, QuoteEvent,
    Sample, Settings, SystemClock, TimedQuote,
};

/// Read access to candlestick history, for whatever serves queries.
pub trait CandlestickReader: Send + Sync {
    /// History of an instrument, oldest first. Empty if unknown.
    fn candlesticks(&self, isin: &Isin) -> Vec<Candlestick>;
    fn is_registered(&self, isin: &Isin) -> bool;
}

/// Why a quote did not make it into a bucket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejected {
    #[error("Instrument {0} is not registered.")]
    UnknownInstrument(Isin),
    #[error("Quote for {isin} at {time} belongs to an already closed interval.")]
    Late { isin: Isin, time: DateTime<Utc> },
    #[error("Bucket for {isin} is full, discarded sample at {time} ({policy:?}).")]
    Overflow {
        isin: Isin,
        time: DateTime<Utc>,
        policy: OverflowPolicy,
    },
}

type Bucket = Arc<Mutex<MinuteBucket>>;

/// Routes quotes into per instrument minute buckets and moves closed buckets
/// into the store as candlesticks.
pub struct Aggregator<C: Clock = SystemClock> {
    settings: Settings,
    clock: C,
    registry: Arc<InstrumentRegistry>,
    store: Arc<CandlestickStore>,
    buckets: RwLock<FxHashMap<Isin, Bucket>>,
    // Serializes register and deregister.
    lifecycle: Mutex<()>,
}

impl Aggregator<SystemClock> {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Aggregator<C> {
    pub fn with_clock(settings: Settings, clock: C) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Aggregator {
            registry: Arc::new(InstrumentRegistry::new()),
            store: Arc::new(CandlestickStore::new(settings.history_depth)),
            buckets: RwLock::new(FxHashMap::default()),
            lifecycle: Mutex::new(()),
            settings,
            clock,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn interval(&self) -> Duration {
        self.settings.interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<CandlestickStore> {
        &self.store
    }

    pub fn apply(&self, event: InstrumentEvent) {
        log::info!("Instrument to be {}'d: {:?}", event.kind, event.data);
        match event.kind {
            EventKind::Add => self.register(event.data),
            EventKind::Delete => self.deregister(&event.data.isin),
        }
    }

    /// Start accepting quotes for an instrument. No-op if already registered.
    pub fn register(&self, instrument: Instrument) {
        let _lifecycle = self.lifecycle.lock();
        let isin = instrument.isin.clone();
        if !self.registry.insert(instrument) {
            log::debug!("Instrument {} is already registered.", isin);
        }
        self.store.create_slot(&isin);
        self.buckets.write().entry(isin).or_insert_with(|| {
            Arc::new(Mutex::new(MinuteBucket::new(
                self.settings.interval,
                self.settings.bucket_capacity(),
                self.settings.overflow,
                self.clock.now(),
            )))
        });
    }

    /// Stop accepting quotes for an instrument and forget everything about it,
    /// including samples not yet compacted.
    pub fn deregister(&self, isin: &Isin) {
        let _lifecycle = self.lifecycle.lock();
        if self.registry.remove(isin).is_none() {
            log::debug!("Instrument {} is not registered.", isin);
        }
        let bucket = self.buckets.write().remove(isin);
        if let Some(bucket) = bucket {
            // Quotes already holding the bucket finish first, later ones see it
            // retired.
            let discarded = bucket.lock().retire();
            if discarded > 0 {
                log::info!(
                    "Discarded {} pending samples of deregistered instrument {}.",
                    discarded,
                    isin
                );
            }
        }
        // Comes last so candlesticks flushed by in-flight quotes go too.
        self.store.remove_slot(isin);
    }

    pub fn is_registered(&self, isin: &Isin) -> bool {
        self.registry.contains(isin)
    }

    pub fn history(&self, isin: &Isin) -> Vec<Candlestick> {
        self.store.read(isin)
    }

    /// Samples in the instrument's live bucket, `None` if it has none.
    pub fn pending(&self, isin: &Isin) -> Option<Vec<Sample>> {
        let bucket = self.bucket(isin)?;
        let bucket = bucket.lock();
        Some(bucket.samples())
    }

    /// Aggregate a quote stamped with its arrival time.
    ///
    /// Samples reaching the bucket after a later bracket has been opened are
    /// dropped as late. Producers stamping their own times concurrently can
    /// therefore lose samples from just before a boundary; use
    /// [`Aggregator::on_quote`] for those.
    pub fn ingest(&self, quote: TimedQuote) {
        let TimedQuote { quote, time } = quote;
        if let Err(rejected) = self.admit(quote, Some(time)) {
            log_rejection(&rejected);
        }
    }

    /// Aggregate a quote arriving now. The arrival time is taken while holding
    /// the instrument's bucket, so concurrent producers of one instrument get
    /// increasing timestamps in the order their samples are added.
    pub fn on_quote(&self, quote: Quote) {
        if let Err(rejected) = self.admit(quote, None) {
            log_rejection(&rejected);
        }
    }

    pub fn on_quote_event(&self, event: QuoteEvent) {
        self.on_quote(event.data)
    }

    pub(crate) fn admit(&self, quote: Quote, time: Option<DateTime<Utc>>) -> Result<(), Rejected> {
        let Quote { isin, price } = quote;
        if !self.registry.contains(&isin) {
            return Err(Rejected::UnknownInstrument(isin));
        }
        let bucket = match self.bucket(&isin) {
            Some(bucket) => bucket,
            None => return Err(Rejected::UnknownInstrument(isin)),
        };

        // Held from mismatch detection until the sample is in, so a bracket is
        // flushed exactly once no matter how many producers cross it.
        let mut bucket = bucket.lock();
        if bucket.is_retired() {
            return Err(Rejected::UnknownInstrument(isin));
        }

        let time = time.unwrap_or_else(|| self.clock.now());
        let sample = Sample { price, time };
        match bucket.add(sample) {
            AddResult::Added => return Ok(()),
            AddResult::Overflow(discarded) => return Err(self.overflow(isin, discarded)),
            AddResult::Mismatch => {}
        }

        if bucket.is_late(time) {
            return Err(Rejected::Late { isin, time });
        }
        if let Some(candlestick) = bucket.flush_and_reset(time) {
            log::debug!(
                "Closed {} candlestick for {} with {} samples.",
                candlestick.open_timestamp,
                isin,
                candlestick.samples
            );
            self.store.append(&isin, candlestick);
        }

        match bucket.add(sample) {
            AddResult::Added => Ok(()),
            AddResult::Overflow(discarded) => Err(self.overflow(isin, discarded)),
            AddResult::Mismatch => unreachable!("bucket was just reset to the sample's bracket"),
        }
    }

    fn overflow(&self, isin: Isin, discarded: Sample) -> Rejected {
        Rejected::Overflow {
            isin,
            time: discarded.time,
            policy: self.settings.overflow,
        }
    }

    /// Flush every bucket whose last sample is at least one interval old.
    /// Returns the number of candlesticks produced.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut flushed = 0;
        for isin in self.registry.ids() {
            let bucket = match self.bucket(&isin) {
                Some(bucket) => bucket,
                None => continue,
            };
            let mut bucket = bucket.lock();
            if bucket.is_retired() {
                continue;
            }
            let last = match bucket.last_sample_time() {
                Some(last) => last,
                None => continue,
            };
            if now - last < self.settings.interval {
                continue;
            }
            if let Some(candlestick) = bucket.flush_and_reset(now) {
                log::debug!(
                    "Swept idle {} candlestick for {} with {} samples.",
                    candlestick.open_timestamp,
                    isin,
                    candlestick.samples
                );
                if self.store.append(&isin, candlestick) {
                    flushed += 1;
                }
            }
        }
        flushed
    }

    fn bucket(&self, isin: &Isin) -> Option<Bucket> {
        self.buckets.read().get(isin).cloned()
    }
}

fn log_rejection(rejected: &Rejected) {
    match rejected {
        Rejected::UnknownInstrument(_) => log::warn!("Dropping quote: {}", rejected),
        Rejected::Late { .. } => log::warn!("Dropping late quote: {}", rejected),
        Rejected::Overflow { .. } => log::warn!("{}", rejected),
    }
}

impl<C: Clock> CandlestickReader for Aggregator<C> {
    fn candlesticks(&self, isin: &Isin) -> Vec<Candlestick> {
        self.history(isin)
    }

    fn is_registered(&self, isin: &Isin) -> bool {
        Aggregator::is_registered(self, isin)
    }
}
