#![deny(unused_must_use)]
#![deny(unsafe_code)]
#![allow(clippy::new_without_default)]

mod aggregator;
mod bucket;
mod candle;
mod clock;
mod instrument;
mod registry;
mod settings;
mod store;
mod sweeper;
#[cfg(feature = "serde")]
mod wire;

use std::sync::Arc;

pub use aggregator::*;
pub use bucket::*;
pub use candle::*;
pub use clock::*;
pub use instrument::*;
pub use registry::*;
pub use settings::*;
pub use store::*;
pub use sweeper::*;
#[cfg(feature = "serde")]
pub use wire::*;

use tokio::sync::mpsc::UnboundedReceiver;

/// Wires the instrument and quote feeds to an aggregator and keeps its idle
/// buckets swept.
pub struct Service<C: Clock = SystemClock> {
    aggregator: Arc<Aggregator<C>>,
    sweeper: Sweeper<C>,
}

impl Service<SystemClock> {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock + 'static> Service<C> {
    pub fn with_clock(settings: Settings, clock: C) -> Result<Self, ConfigError> {
        let sweep_period = settings
            .sweep_period
            .to_std()
            .map_err(|_| ConfigError::SweepPeriod)?;
        let aggregator = Arc::new(Aggregator::with_clock(settings, clock)?);
        let sweeper = Sweeper::new(aggregator.clone(), sweep_period)?;

        Ok(Service { aggregator, sweeper })
    }

    /// Handle for readers, and for producers other than the feeds passed to
    /// [`Service::run`].
    pub fn aggregator(&self) -> Arc<Aggregator<C>> {
        self.aggregator.clone()
    }

    /// Consume both feeds until they close. Sweeps idle buckets meanwhile.
    pub async fn run(
        self,
        mut instruments: UnboundedReceiver<InstrumentEvent>,
        mut quotes: UnboundedReceiver<QuoteEvent>,
    ) {
        let Service {
            aggregator,
            sweeper,
        } = self;
        let sweeper = sweeper.spawn();
        log::info!(
            "Aggregating {} candlesticks, keeping {} per instrument.",
            aggregator.interval(),
            aggregator.settings().history_depth
        );

        futures_util::join!(
            async {
                while let Some(event) = instruments.recv().await {
                    aggregator.apply(event);
                }
                log::info!("Instrument feed closed.");
            },
            async {
                while let Some(event) = quotes.recv().await {
                    log::trace!("Quote: {:?}", event.data);
                    aggregator.on_quote_event(event);
                }
                log::info!("Quote feed closed.");
            }
        );

        sweeper.abort();
    }
}
