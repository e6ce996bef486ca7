use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{Aggregator, Clock, ConfigError};

/// Periodically closes the buckets of instruments that stopped quoting.
pub struct Sweeper<C: Clock> {
    aggregator: Arc<Aggregator<C>>,
    period: Duration,
}

impl<C: Clock + 'static> Sweeper<C> {
    /// Fails on a zero period, which would sweep in a busy loop.
    pub fn new(aggregator: Arc<Aggregator<C>>, period: Duration) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::SweepPeriod);
        }
        Ok(Sweeper { aggregator, period })
    }

    /// Sweep once per period, forever. The first sweep runs immediately.
    pub async fn run(self) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let flushed = self.aggregator.sweep();
            if flushed > 0 {
                log::debug!("Sweep closed {} idle candlesticks.", flushed);
            } else {
                log::trace!("Sweep found no idle buckets.");
            }
        }
    }

    /// Run on the current tokio runtime. Abort the handle to stop sweeping.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
