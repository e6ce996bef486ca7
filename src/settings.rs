use chrono::Duration;
use std::{env, str::FromStr};
use thiserror::Error;

const MAX_INTERVAL_MINUTES: i64 = 24 * 60;
const MAX_SWEEP_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Interval must be a whole number of minutes between 1 and 1440.")]
    Interval,
    #[error("History depth must be at least 1.")]
    HistoryDepth,
    #[error("Sweep period must be positive and at most a week.")]
    SweepPeriod,
    #[error("Invalid value {value:?} for {var}.")]
    Invalid { var: &'static str, value: String },
}

/// What a minute bucket does with a sample once it holds as many samples as
/// the interval has seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Keep the bucket as is and discard the incoming sample.
    DropNewest,
    /// Discard the earliest sample to make room. Moves the open price.
    DropOldest,
    /// Never discard, the bucket grows past its nominal capacity.
    Unbounded,
}

impl FromStr for OverflowPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop-newest" => Ok(OverflowPolicy::DropNewest),
            "drop-oldest" => Ok(OverflowPolicy::DropOldest),
            "unbounded" => Ok(OverflowPolicy::Unbounded),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Settings {
    /// Width of one candlestick.
    pub interval: Duration,
    /// Number of candlesticks retained per instrument.
    pub history_depth: usize,
    /// How often idle buckets are swept.
    pub sweep_period: Duration,
    pub overflow: OverflowPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interval: Duration::minutes(1),
            history_depth: 30,
            sweep_period: Duration::minutes(2),
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

impl Settings {
    /// Read settings from `CANDLES_*` environment variables, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        // Range checked first, chrono panics on durations past its bounds.
        if let Some(minutes) = parse::<i64, _>(&lookup, "CANDLES_INTERVAL_MINUTES")? {
            if !(1..=MAX_INTERVAL_MINUTES).contains(&minutes) {
                return Err(ConfigError::Interval);
            }
            settings.interval = Duration::minutes(minutes);
        }
        // The sweep follows the interval unless set explicitly.
        settings.sweep_period = settings.interval * 2;
        if let Some(depth) = parse::<usize, _>(&lookup, "CANDLES_HISTORY_DEPTH")? {
            settings.history_depth = depth;
        }
        if let Some(seconds) = parse::<i64, _>(&lookup, "CANDLES_SWEEP_SECONDS")? {
            if !(1..=MAX_SWEEP_SECONDS).contains(&seconds) {
                return Err(ConfigError::SweepPeriod);
            }
            settings.sweep_period = Duration::seconds(seconds);
        }
        if let Some(policy) = parse::<OverflowPolicy, _>(&lookup, "CANDLES_OVERFLOW")? {
            settings.overflow = policy;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let minutes = self.interval.num_minutes();
        let whole = (1..=MAX_INTERVAL_MINUTES).contains(&minutes)
            && self.interval == Duration::minutes(minutes);
        if !whole {
            return Err(ConfigError::Interval);
        }
        if self.history_depth == 0 {
            return Err(ConfigError::HistoryDepth);
        }
        if self.sweep_period <= Duration::zero()
            || self.sweep_period > Duration::seconds(MAX_SWEEP_SECONDS)
        {
            return Err(ConfigError::SweepPeriod);
        }
        Ok(())
    }

    /// Nominal number of samples a bucket holds, one per second of interval.
    pub fn bucket_capacity(&self) -> usize {
        self.interval.num_seconds().max(1) as usize
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
