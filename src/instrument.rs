use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

pub type Price = Decimal;

/// Identifier of a tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Isin(String);

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Isin {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Isin::new)
    }
}

impl Isin {
    pub fn new<R: AsRef<str>>(name: R) -> Self {
        Isin(name.as_ref().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Isin {
    fn from(name: &str) -> Self {
        Isin::new(name)
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instrument {
    pub isin: Isin,
    pub description: String,
}

impl Instrument {
    pub fn new<R: AsRef<str>>(isin: R, description: impl Into<String>) -> Self {
        Instrument {
            isin: Isin::new(isin),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum EventKind {
    Add,
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EventKind::Add => "ADD",
                EventKind::Delete => "DELETE",
            }
        )
    }
}

/// An instrument appearing on or disappearing from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrumentEvent {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: EventKind,
    pub data: Instrument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quote {
    pub isin: Isin,
    pub price: Price,
}

impl Quote {
    pub fn new<R: AsRef<str>>(isin: R, price: Price) -> Self {
        Quote {
            isin: Isin::new(isin),
            price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuoteEvent {
    pub data: Quote,
}

/// A quote paired with the time it reached the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedQuote {
    pub quote: Quote,
    pub time: DateTime<Utc>,
}

impl TimedQuote {
    pub fn new(quote: Quote, time: DateTime<Utc>) -> Self {
        TimedQuote { quote, time }
    }

    pub fn sample(&self) -> Sample {
        Sample {
            price: self.quote.price,
            time: self.time,
        }
    }
}

/// What a bucket keeps of a timed quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub price: Price,
    pub time: DateTime<Utc>,
}
