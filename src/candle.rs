use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Price;

/// OHLC summary of the samples received for one instrument in one interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Candlestick {
    pub open_timestamp: DateTime<Utc>,
    pub close_timestamp: DateTime<Utc>,
    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub closing_price: Price,
    /// Number of samples compacted into this candlestick.
    pub samples: usize,
}
