use thiserror::Error;

use crate::{InstrumentEvent, QuoteEvent};

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode an instrument message such as
/// `{"type":"ADD","data":{"isin":"X","description":"..."}}`. Unknown fields
/// are ignored.
pub fn decode_instrument_event(message: &str) -> Result<InstrumentEvent, WireError> {
    Ok(serde_json::from_str(message)?)
}

/// Decode a quote message such as `{"data":{"isin":"X","price":1.5}}`.
pub fn decode_quote_event(message: &str) -> Result<QuoteEvent, WireError> {
    Ok(serde_json::from_str(message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventKind, Isin};
    use rust_decimal_macros::dec;

    #[test]
    fn instrument_events() {
        let event = decode_instrument_event(
            r#"{"type":"ADD","data":{"isin":"DE000BASF111","description":"BASF","extra":1}}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Add);
        assert_eq!(event.data.isin, Isin::new("DE000BASF111"));
        assert_eq!(event.data.description, "BASF");

        let event =
            decode_instrument_event(r#"{"type":"DELETE","data":{"isin":"X","description":""}}"#)
                .unwrap();
        assert_eq!(event.kind, EventKind::Delete);

        assert!(
            decode_instrument_event(r#"{"type":"RENAME","data":{"isin":"X","description":""}}"#)
                .is_err()
        );
    }

    #[test]
    fn quote_events() {
        let event = decode_quote_event(r#"{"data":{"isin":"X","price":"1017.25"}}"#).unwrap();
        assert_eq!(event.data.isin, Isin::new("X"));
        assert_eq!(event.data.price, dec!(1017.25));

        let event = decode_quote_event(r#"{"data":{"isin":"X","price":12.5}}"#).unwrap();
        assert_eq!(event.data.price, dec!(12.5));

        assert!(decode_quote_event(r#"{"data":{"isin":"X"}}"#).is_err());
    }
}
