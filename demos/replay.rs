use candles::{
    decode_instrument_event, decode_quote_event, Aggregator, Isin, ManualClock, Settings,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

// A short recorded session: instrument messages and quotes as they came off
// the wire, each with the time it was received.
const SESSION: &[(&str, &str)] = &[
    (
        "13:00:01",
        r#"{"type":"ADD","data":{"isin":"ABCD","description":"some instrument"}}"#,
    ),
    ("13:00:05", r#"{"data":{"isin":"ABCD","price":10}}"#),
    ("13:00:06", r#"{"data":{"isin":"ABCD","price":11}}"#),
    ("13:00:13", r#"{"data":{"isin":"ABCD","price":15}}"#),
    ("13:00:19", r#"{"data":{"isin":"ABCD","price":11}}"#),
    ("13:00:32", r#"{"data":{"isin":"ABCD","price":13}}"#),
    ("13:00:40", r#"{"data":{"isin":"EFGH","price":99}}"#),
    ("13:00:49", r#"{"data":{"isin":"ABCD","price":12}}"#),
    ("13:00:57", r#"{"data":{"isin":"ABCD","price":12}}"#),
    ("13:01:00", r#"{"data":{"isin":"ABCD","price":9}}"#),
];

fn at(time: &str) -> DateTime<Utc> {
    let mut parts = time.split(':').map(|part| part.parse::<u32>().unwrap());
    let (h, m, s) = (
        parts.next().unwrap(),
        parts.next().unwrap(),
        parts.next().unwrap(),
    );
    Utc.ymd(2019, 3, 5).and_hms(h, m, s)
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .with_utc_timestamps()
        .init()
        .unwrap();

    let settings = Settings::from_env().unwrap();
    let clock = Arc::new(ManualClock::new(at("13:00:00")));
    let aggregator = Aggregator::with_clock(settings, clock.clone()).unwrap();

    for (time, message) in SESSION {
        clock.set(at(time));
        if let Ok(event) = decode_instrument_event(message) {
            aggregator.apply(event);
        } else {
            aggregator.on_quote_event(decode_quote_event(message).unwrap());
        }
    }

    // nothing else arrives, the sweep closes the 13:01 bar
    clock.set(at("13:02:30"));
    aggregator.sweep();

    for candle in aggregator.history(&Isin::new("ABCD")) {
        println!(
            "{} - {}  open {}  high {}  low {}  close {}  ({} samples)",
            candle.open_timestamp.format("%H:%M"),
            candle.close_timestamp.format("%H:%M"),
            candle.open_price,
            candle.high_price,
            candle.low_price,
            candle.closing_price,
            candle.samples
        );
    }
}
