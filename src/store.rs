use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;

use crate::{Candlestick, CandlestickReader, Isin};

/// The Store keeps the most recent candlesticks of every registered
/// instrument, oldest first.
pub struct CandlestickStore {
    depth: usize,
    slots: RwLock<FxHashMap<Isin, Mutex<VecDeque<Candlestick>>>>,
}

impl CandlestickStore {
    pub fn new(depth: usize) -> Self {
        CandlestickStore {
            depth: depth.max(1),
            slots: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn create_slot(&self, isin: &Isin) {
        let mut slots = self.slots.write();
        if !slots.contains_key(isin) {
            slots.insert(isin.clone(), Mutex::new(VecDeque::with_capacity(self.depth)));
        }
    }

    pub fn remove_slot(&self, isin: &Isin) {
        self.slots.write().remove(isin);
    }

    pub fn has(&self, isin: &Isin) -> bool {
        self.slots.read().contains_key(isin)
    }

    /// Appends to the tail and evicts from the head down to the depth. Returns
    /// false if the instrument has no slot, the candlestick is dropped then.
    pub fn append(&self, isin: &Isin, candlestick: Candlestick) -> bool {
        let slots = self.slots.read();
        let slot = match slots.get(isin) {
            Some(slot) => slot,
            None => {
                log::warn!(
                    "No history slot for {}, dropping candlestick opened at {}.",
                    isin,
                    candlestick.open_timestamp
                );
                return false;
            }
        };

        let mut history = slot.lock();
        history.push_back(candlestick);
        while history.len() > self.depth {
            history.pop_front();
        }
        true
    }

    pub fn read(&self, isin: &Isin) -> Vec<Candlestick> {
        self.slots
            .read()
            .get(isin)
            .map(|slot| slot.lock().iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, isin: &Isin) -> usize {
        self.slots
            .read()
            .get(isin)
            .map(|slot| slot.lock().len())
            .unwrap_or_default()
    }
}

impl CandlestickReader for CandlestickStore {
    fn candlesticks(&self, isin: &Isin) -> Vec<Candlestick> {
        self.read(isin)
    }

    fn is_registered(&self, isin: &Isin) -> bool {
        self.has(isin)
    }
}
