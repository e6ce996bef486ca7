use fxhash::FxHashMap;
use parking_lot::RwLock;

use crate::{Instrument, Isin};

/// The set of instruments currently accepted for aggregation.
pub struct InstrumentRegistry {
    instruments: RwLock<FxHashMap<Isin, Instrument>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        InstrumentRegistry {
            instruments: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns false if the instrument was already registered. The existing
    /// entry is kept as is.
    pub fn insert(&self, instrument: Instrument) -> bool {
        let mut instruments = self.instruments.write();
        if instruments.contains_key(&instrument.isin) {
            return false;
        }
        instruments.insert(instrument.isin.clone(), instrument);
        true
    }

    pub fn remove(&self, isin: &Isin) -> Option<Instrument> {
        self.instruments.write().remove(isin)
    }

    pub fn contains(&self, isin: &Isin) -> bool {
        self.instruments.read().contains_key(isin)
    }

    pub fn get(&self, isin: &Isin) -> Option<Instrument> {
        self.instruments.read().get(isin).cloned()
    }

    /// Snapshot of the registered ids. Changes made after the call are not
    /// reflected.
    pub fn ids(&self) -> Vec<Isin> {
        self.instruments.read().keys().cloned().collect()
    }

    pub fn instruments(&self) -> Vec<Instrument> {
        self.instruments.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_are_idempotent() {
        let registry = InstrumentRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.insert(Instrument::new("ABCD", "first")));
        assert!(!registry.insert(Instrument::new("ABCD", "second")));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(&Isin::new("ABCD")).unwrap().description,
            "first"
        );

        assert!(registry.remove(&Isin::new("ABCD")).is_some());
        assert!(registry.remove(&Isin::new("ABCD")).is_none());
        assert!(!registry.contains(&Isin::new("ABCD")));
    }

    #[test]
    fn ids_snapshot() {
        let registry = InstrumentRegistry::new();
        for name in ["ABCD", "EFGH", "IJKL"] {
            registry.insert(Instrument::new(name, "instrument"));
        }
        let mut ids = registry.ids();
        registry.remove(&Isin::new("EFGH"));
        ids.sort();
        assert_eq!(ids, vec![Isin::new("ABCD"), Isin::new("EFGH"), Isin::new("IJKL")]);
        assert_eq!(registry.instruments().len(), 2);
    }
}
