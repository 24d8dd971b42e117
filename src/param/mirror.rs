use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::{
    param::{bank::ParamBank, controller::ControllerId, ids::ParamId},
    Number,
};

/// Lock-free copy of every parameter's ratio and controller, written by the
/// audio thread after each block and read from anywhere.
#[derive(Debug)]
pub struct ParamMirror {
    ratios: Vec<AtomicU64>,
    controllers: Vec<AtomicU8>,
}

impl ParamMirror {
    pub fn new(bank: &ParamBank) -> Self {
        let mirror = Self {
            ratios: ParamId::all().map(|_| AtomicU64::new(0)).collect(),
            controllers: ParamId::all().map(|_| AtomicU8::new(ControllerId::NONE.0)).collect(),
        };
        mirror.store_all(bank);
        mirror
    }

    pub fn ratio(&self, id: ParamId) -> Number {
        self.ratios
            .get(id.index())
            .map_or(0.0, |ratio| Number::from_bits(ratio.load(Ordering::Relaxed)))
    }

    pub fn controller_id(&self, id: ParamId) -> ControllerId {
        self.controllers
            .get(id.index())
            .map_or(ControllerId::NONE, |controller| {
                ControllerId(controller.load(Ordering::Relaxed))
            })
    }

    pub fn store(&self, id: ParamId, bank: &ParamBank) {
        let index = id.index();

        if let (Some(ratio), Some(controller)) = (self.ratios.get(index), self.controllers.get(index)) {
            ratio.store(bank.ratio(id).to_bits(), Ordering::Relaxed);
            controller.store(bank.controller_id(id).0, Ordering::Relaxed);
        }
    }

    pub fn store_all(&self, bank: &ParamBank) {
        for id in ParamId::all() {
            self.store(id, bank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn readers_see_stored_ratios() {
        let mut bank = ParamBank::new(16, 44_100.0);
        let mirror = Arc::new(ParamMirror::new(&bank));

        assert!((mirror.ratio(ParamId::MIX) - 1.0).abs() < 1e-12);

        bank.set_ratio(ParamId::FM, 0.375);
        bank.assign_controller(ParamId::FM, ControllerId(11));
        mirror.store(ParamId::FM, &bank);

        let reader = Arc::clone(&mirror);
        let (ratio, controller) = thread::spawn(move || {
            (reader.ratio(ParamId::FM), reader.controller_id(ParamId::FM))
        })
        .join()
        .unwrap();

        assert!((ratio - 0.375).abs() < 1e-12);
        assert_eq!(controller, ControllerId(11));
    }
}
