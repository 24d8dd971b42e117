use crate::{
    graph::{lfo::Lfo, producer::SignalProducer},
    param::{
        byte::ByteParam,
        controller::ControllerId,
        float::{FloatParam, ParamCtx},
        ids::{MacroParam, ParamId, FLOAT_PARAMS},
    },
    Frequency, Number, Round, Seconds,
};

/// Every synth-level parameter, indexed by [`ParamId`].
///
/// Continuous parameters before the first macro parameter are the ones that
/// may follow LFOs and envelopes (synth-level levels and voice leaders); the
/// rest (macros, envelopes, LFOs) are rendered earlier in each round.
#[derive(Debug, Clone)]
pub struct ParamBank {
    floats: Vec<FloatParam>,
    bytes: Vec<ByteParam>,
}

impl ParamBank {
    pub fn new(block_size: usize, sample_rate: Frequency) -> Self {
        let mut floats = Vec::with_capacity(FLOAT_PARAMS);
        let mut bytes = Vec::new();

        for id in ParamId::all() {
            let descriptor = id.descriptor();

            if id.is_float() {
                floats.push(FloatParam::from_descriptor(descriptor, block_size, sample_rate));
            } else {
                bytes.push(ByteParam::from_descriptor(descriptor));
            }
        }

        Self { floats, bytes }
    }

    /// # Panics
    ///
    /// If `id` is a discrete parameter.
    pub fn float(&self, id: ParamId) -> &FloatParam {
        &self.floats[id.index()]
    }

    /// # Panics
    ///
    /// If `id` is a discrete parameter.
    pub fn float_mut(&mut self, id: ParamId) -> &mut FloatParam {
        &mut self.floats[id.index()]
    }

    /// # Panics
    ///
    /// If `id` is a continuous parameter.
    pub fn byte(&self, id: ParamId) -> &ByteParam {
        &self.bytes[id.index() - FLOAT_PARAMS]
    }

    /// # Panics
    ///
    /// If `id` is a continuous parameter.
    pub fn byte_mut(&mut self, id: ParamId) -> &mut ByteParam {
        &mut self.bytes[id.index() - FLOAT_PARAMS]
    }

    pub fn ratio(&self, id: ParamId) -> Number {
        if id.is_float() {
            self.float(id).ratio()
        } else {
            self.byte(id).ratio()
        }
    }

    pub fn set_ratio(&mut self, id: ParamId, ratio: Number) {
        if id.is_float() {
            self.float_mut(id).set_ratio(ratio);
        } else {
            self.byte_mut(id).set_ratio(ratio);
        }
    }

    pub fn controller_id(&self, id: ParamId) -> ControllerId {
        if id.is_float() {
            self.float(id).controller_id()
        } else {
            self.byte(id).controller_id()
        }
    }

    /// Bind `id` to `controller`. Returns `false` when the parameter cannot
    /// follow that kind of source; the old binding is kept in that case.
    pub fn assign_controller(&mut self, id: ParamId, controller: ControllerId) -> bool {
        if !controller.is_valid() {
            return false;
        }

        if controller.is_signal_source() && !id.accepts_signal_sources() {
            return false;
        }

        if id.is_float() {
            self.float_mut(id).set_controller(controller);
        } else {
            self.byte_mut(id).set_controller(controller);
        }

        true
    }

    /// Push a new value of `controller` into every parameter bound to it.
    pub fn schedule_controller_value(&mut self, time_offset: Seconds, controller: ControllerId, ratio: Number) {
        for param in self.floats.iter_mut() {
            let binding = param.binding();

            if binding.controller == controller {
                let value = param.ratio_to_value(binding.apply(ratio));
                param.schedule_value(time_offset, value);
            }
        }

        for param in self.bytes.iter_mut() {
            let binding = param.binding();

            if binding.controller == controller {
                param.set_ratio(binding.apply(ratio));
            }
        }
    }

    /// Defaults everywhere, every binding removed.
    pub fn reset(&mut self) {
        self.floats.iter_mut().for_each(FloatParam::reset);
        self.bytes.iter_mut().for_each(ByteParam::reset);
    }

    pub fn set_sample_rate(&mut self, sample_rate: Frequency) {
        for param in self.floats.iter_mut() {
            param.set_sample_rate(sample_rate);
        }
    }

    pub fn set_block_size(&mut self, block_size: usize) {
        for param in self.floats.iter_mut() {
            param.set_block_size(block_size);
        }
    }

    /// Render macro, envelope and LFO parameters.
    pub fn render_control_params(&mut self, round: Round, sample_count: usize) {
        let (_, control) = self.floats.split_at_mut(first_control_param());

        for param in control {
            param.produce(ParamCtx::default(), round, sample_count);
        }
    }

    /// Render synth-level levels and voice leaders, after the LFOs.
    pub fn render_leaders(&mut self, round: Round, sample_count: usize, lfos: &[Lfo]) {
        let (leaders, _) = self.floats.split_at_mut(first_control_param());
        let ctx = ParamCtx { leader: None, lfos };

        for param in leaders {
            param.produce(ctx, round, sample_count);
        }
    }
}

fn first_control_param() -> usize {
    ParamId::macro_param(0, MacroParam::Input).index()
}
