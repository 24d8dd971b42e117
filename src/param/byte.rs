use crate::{
    param::{
        controller::{Binding, ControllerId},
        ids::ParamDescriptor,
    },
    Number,
};

/// A discrete parameter: waveform, filter type, tuning, toggles.
///
/// Discrete values only ever change between blocks, so there is no event
/// queue; scheduled changes from controllers take effect at the next block.
#[derive(Debug, Clone)]
pub struct ByteParam {
    min: u8,
    max: u8,
    default: u8,
    value: u8,
    change_index: u64,
    binding: Binding,
}

impl ByteParam {
    pub fn new(min: u8, max: u8, default: u8) -> Self {
        let default = default.clamp(min, max);

        Self {
            min,
            max,
            default,
            value: default,
            change_index: 0,
            binding: Binding::NONE,
        }
    }

    pub fn from_descriptor(descriptor: &ParamDescriptor) -> Self {
        Self::new(
            descriptor.min as u8,
            descriptor.max as u8,
            descriptor.default as u8,
        )
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn change_index(&self) -> u64 {
        self.change_index
    }

    pub fn set_value(&mut self, value: u8) {
        let value = value.clamp(self.min, self.max);

        if value != self.value {
            self.value = value;
            self.change_index += 1;
        }
    }

    pub fn ratio(&self) -> Number {
        self.value_to_ratio(self.value)
    }

    pub fn set_ratio(&mut self, ratio: Number) {
        self.set_value(self.ratio_to_value(ratio));
    }

    /// Nearest discrete value to `ratio`.
    pub fn ratio_to_value(&self, ratio: Number) -> u8 {
        let range = (self.max - self.min) as Number;
        self.min + (ratio.clamp(0.0, 1.0) * range).round() as u8
    }

    pub fn value_to_ratio(&self, value: u8) -> Number {
        if self.max == self.min {
            return 0.0;
        }

        (value.clamp(self.min, self.max) - self.min) as Number / (self.max - self.min) as Number
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn controller_id(&self) -> ControllerId {
        self.binding.controller
    }

    pub fn set_controller(&mut self, controller: ControllerId) {
        self.binding = Binding::new(controller);
    }

    pub fn reset(&mut self) {
        self.set_value(self.default);
        self.binding = Binding::NONE;
    }
}
