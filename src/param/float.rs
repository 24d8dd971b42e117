use crate::{
    graph::{
        events::Event,
        lfo::Lfo,
        producer::{Prerender, Producer, SignalProducer},
    },
    param::{
        controller::{Binding, ControllerId},
        envelope::EnvelopeSnapshot,
        ids::{ParamDescriptor, ParamKind},
    },
    Frequency, Number, Round, Sample, Seconds,
};

/*
Parameter Cell
==============

A continuous parameter is a producer whose single channel is its value over
the block. Everything that changes it is an event on its queue:

  SetValue(v)       jump to v
  Ramp(target, d)   move from wherever the value is when the event fires to
                    target over d seconds; sample j of an N sample ramp is
                    start + (target - start) · (j / N)^exponent
  Cancel            freeze a running ramp where it is

Ramps are always followed by a SetValue(target) at their end so the value
lands exactly on the target even if the ramp itself got cut short by a new
event.

A voice's copy of a synth-level parameter (a follower) normally just copies
the leader's buffer. If the leader is controlled by an envelope, the follower
instead runs that envelope itself, because every voice triggers it at a
different time.
*/

/// Maximum number of pending events per parameter.
pub const EVENT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    SetValue(Number),
    Ramp {
        target: Number,
        duration: Seconds,
        exponent: Number,
    },
    Cancel,
}

/// Whether the value may change on every sample or only between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Sample,
    Block,
}

/// Borrowed collaborators of a parameter.
#[derive(Clone, Copy, Default)]
pub struct ParamCtx<'a> {
    /// The synth-level parameter this one follows, if it is a voice's copy.
    pub leader: Option<&'a FloatParam>,
    /// Rendered LFOs of the current round.
    pub lfos: &'a [Lfo],
}

impl<'a> ParamCtx<'a> {
    pub fn follow(leader: &'a FloatParam) -> Self {
        Self {
            leader: Some(leader),
            lfos: &[],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    start: Number,
    target: Number,
    exponent: Number,
    length: Number,
    elapsed: Number,
}

impl Ramp {
    fn advance_by(&mut self, samples: Number) -> Number {
        self.elapsed = (self.elapsed + samples).min(self.length);

        if self.is_done() {
            return self.target;
        }

        let x = self.elapsed / self.length;
        let shaped = if self.exponent == 1.0 { x } else { x.powf(self.exponent) };

        self.start + (self.target - self.start) * shaped
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.length
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EnvelopeState {
    active: bool,
    ended: bool,
    cancelled: bool,
    cancel_duration: Seconds,
    final_ratio: Number,
    /// Time since the envelope started, measured at the start of the next
    /// block.
    elapsed: Seconds,
}

#[derive(Debug, Clone)]
pub struct FloatParam {
    producer: Producer<ParamEvent>,
    evaluation: Evaluation,
    min: Number,
    max: Number,
    default: Number,
    range: Number,
    value: Number,
    scheduled_value: Number,
    change_index: u64,
    ramp: Option<Ramp>,
    binding: Binding,
    envelope_index: Option<usize>,
    envelope: EnvelopeState,
}

impl FloatParam {
    pub fn new(
        min: Number,
        max: Number,
        default: Number,
        evaluation: Evaluation,
        block_size: usize,
        sample_rate: Frequency,
    ) -> Self {
        let default = default.clamp(min, max);

        Self {
            producer: Producer::new(1, block_size, sample_rate, EVENT_CAPACITY),
            evaluation,
            min,
            max,
            default,
            range: max - min,
            value: default,
            scheduled_value: default,
            change_index: 0,
            ramp: None,
            binding: Binding::NONE,
            envelope_index: None,
            envelope: EnvelopeState::default(),
        }
    }

    pub fn from_descriptor(descriptor: &ParamDescriptor, block_size: usize, sample_rate: Frequency) -> Self {
        let evaluation = match descriptor.kind {
            ParamKind::SampleFloat => Evaluation::Sample,
            _ => Evaluation::Block,
        };

        Self::new(
            descriptor.min,
            descriptor.max,
            descriptor.default,
            evaluation,
            block_size,
            sample_rate,
        )
    }

    pub fn value(&self) -> Number {
        self.value
    }

    pub fn ratio(&self) -> Number {
        self.value_to_ratio(self.value)
    }

    pub fn min(&self) -> Number {
        self.min
    }

    pub fn max(&self) -> Number {
        self.max
    }

    pub fn default_value(&self) -> Number {
        self.default
    }

    pub fn evaluation(&self) -> Evaluation {
        self.evaluation
    }

    /// Grows every time the value changes; block-rate consumers compare it to
    /// decide whether to recompute derived state.
    pub fn change_index(&self) -> u64 {
        self.change_index
    }

    #[inline]
    pub fn ratio_to_value(&self, ratio: Number) -> Number {
        self.min + ratio.clamp(0.0, 1.0) * self.range
    }

    #[inline]
    pub fn value_to_ratio(&self, value: Number) -> Number {
        if self.range <= 0.0 {
            return 0.0;
        }

        ((value - self.min) / self.range).clamp(0.0, 1.0)
    }

    /// Drop everything pending and jump to `value` now.
    pub fn set_value(&mut self, value: Number) {
        self.producer.clear_events();
        self.ramp = None;
        self.value = value.clamp(self.min, self.max);
        self.scheduled_value = self.value;
        self.change_index += 1;
    }

    pub fn set_ratio(&mut self, ratio: Number) {
        self.set_value(self.ratio_to_value(ratio));
    }

    pub fn schedule_value(&mut self, time_offset: Seconds, value: Number) {
        let value = value.clamp(self.min, self.max);

        self.producer.schedule(time_offset, ParamEvent::SetValue(value));
        self.scheduled_value = value;
    }

    pub fn schedule_linear_ramp(&mut self, duration: Seconds, target: Number) {
        self.schedule_curved_ramp(duration, target, 1.0);
    }

    /// Ramp from the last scheduled event to `target` over `duration`.
    ///
    /// A target beyond the range is clamped and the duration shortened to
    /// the part of the distance that is still reachable, so the slope stays
    /// the same.
    pub fn schedule_curved_ramp(&mut self, duration: Seconds, target: Number, exponent: Number) {
        let from = if self.producer.has_events() {
            self.scheduled_value
        } else {
            self.value
        };
        let clamped = target.clamp(self.min, self.max);
        let distance = target - from;
        let duration = if clamped != target && distance.abs() > 0.000_001 {
            duration * ((clamped - from) / distance).clamp(0.0, 1.0)
        } else {
            duration
        };
        let start = self.producer.last_event_time_offset();

        if duration > 0.0 {
            self.producer.schedule(
                start,
                ParamEvent::Ramp {
                    target: clamped,
                    duration,
                    exponent,
                },
            );
        }

        self.producer
            .schedule(start + duration.max(0.0), ParamEvent::SetValue(clamped));
        self.scheduled_value = clamped;
    }

    /// Remove events at or after `time_offset` and freeze any ramp that is
    /// still running at that time.
    pub fn cancel_events_at(&mut self, time_offset: Seconds) {
        self.producer.cancel_events_after(time_offset);
        self.producer.schedule(time_offset, ParamEvent::Cancel);
        self.scheduled_value = self.value;
    }

    /// Remove every pending event and stop the ramp where it is.
    pub fn cancel_events(&mut self) {
        self.producer.clear_events();
        self.ramp = None;
        self.scheduled_value = self.value;
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Whether the value is settled: no ramp and nothing scheduled.
    pub fn is_constant(&self) -> bool {
        self.ramp.is_none() && !self.producer.has_events()
    }

    pub fn remaining_ramp_time(&self) -> Seconds {
        self.ramp.map_or(0.0, |ramp| {
            (ramp.length - ramp.elapsed).max(0.0) * self.producer.sampling_period()
        })
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn controller_id(&self) -> ControllerId {
        match self.envelope_index {
            Some(index) => ControllerId::envelope(index),
            None => self.binding.controller,
        }
    }

    pub fn envelope_index(&self) -> Option<usize> {
        self.envelope_index
    }

    /// Follow `controller`. Envelopes become the parameter's envelope, any
    /// other source becomes its binding; [`ControllerId::NONE`] detaches.
    pub fn set_controller(&mut self, controller: ControllerId) {
        match controller.envelope_index() {
            Some(index) => {
                self.envelope_index = Some(index);
                self.binding = Binding::NONE;
            }
            None => {
                self.envelope_index = None;
                self.binding = Binding::new(controller);
            }
        }
    }

    /// Back to the default value, detached from every source.
    pub fn reset(&mut self) {
        self.set_value(self.default);
        self.binding = Binding::NONE;
        self.envelope_index = None;
        self.envelope = EnvelopeState::default();
    }

    pub fn start_envelope(&mut self, time_offset: Seconds, envelope: &EnvelopeSnapshot) {
        self.envelope = EnvelopeState {
            active: true,
            final_ratio: envelope.final_value,
            elapsed: -time_offset,
            ..EnvelopeState::default()
        };

        let initial = self.ratio_to_value(envelope.initial_value);
        let peak = self.ratio_to_value(envelope.peak_value);
        let sustain = self.ratio_to_value(envelope.sustain_value);
        let attack_end = time_offset + envelope.delay_time + envelope.attack_time;

        self.producer.cancel_events_after(time_offset);
        self.ramp = None;
        self.schedule_value(time_offset, initial);
        self.schedule_value(time_offset + envelope.delay_time, initial);
        self.schedule_curved_ramp(envelope.attack_time, peak, envelope.attack_shape.exponent());
        self.schedule_value(attack_end + envelope.hold_time, peak);
        self.schedule_curved_ramp(envelope.decay_time, sustain, envelope.decay_shape.exponent());
    }

    /// Re-plan the rest of a dynamic envelope with fresh settings.
    pub fn update_envelope(&mut self, time_offset: Seconds, envelope: &EnvelopeSnapshot) {
        if !envelope.dynamic || !self.envelope.active || self.envelope.ended {
            return;
        }

        let position = self.envelope.elapsed + time_offset;
        let delay_end = envelope.delay_time;
        let attack_end = delay_end + envelope.attack_time;
        let hold_end = attack_end + envelope.hold_time;
        let decay_end = hold_end + envelope.decay_time;

        let initial = self.ratio_to_value(envelope.initial_value);
        let peak = self.ratio_to_value(envelope.peak_value);
        let sustain = self.ratio_to_value(envelope.sustain_value);
        let attack_shape = envelope.attack_shape.exponent();
        let decay_shape = envelope.decay_shape.exponent();

        self.envelope.final_ratio = envelope.final_value;
        self.producer.cancel_events_after(time_offset);

        if position < delay_end {
            self.schedule_value(time_offset, initial);
            self.schedule_value(time_offset + delay_end - position, initial);
            self.schedule_curved_ramp(envelope.attack_time, peak, attack_shape);
            self.schedule_value(time_offset + hold_end - position, peak);
            self.schedule_curved_ramp(envelope.decay_time, sustain, decay_shape);
        } else if position < attack_end {
            self.schedule_curved_ramp(attack_end - position, peak, attack_shape);
            self.schedule_value(time_offset + hold_end - position, peak);
            self.schedule_curved_ramp(envelope.decay_time, sustain, decay_shape);
        } else if position < hold_end {
            self.schedule_value(time_offset, peak);
            self.schedule_value(time_offset + hold_end - position, peak);
            self.schedule_curved_ramp(envelope.decay_time, sustain, decay_shape);
        } else if position < decay_end {
            self.schedule_curved_ramp(decay_end - position, sustain, decay_shape);
        } else {
            self.schedule_curved_ramp(DYNAMIC_SUSTAIN_RAMP, sustain, 1.0);
        }
    }

    /// Start the release stage; returns how long it lasts.
    pub fn end_envelope(&mut self, time_offset: Seconds, envelope: &EnvelopeSnapshot) -> Seconds {
        if self.envelope.cancelled {
            return self.envelope.cancel_duration;
        }

        self.envelope.ended = true;
        self.envelope.final_ratio = envelope.final_value;
        self.release(
            time_offset,
            envelope.release_time,
            envelope.final_value,
            envelope.release_shape.exponent(),
        );

        envelope.release_time
    }

    /// Like [`end_envelope`](Self::end_envelope), over `duration` instead of
    /// the release time.
    pub fn cancel_envelope(&mut self, time_offset: Seconds, duration: Seconds) {
        self.envelope.ended = true;
        self.envelope.cancelled = true;
        self.envelope.cancel_duration = duration;
        self.release(time_offset, duration, self.envelope.final_ratio, 1.0);
    }

    fn release(&mut self, time_offset: Seconds, duration: Seconds, final_ratio: Number, exponent: Number) {
        let target = self.ratio_to_value(final_ratio);

        // A value set at the very offset (a note starting there) is where
        // the release begins.
        let kept = self
            .producer
            .cancel_events_keeping(time_offset, |kind| matches!(kind, ParamEvent::SetValue(_)));
        self.scheduled_value = match kept {
            Some(Event {
                kind: ParamEvent::SetValue(value),
                ..
            }) => *value,
            _ => self.value,
        };
        self.schedule_curved_ramp(duration, target, exponent);
    }

    pub fn has_decayed(&self, threshold: Number) -> bool {
        self.envelope.active
            && self.is_constant()
            && self.ratio() < threshold
            && self.envelope.final_ratio < threshold
    }

    fn apply_lfo(&mut self, lfo: &Lfo, first: usize, last: usize, buffer: &mut [Sample]) {
        let source = lfo.producer().buffer(0);

        for (out, &sample) in buffer[first..last].iter_mut().zip(&source[first..last]) {
            self.value = self.ratio_to_value(self.binding.apply(sample as Number));
            *out = self.value as Sample;
        }
    }
}

/// Time over which a dynamic envelope in its sustain stage moves to a new
/// sustain level.
const DYNAMIC_SUSTAIN_RAMP: Seconds = 0.1;

impl SignalProducer for FloatParam {
    type Event = ParamEvent;
    type Context<'c> = ParamCtx<'c>;

    fn producer(&self) -> &Producer<ParamEvent> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<ParamEvent> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: ParamCtx<'_>, _round: Round, sample_count: usize) -> Prerender {
        if self.envelope.active {
            self.envelope.elapsed += sample_count as Seconds * self.producer.sampling_period();
        }

        match ctx.leader {
            Some(leader) if leader.envelope_index.is_none() => {
                let source = leader.producer().buffer(0);
                self.producer.buffers_mut()[0][..sample_count].copy_from_slice(&source[..sample_count]);

                if self.value != leader.value {
                    self.value = leader.value;
                    self.change_index += 1;
                }

                Prerender::Done
            }
            _ => Prerender::Render,
        }
    }

    fn handle_event(&mut self, _ctx: ParamCtx<'_>, event: Event<ParamEvent>) {
        match event.kind {
            ParamEvent::SetValue(value) => {
                self.ramp = None;
                self.value = value;
                self.change_index += 1;
            }
            ParamEvent::Ramp {
                target,
                duration,
                exponent,
            } => {
                let length = duration * self.producer.sample_rate();

                if length < 1.0 {
                    self.ramp = None;
                    self.value = target;
                } else {
                    self.ramp = Some(Ramp {
                        start: self.value,
                        target,
                        exponent,
                        length,
                        elapsed: 0.0,
                    });
                }

                self.change_index += 1;
            }
            ParamEvent::Cancel => {
                self.ramp = None;
            }
        }
    }

    fn render(&mut self, ctx: ParamCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let buffer = &mut buffers[0];

        if let Some(lfo) = self.binding.controller.lfo_index().and_then(|index| ctx.lfos.get(index)) {
            self.apply_lfo(lfo, first, last, buffer);
            self.change_index += 1;
            return;
        }

        let Some(mut ramp) = self.ramp else {
            buffer[first..last].fill(self.value as Sample);
            return;
        };

        match self.evaluation {
            Evaluation::Sample => {
                for sample in buffer[first..last].iter_mut() {
                    self.value = ramp.advance_by(1.0);
                    *sample = self.value as Sample;
                }
            }
            Evaluation::Block => {
                self.value = ramp.advance_by((last - first) as Number);
                buffer[first..last].fill(self.value as Sample);
            }
        }

        self.ramp = (!ramp.is_done()).then_some(ramp);
        self.change_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: Frequency = 1000.0;
    const BLOCK: usize = 16;

    fn param(evaluation: Evaluation) -> FloatParam {
        FloatParam::new(-1.0, 1.0, 0.0, evaluation, BLOCK, SAMPLE_RATE)
    }

    fn render(param: &mut FloatParam, round: Round) -> Vec<Sample> {
        param.produce(ParamCtx::default(), round, BLOCK)[0].clone()
    }

    #[test]
    fn ratio_conversion() {
        let param = param(Evaluation::Sample);

        assert!((param.ratio() - 0.5).abs() < 1e-12);
        assert!((param.ratio_to_value(0.25) + 0.5).abs() < 1e-12);
        assert!((param.value_to_ratio(3.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_ramp_hits_the_target_exactly() {
        let mut param = param(Evaluation::Sample);
        param.set_value(0.0);
        param.schedule_linear_ramp(0.010, 1.0);

        let out = render(&mut param, 1);

        for (j, &sample) in out[..10].iter().enumerate() {
            let expected = (j + 1) as f32 / 10.0;
            assert!((sample - expected).abs() < 1e-6, "sample {}: {} != {}", j, sample, expected);
        }

        assert_eq!(out[9], 1.0);
        assert!(out[10..].iter().all(|&s| s == 1.0));
        assert!(!param.is_ramping());
    }

    #[test]
    fn curved_ramp_follows_the_exponent() {
        let mut param = param(Evaluation::Sample);
        param.set_value(0.0);
        param.schedule_curved_ramp(0.010, 1.0, 2.0);

        let out = render(&mut param, 1);

        assert!((out[4] - 0.25).abs() < 1e-6);
        assert_eq!(out[9], 1.0);
    }

    #[test]
    fn ramp_spanning_blocks_continues() {
        let mut param = param(Evaluation::Sample);
        param.set_value(-1.0);
        param.schedule_linear_ramp(0.020, 1.0);

        let first = render(&mut param, 1);
        let second = render(&mut param, 2);

        assert!((first[15] - 0.6).abs() < 1e-6);
        assert!((second[3] - 1.0).abs() < 1e-6);
        assert!(second[4..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn out_of_range_targets_shorten_the_ramp() {
        let mut param = param(Evaluation::Sample);
        param.set_value(0.0);
        param.schedule_linear_ramp(0.010, 2.0);

        let out = render(&mut param, 1);

        assert!((out[4] - 1.0).abs() < 1e-6, "got {}", out[4]);
        assert!(out[5..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn cancel_freezes_a_running_ramp() {
        let mut param = param(Evaluation::Sample);
        param.set_value(0.0);
        param.schedule_linear_ramp(0.010, 1.0);
        param.cancel_events_at(0.005);

        let out = render(&mut param, 1);

        assert!((out[4] - 0.5).abs() < 1e-6);
        assert!(out[5..].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn set_value_drops_pending_events() {
        let mut param = param(Evaluation::Sample);
        param.schedule_value(0.004, 0.8);
        let index = param.change_index();
        param.set_value(-0.3);

        let out = render(&mut param, 1);

        assert!(out.iter().all(|&s| (s + 0.3).abs() < 1e-6));
        assert!(param.change_index() > index);
    }

    #[test]
    fn block_evaluation_holds_each_segment() {
        let mut param = param(Evaluation::Block);
        param.set_value(0.0);
        param.schedule_linear_ramp(0.032, 1.0);

        let out = render(&mut param, 1);

        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn follower_copies_its_leader() {
        let mut leader = param(Evaluation::Sample);
        let mut follower = param(Evaluation::Sample);
        leader.set_value(0.0);
        leader.schedule_linear_ramp(0.010, 1.0);

        let expected = render(&mut leader, 1);
        let out = follower.produce(ParamCtx::follow(&leader), 1, BLOCK)[0].clone();

        assert_eq!(out, expected);
        assert!((follower.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn follower_runs_its_own_envelope() {
        let mut leader = FloatParam::new(0.0, 1.0, 0.5, Evaluation::Sample, BLOCK, SAMPLE_RATE);
        let mut follower = FloatParam::new(0.0, 1.0, 0.5, Evaluation::Sample, BLOCK, SAMPLE_RATE);
        leader.set_controller(ControllerId::envelope(0));
        render(&mut leader, 1);

        follower.start_envelope(0.0, &envelope(0.008, 0.0, 0.004, 0.25));
        let out = follower.produce(ParamCtx::follow(&leader), 1, BLOCK)[0].clone();

        assert!((out[7] - 1.0).abs() < 1e-6, "peak {}", out[7]);
        assert!((out[11] - 0.25).abs() < 1e-6, "sustain {}", out[11]);
    }

    fn envelope(attack: Seconds, hold: Seconds, decay: Seconds, sustain: Number) -> EnvelopeSnapshot {
        use crate::param::envelope::EnvelopeShape;

        EnvelopeSnapshot {
            dynamic: false,
            initial_value: 0.0,
            peak_value: 1.0,
            sustain_value: sustain,
            final_value: 0.0,
            delay_time: 0.0,
            attack_time: attack,
            hold_time: hold,
            decay_time: decay,
            release_time: 0.004,
            attack_shape: EnvelopeShape::Linear,
            decay_shape: EnvelopeShape::Linear,
            release_shape: EnvelopeShape::Linear,
        }
    }

    #[test]
    fn envelope_release_decays() {
        let mut param = FloatParam::new(0.0, 1.0, 0.0, Evaluation::Sample, BLOCK, SAMPLE_RATE);
        let snapshot = envelope(0.002, 0.0, 0.002, 0.5);
        param.set_controller(ControllerId::envelope(0));

        param.start_envelope(0.0, &snapshot);
        render(&mut param, 1);
        assert!((param.value() - 0.5).abs() < 1e-9);
        assert!(!param.has_decayed(0.001));

        let release = param.end_envelope(0.0, &snapshot);
        assert!((release - 0.004).abs() < 1e-12);

        render(&mut param, 2);
        assert!(param.value().abs() < 1e-9);
        assert!(param.has_decayed(0.001));
    }

    #[test]
    fn cancelled_envelope_reports_the_cancel_duration() {
        let mut param = FloatParam::new(0.0, 1.0, 0.0, Evaluation::Sample, BLOCK, SAMPLE_RATE);
        let snapshot = envelope(0.002, 0.1, 0.002, 0.5);

        param.start_envelope(0.0, &snapshot);
        param.cancel_envelope(0.001, 0.01);

        assert!((param.end_envelope(0.002, &snapshot) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn dynamic_envelope_picks_up_a_new_sustain() {
        let mut param = FloatParam::new(0.0, 1.0, 0.0, Evaluation::Sample, BLOCK, SAMPLE_RATE);
        let mut snapshot = envelope(0.002, 0.0, 0.002, 0.5);
        snapshot.dynamic = true;

        param.start_envelope(0.0, &snapshot);
        render(&mut param, 1);

        snapshot.sustain_value = 0.2;
        param.update_envelope(0.0, &snapshot);
        for round in 2..12 {
            render(&mut param, round);
        }

        assert!((param.value() - 0.2).abs() < 1e-9, "got {}", param.value());
    }

    #[test]
    fn lfo_binding_is_ignored_without_rendered_lfos() {
        let mut param = param(Evaluation::Sample);
        param.set_controller(ControllerId::lfo(2));
        param.set_value(0.4);

        let out = render(&mut param, 1);

        assert!(out.iter().all(|&s| (s - 0.4).abs() < 1e-6));
        assert_eq!(param.controller_id(), ControllerId::lfo(2));
    }
}
