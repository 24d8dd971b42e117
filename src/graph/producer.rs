use crate::{
    graph::events::{Event, EventQueue},
    Frequency, Round, Sample, Seconds,
};

/*
Pull-based Rendering
====================

Every node of the synth (parameters, oscillators, filters, voices, the synth
itself) is a producer. Rendering a block is a single pull at the root:

  synth.produce(round)
    └─ voice.produce(round)
         ├─ oscillator.produce(round)
         │    ├─ frequency.produce(round)
         │    └─ amplitude.produce(round)   ← follower, copies its leader
         └─ filter.produce(round)

A node renders at most once per round. The round number is the memoization
key: pulling an already-rendered node again (fan-out, or a second pass over
the same block) returns the cached buffer and does no work.

Within a block, rendering is split at scheduled events so that every event
takes effect on the exact sample it was scheduled for:

  samples:  0 ───────── 37 ────────────── 90 ─────── 128
  events:               ▲ set 0.5         ▲ ramp → 1.0
  calls:    render(0,37) handle  render(37,90) handle  render(90,128)

Event times are seconds from the start of the next block. After each block
the pending events are shifted back by the block duration, so the clock of
every producer always starts at zero.
*/

/// Outcome of the pre-render hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerender {
    /// Handle events and render samples as usual.
    Render,
    /// The hook already filled the buffers (pass-through nodes).
    Done,
}

/// State every producer carries: output buffers, the rate-derived constants,
/// the memoization key and the event queue.
#[derive(Debug, Clone)]
pub struct Producer<K> {
    channels: usize,
    buffers: Vec<Vec<Sample>>,
    block_size: usize,
    sample_rate: Frequency,
    sampling_period: Seconds,
    nyquist_frequency: Frequency,
    cached_round: Option<Round>,
    events: EventQueue<K>,
    last_event_time: Seconds,
}

impl<K: Copy> Producer<K> {
    pub fn new(channels: usize, block_size: usize, sample_rate: Frequency, event_capacity: usize) -> Self {
        Self {
            channels,
            buffers: vec![vec![0.0; block_size]; channels],
            block_size,
            sample_rate,
            sampling_period: 1.0 / sample_rate,
            nyquist_frequency: sample_rate * 0.5,
            cached_round: None,
            events: EventQueue::with_capacity(event_capacity),
            last_event_time: 0.0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> Frequency {
        self.sample_rate
    }

    pub fn sampling_period(&self) -> Seconds {
        self.sampling_period
    }

    pub fn nyquist_frequency(&self) -> Frequency {
        self.nyquist_frequency
    }

    pub fn cached_round(&self) -> Option<Round> {
        self.cached_round
    }

    pub fn buffers(&self) -> &[Vec<Sample>] {
        &self.buffers
    }

    pub fn buffer(&self, channel: usize) -> &[Sample] {
        &self.buffers[channel]
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut [Vec<Sample>] {
        &mut self.buffers
    }

    pub fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.sample_rate = sample_rate;
        self.sampling_period = 1.0 / sample_rate;
        self.nyquist_frequency = sample_rate * 0.5;
        self.cached_round = None;
    }

    pub fn set_block_size(&mut self, block_size: usize) {
        if block_size != self.block_size {
            self.block_size = block_size;
            self.buffers = vec![vec![0.0; block_size]; self.channels];
        }

        self.cached_round = None;
    }

    /// Enqueue an event `time_offset` seconds after the start of the next
    /// block.
    ///
    /// Scheduling earlier than an already queued event discards the events
    /// queued after `time_offset` so the queue stays in time order.
    pub fn schedule(&mut self, time_offset: Seconds, kind: K) {
        if time_offset < self.last_event_time {
            self.events.drop_after(time_offset);
        }

        if self.events.push(Event { time: time_offset, kind }) {
            self.last_event_time = time_offset;
        }
    }

    /// Drop every event scheduled at or after `time_offset`.
    pub fn cancel_events_after(&mut self, time_offset: Seconds) {
        self.events.drop_from(time_offset);
        self.last_event_time = match self.events.back() {
            Some(event) => event.time.max(time_offset),
            None => time_offset.max(0.0),
        };
    }

    /// Drop every event after `time_offset`, and the ones exactly at
    /// `time_offset` for which `keep` is false. Returns the last event left.
    pub fn cancel_events_keeping(&mut self, time_offset: Seconds, keep: impl Fn(&K) -> bool) -> Option<&Event<K>> {
        self.events
            .drop_back_while(|event| event.time > time_offset || (event.time == time_offset && !keep(&event.kind)));
        self.last_event_time = match self.events.back() {
            Some(event) => event.time.max(time_offset),
            None => time_offset.max(0.0),
        };

        self.events.back()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
        self.last_event_time = 0.0;
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn last_event_time_offset(&self) -> Seconds {
        self.last_event_time
    }

    pub fn sample_offset(&self, time_offset: Seconds) -> f64 {
        time_offset * self.sample_rate
    }

    /// Pop the next event due within `[first, sample_count)`, together with
    /// the sample index it takes effect at.
    fn next_event(&mut self, first: usize, sample_count: usize) -> Option<(usize, Event<K>)> {
        let time = self.events.front()?.time;
        let position = (time * self.sample_rate).round();
        let index = if position <= first as f64 {
            first
        } else {
            position as usize
        };

        if index >= sample_count {
            return None;
        }

        self.events.pop().map(|event| (index, event))
    }

    fn end_round(&mut self, sample_count: usize) {
        let elapsed = sample_count as Seconds * self.sampling_period;

        self.events.rebase(elapsed);
        self.last_event_time = (self.last_event_time - elapsed).max(0.0);
    }
}

/// A node of the signal-flow graph.
///
/// Implementors own their children as fields and pull them from
/// [`initialize_rendering`](SignalProducer::initialize_rendering). Anything a
/// node needs but does not own (leader parameters, input buffers, shared
/// wavetables) arrives through the borrowed [`Context`](SignalProducer::Context).
pub trait SignalProducer {
    type Event: Copy;
    type Context<'c>: Copy;

    fn producer(&self) -> &Producer<Self::Event>;

    fn producer_mut(&mut self) -> &mut Producer<Self::Event>;

    /// Pull children for `round` before any sample of this node is computed.
    fn initialize_rendering(&mut self, _ctx: Self::Context<'_>, _round: Round, _sample_count: usize) -> Prerender {
        Prerender::Render
    }

    fn handle_event(&mut self, _ctx: Self::Context<'_>, _event: Event<Self::Event>) {}

    /// Compute samples `first..last` into `buffers`.
    ///
    /// The node's own buffers are lent out as `buffers` for the duration of
    /// the call.
    fn render(&mut self, ctx: Self::Context<'_>, round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]);

    /// Children first, then the node itself.
    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.producer_mut().set_sample_rate(sample_rate);
    }

    /// Children first, then the node itself.
    fn set_block_size(&mut self, block_size: usize) {
        self.producer_mut().set_block_size(block_size);
    }

    /// Render `sample_count` samples for `round`, or return the cached
    /// buffers if this round was already rendered.
    ///
    /// # Panics
    ///
    /// If `sample_count` exceeds the block size the node was sized for.
    fn produce(&mut self, ctx: Self::Context<'_>, round: Round, sample_count: usize) -> &[Vec<Sample>] {
        let block_size = self.producer().block_size;
        assert!(
            sample_count <= block_size,
            "cannot render {} samples, the graph is sized for blocks of {}",
            sample_count,
            block_size
        );

        if self.producer().cached_round != Some(round) {
            self.producer_mut().cached_round = Some(round);

            if self.initialize_rendering(ctx, round, sample_count) == Prerender::Render {
                let mut buffers = std::mem::take(&mut self.producer_mut().buffers);
                let mut first = 0;

                while let Some((index, event)) = self.producer_mut().next_event(first, sample_count) {
                    if first < index {
                        self.render(ctx, round, first, index, &mut buffers);
                    }

                    self.handle_event(ctx, event);
                    first = index;
                }

                if first < sample_count {
                    self.render(ctx, round, first, sample_count, &mut buffers);
                }

                self.producer_mut().buffers = buffers;
            }

            self.producer_mut().end_round(sample_count);
        }

        self.producer().buffers()
    }
}
