use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    error::SynthError,
    param::{controller::ControllerId, ids::ParamId, mirror::ParamMirror},
    Number,
};

/// What a [`Message`] asks the audio thread to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Set `param_id` to the ratio in `number_param`.
    SetParam = 1,
    /// Bind `param_id` to the controller in `byte_param`.
    AssignController = 2,
    /// Republish `param_id` to the mirror.
    RefreshParam = 3,
    /// Back to the initial patch, every note silenced.
    Clear = 4,
    ClearDirtyFlag = 5,
}

/// A control-thread request, applied at the start of the next block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub param_id: ParamId,
    pub number_param: Number,
    pub byte_param: u8,
}

impl Message {
    pub fn new(kind: MessageKind, param_id: ParamId, number_param: Number, byte_param: u8) -> Self {
        Self {
            kind,
            param_id,
            number_param,
            byte_param,
        }
    }
}

/// Build the queue between a control thread and the synth.
pub(crate) fn channel(capacity: usize) -> (Producer<Message>, Consumer<Message>) {
    RingBuffer::new(capacity)
}

/// The control-thread side of a synth.
///
/// Writes go through a bounded single-producer single-consumer queue and take
/// effect at the next block; reads come from a lock-free mirror the audio
/// thread refreshes after every block. Nothing here ever blocks.
pub struct SynthHandle {
    tx: Producer<Message>,
    mirror: Arc<ParamMirror>,
    dirty: Arc<AtomicBool>,
}

impl SynthHandle {
    pub(crate) fn new(tx: Producer<Message>, mirror: Arc<ParamMirror>, dirty: Arc<AtomicBool>) -> Self {
        Self { tx, mirror, dirty }
    }

    /// Enqueue a message. Fails with [`SynthError::QueueFull`] when the audio
    /// thread has fallen behind; the message is dropped in that case.
    pub fn push_message(
        &mut self,
        kind: MessageKind,
        param_id: ParamId,
        number_param: Number,
        byte_param: u8,
    ) -> Result<(), SynthError> {
        self.send(Message::new(kind, param_id, number_param, byte_param))
    }

    pub fn send(&mut self, message: Message) -> Result<(), SynthError> {
        match self.tx.push(message) {
            Ok(()) => Ok(()),
            Err(PushError::Full(message)) => {
                tracing::warn!(kind = ?message.kind, param = message.param_id.name(), "message queue full, dropping");
                Err(SynthError::QueueFull)
            }
        }
    }

    pub fn set_param_ratio(&mut self, param_id: ParamId, ratio: Number) -> Result<(), SynthError> {
        self.push_message(MessageKind::SetParam, param_id, ratio, 0)
    }

    pub fn assign_controller(&mut self, param_id: ParamId, controller: ControllerId) -> Result<(), SynthError> {
        self.push_message(MessageKind::AssignController, param_id, 0.0, controller.0)
    }

    pub fn refresh_param(&mut self, param_id: ParamId) -> Result<(), SynthError> {
        self.push_message(MessageKind::RefreshParam, param_id, 0.0, 0)
    }

    pub fn clear(&mut self) -> Result<(), SynthError> {
        self.push_message(MessageKind::Clear, ParamId::MIX, 0.0, 0)
    }

    /// Queued like any other message, so it lands after the changes that
    /// are already on their way.
    pub fn clear_dirty_flag(&mut self) -> Result<(), SynthError> {
        self.push_message(MessageKind::ClearDirtyFlag, ParamId::MIX, 0.0, 0)
    }

    /// Ratio of `param_id` as of the last rendered block.
    pub fn get_param_ratio_atomic(&self, param_id: ParamId) -> Number {
        self.mirror.ratio(param_id)
    }

    pub fn get_param_controller_id_atomic(&self, param_id: ParamId) -> ControllerId {
        self.mirror.controller_id(param_id)
    }

    /// Whether the patch changed since the dirty flag was last cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn find_param_id(&self, name: &str) -> Result<ParamId, SynthError> {
        ParamId::from_name(name).ok_or_else(|| SynthError::UnknownParamName(name.to_string()))
    }

    /// Id of the parameter at `index` in the dense namespace, for hosts that
    /// store parameters by number.
    pub fn param_id(&self, index: usize) -> Result<ParamId, SynthError> {
        ParamId::from_index(index).ok_or(SynthError::InvalidParamId(index))
    }

    /// Free slots in the queue right now.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }
}

impl std::fmt::Debug for SynthHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthHandle")
            .field("slots", &self.tx.slots())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::bank::ParamBank;

    fn handle(capacity: usize) -> (SynthHandle, Consumer<Message>) {
        let bank = ParamBank::new(16, 44_100.0);
        let (tx, rx) = channel(capacity);
        let handle = SynthHandle::new(tx, Arc::new(ParamMirror::new(&bank)), Arc::new(AtomicBool::new(false)));

        (handle, rx)
    }

    #[test]
    fn messages_arrive_in_order() {
        let (mut handle, mut rx) = handle(4);

        handle.set_param_ratio(ParamId::PM, 0.25).unwrap();
        handle.assign_controller(ParamId::FM, ControllerId::PITCH_WHEEL).unwrap();

        let first = rx.pop().unwrap();
        assert_eq!(first.kind, MessageKind::SetParam);
        assert_eq!(first.param_id, ParamId::PM);
        assert!((first.number_param - 0.25).abs() < 1e-12);

        let second = rx.pop().unwrap();
        assert_eq!(second.kind, MessageKind::AssignController);
        assert_eq!(second.byte_param, ControllerId::PITCH_WHEEL.0);
        assert!(rx.pop().is_err());
    }

    #[test]
    fn full_queue_drops_the_message() {
        let (mut handle, mut rx) = handle(2);

        assert!(handle.refresh_param(ParamId::MIX).is_ok());
        assert!(handle.refresh_param(ParamId::PM).is_ok());
        assert_eq!(handle.refresh_param(ParamId::FM), Err(SynthError::QueueFull));
        assert_eq!(handle.slots(), 0);

        assert_eq!(rx.pop().unwrap().param_id, ParamId::MIX);
        assert_eq!(rx.pop().unwrap().param_id, ParamId::PM);
        assert!(rx.pop().is_err());
    }

    #[test]
    fn numeric_ids_are_checked() {
        let (handle, _rx) = handle(1);

        assert_eq!(handle.param_id(0), Ok(ParamId::MIX));
        assert_eq!(handle.param_id(usize::MAX), Err(SynthError::InvalidParamId(usize::MAX)));
    }

    #[test]
    fn unknown_names_are_reported() {
        let (handle, _rx) = handle(1);

        assert_eq!(handle.find_param_id("CDG"), Ok(ParamId::CARRIER_DISTORTION));
        assert_eq!(
            handle.find_param_id("NOPE"),
            Err(SynthError::UnknownParamName("NOPE".to_string()))
        );
    }
}
