/// Errors surfaced at the boundaries of the engine.
///
/// The rendering path itself never fails: bad input there is ignored and
/// contract violations are fatal. These variants cover construction and the
/// control-thread side of the message queue.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// The message queue is full; the message was dropped.
    QueueFull,
    /// No parameter carries the given short name.
    UnknownParamName(String),
    /// The id is outside the parameter namespace.
    InvalidParamId(usize),
    /// A configuration value is out of its valid range.
    InvalidConfig { field: &'static str, reason: String },
}

impl std::fmt::Display for SynthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthError::QueueFull => write!(f, "Message queue is full, message dropped"),
            SynthError::UnknownParamName(name) => {
                write!(f, "Unknown parameter name: {:?}", name)
            }
            SynthError::InvalidParamId(index) => {
                write!(f, "Parameter id {} is outside the parameter namespace", index)
            }
            SynthError::InvalidConfig { field, reason } => {
                write!(f, "Invalid configuration for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for SynthError {}
