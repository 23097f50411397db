use crate::touch::model::{TouchEventKind, TouchId};

/// Per-event failures. None of these stop the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchError {
    /// Every slot is occupied; the begin event is dropped.
    Capacity { id: TouchId, capacity: usize },
    /// An update, end or cancel referenced an identifier with no active slot.
    NotFound { id: TouchId, kind: TouchEventKind },
    /// The handle refers to an earlier occupant of its slot.
    StaleHandle,
    /// More end events than begin events were observed since quiescence.
    ActiveCountUnderflow { id: TouchId },
}

impl std::fmt::Display for TouchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TouchError::Capacity { id, capacity } => write!(
                f,
                "too many touchpoints ({capacity} slots in use), skipping touch {id}"
            ),
            TouchError::NotFound { id, kind } => {
                write!(f, "could not find touch {id} for {kind} event")
            }
            TouchError::StaleHandle => write!(f, "slot handle no longer refers to a live touch"),
            TouchError::ActiveCountUnderflow { id } => write!(
                f,
                "received more touch end than touch begin events (touch {id})"
            ),
        }
    }
}

impl std::error::Error for TouchError {}

/// Raised when a render surface cannot be created or two surfaces disagree on size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    InvalidSize { width: u32, height: u32 },
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::InvalidSize { width, height } => {
                write!(f, "invalid surface size {width}x{height}")
            }
            SurfaceError::SizeMismatch { expected, actual } => write!(
                f,
                "surface size mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }
}

impl std::error::Error for SurfaceError {}
