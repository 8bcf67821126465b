use std::fmt;

use crate::domain::scheduling_model::span::time_span::TimeSpan;
use crate::domain::scheduling_model::utils::handles::{BlockId, ReservationId};

/// Why a stretch of a resource's timeline is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpanReason {
    /// Occupied by a scheduled block.
    Block(BlockId),
    /// Claimed ahead of time by a continuity reservation.
    Reservation(ReservationId),
}

impl SpanReason {
    pub fn is_reservation(&self) -> bool {
        matches!(self, SpanReason::Reservation(_))
    }
}

impl fmt::Display for SpanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanReason::Block(id) => write!(f, "block {:?}", id),
            SpanReason::Reservation(id) => write!(f, "reservation {:?}", id),
        }
    }
}

/// A reserved or occupied interval as stored in a resource's span tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceSpan {
    pub span: TimeSpan,
    pub reason: SpanReason,
}

impl ResourceSpan {
    pub fn new(span: TimeSpan, reason: SpanReason) -> Self {
        ResourceSpan { span, reason }
    }
}
