use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored event with its position in the log.
///
/// - **Append-only**: `sequence_number` is monotonically increasing across the
///   whole log and never reused.
/// - `recorded_at` is storage time; business time lives on the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    sequence_number: u64,
    recorded_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(sequence_number: u64, recorded_at: DateTime<Utc>, payload: E) -> Self {
        Self {
            sequence_number,
            recorded_at,
            payload,
        }
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
