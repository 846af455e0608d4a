//! Call record model shared by the queue, the reporters and the runners.

use std::fmt;

/// Caller-assigned identifier; the queue never validates or deduplicates it.
pub type CallId = i64;

/// Priority class of a queued call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallType {
    #[default]
    Normal,
    Urgent,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Normal => "NORMAL",
            CallType::Urgent => "URGENT",
        }
    }

    pub fn is_urgent(self) -> bool {
        self == CallType::Urgent
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call waiting to be served. Pure value; the queue imposes no rules on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Call {
    pub id: CallId,
    pub kind: CallType,
    /// Expected duration in minutes.
    pub duration_minutes: u32,
    pub callback_requested: bool,
}

impl Call {
    pub fn new(id: CallId, kind: CallType, duration_minutes: u32, callback_requested: bool) -> Self {
        Self {
            id,
            kind,
            duration_minutes,
            callback_requested,
        }
    }

    pub fn normal(id: CallId, duration_minutes: u32, callback_requested: bool) -> Self {
        Self::new(id, CallType::Normal, duration_minutes, callback_requested)
    }

    pub fn urgent(id: CallId, duration_minutes: u32, callback_requested: bool) -> Self {
        Self::new(id, CallType::Urgent, duration_minutes, callback_requested)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Call ID: {}, Type: {}, Duration: {}, Callback Requested: {}",
            self.id,
            self.kind,
            self.duration_minutes,
            if self.callback_requested { "Yes" } else { "No" }
        )
    }
}
