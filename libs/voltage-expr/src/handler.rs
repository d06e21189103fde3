//! Host collaborator for cursor directives
//!
//! Directive functions (`StartAtRecord`, `StartAtTime`, ...) do not produce
//! values. They configure where the host's record cursor begins iterating by
//! calling the setters below.

use serde::Serialize;

/// Host-side receiver of cursor directives
///
/// Argument shapes mirror the host's record cursor API and must not change.
pub trait ExpressionHandler {
    /// Start at a record number within a year partition
    fn set_start_at_record(&mut self, record: i64, year: i64);

    /// Start at the first record at or after `date` (nanoseconds)
    fn set_start_at_time(&mut self, date: i64);

    fn set_start_at_newest(&mut self);

    fn set_start_after_newest(&mut self);

    /// Start `offset` nanoseconds relative to the newest record
    fn set_start_relative_to_newest(&mut self, offset: i64);

    /// Start `offset` records back from the newest record
    fn set_start_at_offset_from_newest(&mut self, offset: i64);

    fn set_order_option(&mut self, code: i64);

    fn set_report_offset(&mut self, value: i64);
}

/// Handler that ignores every directive
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl ExpressionHandler for NullHandler {
    fn set_start_at_record(&mut self, _record: i64, _year: i64) {}

    fn set_start_at_time(&mut self, _date: i64) {}

    fn set_start_at_newest(&mut self) {}

    fn set_start_after_newest(&mut self) {}

    fn set_start_relative_to_newest(&mut self, _offset: i64) {}

    fn set_start_at_offset_from_newest(&mut self, _offset: i64) {}

    fn set_order_option(&mut self, _code: i64) {}

    fn set_report_offset(&mut self, _value: i64) {}
}

/// Where the host cursor should begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CursorStart {
    AtRecord { record: i64, year: i64 },
    AtTime { date: i64 },
    AtNewest,
    AfterNewest,
    RelativeToNewest { offset: i64 },
    AtOffsetFromNewest { offset: i64 },
}

/// In-memory handler recording the latest directives for the host to read back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CursorSettings {
    pub start: Option<CursorStart>,
    pub order_option: Option<i64>,
    pub report_offset: Option<i64>,
}

impl CursorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.order_option.is_none() && self.report_offset.is_none()
    }
}

impl ExpressionHandler for CursorSettings {
    fn set_start_at_record(&mut self, record: i64, year: i64) {
        self.start = Some(CursorStart::AtRecord { record, year });
    }

    fn set_start_at_time(&mut self, date: i64) {
        self.start = Some(CursorStart::AtTime { date });
    }

    fn set_start_at_newest(&mut self) {
        self.start = Some(CursorStart::AtNewest);
    }

    fn set_start_after_newest(&mut self) {
        self.start = Some(CursorStart::AfterNewest);
    }

    fn set_start_relative_to_newest(&mut self, offset: i64) {
        self.start = Some(CursorStart::RelativeToNewest { offset });
    }

    fn set_start_at_offset_from_newest(&mut self, offset: i64) {
        self.start = Some(CursorStart::AtOffsetFromNewest { offset });
    }

    fn set_order_option(&mut self, code: i64) {
        self.order_option = Some(code);
    }

    fn set_report_offset(&mut self, value: i64) {
        self.report_offset = Some(value);
    }
}
