//! Session slot domain entity

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// One concrete occurrence of a session template; capacity is counted per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSlot {
    pub id: i32,
    pub reference: String,
    /// `None` for ad-hoc or migrated slots
    pub session_template_reference: Option<String>,
    pub prison_id: i32,
    pub slot_date: NaiveDate,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

impl SessionSlot {
    /// A slot that has started can no longer be changed or booked into.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.slot_start <= now
    }

    /// Whether a visit in this slot may still be cancelled.
    ///
    /// Past slots are always closed. A positive `day_limit` additionally
    /// requires cancelling at least that many calendar days before the slot.
    pub fn cancellation_window_closed(&self, now: DateTime<Utc>, day_limit: u32) -> bool {
        if self.has_started(now) {
            return true;
        }
        if day_limit == 0 {
            return false;
        }
        let deadline = self.slot_date - Duration::days(i64::from(day_limit));
        now.date_naive() > deadline
    }
}
