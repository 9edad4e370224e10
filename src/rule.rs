//! AdjustmentRule: a contiguous validity window plus its DST transitions.
use crate::calendar::{CalendarDateTime, Tag};
use crate::scalar::{Instant, Time};
use crate::transition::TransitionTime;

/// Daylight delta range: [-23h, +14h] in whole minutes.
pub(crate) const DAYLIGHT_DELTA_MIN: i32 = -23 * 60;
pub(crate) const DAYLIGHT_DELTA_MAX: i32 = 14 * 60;

/// A single-shot sentinel used by the binary decoder to mark a DST-typed
/// no-transition rule so `has_daylight_saving` still reports true even when
/// `daylight_delta` happens to be zero. See DESIGN.md for why this exists.
pub(crate) fn dst_sentinel_transition() -> TransitionTime {
    TransitionTime::fixed_date(Time::MIDNIGHT, crate::scalar::Month::January, 1)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AdjustmentRule {
    pub date_start: CalendarDateTime,
    pub date_end: CalendarDateTime,
    /// Whole minutes, [-23h, +14h].
    pub daylight_delta: i32,
    pub daylight_transition_start: TransitionTime,
    pub daylight_transition_end: TransitionTime,
    /// An optional per-window correction added to the zone's base offset.
    pub base_utc_offset_delta: i32,
    pub no_daylight_transitions: bool,
}

impl AdjustmentRule {
    pub fn transitioning(
        date_start: CalendarDateTime,
        date_end: CalendarDateTime,
        daylight_delta: i32,
        daylight_transition_start: TransitionTime,
        daylight_transition_end: TransitionTime,
        base_utc_offset_delta: i32,
    ) -> Option<Self> {
        let rule = Self {
            date_start,
            date_end,
            daylight_delta,
            daylight_transition_start,
            daylight_transition_end,
            base_utc_offset_delta,
            no_daylight_transitions: false,
        };
        rule.validate().then_some(rule)
    }

    pub fn no_transition(
        date_start: CalendarDateTime,
        date_end: CalendarDateTime,
        daylight_delta: i32,
        base_utc_offset_delta: i32,
    ) -> Option<Self> {
        if !date_start.is_absolute() || !date_end.is_absolute() {
            return None;
        }
        let rule = Self {
            date_start,
            date_end,
            daylight_delta,
            // Carried but ignored by evaluation for no-transition rules.
            daylight_transition_start: dst_sentinel_transition(),
            daylight_transition_end: dst_sentinel_transition(),
            base_utc_offset_delta,
            no_daylight_transitions: true,
        };
        rule.validate().then_some(rule)
    }

    fn validate(&self) -> bool {
        if !matches!(self.date_start.tag, Tag::Unspecified | Tag::Absolute)
            || !matches!(self.date_end.tag, Tag::Unspecified | Tag::Absolute)
        {
            return false;
        }
        if matches!(self.date_start.tag, Tag::Unspecified) && self.date_start.time != Time::MIDNIGHT
        {
            return false;
        }
        // Instant::MAX (the canonical "open-ended" upper sentinel) is the last
        // representable tick of the day, not its midnight -- accept it too, since
        // Unspecified-tagged bounds are otherwise compared by date alone anyway.
        if matches!(self.date_end.tag, Tag::Unspecified)
            && self.date_end.time != Time::MIDNIGHT
            && self.date_end.as_naive_instant() != Instant::MAX
        {
            return false;
        }
        if self.date_start.as_naive_instant() > self.date_end.as_naive_instant() {
            return false;
        }
        (DAYLIGHT_DELTA_MIN..=DAYLIGHT_DELTA_MAX).contains(&self.daylight_delta)
    }

    /// True if this rule ever puts the zone into daylight saving time.
    pub fn has_daylight_saving(&self) -> bool {
        self.daylight_delta != 0
    }

    pub(crate) fn start_is_year_marker(&self) -> bool {
        !self.no_daylight_transitions
            && self.daylight_transition_start.is_year_start_marker()
            && self.date_start.date.year == self.date_end.date.year
    }

    pub(crate) fn end_is_year_marker(&self) -> bool {
        !self.no_daylight_transitions
            && self.daylight_transition_end.is_year_start_marker()
            && self.date_start.date.year == self.date_end.date.year
    }
}
