//! CalendarDateTime: a date/time paired with a tag describing its frame.
use crate::scalar::{Date, Instant, Month, Offset, Time, Year, TICKS_PER_MINUTE};
use std::fmt;

/// What frame a [`CalendarDateTime`] is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// An absolute instant, expressed as a calendar date/time in UTC.
    Absolute,
    /// A wall-clock reading in some zone, determined by context. Carries the
    /// disambiguation bit a caller uses if the reading turns out to be
    /// ambiguous (ref. spec-level "isDstIfAmbiguous").
    Wall { is_dst_if_ambiguous: bool },
    /// Interpret with whichever zone is currently under consideration.
    Unspecified,
}

/// year/month/day/hour/minute/second/millisecond, plus a [`Tag`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CalendarDateTime {
    pub date: Date,
    pub time: Time,
    pub tag: Tag,
}

impl CalendarDateTime {
    pub fn new(year: Year, month: Month, day: u8, time: Time, tag: Tag) -> Self {
        Self { date: Date { year, month, day }, time, tag }
    }

    pub(crate) fn from_date_time(date: Date, time: Time, tag: Tag) -> Self {
        Self { date, time, tag }
    }

    /// Whole-tick instant value as if this date/time were UTC -- i.e. with no
    /// offset applied. Used as the common currency for wall-clock arithmetic.
    pub(crate) fn as_naive_instant(self) -> Instant {
        self.date.days().instant_at_tick_of_day(self.time.ticks())
    }

    pub(crate) fn from_naive_instant(instant: Instant, tag: Tag) -> Self {
        let date = instant.date();
        let tick = instant.tick_of_day();
        let hour = (tick / (TICKS_PER_MINUTE * 60)) as u8;
        let minute = ((tick / TICKS_PER_MINUTE) % 60) as u8;
        let second = ((tick / crate::scalar::TICKS_PER_SECOND) % 60) as u8;
        let millisecond = ((tick / 10_000) % 1000) as u16;
        Self {
            date,
            time: Time { hour, minute, second, millisecond },
            tag,
        }
    }

    /// Shift an Absolute-tagged naive instant by a UTC offset to get the
    /// corresponding wall-clock naive instant (adding the offset), or vice
    /// versa (subtracting it). Both directions are the same arithmetic.
    pub(crate) fn shift_by(self, offset: Offset) -> CalendarDateTime {
        let shifted = self
            .as_naive_instant()
            .saturating_shift_minutes(offset.minutes());
        Self::from_naive_instant(shifted, self.tag)
    }

    pub fn is_absolute(self) -> bool {
        matches!(self.tag, Tag::Absolute)
    }

    pub fn is_wall(self) -> bool {
        matches!(self.tag, Tag::Wall { .. })
    }
}

impl fmt::Display for CalendarDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}",
            self.date.year.get(),
            self.date.month.get(),
            self.date.day,
            self.time.hour,
            self.time.minute,
            self.time.second,
            self.time.millisecond,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{Date, Month, Offset, Year};

    fn y(n: u16) -> Year {
        Year::new_unchecked(n)
    }

    #[test]
    fn test_naive_instant_round_trip() {
        let t = CalendarDateTime::new(
            y(2024),
            Month::March,
            5,
            Time { hour: 13, minute: 45, second: 30, millisecond: 250 },
            Tag::Absolute,
        );
        let instant = t.as_naive_instant();
        let back = CalendarDateTime::from_naive_instant(instant, Tag::Absolute);
        assert_eq!(t, back);
    }

    #[test]
    fn test_shift_by_adds_offset_both_ways() {
        let t = CalendarDateTime::new(y(2024), Month::March, 5, Time { hour: 12, minute: 0, second: 0, millisecond: 0 }, Tag::Absolute);
        let offset = Offset::new(-300).unwrap();
        let wall = t.shift_by(offset);
        assert_eq!(wall.time, Time { hour: 7, minute: 0, second: 0, millisecond: 0 });
        let back = wall.shift_by(Offset::new(300).unwrap());
        assert_eq!(back.date, t.date);
        assert_eq!(back.time, t.time);
    }

    #[test]
    fn test_tag_predicates() {
        let absolute = CalendarDateTime::new(y(2024), Month::January, 1, Time::MIDNIGHT, Tag::Absolute);
        assert!(absolute.is_absolute());
        assert!(!absolute.is_wall());

        let wall = CalendarDateTime::new(y(2024), Month::January, 1, Time::MIDNIGHT, Tag::Wall { is_dst_if_ambiguous: true });
        assert!(wall.is_wall());
        assert!(!wall.is_absolute());
    }

    #[test]
    fn test_display_format() {
        let t = CalendarDateTime::new(y(7), Month::February, 3, Time { hour: 1, minute: 2, second: 3, millisecond: 4 }, Tag::Absolute);
        assert_eq!(t.to_string(), "0007-02-03T01:02:03.004");
    }

    #[test]
    fn test_from_date_time_preserves_fields() {
        let date = Date { year: y(2024), month: Month::July, day: 4 };
        let time = Time { hour: 9, minute: 0, second: 0, millisecond: 0 };
        let t = CalendarDateTime::from_date_time(date, time, Tag::Unspecified);
        assert_eq!(t.date, date);
        assert_eq!(t.time, time);
        assert!(matches!(t.tag, Tag::Unspecified));
    }
}
