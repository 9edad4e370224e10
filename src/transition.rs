//! The two shapes of a yearly DST boundary.
use crate::scalar::{Date, Month, Time, Weekday, Year};

/// A yearly-recurring transition point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransitionTime {
    /// A fixed month/day. If `day` exceeds the days in that month for a
    /// given year, it clamps to the last day of the month.
    FixedDate { time_of_day: Time, month: Month, day: u8 },
    /// A floating weekday-of-week-of-month. `week` in [1, 5]; 5 means "the
    /// last occurrence".
    Floating { time_of_day: Time, month: Month, week: u8, day_of_week: Weekday },
}

impl TransitionTime {
    pub fn fixed_date(time_of_day: Time, month: Month, day: u8) -> Self {
        debug_assert!((1..=31).contains(&day));
        TransitionTime::FixedDate { time_of_day, month, day }
    }

    pub fn floating(time_of_day: Time, month: Month, week: u8, day_of_week: Weekday) -> Self {
        debug_assert!((1..=5).contains(&week));
        TransitionTime::Floating { time_of_day, month, week, day_of_week }
    }

    pub(crate) fn time_of_day(&self) -> Time {
        match *self {
            TransitionTime::FixedDate { time_of_day, .. } => time_of_day,
            TransitionTime::Floating { time_of_day, .. } => time_of_day,
        }
    }

    /// True for the year-start marker: Jan 1 00:00:00.000, fixed form.
    pub(crate) fn is_year_start_marker(&self) -> bool {
        matches!(
            self,
            TransitionTime::FixedDate { time_of_day, month: Month::January, day: 1 }
                if *time_of_day == Time::MIDNIGHT
        )
    }

    /// Materialize this transition for a specific year into a calendar date.
    pub(crate) fn materialize_date(&self, year: Year) -> Date {
        match *self {
            TransitionTime::FixedDate { month, day, .. } => {
                Date { year, month, day: day.min(year.days_in_month(month)) }
            }
            TransitionTime::Floating { month, week, day_of_week, .. } => {
                if week == 5 {
                    let last = Date::last_of_month(year, month);
                    let shift = (last.day_of_week().sunday0() + 7 - day_of_week.sunday0()) % 7;
                    Date { day: last.day - shift, ..last }
                } else {
                    let first = Date::first_of_month(year, month);
                    let shift = (day_of_week.sunday0() + 7 - first.day_of_week().sunday0()) % 7;
                    Date { day: first.day + shift + 7 * (week - 1), ..first }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Time;

    fn y(n: u16) -> Year {
        Year::new_unchecked(n)
    }

    #[test]
    fn test_floating_last_sunday() {
        let tt = TransitionTime::floating(Time::MIDNIGHT, Month::March, 5, Weekday::Sunday);
        assert_eq!(tt.materialize_date(y(2024)), Date { year: y(2024), month: Month::March, day: 31 });
    }

    #[test]
    fn test_floating_second_sunday() {
        let tt = TransitionTime::floating(Time::MIDNIGHT, Month::March, 2, Weekday::Sunday);
        // 2007-03-11 is the second Sunday of March 2007 (US DST start).
        assert_eq!(tt.materialize_date(y(2007)), Date { year: y(2007), month: Month::March, day: 11 });
    }

    #[test]
    fn test_fixed_date_clamp() {
        let tt = TransitionTime::fixed_date(Time::MIDNIGHT, Month::February, 30);
        assert_eq!(tt.materialize_date(y(2023)), Date { year: y(2023), month: Month::February, day: 28 });
        assert_eq!(tt.materialize_date(y(2024)), Date { year: y(2024), month: Month::February, day: 29 });
    }
}
