//! Checked arithmetic for calendar and offset scalars.
use std::{num::NonZeroU16, ops::Neg};

pub(crate) const TICKS_PER_SECOND: i64 = 10_000_000;
pub(crate) const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
pub(crate) const TICKS_PER_DAY: i64 = TICKS_PER_MINUTE * 60 * 24;
/// Number of days from 0001-01-01 (day 0) through 9999-12-31 inclusive.
pub(crate) const DAY_COUNT: i64 = Days::MAX.0 as i64 + 1;

/// A signed count of 100-nanosecond ticks since 0001-01-01T00:00:00 UTC.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

impl Instant {
    pub const MIN: Instant = Instant(0);
    pub const MAX: Instant = Instant(DAY_COUNT * TICKS_PER_DAY - 1);

    pub(crate) const fn new_unchecked(ticks: i64) -> Self {
        debug_assert!(ticks >= Self::MIN.0 && ticks <= Self::MAX.0);
        Self(ticks)
    }

    pub(crate) const fn new(ticks: i64) -> Option<Self> {
        if ticks >= Self::MIN.0 && ticks <= Self::MAX.0 {
            Some(Self(ticks))
        } else {
            None
        }
    }

    pub(crate) const fn get(self) -> i64 {
        self.0
    }

    pub(crate) fn clamp(ticks: i64) -> Self {
        Self(ticks.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub(crate) fn saturating_shift_minutes(self, minutes: i32) -> Self {
        Self::clamp(self.0.saturating_add(minutes as i64 * TICKS_PER_MINUTE))
    }

    /// Shift by a signed minute delta, returning `None` on overflow past the
    /// representable range (rather than clamping) -- used where out-of-range
    /// really does mean "no such instant".
    pub(crate) fn shift_minutes(self, minutes: i32) -> Option<Self> {
        self.0
            .checked_add(minutes as i64 * TICKS_PER_MINUTE)
            .and_then(Self::new)
    }

    pub(crate) fn days(self) -> Days {
        Days::new_unchecked((self.0.div_euclid(TICKS_PER_DAY)) as i32)
    }

    pub(crate) fn tick_of_day(self) -> i64 {
        self.0.rem_euclid(TICKS_PER_DAY)
    }

    pub(crate) fn date(self) -> Date {
        self.days().date()
    }

    /// Days between 0001-01-01 and 1970-01-01 (the Unix epoch), matching the
    /// constant this crate's Days::MAX derivation is built from.
    pub(crate) const UNIX_EPOCH_DAYS: i64 = 719_162;

    /// Build an instant from a count of seconds since the Unix epoch, as
    /// carried by tz-database transition times. Out-of-range values clamp
    /// rather than wrap, matching `Instant::clamp`.
    pub(crate) fn from_unix_seconds(secs: i64) -> Self {
        let ticks = (secs as i128 + Self::UNIX_EPOCH_DAYS as i128 * 86_400)
            .saturating_mul(TICKS_PER_SECOND as i128)
            .clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Self::clamp(ticks)
    }
}

/// A signed UTC offset, whole minutes, range [-14h, +14h].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Offset(i32);

impl Offset {
    pub const MIN: Offset = Offset(-14 * 60);
    pub const MAX: Offset = Offset(14 * 60);
    pub const ZERO: Offset = Offset(0);

    /// A whole-minute UTC offset, or `None` outside [-14h, +14h].
    pub const fn new(minutes: i32) -> Option<Self> {
        if minutes >= Self::MIN.0 && minutes <= Self::MAX.0 {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub(crate) const fn new_unchecked(minutes: i32) -> Self {
        debug_assert!(minutes >= Self::MIN.0 && minutes <= Self::MAX.0);
        Self(minutes)
    }

    /// The offset as a signed whole-minute count.
    pub const fn minutes(self) -> i32 {
        self.0
    }

    pub(crate) fn checked_add(self, d: OffsetDelta) -> Option<Self> {
        Self::new(self.0 + d.get())
    }

    pub(crate) fn delta_from(self, other: Self) -> OffsetDelta {
        OffsetDelta::new_unchecked(self.0 - other.0)
    }
}

impl Neg for Offset {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (sign, mins) = if self.0 < 0 { ('-', -self.0) } else { ('+', self.0) };
        write!(f, "{}{:02}:{:02}", sign, mins / 60, mins % 60)
    }
}

/// Difference between two offsets, in minutes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd)]
pub(crate) struct OffsetDelta(i32);

impl OffsetDelta {
    pub(crate) const ZERO: OffsetDelta = OffsetDelta(0);

    pub(crate) const fn new_unchecked(minutes: i32) -> Self {
        Self(minutes)
    }

    pub(crate) const fn get(self) -> i32 {
        self.0
    }

    pub(crate) fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl Neg for OffsetDelta {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

/// Number of days since 0001-01-01 (day 0).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Days(i32);

impl Days {
    pub(crate) const MIN: Days = Days(0);
    // 9999-12-31, derived from the Go/`.NET`-style epoch constant of
    // 719162 days between 0001-01-01 and 1970-01-01.
    pub(crate) const MAX: Days = Days(2_932_896 + 719_162);

    pub(crate) const fn new_unchecked(days: i32) -> Self {
        debug_assert!(days >= Self::MIN.0 && days <= Self::MAX.0);
        Self(days)
    }

    pub(crate) const fn new(days: i32) -> Option<Self> {
        if days >= Self::MIN.0 && days <= Self::MAX.0 {
            Some(Self(days))
        } else {
            None
        }
    }

    pub(crate) const fn get(self) -> i32 {
        self.0
    }

    pub(crate) fn add(self, n: i32) -> Option<Self> {
        Self::new(self.0 + n)
    }

    pub(crate) fn saturating_add(self, n: i32) -> Self {
        Self(self.0.saturating_add(n).clamp(Self::MIN.0, Self::MAX.0))
    }

    pub(crate) fn diff(self, other: Self) -> i32 {
        self.0 - other.0
    }

    pub(crate) fn at_midnight(self) -> Instant {
        Instant::new_unchecked(self.0 as i64 * TICKS_PER_DAY)
    }

    pub(crate) fn instant_at_tick_of_day(self, tick: i64) -> Instant {
        Instant::new_unchecked(self.0 as i64 * TICKS_PER_DAY + tick)
    }

    pub(crate) fn day_of_week(self) -> Weekday {
        // 0001-01-01 (day 0) is a Monday in the proleptic Gregorian calendar.
        Weekday::from_sunday0_unchecked(((self.0 + 1).rem_euclid(7)) as u8)
    }

    /// The Neri-Schneider algorithm, adapted from the 1970-01-01 epoch to
    /// 0001-01-01. See https://github.com/cassioneri/eaf (MIT licensed).
    pub(crate) fn date(self) -> Date {
        const S: u32 = 82;
        // Teacher's K = 719468 + 146097*S is defined relative to a
        // 1970-01-01 epoch; folding in the 719162-day shift to 0001-01-01
        // epoch gives this adjusted constant.
        const K: u32 = 719468 + 146097 * S - 719_162;
        const L: u32 = 400 * S;
        let n = (self.0 as u32).wrapping_add(K);

        let n_1 = 4 * n + 3;
        let c = n_1 / 146097;
        let n_c = n_1 % 146097 / 4;

        let n_2 = 4 * n_c + 3;
        let p_2 = 2939745u64 * n_2 as u64;
        let z = (p_2 / 4294967296) as u32;
        let n_y = (p_2 % 4294967296) as u32 / 2939745 / 4;
        let y = 100 * c + z;

        let n_3 = 2141 * n_y + 197913;
        let m = n_3 / 65536;
        let d = n_3 % 65536 / 2141;

        let j = n_y >= 306;
        let y_g = y.wrapping_sub(L).wrapping_add(j as u32);
        let m_g = if j { m - 12 } else { m };
        let d_g = d + 1;
        Date {
            year: Year::new_unchecked(y_g as u16),
            month: Month::new_unchecked(m_g as u8),
            day: d_g as u8,
        }
    }
}

/// Calendar year, [1, 9999].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(NonZeroU16);

impl Year {
    pub const MIN: Year = Year(NonZeroU16::new(1).unwrap());
    pub const MAX: Year = Year(NonZeroU16::new(9999).unwrap());

    pub const fn new(year: u16) -> Option<Self> {
        if year <= Self::MAX.get() {
            match NonZeroU16::new(year) {
                Some(y) => Some(Self(y)),
                None => None,
            }
        } else {
            None
        }
    }

    pub(crate) const fn new_unchecked(year: u16) -> Self {
        debug_assert!(year >= Year::MIN.get() && year <= Year::MAX.get());
        Self(match NonZeroU16::new(year) {
            Some(y) => y,
            None => panic!("year must be nonzero"),
        })
    }

    pub const fn get(self) -> u16 {
        self.0.get()
    }

    pub(crate) const fn is_leap(self) -> bool {
        (self.get() % 4 == 0 && self.get() % 100 != 0) || self.get() % 400 == 0
    }

    pub(crate) const fn days_in_month(self, month: Month) -> u8 {
        const MAX_MONTH_DAYS: [[u8; 13]; 2] = [
            [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
            [0, 31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
        ];
        MAX_MONTH_DAYS[self.is_leap() as usize][month.get() as usize]
    }

    /// Days-since-0001-01-01 for January 1 of this year.
    pub(crate) fn days_at_jan1(self) -> Days {
        let y = (self.get() - 1) as i32;
        Days::new_unchecked(y * 365 + y / 4 - y / 100 + y / 400)
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January = 1,
    February = 2,
    March = 3,
    April = 4,
    May = 5,
    June = 6,
    July = 7,
    August = 8,
    September = 9,
    October = 10,
    November = 11,
    December = 12,
}

impl Month {
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n <= 12 {
            Some(Self::new_unchecked(n))
        } else {
            None
        }
    }

    pub(crate) const fn new_unchecked(n: u8) -> Self {
        debug_assert!(n >= 1 && n <= 12);
        // Safety: Month is repr(u8) and n is checked by callers.
        unsafe { std::mem::transmute(n) }
    }

    pub const fn get(self) -> u8 {
        self as u8
    }
}

/// Weekday, POSIX-style numbering: Sunday = 0, ..., Saturday = 6.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    pub(crate) const fn from_sunday0_unchecked(n: u8) -> Self {
        debug_assert!(n <= 6);
        // Safety: Weekday is repr(u8), n in [0, 6].
        unsafe { std::mem::transmute(n) }
    }

    pub(crate) const fn new(n: u8) -> Option<Self> {
        if n <= 6 {
            Some(Self::from_sunday0_unchecked(n))
        } else {
            None
        }
    }

    pub(crate) const fn sunday0(self) -> u8 {
        self as u8
    }
}

/// A plain calendar date (proleptic Gregorian, year in [1, 9999]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: Year,
    pub month: Month,
    pub day: u8,
}

impl Date {
    pub(crate) fn days(self) -> Days {
        self.year
            .days_at_jan1()
            .saturating_add(self.year.days_before_month(self.month) as i32 + self.day as i32 - 1)
    }

    pub(crate) fn first_of_month(year: Year, month: Month) -> Self {
        Date { year, month, day: 1 }
    }

    pub(crate) fn last_of_month(year: Year, month: Month) -> Self {
        Date {
            year,
            month,
            day: year.days_in_month(month),
        }
    }

    pub(crate) fn day_of_week(self) -> Weekday {
        self.days().day_of_week()
    }
}

impl Year {
    pub(crate) const fn days_before_month(self, month: Month) -> u16 {
        const DAYS_BEFORE_MONTH: [[u16; 13]; 2] = [
            [0, 0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334],
            [0, 0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335],
        ];
        DAYS_BEFORE_MONTH[self.is_leap() as usize][month.get() as usize]
    }
}

/// A time-of-day, millisecond resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl Time {
    pub const MIDNIGHT: Time = Time { hour: 0, minute: 0, second: 0, millisecond: 0 };

    pub(crate) fn ticks(self) -> i64 {
        (self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64) * TICKS_PER_SECOND
            + self.millisecond as i64 * 10_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_at_epoch_boundaries() {
        assert_eq!(
            Days::MIN.date(),
            Date { year: Year::new_unchecked(1), month: Month::January, day: 1 }
        );
        assert_eq!(
            Days::MAX.date(),
            Date { year: Year::new_unchecked(9999), month: Month::December, day: 31 }
        );
    }

    #[test]
    fn test_date_roundtrip() {
        let d = Date { year: Year::new_unchecked(2024), month: Month::February, day: 29 };
        assert_eq!(d.days().date(), d);
    }

    #[test]
    fn test_day_of_week() {
        // 0001-01-01 is a Monday.
        assert_eq!(Days::MIN.day_of_week(), Weekday::Monday);
        // 2024-03-31 is a Sunday.
        let d = Date { year: Year::new_unchecked(2024), month: Month::March, day: 31 };
        assert_eq!(d.day_of_week(), Weekday::Sunday);
    }

    #[test]
    fn test_offset_display() {
        assert_eq!(Offset::new_unchecked(-480).to_string(), "-08:00");
        assert_eq!(Offset::new_unchecked(60).to_string(), "+01:00");
    }
}
