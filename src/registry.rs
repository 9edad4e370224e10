//! Decoder for the structured registry representation used by the host OS's
//! time zone database on one platform (the Windows `TIME_ZONE_INFORMATION` /
//! "dynamic DST" registry shape), per §4.8.
//!
//! Unlike the binary decoder there is no byte-level framing to parse here --
//! the collaborator hands over already-decoded struct fields (this is the
//! "structured registry representation" spec.md §1 calls out as the second
//! on-disk source). The module's job is purely the struct-to-`AdjustmentRule`
//! translation.
use crate::calendar::{CalendarDateTime, Tag};
use crate::error::{Error, Result};
use crate::rule::AdjustmentRule;
use crate::scalar::{Instant, Month, Offset, Time, Weekday, Year};
use crate::transition::TransitionTime;
use crate::zone::Zone;

/// A `SYSTEMTIME`-shaped transition boundary: `year == 0` means "floating"
/// (recurs every year on the `week`-th `day_of_week` of `month`); a nonzero
/// `year` means a one-shot fixed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTimeSpec {
    pub year: u16,
    pub month: u8,
    /// Weekday, POSIX-numbered (0 = Sunday), used only when `year == 0`.
    pub day_of_week: u8,
    /// Week-of-month [1, 5] when `year == 0` ("5" = last); day-of-month
    /// otherwise.
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl SystemTimeSpec {
    /// `month == 0` is the registry's sentinel for "this zone has no DST".
    fn is_absent(&self) -> bool {
        self.month == 0
    }

    fn time_of_day(&self) -> Time {
        Time { hour: self.hour, minute: self.minute, second: self.second, millisecond: self.millisecond }
    }

    fn to_transition_time(self) -> Result<TransitionTime> {
        let month = Month::new(self.month).ok_or_else(|| Error::InvalidZone { detail: "registry: bad month".into() })?;
        if self.year == 0 {
            let day_of_week = Weekday::new(self.day_of_week)
                .ok_or_else(|| Error::InvalidZone { detail: "registry: bad day-of-week".into() })?;
            if !(1..=5).contains(&self.day) {
                return Err(Error::InvalidZone { detail: "registry: week must be in [1, 5]".into() });
            }
            Ok(TransitionTime::floating(self.time_of_day(), month, self.day, day_of_week))
        } else {
            Ok(TransitionTime::fixed_date(self.time_of_day(), month, self.day))
        }
    }
}

/// One year's worth of a "dynamic DST" registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicYearRecord {
    pub year: u16,
    /// UTC-minus-local bias in minutes (Windows convention: positive west of
    /// UTC), for this specific year.
    pub bias_minutes: i32,
    pub standard_bias_minutes: i32,
    pub daylight_bias_minutes: i32,
    pub standard_date: SystemTimeSpec,
    pub daylight_date: SystemTimeSpec,
}

/// The structured registry fields for one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFields {
    pub standard_name: String,
    pub daylight_name: String,
    /// The zone's current UTC-minus-local bias, in minutes.
    pub bias_minutes: i32,
    pub standard_bias_minutes: i32,
    pub daylight_bias_minutes: i32,
    pub standard_date: SystemTimeSpec,
    pub daylight_date: SystemTimeSpec,
    /// Per-year records for zones whose DST rule changed across history
    /// ("dynamic DST"), sorted ascending by year. Empty for an ordinary zone.
    pub dynamic_years: Vec<DynamicYearRecord>,
}

fn zone_offset_minutes(bias_minutes: i32) -> i32 {
    -bias_minutes
}

fn fixed_or_floating_rule(
    date_start: CalendarDateTime,
    date_end: CalendarDateTime,
    standard_date: SystemTimeSpec,
    daylight_date: SystemTimeSpec,
    daylight_bias_minutes: i32,
    base_utc_offset_delta: i32,
) -> Result<AdjustmentRule> {
    let start_tt = daylight_date.to_transition_time()?;
    let end_tt = standard_date.to_transition_time()?;
    AdjustmentRule::transitioning(date_start, date_end, -daylight_bias_minutes, start_tt, end_tt, base_utc_offset_delta)
        .ok_or_else(|| Error::InvalidZone { detail: "registry: transitioning rule failed validation".into() })
}

fn min_date() -> CalendarDateTime {
    CalendarDateTime::from_naive_instant(Instant::MIN, Tag::Unspecified)
}

fn max_date() -> CalendarDateTime {
    CalendarDateTime::from_naive_instant(Instant::MAX, Tag::Unspecified)
}

fn year_start(year: u16) -> CalendarDateTime {
    CalendarDateTime::new(Year::new_unchecked(year), Month::January, 1, Time::MIDNIGHT, Tag::Unspecified)
}

fn year_end(year: u16) -> CalendarDateTime {
    CalendarDateTime::new(Year::new_unchecked(year), Month::December, 31, Time::MIDNIGHT, Tag::Unspecified)
}

/// Decode a host-registry time zone record into a [`Zone`].
pub fn decode(fields: &RegistryFields, id: &str) -> Result<Zone> {
    let default_offset_minutes = zone_offset_minutes(fields.bias_minutes);
    let base = Offset::new(default_offset_minutes)
        .ok_or_else(|| Error::InvalidZone { detail: "registry: bias out of range".into() })?;

    let mut rules = Vec::new();

    if fields.dynamic_years.is_empty() {
        if !fields.daylight_date.is_absent() {
            rules.push(fixed_or_floating_rule(
                min_date(),
                max_date(),
                fields.standard_date,
                fields.daylight_date,
                fields.daylight_bias_minutes,
                -fields.standard_bias_minutes,
            )?);
        } else {
            let delta = default_offset_minutes - zone_offset_minutes(fields.bias_minutes + fields.standard_bias_minutes);
            if delta != 0 {
                rules.push(
                    AdjustmentRule::no_transition(
                        CalendarDateTime::from_naive_instant(Instant::MIN, Tag::Absolute),
                        CalendarDateTime::from_naive_instant(Instant::MAX, Tag::Absolute),
                        0,
                        delta,
                    )
                    .ok_or_else(|| Error::InvalidZone { detail: "registry: no-transition rule failed validation".into() })?,
                );
            }
        }
    } else {
        let mut years: Vec<&DynamicYearRecord> = fields.dynamic_years.iter().collect();
        years.sort_by_key(|r| r.year);
        for (i, record) in years.iter().enumerate() {
            let date_start = if i == 0 { min_date() } else { year_start(record.year) };
            let date_end = if i + 1 == years.len() { max_date() } else { year_end(record.year) };
            if !record.daylight_date.is_absent() {
                rules.push(fixed_or_floating_rule(
                    date_start,
                    date_end,
                    record.standard_date,
                    record.daylight_date,
                    record.daylight_bias_minutes,
                    default_offset_minutes - zone_offset_minutes(record.bias_minutes + record.standard_bias_minutes),
                )?);
            } else {
                let delta = default_offset_minutes - zone_offset_minutes(record.bias_minutes + record.standard_bias_minutes);
                rules.push(
                    AdjustmentRule::no_transition(date_start, date_end, 0, delta)
                        .ok_or_else(|| Error::InvalidZone { detail: "registry: no-transition rule failed validation".into() })?,
                );
            }
        }
    }

    Zone::new(id, id, fields.standard_name.clone(), fields.daylight_name.clone(), base, rules)
}
