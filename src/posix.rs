//! The POSIX-style extended-future mini-parser: `std offset [dst [offset]
//! [,start[/time],end[/time]]]`, trailing a v2/v3 TZif blob.
//!
//! Unlike a general POSIX TZ parser, this one only accepts the `Mm.w.d` rule
//! form; Julian-day (`Jn`) and bare-day (`n`) forms are out of scope and
//! rejected outright, per the engine's stated non-goals.
use crate::calendar::{CalendarDateTime, Tag};
use crate::error::{Error, Result};
use crate::parse::Scan;
use crate::rule::AdjustmentRule;
use crate::scalar::{Instant, Month, Offset, Time, Weekday};
use crate::transition::TransitionTime;

const DEFAULT_DST_DELTA_MINUTES: i32 = 60;
const DEFAULT_RULE_SECONDS: i32 = 2 * 3_600; // 02:00:00

/// Build the tail [`AdjustmentRule`] described by an extended-future string,
/// covering from `start` through `Instant::MAX`.
pub(crate) fn build_tail_rule(s: &[u8], start: Instant, base_utc_offset: Offset) -> Result<AdjustmentRule> {
    let mut scan = Scan::new(s);
    skip_name(&mut scan)?;
    let std = parse_offset(&mut scan)?;

    let date_start = CalendarDateTime::from_naive_instant(start, Tag::Absolute);
    let date_end = CalendarDateTime::from_naive_instant(Instant::MAX, Tag::Absolute);
    let base_utc_offset_delta = std.minutes() - base_utc_offset.minutes();

    if scan.is_done() {
        return AdjustmentRule::no_transition(date_start, date_end, 0, base_utc_offset_delta)
            .ok_or_else(|| Error::InvalidZone { detail: "extended-future: invalid fixed-offset rule".into() });
    }
    skip_name(&mut scan)?;

    let daylight_delta = match scan.peek() {
        Some(b',') => {
            scan.take_unchecked(1);
            DEFAULT_DST_DELTA_MINUTES
        }
        Some(_) => {
            let dst_offset = parse_offset(&mut scan)?;
            scan.expect(b',')
                .ok_or_else(|| Error::InvalidZone { detail: "extended-future: expected ','".into() })?;
            dst_offset.minutes() - std.minutes()
        }
        None => return Err(Error::InvalidZone { detail: "extended-future: unterminated dst clause".into() }),
    };

    let start_tt = parse_rule(&mut scan)?;
    scan.expect(b',')
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: expected ','".into() })?;
    let end_tt = parse_rule(&mut scan)?;

    if !scan.is_done() {
        return Err(Error::InvalidZone { detail: "extended-future: trailing data".into() });
    }

    AdjustmentRule::transitioning(date_start, date_end, daylight_delta, start_tt, end_tt, base_utc_offset_delta)
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: invalid transitioning rule".into() })
}

/// Skip a `name` or `<name>` token.
fn skip_name(s: &mut Scan) -> Result<()> {
    let name = match s.peek() {
        Some(b'<') => {
            let name = s
                .take_until_inclusive(|c| c == b'>')
                .ok_or_else(|| Error::InvalidZone { detail: "extended-future: unterminated <name>".into() })?;
            &name[1..name.len() - 1]
        }
        _ => s
            .take_until(|c| matches!(c, b'+' | b'-' | b',' | b'0'..=b'9'))
            .ok_or_else(|| Error::InvalidZone { detail: "extended-future: missing name".into() })?,
    };
    if name.is_empty() || !name.is_ascii() {
        return Err(Error::InvalidZone { detail: "extended-future: invalid name".into() });
    }
    Ok(())
}

/// Parse `[+|-]H[:mm[:ss]]`; the sign is inverted per POSIX convention.
fn parse_offset(s: &mut Scan) -> Result<Offset> {
    let seconds = parse_hms(s, 24 * 3_600 - 1)?;
    let minutes = round_to_minutes(-seconds);
    Offset::new(minutes).ok_or_else(|| Error::InvalidZone { detail: "extended-future: offset out of range".into() })
}

fn parse_hms(s: &mut Scan, max_abs_seconds: i32) -> Result<i32> {
    let sign = s.transform(|c| match c { b'+' => Some(1), b'-' => Some(-1), _ => None }).unwrap_or(1);
    let hours = s
        .up_to_2_digits()
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: expected hour digits".into() })?
        as i32;
    let mut total = hours * 3_600;
    if let Some(true) = s.advance_on(b':') {
        total += s
            .digits00_59()
            .ok_or_else(|| Error::InvalidZone { detail: "extended-future: bad minutes".into() })? as i32
            * 60;
        if let Some(true) = s.advance_on(b':') {
            total += s
                .digits00_59()
                .ok_or_else(|| Error::InvalidZone { detail: "extended-future: bad seconds".into() })?
                as i32;
        }
    }
    if total > max_abs_seconds {
        return Err(Error::InvalidZone { detail: "extended-future: value out of range".into() });
    }
    Ok(total * sign)
}

fn round_to_minutes(seconds: i32) -> i32 {
    let sign = if seconds < 0 { -1 } else { 1 };
    (seconds + sign * 30) / 60
}

/// Parse `Mm.w.d[/time]`, rejecting Julian (`Jn`) and bare-day (`n`) forms.
fn parse_rule(s: &mut Scan) -> Result<TransitionTime> {
    match s.peek() {
        Some(b'M') => {}
        Some(b'J') | Some(b'0'..=b'9') => {
            return Err(Error::InvalidZone {
                detail: "extended-future: Julian-day and bare-day rule forms are not supported".into(),
            });
        }
        _ => return Err(Error::InvalidZone { detail: "extended-future: expected 'M' rule".into() }),
    }
    s.take_unchecked(1);
    let month = s
        .up_to_2_digits()
        .and_then(Month::new)
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: bad month".into() })?;
    s.expect(b'.')
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: expected '.'".into() })?;
    let week = s
        .digit_ranged(b'1'..=b'5')
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: bad week".into() })?;
    s.expect(b'.')
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: expected '.'".into() })?;
    let day = s
        .digit_ranged(b'0'..=b'6')
        .ok_or_else(|| Error::InvalidZone { detail: "extended-future: bad weekday".into() })?;
    let day_of_week = Weekday::from_sunday0_unchecked(day);

    let seconds = if let Some(true) = s.advance_on(b'/') {
        parse_hms(s, 167 * 3_600)?
    } else {
        DEFAULT_RULE_SECONDS
    };
    // Day-overflow in a /time suffix beyond [0, 86400) is folded to its
    // hour-of-day component only; the day-shift itself (and the negative-vs-
    // positive distinction upstream uses a Jan-1-vs-Jan-2 sentinel for) is
    // dropped, since TransitionTime::Floating names a weekday-of-month, not
    // an absolute day, and has no field to carry a shift count against that.
    // See DESIGN.md's "Resolved open questions" for why this divergence is
    // accepted rather than reproduced.
    let normalized = seconds.rem_euclid(24 * 3_600);
    let time_of_day = Time {
        hour: (normalized / 3_600) as u8,
        minute: ((normalized / 60) % 60) as u8,
        second: (normalized % 60) as u8,
        millisecond: 0,
    };

    Ok(if week == 5 {
        TransitionTime::floating(time_of_day, month, 5, day_of_week)
    } else {
        TransitionTime::floating(time_of_day, month, week, day_of_week)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Month;

    #[test]
    fn test_parse_typical_extended_future() {
        let rule = build_tail_rule(b"EST5EDT,M3.2.0,M11.1.0", Instant::MIN, Offset::ZERO).unwrap();
        assert_eq!(rule.base_utc_offset_delta, -5 * 60);
        assert_eq!(rule.daylight_delta, 60);
        assert_eq!(
            rule.daylight_transition_start,
            TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::March, 2, Weekday::Sunday)
        );
        assert_eq!(
            rule.daylight_transition_end,
            TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::November, 1, Weekday::Sunday)
        );
    }

    #[test]
    fn test_fixed_offset_no_dst() {
        let rule = build_tail_rule(b"UTC0", Instant::MIN, Offset::ZERO).unwrap();
        assert!(rule.no_daylight_transitions);
        assert_eq!(rule.base_utc_offset_delta, 0);
    }

    #[test]
    fn test_rejects_julian_day_forms() {
        assert!(build_tail_rule(b"EST5EDT,J60,J300", Instant::MIN, Offset::ZERO).is_err());
        assert!(build_tail_rule(b"EST5EDT,60,300", Instant::MIN, Offset::ZERO).is_err());
    }

    #[test]
    fn test_day_overflow_time_folds_to_hour_of_day() {
        let rule = build_tail_rule(b"EST5EDT,M3.2.0/26,M11.1.0/-2", Instant::MIN, Offset::ZERO).unwrap();
        assert_eq!(
            rule.daylight_transition_start,
            TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::March, 2, Weekday::Sunday)
        );
        assert_eq!(
            rule.daylight_transition_end,
            TransitionTime::floating(Time { hour: 22, minute: 0, second: 0, millisecond: 0 }, Month::November, 1, Weekday::Sunday)
        );
    }
}
