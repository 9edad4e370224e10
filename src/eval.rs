//! Rule selection and is-DST / is-ambiguous / is-invalid / offset evaluation.
//!
//! This module realizes the algorithms for picking the rule that governs a
//! given date/time, materializing its yearly DST window, and composing the
//! effective UTC offset -- the reconciliation point between the calendar
//! primitives, the transition materializer, and a zone's ordered rule array.
use crate::calendar::{CalendarDateTime, Tag};
use crate::rule::AdjustmentRule;
use crate::scalar::{Instant, Offset, Year};

/// The UTC offset that was "in effect" at the boundary of a rule -- used both
/// to convert an Absolute rule boundary into a wall reading (rule selection)
/// and as the UTC anchor offset for a DST window (§4.5). For a no-transition
/// rule this includes its daylight delta, since the whole window counts as
/// one fixed offset; for a transitioning rule the boundary sits outside the
/// DST excursion by construction.
pub(crate) fn rule_edge_offset(rule: &AdjustmentRule, base: Offset) -> Offset {
    let mut total = base.minutes() + rule.base_utc_offset_delta;
    if rule.no_daylight_transitions {
        total += rule.daylight_delta;
    }
    Offset::new(total).unwrap_or(if total > 0 { Offset::MAX } else { Offset::MIN })
}

/// Select the rule governing `wall_projection`. `absolute_instant` is
/// `Some(u)` when the caller has a genuine absolute instant on hand (so that
/// Absolute-tagged `dateStart` endpoints can be compared to it directly,
/// per §4.1); it is `None` for a bare wall-clock query.
pub(crate) fn select_rule<'a>(
    rules: &'a [AdjustmentRule],
    wall_projection: CalendarDateTime,
    absolute_instant: Option<Instant>,
    base: Offset,
) -> Option<(usize, &'a AdjustmentRule)> {
    for (i, rule) in rules.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| &rules[j]);
        let lower_ok = match rule.date_start.tag {
            Tag::Absolute => match absolute_instant {
                Some(u) => u >= rule.date_start.as_naive_instant(),
                None => {
                    let offset = prev.map_or(base, |p| rule_edge_offset(p, base));
                    wall_projection
                        .as_naive_instant()
                        .saturating_shift_minutes(-offset.minutes())
                        >= rule.date_start.as_naive_instant()
                }
            },
            _ => wall_projection.date >= rule.date_start.date,
        };
        if !lower_ok {
            continue;
        }
        let upper_ok = match rule.date_end.tag {
            Tag::Absolute => {
                let offset = rule_edge_offset(rule, base);
                wall_projection
                    .as_naive_instant()
                    .saturating_shift_minutes(-offset.minutes())
                    <= rule.date_end.as_naive_instant()
            }
            _ => wall_projection.date <= rule.date_end.date,
        };
        if upper_ok {
            return Some((i, rule));
        }
    }
    None
}

/// The yearly DST window for a rule, as naive (wall-frame) instants, plus
/// its signed daylight delta in minutes.
pub(crate) struct Window {
    pub start: Instant,
    pub end: Instant,
    pub delta: i32,
}

pub(crate) fn yearly_window(
    rule: &AdjustmentRule,
    prev: Option<&AdjustmentRule>,
    year: Year,
    base: Offset,
) -> Window {
    if rule.no_daylight_transitions {
        let prev_offset = prev.map_or(base, |p| rule_edge_offset(p, base));
        let this_offset = rule_edge_offset(rule, base);
        Window {
            start: rule
                .date_start
                .as_naive_instant()
                .saturating_shift_minutes(prev_offset.minutes()),
            end: rule
                .date_end
                .as_naive_instant()
                .saturating_shift_minutes(this_offset.minutes()),
            delta: rule.daylight_delta,
        }
    } else {
        let start_date = rule.daylight_transition_start.materialize_date(year);
        let end_date = rule.daylight_transition_end.materialize_date(year);
        let mut end = end_date
            .days()
            .instant_at_tick_of_day(rule.daylight_transition_end.time_of_day().ticks());
        if rule.end_is_year_marker() {
            // "treat it as closing at the last tick of endWall.year"
            end = last_tick_of_year(year);
        }
        Window {
            start: start_date
                .days()
                .instant_at_tick_of_day(rule.daylight_transition_start.time_of_day().ticks()),
            end,
            delta: rule.daylight_delta,
        }
    }
}

fn days_in_year(instant: Instant) -> i64 {
    if instant.date().year.is_leap() { 366 } else { 365 }
}

/// The last tick (wall-frame) of `year` -- one tick before the following
/// January 1st at midnight.
fn last_tick_of_year(year: Year) -> Instant {
    let next_jan1 = year.days_at_jan1().saturating_add(if year.is_leap() { 366 } else { 365 }).at_midnight();
    Instant::new_unchecked(next_jan1.get() - 1)
}

/// Does `[lo, hi)` contain `t`, also checking the window shifted by one
/// calendar year in either direction (the "year-edge corner" rule shared by
/// is-ambiguous and is-invalid).
fn window_contains_with_year_shift(lo: Instant, hi: Instant, t: Instant) -> bool {
    if lo <= t && t < hi {
        return true;
    }
    let shift = days_in_year(lo) * crate::scalar::TICKS_PER_DAY;
    let lo_minus = Instant::clamp(lo.get() - shift);
    let hi_minus = Instant::clamp(hi.get() - shift);
    if lo_minus <= t && t < hi_minus {
        return true;
    }
    let lo_plus = Instant::clamp(lo.get() + shift);
    let hi_plus = Instant::clamp(hi.get() + shift);
    lo_plus <= t && t < hi_plus
}

/// Result of classifying a wall-frame instant against a rule's yearly window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Classification {
    pub is_dst: bool,
    pub is_ambiguous: bool,
    pub is_invalid: bool,
}

/// Classify `t` (a naive wall-frame instant) against `rule`'s materialized
/// window, per §4.3. `disambiguate` is the Wall tag's recorded
/// `isDstIfAmbiguous` bit, consulted only when the raw DST test and
/// is-ambiguous both hold.
pub(crate) fn classify(
    rule: &AdjustmentRule,
    window: &Window,
    t: Instant,
    disambiguate: Option<bool>,
) -> Classification {
    let Window { start, end, delta } = *window;
    if delta == 0 {
        return Classification { is_dst: false, is_ambiguous: false, is_invalid: false };
    }
    let start_marker = rule.start_is_year_marker();
    let end_marker = rule.end_is_year_marker();

    let raw_is_dst = if start > end {
        t < end || t >= start
    } else if rule.no_daylight_transitions {
        start <= t && t <= end
    } else {
        start <= t && t < end
    };

    let is_ambiguous = if delta > 0 {
        !end_marker && window_contains_with_year_shift(end.saturating_shift_minutes(-delta), end, t)
    } else {
        !start_marker && window_contains_with_year_shift(start.saturating_shift_minutes(delta), start, t)
    };

    let is_invalid = if delta > 0 {
        !start_marker
            && window_contains_with_year_shift(start, start.saturating_shift_minutes(delta), t)
    } else {
        !end_marker && window_contains_with_year_shift(end, end.saturating_shift_minutes(-delta), t)
    };

    let is_dst = if raw_is_dst && is_ambiguous {
        disambiguate.unwrap_or(raw_is_dst)
    } else {
        raw_is_dst
    };

    Classification { is_dst, is_ambiguous, is_invalid }
}

/// Result of resolving an absolute instant to an offset, per §4.4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub offset: Offset,
    pub is_dst: bool,
    pub is_ambiguous: bool,
}

/// UTC anchors of a rule's DST window, per §4.5.
fn utc_anchors(rule: &AdjustmentRule, prev: Option<&AdjustmentRule>, window: &Window, base: Offset) -> (Instant, Instant) {
    let start_offset = if rule.no_daylight_transitions {
        prev.map_or(base, |p| rule_edge_offset(p, base))
    } else {
        Offset::new_unchecked(base.minutes() + rule.base_utc_offset_delta)
    };
    let end_offset =
        Offset::new_unchecked(base.minutes() + rule.base_utc_offset_delta + rule.daylight_delta);
    let start_utc = window.start.saturating_shift_minutes(-start_offset.minutes());
    let end_utc = window.end.saturating_shift_minutes(-end_offset.minutes());
    (start_utc, end_utc)
}

/// Resolve the effective offset for an absolute instant `u` within `rules`
/// ordered under `base`. Implements §4.4 end to end, including the
/// "year-spanning composition" note: when the selected rule's end is not
/// itself a year-end marker but the following rule in the array opens with a
/// year-start marker, DST is treated as continuing through the selected
/// rule's own validity end -- the adjacent marker "propagates" backward.
pub(crate) fn offset_from_instant(rules: &[AdjustmentRule], base: Offset, u: Instant) -> Resolution {
    let wall_instant = u.saturating_shift_minutes(base.minutes());
    let wall_projection = CalendarDateTime::from_naive_instant(wall_instant, Tag::Unspecified);

    let Some((idx, rule)) = select_rule(rules, wall_projection, Some(u), base) else {
        return Resolution { offset: base, is_dst: false, is_ambiguous: false };
    };

    let mut offset = Offset::new_unchecked(base.minutes() + rule.base_utc_offset_delta);
    if !rule.has_daylight_saving() {
        return Resolution { offset, is_dst: false, is_ambiguous: false };
    }

    let year = wall_projection.date.year;
    let prev = idx.checked_sub(1).map(|j| &rules[j]);
    let mut window = yearly_window(rule, prev, year, base);

    let next = rules.get(idx + 1);
    let extends_through_year_end = !rule.no_daylight_transitions
        && !rule.end_is_year_marker()
        && next.is_some_and(|n| n.start_is_year_marker())
        && rule.date_end.date.year == year;

    let (start_utc, mut end_utc) = utc_anchors(rule, prev, &window, base);
    if extends_through_year_end {
        // The next rule picks up DST where this one's own transition would
        // have ended it, so this rule's own end is not a real boundary --
        // any instant still selected into this rule (already <= date_end)
        // stays in DST rather than reverting at the rule's nominal end.
        window.end = Instant::MAX;
        end_utc = Instant::MAX;
    }

    let is_dst = if window.start > window.end {
        u < end_utc || u >= start_utc
    } else if rule.no_daylight_transitions {
        start_utc <= u && u <= end_utc
    } else {
        start_utc <= u && u < end_utc
    };
    if is_dst {
        offset = Offset::new_unchecked(offset.minutes() + window.delta);
    }

    let is_ambiguous = if window.delta > 0 {
        !rule.end_is_year_marker()
            && window_contains_with_year_shift(
                end_utc.saturating_shift_minutes(-window.delta.abs()),
                end_utc,
                u,
            )
    } else {
        !rule.start_is_year_marker()
            && window_contains_with_year_shift(
                start_utc,
                start_utc.saturating_shift_minutes(-window.delta),
                u,
            )
    };

    Resolution { offset, is_dst, is_ambiguous }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Tag;
    use crate::rule::AdjustmentRule;
    use crate::scalar::{Month, Weekday};
    use crate::transition::TransitionTime;

    fn y(n: u16) -> Year {
        Year::new_unchecked(n)
    }

    fn jan1_marker() -> TransitionTime {
        TransitionTime::fixed_date(Time::MIDNIGHT, Month::January, 1)
    }

    fn absolute(year: Year, month: Month, day: u8, time: crate::scalar::Time) -> CalendarDateTime {
        CalendarDateTime::new(year, month, day, time, Tag::Absolute)
    }

    fn midnight(hour: u8, minute: u8) -> crate::scalar::Time {
        crate::scalar::Time { hour, minute, second: 0, millisecond: 0 }
    }

    /// Rule A (2011) ends in a real October transition, but the following
    /// rule (2012) opens with a start-of-year marker -- the propagation case
    /// from spec.md's year-spanning composition note.
    #[test]
    fn test_year_marker_propagation_keeps_dst_through_year_end() {
        let base = Offset::new(180).unwrap();
        let oct_last_sunday = TransitionTime::floating(Time::MIDNIGHT, Month::October, 5, Weekday::Sunday);
        let apr_first_sunday = TransitionTime::floating(Time::MIDNIGHT, Month::April, 1, Weekday::Sunday);

        let rule_2011 = AdjustmentRule::transitioning(
            absolute(y(2011), Month::January, 1, Time::MIDNIGHT),
            absolute(y(2011), Month::December, 31, midnight(23, 59)),
            60,
            jan1_marker(),
            oct_last_sunday,
            0,
        )
        .unwrap();
        let rule_2012 = AdjustmentRule::transitioning(
            absolute(y(2012), Month::January, 1, Time::MIDNIGHT),
            absolute(y(2012), Month::December, 31, midnight(23, 59)),
            60,
            jan1_marker(),
            apr_first_sunday,
            0,
        )
        .unwrap();
        let rules = [rule_2011, rule_2012];

        assert!(!rules[0].end_is_year_marker());
        assert!(rules[1].start_is_year_marker());

        let u = absolute(y(2011), Month::December, 31, midnight(20, 0)).as_naive_instant();
        let resolution = offset_from_instant(&rules, base, u);
        assert!(resolution.is_dst);
        assert_eq!(resolution.offset, Offset::new(240).unwrap());

        // Well inside the propagated window, away from any boundary.
        let mid_year = absolute(y(2011), Month::July, 1, midnight(0, 0)).as_naive_instant();
        assert!(offset_from_instant(&rules, base, mid_year).is_dst);
    }

    /// Southern-hemisphere DST: a single rule whose transitions wrap the
    /// calendar year (start > end when both are materialized in-year).
    #[test]
    fn test_southern_hemisphere_wrap_via_classify_and_offset_from_instant() {
        let base = Offset::new(600).unwrap();
        let start = TransitionTime::floating(Time::MIDNIGHT, Month::October, 1, Weekday::Sunday);
        let end = TransitionTime::floating(Time::MIDNIGHT, Month::April, 1, Weekday::Sunday);
        let rule = AdjustmentRule::transitioning(
            CalendarDateTime::from_naive_instant(Instant::MIN, Tag::Unspecified),
            CalendarDateTime::from_naive_instant(Instant::MAX, Tag::Unspecified),
            60,
            start,
            end,
            0,
        )
        .unwrap();
        let rules = [rule];

        let january = absolute(y(2005), Month::January, 15, midnight(12, 0));
        let window = yearly_window(&rules[0], None, january.date.year, base);
        assert!(window.start > window.end, "wrapped window should have start after end");
        let classification = classify(&rules[0], &window, january.as_naive_instant(), Some(false));
        assert!(classification.is_dst);

        let u = january.as_naive_instant().saturating_shift_minutes(-base.minutes() - 60);
        let resolution = offset_from_instant(&rules, base, u);
        assert!(resolution.is_dst);
        assert_eq!(resolution.offset, Offset::new(660).unwrap());

        let july = absolute(y(2005), Month::July, 15, midnight(12, 0));
        let u_july = july.as_naive_instant().saturating_shift_minutes(-base.minutes());
        let resolution_july = offset_from_instant(&rules, base, u_july);
        assert!(!resolution_july.is_dst);
        assert_eq!(resolution_july.offset, base);
    }

    #[test]
    fn test_window_contains_with_year_shift_matches_adjacent_years() {
        // 2021 is not a leap year, so a +-365-day shift lands exactly on the
        // same calendar day in the neighboring years -- avoids leap-day drift.
        let lo = absolute(y(2021), Month::June, 1, Time::MIDNIGHT).as_naive_instant();
        let hi = absolute(y(2021), Month::June, 2, Time::MIDNIGHT).as_naive_instant();
        assert!(window_contains_with_year_shift(lo, hi, lo));
        assert!(!window_contains_with_year_shift(lo, hi, hi));

        let one_year_later = absolute(y(2022), Month::June, 1, midnight(12, 0)).as_naive_instant();
        assert!(window_contains_with_year_shift(lo, hi, one_year_later));

        let one_year_earlier = absolute(y(2020), Month::June, 1, midnight(12, 0)).as_naive_instant();
        assert!(window_contains_with_year_shift(lo, hi, one_year_earlier));

        let two_years_later = absolute(y(2023), Month::June, 1, midnight(12, 0)).as_naive_instant();
        assert!(!window_contains_with_year_shift(lo, hi, two_years_later));
    }

    #[test]
    fn test_rule_edge_offset_includes_daylight_for_no_transition_rule() {
        let base = Offset::new(60).unwrap();
        let rule = AdjustmentRule::no_transition(
            absolute(y(2020), Month::January, 1, Time::MIDNIGHT),
            absolute(y(2020), Month::December, 31, Time::MIDNIGHT),
            30,
            0,
        )
        .unwrap();
        assert_eq!(rule_edge_offset(&rule, base), Offset::new(90).unwrap());
    }
}
