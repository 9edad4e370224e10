//! Zone: an id, a base offset, and an ordered rule array, plus the query
//! surface built on top of [`eval`].
use crate::calendar::{CalendarDateTime, Tag};
use crate::error::{Error, Result};
use crate::eval;
use crate::rule::AdjustmentRule;
use crate::scalar::Offset;

/// Options accepted by [`Zone::convert`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub no_throw_on_invalid_time: bool,
}

/// A named civil time zone: immutable once constructed.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub display_name: String,
    pub standard_name: String,
    pub daylight_name: String,
    pub base_utc_offset: Offset,
    rules: Vec<AdjustmentRule>,
}

impl Zone {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        standard_name: impl Into<String>,
        daylight_name: impl Into<String>,
        base_utc_offset: Offset,
        rules: Vec<AdjustmentRule>,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('\0') {
            return Err(Error::InvalidZone { detail: "zone id must be non-empty and NUL-free".into() });
        }
        for pair in rules.windows(2) {
            if pair[1].date_start.as_naive_instant() <= pair[0].date_end.as_naive_instant() {
                return Err(Error::InvalidZone {
                    detail: "adjustment rules must be strictly ordered and non-overlapping".into(),
                });
            }
        }
        Ok(Self {
            id,
            display_name: display_name.into(),
            standard_name: standard_name.into(),
            daylight_name: daylight_name.into(),
            base_utc_offset,
            rules,
        })
    }

    /// The process-wide UTC sentinel.
    pub fn utc() -> Self {
        Self {
            id: "UTC".to_string(),
            display_name: "UTC".to_string(),
            standard_name: "UTC".to_string(),
            daylight_name: "UTC".to_string(),
            base_utc_offset: Offset::ZERO,
            rules: Vec::new(),
        }
    }

    pub fn rules(&self) -> &[AdjustmentRule] {
        &self.rules
    }

    pub fn supports_dst(&self) -> bool {
        self.rules.iter().any(AdjustmentRule::has_daylight_saving)
    }

    fn locate(&self, t: CalendarDateTime) -> Option<(&AdjustmentRule, eval::Window)> {
        let (idx, rule) = eval::select_rule(&self.rules, t, None, self.base_utc_offset)?;
        if !rule.has_daylight_saving() {
            return Some((rule, eval::Window { start: t.as_naive_instant(), end: t.as_naive_instant(), delta: 0 }));
        }
        let prev = idx.checked_sub(1).map(|j| &self.rules[j]);
        let window = eval::yearly_window(rule, prev, t.date.year, self.base_utc_offset);
        Some((rule, window))
    }

    fn disambiguation_bit(t: CalendarDateTime) -> Option<bool> {
        match t.tag {
            Tag::Wall { is_dst_if_ambiguous } => Some(is_dst_if_ambiguous),
            _ => None,
        }
    }

    fn classify_wall(&self, t: CalendarDateTime) -> Option<(&AdjustmentRule, eval::Window, eval::Classification)> {
        let (rule, window) = self.locate(t)?;
        let classification = eval::classify(rule, &window, t.as_naive_instant(), Self::disambiguation_bit(t));
        Some((rule, window, classification))
    }

    /// Offset in effect at `t`. Absolute instants resolve via §4.4; Wall or
    /// Unspecified readings are taken to already be expressed in this zone.
    pub fn get_offset(&self, t: CalendarDateTime) -> Offset {
        match t.tag {
            Tag::Absolute => {
                eval::offset_from_instant(&self.rules, self.base_utc_offset, t.as_naive_instant()).offset
            }
            _ => match self.classify_wall(t) {
                None => self.base_utc_offset,
                Some((rule, window, classification)) => {
                    let mut offset =
                        Offset::new_unchecked(self.base_utc_offset.minutes() + rule.base_utc_offset_delta);
                    if classification.is_dst {
                        offset = Offset::new_unchecked(offset.minutes() + window.delta);
                    }
                    offset
                }
            },
        }
    }

    pub fn is_daylight_saving(&self, t: CalendarDateTime) -> bool {
        match t.tag {
            Tag::Absolute => {
                eval::offset_from_instant(&self.rules, self.base_utc_offset, t.as_naive_instant()).is_dst
            }
            _ => self.classify_wall(t).is_some_and(|(_, _, c)| c.is_dst),
        }
    }

    pub fn is_ambiguous(&self, t: CalendarDateTime) -> bool {
        match t.tag {
            Tag::Absolute => {
                eval::offset_from_instant(&self.rules, self.base_utc_offset, t.as_naive_instant()).is_ambiguous
            }
            _ => self.classify_wall(t).is_some_and(|(_, _, c)| c.is_ambiguous),
        }
    }

    pub fn is_invalid(&self, t: CalendarDateTime) -> bool {
        match t.tag {
            // An absolute instant always resolves to exactly one offset.
            Tag::Absolute => false,
            _ => self.classify_wall(t).is_some_and(|(_, _, c)| c.is_invalid),
        }
    }

    /// Convert `t` (expressed in `self`) to the equivalent wall reading in
    /// `dest`.
    pub fn convert(&self, t: CalendarDateTime, dest: &Zone, options: ConvertOptions) -> Result<CalendarDateTime> {
        if let Tag::Wall { is_dst_if_ambiguous: true } = t.tag {
            if !self.supports_dst() {
                return Err(Error::TagMismatch {
                    detail: format!(
                        "{} claims a daylight-saving disambiguation but {} has no daylight saving rules",
                        t, self.id
                    ),
                });
            }
        }
        if !options.no_throw_on_invalid_time && t.is_wall() && self.is_invalid(t) {
            return Err(Error::InvalidTime { at: t });
        }
        let utc_instant = match t.tag {
            Tag::Absolute => t.as_naive_instant(),
            _ => t.as_naive_instant().saturating_shift_minutes(-self.get_offset(t).minutes()),
        };
        let resolution = eval::offset_from_instant(dest.rules(), dest.base_utc_offset, utc_instant);
        let dest_wall = utc_instant.saturating_shift_minutes(resolution.offset.minutes());
        Ok(CalendarDateTime::from_naive_instant(
            dest_wall,
            Tag::Wall { is_dst_if_ambiguous: resolution.is_dst },
        ))
    }

    /// The two offsets an ambiguous wall reading could mean, ascending.
    pub fn get_ambiguous_offsets(&self, t: CalendarDateTime) -> Result<(Offset, Offset)> {
        if !self.supports_dst() || !self.is_ambiguous(t) {
            return Err(Error::NotAmbiguous { at: t });
        }
        let (rule, window, _) = self
            .classify_wall(t)
            .expect("is_ambiguous() true implies a rule matched");
        let standard = Offset::new_unchecked(self.base_utc_offset.minutes() + rule.base_utc_offset_delta);
        let daylight = Offset::new_unchecked(standard.minutes() + window.delta);
        Ok(if standard <= daylight { (standard, daylight) } else { (daylight, standard) })
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
            && self.base_utc_offset == other.base_utc_offset
            && self.rules == other.rules
    }
}

impl Eq for Zone {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{Instant, Month, Time, Weekday, Year};
    use crate::transition::TransitionTime;

    fn y(n: u16) -> Year {
        Year::new_unchecked(n)
    }

    fn pst_pdt() -> Zone {
        let start = TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::March, 2, Weekday::Sunday);
        let end = TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::November, 1, Weekday::Sunday);
        let date_start = CalendarDateTime::from_naive_instant(Instant::MIN, Tag::Unspecified);
        let date_end = CalendarDateTime::from_naive_instant(Instant::MAX, Tag::Unspecified);
        let rule = AdjustmentRule::transitioning(date_start, date_end, 60, start, end, 0).unwrap();
        Zone::new("America/Los_Angeles", "Pacific Time", "PST", "PDT", Offset::new_unchecked(-480), vec![rule]).unwrap()
    }

    #[test]
    fn test_utc_has_no_dst() {
        let utc = Zone::utc();
        assert!(!utc.supports_dst());
        assert_eq!(utc.base_utc_offset, Offset::ZERO);
    }

    #[test]
    fn test_new_rejects_empty_id() {
        assert!(Zone::new("", "x", "x", "x", Offset::ZERO, Vec::new()).is_err());
    }

    #[test]
    fn test_new_rejects_overlapping_rules() {
        let a = CalendarDateTime::new(y(2020), Month::January, 1, Time::MIDNIGHT, Tag::Absolute);
        let b = CalendarDateTime::new(y(2020), Month::December, 31, Time::MIDNIGHT, Tag::Absolute);
        let c = CalendarDateTime::new(y(2020), Month::June, 1, Time::MIDNIGHT, Tag::Absolute);
        let d = CalendarDateTime::new(y(2021), Month::June, 1, Time::MIDNIGHT, Tag::Absolute);
        let rule1 = AdjustmentRule::no_transition(a, b, 0, 0).unwrap();
        let rule2 = AdjustmentRule::no_transition(c, d, 0, 0).unwrap();
        assert!(Zone::new("Overlap", "Overlap", "STD", "STD", Offset::ZERO, vec![rule1, rule2]).is_err());
    }

    #[test]
    fn test_supports_dst_reflects_rule_deltas() {
        let zone = pst_pdt();
        assert!(zone.supports_dst());
        assert!(!Zone::utc().supports_dst());
    }

    #[test]
    fn test_get_offset_absolute_vs_wall() {
        let zone = pst_pdt();
        let summer_absolute = CalendarDateTime::new(y(2023), Month::July, 15, Time { hour: 12, minute: 0, second: 0, millisecond: 0 }, Tag::Absolute);
        assert_eq!(zone.get_offset(summer_absolute), Offset::new_unchecked(-420));

        let winter_wall = CalendarDateTime::new(y(2023), Month::January, 15, Time { hour: 12, minute: 0, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        assert_eq!(zone.get_offset(winter_wall), Offset::new_unchecked(-480));
    }

    #[test]
    fn test_is_invalid_and_is_ambiguous_are_mutually_exclusive() {
        let zone = pst_pdt();
        let spring_forward = CalendarDateTime::new(y(2023), Month::March, 12, Time { hour: 2, minute: 30, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        assert!(zone.is_invalid(spring_forward));
        assert!(!zone.is_ambiguous(spring_forward));

        let fall_back = CalendarDateTime::new(y(2023), Month::November, 5, Time { hour: 1, minute: 30, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        assert!(zone.is_ambiguous(fall_back));
        assert!(!zone.is_invalid(fall_back));
    }

    #[test]
    fn test_convert_invalid_time_error_unless_opted_out() {
        let zone = pst_pdt();
        let utc = Zone::utc();
        let spring_forward = CalendarDateTime::new(y(2023), Month::March, 12, Time { hour: 2, minute: 30, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        assert!(matches!(zone.convert(spring_forward, &utc, ConvertOptions::default()), Err(Error::InvalidTime { .. })));
        assert!(zone.convert(spring_forward, &utc, ConvertOptions { no_throw_on_invalid_time: true }).is_ok());
    }

    #[test]
    fn test_get_ambiguous_offsets_ordered_ascending() {
        let zone = pst_pdt();
        let fall_back = CalendarDateTime::new(y(2023), Month::November, 5, Time { hour: 1, minute: 30, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        let (standard, daylight) = zone.get_ambiguous_offsets(fall_back).unwrap();
        assert!(standard < daylight);
        assert_eq!(standard, Offset::new_unchecked(-480));
        assert_eq!(daylight, Offset::new_unchecked(-420));
    }

    #[test]
    fn test_get_ambiguous_offsets_errors_when_not_ambiguous() {
        let zone = pst_pdt();
        let ordinary = CalendarDateTime::new(y(2023), Month::July, 15, Time { hour: 12, minute: 0, second: 0, millisecond: 0 }, Tag::Wall { is_dst_if_ambiguous: false });
        assert!(matches!(zone.get_ambiguous_offsets(ordinary), Err(Error::NotAmbiguous { .. })));
    }
}
