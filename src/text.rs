//! The delimited textual codec (C8), per §4.9: serialize/deserialize a
//! [`Zone`] to and from the crate's stable wire format.
//!
//! Grounded in the teacher's hand-rolled `Scan`-based parsers (no external
//! parser-combinator crate, explicit cursor + `Option`/`Result` plumbing)
//! rather than pulling in `serde` for a format this specialized.
use crate::calendar::{CalendarDateTime, Tag};
use crate::error::{Error, Result};
use crate::rule::AdjustmentRule;
use crate::scalar::{Date, Month, Offset, Time, Weekday, Year};
use crate::transition::TransitionTime;
use crate::zone::Zone;

const ESCAPED: [char; 4] = ['\\', ';', '[', ']'];

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if ESCAPED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn err(detail: impl Into<String>) -> Error {
    Error::SerializationError { detail: detail.into() }
}

/// Serialize `zone` to the delimited text format.
pub fn serialize(zone: &Zone) -> String {
    let mut out = String::new();
    out.push_str(&escape(&zone.id));
    out.push(';');
    out.push_str(&zone.base_utc_offset.minutes().to_string());
    out.push(';');
    out.push_str(&escape(&zone.display_name));
    out.push(';');
    out.push_str(&escape(&zone.standard_name));
    out.push(';');
    out.push_str(&escape(&zone.daylight_name));
    out.push(';');
    for rule in zone.rules() {
        out.push_str(&serialize_rule(rule));
    }
    out.push(';');
    out
}

fn serialize_date(t: CalendarDateTime) -> String {
    let time = t.time;
    if time == Time::MIDNIGHT {
        format!("{:02}:{:02}:{:04}", t.date.month.get(), t.date.day, t.date.year.get())
    } else {
        format!(
            "{:02}:{:02}:{:04}:{:02}:{:02}:{:02}.{:03}",
            t.date.month.get(),
            t.date.day,
            t.date.year.get(),
            time.hour,
            time.minute,
            time.second,
            time.millisecond
        )
    }
}

fn serialize_time_of_day(t: Time) -> String {
    format!("{:02}:{:02}:{:02}.{:03}", t.hour, t.minute, t.second, t.millisecond)
}

fn serialize_transition(tt: &TransitionTime) -> String {
    let mut out = String::from("[");
    match *tt {
        TransitionTime::FixedDate { time_of_day, month, day } => {
            out.push_str("1;");
            out.push_str(&serialize_time_of_day(time_of_day));
            out.push(';');
            out.push_str(&month.get().to_string());
            out.push(';');
            out.push_str(&day.to_string());
            out.push(';');
        }
        TransitionTime::Floating { time_of_day, month, week, day_of_week } => {
            out.push_str("0;");
            out.push_str(&serialize_time_of_day(time_of_day));
            out.push(';');
            out.push_str(&month.get().to_string());
            out.push(';');
            out.push_str(&week.to_string());
            out.push(';');
            out.push_str(&day_of_week.sunday0().to_string());
            out.push(';');
        }
    }
    out.push(']');
    out
}

fn serialize_rule(rule: &AdjustmentRule) -> String {
    let mut out = String::from("[");
    out.push_str(&serialize_date(rule.date_start));
    out.push(';');
    out.push_str(&serialize_date(rule.date_end));
    out.push(';');
    out.push_str(&rule.daylight_delta.to_string());
    out.push(';');
    out.push_str(&serialize_transition(&rule.daylight_transition_start));
    out.push(';');
    out.push_str(&serialize_transition(&rule.daylight_transition_end));
    out.push(';');
    if rule.base_utc_offset_delta != 0 {
        out.push_str(&rule.base_utc_offset_delta.to_string());
        out.push(';');
    }
    if rule.no_daylight_transitions {
        out.push_str("1;");
    }
    out.push(']');
    out
}

/// Deserialize a [`Zone`] previously produced by [`serialize`].
pub fn deserialize(s: &str) -> Result<Zone> {
    let chars: Vec<char> = s.chars().collect();
    let mut r = Reader { s: &chars, i: 0 };
    let id = r.read_field()?;
    let offset_minutes: i32 = r.read_field()?.parse().map_err(|_| err("bad base offset"))?;
    let base = Offset::new(offset_minutes).ok_or_else(|| err("base offset out of range"))?;
    let display = r.read_field()?;
    let standard = r.read_field()?;
    let daylight = r.read_field()?;

    let mut rules = Vec::new();
    while r.peek() == Some('[') {
        rules.push(r.read_rule()?);
    }
    if r.peek() == Some(';') {
        r.next();
    }
    if !r.is_done() {
        return Err(err("trailing data after zone"));
    }

    Zone::new(id, display, standard, daylight, base, rules)
}

struct Reader<'a> {
    s: &'a [char],
    i: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<char> {
        self.s.get(self.i).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += 1;
        Some(c)
    }

    fn is_done(&self) -> bool {
        self.i >= self.s.len()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.next() == Some(c) {
            Ok(())
        } else {
            Err(err(format!("expected '{c}'")))
        }
    }

    /// Read characters up to (and consuming) the next unescaped `;`,
    /// unescaping `\\`, `\;`, `\[`, `\]` along the way.
    fn read_field(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.next().ok_or_else(|| err("unterminated field"))? {
                ';' => return Ok(out),
                '\\' => {
                    let escaped = self.next().ok_or_else(|| err("dangling escape"))?;
                    if !ESCAPED.contains(&escaped) {
                        return Err(err(format!("invalid escape sequence '\\{escaped}'")));
                    }
                    out.push(escaped);
                }
                c => out.push(c),
            }
        }
    }

    fn read_date(&mut self) -> Result<CalendarDateTime> {
        let field = self.read_field()?;
        let parts: Vec<&str> = field.split(':').collect();
        if parts.len() != 3 && parts.len() != 7 {
            return Err(err("malformed date field"));
        }
        let month = parts[0].parse::<u8>().ok().and_then(Month::new).ok_or_else(|| err("bad month"))?;
        let day: u8 = parts[1].parse().map_err(|_| err("bad day"))?;
        let year = parts[2].parse::<u16>().ok().and_then(Year::new).ok_or_else(|| err("bad year"))?;
        let time = if parts.len() == 7 {
            Time {
                hour: parts[3].parse().map_err(|_| err("bad hour"))?,
                minute: parts[4].parse().map_err(|_| err("bad minute"))?,
                second: parts[5].parse().map_err(|_| err("bad second"))?,
                millisecond: parts[6].parse().map_err(|_| err("bad millisecond"))?,
            }
        } else {
            Time::MIDNIGHT
        };
        Ok(CalendarDateTime::from_date_time(Date { year, month, day }, time, Tag::Unspecified))
    }

    fn read_time_of_day(&mut self) -> Result<Time> {
        let field = self.read_field()?;
        let parts: Vec<&str> = field.split(':').collect();
        if parts.len() != 4 {
            return Err(err("malformed time-of-day field"));
        }
        let sec_parts: Vec<&str> = parts[2].split('.').collect();
        if sec_parts.len() != 2 {
            return Err(err("malformed time-of-day seconds"));
        }
        Ok(Time {
            hour: parts[0].parse().map_err(|_| err("bad hour"))?,
            minute: parts[1].parse().map_err(|_| err("bad minute"))?,
            second: sec_parts[0].parse().map_err(|_| err("bad second"))?,
            millisecond: sec_parts[1].parse().map_err(|_| err("bad millisecond"))?,
        })
    }

    /// Read `[isFixed;timeOfDay;month;(day|week;dayOfWeek);...]`, skipping
    /// any unrecognized trailing fields before the closing bracket.
    fn read_transition(&mut self) -> Result<TransitionTime> {
        self.expect('[')?;
        let is_fixed = match self.read_field()?.as_str() {
            "1" => true,
            "0" => false,
            _ => return Err(err("bad isFixed flag")),
        };
        let time_of_day = self.read_time_of_day()?;
        let month = self.read_field()?.parse::<u8>().ok().and_then(Month::new).ok_or_else(|| err("bad month"))?;
        let tt = if is_fixed {
            let day: u8 = self.read_field()?.parse().map_err(|_| err("bad day"))?;
            TransitionTime::fixed_date(time_of_day, month, day)
        } else {
            let week: u8 = self.read_field()?.parse().map_err(|_| err("bad week"))?;
            if !(1..=5).contains(&week) {
                return Err(err("week out of range"));
            }
            let day_of_week = self.read_field()?.parse::<u8>().ok().and_then(Weekday::new).ok_or_else(|| err("bad day-of-week"))?;
            TransitionTime::floating(time_of_day, month, week, day_of_week)
        };
        while self.peek() != Some(']') {
            if self.is_done() {
                return Err(err("unterminated transition block"));
            }
            self.read_field()?;
        }
        self.expect(']')?;
        Ok(tt)
    }

    fn read_rule(&mut self) -> Result<AdjustmentRule> {
        self.expect('[')?;
        let date_start = self.read_date()?;
        let date_end = self.read_date()?;
        let daylight_delta: i32 = self.read_field()?.parse().map_err(|_| err("bad daylight delta"))?;
        let start_tt = self.read_transition()?;
        self.expect(';')?;
        let end_tt = self.read_transition()?;
        self.expect(';')?;

        let mut trailing = Vec::new();
        while self.peek() != Some(']') {
            if self.is_done() {
                return Err(err("unterminated rule block"));
            }
            trailing.push(self.read_field()?);
        }
        self.expect(']')?;

        let no_daylight_transitions = trailing.last().is_some_and(|f| f == "1");
        if no_daylight_transitions {
            trailing.pop();
        }
        let base_utc_offset_delta = match trailing.first() {
            Some(f) => f.parse().map_err(|_| err("bad base utc offset delta"))?,
            None => 0,
        };

        if no_daylight_transitions {
            AdjustmentRule::no_transition(
                CalendarDateTime { tag: Tag::Absolute, ..date_start },
                CalendarDateTime { tag: Tag::Absolute, ..date_end },
                daylight_delta,
                base_utc_offset_delta,
            )
        } else {
            AdjustmentRule::transitioning(date_start, date_end, daylight_delta, start_tt, end_tt, base_utc_offset_delta)
        }
        .ok_or_else(|| err("rule failed validation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Tag;

    fn y(n: u16) -> Year {
        Year::new_unchecked(n)
    }

    fn sample_zone() -> Zone {
        let start = CalendarDateTime::new(y(1), Month::January, 1, Time::MIDNIGHT, Tag::Unspecified);
        let end = CalendarDateTime::new(y(9999), Month::December, 31, Time::MIDNIGHT, Tag::Unspecified);
        let rule = AdjustmentRule::transitioning(
            start,
            end,
            60,
            TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::March, 2, Weekday::Sunday),
            TransitionTime::floating(Time { hour: 2, minute: 0, second: 0, millisecond: 0 }, Month::November, 1, Weekday::Sunday),
            0,
        )
        .unwrap();
        Zone::new("Test/Zone [x]", "Test Display;", "STD", "DLT", Offset::new_unchecked(-480), vec![rule]).unwrap()
    }

    #[test]
    fn test_roundtrip_transitioning_zone() {
        let zone = sample_zone();
        let text = serialize(&zone);
        let back = deserialize(&text).unwrap();
        assert_eq!(zone, back);
        assert_eq!(zone.display_name, back.display_name);
    }

    #[test]
    fn test_roundtrip_empty_zone() {
        let zone = Zone::new("UTC-ish", "", "", "", Offset::ZERO, Vec::new()).unwrap();
        let text = serialize(&zone);
        let back = deserialize(&text).unwrap();
        assert_eq!(zone, back);
        assert_eq!(back.display_name, "");
    }

    #[test]
    fn test_roundtrip_no_transition_rule_with_base_delta() {
        let date_start = CalendarDateTime::from_naive_instant(crate::scalar::Instant::MIN, Tag::Absolute);
        let date_end = CalendarDateTime::from_naive_instant(crate::scalar::Instant::MAX, Tag::Absolute);
        let rule = AdjustmentRule::no_transition(date_start, date_end, 0, 30).unwrap();
        let zone = Zone::new("Historical", "Historical", "HST", "HST", Offset::new_unchecked(-600), vec![rule]).unwrap();
        let text = serialize(&zone);
        let back = deserialize(&text).unwrap();
        assert_eq!(zone, back);
    }

    #[test]
    fn test_escaping_roundtrips_special_characters() {
        let escaped = escape("a;b[c]d\\e");
        assert_eq!(escaped, "a\\;b\\[c\\]d\\\\e");
    }

    #[test]
    fn test_rejects_bad_escape() {
        assert!(deserialize("a\\qb;0;;;;;").is_err());
    }
}
