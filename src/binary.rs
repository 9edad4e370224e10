//! Binary tz-database (TZif) decoder: versions 1, 2, and 3, per §4.7.
//!
//! Grounded in the teacher's `tz::tzif` module (magic/header parsing, the
//! v1-body-then-v2-reparse dance, big-endian transition arrays) but the
//! output shape is different: instead of a flat `(time, offset)` lookup
//! table, this decoder emits the crate's `AdjustmentRule` array so the same
//! evaluation engine in `eval` serves binary-decoded, registry-decoded, and
//! text-decoded zones alike.
use crate::calendar::{CalendarDateTime, Tag};
use crate::error::{Error, Result};
use crate::parse::Scan;
use crate::posix;
use crate::rule::AdjustmentRule;
use crate::scalar::{Instant, Offset};
use crate::zone::Zone;

#[derive(Debug, Clone, Copy)]
struct Header {
    version: u8,
    is_gmt_count: u32,
    is_std_count: u32,
    leap_count: u32,
    time_count: u32,
    type_count: u32,
    char_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct TypeRecord {
    /// UTC offset in whole seconds, as stored in the file.
    utc_offset_seconds: i32,
    is_dst: bool,
    abbrev_index: u8,
}

fn invalid(detail: impl Into<String>) -> Error {
    Error::InvalidZone { detail: detail.into() }
}

fn read_be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(bytes.try_into().unwrap())
}

fn read_be_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes(bytes.try_into().unwrap())
}

fn read_be_i64(bytes: &[u8]) -> i64 {
    i64::from_be_bytes(bytes.try_into().unwrap())
}

fn parse_header(s: &mut Scan) -> Result<Header> {
    if s.take(4) != Some(b"TZif") {
        return Err(invalid("missing TZif magic"));
    }
    let version = match s.next().ok_or_else(|| invalid("truncated header"))? {
        0 => 0,
        b @ b'2' | b @ b'3' => b,
        other => return Err(invalid(format!("unrecognized version byte {other}"))),
    };
    s.take(15).ok_or_else(|| invalid("truncated header reserved bytes"))?;
    let counts = s.take(24).ok_or_else(|| invalid("truncated header counts"))?;
    Ok(Header {
        version,
        is_gmt_count: read_be_u32(&counts[0..4]),
        is_std_count: read_be_u32(&counts[4..8]),
        leap_count: read_be_u32(&counts[8..12]),
        time_count: read_be_u32(&counts[12..16]),
        type_count: read_be_u32(&counts[16..20]),
        char_count: read_be_u32(&counts[20..24]),
    })
}

/// Size, in bytes, of one version's body (not counting the header already
/// consumed), used both to skip the v1 payload ahead of a v2/v3 re-parse and
/// to skip the trailing leap/std/gmt flag sections after the transitions.
fn body_size(header: &Header, time_width: u32) -> usize {
    (header.time_count * time_width
        + header.time_count
        + header.type_count * 6
        + header.char_count
        + header.leap_count * (time_width + 4)
        + header.is_std_count
        + header.is_gmt_count) as usize
}

fn parse_transitions(header: &Header, time_width: u32, s: &mut Scan) -> Result<Vec<Instant>> {
    let count = header.time_count as usize;
    let mut out = Vec::with_capacity(count);
    let bytes = s
        .take(count * time_width as usize)
        .ok_or_else(|| invalid("truncated transition times"))?;
    for i in 0..count {
        let chunk = &bytes[i * time_width as usize..(i + 1) * time_width as usize];
        let secs = if time_width == 8 { read_be_i64(chunk) } else { read_be_i32(chunk) as i64 };
        out.push(Instant::from_unix_seconds(secs));
    }
    Ok(out)
}

fn parse_type_indices(header: &Header, s: &mut Scan) -> Result<Vec<u8>> {
    s.take(header.time_count as usize)
        .map(|b| b.to_vec())
        .ok_or_else(|| invalid("truncated transition type indices"))
}

fn round_seconds_to_minutes(seconds: i32) -> i32 {
    let sign = if seconds < 0 { -1 } else { 1 };
    (seconds + sign * 30) / 60
}

fn parse_types(header: &Header, s: &mut Scan) -> Result<(Vec<TypeRecord>, Vec<u8>)> {
    let count = header.type_count as usize;
    if count == 0 {
        return Err(invalid("zero type records"));
    }
    let mut types = Vec::with_capacity(count);
    let bytes = s.take(count * 6).ok_or_else(|| invalid("truncated type records"))?;
    for i in 0..count {
        let rec = &bytes[i * 6..(i + 1) * 6];
        types.push(TypeRecord {
            utc_offset_seconds: read_be_i32(&rec[0..4]),
            is_dst: rec[4] != 0,
            abbrev_index: rec[5],
        });
    }
    let abbrevs = s.take(header.char_count as usize).ok_or_else(|| invalid("truncated abbreviation chars"))?.to_vec();
    Ok((types, abbrevs))
}

fn abbrev_at(abbrevs: &[u8], index: u8) -> String {
    let start = index as usize;
    let rest = abbrevs.get(start..).unwrap_or(&[]);
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

fn skip_trailer(header: &Header, s: &mut Scan) -> Result<()> {
    s.take((header.leap_count * 12 + header.is_std_count + header.is_gmt_count) as usize)
        .ok_or_else(|| invalid("truncated leap/std/gmt trailer"))?;
    Ok(())
}

/// Pick the zone's base UTC offset per §4.7: the most recent non-DST type's
/// offset, scanning transitions up to the current wall-clock; if there are
/// no transitions before now, the first non-DST type; if none, the first
/// type. Rounded to whole minutes.
fn pick_zone_base_offset(transitions: &[Instant], indices: &[u8], types: &[TypeRecord]) -> i32 {
    let now = Instant::from_unix_seconds(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
    );
    let mut most_recent_non_dst: Option<i32> = None;
    for (&t, &idx) in transitions.iter().zip(indices) {
        if t > now {
            break;
        }
        if let Some(ty) = types.get(idx as usize) {
            if !ty.is_dst {
                most_recent_non_dst = Some(ty.utc_offset_seconds);
            }
        }
    }
    let chosen = most_recent_non_dst
        .or_else(|| types.iter().find(|t| !t.is_dst).map(|t| t.utc_offset_seconds))
        .unwrap_or(types[0].utc_offset_seconds);
    round_seconds_to_minutes(chosen)
}

struct Segment {
    start: Instant,
    end: Instant,
    type_index: u8,
}

/// Collapse (transitions, type_indices) into validity segments, coalescing
/// any transitions before `Instant::MIN` into a single opening segment.
fn build_segments(transitions: &[Instant], indices: &[u8], types: &[TypeRecord]) -> Vec<Segment> {
    let mut segments = Vec::new();
    if transitions.is_empty() {
        return segments;
    }
    // The opening type: the first standard-time type if one exists, else the
    // first type overall.
    let opening_index = types
        .iter()
        .position(|t| !t.is_dst)
        .unwrap_or(0);
    let first_real = transitions.iter().position(|&t| t > Instant::MIN);
    if let Some(n) = first_real {
        if n > 0 {
            log::warn!("binary decoder: coalescing {n} pre-MinInstant transition(s) into the opening rule");
        }
    }
    let mut prev_end = Instant::MIN;
    let mut prev_type = match first_real {
        Some(0) | None => opening_index as u8,
        Some(i) => indices[i - 1],
    };
    let start_idx = first_real.unwrap_or(transitions.len());
    for i in start_idx..transitions.len() {
        let t = transitions[i];
        segments.push(Segment { start: prev_end, end: Instant::new_unchecked(t.get() - 1), type_index: prev_type });
        prev_end = t;
        prev_type = indices[i];
    }
    segments.push(Segment { start: prev_end, end: Instant::MAX, type_index: prev_type });
    segments
}

fn build_zone_from_parts(
    id: &str,
    transitions: Vec<Instant>,
    indices: Vec<u8>,
    types: Vec<TypeRecord>,
    abbrevs: Vec<u8>,
    tail: Option<Vec<u8>>,
) -> Result<Zone> {
    if types.is_empty() {
        return Err(invalid("no type records"));
    }
    let base_minutes = if transitions.is_empty() {
        round_seconds_to_minutes(types.iter().find(|t| !t.is_dst).map_or(types[0].utc_offset_seconds, |t| t.utc_offset_seconds))
    } else {
        pick_zone_base_offset(&transitions, &indices, &types)
    };
    let base = Offset::new(base_minutes).ok_or_else(|| invalid("zone base offset out of range"))?;

    let segments = build_segments(&transitions, &indices, &types);
    let mut rules = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        // The tail rule takes over from the last segment's end when an
        // extended-future string is present; only emit a plain no-transition
        // rule for the final segment when there isn't one.
        let is_last = i + 1 == segments.len();
        if is_last && tail.is_some() {
            continue;
        }
        let ty = types.get(seg.type_index as usize).ok_or_else(|| invalid("type index out of range"))?;
        let offset_minutes = round_seconds_to_minutes(ty.utc_offset_seconds);
        let delta = offset_minutes - base_minutes;
        let date_start = CalendarDateTime::from_naive_instant(seg.start, Tag::Absolute);
        let date_end = CalendarDateTime::from_naive_instant(seg.end, Tag::Absolute);
        let (daylight_delta, base_delta) = if ty.is_dst { (delta, 0) } else { (0, delta) };
        let mut rule = AdjustmentRule::no_transition(date_start, date_end, daylight_delta, base_delta)
            .ok_or_else(|| invalid("decoded rule failed validation"))?;
        if ty.is_dst && rule.daylight_delta == 0 {
            // Preserve the HasDaylightSaving classification bit even when the
            // DST type happens to carry the same offset as standard time.
            rule.daylight_transition_start = crate::rule::dst_sentinel_transition();
        }
        rules.push(rule);
    }

    if let Some(tail_bytes) = tail {
        let last_end = rules.last().map_or(Instant::MIN, |r: &AdjustmentRule| {
            Instant::new_unchecked(r.date_end.as_naive_instant().get() + 1)
        });
        let start = if rules.is_empty() { Instant::MIN } else { last_end };
        rules.push(posix::build_tail_rule(&tail_bytes, start, base)?);
    }

    let standard_index = types.iter().position(|t| !t.is_dst && round_seconds_to_minutes(t.utc_offset_seconds) == base_minutes)
        .or_else(|| types.iter().position(|t| !t.is_dst))
        .unwrap_or(0);
    let daylight_index = types.iter().position(|t| t.is_dst);
    let standard_name = abbrev_at(&abbrevs, types[standard_index].abbrev_index);
    let daylight_name = daylight_index.map_or_else(|| standard_name.clone(), |i| abbrev_at(&abbrevs, types[i].abbrev_index));

    log::debug!("binary decoder: {id} decoded to {} rule(s), base offset {base}", rules.len());
    Zone::new(id, id, standard_name, daylight_name, base, rules)
}

/// Decode a tz-database v1/v2/v3 blob into a [`Zone`].
pub fn decode(bytes: &[u8], id: &str) -> Result<Zone> {
    let mut scan = Scan::new(bytes);
    let header = parse_header(&mut scan)?;

    if header.version == 0 {
        let transitions = parse_transitions(&header, 4, &mut scan)?;
        let indices = parse_type_indices(&header, &mut scan)?;
        let (types, abbrevs) = parse_types(&header, &mut scan)?;
        return build_zone_from_parts(id, transitions, indices, types, abbrevs, None);
    }

    // v2/v3: skip the redundant v1 body, then re-parse a 64-bit header/body.
    scan.skip(body_size(&header, 4));
    let header2 = parse_header(&mut scan)?;
    let transitions = parse_transitions(&header2, 8, &mut scan)?;
    let indices = parse_type_indices(&header2, &mut scan)?;
    let (types, abbrevs) = parse_types(&header2, &mut scan)?;
    skip_trailer(&header2, &mut scan)?;
    let tail_line = scan
        .take_until(|b| b == b'\n')
        .ok_or_else(|| invalid("missing extended-future opening newline"))?;
    if !tail_line.is_empty() {
        return Err(invalid("unexpected data before extended-future string"));
    }
    scan.skip(1);
    let tail = scan.take_until(|b| b == b'\n').unwrap_or_else(|| scan.rest());
    let tail = if tail.is_empty() { None } else { Some(tail.to_vec()) };

    build_zone_from_parts(id, transitions, indices, types, abbrevs, tail)
}
