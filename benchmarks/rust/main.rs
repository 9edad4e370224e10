use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tzrules::{CalendarDateTime, ConvertOptions, Month, Tag, Time, Year, Zone};

/// A v2 TZif blob with one DST transition and a POSIX extended-future tail,
/// built the same way the binary decoder's own unit tests build fixtures.
fn pst_pdt_bytes() -> Vec<u8> {
    fn v1_body(transitions: &[(i32, u8)], types: &[(i32, bool, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"TZif");
        out.push(0);
        out.extend_from_slice(&[0u8; 15]);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(transitions.len() as u32).to_be_bytes());
        out.extend_from_slice(&(types.len() as u32).to_be_bytes());
        let mut abbrevs = Vec::new();
        let mut abbrev_offsets = Vec::new();
        for (_, _, name) in types {
            abbrev_offsets.push(abbrevs.len() as u8);
            abbrevs.extend_from_slice(name.as_bytes());
            abbrevs.push(0);
        }
        out.extend_from_slice(&(abbrevs.len() as u32).to_be_bytes());
        for (t, _) in transitions {
            out.extend_from_slice(&t.to_be_bytes());
        }
        for (_, idx) in transitions {
            out.push(*idx);
        }
        for (i, (offset, is_dst, _)) in types.iter().enumerate() {
            out.extend_from_slice(&offset.to_be_bytes());
            out.push(*is_dst as u8);
            out.push(abbrev_offsets[i]);
        }
        out.extend_from_slice(&abbrevs);
        out
    }

    let types = [(-28800, false, "PST"), (-25200, true, "PDT")];
    let v1_transitions = [(1_000_000_000, 1u8)];
    let v1 = v1_body(&v1_transitions, &types);
    let mut out = v1.clone();
    out[4] = b'2';

    let mut abbrevs = Vec::new();
    let mut abbrev_offsets = Vec::new();
    for (_, _, name) in types.iter() {
        abbrev_offsets.push(abbrevs.len() as u8);
        abbrevs.extend_from_slice(name.as_bytes());
        abbrevs.push(0);
    }
    let transitions: [(i64, u8); 1] = [(1_000_000_000, 1)];
    let mut body2 = Vec::new();
    body2.extend_from_slice(b"TZif");
    body2.push(b'2');
    body2.extend_from_slice(&[0u8; 15]);
    body2.extend_from_slice(&0u32.to_be_bytes());
    body2.extend_from_slice(&0u32.to_be_bytes());
    body2.extend_from_slice(&0u32.to_be_bytes());
    body2.extend_from_slice(&(transitions.len() as u32).to_be_bytes());
    body2.extend_from_slice(&(types.len() as u32).to_be_bytes());
    body2.extend_from_slice(&(abbrevs.len() as u32).to_be_bytes());
    for (t, _) in transitions.iter() {
        body2.extend_from_slice(&t.to_be_bytes());
    }
    for (_, idx) in transitions.iter() {
        body2.push(*idx);
    }
    for (i, (offset, is_dst, _)) in types.iter().enumerate() {
        body2.extend_from_slice(&offset.to_be_bytes());
        body2.push(*is_dst as u8);
        body2.push(abbrev_offsets[i]);
    }
    body2.extend_from_slice(&abbrevs);
    body2.push(b'\n');
    body2.extend_from_slice(b"PST8PDT,M3.2.0,M11.1.0/2");
    body2.push(b'\n');

    out.extend_from_slice(&body2);
    out
}

fn sample_wall_time() -> CalendarDateTime {
    CalendarDateTime::new(
        Year::new(2023).unwrap(),
        Month::July,
        15,
        Time { hour: 12, minute: 0, second: 0, millisecond: 0 },
        Tag::Wall { is_dst_if_ambiguous: false },
    )
}

fn bench_decode_binary(c: &mut Criterion) {
    let bytes = pst_pdt_bytes();
    c.bench_function("decode_binary_v2_with_posix_tail", |b| {
        b.iter(|| black_box(tzrules::decode_binary(black_box(&bytes), "America/Los_Angeles")))
    });
}

fn bench_get_offset(c: &mut Criterion) {
    let zone = tzrules::decode_binary(&pst_pdt_bytes(), "America/Los_Angeles").unwrap();
    let t = sample_wall_time();
    c.bench_function("zone_get_offset", |b| {
        b.iter(|| black_box(zone.get_offset(black_box(t))))
    });
}

fn bench_convert(c: &mut Criterion) {
    let zone = tzrules::decode_binary(&pst_pdt_bytes(), "America/Los_Angeles").unwrap();
    let utc = Zone::utc();
    let t = sample_wall_time();
    c.bench_function("zone_convert_to_utc", |b| {
        b.iter(|| black_box(zone.convert(black_box(t), &utc, ConvertOptions::default())))
    });
}

fn bench_text_roundtrip(c: &mut Criterion) {
    let zone = tzrules::decode_binary(&pst_pdt_bytes(), "America/Los_Angeles").unwrap();
    let text = tzrules::serialize_zone(&zone);
    c.bench_function("zone_text_deserialize", |b| {
        b.iter(|| black_box(tzrules::deserialize_zone(black_box(&text))))
    });
}

criterion_group!(benches, bench_decode_binary, bench_get_offset, bench_convert, bench_text_roundtrip);
criterion_main!(benches);
