//! Memory-trace parsing.
//!
//! One record per line: an access kind (`r` or `w`, case-insensitive)
//! followed by a hexadecimal address with an optional `0x` prefix. Blank
//! lines and `#` comments are skipped.

use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{hex_digit1, space1},
    combinator::{map, map_res, opt},
    IResult,
};

use crate::cache::AccessKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub address: u32,
}

pub struct Trace {
    records: Vec<TraceRecord>,
}

impl Trace {
    pub fn parse(input: &str) -> Result<Self> {
        let mut records = Vec::new();
        for (lineno, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (rest, record) = parse_record(line)
                .map_err(|e| anyhow!("trace line {}: {e}", lineno + 1))?;
            if !rest.trim().is_empty() {
                return Err(anyhow!(
                    "trace line {}: trailing input {rest:?}",
                    lineno + 1
                ));
            }
            records.push(record);
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_kind(input: &str) -> IResult<&str, AccessKind> {
    alt((
        map(tag_no_case("r"), |_| AccessKind::Read),
        map(tag_no_case("w"), |_| AccessKind::Write),
    ))(input)
}

fn parse_address(input: &str) -> IResult<&str, u32> {
    let (input, _) = opt(tag_no_case("0x"))(input)?;
    map_res(hex_digit1, |s: &str| u32::from_str_radix(s, 16))(input)
}

fn parse_record(input: &str) -> IResult<&str, TraceRecord> {
    let (input, kind) = parse_kind(input)?;
    let (input, _) = space1(input)?;
    let (input, address) = parse_address(input)?;
    Ok((input, TraceRecord { kind, address }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let trace_str = "\
# warmup
r 0x00001000
w 2000

R 0X00003abc
W fffffffc
";
        let t = Trace::parse(trace_str).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(
            t.records()[0],
            TraceRecord {
                kind: AccessKind::Read,
                address: 0x1000
            }
        );
        assert_eq!(t.records()[1].kind, AccessKind::Write);
        assert_eq!(t.records()[1].address, 0x2000);
        assert_eq!(t.records()[2].address, 0x3ABC);
        assert_eq!(t.records()[3].address, 0xFFFF_FFFC);
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(Trace::parse("x 0x1000").is_err());
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        assert!(Trace::parse("r 0x1000 junk").is_err());
    }

    #[test]
    fn test_rejects_oversized_address() {
        assert!(Trace::parse("r 0x100000000").is_err());
    }
}
