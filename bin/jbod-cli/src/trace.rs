//! Trace files for `jbod-cli replay`
//!
//! One operation per line:
//!
//! ```text
//! # comment
//! MOUNT
//! WRITE 1000 300 171    # addr len fill-byte
//! READ 1000 300
//! UNMOUNT
//! ```

use jbod_common::{Error, MAX_IO_SIZE, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    Mount,
    Unmount,
    Read { addr: u32, len: usize },
    Write { addr: u32, len: usize, byte: u8 },
}

pub fn parse_trace(text: &str) -> Result<Vec<TraceOp>> {
    let mut ops = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let op = match fields.as_slice() {
            ["MOUNT"] => TraceOp::Mount,
            ["UNMOUNT"] => TraceOp::Unmount,
            ["READ", addr, len] => TraceOp::Read {
                addr: number(line_no, "address", addr)?,
                len: length(line_no, len)?,
            },
            ["WRITE", addr, len, byte] => TraceOp::Write {
                addr: number(line_no, "address", addr)?,
                len: length(line_no, len)?,
                byte: number(line_no, "fill byte", byte)?,
            },
            [command, ..] => {
                return Err(Error::parse(
                    line_no,
                    format!("unknown or malformed command {command}"),
                ));
            }
            [] => continue,
        };
        ops.push(op);
    }

    Ok(ops)
}

fn number<T: std::str::FromStr>(line: usize, what: &str, field: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid {what}: {field}")))
}

fn length(line: usize, field: &str) -> Result<usize> {
    let len: usize = number(line, "length", field)?;
    if len > MAX_IO_SIZE {
        return Err(Error::parse(
            line,
            format!("length {len} exceeds the {MAX_IO_SIZE}-byte limit"),
        ));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let text = "\
# setup
MOUNT
WRITE 1000 300 171   # fill
READ 1000 300

UNMOUNT
";
        let ops = parse_trace(text).unwrap();
        assert_eq!(
            ops,
            vec![
                TraceOp::Mount,
                TraceOp::Write {
                    addr: 1000,
                    len: 300,
                    byte: 171
                },
                TraceOp::Read {
                    addr: 1000,
                    len: 300
                },
                TraceOp::Unmount,
            ]
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_trace("MOUNT\nFORMAT\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bad_numbers() {
        assert!(parse_trace("READ x 10").is_err());
        assert!(parse_trace("WRITE 0 10 256").is_err());
        assert!(parse_trace("READ 0").is_err());
    }

    #[test]
    fn test_length_limit() {
        assert!(parse_trace("READ 0 1024\nWRITE 0 1024 9").is_ok());
        let err = parse_trace("MOUNT\nREAD 0 18446744073709551615").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
        assert!(parse_trace("WRITE 0 1025 9").is_err());
    }
}
