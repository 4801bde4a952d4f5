//! Vector stream and file I/O
//!
//! Text format: a length `n`, then `n` whitespace-separated values. A vector
//! pair shares one leading length and is followed by `2n` values, first
//! vector then second. Line breaks carry no meaning.
//!
//! Scalars are persisted as a raw native-endian `f64`.

use crate::error::ReduceError;
use crate::Result;
use std::fs::File;
use std::io::{BufRead, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Whitespace tokenizer over a buffered reader, tracking token positions
pub struct Tokens<R> {
    reader: R,
    pending: Vec<String>,
    position: usize,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            // Reverse so pop() yields tokens in order
            self.pending = line.split_whitespace().rev().map(str::to_string).collect();
        }
        self.position += 1;
        Ok(self.pending.pop())
    }

    /// Parse the next token as `T`, describing it as `what` in errors
    pub fn parse_next<T: FromStr>(&mut self, what: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let position = self.position + 1;
        let token = self.next_token()?.ok_or_else(|| ReduceError::Parse {
            position,
            message: format!("unexpected end of input while reading {}", what),
        })?;
        token.parse::<T>().map_err(|e| ReduceError::Parse {
            position,
            message: format!("invalid {} {:?}: {}", what, token, e),
        })
    }
}

fn read_length<R: BufRead>(tokens: &mut Tokens<R>) -> Result<usize> {
    let len: i64 = tokens.parse_next("vector length")?;
    usize::try_from(len).map_err(|_| ReduceError::Parse {
        position: 1,
        message: format!("vector length must not be negative, got {}", len),
    })
}

fn read_values<R: BufRead>(tokens: &mut Tokens<R>, len: usize, label: &str) -> Result<Vec<f64>> {
    (0..len)
        .map(|i| tokens.parse_next(&format!("{} element {}", label, i)))
        .collect()
}

/// Read one length-prefixed vector
pub fn read_vector<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut tokens = Tokens::new(reader);
    let len = read_length(&mut tokens)?;
    read_values(&mut tokens, len, "vector")
}

/// Read two vectors sharing one leading length
pub fn read_vector_pair<R: BufRead>(reader: R) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut tokens = Tokens::new(reader);
    let len = read_length(&mut tokens)?;
    let first = read_values(&mut tokens, len, "first vector")?;
    let second = read_values(&mut tokens, len, "second vector")?;
    Ok((first, second))
}

/// Write a length-prefixed vector readable by [`read_vector`]
pub fn write_vector<W: Write>(values: &[f64], mut writer: W) -> Result<()> {
    writeln!(writer, "{}", values.len())?;
    let line = values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", line)?;
    writer.flush()?;
    Ok(())
}

/// Persist a scalar as a raw native-endian `f64`
pub fn write_scalar(path: &Path, value: f64) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(&value.to_ne_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Read back a scalar written by [`write_scalar`]
pub fn read_scalar(path: &Path) -> Result<f64> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    Ok(f64::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_vector_pair_across_lines() {
        let input = "3\n1.0 2.0\n3.0\n4 5 6\n";
        let (a, b) = read_vector_pair(Cursor::new(input)).unwrap();
        assert_eq!(a, vec![1.0, 2.0, 3.0]);
        assert_eq!(b, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_short_input_is_parse_error() {
        let err = read_vector_pair(Cursor::new("3\n1 2 3\n4 5\n")).unwrap_err();
        match err {
            ReduceError::Parse { position, message } => {
                assert_eq!(position, 7);
                assert!(message.contains("end of input"));
                assert!(message.contains("second vector element 2"));
            }
            other => panic!("Wrong error: {other}"),
        }
    }

    #[test]
    fn test_malformed_token_is_parse_error() {
        let err = read_vector(Cursor::new("2\n1.5 abc\n")).unwrap_err();
        assert!(matches!(err, ReduceError::Parse { position: 3, .. }));

        assert!(read_vector(Cursor::new("-1\n")).is_err());
        assert!(read_vector(Cursor::new("")).is_err());
    }

    #[test]
    fn test_write_then_read_vector() {
        let values = vec![0.1, -2.5, 1e-12, 3.0];
        let mut buf = Vec::new();
        write_vector(&values, &mut buf).unwrap();
        assert_eq!(read_vector(Cursor::new(buf)).unwrap(), values);
    }

    #[test]
    fn test_scalar_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputfile");
        write_scalar(&path, 42.125).unwrap();
        assert_eq!(read_scalar(&path).unwrap(), 42.125);

        std::fs::write(&path, [0u8; 3]).unwrap();
        assert!(matches!(read_scalar(&path).unwrap_err(), ReduceError::Io(_)));
    }
}
