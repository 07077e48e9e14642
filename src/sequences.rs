// Substitution value providers for idox
// Each provider is single-pass: once exhausted it keeps returning None

use crate::error::IdoxError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A forward-only source of tokens to substitute into the request template.
pub trait Sequence: Send {
    /// Produce the next token, or `None` once the sequence is exhausted.
    fn next_token(&mut self) -> Option<String>;

    /// Stop after at most `n` tokens. Use this to cap unbounded sequences.
    fn limit(self, n: usize) -> Limited<Self>
    where
        Self: Sized,
    {
        Limited {
            inner: self,
            remaining: n,
        }
    }
}

impl<S: Sequence + ?Sized> Sequence for Box<S> {
    fn next_token(&mut self) -> Option<String> {
        (**self).next_token()
    }
}

/// Decimal tokens `start, start + step, ...`, stopping before `end` when bounded.
///
/// Without an end the sequence never terminates on its own; it also ends
/// if the next value would overflow `i64`.
#[derive(Debug, Clone)]
pub struct NumericSequence {
    next: Option<i64>,
    end: Option<i64>,
    step: i64,
}

impl NumericSequence {
    pub fn new(start: i64, end: Option<i64>, step: i64) -> Result<Self, IdoxError> {
        if step == 0 {
            return Err(IdoxError::InvalidStep);
        }
        Ok(Self {
            next: Some(start),
            end,
            step,
        })
    }

    /// `start..end` with a step of one.
    pub fn range(start: i64, end: i64) -> Self {
        Self {
            next: Some(start),
            end: Some(end),
            step: 1,
        }
    }

    pub fn unbounded(start: i64, step: i64) -> Result<Self, IdoxError> {
        Self::new(start, None, step)
    }

    fn in_bounds(&self, value: i64) -> bool {
        match self.end {
            Some(end) if self.step > 0 => value < end,
            Some(end) => value > end,
            None => true,
        }
    }
}

impl Sequence for NumericSequence {
    fn next_token(&mut self) -> Option<String> {
        let value = self.next.filter(|v| self.in_bounds(*v))?;
        self.next = value.checked_add(self.step);
        Some(value.to_string())
    }
}

/// One token per line of a file, read lazily in file order.
///
/// A trailing newline does not produce an empty final token, but empty lines
/// in the middle of the file do. `\r\n` line endings are accepted. Bytes that
/// are not valid UTF-8 are replaced with U+FFFD so the line is still sent.
pub struct FileSequence {
    reader: Option<BufReader<File>>,
    line: u64,
}

impl FileSequence {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdoxError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IdoxError::SequenceFileMissing {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|source| IdoxError::SequenceFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            reader: Some(BufReader::new(file)),
            line: 0,
        })
    }
}

impl Sequence for FileSequence {
    fn next_token(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(_) => {
                self.line += 1;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                let token = match String::from_utf8(buf) {
                    Ok(token) => token,
                    Err(e) => {
                        tracing::warn!(line = self.line, "sequence file line is not valid UTF-8, decoding lossily");
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                Some(token)
            }
            Err(e) => {
                tracing::error!(line = self.line + 1, error = %e, "stopped reading sequence file");
                self.reader = None;
                None
            }
        }
    }
}

/// Wraps any iterator of strings supplied by the caller.
pub struct CustomSequence<I> {
    iter: std::iter::Fuse<I>,
}

impl<I: Iterator<Item = String>> CustomSequence<I> {
    pub fn new<T>(values: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: values.into_iter().fuse(),
        }
    }
}

impl<I: Iterator<Item = String> + Send> Sequence for CustomSequence<I> {
    fn next_token(&mut self) -> Option<String> {
        self.iter.next()
    }
}

/// See [`Sequence::limit`].
pub struct Limited<S> {
    inner: S,
    remaining: usize,
}

impl<S: Sequence> Sequence for Limited<S> {
    fn next_token(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        let token = self.inner.next_token()?;
        self.remaining -= 1;
        Some(token)
    }
}
