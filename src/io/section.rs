use std::io::{self, Read};
use std::sync::Arc;

use super::ReadAt;

/// Sequential [`Read`] over a fixed byte window of a [`ReadAt`] source.
///
/// Each section tracks its own position, so any number of sections can be
/// open over the same source without interfering.
pub struct SectionReader<R: ReadAt> {
    source: Arc<R>,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> SectionReader<R> {
    pub fn new(source: Arc<R>, offset: u64, len: u64) -> Self {
        Self {
            source,
            offset,
            remaining: len,
        }
    }

    #[cfg(test)]
    fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: ReadAt> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.remaining == 0 {
            return Ok(0);
        }

        let want = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.source.read_at(self.offset, &mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended inside section",
            ));
        }

        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_stops_at_window_end() {
        let source = Arc::new(b"..payload..".to_vec());
        let mut section = SectionReader::new(source, 2, 7);

        let mut out = Vec::new();
        section.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
        assert_eq!(section.remaining(), 0);
    }

    #[test]
    fn test_truncated_source_is_an_error() {
        let source = Arc::new(b"short".to_vec());
        let mut section = SectionReader::new(source, 0, 10);

        let mut out = Vec::new();
        let err = section.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
