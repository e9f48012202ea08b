//! Bounded, forward-only cursor over a received frame

use crate::error::ParseError;

/// Read position within a frame plus the frame's end bound.
///
/// Every read checks `pos + len <= end` before touching the buffer and
/// the position only ever moves forward.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCursor<'a> {
    frame: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> HeaderCursor<'a> {
    pub fn new(frame: &'a [u8]) -> Self {
        Self {
            frame,
            pos: 0,
            end: frame.len(),
        }
    }

    /// Current offset from the start of the frame
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end bound
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Take the next `len` bytes as a header named `header`.
    pub fn take(&mut self, header: &'static str, len: usize) -> Result<&'a [u8], ParseError> {
        let bytes = self.peek(header, len)?;
        self.pos += len;
        Ok(bytes)
    }

    /// Look at the next `len` bytes without advancing.
    pub fn peek(&self, header: &'static str, len: usize) -> Result<&'a [u8], ParseError> {
        match self.pos.checked_add(len) {
            Some(stop) if stop <= self.end => Ok(&self.frame[self.pos..stop]),
            _ => Err(ParseError::Truncated {
                header,
                needed: len,
                remaining: self.remaining(),
            }),
        }
    }

    /// Skip `len` bytes that belong to the header just read.
    pub fn skip(&mut self, header: &'static str, len: usize) -> Result<(), ParseError> {
        self.take(header, len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = HeaderCursor::new(&data);

        assert_eq!(cursor.take("a", 2).unwrap(), &[1, 2]);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.take("b", 3).unwrap(), &[3, 4, 5]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_take_past_end_fails_without_advancing() {
        let data = [0u8; 4];
        let mut cursor = HeaderCursor::new(&data);
        cursor.take("a", 3).unwrap();

        let err = cursor.take("tcp", 2).unwrap_err();
        assert_eq!(
            err,
            ParseError::Truncated {
                header: "tcp",
                needed: 2,
                remaining: 1
            }
        );
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [9u8, 8];
        let cursor = HeaderCursor::new(&data);
        assert_eq!(cursor.peek("x", 2).unwrap(), &[9, 8]);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_overflowing_length_is_truncated() {
        let data = [0u8; 2];
        let mut cursor = HeaderCursor::new(&data);
        cursor.take("a", 1).unwrap();
        assert!(matches!(
            cursor.take("huge", usize::MAX),
            Err(ParseError::Truncated { .. })
        ));
    }

    #[test]
    fn test_empty_frame() {
        let cursor = HeaderCursor::new(&[]);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.peek("eth", 1).is_err());
    }
}
