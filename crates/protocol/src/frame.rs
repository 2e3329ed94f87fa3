//! IDTech frame codec
//!
//! Commands are wrapped in a start/end envelope with a trailing XOR checksum:
//!
//! ```text
//! [STX 0x02][payload ...][ETX 0x03][LRC]
//! ```
//!
//! where LRC is the XOR of every byte from STX through ETX inclusive. The
//! framed command is transmitted in fixed-size chunks, the last one
//! zero-padded.
//!
//! Responses look like `[ACK][STX][payload ...][ETX][LRC]`; the payload is
//! whatever sits strictly between the markers.

/// Start of text
pub const STX: u8 = 0x02;
/// End of text
pub const ETX: u8 = 0x03;

/// Default transmission chunk size (one 8-byte feature report)
pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// Longitudinal redundancy check: XOR of all bytes, folded left from zero
#[inline]
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Wrap a raw command payload into `STX ++ payload ++ ETX ++ LRC`
///
/// # Example
/// ```
/// use protocol::frame::wrap;
///
/// let frame = wrap(&[0x52, 0x4e]);
/// assert_eq!(frame, vec![0x02, 0x52, 0x4e, 0x03, 0x1d]);
/// ```
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(STX);
    frame.extend_from_slice(payload);
    frame.push(ETX);
    let checksum = lrc(&frame);
    frame.push(checksum);
    frame
}

/// Split a frame into `chunk_size` pieces, zero-padding the final one
///
/// The iterator is lazy and borrows the frame, so calling `chunks` again on
/// the same frame restarts the sequence. An empty frame yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn chunks(frame: &[u8], chunk_size: usize) -> Chunks<'_> {
    assert!(chunk_size > 0, "chunk size must be non-zero");
    Chunks {
        inner: frame.chunks(chunk_size),
        chunk_size,
    }
}

/// Iterator returned by [`chunks`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    inner: std::slice::Chunks<'a, u8>,
    chunk_size: usize,
}

impl Iterator for Chunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|piece| {
            let mut chunk = vec![0u8; self.chunk_size];
            chunk[..piece.len()].copy_from_slice(piece);
            chunk
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Extract the bytes between the first STX and the first ETX of a response
///
/// The start is one past the first STX (or the beginning of the response when
/// there is none). If the first ETX does not come after that start, the
/// response is returned unchanged.
pub fn extract_payload(response: &[u8]) -> &[u8] {
    let start = response
        .iter()
        .position(|&b| b == STX)
        .map_or(0, |i| i + 1);

    match response.iter().position(|&b| b == ETX) {
        Some(end) if end > start => &response[start..end],
        _ => response,
    }
}

/// Check the LRC that follows the ETX of a framed response
///
/// Returns `None` when the response carries no STX/ETX pair or no byte after
/// the ETX (trailing nulls are stripped before parsing, so a zero LRC
/// disappears), otherwise whether the checksum matched.
pub fn verify_response_lrc(response: &[u8]) -> Option<bool> {
    let start = response.iter().position(|&b| b == STX)?;
    let end = start + response[start..].iter().position(|&b| b == ETX)?;
    let checksum = *response.get(end + 1)?;
    Some(lrc(&response[start..=end]) == checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lrc_empty() {
        assert_eq!(lrc(&[]), 0);
    }

    #[test]
    fn test_wrap_review_device_sn() {
        // Captured from a SecureMag reader: review setting 0x4e
        assert_eq!(wrap(&[0x52, 0x4e]), vec![0x02, 0x52, 0x4e, 0x03, 0x1d]);
    }

    #[test]
    fn test_wrap_empty_payload() {
        assert_eq!(wrap(&[]), vec![STX, ETX, STX ^ ETX]);
    }

    #[test]
    fn test_chunks_pad_final() {
        let frame: Vec<u8> = (1..=9).collect();
        let pieces: Vec<_> = chunks(&frame, 8).collect();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(pieces[1], vec![9, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_chunks_exact_multiple() {
        let frame = [0xAAu8; 16];
        assert_eq!(chunks(&frame, 8).len(), 2);
    }

    #[test]
    fn test_chunks_restartable() {
        let frame = wrap(b"hello world");
        let first: Vec<_> = chunks(&frame, 8).collect();
        let second: Vec<_> = chunks(&frame, 8).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_payload() {
        let response = [0x06, STX, 0x4e, 0x02, b'A', b'B', ETX, 0x11];
        assert_eq!(extract_payload(&response), &[0x4e, 0x02, b'A', b'B']);
    }

    #[test]
    fn test_extract_payload_ack_only() {
        assert_eq!(extract_payload(&[0x06]), &[0x06]);
    }

    #[test]
    fn test_extract_payload_etx_before_stx() {
        let response = [0x06, ETX, 0x41, STX, 0x42];
        assert_eq!(extract_payload(&response), &response);
    }

    #[test]
    fn test_extract_payload_adjacent_markers() {
        let response = [0x06, STX, ETX, 0x01];
        assert_eq!(extract_payload(&response), &response);
    }

    #[test]
    fn test_verify_response_lrc() {
        let mut response = vec![0x06];
        response.extend(wrap(b"V1.0"));
        assert_eq!(verify_response_lrc(&response), Some(true));

        let last = response.len() - 1;
        response[last] ^= 0xFF;
        assert_eq!(verify_response_lrc(&response), Some(false));

        assert_eq!(verify_response_lrc(&[0x06]), None);
    }
}
