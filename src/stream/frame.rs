//! Wire framing of the event stream.
//!
//! The stream body arrives as arbitrary-sized chunks. Frames are blocks of
//! `field: value` lines terminated by a blank line; a trailing partial block
//! stays buffered until more data arrives.

use bytes::{Buf, BytesMut};

/// One decoded protocol frame: `(event, data, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    /// value of the `event:` field, `None` when the block had none
    pub event: Option<String>,
    /// joined values of all `data:` fields
    pub data: String,
    /// value of the `id:` field, `None` when absent or empty
    pub id: Option<String>,
}

impl Frame {
    /// Effective event type, defaulting to `message`.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// True for the reserved liveness frames.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self.event_type(), "heartbeat" | "heartbeat_ack")
    }
}

/// Splits a chunked byte stream into [`Frame`]s.
#[derive(Debug, Default)]
pub(crate) struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Append a received chunk to the accumulation buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete frame, or `None` until more data arrives.
    ///
    /// Blocks without any `data:` line are framing artifacts and are
    /// silently skipped.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let block = self.take_block()?;
            if let Some(frame) = parse_block(&block) {
                return Some(frame);
            }
        }
    }

    /// Take the next blank-line-terminated block off the buffer.
    fn take_block(&mut self) -> Option<String> {
        let (block_end, consumed) = find_block_end(&self.buffer)?;

        let block = String::from_utf8_lossy(&self.buffer[..block_end]).into_owned();
        self.buffer.advance(consumed);

        Some(block)
    }
}

/// Finds the first blank line in `bytes`.
///
/// Returns `(block_end, consumed)`: the non-inclusive end of the block and
/// the number of bytes to drop including both line terminators. Line
/// terminators may be `\n` or `\r\n`. Returns `None` when the buffer may
/// still be extended into a complete block.
fn find_block_end(bytes: &[u8]) -> Option<(usize, usize)> {
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }

        // the last line's own CR is not block content
        let end = if i > 0 && bytes[i - 1] == b'\r' { i - 1 } else { i };

        match &bytes[i + 1..] {
            [b'\n', ..] => return Some((end, i + 2)),
            [b'\r', b'\n', ..] => return Some((end, i + 3)),
            // lone trailing CR, the matching LF may be in the next chunk
            [b'\r'] => return None,
            _ => {}
        }
    }

    None
}

/// Scan the lines of one block into a frame.
fn parse_block(block: &str) -> Option<Frame> {
    let mut event = None;
    let mut id = None;
    let mut data: Option<String> = None;

    for line in block.lines() {
        if line.starts_with(':') {
            // comment line, servers use these as padding
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event = Some(value.to_string()),
            "data" => match data {
                Some(ref mut joined) => {
                    joined.push('\n');
                    joined.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            // ids with a NUL byte are invalid, empty ids mean "no id"
            "id" if !value.is_empty() && !value.contains('\0') => id = Some(value.to_string()),
            _ => {}
        }
    }

    data.map(|data| Frame { event, data, id })
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_single_frame_decode() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"event: subscription_updated\ndata: {\"plan\":\"pro\"}\nid: evt-1\n\n");

        let frames = decode_all(&mut decoder);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("subscription_updated"));
        assert_eq!(frames[0].data, "{\"plan\":\"pro\"}");
        assert_eq!(frames[0].id.as_deref(), Some("evt-1"));
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::default();

        decoder.push(b"event: subscription_up");
        assert!(decoder.next_frame().is_none());

        decoder.push(b"dated\ndata: 1\n");
        assert!(decoder.next_frame().is_none());

        decoder.push(b"\nevent: heartbeat\ndata: {}\n\n");
        let frames = decode_all(&mut decoder);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("subscription_updated"));
        assert!(frames[1].is_heartbeat());
    }

    #[test]
    fn test_multiple_data_lines_joined() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"data: line one\ndata: line two\n\n");

        let frames = decode_all(&mut decoder);
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn test_event_type_defaults_to_message() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"data: hello\n\n");

        let frames = decode_all(&mut decoder);
        assert_eq!(frames[0].event, None);
        assert_eq!(frames[0].event_type(), "message");
        assert_eq!(frames[0].id, None);
    }

    #[test]
    fn test_dataless_block_discarded() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"event: noise\nid: x\n\ndata: real\n\n");

        let frames = decode_all(&mut decoder);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "real");
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"event: heartbeat\r\ndata: {}\r\n\r\n");

        let frames = decode_all(&mut decoder);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_heartbeat());
        assert_eq!(frames[0].data, "{}");
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut decoder = FrameDecoder::default();

        decoder.push(b"data: x\r\n\r");
        assert!(decoder.next_frame().is_none());

        decoder.push(b"\n");
        assert_eq!(decode_all(&mut decoder).len(), 1);
    }

    #[test]
    fn test_comment_lines_ignored() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b": keep-alive padding\ndata: payload\n\n");

        let frames = decode_all(&mut decoder);
        assert_eq!(frames[0].data, "payload");
    }

    #[test]
    fn test_heartbeat_alias() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"event: heartbeat_ack\ndata: {}\n\n");

        assert!(decoder.next_frame().unwrap().is_heartbeat());
    }
}
