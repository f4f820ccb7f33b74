//! Block framing for the reply stream.
//!
//! The server pushes `event: <name>\ndata: <json>\n` units separated by a
//! blank line. Network chunks do not respect those boundaries, so the
//! framer buffers text until a full `"\n\n"` terminator has been seen.

/// Block terminator on the wire.
pub const BLOCK_TERMINATOR: &str = "\n\n";

/// Splits an arbitrarily fragmented text stream into event blocks.
///
/// Feed fragments with [`push`](Self::push) and call
/// [`finish`](Self::finish) once the upstream is exhausted to flush an
/// unterminated trailing block. Whitespace-only blocks are never emitted.
#[derive(Debug, Default)]
pub struct BlockFramer {
    buffer: String,
}

impl BlockFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every block it completed, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        // A terminator may straddle the previous fragment; rescan from just
        // before the old end of the buffer.
        let mut scan_from = self.buffer.len().saturating_sub(BLOCK_TERMINATOR.len() - 1);
        while !self.buffer.is_char_boundary(scan_from) {
            scan_from -= 1;
        }
        self.buffer.push_str(fragment);

        let mut blocks = Vec::new();
        let mut start = 0;
        let mut search_from = scan_from;

        while let Some(pos) = self.buffer[search_from..].find(BLOCK_TERMINATOR) {
            let end = search_from + pos;
            let block = &self.buffer[start..end];
            if !block.trim().is_empty() {
                blocks.push(block.to_string());
            }
            start = end + BLOCK_TERMINATOR.len();
            search_from = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        blocks
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(self) -> Option<String> {
        if self.buffer.trim().is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Frame a complete sequence of fragments in one go.
pub fn frame_all<I, S>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut framer = BlockFramer::new();
    let mut blocks: Vec<String> = fragments
        .into_iter()
        .flat_map(|fragment| framer.push(fragment.as_ref()))
        .collect();
    blocks.extend(framer.finish());
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "event: thought\ndata: \"Thinking...\"\n\n\
event: text\ndata: \"Hel\"\n\n\
event: text\ndata: \"lo 世界\"\n\n\
event: metadata\ndata: {\"source_documents\": []}\n\n\
event: text\ndata: \"!\"";

    fn chunks(s: &str, size: usize) -> Vec<String> {
        s.chars()
            .collect::<Vec<_>>()
            .chunks(size)
            .map(|c| c.iter().collect())
            .collect()
    }

    #[test]
    fn test_whole_stream() {
        let blocks = frame_all([STREAM]);
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0], "event: thought\ndata: \"Thinking...\"");
        assert_eq!(blocks[4], "event: text\ndata: \"!\"");
    }

    #[test]
    fn test_every_split_point_gives_same_blocks() {
        let expected = frame_all([STREAM]);
        for (i, _) in STREAM.char_indices().skip(1) {
            let (a, b) = STREAM.split_at(i);
            assert_eq!(frame_all([a, b]), expected, "split at {}", i);
        }
    }

    #[test]
    fn test_fixed_fragment_sizes_give_same_blocks() {
        let expected = frame_all([STREAM]);
        for size in [1, 7] {
            assert_eq!(frame_all(chunks(STREAM, size)), expected, "size {}", size);
        }
    }

    #[test]
    fn test_terminator_split_across_fragments() {
        let mut framer = BlockFramer::new();
        assert!(framer.push("event: text\ndata: \"a\"\n").is_empty());
        assert_eq!(framer.push("\nevent: text"), vec!["event: text\ndata: \"a\""]);
        assert_eq!(framer.finish(), Some("event: text".to_string()));
    }

    #[test]
    fn test_whitespace_blocks_are_skipped() {
        let blocks = frame_all(["\n\n  \n\nevent: text\ndata: \"a\"\n\n\n\n"]);
        assert_eq!(blocks, vec!["event: text\ndata: \"a\""]);
    }

    #[test]
    fn test_finish_empty_buffer() {
        let mut framer = BlockFramer::new();
        framer.push("event: text\ndata: \"a\"\n\n");
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.finish(), None);
    }
}
