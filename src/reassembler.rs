//! Merges out-of-order, possibly overlapping substrings into an ordered
//! byte stream.

use std::collections::BTreeMap;

use crate::byte_stream::Writer;

/// Reassembles arbitrary-order substrings of a byte stream into the
/// stream's [`Writer`] in order.
#[derive(Debug)]
pub struct Reassembler {
    output: Writer,
    next_index: u64,
    pending: BTreeMap<u64, Vec<u8>>,
    eof: bool,
    eof_index: u64,
}

impl Reassembler {
    pub fn new(output: Writer) -> Self {
        Reassembler {
            output,
            next_index: 0,
            pending: BTreeMap::new(),
            eof: false,
            eof_index: 0,
        }
    }

    /// Insert a substring of the stream starting at `first_index`. If
    /// `is_last_substring`, this is the final substring and marks EOF.
    pub fn insert(&mut self, first_index: u64, mut data: Vec<u8>, is_last_substring: bool) {
        let mut end_index = first_index + data.len() as u64;

        if is_last_substring {
            self.eof = true;
            self.eof_index = end_index;
        }

        if self.eof && first_index >= self.eof_index {
            if self.next_index >= self.eof_index {
                self.output.close();
            }
            return;
        }

        let window_end = self.next_index + self.output.available_capacity();
        if end_index <= self.next_index || first_index >= window_end {
            tracing::warn!(
                first_index,
                end_index,
                next_index = self.next_index,
                window_end,
                "reassembler discarded out-of-window data"
            );
            return;
        }

        let mut first_index = first_index;
        if first_index < self.next_index {
            let drop = (self.next_index - first_index) as usize;
            data.drain(..drop);
            first_index = self.next_index;
        }
        end_index = first_index + data.len() as u64;

        if end_index > window_end {
            let keep = (window_end - first_index) as usize;
            data.truncate(keep);
            end_index = window_end;
        }

        if self.eof && end_index > self.eof_index {
            let keep = (self.eof_index - first_index) as usize;
            data.truncate(keep);
        }

        if data.is_empty() {
            self.drain_and_maybe_close();
            return;
        }

        self.merge(first_index, data);
        self.drain_and_maybe_close();
    }

    fn merge(&mut self, first_index: u64, data: Vec<u8>) {
        let end_index = first_index + data.len() as u64;
        let mut merge_start = first_index;
        let mut merge_end = end_index;

        // Find the first pending interval that could overlap or touch this one.
        let mut lower_key = None;
        for (&start, seg) in self.pending.range(..=merge_start).next_back() {
            if start + seg.len() as u64 >= merge_start {
                lower_key = Some(start);
                merge_start = std::cmp::min(merge_start, start);
            }
        }
        let scan_start = lower_key.unwrap_or(merge_start);

        let mut to_remove = Vec::new();
        for (&start, seg) in self.pending.range(scan_start..) {
            if start > merge_end {
                break;
            }
            merge_end = std::cmp::max(merge_end, start + seg.len() as u64);
            to_remove.push(start);
        }

        let mut merged = vec![0u8; (merge_end - merge_start) as usize];
        for start in &to_remove {
            let seg = &self.pending[start];
            let off = (*start - merge_start) as usize;
            merged[off..off + seg.len()].copy_from_slice(seg);
        }
        let off = (first_index - merge_start) as usize;
        merged[off..off + data.len()].copy_from_slice(&data);

        for start in to_remove {
            self.pending.remove(&start);
        }
        tracing::trace!(
            merge_start,
            merge_end,
            span = merge_end - merge_start,
            "reassembler merged overlapping/adjacent spans"
        );
        self.pending.insert(merge_start, merged);
    }

    fn drain_and_maybe_close(&mut self) {
        while let Some((&start, _)) = self.pending.iter().next() {
            if start != self.next_index {
                break;
            }
            let seg = self.pending.remove(&start).unwrap();
            self.next_index += seg.len() as u64;
            self.output.push(&seg);
        }

        if self.eof && self.next_index >= self.eof_index {
            self.output.close();
        }
    }

    /// Number of bytes currently buffered inside the reassembler (not yet
    /// pushed to the output stream). Derived, not cached.
    pub fn count_bytes_pending(&self) -> u64 {
        self.pending.values().map(|seg| seg.len() as u64).sum()
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn writer(&self) -> &Writer {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::ByteStream;

    fn stream(capacity: u64) -> (Reassembler, ByteStream) {
        let stream = ByteStream::new(capacity).unwrap();
        let reassembler = Reassembler::new(stream.writer());
        (reassembler, stream)
    }

    #[test]
    fn reassembly_with_overlap() {
        let (mut r, stream) = stream(8);
        let reader = stream.reader();

        r.insert(3, b"de".to_vec(), false);
        r.insert(0, b"abc".to_vec(), false);
        assert_eq!(reader.copy_at(0, reader.len()), b"abcde");

        r.insert(5, b"fgh".to_vec(), true);
        assert_eq!(reader.copy_at(0, reader.len()), b"abcdefgh");
        assert!(stream.writer().is_closed());
    }

    #[test]
    fn out_of_window_data_is_discarded() {
        let (mut r, stream) = stream(4);
        r.insert(100, b"xyz".to_vec(), false);
        assert_eq!(r.count_bytes_pending(), 0);
        assert_eq!(stream.reader().bytes_buffered(), 0);
    }

    #[test]
    fn insert_is_idempotent() {
        let (mut r, stream) = stream(8);
        r.insert(0, b"abc".to_vec(), false);
        let before = stream.reader().copy_at(0, stream.reader().len());
        r.insert(0, b"abc".to_vec(), false);
        let after = stream.reader().copy_at(0, stream.reader().len());
        assert_eq!(before, after);
        assert_eq!(r.count_bytes_pending(), 0);
    }

    #[test]
    fn order_independent_given_identical_overlap() {
        let (mut a, sa) = stream(16);
        a.insert(0, b"ab".to_vec(), false);
        a.insert(2, b"cd".to_vec(), false);
        a.insert(4, b"ef".to_vec(), true);

        let (mut b, sb) = stream(16);
        b.insert(4, b"ef".to_vec(), true);
        b.insert(0, b"ab".to_vec(), false);
        b.insert(2, b"cd".to_vec(), false);

        assert_eq!(
            sa.reader().copy_at(0, sa.reader().len()),
            sb.reader().copy_at(0, sb.reader().len())
        );
        assert_eq!(sa.writer().is_closed(), sb.writer().is_closed());
    }

    #[test]
    fn eof_before_all_bytes_seen_does_not_close() {
        let (mut r, stream) = stream(8);
        r.insert(3, b"de".to_vec(), true);
        assert!(!stream.writer().is_closed());
        r.insert(0, b"abc".to_vec(), false);
        assert!(stream.writer().is_closed());
    }

    #[test]
    fn respects_available_capacity_window() {
        let (mut r, stream) = stream(2);
        r.insert(0, b"abcdef".to_vec(), false);
        assert_eq!(stream.reader().bytes_buffered(), 2);
        assert_eq!(stream.reader().copy_at(0, 2), b"ab");
    }
}
