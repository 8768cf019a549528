//! Stateful framer turning a raw per-PID byte feed into [`Section`]s.
//!
//! One instance serves one PID feed; callers serialize calls per instance
//! (the upstream demultiplexer delivers each PID on a single thread, so no
//! internal locking is needed).

use log::{trace, warn};

use crate::SiError;
use crate::section::{FrameOutcome, Section};

/// Hard cap on unread plus newly added bytes. Exceeding it resets the
/// framer, deliberately dropping data instead of accumulating a corrupted
/// stream without bound.
const MAX_BUFFER: usize = 250_000;

/// Accumulates raw bytes and extracts length-prefixed, CRC-checked sections.
pub struct SectionParser {
    buf: Vec<u8>,
    /// Read cursor into `buf`.
    pos: usize,
    /// Deliver sections with a failed checksum too (diagnostics).
    pub ignore_crc_errors: bool,
    /// Sections dropped for a CRC mismatch.
    pub crc_errors: u64,
    /// Framing attempts stalled on a declared length beyond the buffer.
    pub wrong_length: u64,
    /// Buffer resets forced by the [`MAX_BUFFER`] cap.
    pub overruns: u64,
    on_section: Option<Box<dyn FnMut(&Section) + Send>>,
}

impl Default for SectionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionParser {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            ignore_crc_errors: false,
            crc_errors: 0,
            wrong_length: 0,
            overruns: 0,
            on_section: None,
        }
    }

    /// Registers the callback invoked by [`feed`](Self::feed) for every
    /// section (valid ones, plus invalid ones when `ignore_crc_errors`).
    pub fn with_section_handler(mut self, handler: impl FnMut(&Section) + Send + 'static) -> Self {
        self.on_section = Some(Box::new(handler));
        self
    }

    /// Appends external bytes, compacting or growing the buffer as needed.
    ///
    /// Fails with [`SiError::BufferOverrun`] once unread plus new bytes
    /// exceed 250,000; the buffer is then fully reset and the unread tail
    /// is lost.
    pub fn add(&mut self, data: &[u8]) -> Result<(), SiError> {
        if data.is_empty() {
            return Ok(());
        }

        let unread = self.buf.len() - self.pos;
        if unread + data.len() > MAX_BUFFER {
            self.overruns += 1;
            self.buf.clear();
            self.pos = 0;
            warn!("section buffer overrun after {unread} unread bytes, resetting");
            return Err(SiError::BufferOverrun);
        }

        // Room left at the end of the current allocation?
        if self.buf.len() + data.len() <= self.buf.capacity() {
            self.buf.extend_from_slice(data);
            return Ok(());
        }

        // Compact the unread tail to the front, then grow to at least the
        // minimum working size.
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.buf.reserve(MAX_BUFFER - self.buf.len());
        self.buf.extend_from_slice(data);

        Ok(())
    }

    /// Attempts to frame the next section at the read cursor.
    ///
    /// Returns `None` when more data is required; call [`add`](Self::add)
    /// before trying again. Sections failing the CRC check are counted and
    /// skipped unless `ignore_crc_errors` is set.
    pub fn read_section(&mut self) -> Option<Section> {
        loop {
            let section = match Section::frame(&self.buf[self.pos..]) {
                FrameOutcome::NeedHeader => return None,
                FrameOutcome::NeedBody => {
                    self.wrong_length += 1;
                    return None;
                }
                FrameOutcome::Framed(section) => section,
            };

            self.pos += section.len();

            if !section.is_valid() {
                self.crc_errors += 1;
                trace!(
                    "CRC mismatch on table id {:#04x} ({} so far)",
                    section.table_id(),
                    self.crc_errors
                );
                if !self.ignore_crc_errors {
                    continue;
                }
            }

            return Some(section);
        }
    }

    /// Adds `data` and drains every section that became available to the
    /// registered handler.
    ///
    /// Nothing raised while decoding escapes to the feeding thread: a
    /// buffer overrun has already reset the state and is visible only
    /// through the `overruns` counter.
    pub fn feed(&mut self, data: &[u8]) {
        if self.add(data).is_err() {
            return;
        }

        while let Some(section) = self.read_section() {
            if let Some(handler) = self.on_section.as_mut() {
                handler(&section);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::encode_section;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pat_wire() -> Vec<u8> {
        // Empty PAT: ts id 0x0001, version 0, current, single section.
        encode_section(0x00, true, &[0x00, 0x01, 0xC1, 0x00, 0x00])
    }

    #[test]
    fn section_split_across_feeds() {
        let wire = pat_wire();
        let mut parser = SectionParser::new();

        parser.add(&wire[..4]).unwrap();
        assert!(parser.read_section().is_none());

        parser.add(&wire[4..]).unwrap();
        let section = parser.read_section().expect("section after completion");
        assert!(section.is_valid());
        assert_eq!(section.len(), wire.len());
        assert!(parser.read_section().is_none());
    }

    #[test]
    fn corrupt_sections_are_skipped_and_counted() {
        let mut first = pat_wire();
        let len = first.len();
        first[len - 1] ^= 0x01;
        let second = pat_wire();

        let mut parser = SectionParser::new();
        parser.add(&first).unwrap();
        parser.add(&second).unwrap();

        let section = parser.read_section().expect("valid follow-up section");
        assert!(section.is_valid());
        assert_eq!(parser.crc_errors, 1);
    }

    #[test]
    fn invalid_sections_surface_in_diagnostics_mode() {
        let mut wire = pat_wire();
        let len = wire.len();
        wire[len - 1] ^= 0x01;

        let mut parser = SectionParser::new();
        parser.ignore_crc_errors = true;
        parser.add(&wire).unwrap();

        let section = parser.read_section().expect("invalid section reported");
        assert!(!section.is_valid());
        assert_eq!(parser.crc_errors, 1);
    }

    #[test]
    fn overrun_resets_and_counts() {
        let mut parser = SectionParser::new();
        let chunk = vec![0u8; 130_000];

        parser.add(&chunk).unwrap();
        assert!(matches!(parser.add(&chunk), Err(SiError::BufferOverrun)));
        assert_eq!(parser.overruns, 1);

        // Fully reset: a fresh section parses fine afterwards.
        let wire = pat_wire();
        parser.add(&wire).unwrap();
        assert!(parser.read_section().is_some());
    }

    #[test]
    fn feed_delivers_each_section_once() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut parser = SectionParser::new()
            .with_section_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let mut wire = pat_wire();
        wire.extend_from_slice(&pat_wire());
        parser.feed(&wire);

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn feed_survives_overrun() {
        let mut parser = SectionParser::new();
        parser.feed(&vec![0u8; 300_000]);
        assert_eq!(parser.overruns, 1);

        // The feeding path keeps working after the reset.
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        parser.on_section = Some(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        parser.feed(&pat_wire());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
