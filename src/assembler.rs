//! Collects the sections of a multi-section table into one complete set.
//!
//! Tables larger than a section are split across numbered sections that
//! arrive in arbitrary order on the carousel. The assembler keeps one
//! slot per section number and hands out the full set once every slot is
//! filled for a single version.

use log::debug;

use crate::tables::TableVariant;

/// Version-keyed slot store for the sections of one table kind.
pub struct TableAssembler<T: TableVariant> {
    version: Option<u8>,
    slots: Vec<Option<T>>,
}

impl<T: TableVariant> TableAssembler<T> {
    pub fn new() -> Self {
        Self {
            version: None,
            slots: Vec::new(),
        }
    }

    /// Files `table` under its section number.
    ///
    /// Returns the complete set, ordered by section number, when this
    /// table fills the last open slot. Any inconsistency with the set
    /// being collected (version change, different section count, a slot
    /// already filled) discards the partial set and starts over with
    /// `table` as the first entry of the new one.
    pub fn add(&mut self, table: T) -> Option<Vec<T>> {
        let header = *table.header();

        // Announcements of a future version do not describe the stream yet.
        if !header.is_current {
            return None;
        }
        if header.section_number > header.last_section_number {
            debug!(
                "section number {} beyond last {}, dropped",
                header.section_number, header.last_section_number
            );
            return None;
        }

        let size = header.last_section_number as usize + 1;
        let slot = header.section_number as usize;

        let restart = match self.version {
            None => true,
            Some(version) => {
                version != header.version
                    || self.slots.len() != size
                    || self.slots[slot].is_some()
            }
        };
        if restart {
            if self.version.is_some() {
                debug!(
                    "restarting collection at version {} section {slot}/{size}",
                    header.version
                );
            }
            self.version = Some(header.version);
            self.slots.clear();
            self.slots.resize_with(size, || None);
        }

        self.slots[slot] = Some(table);
        if self.slots.iter().any(Option::is_none) {
            return None;
        }

        self.version = None;
        Some(std::mem::take(&mut self.slots).into_iter().flatten().collect())
    }

    /// Number of sections collected so far.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn reset(&mut self) {
        self.version = None;
        self.slots.clear();
    }
}

impl<T: TableVariant> Default for TableAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}
