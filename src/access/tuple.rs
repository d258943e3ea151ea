use crate::storage::page::PageId;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Location of a stored tuple: its page and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}

/// A fixed-width row. The record id is set once the tuple has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub record_id: Option<RecordId>,
    pub data: Vec<u8>,
}

impl Tuple {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            record_id: None,
            data,
        }
    }

    pub fn with_record_id(record_id: RecordId, data: Vec<u8>) -> Self {
        Self {
            record_id: Some(record_id),
            data,
        }
    }

    /// Encodes little-endian `i32` columns back to back.
    pub fn from_ints(values: &[i32]) -> Self {
        let mut data = vec![0u8; values.len() * 4];
        LittleEndian::write_i32_into(values, &mut data);
        Self::new(data)
    }

    /// Decodes the payload as little-endian `i32` columns; trailing bytes are ignored.
    pub fn ints(&self) -> Vec<i32> {
        let mut values = vec![0i32; self.data.len() / 4];
        LittleEndian::read_i32_into(&self.data[..values.len() * 4], &mut values);
        values
    }
}
