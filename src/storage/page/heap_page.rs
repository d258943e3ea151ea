use crate::access::tuple::{RecordId, Tuple};
use crate::error::{Error, Result};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;

// Layout: [occupancy bitmap: ceil(N / 8) bytes][slot 0]...[slot N-1][zero padding]
// Slot i is occupied iff bit (i % 8) of bitmap byte (i / 8) is set.

/// In-memory copy of one slotted table page.
///
/// The bytes are exactly what lives on disk; the dirty marker is memory-only and records the
/// transaction that last modified the page since it was read or flushed.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    tuple_width: usize,
    num_slots: usize,
    data: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Number of fixed-width slots that fit on a page: every slot costs its bytes plus one
    /// bitmap bit.
    pub fn slots_per_page(page_size: usize, tuple_width: usize) -> usize {
        if tuple_width == 0 {
            return 0;
        }
        (page_size * 8) / (tuple_width * 8 + 1)
    }

    pub fn header_size(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// The byte image of a page with no occupied slots.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Wraps raw page bytes read from disk.
    pub fn new(page_id: PageId, data: Vec<u8>, tuple_width: usize) -> Result<Self> {
        let num_slots = Self::slots_per_page(data.len(), tuple_width);
        if num_slots == 0 {
            return Err(Error::InvalidPageSize {
                page_size: data.len(),
                reason: format!("cannot hold a single {}-byte tuple", tuple_width),
            });
        }

        Ok(Self {
            page_id,
            tuple_width,
            num_slots,
            data,
            dirtied_by: None,
        })
    }

    pub fn empty(page_id: PageId, page_size: usize, tuple_width: usize) -> Result<Self> {
        Self::new(page_id, Self::empty_page_data(page_size), tuple_width)
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn page_size(&self) -> usize {
        self.data.len()
    }

    pub fn tuple_width(&self) -> usize {
        self.tuple_width
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    fn slot_offset(&self, slot: usize) -> usize {
        Self::header_size(self.num_slots) + slot * self.tuple_width
    }

    /// Stores the tuple in the lowest free slot and stamps its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if tuple.data.len() != self.tuple_width {
            return Err(Error::TupleWidthMismatch {
                expected: self.tuple_width,
                actual: tuple.data.len(),
            });
        }

        let slot = (0..self.num_slots)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(Error::PageFull(self.page_id))?;

        let offset = self.slot_offset(slot);
        self.data[offset..offset + self.tuple_width].copy_from_slice(&tuple.data);
        self.set_slot_used(slot, true);

        let record_id = RecordId::new(self.page_id, slot as u16);
        tuple.record_id = Some(record_id);
        Ok(record_id)
    }

    /// Clears the tuple's slot bit. The slot bytes are left in place.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id.ok_or(Error::MissingRecordId)?;
        if record_id.page_id != self.page_id {
            return Err(Error::RecordNotOnPage {
                record_id,
                page_id: self.page_id,
            });
        }

        let slot = record_id.slot as usize;
        if !self.is_slot_used(slot) {
            return Err(Error::SlotEmpty(record_id));
        }

        self.set_slot_used(slot, false);
        Ok(())
    }

    pub fn tuple(&self, slot: usize) -> Option<Tuple> {
        if !self.is_slot_used(slot) {
            return None;
        }
        let offset = self.slot_offset(slot);
        Some(Tuple::with_record_id(
            RecordId::new(self.page_id, slot as u16),
            self.data[offset..offset + self.tuple_width].to_vec(),
        ))
    }

    /// Occupied slots in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = Tuple> + '_ {
        (0..self.num_slots).filter_map(move |slot| self.tuple(slot))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// `Some(tid)` marks the page dirty on behalf of `tid`; `None` marks it clean.
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtied_by = tid;
    }
}
