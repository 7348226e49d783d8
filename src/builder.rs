//! # Buffer Builder
//!
//! Constructs a buffer back to front: later pushes land at lower final
//! addresses, so children are emitted before the tables that reference
//! them and every stored reference is a forward offset. Positions are
//! tracked as distances from the buffer's end ("rev" offsets), which
//! survive reallocation and make relative offsets a plain subtraction:
//! a reference pushed at rev `r` to a target at rev `t` stores `r - t`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut b = Builder::new();
//! let name = b.create_string("widget");
//! let start = b.start_table();
//! b.push_scalar(7u16);
//! b.track_field(4, b.size() as u32);
//! b.add_offset(6, name);
//! let root = b.end_table(start, 2);
//! b.finish(root);
//! let buf = b.into_vec();
//! ```

use smallvec::SmallVec;

use crate::types::{Scalar, LARGEST_SCALAR_SIZE, SIZE_UOFFSET, SIZE_VOFFSET};

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    /// Vtable byte offset of the field.
    slot: u16,
    /// Rev position of the field's stored bytes.
    off: u32,
}

pub struct Builder {
    buf: Vec<u8>,
    head: usize,
    minalign: usize,
    field_locs: SmallVec<[FieldLoc; 16]>,
    nested: bool,
    finished: bool,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(SIZE_UOFFSET);
        Self {
            buf: vec![0; capacity],
            head: capacity,
            minalign: 1,
            field_locs: SmallVec::new(),
            nested: false,
            finished: false,
        }
    }

    /// Bytes written so far; equal to the rev position of the write head.
    pub fn size(&self) -> usize {
        self.buf.len() - self.head
    }

    fn make_space(&mut self, bytes: usize) {
        if self.head < bytes {
            let written = self.size();
            let grow = self.buf.len().max(bytes);
            let mut grown = vec![0u8; self.buf.len() + grow];
            let start = grown.len() - written;
            grown[start..].copy_from_slice(&self.buf[self.head..]);
            self.head = start;
            self.buf = grown;
        }
        self.head -= bytes;
    }

    fn track_min_align(&mut self, alignment: usize) {
        if alignment > self.minalign {
            self.minalign = alignment;
        }
    }

    /// Pad so the current size is a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        self.track_min_align(alignment);
        let pad = padding(self.size(), alignment);
        self.make_space(pad);
    }

    /// Pad so that after `len` more bytes the size is a multiple of
    /// `alignment`; keeps length prefixes aligned past their payloads.
    fn pre_align(&mut self, len: usize, alignment: usize) {
        self.track_min_align(alignment);
        let pad = padding(self.size() + len, alignment);
        self.make_space(pad);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.make_space(bytes.len());
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
    }

    /// Push one aligned scalar; returns its rev position.
    pub fn push_scalar<T: Scalar>(&mut self, value: T) -> u32 {
        self.align(T::SIZE);
        self.make_space(T::SIZE);
        value.write_le(&mut self.buf, self.head);
        self.size() as u32
    }

    /// Push a forward reference to an already-written target.
    fn push_uoffset(&mut self, target: u32) -> u32 {
        self.align(SIZE_UOFFSET);
        assert!(
            target as usize <= self.size(),
            "reference to a position that has not been written"
        );
        let rel = (self.size() + SIZE_UOFFSET) as u32 - target;
        self.make_space(SIZE_UOFFSET);
        rel.write_le(&mut self.buf, self.head);
        self.size() as u32
    }

    pub fn create_string(&mut self, value: &str) -> u32 {
        self.create_byte_string(value.as_bytes())
    }

    /// Length-prefixed, NUL-terminated string from raw bytes.
    pub fn create_byte_string(&mut self, bytes: &[u8]) -> u32 {
        assert!(!self.nested, "string created while a table or vector is open");
        self.pre_align(bytes.len() + 1, SIZE_UOFFSET);
        self.make_space(1);
        self.buf[self.head] = 0;
        self.push_bytes(bytes);
        self.push_scalar(bytes.len() as u32)
    }

    pub fn start_vector(&mut self, elem_size: usize, count: usize) {
        assert!(!self.nested, "vector started while a table or vector is open");
        assert!(elem_size > 0, "vector element size cannot be zero");
        self.nested = true;
        // Struct elements can have a non-power-of-two size; their alignment
        // is the largest scalar power of two dividing it.
        let alignment = (1usize << elem_size.trailing_zeros()).min(LARGEST_SCALAR_SIZE);
        self.pre_align(count * elem_size, SIZE_UOFFSET);
        self.pre_align(count * elem_size, alignment);
    }

    pub fn end_vector(&mut self, count: usize) -> u32 {
        assert!(self.nested, "end_vector without start_vector");
        self.nested = false;
        self.push_scalar(count as u32)
    }

    /// A vector whose elements are forward references to already-written
    /// targets, in the given logical order.
    pub fn create_offset_vector(&mut self, targets: &[u32]) -> u32 {
        self.start_vector(SIZE_UOFFSET, targets.len());
        for &target in targets.iter().rev() {
            self.push_uoffset(target);
        }
        self.end_vector(targets.len())
    }

    pub fn start_table(&mut self) -> u32 {
        assert!(!self.nested, "table started while a table or vector is open");
        self.nested = true;
        self.field_locs.clear();
        self.size() as u32
    }

    /// Record that the field at vtable slot `slot` was stored at rev `off`.
    pub fn track_field(&mut self, slot: u16, off: u32) {
        self.field_locs.push(FieldLoc { slot, off });
    }

    /// Push a forward reference field and track it.
    pub fn add_offset(&mut self, slot: u16, target: u32) {
        let off = self.push_uoffset(target);
        self.track_field(slot, off);
    }

    /// Close the table opened at `start`: emit the vtable directly before
    /// the table and patch the table's signed vtable offset.
    pub fn end_table(&mut self, start: u32, slot_count: u16) -> u32 {
        assert!(self.nested, "end_table without start_table");
        let table = self.push_scalar::<i32>(0);
        let table_bytes = (table - start) as u16;
        let vtable_bytes = (2 + slot_count as usize) * SIZE_VOFFSET;
        for slot_index in (0..slot_count).rev() {
            let slot = (2 * SIZE_VOFFSET + slot_index as usize * SIZE_VOFFSET) as u16;
            let entry = self
                .field_locs
                .iter()
                .find(|fl| fl.slot == slot)
                .map(|fl| (table - fl.off) as u16)
                .unwrap_or(0);
            self.push_scalar(entry);
        }
        self.push_scalar(table_bytes);
        self.push_scalar(vtable_bytes as u16);
        let vtable = self.size() as u32;
        let patch = self.buf.len() - table as usize;
        ((vtable - table) as i32).write_le(&mut self.buf, patch);
        self.field_locs.clear();
        self.nested = false;
        table
    }

    pub fn start_struct(&mut self, alignment: usize) -> u32 {
        self.align(alignment);
        self.size() as u32
    }

    pub fn end_struct(&mut self) -> u32 {
        self.size() as u32
    }

    pub fn clear_offsets(&mut self) {
        self.field_locs.clear();
    }

    /// Write the root reference. Pads the total size to the largest
    /// alignment seen so absolute positions inherit their rev alignment.
    pub fn finish(&mut self, root: u32) {
        assert!(!self.nested, "finish with an open table or vector");
        assert!(!self.finished, "finish called twice");
        self.pre_align(SIZE_UOFFSET, self.minalign);
        self.push_uoffset(root);
        self.finished = true;
    }

    pub fn finished_data(&self) -> &[u8] {
        assert!(self.finished, "buffer is not finished");
        &self.buf[self.head..]
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        assert!(self.finished, "buffer is not finished");
        self.buf.split_off(self.head)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn padding(size: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    size.wrapping_neg() & (alignment - 1)
}
