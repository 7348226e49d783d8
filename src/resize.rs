//! # In-Place Buffer Resizing
//!
//! Inserts or removes a contiguous byte range in the middle of a buffer.
//! Every stored relative offset whose source-to-target span crosses the
//! resize point is rewritten to its post-shift value *before* the bytes
//! move; once the shift happens, pre-existing offsets on the far side are
//! meaningless, so the walk must touch each offset location exactly once
//! and never re-read one it has already rewritten.
//!
//! ## Walk Order
//!
//! 1. Round the delta to the largest scalar alignment (a smaller shrink
//!    becomes a no-op; the caller keeps up to 7 dead bytes).
//! 2. Adjust the root reference, then recurse from the root table through
//!    every present referential field, consulting the schema for layouts.
//! 3. Shift the bytes.
//!
//! A bitmap keyed by offset-storage word position records which locations
//! were already adjusted; shared sub-tables (the buffer is a DAG) are
//! reached from several parents and must not be adjusted twice. Fields
//! inside a table always point forward, so a table at or past the resize
//! point needs no descent.

use crate::access::{get_union_object, type_index};
use crate::schema::{Field, Object, Schema};
use crate::types::{BaseType, Scalar, LARGEST_SCALAR_SIZE, SIZE_UOFFSET};
use crate::view::{field_offset, root_table_pos, vtable_pos, TableView};

/// Round a resize delta to the alignment floor. Rounds toward positive
/// infinity, so a shrink smaller than the floor becomes zero.
pub(crate) fn aligned_delta(delta: isize) -> isize {
    let mask = LARGEST_SCALAR_SIZE as isize - 1;
    (delta + mask) & !mask
}

/// Insert `delta` zero bytes at `start` (or remove `-delta` bytes),
/// rewriting every straddled offset first. The applied delta is the
/// alignment-rounded one; callers needing the exact figure use
/// `aligned_delta` themselves.
pub fn resize_buffer(schema: &Schema, start: usize, delta: isize, buf: &mut Vec<u8>) {
    assert!(start <= buf.len(), "resize point {} past buffer end", start);
    let delta = aligned_delta(delta);
    if delta == 0 {
        return;
    }
    let words = buf.len() / SIZE_UOFFSET;
    let mut ctx = ResizeContext {
        schema,
        start,
        delta,
        buf: &mut *buf,
        dag_check: vec![0u8; words.div_ceil(8)],
    };
    let root = root_table_pos(ctx.buf);
    ctx.straddle_forward(0, root, 0);
    ctx.resize_table(schema.root_object(), root);
    if delta > 0 {
        buf.splice(start..start, std::iter::repeat_n(0u8, delta as usize));
    } else {
        buf.drain(start..start + (-delta) as usize);
    }
}

struct ResizeContext<'a> {
    schema: &'a Schema,
    start: usize,
    delta: isize,
    buf: &'a mut Vec<u8>,
    dag_check: Vec<u8>,
}

impl<'a> ResizeContext<'a> {
    /// Whether the offset stored at `loc` was already rewritten. Once set,
    /// the stored value is a post-shift value and must not be re-read.
    fn visited(&self, loc: usize) -> bool {
        let word = loc / SIZE_UOFFSET;
        self.dag_check[word / 8] & (1 << (word % 8)) != 0
    }

    fn mark(&mut self, loc: usize) {
        let word = loc / SIZE_UOFFSET;
        self.dag_check[word / 8] |= 1 << (word % 8);
    }

    /// Adjust the forward offset at `loc` if the span `first..=second`
    /// covers the resize point.
    fn straddle_forward(&mut self, first: usize, second: usize, loc: usize) {
        if first <= self.start && second >= self.start {
            let value = u32::read_le(self.buf, loc);
            ((value as i64 + self.delta as i64) as u32).write_le(self.buf, loc);
            self.mark(loc);
        }
    }

    /// Same for a backward (signed, table-to-vtable) offset.
    fn straddle_backward(&mut self, first: usize, second: usize, loc: usize) {
        if first <= self.start && second >= self.start {
            let value = i32::read_le(self.buf, loc);
            ((value as i64 - self.delta as i64) as i32).write_le(self.buf, loc);
            self.mark(loc);
        }
    }

    fn resize_table(&mut self, object: &'a Object, table_pos: usize) {
        if self.visited(table_pos) {
            return;
        }
        let vtable = vtable_pos(self.buf, table_pos);
        // The span can straddle from either side; both carry direction -1.
        self.straddle_backward(table_pos, vtable, table_pos);
        self.straddle_backward(vtable, table_pos, table_pos);
        // Fields only point forward; nothing inside can straddle.
        if self.start <= table_pos {
            return;
        }
        let schema = self.schema;
        for field in object.fields() {
            if field.base_type.is_scalar() {
                continue;
            }
            let off = field_offset(self.buf, table_pos, field.offset);
            if off == 0 {
                continue;
            }
            let sub_object = match field.base_type {
                BaseType::Obj => Some(schema.object(type_index(field))),
                _ => None,
            };
            if sub_object.is_some_and(|o| o.is_struct()) {
                continue;
            }
            let loc = table_pos + off as usize;
            if self.visited(loc) {
                continue;
            }
            let target = loc + u32::read_le(self.buf, loc) as usize;
            self.straddle_forward(loc, target, loc);
            match field.base_type {
                BaseType::Obj => {
                    if let Some(object) = sub_object {
                        self.resize_table(object, target);
                    }
                }
                BaseType::Vector => self.resize_vector_elements(field, target),
                BaseType::Union => {
                    let concrete = {
                        let view = TableView::at(self.buf, table_pos);
                        get_union_object(schema, object, field, &view)
                    };
                    self.resize_table(concrete, target);
                }
                BaseType::String => {}
                other => unreachable!(
                    "referential field `{}` has base type {:?}",
                    field.name, other
                ),
            }
        }
    }

    /// Walk a vector whose elements are stored as forward offsets. Scalar
    /// and inline-struct elements hold no offsets and shift as plain bytes.
    fn resize_vector_elements(&mut self, field: &Field, vec_pos: usize) {
        let schema = self.schema;
        let element_object = match field.element {
            BaseType::Obj => {
                let object = schema.object(type_index(field));
                if object.is_struct() {
                    return;
                }
                Some(object)
            }
            BaseType::String => None,
            _ => return,
        };
        let len = u32::read_le(self.buf, vec_pos) as usize;
        for index in 0..len {
            let loc = vec_pos + SIZE_UOFFSET + index * SIZE_UOFFSET;
            if self.visited(loc) {
                continue;
            }
            let target = loc + u32::read_le(self.buf, loc) as usize;
            self.straddle_forward(loc, target, loc);
            if let Some(object) = element_object {
                self.resize_table(object, target);
            }
        }
    }
}

/// Replace the contents of the string whose length prefix sits at
/// `str_pos`. Resizes the buffer when the lengths differ; every position
/// previously derived from the buffer is invalidated.
pub fn set_string(schema: &Schema, value: &str, str_pos: usize, buf: &mut Vec<u8>) {
    let old_len = u32::read_le(buf, str_pos) as usize;
    let start = str_pos + SIZE_UOFFSET;
    let delta = value.len() as isize - old_len as isize;
    if delta != 0 {
        resize_buffer(schema, start, delta, buf);
        if delta < 0 {
            // Zero the surviving old content region so a rounded-up shrink
            // leaves no stale characters behind the new terminator.
            let surviving = (old_len as isize + 1 + aligned_delta(delta)) as usize;
            buf[start..start + surviving].fill(0);
        }
    }
    buf[start..start + value.len()].copy_from_slice(value.as_bytes());
    buf[start + value.len()] = 0;
    (value.len() as u32).write_le(buf, str_pos);
}

/// Resize the scalar vector whose length prefix sits at `vec_pos` to
/// `new_len` elements, initializing appended slots to `fill`.
pub fn resize_vector<T: Scalar>(
    schema: &Schema,
    new_len: u32,
    fill: T,
    vec_pos: usize,
    buf: &mut Vec<u8>,
) {
    let old_len = u32::read_le(buf, vec_pos) as usize;
    let delta_elems = new_len as isize - old_len as isize;
    let delta_bytes = delta_elems * T::SIZE as isize;
    // The byte after the last element that survives: the insertion point
    // when growing, the first dropped byte when shrinking.
    let start = vec_pos + SIZE_UOFFSET + T::SIZE * old_len.min(new_len as usize);
    if delta_bytes == 0 {
        return;
    }
    resize_buffer(schema, start, delta_bytes, buf);
    new_len.write_le(buf, vec_pos);
    for index in 0..delta_elems.max(0) as usize {
        fill.write_le(buf, start + index * T::SIZE);
    }
}

/// `resize_vector` for vectors of inline structs: `fill` is one element's
/// raw bytes and fixes the element size.
pub fn resize_vector_raw(
    schema: &Schema,
    new_len: u32,
    fill: &[u8],
    vec_pos: usize,
    buf: &mut Vec<u8>,
) {
    let elem_size = fill.len();
    assert!(elem_size > 0, "element size cannot be zero");
    let old_len = u32::read_le(buf, vec_pos) as usize;
    let delta_elems = new_len as isize - old_len as isize;
    let delta_bytes = delta_elems * elem_size as isize;
    let start = vec_pos + SIZE_UOFFSET + elem_size * old_len.min(new_len as usize);
    if delta_bytes == 0 {
        return;
    }
    resize_buffer(schema, start, delta_bytes, buf);
    new_len.write_le(buf, vec_pos);
    for index in 0..delta_elems.max(0) as usize {
        let at = start + index * elem_size;
        buf[at..at + elem_size].copy_from_slice(fill);
    }
}
