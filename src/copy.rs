//! # Schema-Driven Deep Copy
//!
//! Walks a table tree and re-emits it into a fresh [`Builder`], the
//! supported way to compact a buffer after resizes have left dead bytes.
//!
//! Two passes per table: the first produces builder offsets for every
//! present referential child (strings, sub-tables, unions, vectors), in
//! field order; the second emits the table itself, consuming those offsets
//! in the same order and copying scalars and inline structs byte for byte.
//!
//! A source DAG is copied as a tree: already-visited targets are not
//! tracked, so shared sub-tables duplicate in the output.

use smallvec::SmallVec;

use crate::access::{get_field_table, get_union_object, type_index};
use crate::builder::Builder;
use crate::schema::{Field, Object, Schema};
use crate::types::{BaseType, SIZE_UOFFSET};
use crate::view::{StringView, TableView, VectorView};

/// Copy `table` (laid out per `object`) into `builder`; returns the builder
/// offset of the copy.
pub fn copy_table(
    builder: &mut Builder,
    schema: &Schema,
    object: &Object,
    table: &TableView,
) -> u32 {
    let mut offsets: SmallVec<[u32; 16]> = SmallVec::new();

    for field in object.fields() {
        if source_pos(object, table, field).is_none() {
            continue;
        }
        match field.base_type {
            BaseType::String => {
                if let Some(pos) = table.field_pos(field.offset) {
                    let string = StringView::new(table.buf(), table.indirect(pos));
                    offsets.push(builder.create_byte_string(string.bytes()));
                }
            }
            BaseType::Obj => {
                let sub_object = schema.object(type_index(field));
                if !sub_object.is_struct() {
                    if let Some(sub) = get_field_table(table, field) {
                        offsets.push(copy_table(builder, schema, sub_object, &sub));
                    }
                }
            }
            BaseType::Union => {
                let sub_object = get_union_object(schema, object, field, table);
                if let Some(sub) = get_field_table(table, field) {
                    offsets.push(copy_table(builder, schema, sub_object, &sub));
                }
            }
            BaseType::Vector => {
                if let Some(pos) = table.field_pos(field.offset) {
                    let vec_pos = table.indirect(pos);
                    offsets.push(copy_vector(builder, schema, field, table.buf(), vec_pos));
                }
            }
            _ => {}
        }
    }

    let start = if object.is_struct() {
        builder.start_struct(object.minalign())
    } else {
        builder.start_table()
    };
    let mut consumed = 0;
    for field in object.fields() {
        let Some(source) = source_pos(object, table, field) else {
            continue;
        };
        match field.base_type {
            BaseType::Obj => {
                let sub_object = schema.object(type_index(field));
                if sub_object.is_struct() {
                    copy_inline(
                        builder,
                        table.buf(),
                        source,
                        sub_object.minalign(),
                        sub_object.bytesize(),
                        field.offset,
                    );
                } else {
                    builder.add_offset(field.offset, offsets[consumed]);
                    consumed += 1;
                }
            }
            BaseType::Union | BaseType::String | BaseType::Vector => {
                builder.add_offset(field.offset, offsets[consumed]);
                consumed += 1;
            }
            _ => {
                let size = field.base_type.size();
                copy_inline(builder, table.buf(), source, size, size, field.offset);
            }
        }
    }
    assert_eq!(consumed, offsets.len(), "child offsets out of step");

    if object.is_struct() {
        builder.clear_offsets();
        builder.end_struct()
    } else {
        builder.end_table(start, object.vtable_slot_count())
    }
}

fn copy_vector(
    builder: &mut Builder,
    schema: &Schema,
    field: &Field,
    buf: &[u8],
    vec_pos: usize,
) -> u32 {
    match field.element {
        BaseType::String => {
            let vec = VectorView::new(buf, vec_pos, SIZE_UOFFSET);
            let mut elements: SmallVec<[u32; 16]> = SmallVec::new();
            for index in 0..vec.len() {
                let string = StringView::new(buf, vec.indirect(index));
                elements.push(builder.create_byte_string(string.bytes()));
            }
            builder.create_offset_vector(&elements)
        }
        BaseType::Obj if !schema.object(type_index(field)).is_struct() => {
            let element_object = schema.object(type_index(field));
            let vec = VectorView::new(buf, vec_pos, SIZE_UOFFSET);
            let mut elements: SmallVec<[u32; 16]> = SmallVec::new();
            for index in 0..vec.len() {
                let element = TableView::at(buf, vec.indirect(index));
                elements.push(copy_table(builder, schema, element_object, &element));
            }
            builder.create_offset_vector(&elements)
        }
        element => {
            // Scalars and inline structs: one raw byte copy.
            let elem_size = match element {
                BaseType::Obj => schema.object(type_index(field)).bytesize(),
                other => other.size(),
            };
            let vec = VectorView::new(buf, vec_pos, elem_size);
            builder.start_vector(elem_size, vec.len());
            builder.push_bytes(vec.data());
            builder.end_vector(vec.len())
        }
    }
}

fn copy_inline(
    builder: &mut Builder,
    buf: &[u8],
    source: usize,
    alignment: usize,
    size: usize,
    slot: u16,
) {
    builder.align(alignment);
    builder.push_bytes(&buf[source..source + size]);
    let at = builder.size() as u32;
    builder.track_field(slot, at);
}

/// Storage position of a field: inline for struct layouts, via the vtable
/// for tables (`None` when absent).
fn source_pos(object: &Object, table: &TableView, field: &Field) -> Option<usize> {
    if object.is_struct() {
        Some(table.pos() + field.offset as usize)
    } else {
        table.field_pos(field.offset)
    }
}
