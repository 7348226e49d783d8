//! # Typed and Coercing Field Accessors
//!
//! Exact-typed reads return the declared default for absent fields; writes
//! only overwrite fields the builder stored (a missing field cannot be
//! created in place, so scalar setters report presence as a bool).
//!
//! The `*_any_*` variants coerce across the scalar types and strings the
//! way a debugger would: integers widen through their declared signedness,
//! floats truncate toward zero, strings parse their longest numeric prefix.
//! `get_any_field_string` renders sub-tables in a best-effort debug form
//! that is NOT JSON compliant (embedded quotes are not escaped).

use crate::schema::{Field, Object, Schema};
use crate::types::{BaseType, Scalar};
use crate::view::{field_offset, StringView, StructView, TableView, VectorView};

/// Read an integral field at its exact declared width.
pub fn get_field_integer<T: Scalar>(table: &TableView, field: &Field) -> T {
    assert_eq!(
        T::SIZE,
        field.base_type.size(),
        "scalar width does not match the declared type of `{}`",
        field.name
    );
    table.scalar_or(field.offset, T::from_i64(field.default_integer))
}

/// Read a floating-point field at its exact declared width.
pub fn get_field_real<T: Scalar>(table: &TableView, field: &Field) -> T {
    assert_eq!(
        T::SIZE,
        field.base_type.size(),
        "scalar width does not match the declared type of `{}`",
        field.name
    );
    table.scalar_or(field.offset, T::from_f64(field.default_real))
}

pub fn get_field_string<'a>(table: &TableView<'a>, field: &Field) -> Option<StringView<'a>> {
    assert_eq!(
        field.base_type,
        BaseType::String,
        "`{}` is not a string field",
        field.name
    );
    table
        .field_pos(field.offset)
        .map(|pos| StringView::new(table.buf(), table.indirect(pos)))
}

/// Resolve a vector field. The element size comes from the declared element
/// tag; vectors of inline structs need `VectorView::new` with the struct's
/// byte size instead.
pub fn get_field_vector<'a>(table: &TableView<'a>, field: &Field) -> Option<VectorView<'a>> {
    assert_eq!(
        field.base_type,
        BaseType::Vector,
        "`{}` is not a vector field",
        field.name
    );
    table
        .field_pos(field.offset)
        .map(|pos| VectorView::new(table.buf(), table.indirect(pos), field.element.size()))
}

pub fn get_field_table<'a>(table: &TableView<'a>, field: &Field) -> Option<TableView<'a>> {
    assert!(
        matches!(field.base_type, BaseType::Obj | BaseType::Union),
        "`{}` is not a table field",
        field.name
    );
    table
        .field_pos(field.offset)
        .map(|pos| TableView::at(table.buf(), table.indirect(pos)))
}

pub fn get_field_struct<'a>(
    table: &TableView<'a>,
    field: &Field,
    object: &Object,
) -> Option<StructView<'a>> {
    assert!(
        object.is_struct(),
        "`{}` does not name a struct layout",
        object.name()
    );
    table
        .field_pos(field.offset)
        .map(|pos| StructView::new(table.buf(), pos, object.bytesize()))
}

/// Read any field as an `i64`, whatever its declared type.
pub fn get_any_field_integer(table: &TableView, field: &Field) -> i64 {
    match field.base_type {
        BaseType::UType | BaseType::Bool | BaseType::UByte => {
            get_field_integer::<u8>(table, field).to_i64()
        }
        BaseType::Byte => get_field_integer::<i8>(table, field).to_i64(),
        BaseType::Short => get_field_integer::<i16>(table, field).to_i64(),
        BaseType::UShort => get_field_integer::<u16>(table, field).to_i64(),
        BaseType::Int => get_field_integer::<i32>(table, field).to_i64(),
        BaseType::UInt => get_field_integer::<u32>(table, field).to_i64(),
        BaseType::Long => get_field_integer::<i64>(table, field),
        BaseType::ULong => get_field_integer::<u64>(table, field).to_i64(),
        BaseType::Float => get_field_real::<f32>(table, field).to_i64(),
        BaseType::Double => get_field_real::<f64>(table, field).to_i64(),
        BaseType::String => match get_field_string(table, field) {
            Some(s) => parse_integer_prefix(&String::from_utf8_lossy(s.bytes())),
            None => 0,
        },
        _ => 0,
    }
}

/// Read any field as an `f64`, whatever its declared type.
pub fn get_any_field_real(table: &TableView, field: &Field) -> f64 {
    match field.base_type {
        BaseType::Float => get_field_real::<f32>(table, field).to_f64(),
        BaseType::Double => get_field_real::<f64>(table, field),
        BaseType::String => match get_field_string(table, field) {
            Some(s) => parse_real_prefix(&String::from_utf8_lossy(s.bytes())),
            None => 0.0,
        },
        _ => get_any_field_integer(table, field) as f64,
    }
}

/// Render any field as text. Sub-tables print as `Name { field: value, }`,
/// vectors as `[(elements)]`, unions as `(union)`, structs as
/// `Name(struct)`. Debug aid only; embedded quotes are not escaped.
pub fn get_any_field_string(table: &TableView, field: &Field, schema: &Schema) -> String {
    match field.base_type {
        BaseType::Float | BaseType::Double => format!("{}", get_any_field_real(table, field)),
        BaseType::String => match get_field_string(table, field) {
            Some(s) => String::from_utf8_lossy(s.bytes()).into_owned(),
            None => String::new(),
        },
        BaseType::Obj => {
            let object = schema.object(type_index(field));
            let mut out = object.name().to_string();
            if object.is_struct() {
                out.push_str("(struct)");
            } else {
                let sub = match get_field_table(table, field) {
                    Some(sub) => sub,
                    None => return out,
                };
                out.push_str(" { ");
                for sub_field in object.fields() {
                    if !sub.is_present(sub_field) {
                        continue;
                    }
                    let mut value = get_any_field_string(&sub, sub_field, schema);
                    if sub_field.base_type == BaseType::String {
                        value = format!("\"{}\"", value);
                    }
                    out.push_str(&sub_field.name);
                    out.push_str(": ");
                    out.push_str(&value);
                    out.push_str(", ");
                }
                out.push('}');
            }
            out
        }
        BaseType::Vector => "[(elements)]".to_string(),
        BaseType::Union => "(union)".to_string(),
        _ => format!("{}", get_any_field_integer(table, field)),
    }
}

/// Overwrite an inline scalar field at its exact declared width. Returns
/// false when the field is absent; writes never create missing fields.
pub fn set_field<T: Scalar>(buf: &mut [u8], table_pos: usize, field: &Field, value: T) -> bool {
    assert_eq!(
        T::SIZE,
        field.base_type.size(),
        "scalar width does not match the declared type of `{}`",
        field.name
    );
    match field_offset(buf, table_pos, field.offset) {
        0 => false,
        off => {
            value.write_le(buf, table_pos + off as usize);
            true
        }
    }
}

/// Write an `i64` into any scalar field, narrowing to the declared type.
pub fn set_any_field_integer(buf: &mut [u8], table_pos: usize, field: &Field, value: i64) -> bool {
    match field.base_type {
        BaseType::UType | BaseType::Bool | BaseType::UByte => {
            set_field(buf, table_pos, field, u8::from_i64(value))
        }
        BaseType::Byte => set_field(buf, table_pos, field, i8::from_i64(value)),
        BaseType::Short => set_field(buf, table_pos, field, i16::from_i64(value)),
        BaseType::UShort => set_field(buf, table_pos, field, u16::from_i64(value)),
        BaseType::Int => set_field(buf, table_pos, field, i32::from_i64(value)),
        BaseType::UInt => set_field(buf, table_pos, field, u32::from_i64(value)),
        BaseType::Long => set_field(buf, table_pos, field, value),
        BaseType::ULong => set_field(buf, table_pos, field, value as u64),
        BaseType::Float => set_field(buf, table_pos, field, f32::from_i64(value)),
        BaseType::Double => set_field(buf, table_pos, field, f64::from_i64(value)),
        _ => false,
    }
}

/// Write an `f64` into any scalar field; non-float targets truncate toward
/// zero through the integer path.
pub fn set_any_field_real(buf: &mut [u8], table_pos: usize, field: &Field, value: f64) -> bool {
    match field.base_type {
        BaseType::Float => set_field(buf, table_pos, field, value as f32),
        BaseType::Double => set_field(buf, table_pos, field, value),
        _ => set_any_field_integer(buf, table_pos, field, value as i64),
    }
}

/// Parse `value` and write it into a scalar field. String fields are not
/// supported here (their content can resize; use `set_string`).
pub fn set_any_field_string(buf: &mut [u8], table_pos: usize, field: &Field, value: &str) -> bool {
    match field.base_type {
        BaseType::Float | BaseType::Double => {
            set_any_field_real(buf, table_pos, field, parse_real_prefix(value))
        }
        BaseType::String => false,
        _ => set_any_field_integer(buf, table_pos, field, parse_integer_prefix(value)),
    }
}

/// Resolve the concrete table layout a union field currently holds, by
/// reading the sibling `<name>_type` tag from the table and looking it up
/// in the union's enum.
pub fn get_union_object<'s>(
    schema: &'s Schema,
    parent: &Object,
    union_field: &Field,
    table: &TableView,
) -> &'s Object {
    assert_eq!(
        union_field.base_type,
        BaseType::Union,
        "`{}` is not a union field",
        union_field.name
    );
    let enum_def = schema.enum_at(type_index(union_field));
    let type_field_name = format!("{}_type", union_field.name);
    let type_field = parent.field(&type_field_name).unwrap_or_else(|| {
        panic!(
            "object `{}` has no `{}` sibling for union field `{}`",
            parent.name(),
            type_field_name,
            union_field.name
        )
    });
    let tag = get_field_integer::<u8>(table, type_field) as i64;
    let value = enum_def
        .lookup(tag)
        .unwrap_or_else(|| panic!("union tag {} not in enum `{}`", tag, enum_def.name()));
    let object = value
        .object
        .unwrap_or_else(|| panic!("enum value `{}` names no object", value.name));
    schema.object(object)
}

pub(crate) fn type_index(field: &Field) -> usize {
    field
        .type_index
        .unwrap_or_else(|| panic!("field `{}` carries no type index", field.name))
}

/// Longest-decimal-prefix integer parse; anything without leading digits
/// yields 0, overflow saturates.
pub(crate) fn parse_integer_prefix(s: &str) -> i64 {
    let bytes = s.trim_start().as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i = 1;
            true
        }
        Some(b'+') => {
            i = 1;
            false
        }
        _ => false,
    };
    let mut value: i64 = 0;
    let mut any = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        any = true;
        value = value
            .saturating_mul(10)
            .saturating_add((bytes[i] - b'0') as i64);
        i += 1;
    }
    if !any {
        return 0;
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Longest-valid-prefix real parse (`[sign] digits [. digits] [e [sign] digits]`);
/// no valid prefix yields 0.0.
pub(crate) fn parse_real_prefix(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let bytes = trimmed.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            digits += 1;
        }
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    trimmed[..i].parse::<f64>().unwrap_or(0.0)
}
