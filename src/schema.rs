//! # Schema Model
//!
//! Read-only description of every object layout a buffer can contain:
//! tables and structs (`Object`), their `Field`s, and the `Enum`s backing
//! union fields. The schema is produced elsewhere (a schema compiler is out
//! of scope); this module only stores it and answers lookups.
//!
//! ## Lookup Structure
//!
//! - `objects`: ordered list, indexed by the `type_index` carried on fields
//! - per-object field list ordered by vtable offset, plus a name index for
//!   O(1) lookup (union resolution finds the `<name>_type` sibling by name)
//! - per-enum value list sorted by integer key for binary search

use eyre::{ensure, Result};
use hashbrown::HashMap;

use crate::types::{BaseType, SIZE_VOFFSET};

/// A single field of a table or struct.
///
/// `offset` is the vtable byte offset for table fields (`4 + 2 * field_id`)
/// and the inline byte offset for struct members. `type_index` points into
/// the schema's objects for `Obj` fields and vectors of tables/structs, and
/// into the schema's enums for `Union` fields.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub base_type: BaseType,
    pub element: BaseType,
    pub type_index: Option<usize>,
    pub offset: u16,
    pub default_integer: i64,
    pub default_real: f64,
}

impl Field {
    pub fn new(name: impl Into<String>, base_type: BaseType, offset: u16) -> Self {
        Self {
            name: name.into(),
            base_type,
            element: BaseType::None,
            type_index: None,
            offset,
            default_integer: 0,
            default_real: 0.0,
        }
    }

    pub fn with_element(mut self, element: BaseType) -> Self {
        self.element = element;
        self
    }

    pub fn with_type_index(mut self, index: usize) -> Self {
        self.type_index = Some(index);
        self
    }

    pub fn with_default_integer(mut self, default: i64) -> Self {
        self.default_integer = default;
        self
    }

    pub fn with_default_real(mut self, default: f64) -> Self {
        self.default_real = default;
        self
    }
}

/// A table or struct layout.
#[derive(Debug, Clone)]
pub struct Object {
    name: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    is_struct: bool,
    minalign: usize,
    bytesize: usize,
}

impl Object {
    pub fn table(name: impl Into<String>, mut fields: Vec<Field>) -> Self {
        fields.sort_by_key(|f| f.offset);
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            name: name.into(),
            fields,
            by_name,
            is_struct: false,
            minalign: 1,
            bytesize: 0,
        }
    }

    /// A fixed-layout struct: `bytesize` total bytes, fields at inline
    /// offsets, no vtable, no absent fields.
    pub fn fixed_struct(
        name: impl Into<String>,
        mut fields: Vec<Field>,
        minalign: usize,
        bytesize: usize,
    ) -> Self {
        fields.sort_by_key(|f| f.offset);
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            name: name.into(),
            fields,
            by_name,
            is_struct: true,
            minalign,
            bytesize,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn is_struct(&self) -> bool {
        self.is_struct
    }

    pub fn minalign(&self) -> usize {
        self.minalign
    }

    pub fn bytesize(&self) -> usize {
        self.bytesize
    }

    /// Number of vtable slots a table of this layout needs, derived from the
    /// largest field offset so sparse field ids still fit.
    pub fn vtable_slot_count(&self) -> u16 {
        match self.fields.last() {
            Some(f) => (f.offset - 2 * SIZE_VOFFSET as u16) / SIZE_VOFFSET as u16 + 1,
            None => 0,
        }
    }
}

/// One member of an enum; for union enums, `object` names the table layout
/// the tag value selects.
#[derive(Debug, Clone)]
pub struct EnumVal {
    pub name: String,
    pub value: i64,
    pub object: Option<usize>,
}

impl EnumVal {
    pub fn new(name: impl Into<String>, value: i64, object: Option<usize>) -> Self {
        Self {
            name: name.into(),
            value,
            object,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enum {
    name: String,
    values: Vec<EnumVal>,
}

impl Enum {
    pub fn new(name: impl Into<String>, mut values: Vec<EnumVal>) -> Self {
        values.sort_by_key(|v| v.value);
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[EnumVal] {
        &self.values
    }

    pub fn lookup(&self, value: i64) -> Option<&EnumVal> {
        self.values
            .binary_search_by_key(&value, |v| v.value)
            .ok()
            .map(|i| &self.values[i])
    }
}

/// The complete compiled schema: all object layouts, all enums, and the
/// layout of the buffer's root table.
#[derive(Debug, Clone)]
pub struct Schema {
    objects: Vec<Object>,
    enums: Vec<Enum>,
    root_object: usize,
}

impl Schema {
    pub fn new(objects: Vec<Object>, enums: Vec<Enum>, root_object: usize) -> Result<Self> {
        ensure!(
            root_object < objects.len(),
            "root object index {} out of range ({} objects)",
            root_object,
            objects.len()
        );
        Ok(Self {
            objects,
            enums,
            root_object,
        })
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> &Object {
        &self.objects[index]
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn enum_at(&self, index: usize) -> &Enum {
        &self.enums[index]
    }

    pub fn root_object(&self) -> &Object {
        &self.objects[self.root_object]
    }
}
