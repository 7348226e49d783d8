//! # flatview - Schema-Driven Reflection for Flat Table Buffers
//!
//! flatview reads, edits, and rebuilds zero-copy binary table buffers using
//! a compiled schema, without generated code. This implementation
//! prioritizes:
//!
//! - **Zero-copy reads**: views borrow the buffer; no intermediate decode
//! - **In-place edits**: scalar overwrites never move bytes; string and
//!   vector resizes shift one contiguous region and rewrite only the
//!   relative offsets whose span crosses the shift point
//! - **Schema-driven traversal**: one reflection layer serves any layout
//!
//! ## Quick Start
//!
//! ```ignore
//! use flatview::{get_field_integer, set_string, Schema, TableView};
//!
//! let table = TableView::root(&buf)?;
//! let hp: u16 = get_field_integer(&table, field);
//!
//! // Content mutation invalidates every view into the buffer.
//! let name_pos = get_field_string(&table, name_field).unwrap().pos();
//! set_string(&schema, "renamed", name_pos, &mut buf);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   Deep Copy (compaction into a Builder)      │
//! ├──────────────────────┬──────────────────────┤
//! │   Resizer            │   Typed Accessors     │
//! ├──────────────────────┴──────────────────────┤
//! │   Buffer Primitives (root, vtable, views)    │
//! ├─────────────────────────────────────────────┤
//! │   Schema Model  │  Base Types & Scalar IO    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Buffer Layout
//!
//! Little-endian throughout. A buffer leads with a forward `u32` offset to
//! the root table. Tables start with a signed `i32` whose subtraction
//! yields the vtable position; vtables list per-field byte offsets (zero =
//! absent). Strings and vectors are length-prefixed; strings carry a
//! trailing NUL. Every reference inside a table points forward, and the
//! buffer forms a DAG under the points-to relation.
//!
//! ## Mutation Model
//!
//! The buffer is exclusively owned by the caller. Reads borrow it
//! immutably; `set_string` / `resize_vector` borrow the backing `Vec<u8>`
//! mutably and may shift its tail, so positions are re-fetched afterwards
//! through fresh views. Shrinks leave up to 7 dead bytes per operation
//! (deltas round to the 8-byte alignment floor); [`copy::copy_table`] into
//! a fresh [`builder::Builder`] reclaims them.
//!
//! ## Module Overview
//!
//! - [`types`]: base-type tags, wire constants, scalar load/store
//! - [`schema`]: objects, fields, enums; name and key lookup
//! - [`view`]: root/vtable primitives and zero-copy views
//! - [`access`]: exact-typed and coercing field accessors
//! - [`builder`]: back-to-front buffer construction
//! - [`resize`]: straddle-adjusting resizer, string/vector mutation
//! - [`copy`]: schema-driven deep copy

pub mod access;
pub mod builder;
pub mod copy;
pub mod resize;
pub mod schema;
pub mod types;
pub mod view;


pub use access::{
    get_any_field_integer, get_any_field_real, get_any_field_string, get_field_integer,
    get_field_real, get_field_string, get_field_struct, get_field_table, get_field_vector,
    get_union_object, set_any_field_integer, set_any_field_real, set_any_field_string, set_field,
};
pub use builder::Builder;
pub use copy::copy_table;
pub use resize::{resize_buffer, resize_vector, resize_vector_raw, set_string};
pub use schema::{Enum, EnumVal, Field, Object, Schema};
pub use types::{BaseType, Scalar};
pub use view::{root_table_pos, StringView, StructView, TableView, VectorView};
