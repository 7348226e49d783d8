//! End-to-end resize semantics: every previously readable field keeps its
//! logical value across string and vector resizes, whatever the buffer
//! topology between the resize point and the objects beyond it.

use flatview::{
    get_field_integer, get_field_string, get_field_table, get_field_vector, get_union_object,
    resize_vector, set_string, BaseType, Builder, Enum, EnumVal, Field, Object, Schema, Scalar,
    StringView, TableView,
};

const NODE: usize = 0;
const GPS: usize = 1;
const IMU: usize = 2;

fn node_schema() -> Schema {
    let node = Object::table(
        "Node",
        vec![
            Field::new("id", BaseType::UShort, 4),
            Field::new("name", BaseType::String, 6),
            Field::new("tag", BaseType::String, 8),
            Field::new("child", BaseType::Obj, 10).with_type_index(NODE),
            Field::new("samples", BaseType::Vector, 12).with_element(BaseType::Int),
            Field::new("labels", BaseType::Vector, 14).with_element(BaseType::String),
            Field::new("children", BaseType::Vector, 16)
                .with_element(BaseType::Obj)
                .with_type_index(NODE),
            Field::new("payload_type", BaseType::UType, 18),
            Field::new("payload", BaseType::Union, 20).with_type_index(0),
        ],
    );
    let gps = Object::table(
        "Gps",
        vec![
            Field::new("lat", BaseType::Double, 4),
            Field::new("lon", BaseType::Double, 6),
        ],
    );
    let imu = Object::table("Imu", vec![Field::new("axis", BaseType::Byte, 4)]);
    let payload = Enum::new(
        "Payload",
        vec![
            EnumVal::new("NONE", 0, None),
            EnumVal::new("Gps", 1, Some(GPS)),
            EnumVal::new("Imu", 2, Some(IMU)),
        ],
    );
    Schema::new(vec![node, gps, imu], vec![payload], NODE).unwrap()
}

fn field<'s>(schema: &'s Schema, object: usize, name: &str) -> &'s Field {
    schema.object(object).field(name).unwrap()
}

fn push_field<T: Scalar>(b: &mut Builder, slot: u16, value: T) {
    let off = b.push_scalar(value);
    b.track_field(slot, off);
}

fn string_pos(schema: &Schema, buf: &[u8], name: &str) -> usize {
    let table = TableView::root(buf).unwrap();
    get_field_string(&table, field(schema, NODE, name))
        .unwrap()
        .pos()
}

#[test]
fn growing_a_string_preserves_every_sibling_branch() {
    let schema = node_schema();
    let mut b = Builder::new();
    // Creation order puts tag and the gps payload beyond name in the
    // buffer, so growing name must rewrite the references to them.
    let tag = b.create_string("zz");
    let gps = {
        let start = b.start_table();
        push_field(&mut b, 4, 1.25f64);
        push_field(&mut b, 6, 2.5f64);
        b.end_table(start, schema.object(GPS).vtable_slot_count())
    };
    let name = b.create_string("n");
    let start = b.start_table();
    push_field(&mut b, 4, 7u16);
    b.add_offset(6, name);
    b.add_offset(8, tag);
    push_field(&mut b, 18, 1u8);
    b.add_offset(20, gps);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();
    let before = buf.len();

    let name_pos = string_pos(&schema, &buf, "name");
    set_string(&schema, "northwest", name_pos, &mut buf);

    assert_eq!(buf.len(), before + 8);
    let table = TableView::root(&buf).unwrap();
    assert_eq!(
        get_field_integer::<u16>(&table, field(&schema, NODE, "id")),
        7
    );
    assert_eq!(
        get_field_string(&table, field(&schema, NODE, "name"))
            .unwrap()
            .as_str()
            .unwrap(),
        "northwest"
    );
    assert_eq!(
        get_field_string(&table, field(&schema, NODE, "tag"))
            .unwrap()
            .as_str()
            .unwrap(),
        "zz"
    );
    let payload_field = field(&schema, NODE, "payload");
    let concrete = get_union_object(&schema, schema.object(NODE), payload_field, &table);
    assert_eq!(concrete.name(), "Gps");
    let payload = get_field_table(&table, payload_field).unwrap();
    assert_eq!(
        flatview::get_field_real::<f64>(&payload, field(&schema, GPS, "lat")),
        1.25
    );
    assert_eq!(
        flatview::get_field_real::<f64>(&payload, field(&schema, GPS, "lon")),
        2.5
    );
}

#[test]
fn growing_a_string_adjusts_string_vector_elements() {
    let schema = node_schema();
    let mut b = Builder::new();
    // The label strings go in first, the vector of offsets last, so the
    // element offsets span the resize point inside name.
    let aa = b.create_string("aa");
    let bb = b.create_string("bb");
    let name = b.create_string("n");
    let labels = b.create_offset_vector(&[aa, bb]);
    let start = b.start_table();
    b.add_offset(6, name);
    b.add_offset(14, labels);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();

    let name_pos = string_pos(&schema, &buf, "name");
    set_string(&schema, "name-grew-longer", name_pos, &mut buf);

    let table = TableView::root(&buf).unwrap();
    let labels = get_field_vector(&table, field(&schema, NODE, "labels")).unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(
        StringView::new(&buf, labels.indirect(0)).as_str().unwrap(),
        "aa"
    );
    assert_eq!(
        StringView::new(&buf, labels.indirect(1)).as_str().unwrap(),
        "bb"
    );
}

#[test]
fn growing_a_string_adjusts_table_vector_elements() {
    let schema = node_schema();
    let mut b = Builder::new();
    let first = {
        let start = b.start_table();
        push_field(&mut b, 4, 10u16);
        b.end_table(start, schema.object(NODE).vtable_slot_count())
    };
    let second = {
        let start = b.start_table();
        push_field(&mut b, 4, 20u16);
        b.end_table(start, schema.object(NODE).vtable_slot_count())
    };
    let name = b.create_string("n");
    let children = b.create_offset_vector(&[first, second]);
    let start = b.start_table();
    b.add_offset(6, name);
    b.add_offset(16, children);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();

    let name_pos = string_pos(&schema, &buf, "name");
    set_string(&schema, "stretched-name", name_pos, &mut buf);

    let table = TableView::root(&buf).unwrap();
    let children = get_field_vector(&table, field(&schema, NODE, "children")).unwrap();
    assert_eq!(children.len(), 2);
    let first = TableView::at(&buf, children.indirect(0));
    let second = TableView::at(&buf, children.indirect(1));
    assert_eq!(
        get_field_integer::<u16>(&first, field(&schema, NODE, "id")),
        10
    );
    assert_eq!(
        get_field_integer::<u16>(&second, field(&schema, NODE, "id")),
        20
    );
}

#[test]
fn resizing_deep_inside_a_subtree_keeps_outer_references() {
    let schema = node_schema();
    let mut b = Builder::new();
    let outer_tag = b.create_string("outer");
    let child_name = b.create_string("inner");
    let child = {
        let start = b.start_table();
        push_field(&mut b, 4, 5u16);
        b.add_offset(6, child_name);
        b.end_table(start, schema.object(NODE).vtable_slot_count())
    };
    let start = b.start_table();
    push_field(&mut b, 4, 1u16);
    b.add_offset(8, outer_tag);
    b.add_offset(10, child);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();

    // Resize the child's own string; the outer tag lives beyond it.
    let table = TableView::root(&buf).unwrap();
    let child_view = get_field_table(&table, field(&schema, NODE, "child")).unwrap();
    let inner_pos = get_field_string(&child_view, field(&schema, NODE, "name"))
        .unwrap()
        .pos();
    set_string(&schema, "inner-expanded", inner_pos, &mut buf);

    let table = TableView::root(&buf).unwrap();
    assert_eq!(
        get_field_string(&table, field(&schema, NODE, "tag"))
            .unwrap()
            .as_str()
            .unwrap(),
        "outer"
    );
    let child_view = get_field_table(&table, field(&schema, NODE, "child")).unwrap();
    assert_eq!(
        get_field_integer::<u16>(&child_view, field(&schema, NODE, "id")),
        5
    );
    assert_eq!(
        get_field_string(&child_view, field(&schema, NODE, "name"))
            .unwrap()
            .as_str()
            .unwrap(),
        "inner-expanded"
    );
}

#[test]
fn vector_resize_only_touches_bytes_at_and_after_its_tail() {
    let schema = node_schema();
    let mut b = Builder::new();
    let samples = {
        b.start_vector(4, 3);
        for v in [3i32, 2, 1] {
            b.push_scalar(v);
        }
        b.end_vector(3)
    };
    let start = b.start_table();
    push_field(&mut b, 4, 7u16);
    b.add_offset(12, samples);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();

    let table = TableView::root(&buf).unwrap();
    let vec_view = get_field_vector(&table, field(&schema, NODE, "samples")).unwrap();
    let vec_pos = vec_view.pos();
    let prefix_before = buf[..vec_pos].to_vec();

    resize_vector(&schema, 5, 99i32, vec_pos, &mut buf);

    assert_eq!(&buf[..vec_pos], &prefix_before[..]);
    let table = TableView::root(&buf).unwrap();
    let samples = get_field_vector(&table, field(&schema, NODE, "samples")).unwrap();
    let values: Vec<i32> = (0..samples.len()).map(|i| samples.get::<i32>(i)).collect();
    assert_eq!(values, vec![1, 2, 3, 99, 99]);
}

#[test]
fn sequential_resizes_compose() {
    let schema = node_schema();
    let mut b = Builder::new();
    let tag = b.create_string("constant");
    let samples = {
        b.start_vector(4, 2);
        for v in [2i32, 1] {
            b.push_scalar(v);
        }
        b.end_vector(2)
    };
    let name = b.create_string("start");
    let start = b.start_table();
    push_field(&mut b, 4, 7u16);
    b.add_offset(6, name);
    b.add_offset(8, tag);
    b.add_offset(12, samples);
    let root = b.end_table(start, schema.object(NODE).vtable_slot_count());
    b.finish(root);
    let mut buf = b.into_vec();

    let name_pos = string_pos(&schema, &buf, "name");
    set_string(&schema, "start-but-much-longer", name_pos, &mut buf);

    let table = TableView::root(&buf).unwrap();
    let vec_pos = get_field_vector(&table, field(&schema, NODE, "samples"))
        .unwrap()
        .pos();
    resize_vector(&schema, 4, -1i32, vec_pos, &mut buf);

    let name_pos = string_pos(&schema, &buf, "name");
    set_string(&schema, "end", name_pos, &mut buf);

    let table = TableView::root(&buf).unwrap();
    assert_eq!(
        get_field_integer::<u16>(&table, field(&schema, NODE, "id")),
        7
    );
    assert_eq!(
        get_field_string(&table, field(&schema, NODE, "name"))
            .unwrap()
            .as_str()
            .unwrap(),
        "end"
    );
    assert_eq!(
        get_field_string(&table, field(&schema, NODE, "tag"))
            .unwrap()
            .as_str()
            .unwrap(),
        "constant"
    );
    let samples = get_field_vector(&table, field(&schema, NODE, "samples")).unwrap();
    let values: Vec<i32> = (0..samples.len()).map(|i| samples.get::<i32>(i)).collect();
    assert_eq!(values, vec![1, 2, -1, -1]);
}
