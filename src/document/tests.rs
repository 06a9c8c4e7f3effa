// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════
mod document_tests {
    use crate::colbin_value::{BinaryKind, ColbinBinary, ColbinColumn, ColbinValue};
    use crate::config::DocConfig;
    use crate::deserialization::{FieldRef, decode_field};
    use crate::document::skip::skip_field;
    use crate::document::*;
    use crate::error::DocError;
    use crate::memfile::{MemFile, Offset};
    use crate::printer::print_field;
    use crate::scalar::{ColumnValue, Number, Scalar};
    use crate::serialization::encode_field;
    use crate::types::*;

    const FIXTURE: &str =
        r#"[4223, [[88, 89, 90], ["Hello", [65, 66, 67], "World"], 1, 1, [23, 24, 25], 1]]"#;

    fn doc(json: &str) -> Document {
        Document::from_json_str(json).unwrap()
    }

    fn text(doc: &Document) -> String {
        doc.to_json_string().unwrap()
    }

    fn column_doc(column_type: ColumnType, slots: Vec<Scalar>, capacity: u64) -> Document {
        let column = ColbinColumn::new(column_type, slots).with_capacity(capacity);
        Document::from_value(&ColbinValue::Column(column)).unwrap()
    }

    fn unsigned(values: &[u64]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::Unsigned(*v)).collect()
    }

    /// A non-null value every column of `column_type` stores in place.
    fn sample(column_type: ColumnType) -> Scalar {
        match column_type {
            ColumnType::Boolean => Scalar::Bool(true),
            ColumnType::Float => Scalar::Float(1.5),
            ct if ct.is_signed() => Scalar::Signed(-7),
            _ => Scalar::Unsigned(7),
        }
    }

    fn status<T>(resolved: Resolved<T>) -> Option<PathStatus> {
        resolved.status()
    }

    fn assert_field_round_trips(file: &MemFile, at: Offset) {
        let end = skip_field(file, at).unwrap();
        let value = decode_field(file, at).unwrap();
        assert_eq!(
            encode_field(&value).unwrap(),
            &file.as_bytes()[at.get()..end.get()],
            "field at {}",
            at.get()
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Round trips
    // ═══════════════════════════════════════════════════════════════════════

    #[rstest::rstest]
    #[case("[1, null, 3]")]
    #[case("[1, -42, 23.0]")]
    #[case("[]")]
    #[case("{}")]
    #[case("5")]
    #[case("[5]")]
    #[case(r#"[[1, "a"]]"#)]
    #[case(r#""hé \"quoted\"""#)]
    #[case("[1.5, 2.25]")]
    #[case("[-1, 300]")]
    #[case("[[], {}]")]
    #[case(r#"{"a": 1, "b": [true, false, null], "c": "x"}"#)]
    #[case(r#"{"nested": {"deep": [{"x": null}]}}"#)]
    #[case(FIXTURE)]
    fn test_text_round_trip(#[case] json: &str) {
        let d = doc(json);
        let expected = serde_json::to_string(&serde_json::from_str::<serde_json::Value>(json).unwrap())
            .unwrap();
        let printed = text(&d);
        let reparsed: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(serde_json::to_string(&reparsed).unwrap(), expected);

        let again = Document::from_value(&d.to_value().unwrap()).unwrap();
        assert_eq!(again.as_bytes(), d.as_bytes());
    }

    #[test]
    fn test_canonical_text_is_exact() {
        assert_eq!(text(&doc("[1, null, 3]")), "[1, null, 3]");
        assert_eq!(text(&doc("[1, -42, 23.0]")), "[1, -42, 23.0]");
        assert_eq!(text(&doc(FIXTURE)), FIXTURE);
        assert_eq!(text(&doc("[]")), "[]");
        assert_eq!(text(&doc("{}")), "{}");
        assert_eq!(text(&doc("[[], {}]")), "[[], {}]");
        assert_eq!(
            text(&doc(r#"{"a": 1, "b": [true, false, null]}"#)),
            r#"{"a": 1, "b": [true, false, null]}"#
        );
    }

    #[test]
    fn test_binary_fields() {
        let custom = ColbinBinary {
            kind: BinaryKind::Custom("my/type".into()),
            data: vec![0xAB],
        };
        let json = ColbinBinary {
            kind: BinaryKind::Mime(1),
            data: b"{}".to_vec(),
        };
        let value = ColbinValue::array(vec![
            ColbinValue::Binary(custom),
            ColbinValue::Binary(json.clone()),
            ColbinValue::Null,
        ]);
        let d = Document::from_value(&value).unwrap();

        let mut root = d.root().unwrap();
        assert_eq!(root.len(), 3);
        assert!(root.next().unwrap());
        assert_eq!(root.field_type().unwrap(), FieldType::BinaryCustom);
        assert_eq!(
            root.value().unwrap(),
            FieldRef::CustomBinary { type_name: "my/type", data: &[0xAB] }
        );
        assert_field_round_trips(&d.file, root.value_offset().unwrap());
        assert!(root.next().unwrap());
        assert_eq!(root.field_type().unwrap(), FieldType::Binary);
        assert_eq!(root.value().unwrap(), FieldRef::Binary { mime_id: 1, data: b"{}" });
        assert_field_round_trips(&d.file, root.value_offset().unwrap());

        assert_eq!(
            text(&d),
            r#"[{"type": "my/type", "encoding": "base64", "binary-string": "qw=="}, {"type": "application/json", "encoding": "base64", "binary-string": "e30="}, null]"#
        );
        assert_eq!(d.get("1").unwrap(), Some(ColbinValue::Binary(json)));
        assert_eq!(d.to_value().unwrap(), value);
    }

    #[test]
    fn test_corrupted_count_is_an_error() {
        // count varint decodes to u64::MAX with nothing behind it
        for marker in [MARKER_ARRAY, MARKER_OBJECT] {
            let mut bytes = vec![marker, 0xFF];
            bytes.extend_from_slice(&[0xFF; 8]);
            let file = MemFile::from_vec(bytes);
            assert!(matches!(
                decode_field(&file, Offset::ZERO),
                Err(DocError::Corrupted { .. })
            ));
            assert!(skip_field(&file, Offset::ZERO).is_err());
        }
    }

    #[test]
    fn test_nullable_column_layout() {
        let d = doc("[1, null, 3]");
        let mut root = d.root().unwrap();
        assert!(root.is_unit());
        assert!(root.next().unwrap());
        assert_eq!(root.field_type().unwrap(), FieldType::Column(ColumnType::U8));

        let column = root.column_value().unwrap();
        assert_eq!(column.len(), 3);
        assert_eq!(column.capacity(), 3);
        assert!(!column.is_null(0).unwrap());
        assert!(column.is_null(1).unwrap());
        assert_eq!(column.get(2).unwrap(), Scalar::Unsigned(3));

        let values = column.values::<u8>().unwrap();
        assert_eq!(values.to_vec(), vec![1, u8::MAX, 3]);
        assert!(values.get(1).unwrap().is_null());
        assert!(values.get(3).is_none());
        assert!(column.values::<u16>().is_err());
        assert_eq!(column.raw_payload().unwrap(), &[1, u8::MAX, 3]);
    }

    #[test]
    fn test_every_field_round_trips_bytes() {
        let d = doc(FIXTURE);
        let file = d.file();
        assert_field_round_trips(file, Offset::ZERO);

        let mut root = d.root().unwrap();
        while root.next().unwrap() {
            assert_field_round_trips(file, root.value_offset().unwrap());
        }
        assert!(root.advance_to(1).unwrap());
        let mut inner = root.array_value().unwrap();
        while inner.next().unwrap() {
            assert_field_round_trips(file, inner.value_offset().unwrap());
        }
    }

    #[test]
    fn test_print_nested_field() {
        let d = doc(FIXTURE);
        let mut root = d.root().unwrap();
        assert!(root.advance_to(1).unwrap());
        assert_eq!(
            print_field(d.file(), root.value_offset().unwrap()).unwrap(),
            r#"[[88, 89, 90], ["Hello", [65, 66, 67], "World"], 1, 1, [23, 24, 25], 1]"#
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Path resolution
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_fixture_paths() {
        let d = doc(FIXTURE);
        assert_eq!(
            d.get("1.0.0").unwrap(),
            Some(ColbinValue::Number(Number::U8(88)))
        );
        assert_eq!(status(d.find("1.0.3").unwrap()), Some(PathStatus::NoSuchIndex));
        assert_eq!(
            d.get("0").unwrap(),
            Some(ColbinValue::Number(Number::U16(4223)))
        );
        assert_eq!(d.get("1.1.0").unwrap(), Some(ColbinValue::from("Hello")));
        assert_eq!(
            d.get("1.1.1.2").unwrap(),
            Some(ColbinValue::Number(Number::U8(67)))
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let d = doc(FIXTURE);
        let path = DotPath::parse("1.4.2").unwrap();
        let first = d.get(&path).unwrap();
        let second = d.get(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Some(ColbinValue::Number(Number::U8(25))));
    }

    #[test]
    fn test_found_positions() {
        let d = doc(FIXTURE);
        let Resolved::Found(PathPosition::Array(it)) = d.find("1.1").unwrap() else {
            panic!("expected an array position");
        };
        assert_eq!(it.field_type().unwrap(), FieldType::Array);
        assert_eq!(it.index(), 1);
        assert_eq!(it.array_value().unwrap().len(), 3);

        let Resolved::Found(PathPosition::Column(column, pos)) = d.find("1.4.1").unwrap() else {
            panic!("expected a column position");
        };
        assert_eq!(pos, 1);
        assert_eq!(column.get(pos).unwrap(), Scalar::Unsigned(24));
    }

    #[test]
    fn test_resolution_statuses() {
        let d = doc(FIXTURE);
        assert_eq!(status(d.find("1.0.0.0").unwrap()), Some(PathStatus::NoNesting));
        assert_eq!(status(d.find("0.1").unwrap()), Some(PathStatus::NotTraversable));
        assert_eq!(status(d.find("1.x").unwrap()), Some(PathStatus::NotAnObject));
        assert_eq!(status(d.find("9").unwrap()), Some(PathStatus::NoSuchIndex));
        assert_eq!(status(d.find("1.0.x").unwrap()), Some(PathStatus::NotAnObject));

        let d = doc(r#"{"a": [1, 2], "o": {"b": 1}, "s": 3}"#);
        assert_eq!(status(d.find("b").unwrap()), Some(PathStatus::NoSuchKey));
        assert_eq!(status(d.find("a.x").unwrap()), Some(PathStatus::NotAnObject));
        assert_eq!(status(d.find("a.5").unwrap()), Some(PathStatus::NoSuchIndex));
        assert_eq!(status(d.find("o.0").unwrap()), Some(PathStatus::NoSuchIndex));
        assert_eq!(status(d.find("s.t").unwrap()), Some(PathStatus::NotTraversable));
        assert_eq!(d.get("a.1").unwrap(), Some(ColbinValue::Number(Number::U8(2))));
        assert_eq!(d.get("o.b").unwrap(), Some(ColbinValue::Number(Number::U8(1))));
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(status(doc("[]").find("0").unwrap()), Some(PathStatus::EmptyDoc));
        assert_eq!(status(doc("{}").find("a").unwrap()), Some(PathStatus::EmptyDoc));
        assert_eq!(
            status(Document::new_empty().find("x").unwrap()),
            Some(PathStatus::EmptyDoc)
        );
        assert!(matches!(doc("[1]").find(""), Err(DocError::InvalidPath(_))));
        assert!(matches!(
            resolve(doc("[1]").file(), &DotPath::new()),
            Err(DocError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_unit_array_wrapping() {
        // a record holding one object is looked through by keys
        let d = doc(r#"{"a": 1}"#);
        assert_eq!(d.get("a").unwrap(), Some(ColbinValue::Number(Number::U8(1))));

        // a single-item top-level array is addressed by index
        let d = doc(r#"[{"a": 1}]"#);
        assert_eq!(d.get("0.a").unwrap(), Some(ColbinValue::Number(Number::U8(1))));
        assert_eq!(status(d.find("a").unwrap()), Some(PathStatus::NotAnObject));

        let d = doc(r#"{"list": [{"k": "v"}]}"#);
        assert_eq!(d.get("list.k").unwrap(), Some(ColbinValue::from("v")));
    }

    #[test]
    fn test_quoted_digit_keys() {
        let d = doc(r#"{"1": "one", "2": "two"}"#);
        assert_eq!(d.get(r#""2""#).unwrap(), Some(ColbinValue::from("two")));
        let path = DotPath::new().key("1");
        assert_eq!(d.get(&path).unwrap(), Some(ColbinValue::from("one")));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Column updates
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_set_null_is_idempotent() {
        let mut d = doc("[1, 2, 3]");
        assert_eq!(d.revise().set_null("1").unwrap(), Resolved::Found(()));
        let once = d.as_bytes().to_vec();
        d.revise().set_null("1").unwrap();
        assert_eq!(d.as_bytes(), &once[..]);
        assert_eq!(text(&d), "[1, null, 3]");
    }

    #[test]
    fn test_column_remove_keeps_capacity() {
        let mut d = column_doc(ColumnType::U16, unsigned(&[1, 2, 3]), 10);
        let before = d.byte_len();
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            assert!(root.next().unwrap());
            let mut column = root.column_value_mut().unwrap();
            column.remove(1).unwrap();
            assert_eq!(column.len(), 2);
            assert_eq!(column.capacity(), 10);
            assert_eq!(column.values::<u16>().unwrap().to_vec(), vec![1, 3]);
        }
        assert_eq!(d.byte_len(), before);
        assert_eq!(text(&d), "[1, 3]");
        assert_field_round_trips(d.file(), Offset::ZERO);
    }

    #[test]
    fn test_widening_rewrites_column() {
        let mut d = doc("[1, 2, 3]");
        assert_eq!(d.byte_len(), 8);
        {
            let mut rev = d.revise();
            let Resolved::Found(PathPosition::Column(mut column, pos)) = rev.resolve_mut("0").unwrap()
            else {
                panic!("expected a column position");
            };
            assert_eq!(
                column.write_scalar(pos, Scalar::Unsigned(1024)).unwrap(),
                ColumnWrite::Widened(ColumnType::U16)
            );
            assert_eq!(column.column_type(), ColumnType::U16);
            assert_eq!(column.len(), 3);
            assert_eq!(column.get(0).unwrap(), Scalar::Unsigned(1024));
            assert_eq!(column.get(2).unwrap(), Scalar::Unsigned(3));
        }
        // record header, column header, three 2-byte slots
        assert_eq!(d.byte_len(), 11);
        assert_eq!(&d.as_bytes()[5..7], &1024u16.to_le_bytes());
        assert_eq!(text(&d), "[1024, 2, 3]");
    }

    #[test]
    fn test_widening_keeps_nulls() {
        let mut d = doc("[null, 2, null]");
        d.revise().set_u32("1", 70_000).unwrap();
        assert_eq!(text(&d), "[null, 70000, null]");
        let mut root = d.root().unwrap();
        root.next().unwrap();
        assert_eq!(root.field_type().unwrap(), FieldType::Column(ColumnType::U32));
    }

    #[test]
    fn test_set_u32_in_mixed_array() {
        let mut d = doc("[1, -42, 23.0]");
        assert_eq!(d.revise().set_u32("1", 1024).unwrap(), Resolved::Found(()));
        assert_eq!(text(&d), "[1, 1024, 23.0]");
        assert_eq!(d.get("1").unwrap(), Some(ColbinValue::Number(Number::U16(1024))));
    }

    #[test]
    fn test_set_true_promotes_u32_column() {
        let mut d = column_doc(ColumnType::U32, unsigned(&[1, 2, 3]), 3);
        d.revise().set_true("0").unwrap();
        assert_eq!(text(&d), "[true, 2, 3]");

        let value = d.to_value().unwrap();
        assert_eq!(
            value.as_array().unwrap(),
            &[
                ColbinValue::Bool(true),
                ColbinValue::Number(Number::U32(2)),
                ColbinValue::Number(Number::U32(3)),
            ]
        );
    }

    #[test]
    fn test_promoted_column_iterator_is_retired() {
        let mut d = column_doc(ColumnType::I16, vec![Scalar::Signed(-1), Scalar::Null], 4);
        let mut rev = d.revise();
        let mut root = rev.root_mut().unwrap();
        root.next().unwrap();
        let mut column = root.column_value_mut().unwrap();
        assert_eq!(column.update_set_false(1).unwrap(), ColumnWrite::Promoted);
        assert!(matches!(column.get(0), Err(DocError::IllegalOperation(_))));
        assert!(matches!(
            column.update_set_null(0),
            Err(DocError::UnsupportedContainer(MARKER_ARRAY))
        ));
        drop(column);
        assert_eq!(root.field_type().unwrap(), FieldType::Array);
        assert_eq!(root.decode().unwrap(), ColbinValue::array(vec![
            ColbinValue::Number(Number::I16(-1)),
            ColbinValue::Bool(false),
        ]));
    }

    #[test]
    fn test_boolean_column_takes_booleans_in_place() {
        let mut d = doc("[true, false, null]");
        let before = d.byte_len();
        d.revise().set_true("2").unwrap();
        d.revise().set_bool("0", false).unwrap();
        assert_eq!(d.byte_len(), before);
        assert_eq!(text(&d), "[false, false, true]");
    }

    #[test]
    fn test_sentinel_values_widen_or_promote() {
        let mut d = doc("[1, 2]");
        // 255 is the u8 null sentinel
        d.revise().set_u8("1", 255).unwrap();
        assert_eq!(text(&d), "[1, 255]");
        d.revise().set_i8("0", -1).unwrap();
        assert_eq!(text(&d), "[-1, 255]");
        let mut root = d.root().unwrap();
        root.next().unwrap();
        assert_eq!(root.field_type().unwrap(), FieldType::Array);
    }

    #[test]
    fn test_signed_column_embeds_unsigned() {
        let mut d = doc("[-1, 2]");
        let before = d.byte_len();
        d.revise().set_u8("1", 100).unwrap();
        assert_eq!(d.byte_len(), before);
        assert_eq!(text(&d), "[-1, 100]");
        d.revise().set_u16("1", 300).unwrap();
        assert_eq!(text(&d), "[-1, 300]");
        assert_eq!(d.get("1").unwrap(), Some(ColbinValue::Number(Number::I16(300))));
    }

    #[test]
    fn test_float_column_updates() {
        let mut d = doc("[1.5, 2.5]");
        d.revise().set_float("0", 3.25).unwrap();
        assert_eq!(text(&d), "[3.25, 2.5]");
        d.revise().set_u8("1", 7).unwrap();
        assert_eq!(text(&d), "[3.25, 7]");
        assert_eq!(d.get("1").unwrap(), Some(ColbinValue::Number(Number::U8(7))));
    }

    #[test]
    fn test_typed_set_checks_slot_type() {
        let mut d = doc("[10, 20]");
        let mut rev = d.revise();
        let mut root = rev.root_mut().unwrap();
        root.next().unwrap();
        let mut column = root.column_value_mut().unwrap();
        column.set::<u8>(1, 21).unwrap();
        assert!(matches!(column.set::<i32>(1, 5), Err(DocError::TypeMismatch { .. })));
        assert_eq!(column.get(1).unwrap(), Scalar::Unsigned(21));
    }

    #[test]
    fn test_column_push_grows_capacity() {
        let mut d = doc("[1, 2]");
        assert_eq!(d.byte_len(), 7);
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            root.next().unwrap();
            let mut column = root.column_value_mut().unwrap();
            column.push(Scalar::Unsigned(3)).unwrap();
            assert_eq!(column.len(), 3);
            assert_eq!(column.capacity(), 4);
            column.push(Scalar::Null).unwrap();
            assert_eq!(column.capacity(), 4);
            assert!(matches!(
                column.push(Scalar::Unsigned(255)),
                Err(DocError::TypeMismatch { .. })
            ));
        }
        assert_eq!(d.byte_len(), 9);
        assert_eq!(text(&d), "[1, 2, 3, null]");
    }

    #[rstest::rstest]
    fn test_column_out_of_bounds(
        #[values(
            ColumnType::U8,
            ColumnType::U16,
            ColumnType::U32,
            ColumnType::U64,
            ColumnType::I8,
            ColumnType::I16,
            ColumnType::I32,
            ColumnType::I64,
            ColumnType::Float,
            ColumnType::Boolean
        )]
        column_type: ColumnType,
        #[values(0, 3)] len: u64,
    ) {
        let mut d = column_doc(column_type, vec![sample(column_type); len as usize], len);
        let mut rev = d.revise();
        let mut root = rev.root_mut().unwrap();
        assert!(root.next().unwrap());
        let mut column = root.column_value_mut().unwrap();
        assert_eq!(column.len(), len);

        let out_of_bounds =
            |r: Result<(), DocError>| matches!(r, Err(DocError::OutOfBounds { index, len: l }) if index == len && l == len);
        assert!(out_of_bounds(column.is_null(len).map(|_| ())));
        assert!(out_of_bounds(column.remove(len)));
        assert!(out_of_bounds(column.update_set_null(len)));
        assert!(out_of_bounds(column.write_scalar(len, sample(column_type)).map(|_| ())));
        assert_eq!(column.len(), len);
    }

    #[rstest::rstest]
    fn test_null_slots_match_sentinels(
        #[values(
            ColumnType::U8,
            ColumnType::U16,
            ColumnType::U32,
            ColumnType::U64,
            ColumnType::I8,
            ColumnType::I16,
            ColumnType::I32,
            ColumnType::I64,
            ColumnType::Float,
            ColumnType::Boolean
        )]
        column_type: ColumnType,
    ) {
        let slots = vec![sample(column_type), Scalar::Null, sample(column_type)];
        let mut d = column_doc(column_type, slots, 5);
        let mut rev = d.revise();
        let mut root = rev.root_mut().unwrap();
        root.next().unwrap();
        let mut column = root.column_value_mut().unwrap();
        assert_eq!(
            (0..3).map(|p| column.is_null(p).unwrap()).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        column.update_set_null(2).unwrap();
        assert!(column.is_null(2).unwrap());
        assert_eq!(column.get(2).unwrap(), Scalar::Null);
        assert_eq!(column.write_scalar(1, sample(column_type)).unwrap(), ColumnWrite::InPlace);
        assert!(!column.is_null(1).unwrap());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Arrays and objects
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_object_insert_mid_iteration() {
        let mut d = doc(r#"{"1": 1, "2": 2, "3": 3, "4": 4, "5": 5}"#);
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            assert!(root.next().unwrap());
            let mut object = root.object_value_mut().unwrap();
            while object.next().unwrap() {
                if object.key().unwrap() == "2" {
                    break;
                }
            }
            let mut inserter = object.inserter();
            inserter.push("new", &ColbinValue::from("x")).unwrap();
            assert_eq!(inserter.end().unwrap(), 1);

            assert_eq!(object.len(), 6);
            assert!(object.next().unwrap());
            assert_eq!(object.key().unwrap(), "new");
            assert!(object.next().unwrap());
            assert_eq!(object.key().unwrap(), "3");
        }
        assert_eq!(
            text(&d),
            r#"{"1": 1, "2": 2, "new": "x", "3": 3, "4": 4, "5": 5}"#
        );
    }

    #[test]
    fn test_array_insert_positions() {
        let mut d = doc(r#"["a", "b"]"#);
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            let mut inserter = root.inserter();
            inserter.push_str("z");
            inserter.end().unwrap();

            while root.next().unwrap() {}
            assert_eq!(root.state(), IterState::Exhausted);
            let mut inserter = root.inserter();
            inserter.push_scalar(Scalar::Unsigned(9));
            assert_eq!(inserter.end().unwrap(), 1);

            assert!(root.next().unwrap());
            assert_eq!(root.value().unwrap(), FieldRef::Number(Number::U8(9)));
            assert!(!root.next().unwrap());

            // dropped without end() still commits
            let mut inserter = root.inserter();
            inserter.push(&ColbinValue::Null).unwrap();
        }
        assert_eq!(text(&d), r#"["z", "a", "b", 9, null]"#);
    }

    #[test]
    fn test_removal_to_empty() {
        let mut d = doc(r#"["a", 1, null]"#);
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            while root.next().unwrap() {
                root.remove().unwrap();
            }
            assert!(root.is_empty());
            assert!(!root.next().unwrap());
        }
        assert_eq!(text(&d), "[]");

        let mut d = doc(r#"{"a": 1, "b": "x"}"#);
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            root.next().unwrap();
            let mut object = root.object_value_mut().unwrap();
            while object.next().unwrap() {
                object.remove().unwrap();
            }
        }
        assert_eq!(text(&d), "{}");
        let mut root = d.root().unwrap();
        root.next().unwrap();
        assert!(!root.object_value().unwrap().next().unwrap());

        let mut d = doc("[1, 2, 3]");
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            root.next().unwrap();
            let mut column = root.column_value_mut().unwrap();
            while column.next() {
                let pos = column.position().unwrap();
                column.remove(pos).unwrap();
            }
            assert!(column.is_empty());
            assert_eq!(column.capacity(), 3);
            assert!(!column.next());
        }
        assert_eq!(text(&d), "[]");
    }

    #[test]
    fn test_count_varint_shrinks_on_remove() {
        // 241 needs a two-byte count, 240 fits in one
        let mut d = Document::from_value(&ColbinValue::array(vec![ColbinValue::Null; 241])).unwrap();
        assert_eq!(d.byte_len(), 1 + 2 + 241);
        assert_eq!(d.revise().remove("0").unwrap(), Resolved::Found(()));
        assert_eq!(d.byte_len(), 1 + 1 + 240);
        assert_eq!(d.root().unwrap().len(), 240);
    }

    #[test]
    fn test_cursor_follows_header_shift() {
        let mut items = vec![ColbinValue::Null; 240];
        items.push(ColbinValue::from("end"));
        let value = ColbinValue::object([("k", ColbinValue::array(items))]);
        let mut d = Document::from_value(&value).unwrap();
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            root.next().unwrap();
            let mut object = root.object_value_mut().unwrap();
            assert!(object.find("k").unwrap());
            let mut array = object.array_value_mut().unwrap();
            assert!(array.next().unwrap());
            array.remove().unwrap();
            assert!(array.next().unwrap());
            assert_eq!(array.field_type().unwrap(), FieldType::Null);
            assert!(array.advance_to(239).unwrap());
            assert_eq!(array.value().unwrap(), FieldRef::Str("end"));
            assert!(!array.next().unwrap());
        }
        assert_eq!(d.get("k.239").unwrap(), Some(ColbinValue::from("end")));
    }

    #[test]
    fn test_scalar_writes_in_objects() {
        let mut d = doc(r#"{"a": 1, "b": "x"}"#);
        d.revise().set_i64("a", -5_000_000_000).unwrap();
        d.revise().set_null("b").unwrap();
        assert_eq!(text(&d), r#"{"a": -5000000000, "b": null}"#);
        assert_eq!(
            d.get("a").unwrap(),
            Some(ColbinValue::Number(Number::I64(-5_000_000_000)))
        );
        d.revise().set_u8("a", 1).unwrap();
        assert_eq!(d.byte_len(), doc(r#"{"a": 1, "b": null}"#).byte_len());
    }

    #[test]
    fn test_replace_and_remove_by_path() {
        let mut d = doc(r#"{"a": [1, "two"], "b": {"c": 3}}"#);
        {
            let mut rev = d.revise();
            let Resolved::Found(PathPosition::Object(mut it)) = rev.resolve_mut("b").unwrap() else {
                panic!("expected an object position");
            };
            it.replace(&ColbinValue::from("flat")).unwrap();
        }
        assert_eq!(d.revise().remove("a.0").unwrap(), Resolved::Found(()));
        assert_eq!(
            d.revise().remove("a.5").unwrap(),
            Resolved::Missing(PathStatus::NoSuchIndex)
        );
        assert_eq!(text(&d), r#"{"a": ["two"], "b": "flat"}"#);
    }

    #[test]
    fn test_update_type_only_touches_marker() {
        let mut d = doc("[3, 1, 2]");
        let before = d.byte_len();
        {
            let mut rev = d.revise();
            let mut root = rev.root_mut().unwrap();
            root.next().unwrap();
            let mut column = root.column_value_mut().unwrap();
            assert!(column.is_multiset());
            assert!(!column.is_sorted());
            column.update_type(AbstractClass::SortedSet).unwrap();
            assert!(column.is_sorted());
            assert!(!column.is_multiset());
            drop(column);

            root.update_type(AbstractClass::SortedMultiset).unwrap();
            assert!(matches!(
                root.update_type(AbstractClass::UnsortedMap),
                Err(DocError::InternalError(_))
            ));
        }
        assert_eq!(d.byte_len(), before);
        assert_eq!(text(&d), "[3, 1, 2]");
        let mut root = d.root().unwrap();
        assert!(root.is_sorted().unwrap());
        root.next().unwrap();
        assert_eq!(root.column_value().unwrap().class(), AbstractClass::SortedSet);

        let mut d = doc(r#"{"k": 1}"#);
        let mut rev = d.revise();
        let mut root = rev.root_mut().unwrap();
        root.next().unwrap();
        let mut object = root.object_value_mut().unwrap();
        object.update_type(AbstractClass::SortedMap).unwrap();
        assert!(object.is_sorted().unwrap());
        assert!(!object.is_multimap().unwrap());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Revisions and front-ends
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_not_implemented_setters() {
        let mut d = doc(r#"{"a": "x"}"#);
        let mut rev = d.revise();
        assert!(matches!(
            rev.set_string("a", "y"),
            Err(DocError::NotImplemented("set_string"))
        ));
        assert!(matches!(
            rev.set_array("a", &[]),
            Err(DocError::NotImplemented("set_array"))
        ));
        assert!(matches!(
            rev.set_object("a", &ColbinValue::Null),
            Err(DocError::NotImplemented("set_object"))
        ));
        assert_eq!(rev.end(), 0);
    }

    #[test]
    fn test_revision_counter() {
        let mut d = doc("[1, 2]");
        assert_eq!(d.revision(), 0);
        {
            let rev = d.revise();
            assert_eq!(rev.get("0").unwrap(), Some(ColbinValue::Number(Number::U8(1))));
        }
        assert_eq!(d.revision(), 0);

        d.revise().set_u8("0", 5).unwrap();
        assert_eq!(d.revision(), 1);

        let mut rev = d.revise();
        rev.set_null("1").unwrap();
        assert_eq!(rev.end(), 2);

        assert_eq!(
            d.revise().set_null("7").unwrap(),
            Resolved::Missing(PathStatus::NoSuchIndex)
        );
        assert_eq!(d.revision(), 2);
        assert_eq!(text(&d), "[5, null]");
    }

    #[test]
    fn test_failed_write_keeps_revision() {
        // element 1 carries an unknown marker; the path still resolves
        let mut d = Document {
            file: MemFile::from_vec(vec![MARKER_ARRAY, 2, MARKER_NULL, 0xFF]),
            revision: 0,
        };
        assert!(d.revise().set_u8("1", 5).is_err());
        assert_eq!(d.revision(), 0);
        assert!(d.revise().remove("1").is_err());
        assert_eq!(d.revision(), 0);

        let mut rev = d.revise();
        assert!(matches!(rev.resolve_mut("1").unwrap(), Resolved::Found(_)));
        assert_eq!(rev.end(), 1);
    }

    #[test]
    fn test_from_vec_validates_record() {
        let d = doc(FIXTURE);
        let copy = Document::from_vec(d.as_bytes().to_vec()).unwrap();
        assert_eq!(text(&copy), FIXTURE);

        let mut trailing = d.as_bytes().to_vec();
        trailing.push(MARKER_NULL);
        assert!(matches!(Document::from_vec(trailing), Err(DocError::InternalError(_))));

        let bytes = d.as_bytes();
        assert!(matches!(
            Document::from_vec(bytes[..bytes.len() - 1].to_vec()),
            Err(DocError::Corrupted { .. })
        ));
        assert!(matches!(
            Document::from_vec(vec![MARKER_NULL]),
            Err(DocError::TypeMismatch { .. })
        ));
        assert!(Document::from_vec(Vec::new()).is_err());
    }

    #[test]
    fn test_cbor_front_end() {
        use cbor4ii::core::Value;
        let value = Value::Map(vec![
            (Value::Text("id".into()), Value::Text("u1".into())),
            (
                Value::Text("scores".into()),
                Value::Array(vec![Value::Integer(1), Value::Integer(-2)]),
            ),
            (Value::Text("blob".into()), Value::Bytes(vec![1, 2, 3])),
        ]);
        let bytes = cbor4ii::serde::to_vec(Vec::new(), &value).unwrap();
        let d = Document::from_cbor_slice(&bytes).unwrap();
        assert_eq!(
            text(&d),
            r#"{"id": "u1", "scores": [1, -2], "blob": {"type": "application/octet-stream", "encoding": "base64", "binary-string": "AQID"}}"#
        );
        assert_eq!(d.get("scores.1").unwrap(), Some(ColbinValue::Number(Number::I8(-2))));
    }

    #[test]
    fn test_config_controls_encoding() {
        let spare = DocConfig {
            column_spare_slots: 4,
            ..DocConfig::default()
        };
        let d = Document::from_json_str_with("[1, 2]", &spare).unwrap();
        let mut root = d.root().unwrap();
        root.next().unwrap();
        assert_eq!(root.column_value().unwrap().capacity(), 6);
        assert_eq!(text(&d), "[1, 2]");

        let plain = DocConfig {
            columnize_arrays: false,
            ..DocConfig::default()
        };
        let d = Document::from_json_str_with("[1, 2]", &plain).unwrap();
        let mut root = d.root().unwrap();
        assert_eq!(root.len(), 2);
        root.next().unwrap();
        assert_eq!(root.field_type().unwrap(), FieldType::U8);

        let shallow = DocConfig {
            max_depth: 2,
            ..DocConfig::default()
        };
        assert!(matches!(
            Document::from_json_str_with("[[[1]]]", &shallow),
            Err(DocError::DepthLimit { max: 2 })
        ));
    }

    #[test]
    fn test_json_value_projection() {
        let d = doc(r#"{"a": [1, null], "b": 2.5}"#);
        assert_eq!(
            d.to_json_value().unwrap(),
            serde_json::json!({"a": [1, null], "b": 2.5})
        );
    }
}
