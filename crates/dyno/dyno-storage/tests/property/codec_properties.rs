//! Property tests for the attribute codec.

use std::collections::BTreeMap;

use dyno_core::{Number, Value};
use dyno_storage::codec::{decode, decode_item, encode, encode_item, wire_item_from_json};
use proptest::prelude::*;

fn arb_number() -> impl Strategy<Value = Number> {
    prop_oneof![
        any::<i64>().prop_map(Number::from),
        any::<u64>().prop_map(Number::from),
        (any::<i32>(), 0u32..6).prop_map(|(whole, frac)| {
            Number::parse(&format!("{whole}.{frac:0>3}")).unwrap()
        }),
        (1i64..1000, -40i32..40).prop_map(|(m, e)| Number::parse(&format!("{m}e{e}")).unwrap()),
    ]
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        arb_number().prop_map(Value::Number),
        ".{0,12}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Map),
        ]
    })
}

proptest! {
    #[test]
    fn decode_inverts_encode(value in arb_value()) {
        prop_assert_eq!(decode(&encode(&value)), value);
    }

    #[test]
    fn item_survives_wire_json(item in prop::collection::btree_map("[a-zA-Z_]{1,8}", arb_value(), 0..6)) {
        let json = serde_json::to_value(encode_item(&item)).unwrap();
        let wire = wire_item_from_json(&json).unwrap();
        prop_assert_eq!(decode_item(&wire), item);
    }

    #[test]
    fn unknown_tags_never_panic(tag in "[A-Z]{1,4}", payload in ".{0,8}") {
        let json = serde_json::json!({ "attr": { (tag.clone()): payload } });
        let wire = wire_item_from_json(&json).unwrap();
        let item = decode_item(&wire);
        prop_assert_eq!(item.len(), 1);
        if !matches!(tag.as_str(), "S" | "N" | "B") {
            prop_assert_eq!(&item["attr"], &Value::Null);
        }
    }
}

#[test]
fn empty_item_round_trips() {
    let item: BTreeMap<String, Value> = BTreeMap::new();
    assert_eq!(decode_item(&encode_item(&item)), item);
}
