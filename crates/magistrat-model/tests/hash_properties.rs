use magistrat_model::{ContentHash, PatchChange, ReconcileSignature};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn half_points(range: std::ops::Range<u32>) -> impl Strategy<Value = f64> {
    range.prop_map(|n| f64::from(n) / 2.0)
}

fn signature_strategy() -> impl Strategy<Value = ReconcileSignature> {
    (
        proptest::option::of("[A-Za-z ]{1,12}"),
        proptest::option::of(half_points(16..144)),
        proptest::option::of("#[0-9A-F]{6}"),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(half_points(0..144)),
        proptest::option::of(half_points(0..144)),
    )
        .prop_map(
            |(font_family, font_size_pt, font_color, bold, italic, bullet_indent, bullet_hanging)| {
                ReconcileSignature {
                    font_family,
                    font_size_pt,
                    font_color,
                    bold,
                    italic,
                    bullet_indent,
                    bullet_hanging,
                }
            },
        )
}

proptest! {
    #[test]
    fn prop_object_key_order_never_changes_hash(
        entries in proptest::collection::btree_map("[a-z]{1,6}", 0i64..1000, 0..12)
    ) {
        let forward: Map<String, Value> =
            entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let mut reversed = Map::new();
        for (k, v) in entries.iter().rev() {
            reversed.insert(k.clone(), json!(v));
        }
        prop_assert_eq!(
            ContentHash::of_json(&Value::Object(forward)),
            ContentHash::of_json(&Value::Object(reversed))
        );
    }

    #[test]
    fn prop_signature_hash_is_stable_across_serde(signature in signature_strategy()) {
        let encoded = serde_json::to_string(&signature).unwrap();
        let decoded: ReconcileSignature = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(signature.stable_hash(), decoded.stable_hash());
    }

    #[test]
    fn prop_hex_display_parses_back(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let hash = ContentHash::compute(&data);
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }
}

#[test]
fn signature_json_always_has_seven_keys() {
    let signature = ReconcileSignature {
        font_family: Some("Aptos".to_string()),
        ..ReconcileSignature::default()
    };
    let value = serde_json::to_value(&signature).unwrap();
    assert_eq!(value.as_object().map(Map::len), Some(7));
    assert_eq!(value["fontSizePt"], Value::Null);
}

#[test]
fn font_style_omits_unset_flags() {
    let change = PatchChange::SetFontStyle {
        bold: Some(true),
        italic: None,
    };
    assert_eq!(
        serde_json::to_value(&change).unwrap(),
        json!({"op": "SET_FONT_STYLE", "fields": {"bold": true}})
    );
}
