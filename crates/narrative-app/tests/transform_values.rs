//! Parameter value transform tests for narrative-app.
// crates/narrative-app/tests/transform_values.rs
// =============================================================================
// Module: Transform Tests
// Description: Coercions, list transforms, refs, and unsupported types.
// Purpose: Ensure values reach services in the shapes they expect.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use common::MOCK_WS_ID;
use common::MockWorkspace;
use narrative_app::AppError;
use narrative_app::ProcessedParam;
use narrative_app::transform_param_value;
use serde_json::Value;
use serde_json::json;

fn transform(transform_type: &str, value: &Value) -> Result<Value, AppError> {
    transform_param_value(Some(transform_type), value, None, MOCK_WS_ID, &MockWorkspace::default())
}

#[test]
fn simple_cases() {
    let cases = [
        ("string", Value::Null, Value::Null),
        ("string", json!("foo"), json!("foo")),
        ("string", json!(123), json!("123")),
        ("string", json!(["a", "b", "c"]), json!("a,b,c")),
        ("string", json!({"a": "b", "c": "d"}), json!("a=b,c=d")),
        ("string", json!([]), json!("")),
        ("string", json!({}), json!("")),
        ("string", json!(true), json!("True")),
        ("string", json!([false, null, 2.5]), json!("False,None,2.5")),
        ("string", json!([[1, 2], ["x", "it's"]]), json!("[1, 2],['x', \"it's\"]")),
        ("string", json!({"k": {"a": true}}), json!("k={'a': True}")),
        ("int", json!("1"), json!(1)),
        ("int", Value::Null, Value::Null),
        ("int", json!(""), Value::Null),
        ("list<string>", json!([1, 2, 3]), json!(["1", "2", "3"])),
        ("list<int>", json!(["1", "2", "3"]), json!([1, 2, 3])),
        ("list<string>", json!("asdf"), json!(["asdf"])),
        ("list<int>", json!("1"), json!([1])),
        ("list<int>", Value::Null, Value::Null),
        ("float", json!("2.5"), json!(2.5)),
        ("float", json!(3), json!(3.0)),
        ("float", json!(" "), Value::Null),
        ("none", json!({"x": 1}), json!({"x": 1})),
        ("object", json!([1]), json!([1])),
    ];
    for (transform_type, value, expected) in cases {
        let actual = transform(transform_type, &value).expect("transform");
        assert_eq!(actual, expected, "{transform_type} of {value}");
    }
}

#[test]
fn unsupported_type_is_value_error() {
    let err = transform("foobar", &json!("foo")).expect_err("unsupported");
    assert!(matches!(err, AppError::Value(_)));
    assert_eq!(err.to_string(), "Unsupported Transformation type: foobar");
}

#[test]
fn unsupported_inner_list_type_is_value_error() {
    let err = transform("list<foobar>", &json!(["foo"])).expect_err("unsupported");
    assert_eq!(err.to_string(), "Unsupported Transformation type: foobar");
}

#[test]
fn bad_numbers_are_value_errors() {
    for (transform_type, value) in [("int", json!("one")), ("int", json!(1.5)), ("float", json!("x"))] {
        let err = transform(transform_type, &value).expect_err("bad number");
        assert!(matches!(err, AppError::Value(_)));
    }
}

#[test]
fn textsubdata_without_transform_is_string() {
    let param = ProcessedParam {
        param_type: "textsubdata".to_string(),
        ..ProcessedParam::default()
    };
    let ws = MockWorkspace::default();
    let cases = [
        (Value::Null, Value::Null),
        (json!("asdf"), json!("asdf")),
        (json!(123), json!("123")),
        (json!(["1", "2", "3"]), json!("1,2,3")),
        (json!({"a": "b", "c": "d"}), json!("a=b,c=d")),
    ];
    for (value, expected) in cases {
        let actual =
            transform_param_value(None, &value, Some(&param), MOCK_WS_ID, &ws).expect("transform");
        assert_eq!(actual, expected);
    }
}

#[test]
fn no_transform_passes_through() {
    let ws = MockWorkspace::default();
    let value = json!({"keep": ["as", "is"]});
    let actual = transform_param_value(None, &value, None, MOCK_WS_ID, &ws).expect("transform");
    assert_eq!(actual, value);
}

#[test]
fn ref_transform_qualifies_without_lookup() {
    let ws = MockWorkspace::default();
    let qualified = transform_param_value(Some("ref"), &json!("foo"), None, MOCK_WS_ID, &ws)
        .expect("transform");
    assert_eq!(qualified, json!("1000/foo"));
    let kept = transform_param_value(Some("unresolved-ref"), &json!("1/foo"), None, MOCK_WS_ID, &ws)
        .expect("transform");
    assert_eq!(kept, json!("1/foo"));
    assert!(ws.lookups().is_empty());
}

#[test]
fn resolved_ref_transform_uses_workspace() {
    let ws = MockWorkspace::default();
    let resolved = transform_param_value(Some("resolved-ref"), &json!("foo"), None, MOCK_WS_ID, &ws)
        .expect("transform");
    assert_eq!(resolved, json!("1000/2/3"));
    let listed =
        transform_param_value(Some("list<upa>"), &json!(["foo", "bar"]), None, MOCK_WS_ID, &ws)
            .expect("transform");
    assert_eq!(listed, json!(["1000/2/3", "1000/3/4"]));
}

#[test]
fn resolved_ref_transform_propagates_missing_objects() {
    let ws = MockWorkspace::default();
    let err = transform_param_value(Some("resolved-ref"), &json!("nope"), None, MOCK_WS_ID, &ws)
        .expect_err("missing");
    assert!(err.is_server_error());
}
