//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! `calls.json` pins the exact `methodCall` body for a set of calls, since
//! the encoder output is byte-stable. `responses.json` pairs raw
//! `methodResponse` bodies with their decoded result, compared as JSON so the
//! vectors stay readable.

use std::collections::BTreeMap;

use syndic8_core::{ApiError, DirectoryClient, HttpResponse, Value};

fn client() -> DirectoryClient {
    DirectoryClient::anonymous().unwrap()
}

/// Vector arguments are plain JSON: integers, strings, booleans, null,
/// arrays and objects map onto the matching XML-RPC types.
fn to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Double(n.as_f64().unwrap()),
        },
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(to_value).collect()),
        serde_json::Value::Object(members) => Value::Struct(
            members
                .iter()
                .map(|(k, v)| (k.clone(), to_value(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[test]
fn call_test_vectors() {
    let raw = include_str!("../../test-vectors/calls.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let method = case["method"].as_str().unwrap();
        let args: Vec<Value> = case["args"].as_array().unwrap().iter().map(to_value).collect();

        let req = c.build_call(method, &args);
        assert_eq!(req.url, "http://www.syndic8.com:80/xmlrpc.php", "{name}: url");
        assert!(
            req.headers.contains(&("content-type".to_string(), "text/xml".to_string())),
            "{name}: content-type"
        );
        assert_eq!(req.body, case["expected_body"].as_str().unwrap(), "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = c.parse_response(HttpResponse::ok(case["body"].as_str().unwrap()));

        if let Some(fault) = case.get("expected_fault") {
            let err = result.unwrap_err();
            assert_eq!(
                err,
                ApiError::RemoteFault {
                    code: fault["code"].as_i64().unwrap(),
                    message: fault["message"].as_str().unwrap().to_string(),
                },
                "{name}: fault"
            );
        } else {
            let value = result.unwrap();
            assert_eq!(value.to_json(), case["expected_result"], "{name}: decoded result");
        }
    }
}

#[test]
fn non_200_status_is_a_transport_error() {
    let response = HttpResponse {
        status: 500,
        headers: Vec::new(),
        body: "Internal Server Error".to_string(),
    };
    let err = client().parse_response(response).unwrap_err();
    assert_eq!(err, ApiError::Transport("HTTP 500: Internal Server Error".to_string()));
}
