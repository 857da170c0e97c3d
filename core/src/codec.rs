//! XML-RPC request encoding and response decoding.
//!
//! # Design
//! Requests are rendered as compact `methodCall` documents with no
//! insignificant whitespace, so the body for a given call is byte-stable and
//! can be compared against test vectors. Responses are parsed with
//! `roxmltree`, which resolves entities and tolerates the whitespace and
//! untyped `<value>` text that real servers emit.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::Engine as _;
use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::ApiError;
use crate::value::Value;

/// Render a `methodCall` document for `method` with positional `args`.
pub fn encode_call(method: &str, args: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName><params>");
    for arg in args {
        out.push_str("<param>");
        encode_value(&mut out, arg);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Render a successful `methodResponse` carrying `value`.
#[cfg(test)]
pub(crate) fn encode_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><params><param>");
    encode_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Render a fault `methodResponse`.
#[cfg(test)]
pub(crate) fn encode_fault(code: i64, message: &str) -> String {
    let mut members = BTreeMap::new();
    members.insert("faultCode".to_string(), Value::Int(code));
    members.insert("faultString".to_string(), Value::from(message));
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><fault>");
    encode_value(&mut out, &Value::Struct(members));
    out.push_str("</fault></methodResponse>");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            // `<int>` is 32-bit on the wire; wider values use the common `<i8>` extension.
            let tag = if i32::try_from(*i).is_ok() { "int" } else { "i8" };
            let _ = write!(out, "<{tag}>{i}</{tag}>");
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{d}</double>");
        }
        Value::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            escape_into(out, s);
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            // A raw CR would be folded into LF by the receiving parser.
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

/// Parse a `methodResponse` document.
///
/// A `<fault>` becomes `ApiError::RemoteFault` with the code and message
/// copied verbatim. A response with an empty `<params>` decodes to `Nil`.
pub fn decode_response(body: &str) -> Result<Value, ApiError> {
    let doc = Document::parse(body).map_err(|e| malformed(&e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "methodResponse" {
        return Err(malformed(&format!("unexpected root element <{}>", root.tag_name().name())));
    }

    let body = first_element(root).ok_or_else(|| malformed("empty methodResponse"))?;
    match body.tag_name().name() {
        "params" => match first_element(body) {
            Some(param) => {
                let value = child_named(param, "value").ok_or_else(|| malformed("<param> without <value>"))?;
                decode_value(value)
            }
            None => Ok(Value::Nil),
        },
        "fault" => {
            let value = child_named(body, "value").ok_or_else(|| malformed("<fault> without <value>"))?;
            Err(fault_from(decode_value(value)?))
        }
        other => Err(malformed(&format!("unexpected element <{other}>"))),
    }
}

/// Parse a `methodCall` document into its method name and arguments.
#[cfg(test)]
pub(crate) fn decode_call(body: &str) -> Result<(String, Vec<Value>), ApiError> {
    let doc = Document::parse(body).map_err(|e| malformed(&e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "methodCall" {
        return Err(malformed(&format!("unexpected root element <{}>", root.tag_name().name())));
    }
    let method = child_named(root, "methodName")
        .and_then(|n| n.text())
        .map(|name| name.trim().to_string())
        .ok_or_else(|| malformed("methodCall without <methodName>"))?;

    let mut args = Vec::new();
    if let Some(params) = child_named(root, "params") {
        for param in params.children().filter(|n| n.has_tag_name("param")) {
            let value = child_named(param, "value").ok_or_else(|| malformed("<param> without <value>"))?;
            args.push(decode_value(value)?);
        }
    }
    Ok((method, args))
}

fn fault_from(value: Value) -> ApiError {
    let code = match value.get("faultCode").map(Value::coerce_int) {
        Some(Ok(code)) => code,
        other => {
            debug!(fault_code = ?other, "fault without an integer faultCode, reporting code 0");
            0
        }
    };
    let message = value
        .get("faultString")
        .map(Value::to_string)
        .unwrap_or_default();
    ApiError::RemoteFault { code, message }
}

/// Decode a `<value>` element.
fn decode_value(node: Node<'_, '_>) -> Result<Value, ApiError> {
    let Some(typed) = first_element(node) else {
        // Untyped values are strings.
        return Ok(Value::String(node.text().unwrap_or_default().to_string()));
    };

    let text = typed.text().unwrap_or_default();
    match typed.tag_name().name() {
        "int" | "i4" | "i8" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| malformed(&format!("bad integer {text:?}"))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(malformed(&format!("bad boolean {other:?}"))),
        },
        "string" => Ok(Value::String(text.to_string())),
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| malformed(&format!("bad double {text:?}"))),
        "dateTime.iso8601" => Ok(Value::DateTime(text.trim().to_string())),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| malformed(&format!("bad base64: {e}")))
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children().filter(|n| n.has_tag_name("member")) {
                let name = child_named(member, "name").ok_or_else(|| malformed("<member> without <name>"))?;
                let value = child_named(member, "value").ok_or_else(|| malformed("<member> without <value>"))?;
                members.insert(name.text().unwrap_or_default().to_string(), decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        "array" => {
            let Some(data) = child_named(typed, "data") else {
                return Ok(Value::Array(Vec::new()));
            };
            data.children()
                .filter(|n| n.has_tag_name("value"))
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "nil" => Ok(Value::Nil),
        other => Err(malformed(&format!("unknown value type <{other}>"))),
    }
}

fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element())
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn malformed(detail: &str) -> ApiError {
    ApiError::Transport(format!("malformed response: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_call_with_scalars() {
        let xml = encode_call("syndic8.FindFeeds", &["cooking".into(), "sitename".into(), Value::Int(-1)]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?><methodCall><methodName>syndic8.FindFeeds</methodName><params>\
             <param><value><string>cooking</string></value></param>\
             <param><value><string>sitename</string></value></param>\
             <param><value><int>-1</int></value></param>\
             </params></methodCall>"
        );
    }

    #[test]
    fn encode_escapes_markup() {
        let xml = encode_call("m", &["a<b & c>".into(), "a\r\nb".into()]);
        assert!(xml.contains("<string>a&lt;b &amp; c&gt;</string>"));
        assert!(xml.contains("<string>a&#13;\nb</string>"));
        let (_, args) = decode_call(&xml).unwrap();
        assert_eq!(args[1], Value::from("a\r\nb"));
    }

    #[test]
    fn encode_wide_ints_as_i8() {
        let xml = encode_call("m", &[Value::Int(5_000_000_000)]);
        assert!(xml.contains("<i8>5000000000</i8>"));
    }

    #[test]
    fn encode_nested_values() {
        let mut members = BTreeMap::new();
        members.insert("name".to_string(), Value::from("Dumb_Sites"));
        members.insert("public".to_string(), Value::Bool(false));
        let xml = encode_call("m", &[Value::Struct(members), Value::from(vec!["a", "b"]), Value::Nil]);
        assert!(xml.contains(
            "<struct><member><name>name</name><value><string>Dumb_Sites</string></value></member>\
             <member><name>public</name><value><boolean>0</boolean></value></member></struct>"
        ));
        assert!(xml.contains(
            "<array><data><value><string>a</string></value><value><string>b</string></value></data></array>"
        ));
        assert!(xml.contains("<value><nil/></value>"));
    }

    #[test]
    fn decode_untyped_value_is_string() {
        let body = "<?xml version=\"1.0\"?>\n<methodResponse>\n <params>\n  <param><value>1234</value></param>\n </params>\n</methodResponse>";
        assert_eq!(decode_response(body).unwrap(), Value::from("1234"));
    }

    #[test]
    fn decode_struct_array_and_entities() {
        let body = r#"<methodResponse><params><param><value><array><data>
            <value><struct>
              <member><name>sitename</name><value><string>Ben &amp; Jerry</string></value></member>
              <member><name>feedid</name><value><i4>12</i4></value></member>
            </struct></value>
            <value><boolean>1</boolean></value>
            <value><double>1.5</double></value>
            <value><base64>aGVs
            bG8=</base64></value>
        </data></array></value></param></params></methodResponse>"#;
        let value = decode_response(body).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].get("sitename"), Some(&Value::from("Ben & Jerry")));
        assert_eq!(items[0].get("feedid"), Some(&Value::Int(12)));
        assert_eq!(items[1], Value::Bool(true));
        assert_eq!(items[2], Value::Double(1.5));
        assert_eq!(items[3], Value::Base64(b"hello".to_vec()));
    }

    #[test]
    fn decode_fault_keeps_code_and_message() {
        let body = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>4</int></value></member>
            <member><name>faultString</name><value><string>Too many parameters</string></value></member>
        </struct></value></fault></methodResponse>"#;
        let err = decode_response(body).unwrap_err();
        assert_eq!(
            err,
            ApiError::RemoteFault {
                code: 4,
                message: "Too many parameters".to_string()
            }
        );
    }

    #[test]
    fn decode_fault_without_integer_code_reports_zero() {
        let body = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><string>oops</string></value></member>
            <member><name>faultString</name><value><string>Server on fire</string></value></member>
        </struct></value></fault></methodResponse>"#;
        assert_eq!(
            decode_response(body).unwrap_err(),
            ApiError::RemoteFault {
                code: 0,
                message: "Server on fire".to_string()
            }
        );

        let body = "<methodResponse><fault><value><struct>\
            <member><name>faultString</name><value>no code at all</value></member>\
            </struct></value></fault></methodResponse>";
        assert!(matches!(
            decode_response(body),
            Err(ApiError::RemoteFault { code: 0, ref message }) if message == "no code at all"
        ));
    }

    #[test]
    fn decode_empty_params_is_nil() {
        let body = "<methodResponse><params></params></methodResponse>";
        assert_eq!(decode_response(body).unwrap(), Value::Nil);
    }

    #[test]
    fn call_and_response_documents_decode_back() {
        let (method, args) = decode_call(&encode_call("syndic8.GetFeedInfo", &[Value::from(vec![1, 2]), Value::Nil])).unwrap();
        assert_eq!(method, "syndic8.GetFeedInfo");
        assert_eq!(args, vec![Value::from(vec![1, 2]), Value::Nil]);

        let err = decode_response(&encode_fault(100, "Invalid login")).unwrap_err();
        assert_eq!(err.to_string(), "XML-RPC: 100: Invalid login");
        assert_eq!(decode_response(&encode_response(&Value::from("ok"))).unwrap(), Value::from("ok"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_response("not xml"), Err(ApiError::Transport(_))));
        assert!(matches!(
            decode_response("<html><body>503</body></html>"),
            Err(ApiError::Transport(_))
        ));
        assert!(matches!(
            decode_response("<methodResponse><params><param><value><int>x</int></value></param></params></methodResponse>"),
            Err(ApiError::Transport(_))
        ));
    }
}
