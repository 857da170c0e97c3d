//! Minimal XML-RPC wire handling for the mock directory.
//!
//! Defined independently of `syndic8-core`'s codec so the integration tests
//! catch drift between what the client sends and what a server understands.

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Int(i64),
    Bool(bool),
    Str(String),
    Double(f64),
    Array(Vec<RpcValue>),
    Struct(BTreeMap<String, RpcValue>),
    Nil,
}

impl RpcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, or strings holding one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RpcValue::Int(i) => Some(*i),
            RpcValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RpcValue::Bool(b) => Some(*b),
            RpcValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Array of strings; `Nil` reads as `None`.
    pub fn as_strings(&self) -> Option<Vec<String>> {
        match self {
            RpcValue::Array(items) => items.iter().map(|i| i.as_str().map(str::to_string)).collect(),
            _ => None,
        }
    }

    pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, RpcValue)>) -> Self {
        RpcValue::Struct(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for RpcValue {
    fn from(s: &str) -> Self {
        RpcValue::Str(s.to_string())
    }
}

impl From<String> for RpcValue {
    fn from(s: String) -> Self {
        RpcValue::Str(s)
    }
}

impl From<i64> for RpcValue {
    fn from(i: i64) -> Self {
        RpcValue::Int(i)
    }
}

impl From<bool> for RpcValue {
    fn from(b: bool) -> Self {
        RpcValue::Bool(b)
    }
}

impl<T: Into<RpcValue>> From<Vec<T>> for RpcValue {
    fn from(items: Vec<T>) -> Self {
        RpcValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Parse a `methodCall` body into `(method, params)`.
pub fn parse_call(body: &str) -> Result<(String, Vec<RpcValue>), String> {
    let doc = Document::parse(body).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if !root.has_tag_name("methodCall") {
        return Err(format!("expected methodCall, got {}", root.tag_name().name()));
    }
    let method = child(root, "methodName")
        .and_then(|n| n.text())
        .ok_or("missing methodName")?
        .trim()
        .to_string();
    let params = match child(root, "params") {
        Some(params) => params
            .children()
            .filter(|n| n.has_tag_name("param"))
            .map(|p| child(p, "value").ok_or_else(|| "param without value".to_string()).and_then(parse_value))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok((method, params))
}

fn parse_value(node: Node<'_, '_>) -> Result<RpcValue, String> {
    let Some(typed) = node.children().find(|n| n.is_element()) else {
        return Ok(RpcValue::Str(node.text().unwrap_or_default().to_string()));
    };
    let text = typed.text().unwrap_or_default();
    match typed.tag_name().name() {
        "int" | "i4" | "i8" => text.trim().parse().map(RpcValue::Int).map_err(|_| format!("bad int {text:?}")),
        "boolean" => Ok(RpcValue::Bool(text.trim() == "1")),
        "string" => Ok(RpcValue::Str(text.to_string())),
        "double" => text.trim().parse().map(RpcValue::Double).map_err(|_| format!("bad double {text:?}")),
        "dateTime.iso8601" | "base64" => Ok(RpcValue::Str(text.trim().to_string())),
        "nil" => Ok(RpcValue::Nil),
        "array" => child(typed, "data")
            .map(|data| {
                data.children()
                    .filter(|n| n.has_tag_name("value"))
                    .map(parse_value)
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(RpcValue::Array),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children().filter(|n| n.has_tag_name("member")) {
                let name = child(member, "name").and_then(|n| n.text()).unwrap_or_default();
                let value = child(member, "value").ok_or("member without value")?;
                members.insert(name.to_string(), parse_value(value)?);
            }
            Ok(RpcValue::Struct(members))
        }
        other => Err(format!("unsupported type {other}")),
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

pub fn render_response(value: &RpcValue) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse>\n<params>\n<param>\n");
    render_value(&mut out, value);
    out.push_str("\n</param>\n</params>\n</methodResponse>\n");
    out
}

pub fn render_fault(code: i64, message: &str) -> String {
    let fault = RpcValue::record([("faultCode", RpcValue::Int(code)), ("faultString", message.into())]);
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse>\n<fault>\n");
    render_value(&mut out, &fault);
    out.push_str("\n</fault>\n</methodResponse>\n");
    out
}

fn render_value(out: &mut String, value: &RpcValue) {
    out.push_str("<value>");
    match value {
        RpcValue::Int(i) => out.push_str(&format!("<int>{i}</int>")),
        RpcValue::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        RpcValue::Str(s) => out.push_str(&format!("<string>{}</string>", escape(s))),
        RpcValue::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        RpcValue::Nil => out.push_str("<nil/>"),
        RpcValue::Array(items) => {
            out.push_str("<array><data>\n");
            for item in items {
                render_value(out, item);
                out.push('\n');
            }
            out.push_str("</data></array>");
        }
        RpcValue::Struct(members) => {
            out.push_str("<struct>\n");
            for (name, member) in members {
                out.push_str(&format!("<member><name>{}</name>", escape(name)));
                render_value(out, member);
                out.push_str("</member>\n");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
