//! Just enough XML-RPC to talk to a koji hub.

use crate::Error;
use std::collections::BTreeMap;
use std::fmt::Write;

/// An XML-RPC value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            // hubs occasionally return numbers as strings, e.g. epochs
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            let _ = write!(out, "<int>{i}</int>");
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{d}</double>");
        }
        Value::Boolean(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", if *b { 1 } else { 0 });
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s));
        }
        Value::Array(values) => {
            out.push_str("<array><data>");
            for value in values {
                write_value(out, value);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, value) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name));
                write_value(out, value);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Serialize a method call.
pub fn request(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn value_from_node(node: roxmltree::Node) -> Result<Value, Error> {
    let Some(inner) = node.children().find(|n| n.is_element()) else {
        // a bare <value>text</value> is a string
        return Ok(Value::String(node.text().unwrap_or_default().to_string()));
    };

    let text = || inner.text().unwrap_or_default().to_string();

    match inner.tag_name().name() {
        "i4" | "i8" | "int" => text()
            .parse()
            .map(Value::Int)
            .map_err(|_| Error::Decode("bad integer".into())),
        "double" => text()
            .parse()
            .map(Value::Double)
            .map_err(|_| Error::Decode("bad double".into())),
        "boolean" => Ok(Value::Boolean(text() == "1")),
        "string" => Ok(Value::String(text())),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = inner
                .children()
                .find(|n| n.has_tag_name("data"))
                .ok_or_else(|| Error::Decode("array without data".into()))?;
            data.children()
                .filter(|n| n.has_tag_name("value"))
                .map(value_from_node)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in inner.children().filter(|n| n.has_tag_name("member")) {
                let name = member
                    .children()
                    .find(|n| n.has_tag_name("name"))
                    .and_then(|n| n.text())
                    .ok_or_else(|| Error::Decode("member without name".into()))?;
                let value = member
                    .children()
                    .find(|n| n.has_tag_name("value"))
                    .ok_or_else(|| Error::Decode("member without value".into()))?;
                members.insert(name.to_string(), value_from_node(value)?);
            }
            Ok(Value::Struct(members))
        }
        // dateTime.iso8601 and base64 are not produced by the calls we make
        other => Err(Error::Decode(format!("unsupported value type {other}"))),
    }
}

/// Parse a method response, turning faults into errors.
pub fn parse_response(xml: &str) -> Result<Value, Error> {
    let doc = roxmltree::Document::parse(xml).map_err(|err| Error::Decode(err.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("methodResponse") {
        return Err(Error::Decode("not a methodResponse".into()));
    }

    if let Some(fault) = root.children().find(|n| n.has_tag_name("fault")) {
        let value = fault
            .children()
            .find(|n| n.has_tag_name("value"))
            .map(value_from_node)
            .transpose()?
            .unwrap_or(Value::Nil);
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(Error::Fault { code, message });
    }

    let value = root
        .children()
        .find(|n| n.has_tag_name("params"))
        .and_then(|params| params.children().find(|n| n.has_tag_name("param")))
        .and_then(|param| param.children().find(|n| n.has_tag_name("value")))
        .ok_or_else(|| Error::Decode("response without value".into()))?;

    value_from_node(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_encoding() {
        let mut opts = BTreeMap::new();
        opts.insert("__starstar".to_string(), Value::Boolean(true));
        opts.insert("packageID".to_string(), Value::Int(42));

        let body = request("listBuilds", &[Value::Struct(opts)]);
        assert!(body.starts_with("<?xml version=\"1.0\"?><methodCall>"));
        assert!(body.contains("<methodName>listBuilds</methodName>"));
        assert!(body.contains("<name>packageID</name><value><int>42</int></value>"));
        assert!(body.contains("<boolean>1</boolean>"));
    }

    #[test]
    fn response_round_trip() {
        let xml = r#"<?xml version="1.0"?>
            <methodResponse><params><param><value><array><data>
                <value><struct>
                    <member><name>build_id</name><value><int>10</int></value></member>
                    <member><name>package_name</name><value><string>cmake</string></value></member>
                    <member><name>epoch</name><value><nil/></value></member>
                </struct></value>
            </data></array></value></param></params></methodResponse>"#;

        let value = parse_response(xml).expect("should parse");
        let builds = value.as_array().expect("array");
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].get("build_id").and_then(Value::as_i64), Some(10));
        assert_eq!(
            builds[0].get("package_name").and_then(Value::as_str),
            Some("cmake")
        );
        assert_eq!(builds[0].get("epoch"), Some(&Value::Nil));
    }

    #[test]
    fn fault_becomes_error() {
        let xml = r#"<?xml version="1.0"?>
            <methodResponse><fault><value><struct>
                <member><name>faultCode</name><value><int>1000</int></value></member>
                <member><name>faultString</name><value><string>invalid method</string></value></member>
            </struct></value></fault></methodResponse>"#;

        match parse_response(xml) {
            Err(Error::Fault { code, message }) => {
                assert_eq!(code, 1000);
                assert_eq!(message, "invalid method");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn bare_value_is_a_string() {
        let xml = r#"<methodResponse><params><param><value>cmake</value></param></params></methodResponse>"#;
        let value = parse_response(xml).expect("should parse");
        assert_eq!(value.as_str(), Some("cmake"));
    }
}
