//! XML-RPC wire codec
//!
//! Just enough of the XML-RPC protocol to talk to Odoo's `/xmlrpc/2/*`
//! endpoints: method call encoding, response decoding, and faults.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{BackendError, BackendResult};

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Convert to JSON for handing records to the summarizer and the UI
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Struct(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Nil => serde_json::Value::Null,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) if i32::try_from(*i).is_ok() => {
                out.push_str(&format!("<int>{}</int>", i));
            }
            Value::Int(i) => out.push_str(&format!("<i8>{}</i8>", i)),
            Value::Bool(b) => {
                out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" })
            }
            Value::String(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Double(f) => out.push_str(&format!("<double>{}</double>", f)),
            Value::DateTime(s) => {
                out.push_str("<dateTime.iso8601>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</dateTime.iso8601>");
            }
            Value::Base64(s) => {
                out.push_str("<base64>");
                out.push_str(s);
                out.push_str("</base64>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

/// Encode a `<methodCall>` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        param.write_xml(&mut xml);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    xml
}

/// Decode a `<methodResponse>` document. Faults become `BackendError::Fault`.
pub fn parse_response(xml: &str) -> BackendResult<Value> {
    let mut parser = Parser::new(xml);
    parser.expect_open("methodResponse")?;
    match parser.next_tag()? {
        Tag::Open(name) if name == "params" => {
            parser.expect_open("param")?;
            parser.expect_open("value")?;
            parser.value_body()
        }
        Tag::Empty(name) if name == "params" => Ok(Value::Nil),
        Tag::Open(name) if name == "fault" => {
            parser.expect_open("value")?;
            let fault = parser.value_body()?;
            Err(fault_error(&fault))
        }
        other => Err(unexpected(&other, "<params> or <fault>")),
    }
}

fn fault_error(fault: &Value) -> BackendError {
    let code = fault.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
    let message = fault
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown fault")
        .to_string();
    BackendError::Fault { code, message }
}

#[derive(Debug)]
enum Tag {
    Open(String),
    Empty(String),
    Close(String),
    Eof,
}

fn unexpected(tag: &Tag, wanted: &str) -> BackendError {
    let found = match tag {
        Tag::Open(n) => format!("<{}>", n),
        Tag::Empty(n) => format!("<{}/>", n),
        Tag::Close(n) => format!("</{}>", n),
        Tag::Eof => "end of document".to_string(),
    };
    BackendError::Protocol(format!("expected {}, found {}", wanted, found))
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
        }
    }

    /// Next element boundary, skipping prolog noise and inter-element whitespace
    fn next_tag(&mut self) -> BackendResult<Tag> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => return Ok(Tag::Open(tag_name(e.name().as_ref()))),
                Event::Empty(e) => return Ok(Tag::Empty(tag_name(e.name().as_ref()))),
                Event::End(e) => return Ok(Tag::Close(tag_name(e.name().as_ref()))),
                Event::Eof => return Ok(Tag::Eof),
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if !text.trim().is_empty() {
                        return Err(BackendError::Protocol(format!(
                            "unexpected text '{}'",
                            text.trim()
                        )));
                    }
                }
                _ => {}
            }
        }
    }

    fn expect_open(&mut self, name: &str) -> BackendResult<()> {
        match self.next_tag()? {
            Tag::Open(n) if n == name => Ok(()),
            other => Err(unexpected(&other, &format!("<{}>", name))),
        }
    }

    fn expect_close(&mut self, name: &str) -> BackendResult<()> {
        match self.next_tag()? {
            Tag::Close(n) if n == name => Ok(()),
            other => Err(unexpected(&other, &format!("</{}>", name))),
        }
    }

    /// Character content up to `</name>`
    fn text_until(&mut self, name: &str) -> BackendResult<String> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(e) if e.name().as_ref() == name.as_bytes() => return Ok(text),
                Event::Eof => {
                    return Err(BackendError::Protocol(format!(
                        "document ended inside <{}>",
                        name
                    )))
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected <{}> inside <{}>",
                        tag_name(e.name().as_ref()),
                        name
                    )))
                }
                Event::End(e) => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected </{}> inside <{}>",
                        tag_name(e.name().as_ref()),
                        name
                    )))
                }
                _ => {}
            }
        }
    }

    /// Contents of a `<value>` whose start tag was already consumed.
    /// Untyped content is a string.
    fn value_body(&mut self) -> BackendResult<Value> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(e) => {
                    if !text.trim().is_empty() {
                        return Err(BackendError::Protocol(
                            "mixed text and markup in <value>".to_string(),
                        ));
                    }
                    let name = tag_name(e.name().as_ref());
                    let value = self.typed_value(&name)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                Event::Empty(e) => {
                    let value = empty_typed_value(&tag_name(e.name().as_ref()))?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                Event::End(e) if e.name().as_ref() == b"value" => return Ok(Value::String(text)),
                Event::End(e) => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected </{}> inside <value>",
                        tag_name(e.name().as_ref())
                    )))
                }
                Event::Eof => {
                    return Err(BackendError::Protocol(
                        "document ended inside <value>".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }

    fn typed_value(&mut self, name: &str) -> BackendResult<Value> {
        let value = match name {
            "int" | "i4" | "i8" => {
                let text = self.text_until(name)?;
                Value::Int(text.trim().parse().map_err(|_| {
                    BackendError::Protocol(format!("invalid integer '{}'", text.trim()))
                })?)
            }
            "boolean" => match self.text_until(name)?.trim() {
                "1" => Value::Bool(true),
                "0" => Value::Bool(false),
                other => {
                    return Err(BackendError::Protocol(format!(
                        "invalid boolean '{}'",
                        other
                    )))
                }
            },
            "double" => {
                let text = self.text_until(name)?;
                Value::Double(text.trim().parse().map_err(|_| {
                    BackendError::Protocol(format!("invalid double '{}'", text.trim()))
                })?)
            }
            "string" => Value::String(self.text_until(name)?),
            "dateTime.iso8601" => Value::DateTime(self.text_until(name)?.trim().to_string()),
            "base64" => Value::Base64(self.text_until(name)?.trim().to_string()),
            "nil" => {
                self.expect_close("nil")?;
                Value::Nil
            }
            "array" => self.array_body()?,
            "struct" => self.struct_body()?,
            other => {
                return Err(BackendError::Protocol(format!(
                    "unsupported value type <{}>",
                    other
                )))
            }
        };
        Ok(value)
    }

    fn array_body(&mut self) -> BackendResult<Value> {
        let mut items = Vec::new();
        match self.next_tag()? {
            Tag::Empty(n) if n == "data" => {}
            Tag::Open(n) if n == "data" => loop {
                match self.next_tag()? {
                    Tag::Open(n) if n == "value" => items.push(self.value_body()?),
                    Tag::Empty(n) if n == "value" => items.push(Value::String(String::new())),
                    Tag::Close(n) if n == "data" => break,
                    other => return Err(unexpected(&other, "<value> or </data>")),
                }
            },
            other => return Err(unexpected(&other, "<data>")),
        }
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn struct_body(&mut self) -> BackendResult<Value> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_tag()? {
                Tag::Open(n) if n == "member" => {
                    self.expect_open("name")?;
                    let name = self.text_until("name")?;
                    let value = match self.next_tag()? {
                        Tag::Open(n) if n == "value" => self.value_body()?,
                        Tag::Empty(n) if n == "value" => Value::String(String::new()),
                        other => return Err(unexpected(&other, "<value>")),
                    };
                    self.expect_close("member")?;
                    members.insert(name, value);
                }
                Tag::Close(n) if n == "struct" => break,
                other => return Err(unexpected(&other, "<member> or </struct>")),
            }
        }
        Ok(Value::Struct(members))
    }
}

fn empty_typed_value(name: &str) -> BackendResult<Value> {
    match name {
        "string" => Ok(Value::String(String::new())),
        "nil" => Ok(Value::Nil),
        "array" => Ok(Value::Array(Vec::new())),
        "struct" => Ok(Value::Struct(BTreeMap::new())),
        other => Err(BackendError::Protocol(format!(
            "empty <{}/> is not a valid value",
            other
        ))),
    }
}
