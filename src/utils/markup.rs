//! XML request bodies and XML/JSON response decoding.
//!
//! Xero expects POST/PUT bodies as the inner document of a resource collection
//! (`<Contacts><Contact>...</Contact></Contacts>`) without an XML declaration,
//! and returns either an XML `<Response>` document or JSON. Both response
//! forms are decoded into a [`serde_json::Value`] tree.

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Serializes `fields` as an XML document rooted at `root`, including the
/// XML declaration.
///
/// Objects become nested elements, arrays repeat their parent element once
/// per item and `null` becomes an empty element. A key that is not a valid
/// element name is an [`Error::InvalidArgument`].
pub fn fields_to_xml(root: &str, fields: &Map<String, Value>) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_element(&mut writer, root, &Value::Object(fields.clone()))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::InvalidArgument(format!("payload is not valid UTF-8: {e}")))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::InvalidArgument(format!("cannot serialize payload: {e}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    check_element_name(name)?;
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Null => emit(writer, Event::Empty(BytesStart::new(name))),
        Value::Object(fields) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (key, child) in fields {
                write_element(writer, key, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        Value::String(text) => write_text(writer, name, text),
        Value::Bool(b) => write_text(writer, name, &b.to_string()),
        Value::Number(n) => write_text(writer, name, &n.to_string()),
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

// A letter or `_` first, then letters, digits and `_-.:`.
fn check_element_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{name:?} is not a valid XML element name"
        )))
    }
}

/// Drops a leading `<?xml ...?>` declaration: everything up to and including
/// the first `>` is removed and the remainder trimmed. Bodies without a
/// declaration are only trimmed.
#[must_use]
pub fn strip_declaration(body: &str) -> String {
    let body = body.trim();
    if body.starts_with("<?") {
        match body.find('>') {
            Some(end) => body[end + 1..].trim().to_string(),
            None => String::new(),
        }
    } else {
        body.to_string()
    }
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            let mut children = self.children;
            if !self.text.is_empty() {
                children.insert("#text".to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Decodes an XML document into a JSON tree of its root element.
///
/// Child elements become object keys; repeated siblings collapse into an
/// array; leaf elements become strings; attributes are keyed `@name`.
pub fn xml_to_value(body: &[u8]) -> Result<Value> {
    let text = String::from_utf8_lossy(body);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let mut frame = Frame::new(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr.unescape_value()?.into_owned();
                    frame.children.insert(format!("@{key}"), Value::String(value));
                }
                stack.push(frame);
            }
            Event::Empty(e) => {
                let mut frame = Frame::new(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr.unescape_value()?.into_owned();
                    frame.children.insert(format!("@{key}"), Value::String(value));
                }
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some(value),
                }
            }
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.into_value();
                    match stack.last_mut() {
                        Some(parent) => insert_child(&mut parent.children, name, value),
                        None => root = Some(value),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(root.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn contact_fields_strip_to_the_collection_document() {
        let fields = json!({ "Name": "Acme" });
        let xml = fields_to_xml("Contacts", fields.as_object().unwrap()).unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Contacts><Name>Acme</Name></Contacts>"#
        );
        assert_eq!(strip_declaration(&xml), "<Contacts><Name>Acme</Name></Contacts>");
    }

    #[test]
    fn nested_fields_and_arrays_repeat_elements() {
        let fields = json!({
            "Contact": [
                { "Name": "A & B", "IsSupplier": true },
                { "Name": "C", "Balance": 12.5, "Note": null }
            ]
        });
        let xml = fields_to_xml("Contacts", fields.as_object().unwrap()).unwrap();
        assert!(xml.ends_with(
            "<Contacts><Contact><Name>A &amp; B</Name><IsSupplier>true</IsSupplier></Contact>\
             <Contact><Name>C</Name><Balance>12.5</Balance><Note/></Contact></Contacts>"
        ));
    }

    #[test]
    fn invalid_element_names_are_rejected() {
        for key in ["", "<>", "1stLine", "Bad Name"] {
            let mut fields = Map::new();
            fields.insert(key.to_string(), json!("x"));
            assert!(
                matches!(fields_to_xml("Contacts", &fields), Err(Error::InvalidArgument(_))),
                "{key:?}"
            );
        }
    }

    #[test]
    fn markup_without_declaration_is_kept() {
        assert_eq!(strip_declaration("  <Invoices/> "), "<Invoices/>");
    }

    #[test]
    fn decodes_response_documents() {
        let body = br#"<?xml version="1.0"?>
            <Response xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
              <Status>OK</Status>
              <Invoices>
                <Invoice status="paid"><InvoiceNumber>INV-1</InvoiceNumber></Invoice>
                <Invoice><InvoiceNumber>INV-2</InvoiceNumber></Invoice>
              </Invoices>
              <Empty />
            </Response>"#;
        let value = xml_to_value(body).unwrap();
        assert_eq!(value["Status"], "OK");
        assert_eq!(value["Invoices"]["Invoice"][0]["@status"], "paid");
        assert_eq!(value["Invoices"]["Invoice"][1]["InvoiceNumber"], "INV-2");
        assert_eq!(value["Empty"], "");
    }
}
