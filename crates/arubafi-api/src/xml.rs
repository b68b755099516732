// XML → serde_json::Value conversion for AirWave documents.
//
// Mapping rules:
//   - the document becomes `{ "<root tag>": <root element> }`
//   - attributes become `"@name"` keys
//   - child elements are grouped into lists keyed by tag name, even
//     when a tag occurs once
//   - text becomes `"#text"`, or the element collapses to a plain string
//     when it has neither attributes nor children (`null` when empty)

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

struct Element {
    tag: String,
    attrs: Map<String, Value>,
    children: IndexMap<String, Vec<Value>>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("bad attribute on <{tag}>: {e}"))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|e| format!("bad attribute value on <{tag}>: {e}"))?;
            attrs.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            tag,
            attrs,
            children: IndexMap::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        if self.attrs.is_empty() && self.children.is_empty() {
            let value = if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
            return (self.tag, value);
        }

        let mut map = self.attrs;
        for (tag, list) in self.children {
            map.insert(tag, Value::Array(list));
        }
        if !self.text.is_empty() {
            map.insert("#text".into(), Value::String(self.text));
        }
        (self.tag, Value::Object(map))
    }
}

/// Parse an XML document into its mapping form.
pub(crate) fn to_value(xml: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(format!("at byte {}: {e}", reader.buffer_position())),
        };
        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or("closing tag without an open element")?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| format!("bad text: {e}"))?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err("text outside the root element".into()),
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.tag));
    }
    let (tag, value) = root.ok_or("document has no root element")?;
    Ok(Value::Object(Map::from_iter([(tag, value)])))
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
) -> Result<(), String> {
    let (tag, value) = element.into_value();
    if let Some(parent) = stack.last_mut() {
        parent.children.entry(tag).or_default().push(value);
        return Ok(());
    }
    if root.is_some() {
        return Err(format!("second root element <{tag}>"));
    }
    *root = Some((tag, value));
    Ok(())
}

/// All children of `element` with the given tag.
pub fn children<'a>(element: &'a Value, tag: &str) -> &'a [Value] {
    element
        .get(tag)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

/// First child of `element` with the given tag.
pub fn first_child<'a>(element: &'a Value, tag: &str) -> Option<&'a Value> {
    children(element, tag).first()
}

/// Text of the first child with the given tag, whether the child
/// collapsed to a string or kept its attributes next to `#text`.
pub fn first_text<'a>(element: &'a Value, tag: &str) -> Option<&'a str> {
    let child = first_child(element, tag)?;
    child
        .as_str()
        .or_else(|| child.get("#text").and_then(Value::as_str))
}

/// Value of an `@attribute` on `element`.
pub fn attribute<'a>(element: &'a Value, name: &str) -> Option<&'a str> {
    element.get(format!("@{name}")).and_then(Value::as_str)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const AP_LIST: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<amp:amp_ap_list version="1" xmlns:amp="http://www.airwave.com">
  <ap id="42">
    <name>ap-lobby</name>
    <model id="7">AP-515</model>
    <is_remote_ap>false</is_remote_ap>
    <fqdn/>
  </ap>
  <ap id="43">
    <name>ap-&amp;-hall</name>
  </ap>
</amp:amp_ap_list>"#;

    #[test]
    fn converts_records_into_lists() {
        let doc = to_value(AP_LIST).unwrap();
        assert_eq!(
            doc,
            json!({
                "amp:amp_ap_list": {
                    "@version": "1",
                    "@xmlns:amp": "http://www.airwave.com",
                    "ap": [
                        {
                            "@id": "42",
                            "name": ["ap-lobby"],
                            "model": [{"@id": "7", "#text": "AP-515"}],
                            "is_remote_ap": ["false"],
                            "fqdn": [null]
                        },
                        {
                            "@id": "43",
                            "name": ["ap-&-hall"]
                        }
                    ]
                }
            })
        );
    }

    #[test]
    fn accessors() {
        let doc = to_value(AP_LIST).unwrap();
        let root = &doc["amp:amp_ap_list"];
        let ap = first_child(root, "ap").unwrap();
        assert_eq!(attribute(ap, "id"), Some("42"));
        assert_eq!(first_text(ap, "name"), Some("ap-lobby"));
        assert_eq!(first_text(ap, "model"), Some("AP-515"));
        assert_eq!(first_text(ap, "fqdn"), None);
        assert_eq!(children(root, "ap").len(), 2);
        assert!(children(root, "client").is_empty());
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(to_value("<a><b></a></b>").is_err());
    }

    #[test]
    fn rejects_unclosed_document() {
        assert!(to_value("<a><b>text</b>").is_err());
    }

    #[test]
    fn rejects_empty_document() {
        assert!(to_value("   ").is_err());
    }
}
