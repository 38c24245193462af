//! Streaming XML to [`Node`] materialization.

use crate::ecs::node::{Node, Schema};
use crate::error::{EcsError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::trace;

/// Walks `xml` into a node graph, registering every tag with `schema`.
///
/// The returned node is the document root: it has an empty tag and holds the
/// outermost element as its only child list.
pub fn materialize(xml: &[u8], schema: &mut Schema) -> Result<Node> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Node> = vec![Node::new("")];

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| EcsError::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(start) => {
                stack.push(open(&start)?);
            }
            Event::Empty(start) => {
                let node = open(&start)?;
                attach(&mut stack, node, schema)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| EcsError::Xml("unbalanced end tag".into()))?;
                attach(&mut stack, node, schema)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| EcsError::Xml(e.to_string()))?;
                set_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                set_text(&mut stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(EcsError::Xml(format!("{} unclosed element(s)", stack.len() - 1)));
    }
    let root = stack.pop().ok_or_else(|| EcsError::Xml("empty document".into()))?;
    if root.properties().next().is_none() {
        return Err(EcsError::Xml("no root element".into()));
    }
    Ok(root)
}

fn open(start: &BytesStart<'_>) -> Result<Node> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut node = Node::new(tag);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| EcsError::Xml(e.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| EcsError::Xml(e.to_string()))?;
        node.set_attr(&name, value.into_owned());
    }
    Ok(node)
}

fn attach(stack: &mut [Node], node: Node, schema: &mut Schema) -> Result<()> {
    let kind = schema.register(node.tag());
    trace!("Materialized <{}> as {}", node.tag(), kind.field);
    let parent = stack.last_mut().ok_or_else(|| EcsError::Xml("element outside document".into()))?;
    parent.push_child(&kind.field, node);
    Ok(())
}

fn set_text(stack: &mut [Node], text: &str) {
    if text.trim().is_empty() {
        return;
    }
    // Only the document root is below the bottom of the stack.
    if stack.len() < 2 {
        return;
    }
    if let Some(node) = stack.last_mut() {
        if node.properties().next().is_none() {
            node.set_value(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HelpResponse xmlns="http://webservices.amazon.com/AWSECommerceService/2008-08-19">
  <OperationRequest>
    <HTTPHeaders><Header Name="UserAgent" Value="amz-ecs"/></HTTPHeaders>
    <RequestId>0X5Q4A9J0ZQH7B4JRHAJ</RequestId>
  </OperationRequest>
  <Information>
    <Request><IsValid>True</IsValid></Request>
    <OperationInformation>
      <Name>ItemSearch</Name>
      <Description><![CDATA[Search for <items>]]></Description>
      <AvailableParameters>
        <Parameter>Actor</Parameter>
        <Parameter>Artist</Parameter>
        <Parameter>Title &amp; Subtitle</Parameter>
      </AvailableParameters>
    </OperationInformation>
  </Information>
</HelpResponse>"#;

    #[test]
    fn test_materialize_structure() {
        let mut schema = Schema::new();
        let root = materialize(HELP.as_bytes(), &mut schema).unwrap();

        let info = root.path(&["help_response", "information", "operation_information"]).unwrap();
        assert!(info.get("name").unwrap().eq_text("ItemSearch"));

        let params = info.get("available_parameters").unwrap().get("parameter").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].value(), Some("Actor"));
        assert_eq!(params[2].value(), Some("Title & Subtitle"));
    }

    #[test]
    fn test_materialize_cdata_and_attributes() {
        let mut schema = Schema::new();
        let root = materialize(HELP.as_bytes(), &mut schema).unwrap();

        let info = root.path(&["help_response", "information", "operation_information"]).unwrap();
        assert_eq!(info.get("description").unwrap().value(), Some("Search for <items>"));

        let header = root
            .path(&["help_response", "operation_request", "http_headers", "header"])
            .unwrap();
        assert_eq!(header.attr("name"), Some("UserAgent"));
        assert_eq!(header.attr("value"), Some("amz-ecs"));

        // Namespace declarations are not attributes.
        let response = root.get("help_response").unwrap().single().unwrap();
        assert!(response.attrib().is_empty());
    }

    #[test]
    fn test_materialize_registers_kinds() {
        let mut schema = Schema::new();
        materialize(HELP.as_bytes(), &mut schema).unwrap();

        assert_eq!(schema.lookup("HTTPHeaders").unwrap().field, "http_headers");
        assert_eq!(schema.lookup("OperationInformation").unwrap().field, "operation_information");
        let before = schema.len();

        materialize(HELP.as_bytes(), &mut schema).unwrap();
        assert_eq!(schema.len(), before);
    }

    #[test]
    fn test_object_nodes_have_no_value() {
        let mut schema = Schema::new();
        let root = materialize(b"<A><B>1</B>tail</A>", &mut schema).unwrap();
        let a = root.get("a").unwrap().single().unwrap();
        assert!(a.value().is_none());
        assert!(a.get("b").unwrap().eq_text("1"));
    }

    #[test]
    fn test_malformed_xml() {
        let mut schema = Schema::new();
        assert!(matches!(materialize(b"<A><B></A>", &mut schema), Err(EcsError::Xml(_))));
        assert!(matches!(materialize(b"<A>", &mut schema), Err(EcsError::Xml(_))));
        assert!(matches!(materialize(b"", &mut schema), Err(EcsError::Xml(_))));
    }
}
