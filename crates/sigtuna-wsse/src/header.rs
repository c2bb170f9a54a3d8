#![forbid(unsafe_code)]

//! Security header placement.

use roxmltree::{Document, Node};
use sigtuna_core::{ns, SigningError};
use sigtuna_xml::{document, parse_doc, splice, SoapDocument, XmlWriter};

fn reparse(text: String) -> Result<SoapDocument, SigningError> {
    SoapDocument::parse(text).map_err(|e| SigningError::XmlStructure(e.to_string()))
}

pub(crate) fn find_security<'a>(doc: &'a Document<'a>) -> Option<Node<'a, 'a>> {
    document::find_element(doc, ns::WSSE, ns::node::SECURITY)
}

/// Nearest in-scope binding of `prefix` at `node`.
fn prefix_binding(node: Node<'_, '_>, prefix: &str) -> Option<String> {
    for element in node.ancestors().filter(|n| n.is_element()) {
        for decl in element.namespaces() {
            if decl.name() == Some(prefix) {
                return Some(decl.uri().to_owned());
            }
        }
    }
    None
}

/// Ensure a `wsse:Security` header exists as the first child of the SOAP
/// Header, creating the Header itself before the Body when absent. An
/// already present Security header is reused.
pub(crate) fn ensure_security_header(doc: SoapDocument) -> Result<SoapDocument, SigningError> {
    let text = doc.into_text();
    let updated = {
        let parsed = parse_doc(&text).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        if let Some(security) = find_security(&parsed) {
            ensure_wsse_bindings(&text, security)?
        } else if let Some(header) = document::header(&parsed) {
            let indent = splice::line_indent(&text, header.range().start);
            let child_indent = format!("{indent}  ");
            let block = security_block(&parsed, &text, &child_indent);
            Some(splice::insert_first_child(&text, header, &block)?)
        } else {
            let body =
                document::body(&parsed).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
            let env_qname = splice::qualified_name(&text, parsed.root_element());
            let env_prefix = splice::prefix_of(env_qname);
            let header_qname = if env_prefix.is_empty() {
                ns::node::HEADER.to_owned()
            } else {
                format!("{env_prefix}:{}", ns::node::HEADER)
            };
            let indent = splice::line_indent(&text, body.range().start);
            let security = security_block(&parsed, &text, &format!("{indent}  "));
            let block = format!("<{header_qname}>\n{security}\n{indent}</{header_qname}>");
            Some(splice::insert_before(&text, body, &block))
        }
    };
    match updated {
        Some(new_text) => reparse(new_text),
        None => reparse(text),
    }
}

/// A pre-existing Security header must have `wsse` and `wsu` bound before
/// builder output can be appended under it.
fn ensure_wsse_bindings(
    text: &str,
    security: Node<'_, '_>,
) -> Result<Option<String>, SigningError> {
    let mut extra = String::new();
    for (prefix, uri) in [("wsse", ns::WSSE), ("wsu", ns::WSU)] {
        match prefix_binding(security, prefix) {
            Some(bound) if bound == uri => {}
            Some(bound) => {
                return Err(SigningError::XmlStructure(format!(
                    "prefix {prefix} is already bound to {bound}"
                )));
            }
            None => extra.push_str(&format!(" xmlns:{prefix}=\"{uri}\"")),
        }
    }
    if extra.is_empty() {
        Ok(None)
    } else {
        Ok(Some(splice::add_attributes(text, security, &extra)?))
    }
}

fn security_block(parsed: &Document<'_>, text: &str, indent: &str) -> String {
    let env_qname = splice::qualified_name(text, parsed.root_element());
    let env_prefix = splice::prefix_of(env_qname);
    let must_understand = format!("{env_prefix}:{}", ns::attr::MUST_UNDERSTAND);
    let mut attrs: Vec<(&str, &str)> = vec![("xmlns:wsse", ns::WSSE), ("xmlns:wsu", ns::WSU)];
    if !env_prefix.is_empty() {
        // an unprefixed envelope leaves no prefix to qualify the attribute
        attrs.push((&must_understand, "1"));
    }
    let mut writer = XmlWriter::new(indent);
    writer.text_element(&format!("wsse:{}", ns::node::SECURITY), &attrs, "");
    writer.into_string()
}

/// Append a builder's block as the last child of the Security header.
pub(crate) fn append_to_security<F>(
    doc: SoapDocument,
    render: F,
) -> Result<SoapDocument, SigningError>
where
    F: FnOnce(&str) -> Result<String, SigningError>,
{
    let text = doc.into_text();
    let new_text = {
        let parsed = parse_doc(&text).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let security = find_security(&parsed)
            .ok_or_else(|| SigningError::XmlStructure("Security header not found".to_owned()))?;
        let indent = splice::line_indent(&text, security.range().start);
        let block = render(&format!("{indent}  "))?;
        splice::insert_last_child(&text, security, &block)?
    };
    reparse(new_text)
}
