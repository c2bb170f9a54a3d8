#![forbid(unsafe_code)]

//! SOAP envelope wrapper over owned serialized text.

use roxmltree::{Document, Node, ParsingOptions};
use sigtuna_core::{ns, ParsingError};

/// A SOAP message held as serialized text.
///
/// Parsing is repeated on demand because the underlying tree borrows the
/// text; edits produce a new text which is validated again by the caller.
#[derive(Debug, Clone)]
pub struct SoapDocument {
    text: String,
}

impl SoapDocument {
    /// Parse and validate: well-formed XML, SOAP 1.1 or 1.2 Envelope root,
    /// Body element present.
    pub fn parse(text: String) -> Result<Self, ParsingError> {
        {
            let doc = parse_doc(&text)?;
            let env = doc.root_element();
            envelope_ns(&doc)?;
            let env_ns = env.tag_name().namespace().unwrap_or("");
            if body_of(env, env_ns).is_none() {
                return Err(ParsingError("SOAP Body element not found".to_owned()));
            }
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Parse XML without DTD support.
pub fn parse_doc(text: &str) -> Result<Document<'_>, ParsingError> {
    Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: false,
            ..ParsingOptions::default()
        },
    )
    .map_err(|e| ParsingError(e.to_string()))
}

/// The envelope namespace of a parsed document (SOAP 1.1 or 1.2).
pub fn envelope_ns<'a>(doc: &'a Document<'a>) -> Result<&'a str, ParsingError> {
    let env = doc.root_element();
    let tag = env.tag_name();
    match tag.namespace() {
        Some(uri) if tag.name() == ns::node::ENVELOPE && (uri == ns::SOAP11 || uri == ns::SOAP12) => {
            Ok(uri)
        }
        _ => Err(ParsingError(format!(
            "root element <{}> is not a SOAP Envelope",
            tag.name()
        ))),
    }
}

/// First child element of `parent` with the given namespace and local name.
pub fn find_child<'a, 'd>(parent: Node<'a, 'd>, ns_uri: &str, name: &str) -> Option<Node<'a, 'd>> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == name && c.tag_name().namespace() == Some(ns_uri))
}

fn body_of<'a, 'd>(env: Node<'a, 'd>, env_ns: &str) -> Option<Node<'a, 'd>> {
    find_child(env, env_ns, ns::node::BODY)
}

/// The SOAP Body node of a validated document.
pub fn body<'a>(doc: &'a Document<'a>) -> Result<Node<'a, 'a>, ParsingError> {
    let env = doc.root_element();
    let env_ns = envelope_ns(doc)?;
    body_of(env, env_ns).ok_or_else(|| ParsingError("SOAP Body element not found".to_owned()))
}

/// The SOAP Header node, when present.
pub fn header<'a>(doc: &'a Document<'a>) -> Option<Node<'a, 'a>> {
    let env = doc.root_element();
    let env_ns = env.tag_name().namespace()?;
    find_child(env, env_ns, ns::node::HEADER)
}

/// First descendant element matching namespace and local name.
pub fn find_element<'a>(doc: &'a Document<'a>, ns_uri: &str, name: &str) -> Option<Node<'a, 'a>> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name && n.tag_name().namespace() == Some(ns_uri))
}
