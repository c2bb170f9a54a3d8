#![forbid(unsafe_code)]

//! Ordering and rendering of namespace declarations and attributes.

use crate::escape;

/// A namespace declaration pending output. The default namespace (empty
/// prefix) sorts before all prefixed declarations, which sort by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    pub fn render_into(&self, out: &mut String) {
        if self.prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(&self.prefix);
            out.push_str("=\"");
        }
        escape::escape_attr_into(out, &self.uri);
        out.push('"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute pending output. Un-namespaced attributes sort first by
/// local name; namespaced ones follow, ordered by (namespace URI, local
/// name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn render_into(&self, out: &mut String) {
        out.push(' ');
        out.push_str(&self.qualified_name);
        out.push_str("=\"");
        escape::escape_attr_into(out, &self.value);
        out.push('"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
