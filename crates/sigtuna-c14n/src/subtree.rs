#![forbid(unsafe_code)]

//! Subtree walker shared by the four canonicalization modes.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::{Node, NodeType};
use sigtuna_core::{ns, SigningError};
use sigtuna_xml::splice;

use crate::emit::{Attr, NsDecl};
use crate::escape;
use crate::C14nMode;

pub(crate) fn canonicalize(apex: Node<'_, '_>, mode: C14nMode) -> Result<Vec<u8>, SigningError> {
    if !apex.is_element() {
        return Err(SigningError::Canonicalization(
            "canonicalization root is not an element".to_owned(),
        ));
    }
    let walker = Walker {
        mode,
        text: apex.document().input_text(),
    };
    let mut out = String::new();
    walker.element(apex, &BTreeMap::new(), true, &mut out)?;
    Ok(out.into_bytes())
}

struct Walker<'a> {
    mode: C14nMode,
    text: &'a str,
}

impl Walker<'_> {
    fn element(
        &self,
        node: Node<'_, '_>,
        rendered: &BTreeMap<String, String>,
        is_apex: bool,
        out: &mut String,
    ) -> Result<(), SigningError> {
        let qname = splice::qualified_name(self.text, node);
        let in_scope = inscope_namespaces(node);

        // candidate prefixes whose declarations may need to be emitted here
        let candidates: BTreeSet<String> = if self.mode.is_exclusive() {
            self.utilized_prefixes(node, &in_scope)?
        } else {
            let mut all: BTreeSet<String> = in_scope.keys().cloned().collect();
            if !in_scope.contains_key("") && rendered.contains_key("") {
                // nearest output ancestor rendered a default namespace that
                // is unbound here
                all.insert(String::new());
            }
            all
        };

        let mut decls: Vec<NsDecl> = Vec::new();
        for prefix in &candidates {
            let uri = in_scope.get(prefix).map(String::as_str).unwrap_or("");
            if uri.is_empty() && prefix.is_empty() {
                // un-declaration, only when an ancestor rendered a default ns
                if rendered.get("").map(String::as_str).unwrap_or("") != "" {
                    decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    });
                }
                continue;
            }
            if uri.is_empty() {
                return Err(SigningError::Canonicalization(format!(
                    "prefix {prefix} is not bound in scope"
                )));
            }
            if rendered.get(prefix).map(String::as_str) != Some(uri) {
                decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.to_owned(),
                });
            }
        }
        decls.sort();

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: attr_qname(&in_scope, ns_uri, attr.name())?,
                value: attr.value().to_owned(),
            });
        }
        if is_apex && !self.mode.is_exclusive() {
            self.collect_inherited_xml_attrs(node, &mut attrs);
        }
        attrs.sort();

        out.push('<');
        out.push_str(qname);
        for decl in &decls {
            decl.render_into(out);
        }
        for attr in &attrs {
            attr.render_into(out);
        }
        out.push('>');

        let mut child_rendered = rendered.clone();
        for decl in &decls {
            if decl.uri.is_empty() {
                child_rendered.remove(&decl.prefix);
            } else {
                child_rendered.insert(decl.prefix.clone(), decl.uri.clone());
            }
        }

        for child in node.children() {
            self.node(child, &child_rendered, out)?;
        }

        out.push_str("</");
        out.push_str(qname);
        out.push('>');
        Ok(())
    }

    fn node(
        &self,
        node: Node<'_, '_>,
        rendered: &BTreeMap<String, String>,
        out: &mut String,
    ) -> Result<(), SigningError> {
        match node.node_type() {
            NodeType::Element => self.element(node, rendered, false, out),
            NodeType::Text => {
                escape::escape_text_into(out, node.text().unwrap_or(""));
                Ok(())
            }
            NodeType::Comment => {
                if self.mode.with_comments() {
                    out.push_str("<!--");
                    out.push_str(node.text().unwrap_or(""));
                    out.push_str("-->");
                }
                Ok(())
            }
            NodeType::PI => {
                out.push_str("<?");
                out.push_str(node.tag_name().name());
                if let Some(value) = node.text() {
                    if !value.is_empty() {
                        out.push(' ');
                        escape::escape_pi_into(out, value);
                    }
                }
                out.push_str("?>");
                Ok(())
            }
            NodeType::Root => Ok(()),
        }
    }

    /// Prefixes visibly utilized by an element: its own prefix plus the
    /// prefixes of its namespaced attributes.
    fn utilized_prefixes(
        &self,
        node: Node<'_, '_>,
        in_scope: &BTreeMap<String, String>,
    ) -> Result<BTreeSet<String>, SigningError> {
        let mut used = BTreeSet::new();
        let qname = splice::qualified_name(self.text, node);
        used.insert(splice::prefix_of(qname).to_owned());
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            if ns_uri.is_empty() || ns_uri == ns::XML {
                continue;
            }
            let qualified = attr_qname(in_scope, ns_uri, attr.name())?;
            used.insert(splice::prefix_of(&qualified).to_owned());
        }
        Ok(used)
    }

    /// Inherit `xml:*` attributes from ancestors at the subtree apex
    /// (inclusive modes only); the nearest binding wins and the apex's own
    /// attributes take precedence.
    fn collect_inherited_xml_attrs(&self, apex: Node<'_, '_>, attrs: &mut Vec<Attr>) {
        let mut seen: BTreeSet<String> = attrs
            .iter()
            .filter(|a| a.ns_uri == ns::XML)
            .map(|a| a.local_name.clone())
            .collect();
        for ancestor in apex.ancestors().skip(1) {
            if !ancestor.is_element() {
                continue;
            }
            for attr in ancestor.attributes() {
                if attr.namespace() != Some(ns::XML) || seen.contains(attr.name()) {
                    continue;
                }
                seen.insert(attr.name().to_owned());
                attrs.push(Attr {
                    ns_uri: ns::XML.to_owned(),
                    local_name: attr.name().to_owned(),
                    qualified_name: format!("xml:{}", attr.name()),
                    value: attr.value().to_owned(),
                });
            }
        }
    }
}

/// In-scope namespace bindings of an element, prefix → URI, built by
/// merging declarations from the root downwards. The implicit `xml` prefix
/// is excluded.
fn inscope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    let mut chain: Vec<Node<'_, '_>> = node.ancestors().filter(|n| n.is_element()).collect();
    chain.reverse();
    let mut map = BTreeMap::new();
    for element in chain {
        for decl in element.namespaces() {
            let prefix = decl.name().unwrap_or("");
            if prefix == "xml" {
                continue;
            }
            if decl.uri().is_empty() {
                map.remove(prefix);
            } else {
                map.insert(prefix.to_owned(), decl.uri().to_owned());
            }
        }
    }
    map
}

/// Qualified name for a namespaced attribute, using the in-scope prefix
/// bound to its namespace.
fn attr_qname(
    in_scope: &BTreeMap<String, String>,
    ns_uri: &str,
    local: &str,
) -> Result<String, SigningError> {
    if ns_uri.is_empty() {
        return Ok(local.to_owned());
    }
    if ns_uri == ns::XML {
        return Ok(format!("xml:{local}"));
    }
    for (prefix, uri) in in_scope {
        if !prefix.is_empty() && uri == ns_uri {
            return Ok(format!("{prefix}:{local}"));
        }
    }
    Err(SigningError::Canonicalization(format!(
        "no prefix in scope for attribute namespace {ns_uri}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigtuna_xml::parse_doc;

    fn c14n_at(xml: &str, local: &str, mode: C14nMode) -> String {
        let doc = parse_doc(xml).unwrap();
        let node = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == local)
            .unwrap();
        String::from_utf8(canonicalize(node, mode).unwrap()).unwrap()
    }

    #[test]
    fn empty_element_becomes_open_close_pair() {
        assert_eq!(c14n_at("<a/>", "a", C14nMode::Inclusive), "<a></a>");
    }

    #[test]
    fn attributes_are_sorted() {
        assert_eq!(
            c14n_at(r#"<a c="3" b="2" a="1"/>"#, "a", C14nMode::Inclusive),
            r#"<a a="1" b="2" c="3"></a>"#
        );
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(
            c14n_at("<a>1 &lt; 2 &amp; 3</a>", "a", C14nMode::Inclusive),
            "<a>1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn inclusive_emits_inherited_namespaces_at_apex() {
        let xml = r#"<r xmlns:x="urn:x"><c><x:e/></c></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Inclusive),
            r#"<c xmlns:x="urn:x"><x:e></x:e></c>"#
        );
    }

    #[test]
    fn exclusive_emits_namespaces_where_first_used() {
        let xml = r#"<r xmlns:x="urn:x" xmlns:y="urn:y"><c><x:e/></c></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Exclusive),
            r#"<c><x:e xmlns:x="urn:x"></x:e></c>"#
        );
    }

    #[test]
    fn exclusive_does_not_repeat_rendered_declarations() {
        let xml = r#"<r><x:c xmlns:x="urn:x"><x:e/></x:c></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Exclusive),
            r#"<x:c xmlns:x="urn:x"><x:e></x:e></x:c>"#
        );
    }

    #[test]
    fn default_namespace_is_carried_into_subtree() {
        let xml = r#"<r xmlns="urn:d"><c><e/></c></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Inclusive),
            r#"<c xmlns="urn:d"><e></e></c>"#
        );
    }

    #[test]
    fn comments_follow_the_mode() {
        let xml = "<a><!-- note --><b/></a>";
        assert_eq!(
            c14n_at(xml, "a", C14nMode::Inclusive),
            "<a><b></b></a>"
        );
        assert_eq!(
            c14n_at(xml, "a", C14nMode::InclusiveWithComments),
            "<a><!-- note --><b></b></a>"
        );
    }

    #[test]
    fn xml_space_is_inherited_at_apex_in_inclusive_mode() {
        let xml = r#"<r xml:space="preserve"><c>  x  </c></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Inclusive),
            r#"<c xml:space="preserve">  x  </c>"#
        );
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Exclusive),
            "<c>  x  </c>"
        );
    }

    #[test]
    fn namespaced_attributes_keep_their_prefix() {
        let xml = r#"<r xmlns:w="urn:w"><c w:Id="abc"/></r>"#;
        assert_eq!(
            c14n_at(xml, "c", C14nMode::Exclusive),
            r#"<c xmlns:w="urn:w" w:Id="abc"></c>"#
        );
    }

    #[test]
    fn carriage_returns_are_escaped_in_text() {
        let xml = "<a>one&#xD;two</a>";
        assert_eq!(
            c14n_at(xml, "a", C14nMode::Inclusive),
            "<a>one&#xD;two</a>"
        );
    }
}
