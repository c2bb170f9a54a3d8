#![forbid(unsafe_code)]

//! Byte-offset editing of serialized XML.
//!
//! `roxmltree` trees are read-only, so structural edits are made by
//! splicing markup into the original text at offsets obtained from
//! [`roxmltree::Node::range`]. Everything outside the splice points is
//! preserved byte-for-byte.

use roxmltree::Node;
use sigtuna_core::SigningError;

/// The qualified name of an element as written in the source text.
pub fn qualified_name<'a>(text: &'a str, node: Node<'_, '_>) -> &'a str {
    let start = node.range().start + 1;
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() && !matches!(bytes[end], b' ' | b'\t' | b'\r' | b'\n' | b'/' | b'>') {
        end += 1;
    }
    &text[start..end]
}

/// The prefix part of a qualified name, or `""`.
pub fn prefix_of(qname: &str) -> &str {
    match qname.find(':') {
        Some(i) => &qname[..i],
        None => "",
    }
}

/// Whitespace indentation of the line containing byte `pos`.
pub fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let run = &text[line_start..pos];
    if run.bytes().all(|b| b == b' ' || b == b'\t') {
        run
    } else {
        ""
    }
}

/// Byte index of the `>` closing the open tag of `node`, plus whether the
/// element is self-closing. Quote-aware so `>` inside attribute values is
/// skipped.
fn open_tag_gt(text: &str, node: Node<'_, '_>) -> Result<(usize, bool), SigningError> {
    let bytes = text.as_bytes();
    let mut i = node.range().start;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    let self_closing = i > 0 && bytes[i - 1] == b'/';
                    return Ok((i, self_closing));
                }
                _ => {}
            },
        }
        i += 1;
    }
    Err(SigningError::XmlStructure(
        "unterminated open tag".to_owned(),
    ))
}

/// Byte index where the closing tag of `node` begins.
fn closing_tag_start(text: &str, node: Node<'_, '_>) -> Result<usize, SigningError> {
    let qname = qualified_name(text, node);
    let end = node.range().end;
    let close = format!("</{qname}");
    let tail = &text[..end];
    tail.rfind(&close)
        .ok_or_else(|| SigningError::XmlStructure(format!("closing tag of <{qname}> not found")))
}

/// Rewrite a self-closing element into open/close form, returning the new
/// text and the byte index just after the (now non-empty) open tag.
fn expand_self_closing(
    text: &str,
    node: Node<'_, '_>,
    gt: usize,
) -> (String, usize) {
    let qname = qualified_name(text, node);
    // `/` sits immediately before `>` in well-formed XML
    let slash = gt - 1;
    let mut out = String::with_capacity(text.len() + qname.len() + 3);
    out.push_str(&text[..slash]);
    out.push('>');
    let open_end = out.len();
    out.push_str(&format!("</{qname}>"));
    out.push_str(&text[gt + 1..]);
    (out, open_end)
}

/// Insert `block` (already indented, no trailing newline) as the first
/// child of `node`.
pub fn insert_first_child(
    text: &str,
    node: Node<'_, '_>,
    block: &str,
) -> Result<String, SigningError> {
    let (gt, self_closing) = open_tag_gt(text, node)?;
    let indent = line_indent(text, node.range().start).to_owned();
    if self_closing {
        let (expanded, open_end) = expand_self_closing(text, node, gt);
        let mut out = String::with_capacity(expanded.len() + block.len() + 2);
        out.push_str(&expanded[..open_end]);
        out.push('\n');
        out.push_str(block);
        out.push('\n');
        out.push_str(&indent);
        out.push_str(&expanded[open_end..]);
        return Ok(out);
    }
    let mut out = String::with_capacity(text.len() + block.len() + 2);
    out.push_str(&text[..gt + 1]);
    out.push('\n');
    out.push_str(block);
    // keep the following sibling content starting on its own line
    if !text[gt + 1..].starts_with('\n') {
        out.push('\n');
        out.push_str(&indent);
    }
    out.push_str(&text[gt + 1..]);
    Ok(out)
}

/// Insert `block` as the last child of `node`, before its closing tag.
pub fn insert_last_child(
    text: &str,
    node: Node<'_, '_>,
    block: &str,
) -> Result<String, SigningError> {
    let (gt, self_closing) = open_tag_gt(text, node)?;
    if self_closing {
        // identical to inserting a first child into an empty element
        return insert_first_child(text, node, block);
    }
    let close = closing_tag_start(text, node)?;
    let indent = line_indent(text, node.range().start).to_owned();

    // back the insertion point over indentation so the block gets its own line
    let mut ins = close;
    let bytes = text.as_bytes();
    while ins > gt + 1 && matches!(bytes[ins - 1], b' ' | b'\t') {
        ins -= 1;
    }
    let on_own_line = ins > gt + 1 && bytes[ins - 1] == b'\n';

    let mut out = String::with_capacity(text.len() + block.len() + 2);
    if on_own_line {
        out.push_str(&text[..ins - 1]);
        out.push('\n');
        out.push_str(block);
        out.push_str(&text[ins - 1..]);
    } else {
        out.push_str(&text[..close]);
        out.push('\n');
        out.push_str(block);
        out.push('\n');
        out.push_str(&indent);
        out.push_str(&text[close..]);
    }
    Ok(out)
}

/// Insert `sibling_block` immediately before `node`, on its own line.
pub fn insert_before(text: &str, node: Node<'_, '_>, sibling_block: &str) -> String {
    let start = node.range().start;
    let indent = line_indent(text, start).to_owned();
    let mut out = String::with_capacity(text.len() + sibling_block.len() + 2);
    out.push_str(&text[..start]);
    out.push_str(sibling_block.trim_start());
    out.push('\n');
    out.push_str(&indent);
    out.push_str(&text[start..]);
    out
}

/// Append raw attribute text (starting with a space) to the open tag of
/// `node`.
pub fn add_attributes(
    text: &str,
    node: Node<'_, '_>,
    attrs: &str,
) -> Result<String, SigningError> {
    let (gt, self_closing) = open_tag_gt(text, node)?;
    let at = if self_closing { gt - 1 } else { gt };
    let mut out = String::with_capacity(text.len() + attrs.len());
    out.push_str(&text[..at]);
    out.push_str(attrs);
    out.push_str(&text[at..]);
    Ok(out)
}
