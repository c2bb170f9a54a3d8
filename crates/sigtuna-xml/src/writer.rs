#![forbid(unsafe_code)]

//! Small indenting writer for the markup blocks spliced into a message.

/// Builds a multi-line XML fragment, one element per line, indented
/// relative to a base indentation taken from the insertion point.
pub struct XmlWriter {
    lines: Vec<String>,
    base: String,
    depth: usize,
}

const STEP: &str = "  ";

impl XmlWriter {
    pub fn new(base_indent: &str) -> Self {
        Self {
            lines: Vec::new(),
            base: base_indent.to_owned(),
            depth: 0,
        }
    }

    fn push_line(&mut self, content: String) {
        let mut line = String::with_capacity(self.base.len() + self.depth * STEP.len() + content.len());
        line.push_str(&self.base);
        for _ in 0..self.depth {
            line.push_str(STEP);
        }
        line.push_str(&content);
        self.lines.push(line);
    }

    /// Open an element; children are indented one step deeper.
    pub fn start_element(&mut self, qname: &str, attrs: &[(&str, &str)]) {
        self.push_line(format!("<{}{}>", qname, render_attrs(attrs)));
        self.depth += 1;
    }

    pub fn end_element(&mut self, qname: &str) {
        self.depth -= 1;
        self.push_line(format!("</{qname}>"));
    }

    /// A complete element on one line. Empty text renders as
    /// `<name></name>` so the element can serve as a fill-in placeholder.
    pub fn text_element(&mut self, qname: &str, attrs: &[(&str, &str)], text: &str) {
        self.push_line(format!(
            "<{qname}{}>{}</{qname}>",
            render_attrs(attrs),
            escape_text(text)
        ));
    }

    /// A self-closing element on one line.
    pub fn empty_element(&mut self, qname: &str, attrs: &[(&str, &str)]) {
        self.push_line(format!("<{}{}/>", qname, render_attrs(attrs)));
    }

    /// The fragment without a trailing newline.
    pub fn into_string(self) -> String {
        self.lines.join("\n")
    }
}

fn render_attrs(attrs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out
}

/// Escape character data.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value quoted with `"`.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
