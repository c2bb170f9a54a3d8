#![forbid(unsafe_code)]

//! Entity escaping for C14N output.
//!
//! Text nodes escape `&`, `<`, `>` and `\r`; attribute values additionally
//! escape `"`, `\t` and `\n`; PI data only escapes `\r`.

pub fn escape_text_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_attr_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_pi_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        if ch == '\r' {
            out.push_str("&#xD;");
        } else {
            out.push(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> String {
        let mut out = String::new();
        escape_text_into(&mut out, s);
        out
    }

    fn attr(s: &str) -> String {
        let mut out = String::new();
        escape_attr_into(&mut out, s);
        out
    }

    #[test]
    fn text_escaping() {
        assert_eq!(text("hello"), "hello");
        assert_eq!(text("a&b<c>d"), "a&amp;b&lt;c&gt;d");
        assert_eq!(text("line\rend"), "line&#xD;end");
        assert_eq!(text("tab\tstays"), "tab\tstays");
    }

    #[test]
    fn attr_escaping() {
        assert_eq!(attr("a&b\"c"), "a&amp;b&quot;c");
        assert_eq!(attr("a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
        assert_eq!(attr(">stays"), ">stays");
    }
}
