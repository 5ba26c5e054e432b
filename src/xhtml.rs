//! Lenient HTML fragment parsing and XML-compatible re-serialization.
//!
//! Fragments are parsed with the HTML5 tree builder (so unbalanced markup is repaired the way a
//! browser would), then written back out as XHTML: void elements self-close, text and attribute
//! values are escaped, and foreign content carries its own namespace declaration.

use kuchikikiki::NodeRef;
use kuchikikiki::traits::TendrilSink;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse `html` as body content and return the `<body>` element holding it.
pub fn parse_fragment(html: &str) -> Option<NodeRef> {
    let document = kuchikikiki::parse_html().one(html);
    document
        .descendants()
        .find(|node| is_element(node, "body"))
}

pub fn is_element(node: &NodeRef, local_name: &str) -> bool {
    node.as_element()
        .is_some_and(|element| &*element.name.local == local_name)
}

/// Serialize the children of `node` (not the node itself) as XHTML.
pub fn serialize_children(node: &NodeRef) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, HTML_NS, &mut out);
    }
    out
}

fn write_node(node: &NodeRef, parent_ns: &str, out: &mut String) {
    if let Some(text) = node.as_text() {
        push_escaped_text(out, &text.borrow());
        return;
    }
    let Some(element) = node.as_element() else {
        // Comments, doctypes and processing instructions are not carried over.
        return;
    };

    let local: &str = &element.name.local;
    let ns: &str = &element.name.ns;
    if !is_xml_name(local) {
        for child in node.children() {
            write_node(&child, parent_ns, out);
        }
        return;
    }

    out.push('<');
    out.push_str(local);
    if ns != parent_ns && matches!(ns, HTML_NS | SVG_NS | MATHML_NS) {
        push_attribute(out, "xmlns", ns);
    }

    let attributes = element.attributes.borrow();
    let mut declared_xlink = false;
    for (name, attr) in attributes.map.iter() {
        let attr_local: &str = &name.local;
        if attr_local == "xmlns" || !is_xml_name(attr_local) {
            continue;
        }
        let qualified = match attr.prefix.as_ref().map(|p| &**p) {
            None => attr_local.to_owned(),
            Some("xml") => format!("xml:{attr_local}"),
            Some("xlink") if &*name.ns == XLINK_NS => {
                if !declared_xlink {
                    push_attribute(out, "xmlns:xlink", XLINK_NS);
                    declared_xlink = true;
                }
                format!("xlink:{attr_local}")
            }
            Some(_) => continue,
        };
        push_attribute(out, &qualified, &attr.value);
    }

    let is_void = ns == HTML_NS && VOID_TAGS.contains(&local);
    let has_children = node.first_child().is_some();
    if is_void || (ns != HTML_NS && !has_children) {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in node.children() {
        write_node(&child, ns, out);
    }
    out.push_str("</");
    out.push_str(local);
    out.push('>');
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Escape text for use in XML character data or a double-quoted attribute.
pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
