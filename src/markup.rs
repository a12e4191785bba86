//! # Markup Module
//!
//! Parses the HTML fragment dexonline returns for a definition (`htmlRep`)
//! into a small node tree. The parser is lenient: unclosed elements are closed
//! at the end of the input, stray closing tags are dropped, void elements such
//! as `<br>` never take children, a `<` that does not start a tag is kept as
//! text, and input that cannot be tokenized at all comes back as a single
//! text node.

use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use tracing::warn;

/// HTML elements that never have content, with or without a closing slash
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

lazy_static! {
    /// A `<` not followed by something that can start a tag, end tag or comment
    static ref STRAY_LESS_THAN: Regex =
        Regex::new(r"<([^A-Za-z/!?]|$)").expect("Stray < pattern should be valid");
}

/// A node of a parsed definition fragment
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element(MarkupElement),
}

/// An element with its (lowercased) tag name, attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    /// Concatenated text of this node and all its descendants
    pub fn text_content(&self) -> String {
        match self {
            MarkupNode::Text(text) => text.clone(),
            MarkupNode::Element(element) => element.text_content(),
        }
    }
}

impl MarkupElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

/// Concatenated text of a node list
pub fn text_content(nodes: &[MarkupNode]) -> String {
    let mut text = String::new();
    collect_text(nodes, &mut text);
    text
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// Parse a markup fragment into its top-level nodes
pub fn parse_fragment(markup: &str) -> Vec<MarkupNode> {
    match try_parse_fragment(markup) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, markup = %markup, "Unparsable definition markup, rendering as text");
            if markup.is_empty() {
                Vec::new()
            } else {
                vec![MarkupNode::Text(markup.to_string())]
            }
        }
    }
}

/// Escape every `<` that cannot open a tag, so the tokenizer reads it as text
fn escape_stray_less_than(markup: &str) -> Cow<'_, str> {
    STRAY_LESS_THAN.replace_all(markup, "&lt;$1")
}

/// Whether a tokenized tag name looks like a real HTML tag
fn is_tag_name(name: &[u8]) -> bool {
    name.first().is_some_and(u8::is_ascii_alphabetic)
        && name.iter().all(|byte| byte.is_ascii_alphanumeric())
}

fn try_parse_fragment(markup: &str) -> Result<Vec<MarkupNode>, quick_xml::Error> {
    let markup = escape_stray_less_than(markup);
    let mut reader = Reader::from_str(&markup);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut top_level: Vec<MarkupNode> = Vec::new();
    let mut open: Vec<MarkupElement> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) if !is_tag_name(start.name().as_ref()) => {
                let text = format!("<{}>", String::from_utf8_lossy(&start));
                push_node(&mut open, &mut top_level, MarkupNode::Text(text));
            }
            Event::Empty(start) if !is_tag_name(start.name().as_ref()) => {
                let text = format!("<{}/>", String::from_utf8_lossy(&start));
                push_node(&mut open, &mut top_level, MarkupNode::Text(text));
            }
            Event::Start(start) => {
                let element = element_from_start(&start);
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    push_node(&mut open, &mut top_level, MarkupNode::Element(element));
                } else {
                    open.push(element);
                }
            }
            Event::Empty(start) => {
                let element = element_from_start(&start);
                push_node(&mut open, &mut top_level, MarkupNode::Element(element));
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                // Close up to the matching element; a closing tag nothing opened is dropped
                if let Some(position) = open.iter().rposition(|element| element.tag == name) {
                    while open.len() > position {
                        close_innermost(&mut open, &mut top_level);
                    }
                }
            }
            Event::Text(text) => {
                let text = unescape_text(&text);
                if !text.is_empty() {
                    push_node(&mut open, &mut top_level, MarkupNode::Text(text));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                push_node(&mut open, &mut top_level, MarkupNode::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while !open.is_empty() {
        close_innermost(&mut open, &mut top_level);
    }

    Ok(top_level)
}

fn element_from_start(start: &BytesStart) -> MarkupElement {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = MarkupElement::new(&tag);

    element.attributes = start
        .attributes()
        .flatten()
        .map(|attribute| {
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map(|value| value.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attribute.value).into_owned());
            (key, value)
        })
        .collect();

    element
}

fn push_node(open: &mut [MarkupElement], top_level: &mut Vec<MarkupNode>, node: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top_level.push(node),
    }
}

fn close_innermost(open: &mut Vec<MarkupElement>, top_level: &mut Vec<MarkupNode>) {
    if let Some(element) = open.pop() {
        push_node(open, top_level, MarkupNode::Element(element));
    }
}

fn unescape_text(text: &BytesText) -> String {
    text.unescape_with(resolve_html_entity)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(text).into_owned())
}

/// HTML named entities dexonline uses that XML does not predefine
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    let resolved = match entity {
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "laquo" => "«",
        "raquo" => "»",
        "bdquo" => "„",
        "ldquo" => "“",
        "rdquo" => "”",
        "lsquo" => "‘",
        "rsquo" => "’",
        "middot" => "·",
        "deg" => "°",
        "diam" | "loz" => "◊",
        _ => return None,
    };
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(element) => element,
            MarkupNode::Text(text) => panic!("expected element, got text {text:?}"),
        }
    }

    #[test]
    fn test_parse_text_and_elements() {
        let nodes = parse_fragment("cuvânt<sup>1</sup> frumos");

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], MarkupNode::Text("cuvânt".to_string()));
        assert_eq!(element(&nodes[1]).tag, "sup");
        assert_eq!(element(&nodes[1]).text_content(), "1");
        assert_eq!(nodes[2], MarkupNode::Text(" frumos".to_string()));
        assert_eq!(text_content(&nodes), "cuvânt1 frumos");
    }

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let nodes = parse_fragment(r#"<span class="tag" title="substantiv"><b>CASĂ</b>, case</span>"#);

        assert_eq!(nodes.len(), 1);
        let span = element(&nodes[0]);
        assert_eq!(span.tag, "span");
        assert_eq!(
            span.attributes,
            vec![
                ("class".to_string(), "tag".to_string()),
                ("title".to_string(), "substantiv".to_string())
            ]
        );
        assert_eq!(span.children.len(), 2);
        assert_eq!(span.text_content(), "CASĂ, case");
    }

    #[test]
    fn test_parse_closes_unclosed_elements() {
        let nodes = parse_fragment("<b>neterminat <i>deloc");

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text_content(), "neterminat deloc");
    }

    #[test]
    fn test_parse_drops_stray_closing_tags() {
        let nodes = parse_fragment("text</i> rest");

        assert_eq!(text_content(&nodes), "text rest");
        assert!(nodes.iter().all(|node| matches!(node, MarkupNode::Text(_))));
    }

    #[test]
    fn test_parse_resolves_entities() {
        let nodes = parse_fragment("a&nbsp;b &amp; c &#259;");
        assert_eq!(text_content(&nodes), "a\u{a0}b & c ă");

        // Unknown entities leave the text run as written
        let nodes = parse_fragment("x &unknown; y");
        assert_eq!(text_content(&nodes), "x &unknown; y");
    }

    #[test]
    fn test_parse_empty_elements() {
        let nodes = parse_fragment("unu<br/>doi");

        assert_eq!(nodes.len(), 3);
        assert_eq!(element(&nodes[1]).tag, "br");
        assert!(element(&nodes[1]).children.is_empty());
    }

    #[test]
    fn test_parse_void_elements_without_slash() {
        let nodes = parse_fragment("<b>CASĂ</b><br>s. f. <i>Clădire</i> de locuit");

        assert_eq!(nodes.len(), 5);
        assert_eq!(element(&nodes[0]).tag, "b");
        assert_eq!(element(&nodes[1]).tag, "br");
        assert!(element(&nodes[1]).children.is_empty());
        assert_eq!(nodes[2], MarkupNode::Text("s. f. ".to_string()));
        assert_eq!(element(&nodes[3]).tag, "i");
        assert_eq!(nodes[4], MarkupNode::Text(" de locuit".to_string()));
    }

    #[test]
    fn test_parse_void_elements_with_slash_and_stray_end() {
        let nodes = parse_fragment("unu<BR/>doi<hr>trei</br>patru");

        assert_eq!(text_content(&nodes), "unudoitreipatru");
        assert_eq!(element(&nodes[1]).tag, "br");
        assert_eq!(element(&nodes[3]).tag, "hr");
        assert!(element(&nodes[3]).children.is_empty());
    }

    #[test]
    fn test_parse_keeps_stray_less_than() {
        let nodes = parse_fragment("a < b <i>c</i>");

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], MarkupNode::Text("a < b ".to_string()));
        assert_eq!(element(&nodes[1]).tag, "i");
        assert_eq!(text_content(&nodes), "a < b c");

        assert_eq!(text_content(&parse_fragment("x<5 si x<")), "x<5 si x<");
    }

    #[test]
    fn test_parse_keeps_tags_with_invalid_names() {
        let nodes = parse_fragment("1 <- 2 <i>ok</i> <x.y>z");

        assert_eq!(text_content(&nodes), "1 <- 2 ok <x.y>z");
        assert!(nodes.iter().any(|node| matches!(node, MarkupNode::Element(e) if e.tag == "i")));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_fragment("").is_empty());
    }
}
