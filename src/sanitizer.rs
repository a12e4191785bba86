//! # Sanitizer Module
//!
//! Turns dexonline markup nodes into fragments Telegram accepts: a single
//! `<b>` or `<i>` around flattened text, no attributes, numeric superscripts
//! replaced by their Unicode forms.

use teloxide::utils::html;
use tracing::warn;

use crate::assembler::Fragment;
use crate::markup::{MarkupElement, MarkupNode};

/// Unicode superscript for a (lowercased) character
fn superscript_char(letter: char) -> Option<char> {
    let superscript = match letter {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        'i' => 'ⁱ',
        'n' => 'ⁿ',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' | '[' => '⁽',
        ')' | ']' => '⁾',
        _ => return None,
    };
    Some(superscript)
}

/// Translate a whole run to superscript characters, or `None` if any
/// character has no superscript form
pub fn get_superscript(text: &str) -> Option<String> {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(superscript_char)
        .collect()
}

/// Replace the text of every `sup` element in the subtree, including `element`
/// itself. Runs that cannot be fully translated are left as they are.
pub fn replace_superscripts(element: &mut MarkupElement, definition_url: &str) {
    if element.tag == "sup" {
        let sup_text = element.text_content();
        match get_superscript(&sup_text) {
            Some(superscript) => element.children = vec![MarkupNode::Text(superscript)],
            None => {
                warn!(superscript = %sup_text, definition_url = %definition_url, "Unsupported superscript");
            }
        }
        return;
    }

    for child in element.children.iter_mut() {
        if let MarkupNode::Element(child) = child {
            replace_superscripts(child, definition_url);
        }
    }
}

/// Apply superscript replacement to a list of top-level nodes
pub fn replace_node_superscripts(nodes: &mut [MarkupNode], definition_url: &str) {
    for node in nodes.iter_mut() {
        if let MarkupNode::Element(element) = node {
            replace_superscripts(element, definition_url);
        }
    }
}

/// Flatten an element to a single emphasis tag without attributes
pub fn clean_element(element: &MarkupElement) -> MarkupElement {
    let text = element.text_content();
    let tag = match element.tag.as_str() {
        "b" => "b",
        _ => "i",
    };

    MarkupElement {
        tag: tag.to_string(),
        attributes: Vec::new(),
        children: if text.is_empty() {
            Vec::new()
        } else {
            vec![MarkupNode::Text(text)]
        },
    }
}

/// Serialize a cleaned element; empty elements serialize to nothing
fn serialize_clean(element: &MarkupElement) -> String {
    let text = element.text_content();
    if text.is_empty() {
        return String::new();
    }
    format!("<{tag}>{}</{tag}>", html::escape(&text), tag = element.tag)
}

/// Render one top-level node as a fragment
pub fn sanitize_node(node: &MarkupNode) -> Fragment {
    match node {
        MarkupNode::Text(text) => Fragment::plain(text.as_str()),
        MarkupNode::Element(element) => {
            let cleaned = clean_element(element);
            Fragment::new(cleaned.text_content(), serialize_clean(&cleaned))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_fragment;

    fn sanitize(markup: &str) -> Vec<Fragment> {
        let mut nodes = parse_fragment(markup);
        replace_node_superscripts(&mut nodes, "test");
        nodes.iter().map(sanitize_node).collect()
    }

    fn sanitized_html(markup: &str) -> String {
        sanitize(markup).into_iter().map(|f| f.html).collect()
    }

    #[test]
    fn test_get_superscript_full_run() {
        assert_eq!(get_superscript("12").as_deref(), Some("¹²"));
        assert_eq!(get_superscript("[n+1]").as_deref(), Some("⁽ⁿ⁺¹⁾"));
        assert_eq!(get_superscript("I").as_deref(), Some("ⁱ"));
    }

    #[test]
    fn test_get_superscript_partial_run_fails() {
        assert_eq!(get_superscript("1a"), None);
        assert_eq!(get_superscript("x"), None);
    }

    #[test]
    fn test_unsupported_superscript_is_kept() {
        assert_eq!(sanitized_html("<sup>2b</sup>"), "<i>2b</i>");
    }

    #[test]
    fn test_superscript_is_replaced() {
        let fragments = sanitize("cuvânt<sup>1</sup> frumos");

        assert_eq!(fragments[1].text, "¹");
        assert_eq!(fragments[1].html, "<i>¹</i>");
    }

    #[test]
    fn test_nested_superscript_is_replaced() {
        assert_eq!(sanitized_html("<b>CASĂ<sup>2</sup></b>"), "<b>CASĂ²</b>");
    }

    #[test]
    fn test_other_tags_become_italic() {
        assert_eq!(
            sanitized_html(r#"<span class="tag">s. f.</span>"#),
            "<i>s. f.</i>"
        );
        assert_eq!(sanitized_html("<abbr title=\"x\">pl.</abbr>"), "<i>pl.</i>");
    }

    #[test]
    fn test_nested_tags_are_flattened() {
        assert_eq!(
            sanitized_html("<b>unu <i>doi</i> <span>trei</span></b>"),
            "<b>unu doi trei</b>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(sanitized_html("<i>a &lt; b</i> &amp; c"), "<i>a &lt; b</i> &amp; c");
    }

    #[test]
    fn test_empty_elements_render_nothing() {
        let fragments = sanitize("unu<br/>doi");

        assert_eq!(fragments[1].html, "");
        assert_eq!(fragments[1].text, "");
    }

    #[test]
    fn test_output_only_uses_balanced_b_and_i() {
        let html = sanitized_html(
            r#"<span class="def"><b>A</b> <i><u>B</u></i><sup>3</sup> <em>C</em> <b>D"#,
        );

        for tag in ["b", "i"] {
            assert_eq!(
                html.matches(&format!("<{tag}>")).count(),
                html.matches(&format!("</{tag}>")).count()
            );
        }
        let stripped = html
            .replace("<b>", "")
            .replace("</b>", "")
            .replace("<i>", "")
            .replace("</i>", "");
        assert!(!stripped.contains('<'));
    }
}
