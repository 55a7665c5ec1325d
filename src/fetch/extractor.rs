use scraper::{Html, Node, Selector};

/// Elements dropped, with everything inside them, before text is collected.
const REMOVED_ELEMENTS: &[&str] = &[
    "script", "img", "style", "input", "nav", "footer", "header", "aside",
];

/// Contents of the first `<title>`, trimmed. `None` when missing or blank.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Visible text of `<body>`: every non-blank text node, trimmed, one per line.
///
/// Empty when the parsed document has no body element (framesets).
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&selector).next() else {
        return String::new();
    };

    let mut lines = Vec::new();
    let mut stack: Vec<_> = body.children().collect();
    stack.reverse();

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            Node::Element(el) if REMOVED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                let start = stack.len();
                stack.extend(node.children());
                stack[start..].reverse();
            }
            _ => {}
        }
    }

    lines.join("\n")
}
