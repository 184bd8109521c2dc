pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>"#;
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

pub fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for character in input.chars() {
        match character {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&apos;"),
            other => output.push(other),
        }
    }
    output
}

/// Appends `<name>text</name>` with `text` escaped.
pub fn push_element(output: &mut String, name: &str, text: &str) {
    output.push('<');
    output.push_str(name);
    output.push('>');
    output.push_str(&escape(text));
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}
