//! HTML cleaning for note content.
//!
//! Note text is rich-text HTML produced by the editor and is rendered
//! unescaped, so it is cleaned on every write. Scripts, event-handler
//! attributes and `javascript:` URLs are dropped. Formatting tags, the
//! editor's `class` attributes, link targets and a small set of inline
//! style properties are kept.

use ammonia::Builder;

/// Inline style properties the editor emits for colors, fonts and alignment.
const STYLE_PROPERTIES: &[&str] = &[
    "background-color",
    "color",
    "font-family",
    "font-size",
    "text-align",
];

/// Cleans editor HTML with an allow-list.
pub fn sanitize_note_html(html: &str) -> String {
    let mut builder = Builder::default();
    builder
        .add_generic_attributes(&["class", "style"])
        .add_tag_attributes("a", &["target"])
        .filter_style_properties(STYLE_PROPERTIES.iter().copied().collect());
    builder.clean(html).to_string()
}
