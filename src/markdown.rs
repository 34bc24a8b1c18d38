//! Converts post markdown sources into HTML for the post `body`.

use pulldown_cmark::{html, Options, Parser};

/// Converts `markdown` to HTML, appending the result to `w`. Footnotes,
/// tables, strikethrough, task lists, and smart punctuation are enabled.
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    html::push_html(w, Parser::new_ext(markdown, options));
}
