//! Whitespace and control character cleanup for scraped text

use lazy_static::lazy_static;
use regex::Regex;

use crate::data::NewNewsArticle;

lazy_static! {
    static ref CONTROL: Regex = Regex::new(r"[\p{Cc}&&[^\n\t]]").expect("pattern is valid");
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[^\S\n]+").expect("pattern is valid");
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n").expect("pattern is valid");
}

/// Drop control characters other than newline and tab, trim, then
/// collapse horizontal whitespace and blank lines
pub fn sanitize_text(text: &str) -> String {
    let text = CONTROL.replace_all(text, "");
    let text = HORIZONTAL_SPACE.replace_all(text.trim(), " ");
    BLANK_LINES.replace_all(&text, "\n").into_owned()
}

fn sanitize_optional(text: &mut Option<String>) {
    *text = text
        .as_deref()
        .map(sanitize_text)
        .filter(|value| !value.is_empty());
}

/// Clean the text columns; links are only trimmed
pub fn sanitize_article(article: &mut NewNewsArticle) {
    article.headline = sanitize_text(&article.headline);
    article.story = sanitize_text(&article.story);
    sanitize_optional(&mut article.meta_description);

    article.source_link = article.source_link.trim().to_string();
    article.image_link = article
        .image_link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(ToOwned::to_owned);
}
