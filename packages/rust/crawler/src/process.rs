//! Article content processing.
//!
//! Derives the word-count-bounded abbreviated content from the full body.
//! Pure: title, URL, and full content pass through untouched.

use civicore_shared::NewsArticle;

/// Maximum number of whitespace-delimited words kept in abbreviated content.
pub const MAX_WORD_COUNT: usize = 100;

/// Compute the abbreviated form of a body.
///
/// At or under the limit the original text is returned unchanged, original
/// spacing included. Over the limit, the first [`MAX_WORD_COUNT`] tokens are
/// rejoined with single spaces and no trailing space.
pub fn abbreviate(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() <= MAX_WORD_COUNT {
        content.to_owned()
    } else {
        words[..MAX_WORD_COUNT].join(" ")
    }
}

/// Fill in an article's abbreviated content.
pub fn process(mut article: NewsArticle) -> NewsArticle {
    article.abbreviated_content = Some(abbreviate(&article.content));
    article
}
