//! Text normalization: HTML fragment in, clean plain-text summary out.
//!
//! The normalizer never fails. The worst case is the generic fallback line
//! that points readers at the publisher. Running it over its own output
//! returns the same text, so the whole corpus can be re-normalized every run.

use crate::config::PipelineConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// WordPress-style footer, tolerant of markup between the words.
static POST_FOOTER_RAW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bthe(?:\s|<[^>]*>)+post\b.*?appeared(?:\s|<[^>]*>)+first(?:\s|<[^>]*>)+on\b.*$")
        .unwrap()
});
static POST_FOOTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bthe\s+post\b.*?\bappeared\s+first\s+on\b.*$").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,;:!?])").unwrap());
static ARABIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{0600}-\x{06FF}]").unwrap());
static LEADING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s*").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// Longest extension of a title that still counts as the same text.
const NEAR_DUPLICATE_SLACK: usize = 30;

/// Decode entities and drop images, scripts, styles and every other tag.
pub fn strip_html(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw);
    let mut pieces: Vec<&str> = Vec::new();
    for node in fragment.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        if !hidden {
            pieces.push(&text.text);
        }
    }
    // Escaped markup decodes into real tags; strip those as well.
    let joined = pieces.join(" ");
    let untagged = TAG.replace_all(&joined, " ");
    collapse_whitespace(&untagged)
}

pub fn collapse_whitespace(s: &str) -> String {
    let collapsed = WHITESPACE.replace_all(s.trim(), " ");
    SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1").into_owned()
}

/// Drop the "The post … appeared first on …" footer, raw or cleaned.
pub fn remove_boilerplate(s: &str) -> String {
    let s = POST_FOOTER_RAW.replace(s, "");
    POST_FOOTER.replace(&s, "").trim().to_string()
}

/// First `<img src>` in a raw HTML fragment.
pub fn first_image(raw: &str) -> Option<String> {
    if !raw.contains("<img") && !raw.contains("<IMG") {
        return None;
    }
    let fragment = Html::parse_fragment(raw);
    fragment
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .find(|src| !src.is_empty())
}

/// `"ar"` when the text contains Arabic script, otherwise `"en"`.
pub fn detect_lang(text: &str) -> &'static str {
    if ARABIC.is_match(text) { "ar" } else { "en" }
}

/// Publisher display name: trimmed, no leading dash, single spaces.
pub fn clean_source_name(name: &str) -> String {
    let name = strip_html(name);
    let name = LEADING_DASH.replace(name.trim(), "");
    collapse_whitespace(&name)
}

/// Lower-cased, punctuation-free, single-spaced form used for comparisons.
fn comparison_key(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the text ends a sentence on its own (an ellipsis does not count).
fn completes_sentence(s: &str) -> bool {
    let trimmed = s.trim_end().trim_end_matches(['"', '\'', '”', '’', ')']);
    if trimmed.ends_with("...") || trimmed.ends_with('…') {
        return false;
    }
    trimmed.ends_with(['.', '!', '?'])
}

/// Whether `summary` merely repeats `title`.
///
/// Exact matches always count. A prefix match counts when the lengths differ
/// by at most 30 characters, except when the summary is the longer text and
/// finishes a sentence of its own ("Floods hit Mogadishu today." under the
/// title "Floods hit Mogadishu"); a trailing source name or ellipsis does not
/// make it a new sentence.
pub fn is_near_duplicate(title: &str, summary: &str) -> bool {
    let t = comparison_key(title);
    let s = comparison_key(summary);
    if t.is_empty() || s.is_empty() {
        return false;
    }
    if t == s {
        return true;
    }
    let summary_is_longer = s.len() > t.len();
    let (short, long) = if summary_is_longer { (&t, &s) } else { (&s, &t) };
    if !long.starts_with(short.as_str()) {
        return false;
    }
    let diff = long.chars().count() - short.chars().count();
    if diff > NEAR_DUPLICATE_SLACK {
        return false;
    }
    !(summary_is_longer && completes_sentence(summary))
}

/// The first `n` sentences, splitting on `.`, `!` or `?` followed by whitespace.
pub fn first_sentences(text: &str, n: usize) -> String {
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some((_, next)) = chars.peek() {
                if next.is_whitespace() {
                    count += 1;
                    if count == n {
                        return text[..i + c.len_utf8()].to_string();
                    }
                }
            }
        }
    }
    text.to_string()
}

/// Cut to at most `max` characters on a word boundary, ending in `…`.
pub fn truncate_on_word(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    let cut = cut.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'));
    format!("{cut}…")
}

/// Summary normalizer built from the promotional lexicon and length limits.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    promo: Option<Regex>,
    min_chars: usize,
    max_chars: usize,
    max_sentences: usize,
}

impl TextNormalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        let phrases: Vec<String> = config
            .promo_phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| regex::escape(p.trim()))
            .collect();
        let promo = if phrases.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b(?:{})", phrases.join("|"))).ok()
        };
        Self {
            promo,
            min_chars: config.min_summary_chars,
            max_chars: config.max_summary_chars,
            max_sentences: config.max_summary_sentences,
        }
    }

    pub fn is_promotional(&self, text: &str) -> bool {
        self.promo.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Strip one candidate, drop the footer, then reject promotional text and
    /// title repeats. Rejected candidates come back empty.
    pub fn clean_candidate(&self, raw: &str, title: &str) -> String {
        let text = remove_boilerplate(raw);
        let text = strip_html(&text);
        let text = remove_boilerplate(&text);
        if text.is_empty() || self.is_promotional(&text) || is_near_duplicate(title, &text) {
            return String::new();
        }
        text
    }

    pub fn fallback(source_name: &str) -> String {
        let name = source_name.trim();
        if name.is_empty() {
            "Read the full story at the original publisher.".to_string()
        } else {
            format!("Read the full story on {name}.")
        }
    }

    /// The longest candidate that survives cleaning, empty if none does.
    pub fn best_candidate<S: AsRef<str>>(&self, candidates: &[S], title: &str) -> String {
        let mut best = String::new();
        for candidate in candidates {
            let cleaned = self.clean_candidate(candidate.as_ref(), title);
            if cleaned.chars().count() > best.chars().count() {
                best = cleaned;
            }
        }
        best
    }

    /// Pick the longest surviving candidate and finish it into a summary.
    pub fn summarize<S: AsRef<str>>(&self, candidates: &[S], title: &str, source_name: &str) -> String {
        let best = self.best_candidate(candidates, title);
        self.finish(best, source_name)
    }

    /// Summarize a single text field.
    pub fn normalize(&self, raw: &str, title: &str, source_name: &str) -> String {
        self.summarize(&[raw], title, source_name)
    }

    fn finish(&self, text: String, source_name: &str) -> String {
        let text = if text.chars().count() > self.max_chars {
            first_sentences(&text, self.max_sentences)
        } else {
            text
        };
        if text.chars().count() < self.min_chars {
            return Self::fallback(source_name);
        }
        truncate_on_word(&text, self.max_chars)
    }
}
