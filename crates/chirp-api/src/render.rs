//! Post body rendering.
//!
//! Raw text goes through four steps, always in this order:
//!
//! 1. HTML-escape everything, so later steps only ever see inert text.
//! 2. Censor wordlist terms on whole-word, case-insensitive matches.
//! 3. Translate the fixed bracket markup (`[b]`, `[i]`, `[u]`, `[s]`,
//!    `[size=medium]`, `[size=large]`) into tags we control.
//! 4. Autolink bare `http(s)://` and `www.` tokens.
//!
//! Nothing here fails: malformed markup simply stays as escaped text. The
//! output is not meant to be fed back in.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

/// Bracket markup, applied top to bottom. `(?s)` lets a span cross lines;
/// the lazy `.*?` pairs each opener with its nearest closer.
static MARKUP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?s)\[b\](.*?)\[/b\]", "<strong>${1}</strong>"),
        (r"(?s)\[i\](.*?)\[/i\]", "<em>${1}</em>"),
        (r"(?s)\[u\](.*?)\[/u\]", "<u>${1}</u>"),
        (r"(?s)\[s\](.*?)\[/s\]", "<s>${1}</s>"),
        (
            r"(?s)\[size=medium\](.*?)\[/size\]",
            r#"<span class="text-medium">${1}</span>"#,
        ),
        (
            r"(?s)\[size=large\](.*?)\[/size\]",
            r#"<span class="text-large">${1}</span>"#,
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("invalid markup rule"), replacement)
    })
    .collect()
});

/// A URL runs until whitespace or the start of a tag.
static AUTOLINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<]+|www\.[^\s<]+").expect("invalid autolink pattern"));

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep the first character, star the rest.
fn mask(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => std::iter::once(first).chain(chars.map(|_| '*')).collect(),
        None => String::new(),
    }
}

fn apply_markup(text: String) -> String {
    MARKUP_RULES.iter().fold(text, |acc, (re, replacement)| {
        re.replace_all(&acc, *replacement).into_owned()
    })
}

fn autolink(text: &str) -> String {
    AUTOLINK
        .replace_all(text, |caps: &Captures| {
            let url = &caps[0];
            let href = if url.starts_with("http") {
                url.to_string()
            } else {
                format!("https://{}", url)
            };
            format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                href, url
            )
        })
        .into_owned()
}

/// Renders post bodies against one snapshot of the censorship wordlist.
pub struct Renderer {
    /// Group 1 is an HTML entity from the escape step and is left alone; any
    /// other match is a wordlist hit.
    censor: Option<Regex>,
}

impl Renderer {
    pub fn new(words: &[String]) -> Self {
        let terms: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        if terms.is_empty() {
            return Self { censor: None };
        }

        let pattern = format!(
            r"(&(?:#x?[0-9a-fA-F]+|\w+);)|(?i:\b(?:{})\b)",
            terms.join("|")
        );
        let censor = Regex::new(&pattern)
            .map_err(|e| warn!("Censor pattern rejected, wordlist not applied: {}", e))
            .ok();
        Self { censor }
    }

    pub fn censor(&self, text: String) -> String {
        let Some(re) = &self.censor else {
            return text;
        };
        re.replace_all(&text, |caps: &Captures| match caps.get(1) {
            Some(entity) => entity.as_str().to_string(),
            None => mask(&caps[0]),
        })
        .into_owned()
    }

    pub fn render(&self, raw: &str) -> String {
        let escaped = escape_html(raw);
        let censored = self.censor(escaped);
        let marked = apply_markup(censored);
        autolink(&marked)
    }
}
