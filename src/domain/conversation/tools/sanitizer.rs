//! Textual repair of embedded tool-call blocks.
//!
//! Completions are asked to answer with `<function=NAME>{JSON}</function>`
//! but routinely deviate in small, recurring ways: stray whitespace and
//! line breaks, alternate tag spellings, doubled braces, single-quoted
//! JSON, trailing debris. [`ResponseSanitizer`] rewrites those variants
//! into the canonical shape before parsing.
//!
//! The rewrite sequence is idempotent: running it on its own output
//! changes nothing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical closing tag of a call block.
pub const CLOSING_TAG: &str = "</function>";

static START_TAG_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\{start_tag\}=([^>]+)>").expect("static regex"));

static NAMED_START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<function\s+name=["']?(\w+)["']?\s*>"#).expect("static regex")
});

static MISSING_LEADING_LT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^<\w])function=(\w+)>").expect("static regex"));

static BARE_CLOSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^<\w/=]|[^<]/)function>").expect("static regex"));

static SELF_CLOSING_AT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<function\s*/>\s*$").expect("static regex"));

static OPENING_AS_CLOSING_AT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*<function>\s*$").expect("static regex"));

static SPACE_AFTER_OPENING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<function=\w+>)\s+").expect("static regex"));

static SPACE_BEFORE_CLOSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+</function>").expect("static regex"));

static DEBRIS_BEFORE_CLOSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\}[^{}"]+</function>"#).expect("static regex"));

static OPENING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<function=\w+>").expect("static regex"));

/// Rewrites near-miss tool-call text into `<function=NAME>{JSON}</function>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSanitizer;

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Applies every repair in order.
    ///
    /// # Steps
    /// 1. Trim, drop line breaks, turn tabs into spaces
    /// 2. Normalize alternate opening and closing tag spellings
    /// 3. Repair a missing `<` and a bare `function>` closing tag
    /// 4. Repair a closing tag written as `<function/>` or `<function>` at the end
    /// 5. Append a closing tag if none ends the text
    /// 6. Remove whitespace just inside the tags
    /// 7. Convert single-quoted JSON strings to double-quoted ones
    /// 8. Drop surplus closing braces, then debris after the JSON
    /// 9. Re-insert escaped line breaks between run-together sentences
    pub fn sanitize(&self, raw: &str) -> String {
        let mut text: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .map(|c| if c == '\t' { ' ' } else { c })
            .collect();
        text = text.replace("}<>", "}");

        text = START_TAG_PLACEHOLDER
            .replace_all(&text, "<function=$1>")
            .into_owned();
        text = text.replace("</end_tag>", "");
        text = NAMED_START_TAG
            .replace_all(&text, "<function=$1>")
            .into_owned();
        text = text.replace("[/function]", CLOSING_TAG);

        text = MISSING_LEADING_LT
            .replace_all(&text, "${1}<function=${2}>")
            .into_owned();
        text = BARE_CLOSING
            .replace_all(&text, "${1}</function>")
            .into_owned();

        text = SELF_CLOSING_AT_END
            .replace(&text, CLOSING_TAG)
            .into_owned();
        text = OPENING_AS_CLOSING_AT_END
            .replace(&text, "}</function>")
            .into_owned();

        text = ensure_closing_tag(text);

        text = SPACE_AFTER_OPENING.replace_all(&text, "$1").into_owned();
        text = SPACE_BEFORE_CLOSING
            .replace_all(&text, CLOSING_TAG)
            .into_owned();

        text = map_payload(&text, normalize_quotes);
        text = map_payload(&text, drop_surplus_closing_braces);
        text = DEBRIS_BEFORE_CLOSING
            .replace_all(&text, "}</function>")
            .into_owned();
        text = map_payload(&text, break_run_together_sentences);

        ensure_closing_tag(text)
    }
}

fn ensure_closing_tag(text: String) -> String {
    if text.ends_with(CLOSING_TAG) {
        return text;
    }
    let mut text = text.trim_end().to_string();
    text.push_str(CLOSING_TAG);
    text
}

/// Applies `f` to the JSON payload of the first call block, if any.
///
/// Text without an opening tag is left alone so unrelated prose is
/// never rewritten.
fn map_payload(text: &str, f: fn(&str) -> String) -> String {
    let Some(opening) = OPENING_TAG.find(text) else {
        return text.to_string();
    };
    let start = opening.end();
    let Some(relative_end) = text[start..].find(CLOSING_TAG) else {
        return text.to_string();
    };
    let end = start + relative_end;

    let mut rebuilt = String::with_capacity(text.len());
    rebuilt.push_str(&text[..start]);
    rebuilt.push_str(&f(&text[start..end]));
    rebuilt.push_str(&text[end..]);
    rebuilt
}

/// Rewrites `'...'` strings that sit in JSON value or key position as
/// `"..."`, leaving apostrophes in prose alone.
fn normalize_quotes(payload: &str) -> String {
    enum State {
        Outside,
        InDouble,
        InSingle,
    }

    let chars: Vec<char> = payload.chars().collect();
    let mut out = String::with_capacity(payload.len());
    let mut state = State::Outside;
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Outside => {
                if c == '"' {
                    state = State::InDouble;
                    out.push(c);
                } else if c == '\'' && opens_value(last_significant) {
                    state = State::InSingle;
                    out.push('"');
                } else {
                    out.push(c);
                }
                if !c.is_whitespace() {
                    last_significant = Some(c);
                }
            }
            State::InDouble => {
                if c == '\\' {
                    match chars.get(i + 1) {
                        // `\'` is not a valid JSON escape.
                        Some('\'') => out.push('\''),
                        Some(next) => {
                            out.push(c);
                            out.push(*next);
                        }
                        None => out.push(c),
                    }
                    i += 2;
                    continue;
                }
                if c == '"' {
                    state = State::Outside;
                    last_significant = Some('"');
                }
                out.push(c);
            }
            State::InSingle => {
                if c == '\\' {
                    match chars.get(i + 1) {
                        Some('\'') => out.push('\''),
                        Some(next) => {
                            out.push(c);
                            out.push(*next);
                        }
                        None => out.push(c),
                    }
                    i += 2;
                    continue;
                }
                if c == '\'' && closes_value(&chars[i + 1..]) {
                    state = State::Outside;
                    last_significant = Some('"');
                    out.push('"');
                } else if c == '"' {
                    out.push_str("\\\"");
                } else {
                    out.push(c);
                }
            }
        }
        i += 1;
    }

    out
}

fn opens_value(previous: Option<char>) -> bool {
    matches!(previous, Some('{') | Some('[') | Some(',') | Some(':'))
}

fn closes_value(rest: &[char]) -> bool {
    match rest.iter().find(|c| !c.is_whitespace()) {
        None => true,
        Some(next) => matches!(next, ',' | ':' | '}' | ']'),
    }
}

/// Counts `{` and `}` outside double-quoted strings.
fn brace_balance(payload: &str) -> (usize, usize) {
    let mut opening = 0;
    let mut closing = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in payload.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => opening += 1,
            '}' => closing += 1,
            _ => {}
        }
    }

    (opening, closing)
}

/// Removes trailing `}` characters that have no matching `{`.
fn drop_surplus_closing_braces(payload: &str) -> String {
    let (opening, closing) = brace_balance(payload);
    let mut surplus = closing.saturating_sub(opening);
    let mut trimmed = payload.trim_end();

    while surplus > 0 && trimmed.ends_with('}') {
        trimmed = trimmed[..trimmed.len() - 1].trim_end();
        surplus -= 1;
    }

    if trimmed.len() == payload.trim_end().len() {
        return payload.to_string();
    }
    trimmed.to_string()
}

/// Inserts an escaped line break where a sentence ends directly against the
/// next one (`"land.The"`), inside JSON strings only.
fn break_run_together_sentences(payload: &str) -> String {
    let chars: Vec<char> = payload.chars().collect();
    let mut out = String::with_capacity(payload.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_string = false,
            '.' if chars.get(i + 1).is_some_and(|n| n.is_ascii_uppercase()) => {
                out.push_str("\\n");
            }
            _ => {}
        }
    }

    out
}
