use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::domain::question::QuestionType;

pub const TEXT_MATCH_THRESHOLD: f64 = 0.6;
pub const MIN_CONTENT_WORD_CHARS: usize = 4;

static LETTER_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([A-Da-d])\)?[.:]?$").expect("LETTER_ONLY is a valid regex pattern")
});

static LETTER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([A-Da-d])\s*[).:\-]\s*\S").expect("LETTER_PREFIX is a valid regex pattern")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonicalAnswer {
    Letter(char),
    Boolean(bool),
    Text(String),
    Parts(Vec<String>),
    Empty,
}

impl CanonicalAnswer {
    pub fn to_value(&self) -> Value {
        match self {
            CanonicalAnswer::Letter(c) => Value::String(c.to_string()),
            CanonicalAnswer::Boolean(b) => Value::Bool(*b),
            CanonicalAnswer::Text(s) => Value::String(s.clone()),
            CanonicalAnswer::Parts(parts) => {
                Value::Array(parts.iter().cloned().map(Value::String).collect())
            }
            CanonicalAnswer::Empty => Value::Null,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CanonicalAnswer::Empty => true,
            CanonicalAnswer::Text(s) => s.is_empty(),
            CanonicalAnswer::Parts(p) => p.iter().all(|s| s.is_empty()),
            _ => false,
        }
    }
}

pub fn index_to_letter(index: i64) -> Option<char> {
    if (0..4).contains(&index) {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

pub fn letter_to_index(letter: char) -> Option<usize> {
    match letter.to_ascii_uppercase() {
        c @ 'A'..='D' => Some((c as u8 - b'A') as usize),
        _ => None,
    }
}

fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn value_to_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => normalize_text(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(value_to_text)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(" ")
        }
        Value::Object(_) => normalize_text(&raw.to_string()),
    }
}

/// Extract an answer letter from "B", "b)", "(c)", "B) Paris" or an index.
pub fn extract_letter(raw: &Value) -> Option<char> {
    match raw {
        Value::Number(n) => n.as_i64().and_then(index_to_letter),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(index) = s.parse::<i64>() {
                return index_to_letter(index);
            }
            LETTER_ONLY
                .captures(s)
                .or_else(|| LETTER_PREFIX.captures(s))
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().chars().next())
                .map(|c| c.to_ascii_uppercase())
        }
        _ => None,
    }
}

fn parse_boolean(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "t" | "1"),
        _ => false,
    }
}

/// Map a raw answer to its canonical, comparable form for `question_type`.
pub fn normalize(question_type: QuestionType, raw: &Value) -> CanonicalAnswer {
    if raw.is_null() {
        return CanonicalAnswer::Empty;
    }

    if question_type.is_choice() {
        return match extract_letter(raw) {
            Some(letter) => CanonicalAnswer::Letter(letter),
            None => CanonicalAnswer::Text(value_to_text(raw)),
        };
    }

    if question_type.is_boolean() {
        return CanonicalAnswer::Boolean(parse_boolean(raw));
    }

    if question_type.is_multi_part() {
        let parts = match raw {
            Value::Array(items) => items.iter().map(value_to_text).collect(),
            other => vec![value_to_text(other)],
        };
        return CanonicalAnswer::Parts(parts);
    }

    CanonicalAnswer::Text(value_to_text(raw))
}

/// Lowercase alphanumeric tokens longer than three characters.
pub fn content_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_CONTENT_WORD_CHARS)
        .map(str::to_string)
        .collect()
}

/// Word-overlap ratio between a user answer and the correct one.
///
/// A correct word matches when it contains, or is contained in, one of the
/// user's content words. The denominator is the smaller word count, floored
/// at half the correct answer's word count so one-word answers cannot match
/// long model answers.
pub fn text_overlap_ratio(user: &str, correct: &str) -> f64 {
    let correct_words = content_words(correct);
    let user_words = content_words(user);

    if correct_words.is_empty() {
        return if normalize_text(user) == normalize_text(correct) {
            1.0
        } else {
            0.0
        };
    }
    if user_words.is_empty() {
        return 0.0;
    }

    let matched = correct_words
        .iter()
        .filter(|cw| {
            user_words
                .iter()
                .any(|uw| uw.contains(cw.as_str()) || cw.contains(uw.as_str()))
        })
        .count();

    let floor = correct_words.len().div_ceil(2);
    let denominator = correct_words.len().min(user_words.len()).max(floor).max(1);
    (matched as f64 / denominator as f64).min(1.0)
}

fn texts_match(user: &str, correct: &str) -> bool {
    if user.is_empty() {
        return false;
    }
    user == correct || text_overlap_ratio(user, correct) >= TEXT_MATCH_THRESHOLD
}

/// Compare a user answer with the correct one for `question_type`.
pub fn answers_match(question_type: QuestionType, user: &Value, correct: &Value) -> bool {
    let user = normalize(question_type, user);
    let correct = normalize(question_type, correct);
    canonical_match(&user, &correct)
}

pub fn canonical_match(user: &CanonicalAnswer, correct: &CanonicalAnswer) -> bool {
    match (user, correct) {
        (CanonicalAnswer::Empty, _) | (_, CanonicalAnswer::Empty) => false,
        (CanonicalAnswer::Letter(u), CanonicalAnswer::Letter(c)) => u == c,
        (CanonicalAnswer::Boolean(u), CanonicalAnswer::Boolean(c)) => u == c,
        (CanonicalAnswer::Text(u), CanonicalAnswer::Text(c)) => texts_match(u, c),
        (CanonicalAnswer::Parts(u), CanonicalAnswer::Parts(c)) => {
            !c.is_empty() && u.len() == c.len() && u.iter().zip(c).all(|(u, c)| texts_match(u, c))
        }
        _ => false,
    }
}

/// Credit in `0.0..=1.0` using the same overlap measure as matching.
pub fn partial_credit(question_type: QuestionType, user: &Value, correct: &Value) -> f64 {
    let user = normalize(question_type, user);
    let correct = normalize(question_type, correct);

    match (&user, &correct) {
        (CanonicalAnswer::Text(u), CanonicalAnswer::Text(c)) => {
            if u.is_empty() {
                0.0
            } else if u == c {
                1.0
            } else {
                text_overlap_ratio(u, c)
            }
        }
        (CanonicalAnswer::Parts(u), CanonicalAnswer::Parts(c)) if !c.is_empty() => {
            let total: f64 = c
                .iter()
                .enumerate()
                .map(|(i, c)| match u.get(i) {
                    Some(u) if u == c && !u.is_empty() => 1.0,
                    Some(u) if !u.is_empty() => text_overlap_ratio(u, c),
                    _ => 0.0,
                })
                .sum();
            total / c.len() as f64
        }
        _ => {
            if canonical_match(&user, &correct) {
                1.0
            } else {
                0.0
            }
        }
    }
}
