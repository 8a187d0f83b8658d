//! Japanese detection and segment-wise translation
//!
//! Only runs of Japanese characters are sent to the translator. Everything
//! else (ASCII, Hangul, punctuation, ticket keys) is kept byte for byte.

use std::future::Future;
use std::sync::OnceLock;

use regex::Regex;

/// Hiragana, Katakana, CJK ideographs (incl. extension A and compatibility) and
/// half-width Katakana.
const JAPANESE_CLASS: &str = r"[\x{3040}-\x{30FF}\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}\x{F900}-\x{FAFF}\x{FF66}-\x{FF9F}]";

pub const SOURCE_LANGUAGE: &str = "ja";
pub const TARGET_LANGUAGE: &str = "ko";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(String),
    #[error("unexpected translation response: {0}")]
    Response(String),
}

/// A machine translation backend.
pub trait Translator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> impl Future<Output = Result<String, TranslateError>>;
}

/// A run of text that is either entirely Japanese or entirely not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub japanese: bool,
}

fn japanese_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("{JAPANESE_CLASS}+")).unwrap())
}

pub fn contains_japanese(text: &str) -> bool {
    japanese_run().is_match(text)
}

/// Split `text` into alternating Japanese and non-Japanese runs.
///
/// Concatenating the segments yields `text` again.
pub fn segment_japanese(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in japanese_run().find_iter(text) {
        if m.start() > last {
            segments.push(Segment {
                text: &text[last..m.start()],
                japanese: false,
            });
        }
        segments.push(Segment {
            text: m.as_str(),
            japanese: true,
        });
        last = m.end();
    }

    if last < text.len() {
        segments.push(Segment {
            text: &text[last..],
            japanese: false,
        });
    }

    segments
}

/// Translate the Japanese runs of `text` to Korean, leaving the rest alone.
///
/// A run whose translation fails or comes back empty keeps its original text.
pub async fn translate_japanese_segments<T: Translator>(translator: &T, text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for segment in segment_japanese(text) {
        if !segment.japanese || segment.text.trim().is_empty() {
            out.push_str(segment.text);
            continue;
        }

        match translator
            .translate(segment.text, SOURCE_LANGUAGE, TARGET_LANGUAGE)
            .await
        {
            Ok(translated) if !translated.is_empty() => out.push_str(&translated),
            _ => out.push_str(segment.text),
        }
    }

    out
}

/// [`translate_japanese_segments`] when `text` has any Japanese, otherwise `text`.
pub async fn translate_if_japanese<T: Translator>(translator: &T, text: &str) -> String {
    if contains_japanese(text) {
        translate_japanese_segments(translator, text).await
    } else {
        text.to_string()
    }
}
