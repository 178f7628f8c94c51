//! Sentence splitting using the seams library (dialog-aware).
//!
//! seams only protects title abbreviations ("Dr.", "Mr.", initials). Latin
//! and reference abbreviations such as "etc." or "e.g." followed by a
//! capitalized word are joined back onto the next sentence here.

use seams::sentence_detector::dialog_detector::SentenceDetectorDialog;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Global detector instance (lazy initialization).
static DETECTOR: OnceLock<SentenceDetectorDialog> = OnceLock::new();

/// Abbreviations that never end a sentence, compared lowercase.
const CONTINUATIONS: &[&str] = &[
    "approx.", "cf.", "e.g.", "etc.", "fig.", "i.e.", "viz.", "vol.", "vs.",
];

fn detector() -> Result<&'static SentenceDetectorDialog> {
    if let Some(detector) = DETECTOR.get() {
        return Ok(detector);
    }
    let detector = SentenceDetectorDialog::new().map_err(detection_error)?;
    Ok(DETECTOR.get_or_init(|| detector))
}

fn detection_error(e: anyhow::Error) -> Error {
    Error::SentenceDetection {
        message: format!("{:#}", e),
    }
}

/// Split text into sentences.
///
/// Each sentence is a trimmed slice of `text`. The returned iterator can be
/// cloned to walk the same sentences again.
pub fn split_sentences(text: &str) -> Result<Sentences<'_>> {
    let detected = detector()?
        .detect_sentences_borrowed(text)
        .map_err(detection_error)?;

    let mut spans: Vec<&str> = Vec::with_capacity(detected.len());
    let mut joining = false;
    for sentence in detected {
        let span = sentence.raw_content.trim();
        if span.is_empty() {
            continue;
        }

        if joining && let Some(last) = spans.last_mut() {
            *last = join(text, *last, span);
        } else {
            spans.push(span);
        }
        joining = ends_with_continuation(span);
    }

    Ok(Sentences {
        inner: spans.into_iter(),
    })
}

/// Iterator over the sentences of a text.
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    inner: std::vec::IntoIter<&'a str>,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// The slice of `text` running from the start of `first` to the end of `second`.
///
/// Both must be subslices of `text`, with `second` after `first`.
fn join<'a>(text: &'a str, first: &str, second: &str) -> &'a str {
    let base = text.as_ptr() as usize;
    let start = first.as_ptr() as usize - base;
    let end = second.as_ptr() as usize - base + second.len();
    &text[start..end]
}

fn ends_with_continuation(sentence: &str) -> bool {
    let Some(word) = sentence.split_whitespace().last() else {
        return false;
    };
    let word = word
        .trim_start_matches(|c: char| matches!(c, '(' | '[' | '"' | '\'' | '“' | '‘'))
        .to_lowercase();
    CONTINUATIONS.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<&str> {
        split_sentences(text).unwrap().collect()
    }

    #[test]
    fn test_detector_available() {
        assert!(detector().is_ok());
    }

    #[test]
    fn test_basic_sentences() {
        assert_eq!(split("Hello world. Goodbye."), vec!["Hello world.", "Goodbye."]);
        assert_eq!(
            split("Is it? Yes! It is."),
            vec!["Is it?", "Yes!", "It is."]
        );
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split("").is_empty());
        assert!(split("   \n\t ").is_empty());
    }

    #[test]
    fn test_no_terminal_punctuation() {
        assert_eq!(split("  just some words  "), vec!["just some words"]);
    }

    #[test]
    fn test_titles_and_initials() {
        assert_eq!(
            split("Mr. Smith met Dr. Jones. They talked."),
            vec!["Mr. Smith met Dr. Jones.", "They talked."]
        );
        assert_eq!(
            split("J. R. R. Tolkien wrote it. Really."),
            vec!["J. R. R. Tolkien wrote it.", "Really."]
        );
    }

    #[test]
    fn test_etc_before_capital_does_not_split() {
        assert_eq!(
            split("Bring fruit, pears, etc. Also water. Done."),
            vec!["Bring fruit, pears, etc. Also water.", "Done."]
        );
        assert_eq!(
            split("Use a tool, e.g. A hammer. Done."),
            vec!["Use a tool, e.g. A hammer.", "Done."]
        );
    }

    #[test]
    fn test_numbers_urls_and_emails() {
        assert_eq!(
            split("It costs 3.50 dollars. Cheap!"),
            vec!["It costs 3.50 dollars.", "Cheap!"]
        );
        assert_eq!(
            split("Visit https://example.com/a.html?x=1 today. Then write to me@example.org. Bye."),
            vec![
                "Visit https://example.com/a.html?x=1 today.",
                "Then write to me@example.org.",
                "Bye."
            ]
        );
    }

    #[test]
    fn test_lowercase_continuation() {
        assert_eq!(
            split("Wait... what happened? Nothing."),
            vec!["Wait... what happened?", "Nothing."]
        );
    }

    #[test]
    fn test_restartable() {
        let sentences = split_sentences("One. Two.").unwrap();
        let first: Vec<_> = sentences.clone().collect();
        let second: Vec<_> = sentences.collect();
        assert_eq!(first, vec!["One.", "Two."]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reconstruction() {
        let text = "First one.  Second one?\nThird one, etc. Fourth one!";
        let joined = split(text).join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&joined), normalize(text));
    }
}
