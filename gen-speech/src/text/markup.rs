//! Structure-preserving chunking for SSML input.
//!
//! Each text node is packed with the plain-text rules, and every resulting
//! piece is wrapped in the full stack of elements open at that point, so
//! each fragment can be sent to a provider on its own. CDATA sections are
//! text: their content is escaped and packed with the surrounding text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::chunker::chunk_escaped_text;
use crate::error::{Error, Result};

/// Tags, CDATA sections, plus comments, processing instructions and doctypes (ignored).
static MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<!--[\s\S]*?-->|<\?[\s\S]*?\?>|<!\[CDATA\[[\s\S]*?\]\]>|<![A-Za-z][^>]*>|<(/?)([A-Za-z_][\w:.\-]*)((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'))?)*)\s*(/?)>"#,
    )
    .expect("markup pattern should compile")
});

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// An open element: tag name plus its attribute text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    name: String,
    attributes: String,
}

/// Parser state for one document.
#[derive(Debug)]
struct MarkupChunker {
    max_length: usize,
    /// Ancestors of the current position, outermost first
    open: Vec<Element>,
    /// Self-closing tags seen since the last text node
    pending: String,
    /// Text of the current node, escaped
    text: String,
    fragments: Vec<String>,
}

impl MarkupChunker {
    fn new(max_length: usize) -> Self {
        Self {
            max_length,
            open: Vec::new(),
            pending: String::new(),
            text: String::new(),
            fragments: Vec::new(),
        }
    }

    fn wrap(&self, body: &str) -> String {
        let mut out = String::new();
        for element in &self.open {
            out.push('<');
            out.push_str(&element.name);
            out.push_str(&element.attributes);
            out.push('>');
        }
        out.push_str(body);
        for element in self.open.iter().rev() {
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
        out
    }

    fn push_text(&mut self, text: &str, offset: usize) -> Result<()> {
        if let Some(pos) = text.find('<') {
            return Err(Error::Markup {
                message: "unexpected '<'".to_string(),
                offset: offset + pos,
            });
        }
        self.text.push_str(text);
        Ok(())
    }

    fn push_cdata(&mut self, content: &str) {
        for c in content.chars() {
            match c {
                '&' => self.text.push_str("&amp;"),
                '<' => self.text.push_str("&lt;"),
                '>' => self.text.push_str("&gt;"),
                c => self.text.push(c),
            }
        }
    }

    /// Pack the current text node into fragments.
    fn flush_text(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.text);
        if text.trim().is_empty() {
            return Ok(());
        }

        let pieces = chunk_escaped_text(&text, self.max_length)?;
        for (i, piece) in pieces.iter().enumerate() {
            let fragment = if i == 0 && !self.pending.is_empty() {
                self.wrap(&format!("{}{}", self.pending, piece))
            } else {
                self.wrap(piece)
            };
            self.fragments.push(fragment);
        }
        self.pending.clear();
        Ok(())
    }

    /// Emit buffered self-closing tags that no text node followed.
    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let fragment = self.wrap(&self.pending);
            self.fragments.push(fragment);
            self.pending.clear();
        }
    }

    fn tag(&mut self, caps: &Captures<'_>, raw: &str, offset: usize) -> Result<()> {
        self.flush_text()?;
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let attributes = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        if closing {
            self.flush_pending();
            match self.open.pop() {
                Some(element) if element.name == name => Ok(()),
                Some(element) => Err(Error::Markup {
                    message: format!("expected </{}> but found </{}>", element.name, name),
                    offset,
                }),
                None => Err(Error::Markup {
                    message: format!("unexpected </{}> with no open element", name),
                    offset,
                }),
            }
        } else if self_closing {
            self.pending.push_str(raw);
            Ok(())
        } else {
            self.open.push(Element {
                name: name.to_string(),
                attributes: attributes.to_string(),
            });
            Ok(())
        }
    }

    fn finish(mut self, end: usize) -> Result<Vec<String>> {
        self.flush_text()?;
        if let Some(element) = self.open.last() {
            return Err(Error::Markup {
                message: format!("<{}> is never closed", element.name),
                offset: end,
            });
        }
        self.flush_pending();
        Ok(self.fragments)
    }
}

/// Split a markup document into independently well-formed fragments.
///
/// The text limit applies to the text content of each fragment; the
/// replicated ancestor tags are not counted.
pub fn chunk_markup(document: &str, max_length: usize) -> Result<Vec<String>> {
    let mut chunker = MarkupChunker::new(max_length);
    let mut cursor = 0;

    for caps in MARKUP.captures_iter(document) {
        let Some(whole) = caps.get(0) else { continue };
        chunker.push_text(&document[cursor..whole.start()], cursor)?;
        cursor = whole.end();

        let raw = whole.as_str();
        if let Some(content) = raw
            .strip_prefix(CDATA_OPEN)
            .and_then(|rest| rest.strip_suffix(CDATA_CLOSE))
        {
            chunker.push_cdata(content);
        } else if caps.get(2).is_some() {
            // Comments and declarations have no name group
            chunker.tag(&caps, raw, whole.start())?;
        }
    }
    chunker.push_text(&document[cursor..], cursor)?;

    let fragments = chunker.finish(document.len())?;
    log::debug!("split markup into {} fragment(s)", fragments.len());
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Text content with tags removed and whitespace collapsed.
    fn text_content(markup: &str) -> String {
        let stripped = MARKUP.replace_all(markup, " ");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_wraps_every_piece_in_ancestors() {
        let fragments = chunk_markup("<speak><p>Hi there</p></speak>", 5).unwrap();
        assert_eq!(
            fragments,
            vec!["<speak><p>Hi</p></speak>", "<speak><p>there</p></speak>"]
        );
    }

    #[test]
    fn test_attributes_are_kept_verbatim() {
        let doc = r#"<speak><prosody rate="slow" pitch='+2st'>One. Two.</prosody></speak>"#;
        let fragments = chunk_markup(doc, 4).unwrap();
        assert_eq!(
            fragments,
            vec![
                r#"<speak><prosody rate="slow" pitch='+2st'>One.</prosody></speak>"#,
                r#"<speak><prosody rate="slow" pitch='+2st'>Two.</prosody></speak>"#,
            ]
        );
    }

    #[test]
    fn test_self_closing_tag_joins_next_text() {
        let doc = r#"<speak>Hello<break time="1s"/>World</speak>"#;
        let fragments = chunk_markup(doc, 100).unwrap();
        assert_eq!(
            fragments,
            vec![
                "<speak>Hello</speak>",
                r#"<speak><break time="1s"/>World</speak>"#,
            ]
        );
    }

    #[test]
    fn test_trailing_self_closing_tag_is_kept() {
        let doc = "<speak>Hello<break/>\n</speak>";
        let fragments = chunk_markup(doc, 100).unwrap();
        assert_eq!(fragments, vec!["<speak>Hello</speak>", "<speak><break/></speak>"]);
    }

    #[test]
    fn test_sibling_elements() {
        let doc = "<speak><s>First.</s> <s>Second.</s></speak>";
        let fragments = chunk_markup(doc, 100).unwrap();
        assert_eq!(
            fragments,
            vec!["<speak><s>First.</s></speak>", "<speak><s>Second.</s></speak>"]
        );
    }

    #[test]
    fn test_declarations_and_comments_are_skipped() {
        let doc = "<?xml version=\"1.0\"?>\n<speak><!-- note -->Hi.</speak>\n";
        let fragments = chunk_markup(doc, 100).unwrap();
        assert_eq!(fragments, vec!["<speak>Hi.</speak>"]);
    }

    #[test]
    fn test_cdata_is_escaped_text() {
        let doc = "<speak><p><![CDATA[Tom & Jerry]]> again.</p></speak>";
        let fragments = chunk_markup(doc, 100).unwrap();
        assert_eq!(fragments, vec!["<speak><p>Tom &amp; Jerry again.</p></speak>"]);

        let fragments = chunk_markup("<speak><![CDATA[1 < 2]]></speak>", 100).unwrap();
        assert_eq!(fragments, vec!["<speak>1 &lt; 2</speak>"]);
    }

    #[test]
    fn test_force_split_keeps_entities_whole() {
        let fragments = chunk_markup("<speak>aaaa&amp;bbbb</speak>", 6).unwrap();
        assert_eq!(
            fragments,
            vec![
                "<speak>aaaa</speak>",
                "<speak>&amp;b</speak>",
                "<speak>bbb</speak>",
            ]
        );
        for fragment in &fragments {
            assert_eq!(chunk_markup(fragment, 100).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_mismatched_close_tag() {
        let err = chunk_markup("<speak><p>Hi</speak>", 100).unwrap_err();
        match err {
            Error::Markup { message, offset } => {
                assert!(message.contains("</p>"));
                assert_eq!(offset, 12);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        assert!(matches!(
            chunk_markup("<speak>Hi", 100),
            Err(Error::Markup { .. })
        ));
        assert!(matches!(
            chunk_markup("Hi</speak>", 100),
            Err(Error::Markup { .. })
        ));
        assert!(matches!(
            chunk_markup("<speak>1 < 2</speak>", 100),
            Err(Error::Markup { .. })
        ));
    }

    #[test]
    fn test_fragments_are_well_formed_and_lossless() {
        let doc = r#"<speak><p><s>The quick brown fox jumps over the lazy dog.</s><s>It was <emphasis level="strong">very</emphasis> quick indeed.</s></p><break time="500ms"/><p>Done.</p></speak>"#;
        let fragments = chunk_markup(doc, 12).unwrap();

        for fragment in &fragments {
            let reparsed = chunk_markup(fragment, 10_000).unwrap();
            assert_eq!(reparsed.len(), 1, "fragment re-split: {}", fragment);
            assert!(fragment.starts_with("<speak>") && fragment.ends_with("</speak>"));
        }

        let joined: Vec<String> = fragments.iter().map(|f| text_content(f)).collect();
        assert_eq!(joined.join(" "), text_content(doc));
    }
}
