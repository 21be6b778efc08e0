//! Frontmatter (metadata block) parsing and rewriting.
//!
//! A metadata block is a `---` delimited region at the very start of a
//! document. Parsing keeps every field's raw lines verbatim, so rendering a
//! block back out is byte-for-byte stable for untouched fields: no
//! reordering, no re-quoting, no whitespace churn. Only the tags field is
//! ever synthesized by this crate.
//!
//! A document whose opening delimiter is missing entirely has no metadata.
//! An opening delimiter without a well-formed close makes [`parse`] return
//! `None` and [`classify`] report the document as malformed rather than
//! guessing at where the block ends.

/// Structural classification of a document's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// No metadata block at all.
    NoMetadata,
    /// Well-formed metadata block without a tags field.
    MetadataNoTags,
    /// Well-formed metadata block with a tags field.
    MetadataWithTags,
}

/// One field of a metadata block: the key plus its raw lines (first line
/// included), exactly as they appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    lines: Vec<String>,
}

/// A parsed metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    fields: Vec<Field>,
    body_start: usize,
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches('\r') == "---"
}

/// True when the document's first line is an opening delimiter.
#[must_use]
pub fn has_opening_delimiter(text: &str) -> bool {
    match text.find('\n') {
        Some(i) => is_delimiter(&text[..i]),
        None => is_delimiter(text),
    }
}

/// Parses the leading metadata block.
///
/// Returns `None` when the document does not start with a delimiter line, or
/// when no closing delimiter exists (a partial block is not a block).
#[must_use]
pub fn parse(text: &str) -> Option<Block> {
    let first_end = text.find('\n')?;
    if !is_delimiter(&text[..first_end]) {
        return None;
    }

    let mut pos = first_end + 1;
    let mut raw_lines: Vec<&str> = Vec::new();

    while pos <= text.len() {
        let rest = &text[pos..];
        match rest.find('\n') {
            Some(i) => {
                let line = &rest[..i];
                if is_delimiter(line) {
                    return Some(Block {
                        fields: group_fields(&raw_lines),
                        body_start: pos + i + 1,
                    });
                }
                raw_lines.push(line);
                pos += i + 1;
            }
            None => {
                // Last line without a trailing newline.
                if is_delimiter(rest) {
                    return Some(Block {
                        fields: group_fields(&raw_lines),
                        body_start: text.len(),
                    });
                }
                return None;
            }
        }
    }

    None
}

/// Returns the document body with any well-formed metadata block stripped.
#[must_use]
pub fn body(text: &str) -> &str {
    match parse(text) {
        Some(block) => &text[block.body_start..],
        None => text,
    }
}

/// Classifies a document by metadata shape.
///
/// Returns `None` for the malformed case: an opening delimiter with no
/// well-formed close. Callers surface that as an error instead of rewriting
/// a document they cannot safely reconstruct.
#[must_use]
pub fn classify(text: &str) -> Option<DocumentShape> {
    if !has_opening_delimiter(text) {
        return Some(DocumentShape::NoMetadata);
    }
    parse(text).map(|block| {
        if block.has_field("tags") {
            DocumentShape::MetadataWithTags
        } else {
            DocumentShape::MetadataNoTags
        }
    })
}

/// Groups raw block lines into fields. A line that starts a new field is one
/// that is not indented, not a list item, and not blank; everything else
/// attaches to the preceding field.
fn group_fields(lines: &[&str]) -> Vec<Field> {
    let mut fields: Vec<Field> = Vec::new();

    for line in lines {
        let continuation = line.starts_with(' ')
            || line.starts_with('\t')
            || line.starts_with("- ")
            || line.trim().is_empty();

        if continuation && let Some(last) = fields.last_mut() {
            last.lines.push((*line).to_string());
            continue;
        }

        let key = line
            .split(':')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        fields.push(Field {
            key,
            lines: vec![(*line).to_string()],
        });
    }

    fields
}

impl Block {
    /// True when a field with the given key exists.
    #[must_use]
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }

    /// Extracts the tags field's values, handling block lists, inline lists,
    /// and plain comma-separated scalars. Quoted entries are unquoted.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        let Some(field) = self.fields.iter().find(|f| f.key == "tags") else {
            return Vec::new();
        };

        let rest = field.lines[0]
            .splitn(2, ':')
            .nth(1)
            .unwrap_or("")
            .trim()
            .to_string();

        let mut out = Vec::new();
        if rest.is_empty() {
            for line in field.lines.iter().skip(1) {
                if let Some(item) = line.trim().strip_prefix("- ") {
                    out.push(unquote(item.trim()));
                }
            }
        } else if rest.starts_with('[') && rest.ends_with(']') {
            for item in rest[1..rest.len() - 1].split(',') {
                out.push(unquote(item.trim()));
            }
        } else {
            for item in rest.split(',') {
                out.push(unquote(item.trim()));
            }
        }

        out.retain(|t| !t.is_empty());
        out
    }

    /// Returns a block with the tags field replaced (in place, other fields
    /// untouched) or inserted at the end when absent.
    #[must_use]
    pub fn with_tags(mut self, tags: &[String]) -> Block {
        let field = Field {
            key: "tags".to_string(),
            lines: tags_field_lines(tags),
        };
        if let Some(existing) = self.fields.iter_mut().find(|f| f.key == "tags") {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Serializes the block followed by the given body.
    ///
    /// Untouched fields are emitted from their stored raw lines, byte for
    /// byte.
    #[must_use]
    pub fn render(&self, body: &str) -> String {
        let mut out = String::from("---\n");
        for field in &self.fields {
            for line in &field.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("---\n");
        out.push_str(body);
        out
    }
}

/// Formats a tag list as frontmatter field lines.
///
/// A single tag is emitted as an inline list; multiple tags are emitted as a
/// block list, one per line.
#[must_use]
pub fn tags_field_lines(tags: &[String]) -> Vec<String> {
    match tags.len() {
        0 => vec!["tags: []".to_string()],
        1 => vec![format!("tags: [{}]", quote_scalar(&tags[0]))],
        _ => {
            let mut lines = vec!["tags:".to_string()];
            lines.extend(tags.iter().map(|t| format!("  - {}", quote_scalar(t))));
            lines
        }
    }
}

/// Synthesizes a fresh metadata block containing only the tags field,
/// prepended to the original body with a separating blank line.
#[must_use]
pub fn synthesize(tags: &[String], body: &str) -> String {
    let mut out = String::from("---\n");
    for line in tags_field_lines(tags) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out
}

/// Quotes a scalar value when its content would corrupt the block format.
///
/// Control characters are replaced with spaces first; values containing
/// structurally significant characters, with leading/trailing whitespace, or
/// that would re-read as boolean/null/numeric are wrapped in double quotes
/// with backslash escaping of backslashes and quotes.
#[must_use]
pub fn quote_scalar(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if needs_quoting(&cleaned) || cleaned != value {
        format!(
            "\"{}\"",
            cleaned.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        cleaned
    }
}

fn needs_quoting(value: &str) -> bool {
    if value.is_empty() || value != value.trim() {
        return true;
    }
    if value.chars().any(|c| {
        matches!(
            c,
            ':' | '#' | '[' | ']' | '{' | '}' | '"' | '\'' | ',' | '&' | '*' | '|' | '>' | '\\'
        )
    }) {
        return true;
    }
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "null" | "~" | "on" | "off"
    ) || value.parse::<f64>().is_ok()
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else {
        value.to_string()
    }
}
