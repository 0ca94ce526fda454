//! Markdown parsing and serialization with frontmatter support.
//!
//! Notes are stored as a frontmatter block followed by the markdown body.
//! The block is written one `key: <json value>` per line, which keeps it
//! valid YAML, so reading goes through `serde_yaml`.

use std::collections::HashMap;

/// Parsed markdown document
#[derive(Debug, Clone)]
pub struct ParsedMarkdown {
    /// Frontmatter as key-value pairs (None if no frontmatter)
    pub frontmatter: Option<HashMap<String, serde_yaml::Value>>,
    /// Markdown body (everything after frontmatter)
    pub body: String,
}

impl ParsedMarkdown {
    /// String value of a frontmatter key.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(|v| v.as_str())
    }

    /// Boolean value of a frontmatter key.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(|v| v.as_bool())
    }

    /// String list value of a frontmatter key. Non-string items are dropped.
    pub fn list_field(&self, key: &str) -> Option<Vec<String>> {
        self.field(key).and_then(|v| v.as_sequence()).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    fn field(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.frontmatter.as_ref().and_then(|fm| fm.get(key))
    }
}

/// Parse a markdown file into frontmatter and body.
///
/// Frontmatter must be delimited by `---` at the start of the file:
/// ```markdown
/// ---
/// id: "n1"
/// tags: ["a","b"]
/// ---
///
/// # Content here
/// ```
pub fn parse(content: &str) -> ParsedMarkdown {
    if !content.starts_with("---") {
        return ParsedMarkdown {
            frontmatter: None,
            body: content.to_string(),
        };
    }

    let rest = &content[3..];
    let closing = rest.find("\n---");

    match closing {
        Some(pos) => {
            let yaml_content = rest[..pos].trim();
            let body_start = pos + 4; // Skip "\n---"

            let body = rest[body_start..].trim_start_matches('\n').to_string();

            let frontmatter =
                match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(yaml_content) {
                    Ok(fm) if !fm.is_empty() => Some(fm),
                    Ok(_) => None,
                    Err(_) => None, // Invalid YAML, treat as no frontmatter
                };

            ParsedMarkdown { frontmatter, body }
        }
        None => ParsedMarkdown {
            frontmatter: None,
            body: content.to_string(),
        },
    }
}

/// Serialize ordered frontmatter fields and a body back to markdown.
///
/// Each value is written as compact JSON on its own line.
pub fn serialize(fields: &[(&str, serde_json::Value)], body: &str) -> String {
    if fields.is_empty() {
        return body.to_string();
    }

    let mut out = String::from("---\n");
    for (key, value) in fields {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out
}

/// Split a leading `# heading` line off a body.
///
/// Returns the heading text and the remainder with the single blank line
/// after the heading and the single trailing newline removed.
pub fn split_title(body: &str) -> (Option<String>, String) {
    let Some(after_marker) = body.strip_prefix("# ") else {
        return (None, body.to_string());
    };

    let (title, rest) = match after_marker.split_once('\n') {
        Some((title, rest)) => (title, rest),
        None => (after_marker, ""),
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let rest = rest.strip_suffix('\n').unwrap_or(rest);

    (Some(title.trim_end_matches('\r').to_string()), rest.to_string())
}
