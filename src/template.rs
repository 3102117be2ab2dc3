//! Message templates with flat `{Field}` placeholders.
//!
//! Document format:
//!
//! ```text
//! Subject: Connecting about roles at {Company}
//! Hello {Name},
//! ...
//! ```
//!
//! The first line becomes the subject template when it starts with
//! `Subject:` (any case); every following line is the body, verbatim. Without
//! a subject line the whole document is the body and [`DEFAULT_SUBJECT`] is
//! used.

use std::path::Path;

use tracing::info;

use crate::error::{MailcastError, Result};
use crate::model::message::RenderedMessage;
use crate::model::record::{Record, FIELD_COMPANY, FIELD_EMAIL, FIELD_NAME, FIELD_SNO, FIELD_TITLE};

/// Template file looked for in the working directory when none is given.
pub const DEFAULT_TEMPLATE_FILE: &str = "email_template.txt";

/// Subject used when a template document has no `Subject:` line.
pub const DEFAULT_SUBJECT: &str = "Hello {Name} — Opportunity to connect";

const SUBJECT_MARKER: &str = "subject:";

const BUILTIN_SUBJECT: &str = "Connecting about potential opportunities at {Company}";

const BUILTIN_BODY: &str = "Hello {Name},

I hope you're doing well. I'm reaching out because I'm interested in roles at {Company} that match my background. I saw your profile as {Title} and thought you'd be the best person to connect with.

A quick snapshot: I'm a software engineer with experience in Java, Python and cloud technologies.

I've attached my resume for your review. If appropriate, I'd appreciate 10-15 minutes of your time for a quick chat.

Thanks,
Your Name
Email: your.email@example.com
";

/// A subject/body template pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub subject: String,
    pub body: String,
}

impl Default for Template {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Template {
    /// The built-in template.
    pub fn builtin() -> Self {
        Self {
            subject: BUILTIN_SUBJECT.to_string(),
            body: BUILTIN_BODY.to_string(),
        }
    }

    /// Parse a template document.
    pub fn parse(document: &str) -> Self {
        let (first, rest) = match document.split_once('\n') {
            Some((first, rest)) => (first.strip_suffix('\r').unwrap_or(first), rest),
            None => (document, ""),
        };

        match strip_subject_marker(first) {
            Some(subject) => Self {
                subject: subject.trim().to_string(),
                body: rest.to_string(),
            },
            None => Self {
                subject: DEFAULT_SUBJECT.to_string(),
                body: document.to_string(),
            },
        }
    }

    /// Load a template file, or the built-in template when `path` is `None`.
    ///
    /// A path that was given but cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No template file; using built-in default template");
            return Ok(Self::builtin());
        };

        let document = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MailcastError::config(format!("template not found: {}", path.display()))
            } else {
                MailcastError::Template {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;
        info!(path = %path.display(), "Loaded template");
        Ok(Self::parse(&document))
    }

    /// Render subject and body for a record.
    pub fn render(&self, record: &Record) -> (String, String) {
        (
            substitute(&self.subject, record),
            substitute(&self.body, record),
        )
    }

    /// Render a complete message for a record.
    pub fn render_message(&self, record: &Record, attachment: &Path) -> RenderedMessage {
        let (subject, body) = self.render(record);
        RenderedMessage {
            sno: record.sno(),
            recipient: record.recipient(),
            subject,
            body,
            attachment: attachment.to_path_buf(),
        }
    }
}

fn strip_subject_marker(line: &str) -> Option<&str> {
    let head = line.get(..SUBJECT_MARKER.len())?;
    head.eq_ignore_ascii_case(SUBJECT_MARKER)
        .then(|| &line[SUBJECT_MARKER.len()..])
}

/// Replace recognized placeholders in one left-to-right pass.
///
/// Substituted values are never rescanned, so a name containing `{Company}`
/// stays literal. Unknown `{...}` tokens and unbalanced braces are copied
/// through unchanged.
fn substitute(text: &str, record: &Record) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        let value = candidate
            .find('}')
            .and_then(|close| lookup(&candidate[1..close], record).map(|v| (v, close)));

        match value {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &candidate[close + 1..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup(name: &str, record: &Record) -> Option<String> {
    match name {
        FIELD_SNO => Some(record.sno().to_string()),
        FIELD_NAME => Some(record.name().to_string()),
        FIELD_EMAIL => Some(record.email().to_string()),
        FIELD_TITLE => Some(record.title().to_string()),
        FIELD_COMPANY => Some(record.company().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> Record {
        Record::new(1, "Ann", "ann@x.com", "Eng", "Acme")
    }

    #[test]
    fn test_subject_and_body() {
        let t = Template::parse("Subject: Hi {Name}\n{Company} role");
        let (subject, body) = t.render(&ann());
        assert_eq!(subject, "Hi Ann");
        assert_eq!(body, "Acme role");
    }

    #[test]
    fn test_subject_marker_case_insensitive() {
        let t = Template::parse("SUBJECT:   Hi\r\nBody");
        assert_eq!(t.subject, "Hi");
        assert_eq!(t.body, "Body");
    }

    #[test]
    fn test_body_verbatim_with_blank_lines() {
        let t = Template::parse("Subject: x\n\nHello\n\n\nBye\n");
        assert_eq!(t.body, "\nHello\n\n\nBye\n");
    }

    #[test]
    fn test_no_subject_line_uses_default() {
        let t = Template::parse("Dear {Name}");
        let (subject, body) = t.render(&ann());
        assert_eq!(subject, "Hello Ann — Opportunity to connect");
        assert_eq!(body, "Dear Ann");
    }

    #[test]
    fn test_all_placeholders() {
        let t = Template::parse("Subject: {SNo}\n{Name}|{Email}|{Title}|{Company}");
        let record = Record::new(42, "Ann", "ann@x.com", "Eng", "Acme");
        let (subject, body) = t.render(&record);
        assert_eq!(subject, "42");
        assert_eq!(body, "Ann|ann@x.com|Eng|Acme");
    }

    #[test]
    fn test_unknown_tokens_left_verbatim() {
        let t = Template::parse("Subject: {Unknown} {Name}\nbraces { here } and {name} and {");
        let (subject, body) = t.render(&ann());
        assert_eq!(subject, "{Unknown} Ann");
        assert_eq!(body, "braces { here } and {name} and {");
    }

    #[test]
    fn test_nested_brace_before_placeholder() {
        let (_, body) = Template::parse("Subject: s\n{{Name}}").render(&ann());
        assert_eq!(body, "{Ann}");
    }

    #[test]
    fn test_substitution_not_recursive() {
        let record = Record::new(1, "{Company}", "ann@x.com", "Eng", "Acme");
        let (_, body) = Template::parse("Subject: s\n{Name} at {Company}").render(&record);
        assert_eq!(body, "{Company} at Acme");
    }

    #[test]
    fn test_render_is_pure() {
        let t = Template::builtin();
        let a = t.render(&ann());
        let b = t.render(&ann());
        assert_eq!(a, b);
    }

    #[test]
    fn test_builtin_mentions_fields() {
        let (subject, body) = Template::builtin().render(&ann());
        assert!(subject.contains("Acme"));
        assert!(body.starts_with("Hello Ann,"));
        assert!(body.contains("as Eng"));
    }

    #[test]
    fn test_load_none_is_builtin() {
        assert_eq!(Template::load(None).unwrap(), Template::builtin());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("t.txt");
        assert!(matches!(
            Template::load(Some(&missing)),
            Err(MailcastError::Config(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.txt");
        std::fs::write(&path, "Subject: Hi {Name}\nBody").unwrap();
        let t = Template::load(Some(&path)).unwrap();
        assert_eq!(t.subject, "Hi {Name}");
        assert_eq!(t.body, "Body");
    }

    #[test]
    fn test_render_message() {
        let msg = Template::parse("Subject: Hi {Name}\nBody").render_message(&ann(), Path::new("cv.pdf"));
        assert_eq!(msg.sno, 1);
        assert_eq!(msg.recipient.address, "ann@x.com");
        assert_eq!(msg.subject, "Hi Ann");
        assert_eq!(msg.attachment, Path::new("cv.pdf"));
    }
}
