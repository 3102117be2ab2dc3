//! Rendered messages, ready for the transport.

use std::path::PathBuf;

use super::address::Recipient;

/// One personalized message.
///
/// Produced fresh for every record; rendering the same record twice yields an
/// identical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Ordinal of the originating record, for correlation with the run log.
    pub sno: u64,

    /// Who the message goes to.
    pub recipient: Recipient,

    /// Rendered subject line.
    pub subject: String,

    /// Rendered plain-text body.
    pub body: String,

    /// The run-wide attachment file.
    pub attachment: PathBuf,
}

impl RenderedMessage {
    /// HTML rendering of the plain-text body.
    ///
    /// Escapes markup characters, turns blank-line separated blocks into
    /// paragraphs and single newlines into `<br>`.
    pub fn html_body(&self) -> String {
        let mut html = String::from("<html><body>\n");
        let normalized = self.body.replace("\r\n", "\n");
        for paragraph in normalized.split("\n\n") {
            if paragraph.trim().is_empty() {
                continue;
            }
            html.push_str("<p>");
            let lines: Vec<String> = paragraph.lines().map(escape_html).collect();
            html.push_str(&lines.join("<br>\n"));
            html.push_str("</p>\n");
        }
        html.push_str("</body></html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> RenderedMessage {
        RenderedMessage {
            sno: 1,
            recipient: Recipient::new("Ann", "ann@x.com"),
            subject: "Hi".to_string(),
            body: body.to_string(),
            attachment: PathBuf::from("resume.pdf"),
        }
    }

    #[test]
    fn test_html_paragraphs() {
        let html = message("Hello Ann,\n\nLine one\nLine two").html_body();
        assert!(html.contains("<p>Hello Ann,</p>"));
        assert!(html.contains("<p>Line one<br>\nLine two</p>"));
    }

    #[test]
    fn test_html_escaping() {
        let html = message("R&D <team> \"x\"").html_body();
        assert!(html.contains("R&amp;D &lt;team&gt; &quot;x&quot;"));
    }
}
