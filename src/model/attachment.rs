//! The run-wide attachment.
//!
//! Every message of a run carries the same file. It is read from disk once,
//! when the run starts, and the bytes are shared by every send attempt.

use std::path::{Path, PathBuf};

use crate::error::{MailcastError, Result};

/// A binary attachment loaded into memory.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Where the file was read from.
    pub path: PathBuf,

    /// Filename presented to the recipient.
    pub filename: String,

    /// MIME content type guessed from the extension
    /// (`"application/pdf"`, falling back to `"application/octet-stream"`).
    pub content_type: String,

    /// Raw file content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Read the attachment file.
    ///
    /// A missing file is a configuration error: the run must not start.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MailcastError::config(format!("attachment not found: {}", path.display()))
            } else {
                MailcastError::io(path, e)
            }
        })?;
        if !metadata.is_file() {
            return Err(MailcastError::config(format!(
                "attachment is not a regular file: {}",
                path.display()
            )));
        }

        let data = std::fs::read(path).map_err(|e| MailcastError::io(path, e))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        tracing::debug!(
            path = %path.display(),
            size = data.len(),
            content_type = %content_type,
            "Loaded attachment"
        );

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            content_type,
            data,
        })
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
