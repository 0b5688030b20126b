//! Input resolution: load a PDF from disk or memory and stage it for
//! backends that need a file-system path.
//!
//! Every entry point checks the PDF magic bytes (`%PDF`) up front so callers
//! get a meaningful [`Pdf2TableError::NotAPdf`] rather than a backend parse
//! failure halfway through a run.

use crate::error::Pdf2TableError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The document being converted: its display name and raw bytes.
#[derive(Clone)]
pub struct PdfSource {
    name: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PdfSource {
    /// Read a local PDF, validating existence, permissions and magic bytes.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Pdf2TableError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Pdf2TableError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Pdf2TableError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Pdf2TableError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(name, bytes)
    }

    /// Wrap in-memory bytes (an upload, a database blob) with a display name.
    ///
    /// The name is only used for output file naming and messages.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Pdf2TableError> {
        let name = name.into();
        if !bytes.starts_with(PDF_MAGIC) {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(Pdf2TableError::NotAPdf { name, magic });
        }
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File name without directories and without a trailing `.pdf`
    /// (case-insensitive). Used to name output files.
    pub fn stem(&self) -> String {
        file_stem(&self.name)
    }

    /// Copy the bytes to a temporary `.pdf` file.
    pub fn stage(&self) -> Result<StagedPdf, Pdf2TableError> {
        StagedPdf::write(&self.bytes)
    }
}

/// Strip directories and a trailing `.pdf` (any case) from a file name.
pub fn file_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let split = base.len().saturating_sub(4);
    let stem = match (base.get(..split), base.get(split..)) {
        (Some(head), Some(ext)) if ext.eq_ignore_ascii_case(".pdf") => head,
        _ => base,
    };
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

/// A temporary copy of the PDF on disk. The file is removed when the guard
/// is dropped, on success and error paths alike.
pub struct StagedPdf {
    file: NamedTempFile,
}

impl StagedPdf {
    fn write(bytes: &[u8]) -> Result<Self, Pdf2TableError> {
        let mut file = tempfile::Builder::new()
            .prefix("pdf2table-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| Pdf2TableError::Internal(format!("Failed to create temp file: {}", e)))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| Pdf2TableError::Internal(format!("Failed to write temp file: {}", e)))?;
        debug!("Staged PDF at {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}
