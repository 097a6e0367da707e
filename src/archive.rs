//! Bounded in-memory extraction of package archives.
//!
//! Registry tarballs are gzip-compressed tar streams, but plain tar is
//! accepted too (detected by the gzip magic bytes). Nothing touches disk.
//!
//! Two limits protect against hostile archives:
//!
//! - an entry whose declared size exceeds [`ExtractionLimits::max_file_size`]
//!   is drained and discarded rather than buffered;
//! - every decompressed entry byte, kept or not, counts toward
//!   [`ExtractionLimits::max_total_size`], and crossing it aborts extraction
//!   with [`ScanError::SizeLimitExceeded`].

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tar::{Archive, EntryType};
use tracing::{debug, instrument, warn};

use crate::error::{Result, ScanError};
use crate::model::{EntryKind, ExtractedFile};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionLimits {
    pub max_file_size: u64,
    pub max_total_size: u64,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_total_size: 500 * 1024 * 1024,
        }
    }
}

/// Builds a path filter that keeps files ending in one of `extensions`.
///
/// Extensions are compared case-insensitively; a missing leading dot is added.
pub fn extension_filter(extensions: &[String]) -> impl Fn(&str) -> bool {
    let extensions: Vec<String> = extensions
        .iter()
        .map(|ext| {
            let ext = ext.to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect();

    move |path: &str| {
        let path = path.to_lowercase();
        extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }
}

/// Extracts every entry whose path passes `filter`.
#[instrument(skip(bytes, filter), fields(input_size = bytes.len(), files))]
pub fn extract<F>(bytes: &[u8], filter: F, limits: &ExtractionLimits) -> Result<Vec<ExtractedFile>>
where
    F: Fn(&str) -> bool,
{
    let mut archive = Archive::new(decoder(bytes));
    let mut total = 0u64;
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let declared = entry.header().size()?;

        let kind = match entry.header().entry_type() {
            EntryType::Regular | EntryType::Continuous => EntryKind::File,
            EntryType::Directory => EntryKind::Directory,
            EntryType::Symlink | EntryType::Link => EntryKind::Symlink,
            other => {
                debug!(path = %path, entry_type = ?other, "skipping unsupported entry");
                pump(&mut entry, &mut total, limits, None)?;
                continue;
            }
        };

        if !filter(&path) {
            pump(&mut entry, &mut total, limits, None)?;
            continue;
        }

        if kind != EntryKind::File {
            pump(&mut entry, &mut total, limits, None)?;
            files.push(ExtractedFile {
                path,
                content: Vec::new(),
                size: 0,
                kind,
            });
            continue;
        }

        if declared > limits.max_file_size {
            warn!(path = %path, size = declared, limit = limits.max_file_size, "file exceeds size limit, skipping");
            pump(&mut entry, &mut total, limits, None)?;
            continue;
        }

        let mut content = Vec::with_capacity(declared as usize);
        pump(&mut entry, &mut total, limits, Some(&mut content))?;
        files.push(ExtractedFile {
            path,
            size: content.len() as u64,
            content,
            kind,
        });
    }

    tracing::Span::current().record("files", files.len());
    Ok(files)
}

fn decoder(bytes: &[u8]) -> Box<dyn Read + '_> {
    if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    }
}

/// Reads an entry to the end, charging every byte against the total budget.
fn pump(
    entry: &mut impl Read,
    total: &mut u64,
    limits: &ExtractionLimits,
    mut sink: Option<&mut Vec<u8>>,
) -> Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = entry.read(&mut buf)?;
        if read == 0 {
            return Ok(());
        }
        *total += read as u64;
        if *total > limits.max_total_size {
            return Err(ScanError::SizeLimitExceeded {
                limit: limits.max_total_size,
            });
        }
        if let Some(out) = sink.as_deref_mut() {
            out.extend_from_slice(&buf[..read]);
        }
    }
}
