use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;

use crate::TransferError;
use crate::plan::ChunkSpan;

/// Write buffer size used when generating payload files.
const GENERATE_BLOCK_SIZE: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads chunk spans from a file at exact offsets.
pub struct ChunkReader {
    file: std::fs::File,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for positional chunk reads.
    pub fn new(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { file, file_size })
    }

    /// Reads the bytes covered by `span`.
    pub fn read_span(&mut self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError> {
        if span.end() > self.file_size {
            return Err(TransferError::SpanOutOfBounds {
                end: span.end(),
                size: self.file_size,
            });
        }
        self.file.seek(SeekFrom::Start(span.offset))?;
        let mut buf = vec![0u8; span.length as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

// ---------------------------------------------------------------------------
// PayloadSource
// ---------------------------------------------------------------------------

/// The bytes being uploaded, shared read-only by every session.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// A file on disk, read chunk by chunk.
    File { path: PathBuf, size: u64 },
    /// An in-memory buffer.
    Memory(Arc<[u8]>),
}

impl PayloadSource {
    /// Uses the file at `path`, recording its current size.
    pub fn from_file(path: &Path) -> Result<Self, TransferError> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self::File {
            path: path.to_path_buf(),
            size,
        })
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory(data.into())
    }

    /// Payload size in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Self::File { size, .. } => *size,
            Self::Memory(data) => data.len() as u64,
        }
    }

    /// Returns `true` for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the bytes of one chunk.
    ///
    /// File reads run on the blocking pool.
    pub async fn read_chunk(&self, span: &ChunkSpan) -> Result<Vec<u8>, TransferError> {
        match self {
            Self::Memory(data) => {
                let start = span.offset as usize;
                let end = span.end() as usize;
                data.get(start..end)
                    .map(<[u8]>::to_vec)
                    .ok_or(TransferError::SpanOutOfBounds {
                        end: span.end(),
                        size: data.len() as u64,
                    })
            }
            Self::File { path, size } => {
                // Spans are checked against the size recorded at open time, so a
                // file that grows later still yields the planned bytes only.
                if span.end() > *size {
                    return Err(TransferError::SpanOutOfBounds {
                        end: span.end(),
                        size: *size,
                    });
                }
                // Each read opens its own handle: concurrent sessions never
                // share a seek position.
                let path = path.clone();
                let span = *span;
                tokio::task::spawn_blocking(move || ChunkReader::new(&path)?.read_span(&span))
                    .await
                    .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
            }
        }
    }
}

/// Makes sure a payload file exists at `path`.
///
/// An existing file is left untouched and its size returned. Otherwise a new
/// file of `size` random bytes is written.
pub fn ensure_payload_file(path: &Path, size: u64) -> Result<u64, TransferError> {
    if path.exists() {
        return Ok(std::fs::metadata(path)?.len());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut rng = rand::thread_rng();
    let mut block = vec![0u8; GENERATE_BLOCK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(GENERATE_BLOCK_SIZE as u64) as usize;
        rng.fill_bytes(&mut block[..n]);
        file.write_all(&block[..n])?;
        remaining -= n as u64;
    }
    file.flush()?;

    tracing::info!(path = %path.display(), size, "generated payload file");
    Ok(size)
}
