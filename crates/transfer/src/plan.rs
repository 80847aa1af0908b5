use crate::DEFAULT_CHUNK_SIZE;

/// Byte range of one chunk within the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Position of the chunk in upload order (0-based).
    pub index: usize,
    /// Byte offset within the payload.
    pub offset: u64,
    /// Length of this chunk in bytes.
    pub length: u64,
}

impl ChunkSpan {
    /// Offset one past the last byte of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Ordered chunk layout of a payload.
///
/// Spans are contiguous, never overlap and cover exactly `[0, total_size)`.
/// Only the last span may be shorter than `chunk_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    spans: Vec<ChunkSpan>,
}

impl ChunkPlan {
    /// Total payload size in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Nominal chunk size in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks (always at least 1).
    pub fn chunk_count(&self) -> usize {
        self.spans.len()
    }

    /// Returns the span at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&ChunkSpan> {
        self.spans.get(index)
    }

    /// Returns `true` if `index` is the final chunk of the plan.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.spans.len()
    }

    /// All spans in upload order.
    pub fn spans(&self) -> &[ChunkSpan] {
        &self.spans
    }
}

/// Splits a payload of `total_size` bytes into `chunk_size` pieces.
///
/// `chunk_count = ceil(total_size / chunk_size)`. An empty payload yields a
/// single zero-length chunk so every upload still sends one chunk before
/// finalizing. If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
pub fn plan(total_size: u64, chunk_size: u64) -> ChunkPlan {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    if total_size == 0 {
        return ChunkPlan {
            total_size,
            chunk_size,
            spans: vec![ChunkSpan {
                index: 0,
                offset: 0,
                length: 0,
            }],
        };
    }

    let count = total_size.div_ceil(chunk_size) as usize;
    let spans = (0..count)
        .map(|index| {
            let offset = index as u64 * chunk_size;
            ChunkSpan {
                index,
                offset,
                length: chunk_size.min(total_size - offset),
            }
        })
        .collect();

    ChunkPlan {
        total_size,
        chunk_size,
        spans,
    }
}
