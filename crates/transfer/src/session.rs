use crate::TransferError;
use crate::plan::{ChunkPlan, ChunkSpan};

/// Lifecycle status of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created, no session token yet.
    Pending,
    /// Token bound, chunks being sent.
    InProgress,
    /// Every chunk confirmed and the upload finalized.
    Completed,
    /// Ended without completing.
    Failed,
}

/// Client-side state of one logical upload.
///
/// Owned by a single controller; nothing here is shared between sessions.
/// `next_chunk_index` only moves forward, one confirmed chunk at a time, and
/// the session token is bound once and reused on every resume.
#[derive(Debug)]
pub struct UploadSession {
    session_id: Option<String>,
    object_name: String,
    plan: ChunkPlan,
    next_chunk_index: usize,
    status: SessionStatus,
    error: Option<String>,
}

impl UploadSession {
    /// Creates a pending session for `object_name` laid out by `plan`.
    pub fn new(object_name: impl Into<String>, plan: ChunkPlan) -> Self {
        Self {
            session_id: None,
            object_name: object_name.into(),
            plan,
            next_chunk_index: 0,
            status: SessionStatus::Pending,
            error: None,
        }
    }

    /// Binds the server-issued session token.
    ///
    /// Binding the same token again is a no-op; a different token is rejected.
    pub fn bind(&mut self, session_id: impl Into<String>) -> Result<(), TransferError> {
        let session_id = session_id.into();
        match &self.session_id {
            Some(existing) if *existing == session_id => Ok(()),
            Some(existing) => Err(TransferError::SessionAlreadyBound(existing.clone())),
            None => {
                self.session_id = Some(session_id);
                self.status = SessionStatus::InProgress;
                Ok(())
            }
        }
    }

    /// Records chunk `index` as durably accepted by the remote.
    ///
    /// Only the next unconfirmed chunk may be confirmed.
    pub fn confirm_chunk(&mut self, index: usize) -> Result<(), TransferError> {
        if self.session_id.is_none() {
            return Err(TransferError::SessionNotBound);
        }
        if index >= self.plan.chunk_count() {
            return Err(TransferError::ChunkOutOfRange {
                index,
                count: self.plan.chunk_count(),
            });
        }
        if index != self.next_chunk_index {
            return Err(TransferError::ChunkOutOfOrder {
                expected: self.next_chunk_index,
                got: index,
            });
        }
        self.next_chunk_index += 1;
        Ok(())
    }

    /// Marks the upload finalized. Requires every chunk to be confirmed.
    pub fn complete(&mut self) -> Result<(), TransferError> {
        if !self.all_chunks_confirmed() {
            return Err(TransferError::IncompleteSession {
                confirmed: self.next_chunk_index,
                count: self.plan.chunk_count(),
            });
        }
        self.status = SessionStatus::Completed;
        Ok(())
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&mut self, err: &str) {
        self.status = SessionStatus::Failed;
        self.error = Some(err.to_string());
    }

    /// The next chunk to attempt, or `None` once every chunk is confirmed.
    pub fn next_chunk(&self) -> Option<&ChunkSpan> {
        self.plan.get(self.next_chunk_index)
    }

    /// Index of the next chunk to attempt (equals the chunk count when done).
    pub fn next_chunk_index(&self) -> usize {
        self.next_chunk_index
    }

    /// Returns `true` once every chunk has been confirmed.
    pub fn all_chunks_confirmed(&self) -> bool {
        self.next_chunk_index == self.plan.chunk_count()
    }

    /// Returns `true` once the upload has been finalized.
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Returns the bound session token.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the target object name.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Returns the chunk layout.
    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Returns the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the failure message, if the session failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
