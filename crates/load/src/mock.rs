//! In-memory upload server used by the unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use capyprobe_upload_api::{TransportError, TransportFuture, UploadTransport};

use crate::fault::FaultInjector;

/// Scripted answer for one `send_chunk` call.
pub(crate) enum Reply {
    Ok,
    Reset,
    Reject(u16),
}

#[derive(Default)]
struct ServerState {
    next_id: usize,
    /// upload_id -> (expected chunk count, recorded chunks by index).
    uploads: HashMap<String, (usize, BTreeMap<usize, Vec<u8>>)>,
    /// (upload_id, chunk_index) of every send attempt that reached the server.
    sends: Vec<(String, usize)>,
    chunk_script: HashMap<usize, VecDeque<Reply>>,
    reject_init: bool,
    reject_finalize: bool,
    init_calls: usize,
    finalize_calls: usize,
}

/// Mock upload API that records chunks durably only on success and refuses
/// to finalize an upload with missing chunks.
#[derive(Default)]
pub(crate) struct MockServer {
    state: Mutex<ServerState>,
}

impl MockServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues replies for successive sends of `chunk_index` (any session).
    pub(crate) fn script_chunk(&self, chunk_index: usize, replies: Vec<Reply>) {
        self.state
            .lock()
            .unwrap()
            .chunk_script
            .insert(chunk_index, replies.into());
    }

    pub(crate) fn reject_init(&self) {
        self.state.lock().unwrap().reject_init = true;
    }

    pub(crate) fn reject_finalize(&self) {
        self.state.lock().unwrap().reject_finalize = true;
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.state.lock().unwrap().init_calls
    }

    pub(crate) fn finalize_calls(&self) -> usize {
        self.state.lock().unwrap().finalize_calls
    }

    /// Chunk indices of every send attempt, in order.
    pub(crate) fn sent_indices(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .sends
            .iter()
            .map(|(_, i)| *i)
            .collect()
    }

    /// Chunk indices of every send attempt for one upload, in order.
    pub(crate) fn sent_indices_for(&self, upload_id: &str) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .sends
            .iter()
            .filter(|(id, _)| id == upload_id)
            .map(|(_, i)| *i)
            .collect()
    }

    /// Chunk indices durably recorded for `upload_id`.
    pub(crate) fn recorded(&self, upload_id: &str) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .uploads
            .get(upload_id)
            .map(|(_, chunks)| chunks.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Recorded chunk bytes of `upload_id`, concatenated in index order.
    pub(crate) fn assembled(&self, upload_id: &str) -> Vec<u8> {
        self.state
            .lock()
            .unwrap()
            .uploads
            .get(upload_id)
            .map(|(_, chunks)| chunks.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    fn rejected(status: u16) -> TransportError {
        TransportError::Rejected {
            status,
            body: "rejected by mock".into(),
        }
    }
}

impl UploadTransport for MockServer {
    fn initiate<'a>(
        &'a self,
        _object_name: &'a str,
        _total_size: u64,
        chunk_count: usize,
    ) -> TransportFuture<'a, String> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            s.init_calls += 1;
            if s.reject_init {
                return Err(Self::rejected(503));
            }
            s.next_id += 1;
            let id = format!("upload-{}", s.next_id);
            s.uploads.insert(id.clone(), (chunk_count, BTreeMap::new()));
            Ok(id)
        })
    }

    fn send_chunk<'a>(
        &'a self,
        upload_id: &'a str,
        chunk_index: usize,
        data: Vec<u8>,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            let reply = s
                .chunk_script
                .get_mut(&chunk_index)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Reply::Ok);
            match reply {
                Reply::Reset => {
                    return Err(TransportError::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )));
                }
                Reply::Reject(status) => {
                    s.sends.push((upload_id.to_string(), chunk_index));
                    return Err(Self::rejected(status));
                }
                Reply::Ok => {}
            }
            s.sends.push((upload_id.to_string(), chunk_index));
            match s.uploads.get_mut(upload_id) {
                Some((_, chunks)) => {
                    chunks.insert(chunk_index, data);
                    Ok(())
                }
                None => Err(Self::rejected(404)),
            }
        })
    }

    fn finalize<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut s = self.state.lock().unwrap();
            s.finalize_calls += 1;
            if s.reject_finalize {
                return Err(Self::rejected(500));
            }
            match s.uploads.get(upload_id) {
                Some((count, chunks)) if chunks.len() == *count => Ok(()),
                _ => Err(Self::rejected(409)),
            }
        })
    }
}

/// Interrupts chunk `index` for its first `times` attempts.
pub(crate) struct InterruptAt {
    index: usize,
    remaining: AtomicUsize,
}

impl InterruptAt {
    pub(crate) fn new(index: usize, times: usize) -> Self {
        Self {
            index,
            remaining: AtomicUsize::new(times),
        }
    }
}

impl FaultInjector for InterruptAt {
    fn should_interrupt(&self, chunk_index: usize, _chunk_count: usize) -> bool {
        chunk_index == self.index
            && self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}
