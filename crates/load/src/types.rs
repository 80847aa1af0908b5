//! Data types for the load run.

use std::fmt;
use std::time::Duration;

use rand::Rng;

use capyprobe_transfer::DEFAULT_CHUNK_SIZE;

/// Per-session upload and recovery settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Shortest pause after a simulated interruption.
    pub interruption_backoff_min: Duration,
    /// Longest pause after a simulated interruption.
    pub interruption_backoff_max: Duration,
    /// Fixed pause after a transport error.
    pub transport_backoff: Duration,
    /// Retries allowed after consecutive transport errors on one chunk.
    pub max_transport_retries: u32,
    /// Resumes allowed after consecutive simulated interruptions on one chunk.
    pub max_interruptions: u32,
    /// Overall deadline for one session (`None` = unbounded).
    pub session_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            interruption_backoff_min: Duration::from_secs(1),
            interruption_backoff_max: Duration::from_secs(3),
            transport_backoff: Duration::from_secs(2),
            max_transport_retries: 5,
            max_interruptions: 50,
            session_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Draws a pause uniformly from the interruption backoff range.
    pub fn interruption_delay(&self) -> Duration {
        let lo = self.interruption_backoff_min.as_secs_f64();
        let hi = self.interruption_backoff_max.as_secs_f64();
        if hi <= lo {
            return self.interruption_backoff_min;
        }
        Duration::from_secs_f64(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// Settings for a whole load run. Built once and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Number of simulated users (one session each).
    pub num_users: usize,
    /// Delay between consecutive session starts.
    pub stagger: Duration,
    /// Interval of the resource monitor log line.
    pub monitor_interval: Duration,
    /// Object name prefix; user `n` uploads `{prefix}{n}.bin`.
    pub object_prefix: String,
    /// Settings applied to every session.
    pub session: SessionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_users: 10,
            stagger: Duration::from_millis(500),
            monitor_interval: Duration::from_secs(5),
            object_prefix: "large_file_user_".into(),
            session: SessionConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Object name uploaded by `user_id`.
    pub fn object_name(&self, user_id: usize) -> String {
        format!("{}{user_id}.bin", self.object_prefix)
    }
}

/// Where a resume controller currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session token yet.
    Uninitiated,
    /// About to attempt chunk `i`.
    Sending(usize),
    /// Every chunk confirmed, completing the upload.
    Finalizing,
    /// Terminal. `true` on success.
    Done(bool),
}

/// Classification of one chunk attempt.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// The remote recorded the chunk.
    Confirmed,
    /// The fault policy abandoned the attempt before sending.
    SimulatedInterruption,
    /// No usable answer from the remote.
    TransportError(capyprobe_upload_api::TransportError),
    /// The remote refused the chunk.
    ServerRejected(capyprobe_upload_api::TransportError),
}

/// Final outcome of one simulated user's session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub user_id: usize,
    pub succeeded: bool,
    pub error: Option<String>,
    pub chunks_confirmed: usize,
    pub resumes: u32,
}

impl SessionResult {
    /// Result for a session whose worker ended without reporting.
    pub fn lost(user_id: usize, reason: &str) -> Self {
        Self {
            user_id,
            succeeded: false,
            error: Some(reason.to_string()),
            chunks_confirmed: 0,
            resumes: 0,
        }
    }
}

/// Aggregate of every session in a run, sorted by user id.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    results: Vec<SessionResult>,
}

impl LoadReport {
    pub fn new(mut results: Vec<SessionResult>) -> Self {
        results.sort_by_key(|r| r.user_id);
        Self { results }
    }

    pub fn results(&self) -> &[SessionResult] {
        &self.results
    }

    /// Sessions that finalized successfully.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Total resumes across all sessions.
    pub fn resumes(&self) -> u32 {
        self.results.iter().map(|r| r.resumes).sum()
    }

    /// Fraction of sessions that succeeded, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.total() as f64
    }

    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == self.total()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Test completed: {}/{} successful uploads",
            self.succeeded(),
            self.total()
        )?;
        write!(
            f,
            "Resumption success rate: {:.1}%",
            self.success_rate() * 100.0
        )
    }
}
