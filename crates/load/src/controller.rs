//! Resume controller: drives one upload session end-to-end.
//!
//! The controller owns its [`UploadSession`] exclusively. The next chunk to
//! attempt is the session's `next_chunk_index`, which only advances when the
//! remote confirms a chunk, so resuming after an interruption or a transport
//! error re-sends the unconfirmed chunk and never repeats a confirmed one.

use capyprobe_transfer::{PayloadSource, TransferError, UploadSession};
use capyprobe_upload_api::UploadTransport;
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::fault::FaultInjector;
use crate::types::{ChunkOutcome, ControllerState, SessionConfig, SessionResult};

/// One session in flight: the upload state plus controller bookkeeping.
#[derive(Debug)]
pub struct SessionRun {
    pub user_id: usize,
    pub session: UploadSession,
    pub state: ControllerState,
    /// Times the chunk loop was re-entered after a recoverable failure.
    pub resumes: u32,
}

/// Drives an upload through init, the chunk loop and completion.
pub struct ResumeController<'a> {
    transport: &'a dyn UploadTransport,
    faults: &'a dyn FaultInjector,
    payload: &'a PayloadSource,
    config: &'a SessionConfig,
}

impl<'a> ResumeController<'a> {
    pub fn new(
        transport: &'a dyn UploadTransport,
        faults: &'a dyn FaultInjector,
        payload: &'a PayloadSource,
        config: &'a SessionConfig,
    ) -> Self {
        Self {
            transport,
            faults,
            payload,
            config,
        }
    }

    /// Plans the payload and creates a fresh, uninitiated session.
    pub fn prepare(&self, user_id: usize, object_name: &str) -> SessionRun {
        let plan = capyprobe_transfer::plan(self.payload.len(), self.config.chunk_size);
        SessionRun {
            user_id,
            session: UploadSession::new(object_name, plan),
            state: ControllerState::Uninitiated,
            resumes: 0,
        }
    }

    /// Runs a complete session and reports its result.
    ///
    /// Never fails: every error becomes a failed [`SessionResult`].
    pub async fn run(&self, user_id: usize, object_name: &str) -> SessionResult {
        let mut run = self.prepare(user_id, object_name);

        let outcome = match self.config.session_timeout {
            Some(limit) => tokio::time::timeout(limit, self.drive(&mut run))
                .await
                .unwrap_or(Err(SessionError::TimedOut(limit))),
            None => self.drive(&mut run).await,
        };

        let error = match outcome {
            Ok(()) => {
                info!(
                    user = user_id,
                    upload_id = run.session.session_id().unwrap_or_default(),
                    resumes = run.resumes,
                    "upload completed successfully"
                );
                None
            }
            Err(e) => {
                let msg = e.to_string();
                run.session.fail(&msg);
                run.state = ControllerState::Done(false);
                error!(user = user_id, error = %msg, "upload failed");
                Some(msg)
            }
        };

        SessionResult {
            user_id,
            succeeded: error.is_none(),
            error,
            chunks_confirmed: run.session.next_chunk_index(),
            resumes: run.resumes,
        }
    }

    /// Steps `run` until it reaches [`ControllerState::Done`].
    ///
    /// Recoverable failures are retried in place; the first session-fatal
    /// error is returned and leaves `run` where it stopped.
    pub async fn drive(&self, run: &mut SessionRun) -> Result<(), SessionError> {
        let chunk_count = run.session.plan().chunk_count();
        let mut transport_failures: u32 = 0;
        let mut interruptions: u32 = 0;

        loop {
            let current = run.state;
            let next = match current {
                ControllerState::Uninitiated => {
                    let upload_id = self
                        .transport
                        .initiate(
                            run.session.object_name(),
                            run.session.plan().total_size(),
                            chunk_count,
                        )
                        .await
                        .map_err(SessionError::InitiateRejected)?;
                    info!(
                        user = run.user_id,
                        upload_id = %upload_id,
                        chunks = chunk_count,
                        "started new upload"
                    );
                    run.session.bind(upload_id)?;
                    ControllerState::Sending(run.session.next_chunk_index())
                }

                ControllerState::Sending(index) if index < chunk_count => {
                    match self.attempt_chunk(run, index).await? {
                        ChunkOutcome::Confirmed => {
                            run.session.confirm_chunk(index)?;
                            transport_failures = 0;
                            interruptions = 0;
                            debug!(user = run.user_id, chunk = index, "chunk confirmed");
                            ControllerState::Sending(index + 1)
                        }
                        ChunkOutcome::SimulatedInterruption => {
                            interruptions += 1;
                            let err = SessionError::SimulatedInterruption {
                                index,
                                attempts: interruptions,
                            };
                            if interruptions > self.config.max_interruptions {
                                return Err(err);
                            }
                            let delay = self.config.interruption_delay();
                            warn!(
                                user = run.user_id,
                                error = %err,
                                delay_secs = format_args!("{:.1}", delay.as_secs_f64()),
                                "resuming after backoff"
                            );
                            tokio::time::sleep(delay).await;
                            run.resumes += 1;
                            ControllerState::Sending(index)
                        }
                        ChunkOutcome::TransportError(source) => {
                            transport_failures += 1;
                            let err = SessionError::ChunkTransportError {
                                index,
                                attempts: transport_failures,
                                source,
                            };
                            if transport_failures > self.config.max_transport_retries {
                                return Err(err);
                            }
                            warn!(
                                user = run.user_id,
                                chunk = index,
                                attempt = transport_failures,
                                error = %err,
                                "resuming after transport error"
                            );
                            tokio::time::sleep(self.config.transport_backoff).await;
                            run.resumes += 1;
                            ControllerState::Sending(index)
                        }
                        ChunkOutcome::ServerRejected(source) => {
                            return Err(SessionError::ChunkRejected { index, source });
                        }
                    }
                }

                ControllerState::Sending(_) => ControllerState::Finalizing,

                ControllerState::Finalizing => {
                    let upload_id = run
                        .session
                        .session_id()
                        .ok_or(TransferError::SessionNotBound)?;
                    self.transport
                        .finalize(upload_id)
                        .await
                        .map_err(SessionError::FinalizeRejected)?;
                    run.session.complete()?;
                    ControllerState::Done(true)
                }

                ControllerState::Done(_) => break,
            };
            run.state = next;
        }

        if run.session.is_complete() {
            Ok(())
        } else {
            Err(SessionError::Session(TransferError::IncompleteSession {
                confirmed: run.session.next_chunk_index(),
                count: chunk_count,
            }))
        }
    }

    /// Makes one attempt at chunk `index` and classifies the outcome.
    ///
    /// Only a payload read failure is returned as an error.
    async fn attempt_chunk(
        &self,
        run: &SessionRun,
        index: usize,
    ) -> Result<ChunkOutcome, SessionError> {
        let plan = run.session.plan();
        if self.faults.should_interrupt(index, plan.chunk_count()) {
            return Ok(ChunkOutcome::SimulatedInterruption);
        }

        let span = *plan.get(index).ok_or(TransferError::ChunkOutOfRange {
            index,
            count: plan.chunk_count(),
        })?;
        let data = self
            .payload
            .read_chunk(&span)
            .await
            .map_err(SessionError::Payload)?;
        let upload_id = run
            .session
            .session_id()
            .ok_or(TransferError::SessionNotBound)?;

        Ok(match self.transport.send_chunk(upload_id, index, data).await {
            Ok(()) => ChunkOutcome::Confirmed,
            Err(e) if e.is_transport() => ChunkOutcome::TransportError(e),
            Err(e) => ChunkOutcome::ServerRejected(e),
        })
    }
}
