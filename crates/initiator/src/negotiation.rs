//! The Initiator negotiation machine.

use storecopy_discovery::Directory;
use storecopy_fabric::Endpoint;
use storecopy_protocol::{CorrelationTag, Kind, NegotiationMessage, Status, Template};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::InitiatorError;
use crate::types::{InitiatorConfig, Outcome, Stage, State, TransferRequest};

/// One file-transfer negotiation. States are never revisited; to retry,
/// build a new `Negotiation`.
pub struct Negotiation<'a> {
    endpoint: &'a Endpoint,
    directory: &'a Directory,
    request: TransferRequest,
    config: InitiatorConfig,
    state: State,
    deadline: Option<Instant>,
    messages_sent: usize,
}

impl<'a> Negotiation<'a> {
    pub fn new(
        endpoint: &'a Endpoint,
        directory: &'a Directory,
        request: TransferRequest,
        config: InitiatorConfig,
    ) -> Self {
        Self {
            endpoint,
            directory,
            request,
            config,
            state: State::Discover,
            deadline: None,
            messages_sent: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    /// Number of OPEN and COMMIT messages sent so far.
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    /// Drives the machine to a terminal state.
    pub async fn run(&mut self) -> Result<Outcome, InitiatorError> {
        loop {
            if let State::Terminal(outcome) = self.step().await? {
                let outcome = outcome.clone();
                if outcome.is_success() {
                    info!(target_path = %self.request.target, "{outcome}");
                } else {
                    warn!(target_path = %self.request.target, "{outcome}");
                }
                return Ok(outcome);
            }
        }
    }

    /// Performs one transition. Await states suspend until a matching
    /// reply arrives (or the deadline, if configured, elapses).
    ///
    /// Stepping a terminal machine is a no-op.
    pub async fn step(&mut self) -> Result<&State, InitiatorError> {
        let next = match &self.state {
            State::Discover => self.discover_and_open()?,
            State::AwaitOpenReply { responder, tag } => {
                let (responder, tag) = (responder.clone(), tag.clone());
                match self.await_reply(&tag, Stage::Open).await? {
                    Err(outcome) => State::Terminal(outcome),
                    Ok(reply) => match reply.kind {
                        Kind::Accept => State::Commit { accept: reply },
                        Kind::Reject => State::Terminal(Outcome::AlreadyExists),
                        Kind::Failed => State::Terminal(Outcome::ResponderFault {
                            stage: Stage::Open,
                        }),
                        other => {
                            warn!(kind = %other, %tag, "unexpected reply to OPEN, still waiting");
                            State::AwaitOpenReply { responder, tag }
                        }
                    },
                }
            }
            State::Commit { accept } => {
                let accept = accept.clone();
                self.commit(&accept)?
            }
            State::AwaitCommitReply { responder, tag } => {
                let (responder, tag) = (responder.clone(), tag.clone());
                match self.await_reply(&tag, Stage::Commit).await? {
                    Err(outcome) => State::Terminal(outcome),
                    Ok(reply) => match reply.kind {
                        Kind::Done => State::Terminal(Outcome::Transferred { responder }),
                        Kind::Failed => match reply.status() {
                            Ok(Status::IoFault) => State::Terminal(Outcome::ResponderFault {
                                stage: Stage::Commit,
                            }),
                            _ => State::Terminal(Outcome::TransferFailed),
                        },
                        other => {
                            warn!(kind = %other, %tag, "unexpected reply to COMMIT, still waiting");
                            State::AwaitCommitReply { responder, tag }
                        }
                    },
                }
            }
            State::Terminal(_) => return Ok(&self.state),
        };

        if next != self.state {
            debug!(from = self.state.name(), to = next.name(), "negotiation transition");
        }
        self.state = next;
        Ok(&self.state)
    }

    fn discover_and_open(&mut self) -> Result<State, InitiatorError> {
        let found = self.directory.find(&self.config.capability);
        let responder = match found.as_slice() {
            [one] => one.clone(),
            [] => return Ok(State::Terminal(Outcome::NoResponder)),
            many => {
                return Ok(State::Terminal(Outcome::AmbiguousResponder {
                    count: many.len(),
                }));
            }
        };

        let open = NegotiationMessage::open(
            self.endpoint.address().clone(),
            responder.clone(),
            self.request.target.as_str(),
        );
        let tag = open.correlation_tag.clone();
        debug!(%responder, %tag, target_path = %self.request.target, "sending OPEN");
        self.send(open)?;
        Ok(State::AwaitOpenReply { responder, tag })
    }

    fn commit(&mut self, accept: &NegotiationMessage) -> Result<State, InitiatorError> {
        let commit = NegotiationMessage::commit(accept, self.request.source.to_string_lossy());
        let tag = commit.correlation_tag.clone();
        let responder = commit.receiver.clone();
        debug!(%responder, %tag, source = %self.request.source.display(), "sending COMMIT");
        self.send(commit)?;
        Ok(State::AwaitCommitReply { responder, tag })
    }

    fn send(&mut self, msg: NegotiationMessage) -> Result<(), InitiatorError> {
        self.endpoint.send(msg)?;
        self.messages_sent += 1;
        self.deadline = self.config.reply_timeout.map(|d| Instant::now() + d);
        Ok(())
    }

    /// Waits for the reply to `tag`. The inner `Err` is a timeout outcome.
    async fn await_reply(
        &self,
        tag: &CorrelationTag,
        stage: Stage,
    ) -> Result<Result<NegotiationMessage, Outcome>, InitiatorError> {
        let template = Template::protocol().in_reply_to(tag.clone());
        let received = match self.deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, self.endpoint.receive(&template)).await {
                    Ok(result) => result,
                    Err(_) => return Ok(Err(Outcome::TimedOut { stage })),
                }
            }
            None => self.endpoint.receive(&template).await,
        };
        Ok(Ok(received?))
    }
}
