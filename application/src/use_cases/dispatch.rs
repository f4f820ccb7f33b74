//! Event dispatch
//!
//! Turns the fragment stream of one attempt into store updates: fragments
//! are framed into blocks, blocks parsed into [`ChatEvent`]s, and events
//! applied to the bot placeholder in arrival order.

use crate::context::ChatContext;
use crate::ports::chat_api::{ApiError, FragmentStream};
use crate::ports::progress::SendProgressNotifier;
use futures::StreamExt;
use rosti_domain::{BlockFramer, ChatEvent};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// What happened to one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was applied to the placeholder.
    Applied,
    /// The block carried no data, or an event this client ignores.
    Ignored,
    /// The placeholder no longer exists.
    Dropped,
    /// The block could not be parsed; it was skipped.
    Malformed,
}

/// Per-attempt dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub applied: usize,
    pub ignored: usize,
    pub dropped: usize,
    pub malformed: usize,
}

impl DispatchStats {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Applied => self.applied += 1,
            DispatchOutcome::Ignored => self.ignored += 1,
            DispatchOutcome::Dropped => self.dropped += 1,
            DispatchOutcome::Malformed => self.malformed += 1,
        }
    }
}

/// Applies the events of one attempt to one placeholder.
pub struct EventDispatcher<'a> {
    ctx: &'a ChatContext,
    placeholder_id: &'a str,
    progress: &'a dyn SendProgressNotifier,
    stats: DispatchStats,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(
        ctx: &'a ChatContext,
        placeholder_id: &'a str,
        progress: &'a dyn SendProgressNotifier,
    ) -> Self {
        Self {
            ctx,
            placeholder_id,
            progress,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Parse and apply a single framed block.
    ///
    /// Malformed blocks are logged and skipped; they never end the stream.
    pub async fn dispatch_block(&mut self, block: &str) -> DispatchOutcome {
        let outcome = match ChatEvent::parse_block(block) {
            Ok(Some(event)) => self.dispatch(event).await,
            Ok(None) => {
                trace!("Block without data: {:?}", block);
                DispatchOutcome::Ignored
            }
            Err(e) => {
                warn!("Skipping malformed stream block: {}", e);
                DispatchOutcome::Malformed
            }
        };
        self.stats.record(outcome);
        outcome
    }

    async fn dispatch(&self, event: ChatEvent) -> DispatchOutcome {
        let applied = self
            .ctx
            .store()
            .await
            .apply_event(self.placeholder_id, &event);
        if !applied {
            debug!(
                "Placeholder {} is gone; dropping `{}` event",
                self.placeholder_id,
                event.name()
            );
            return DispatchOutcome::Dropped;
        }

        {
            let mut retry = self.ctx.retry_state().await;
            retry.touch();
            if let ChatEvent::Text(chunk) = &event {
                retry.partial_response.push_str(chunk);
            }
        }

        if let ChatEvent::Unknown { name } = &event {
            trace!("Ignoring `{}` event", name);
            return DispatchOutcome::Ignored;
        }

        self.progress.on_event(&event);
        DispatchOutcome::Applied
    }

    /// Consume a fragment stream to the end.
    ///
    /// With a `heartbeat` limit, a gap between fragments longer than the
    /// limit fails the attempt with a retryable streaming error. A trailing
    /// unterminated block is dispatched when the stream ends cleanly.
    pub async fn drain(
        &mut self,
        mut stream: FragmentStream,
        heartbeat: Option<Duration>,
    ) -> Result<DispatchStats, ApiError> {
        let mut framer = BlockFramer::new();

        loop {
            let next = match heartbeat {
                Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        return Err(ApiError::Stream(format!(
                            "no data received for {:?}",
                            limit
                        )));
                    }
                },
                None => stream.next().await,
            };

            match next {
                Some(Ok(fragment)) => {
                    for block in framer.push(&fragment) {
                        self.dispatch_block(&block).await;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        if let Some(rest) = framer.finish() {
            self.dispatch_block(&rest).await;
        }

        debug!("Stream ended: {:?}", self.stats);
        Ok(self.stats)
    }
}
