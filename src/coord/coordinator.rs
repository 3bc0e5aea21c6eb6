//! Coordinator - the event loop around the arbiter
//!
//! Inbound messages from every tab funnel through one bounded channel and
//! are applied to the `Arbiter` one at a time. Commands produced by the
//! arbiter are handed to a separate dispatcher task over a bounded queue, so
//! a slow or failing host call never stalls event processing. When the host
//! falls behind and the queue is full, further commands are dropped.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::core::{CoordinatorConfig, Result, TabgateError};
use super::arbiter::{Arbiter, ArbiterSnapshot};
use super::hooks::{CompositeHook, CoordinatorHook};
use super::host::{dispatch, TabHost};
use super::types::{Inbound, LifecycleNotice, NavigationPhase, TabCommand, TabId, VideoEvent};
use super::wire;

/// Messages accepted by the coordinator loop
#[derive(Debug)]
pub enum CoordinatorMsg {
    Inbound(Inbound),
    /// A message was dropped before reaching the arbiter
    Malformed(String),
    Snapshot(oneshot::Sender<ArbiterSnapshot>),
}

/// Cloneable sender side of the coordinator
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorMsg>,
}

impl CoordinatorHandle {
    /// Queue an inbound message
    pub async fn send(&self, inbound: impl Into<Inbound>) -> Result<()> {
        self.tx.send(CoordinatorMsg::Inbound(inbound.into())).await?;
        Ok(())
    }

    pub async fn video_event(&self, event: VideoEvent) -> Result<()> {
        self.send(event).await
    }

    pub async fn tab_closed(&self, tab_id: TabId) -> Result<()> {
        self.send(LifecycleNotice::TabClosed { tab_id }).await
    }

    pub async fn tab_navigated(
        &self,
        tab_id: TabId,
        new_url: impl Into<String>,
        phase: NavigationPhase,
    ) -> Result<()> {
        self.send(LifecycleNotice::TabNavigated {
            tab_id,
            new_url: new_url.into(),
            phase,
        })
        .await
    }

    /// Parse a wire line and forward it. Returns `Ok(false)` when the line
    /// was dropped as malformed or carried nothing actionable.
    pub async fn submit_line(&self, line: &str) -> Result<bool> {
        match wire::parse_line(line) {
            Ok(Some(inbound)) => {
                self.send(inbound).await?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) if err.is_recoverable() => {
                self.tx.send(CoordinatorMsg::Malformed(err.to_string())).await?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Current arbitration state, as seen after every message queued before this call
    pub async fn snapshot(&self) -> Result<ArbiterSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(CoordinatorMsg::Snapshot(reply_tx)).await?;
        Ok(reply_rx.await?)
    }
}

/// Owner of all coordination state
pub struct Coordinator {
    arbiter: Arbiter,
    msg_tx: mpsc::Sender<CoordinatorMsg>,
    msg_rx: mpsc::Receiver<CoordinatorMsg>,
    command_capacity: usize,
    hooks: CompositeHook,
}

impl Coordinator {
    /// Create a coordinator from a configuration
    pub fn new(config: &CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let (msg_tx, msg_rx) = mpsc::channel(config.event_capacity);
        Ok(Self {
            arbiter: Arbiter::new(config)?,
            msg_tx,
            msg_rx,
            command_capacity: config.command_capacity,
            hooks: CompositeHook::new(),
        })
    }

    /// Attach a hook
    pub fn with_hook(mut self, hook: Arc<dyn CoordinatorHook>) -> Self {
        self.hooks.add_hook(hook);
        self
    }

    /// Get a handle for submitting messages
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.msg_tx.clone(),
        }
    }

    /// Run until `cancel_rx` fires (or its sender is dropped) or every handle is gone.
    ///
    /// Commands still queued for the host are drained before returning.
    pub async fn run(
        self,
        host: Arc<dyn TabHost>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        let Coordinator {
            mut arbiter,
            msg_tx,
            mut msg_rx,
            command_capacity,
            hooks,
        } = self;
        // Only external handles keep the loop alive
        drop(msg_tx);

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<TabCommand>(command_capacity);
        let dispatcher = tokio::spawn(async move {
            while let Some(command) = cmd_rx.recv().await {
                dispatch(host.as_ref(), command).await;
            }
        });

        info!("Coordinator started");
        loop {
            tokio::select! {
                msg = msg_rx.recv() => {
                    let Some(msg) = msg else {
                        debug!("All coordinator handles dropped");
                        break;
                    };
                    match msg {
                        CoordinatorMsg::Inbound(inbound) => {
                            let commands = arbiter.apply(&inbound);
                            debug!(tab = %inbound.tab_id(), commands = commands.len(), "applied");
                            hooks.on_inbound(&inbound, &commands);
                            for command in commands {
                                if let Err(err) = cmd_tx.try_send(command) {
                                    let reason = match err {
                                        TrySendError::Full(_) => "host backlog full",
                                        TrySendError::Closed(_) => "dispatcher gone",
                                    };
                                    warn!(
                                        tab = %command.tab_id(),
                                        "{}, dropping {}",
                                        reason,
                                        command.name()
                                    );
                                }
                            }
                        }
                        CoordinatorMsg::Malformed(reason) => {
                            warn!("Dropped malformed message: {}", reason);
                            hooks.on_malformed(&reason);
                        }
                        CoordinatorMsg::Snapshot(reply) => {
                            let _ = reply.send(arbiter.snapshot());
                        }
                    }
                }

                _ = &mut cancel_rx => {
                    info!("Coordinator received cancel signal");
                    break;
                }
            }
        }

        drop(cmd_tx);
        dispatcher
            .await
            .map_err(|e| TabgateError::channel("dispatcher", e.to_string()))?;
        hooks.on_shutdown();
        Ok(())
    }
}
