//! Event loop tying a [Session] to the lobby connection.
//!
//! The runner is the only owner of the session. Lobby payloads and control
//! messages from [RunnerHandle]s are taken one at a time, so the session never
//! sees two inputs at once.
use kibitz_types::Outbound;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    control::{ControlEvent, Query},
    engine::MoveGenerator,
    events::{PayloadSink, Stream, DEFAULT_CHANNEL_CAPACITY},
    notice::Notice,
    session::Session,
    Error, Result,
};

enum Control {
    Event(ControlEvent),
    Query(Query, oneshot::Sender<Notice>),
    Shutdown,
}

/// Cloneable access to a running [Runner].
#[derive(Clone)]
pub struct RunnerHandle {
    control: mpsc::Sender<Control>,
    notices: broadcast::Sender<Notice>,
}

impl RunnerHandle {
    /// Queues a control event. Returns false once the runner has stopped.
    pub async fn send(&self, event: ControlEvent) -> bool {
        self.control.send(Control::Event(event)).await.is_ok()
    }

    /// Asks the runner a question; `None` once the runner has stopped.
    pub async fn query(&self, query: Query) -> Option<Notice> {
        let (reply, response) = oneshot::channel();
        self.control
            .send(Control::Query(query, reply))
            .await
            .ok()?;
        response.await.ok()
    }

    /// Asks the runner to close the connection and stop the engine.
    pub async fn shutdown(&self) -> bool {
        self.control.send(Control::Shutdown).await.is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}

pub struct Runner<G, W> {
    session: Session<G>,
    inbound: Stream,
    writer: W,
    control: mpsc::Receiver<Control>,
}

impl<G: MoveGenerator, W: PayloadSink> Runner<G, W> {
    pub fn new(
        session: Session<G>,
        inbound: Stream,
        writer: W,
        capacity: usize,
    ) -> (Self, RunnerHandle) {
        let capacity = if capacity == 0 {
            DEFAULT_CHANNEL_CAPACITY
        } else {
            capacity
        };
        let (control_tx, control_rx) = mpsc::channel(capacity);
        let handle = RunnerHandle {
            control: control_tx,
            notices: session.notices(),
        };
        (
            Self {
                session,
                inbound,
                writer,
                control: control_rx,
            },
            handle,
        )
    }

    /// Runs until shutdown is requested (`Ok`) or the connection or a
    /// collaborator fails (`Err`).
    pub async fn run(mut self) -> Result<()> {
        let mut control_open = true;
        loop {
            tokio::select! {
                message = self.control.recv(), if control_open => match message {
                    Some(Control::Event(event)) => {
                        let out = self.session.control(event);
                        if let Err(err) = self.flush(out).await {
                            return self.fail(err).await;
                        }
                    }
                    Some(Control::Query(query, reply)) => {
                        let _ = reply.send(self.session.answer(query));
                    }
                    Some(Control::Shutdown) => return self.stop().await,
                    None => {
                        debug!("control handles dropped");
                        control_open = false;
                    }
                },
                payload = self.inbound.next() => {
                    let result = match payload {
                        Some(Ok(payload)) => match self.session.handle(&payload).await {
                            Ok(out) => self.flush(out).await,
                            Err(err) => Err(err),
                        },
                        Some(Err(err)) => Err(err),
                        None => Err(Error::ConnectionClosed),
                    };
                    if let Err(err) = result {
                        return self.fail(err).await;
                    }
                }
            }
        }
    }

    async fn flush(&mut self, out: Vec<Outbound>) -> Result<()> {
        for message in out {
            self.writer.send(message.to_payload()).await?;
        }
        Ok(())
    }

    async fn stop(mut self) -> Result<()> {
        info!("shutting down");
        if let Err(err) = self.writer.close().await {
            warn!(?err, "failed to close connection");
        }
        self.session.shutdown().await
    }

    async fn fail(mut self, err: Error) -> Result<()> {
        error!(?err, "session failed");
        if let Err(shutdown) = self.session.shutdown().await {
            warn!(?shutdown, "failed to stop engine");
        }
        Err(err)
    }
}
