// ── Notification pump ──
//
// Background task that owns a `Mirror` and applies source notifications
// to it strictly in arrival order. Producers hold cheap sender clones;
// readers use the mirror's `ObjectStream` subscriptions.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::CoreError;
use crate::mirror::Mirror;
use crate::source::SourceNotification;

/// Message on the pump channel.
#[derive(Debug)]
enum PumpMessage {
    Notify(SourceNotification),
    /// Acknowledged once everything queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Cloneable producer side of a running pump.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<PumpMessage>,
}

impl NotificationSender {
    /// Queue a notification. Fails once the pump has stopped.
    pub fn send(&self, notification: SourceNotification) -> Result<(), CoreError> {
        self.tx
            .send(PumpMessage::Notify(notification))
            .map_err(|_| stopped())
    }

    /// Wait until every notification queued so far has been applied.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(PumpMessage::Flush(tx))
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }
}

fn stopped() -> CoreError {
    CoreError::Internal("notification pump has stopped".into())
}

/// Handle to the task applying notifications to a [`Mirror`].
pub struct NotificationPump {
    sender: NotificationSender,
    cancel: CancellationToken,
    task: JoinHandle<Mirror>,
}

impl NotificationPump {
    /// Move `mirror` onto a new task. Must be called within a tokio runtime.
    pub fn spawn(mirror: Mirror) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_task(mirror, rx, cancel.clone()));
        Self {
            sender: NotificationSender { tx },
            cancel,
            task,
        }
    }

    pub fn sender(&self) -> NotificationSender {
        self.sender.clone()
    }

    pub fn send(&self, notification: SourceNotification) -> Result<(), CoreError> {
        self.sender.send(notification)
    }

    pub async fn flush(&self) -> Result<(), CoreError> {
        self.sender.flush().await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting notifications, apply everything already queued, and
    /// return the mirror.
    ///
    /// Other live [`NotificationSender`] clones keep the task running until
    /// they are dropped too.
    pub async fn close(self) -> Result<Mirror, CoreError> {
        let Self { sender, task, .. } = self;
        drop(sender);
        join(task).await
    }

    /// Stop promptly, discarding queued notifications, and return the mirror.
    pub async fn shutdown(self) -> Result<Mirror, CoreError> {
        self.cancel.cancel();
        join(self.task).await
    }
}

async fn join(task: JoinHandle<Mirror>) -> Result<Mirror, CoreError> {
    task.await
        .map_err(|e| CoreError::Internal(format!("notification pump task failed: {e}")))
}

async fn pump_task(
    mut mirror: Mirror,
    mut rx: mpsc::UnboundedReceiver<PumpMessage>,
    cancel: CancellationToken,
) -> Mirror {
    info!(client = mirror.context().client_name(), "notification pump started");
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => {
                let Some(message) = next else { break };
                match message {
                    PumpMessage::Notify(notification) => {
                        if let Err(e) = mirror.handle_notification(&notification) {
                            error!(error = %e, ?notification, "failed to apply notification");
                        }
                        processed += 1;
                    }
                    PumpMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        }
    }

    info!(processed, objects = mirror.len(), "notification pump stopped");
    mirror
}
