//! Worker-to-UI marshaling.
//!
//! The worker never touches presentation state. It hands immutable
//! snapshots to a single-slot mailbox ([`Presenter::publish`]), asks the UI
//! thread to apply mode transitions and waits a bounded time for the
//! acknowledgement ([`Presenter::set_mode`]), and posts session events on an
//! unbounded channel ([`Presenter::notify`]). The UI thread drains all three
//! through a [`PresentationReceiver`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::presentation::mailbox::{MailboxStats, SnapshotMailbox};
use crate::presentation::snapshot::{FrameSnapshot, SessionEvent, UiMode};
use crate::shared::constants::{FRAME_DELIVERY_BUDGET, MODE_CHANGE_BUDGET};

/// A mode transition waiting to be applied on the UI thread.
pub struct ModeRequest {
    pub mode: UiMode,
    ack: Sender<()>,
}

impl ModeRequest {
    /// Signals the worker that the mode has been applied.
    pub fn acknowledge(self) {
        // The worker may have stopped waiting; that is fine.
        let _ = self.ack.send(());
    }
}

/// Worker-side handle. Cheap to clone.
#[derive(Clone)]
pub struct Presenter {
    mailbox: Arc<SnapshotMailbox<FrameSnapshot>>,
    wake_tx: Sender<()>,
    mode_tx: Sender<ModeRequest>,
    event_tx: Sender<SessionEvent>,
    sequence: Arc<AtomicU64>,
    frame_budget: Duration,
    mode_budget: Duration,
}

/// UI-side handle.
pub struct PresentationReceiver {
    mailbox: Arc<SnapshotMailbox<FrameSnapshot>>,
    wake_rx: Receiver<()>,
    mode_rx: Receiver<ModeRequest>,
    event_rx: Receiver<SessionEvent>,
    last_sequence: Option<u64>,
}

/// Creates a connected presenter/receiver pair with the default budgets.
pub fn presentation_channel() -> (Presenter, PresentationReceiver) {
    let mailbox = Arc::new(SnapshotMailbox::new());
    let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
    let (mode_tx, mode_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    let presenter = Presenter {
        mailbox: Arc::clone(&mailbox),
        wake_tx,
        mode_tx,
        event_tx,
        sequence: Arc::new(AtomicU64::new(0)),
        frame_budget: FRAME_DELIVERY_BUDGET,
        mode_budget: MODE_CHANGE_BUDGET,
    };
    let receiver = PresentationReceiver {
        mailbox,
        wake_rx,
        mode_rx,
        event_rx,
        last_sequence: None,
    };
    (presenter, receiver)
}

impl Presenter {
    /// Returns a handle sharing the same channels with different budgets.
    pub fn with_budgets(&self, frame_budget: Duration, mode_budget: Duration) -> Self {
        Self {
            frame_budget,
            mode_budget,
            ..self.clone()
        }
    }

    /// Fire-and-forget: overwrites any snapshot the UI has not taken yet.
    pub fn publish(&self, mut snapshot: FrameSnapshot) {
        snapshot.sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.mailbox.post(snapshot, self.frame_budget);
        // A full wake channel already has a pending tick.
        let _ = self.wake_tx.try_send(());
    }

    /// Asks the UI thread to apply `mode` and waits up to the mode budget for
    /// it to acknowledge. Returns whether the acknowledgement arrived; a
    /// timeout or a departed UI is not an error.
    pub fn set_mode(&self, mode: UiMode) -> bool {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.mode_tx.send(ModeRequest { mode, ack: ack_tx }).is_err() {
            log::debug!("Mode change to {mode:?} dropped: UI is gone");
            return false;
        }
        match ack_rx.recv_timeout(self.mode_budget) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("Mode change to {mode:?} not acknowledged in time");
                false
            }
        }
    }

    /// Queues `mode` for the UI thread without waiting for the
    /// acknowledgement. Used for the end-of-session transition, which may be
    /// raised while the UI thread is itself blocked joining the worker.
    pub fn post_mode(&self, mode: UiMode) {
        let (ack_tx, _ack_rx) = crossbeam_channel::bounded(1);
        if self.mode_tx.send(ModeRequest { mode, ack: ack_tx }).is_err() {
            log::debug!("Mode change to {mode:?} dropped: UI is gone");
        }
    }

    pub fn notify(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            log::debug!("Session event dropped: UI is gone");
        }
    }
}

impl PresentationReceiver {
    /// Takes the most recent undelivered snapshot, if any and not expired.
    /// Never yields a snapshot older than one already delivered.
    pub fn take_snapshot(&mut self) -> Option<FrameSnapshot> {
        let snapshot = self.mailbox.take()?;
        if self.last_sequence.is_some_and(|last| snapshot.sequence <= last) {
            return None;
        }
        self.last_sequence = Some(snapshot.sequence);
        Some(snapshot)
    }

    /// Next pending mode request. Entering [`UiMode::Idle`] discards any
    /// undelivered snapshot so the view can return to neutral.
    pub fn try_mode(&self) -> Option<ModeRequest> {
        let request = self.mode_rx.try_recv().ok()?;
        Some(self.accept_mode(request))
    }

    /// Receiver-side effects of a mode request taken directly from
    /// [`PresentationReceiver::mode_requests`]. Call before acknowledging.
    pub fn accept_mode(&self, request: ModeRequest) -> ModeRequest {
        if request.mode == UiMode::Idle {
            self.mailbox.clear();
        }
        request
    }

    pub fn try_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Ticks when a snapshot may be waiting; for `select!`.
    pub fn snapshot_ready(&self) -> &Receiver<()> {
        &self.wake_rx
    }

    pub fn mode_requests(&self) -> &Receiver<ModeRequest> {
        &self.mode_rx
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.event_rx
    }

    pub fn mailbox_stats(&self) -> MailboxStats {
        self.mailbox.stats()
    }
}
