use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use super::Intent;
use crate::place::{Coordinate, PlaceId};

/// Out-of-band messages that must never be dropped by a full intent queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Control {
    GoOffline,
    Shutdown,
}

/// What happened to an intent handed to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Accepted,
    /// A refresh is already running or queued; this one was dropped
    Coalesced,
    /// The queue slot is taken by other work; the intent is handed back
    Rejected(Intent),
    /// The worker thread has exited
    Closed,
}

/// Foreground side of the worker. Dropping it shuts the worker down.
pub struct WorkerHandle {
    intents: Sender<Intent>,
    control: Sender<Control>,
    busy: Arc<AtomicBool>,
    /// Refreshes queued or running, counted by both sides
    refreshes: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(super) fn new(
        intents: Sender<Intent>,
        control: Sender<Control>,
        busy: Arc<AtomicBool>,
        refreshes: Arc<AtomicUsize>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            intents,
            control,
            busy,
            refreshes,
            thread: Some(thread),
        }
    }

    /// Whether the worker was busy when it last published its state.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Ask for a location refresh, skipped if one is already running or
    /// queued. Other work in progress does not block it.
    pub fn refresh(&self) -> Dispatch {
        if self
            .refreshes
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Dispatch::Coalesced;
        }
        let dispatch = self.enqueue(Intent::Refresh);
        if dispatch != Dispatch::Accepted {
            self.refreshes.fetch_sub(1, Ordering::SeqCst);
        }
        dispatch
    }

    /// Report the user's actual location and train the service with it.
    pub fn correct(&self, place: PlaceId, coordinate: Coordinate) -> Dispatch {
        self.submit(Intent::Correct { place, coordinate })
    }

    pub fn post(&self, place: PlaceId, status: Option<String>) -> Dispatch {
        self.submit(Intent::Post { place, status })
    }

    pub fn query_person(&self, username: impl Into<String>) -> Dispatch {
        self.submit(Intent::QueryPerson(username.into()))
    }

    pub fn check_place(&self, place: PlaceId) -> Dispatch {
        self.submit(Intent::CheckPlace(place))
    }

    pub fn cloak(&self, username: impl Into<String>) -> Dispatch {
        self.submit(Intent::Cloak(username.into()))
    }

    /// Queue an intent without blocking.
    pub fn submit(&self, intent: Intent) -> Dispatch {
        match intent {
            Intent::Refresh => self.refresh(),
            intent => self.enqueue(intent),
        }
    }

    fn enqueue(&self, intent: Intent) -> Dispatch {
        match self.intents.try_send(intent) {
            Ok(()) => Dispatch::Accepted,
            Err(TrySendError::Full(intent)) => {
                log::debug!("Worker queue full, rejecting {} intent", intent.name());
                Dispatch::Rejected(intent)
            }
            Err(TrySendError::Disconnected(_)) => Dispatch::Closed,
        }
    }

    /// Stop all further network activity. Idempotent and permanent: a
    /// request already in flight completes, nothing after it is sent.
    pub fn stop_working(&self) {
        if self.control.send(Control::GoOffline).is_err() {
            log::debug!("Worker already gone");
        }
    }

    /// Stop the worker and wait for any in-flight request to finish.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.control.send(Control::Shutdown);
        if thread.join().is_err() {
            log::error!("Location worker panicked");
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.join();
    }
}
