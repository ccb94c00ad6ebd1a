use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, never, select, tick, unbounded};

use super::handle::{Control, WorkerHandle};
use super::{Intent, Outcome, WorkerEvent, WorkerStatus};
use crate::client::{Identity, ResolutionClient, UpdateRequest};
use crate::config::PollingConfig;
use crate::error::{LocatorError, Result};
use crate::fingerprint::FingerprintCache;
use crate::place::{Coordinate, PlaceId};

/// Timer and startup behaviour of a worker.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Refresh period; `None` disables the timer
    pub poll_interval: Option<Duration>,
    pub refresh_on_start: bool,
}

impl WorkerOptions {
    /// No timer and no startup refresh: the worker only acts on intents.
    pub fn manual() -> Self {
        Self {
            poll_interval: None,
            refresh_on_start: false,
        }
    }
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for WorkerOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            poll_interval: Some(config.interval.as_duration()),
            refresh_on_start: config.refresh_on_start,
        }
    }
}

/// State owned by the worker thread alone.
///
/// `can_work` only ever goes from true to false; a worker that has gone
/// offline stays offline until it is replaced.
#[derive(Debug)]
pub struct WorkerState {
    can_work: bool,
    cache: FingerprintCache,
}

impl WorkerState {
    pub fn new() -> Self {
        Self {
            can_work: true,
            cache: FingerprintCache::new(),
        }
    }

    pub fn can_work(&self) -> bool {
        self.can_work
    }

    pub fn stop_working(&mut self) {
        self.can_work = false;
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

/// The worker actor. Construct with [`PollingWorker::spawn`].
pub struct PollingWorker {
    client: ResolutionClient,
    identity: Identity,
    state: WorkerState,
    intents: Receiver<Intent>,
    control: Receiver<Control>,
    events: Sender<WorkerEvent>,
    busy: Arc<AtomicBool>,
    refreshes: Arc<AtomicUsize>,
    shutdown_requested: bool,
}

impl PollingWorker {
    /// Start the worker thread.
    ///
    /// Events are published on `events`; the returned handle is the only way
    /// to send work to the thread, and joins it on shutdown.
    pub fn spawn(
        client: ResolutionClient,
        identity: Identity,
        options: WorkerOptions,
        events: Sender<WorkerEvent>,
    ) -> Result<WorkerHandle> {
        let (intent_tx, intent_rx) = bounded(1);
        let (control_tx, control_rx) = unbounded();
        let busy = Arc::new(AtomicBool::new(false));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let worker = Self {
            client,
            identity,
            state: WorkerState::new(),
            intents: intent_rx,
            control: control_rx,
            events,
            busy: Arc::clone(&busy),
            refreshes: Arc::clone(&refreshes),
            shutdown_requested: false,
        };

        let thread = thread::Builder::new()
            .name("location-worker".into())
            .spawn(move || worker.run(options))
            .map_err(|e| LocatorError::Worker(e.to_string()))?;

        Ok(WorkerHandle::new(
            intent_tx, control_tx, busy, refreshes, thread,
        ))
    }

    fn run(mut self, options: WorkerOptions) {
        log::info!("Location worker started for {}", self.identity.username);
        self.publish(WorkerEvent::Status(WorkerStatus::Idle));

        let ticker = match options.poll_interval {
            Some(period) => tick(period),
            None => never(),
        };

        if options.refresh_on_start {
            self.scheduled_refresh();
        }

        let control_rx = self.control.clone();
        let intent_rx = self.intents.clone();

        while !self.shutdown_requested {
            select! {
                recv(control_rx) -> msg => match msg {
                    Ok(control) => self.apply(control),
                    Err(_) => break,
                },
                recv(intent_rx) -> msg => match msg {
                    Ok(intent) => {
                        // Control sent before this intent must take effect first.
                        self.drain_control();
                        if self.shutdown_requested {
                            break;
                        }
                        self.execute(intent);
                    }
                    Err(_) => break,
                },
                recv(ticker) -> _ => {
                    if self.state.can_work() {
                        self.scheduled_refresh();
                    }
                },
            }

            // Ticks that fired while busy are skipped, not replayed.
            while ticker.try_recv().is_ok() {}
        }

        log::info!("Location worker stopped");
        self.publish(WorkerEvent::Stopped);
    }

    fn apply(&mut self, control: Control) {
        match control {
            Control::GoOffline => {
                if self.state.can_work() {
                    log::info!("Going offline; location updates disabled");
                    self.state.stop_working();
                    self.publish(WorkerEvent::Status(WorkerStatus::Offline));
                }
            }
            Control::Shutdown => self.shutdown_requested = true,
        }
    }

    fn drain_control(&mut self) {
        while let Ok(control) = self.control.try_recv() {
            self.apply(control);
        }
    }

    /// Refresh not requested through the handle; counted so that a user
    /// refresh arriving meanwhile coalesces with it.
    fn scheduled_refresh(&mut self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.execute(Intent::Refresh);
    }

    fn execute(&mut self, intent: Intent) {
        log::debug!("Handling {} intent", intent.name());
        self.busy.store(true, Ordering::SeqCst);
        self.publish(WorkerEvent::Status(WorkerStatus::Busy));

        match intent {
            Intent::Refresh => {
                self.refresh();
                self.refreshes.fetch_sub(1, Ordering::SeqCst);
            }
            Intent::Correct { place, coordinate } => self.correct(place, coordinate),
            Intent::Post { place, status } => self.post(place, status),
            Intent::QueryPerson(username) => {
                let outcome = self.guarded(|w| w.client.query_person(&username));
                self.publish(WorkerEvent::PersonFound { username, outcome });
            }
            Intent::CheckPlace(place) => {
                let outcome = self.guarded(|w| w.client.check_place_exists(&place));
                self.publish(WorkerEvent::PlaceChecked { place, outcome });
            }
            Intent::Cloak(username) => {
                let outcome = self.guarded(|w| w.client.cloak(&username));
                self.publish(WorkerEvent::Cloaked { username, outcome });
            }
        }

        self.busy.store(false, Ordering::SeqCst);
        let status = if self.state.can_work() {
            WorkerStatus::Idle
        } else {
            WorkerStatus::Offline
        };
        self.publish(WorkerEvent::Status(status));
    }

    /// Ask where we are, then confirm the best guess with the cached reading.
    fn refresh(&mut self) {
        let outcome = self.guarded(|w| {
            w.client.update(
                &mut w.state.cache,
                &w.identity.username,
                &UpdateRequest::locate(),
            )
        });

        let top = outcome
            .completed()
            .and_then(|candidates| candidates.first())
            .map(|candidate| candidate.place.clone());
        self.publish(WorkerEvent::Located(outcome));

        if let Some(place) = top {
            self.weak_post(place);
        }
    }

    fn correct(&mut self, place: PlaceId, coordinate: Coordinate) {
        log::info!("User corrected location to {}", place.readable_name());
        let outcome = self.guarded(|w| {
            w.client
                .train(&mut w.state.cache, &w.identity.username, &place, &coordinate)
        });
        let disabled = outcome.is_disabled();
        self.publish(WorkerEvent::Corrected {
            place: place.clone(),
            outcome,
        });

        if !disabled {
            self.weak_post(place);
        }
    }

    fn post(&mut self, place: PlaceId, status: Option<String>) {
        let mut request = UpdateRequest::post(place.clone());
        request.status = status;
        let outcome = self.guarded(|w| {
            w.client
                .update(&mut w.state.cache, &w.identity.username, &request)
        });
        self.publish(WorkerEvent::Posted { place, outcome });
    }

    /// Follow-up post reusing the cached reading. Skipped if the worker went
    /// offline while the preceding request was in flight.
    fn weak_post(&mut self, place: PlaceId) {
        self.drain_control();
        if !self.state.can_work() {
            log::debug!("Offline; not posting {}", place);
            return;
        }

        let request = UpdateRequest::weak_post(place.clone());
        let outcome = self.guarded(|w| {
            w.client
                .update(&mut w.state.cache, &w.identity.username, &request)
        });
        self.publish(WorkerEvent::Posted { place, outcome });
    }

    /// Run a network operation unless the worker has gone offline.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Outcome<T> {
        if !self.state.can_work() {
            return Outcome::Disabled;
        }
        let result = op(self);
        match &result {
            Err(e) if e.is_transient() => log::warn!("{}; retrying on next refresh", e),
            Err(e) => log::error!("{}", e),
            Ok(_) => {}
        }
        result.into()
    }

    fn publish(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            log::trace!("Event receiver dropped");
        }
    }
}
