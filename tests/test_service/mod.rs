//! Shared fixtures for the integration tests: a two-room simulated building,
//! a transport that holds each request until the test releases it, and
//! helpers for waiting on worker events.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

use marauder::client::{Endpoint, Identity, Request, ResolutionClient, Transport};
use marauder::error::Result;
use marauder::fingerprint::{Fingerprint, SignalSample};
use marauder::place::{Coordinate, MapId};
use marauder::sampler::{AveragingSampler, SignalSampler};
use marauder::simulation::{RadioConfig, RadioPosition, SimulatedRadio, SimulatedService};
use marauder::worker::{PollingWorker, WorkerEvent, WorkerHandle, WorkerOptions};

pub const OFFICE: &str = "AC30,out,rm308";
pub const LOBBY: &str = "WH00,in,lobby";
pub const USER: &str = "ginny";

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn office_signals() -> Vec<SignalSample> {
    vec![
        SignalSample::new("00:0b:86:aa:00:01", -42.0),
        SignalSample::new("00:0b:86:aa:00:02", -67.0),
        SignalSample::new("00:0b:86:aa:00:03", -85.0),
    ]
}

pub fn lobby_signals() -> Vec<SignalSample> {
    vec![
        SignalSample::new("00:0b:86:aa:00:03", -48.0),
        SignalSample::new("00:0b:86:bb:00:01", -55.0),
        SignalSample::new("00:0b:86:bb:00:02", -73.0),
    ]
}

pub fn office_coordinate() -> Coordinate {
    Coordinate::new(120, 340, MapId::Primary)
}

pub fn lobby_coordinate() -> Coordinate {
    Coordinate::new(610, 95, MapId::Secondary)
}

/// Service that already knows both rooms.
pub fn seeded_service() -> SimulatedService {
    SimulatedService::new()
        .with_reference(OFFICE, office_coordinate(), Fingerprint::new(office_signals()))
        .with_reference(LOBBY, lobby_coordinate(), Fingerprint::new(lobby_signals()))
}

/// Probe-averaged noisy radio over `position`.
pub fn radio(position: &RadioPosition, seed: u64) -> Box<dyn SignalSampler> {
    let config = RadioConfig::default().with_seed(seed).with_noise(1.5);
    let radio = SimulatedRadio::new(position.clone(), &config).unwrap();
    Box::new(AveragingSampler::new(radio, 3, Duration::ZERO))
}

pub fn client(transport: impl Transport + 'static, sampler: Box<dyn SignalSampler>) -> ResolutionClient {
    ResolutionClient::new(Box::new(transport), sampler).with_platform("linux")
}

pub fn spawn(client: ResolutionClient, options: WorkerOptions) -> (WorkerHandle, Receiver<WorkerEvent>) {
    let (event_tx, event_rx) = unbounded();
    let handle = PollingWorker::spawn(client, Identity::new(USER), options, event_tx).unwrap();
    (handle, event_rx)
}

/// Wait for the first event matching `pred`, discarding the rest.
pub fn wait_for(events: &Receiver<WorkerEvent>, pred: impl Fn(&WorkerEvent) -> bool) -> WorkerEvent {
    loop {
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(e) => panic!("timed out waiting for worker event: {}", e),
        }
    }
}

/// Everything published until the worker stops.
pub fn drain_until_stopped(events: &Receiver<WorkerEvent>) -> Vec<WorkerEvent> {
    let mut seen = Vec::new();
    loop {
        let event = events
            .recv_timeout(EVENT_TIMEOUT)
            .unwrap_or_else(|e| panic!("worker did not stop: {}", e));
        let stopped = event == WorkerEvent::Stopped;
        seen.push(event);
        if stopped {
            return seen;
        }
    }
}

/// Holds every request until the test calls [`Gate::release`].
pub struct GatedTransport {
    inner: SimulatedService,
    entered: Sender<Endpoint>,
    gate: Receiver<()>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

pub struct Gate {
    pub entered: Receiver<Endpoint>,
    release: Sender<()>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Gate {
    /// Let `n` requests through.
    pub fn release(&self, n: usize) {
        for _ in 0..n {
            self.release.send(()).unwrap();
        }
    }

    /// Block until a request reaches the transport.
    pub fn wait_entered(&self) -> Endpoint {
        self.entered
            .recv_timeout(EVENT_TIMEOUT)
            .expect("no request reached the transport")
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn gated(inner: SimulatedService) -> (GatedTransport, Gate) {
    let (entered_tx, entered_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let transport = GatedTransport {
        inner,
        entered: entered_tx,
        gate: release_rx,
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: Arc::clone(&max_in_flight),
    };
    let gate = Gate {
        entered: entered_rx,
        release: release_tx,
        max_in_flight,
    };
    (transport, gate)
}

impl Transport for GatedTransport {
    fn execute(&self, request: &Request) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _ = self.entered.send(request.endpoint);
        let _ = self.gate.recv_timeout(EVENT_TIMEOUT);
        let result = self.inner.execute(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
