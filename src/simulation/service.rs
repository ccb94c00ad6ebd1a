use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;

use crate::client::{Endpoint, Request, Transport};
use crate::error::{LocatorError, Result};
use crate::fingerprint::{self, Fingerprint};
use crate::place::{Coordinate, MapId, PlaceId};

/// Strength assumed for a transmitter one side of a comparison did not see.
const MISSING_STRENGTH: f64 = -100.0;
const DEFAULT_MAX_CANDIDATES: usize = 5;

/// Euclidean distance between two fingerprints over the union of their
/// transmitters.
pub fn fingerprint_distance(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut sum = 0.0;
    for sample in a.samples() {
        let other = b.strength_of(&sample.transmitter_id).unwrap_or(MISSING_STRENGTH);
        sum += (sample.strength - other).powi(2);
    }
    for sample in b.samples() {
        if a.strength_of(&sample.transmitter_id).is_none() {
            sum += (sample.strength - MISSING_STRENGTH).powi(2);
        }
    }
    sum.sqrt()
}

#[derive(Debug, Clone)]
struct Reference {
    place: PlaceId,
    coordinate: Coordinate,
    fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
struct Sighting {
    place: PlaceId,
    status: String,
    last_update: String,
}

#[derive(Debug, Default)]
struct ServiceState {
    references: Vec<Reference>,
    sightings: HashMap<String, Sighting>,
    cloaked: HashSet<String>,
    requests: Vec<Request>,
    unreachable: bool,
}

/// Location service answering in-process with the real wire format.
///
/// Clones share state, so a test can keep one clone for inspection while
/// the client owns another.
#[derive(Debug, Clone)]
pub struct SimulatedService {
    state: Arc<Mutex<ServiceState>>,
    max_candidates: usize,
}

impl Default for SimulatedService {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedService {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState::default())),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Seed reference data directly, as if it had been trained earlier.
    pub fn with_reference(
        self,
        place: impl Into<PlaceId>,
        coordinate: Coordinate,
        fingerprint: Fingerprint,
    ) -> Self {
        if let Ok(mut state) = self.lock() {
            state.references.push(Reference {
                place: place.into(),
                coordinate,
                fingerprint,
            });
        }
        self
    }

    /// Make every following request fail as if the host were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut state) = self.lock() {
            state.unreachable = unreachable;
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self, endpoint: Endpoint) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    pub fn reference_count(&self) -> usize {
        self.lock().map(|state| state.references.len()).unwrap_or(0)
    }

    /// Place last posted for `username`, ignoring cloaking.
    pub fn last_place_of(&self, username: &str) -> Option<PlaceId> {
        self.lock()
            .ok()?
            .sightings
            .get(username)
            .map(|s| s.place.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ServiceState>> {
        self.state
            .lock()
            .map_err(|_| LocatorError::Transport("simulated service poisoned".into()))
    }

    fn update(&self, state: &mut ServiceState, request: &Request) -> String {
        let Some(username) = request.get("username") else {
            return "failure: missing username".to_string();
        };
        let reading = match request.get("data").map(fingerprint::decode) {
            Some(Ok(reading)) => reading,
            Some(Err(e)) => return format!("failure: {}", e),
            None => return "failure: missing data".to_string(),
        };

        if let Some(place) = request.get("placename") {
            state.sightings.insert(
                username.to_string(),
                Sighting {
                    place: PlaceId::new(place),
                    status: request.get("status").unwrap_or_default().to_string(),
                    last_update: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                },
            );
            state.cloaked.remove(username);
        }

        let mut ranked: Vec<(f64, &Reference)> = state
            .references
            .iter()
            .map(|r| (fingerprint_distance(&reading, &r.fingerprint), r))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut seen = HashSet::new();
        let candidates: Vec<String> = ranked
            .into_iter()
            .filter(|(_, r)| seen.insert(r.place.clone()))
            .take(self.max_candidates)
            .map(|(distance, r)| {
                format!(
                    "{}|{:.3}|{}|{}|{}",
                    r.place, distance, r.coordinate.x, r.coordinate.y, r.coordinate.map
                )
            })
            .collect();

        format!("success:{}", candidates.join(";"))
    }

    fn train(&self, state: &mut ServiceState, request: &Request) -> String {
        let (Some(place), Some(x), Some(y), Some(map), Some(data)) = (
            request.get("placename"),
            request.get("mapx").and_then(|v| v.parse::<i32>().ok()),
            request.get("mapy").and_then(|v| v.parse::<i32>().ok()),
            request.get("mapw").and_then(|v| v.parse::<MapId>().ok()),
            request.get("data"),
        ) else {
            return "failure: incomplete training request".to_string();
        };
        let fingerprint = match fingerprint::decode(data) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return format!("failure: {}", e),
        };

        state.references.push(Reference {
            place: PlaceId::new(place),
            coordinate: Coordinate::new(x, y, map),
            fingerprint,
        });
        log::debug!("Simulated service now holds {} references", state.references.len());
        format!("success:trained {}", place)
    }

    fn query(&self, state: &ServiceState, request: &Request) -> String {
        let username = request.get("username").unwrap_or_default();
        match state.sightings.get(username) {
            Some(s) if !state.cloaked.contains(username) => format!(
                "success:{}|{}|{}|{}",
                username, s.place, s.status, s.last_update
            ),
            _ => "success:nobody".to_string(),
        }
    }

    fn point_exists(&self, state: &ServiceState, request: &Request) -> String {
        let place = request.get("placename").unwrap_or_default();
        let exists = state.references.iter().any(|r| r.place.as_str() == place);
        format!("success:{}", exists)
    }

    fn cloak(&self, state: &mut ServiceState, request: &Request) -> String {
        let Some(username) = request.get("username") else {
            return "failure: missing username".to_string();
        };
        state.cloaked.insert(username.to_string());
        format!("success:cloaked {}", username)
    }
}

impl Transport for SimulatedService {
    fn execute(&self, request: &Request) -> Result<String> {
        let mut state = self.lock()?;
        state.requests.push(request.clone());
        if state.unreachable {
            return Err(LocatorError::Transport("simulated host unreachable".into()));
        }

        let body = match request.endpoint {
            Endpoint::Update => self.update(&mut state, request),
            Endpoint::Train => self.train(&mut state, request),
            Endpoint::Query => self.query(&state, request),
            Endpoint::PointExistence => self.point_exists(&state, request),
            Endpoint::Cloak => self.cloak(&mut state, request),
        };
        Ok(body)
    }
}
