//! Request/response protocol with the location service.
//!
//! Every operation builds a [`Request`], hands it to the [`Transport`],
//! strips the `success:` prefix and decodes the payload. Failures come back
//! as [`LocatorError`] values; nothing here panics on bad input.
//!
//! The client owns no mutable location state. The one-slot fingerprint cache
//! belongs to the caller (the polling worker) and is passed in by reference.

pub mod environment;
pub mod person;
pub mod transport;

pub use environment::{Identity, current_username, platform};
pub use person::{PersonLookup, PersonRecord, decode_person};
pub use transport::{Endpoint, HttpTransport, Request, Transport, parse_response};

use crate::config::LocatorConfig;
use crate::error::Result;
use crate::fingerprint::{Fingerprint, FingerprintCache};
use crate::place::{Coordinate, PlaceId, ResolutionResult, decode_result_list};
use crate::sampler::{SignalSampler, create_sampler};

/// Optional fields of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    /// Where the user says they are; omitted for a pure lookup
    pub place: Option<PlaceId>,
    pub status: Option<String>,
    /// Take a new reading even when a cached one exists
    pub force_resample: bool,
}

impl UpdateRequest {
    /// Fresh reading, no claimed place.
    pub fn locate() -> Self {
        Self {
            force_resample: true,
            ..Self::default()
        }
    }

    /// Claim `place` using the cached reading when there is one.
    pub fn weak_post(place: PlaceId) -> Self {
        Self {
            place: Some(place),
            ..Self::default()
        }
    }

    /// Claim `place` with a fresh reading.
    pub fn post(place: PlaceId) -> Self {
        Self {
            place: Some(place),
            force_resample: true,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

pub struct ResolutionClient {
    transport: Box<dyn Transport>,
    sampler: Box<dyn SignalSampler>,
    platform: String,
}

impl ResolutionClient {
    pub fn new(transport: Box<dyn Transport>, sampler: Box<dyn SignalSampler>) -> Self {
        Self {
            transport,
            sampler,
            platform: platform(),
        }
    }

    /// HTTP transport and the configured sampler.
    pub fn from_config(config: &LocatorConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.service.base_url, config.service.timeout())?;
        let sampler = create_sampler(&config.sampler)?;
        Ok(Self::new(Box::new(transport), sampler))
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Ask where `username` is, optionally telling the service where they are.
    ///
    /// Reuses the cached fingerprint unless a resample is forced or the cache
    /// is empty. A fresh fingerprint only replaces the cache once the service
    /// has answered, so a failed exchange leaves the cache untouched. Never
    /// changes the service's reference data.
    pub fn update(
        &mut self,
        cache: &mut FingerprintCache,
        username: &str,
        request: &UpdateRequest,
    ) -> Result<ResolutionResult> {
        let (fingerprint, fresh) = match cache.get() {
            Some(cached) if !request.force_resample => (cached.clone(), false),
            _ => (self.sampler.sample()?, true),
        };

        let wire = Request::new(Endpoint::Update)
            .field("username", username)
            .field("data", fingerprint.encode())
            .field("platform", &self.platform)
            .optional_field("placename", request.place.as_ref())
            .optional_field("status", request.status.as_deref());

        let payload = self.exchange(&wire)?;
        if fresh {
            cache.replace(fingerprint);
        }

        let candidates = decode_result_list(&payload)?;
        log::debug!("Update returned {} candidates", candidates.len());
        Ok(candidates)
    }

    /// Bind a fresh reading to `place` at `coordinate` in the reference data.
    ///
    /// Always resamples; the new reading replaces the cache once accepted.
    pub fn train(
        &mut self,
        cache: &mut FingerprintCache,
        username: &str,
        place: &PlaceId,
        coordinate: &Coordinate,
    ) -> Result<String> {
        let fingerprint = self.sampler.sample()?;

        let wire = Request::new(Endpoint::Train)
            .field("username", username)
            .field("placename", place)
            .field("mapx", coordinate.x)
            .field("mapy", coordinate.y)
            .field("mapw", coordinate.map)
            .field("data", fingerprint.encode())
            .field("platform", &self.platform);

        let ack = self.exchange(&wire)?;
        cache.replace(fingerprint);
        log::info!("Trained {} at ({}, {})", place, coordinate.x, coordinate.y);
        Ok(ack)
    }

    pub fn query_person(&self, username: &str) -> Result<PersonLookup> {
        let wire = Request::new(Endpoint::Query).field("username", username);
        decode_person(&self.exchange(&wire)?)
    }

    pub fn check_place_exists(&self, place: &PlaceId) -> Result<bool> {
        let wire = Request::new(Endpoint::PointExistence).field("placename", place);
        Ok(self.exchange(&wire)? == "true")
    }

    /// Ask the service to stop showing `username` on the map.
    ///
    /// No local permission check is made; the service decides who may cloak
    /// whom.
    pub fn cloak(&self, username: &str) -> Result<String> {
        let wire = Request::new(Endpoint::Cloak).field("username", username);
        self.exchange(&wire)
    }

    /// Sample without talking to the service.
    pub fn sample(&mut self) -> Result<Fingerprint> {
        self.sampler.sample()
    }

    fn exchange(&self, request: &Request) -> Result<String> {
        let body = self.transport.execute(request).inspect_err(|e| {
            log::warn!("{} failed: {}", request.endpoint.script(), e);
        })?;
        parse_response(&body).inspect_err(|e| {
            log::warn!("{} rejected: {}", request.endpoint.script(), e);
        })
    }
}
