//! Device position lookup.
//!
//! Every failure is classified into one of four [`LocationError`] kinds
//! before it leaves this module; callers never see transport errors.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::state::UserFix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location request timed out")]
    Timeout,
    #[error("location unavailable")]
    Unavailable,
    #[error("location not supported on this platform")]
    Unsupported,
}

/// What the presentation layer shows next to the title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationStatus {
    #[default]
    None,
    Denied,
    Timeout,
    Unavailable,
    Unsupported,
}

impl LocationStatus {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            LocationStatus::None => None,
            LocationStatus::Denied => Some("Permission Denied"),
            LocationStatus::Timeout => Some("Timeout"),
            LocationStatus::Unavailable => Some("Unavailable"),
            LocationStatus::Unsupported => Some("Not Supported"),
        }
    }

    pub fn is_error(&self) -> bool {
        *self != LocationStatus::None
    }
}

impl From<LocationError> for LocationStatus {
    fn from(error: LocationError) -> Self {
        match error {
            LocationError::PermissionDenied => LocationStatus::Denied,
            LocationError::Timeout => LocationStatus::Timeout,
            LocationError::Unavailable => LocationStatus::Unavailable,
            LocationError::Unsupported => LocationStatus::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// A previous fix younger than this is returned without a new lookup
    pub max_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(20),
            max_age: Duration::from_secs(5),
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One attempt. Retrying is up to the caller.
    async fn request(&self, options: &LocationOptions) -> Result<UserFix, LocationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    Ip(String),
    Fixed(UserFix),
    Denied,
    None,
}

pub fn build_provider(
    source: &LocationSource,
    user_agent: &str,
) -> anyhow::Result<Arc<dyn LocationProvider>> {
    let provider: Arc<dyn LocationProvider> = match source {
        LocationSource::Ip(url) => Arc::new(IpLocation::new(url, user_agent)?),
        LocationSource::Fixed(fix) => Arc::new(FixedLocation(*fix)),
        LocationSource::Denied => Arc::new(DeniedLocation),
        LocationSource::None => Arc::new(NoLocation),
    };
    Ok(provider)
}

/// Always answers with the configured coordinates
pub struct FixedLocation(pub UserFix);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request(&self, _options: &LocationOptions) -> Result<UserFix, LocationError> {
        Ok(self.0)
    }
}

/// The platform has no way to locate the user
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn request(&self, _options: &LocationOptions) -> Result<UserFix, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// The user has opted out of sharing a position
pub struct DeniedLocation;

#[async_trait]
impl LocationProvider for DeniedLocation {
    async fn request(&self, _options: &LocationOptions) -> Result<UserFix, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

#[derive(Deserialize)]
struct IpLocationResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// Coarse position from an IP geolocation service (ip-api.com JSON shape).
/// `high_accuracy` has no effect here.
pub struct IpLocation {
    client: Client,
    url: String,
    last_fix: Mutex<Option<(UserFix, Instant)>>,
}

impl IpLocation {
    pub fn new(url: &str, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            last_fix: Mutex::new(None),
        })
    }

    fn cached(&self, max_age: Duration) -> Option<UserFix> {
        let last_fix = self.last_fix.lock().unwrap_or_else(|e| e.into_inner());
        (*last_fix)
            .filter(|(_, at)| at.elapsed() <= max_age)
            .map(|(fix, _)| fix)
    }

    fn remember(&self, fix: UserFix) {
        let mut last_fix = self.last_fix.lock().unwrap_or_else(|e| e.into_inner());
        *last_fix = Some((fix, Instant::now()));
    }
}

fn classify(error: &reqwest::Error) -> LocationError {
    if error.is_timeout() {
        LocationError::Timeout
    } else {
        LocationError::Unavailable
    }
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn request(&self, options: &LocationOptions) -> Result<UserFix, LocationError> {
        if let Some(fix) = self.cached(options.max_age) {
            debug!("Reusing cached location fix");
            return Ok(fix);
        }

        let response = self
            .client
            .get(&self.url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("Location lookup failed: {}", e);
                classify(&e)
            })?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(LocationError::PermissionDenied);
        }
        if !response.status().is_success() {
            warn!("Location service returned {}", response.status());
            return Err(LocationError::Unavailable);
        }

        let body: IpLocationResponse = response.json().await.map_err(|e| {
            warn!("Unreadable location response: {}", e);
            classify(&e)
        })?;

        if body.status != "success" {
            warn!(
                "Location service could not place this address: {}",
                body.message.unwrap_or_default()
            );
            return Err(LocationError::Unavailable);
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                let fix = UserFix::new(lat, lon);
                self.remember(fix);
                Ok(fix)
            }
            _ => Err(LocationError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn quick() -> LocationOptions {
        LocationOptions {
            timeout: Duration::from_millis(200),
            ..LocationOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = LocationOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_millis(20_000));
        assert_eq!(options.max_age, Duration::from_millis(5_000));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(LocationStatus::from(LocationError::PermissionDenied).label(), Some("Permission Denied"));
        assert_eq!(LocationStatus::from(LocationError::Timeout).label(), Some("Timeout"));
        assert_eq!(LocationStatus::from(LocationError::Unavailable).label(), Some("Unavailable"));
        assert_eq!(LocationStatus::from(LocationError::Unsupported).label(), Some("Not Supported"));
        assert_eq!(LocationStatus::None.label(), None);
    }

    #[tokio::test]
    async fn test_static_providers() {
        let options = LocationOptions::default();
        assert_eq!(NoLocation.request(&options).await, Err(LocationError::Unsupported));
        assert_eq!(DeniedLocation.request(&options).await, Err(LocationError::PermissionDenied));
        let fix = UserFix::new(34.02, -6.83);
        assert_eq!(FixedLocation(fix).request(&options).await, Ok(fix));
    }

    #[tokio::test]
    async fn test_ip_lookup_success_then_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/json");
                then.status(200)
                    .json_body(json!({"status": "success", "lat": 31.63, "lon": -7.99}));
            })
            .await;

        let provider = IpLocation::new(&server.url("/json"), "murshid-test").unwrap();
        let fix = provider.request(&quick()).await.unwrap();
        assert_eq!(fix, UserFix::new(31.63, -7.99));

        let again = provider.request(&quick()).await.unwrap();
        assert_eq!(again, fix);
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_ip_lookup_failure_status_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json");
                then.status(200)
                    .json_body(json!({"status": "fail", "message": "private range"}));
            })
            .await;

        let provider = IpLocation::new(&server.url("/json"), "murshid-test").unwrap();
        assert_eq!(provider.request(&quick()).await, Err(LocationError::Unavailable));
    }

    #[tokio::test]
    async fn test_ip_lookup_forbidden_is_denied() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json");
                then.status(403);
            })
            .await;

        let provider = IpLocation::new(&server.url("/json"), "murshid-test").unwrap();
        assert_eq!(provider.request(&quick()).await, Err(LocationError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_ip_lookup_slow_service_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(json!({"status": "success", "lat": 1.0, "lon": 2.0}));
            })
            .await;

        let provider = IpLocation::new(&server.url("/json"), "murshid-test").unwrap();
        assert_eq!(provider.request(&quick()).await, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_ip_lookup_unreachable_is_unavailable() {
        let provider = IpLocation::new("http://127.0.0.1:9/json", "murshid-test").unwrap();
        assert_eq!(provider.request(&quick()).await, Err(LocationError::Unavailable));
    }

    #[tokio::test]
    async fn test_built_ip_provider_sends_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/json").header("user-agent", "murshid-test/1.0");
                then.status(200)
                    .json_body(json!({"status": "success", "lat": 33.57, "lon": -7.59}));
            })
            .await;

        let source = LocationSource::Ip(server.url("/json"));
        let provider = build_provider(&source, "murshid-test/1.0").unwrap();
        assert_eq!(provider.request(&quick()).await, Ok(UserFix::new(33.57, -7.59)));
        mock.assert_async().await;
    }

    #[test]
    fn test_build_provider_rejects_invalid_user_agent() {
        let source = LocationSource::Ip("http://127.0.0.1:9/json".to_string());
        assert!(build_provider(&source, "bad\nagent").is_err());
    }
}
