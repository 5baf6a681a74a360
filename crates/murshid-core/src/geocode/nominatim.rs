use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{GeocodeQuery, GeocodeSearch};
use crate::map::LatLon;

/// Nominatim returns coordinates as decimal strings
#[derive(Deserialize, Debug)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimPlace {
    fn position(&self) -> Option<LatLon> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lon = self.lon.trim().parse::<f64>().ok()?;
        LatLon::checked(lat, lon)
    }
}

/// OpenStreetMap Nominatim search client. The public instance requires an
/// identifying User-Agent and at most one request per second.
#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn query_params(query: &GeocodeQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("format", "json".to_string()),
        ("q", query.text.clone()),
        ("limit", "1".to_string()),
        ("addressdetails", "1".to_string()),
    ];
    if let Some(viewbox) = query.viewbox {
        params.push(("viewbox", viewbox.to_param()));
        params.push(("bounded", "0".to_string()));
        params.push(("accept-language", format!("{},en", query.language.code())));
    }
    params
}

#[async_trait]
impl GeocodeSearch for NominatimClient {
    async fn search(&self, query: &GeocodeQuery) -> Result<Option<LatLon>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&query_params(query))
            .header(ACCEPT_LANGUAGE, query.language.code())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Nominatim error {} for {:?}", response.status(), query.text));
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let found = places.first().and_then(NominatimPlace::position);
        if let Some(place) = places.first() {
            debug!(
                "Geocoded {:?} to {}",
                query.text,
                place.display_name.as_deref().unwrap_or("(unnamed)")
            );
        }
        Ok(found)
    }
}
