//! Marker set and viewport for the map view.
//!
//! The projector holds no drawing code. Front ends read [`MapProjector::markers`]
//! and [`MapProjector::viewport`] after each event and redraw from scratch.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geocode::{Resolution, RunToken};
use crate::language::Language;
use crate::state::{ResolvedPlace, UserFix};
use crate::strings::strings;

/// Shown when no fix is available (geographic centre of Morocco)
pub const DEFAULT_CENTER: LatLon = LatLon::new(31.7917, -7.0926);
pub const USER_ZOOM: f64 = 15.0;
pub const DEFAULT_ZOOM: f64 = 6.0;
pub const MAX_FIT_ZOOM: f64 = 16.0;
pub const FIT_PADDING: f64 = 50.0;
pub const TILE_SIZE: f64 = 256.0;
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

pub const USER_COLOR: &str = "#059669";
pub const DEFAULT_LOCATION_COLOR: &str = "#64748b";
pub const PLACE_COLOR: &str = "#ef4444";

// Web Mercator is undefined at the poles
const MAX_LATITUDE: f64 = 85.051_128_78;

// Used for fitting until a surface is attached
const NOMINAL_SURFACE: SurfaceSize = SurfaceSize { width: 800, height: 600 };

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `None` unless both values are finite and in range
    pub fn checked(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }

    /// Normalized Web Mercator position, both axes in 0..=1
    fn project(self) -> (f64, f64) {
        let x = (self.lon + 180.0) / 360.0;
        let sin = self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().sin();
        let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI);
        (x, y)
    }

    fn unproject(x: f64, y: f64) -> Self {
        let lon = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        Self { lat, lon }
    }
}

impl From<UserFix> for LatLon {
    fn from(fix: UserFix) -> Self {
        Self::new(fix.latitude, fix.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn enclosing(points: &[LatLon]) -> Option<Self> {
        let first = points.first()?;
        let start = Bounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(points[1..].iter().fold(start, |b, p| Bounds {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }

    pub fn contains(&self, point: LatLon) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lon)
    }
}

/// Pixel size of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: f64,
}

impl Viewport {
    fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    /// Closest zoom that shows `bounds` inside `surface` minus `padding`
    /// on every side, snapped down to a whole level and capped at `max_zoom`.
    pub fn fit(bounds: Bounds, surface: SurfaceSize, padding: f64, max_zoom: f64) -> Self {
        let (west, north) = LatLon::new(bounds.north, bounds.west).project();
        let (east, south) = LatLon::new(bounds.south, bounds.east).project();
        let center = LatLon::unproject((west + east) / 2.0, (north + south) / 2.0);

        let span_x = (east - west).abs() * TILE_SIZE;
        let span_y = (south - north).abs() * TILE_SIZE;
        let room_x = f64::from(surface.width) - 2.0 * padding;
        let room_y = f64::from(surface.height) - 2.0 * padding;
        if room_x <= 0.0 || room_y <= 0.0 {
            return Self { center, zoom: 0.0 };
        }

        let zoom_for = |span: f64, room: f64| {
            if span > 0.0 { (room / span).log2() } else { f64::INFINITY }
        };
        let zoom = zoom_for(span_x, room_x)
            .min(zoom_for(span_y, room_y))
            .floor()
            .clamp(0.0, max_zoom);

        Self { center, zoom }
    }

    /// Geographic area shown when this viewport fills `surface`
    pub fn visible_bounds(&self, surface: SurfaceSize) -> Bounds {
        let (cx, cy) = self.center.project();
        let half_x = f64::from(surface.width) / 2.0 / self.world_size();
        let half_y = f64::from(surface.height) / 2.0 / self.world_size();
        let north_west = LatLon::unproject(cx - half_x, (cy - half_y).max(0.0));
        let south_east = LatLon::unproject(cx + half_x, (cy + half_y).min(1.0));
        Bounds {
            south: south_east.lat,
            west: north_west.lon.max(-180.0),
            north: north_west.lat,
            east: south_east.lon.min(180.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// A real fix
    User,
    /// No fix, standing in at [`DEFAULT_CENTER`]
    DefaultLocation,
    Place,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: LatLon,
    pub color: &'static str,
    pub pulse: bool,
    pub popup_title: String,
    pub popup_body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
    Searching,
    Found(usize),
    NotFound,
}

impl MapStatus {
    pub fn label(&self, language: Language) -> String {
        let map = &strings(language).map;
        match self {
            MapStatus::Searching => map.searching.to_string(),
            MapStatus::Found(count) => map.found(*count),
            MapStatus::NotFound => map.not_found.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map surface has no area ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
}

pub struct MapProjector {
    language: Language,
    user_fix: Option<UserFix>,
    places: Vec<ResolvedPlace>,
    markers: Vec<Marker>,
    viewport: Viewport,
    surface: Option<SurfaceSize>,
    latest_run: Option<RunToken>,
    resolving: bool,
    requested: usize,
    resolved_count: Option<usize>,
}

impl MapProjector {
    pub fn new(language: Language, user_fix: Option<UserFix>) -> Self {
        let mut projector = Self {
            language,
            user_fix,
            places: Vec::new(),
            markers: Vec::new(),
            viewport: Viewport { center: DEFAULT_CENTER, zoom: DEFAULT_ZOOM },
            surface: None,
            latest_run: None,
            resolving: false,
            requested: 0,
            resolved_count: None,
        };
        projector.rebuild();
        projector
    }

    pub fn on_user_fix_changed(&mut self, user_fix: Option<UserFix>) {
        self.user_fix = user_fix;
        self.rebuild();
    }

    pub fn on_language_changed(&mut self, language: Language) {
        self.language = language;
        self.rebuild();
    }

    /// A resolver run for `reference_count` places has started
    pub fn begin_resolution(&mut self, token: RunToken, reference_count: usize) {
        self.latest_run = Some(token);
        self.resolving = reference_count > 0;
        self.requested = reference_count;
    }

    /// Apply the outcome of a resolver run. Outcomes from runs other than
    /// the latest one are ignored.
    pub fn finish_resolution(&mut self, token: RunToken, resolution: Resolution) {
        if self.latest_run != Some(token) {
            debug!("Ignoring stale geocode run {}", token.generation());
            return;
        }
        self.resolving = false;
        match resolution {
            Resolution::Resolved(places) => {
                self.resolved_count = Some(places.len());
                self.places = places;
                self.rebuild();
            }
            Resolution::Unchanged => {
                self.resolved_count = Some(self.places.len());
            }
            Resolution::Superseded => {}
        }
    }

    pub fn resolving(&self) -> bool {
        self.resolving
    }

    /// Places plotted by the last completed run, `None` before the first
    pub fn resolved_count(&self) -> Option<usize> {
        self.resolved_count
    }

    pub fn status(&self) -> Option<MapStatus> {
        if self.resolving {
            return Some(MapStatus::Searching);
        }
        match self.resolved_count {
            Some(0) if self.requested > 0 => Some(MapStatus::NotFound),
            Some(n) if n > 0 => Some(MapStatus::Found(n)),
            _ => None,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Bind to a drawing surface. Attaching again only resizes.
    pub fn attach(&mut self, size: SurfaceSize) -> Result<(), MapError> {
        if size.width == 0 || size.height == 0 {
            return Err(MapError::EmptySurface {
                width: size.width,
                height: size.height,
            });
        }
        if self.surface != Some(size) {
            debug!("Map surface {}x{}", size.width, size.height);
            self.surface = Some(size);
            self.viewport = self.compute_viewport();
        }
        Ok(())
    }

    pub fn detach(&mut self) {
        self.surface = None;
    }

    fn user_marker(&self) -> Marker {
        let map = &strings(self.language).map;
        match self.user_fix {
            Some(fix) => Marker {
                kind: MarkerKind::User,
                position: fix.into(),
                color: USER_COLOR,
                pulse: true,
                popup_title: map.your_location.to_string(),
                popup_body: None,
            },
            None => Marker {
                kind: MarkerKind::DefaultLocation,
                position: DEFAULT_CENTER,
                color: DEFAULT_LOCATION_COLOR,
                pulse: false,
                popup_title: map.default_location.to_string(),
                popup_body: None,
            },
        }
    }

    /// Clear and recreate every marker, then refit.
    fn rebuild(&mut self) {
        let details = strings(self.language).map.details;
        let mut markers = Vec::with_capacity(self.places.len() + 1);
        markers.push(self.user_marker());
        markers.extend(self.places.iter().map(|place| Marker {
            kind: MarkerKind::Place,
            position: LatLon::new(place.latitude, place.longitude),
            color: PLACE_COLOR,
            pulse: false,
            popup_title: place.title.clone(),
            popup_body: Some(details.to_string()),
        }));
        self.markers = markers;
        self.viewport = self.compute_viewport();
    }

    fn compute_viewport(&self) -> Viewport {
        let has_places = self.markers.iter().any(|m| m.kind == MarkerKind::Place);
        if !has_places {
            return match self.user_fix {
                Some(fix) => Viewport { center: fix.into(), zoom: USER_ZOOM },
                None => Viewport { center: DEFAULT_CENTER, zoom: DEFAULT_ZOOM },
            };
        }

        // The default marker is a placeholder, not a position worth framing.
        let points: Vec<LatLon> = self
            .markers
            .iter()
            .filter(|m| m.kind != MarkerKind::DefaultLocation)
            .map(|m| m.position)
            .collect();
        match Bounds::enclosing(&points) {
            Some(bounds) => Viewport::fit(
                bounds,
                self.surface.unwrap_or(NOMINAL_SURFACE),
                FIT_PADDING,
                MAX_FIT_ZOOM,
            ),
            None => self.viewport,
        }
    }
}
