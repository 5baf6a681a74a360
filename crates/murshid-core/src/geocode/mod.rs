//! Turning place names from a chat reply into coordinates.

pub mod nominatim;
pub mod resolver;

pub use nominatim::NominatimClient;
pub use resolver::{GeocodeResolver, Resolution, RunToken};

use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::language::Language;
use crate::map::LatLon;
use crate::state::UserFix;

/// Half-width in degrees of the box used to prefer results near the user
pub const VIEWBOX_RADIUS: f64 = 0.5;

/// Soft search window, `left,top,right,bottom` in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewBox {
    pub fn around(fix: UserFix) -> Self {
        Self {
            left: fix.longitude - VIEWBOX_RADIUS,
            top: fix.latitude + VIEWBOX_RADIUS,
            right: fix.longitude + VIEWBOX_RADIUS,
            bottom: fix.latitude - VIEWBOX_RADIUS,
        }
    }

    pub fn to_param(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeQuery {
    pub text: String,
    pub viewbox: Option<ViewBox>,
    pub language: Language,
}

impl GeocodeQuery {
    pub fn new(title: &str, user_fix: Option<UserFix>, language: Language) -> Self {
        Self {
            text: normalize_query(title),
            viewbox: user_fix.map(ViewBox::around),
            language,
        }
    }
}

fn punctuation() -> Option<&'static Regex> {
    static PUNCTUATION: OnceLock<Option<Regex>> = OnceLock::new();
    PUNCTUATION
        .get_or_init(|| Regex::new(r"[^\w\s\x{0600}-\x{06FF}]").ok())
        .as_ref()
}

/// Replace anything that is not a word character, whitespace or Arabic
/// script with a space, then trim.
pub fn normalize_query(title: &str) -> String {
    match punctuation() {
        Some(re) => re.replace_all(title, " ").trim().to_string(),
        None => title.trim().to_string(),
    }
}

#[async_trait]
pub trait GeocodeSearch: Send + Sync {
    /// Best match for `query`, `None` when the service found nothing
    async fn search(&self, query: &GeocodeQuery) -> Result<Option<LatLon>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_query("Café Clock (Fes)"), "Café Clock  Fes");
        assert_eq!(normalize_query("Le Jardin, Marrakech!"), "Le Jardin  Marrakech");
        assert_eq!(normalize_query("  \"Dar Yacout\"  "), "Dar Yacout");
    }

    #[test]
    fn test_normalize_keeps_arabic() {
        assert_eq!(normalize_query("مسجد الحسن الثاني."), "مسجد الحسن الثاني");
    }

    #[test]
    fn test_viewbox_around_fix() {
        let viewbox = ViewBox::around(UserFix::new(34.0, -5.0));
        assert_eq!(viewbox.to_param(), "-5.5,34.5,-4.5,33.5");
    }

    #[test]
    fn test_query_without_fix_has_no_viewbox() {
        let query = GeocodeQuery::new("Jemaa el-Fnaa", None, Language::English);
        assert_eq!(query.text, "Jemaa el Fnaa");
        assert!(query.viewbox.is_none());
    }
}
