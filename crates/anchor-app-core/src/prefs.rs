// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted session preferences (image-sharing consent + tuning).

use serde::{Deserialize, Serialize};

/// Config key the preferences blob is stored under.
pub const SESSION_PREFS_KEY: &str = "cloud_anchor_preferences";

/// Default hit-to-anchor match radius in metres.
pub const DEFAULT_MATCH_RADIUS_M: f32 = 0.7;

/// Saved preferences that shape how a session is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPrefs {
    /// User accepted the notice that camera imagery is shared with the
    /// cloud-anchor service. Sessions refuse to start without it.
    pub allow_share_images: bool,
    /// Max distance (metres, exclusive) between a tap hit and a resolved
    /// anchor for the tap to select that anchor.
    pub match_radius_m: f32,
    /// Cap on simultaneously outstanding resolve requests; `None` issues all
    /// at once.
    pub max_concurrent_resolves: Option<usize>,
}

impl Default for SessionPrefs {
    fn default() -> Self {
        Self {
            allow_share_images: false,
            match_radius_m: DEFAULT_MATCH_RADIUS_M,
            max_concurrent_resolves: None,
        }
    }
}

impl SessionPrefs {
    /// Returns a copy with consent recorded.
    #[must_use]
    pub fn with_consent(mut self) -> Self {
        self.allow_share_images = true;
        self
    }

    /// First out-of-range tuning value, as `(field, reason)`.
    pub fn invalid_field(&self) -> Option<(&'static str, &'static str)> {
        if !(self.match_radius_m.is_finite() && self.match_radius_m > 0.0) {
            return Some(("match_radius_m", "must be finite and positive"));
        }
        if self.max_concurrent_resolves == Some(0) {
            return Some(("max_concurrent_resolves", "must be at least 1"));
        }
        None
    }

    /// Copy with out-of-range tuning values reset to their defaults. Consent
    /// is kept as stored.
    #[must_use]
    pub fn repaired(mut self) -> Self {
        if !(self.match_radius_m.is_finite() && self.match_radius_m > 0.0) {
            self.match_radius_m = DEFAULT_MATCH_RADIUS_M;
        }
        if self.max_concurrent_resolves == Some(0) {
            self.max_concurrent_resolves = None;
        }
        self
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let prefs: SessionPrefs = serde_json::from_str(r#"{"allow_share_images":true}"#).unwrap();
        assert!(prefs.allow_share_images);
        assert_eq!(prefs.match_radius_m, DEFAULT_MATCH_RADIUS_M);
        assert_eq!(prefs.max_concurrent_resolves, None);
    }

    #[test]
    fn repair_resets_only_bad_fields() {
        let prefs = SessionPrefs {
            allow_share_images: true,
            match_radius_m: f32::NAN,
            max_concurrent_resolves: Some(3),
        };
        assert_eq!(prefs.invalid_field().map(|(f, _)| f), Some("match_radius_m"));
        let fixed = prefs.repaired();
        assert!(fixed.allow_share_images);
        assert_eq!(fixed.match_radius_m, DEFAULT_MATCH_RADIUS_M);
        assert_eq!(fixed.max_concurrent_resolves, Some(3));
        assert!(fixed.invalid_field().is_none());
    }
}
