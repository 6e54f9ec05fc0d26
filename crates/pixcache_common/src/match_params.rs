//! Tunable parameters for template matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Similarity measure used for the first matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    /// Sum of squared differences.
    Sqdiff,
    /// Normalized sum of squared differences.
    SqdiffNormed,
    /// Normalized cross-correlation.
    CcorrNormed,
    /// Normalized correlation coefficient.
    CcoeffNormed,
}

impl MatchMethod {
    /// The stable string value of this method.
    pub fn value(&self) -> &'static str {
        match self {
            MatchMethod::Sqdiff => "sqdiff",
            MatchMethod::SqdiffNormed => "sqdiff-normed",
            MatchMethod::CcorrNormed => "ccorr-normed",
            MatchMethod::CcoeffNormed => "ccoeff-normed",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Second-pass confirmation applied to candidate matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmMethod {
    /// No confirmation pass.
    None,
    /// Absolute pixel difference.
    Absdiff,
    /// Absolute difference of normalized images.
    NormedAbsdiff,
}

impl ConfirmMethod {
    /// The stable string value of this method.
    pub fn value(&self) -> &'static str {
        match self {
            ConfirmMethod::None => "none",
            ConfirmMethod::Absdiff => "absdiff",
            ConfirmMethod::NormedAbsdiff => "normed-absdiff",
        }
    }
}

impl fmt::Display for ConfirmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Parameters that customise the template matching algorithm.
///
/// Cache keys include every field, so changing any threshold invalidates
/// previously cached match results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchParameters {
    /// First-pass similarity measure.
    pub match_method: MatchMethod,
    /// Minimum first-pass score (0.0 to 1.0) to consider a candidate.
    pub match_threshold: f64,
    /// Second-pass confirmation method.
    pub confirm_method: ConfirmMethod,
    /// Maximum difference (0.0 to 1.0) tolerated by the confirmation pass.
    pub confirm_threshold: f64,
    /// Number of erosion passes applied before confirmation.
    pub erode_passes: u32,
}

impl Default for MatchParameters {
    fn default() -> Self {
        Self {
            match_method: MatchMethod::Sqdiff,
            match_threshold: 0.98,
            confirm_method: ConfirmMethod::Absdiff,
            confirm_threshold: 0.84,
            erode_passes: 1,
        }
    }
}
