//! Eave/overhang shading geometry for glazed openings.
//!
//! The sunlit area ratio SG of a window under an eave is derived from
//! precomputed tangents of the apparent solar altitude (φ) and of the solar
//! azimuth relative to the wall normal (γ):
//!
//! ```text
//! x = B − b' − v·|tan γ|      horizontal sunlit span
//! y = H − h' − w·tan φ        vertical sunlit span
//! ```
//!
//! with B/H the window width/height, b'/h' the eave side/top offsets and
//! v/w the eave vertical/horizontal depths. SG then follows a piecewise
//! table over the signs and ranges of x and y.

use crate::core::reference::ReferenceRepository;
use serde::Serialize;

/// Eave and window geometry, all lengths in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EaveGeometry {
    pub window_width_m: f64,
    pub window_height_m: f64,
    /// Horizontal projection depth of the eave (w).
    pub eave_depth_m: f64,
    /// Side projection of the eave from the window edge (b').
    pub eave_side_offset_m: f64,
    /// Top projection of the eave above the window (h').
    pub eave_top_offset_m: f64,
    /// Vertical eave depth (v), for the side shading component.
    pub eave_vertical_depth_m: f64,
}

// SG lookup over the sunlit spans:
//
//            | x <= 0 | 0 < x < B | x >= B |
//   y <= 0   | 0      | 0         | 0      |
//   0 < y < H| 0      | xy/(BH)   | y/H    |
//   y >= H   | 0      | x/B       | 1      |
fn sunlit_ratio_from_spans(x: f64, y: f64, width: f64, height: f64) -> f64 {
    if width <= 0.0 || height <= 0.0 {
        return 0.0;
    }
    if y <= 0.0 || x <= 0.0 {
        return 0.0;
    }
    if y >= height {
        if x >= width {
            return 1.0;
        }
        return x / width;
    }
    if x >= width {
        return y / height;
    }
    (x * y) / (width * height)
}

/// Sunlit area ratio SG ∈ [0, 1] of a window for one region, wall
/// orientation and hour. When both tangent lookups are exactly zero the wall
/// face receives no direct sun at that hour and SG is 0 regardless of
/// geometry; degenerate window dimensions also give 0.
pub fn calc_sunlit_area_ratio(
    references: &ReferenceRepository,
    region: &str,
    orientation: &str,
    hour: &str,
    geometry: &EaveGeometry,
) -> f64 {
    if geometry.window_width_m <= 0.0 || geometry.window_height_m <= 0.0 {
        return 0.0;
    }
    let (tan_phi, tan_gamma) = references.lookup_sunlit_tangents(region, orientation, hour);
    if tan_phi == 0.0 && tan_gamma == 0.0 {
        return 0.0;
    }

    let x = geometry.window_width_m
        - geometry.eave_side_offset_m
        - geometry.eave_vertical_depth_m * tan_gamma.abs();
    let y = geometry.window_height_m
        - geometry.eave_top_offset_m
        - geometry.eave_depth_m * tan_phi;

    sunlit_ratio_from_spans(x, y, geometry.window_width_m, geometry.window_height_m)
}

/// Solar heat gain of a glass surface combining the direct (IG) and
/// shadow/diffuse (IGS) standard gains with the sunlit area ratio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GlassSolarLoad {
    pub ig_w_m2: f64,
    pub igs_w_m2: f64,
    pub sg: f64,
    pub sc: f64,
    /// Unit-area gain `((IG − IGS)·SG + IGS)·SC`.
    pub unit_gain_w_m2: f64,
    /// Total gain, unit gain times glass area.
    pub total_w: f64,
}

/// `qG2n = ((IG − IGS)·SG + IGS)·SC`; at SG = 1 this reduces to `IG·SC`, at
/// SG = 0 only the diffuse component `IGS·SC` remains.
pub fn calc_glass_solar_load(
    references: &ReferenceRepository,
    region: &str,
    orientation: &str,
    hour: &str,
    glass_area_m2: f64,
    sc: f64,
    sg: f64,
) -> GlassSolarLoad {
    let (ig, igs) = references.lookup_solar_gain_components(region, orientation, hour);
    let unit_gain = ((ig - igs) * sg + igs) * sc;
    GlassSolarLoad {
        ig_w_m2: ig,
        igs_w_m2: igs,
        sg,
        sc,
        unit_gain_w_m2: unit_gain,
        total_w: unit_gain * glass_area_m2,
    }
}
