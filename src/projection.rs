//! Spherical Mercator projection from longitude/latitude degrees to
//! SVG pixel coordinates, plus SVG path generation for projected shapes.

use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Rect};
use std::f64::consts::FRAC_PI_4;
use std::fmt::Write;

// Latitude at which the projected extent becomes square (|y| == pi)
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Mercator with a pixel scale and a translation of the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    pub scale: f64,
    pub translate: (f64, f64),
}

impl Mercator {
    /// Centre the world in a `width` × `height` viewport, scaled to `width / scale_divisor`.
    pub fn for_viewport(width: f64, height: f64, scale_divisor: f64) -> Self {
        Self {
            scale: width / scale_divisor,
            translate: (width / 2.0, height / 2.0),
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lambda = lon.to_radians();
        let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let y = (FRAC_PI_4 + phi / 2.0).tan().ln();
        (
            self.translate.0 + self.scale * lambda,
            self.translate.1 - self.scale * y,
        )
    }

    pub fn project_geometry(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|Coord { x, y }| {
            let (px, py) = self.project(x, y);
            Coord { x: px, y: py }
        })
    }
}

// Three decimals, without trailing zeros
fn push_number(out: &mut String, value: f64) {
    let rounded = (value * 1000.0).round() / 1000.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded }; // no "-0"
    let _ = write!(out, "{}", rounded);
}

/// SVG path data for an already projected shape: one `M…L…Z` run per ring.
pub fn svg_path(projected: &MultiPolygon<f64>) -> String {
    let mut d = String::new();

    for polygon in projected {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            // Rings are closed, the repeated first point is implied by Z
            let coords = ring.0.split_last().map(|(_, rest)| rest).unwrap_or(&[]);
            if coords.len() < 3 {
                continue;
            }

            for (i, c) in coords.iter().enumerate() {
                d.push(if i == 0 { 'M' } else { 'L' });
                push_number(&mut d, c.x);
                d.push(',');
                push_number(&mut d, c.y);
            }
            d.push('Z');
        }
    }

    d
}

/// Bounding box of a projected shape in pixel space.
pub fn path_bounds(projected: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    projected.bounding_rect()
}
