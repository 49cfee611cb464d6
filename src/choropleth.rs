use crate::config::MapConfig;
use crate::projection::{path_bounds, svg_path, Mercator};
use crate::scale::{LinearColorScale, ScaleError};
use crate::types::{CountryGeometry, DeathCounts, Tooltip};
use crate::zoom::{fit_bounds, Camera, CameraAnimation, ZoomBehavior, ZoomTransform};
use geo::Rect;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use svg::node::element::{Group, Path, Rectangle, Text};
use svg::Document;
use tracing::{info, warn};

/// Boundary names that differ from the names used in the counts table.
#[derive(Debug, Clone, Default)]
pub struct NameCorrections {
    corrections: HashMap<String, String>,
}

impl NameCorrections {
    pub fn new(corrections: HashMap<String, String>) -> Self {
        Self { corrections }
    }

    /// Name to look up in the counts table for a boundary name.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.corrections.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Best-effort join between boundary names and death counts.
#[derive(Debug, Clone)]
pub struct CountryJoin<'a> {
    pub corrections: &'a NameCorrections,
    pub counts: &'a DeathCounts,
}

impl<'a> CountryJoin<'a> {
    pub fn new(corrections: &'a NameCorrections, counts: &'a DeathCounts) -> Self {
        Self { corrections, counts }
    }

    pub fn deaths(&self, name: &str) -> Option<u32> {
        self.counts.get(self.corrections.resolve(name)).copied()
    }

    pub fn tooltip(&self, name: &str) -> Tooltip {
        Tooltip {
            title: self.corrections.resolve(name).to_string(),
            detail: format!("Deaths: {}", self.deaths(name).unwrap_or(0)),
        }
    }

    /// Scaled color for matched countries, the fallback fill otherwise.
    pub fn fill(&self, name: &str, scale: &LinearColorScale, fallback: &str) -> String {
        match self.deaths(name) {
            Some(deaths) => scale.color(deaths as f64).to_string(),
            None => fallback.to_string(),
        }
    }
}

/// Keyframes of the opening camera move, replayed by the page.
#[derive(Debug, Clone, Serialize)]
pub struct AnimationPlan {
    pub delay_ms: u64,
    pub duration_ms: u64,
    pub keyframes: Vec<ZoomTransform>,
}

#[derive(Debug)]
pub struct ChoroplethMap {
    pub document: Document,
    pub tooltips: Vec<Tooltip>,
    pub zoom: ZoomBehavior,
    pub animation: Option<AnimationPlan>,
    pub matched: usize,
}

// Projected outline of one country
struct ProjectedCountry {
    path: String,
    bounds: Option<Rect<f64>>,
}

pub fn legend_label(value: f64, is_last: bool) -> String {
    if is_last {
        format!("> {} deaths", value)
    } else {
        format!("{} deaths", value)
    }
}

fn plan_animation(
    countries: &[CountryGeometry],
    projected: &[ProjectedCountry],
    config: &MapConfig,
    zoom: &ZoomBehavior,
) -> Option<AnimationPlan> {
    let target = &config.zoom.target_country;
    let Some(index) = countries.iter().position(|c| &c.name == target) else {
        warn!(target = %target, "Target country not found in boundaries, skipping camera animation");
        return None;
    };
    let bounds = projected[index].bounds?;

    let fit = fit_bounds(bounds, config.width, config.height, config.zoom.fit_padding, zoom);
    let mut camera = Camera::new();
    camera.schedule(CameraAnimation::new(
        ZoomTransform::IDENTITY,
        fit,
        config.width,
        config.height,
        config.zoom.delay_ms as f64,
        config.zoom.duration_ms as f64,
    ));

    Some(AnimationPlan {
        delay_ms: config.zoom.delay_ms,
        duration_ms: config.zoom.duration_ms,
        keyframes: camera.sample_animation(config.zoom.keyframes),
    })
}

fn draw_title(config: &MapConfig) -> Text {
    Text::new(config.title.as_str())
        .set("class", "map-title")
        .set("x", config.width / 2.0)
        .set("y", 30)
        .set("text-anchor", "middle")
        .set("style", "font-size: 24px; font-weight: bold;")
}

fn draw_legend(config: &MapConfig, scale: &LinearColorScale) -> Group {
    let breaks = &config.legend.breaks;
    let mut legend = Group::new()
        .set("class", "legend")
        .set("transform", format!("translate({},{})", config.width - 150.0, config.height - 180.0));

    for (i, &value) in breaks.iter().enumerate() {
        let y = i as f64 * 20.0;
        legend = legend
            .add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", y)
                    .set("width", 18)
                    .set("height", 18)
                    .set("fill", scale.color(value).to_string()),
            )
            .add(
                Text::new(legend_label(value, i + 1 == breaks.len()))
                    .set("x", 24)
                    .set("y", y + 9.0)
                    .set("dy", "0.35em")
                    .set("style", "font-size: 12px;"),
            );
    }

    legend.add(
        Text::new(config.legend.title.as_str())
            .set("x", 0)
            .set("y", -10)
            .set("style", "font-size: 14px; font-weight: bold;"),
    )
}

/// Project, join and color every country, then add the title, legend and camera plan.
/// Returns `Ok(None)` when there is nothing to draw.
pub fn render_choropleth(
    countries: &[CountryGeometry],
    counts: &DeathCounts,
    config: &MapConfig,
) -> Result<Option<ChoroplethMap>, ScaleError> {
    let scale = LinearColorScale::from_config(&config.color_domain, &config.color_range)?.clamped();

    if countries.is_empty() {
        warn!("No boundaries available to render the map");
        return Ok(None);
    }

    let projection = Mercator::for_viewport(config.width, config.height, config.scale_divisor);
    let zoom = ZoomBehavior::new(config.zoom.min_scale, config.zoom.max_scale);
    let corrections = NameCorrections::new(config.name_corrections.clone());
    let join = CountryJoin::new(&corrections, counts);

    let projected: Vec<ProjectedCountry> = countries
        .par_iter()
        .map(|country| {
            let geometry = projection.project_geometry(&country.geometry);
            ProjectedCountry {
                path: svg_path(&geometry),
                bounds: path_bounds(&geometry),
            }
        })
        .collect();

    let mut layer = Group::new().set("class", "countries");
    let mut tooltips = Vec::with_capacity(countries.len());
    let mut matched = 0;

    for (index, (country, shape)) in countries.iter().zip(&projected).enumerate() {
        if join.deaths(&country.name).is_some() {
            matched += 1;
        }
        layer = layer.add(
            Path::new()
                .set("class", "country")
                .set("data-index", index.to_string())
                .set("d", shape.path.as_str())
                .set("fill", join.fill(&country.name, &scale, &config.fallback_fill)),
        );
        tooltips.push(join.tooltip(&country.name));
    }

    info!(countries = countries.len(), matched, "Rendering choropleth");

    let animation = plan_animation(countries, &projected, config, &zoom);

    let document = Document::new()
        .set("class", "map-svg")
        .set("width", "100%")
        .set("viewBox", (0.0, 0.0, config.width, config.height))
        .add(layer)
        .add(draw_title(config))
        .add(draw_legend(config, &scale));

    Ok(Some(ChoroplethMap {
        document,
        tooltips,
        zoom,
        animation,
        matched,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Color;
    use geo::{polygon, MultiPolygon};

    const PALESTINE_TERRITORY: &str = "Israel and the Occupied Palestinian Territory";

    fn square(name: &str, lon: f64, lat: f64, size: f64) -> CountryGeometry {
        let p = polygon![
            (x: lon, y: lat),
            (x: lon + size, y: lat),
            (x: lon + size, y: lat + size),
            (x: lon, y: lat + size),
        ];
        CountryGeometry {
            name: name.to_string(),
            geometry: MultiPolygon::new(vec![p]),
        }
    }

    fn counts() -> DeathCounts {
        let mut counts = DeathCounts::new();
        counts.insert(PALESTINE_TERRITORY.to_string(), 170);
        counts.insert("Mexico".to_string(), 12);
        counts
    }

    fn scale() -> LinearColorScale {
        let config = MapConfig::default();
        LinearColorScale::from_config(&config.color_domain, &config.color_range)
            .unwrap()
            .clamped()
    }

    #[test]
    fn corrections_remap_only_configured_key() {
        let corrections = NameCorrections::new(MapConfig::default().name_corrections);
        assert_eq!(corrections.resolve("Israel"), PALESTINE_TERRITORY);
        assert_eq!(corrections.resolve("Mexico"), "Mexico");
        assert_eq!(corrections.resolve("israel"), "israel");
        assert_eq!(corrections.resolve(PALESTINE_TERRITORY), PALESTINE_TERRITORY);
    }

    #[test]
    fn join_uses_corrected_name() {
        let corrections = NameCorrections::new(MapConfig::default().name_corrections);
        let counts = counts();
        let join = CountryJoin::new(&corrections, &counts);

        assert_eq!(join.deaths("Israel"), Some(170));
        assert_eq!(join.deaths("Mexico"), Some(12));
        assert_eq!(
            join.tooltip("Israel"),
            Tooltip {
                title: PALESTINE_TERRITORY.to_string(),
                detail: "Deaths: 170".to_string(),
            }
        );
        assert_eq!(join.fill("Israel", &scale(), "#eee"), Color::new(0, 0, 0).to_string());
    }

    #[test]
    fn unmatched_country_gets_fallback_and_zero() {
        let corrections = NameCorrections::default();
        let counts = counts();
        let join = CountryJoin::new(&corrections, &counts);

        assert_eq!(join.deaths("Iceland"), None);
        assert_eq!(join.fill("Iceland", &scale(), "#eee"), "#eee");
        assert_eq!(join.tooltip("Iceland").detail, "Deaths: 0");
        assert_eq!(join.tooltip("Iceland").title, "Iceland");
    }

    #[test]
    fn zero_deaths_is_a_match_not_a_fallback() {
        let corrections = NameCorrections::default();
        let mut counts = DeathCounts::new();
        counts.insert("Chile".to_string(), 0);
        let join = CountryJoin::new(&corrections, &counts);

        assert_eq!(join.fill("Chile", &scale(), "#eee"), "rgb(255, 255, 255)");
    }

    #[test]
    fn legend_labels() {
        assert_eq!(legend_label(20.0, false), "20 deaths");
        assert_eq!(legend_label(160.0, true), "> 160 deaths");
    }

    #[test]
    fn renders_every_country_with_tooltips() {
        let countries = vec![
            square("Israel", 34.3, 29.5, 1.5),
            square("Mexico", -110.0, 18.0, 10.0),
            square("Iceland", -22.0, 63.5, 4.0),
        ];
        let map = render_choropleth(&countries, &counts(), &MapConfig::default())
            .unwrap()
            .unwrap();

        assert_eq!(map.tooltips.len(), 3);
        assert_eq!(map.matched, 2);
        assert_eq!(map.tooltips[2].detail, "Deaths: 0");

        let svg = map.document.to_string();
        assert_eq!(svg.matches("class=\"country\"").count(), 3);
        assert!(svg.contains("fill=\"#eee\""));
        assert!(svg.contains("&gt; 160 deaths") || svg.contains("> 160 deaths"));
        assert!(svg.contains("Incidence of Deaths"));
    }

    #[test]
    fn plans_animation_to_target_country() {
        let countries = vec![square("Israel", 34.3, 29.5, 1.5), square("Mexico", -110.0, 18.0, 10.0)];
        let map = render_choropleth(&countries, &counts(), &MapConfig::default())
            .unwrap()
            .unwrap();

        let plan = map.animation.expect("target is present");
        assert_eq!(plan.delay_ms, 3000);
        assert_eq!(plan.duration_ms, 5000);
        assert_eq!(plan.keyframes.len(), 121);
        assert_eq!(plan.keyframes[0], ZoomTransform::IDENTITY);
        // A small country is framed at the maximum zoom
        assert_eq!(plan.keyframes.last().unwrap().k, 8.0);
    }

    #[test]
    fn missing_target_skips_animation() {
        let countries = vec![square("Mexico", -110.0, 18.0, 10.0)];
        let map = render_choropleth(&countries, &counts(), &MapConfig::default())
            .unwrap()
            .unwrap();
        assert!(map.animation.is_none());
    }

    #[test]
    fn no_boundaries_renders_nothing() {
        assert!(render_choropleth(&[], &counts(), &MapConfig::default()).unwrap().is_none());
    }

    #[test]
    fn bad_color_stops_are_reported() {
        let config = MapConfig {
            color_range: vec!["white".to_string()],
            ..MapConfig::default()
        };
        assert!(render_choropleth(&[], &counts(), &config).is_err());
    }
}
