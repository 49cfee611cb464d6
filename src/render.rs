//! Page assembly: both scenes, their tooltips and the interaction script
//! in one self-contained HTML document, plus standalone SVG files.

use crate::choropleth::{AnimationPlan, ChoroplethMap};
use crate::config::OutputConfig;
use crate::icon_chart::IconChart;
use crate::types::Tooltip;
use crate::zoom::ZoomBehavior;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;
use std::fs;
use tracing::info;

const STYLE: &str = r#"
body { margin: 0; font-family: "Helvetica Neue", Arial, sans-serif; background: #fafafa; color: #222; }
section { margin: 24px auto; max-width: 1000px; }
h2 { text-align: center; font-weight: 600; }
.gaza-deaths-container, .map-container { position: relative; width: 100%; overflow: hidden; }
.gaza-deaths-container svg, .map-container svg { display: block; height: auto; }
.map-container svg { cursor: grab; background: #fff; }
.map-container svg:active { cursor: grabbing; }
.country { stroke: #999; stroke-width: 0.3; vector-effect: non-scaling-stroke; }
.country:hover { stroke: #333; stroke-width: 1; }
.journalist-group:hover .journalist-icon { fill: #600; }
.tooltip, .gaza-tooltip {
  position: absolute; display: none; pointer-events: none; z-index: 1000;
  background: rgba(255, 255, 255, 0.95); border: 1px solid #ccc; border-radius: 4px;
  padding: 6px 10px; font-size: 13px; box-shadow: 0 2px 6px rgba(0, 0, 0, 0.15);
}
.empty { text-align: center; color: #888; }
"#;

// Reads #page-data; tooltips are indexed by each element's data-index.
const SCRIPT: &str = r#"
(function () {
  const data = JSON.parse(document.getElementById("page-data").textContent);

  function showTooltip(el, tip, event) {
    const title = document.createElement("strong");
    title.textContent = tip.title;
    el.replaceChildren(title, document.createElement("br"), tip.detail);
    el.style.display = "block";
    el.style.left = (event.pageX + 12) + "px";
    el.style.top = (event.pageY - 28) + "px";
  }

  function bindTooltips(selector, tooltipSelector, tips) {
    const tooltip = document.querySelector(tooltipSelector);
    if (!tooltip) return;
    document.querySelectorAll(selector).forEach(function (node) {
      const tip = tips[Number(node.dataset.index)];
      if (!tip) return;
      node.addEventListener("mousemove", function (event) { showTooltip(tooltip, tip, event); });
      node.addEventListener("mouseout", function () { tooltip.style.display = "none"; });
    });
  }

  function setupCamera(map) {
    const svg = document.querySelector(".map-svg");
    const layer = svg && svg.querySelector("g.countries");
    if (!layer) return;

    const zoom = map.zoom;
    let state = "idle";
    let t = { k: 1, x: 0, y: 0 };
    let drag = null;

    function apply(next) {
      t = next;
      layer.setAttribute("transform", "translate(" + t.x + "," + t.y + ") scale(" + t.k + ")");
    }
    function clampScale(k) { return Math.max(zoom.min_scale, Math.min(zoom.max_scale, k)); }
    function pointer(event) {
      const pt = svg.createSVGPoint();
      pt.x = event.clientX;
      pt.y = event.clientY;
      const p = pt.matrixTransform(svg.getScreenCTM().inverse());
      return [p.x, p.y];
    }

    function scaleBy(factor, p) {
      const k = clampScale(t.k * factor);
      const px = (p[0] - t.x) / t.k, py = (p[1] - t.y) / t.k;
      apply({ k: k, x: p[0] - px * k, y: p[1] - py * k });
    }

    svg.addEventListener("wheel", function (event) {
      event.preventDefault();
      state = "user_interacting";
      const unit = event.deltaMode === 1 ? zoom.wheel_line : event.deltaMode ? zoom.wheel_page : zoom.wheel_pixel;
      scaleBy(Math.pow(2, -event.deltaY * unit * (event.ctrlKey ? zoom.ctrl_factor : 1)), pointer(event));
    }, { passive: false });

    svg.addEventListener("dblclick", function (event) {
      event.preventDefault();
      state = "user_interacting";
      scaleBy(event.shiftKey ? 1 / zoom.dblclick_factor : zoom.dblclick_factor, pointer(event));
    });

    svg.addEventListener("pointerdown", function (event) {
      state = "user_interacting";
      drag = pointer(event);
    });
    svg.addEventListener("pointermove", function (event) {
      if (!drag) return;
      const p = pointer(event);
      apply({ k: t.k, x: t.x + p[0] - drag[0], y: t.y + p[1] - drag[1] });
      drag = p;
    });
    ["pointerup", "pointerleave", "pointercancel"].forEach(function (type) {
      svg.addEventListener(type, function () { drag = null; });
    });

    const plan = map.animation;
    if (!plan || plan.keyframes.length < 2) return;
    const frames = plan.keyframes;

    setTimeout(function () {
      if (state === "user_interacting") return;
      state = "animating";
      const start = performance.now();
      function step(now) {
        if (state !== "animating") return;
        const progress = Math.min(1, (now - start) / Math.max(1, plan.duration_ms));
        const pos = progress * (frames.length - 1);
        const i = Math.min(frames.length - 2, Math.floor(pos));
        const f = pos - i, a = frames[i], b = frames[i + 1];
        apply({ k: a.k + (b.k - a.k) * f, x: a.x + (b.x - a.x) * f, y: a.y + (b.y - a.y) * f });
        if (progress < 1) requestAnimationFrame(step); else state = "idle";
      }
      requestAnimationFrame(step);
    }, plan.delay_ms);
  }

  if (data.chart) bindTooltips(".journalist-group", ".gaza-tooltip", data.chart.tooltips);
  if (data.map) {
    bindTooltips("path.country", ".tooltip", data.map.tooltips);
    setupCamera(data.map);
  }
})();
"#;

#[derive(Serialize)]
struct ChartData<'a> {
    tooltips: &'a [Tooltip],
}

#[derive(Serialize)]
struct MapData<'a> {
    tooltips: &'a [Tooltip],
    zoom: ZoomBehavior,
    animation: Option<&'a AnimationPlan>,
}

#[derive(Serialize)]
struct PageData<'a> {
    chart: Option<ChartData<'a>>,
    map: Option<MapData<'a>>,
}

/// Builder for the generated page. Missing scenes leave their container empty.
pub struct HtmlDocument<'a> {
    title: String,
    chart: Option<&'a IconChart>,
    map: Option<&'a ChoroplethMap>,
}

impl<'a> HtmlDocument<'a> {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            chart: None,
            map: None,
        }
    }

    pub fn set_icon_chart(&mut self, chart: Option<&'a IconChart>) {
        self.chart = chart;
    }

    pub fn set_map(&mut self, map: Option<&'a ChoroplethMap>) {
        self.map = map;
    }

    fn page_data(&self) -> Result<String> {
        let data = PageData {
            chart: self.chart.map(|c| ChartData { tooltips: &c.tooltips }),
            map: self.map.map(|m| MapData {
                tooltips: &m.tooltips,
                zoom: m.zoom,
                animation: m.animation.as_ref(),
            }),
        };
        let json = serde_json::to_string(&data).context("Failed to serialize page data")?;
        // Keep "</script>" inside names from closing the data block
        Ok(json.replace("</", "<\\/"))
    }

    pub fn render(&self) -> Result<String> {
        let mut html = String::with_capacity(256 * 1024);

        let _ = write!(html, r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
"#, title = escape_text(&self.title), style = STYLE);

        html.push_str("<section>\n<h2>Journalists killed in Gaza</h2>\n<div class=\"gaza-deaths-container\">\n");
        match self.chart {
            Some(chart) => html.push_str(&chart.document.to_string()),
            None => html.push_str("<p class=\"empty\">No data available.</p>"),
        }
        html.push_str("\n</div>\n<div class=\"gaza-tooltip\"></div>\n</section>\n");

        html.push_str("<section>\n<div class=\"map-container\">\n");
        match self.map {
            Some(map) => html.push_str(&map.document.to_string()),
            None => html.push_str("<p class=\"empty\">Map data could not be loaded.</p>"),
        }
        html.push_str("\n</div>\n<div class=\"tooltip\"></div>\n</section>\n");

        let _ = write!(
            html,
            "<script id=\"page-data\" type=\"application/json\">{}</script>\n<script>{}</script>\n</body>\n</html>\n",
            self.page_data()?,
            SCRIPT
        );

        Ok(html)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Write `index.html` and one SVG per rendered scene into the output directory.
pub fn write_outputs(config: &OutputConfig, title: &str, chart: Option<&IconChart>, map: Option<&ChoroplethMap>) -> Result<()> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.dir))?;

    let mut page = HtmlDocument::new(title);
    page.set_icon_chart(chart);
    page.set_map(map);

    let index = config.dir.join("index.html");
    fs::write(&index, page.render()?).with_context(|| format!("Failed to write {:?}", index))?;
    info!(path = ?index, "Wrote page");

    if let Some(chart) = chart {
        let path = config.dir.join("icon_chart.svg");
        svg::save(&path, &chart.document).with_context(|| format!("Failed to write {:?}", path))?;
        info!(path = ?path, "Wrote icon chart");
    }
    if let Some(map) = map {
        let path = config.dir.join("map.svg");
        svg::save(&path, &map.document).with_context(|| format!("Failed to write {:?}", path))?;
        info!(path = ?path, "Wrote map");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choropleth::render_choropleth;
    use crate::config::{IconChartConfig, MapConfig};
    use crate::icon_chart::render_icon_chart;
    use crate::types::{CountryGeometry, DeathCounts, PersonRecord};
    use crate::zoom::CameraState;
    use geo::{polygon, MultiPolygon};

    fn people(names: &[&str]) -> Vec<PersonRecord> {
        names
            .iter()
            .map(|n| PersonRecord {
                name: n.to_string(),
                year_of_death: "2024".to_string(),
            })
            .collect()
    }

    fn map() -> ChoroplethMap {
        let countries = vec![CountryGeometry {
            name: "Israel".to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 34.3, y: 29.5), (x: 35.8, y: 29.5), (x: 35.8, y: 33.3), (x: 34.3, y: 33.3),
            ]]),
        }];
        render_choropleth(&countries, &DeathCounts::new(), &MapConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn empty_page_keeps_containers() {
        let html = HtmlDocument::new("Journalists").render().unwrap();
        assert!(html.contains("class=\"gaza-deaths-container\""));
        assert!(html.contains("class=\"map-container\""));
        assert!(html.contains(r#""chart":null"#));
        assert!(html.contains(r#""map":null"#));
    }

    #[test]
    fn page_embeds_scenes_and_data() {
        let chart = render_icon_chart(&people(&["Ana", "Rui"]), &IconChartConfig::default()).unwrap();
        let map = map();

        let mut page = HtmlDocument::new("Journalists");
        page.set_icon_chart(Some(&chart));
        page.set_map(Some(&map));
        let html = page.render().unwrap();

        assert!(html.contains("journalist-group"));
        assert!(html.contains("class=\"country\""));
        assert!(html.contains(r#""title":"Ana""#));
        assert!(html.contains(r#""detail":"Deaths: 0""#));
        assert!(html.contains(r#""max_scale":8.0"#));
        assert!(html.contains(r#""delay_ms":3000"#));
    }

    fn page_data_of(html: &str) -> serde_json::Value {
        let start = html.find(r#"type="application/json">"#).unwrap() + r#"type="application/json">"#.len();
        let end = start + html[start..].find("</script>").unwrap();
        serde_json::from_str(&html[start..end]).unwrap()
    }

    #[test]
    fn script_applies_zoom_rules_from_page_data() {
        let map = map();
        let mut page = HtmlDocument::new("Journalists");
        page.set_map(Some(&map));
        let data = page_data_of(&page.render().unwrap());

        let zoom = data["map"]["zoom"].as_object().unwrap();
        assert_eq!(zoom["wheel_pixel"], 0.002);
        assert_eq!(zoom["wheel_line"], 0.05);
        assert_eq!(zoom["wheel_page"], 1.0);
        assert_eq!(zoom["ctrl_factor"], 10.0);
        assert_eq!(zoom["dblclick_factor"], 2.0);
        for key in zoom.keys() {
            assert!(SCRIPT.contains(&format!("zoom.{key}")), "script ignores zoom.{key}");
        }

        for state in [CameraState::Idle, CameraState::Animating, CameraState::UserInteracting] {
            let name = serde_json::to_string(&state).unwrap();
            assert!(SCRIPT.contains(&name), "script never enters {name}");
        }
    }

    #[test]
    fn names_cannot_close_the_data_block() {
        let chart = render_icon_chart(&people(&["</script><b>x</b>"]), &IconChartConfig::default()).unwrap();
        let mut page = HtmlDocument::new("T");
        page.set_icon_chart(Some(&chart));
        let html = page.render().unwrap();

        assert!(html.contains(r"<\/script><b>x<\/b>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn writes_page_and_rendered_scenes_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = OutputConfig { dir: dir.path().join("out") };
        let chart = render_icon_chart(&people(&["Ana"]), &IconChartConfig::default()).unwrap();

        write_outputs(&config, "Journalists", Some(&chart), None).unwrap();

        assert!(config.dir.join("index.html").exists());
        assert!(config.dir.join("icon_chart.svg").exists());
        assert!(!config.dir.join("map.svg").exists());
    }
}
