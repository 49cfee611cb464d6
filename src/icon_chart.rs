use crate::config::IconChartConfig;
use crate::types::{PersonRecord, Tooltip};
use svg::node::element::{Group, Path};
use svg::Document;
use tracing::{info, warn};

// Journalist silhouette, drawn in a 465x465 box
const ICON_VIEWBOX: f64 = 465.0;
const ICON_PATHS: [&str; 4] = [
    "M148.228,301.059c-46.104,21.473-82.004,59.252-101.087,106.378c-1.555,3.839,0.297,8.212,4.137,9.767c0.922,0.374,1.875,0.55,2.813,0.55c2.965,0,5.773-1.77,6.954-4.687c17.653-43.596,50.865-78.545,93.517-98.411c3.755-1.749,5.381-6.21,3.632-9.965C156.444,300.936,151.983,299.31,148.228,301.059z",
    "M417.859,407.437c-19.082-47.121-54.977-84.897-101.073-106.371c-3.755-1.75-8.216-0.124-9.966,3.631c-1.749,3.755-0.123,8.216,3.632,9.965c42.645,19.866,75.852,54.813,93.504,98.404c1.181,2.917,3.988,4.687,6.954,4.687c0.937,0,1.89-0.177,2.813-0.55C417.561,415.649,419.414,411.276,417.859,407.437z",
    "M359.725,127.782C359.725,57.323,302.403,0,231.944,0c-70.459,0-127.782,57.323-127.782,127.782c0,42.514,21.059,82.123,56.333,105.954c1.288,0.87,2.747,1.286,4.192,1.286c2.407,0,4.772-1.157,6.222-3.302c2.319-3.433,1.416-8.095-2.016-10.414c-31.139-21.037-49.73-56-49.73-93.524C119.162,65.594,169.756,15,231.944,15s112.782,50.594,112.782,112.782c0,36.677-17.937,71.188-47.98,92.318c-3.389,2.383-4.203,7.061-1.82,10.449c2.383,3.387,7.062,4.204,10.449,1.82C339.407,208.434,359.725,169.335,359.725,127.782z",
    "M283.62,271.492h-15.457c6.778-9.777,9.966-24.55,9.966-45.87c0-25.156-20.466-45.622-45.622-45.622s-45.622,20.466-45.622,45.622c0,21.32,3.188,36.093,9.966,45.87h-15.457c-4.142,0-7.5,3.358-7.5,7.5v88.116c0,4.142,3.358,7.5,7.5,7.5h43.613V457.5c0,4.142,3.358,7.5,7.5,7.5s7.5-3.358,7.5-7.5v-82.892h43.612c4.143,0,7.5-3.358,7.5-7.5v-88.116C291.12,274.85,287.762,271.492,283.62,271.492z M201.886,225.622c0-16.885,13.737-30.622,30.622-30.622c16.885,0,30.622,13.737,30.622,30.622c0,45.87-15.567,45.87-30.622,45.87C217.452,271.492,201.886,271.492,201.886,225.622z M276.12,359.608h-87.226v-73.116h87.226V359.608z",
];

/// Fixed-size grid with `per_row` icons per row, centred horizontally in `width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconGrid {
    pub width: f64,
    pub icon_size: f64,
    pub padding: f64,
    pub per_row: usize,
}

impl IconGrid {
    pub fn from_config(config: &IconChartConfig) -> Self {
        Self {
            width: config.width,
            icon_size: config.icon_size,
            padding: config.padding,
            per_row: config.icons_per_row.max(1),
        }
    }

    fn pitch(&self) -> f64 {
        self.icon_size + self.padding
    }

    /// (row, column) of the icon at `index`.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index / self.per_row, index % self.per_row)
    }

    pub fn rows(&self, count: usize) -> usize {
        count.div_ceil(self.per_row)
    }

    pub fn height(&self, count: usize) -> f64 {
        self.rows(count) as f64 * self.pitch() + self.padding
    }

    pub fn x_offset(&self) -> f64 {
        let row_width = self.per_row as f64 * self.pitch() - self.padding;
        (self.width - row_width) / 2.0
    }

    /// Top-left corner of the icon at `index`.
    pub fn position(&self, index: usize) -> (f64, f64) {
        let (row, col) = self.cell(index);
        (
            self.x_offset() + col as f64 * self.pitch() + self.padding,
            row as f64 * self.pitch() + self.padding,
        )
    }

    pub fn icon_scale(&self) -> f64 {
        self.icon_size / ICON_VIEWBOX
    }
}

pub fn person_tooltip(person: &PersonRecord) -> Tooltip {
    Tooltip {
        title: person.name.clone(),
        detail: format!("Year of Death: {}", person.year_of_death),
    }
}

/// Rendered icon chart: the SVG scene plus one tooltip per icon, by index.
#[derive(Debug)]
pub struct IconChart {
    pub document: Document,
    pub tooltips: Vec<Tooltip>,
    pub height: f64,
}

/// Lay out one icon per record in input order. Returns `None` when there is nothing to draw.
pub fn render_icon_chart(people: &[PersonRecord], config: &IconChartConfig) -> Option<IconChart> {
    if people.is_empty() {
        warn!("No data available to render the icon chart");
        return None;
    }

    let grid = IconGrid::from_config(config);
    let height = grid.height(people.len());
    info!(icons = people.len(), rows = grid.rows(people.len()), "Rendering icon chart");

    // Fills the container; the view box keeps the layout centred at any width
    let mut document = Document::new()
        .set("class", "gaza-chart-svg")
        .set("width", "100%")
        .set("viewBox", (0.0, 0.0, grid.width, height));

    for index in 0..people.len() {
        let (x, y) = grid.position(index);
        let mut group = Group::new()
            .set("class", "journalist-group")
            .set("data-index", index.to_string())
            .set("transform", format!("translate({},{}) scale({})", x, y, grid.icon_scale()));

        for d in ICON_PATHS {
            group = group.add(
                Path::new()
                    .set("class", "journalist-icon")
                    .set("fill", config.fill.as_str())
                    .set("d", d),
            );
        }
        document = document.add(group);
    }

    Some(IconChart {
        document,
        tooltips: people.iter().map(person_tooltip).collect(),
        height,
    })
}
