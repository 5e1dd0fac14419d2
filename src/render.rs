//! HTML dashboard for the derived series
//!
//! Produces a standalone page that pulls Plotly from its CDN and embeds the
//! traces as JSON. An empty series renders a placeholder page instead.

use crate::currency::CurrencyCode;
use crate::data::cross_rate::CrossRateSeries;
use crate::error::{FxError, Result};
use serde_json::{json, Value as JsonValue};
use std::fs;
use std::path::Path;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

#[derive(Debug, Clone)]
pub struct Dashboard {
    /// Recency window in days; `None` plots the whole series
    pub last_n_days: Option<u32>,
    pub source_label: String,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            last_n_days: Some(365),
            source_label: "ECB".to_string(),
        }
    }
}

impl Dashboard {
    pub fn new(last_n_days: Option<u32>) -> Self {
        Self {
            last_n_days,
            ..Self::default()
        }
    }

    fn title(&self, domestic: CurrencyCode) -> String {
        format!("FX → {} (source: {})", domestic, self.source_label)
    }

    /// Plotly traces, one per target present in the series, in `targets` order
    pub fn traces(&self, series: &CrossRateSeries, targets: &[CurrencyCode]) -> Vec<JsonValue> {
        let windowed = series.window(self.last_n_days);
        targets
            .iter()
            .filter_map(|target| {
                let column = windowed.column(*target)?;
                let x: Vec<String> = column
                    .iter()
                    .map(|(d, _)| d.format("%Y-%m-%d").to_string())
                    .collect();
                let y: Vec<Option<f64>> = column.iter().map(|(_, v)| v.as_f64()).collect();
                Some(json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": format!("{} {}", target, series.domestic()),
                    "x": x,
                    "y": y,
                }))
            })
            .collect()
    }

    pub fn render_html(&self, series: &CrossRateSeries, targets: &[CurrencyCode]) -> Result<String> {
        if series.is_empty() {
            return Ok(placeholder_html());
        }

        let domestic = series.domestic();
        let title = self.title(domestic);
        let layout = json!({
            "title": &title,
            "xaxis": { "title": "Date" },
            "yaxis": { "title": format!("{} per 1 unit of currency", domestic) },
            "hovermode": "x unified",
        });
        let traces = serde_json::to_string(&self.traces(series, targets))?;
        let layout = serde_json::to_string(&layout)?;

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
             <script src=\"{}\"></script>\n</head>\n<body>\n\
             <div id=\"chart\" style=\"width:100%;height:90vh;\"></div>\n\
             <script>Plotly.newPlot(\"chart\", {}, {});</script>\n</body>\n</html>\n",
            escape_html(&title),
            PLOTLY_CDN,
            traces,
            layout
        ))
    }

    /// Render to `path`
    pub fn write(&self, path: &Path, series: &CrossRateSeries, targets: &[CurrencyCode]) -> Result<()> {
        let html = self.render_html(series, targets)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FxError::storage(parent, e))?;
        }
        fs::write(path, html).map_err(|e| FxError::storage(path, e))?;
        log::info!("Dashboard written: {}", path.display());
        Ok(())
    }
}

fn placeholder_html() -> String {
    "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>No data</title></head>\n\
     <body><h2>No data to display</h2></body>\n</html>\n"
        .to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
