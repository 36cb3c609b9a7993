//! Framework-neutral WASM <-> JavaScript bridge for the dashboard page.

use recetas_core::{FilterState, ReportConfig, ReportError};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsReportConfig {
    #[serde(default)]
    chart_top: Option<usize>,
    #[serde(default)]
    table_rows: Option<usize>,
    #[serde(default)]
    percent_decimals: Option<usize>,
}

impl From<JsReportConfig> for ReportConfig {
    fn from(cfg: JsReportConfig) -> Self {
        let mut base = ReportConfig::default();
        if let Some(chart_top) = cfg.chart_top {
            base.chart_top = chart_top;
        }
        if let Some(table_rows) = cfg.table_rows {
            base.table_rows = table_rows;
        }
        if let Some(percent_decimals) = cfg.percent_decimals {
            base.percent_decimals = percent_decimals;
        }
        base
    }
}

/// Build a `DashboardSnapshot` from the merged dataset object the page
/// fetched, with optional config overrides and filter selection.
#[wasm_bindgen]
pub fn summarize_dataset(
    input_dataset: JsValue,
    config: Option<JsValue>,
    filters: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let dataset_value = from_value::<serde_json::Value>(input_dataset)
        .map_err(|err| JsValue::from_str(&format!("Could not read dataset JSON: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsReportConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            ReportConfig::from(cfg)
        }
        None => ReportConfig::default(),
    };

    let filter = match filters {
        Some(js_filter) => from_value::<FilterState>(js_filter)
            .map_err(|err| JsValue::from_str(&format!("Could not read filters: {err}")))?,
        None => FilterState::default(),
    };

    let dataset = recetas_json::Dataset::parse_value(&dataset_value)
        .map_err(|err| JsValue::from_str(&format_report_error(err)))?;
    let snapshot = dataset.snapshot(&filter, &cfg);

    to_value(&snapshot)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize snapshot: {err}")))
}

fn format_report_error(err: ReportError) -> String {
    format!("Dashboard error: {err}")
}
