//! Dashboard dataset JSON to `DashboardSnapshot` converter.
//!
//! The upstream export writes one JSON file per collection
//! (`resumen_mensual.json`, `top_medicamentos.json`, `metadata.json`,
//! `last_update.json` and the three `filtro_*.json` catalogs). The loader
//! hands them over merged into a single object keyed by file stem; every key
//! is optional and degrades to an empty collection, so a half-published
//! export still renders.

use std::collections::HashMap;

use recetas_core::{
    aggregate, filter_medications, filter_records, format_date, format_number, format_percentage,
    trend, trend_by, ChartPanel, ChartSeries, DashboardSnapshot, DatasetMetadata, FilterCatalog,
    FilterOption, FilterState, KpiTile, LastUpdate, MedicationRow, Metric, MonthlyRecord, Period,
    ReportConfig, ReportError, SeriesPoint, TopMedication, Trend,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Build a snapshot from a JSON dataset string with no filters applied.
pub fn summarize_dataset_str(
    dataset_json: &str,
    config: &ReportConfig,
) -> Result<DashboardSnapshot, ReportError> {
    let dataset = Dataset::parse_str(dataset_json)?;
    Ok(dataset.snapshot(&FilterState::default(), config))
}

/// Build a snapshot from a `serde_json::Value` with no filters applied.
pub fn summarize_dataset_value(
    dataset: &Value,
    config: &ReportConfig,
) -> Result<DashboardSnapshot, ReportError> {
    let dataset = Dataset::parse_value(dataset)?;
    Ok(dataset.snapshot(&FilterState::default(), config))
}

/// Parsed upstream dataset, one collection per exported JSON file.
///
/// Parsing and snapshot building are split so a filter change re-runs only
/// the pure [`Dataset::snapshot`] step over the already-parsed data.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<MonthlyRecord>,
    pub top_medications: Vec<TopMedication>,
    pub metadata: DatasetMetadata,
    pub last_update: LastUpdate,
    pub filters: FilterCatalog,
}

impl Dataset {
    pub fn parse_str(dataset_json: &str) -> Result<Self, ReportError> {
        let value: Value = serde_json::from_str(dataset_json)
            .map_err(|err| ReportError::Parse(err.to_string()))?;
        Self::parse_value(&value)
    }

    pub fn parse_value(dataset: &Value) -> Result<Self, ReportError> {
        let object = dataset.as_object().ok_or(ReportError::MissingData)?;

        Ok(Self {
            records: parse_collection(object.get("resumen_mensual"))?,
            top_medications: parse_collection(object.get("top_medicamentos"))?,
            metadata: parse_document(object.get("metadata"))?,
            last_update: parse_document(object.get("last_update"))?,
            filters: FilterCatalog {
                pharmacies: parse_filter_catalog(
                    object.get("filtro_farmacias"),
                    "FarmaciaVentanilla",
                    "nombre_farmacia",
                    "Farmacia",
                ),
                doctors: parse_filter_catalog(
                    object.get("filtro_medicos"),
                    "CódigodelMédico",
                    "nombre_medico",
                    "Médico",
                ),
                medications: parse_filter_catalog(
                    object.get("filtro_medicamentos"),
                    "MedicamentoSAP",
                    "nombre_medicamento",
                    "Medicamento",
                ),
            },
        })
    }

    /// Build the render model for the current filter selection. Pure; call it
    /// again on every filter change or refresh.
    pub fn snapshot(&self, filter: &FilterState, config: &ReportConfig) -> DashboardSnapshot {
        let mut records = filter_records(&self.records, filter);
        records.sort_by_key(|record| record.period());

        let medications = filter_medications(&self.top_medications, filter);

        let charts = ChartPanel {
            evolution: evolution_series(&records),
            comparison: comparison_series(&records),
            top_medications: top_medication_series(&medications, config),
        };

        DashboardSnapshot::new(
            build_kpis(&records, config),
            charts,
            medication_rows(&medications, config),
            self.filters.clone(),
            format_number(self.metadata.total_records.map(|count| count as i64)),
            format_date(self.last_update.last_updated.as_deref()),
        )
    }
}

fn parse_collection<T>(section: Option<&Value>) -> Result<Vec<T>, ReportError>
where
    T: DeserializeOwned,
{
    match section {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| ReportError::Parse(err.to_string())),
    }
}

fn parse_document<T>(section: Option<&Value>) -> Result<T, ReportError>
where
    T: DeserializeOwned + Default,
{
    match section {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| ReportError::Parse(err.to_string())),
    }
}

/// Read a dropdown catalog from its Spanish export columns. Entries without a
/// numeric code are skipped; entries without a name get a `"<kind> <code>"`
/// placeholder, the same fallback the page shows.
fn parse_filter_catalog(
    section: Option<&Value>,
    code_key: &str,
    label_key: &str,
    fallback: &str,
) -> Vec<FilterOption> {
    let Some(entries) = section.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut options: Vec<FilterOption> = entries
        .iter()
        .filter_map(|entry| {
            let code = entry.get(code_key).and_then(Value::as_i64)?;
            let label = entry
                .get(label_key)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{fallback} {code}"));
            Some(FilterOption { code, label })
        })
        .collect();

    options.sort_by_key(|option| option.code);
    options.dedup();
    options
}

fn build_kpis(records: &[MonthlyRecord], config: &ReportConfig) -> Vec<KpiTile> {
    let totals = aggregate(records);

    vec![
        tile(
            "lineas",
            "Líneas totales",
            format_number(Some(totals.total_lines as i64)),
            trend(records, Metric::TotalLines),
        ),
        tile(
            "pacientes",
            "Pacientes únicos",
            format_number(Some(totals.unique_patients as i64)),
            trend(records, Metric::UniquePatients),
        ),
        tile(
            "medicos",
            "Médicos prescriptores",
            format_number(Some(totals.unique_doctors as i64)),
            trend(records, Metric::UniqueDoctors),
        ),
        tile(
            "tasa",
            "Tasa de dispensación",
            format_percentage(Some(totals.dispensation_rate), config.percent_decimals),
            trend_by(records, |record| record.dispensation_rate()),
        ),
        tile(
            "faltante",
            "Faltante",
            format_number(Some(totals.shortfall())),
            trend(records, Metric::Shortfall),
        ),
        tile(
            "cronicos",
            "Pacientes crónicos",
            format_percentage(Some(totals.chronic_share()), 0),
            trend_by(records, |record| record.chronic_share()),
        ),
    ]
}

fn tile(id: &str, label: &str, value: String, trend: Option<Trend>) -> KpiTile {
    KpiTile {
        id: id.to_string(),
        label: label.to_string(),
        value,
        trend,
    }
}

fn evolution_series(records: &[MonthlyRecord]) -> ChartSeries {
    ChartSeries {
        name: "Líneas totales".to_string(),
        points: metric_points(records, Metric::TotalLines),
    }
}

fn comparison_series(records: &[MonthlyRecord]) -> Vec<ChartSeries> {
    vec![
        ChartSeries {
            name: "Recetado".to_string(),
            points: metric_points(records, Metric::TotalPrescribed),
        },
        ChartSeries {
            name: "Dispensado".to_string(),
            points: metric_points(records, Metric::TotalDispensed),
        },
    ]
}

fn metric_points(records: &[MonthlyRecord], metric: Metric) -> Vec<SeriesPoint> {
    records
        .iter()
        .map(|record| {
            let value = metric.value(record);
            SeriesPoint {
                label: record.period().label(),
                value,
                display: format_number(Some(value as i64)),
            }
        })
        .collect()
}

/// Most dispensed medications across the filtered months. Per-month rows of
/// the same medication are merged before ranking, so the cut does not depend
/// on the order the export wrote its rows in.
fn top_medication_series(medications: &[TopMedication], config: &ReportConfig) -> ChartSeries {
    let mut dispensed_by_code: HashMap<i64, u64> = HashMap::new();
    for medication in medications {
        *dispensed_by_code.entry(medication.code).or_insert(0) +=
            medication.dispensed.unwrap_or(0);
    }

    let mut ranked: Vec<(i64, u64)> = dispensed_by_code.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(config.chart_top);

    let points = ranked
        .into_iter()
        .map(|(code, dispensed)| SeriesPoint {
            label: medication_name(medications, code),
            value: dispensed as f64,
            display: format_number(Some(dispensed as i64)),
        })
        .collect();

    ChartSeries {
        name: "Dispensado".to_string(),
        points,
    }
}

fn medication_name(medications: &[TopMedication], code: i64) -> String {
    medications
        .iter()
        .find(|medication| {
            medication.code == code
                && medication
                    .name
                    .as_deref()
                    .is_some_and(|name| !name.is_empty())
        })
        .map(TopMedication::display_name)
        .unwrap_or_else(|| format!("Medicamento {code}"))
}

fn medication_rows(medications: &[TopMedication], config: &ReportConfig) -> Vec<MedicationRow> {
    let mut ordered: Vec<&TopMedication> = medications.iter().collect();
    ordered.sort_by_key(|medication| (medication.period(), medication.rank.unwrap_or(u32::MAX)));
    ordered.truncate(config.table_rows);

    ordered
        .into_iter()
        .map(|medication| {
            let shortfall = medication.shortfall();
            MedicationRow {
                period: medication.period().label(),
                code: medication.code,
                name: medication.display_name(),
                lines: format_number(medication.lines.map(|count| count as i64)),
                prescribed: format_number(medication.prescribed.map(|count| count as i64)),
                dispensed: format_number(medication.dispensed.map(|count| count as i64)),
                shortfall: format_number(Some(shortfall)),
                shortfall_unmet: shortfall > 0,
                // `tasa_global` arrives pre-scaled to 0..100 from the export.
                rate: format_percentage(
                    medication.rate_percent.map(|percent| percent / 100.0),
                    config.percent_decimals,
                ),
                rank: medication
                    .rank
                    .map(|rank| rank.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect()
}

/// Months present in the dataset, ascending; handy for populating the date
/// range picker.
pub fn available_periods(dataset: &Dataset) -> Vec<Period> {
    let mut periods: Vec<Period> = dataset
        .records
        .iter()
        .map(MonthlyRecord::period)
        .collect();
    periods.sort();
    periods.dedup();
    periods
}
