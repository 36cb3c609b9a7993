//! Core aggregation, trend and formatting logic for the IPS prescription
//! dashboard. Pure functions over immutable monthly records; the JSON layer
//! and the UI live in sibling crates.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunables for snapshot building.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Medications kept in the top-dispensed chart.
    pub chart_top: usize,
    /// Rows kept in the medications table.
    pub table_rows: usize,
    /// Decimal places for percentage display.
    pub percent_decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chart_top: 10,
            table_rows: 100,
            percent_decimals: 1,
        }
    }
}

/// Chronological key for one month of data.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// `YYYY-MM` label used on chart axes and table rows.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// One institute-wide month of prescription activity.
///
/// Field names mirror the upstream `resumen_mensual.json` export; every count
/// is optional because older exports omit columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MonthlyRecord {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "total_lineas", default)]
    pub total_lines: Option<u64>,
    #[serde(rename = "recetas_unicas", default)]
    pub unique_prescriptions: Option<u64>,
    #[serde(rename = "pacientes_unicos", default)]
    pub unique_patients: Option<u64>,
    #[serde(rename = "medicos_unicos", default)]
    pub unique_doctors: Option<u64>,
    #[serde(rename = "farmacias_activas", default)]
    pub active_pharmacies: Option<u64>,
    #[serde(rename = "total_recetado", default)]
    pub total_prescribed: Option<u64>,
    #[serde(rename = "total_dispensado", default)]
    pub total_dispensed: Option<u64>,
    #[serde(rename = "pacientes_cronicos", default)]
    pub chronic_patients: Option<u64>,
}

impl MonthlyRecord {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }

    /// Prescribed minus dispensed; negative means over-dispensation.
    pub fn shortfall(&self) -> i64 {
        self.total_prescribed.unwrap_or(0) as i64 - self.total_dispensed.unwrap_or(0) as i64
    }

    /// Dispensed over prescribed for this month alone, zero when nothing was
    /// prescribed.
    pub fn dispensation_rate(&self) -> f64 {
        let prescribed = self.total_prescribed.unwrap_or(0);
        if prescribed > 0 {
            self.total_dispensed.unwrap_or(0) as f64 / prescribed as f64
        } else {
            0.0
        }
    }

    /// Chronic patients over unique patients for this month, as a 0..1 ratio.
    pub fn chronic_share(&self) -> f64 {
        let patients = self.unique_patients.unwrap_or(0);
        if patients > 0 {
            self.chronic_patients.unwrap_or(0) as f64 / patients as f64
        } else {
            0.0
        }
    }
}

/// Institute-wide sums over a (possibly filtered) set of monthly records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregateTotals {
    pub total_lines: u64,
    pub unique_prescriptions: u64,
    pub unique_patients: u64,
    pub unique_doctors: u64,
    pub active_pharmacies: u64,
    pub total_prescribed: u64,
    pub total_dispensed: u64,
    pub chronic_patients: u64,
    /// Dispensed over prescribed, computed from the summed totals rather than
    /// averaged per month; `0.0` when nothing was prescribed.
    pub dispensation_rate: f64,
}

impl AggregateTotals {
    /// Prescribed minus dispensed across the whole set; signed.
    pub fn shortfall(&self) -> i64 {
        self.total_prescribed as i64 - self.total_dispensed as i64
    }

    /// Share of chronic patients among unique patients, as a 0..1 ratio.
    pub fn chronic_share(&self) -> f64 {
        if self.unique_patients > 0 {
            self.chronic_patients as f64 / self.unique_patients as f64
        } else {
            0.0
        }
    }
}

/// Sum every numeric field across `records`; missing fields count as zero and
/// an empty slice yields all-zero totals. Pure and order-invariant.
pub fn aggregate(records: &[MonthlyRecord]) -> AggregateTotals {
    let mut totals = AggregateTotals::default();

    for record in records {
        totals.total_lines += record.total_lines.unwrap_or(0);
        totals.unique_prescriptions += record.unique_prescriptions.unwrap_or(0);
        totals.unique_patients += record.unique_patients.unwrap_or(0);
        totals.unique_doctors += record.unique_doctors.unwrap_or(0);
        totals.active_pharmacies += record.active_pharmacies.unwrap_or(0);
        totals.total_prescribed += record.total_prescribed.unwrap_or(0);
        totals.total_dispensed += record.total_dispensed.unwrap_or(0);
        totals.chronic_patients += record.chronic_patients.unwrap_or(0);
    }

    if totals.total_prescribed > 0 {
        totals.dispensation_rate = totals.total_dispensed as f64 / totals.total_prescribed as f64;
    }

    totals
}

/// Metric a trend or chart series can be computed over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalLines,
    UniquePrescriptions,
    UniquePatients,
    UniqueDoctors,
    ActivePharmacies,
    TotalPrescribed,
    TotalDispensed,
    ChronicPatients,
    Shortfall,
}

impl Metric {
    /// Read this metric from a record; absent fields read as zero.
    pub fn value(&self, record: &MonthlyRecord) -> f64 {
        match self {
            Metric::TotalLines => record.total_lines.unwrap_or(0) as f64,
            Metric::UniquePrescriptions => record.unique_prescriptions.unwrap_or(0) as f64,
            Metric::UniquePatients => record.unique_patients.unwrap_or(0) as f64,
            Metric::UniqueDoctors => record.unique_doctors.unwrap_or(0) as f64,
            Metric::ActivePharmacies => record.active_pharmacies.unwrap_or(0) as f64,
            Metric::TotalPrescribed => record.total_prescribed.unwrap_or(0) as f64,
            Metric::TotalDispensed => record.total_dispensed.unwrap_or(0) as f64,
            Metric::ChronicPatients => record.chronic_patients.unwrap_or(0) as f64,
            Metric::Shortfall => record.shortfall() as f64,
        }
    }
}

/// Direction of a month-over-month change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increase,
    Decrease,
    Flat,
}

/// Unsigned percentage change between the two most recent months.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Trend {
    /// Absolute percentage change, always `>= 0`.
    pub magnitude: f64,
    pub direction: TrendDirection,
}

/// Month-over-month change of `metric` across the two chronologically last
/// records. Returns `None` below two records, which is distinct from a flat
/// trend ("no comparison available" vs "no change").
pub fn trend(records: &[MonthlyRecord], metric: Metric) -> Option<Trend> {
    trend_by(records, |record| metric.value(record))
}

/// Like [`trend`] but over an arbitrary projection of the record, for derived
/// metrics such as the dispensation rate.
///
/// Records are re-sorted by `(year, month)` internally; caller order is not
/// trusted. A previous value of zero with a positive current value reports a
/// 100% increase by convention, so infinity never escapes this function.
pub fn trend_by<F>(records: &[MonthlyRecord], value: F) -> Option<Trend>
where
    F: Fn(&MonthlyRecord) -> f64,
{
    if records.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&MonthlyRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.period());

    let previous = value(ordered[ordered.len() - 2]);
    let current = value(ordered[ordered.len() - 1]);
    Some(compare_periods(previous, current))
}

fn compare_periods(previous: f64, current: f64) -> Trend {
    if previous == 0.0 {
        return if current > 0.0 {
            Trend {
                magnitude: 100.0,
                direction: TrendDirection::Increase,
            }
        } else {
            Trend {
                magnitude: 0.0,
                direction: TrendDirection::Flat,
            }
        };
    }

    let delta = (current - previous) / previous * 100.0;
    let direction = if delta > 0.0 {
        TrendDirection::Increase
    } else if delta < 0.0 {
        TrendDirection::Decrease
    } else {
        TrendDirection::Flat
    };

    Trend {
        magnitude: delta.abs(),
        direction,
    }
}

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Thousands-grouped integer in the es-PY convention (`1.234.567`).
/// `None` renders as `"0"`; negatives keep their sign.
pub fn format_number(value: Option<i64>) -> String {
    let value = value.unwrap_or(0);
    let digits = value.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Render a 0..1 ratio as a percentage with fixed decimals. Missing or
/// non-finite ratios render as `"0%"`.
pub fn format_percentage(ratio: Option<f64>, decimals: usize) -> String {
    match ratio {
        Some(ratio) if ratio.is_finite() => format!("{:.*}%", decimals, ratio * 100.0),
        _ => "0%".to_string(),
    }
}

/// Long-form es-PY date (`26 de agosto de 2026`) for an ISO 8601 timestamp.
/// Accepts RFC 3339, offset-less `isoformat()` output and bare dates;
/// anything unreadable renders the `"-"` placeholder instead of failing.
pub fn format_date(iso: Option<&str>) -> String {
    let Some(iso) = iso else {
        return "-".to_string();
    };

    let parsed = DateTime::parse_from_rfc3339(iso)
        .map(|moment| moment.date_naive())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f").map(|moment| moment.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(iso, "%Y-%m-%d"));

    match parsed {
        Ok(date) => format!(
            "{} de {} de {}",
            date.day(),
            SPANISH_MONTHS[date.month0() as usize],
            date.year()
        ),
        Err(_) => "-".to_string(),
    }
}

/// One month × medication aggregate from `top_medicamentos.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TopMedication {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "MedicamentoSAP")]
    pub code: i64,
    #[serde(rename = "nombre_medicamento", default)]
    pub name: Option<String>,
    #[serde(rename = "lineas", default)]
    pub lines: Option<u64>,
    #[serde(rename = "recetado", default)]
    pub prescribed: Option<u64>,
    #[serde(rename = "dispensado", default)]
    pub dispensed: Option<u64>,
    /// Upstream dispensation rate, already scaled to 0..100.
    #[serde(rename = "tasa_global", default)]
    pub rate_percent: Option<f64>,
    #[serde(rename = "ranking_mes", default)]
    pub rank: Option<u32>,
}

impl TopMedication {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }

    pub fn shortfall(&self) -> i64 {
        self.prescribed.unwrap_or(0) as i64 - self.dispensed.unwrap_or(0) as i64
    }

    /// Catalog name, or a `Medicamento N` placeholder when the export carries
    /// no description.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Medicamento {}", self.code),
        }
    }
}

/// Export-run metadata from `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(rename = "total_farmacias", default)]
    pub total_pharmacies: Option<u64>,
}

/// Timestamp of the latest upstream export, from `last_update.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LastUpdate {
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// One entry of a filter dropdown (pharmacy, doctor or medication).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOption {
    pub code: i64,
    pub label: String,
}

/// Client-side filter selection. The default selects everything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilterState {
    #[serde(default)]
    pub from: Option<Period>,
    #[serde(default)]
    pub to: Option<Period>,
    /// Minimum monthly dispensation rate, as a 0..1 ratio.
    #[serde(default)]
    pub min_rate: f64,
    /// Medication SAP codes to keep; empty keeps all.
    #[serde(default)]
    pub medications: Vec<i64>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.min_rate <= 0.0
            && self.medications.is_empty()
    }

    fn contains_period(&self, period: Period) -> bool {
        if let Some(from) = self.from {
            if period < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if period > to {
                return false;
            }
        }
        true
    }
}

/// Keep the monthly records inside the period range whose own dispensation
/// rate reaches the configured floor.
pub fn filter_records(records: &[MonthlyRecord], filter: &FilterState) -> Vec<MonthlyRecord> {
    records
        .iter()
        .filter(|record| filter.contains_period(record.period()))
        .filter(|record| filter.min_rate <= 0.0 || record.dispensation_rate() >= filter.min_rate)
        .cloned()
        .collect()
}

/// Keep the medication aggregates inside the period range, restricted to the
/// selected medication codes when any are selected.
pub fn filter_medications(
    medications: &[TopMedication],
    filter: &FilterState,
) -> Vec<TopMedication> {
    medications
        .iter()
        .filter(|medication| filter.contains_period(medication.period()))
        .filter(|medication| {
            filter.medications.is_empty() || filter.medications.contains(&medication.code)
        })
        .cloned()
        .collect()
}

/// One KPI tile: formatted value plus an optional month-over-month badge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiTile {
    /// Stable identifier the page maps to its `kpi-*` elements.
    pub id: String,
    pub label: String,
    pub value: String,
    pub trend: Option<Trend>,
}

/// One chart point: axis label plus raw and display values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
    pub display: String,
}

/// A named series ready for the chart layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// The three dashboard charts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartPanel {
    /// Total lines per month.
    pub evolution: ChartSeries,
    /// Prescribed vs dispensed per month.
    pub comparison: Vec<ChartSeries>,
    /// Most dispensed medications over the filtered months.
    pub top_medications: ChartSeries,
}

/// One formatted row of the medications table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationRow {
    pub period: String,
    pub code: i64,
    pub name: String,
    pub lines: String,
    pub prescribed: String,
    pub dispensed: String,
    pub shortfall: String,
    /// True when prescribed exceeded dispensed; drives the warning style.
    pub shortfall_unmet: bool,
    pub rate: String,
    pub rank: String,
}

/// Dropdown contents for the filter sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilterCatalog {
    pub pharmacies: Vec<FilterOption>,
    pub doctors: Vec<FilterOption>,
    pub medications: Vec<FilterOption>,
}

/// Fully formatted render model for one dashboard refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub kpis: Vec<KpiTile>,
    pub charts: ChartPanel,
    pub medications: Vec<MedicationRow>,
    pub filters: FilterCatalog,
    /// Formatted total row count of the upstream export.
    pub record_count: String,
    /// Formatted date of the latest upstream export, `"-"` when unknown.
    pub last_updated: String,
}

impl DashboardSnapshot {
    /// Assemble a snapshot from prepared parts, stamping the build time.
    pub fn new(
        kpis: Vec<KpiTile>,
        charts: ChartPanel,
        medications: Vec<MedicationRow>,
        filters: FilterCatalog,
        record_count: String,
        last_updated: String,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            kpis,
            charts,
            medications,
            filters,
            record_count,
            last_updated,
        }
    }

    /// Look up a KPI tile by its stable identifier.
    pub fn kpi(&self, id: &str) -> Option<&KpiTile> {
        self.kpis.iter().find(|tile| tile.id == id)
    }
}

/// Errors surfaced while reading a dashboard dataset.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("input dataset is missing required data")]
    MissingData,
    #[error("could not read dataset: {0}")]
    Parse(String),
}

/// Empty snapshot for mock and testing use.
pub fn empty_snapshot() -> DashboardSnapshot {
    DashboardSnapshot::new(
        Vec::new(),
        ChartPanel::default(),
        Vec::new(),
        FilterCatalog::default(),
        format_number(None),
        format_date(None),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32, lines: u64) -> MonthlyRecord {
        MonthlyRecord {
            year,
            month,
            total_lines: Some(lines),
            ..MonthlyRecord::default()
        }
    }

    #[test]
    fn aggregate_of_empty_input_is_all_zero() {
        let totals = aggregate(&[]);
        assert_eq!(totals, AggregateTotals::default());
        assert_eq!(totals.dispensation_rate, 0.0);
    }

    #[test]
    fn aggregate_sums_fields_and_defaults_missing_ones_to_zero() {
        let records = vec![
            MonthlyRecord {
                year: 2025,
                month: 1,
                total_lines: Some(100),
                unique_patients: Some(40),
                total_prescribed: Some(500),
                total_dispensed: Some(450),
                chronic_patients: Some(10),
                ..MonthlyRecord::default()
            },
            MonthlyRecord {
                year: 2025,
                month: 2,
                total_lines: Some(150),
                unique_patients: None,
                total_prescribed: Some(300),
                total_dispensed: Some(150),
                ..MonthlyRecord::default()
            },
        ];

        let totals = aggregate(&records);
        assert_eq!(totals.total_lines, 250);
        assert_eq!(totals.unique_patients, 40);
        assert_eq!(totals.total_prescribed, 800);
        assert_eq!(totals.total_dispensed, 600);
        assert_eq!(totals.dispensation_rate, 0.75);
        assert_eq!(totals.shortfall(), 200);
        assert_eq!(totals.chronic_patients, 10);
    }

    #[test]
    fn aggregate_rate_is_zero_when_nothing_was_prescribed() {
        let records = vec![MonthlyRecord {
            year: 2025,
            month: 1,
            total_dispensed: Some(80),
            ..MonthlyRecord::default()
        }];

        let totals = aggregate(&records);
        assert_eq!(totals.dispensation_rate, 0.0);
    }

    #[test]
    fn aggregate_is_order_invariant() {
        let records = vec![month(2025, 1, 10), month(2025, 3, 30), month(2025, 2, 20)];
        let mut reversed = records.clone();
        reversed.reverse();

        assert_eq!(aggregate(&records), aggregate(&reversed));
    }

    #[test]
    fn trend_needs_at_least_two_records() {
        assert!(trend(&[], Metric::TotalLines).is_none());
        assert!(trend(&[month(2025, 1, 100)], Metric::TotalLines).is_none());
    }

    #[test]
    fn trend_reports_the_month_over_month_increase() {
        let records = vec![month(2025, 1, 100), month(2025, 2, 150)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Increase);
        assert_eq!(trend.magnitude, 50.0);
    }

    #[test]
    fn trend_sorts_records_before_comparing() {
        // Same months handed over out of order must give the same answer.
        let records = vec![month(2025, 2, 150), month(2024, 12, 80), month(2025, 1, 100)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Increase);
        assert_eq!(trend.magnitude, 50.0);
    }

    #[test]
    fn trend_from_zero_is_a_full_increase_by_convention() {
        let records = vec![month(2025, 1, 0), month(2025, 2, 10)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Increase);
        assert_eq!(trend.magnitude, 100.0);
        assert!(trend.magnitude.is_finite());
    }

    #[test]
    fn trend_between_equal_values_is_flat() {
        let records = vec![month(2025, 1, 10), month(2025, 2, 10)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Flat);
        assert_eq!(trend.magnitude, 0.0);
    }

    #[test]
    fn trend_between_two_empty_months_is_flat() {
        let records = vec![month(2025, 1, 0), month(2025, 2, 0)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Flat);
        assert_eq!(trend.magnitude, 0.0);
    }

    #[test]
    fn trend_reports_decreases_with_positive_magnitude() {
        let records = vec![month(2025, 1, 200), month(2025, 2, 150)];
        let trend = trend(&records, Metric::TotalLines).unwrap();

        assert_eq!(trend.direction, TrendDirection::Decrease);
        assert_eq!(trend.magnitude, 25.0);
    }

    #[test]
    fn trend_by_supports_derived_ratios() {
        let records = vec![
            MonthlyRecord {
                year: 2025,
                month: 1,
                total_prescribed: Some(1000),
                total_dispensed: Some(800),
                ..MonthlyRecord::default()
            },
            MonthlyRecord {
                year: 2025,
                month: 2,
                total_prescribed: Some(1000),
                total_dispensed: Some(900),
                ..MonthlyRecord::default()
            },
        ];

        let trend = trend_by(&records, |record| record.dispensation_rate()).unwrap();
        assert_eq!(trend.direction, TrendDirection::Increase);
        assert!((trend.magnitude - 12.5).abs() < 1e-9);
    }

    #[test]
    fn shortfall_is_signed() {
        let record = MonthlyRecord {
            year: 2025,
            month: 1,
            total_prescribed: Some(100),
            total_dispensed: Some(130),
            ..MonthlyRecord::default()
        };
        assert_eq!(record.shortfall(), -30);
    }

    #[test]
    fn numbers_are_grouped_in_es_py_style() {
        assert_eq!(format_number(Some(1_234_567)), "1.234.567");
        assert_eq!(format_number(Some(999)), "999");
        assert_eq!(format_number(Some(1_000)), "1.000");
        assert_eq!(format_number(Some(-4_500)), "-4.500");
        assert_eq!(format_number(Some(0)), "0");
        assert_eq!(format_number(None), "0");
    }

    #[test]
    fn percentages_render_a_ratio_with_fixed_decimals() {
        assert_eq!(format_percentage(Some(0.457), 1), "45.7%");
        assert_eq!(format_percentage(Some(0.0), 1), "0.0%");
        assert_eq!(format_percentage(Some(1.0), 0), "100%");
        assert_eq!(format_percentage(None, 1), "0%");
        assert_eq!(format_percentage(Some(f64::NAN), 1), "0%");
        assert_eq!(format_percentage(Some(f64::INFINITY), 1), "0%");
    }

    #[test]
    fn dates_render_in_long_spanish_form() {
        assert_eq!(
            format_date(Some("2025-08-26T10:30:00.123456")),
            "26 de agosto de 2025"
        );
        assert_eq!(
            format_date(Some("2025-01-15T08:00:00+00:00")),
            "15 de enero de 2025"
        );
        assert_eq!(format_date(Some("2025-03-02")), "2 de marzo de 2025");
    }

    #[test]
    fn unreadable_dates_fall_back_to_a_placeholder() {
        assert_eq!(format_date(Some("not-a-date")), "-");
        assert_eq!(format_date(Some("")), "-");
        assert_eq!(format_date(None), "-");
    }

    #[test]
    fn filter_keeps_records_inside_the_period_range() {
        let records = vec![month(2024, 11, 10), month(2025, 1, 20), month(2025, 3, 30)];
        let filter = FilterState {
            from: Some(Period::new(2025, 1)),
            to: Some(Period::new(2025, 2)),
            ..FilterState::default()
        };

        let kept = filter_records(&records, &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].period(), Period::new(2025, 1));
    }

    #[test]
    fn filter_applies_the_rate_floor_per_month() {
        let low = MonthlyRecord {
            year: 2025,
            month: 1,
            total_prescribed: Some(100),
            total_dispensed: Some(50),
            ..MonthlyRecord::default()
        };
        let high = MonthlyRecord {
            year: 2025,
            month: 2,
            total_prescribed: Some(100),
            total_dispensed: Some(90),
            ..MonthlyRecord::default()
        };

        let filter = FilterState {
            min_rate: 0.8,
            ..FilterState::default()
        };

        let kept = filter_records(&[low, high.clone()], &filter);
        assert_eq!(kept, vec![high]);
    }

    #[test]
    fn filter_restricts_medications_to_the_selected_codes() {
        let first = TopMedication {
            year: 2025,
            month: 1,
            code: 111,
            ..TopMedication::default()
        };
        let second = TopMedication {
            year: 2025,
            month: 1,
            code: 222,
            ..TopMedication::default()
        };

        let filter = FilterState {
            medications: vec![222],
            ..FilterState::default()
        };

        let kept = filter_medications(&[first, second.clone()], &filter);
        assert_eq!(kept, vec![second]);
    }

    #[test]
    fn empty_filter_selects_everything() {
        let filter = FilterState::default();
        assert!(filter.is_empty());

        let records = vec![month(2025, 1, 10), month(2025, 2, 20)];
        assert_eq!(filter_records(&records, &filter), records);
    }

    #[test]
    fn medication_display_name_falls_back_to_its_code() {
        let unnamed = TopMedication {
            code: 90210,
            ..TopMedication::default()
        };
        assert_eq!(unnamed.display_name(), "Medicamento 90210");
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let snapshot = empty_snapshot();
        assert!(snapshot.kpis.is_empty());
        assert_eq!(snapshot.record_count, "0");
        assert_eq!(snapshot.last_updated, "-");
    }
}
