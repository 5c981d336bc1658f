use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw scorecard payload as returned by the property service at
/// `GET /api/properties/{id}/scorecard`.
///
/// Every field is optional and decoding is tolerant: a wrong-typed field
/// decodes as absent instead of failing the payload, so any JSON object is a
/// valid input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScorecardPayload {
    #[serde(deserialize_with = "lenient_object")]
    pub property: Option<PropertyRecord>,
    #[serde(deserialize_with = "lenient_entries")]
    pub valuations: Vec<ValuationEntry>,
    #[serde(deserialize_with = "lenient_entries")]
    pub rent_estimates: Vec<RentEstimateEntry>,
    #[serde(deserialize_with = "lenient_object")]
    pub metrics: Option<ServerMetrics>,
    #[serde(deserialize_with = "lenient_object")]
    pub operating_inputs: Option<OperatingInputs>,
    #[serde(deserialize_with = "lenient_object")]
    pub dealscore: Option<Dealscore>,
    #[serde(deserialize_with = "lenient_entries")]
    pub recommendations: Vec<RecommendationEntry>,
    #[serde(deserialize_with = "lenient_entries")]
    pub metrics_history: Vec<MetricsHistoryEntry>,
}

impl ScorecardPayload {
    /// Decodes any JSON value. A non-object decodes as the empty payload.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let value =
            serde_json::from_str::<Value>(json).map_err(|e| format!("invalid JSON: {e}"))?;
        Ok(Self::from_value(value))
    }
}

/// Identifying attributes of a property plus the caller-supplied financial
/// fallbacks used when the time-series data is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub property_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub valuation: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub rent: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub taxes: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub insurance: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub hoa: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub maintenance: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub ltv: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub vacancy: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub loan_rate: Option<f64>,
}

/// One point of the valuation history, most-recent-first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValuationEntry {
    #[serde(deserialize_with = "lenient_number")]
    pub amount_usd: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub as_of_date: Option<String>,
}

/// One point of the rent-estimate history, most-recent-first. Only the
/// latest entry is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RentEstimateEntry {
    #[serde(deserialize_with = "lenient_number")]
    pub market_rent_month: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub as_of_date: Option<String>,
}

/// Operating-cost overrides; each field independently falls back to the
/// property record equivalent, then to zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperatingInputs {
    #[serde(deserialize_with = "lenient_number")]
    pub taxes_annual: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub insurance_annual: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub hoa_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub maintenance_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub vacancy_rate_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub ltv_pct: Option<f64>,
}

/// Server-computed metrics. When present these take precedence over the
/// locally derived values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerMetrics {
    #[serde(deserialize_with = "lenient_number")]
    pub cap_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cash_on_cash: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub noi: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cash_flow_net: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub dscr: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub taxes_annual: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub as_of_date: Option<String>,
}

/// Dealscore breakdown from the scoring pipeline. The `*_norm` fields are
/// fractions in [0, 1]; `dealscore` is on a 0-100 scale; `risk_norm` is
/// higher-is-riskier.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Dealscore {
    #[serde(deserialize_with = "lenient_number")]
    pub dealscore: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cap_rate_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub coc_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub dscr_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub appreciation_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub risk_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub liquidity_norm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub ltv: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: Option<String>,
    #[serde(deserialize_with = "lenient_object")]
    pub dealscore_rule_set: Option<DealscoreRuleSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DealscoreRuleSet {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// Scenario narrative from the recommendation pipeline. Index 0 is the base
/// scenario, then recession, inflation, and rate shock.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecommendationEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub decision: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub why: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub risks: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub as_of_date: Option<String>,
}

/// One point of the metrics history, most-recent-first. Used as the growth
/// chart source when no valuation history exists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsHistoryEntry {
    #[serde(deserialize_with = "lenient_number")]
    pub noi: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cash_flow_net: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub as_of_date: Option<String>,
}

/// The normalized metrics bundle, computed once per payload. Percentages are
/// on a 0-100 scale; `dscr` stays a ratio and is absent when the server did
/// not supply one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub valuation: f64,
    pub rent: f64,
    pub taxes: f64,
    pub insurance: f64,
    pub hoa: f64,
    pub maintenance: f64,
    pub annual_rent: f64,
    pub annual_expenses: f64,
    pub cash_flow: f64,
    pub cap_rate: f64,
    pub cash_on_cash: f64,
    pub noi: f64,
    pub dscr: Option<f64>,
    pub projected_value: f64,
    pub total_appreciation: f64,
    pub roi: f64,
    pub appreciation_rate: f64,
    pub risk_score: u8,
    pub dealscore: Option<f64>,
    pub dealscore_breakdown: DealscoreBreakdown,
}

/// Dealscore component fractions converted to percentages for display.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealscoreBreakdown {
    pub cap_rate: Option<f64>,
    pub cash_on_cash: Option<f64>,
    pub dscr: Option<f64>,
    pub appreciation: Option<f64>,
    pub risk: Option<f64>,
    pub liquidity: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Normal,
    Recession,
    Inflation,
    Rates,
}

/// Bar-chart magnitudes and narrative for one scenario.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProjection {
    pub scenario: ScenarioKind,
    pub label: &'static str,
    pub title: String,
    pub narrative_text: String,
    pub bar_heights: Vec<String>,
    pub color_token: &'static str,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Display banding of the risk score: `<30` low, `30-59` medium, `>=60` high.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBand {
    pub level: RiskLevel,
    pub color_token: &'static str,
    pub meter_width: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveAlert {
    pub title: String,
    pub text: String,
}

/// The full derivation result: metrics, the four scenario projections, and
/// the display values resolved alongside them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub metrics: DerivedMetrics,
    pub scenarios: Vec<ScenarioProjection>,
    pub risk_band: RiskBand,
    pub normalized_dealscore: Option<f64>,
    pub ltv_percent: Option<f64>,
    pub occupancy_percent: Option<f64>,
    pub analysis_date: Option<NaiveDate>,
    pub alerts: Vec<PredictiveAlert>,
}

/// Parses the `as_of_date` strings the service emits: a plain ISO date or an
/// RFC 3339 datetime. Anything else is absent.
pub(crate) fn parse_as_of_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_decodes_camel_case_top_level_keys() {
        let payload = ScorecardPayload::from_json(
            r#"{
              "property": {"property_id": "prop-1", "rent": 1500},
              "valuations": [{"amount_usd": 250000, "as_of_date": "2024-06-01"}],
              "rentEstimates": [{"market_rent_month": 1800}],
              "operatingInputs": {"taxes_annual": 3200, "hoa_monthly": 50},
              "metricsHistory": [{"noi": 12000}]
            }"#,
        )
        .expect("payload should decode");

        assert_eq!(
            payload.property.as_ref().unwrap().property_id.as_deref(),
            Some("prop-1")
        );
        assert_eq!(payload.valuations[0].amount_usd, Some(250_000.0));
        assert_eq!(payload.rent_estimates[0].market_rent_month, Some(1_800.0));
        assert_eq!(
            payload.operating_inputs.as_ref().unwrap().hoa_monthly,
            Some(50.0)
        );
        assert_eq!(payload.metrics_history[0].noi, Some(12_000.0));
    }

    #[test]
    fn numeric_fields_accept_numeric_strings() {
        let payload = ScorecardPayload::from_json(
            r#"{"property": {"valuation": "350000", "rent": " 1200.5 "}}"#,
        )
        .expect("payload should decode");

        let property = payload.property.unwrap();
        assert_eq!(property.valuation, Some(350_000.0));
        assert_eq!(property.rent, Some(1_200.5));
    }

    #[test]
    fn malformed_fields_decode_as_absent() {
        let payload = ScorecardPayload::from_json(
            r#"{
              "property": {"valuation": "not a number", "rent": true, "address": {"street": 1}},
              "valuations": [{"amount_usd": {}, "as_of_date": 7}, "junk", {"amount_usd": 100}],
              "rentEstimates": {"market_rent_month": 900},
              "dealscore": 42
            }"#,
        )
        .expect("payload should decode");

        let property = payload.property.unwrap();
        assert_eq!(property.valuation, None);
        assert_eq!(property.rent, None);
        assert_eq!(property.address, None);

        assert_eq!(payload.valuations.len(), 3);
        assert_eq!(payload.valuations[0].amount_usd, None);
        assert_eq!(payload.valuations[0].as_of_date.as_deref(), Some("7"));
        assert_eq!(payload.valuations[1].amount_usd, None);
        assert_eq!(payload.valuations[2].amount_usd, Some(100.0));

        assert!(payload.rent_estimates.is_empty());
        assert!(payload.dealscore.is_none());
    }

    #[test]
    fn non_object_payload_decodes_as_empty() {
        let payload = ScorecardPayload::from_json("[1, 2, 3]").expect("payload should decode");
        assert!(payload.property.is_none());
        assert!(payload.valuations.is_empty());
    }

    #[test]
    fn non_finite_numbers_decode_as_absent() {
        let payload =
            ScorecardPayload::from_json(r#"{"property": {"valuation": "inf", "rent": "NaN"}}"#)
                .expect("payload should decode");
        let property = payload.property.unwrap();
        assert_eq!(property.valuation, None);
        assert_eq!(property.rent, None);
    }

    #[test]
    fn nested_rule_set_name_decodes() {
        let payload = ScorecardPayload::from_json(
            r#"{"dealscore": {"dealscore": 82, "dealscore_rule_set": {"name": "Balanced Growth"}}}"#,
        )
        .expect("payload should decode");
        let dealscore = payload.dealscore.unwrap();
        assert_eq!(dealscore.dealscore, Some(82.0));
        assert_eq!(
            dealscore.dealscore_rule_set.unwrap().name.as_deref(),
            Some("Balanced Growth")
        );
    }

    #[test]
    fn as_of_date_parses_iso_date_and_rfc3339() {
        assert_eq!(
            parse_as_of_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(
            parse_as_of_date("2024-03-15T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(parse_as_of_date("soon"), None);
        assert_eq!(parse_as_of_date(""), None);
    }
}
