use chrono::NaiveDate;

use super::engine::to_percent;
use super::types::{
    Dealscore, DerivedMetrics, MetricsHistoryEntry, PredictiveAlert, PropertyRecord,
    RecommendationEntry, RiskBand, RiskLevel, ScenarioKind, ScenarioProjection, ScorecardPayload,
    ValuationEntry, parse_as_of_date,
};

/// Decorative growth bars shown when no time-series data exists at all.
pub(crate) const PLACEHOLDER_GROWTH_HEIGHTS: [&str; 10] = [
    "40%", "52%", "68%", "75%", "82%", "88%", "92%", "95%", "98%", "100%",
];

// The stress scenarios are fixed illustrations, never data-driven.
const RECESSION_HEIGHTS: [&str; 10] = [
    "40%", "38%", "35%", "42%", "50%", "58%", "65%", "70%", "76%", "82%",
];
const INFLATION_HEIGHTS: [&str; 10] = [
    "40%", "58%", "78%", "88%", "95%", "100%", "100%", "100%", "100%", "100%",
];
const RATES_HEIGHTS: [&str; 10] = [
    "40%", "45%", "52%", "58%", "64%", "70%", "75%", "80%", "84%", "88%",
];

const MAX_BARS: usize = 10;
const MIN_BAR_PCT: f64 = 12.0;

/// Builds the four scenario projections, in fixed order: base, recession,
/// inflation, rate shock.
pub fn scenario_projections(
    payload: &ScorecardPayload,
    metrics: &DerivedMetrics,
) -> Vec<ScenarioProjection> {
    let dealscore = payload.dealscore.as_ref();
    let rule_set_name = dealscore
        .and_then(|d| d.dealscore_rule_set.as_ref())
        .and_then(|r| non_empty(r.name.as_deref()));
    let property = payload.property.as_ref();

    let base_title = match rule_set_name {
        Some(name) => format!("{name} - Base Scenario"),
        None => "OwnerIQ AI Recommendation - Base Scenario".to_string(),
    };

    let records = &payload.recommendations;
    vec![
        projection(
            ScenarioKind::Normal,
            "Base Scenario",
            "#10b981",
            growth_bar_heights(&payload.valuations, &payload.metrics_history),
            records.first(),
            rule_set_name,
            base_title,
            base_recommendation_text(dealscore, metrics),
        ),
        projection(
            ScenarioKind::Recession,
            "Recession (-3%)",
            "#ef4444",
            fixed_heights(&RECESSION_HEIGHTS),
            records.get(1),
            rule_set_name,
            "Recession Scenario".to_string(),
            recession_fallback(metrics),
        ),
        projection(
            ScenarioKind::Inflation,
            "High Inflation (+5%)",
            "#f59e0b",
            fixed_heights(&INFLATION_HEIGHTS),
            records.get(2),
            rule_set_name,
            "High Inflation Outlook".to_string(),
            inflation_fallback(metrics),
        ),
        projection(
            ScenarioKind::Rates,
            "High Rates (+2%)",
            "#3b82f6",
            fixed_heights(&RATES_HEIGHTS),
            records.get(3),
            rule_set_name,
            "High Rates (+2%)".to_string(),
            rates_fallback(property),
        ),
    ]
}

/// Growth-chart magnitudes for the base scenario: valuation history first,
/// then the metrics history, then the decorative placeholder.
pub fn growth_bar_heights(
    valuations: &[ValuationEntry],
    history: &[MetricsHistoryEntry],
) -> Vec<String> {
    // Series arrive most-recent-first; the chart reads oldest to newest.
    let mut values: Vec<f64> = valuations
        .iter()
        .rev()
        .filter_map(|e| e.amount_usd)
        .filter(|v| *v > 0.0)
        .collect();

    if values.is_empty() {
        values = history
            .iter()
            .rev()
            .map(|e| e.noi.or(e.cash_flow_net).unwrap_or(0.0))
            .filter(|v| *v != 0.0)
            .collect();
    }

    if values.is_empty() {
        return fixed_heights(&PLACEHOLDER_GROWTH_HEIGHTS);
    }

    if values.len() > MAX_BARS {
        values.drain(..values.len() - MAX_BARS);
    }

    let max_magnitude = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_magnitude <= 0.0 {
        return values.iter().map(|_| "40%".to_string()).collect();
    }

    values
        .iter()
        .map(|v| {
            let percent = (v.abs() / max_magnitude * 100.0).clamp(MIN_BAR_PCT, 100.0);
            format!("{}%", percent.round() as i64)
        })
        .collect()
}

/// The three headline alerts: taken from the recommendation records when any
/// exist, otherwise computed from the derived metrics.
pub fn predictive_alerts(
    payload: &ScorecardPayload,
    metrics: &DerivedMetrics,
) -> Vec<PredictiveAlert> {
    if payload.recommendations.is_empty() {
        let refinance_savings = (metrics.annual_rent * 0.005).round().max(0.0) as i64;
        let capex_budget = (metrics.valuation * 0.02).round().max(0.0) as i64;
        return vec![
            PredictiveAlert {
                title: "Optimal Refinancing Time".to_string(),
                text: format!(
                    "Rates are 0.5% below average. Save ${}/month by refinancing now.",
                    group_thousands(refinance_savings)
                ),
            },
            PredictiveAlert {
                title: "CapEx Planning".to_string(),
                text: format!(
                    "Plan ${} for major maintenance within 18-24 months to maximise resale value.",
                    group_thousands(capex_budget)
                ),
            },
            PredictiveAlert {
                title: "Favorable Market Trend".to_string(),
                text: "Local market shows consistent growth. Consider holding for 3+ years."
                    .to_string(),
            },
        ];
    }

    let base_text = base_recommendation_text(payload.dealscore.as_ref(), metrics);
    payload
        .recommendations
        .iter()
        .take(3)
        .enumerate()
        .map(|(index, record)| PredictiveAlert {
            title: match non_empty(record.decision.as_deref()) {
                Some(decision) => format!("AI Decision: {decision}"),
                None => format!("Insight {}", index + 1),
            },
            text: narrative_for(record).unwrap_or_else(|| base_text.clone()),
        })
        .collect()
}

/// Loan-to-value for display: property record, then operating inputs, then
/// the dealscore's own figure.
pub fn ltv_percent(payload: &ScorecardPayload) -> Option<f64> {
    let candidates = [
        payload.property.as_ref().and_then(|p| p.ltv),
        payload.operating_inputs.as_ref().and_then(|o| o.ltv_pct),
        payload.dealscore.as_ref().and_then(|d| d.ltv),
    ];
    to_percent(candidates.iter().find_map(|c| *c))
}

/// Occupancy as the complement of the vacancy rate, clamped to [0, 100].
pub fn occupancy_percent(payload: &ScorecardPayload) -> Option<f64> {
    let vacancy = payload
        .operating_inputs
        .as_ref()
        .and_then(|o| o.vacancy_rate_pct)
        .or_else(|| payload.property.as_ref().and_then(|p| p.vacancy))?;
    let vacancy_percent = if vacancy > 1.0 { vacancy } else { vacancy * 100.0 };
    Some((100.0 - vacancy_percent).clamp(0.0, 100.0))
}

/// The freshest date the analysis can be stamped with: server metrics, then
/// the latest valuation, then the base recommendation, then the property
/// record itself.
pub fn analysis_date(payload: &ScorecardPayload) -> Option<NaiveDate> {
    let candidates = [
        payload.metrics.as_ref().and_then(|m| m.as_of_date.as_deref()),
        payload.valuations.first().and_then(|v| v.as_of_date.as_deref()),
        payload
            .recommendations
            .first()
            .and_then(|r| r.as_of_date.as_deref()),
        payload.property.as_ref().and_then(|p| p.updated_at.as_deref()),
    ];
    candidates
        .iter()
        .copied()
        .flatten()
        .find_map(parse_as_of_date)
}

impl RiskBand {
    pub fn for_score(score: u8) -> Self {
        if score < 30 {
            Self {
                level: RiskLevel::Low,
                color_token: "#10b981",
                meter_width: "25%",
            }
        } else if score < 60 {
            Self {
                level: RiskLevel::Medium,
                color_token: "#f59e0b",
                meter_width: "55%",
            }
        } else {
            Self {
                level: RiskLevel::High,
                color_token: "#ef4444",
                meter_width: "85%",
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn projection(
    scenario: ScenarioKind,
    label: &'static str,
    color_token: &'static str,
    bar_heights: Vec<String>,
    record: Option<&RecommendationEntry>,
    rule_set_name: Option<&str>,
    default_title: String,
    fallback_text: String,
) -> ScenarioProjection {
    ScenarioProjection {
        scenario,
        label,
        title: resolve_title(record, rule_set_name, default_title),
        narrative_text: record
            .and_then(narrative_for)
            .unwrap_or(fallback_text),
        bar_heights,
        color_token,
    }
}

fn resolve_title(
    record: Option<&RecommendationEntry>,
    rule_set_name: Option<&str>,
    default_title: String,
) -> String {
    let Some(record) = record else {
        return default_title;
    };
    if let Some(decision) = non_empty(record.decision.as_deref()) {
        return decision.to_string();
    }
    if let Some(name) = rule_set_name {
        return format!("{name} Insight");
    }
    default_title
}

fn narrative_for(record: &RecommendationEntry) -> Option<String> {
    non_empty(record.why.as_deref())
        .or_else(|| non_empty(record.recommendation.as_deref()))
        .or_else(|| non_empty(record.risks.as_deref()))
        .map(str::to_string)
}

fn base_recommendation_text(dealscore: Option<&Dealscore>, metrics: &DerivedMetrics) -> String {
    if let Some(text) = dealscore.and_then(|d| non_empty(d.recommendation.as_deref())) {
        return text.to_string();
    }
    format!(
        "Hold property. Predictive analysis shows sustained 6.2% annual growth. \
         Your equity will grow to ${} in 10 years with positive cash flow of ${}/year. \
         Optimal selling time projected: Q2 2032.",
        format_usd(metrics.projected_value),
        format_usd(metrics.cash_flow)
    )
}

fn recession_fallback(metrics: &DerivedMetrics) -> String {
    let reserve_months = ((metrics.annual_expenses / 12.0).round() as i64).max(3);
    format!(
        "Hold and strengthen reserves. Annual cash flow is ${}. \
         Build a reserve of {reserve_months} months to weather a downturn.",
        format_usd(metrics.cash_flow)
    )
}

fn inflation_fallback(metrics: &DerivedMetrics) -> String {
    format!(
        "Projected appreciation at {:.1}% annually. \
         Equity could reach ${} in 10 years if trends persist.",
        metrics.appreciation_rate * 100.0,
        format_usd(metrics.projected_value)
    )
}

fn rates_fallback(property: Option<&PropertyRecord>) -> String {
    match property.and_then(|p| p.loan_rate).filter(|r| *r != 0.0) {
        Some(rate) => format!(
            "Current loan rate {rate:.2}%. Refinance only if you secure below {:.2}%.",
            rate - 0.5
        ),
        None => "Maintain existing financing advantage; monitor market rates quarterly."
            .to_string(),
    }
}

fn fixed_heights(heights: &[&'static str; 10]) -> Vec<String> {
    heights.iter().map(|h| (*h).to_string()).collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn format_usd(value: f64) -> String {
    group_thousands(value.round() as i64)
}

fn group_thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
