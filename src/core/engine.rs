use super::scenarios::{
    analysis_date, ltv_percent, occupancy_percent, predictive_alerts, scenario_projections,
};
use super::types::{
    Dealscore, DealscoreBreakdown, DerivedMetrics, RiskBand, Scorecard, ScorecardPayload,
    ValuationEntry, parse_as_of_date,
};

/// Assumed annual appreciation when the valuation history is too thin to fit
/// a growth rate.
pub const DEFAULT_APPRECIATION_RATE: f64 = 0.062;

const PROJECTION_YEARS: i32 = 10;
const DAYS_PER_YEAR: f64 = 365.25;
const MIN_FIT_YEARS: f64 = 0.25;

/// Derives the full scorecard bundle from one payload snapshot.
///
/// Total over any payload: missing fields degrade through the documented
/// fallback chains and no numeric output is ever NaN or infinite.
pub fn derive_scorecard(payload: &ScorecardPayload) -> Scorecard {
    let metrics = derive_metrics(payload);
    let scenarios = scenario_projections(payload, &metrics);
    let alerts = predictive_alerts(payload, &metrics);

    Scorecard {
        risk_band: RiskBand::for_score(metrics.risk_score),
        normalized_dealscore: to_percent(payload.dealscore.as_ref().and_then(|d| d.dealscore)),
        ltv_percent: ltv_percent(payload),
        occupancy_percent: occupancy_percent(payload),
        analysis_date: analysis_date(payload),
        metrics,
        scenarios,
        alerts,
    }
}

pub fn derive_metrics(payload: &ScorecardPayload) -> DerivedMetrics {
    let property = payload.property.as_ref();
    let operating = payload.operating_inputs.as_ref();
    let server = payload.metrics.as_ref();
    let dealscore = payload.dealscore.as_ref();

    let valuation = resolve(&[
        payload.valuations.first().and_then(|e| e.amount_usd),
        property.and_then(|p| p.valuation),
    ]);
    let rent = resolve(&[
        payload
            .rent_estimates
            .first()
            .and_then(|e| e.market_rent_month),
        property.and_then(|p| p.rent),
    ]);
    let taxes = resolve(&[
        server.and_then(|m| m.taxes_annual),
        operating.and_then(|o| o.taxes_annual),
        property.and_then(|p| p.taxes),
    ]);
    let insurance = resolve(&[
        operating.and_then(|o| o.insurance_annual),
        property.and_then(|p| p.insurance),
    ]);
    let hoa = resolve(&[
        operating.and_then(|o| o.hoa_monthly),
        property.and_then(|p| p.hoa),
    ]);
    let maintenance = resolve(&[
        operating.and_then(|o| o.maintenance_pct),
        property.and_then(|p| p.maintenance),
    ]);

    let annual_rent = finite_or_zero(rent * 12.0);
    let maintenance_reserve = finite_or_zero(maintenance / 100.0 * annual_rent);
    let annual_expenses = finite_or_zero(taxes + insurance + hoa * 12.0 + maintenance_reserve);
    let cash_flow = server
        .and_then(|m| m.cash_flow_net)
        .unwrap_or_else(|| finite_or_zero(annual_rent - annual_expenses));

    let cap_rate = to_percent(server.and_then(|m| m.cap_rate))
        .unwrap_or_else(|| ratio_percent(annual_rent - annual_expenses, valuation));
    let cash_on_cash = to_percent(server.and_then(|m| m.cash_on_cash))
        .unwrap_or_else(|| ratio_percent(cash_flow, valuation));
    // The local NOI fallback leaves maintenance out of the expense base even
    // though cash flow keeps it in. Existing consumers depend on the skew.
    let noi = server
        .and_then(|m| m.noi)
        .unwrap_or_else(|| finite_or_zero(annual_rent - annual_expenses + maintenance_reserve));
    let dscr = server.and_then(|m| m.dscr);

    let appreciation_rate = fit_appreciation_rate(&payload.valuations);
    let projected_value = finite_or_zero(valuation * (1.0 + appreciation_rate).powi(PROJECTION_YEARS));
    let total_appreciation = finite_or_zero(projected_value - valuation);
    let roi = ratio_percent(total_appreciation, valuation);

    let risk_score = risk_score(
        dealscore.and_then(|d| d.risk_norm),
        cap_rate,
        cash_flow,
        valuation,
    );

    DerivedMetrics {
        valuation,
        rent,
        taxes,
        insurance,
        hoa,
        maintenance,
        annual_rent,
        annual_expenses,
        cash_flow,
        cap_rate,
        cash_on_cash,
        noi,
        dscr,
        projected_value,
        total_appreciation,
        roi,
        appreciation_rate,
        risk_score,
        dealscore: dealscore.and_then(|d| d.dealscore),
        dealscore_breakdown: dealscore_breakdown(dealscore),
    }
}

/// Puts a server-supplied ratio on a 0-100 scale. Fractions up to 1 are
/// scaled by 100; anything above 1 is taken as an already-scaled percent.
pub fn to_percent(value: Option<f64>) -> Option<f64> {
    value
        .filter(|v| v.is_finite())
        .map(|v| if v > 1.0 { v } else { v * 100.0 })
        .filter(|v| v.is_finite())
}

fn resolve(candidates: &[Option<f64>]) -> f64 {
    candidates.iter().find_map(|c| *c).unwrap_or(0.0)
}

fn ratio_percent(numerator: f64, valuation: f64) -> f64 {
    if valuation > 0.0 {
        finite_or_zero(numerator / valuation * 100.0)
    } else {
        0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Fits a compound annual growth rate to the two most recent usable
/// valuation entries. Day gaps under a quarter year are floored at 0.25 so a
/// near-same-day pair cannot blow the exponent up.
fn fit_appreciation_rate(valuations: &[ValuationEntry]) -> f64 {
    if valuations.len() < 2 {
        return DEFAULT_APPRECIATION_RATE;
    }

    let latest = &valuations[0];
    let latest_value = latest.amount_usd.unwrap_or(0.0);
    let Some(previous) = valuations[1..]
        .iter()
        .find(|e| e.amount_usd.is_some_and(|v| v != 0.0))
    else {
        return DEFAULT_APPRECIATION_RATE;
    };
    let previous_value = previous.amount_usd.unwrap_or(0.0);

    if latest_value <= 0.0 || previous_value <= 0.0 {
        return DEFAULT_APPRECIATION_RATE;
    }

    let latest_date = latest.as_of_date.as_deref().and_then(parse_as_of_date);
    let previous_date = previous.as_of_date.as_deref().and_then(parse_as_of_date);
    let (Some(latest_date), Some(previous_date)) = (latest_date, previous_date) else {
        return DEFAULT_APPRECIATION_RATE;
    };

    let elapsed_days = (latest_date - previous_date).num_days() as f64;
    let years = (elapsed_days / DAYS_PER_YEAR).max(MIN_FIT_YEARS);
    let rate = (latest_value / previous_value).powf(1.0 / years) - 1.0;
    if rate.is_finite() {
        rate
    } else {
        DEFAULT_APPRECIATION_RATE
    }
}

fn risk_score(risk_norm: Option<f64>, cap_rate: f64, cash_flow: f64, valuation: f64) -> u8 {
    let raw = match risk_norm {
        Some(norm) => (1.0 - norm) * 100.0,
        None => {
            0.4 * (100.0 - cap_rate * 10.0)
                + 0.3 * if cash_flow < 0.0 { 50.0 } else { 0.0 }
                + 0.3 * if valuation > 1_000_000.0 { 20.0 } else { 0.0 }
        }
    };
    raw.round().clamp(0.0, 100.0) as u8
}

fn dealscore_breakdown(dealscore: Option<&Dealscore>) -> DealscoreBreakdown {
    let Some(d) = dealscore else {
        return DealscoreBreakdown::default();
    };
    DealscoreBreakdown {
        cap_rate: to_percent(d.cap_rate_norm),
        cash_on_cash: to_percent(d.coc_norm),
        dscr: to_percent(d.dscr_norm),
        appreciation: to_percent(d.appreciation_norm),
        risk: to_percent(d.risk_norm.map(|r| 1.0 - r)),
        liquidity: to_percent(d.liquidity_norm),
    }
}
