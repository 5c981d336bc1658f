mod engine;
mod scenarios;
mod types;

pub use engine::{DEFAULT_APPRECIATION_RATE, derive_metrics, derive_scorecard, to_percent};
pub use scenarios::{
    analysis_date, growth_bar_heights, ltv_percent, occupancy_percent, predictive_alerts,
    scenario_projections,
};
pub use types::{
    Dealscore, DealscoreBreakdown, DealscoreRuleSet, DerivedMetrics, MetricsHistoryEntry,
    OperatingInputs, PredictiveAlert, PropertyRecord, RecommendationEntry, RentEstimateEntry,
    RiskBand, RiskLevel, ScenarioKind, ScenarioProjection, Scorecard, ScorecardPayload,
    ServerMetrics, ValuationEntry,
};
