//! Alert evaluation against margin-widened target bounds.
//!
//! Pure read-path logic: a breach informs the alert sink, it never
//! influences a transition.

use std::fmt;

use canopy_core::models::margin::AlertMargins;
use canopy_core::models::target::TargetBounds;

/// A point-in-time environmental reading for a tent.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub ppfd: f64,
    /// pH probes are optional equipment; `None` skips pH evaluation.
    pub ph: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertMetric {
    Temperature,
    Humidity,
    Ppfd,
    Ph,
}

impl fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertMetric::Temperature => "temperature",
            AlertMetric::Humidity => "humidity",
            AlertMetric::Ppfd => "PPFD",
            AlertMetric::Ph => "pH",
        };
        f.write_str(name)
    }
}

/// One metric outside its tolerated band.
#[derive(Debug, Clone, Copy)]
pub struct AlertBreach {
    pub metric: AlertMetric,
    pub value: f64,
    pub allowed_min: f64,
    pub allowed_max: f64,
}

fn check(
    metric: AlertMetric,
    value: f64,
    min: f64,
    max: f64,
    margin: f64,
    out: &mut Vec<AlertBreach>,
) {
    let allowed_min = min - margin;
    let allowed_max = max + margin;
    if value < allowed_min || value > allowed_max {
        out.push(AlertBreach {
            metric,
            value,
            allowed_min,
            allowed_max,
        });
    }
}

/// Compare a reading against the targets widened by the phase margins.
/// A `None` pH margin suppresses pH breaches entirely.
pub fn evaluate(
    reading: &EnvironmentReading,
    targets: &TargetBounds,
    margins: &AlertMargins,
) -> Vec<AlertBreach> {
    let mut breaches = Vec::new();

    check(
        AlertMetric::Temperature,
        reading.temperature_c,
        targets.temperature_c.min,
        targets.temperature_c.max,
        margins.temperature_c,
        &mut breaches,
    );
    check(
        AlertMetric::Humidity,
        reading.humidity_pct,
        targets.humidity_pct.min,
        targets.humidity_pct.max,
        margins.humidity_pct,
        &mut breaches,
    );
    check(
        AlertMetric::Ppfd,
        reading.ppfd,
        targets.ppfd.min,
        targets.ppfd.max,
        margins.ppfd,
        &mut breaches,
    );
    if let (Some(ph_margin), Some(ph)) = (margins.ph, reading.ph) {
        check(
            AlertMetric::Ph,
            ph,
            targets.ph.min,
            targets.ph.max,
            ph_margin,
            &mut breaches,
        );
    }

    breaches
}
