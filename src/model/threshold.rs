//! Threshold Table
//!
//! Clinical range rules per signal type. A rule matches a value inside its half-open range
//! `[min, max)`; one value can match several rules.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::sample::SignalType;

/// Severity of a threshold rule and of the alerts it raises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Informational,
    Warning,
    Urgent,
}

/// One clinical range rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub priority: Priority,
}

impl ThresholdRule {
    pub fn new(min: f64, max: f64, label: impl Into<String>, priority: Priority) -> Self {
        Self {
            min,
            max,
            label: label.into(),
            priority,
        }
    }

    /// Checks whether `value` lies in `[min, max)`.
    ///
    /// A rule describes the alarm band, not the normal range: "Severe Tachycardia" `[120, 999)`
    /// raises its alert for heart rates from 120 upward. Overrides are written the same way.
    pub fn matches(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }

    /// Rejects rules that could never match.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(anyhow!("rule '{}' has a non-finite bound", self.label));
        }
        if self.min >= self.max {
            return Err(anyhow!(
                "rule '{}' has min {} >= max {} and would never match",
                self.label,
                self.min,
                self.max
            ));
        }
        Ok(())
    }
}

/// Mapping from signal type to its ordered rule set.
#[derive(Clone, Debug)]
pub struct ThresholdTable {
    rules: HashMap<SignalType, Vec<ThresholdRule>>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        use Priority::*;
        use SignalType::*;

        let r = ThresholdRule::new;
        let mut rules = HashMap::new();
        rules.insert(
            HeartRate,
            vec![
                r(0.0, 40.0, "Severe Bradycardia", Urgent),
                r(40.0, 50.0, "Bradycardia", Warning),
                r(90.0, 100.0, "Elevated Heart Rate", Informational),
                r(100.0, 120.0, "Tachycardia", Warning),
                r(120.0, 999.0, "Severe Tachycardia", Urgent),
            ],
        );
        rules.insert(
            BloodPressureSystolic,
            vec![
                r(0.0, 90.0, "Hypotension", Warning),
                r(120.0, 130.0, "Elevated Blood Pressure", Informational),
                r(130.0, 180.0, "Hypertension", Warning),
                r(180.0, 999.0, "Hypertensive Crisis", Urgent),
            ],
        );
        rules.insert(
            BloodPressureDiastolic,
            vec![
                r(0.0, 60.0, "Hypotension", Warning),
                r(80.0, 90.0, "Elevated Diastolic Pressure", Informational),
                r(90.0, 120.0, "Hypertension", Warning),
                r(120.0, 999.0, "Hypertensive Crisis", Urgent),
            ],
        );
        rules.insert(
            RespiratoryRate,
            vec![
                r(0.0, 8.0, "Severe Bradypnea", Urgent),
                r(8.0, 12.0, "Bradypnea", Warning),
                r(20.0, 30.0, "Tachypnea", Warning),
                r(30.0, 999.0, "Severe Tachypnea", Urgent),
            ],
        );
        rules.insert(
            BodyTemperature,
            vec![
                r(0.0, 35.0, "Hypothermia", Urgent),
                r(37.5, 38.3, "Low-grade Fever", Informational),
                r(38.3, 40.0, "Fever", Warning),
                r(40.0, 999.0, "Hyperpyrexia", Urgent),
            ],
        );
        rules.insert(
            OxygenSaturation,
            vec![
                r(0.0, 90.0, "Severe Hypoxemia", Urgent),
                r(90.0, 94.0, "Hypoxemia", Warning),
                r(94.0, 95.0, "Borderline Saturation", Informational),
            ],
        );
        rules.insert(
            BloodGlucose,
            vec![
                r(0.0, 54.0, "Severe Hypoglycemia", Urgent),
                r(54.0, 70.0, "Hypoglycemia", Warning),
                r(140.0, 180.0, "Elevated Glucose", Informational),
                r(180.0, 999.0, "Hyperglycemia", Warning),
            ],
        );
        rules.insert(
            Cortisol,
            vec![
                r(0.0, 5.0, "Low Cortisol", Warning),
                r(25.0, 999.0, "Elevated Cortisol", Warning),
            ],
        );
        rules.insert(
            SleepQuality,
            vec![
                r(0.0, 40.0, "Poor Sleep Quality", Warning),
                r(40.0, 60.0, "Reduced Sleep Quality", Informational),
            ],
        );
        Self { rules }
    }
}

impl ThresholdTable {
    /// Builds the default table with caller overrides applied.
    ///
    /// An override replaces the whole rule set of its signal type. Overrides are validated
    /// first; a single malformed rule rejects the table.
    pub fn with_overrides(overrides: &HashMap<SignalType, Vec<ThresholdRule>>) -> Result<Self> {
        let mut table = Self::default();
        for (signal_type, rules) in overrides {
            for rule in rules {
                rule.validate()
                    .map_err(|e| anyhow!("invalid {} threshold: {}", signal_type, e))?;
            }
            table.rules.insert(*signal_type, rules.clone());
        }
        Ok(table)
    }

    /// Ordered rules for a signal type. Empty when the type has none.
    pub fn rules_for(&self, signal_type: SignalType) -> &[ThresholdRule] {
        self.rules
            .get(&signal_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
