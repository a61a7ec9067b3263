//! Alert Evaluator
//!
//! Turns a filtered sample into alerts by running it through the threshold table. Informational
//! rules stay quiet while a more severe, unacknowledged alert is open for the same stream and
//! signal.

use log::trace;

use crate::model::{
    alert::Alert,
    sample::Sample,
    stream::StreamMetadata,
    threshold::{Priority, ThresholdTable},
};

#[derive(Clone, Debug, Default)]
pub struct AlertEvaluator {
    table: ThresholdTable,
}

impl AlertEvaluator {
    pub fn new(table: ThresholdTable) -> Self {
        Self { table }
    }

    pub fn get_table(&self) -> &ThresholdTable {
        &self.table
    }

    /// Evaluates `sample` and returns the new alerts in rule declaration order.
    ///
    /// # Arguments
    /// - `sample`: The filtered sample.
    /// - `stream`: Metadata of the stream the sample belongs to.
    /// - `active_alerts`: Alerts already raised in this session, used for suppression.
    pub fn evaluate<'a>(
        &self,
        sample: &Sample,
        stream: &StreamMetadata,
        active_alerts: impl IntoIterator<Item = &'a Alert>,
    ) -> Vec<Alert> {
        let signal_type = sample.get_signal_type();
        let escalated = active_alerts
            .into_iter()
            .any(|a| a.is_active_escalation(&stream.id, signal_type));

        self.table
            .rules_for(signal_type)
            .iter()
            .filter(|rule| rule.matches(sample.get_value()))
            .filter(|rule| {
                let suppressed = escalated && rule.priority == Priority::Informational;
                if suppressed {
                    trace!("suppressing '{}' on {}", rule.label, stream.id);
                }
                !suppressed
            })
            .map(|rule| Alert::new(sample, stream, rule))
            .collect()
    }
}
