//! Alert Model
//!
//! Alerts raised by the evaluator and the capped log a session keeps them in.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    sample::{Sample, SignalType},
    stream::StreamMetadata,
    threshold::{Priority, ThresholdRule},
};

/// A sample that fell into a threshold rule's range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub stream_id: String,
    pub patient_id: String,
    pub sample_id: Uuid,
    pub signal_type: SignalType,
    pub value: f64,
    pub rule: ThresholdRule,
    pub priority: Priority,
    pub message: String,
    pub acknowledged: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub acknowledged_at: Option<OffsetDateTime>,
}

impl Alert {
    /// Builds an unacknowledged alert for `sample` matching `rule`.
    pub fn new(sample: &Sample, stream: &StreamMetadata, rule: &ThresholdRule) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream_id: stream.id.clone(),
            patient_id: stream.patient_id.clone(),
            sample_id: sample.get_id(),
            signal_type: sample.get_signal_type(),
            value: sample.get_value(),
            rule: rule.clone(),
            priority: rule.priority,
            message: format!("{}: {:.1} {}", rule.label, sample.get_value(), stream.unit),
            acknowledged: false,
            created_at: OffsetDateTime::now_utc(),
            acknowledged_at: None,
        }
    }

    /// Checks whether this alert blocks informational noise for `(stream_id, signal_type)`.
    pub fn is_active_escalation(&self, stream_id: &str, signal_type: SignalType) -> bool {
        !self.acknowledged
            && self.priority != Priority::Informational
            && self.stream_id == stream_id
            && self.signal_type == signal_type
    }
}

/// Ordered alert list, oldest first, capped at a fixed number of entries.
#[derive(Clone, Debug)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends alerts in order, evicting the oldest entries past capacity.
    pub fn extend(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        for alert in alerts {
            self.alerts.push_back(alert);
            if self.alerts.len() > self.capacity {
                self.alerts.pop_front();
            }
        }
    }

    /// Marks an alert acknowledged. Returns `None` if the id is unknown.
    pub fn acknowledge(&mut self, id: Uuid, at: OffsetDateTime) -> Option<&Alert> {
        let alert = self.alerts.iter_mut().find(|a| a.id == id)?;
        alert.acknowledged = true;
        alert.acknowledged_at = Some(at);
        Some(alert)
    }

    /// Unacknowledged alerts, most severe first, newest first within a priority.
    pub fn unacknowledged(&self, limit: usize) -> Vec<&Alert> {
        // newest first, the stable sort then keeps recency inside each priority
        let mut pending: Vec<&Alert> = self.alerts.iter().rev().filter(|a| !a.acknowledged).collect();
        pending.sort_by(|a, b| b.priority.cmp(&a.priority));
        pending.truncate(limit);
        pending
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Contiguous copy of the log, oldest first.
    pub fn to_vec(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::SignalType;

    fn alert(value: f64, priority: Priority) -> Alert {
        let stream = StreamMetadata::new("s1", "p1", SignalType::HeartRate);
        let sample = Sample::new("s1", SignalType::HeartRate, value, OffsetDateTime::now_utc());
        let rule = ThresholdRule::new(0.0, 999.0, "Any", priority);
        Alert::new(&sample, &stream, &rule)
    }

    #[test]
    fn test_alert_cap_keeps_most_recent() {
        let mut log = AlertLog::new(100);
        let alerts: Vec<Alert> = (0..150).map(|i| alert(i as f64, Priority::Warning)).collect();
        let expected: Vec<Uuid> = alerts[50..].iter().map(|a| a.id).collect();
        for a in alerts {
            log.extend([a]);
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().map(|a| a.id).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_acknowledge_unknown_id() {
        let mut log = AlertLog::new(10);
        log.extend([alert(130.0, Priority::Urgent)]);
        let before = log.to_vec();
        assert!(log.acknowledge(Uuid::new_v4(), OffsetDateTime::now_utc()).is_none());
        assert_eq!(log.to_vec(), before);
    }

    #[test]
    fn test_unacknowledged_ordering() {
        let mut log = AlertLog::new(10);
        let info = alert(95.0, Priority::Informational);
        let warn_old = alert(105.0, Priority::Warning);
        let urgent = alert(130.0, Priority::Urgent);
        let warn_new = alert(110.0, Priority::Warning);
        let acked = alert(140.0, Priority::Urgent);
        let acked_id = acked.id;
        log.extend([
            info.clone(),
            warn_old.clone(),
            urgent.clone(),
            warn_new.clone(),
            acked,
        ]);
        assert!(log.acknowledge(acked_id, OffsetDateTime::now_utc()).is_some());

        let ids: Vec<Uuid> = log.unacknowledged(10).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![urgent.id, warn_new.id, warn_old.id, info.id]);
        assert_eq!(log.unacknowledged(2).len(), 2);
    }

    #[test]
    fn test_message_format() {
        let a = alert(130.0, Priority::Urgent);
        assert_eq!(a.message, "Any: 130.0 bpm");
    }
}
