//! Static + live metric merge.
//!
//! Live values win on key collision and take the static key's position; keys
//! only present in the live payload are appended in arrival order. Numeric
//! live values may be annotated with a unit taken from a declarative rule
//! table keyed by node type, optional topic suffix and metric name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::{HierarchyNode, MetricMap, NodeType};

/// Overlay `live` on top of `base`.
pub fn merge_metrics(base: Option<&MetricMap>, live: Option<&MetricMap>) -> MetricMap {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(live) = live {
        for (key, value) in live {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// One unit annotation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRule {
    pub node_type: NodeType,
    /// Restrict to nodes whose topic ends with this segment.
    #[serde(default)]
    pub topic_suffix: Option<String>,
    /// Metric name, matched case-insensitively.
    pub metric: String,
    pub unit: String,
}

impl UnitRule {
    pub fn new(node_type: NodeType, metric: &str, unit: &str) -> Self {
        Self {
            node_type,
            topic_suffix: None,
            metric: metric.to_string(),
            unit: unit.to_string(),
        }
    }

    #[must_use]
    pub fn for_topic_suffix(mut self, suffix: &str) -> Self {
        self.topic_suffix = Some(suffix.to_string());
        self
    }

    fn matches(&self, node: &HierarchyNode, metric: &str) -> bool {
        if self.node_type != node.node_type || !self.metric.eq_ignore_ascii_case(metric) {
            return false;
        }
        match &self.topic_suffix {
            Some(suffix) => node
                .topic_suffix()
                .is_some_and(|s| s.eq_ignore_ascii_case(suffix)),
            None => true,
        }
    }
}

/// Ordered rule table. Suffix-scoped rules are consulted before generic ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTable {
    rules: Vec<UnitRule>,
}

impl UnitTable {
    pub fn new(rules: Vec<UnitRule>) -> Self {
        Self { rules }
    }

    /// Built-in sensor units.
    pub fn builtin() -> Self {
        Self::new(vec![
            UnitRule::new(NodeType::Sensor, "value", "°C").for_topic_suffix("TEMPERATURE"),
            UnitRule::new(NodeType::Sensor, "value", "%").for_topic_suffix("HUMIDITY"),
            UnitRule::new(NodeType::Sensor, "value", "ppm").for_topic_suffix("CO2"),
            UnitRule::new(NodeType::Sensor, "value", "A").for_topic_suffix("CURRENT"),
            UnitRule::new(NodeType::Sensor, "temperature", "°C"),
            UnitRule::new(NodeType::Sensor, "temp", "°C"),
            UnitRule::new(NodeType::Sensor, "humidity", "%"),
            UnitRule::new(NodeType::Sensor, "co2", "ppm"),
            UnitRule::new(NodeType::Sensor, "current", "A"),
        ])
    }

    pub fn rules(&self) -> &[UnitRule] {
        &self.rules
    }

    /// Unit for `metric` on `node`, if any rule applies.
    pub fn unit_for(&self, node: &HierarchyNode, metric: &str) -> Option<&str> {
        let scoped = self
            .rules
            .iter()
            .filter(|r| r.topic_suffix.is_some())
            .find(|r| r.matches(node, metric));
        scoped
            .or_else(|| {
                self.rules
                    .iter()
                    .filter(|r| r.topic_suffix.is_none())
                    .find(|r| r.matches(node, metric))
            })
            .map(|r| r.unit.as_str())
    }

    /// Annotate a single value. Only numbers are annotated.
    pub fn annotate(&self, node: &HierarchyNode, metric: &str, value: &Value) -> Value {
        match (value, self.unit_for(node, metric)) {
            (Value::Number(n), Some(unit)) => Value::String(format!("{n}{unit}")),
            _ => value.clone(),
        }
    }
}

/// Display mapping for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedMetrics {
    pub values: MetricMap,
    /// Keys whose value came from the live payload.
    pub live_keys: Vec<String>,
}

impl MergedMetrics {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_live(&self, key: &str) -> bool {
        self.live_keys.iter().any(|k| k == key)
    }
}

/// Merge a node's static metrics with its live payload, annotating live
/// numeric values with units.
pub fn merge_for_node(
    node: &HierarchyNode,
    live: Option<&MetricMap>,
    units: &UnitTable,
) -> MergedMetrics {
    let annotated = live.map(|payload| {
        payload
            .iter()
            .map(|(k, v)| (k.clone(), units.annotate(node, k, v)))
            .collect::<MetricMap>()
    });
    let values = merge_metrics(node.static_metrics(), annotated.as_ref());
    let live_keys = live
        .map(|payload| payload.keys().cloned().collect())
        .unwrap_or_default();
    MergedMetrics { values, live_keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDetails;
    use serde_json::json;

    fn map(value: Value) -> MetricMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_live_overrides_static() {
        let base = map(json!({"A": 1, "B": 2}));
        let live = map(json!({"B": 3, "C": 4}));
        let merged = merge_metrics(Some(&base), Some(&live));
        assert_eq!(Value::Object(merged.clone()), json!({"A": 1, "B": 3, "C": 4}));
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_merge_without_live_or_static() {
        let base = map(json!({"A": 1}));
        assert_eq!(merge_metrics(Some(&base), None), base);
        let live = map(json!({"X": "y"}));
        assert_eq!(merge_metrics(None, Some(&live)), live);
        assert!(merge_metrics(None, None).is_empty());
    }

    #[test]
    fn test_unit_annotation_for_sensor() {
        let node = HierarchyNode::new("s1", "Temperature Sensors", NodeType::Sensor)
            .with_topic("EcoTech/London/LDN-A12/TEMPERATURE");
        let units = UnitTable::builtin();
        assert_eq!(units.annotate(&node, "Temp", &json!(21)), json!("21°C"));
        assert_eq!(units.annotate(&node, "value", &json!(21.5)), json!("21.5°C"));
        assert_eq!(units.annotate(&node, "humidity", &json!(40)), json!("40%"));
        // strings and unknown metrics are untouched
        assert_eq!(units.annotate(&node, "temp", &json!("warm")), json!("warm"));
        assert_eq!(units.annotate(&node, "pressure", &json!(1013)), json!(1013));
    }

    #[test]
    fn test_topic_suffix_rule_is_scoped() {
        let humidity = HierarchyNode::new("s2", "Humidity", NodeType::Sensor)
            .with_topic("EcoTech/London/LDN-A12/HUMIDITY");
        let units = UnitTable::builtin();
        assert_eq!(units.unit_for(&humidity, "value"), Some("%"));

        let untagged = HierarchyNode::new("s3", "Misc", NodeType::Sensor);
        assert_eq!(units.unit_for(&untagged, "value"), None);
    }

    #[test]
    fn test_non_sensor_nodes_are_not_annotated() {
        let building = HierarchyNode::new("b1", "LDN-A12", NodeType::Building);
        let units = UnitTable::builtin();
        assert_eq!(units.annotate(&building, "temp", &json!(20)), json!(20));
    }

    #[test]
    fn test_merge_for_node_tracks_live_keys() {
        let node = HierarchyNode::new("s1", "Temperature Sensors", NodeType::Sensor)
            .with_topic("A/B/TEMPERATURE")
            .with_details(NodeDetails {
                metrics: map(json!({"Average Temp": "22.3°C", "temp": "n/a"})),
                ..Default::default()
            });
        let live = map(json!({"temp": 21, "battery": "ok"}));
        let merged = merge_for_node(&node, Some(&live), &UnitTable::builtin());

        assert_eq!(
            Value::Object(merged.values.clone()),
            json!({"Average Temp": "22.3°C", "temp": "21°C", "battery": "ok"})
        );
        assert!(merged.is_live("temp"));
        assert!(merged.is_live("battery"));
        assert!(!merged.is_live("Average Temp"));
    }
}
