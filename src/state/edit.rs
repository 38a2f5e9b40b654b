/// Non-destructive edit operations
///
/// Every adjustment made in a control panel is recorded as an `EditOperation`.
/// The operations are kept in an append-only `EditingHistory`, in the order
/// they were applied, and are serialized to JSON as part of saved assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Operation kind for color slider changes
pub const COLOR_ADJUSTMENT: &str = "color-adjustment";
/// Operation kind for rotate/flip
pub const TRANSFORM: &str = "transform";
/// Operation kind for export option changes
pub const EXPORT_CONFIG: &str = "export-config";

/// Rotate/flip transforms offered by the transform panel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    RotateClockwise,
    FlipHorizontal,
    FlipVertical,
}

impl Transform {
    pub fn as_str(self) -> &'static str {
        match self {
            Transform::RotateClockwise => "rotate-clockwise",
            Transform::FlipHorizontal => "flip-horizontal",
            Transform::FlipVertical => "flip-vertical",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "rotate-clockwise" => Some(Transform::RotateClockwise),
            "flip-horizontal" => Some(Transform::FlipHorizontal),
            "flip-vertical" => Some(Transform::FlipVertical),
            _ => None,
        }
    }
}

/// A single recorded adjustment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditOperation {
    /// Kind of adjustment (e.g. "color-adjustment")
    #[serde(rename = "type")]
    pub kind: String,
    /// Named parameter values, e.g. `{"brightness": 20}`
    pub parameters: BTreeMap<String, Value>,
    /// When the adjustment was made
    pub timestamp: DateTime<Utc>,
}

impl EditOperation {
    pub fn new(kind: impl Into<String>, parameters: BTreeMap<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            parameters,
            timestamp: Utc::now(),
        }
    }

    /// A color slider moved to `value` (brightness, contrast, saturation, blur)
    pub fn color_adjustment(name: &str, value: i32) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(name.to_string(), Value::from(value));
        Self::new(COLOR_ADJUSTMENT, parameters)
    }

    pub fn transform(transform: Transform) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("operation".to_string(), Value::from(transform.as_str()));
        Self::new(TRANSFORM, parameters)
    }

    /// An export option changed
    pub fn export_config(name: &str, value: impl Into<Value>) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(name.to_string(), value.into());
        Self::new(EXPORT_CONFIG, parameters)
    }

    /// Override the timestamp (history replay, tests)
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The transform carried by a `transform` operation
    pub fn as_transform(&self) -> Option<Transform> {
        if self.kind != TRANSFORM {
            return None;
        }
        self.parameters
            .get("operation")
            .and_then(Value::as_str)
            .and_then(Transform::parse)
    }
}

/// Ordered, append-only list of operations for one editing session
///
/// Insertion order is significant and duplicates are kept. The history is only
/// ever appended to or cleared wholesale.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct EditingHistory {
    operations: Vec<EditOperation>,
}

impl EditingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: EditOperation) {
        self.operations.push(operation);
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn first(&self) -> Option<&EditOperation> {
        self.operations.first()
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    /// Owned copy, detached from later mutation of this history
    pub fn snapshot(&self) -> Vec<EditOperation> {
        self.operations.clone()
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let history = EditingHistory::default();
        assert!(history.is_empty());
        assert_eq!(history.first(), None);
    }

    #[test]
    fn test_insertion_order_and_duplicates() {
        let mut history = EditingHistory::new();
        history.push(EditOperation::color_adjustment("brightness", 10));
        history.push(EditOperation::transform(Transform::FlipVertical));
        history.push(EditOperation::color_adjustment("brightness", 10));

        let kinds: Vec<&str> = history.operations().iter().map(|op| op.kind.as_str()).collect();
        assert_eq!(kinds, [COLOR_ADJUSTMENT, TRANSFORM, COLOR_ADJUSTMENT]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut history = EditingHistory::new();
        history.push(EditOperation::color_adjustment("contrast", 5));

        let snapshot = history.snapshot();
        history.clear();

        assert!(history.is_empty());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_operation_json_shape() {
        let op = EditOperation::color_adjustment("blur", 3);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], COLOR_ADJUSTMENT);
        assert_eq!(json["parameters"]["blur"], 3);

        let mut history = EditingHistory::new();
        history.push(op);
        let restored = EditingHistory::from_json(&history.to_json().unwrap()).unwrap();
        assert_eq!(history, restored);
    }

    #[test]
    fn test_transform_roundtrip_through_operation() {
        let op = EditOperation::transform(Transform::RotateClockwise);
        assert_eq!(op.as_transform(), Some(Transform::RotateClockwise));
        assert_eq!(EditOperation::color_adjustment("blur", 1).as_transform(), None);
    }
}
