//! Chart data envelope
//!
//! This module defines the wire payload exchanged with the chart server
//! (`ServerData`) and the structural predicates that gate untrusted JSON
//! before it reaches the rest of the controller.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartisanError, Result};

/// Free-form per-chart or per-dataset options
pub type ExtraData = Map<String, Value>;

/// Chart level data (labels plus backend specific extras)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChartData {
    /// Stores the chart labels
    pub labels: Vec<String>,

    /// Stores the chart extra options
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extra: ExtraData,
}

// Servers send `"extra": null` when no extras were set
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<ExtraData, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ExtraData>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A single dataset value. Servers send numbers, but category charts
/// sometimes send strings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum DatasetValue {
    Number(f64),
    Text(String),
}

impl DatasetValue {
    /// Numeric view of the value, parsing text when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatasetValue::Number(n) => Some(*n),
            DatasetValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for DatasetValue {
    fn from(value: f64) -> Self {
        DatasetValue::Number(value)
    }
}

impl From<&str> for DatasetValue {
    fn from(value: &str) -> Self {
        DatasetValue::Text(value.to_string())
    }
}

/// One series of the chart
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DatasetData {
    /// Optional dataset identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Stores the dataset name
    pub name: String,

    /// Stores the dataset values
    pub values: Vec<DatasetValue>,

    /// Stores the dataset extra options
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extra: ExtraData,
}

impl DatasetData {
    pub fn new(name: impl Into<String>, values: Vec<DatasetValue>) -> Self {
        Self {
            id: None,
            name: name.into(),
            values,
            extra: ExtraData::new(),
        }
    }
}

/// Root transfer object
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServerData {
    /// Stores the chart data
    pub chart: ChartData,

    /// Stores the datasets
    pub datasets: Vec<DatasetData>,
}

impl ServerData {
    /// Validate an untyped payload and convert it into the typed envelope
    pub fn from_value(value: Value) -> Result<Self> {
        if !is_server_data(&value) {
            return Err(ChartisanError::InvalidData(
                "payload does not match the chart envelope".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back into the wire shape
    pub fn to_value(&self) -> Value {
        // Every field is plain data, serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Determines if the given value satisfies `ChartData`
pub fn is_chart_data(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let labels_ok = obj
        .get("labels")
        .and_then(Value::as_array)
        .is_some_and(|labels| labels.iter().all(Value::is_string));
    labels_ok && extra_ok(obj)
}

/// Determines if the given value satisfies `DatasetData`
pub fn is_dataset_data(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let name_ok = obj.get("name").is_some_and(Value::is_string);
    let values_ok = obj
        .get("values")
        .and_then(Value::as_array)
        .is_some_and(|values| values.iter().all(|v| v.is_number() || v.is_string()));
    let id_ok = match obj.get("id") {
        None | Some(Value::Null) => true,
        Some(id) => id.is_u64(),
    };
    name_ok && values_ok && id_ok && extra_ok(obj)
}

/// Determines if the given value satisfies `ServerData`
pub fn is_server_data(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let (Some(chart), Some(datasets)) = (obj.get("chart"), obj.get("datasets")) else {
        return false;
    };
    is_chart_data(chart)
        && datasets
            .as_array()
            .is_some_and(|datasets| datasets.iter().all(is_dataset_data))
}

// `extra` is optional on the wire but must be an object when present
fn extra_ok(obj: &Map<String, Value>) -> bool {
    match obj.get("extra") {
        None | Some(Value::Null) => true,
        Some(extra) => extra.is_object(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "chart": { "labels": ["first", "second"], "extra": {} },
            "datasets": [
                { "id": 1, "name": "Sample", "values": [1, 2.5], "extra": { "type": "bar" } },
                { "name": "Other", "values": ["3", 4] }
            ]
        })
    }

    #[test]
    fn test_valid_envelope() {
        assert!(is_server_data(&sample()));
    }

    #[test]
    fn test_empty_datasets_are_valid() {
        let value = json!({ "chart": { "labels": [] }, "datasets": [] });
        assert!(is_server_data(&value));
    }

    #[test]
    fn test_missing_top_level_keys() {
        assert!(!is_server_data(&json!({ "chart": { "labels": [] } })));
        assert!(!is_server_data(&json!({ "datasets": [] })));
        assert!(!is_server_data(&json!({})));
        assert!(!is_server_data(&json!(null)));
        assert!(!is_server_data(&json!([1, 2, 3])));
    }

    #[test]
    fn test_chart_data_requires_labels() {
        assert!(is_chart_data(&json!({ "labels": ["a"] })));
        assert!(!is_chart_data(&json!({ "extra": {} })));
        assert!(!is_chart_data(&json!({ "labels": [1, 2] })));
        assert!(!is_chart_data(&json!({ "labels": [], "extra": 3 })));
    }

    #[test]
    fn test_dataset_data_requires_name_and_values() {
        assert!(is_dataset_data(&json!({ "name": "a", "values": [] })));
        assert!(!is_dataset_data(&json!({ "name": "a" })));
        assert!(!is_dataset_data(&json!({ "values": [1] })));
        assert!(!is_dataset_data(&json!({ "name": "a", "values": [true] })));
        assert!(!is_dataset_data(&json!({ "id": -1, "name": "a", "values": [] })));
    }

    #[test]
    fn test_one_bad_dataset_rejects_envelope() {
        let mut value = sample();
        value["datasets"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "name": "broken" }));
        assert!(!is_server_data(&value));
    }

    #[test]
    fn test_from_value_typed() {
        let data = ServerData::from_value(sample()).unwrap();
        assert_eq!(data.chart.labels, vec!["first", "second"]);
        assert_eq!(data.datasets[0].id, Some(1));
        assert_eq!(data.datasets[0].extra["type"], json!("bar"));
        assert_eq!(data.datasets[1].values[0], DatasetValue::Text("3".into()));
        assert_eq!(data.datasets[1].values[0].as_f64(), Some(3.0));
        assert!(data.datasets[1].extra.is_empty());
    }

    #[test]
    fn test_from_value_rejects_invalid() {
        let err = ServerData::from_value(json!({ "chart": {} })).unwrap_err();
        assert!(matches!(err, ChartisanError::InvalidData(_)));
    }

    #[test]
    fn test_null_extra_is_empty() {
        let value = json!({
            "chart": { "labels": ["a"], "extra": null },
            "datasets": [{ "id": null, "name": "Sales", "values": [1], "extra": null }]
        });
        assert!(is_server_data(&value));

        let data = ServerData::from_value(value).unwrap();
        assert!(data.chart.extra.is_empty());
        assert!(data.datasets[0].extra.is_empty());
        assert_eq!(data.datasets[0].id, None);
    }
}
