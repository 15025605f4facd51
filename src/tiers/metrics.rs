use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A feed cell exactly as the external sheet delivered it.
///
/// Cells stay untyped so a stored payload serializes back to what the feed sent: an
/// absent column stays absent and an explicit `null` stays `null`. Conversion to typed
/// values happens once, in [`super::normalize::normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LooseValue(Option<Value>);

static ABSENT: Value = Value::Null;

impl LooseValue {
    /// The cell's JSON value; absent cells read as `null`.
    pub fn value(&self) -> &Value {
        self.0.as_ref().unwrap_or(&ABSENT)
    }

    pub fn text(&self) -> String {
        match self.value() {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => String::new(),
        }
    }

    /// True when the column was not in the row at all.
    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }
}

impl Serialize for LooseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LooseValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self(Some(value)))
    }
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        Self(Some(Value::String(value.to_string())))
    }
}

impl From<Value> for LooseValue {
    fn from(value: Value) -> Self {
        Self(Some(value))
    }
}

/// One representative's row for the current period, as published by the branch feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetricsRow {
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub representative: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub supervisor: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub billing: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub total_sales: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub visited_points: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub planned_visits: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub pos_sales: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub remote_sales: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub effectiveness: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub efficiency: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub avg_route_duration: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub route_compliance: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub effectiveness_compliance: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub coverage: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub volume: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub pos_presence: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub display_compliance: LooseValue,
    #[serde(skip_serializing_if = "LooseValue::is_absent")]
    pub projected_tier: LooseValue,
    /// Columns the engine does not read, carried along untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMetricsRow {
    pub fn representative_name(&self) -> String {
        self.representative.text()
    }

    pub fn supervisor_name(&self) -> String {
        self.supervisor.text()
    }
}

/// Typed view of a [`RawMetricsRow`] after defensive parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub billing: f64,
    pub total_sales: u32,
    pub visited_points: u32,
    pub planned_visits: u32,
    pub pos_sales: u32,
    pub remote_sales: u32,
    pub effectiveness: f64,
    pub efficiency: f64,
    pub avg_route_seconds: u32,
    pub route_compliance: bool,
    pub effectiveness_compliance: bool,
    pub coverage: u32,
    pub volume: u32,
    pub pos_presence: f64,
    pub display_compliance: f64,
}
