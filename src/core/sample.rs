use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One timestamped reading of a channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,

    /// Source timestamp (nanoseconds on the wire, any monotonic unit works)
    pub timestamp: f64,
}

impl Sample {
    pub fn new(value: f64, timestamp: f64) -> Self {
        Self { value, timestamp }
    }
}

/// A `[value, timestamp]` pair as sent by the server.
///
/// Values may arrive as numbers, booleans or numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint(pub Value, pub f64);

impl RawPoint {
    pub fn to_sample(&self) -> Option<Sample> {
        let value = match &self.0 {
            Value::Number(n) => n.as_f64()?,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !value.is_finite() {
            return None;
        }
        Some(Sample::new(value, self.1))
    }
}

/// Converts wire points, dropping any whose value is not a finite number.
pub fn samples_from_raw(points: &[RawPoint]) -> Vec<Sample> {
    points.iter().filter_map(RawPoint::to_sample).collect()
}
