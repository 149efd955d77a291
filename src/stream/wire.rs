//! Frame encodings for the viewer stream.
//!
//! `nested` keeps failures explicit:
//!
//! ```json
//! {"timestamp":"2025-01-01T12:00:00.000Z",
//!  "measurements":{"A":{"latency_ms":10,"failed":false},
//!                  "B":{"latency_ms":null,"failed":true}}}
//! ```
//!
//! `flat` is what older viewers expect, one `<id>_latency` field per
//! target with `-1` for a failed probe:
//!
//! ```json
//! {"timestamp":"2025-01-01T12:00:00.000Z","A_latency":10,"B_latency":-1}
//! ```

use chrono::SecondsFormat;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::sampling::{Latency, Sample};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Nested,
    Flat,
}

/// Encode one sample as a single JSON text frame.
pub fn encode(sample: &Sample, format: WireFormat) -> serde_json::Result<String> {
    match format {
        WireFormat::Nested => serde_json::to_string(sample),
        WireFormat::Flat => serde_json::to_string(&FlatFrame(sample)),
    }
}

fn timestamp(sample: &Sample) -> String {
    sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ─── Nested (default) ────────────────────────────────────────────

impl Serialize for Latency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("latency_ms", &self.as_millis())?;
        map.serialize_entry("failed", &self.is_failed())?;
        map.end()
    }
}

/// Measurements in configuration order, keyed by target id.
struct Measurements<'a>(&'a Sample);

impl Serialize for Measurements<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.measurements.len()))?;
        for m in &self.0.measurements {
            map.serialize_entry(&m.target, &m.latency)?;
        }
        map.end()
    }
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("timestamp", &timestamp(self))?;
        map.serialize_entry("measurements", &Measurements(self))?;
        map.end()
    }
}

// ─── Flat (legacy) ───────────────────────────────────────────────

struct FlatFrame<'a>(&'a Sample);

impl Serialize for FlatFrame<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sample = self.0;
        let mut map = serializer.serialize_map(Some(sample.measurements.len() + 1))?;
        map.serialize_entry("timestamp", &timestamp(sample))?;
        for m in &sample.measurements {
            // -1 exists only at this boundary
            let value: i64 = match m.latency {
                Latency::Millis(ms) => i64::try_from(ms).unwrap_or(i64::MAX),
                Latency::Failed => -1,
            };
            map.serialize_entry(&format!("{}_latency", m.target), &value)?;
        }
        map.end()
    }
}
