use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A process holding GPU memory on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTelemetry {
    pub pid: u32,
    pub name: String,
    /// Bytes of framebuffer memory held by the process
    pub used: u64,
    /// Resolved user name, only present when the collector enriches processes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Normalized readings for a single GPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuTelemetry {
    pub id: String,
    pub name: String,
    /// Percent, 0-100
    pub utilization: f64,
    /// Bytes
    pub memory_used: u64,
    /// Bytes
    pub memory_total: u64,
    /// Degrees Celsius
    pub temperature: u32,
    /// Milliwatts
    pub power_usage: u64,
    /// Milliwatts
    pub power_limit: u64,
    #[serde(default)]
    pub processes: Vec<ProcessTelemetry>,
}

/// One snapshot of every GPU on a host, as served by `/gpu-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTelemetry {
    pub node_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub gpus: Vec<GpuTelemetry>,
}

impl HostTelemetry {
    pub fn new(node_name: impl Into<String>, gpus: Vec<GpuTelemetry>) -> Self {
        Self {
            node_name: node_name.into(),
            timestamp: OffsetDateTime::now_utc(),
            gpus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_wire_format_field_names() {
        let snapshot = HostTelemetry {
            node_name: "gpu-01".into(),
            timestamp: datetime!(2024-05-01 12:00:00 UTC),
            gpus: vec![GpuTelemetry {
                id: "00000000:01:00.0".into(),
                name: "NVIDIA A100".into(),
                utilization: 42.0,
                memory_used: 1024,
                memory_total: 4096,
                temperature: 55,
                power_usage: 250_000,
                power_limit: 400_000,
                processes: vec![ProcessTelemetry {
                    pid: 1234,
                    name: "python".into(),
                    used: 512,
                    owner: None,
                }],
            }],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["node_name"], "gpu-01");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["gpus"][0]["power_usage"], 250_000);
        assert_eq!(json["gpus"][0]["processes"][0]["used"], 512);
        // owner is omitted entirely when not resolved
        assert!(json["gpus"][0]["processes"][0].get("owner").is_none());
    }

    #[test]
    fn test_decode_payload_with_offset_timestamp() {
        let payload = r#"{
            "node_name": "gpu-02",
            "timestamp": "2024-05-01T14:00:00.123456789+02:00",
            "gpus": [{
                "id": "GPU-0", "name": "RTX 4090", "utilization": 3.5,
                "memory_used": 0, "memory_total": 25757220864,
                "temperature": 40, "power_usage": 21000, "power_limit": 450000
            }]
        }"#;
        let decoded: HostTelemetry = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded.timestamp, datetime!(2024-05-01 12:00:00.123456789 UTC));
        assert_eq!(decoded.gpus[0].memory_total, 25_757_220_864);
        // missing process list decodes as empty
        assert!(decoded.gpus[0].processes.is_empty());
    }
}
