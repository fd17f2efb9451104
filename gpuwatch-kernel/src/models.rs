use gpuwatch_core::HostTelemetry;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A monitored host, as listed in the aggregator config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub alias: String,
}

impl HostConfig {
    pub fn gpu_info_url(&self) -> String {
        // bare IPv6 literals need brackets in a URL
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}/gpu-info", self.host, self.port)
        } else {
            format!("http://{}:{}/gpu-info", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Unknown,
    Online,
    Offline,
}

/// Registry record for one host. Built only through the constructors below so
/// that `data` is present iff online and `error` iff offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStatus {
    #[serde(flatten)]
    config: HostConfig,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_update: Option<OffsetDateTime>,
    status: Liveness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<HostTelemetry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HostStatus {
    /// Initial record, before the first poll
    pub fn unknown(config: HostConfig) -> Self {
        Self {
            config,
            last_update: None,
            status: Liveness::Unknown,
            data: None,
            error: None,
        }
    }

    pub fn online(config: HostConfig, data: HostTelemetry) -> Self {
        Self {
            config,
            last_update: Some(OffsetDateTime::now_utc()),
            status: Liveness::Online,
            data: Some(data),
            error: None,
        }
    }

    pub fn offline(config: HostConfig, error: impl Into<String>) -> Self {
        Self {
            config,
            last_update: Some(OffsetDateTime::now_utc()),
            status: Liveness::Offline,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn status(&self) -> Liveness {
        self.status
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.last_update
    }

    pub fn data(&self) -> Option<&HostTelemetry> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
