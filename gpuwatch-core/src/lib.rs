//! GPUWatch core - telemetry types shared between the collector and the aggregator
//!
//! The collector (`gpuwatch-agent-host`) produces these records from
//! `nvidia-smi` output and serves them as JSON on `/gpu-info`; the aggregator
//! (`gpuwatch-kernel`) decodes the same JSON when polling.

pub mod telemetry;

pub use telemetry::{GpuTelemetry, HostTelemetry, ProcessTelemetry};
