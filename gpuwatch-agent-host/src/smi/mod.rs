//! nvidia-smi XML parsing for GPUWatch collectors
//!
//! Turns the output of `nvidia-smi -q -x` into normalized [`GpuTelemetry`]:
//! - one record per `<gpu>` node, in the order the tool enumerates them
//! - magnitudes converted through [`units`] (bytes, milliwatts, percent, C)
//! - power read from `<gpu_power_readings>` (R530+ drivers) or the older
//!   `<power_readings>` block
//!
//! Only a structurally broken document is an error; bad leaf values are zeroed.

pub mod units;

use gpuwatch_core::{GpuTelemetry, ProcessTelemetry};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SmiParseError {
    #[error("nvidia-smi produced no output")]
    Empty,
    #[error("malformed nvidia-smi XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("malformed nvidia-smi XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("expected <nvidia_smi_log>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("nvidia-smi output has no root element")]
    NoRoot,
}

const ROOT_ELEMENT: &str = "nvidia_smi_log";

/// Root `<nvidia_smi_log>` element
#[derive(Debug, Deserialize)]
struct SmiLog {
    #[serde(default, rename = "gpu")]
    gpus: Vec<SmiGpu>,
}

#[derive(Debug, Deserialize)]
struct SmiGpu {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    fb_memory_usage: SmiMemory,
    #[serde(default)]
    utilization: SmiUtilization,
    #[serde(default)]
    temperature: SmiTemperature,
    #[serde(default)]
    gpu_power_readings: Option<SmiPower>,
    #[serde(default)]
    power_readings: Option<SmiPower>,
    #[serde(default)]
    processes: SmiProcesses,
}

#[derive(Debug, Default, Deserialize)]
struct SmiMemory {
    #[serde(default)]
    total: String,
    #[serde(default)]
    used: String,
}

#[derive(Debug, Default, Deserialize)]
struct SmiUtilization {
    #[serde(default)]
    gpu_util: String,
}

#[derive(Debug, Default, Deserialize)]
struct SmiTemperature {
    #[serde(default)]
    gpu_temp: String,
}

/// Union of the old and new power blocks, only the fields we read
#[derive(Debug, Default, Deserialize)]
struct SmiPower {
    instant_power_draw: Option<String>,
    average_power_draw: Option<String>,
    power_draw: Option<String>,
    current_power_limit: Option<String>,
    enforced_power_limit: Option<String>,
    power_limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SmiProcesses {
    #[serde(default)]
    process_info: Vec<SmiProcess>,
}

#[derive(Debug, Deserialize)]
struct SmiProcess {
    #[serde(default)]
    pid: String,
    #[serde(default)]
    process_name: String,
    #[serde(default)]
    used_memory: String,
}

impl SmiPower {
    /// First field holding an actual reading; `N/A` falls through to the next.
    fn first_reading<'a>(fields: [&'a Option<String>; 3]) -> Option<&'a str> {
        fields
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|v| units::power_reading(v).is_some())
    }

    fn draw(&self) -> Option<&str> {
        Self::first_reading([
            &self.instant_power_draw,
            &self.average_power_draw,
            &self.power_draw,
        ])
    }

    fn limit(&self) -> Option<&str> {
        Self::first_reading([
            &self.current_power_limit,
            &self.enforced_power_limit,
            &self.power_limit,
        ])
    }
}

impl SmiGpu {
    fn into_telemetry(self) -> GpuTelemetry {
        let memory_total = units::memory_bytes(&self.fb_memory_usage.total);
        let mut memory_used = units::memory_bytes(&self.fb_memory_usage.used);
        if memory_total > 0 {
            memory_used = memory_used.min(memory_total);
        }

        // newer block first, fall back field by field
        let blocks = [self.gpu_power_readings.as_ref(), self.power_readings.as_ref()];
        let draw = blocks.iter().flatten().find_map(|p| p.draw()).unwrap_or_default();
        let limit = blocks.iter().flatten().find_map(|p| p.limit()).unwrap_or_default();

        let processes = self
            .processes
            .process_info
            .into_iter()
            .map(|p| ProcessTelemetry {
                pid: p.pid.trim().parse().unwrap_or(0),
                name: p.process_name,
                used: units::memory_bytes(&p.used_memory),
                owner: None,
            })
            .collect();

        GpuTelemetry {
            id: self.id,
            name: self.product_name.trim().to_string(),
            utilization: units::percent(&self.utilization.gpu_util),
            memory_used,
            memory_total,
            temperature: units::celsius(&self.temperature.gpu_temp),
            power_usage: units::power_milliwatts(draw),
            power_limit: units::power_milliwatts(limit),
            processes,
        }
    }
}

/// Parses a full `nvidia-smi -q -x` document.
pub fn parse_smi_xml(xml: &str) -> Result<Vec<GpuTelemetry>, SmiParseError> {
    if xml.trim().is_empty() {
        return Err(SmiParseError::Empty);
    }

    let root = root_element(xml)?;
    if root != ROOT_ELEMENT {
        return Err(SmiParseError::UnexpectedRoot(root));
    }

    let log: SmiLog = quick_xml::de::from_str(xml)?;
    debug!("nvidia-smi reported {} GPU(s)", log.gpus.len());

    Ok(log.gpus.into_iter().map(SmiGpu::into_telemetry).collect())
}

/// Name of the first element, skipping the prolog and DOCTYPE. The serde
/// deserializer ignores the root name, so an HTML error page would otherwise
/// read as a host with no GPUs.
fn root_element(xml: &str) -> Result<String, SmiParseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Event::Eof => return Err(SmiParseError::NoRoot),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpuwatch_devkit::fixtures;

    #[test]
    fn test_parse_two_gpus_in_enumeration_order() {
        let gpus = parse_smi_xml(fixtures::SMI_TWO_GPUS).unwrap();
        assert_eq!(gpus.len(), 2);

        // bus ids are deliberately out of lexical order in the fixture
        assert_eq!(gpus[0].id, "00000000:81:00.0");
        assert_eq!(gpus[1].id, "00000000:01:00.0");

        let first = &gpus[0];
        assert_eq!(first.name, "NVIDIA A100-SXM4-80GB");
        assert_eq!(first.utilization, 87.0);
        assert_eq!(first.memory_total, 81_920 * 1024 * 1024);
        assert_eq!(first.memory_used, 40_960 * 1024 * 1024);
        assert_eq!(first.temperature, 61);
        assert_eq!(first.power_usage, 312_450);
        assert_eq!(first.power_limit, 400_000);
    }

    #[test]
    fn test_processes_keep_report_order() {
        let gpus = parse_smi_xml(fixtures::SMI_TWO_GPUS).unwrap();
        let procs = &gpus[0].processes;
        let pids: Vec<u32> = procs.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![4101, 4102, 4103]);
        assert_eq!(procs[1].name, "/usr/bin/python3");
        assert_eq!(procs[1].used, 3000 * 1024 * 1024);
        assert!(procs.iter().all(|p| p.owner.is_none()));

        assert!(gpus[1].processes.is_empty());
    }

    #[test]
    fn test_malformed_leaves_become_zero() {
        let gpus = parse_smi_xml(fixtures::SMI_BAD_FIELDS).unwrap();
        assert_eq!(gpus.len(), 1);
        let gpu = &gpus[0];
        assert_eq!(gpu.utilization, 0.0);
        assert_eq!(gpu.temperature, 0);
        assert_eq!(gpu.power_usage, 0);
        assert_eq!(gpu.memory_total, 0);
        assert_eq!(gpu.processes[0].pid, 0);
        assert_eq!(gpu.processes[0].used, 0);
    }

    #[test]
    fn test_legacy_power_block() {
        let gpus = parse_smi_xml(fixtures::SMI_LEGACY_POWER).unwrap();
        assert_eq!(gpus[0].power_usage, 68_120);
        assert_eq!(gpus[0].power_limit, 250_000);
    }

    #[test]
    fn test_used_never_exceeds_total() {
        let gpus = parse_smi_xml(fixtures::SMI_LEGACY_POWER).unwrap();
        assert_eq!(gpus[0].memory_total, 11_264 * 1024 * 1024);
        assert_eq!(gpus[0].memory_used, gpus[0].memory_total);
    }

    #[test]
    fn test_zero_devices_is_empty() {
        let gpus = parse_smi_xml(fixtures::SMI_NO_GPUS).unwrap();
        assert!(gpus.is_empty());
    }

    #[test]
    fn test_na_power_falls_through_to_next_field() {
        let xml = r#"<nvidia_smi_log><gpu id="a"><gpu_power_readings>
            <instant_power_draw>N/A</instant_power_draw>
            <average_power_draw>100.00 W</average_power_draw>
            <current_power_limit>[Not Supported]</current_power_limit>
            <enforced_power_limit>300.00 W</enforced_power_limit>
        </gpu_power_readings></gpu></nvidia_smi_log>"#;

        let gpus = parse_smi_xml(xml).unwrap();
        assert_eq!(gpus[0].power_usage, 100_000);
        assert_eq!(gpus[0].power_limit, 300_000);
    }

    #[test]
    fn test_na_power_block_falls_back_to_legacy_block() {
        let xml = r#"<nvidia_smi_log><gpu id="a">
            <gpu_power_readings>
                <instant_power_draw>N/A</instant_power_draw>
                <average_power_draw>N/A</average_power_draw>
                <current_power_limit>N/A</current_power_limit>
            </gpu_power_readings>
            <power_readings>
                <power_draw>55.50 W</power_draw>
                <power_limit>150.00 W</power_limit>
            </power_readings>
        </gpu></nvidia_smi_log>"#;

        let gpus = parse_smi_xml(xml).unwrap();
        assert_eq!(gpus[0].power_usage, 55_500);
        assert_eq!(gpus[0].power_limit, 150_000);
    }

    #[test]
    fn test_real_zero_draw_is_kept() {
        let xml = r#"<nvidia_smi_log><gpu id="a"><gpu_power_readings>
            <instant_power_draw>0.00 W</instant_power_draw>
            <average_power_draw>90.00 W</average_power_draw>
        </gpu_power_readings></gpu></nvidia_smi_log>"#;

        assert_eq!(parse_smi_xml(xml).unwrap()[0].power_usage, 0);
    }

    #[test]
    fn test_foreign_root_is_an_error() {
        assert!(matches!(
            parse_smi_xml("<html><body>oops</body></html>"),
            Err(SmiParseError::UnexpectedRoot(root)) if root == "html"
        ));
        assert!(matches!(
            parse_smi_xml("<?xml version=\"1.0\" ?>\n"),
            Err(SmiParseError::NoRoot)
        ));
    }

    #[test]
    fn test_broken_document_is_an_error() {
        assert!(matches!(parse_smi_xml(""), Err(SmiParseError::Empty)));
        assert!(matches!(
            parse_smi_xml(fixtures::SMI_TRUNCATED),
            Err(SmiParseError::Xml(_))
        ));
    }
}
