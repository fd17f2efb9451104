/*!
Builders for telemetry records used across the GPUWatch test suites
*/

use gpuwatch_core::{GpuTelemetry, HostTelemetry, ProcessTelemetry};
use std::net::TcpListener;

const MIB: u64 = 1024 * 1024;

pub fn sample_process(pid: u32, used_mib: u64) -> ProcessTelemetry {
    ProcessTelemetry {
        pid,
        name: format!("worker-{pid}"),
        used: used_mib * MIB,
        owner: None,
    }
}

pub fn sample_gpu(id: &str, processes: Vec<ProcessTelemetry>) -> GpuTelemetry {
    let used = processes.iter().map(|p| p.used).sum();
    GpuTelemetry {
        id: id.to_string(),
        name: "NVIDIA A100-SXM4-80GB".to_string(),
        utilization: 50.0,
        memory_used: used,
        memory_total: 81_920 * MIB,
        temperature: 55,
        power_usage: 250_000,
        power_limit: 400_000,
        processes,
    }
}

/// A single-GPU snapshot stamped now
pub fn sample_host_telemetry(node_name: &str) -> HostTelemetry {
    HostTelemetry::new(
        node_name,
        vec![sample_gpu(
            "00000000:01:00.0",
            vec![sample_process(100, 2048), sample_process(101, 512)],
        )],
    )
}

/// A localhost port nothing is listening on, for connection-refused cases
pub fn closed_local_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_gpu_sums_process_memory() {
        let gpu = sample_gpu("GPU-0", vec![sample_process(1, 10), sample_process(2, 5)]);
        assert_eq!(gpu.memory_used, 15 * MIB);
        assert!(gpu.memory_used <= gpu.memory_total);
    }

    #[test]
    fn test_closed_port_refuses() {
        let port = closed_local_port().unwrap();
        assert!(std::net::TcpStream::connect(("127.0.0.1", port)).is_err());
    }
}
