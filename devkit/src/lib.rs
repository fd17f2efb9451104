/*!
# GPUWatch DevKit - test support for the collector and the aggregator

- Captured `nvidia-smi -q -x` documents for parser tests
- Stub collector HTTP server for poller tests (no GPU required)
- Builders for telemetry records
*/

pub mod fixtures;
pub mod stub_collector;
pub mod test_utils;

pub use stub_collector::{StubCollector, StubReply};
pub use test_utils::{closed_local_port, sample_gpu, sample_host_telemetry, sample_process};
