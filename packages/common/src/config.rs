use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Admission, scheduling and limit settings of the evaluation engine.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Number of concurrent workers (and sandboxes). Default: 4.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Maximum number of queued submissions. Default: 64.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Per-case wall-clock timeout in milliseconds. Default: 2000.
    #[serde(default = "default_case_timeout_ms")]
    pub case_timeout_ms: u64,
    /// Per-case memory ceiling in kilobytes. Default: 262144 (256 MiB).
    #[serde(default = "default_memory_limit_kb")]
    pub memory_limit_kb: u64,
    /// Wall-clock limit of a compile step in milliseconds. Default: 10000.
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
    /// Fixed overhead added to the sum of case budgets. Default: 5000.
    #[serde(default = "default_aggregate_overhead_ms")]
    pub aggregate_overhead_ms: u64,
    /// Explicit per-submission budget; overrides the computed one when set.
    #[serde(default)]
    pub submission_timeout_ms: Option<u64>,
    /// How long cancel waits for a sandbox to be torn down. Default: 2000.
    #[serde(default = "default_teardown_timeout_ms")]
    pub teardown_timeout_ms: u64,
    /// Largest accepted source file in bytes. Default: 65536.
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
    /// Captured stdout/stderr per run, in bytes. Default: 1 MiB.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// How long terminal submissions are kept in memory. Default: 3600.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Interval between retention sweeps. Default: 60.
    #[serde(default = "default_retention_scan_interval_secs")]
    pub retention_scan_interval_secs: u64,
}

fn default_pool_size() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    64
}
fn default_case_timeout_ms() -> u64 {
    2_000
}
fn default_memory_limit_kb() -> u64 {
    262_144
}
fn default_compile_timeout_ms() -> u64 {
    10_000
}
fn default_aggregate_overhead_ms() -> u64 {
    5_000
}
fn default_teardown_timeout_ms() -> u64 {
    2_000
}
fn default_max_source_bytes() -> usize {
    64 * 1024
}
fn default_max_output_bytes() -> usize {
    1024 * 1024
}
fn default_retention_secs() -> u64 {
    3_600
}
fn default_retention_scan_interval_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_capacity: default_queue_capacity(),
            case_timeout_ms: default_case_timeout_ms(),
            memory_limit_kb: default_memory_limit_kb(),
            compile_timeout_ms: default_compile_timeout_ms(),
            aggregate_overhead_ms: default_aggregate_overhead_ms(),
            submission_timeout_ms: None,
            teardown_timeout_ms: default_teardown_timeout_ms(),
            max_source_bytes: default_max_source_bytes(),
            max_output_bytes: default_max_output_bytes(),
            retention_secs: default_retention_secs(),
            retention_scan_interval_secs: default_retention_scan_interval_secs(),
        }
    }
}

impl EngineConfig {
    pub fn case_timeout(&self) -> Duration {
        Duration::from_millis(self.case_timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn aggregate_overhead(&self) -> Duration {
        Duration::from_millis(self.aggregate_overhead_ms)
    }

    pub fn submission_timeout(&self) -> Option<Duration> {
        self.submission_timeout_ms.map(Duration::from_millis)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn retention_scan_interval(&self) -> Duration {
        Duration::from_secs(self.retention_scan_interval_secs.max(1))
    }
}

/// Which sandbox implementation executes candidate programs.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SandboxBackend {
    /// Local child processes with rlimits and Linux namespaces.
    #[default]
    Process,
    /// The `isolate` tool (namespaces + cgroups). Requires root setup.
    Isolate,
}

/// How the process backend separates runs from the host and from each other.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Every run gets private network, mount, IPC and UTS namespaces, and the
    /// scratch root is replaced by an empty tmpfs holding only the run's own
    /// directory. Needs root; runs fail when the kernel refuses the namespaces.
    #[default]
    Strict,
    /// Namespaces are applied when the kernel allows them and silently
    /// skipped otherwise. For development hosts only.
    Relaxed,
}

/// Sandbox backend settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    #[serde(default)]
    pub backend: SandboxBackend,
    /// Process backend only. Default: strict.
    #[serde(default)]
    pub isolation: Isolation,
    /// Parent directory for per-run scratch directories. Default: system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Isolate executable path. Default: "isolate".
    #[serde(default = "default_isolate_bin")]
    pub isolate_bin: String,
    /// First isolate box id; the engine uses `pool_size` consecutive ids. Default: 0.
    #[serde(default)]
    pub box_id_base: u32,
    /// Grace period for killing a process group. Default: 500.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Peak memory sampling interval of the process backend. Default: 10.
    #[serde(default = "default_memory_sample_interval_ms")]
    pub memory_sample_interval_ms: u64,
}

fn default_isolate_bin() -> String {
    "isolate".into()
}
fn default_kill_grace_ms() -> u64 {
    500
}
fn default_memory_sample_interval_ms() -> u64 {
    10
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            backend: SandboxBackend::default(),
            isolation: Isolation::default(),
            work_dir: None,
            isolate_bin: default_isolate_bin(),
            box_id_base: 0,
            kill_grace_ms: default_kill_grace_ms(),
            memory_sample_interval_ms: default_memory_sample_interval_ms(),
        }
    }
}

impl SandboxConfig {
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn memory_sample_interval(&self) -> Duration {
        Duration::from_millis(self.memory_sample_interval_ms.max(1))
    }
}
