use super::error::SandboxError;
use super::{ExecutionLimits, ExecutionPhase, RawExecution, SandboxRunner, truncate_output};
use crate::language::{LanguageSpec, Toolchains};
use async_trait::async_trait;
use common::SandboxConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STDIN_FILE: &str = "stdin.txt";
const STDOUT_FILE: &str = "stdout.txt";
const STDERR_FILE: &str = "stderr.txt";
const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
/// Threads count as processes under isolate; runtimes like the JVM need headroom.
const RUN_PROCESS_LIMIT: u32 = 64;

/// Resource limits for one `isolate --run`.
/// Sizes are in kilobytes, times in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLimits {
    pub time_limit: Option<f64>,
    pub wall_time_limit: Option<f64>,
    pub extra_time: Option<f64>,
    pub memory_limit: Option<u64>,
    pub stack_limit: Option<u64>,
    pub open_files_limit: Option<u32>,
    pub file_size_limit: Option<u64>,
    /// `Some(0)` allows unlimited processes.
    pub process_limit: Option<u32>,
}

fn resource_limit_args(limits: &ResourceLimits) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(time_limit) = limits.time_limit {
        args.push(format!("--time={time_limit}"));
    }
    if let Some(wall_time_limit) = limits.wall_time_limit {
        args.push(format!("--wall-time={wall_time_limit}"));
    }
    if let Some(extra_time) = limits.extra_time {
        args.push(format!("--extra-time={extra_time}"));
    }
    if let Some(memory_limit) = limits.memory_limit {
        args.push(format!("--cg-mem={memory_limit}"));
    }
    if let Some(stack_limit) = limits.stack_limit {
        args.push(format!("--stack={stack_limit}"));
    }
    if let Some(open_files_limit) = limits.open_files_limit {
        args.push(format!("--open-files={open_files_limit}"));
    }
    if let Some(file_size_limit) = limits.file_size_limit {
        args.push(format!("--fsize={file_size_limit}"));
    }
    if let Some(process_limit) = limits.process_limit {
        if process_limit == 0 {
            args.push("--processes".to_string());
        } else {
            args.push(format!("--processes={process_limit}"));
        }
    }
    args
}

/// Contents of an isolate `--meta` file.
#[derive(Debug, Clone, Default, PartialEq)]
struct MetaFile {
    exit_code: Option<i32>,
    signal: Option<i32>,
    wall_time: f64,
    memory_kb: Option<u64>,
    oom_killed: bool,
    /// "RE", "SG", "TO", "XX" or empty when the program exited cleanly.
    status: String,
    message: String,
}

fn parse_meta(content: &str) -> MetaFile {
    let mut raw = HashMap::<&str, &str>::new();
    for line in content.lines() {
        match line.split_once(':') {
            Some((key, value)) => {
                raw.insert(key.trim(), value.trim());
            }
            None if !line.trim().is_empty() => {
                raw.insert(line.trim(), "1");
            }
            None => {}
        }
    }

    let parse_i32 = |key: &str| raw.get(key).and_then(|v| v.parse::<i32>().ok());
    let parse_u64 = |key: &str| raw.get(key).and_then(|v| v.parse::<u64>().ok());

    MetaFile {
        exit_code: parse_i32("exitcode"),
        signal: parse_i32("exitsig"),
        wall_time: raw
            .get("time-wall")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0),
        memory_kb: parse_u64("cg-mem").or(parse_u64("max-rss")),
        oom_killed: raw.contains_key("cg-oom-killed"),
        status: raw.get("status").map(|s| s.to_string()).unwrap_or_default(),
        message: raw.get("message").map(|s| s.to_string()).unwrap_or_default(),
    }
}

/// Pool of isolate box ids. Two concurrent runs never share a box.
#[derive(Debug)]
struct BoxPool {
    free: Mutex<Vec<u32>>,
    permits: Arc<Semaphore>,
}

struct BoxLease {
    id: u32,
    pool: Arc<BoxPool>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for BoxLease {
    fn drop(&mut self) {
        let mut free = self.pool.free.lock().unwrap_or_else(|e| e.into_inner());
        free.push(self.id);
    }
}

impl BoxPool {
    fn new(base: u32, slots: usize) -> Arc<Self> {
        let slots = slots.max(1);
        Arc::new(Self {
            free: Mutex::new((0..slots as u32).map(|i| base + i).rev().collect()),
            permits: Arc::new(Semaphore::new(slots)),
        })
    }

    async fn lease(self: &Arc<Self>) -> Result<BoxLease, SandboxError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::Initialization("box pool closed".to_string()))?;
        let id = self
            .free
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .ok_or_else(|| SandboxError::Initialization("no free isolate box".to_string()))?;
        Ok(BoxLease {
            id,
            pool: self.clone(),
            _permit: permit,
        })
    }
}

/// Runs programs inside `isolate` boxes (namespaces plus cgroup limits).
#[derive(Debug)]
pub struct IsolateSandbox {
    toolchains: Toolchains,
    config: SandboxConfig,
    boxes: Arc<BoxPool>,
}

struct BoxStep<'a> {
    argv: &'a [String],
    timeout: Duration,
    memory_limit_kb: Option<u64>,
    process_limit: u32,
    with_stdin: bool,
    phase: ExecutionPhase,
}

impl IsolateSandbox {
    pub fn new(toolchains: Toolchains, config: SandboxConfig, slots: usize) -> Self {
        let boxes = BoxPool::new(config.box_id_base, slots);
        Self {
            toolchains,
            config,
            boxes,
        }
    }

    fn meta_path(&self, box_id: u32) -> PathBuf {
        let dir = self.config.work_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("codeprep-isolate-{box_id}.meta"))
    }

    async fn init_box(&self, box_id: u32) -> Result<PathBuf, SandboxError> {
        let output = Command::new(&self.config.isolate_bin)
            .arg(format!("--box-id={box_id}"))
            .arg("--cg")
            .arg("--init")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Initialization(format!("failed to execute isolate --init: {err}"))
            })?;

        if !output.status.success() {
            return Err(SandboxError::Initialization(format!(
                "isolate --init failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let path_text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path_text.is_empty() {
            return Err(SandboxError::Initialization(
                "isolate --init did not return sandbox path".to_string(),
            ));
        }
        Ok(PathBuf::from(path_text).join("box"))
    }

    async fn cleanup_box(&self, box_id: u32) -> Result<(), SandboxError> {
        let output = Command::new(&self.config.isolate_bin)
            .arg(format!("--box-id={box_id}"))
            .arg("--cg")
            .arg("--cleanup")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Teardown(format!("failed to execute isolate --cleanup: {err}"))
            })?;

        if !output.status.success() {
            return Err(SandboxError::Teardown(format!(
                "isolate --cleanup failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn run_args(&self, box_id: u32, step: &BoxStep<'_>) -> Vec<String> {
        let secs = step.timeout.as_secs_f64();
        let limits = ResourceLimits {
            time_limit: Some(secs),
            wall_time_limit: Some(secs),
            memory_limit: step.memory_limit_kb,
            process_limit: Some(step.process_limit),
            file_size_limit: Some(64 * 1024),
            ..Default::default()
        };

        let mut args = vec![
            format!("--box-id={box_id}"),
            "--cg".to_string(),
            format!("--meta={}", self.meta_path(box_id).to_string_lossy()),
            format!("--env=PATH={SANDBOX_PATH}"),
            "--env=HOME=/box".to_string(),
        ];
        args.extend(resource_limit_args(&limits));
        if step.with_stdin {
            args.push(format!("--stdin={STDIN_FILE}"));
        }
        args.push(format!("--stdout={STDOUT_FILE}"));
        args.push(format!("--stderr={STDERR_FILE}"));
        args.push("--run".to_string());
        args.push("--".to_string());
        args.extend(step.argv.iter().cloned());
        args
    }

    async fn read_capped(path: &Path, cap: usize) -> String {
        match fs::read(path).await {
            Ok(bytes) => truncate_output(String::from_utf8_lossy(&bytes).into_owned(), cap),
            Err(_) => String::new(),
        }
    }

    async fn execute(
        &self,
        box_id: u32,
        box_dir: &Path,
        step: BoxStep<'_>,
        max_output_bytes: usize,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        if step.argv.is_empty() {
            return Err(SandboxError::Initialization(
                "isolate --run requires at least one program argument".to_string(),
            ));
        }

        let mut command = Command::new(&self.config.isolate_bin);
        command
            .args(self.run_args(box_id, &step))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = command.spawn().map_err(|err| {
            SandboxError::Execution(format!("failed to execute isolate --run: {err}"))
        })?;

        // Dropping the child kills isolate; --cleanup then removes the box.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|err| {
                SandboxError::Execution(format!("failed to wait for isolate --run: {err}"))
            })?,
            _ = cancel.cancelled() => return Err(SandboxError::Cancelled),
        };

        if !matches!(output.status.code(), Some(0) | Some(1)) {
            return Err(SandboxError::Execution(format!(
                "isolate internal error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let meta_path = self.meta_path(box_id);
        let content = fs::read_to_string(&meta_path).await.map_err(|err| {
            SandboxError::Execution(format!("failed to read isolate meta file: {err}"))
        })?;
        let _ = fs::remove_file(&meta_path).await;
        let meta = parse_meta(&content);
        if meta.status == "XX" {
            return Err(SandboxError::Execution(format!(
                "isolate reported an internal error: {}",
                meta.message
            )));
        }

        let mut raw = RawExecution::new(step.phase);
        raw.stdout = Self::read_capped(&box_dir.join(STDOUT_FILE), max_output_bytes).await;
        raw.stderr = Self::read_capped(&box_dir.join(STDERR_FILE), max_output_bytes).await;
        raw.timed_out = meta.status == "TO";
        raw.memory_exceeded = meta.oom_killed;
        raw.signal = meta.signal;
        raw.exit_code = match (meta.exit_code, meta.signal, meta.status.as_str()) {
            (Some(code), _, _) => Some(code),
            (None, None, "") => Some(0),
            _ => None,
        };
        raw.elapsed_ms = (meta.wall_time * 1000.0).round() as u64;
        raw.peak_memory_kb = meta.memory_kb.unwrap_or(0);

        debug!(
            box_id,
            phase = ?raw.phase,
            status = %meta.status,
            elapsed_ms = raw.elapsed_ms,
            "isolate run finished"
        );
        Ok(raw)
    }

    async fn run_in_box(
        &self,
        box_id: u32,
        box_dir: &Path,
        spec: &LanguageSpec,
        source: &str,
        input: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        let write = |name: &str, body: &str| {
            let path = box_dir.join(name);
            let body = body.to_owned();
            async move {
                fs::write(&path, body).await.map_err(|err| {
                    SandboxError::Initialization(format!(
                        "failed to write {}: {err}",
                        path.display()
                    ))
                })
            }
        };
        write(spec.source_file.as_str(), source).await?;
        write(STDIN_FILE, input).await?;

        if let Some(compile) = &spec.compile {
            let step = BoxStep {
                argv: compile,
                timeout: limits.compile_timeout,
                memory_limit_kb: None,
                process_limit: 0,
                with_stdin: false,
                phase: ExecutionPhase::Compile,
            };
            let compiled = self
                .execute(box_id, box_dir, step, limits.max_output_bytes, cancel)
                .await?;
            if !compiled.succeeded() {
                return Ok(compiled);
            }
        }

        let step = BoxStep {
            argv: &spec.run,
            timeout: limits.timeout,
            memory_limit_kb: Some(limits.memory_limit_kb),
            process_limit: RUN_PROCESS_LIMIT,
            with_stdin: true,
            phase: ExecutionPhase::Run,
        };
        self.execute(box_id, box_dir, step, limits.max_output_bytes, cancel)
            .await
    }
}

#[async_trait]
impl SandboxRunner for IsolateSandbox {
    async fn run(
        &self,
        language: &str,
        source: &str,
        input: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        let spec = self
            .toolchains
            .get(language)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(language.to_string()))?;

        let lease = self.boxes.lease().await?;
        let box_dir = self.init_box(lease.id).await?;
        let result = self
            .run_in_box(lease.id, &box_dir, spec, source, input, limits, cancel)
            .await;

        if let Err(err) = self.cleanup_box(lease.id).await {
            warn!(box_id = lease.id, error = %err, "Failed to clean up isolate box");
            if result.is_ok() {
                return Err(err);
            }
        }
        result
    }

    fn supports_language(&self, language: &str) -> bool {
        self.toolchains.contains(language)
    }

    fn requires_compile(&self, language: &str) -> bool {
        self.toolchains
            .get(language)
            .is_some_and(LanguageSpec::requires_compile)
    }
}
