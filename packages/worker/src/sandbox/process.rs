use super::error::SandboxError;
use super::{ExecutionLimits, ExecutionPhase, RawExecution, SandboxRunner, truncate_output};
use crate::language::{LanguageSpec, Toolchains};
use async_trait::async_trait;
use common::{Isolation, SandboxConfig};
use std::ffi::{CStr, CString};
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Largest file a sandboxed program (or compiler) may write.
const FILE_SIZE_LIMIT_BYTES: u64 = 64 * 1024 * 1024;
const OPEN_FILES_LIMIT: u64 = 64;

const NAMESPACE_FLAGS: libc::c_int =
    libc::CLONE_NEWNET | libc::CLONE_NEWNS | libc::CLONE_NEWIPC | libc::CLONE_NEWUTS;

/// Runs programs as local child processes.
///
/// Each run gets a fresh scratch directory, a cleared environment and its own
/// process group, which is killed as a whole when the run ends. Under
/// [`Isolation::Strict`] the child also enters private network, mount, IPC
/// and UTS namespaces: it has no network but loopback, and the scratch root
/// is covered by an empty tmpfs so other runs' directories are out of reach.
/// Limits are enforced with rlimits, a wall-clock deadline and `/proc` peak
/// memory sampling.
#[derive(Debug)]
pub struct ProcessSandbox {
    toolchains: Toolchains,
    config: SandboxConfig,
}

/// One process launch within an invocation.
struct Step<'a> {
    argv: &'a [String],
    stdin: &'a str,
    timeout: Duration,
    /// Enforced by sampling; `None` during compilation.
    memory_limit_kb: Option<u64>,
    address_space_kb: Option<u64>,
    phase: ExecutionPhase,
}

#[derive(Debug, Clone, Copy)]
struct Rlimits {
    address_space_bytes: Option<u64>,
    cpu_secs: u64,
}

fn rlimit(value: u64) -> libc::rlimit {
    libc::rlimit {
        rlim_cur: value as libc::rlim_t,
        rlim_max: value as libc::rlim_t,
    }
}

fn check(ret: libc::c_int) -> std::io::Result<()> {
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Paths the child needs after `unshare`, allocated before fork.
struct Confinement {
    /// Parent of all scratch directories, hidden behind a tmpfs.
    scratch_root: CString,
    /// This run's scratch directory, bind-mounted back into place.
    dir: CString,
    strict: bool,
}

impl Confinement {
    fn new(scratch_root: &Path, dir: &Path, isolation: Isolation) -> Result<Self, SandboxError> {
        let c_path = |path: &Path| {
            CString::new(path.as_os_str().as_bytes()).map_err(|_| {
                SandboxError::Initialization(format!("path contains NUL: {}", path.display()))
            })
        };
        Ok(Self {
            scratch_root: c_path(scratch_root)?,
            dir: c_path(dir)?,
            strict: isolation == Isolation::Strict,
        })
    }

    /// Runs in the forked child, after `chdir` into the scratch directory.
    fn apply(&self) -> std::io::Result<()> {
        match enter_namespaces(&self.scratch_root, &self.dir) {
            Err(err) if self.strict => Err(err),
            _ => Ok(()),
        }
    }
}

/// Detach from the host's network, mounts, IPC and hostname, then replace the
/// scratch root with an empty tmpfs that holds only `dir`. Needs
/// `CAP_SYS_ADMIN`; rootless operation is not supported.
fn enter_namespaces(scratch_root: &CStr, dir: &CStr) -> std::io::Result<()> {
    unsafe {
        check(libc::unshare(NAMESPACE_FLAGS))?;
        check(libc::mount(
            c"none".as_ptr(),
            c"/".as_ptr(),
            std::ptr::null(),
            libc::MS_REC | libc::MS_PRIVATE,
            std::ptr::null(),
        ))?;
        check(libc::mount(
            c"tmpfs".as_ptr(),
            scratch_root.as_ptr(),
            c"tmpfs".as_ptr(),
            libc::MS_NOSUID | libc::MS_NODEV,
            std::ptr::null(),
        ))?;
        // The working directory still refers to the covered scratch dir.
        check(libc::mkdir(dir.as_ptr(), 0o700))?;
        check(libc::mount(
            c".".as_ptr(),
            dir.as_ptr(),
            std::ptr::null(),
            libc::MS_BIND,
            std::ptr::null(),
        ))?;
        check(libc::chdir(dir.as_ptr()))?;
    }
    Ok(())
}

fn apply_rlimits(limits: &Rlimits) -> std::io::Result<()> {
    unsafe {
        if let Some(bytes) = limits.address_space_bytes {
            check(libc::setrlimit(libc::RLIMIT_AS, &rlimit(bytes)))?;
        }
        check(libc::setrlimit(libc::RLIMIT_CPU, &rlimit(limits.cpu_secs)))?;
        check(libc::setrlimit(libc::RLIMIT_CORE, &rlimit(0)))?;
        check(libc::setrlimit(
            libc::RLIMIT_FSIZE,
            &rlimit(FILE_SIZE_LIMIT_BYTES),
        ))?;
        check(libc::setrlimit(libc::RLIMIT_NOFILE, &rlimit(OPEN_FILES_LIMIT)))?;
    }
    Ok(())
}

/// Read everything, keeping the first `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, cap: usize) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    truncate_output(String::from_utf8_lossy(&kept).into_owned(), cap)
}

/// `VmHWM` of a live process, in kilobytes.
async fn read_peak_memory_kb(pid: u32) -> Option<u64> {
    let status = tokio::fs::read_to_string(format!("/proc/{pid}/status"))
        .await
        .ok()?;
    parse_vm_hwm(&status)
}

fn parse_vm_hwm(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // The child leads its own group, so this reaches every descendant.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
}

async fn join_output(handle: JoinHandle<String>, grace: Duration) -> String {
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            warn!(error = %err, "Output reader task failed");
            String::new()
        }
        Err(_) => {
            warn!("Output pipe still open after process exit, discarding");
            String::new()
        }
    }
}

impl ProcessSandbox {
    pub fn new(toolchains: Toolchains, config: SandboxConfig) -> Self {
        Self { toolchains, config }
    }

    /// Absolute, since the child resolves it after changing directory.
    fn scratch_root(&self) -> PathBuf {
        let root = self
            .config
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        std::path::absolute(&root).unwrap_or(root)
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir, SandboxError> {
        tempfile::Builder::new()
            .prefix("codeprep-")
            .tempdir_in(self.scratch_root())
            .map_err(|err| {
                SandboxError::Initialization(format!("failed to create scratch directory: {err}"))
            })
    }

    fn command(&self, step: &Step<'_>, dir: &Path) -> Result<Command, SandboxError> {
        let (program, args) = step
            .argv
            .split_first()
            .ok_or_else(|| SandboxError::Initialization("empty command line".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_else(|| "/usr/bin:/bin".into()))
            .env("HOME", dir)
            .env("LANG", "C.UTF-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let rlimits = Rlimits {
            address_space_bytes: step.address_space_kb.map(|kb| kb.saturating_mul(1024)),
            cpu_secs: step.timeout.as_secs() + 1,
        };
        let confinement = Confinement::new(&self.scratch_root(), dir, self.config.isolation)?;
        // SAFETY: the closure only makes async-signal-safe syscalls on
        // memory allocated before fork.
        unsafe {
            command.pre_exec(move || {
                confinement.apply()?;
                apply_rlimits(&rlimits)
            });
        }
        Ok(command)
    }

    async fn execute(
        &self,
        step: Step<'_>,
        dir: &Path,
        max_output_bytes: usize,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        let mut command = self.command(&step, dir)?;
        let started = Instant::now();
        let mut child: Child = command.spawn().map_err(|err| {
            let program = &step.argv[0];
            if err.kind() == ErrorKind::NotFound {
                SandboxError::Initialization(format!("toolchain binary not found: {program}"))
            } else {
                SandboxError::Execution(format!("failed to spawn {program}: {err}"))
            }
        })?;
        let pid = child.id();

        if let Some(mut stdin) = child.stdin.take() {
            let input = step.stdin.to_owned();
            tokio::spawn(async move {
                // A program that never reads its input closes the pipe early.
                let _ = stdin.write_all(input.as_bytes()).await;
            });
        }
        let stdout = tokio::spawn(read_capped(child.stdout.take(), max_output_bytes));
        let stderr = tokio::spawn(read_capped(child.stderr.take(), max_output_bytes));

        let mut raw = RawExecution::new(step.phase);
        let deadline = tokio::time::sleep(step.timeout);
        tokio::pin!(deadline);
        let mut sampler = tokio::time::interval(self.config.memory_sample_interval());
        sampler.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let status = loop {
            tokio::select! {
                status = child.wait() => {
                    break Some(status.map_err(|err| {
                        SandboxError::Execution(format!("failed to wait for child: {err}"))
                    })?);
                }
                _ = &mut deadline => {
                    raw.timed_out = true;
                    break None;
                }
                _ = cancel.cancelled() => {
                    self.teardown(&mut child, pid).await?;
                    return Err(SandboxError::Cancelled);
                }
                _ = sampler.tick() => {
                    let Some(pid) = pid else { continue };
                    if let Some(kb) = read_peak_memory_kb(pid).await {
                        raw.peak_memory_kb = raw.peak_memory_kb.max(kb);
                    }
                    if step.memory_limit_kb.is_some_and(|limit| raw.peak_memory_kb > limit) {
                        raw.memory_exceeded = true;
                        break None;
                    }
                }
            }
        };

        let status = match status {
            Some(status) => {
                // Reap stragglers that would otherwise keep the pipes open.
                kill_process_group(pid);
                status
            }
            None => self.teardown(&mut child, pid).await?,
        };
        raw.elapsed_ms = started.elapsed().as_millis() as u64;
        raw.exit_code = status.code();
        raw.signal = status.signal();

        let grace = self.config.kill_grace();
        raw.stdout = join_output(stdout, grace).await;
        raw.stderr = join_output(stderr, grace).await;

        debug!(
            phase = ?raw.phase,
            exit_code = ?raw.exit_code,
            signal = ?raw.signal,
            elapsed_ms = raw.elapsed_ms,
            peak_memory_kb = raw.peak_memory_kb,
            timed_out = raw.timed_out,
            "Process finished"
        );
        Ok(raw)
    }

    async fn teardown(
        &self,
        child: &mut Child,
        pid: Option<u32>,
    ) -> Result<std::process::ExitStatus, SandboxError> {
        kill_process_group(pid);
        let _ = child.start_kill();
        match tokio::time::timeout(self.config.kill_grace(), child.wait()).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(err)) => Err(SandboxError::Teardown(format!(
                "failed to reap killed process: {err}"
            ))),
            Err(_) => Err(SandboxError::Teardown(format!(
                "process {pid:?} did not exit within {:?}",
                self.config.kill_grace()
            ))),
        }
    }

    async fn run_spec(
        &self,
        spec: &LanguageSpec,
        source: &str,
        input: &str,
        limits: &ExecutionLimits,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, SandboxError> {
        let scratch = self.scratch_dir()?;
        tokio::fs::write(scratch.path().join(&spec.source_file), source)
            .await
            .map_err(|err| {
                SandboxError::Initialization(format!("failed to write source file: {err}"))
            })?;

        if let Some(compile) = &spec.compile {
            let step = Step {
                argv: compile,
                stdin: "",
                timeout: limits.compile_timeout,
                memory_limit_kb: None,
                address_space_kb: None,
                phase: ExecutionPhase::Compile,
            };
            let compiled = self
                .execute(step, scratch.path(), limits.max_output_bytes, cancel)
                .await?;
            if !compiled.succeeded() {
                return Ok(compiled);
            }
        }

        let step = Step {
            argv: &spec.run,
            stdin: input,
            timeout: limits.timeout,
            memory_limit_kb: Some(limits.memory_limit_kb),
            address_space_kb: spec.limit_address_space.then_some(limits.memory_limit_kb),
            phase: ExecutionPhase::Run,
        };
        let result = self
            .execute(step, scratch.path(), limits.max_output_bytes, cancel)
            .await;

        if let Err(err) = scratch.close() {
            warn!(error = %err, "Failed to remove scratch directory");
        }
        result
    }
}

#[async_trait]
impl SandboxRunner for ProcessSandbox {
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
        self.run_spec(spec, source, input, limits, cancel).await
    }

    fn supports_language(&self, language: &str) -> bool {
        self.toolchains.contains(language)
    }

    fn requires_compile(&self, language: &str) -> bool {
        self.toolchains
            .get(language)
            .is_some_and(LanguageSpec::requires_compile)
    }

    async fn verify(&self) -> Result<(), SandboxError> {
        let scratch = self.scratch_dir()?;
        let argv = ["true".to_string()];
        let step = Step {
            argv: &argv,
            stdin: "",
            timeout: Duration::from_secs(5),
            memory_limit_kb: None,
            address_space_kb: None,
            phase: ExecutionPhase::Run,
        };
        let strict = Self::new(
            self.toolchains.clone(),
            SandboxConfig {
                isolation: Isolation::Strict,
                ..self.config.clone()
            },
        );
        let result = strict
            .execute(step, scratch.path(), 0, &CancellationToken::new())
            .await;
        if let Err(err) = scratch.close() {
            warn!(error = %err, "Failed to remove scratch directory");
        }

        match (result, self.config.isolation) {
            (Ok(raw), _) if raw.succeeded() => Ok(()),
            (outcome, Isolation::Relaxed) => {
                warn!(
                    outcome = ?outcome.map(|raw| raw.exit_code),
                    "Namespaces unavailable, running without filesystem or network isolation"
                );
                Ok(())
            }
            (outcome, Isolation::Strict) => Err(SandboxError::Initialization(format!(
                "namespace isolation unavailable ({}); set sandbox.isolation = \"relaxed\" on development hosts",
                match outcome {
                    Ok(raw) => format!("check exited with {:?}", raw.exit_code),
                    Err(err) => err.to_string(),
                }
            ))),
        }
    }
}
