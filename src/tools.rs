use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::Config;

const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The external executables the create workflow depends on.
pub trait Toolchain {
    /// Name of the package manager, for user-facing messages.
    fn package_manager(&self) -> &str;

    /// True if the package manager runs and exits successfully.
    fn probe(&self) -> bool;

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    fn install(&self, cwd: &Path) -> Result<()>;

    fn init_repo(&self, cwd: &Path) -> Result<()>;
}

/// Shells out to the real `git` and `bun`.
#[derive(Debug, Clone)]
pub struct SystemTools {
    pub git: String,
    pub bun: String,
    pub probe_timeout: Duration,
    pub debug: bool,
}

impl SystemTools {
    pub fn from_config(config: &Config) -> Self {
        Self {
            git: config.tools.git.clone(),
            bun: config.tools.bun.clone(),
            probe_timeout: Duration::from_secs(config.tools.probe_timeout_secs),
            debug: config.debug,
        }
    }
}

impl Toolchain for SystemTools {
    fn package_manager(&self) -> &str {
        &self.bun
    }

    fn probe(&self) -> bool {
        let child = Command::new(&self.bun)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) => {
                if self.debug {
                    eprintln!("[debug] probe: could not run {}: {}", self.bun, e);
                }
                return false;
            }
        };

        match wait_with_timeout(child, self.probe_timeout) {
            Ok(Some(status)) => {
                if self.debug {
                    eprintln!("[debug] probe: {} --version exited with {}", self.bun, status);
                }
                status.success()
            }
            Ok(None) => {
                if self.debug {
                    eprintln!(
                        "[debug] probe: {} --version timed out after {:?}",
                        self.bun, self.probe_timeout
                    );
                }
                false
            }
            Err(e) => {
                if self.debug {
                    eprintln!("[debug] probe: wait failed: {}", e);
                }
                false
            }
        }
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let args = [OsStr::new("clone"), OsStr::new(url), dest.as_os_str()];
        let status = run_streaming(&self.git, &args, None)?;
        ensure_success(&self.git, &args, None, status)
    }

    fn install(&self, cwd: &Path) -> Result<()> {
        let status = run_streaming(&self.bun, &["install"], Some(cwd))?;
        ensure_success(&self.bun, &["install"], Some(cwd), status)
    }

    fn init_repo(&self, cwd: &Path) -> Result<()> {
        let output = run_captured(&self.git, &["init"], cwd)?;
        if self.debug {
            eprintln!("[debug] git init: {}", output);
        }
        Ok(())
    }
}

/// Waits for `child` for at most `timeout`. Returns `None` if it was still
/// running, in which case it has been killed and reaped.
pub fn wait_with_timeout(mut child: Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(PROBE_POLL_INTERVAL);
    }
}

/// Runs a command with output captured; non-zero exit becomes an error
/// carrying stderr.
pub fn run_captured<A: AsRef<OsStr>>(program: &str, args: &[A], cwd: &Path) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| {
            format!("failed to run {} [{}] in {}", program, join_args(args), cwd.display())
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} {} failed in {} (exit code: {})\nstderr: {}",
            program,
            join_args(args),
            cwd.display(),
            exit_code(&output.status),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("{} output was not valid UTF-8", program))?;
    Ok(stdout.trim_end().to_string())
}

/// Runs a command with stdout and stderr going straight to the console.
pub fn run_streaming<A: AsRef<OsStr>>(
    program: &str,
    args: &[A],
    cwd: Option<&Path>,
) -> Result<ExitStatus> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let status = cmd.status().with_context(|| match cwd {
        Some(dir) => format!(
            "failed to run {} [{}] in {}",
            program,
            join_args(args),
            dir.display()
        ),
        None => format!("failed to run {} [{}]", program, join_args(args)),
    })?;

    Ok(status)
}

fn ensure_success<A: AsRef<OsStr>>(
    program: &str,
    args: &[A],
    cwd: Option<&Path>,
    status: ExitStatus,
) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    match cwd {
        Some(dir) => bail!(
            "{} {} failed in {} (exit code: {})",
            program,
            join_args(args),
            dir.display(),
            exit_code(&status)
        ),
        None => bail!(
            "{} {} failed (exit code: {})",
            program,
            join_args(args),
            exit_code(&status)
        ),
    }
}

/// Arguments for error messages; paths may not be UTF-8.
fn join_args<A: AsRef<OsStr>>(args: &[A]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn exit_code(status: &ExitStatus) -> String {
    status
        .code()
        .map_or("signal".to_string(), |c| c.to_string())
}
