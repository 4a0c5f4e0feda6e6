#![cfg(test)]

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::tools::Toolchain;

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A local git repo with one commit containing a package.json, usable as
    /// a clone source.
    pub fn create_template_repo(&self, name: &str) -> PathBuf {
        let repo_path = self.dir.path().join(name);
        std::fs::create_dir_all(&repo_path).unwrap();
        std::fs::write(repo_path.join("package.json"), "{\"name\": \"starter\"}\n").unwrap();

        let run = |args: &[&str]| {
            let output = Command::new("git")
                .args(args)
                .current_dir(&repo_path)
                .env("GIT_AUTHOR_NAME", "Test")
                .env("GIT_AUTHOR_EMAIL", "test@test.com")
                .env("GIT_COMMITTER_NAME", "Test")
                .env("GIT_COMMITTER_EMAIL", "test@test.com")
                .output()
                .expect("failed to run git");
            assert!(
                output.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        };

        run(&["init"]);
        run(&["add", "package.json"]);
        run(&["commit", "-m", "initial"]);

        repo_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    Clone { url: String, dest: PathBuf },
    Install { cwd: PathBuf },
    Init { cwd: PathBuf },
}

/// Records every call and answers from canned results. A successful clone
/// lays down a package.json plus a `.git/inherited` marker; a successful
/// init writes `.git/fresh`.
pub struct FakeTools {
    calls: RefCell<Vec<Call>>,
    available: bool,
    clone_fails: bool,
    install_fails: bool,
    init_fails: bool,
}

impl FakeTools {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            available: true,
            clone_fails: false,
            install_fails: false,
            init_fails: false,
        }
    }

    pub fn without_package_manager(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn failing_clone(mut self) -> Self {
        self.clone_fails = true;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.install_fails = true;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.init_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Toolchain for FakeTools {
    fn package_manager(&self) -> &str {
        "bun"
    }

    fn probe(&self) -> bool {
        self.record(Call::Probe);
        self.available
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        self.record(Call::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        if self.clone_fails {
            bail!("git clone {} failed (exit code: 128)", url);
        }
        std::fs::create_dir_all(dest.join(".git"))?;
        std::fs::write(dest.join(".git").join("inherited"), "")?;
        std::fs::write(dest.join("package.json"), "{}\n")?;
        Ok(())
    }

    fn install(&self, cwd: &Path) -> Result<()> {
        self.record(Call::Install {
            cwd: cwd.to_path_buf(),
        });
        if self.install_fails {
            bail!("bun install failed in {} (exit code: 1)", cwd.display());
        }
        Ok(())
    }

    fn init_repo(&self, cwd: &Path) -> Result<()> {
        self.record(Call::Init {
            cwd: cwd.to_path_buf(),
        });
        if self.init_fails {
            bail!("failed to run git [\"init\"] in {}", cwd.display());
        }
        std::fs::create_dir_all(cwd.join(".git"))?;
        std::fs::write(cwd.join(".git").join("fresh"), "")?;
        Ok(())
    }
}
