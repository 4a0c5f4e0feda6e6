use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::app::{BUN_INSTALL_COMMANDS, DEV_COMMAND, TEMPLATE_URL};
use crate::report;
use crate::tools::Toolchain;
use crate::validate::resolve_target;

/// The package manager could not be run.
#[derive(Debug, thiserror::Error)]
#[error("{}", missing_tool_message(.package_manager))]
pub struct MissingTool {
    pub package_manager: String,
}

fn missing_tool_message(package_manager: &str) -> String {
    let mut lines = vec![
        format!(
            "{} is required but could not be run (`{} --version` failed)",
            package_manager, package_manager
        ),
        "  hint: install it with one of:".to_string(),
    ];
    for cmd in BUN_INSTALL_COMMANDS {
        lines.push(format!("    {}", cmd));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchTemplate,
    InstallDependencies,
    InitRepository,
}

impl Step {
    pub const ALL: [Step; 3] = [
        Step::FetchTemplate,
        Step::InstallDependencies,
        Step::InitRepository,
    ];

    /// Whether a failure in this step ends the run. A project without a
    /// git repository still works, so init only warns.
    pub fn abort_on_failure(self) -> bool {
        match self {
            Step::FetchTemplate => true,
            Step::InstallDependencies => true,
            Step::InitRepository => false,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Step::FetchTemplate => "Failed to fetch template",
            Step::InstallDependencies => "Failed to install dependencies",
            Step::InitRepository => "Failed to initialize git repository",
        }
    }

    fn started_label(self, package_manager: &str) -> String {
        match self {
            Step::FetchTemplate => format!("Fetching template from {}", TEMPLATE_URL),
            Step::InstallDependencies => {
                format!("Installing dependencies with {}", package_manager)
            }
            Step::InitRepository => "Initializing git repository".to_string(),
        }
    }

    fn finished_label(self) -> &'static str {
        match self {
            Step::FetchTemplate => "Template fetched",
            Step::InstallDependencies => "Dependencies installed",
            Step::InitRepository => "Git repository initialized",
        }
    }

    fn recovery_hint(self, target: &Path) -> String {
        match self {
            Step::FetchTemplate => format!(
                "check your network, then retry; remove {} first if it was created",
                target.display()
            ),
            Step::InstallDependencies => format!("run `bun install` inside {}", target.display()),
            Step::InitRepository => format!("run `git init` inside {}", target.display()),
        }
    }

    fn run(self, tools: &dyn Toolchain, target: &Path) -> Result<()> {
        match self {
            Step::FetchTemplate => {
                tools.clone_repo(TEMPLATE_URL, target)?;
                remove_vcs_metadata(target)
            }
            Step::InstallDependencies => tools.install(target),
            Step::InitRepository => tools.init_repo(target),
        }
    }
}

#[derive(Debug)]
pub struct CreateResult {
    pub folder_name: OsString,
    pub path: PathBuf,
    pub completed: Vec<Step>,
    pub warnings: Vec<String>,
}

impl CreateResult {
    pub fn repository_initialized(&self) -> bool {
        self.completed.contains(&Step::InitRepository)
    }
}

/// Drops the template's `.git` so the project starts without its history.
/// Handles both a directory and a `gitdir:` file.
fn remove_vcs_metadata(dir: &Path) -> Result<()> {
    let git_path = dir.join(".git");
    match std::fs::symlink_metadata(&git_path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&git_path)
            .with_context(|| format!("failed to remove {}", git_path.display())),
        Ok(_) => std::fs::remove_file(&git_path)
            .with_context(|| format!("failed to remove {}", git_path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to inspect {}", git_path.display())),
    }
}

pub fn cmd_create(
    folder_name: impl AsRef<OsStr>,
    cwd: &Path,
    tools: &dyn Toolchain,
    debug: bool,
) -> Result<CreateResult> {
    let target = resolve_target(folder_name, cwd, debug)?;
    if debug {
        eprintln!("[debug] target: {}", target.path.display());
    }

    if !tools.probe() {
        return Err(MissingTool {
            package_manager: tools.package_manager().to_string(),
        }
        .into());
    }

    let mut completed = Vec::new();
    let mut warnings = Vec::new();

    for step in Step::ALL {
        report::step_started(&step.started_label(tools.package_manager()));

        match step.run(tools, &target.path) {
            Ok(()) => {
                report::step_finished(step.finished_label());
                completed.push(step);
            }
            Err(e) => {
                let e = e.context(step.failure_message());
                if step.abort_on_failure() {
                    return Err(e);
                }
                let message = format!("{:#}", e);
                report::warning(&message, &step.recovery_hint(&target.path));
                warnings.push(message);
            }
        }
    }

    Ok(CreateResult {
        folder_name: target.folder_name,
        path: target.path,
        completed,
        warnings,
    })
}

/// Single-quotes `name` for a POSIX shell unless every char is plainly safe.
fn shell_quote(name: &str) -> String {
    let safe = |c: char| c.is_alphanumeric() || "-_./+@%,=".contains(c);
    if !name.is_empty() && name.chars().all(safe) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "'\\''"))
    }
}

pub fn format_create_human(result: &CreateResult) -> String {
    let mut lines = Vec::new();

    lines.push(String::new());
    lines.push(format!(
        "✓ Created {} at {}",
        result.folder_name.to_string_lossy(),
        result.path.display()
    ));
    if !result.warnings.is_empty() {
        lines.push(format!(
            "  (with {} warning{})",
            result.warnings.len(),
            if result.warnings.len() == 1 { "" } else { "s" }
        ));
    }
    lines.push(String::new());
    lines.push("Next steps:".to_string());
    lines.push(format!(
        "  cd {}",
        shell_quote(&result.folder_name.to_string_lossy())
    ));
    if !result.repository_initialized() {
        lines.push("  git init".to_string());
    }
    lines.push(format!("  {}", DEV_COMMAND));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Call, FakeTools, TestEnv};
    use crate::validate::ValidationError;

    #[test]
    fn full_run_calls_tools_in_order() {
        let env = TestEnv::new();
        let tools = FakeTools::new();

        let result = cmd_create("my-app", env.path(), &tools, false).unwrap();

        let dest = env.path().join("my-app");
        assert_eq!(
            tools.calls(),
            vec![
                Call::Probe,
                Call::Clone {
                    url: TEMPLATE_URL.to_string(),
                    dest: dest.clone()
                },
                Call::Install { cwd: dest.clone() },
                Call::Init { cwd: dest.clone() },
            ]
        );
        assert_eq!(result.path, dest);
        assert_eq!(result.folder_name, "my-app");
        assert_eq!(result.completed, Step::ALL.to_vec());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn fetch_removes_template_git_dir() {
        let env = TestEnv::new();
        let tools = FakeTools::new();

        let result = cmd_create("my-app", env.path(), &tools, false).unwrap();

        assert!(result.path.join("package.json").is_file());
        assert!(!result.path.join(".git").join("inherited").exists());
    }

    #[test]
    fn fetch_removes_gitdir_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".git"), "gitdir: ../elsewhere\n").unwrap();

        remove_vcs_metadata(tmp.path()).unwrap();
        assert!(!tmp.path().join(".git").exists());
    }

    #[test]
    fn fetch_without_git_dir_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(remove_vcs_metadata(tmp.path()).is_ok());
    }

    #[test]
    fn illegal_name_fails_before_any_tool_call() {
        let env = TestEnv::new();
        let tools = FakeTools::new();

        let err = cmd_create("my:app", env.path(), &tools, false).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::IllegalCharacter { ch: ':', .. })
        ));
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn whitespace_name_fails_with_empty_message() {
        let env = TestEnv::new();
        let tools = FakeTools::new();

        let err = cmd_create("   ", env.path(), &tools, false).unwrap_err();

        assert!(err.to_string().contains("cannot be empty"), "{}", err);
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn existing_target_fails_without_clone_or_install() {
        let env = TestEnv::new();
        std::fs::create_dir(env.path().join("my-app")).unwrap();
        let tools = FakeTools::new();

        let err = cmd_create("my-app", env.path(), &tools, false).unwrap_err();

        assert!(err.to_string().contains("already exists"), "{}", err);
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn second_run_with_same_name_is_rejected() {
        let env = TestEnv::new();
        cmd_create("my-app", env.path(), &FakeTools::new(), false).unwrap();

        let tools = FakeTools::new();
        let err = cmd_create("my-app", env.path(), &tools, false).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::AlreadyExists(_))
        ));
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn missing_package_manager_stops_before_clone() {
        let env = TestEnv::new();
        let tools = FakeTools::new().without_package_manager();

        let err = cmd_create("my-app", env.path(), &tools, false).unwrap_err();

        assert!(err.downcast_ref::<MissingTool>().is_some());
        assert_eq!(tools.calls(), vec![Call::Probe]);
        assert!(!env.path().join("my-app").exists());
    }

    #[test]
    fn missing_package_manager_message_lists_install_commands() {
        let err = MissingTool {
            package_manager: "bun".to_string(),
        };
        let msg = err.to_string();
        let listed = BUN_INSTALL_COMMANDS
            .iter()
            .filter(|cmd| msg.contains(*cmd))
            .count();
        assert!(listed >= 2, "expected install commands in: {}", msg);
        assert!(msg.starts_with("bun is required"));
    }

    #[test]
    fn clone_failure_aborts_with_fetch_message() {
        let env = TestEnv::new();
        let tools = FakeTools::new().failing_clone();

        let err = cmd_create("my-app", env.path(), &tools, false).unwrap_err();

        let msg = format!("{:#}", err);
        assert!(msg.starts_with("Failed to fetch template: "), "{}", msg);
        assert!(!tools.calls().iter().any(|c| matches!(c, Call::Install { .. })));
        assert!(!tools.calls().iter().any(|c| matches!(c, Call::Init { .. })));
    }

    #[test]
    fn install_failure_aborts_with_install_message() {
        let env = TestEnv::new();
        let tools = FakeTools::new().failing_install();

        let err = cmd_create("my-app", env.path(), &tools, false).unwrap_err();

        let msg = format!("{:#}", err);
        assert!(msg.starts_with("Failed to install dependencies: "), "{}", msg);
        assert!(!tools.calls().iter().any(|c| matches!(c, Call::Init { .. })));
    }

    #[test]
    fn init_failure_is_a_warning() {
        let env = TestEnv::new();
        let tools = FakeTools::new().failing_init();

        let result = cmd_create("my-app", env.path(), &tools, false).unwrap();

        assert!(!result.repository_initialized());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Failed to initialize git repository: "));
        assert_eq!(
            result.completed,
            vec![Step::FetchTemplate, Step::InstallDependencies]
        );
    }

    #[test]
    fn only_init_is_best_effort() {
        let best_effort: Vec<Step> = Step::ALL
            .into_iter()
            .filter(|s| !s.abort_on_failure())
            .collect();
        assert_eq!(best_effort, vec![Step::InitRepository]);
    }

    #[test]
    fn undecidable_existence_still_attempts_clone() {
        let env = TestEnv::new();
        std::fs::write(env.path().join("f"), "x").unwrap();
        let tools = FakeTools::new();

        // "f/sub" can't be looked up (ENOTDIR), so the clone reports it.
        let err = cmd_create("sub", &env.path().join("f"), &tools, false).unwrap_err();

        let dest = env.path().join("f").join("sub");
        assert!(tools.calls().contains(&Call::Clone {
            url: TEMPLATE_URL.to_string(),
            dest
        }));
        assert!(format!("{:#}", err).starts_with("Failed to fetch template: "));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_name_reaches_clone_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let env = TestEnv::new();
        let name = OsStr::from_bytes(b"caf\xe9");
        let tools = FakeTools::new();

        let result = cmd_create(name, env.path(), &tools, false).unwrap();

        let dest = env.path().join(name);
        assert_eq!(result.path, dest);
        assert!(tools.calls().contains(&Call::Clone {
            url: TEMPLATE_URL.to_string(),
            dest: dest.clone()
        }));
        assert!(dest.join("package.json").is_file());
    }

    #[test]
    fn name_resolves_against_cwd() {
        let env = TestEnv::new();
        let nested = env.path().join("workspace");
        std::fs::create_dir(&nested).unwrap();
        let tools = FakeTools::new();

        let result = cmd_create("app", &nested, &tools, false).unwrap();
        assert_eq!(result.path, nested.join("app"));
    }

    fn sample_result(folder_name: &str) -> CreateResult {
        CreateResult {
            folder_name: OsString::from(folder_name),
            path: PathBuf::from("/tmp/work").join(folder_name),
            completed: Step::ALL.to_vec(),
            warnings: vec![],
        }
    }

    #[test]
    fn format_human_shows_next_steps() {
        let text = format_create_human(&sample_result("my-app"));
        assert!(text.contains("✓ Created my-app at /tmp/work/my-app"));
        assert!(text.contains("Next steps:"));
        assert!(text.contains("  cd my-app"));
        assert!(text.contains(&format!("  {}", DEV_COMMAND)));
        assert!(!text.contains("git init"));
        assert!(!text.contains("warning"));
    }

    #[test]
    fn format_human_quotes_names_with_spaces() {
        let text = format_create_human(&sample_result("My App"));
        assert!(text.contains("  cd 'My App'"), "{}", text);
    }

    #[test]
    fn shell_quote_blocks_expansion() {
        assert_eq!(shell_quote("my-app"), "my-app");
        assert_eq!(shell_quote("café"), "café");
        assert_eq!(shell_quote("a$b"), "'a$b'");
        assert_eq!(shell_quote("a`id`"), "'a`id`'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote("a\"b"), "'a\"b'");
    }

    #[test]
    fn format_human_suggests_git_init_after_warning() {
        let mut result = sample_result("my-app");
        result.completed = vec![Step::FetchTemplate, Step::InstallDependencies];
        result.warnings = vec!["Failed to initialize git repository: boom".to_string()];

        let text = format_create_human(&result);
        assert!(text.contains("(with 1 warning)"));
        assert!(text.contains("  git init"));
    }
}
