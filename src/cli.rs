use clap::{Arg, ArgAction, Command};
use std::ffi::OsString;

use crate::app::{APP_NAME, BUN_INSTALL_COMMANDS, DEFAULT_FOLDER_NAME, DEV_COMMAND, DOCS_URL};

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub folder_name: OsString,
    pub help: bool,
    pub version: bool,
}

/// Permissive scan of the raw arguments (program name already stripped).
///
/// The first argument that doesn't look like a flag becomes the folder name.
/// Help and version flags are picked up wherever they appear; anything else
/// starting with `-`, and any extra positional, is ignored. Arguments are
/// taken as `OsString` since folder names need not be UTF-8.
pub fn parse_args<I, S>(args: I) -> Invocation
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut folder_name = None;
    let mut help = false;
    let mut version = false;

    for arg in args {
        let arg = arg.into();
        match arg.to_str() {
            Some("--help" | "-h") => help = true,
            Some("--version" | "-v") => version = true,
            _ if arg.as_encoded_bytes().starts_with(b"-") => {}
            _ => {
                if folder_name.is_none() {
                    folder_name = Some(arg);
                }
            }
        }
    }

    Invocation {
        folder_name: folder_name.unwrap_or_else(|| OsString::from(DEFAULT_FOLDER_NAME)),
        help,
        version,
    }
}

/// Declared command-line interface, used to render `--help`.
pub fn command() -> Command {
    Command::new(APP_NAME)
        .about("Scaffold a new project from the starter template")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("folder-name")
                .value_name("FOLDER_NAME")
                .help(format!(
                    "Folder to create the project in (default: {})",
                    DEFAULT_FOLDER_NAME
                )),
        )
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue)
                .help("Print this help and exit"),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print the version and exit"),
        )
        .after_help(after_help())
}

fn after_help() -> String {
    let mut lines = vec![
        "Examples:".to_string(),
        format!("  {}              Create ./{}", APP_NAME, DEFAULT_FOLDER_NAME),
        format!("  {} my-project   Create ./my-project", APP_NAME),
        String::new(),
        "Requirements:".to_string(),
        "  git   used to fetch the template and initialize the repository".to_string(),
        "  bun   used to install dependencies; install it with one of:".to_string(),
    ];
    for cmd in BUN_INSTALL_COMMANDS {
        lines.push(format!("          {}", cmd));
    }
    lines.push(String::new());
    lines.push(format!(
        "After creating a project, `cd` into it and run `{}`.",
        DEV_COMMAND
    ));
    lines.push(format!("Documentation: {}", DOCS_URL));
    lines.join("\n")
}

pub fn help_text() -> String {
    command().render_help().to_string()
}
