use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Characters rejected in folder names on at least one common platform.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("folder name cannot be empty\n  hint: pass a name, e.g. `create-starter my-app`")]
    EmptyName,

    #[error("folder name {name:?} contains invalid character {ch:?}\n  hint: avoid < > : \" | ? * and control characters")]
    IllegalCharacter { name: String, ch: char },

    #[error("folder {} already exists\n  hint: choose a different name, or remove the existing folder", .0.display())]
    AlreadyExists(PathBuf),
}

/// A validated folder name and the absolute path it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub folder_name: OsString,
    pub path: PathBuf,
}

/// Checks run on the lossy form: invalid UTF-8 only ever becomes U+FFFD,
/// which is neither whitespace nor one of the rejected characters.
pub fn validate_folder_name(name: impl AsRef<OsStr>) -> Result<(), ValidationError> {
    let name = name.as_ref().to_string_lossy();
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let illegal = name
        .chars()
        .find(|c| ILLEGAL_CHARS.contains(c) || ('\u{0}'..='\u{1f}').contains(c));
    if let Some(ch) = illegal {
        return Err(ValidationError::IllegalCharacter {
            name: name.into_owned(),
            ch,
        });
    }

    Ok(())
}

/// Fails only when `path` is known to exist. Errors other than NotFound
/// (permission denied and friends) are left for the clone to report.
pub fn ensure_target_absent(path: &Path, debug: bool) -> Result<(), ValidationError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Err(ValidationError::AlreadyExists(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => {
            if debug {
                eprintln!(
                    "[debug] existence check for {} failed ({}), deferring to fetch",
                    path.display(),
                    e
                );
            }
            Ok(())
        }
    }
}

/// Runs both checks and resolves the folder name against `cwd`.
pub fn resolve_target(
    folder_name: impl AsRef<OsStr>,
    cwd: &Path,
    debug: bool,
) -> Result<Target, ValidationError> {
    let folder_name = folder_name.as_ref();
    validate_folder_name(folder_name)?;

    let path = cwd.join(folder_name);
    ensure_target_absent(&path, debug)?;

    Ok(Target {
        folder_name: folder_name.to_os_string(),
        path,
    })
}
