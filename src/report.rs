//! Console output for the create workflow. Progress goes to stdout,
//! warnings and errors to stderr.

pub fn step_started(label: &str) {
    println!("→ {}...", label);
}

pub fn step_finished(label: &str) {
    println!("✓ {}", label);
}

pub fn warning(message: &str, hint: &str) {
    eprintln!("{}", format_warning(message, hint));
}

pub fn format_warning(message: &str, hint: &str) -> String {
    format!("⚠ Warning: {}\n  hint: {}", message, hint)
}

/// The error printed for a fatal failure. `{:#}` keeps the whole context
/// chain: "Failed to fetch template: git clone ... failed". Only indented
/// `hint:` or detail lines may follow the `✗ Error:` line.
pub fn format_error(err: &anyhow::Error) -> String {
    format!("✗ Error: {:#}", err)
}
