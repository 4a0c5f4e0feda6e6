/// Commands return result structs instead of printing a summary directly;
/// main.rs renders them with the matching `format_*_human`.
mod create;

pub use create::*;
