pub const APP_NAME: &str = "create-starter";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_FOLDER_NAME: &str = "my-app";
pub const TEMPLATE_URL: &str = "https://github.com/create-starter/starter-template.git";
pub const DOCS_URL: &str = "https://github.com/create-starter/create-starter#readme";

/// Command suggested in the "next steps" banner.
pub const DEV_COMMAND: &str = "bun run dev";

/// Install commands printed when the package manager is missing.
pub const BUN_INSTALL_COMMANDS: &[&str] = &[
    "curl -fsSL https://bun.sh/install | bash",
    "npm install -g bun",
    "brew install oven-sh/bun/bun",
];
