mod app;
mod cli;
mod commands;
mod config;
mod report;
mod testutil;
mod tools;
mod validate;

use anyhow::{Context, Result};
use cli::Invocation;
use tools::SystemTools;

fn main() {
    let invocation = cli::parse_args(std::env::args_os().skip(1));

    if let Err(e) = run(invocation) {
        eprintln!("{}", report::format_error(&e));
        std::process::exit(1);
    }
}

fn run(invocation: Invocation) -> Result<()> {
    if invocation.help {
        println!("{}", cli::help_text());
        return Ok(());
    }
    if invocation.version {
        println!("{}", app::VERSION);
        return Ok(());
    }

    let config = config::load_default_config()?;
    let tools = SystemTools::from_config(&config);
    let cwd = std::env::current_dir().context("failed to determine current directory")?;

    let result = commands::cmd_create(&invocation.folder_name, &cwd, &tools, config.debug)?;
    println!("{}", commands::format_create_human(&result));
    Ok(())
}
