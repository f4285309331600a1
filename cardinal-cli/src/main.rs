mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Show cardinal info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("cardinal", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Compile {
            program,
            entry,
            config,
            pointer_size,
            no_dispatch,
            output,
        } => commands::compile::run(
            program,
            &commands::common::Setup {
                entries: entry,
                config: config.as_deref(),
                pointer_size: *pointer_size,
                dispatch_targets: !*no_dispatch,
            },
            output,
            &cli.global,
        ),
        Command::Dump {
            image,
            method,
            tokens,
        } => commands::dump::run(image, method.as_deref(), *tokens, &cli.global),
        Command::Vtables {
            program,
            entry,
            config,
            pointer_size,
            r#type,
        } => commands::vtables::run(
            program,
            &commands::common::Setup {
                entries: entry,
                config: config.as_deref(),
                pointer_size: *pointer_size,
                dispatch_targets: true,
            },
            r#type.as_deref(),
            &cli.global,
        ),
    }
}
