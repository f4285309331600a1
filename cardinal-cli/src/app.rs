use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cardinal - ahead-of-time compiler front end for CIL programs
#[derive(Debug, Parser)]
#[command(name = "cardinal", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a program description into a program image.
    Compile {
        /// Path to the program description (XML).
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// Entry point as `Namespace.Type::Method` or a method token (repeatable).
        #[arg(short, long, value_name = "ENTRY", required = true)]
        entry: Vec<String>,

        /// Resolver configuration with substitutions and native bindings.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Target pointer size in bytes (4 or 8).
        #[arg(long, default_value_t = 8)]
        pointer_size: u32,

        /// Skip compiling methods reachable only through vtable slots.
        #[arg(long)]
        no_dispatch: bool,

        /// Path of the image to write.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the contents of a program image.
    Dump {
        /// Path to the program image.
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Show only methods whose name contains this text.
        #[arg(long, value_name = "NAME")]
        method: Option<String>,

        /// List every token of the selected methods.
        #[arg(long)]
        tokens: bool,
    },

    /// Compute and print the dispatch tables of a program.
    Vtables {
        /// Path to the program description (XML).
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// Entry point as `Namespace.Type::Method` or a method token (repeatable).
        #[arg(short, long, value_name = "ENTRY", required = true)]
        entry: Vec<String>,

        /// Resolver configuration with substitutions and native bindings.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Target pointer size in bytes (4 or 8).
        #[arg(long, default_value_t = 8)]
        pointer_size: u32,

        /// Show only the table of this mangled type name.
        #[arg(long, value_name = "NAME")]
        r#type: Option<String>,
    },
}
