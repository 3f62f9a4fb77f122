use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// a code generator for a small word-addressed register machine.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Arguments {
    /// Write the assembly here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Interleave the source tokens as comments in the output.
    #[arg(long, action = ArgAction::SetTrue)]
    pub annotate: bool,

    /// Print more about what the compiler is doing. Repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(required = true)]
    pub path: PathBuf,
}
