mod args;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use wispc::codegen;
use wispc::ir;
use wispc::output::Output;

use args::Arguments;

fn main() -> Result<()> {
    let args = Arguments::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let src = fs::read_to_string(&args.path)
        .with_context(|| format!("could not read {}", args.path.display()))?;
    let (names, functions) = ir::text::parse_program(&src)?;

    let mut out = Output::new();
    codegen::lower_program(&names, &mut out, &functions, args.annotate);

    let mut text = out.render(&names).join("\n");
    text.push('\n');

    match &args.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("could not write {}", path.display()))?,
        None => print!("{text}"),
    }

    Ok(())
}
