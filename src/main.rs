use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use log::debug;

mod bytecode;
mod error;
mod lex;
mod ops;
mod parse;
mod value;
mod vm;

/// Runs a WinZig stack machine program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// bytecode program
    program: Option<PathBuf>,

    /// print each instruction, LBR and the stack before it executes
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let Some(path) = cli.program else {
        println!("{}", Cli::command().render_usage());
        return Ok(());
    };
    let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
    let program =
        parse::load(file).with_context(|| format!("cannot load {}", path.display()))?;

    let mut vm = vm::ExeState::new().with_trace(cli.debug);
    let mut input = io::stdin().lock();
    let mut output = BufWriter::new(io::stdout().lock());
    vm.execute(&program, &mut input, &mut output)?;
    debug!("final registers: {:?}", vm.registers());

    Ok(())
}
