use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use ember::{output, Session};

/// Ember is an interactive interpreter for the Intel 8085 instruction set.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Snapshot file to restore and save machine state around each command
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long, global = true)]
    minimal: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a script of instruction lines from a file
    Run {
        /// Script file to execute
        name: PathBuf,
    },
    /// Execute instructions given directly, separated by `;`
    Eval {
        /// Instructions to execute
        #[arg(short, long)]
        commands: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    output::set_minimal(args.minimal);

    let mut session = Session::new(args.db);
    match args.command {
        Some(Command::Run { name }) => session.run_file(&name),
        Some(Command::Eval { commands }) => session.run_argument(&commands),
        None => session.repl(),
    }
}
