//! The session surface: reads free-text lines, handles the `help`/`quit`/
//! `inspect` meta-commands, and feeds instruction lines through the
//! preprocessor, validator and execution engine.
//!
//! Lines arrive from one of three sources: an argument string (split on
//! `;` and newlines), a script file, or stdin (with a prompt when attached
//! to a terminal).

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use console::Term;
use miette::{IntoDiagnostic, Result};

use crate::command::Command;
use crate::interp::Interpreter;
use crate::ops::Opcode;
use crate::output;
use crate::parse;
use crate::persist;
use crate::state::MachineState;

pub struct Session {
    state: MachineState,
    interp: Interpreter,
    /// Snapshot file bracketing each processed instruction, if configured.
    db: Option<PathBuf>,
}

#[derive(PartialEq, Eq)]
enum Reply {
    Continue,
    Quit,
}

impl Session {
    pub fn new(db: Option<PathBuf>) -> Self {
        Session {
            state: MachineState::new(),
            interp: Interpreter::new(),
            db,
        }
    }

    /// Interactive or piped REPL over stdin.
    pub fn repl(&mut self) -> Result<()> {
        if !output::is_minimal() {
            crate::echoln!(Always, "Welcome to the 8085 interpreter.");
            crate::echoln!(
                Always,
                "Type `help` for a list of instructions, `quit` to leave.",
            );
        }

        let interactive = console::user_attended();
        let term = Term::stdout();
        let stdin = io::stdin();
        loop {
            if interactive && !output::is_minimal() {
                term.write_str(">>> ").into_diagnostic()?;
            }
            let mut line = String::new();
            let read = stdin.lock().read_line(&mut line).into_diagnostic()?;
            if read == 0 {
                break;
            }
            if self.handle_line(&line) == Reply::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Execute a script of instruction lines from a file.
    pub fn run_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).into_diagnostic()?;
        for line in text.lines() {
            if self.handle_line(line) == Reply::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Execute commands given directly on the command line, separated by
    /// `;` or newlines.
    pub fn run_argument(&mut self, commands: &str) -> Result<()> {
        for line in commands.split([';', '\n']) {
            if self.handle_line(line) == Reply::Quit {
                break;
            }
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Reply {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Reply::Continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") {
            return Reply::Quit;
        }
        if trimmed.eq_ignore_ascii_case("help") {
            self.print_help();
            return Reply::Continue;
        }
        if trimmed.eq_ignore_ascii_case("inspect") {
            match self.restore() {
                Ok(()) => output::print_state(&self.state),
                Err(report) => eprintln!("{:?}", report),
            }
            return Reply::Continue;
        }

        if let Err(report) = self.instruction(line) {
            eprintln!("{:?}", report);
        }
        Reply::Continue
    }

    /// One instruction line: parse, validate, append, execute, with the
    /// persistence bracket around it. Every failure leaves the machine
    /// state unmutated by the failing line.
    fn instruction(&mut self, line: &str) -> Result<()> {
        let Some(parsed) = parse::parse_line(line)? else {
            return Ok(());
        };
        let command = Command::new(parsed);
        if let Some(fault) = command.fault() {
            return Err(fault.report(command.opcode(), line));
        }

        self.restore()?;
        self.interp.add(command)?;
        let run = self.interp.execute_next(&mut self.state);
        self.save()?;
        run
    }

    fn restore(&mut self) -> Result<()> {
        match &self.db {
            Some(path) => persist::restore(path, &mut self.state),
            None => Ok(()),
        }
    }

    fn save(&self) -> Result<()> {
        match &self.db {
            Some(path) => persist::save(path, &self.state),
            None => Ok(()),
        }
    }

    fn print_help(&self) {
        crate::echoln!(Always, "instructions:");
        for op in Opcode::ALL {
            let spec = op.spec();
            let params = spec
                .params
                .iter()
                .map(|param| param.name)
                .collect::<Vec<_>>()
                .join(", ");
            crate::echoln!(
                Always,
                "  {:<5} {:<18} {}",
                spec.mnemonic,
                params,
                spec.description,
            );
        }
        crate::echoln!(Always, "meta: help | inspect | quit");
    }
}
