//! The program log and execution engine.
//!
//! Instructions are only ever appended, never edited. Labels index into the
//! log and are unique across the whole session. A jump to a label that
//! already exists replays the log forward from that point; a jump to a
//! label that has not been defined yet suspends execution until an appended
//! instruction carries it.

use miette::Result;

use crate::command::Command;
use crate::error;
use crate::state::{FxMap, MachineState};

/// Where the engine picks up execution on the next pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Cursor {
    /// Steady state: the next instruction to run is the newest entry.
    Latest,
    /// A jump re-aimed execution at an existing log index.
    At(usize),
}

/// Engine status.
#[derive(Clone, PartialEq, Eq, Debug)]
enum Status {
    Running,
    /// Blocked on a label that has not been defined yet. Nothing executes
    /// until an appended instruction carries it.
    Suspended { awaiting: String },
}

pub struct Interpreter {
    log: Vec<Command>,
    labels: FxMap<String, usize>,
    cursor: Cursor,
    status: Status,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            log: Vec::new(),
            labels: FxMap::default(),
            cursor: Cursor::Latest,
            status: Status::Running,
        }
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.status, Status::Suspended { .. })
    }

    /// Append a command to the log. Fails on a duplicate label definition,
    /// leaving the log unchanged.
    ///
    /// Appending runs in both engine states. While suspended, a fresh label
    /// matching the awaited one resumes the engine, but the resuming
    /// instruction itself is only recorded, not executed.
    pub fn add(&mut self, command: Command) -> Result<usize> {
        let label = command.label().map(str::to_string);
        if let Some(name) = &label {
            if let Some(&existing) = self.labels.get(name) {
                return Err(error::duplicate_label(name, existing));
            }
            self.labels.insert(name.clone(), self.log.len());
        }
        self.log.push(command);

        if let Status::Suspended { awaiting } = &self.status {
            if label.as_deref() == Some(awaiting.as_str()) {
                crate::echoln!(Always, "label `{}` defined, resuming", awaiting);
                self.status = Status::Running;
                self.cursor = Cursor::Latest;
            }
        }

        Ok(self.log.len() - 1)
    }

    /// Run the engine forward: evaluate the newest entry, following any
    /// resolvable jumps by replaying the log from their target to its end.
    ///
    /// A jump to an unknown label suspends the engine; the instruction that
    /// issued it has already taken effect. An evaluation error aborts the
    /// current pass with the cursor reset and is returned to the caller.
    pub fn execute_next(&mut self, state: &mut MachineState) -> Result<()> {
        if let Status::Suspended { awaiting } = &self.status {
            crate::echoln!(Sometimes, "suspended, waiting for label `{}`", awaiting);
            return Ok(());
        }

        let mut index = match self.cursor {
            Cursor::Latest => match self.log.len().checked_sub(1) {
                Some(newest) => newest,
                None => return Ok(()),
            },
            Cursor::At(index) => index,
        };

        loop {
            let command = &self.log[index];
            let jump = match command.eval(state) {
                Ok(jump) => jump,
                Err(report) => {
                    self.cursor = Cursor::Latest;
                    return Err(report);
                }
            };

            if let Some(target) = jump {
                match self.labels.get(&target) {
                    Some(&at) => {
                        crate::echoln!(Sometimes, "-> {}", target);
                        index = at;
                        self.cursor = Cursor::At(at);
                        continue;
                    }
                    None => {
                        crate::echoln!(Always, "waiting for label `{}`", target);
                        self.status = Status::Suspended { awaiting: target };
                        self.cursor = Cursor::Latest;
                        return Ok(());
                    }
                }
            }

            index += 1;
            if index >= self.log.len() {
                self.cursor = Cursor::Latest;
                return Ok(());
            }
            self.cursor = Cursor::At(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_line;
    use crate::symbol::Register;

    fn cmd(text: &str) -> Command {
        Command::new(parse_line(text).unwrap().unwrap())
    }

    /// Append a line and run the engine over it, as the session does.
    fn push(interp: &mut Interpreter, state: &mut MachineState, text: &str) {
        interp.add(cmd(text)).unwrap();
        interp.execute_next(state).unwrap();
    }

    #[test]
    fn executes_only_the_newest_entry() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "MVI A 01H");
        push(&mut interp, &mut state, "MVI B 02H");
        assert_eq!(state.accumulator(), 0x01);
        assert_eq!(state.read(Register::B), 0x02);
        assert_eq!(interp.len(), 2);
    }

    #[test]
    fn duplicate_labels_are_rejected_without_appending() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "LOOP: MVI A 01H");
        assert!(interp.add(cmd("LOOP: MVI A 02H")).is_err());
        assert_eq!(interp.len(), 1);
    }

    #[test]
    fn backward_jump_replays_side_effects() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "MVI A 03H");
        push(&mut interp, &mut state, "LOOP: SUI 01H");
        // Replays SUI until the accumulator reaches zero: 2, 1, 0.
        push(&mut interp, &mut state, "JNZ LOOP");
        assert_eq!(state.accumulator(), 0x00);
        assert!(state.flags().zero);
        assert!(!interp.is_suspended());
    }

    #[test]
    fn forward_jump_suspends_until_the_label_arrives() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "MVI A 01H");
        // Zero flag is clear, so this jumps to a label that does not exist.
        push(&mut interp, &mut state, "JNZ FWD");
        assert!(interp.is_suspended());

        // Recorded but not evaluated; unrelated labels do not resume.
        push(&mut interp, &mut state, "OTHER: MVI A 05H");
        assert!(interp.is_suspended());
        assert_eq!(state.accumulator(), 0x01);

        // The awaited label resumes the engine. The append itself does not
        // execute anything, but the execute_next that follows proceeds from
        // the end of the log, which is now the resuming instruction.
        interp.add(cmd("FWD: MVI A 09H")).unwrap();
        assert!(!interp.is_suspended());
        assert_eq!(state.accumulator(), 0x01);
        interp.execute_next(&mut state).unwrap();
        assert_eq!(state.accumulator(), 0x09);

        // Instructions recorded while suspended stay skipped.
        push(&mut interp, &mut state, "MVI B 0AH");
        assert_eq!(state.read(Register::B), 0x0A);
        assert_eq!(state.accumulator(), 0x09);
    }

    #[test]
    fn execute_next_is_a_no_op_while_suspended() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "MVI A 01H");
        push(&mut interp, &mut state, "JNZ FWD");
        assert!(interp.is_suspended());
        interp.execute_next(&mut state).unwrap();
        assert!(interp.is_suspended());
        assert_eq!(state.accumulator(), 0x01);
    }

    #[test]
    fn replay_reexecutes_intermediate_entries() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "MVI A 02H");
        push(&mut interp, &mut state, "LOOP: DCR A");
        push(&mut interp, &mut state, "MOV B A");
        // Replays DCR and MOV once more before the jump falls through.
        push(&mut interp, &mut state, "JNZ LOOP");
        assert_eq!(state.accumulator(), 0x00);
        assert_eq!(state.read(Register::B), 0x00);
    }

    #[test]
    fn evaluation_errors_abort_the_pass_and_reset_the_cursor() {
        let mut interp = Interpreter::new();
        let mut state = MachineState::new();
        push(&mut interp, &mut state, "LXI H 0000H");
        interp.add(cmd("DCX H")).unwrap();
        assert!(interp.execute_next(&mut state).is_err());
        assert_eq!(state.read_pair(crate::symbol::Pair::HL), 0x0000);

        // The engine recovers: the next append executes normally.
        push(&mut interp, &mut state, "MVI A 07H");
        assert_eq!(state.accumulator(), 0x07);
    }
}
