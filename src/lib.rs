// Instruction set and validation
mod ops;
pub use ops::Opcode;
mod command;
pub use command::Command;

// Machine state
mod state;
pub use state::MachineState;

// Program log and execution engine
mod interp;
pub use interp::Interpreter;

// Line preprocessing
mod parse;

// Session surface and persistence
mod session;
pub use session::Session;
mod persist;

mod error;
mod symbol;
pub use symbol::{Pair, Register};

#[macro_use]
pub mod output;
