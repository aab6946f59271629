//! Output channels: an echo channel on stderr for interpreter chatter, and
//! the display sink on stdout used by the OUT instruction.

use std::cell::RefCell;

use colored::{ColoredString, Colorize};

use crate::state::MachineState;

/// Gate for echo output. `Sometimes` chatter is silenced in minimal mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Condition {
    Always,
    Sometimes,
}

#[macro_export]
macro_rules! echoln {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::echo($cond, &s);
    }};
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

pub fn echo(condition: Condition, text: &str) {
    match (is_minimal(), condition) {
        (false, _) => eprint!("{}", ColoredString::from(text).blue()),
        // Strip color if `--minimal`
        (true, Condition::Always) => eprint!("{}", text),
        (true, Condition::Sometimes) => (),
    }
}

/// Display sink for the OUT instruction: unconditional, on stdout.
pub fn display(label: &str, value: u8) {
    println!("{} -> {}", label, fmt_byte(value));
}

pub fn fmt_byte(value: u8) -> String {
    format!("{value:02X}H")
}

pub fn fmt_word(value: u16) -> String {
    format!("{value:04X}H")
}

/// Read-only dump of registers, flags and populated memory.
pub fn print_state(state: &MachineState) {
    crate::echoln!(Always, "registers:");
    for (reg, value) in state.registers() {
        crate::echoln!(Always, "  {}  {}", reg, fmt_byte(value));
    }
    let flags = state.flags();
    crate::echoln!(
        Always,
        "flags: C={} AC={} Z={} S={}",
        flags.carry as u8,
        flags.aux_carry as u8,
        flags.zero as u8,
        flags.sign as u8,
    );
    let cells = state.memory();
    if cells.is_empty() {
        crate::echoln!(Always, "memory: (empty)");
    } else {
        crate::echoln!(Always, "memory:");
        for (addr, value) in cells {
            crate::echoln!(Always, "  {}  {}", fmt_word(addr), fmt_byte(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_and_words_format_fixed_width() {
        assert_eq!(fmt_byte(0x00), "00H");
        assert_eq!(fmt_byte(0x3C), "3CH");
        assert_eq!(fmt_word(0x0001), "0001H");
        assert_eq!(fmt_word(0x3344), "3344H");
    }
}
