//! On-disk snapshot of machine state, bracketing each processed command.
//!
//! The snapshot is a JSON object with two members, `registers` and `memory`,
//! both flat string-to-string maps of bare fixed-width hex. A missing or
//! empty file means "start from defaults", never an error.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use crate::error;
use crate::state::MachineState;
use crate::symbol::Register;

#[derive(Serialize, Deserialize, Default, PartialEq, Eq, Debug)]
pub struct Snapshot {
    pub registers: BTreeMap<String, String>,
    pub memory: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn capture(state: &MachineState) -> Self {
        let registers = state
            .registers()
            .map(|(reg, value)| (reg.name().to_string(), format!("{value:02x}")))
            .collect();
        let memory = state
            .memory()
            .into_iter()
            .map(|(addr, value)| (format!("{addr:04x}"), format!("{value:02x}")))
            .collect();
        Snapshot { registers, memory }
    }

    /// Rebuild register and memory contents from the snapshot. Flags are
    /// per-session and not part of the format, so they are carried over.
    ///
    /// Register entries apply in key order; `M`, when present, sorts after
    /// `H` and `L` and therefore redirects through the restored pair.
    pub fn apply(&self, state: &mut MachineState) -> Result<()> {
        let flags = state.flags();
        let mut fresh = MachineState::new();
        fresh.set_flags(flags);

        for (name, value) in &self.registers {
            let reg: Register = name
                .parse()
                .map_err(|()| error::snapshot_entry("registers", name, value))?;
            let value = u8::from_str_radix(value, 16)
                .map_err(|_| error::snapshot_entry("registers", name, value))?;
            fresh.write(reg, value);
        }
        for (addr, value) in &self.memory {
            let parsed_addr = u16::from_str_radix(addr, 16)
                .map_err(|_| error::snapshot_entry("memory", addr, value))?;
            let parsed_value = u8::from_str_radix(value, 16)
                .map_err(|_| error::snapshot_entry("memory", addr, value))?;
            fresh.write_mem(parsed_addr, parsed_value);
        }

        *state = fresh;
        Ok(())
    }
}

/// Read the snapshot at `path` into `state`. A missing or empty file leaves
/// the state untouched.
pub fn restore(path: &Path, state: &mut MachineState) -> Result<()> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).into_diagnostic(),
    };
    if text.trim().is_empty() {
        return Ok(());
    }
    let snapshot: Snapshot =
        serde_json::from_str(&text).map_err(|e| error::snapshot_parse(path, e))?;
    snapshot.apply(state)
}

/// Write the full snapshot of `state` to `path`.
pub fn save(path: &Path, state: &MachineState) -> Result<()> {
    let snapshot = Snapshot::capture(state);
    let text = serde_json::to_string_pretty(&snapshot).into_diagnostic()?;
    fs::write(path, text).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Pair;

    #[test]
    fn snapshot_round_trips_registers_and_memory() {
        let mut state = MachineState::new();
        state.write(Register::A, 0x2A);
        state.write_pair(Pair::HL, 0x1234);
        state.write_mem(0x1234, 0x56);
        state.write_mem(0x0001, 0xFF);

        let snapshot = Snapshot::capture(&state);
        let mut restored = MachineState::new();
        snapshot.apply(&mut restored).unwrap();

        assert_eq!(Snapshot::capture(&restored), snapshot);
        assert_eq!(restored.accumulator(), 0x2A);
        assert_eq!(restored.read_pair(Pair::HL), 0x1234);
        assert_eq!(restored.read_mem(0x1234), 0x56);
        assert_eq!(restored.read_mem(0x0001), 0xFF);
    }

    #[test]
    fn apply_preserves_session_flags() {
        let mut state = MachineState::new();
        state.set_arith_flags(true, false, true);
        Snapshot::default().apply(&mut state).unwrap();
        assert!(state.flags().carry);
        assert!(state.flags().zero);
    }

    #[test]
    fn apply_rejects_unknown_registers_and_bad_hex() {
        let mut snapshot = Snapshot::default();
        snapshot
            .registers
            .insert("Q".to_string(), "00".to_string());
        assert!(snapshot.apply(&mut MachineState::new()).is_err());

        let mut snapshot = Snapshot::default();
        snapshot
            .memory
            .insert("zzzz".to_string(), "00".to_string());
        assert!(snapshot.apply(&mut MachineState::new()).is_err());
    }

    #[test]
    fn restore_of_missing_file_is_not_an_error() {
        let mut state = MachineState::new();
        state.write(Register::B, 0x07);
        let path = std::env::temp_dir().join("ember-no-such-snapshot.json");
        restore(&path, &mut state).unwrap();
        assert_eq!(state.read(Register::B), 0x07);
    }

    #[test]
    fn save_then_restore_reproduces_the_file_contents() {
        let mut state = MachineState::new();
        state.write(Register::D, 0x11);
        state.write_mem(0x0100, 0x22);

        let path = std::env::temp_dir().join("ember-snapshot-round-trip.json");
        save(&path, &state).unwrap();

        let mut restored = MachineState::new();
        restore(&path, &mut restored).unwrap();
        assert_eq!(restored.read(Register::D), 0x11);
        assert_eq!(restored.read_mem(0x0100), 0x22);

        let _ = fs::remove_file(&path);
    }
}
