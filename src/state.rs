//! Machine state: register file, memory, and flags.

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::symbol::{Pair, Register};

pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Processor flags, recomputed only by arithmetic, compare, increment and
/// decrement instructions.
///
/// Auxiliary carry is reserved: no implemented opcode computes it, so it
/// stays false.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Flags {
    pub carry: bool,
    pub aux_carry: bool,
    pub zero: bool,
    pub sign: bool,
}

/// Represents complete machine state: seven byte registers, a sparse
/// byte-addressable memory, and the flag register.
///
/// Memory reads of never-written addresses yield `00`. The `u8`/`u16` types
/// carry the bit-width invariant at every write point.
#[derive(Clone, Debug, Default)]
pub struct MachineState {
    reg: [u8; 7],
    mem: FxMap<u16, u8>,
    flags: Flags,
}

impl MachineState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(reg: Register) -> usize {
        match reg {
            Register::A => 0,
            Register::B => 1,
            Register::C => 2,
            Register::D => 3,
            Register::E => 4,
            Register::H => 5,
            Register::L => 6,
            Register::M => unreachable!("M has no storage slot"),
        }
    }

    /// Read a register by name. `M` redirects to the memory cell addressed
    /// by the H/L pair.
    pub fn read(&self, reg: Register) -> u8 {
        match reg {
            Register::M => self.read_mem(self.addr_of_pair(Pair::HL)),
            _ => self.reg[Self::slot(reg)],
        }
    }

    /// Write a register by name, with the same `M` redirection as [`read`].
    ///
    /// [`read`]: MachineState::read
    pub fn write(&mut self, reg: Register, value: u8) {
        match reg {
            Register::M => {
                let addr = self.addr_of_pair(Pair::HL);
                self.write_mem(addr, value);
            }
            _ => self.reg[Self::slot(reg)] = value,
        }
    }

    /// The 16-bit value encoded by a pair: high register, then low.
    pub fn read_pair(&self, pair: Pair) -> u16 {
        u16::from_be_bytes([self.read(pair.hi()), self.read(pair.lo())])
    }

    /// Split a 16-bit value into a pair's two registers.
    pub fn write_pair(&mut self, pair: Pair, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write(pair.hi(), hi);
        self.write(pair.lo(), lo);
    }

    /// The memory address encoded by a pair, used by indirect load/store and
    /// pair increment/decrement.
    pub fn addr_of_pair(&self, pair: Pair) -> u16 {
        self.read_pair(pair)
    }

    pub fn read_mem(&self, addr: u16) -> u8 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    pub fn write_mem(&mut self, addr: u16, value: u8) {
        self.mem.insert(addr, value);
    }

    pub fn accumulator(&self) -> u8 {
        self.read(Register::A)
    }

    pub fn set_accumulator(&mut self, value: u8) {
        self.write(Register::A, value);
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Replace the whole flag register. Used when rehydrating state; the
    /// snapshot format carries registers and memory only, so flags survive
    /// the restore.
    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Update the three arithmetic flags together. Auxiliary carry is left
    /// untouched.
    pub fn set_arith_flags(&mut self, carry: bool, sign: bool, zero: bool) {
        self.flags.carry = carry;
        self.flags.sign = sign;
        self.flags.zero = zero;
    }

    /// The named registers and their current values, in display order.
    pub fn registers(&self) -> impl Iterator<Item = (Register, u8)> + '_ {
        Register::NAMED.into_iter().map(|reg| (reg, self.read(reg)))
    }

    /// Every memory cell that has been written, sorted by address.
    pub fn memory(&self) -> Vec<(u16, u8)> {
        let mut cells: Vec<(u16, u8)> = self.mem.iter().map(|(&a, &v)| (a, v)).collect();
        cells.sort_unstable_by_key(|&(addr, _)| addr);
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_defaults_to_zero() {
        let state = MachineState::new();
        assert_eq!(state.read_mem(0x0000), 0x00);
        assert_eq!(state.read_mem(0xFFFF), 0x00);
        assert!(state.memory().is_empty());
    }

    #[test]
    fn pair_write_splits_and_read_merges() {
        let mut state = MachineState::new();
        state.write_pair(Pair::HL, 0x3344);
        assert_eq!(state.read(Register::H), 0x33);
        assert_eq!(state.read(Register::L), 0x44);
        assert_eq!(state.read_pair(Pair::HL), 0x3344);
        assert_eq!(state.addr_of_pair(Pair::HL), 0x3344);
    }

    #[test]
    fn m_redirects_to_memory_at_hl() {
        let mut state = MachineState::new();
        state.write_pair(Pair::HL, 0x3344);

        state.write(Register::M, 0x2A);
        assert_eq!(state.read_mem(0x3344), 0x2A);
        assert_eq!(state.read(Register::M), 0x2A);

        // Re-aiming the pair moves the redirection with it.
        state.write_pair(Pair::HL, 0x0001);
        assert_eq!(state.read(Register::M), 0x00);
        state.write_mem(0x0001, 0x7F);
        assert_eq!(state.read(Register::M), 0x7F);
    }

    #[test]
    fn arith_flags_leave_aux_carry_alone() {
        let mut state = MachineState::new();
        state.set_arith_flags(true, true, false);
        let flags = state.flags();
        assert!(flags.carry && flags.sign && !flags.zero);
        assert!(!flags.aux_carry);
    }

    #[test]
    fn memory_listing_is_sorted() {
        let mut state = MachineState::new();
        state.write_mem(0x2000, 0x02);
        state.write_mem(0x1000, 0x01);
        state.write_mem(0x3000, 0x03);
        assert_eq!(
            state.memory(),
            vec![(0x1000, 0x01), (0x2000, 0x02), (0x3000, 0x03)]
        );
    }
}
