//! A single validated instruction and its opcode semantics.
//!
//! Validation happens once, at construction: the argument count must match
//! the table arity exactly, and each argument must satisfy its parameter
//! constraint. An invalid instruction is still constructed, carrying its
//! fault for reporting, but is never evaluated.

use std::cmp::Ordering;

use miette::{Report, Result};

use crate::error;
use crate::ops::{Opcode, ParamKind};
use crate::output::{self, fmt_byte, fmt_word};
use crate::parse::{Arg, ParsedLine, Token};
use crate::state::MachineState;
use crate::symbol::{Pair, Register, Span};

/// One operand, resolved against the table's parameter kinds.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Reg(Register),
    Pair(Pair),
    Byte(u8),
    Word(u16),
    Label(String),
}

/// Why a command failed validation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Fault {
    Arity {
        expected: usize,
        got: usize,
        span: Span,
    },
    Constraint {
        param: &'static str,
        kind: ParamKind,
        span: Span,
    },
}

impl Fault {
    pub fn report(&self, opcode: Opcode, line: &str) -> Report {
        match self {
            Fault::Arity {
                expected,
                got,
                span,
            } => error::command_arity(opcode.spec().mnemonic, *expected, *got, *span, line),
            Fault::Constraint { param, kind, span } => {
                error::command_constraint(param, *kind, *span, line)
            }
        }
    }
}

/// An instruction instance, immutable once validated.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Command {
    opcode: Opcode,
    operands: Vec<Operand>,
    label: Option<String>,
    fault: Option<Fault>,
}

impl Command {
    pub fn new(parsed: ParsedLine) -> Self {
        let ParsedLine {
            label,
            opcode,
            mnemonic_span,
            args,
        } = parsed;

        let params = opcode.spec().params;
        if args.len() != params.len() {
            return Command {
                opcode,
                operands: Vec::new(),
                label,
                fault: Some(Fault::Arity {
                    expected: params.len(),
                    got: args.len(),
                    span: mnemonic_span,
                }),
            };
        }

        let mut operands = Vec::with_capacity(args.len());
        let mut fault = None;
        for (arg, param) in args.into_iter().zip(params) {
            let Arg { token, span } = arg;
            let constraint = Fault::Constraint {
                param: param.name,
                kind: param.kind,
                span,
            };
            let operand = match (param.kind, token) {
                (ParamKind::Reg, Token::Symbol(s)) => match s.parse::<Register>() {
                    Ok(reg) => Operand::Reg(reg),
                    Err(()) => {
                        fault = Some(constraint);
                        break;
                    }
                },
                (ParamKind::Pair, Token::Symbol(s)) => match s.parse::<Pair>() {
                    Ok(pair) => Operand::Pair(pair),
                    Err(()) => {
                        fault = Some(constraint);
                        break;
                    }
                },
                (ParamKind::Byte, Token::Byte(value)) => Operand::Byte(value),
                (ParamKind::Word, Token::Word(value)) => Operand::Word(value),
                (ParamKind::Label, Token::Symbol(s)) if !s.contains(':') => Operand::Label(s),
                (_, _) => {
                    fault = Some(constraint);
                    break;
                }
            };
            operands.push(operand);
        }
        if fault.is_some() {
            operands.clear();
        }

        Command {
            opcode,
            operands,
            label,
            fault,
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Evaluate against the machine state. `Ok(Some(label))` requests a
    /// control transfer; resolving it is the execution engine's job.
    pub fn eval(&self, state: &mut MachineState) -> Result<Option<String>> {
        debug_assert!(self.is_valid(), "invalid instructions are never evaluated");
        match self.opcode {
            Opcode::Mov => self.mov(state),
            Opcode::Mvi => self.mvi(state),
            Opcode::Lxi => self.lxi(state),
            Opcode::Lda => self.lda(state),
            Opcode::Sta => self.sta(state),
            Opcode::Ldax => self.ldax(state),
            Opcode::Stax => self.stax(state),
            Opcode::Add => self.add(state),
            Opcode::Adi => self.adi(state),
            Opcode::Sub => self.sub(state),
            Opcode::Sui => self.sui(state),
            Opcode::Cmp => self.cmp(state),
            Opcode::Cpi => self.cpi(state),
            Opcode::Inr => self.inr(state),
            Opcode::Dcr => self.dcr(state),
            Opcode::Inx => self.inx(state),
            Opcode::Dcx => self.dcx(state),
            Opcode::Jmp => Ok(Some(self.target(0).to_string())),
            Opcode::Jz => Ok(self.jump_if(state.flags().zero)),
            Opcode::Jnz => Ok(self.jump_if(!state.flags().zero)),
            Opcode::Jc => Ok(self.jump_if(state.flags().carry)),
            Opcode::Jnc => Ok(self.jump_if(!state.flags().carry)),
            Opcode::Out => self.out(state),
            Opcode::Hlt => self.hlt(),
        }
    }

    // Operand accessors. Only called on validated commands.

    fn reg(&self, idx: usize) -> Register {
        match &self.operands[idx] {
            Operand::Reg(reg) => *reg,
            _ => unreachable!("operand was validated as a register"),
        }
    }

    fn pair(&self, idx: usize) -> Pair {
        match &self.operands[idx] {
            Operand::Pair(pair) => *pair,
            _ => unreachable!("operand was validated as a pair"),
        }
    }

    fn byte(&self, idx: usize) -> u8 {
        match &self.operands[idx] {
            Operand::Byte(value) => *value,
            _ => unreachable!("operand was validated as a byte"),
        }
    }

    fn word(&self, idx: usize) -> u16 {
        match &self.operands[idx] {
            Operand::Word(value) => *value,
            _ => unreachable!("operand was validated as a word"),
        }
    }

    fn target(&self, idx: usize) -> &str {
        match &self.operands[idx] {
            Operand::Label(name) => name,
            _ => unreachable!("operand was validated as a label"),
        }
    }

    // Move family: pure copies, no flag effect.

    fn mov(&self, state: &mut MachineState) -> Result<Option<String>> {
        let (dst, src) = (self.reg(0), self.reg(1));
        let value = state.read(src);
        state.write(dst, value);
        crate::echoln!(Sometimes, "{} -> {} [from {}]", dst, fmt_byte(value), src);
        Ok(None)
    }

    fn mvi(&self, state: &mut MachineState) -> Result<Option<String>> {
        let (reg, value) = (self.reg(0), self.byte(1));
        state.write(reg, value);
        crate::echoln!(Sometimes, "{} -> {}", reg, fmt_byte(value));
        Ok(None)
    }

    fn lxi(&self, state: &mut MachineState) -> Result<Option<String>> {
        let (pair, value) = (self.pair(0), self.word(1));
        state.write_pair(pair, value);
        crate::echoln!(Sometimes, "{} -> {}", pair.hi(), fmt_byte((value >> 8) as u8));
        crate::echoln!(Sometimes, "{} -> {}", pair.lo(), fmt_byte(value as u8));
        Ok(None)
    }

    // Direct and indirect loads/stores: no flag effect.

    fn lda(&self, state: &mut MachineState) -> Result<Option<String>> {
        let addr = self.word(0);
        let value = state.read_mem(addr);
        state.set_accumulator(value);
        crate::echoln!(Sometimes, "A -> {} [from {}]", fmt_byte(value), fmt_word(addr));
        Ok(None)
    }

    fn sta(&self, state: &mut MachineState) -> Result<Option<String>> {
        let addr = self.word(0);
        let value = state.accumulator();
        state.write_mem(addr, value);
        crate::echoln!(Sometimes, "{} -> {}", fmt_word(addr), fmt_byte(value));
        Ok(None)
    }

    fn ldax(&self, state: &mut MachineState) -> Result<Option<String>> {
        let pair = self.pair(0);
        let addr = state.addr_of_pair(pair);
        let value = state.read_mem(addr);
        state.set_accumulator(value);
        crate::echoln!(
            Sometimes,
            "A -> {} [from {} {}]",
            fmt_byte(value),
            pair,
            fmt_word(addr),
        );
        Ok(None)
    }

    fn stax(&self, state: &mut MachineState) -> Result<Option<String>> {
        let pair = self.pair(0);
        let addr = state.addr_of_pair(pair);
        let value = state.accumulator();
        state.write_mem(addr, value);
        crate::echoln!(
            Sometimes,
            "{} -> {} [via {}]",
            fmt_word(addr),
            fmt_byte(value),
            pair,
        );
        Ok(None)
    }

    // Arithmetic family.

    fn add(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = state.read(self.reg(0));
        let result = apply_add(state, Register::A, operand);
        crate::echoln!(Sometimes, "A + {} -> {}", fmt_byte(operand), fmt_byte(result));
        Ok(None)
    }

    fn adi(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = self.byte(0);
        let result = apply_add(state, Register::A, operand);
        crate::echoln!(Sometimes, "A + {} -> {}", fmt_byte(operand), fmt_byte(result));
        Ok(None)
    }

    fn sub(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = state.read(self.reg(0));
        let result = apply_sub(state, Register::A, operand, true);
        crate::echoln!(Sometimes, "A - {} -> {}", fmt_byte(operand), fmt_byte(result));
        Ok(None)
    }

    fn sui(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = self.byte(0);
        let result = apply_sub(state, Register::A, operand, true);
        crate::echoln!(Sometimes, "A - {} -> {}", fmt_byte(operand), fmt_byte(result));
        Ok(None)
    }

    fn cmp(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = state.read(self.reg(0));
        apply_sub(state, Register::A, operand, false);
        self.echo_compare(state, operand);
        Ok(None)
    }

    fn cpi(&self, state: &mut MachineState) -> Result<Option<String>> {
        let operand = self.byte(0);
        apply_sub(state, Register::A, operand, false);
        self.echo_compare(state, operand);
        Ok(None)
    }

    fn echo_compare(&self, state: &MachineState, operand: u8) {
        let flags = state.flags();
        crate::echoln!(
            Sometimes,
            "A ? {} [C={} Z={} S={}]",
            fmt_byte(operand),
            flags.carry as u8,
            flags.zero as u8,
            flags.sign as u8,
        );
    }

    // Increment/decrement: same flag policies as add/subtract by one.

    fn inr(&self, state: &mut MachineState) -> Result<Option<String>> {
        let reg = self.reg(0);
        let result = apply_add(state, reg, 1);
        crate::echoln!(Sometimes, "{} -> {}", reg, fmt_byte(result));
        Ok(None)
    }

    fn dcr(&self, state: &mut MachineState) -> Result<Option<String>> {
        let reg = self.reg(0);
        let result = apply_sub(state, reg, 1, true);
        crate::echoln!(Sometimes, "{} -> {}", reg, fmt_byte(result));
        Ok(None)
    }

    // Pair address increment/decrement: 16-bit counter, no wraparound and
    // no flag effect. Out-of-range steps are rejected with state unchanged.

    fn inx(&self, state: &mut MachineState) -> Result<Option<String>> {
        let pair = self.pair(0);
        let addr = state.addr_of_pair(pair);
        if addr == u16::MAX {
            return Err(error::step_range("INX", pair, addr));
        }
        state.write_pair(pair, addr + 1);
        crate::echoln!(Sometimes, "{} -> {}", pair, fmt_word(addr + 1));
        Ok(None)
    }

    fn dcx(&self, state: &mut MachineState) -> Result<Option<String>> {
        let pair = self.pair(0);
        let addr = state.addr_of_pair(pair);
        if addr == 0 {
            return Err(error::step_range("DCX", pair, addr));
        }
        state.write_pair(pair, addr - 1);
        crate::echoln!(Sometimes, "{} -> {}", pair, fmt_word(addr - 1));
        Ok(None)
    }

    fn jump_if(&self, condition: bool) -> Option<String> {
        condition.then(|| self.target(0).to_string())
    }

    fn out(&self, state: &mut MachineState) -> Result<Option<String>> {
        output::display("A", state.accumulator());
        Ok(None)
    }

    fn hlt(&self) -> Result<Option<String>> {
        crate::echoln!(Always, "Halted");
        Ok(None)
    }
}

/// Add policy: a sum past FFH wraps to the low byte with carry set; zero is
/// only set when the untruncated sum is zero.
fn apply_add(state: &mut MachineState, reg: Register, operand: u8) -> u8 {
    let sum = state.read(reg) as u16 + operand as u16;
    let result = if sum > 0xFF {
        state.set_arith_flags(true, false, false);
        (sum & 0xFF) as u8
    } else if sum == 0 {
        state.set_arith_flags(false, false, true);
        0
    } else {
        state.set_arith_flags(false, false, false);
        sum as u8
    };
    state.write(reg, result);
    result
}

/// Subtract policy: signed difference; a negative result stores the
/// absolute value with carry and sign set. Compare passes
/// `write_back = false` and leaves the register alone.
fn apply_sub(state: &mut MachineState, reg: Register, operand: u8, write_back: bool) -> u8 {
    let diff = state.read(reg) as i16 - operand as i16;
    let result = match diff.cmp(&0) {
        Ordering::Less => {
            state.set_arith_flags(true, true, false);
            diff.unsigned_abs() as u8
        }
        Ordering::Equal => {
            state.set_arith_flags(false, false, true);
            0
        }
        Ordering::Greater => {
            state.set_arith_flags(false, false, false);
            diff as u8
        }
    };
    if write_back {
        state.write(reg, result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_line;

    fn cmd(text: &str) -> Command {
        Command::new(parse_line(text).unwrap().unwrap())
    }

    fn eval(state: &mut MachineState, text: &str) -> Option<String> {
        cmd(text).eval(state).unwrap()
    }

    #[test]
    fn add_wraps_past_ff_with_carry() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A FFH");
        eval(&mut state, "ADI 01H");
        assert_eq!(state.accumulator(), 0x00);
        let flags = state.flags();
        assert!(flags.carry);
        assert!(!flags.zero);
        assert!(!flags.sign);
    }

    #[test]
    fn add_of_zeroes_sets_zero_flag() {
        let mut state = MachineState::new();
        eval(&mut state, "ADD B");
        assert_eq!(state.accumulator(), 0x00);
        assert!(state.flags().zero);
        assert!(!state.flags().carry);
    }

    #[test]
    fn plain_add_clears_all_three_flags() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 01H");
        eval(&mut state, "MVI B 02H");
        eval(&mut state, "ADD B");
        assert_eq!(state.accumulator(), 0x03);
        let flags = state.flags();
        assert!(!flags.carry && !flags.zero && !flags.sign);
    }

    #[test]
    fn subtract_to_zero_sets_zero_only() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 10H");
        eval(&mut state, "SUI 10H");
        assert_eq!(state.accumulator(), 0x00);
        let flags = state.flags();
        assert!(flags.zero);
        assert!(!flags.carry);
        assert!(!flags.sign);
    }

    #[test]
    fn subtract_below_zero_stores_absolute_difference() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 01H");
        eval(&mut state, "SUI 02H");
        assert_eq!(state.accumulator(), 0x01);
        let flags = state.flags();
        assert!(flags.carry);
        assert!(flags.sign);
        assert!(!flags.zero);
    }

    #[test]
    fn compare_sets_flags_without_writing_back() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 05H");
        eval(&mut state, "CPI 09H");
        assert_eq!(state.accumulator(), 0x05);
        assert!(state.flags().carry);
        eval(&mut state, "MVI B 05H");
        eval(&mut state, "CMP B");
        assert_eq!(state.accumulator(), 0x05);
        assert!(state.flags().zero);
    }

    #[test]
    fn lxi_aims_the_m_pseudo_register() {
        let mut state = MachineState::new();
        eval(&mut state, "LXI H 3344H");
        assert_eq!(state.read(Register::H), 0x33);
        assert_eq!(state.read(Register::L), 0x44);
        eval(&mut state, "MVI M 2AH");
        assert_eq!(state.read_mem(0x3344), 0x2A);
        eval(&mut state, "MOV B M");
        assert_eq!(state.read(Register::B), 0x2A);
    }

    #[test]
    fn moves_do_not_touch_flags() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 01H");
        eval(&mut state, "SUI 02H");
        let before = state.flags();
        eval(&mut state, "MVI B 07H");
        eval(&mut state, "MOV C B");
        assert_eq!(state.flags(), before);
    }

    #[test]
    fn indirect_load_and_store_through_pairs() {
        let mut state = MachineState::new();
        eval(&mut state, "LXI D 0100H");
        eval(&mut state, "MVI A 77H");
        eval(&mut state, "STAX D");
        assert_eq!(state.read_mem(0x0100), 0x77);
        eval(&mut state, "MVI A 00H");
        eval(&mut state, "LDAX D");
        assert_eq!(state.accumulator(), 0x77);
    }

    #[test]
    fn direct_load_defaults_to_zero() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 55H");
        eval(&mut state, "LDA 2000H");
        assert_eq!(state.accumulator(), 0x00);
    }

    #[test]
    fn increment_follows_the_add_policy() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI B FFH");
        eval(&mut state, "INR B");
        assert_eq!(state.read(Register::B), 0x00);
        assert!(state.flags().carry);
    }

    #[test]
    fn decrement_follows_the_subtract_policy() {
        let mut state = MachineState::new();
        eval(&mut state, "DCR B");
        assert_eq!(state.read(Register::B), 0x01);
        let flags = state.flags();
        assert!(flags.carry && flags.sign);
    }

    #[test]
    fn pair_increment_steps_the_address() {
        let mut state = MachineState::new();
        eval(&mut state, "LXI D 00FFH");
        eval(&mut state, "INX D");
        assert_eq!(state.read_pair(Pair::DE), 0x0100);
    }

    #[test]
    fn pair_decrement_below_zero_is_rejected() {
        let mut state = MachineState::new();
        eval(&mut state, "LXI H 0000H");
        assert!(cmd("DCX H").eval(&mut state).is_err());
        assert_eq!(state.read_pair(Pair::HL), 0x0000);
    }

    #[test]
    fn pair_increment_past_ffff_is_rejected() {
        let mut state = MachineState::new();
        eval(&mut state, "LXI H FFFFH");
        assert!(cmd("INX H").eval(&mut state).is_err());
        assert_eq!(state.read_pair(Pair::HL), 0xFFFF);
    }

    #[test]
    fn conditional_jumps_read_the_flags() {
        let mut state = MachineState::new();
        eval(&mut state, "MVI A 01H");
        eval(&mut state, "SUI 01H");
        assert_eq!(eval(&mut state, "JZ DONE"), Some("DONE".to_string()));
        assert_eq!(eval(&mut state, "JNZ DONE"), None);
        eval(&mut state, "SUI 01H");
        assert_eq!(eval(&mut state, "JC BORROW"), Some("BORROW".to_string()));
        assert_eq!(eval(&mut state, "JNC BORROW"), None);
        assert_eq!(eval(&mut state, "JMP ALWAYS"), Some("ALWAYS".to_string()));
    }

    #[test]
    fn arity_mismatch_invalidates_the_command() {
        let command = cmd("MVI A");
        assert!(!command.is_valid());
        assert!(matches!(
            command.fault(),
            Some(Fault::Arity {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn constraint_violation_invalidates_the_command() {
        let command = cmd("ADD Q");
        assert!(!command.is_valid());
        assert!(matches!(command.fault(), Some(Fault::Constraint { .. })));

        // E does not name a pair, even though it names a register.
        let command = cmd("LXI E 3344H");
        assert!(!command.is_valid());
    }
}
