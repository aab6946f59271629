//! The instruction table: every supported opcode with its parameter shape.
//!
//! This is the single source of truth for arity and type checking, for
//! dispatch, and for the generated help text. Nothing else duplicates it.

use std::fmt;

/// Closed set of supported opcodes. Evaluation dispatches over this enum
/// exhaustively, so an opcode without a handler does not compile.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Mov,
    Mvi,
    Lxi,
    Lda,
    Sta,
    Ldax,
    Stax,
    Add,
    Adi,
    Sub,
    Sui,
    Cmp,
    Cpi,
    Inr,
    Dcr,
    Inx,
    Dcx,
    Jmp,
    Jz,
    Jnz,
    Jc,
    Jnc,
    Out,
    Hlt,
}

/// Constraint on a single instruction argument.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParamKind {
    /// Member of the register set, including the `M` pseudo-register.
    Reg,
    /// Member of the register pair set (`B`, `D`, `H`).
    Pair,
    /// 8-bit hex literal.
    Byte,
    /// 16-bit hex literal.
    Word,
    /// Jump target name.
    Label,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Static specification of one opcode.
#[derive(Debug)]
pub struct OpSpec {
    pub mnemonic: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
}

const fn param(name: &'static str, kind: ParamKind) -> Param {
    Param { name, kind }
}

impl Opcode {
    pub const ALL: [Opcode; 24] = [
        Opcode::Mov,
        Opcode::Mvi,
        Opcode::Lxi,
        Opcode::Lda,
        Opcode::Sta,
        Opcode::Ldax,
        Opcode::Stax,
        Opcode::Add,
        Opcode::Adi,
        Opcode::Sub,
        Opcode::Sui,
        Opcode::Cmp,
        Opcode::Cpi,
        Opcode::Inr,
        Opcode::Dcr,
        Opcode::Inx,
        Opcode::Dcx,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Jnz,
        Opcode::Jc,
        Opcode::Jnc,
        Opcode::Out,
        Opcode::Hlt,
    ];

    /// Mnemonics are matched case-insensitively.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MOV" => Some(Opcode::Mov),
            "MVI" => Some(Opcode::Mvi),
            "LXI" => Some(Opcode::Lxi),
            "LDA" => Some(Opcode::Lda),
            "STA" => Some(Opcode::Sta),
            "LDAX" => Some(Opcode::Ldax),
            "STAX" => Some(Opcode::Stax),
            "ADD" => Some(Opcode::Add),
            "ADI" => Some(Opcode::Adi),
            "SUB" => Some(Opcode::Sub),
            "SUI" => Some(Opcode::Sui),
            "CMP" => Some(Opcode::Cmp),
            "CPI" => Some(Opcode::Cpi),
            "INR" => Some(Opcode::Inr),
            "DCR" => Some(Opcode::Dcr),
            "INX" => Some(Opcode::Inx),
            "DCX" => Some(Opcode::Dcx),
            "JMP" => Some(Opcode::Jmp),
            "JZ" => Some(Opcode::Jz),
            "JNZ" => Some(Opcode::Jnz),
            "JC" => Some(Opcode::Jc),
            "JNC" => Some(Opcode::Jnc),
            "OUT" => Some(Opcode::Out),
            "HLT" => Some(Opcode::Hlt),
            _ => None,
        }
    }

    pub fn spec(self) -> &'static OpSpec {
        match self {
            Opcode::Mov => {
                const S: OpSpec = OpSpec {
                    mnemonic: "MOV",
                    description: "Move register to register",
                    params: &[param("dst", ParamKind::Reg), param("src", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Mvi => {
                const S: OpSpec = OpSpec {
                    mnemonic: "MVI",
                    description: "Move byte immediate into register",
                    params: &[
                        param("register", ParamKind::Reg),
                        param("value", ParamKind::Byte),
                    ],
                };
                &S
            }
            Opcode::Lxi => {
                const S: OpSpec = OpSpec {
                    mnemonic: "LXI",
                    description: "Load register pair immediate",
                    params: &[
                        param("pair", ParamKind::Pair),
                        param("value", ParamKind::Word),
                    ],
                };
                &S
            }
            Opcode::Lda => {
                const S: OpSpec = OpSpec {
                    mnemonic: "LDA",
                    description: "Load accumulator from memory address",
                    params: &[param("address", ParamKind::Word)],
                };
                &S
            }
            Opcode::Sta => {
                const S: OpSpec = OpSpec {
                    mnemonic: "STA",
                    description: "Store accumulator to memory address",
                    params: &[param("address", ParamKind::Word)],
                };
                &S
            }
            Opcode::Ldax => {
                const S: OpSpec = OpSpec {
                    mnemonic: "LDAX",
                    description: "Load accumulator from pair address",
                    params: &[param("pair", ParamKind::Pair)],
                };
                &S
            }
            Opcode::Stax => {
                const S: OpSpec = OpSpec {
                    mnemonic: "STAX",
                    description: "Store accumulator to pair address",
                    params: &[param("pair", ParamKind::Pair)],
                };
                &S
            }
            Opcode::Add => {
                const S: OpSpec = OpSpec {
                    mnemonic: "ADD",
                    description: "Add register to accumulator",
                    params: &[param("register", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Adi => {
                const S: OpSpec = OpSpec {
                    mnemonic: "ADI",
                    description: "Add byte immediate to accumulator",
                    params: &[param("value", ParamKind::Byte)],
                };
                &S
            }
            Opcode::Sub => {
                const S: OpSpec = OpSpec {
                    mnemonic: "SUB",
                    description: "Subtract register from accumulator",
                    params: &[param("register", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Sui => {
                const S: OpSpec = OpSpec {
                    mnemonic: "SUI",
                    description: "Subtract byte immediate from accumulator",
                    params: &[param("value", ParamKind::Byte)],
                };
                &S
            }
            Opcode::Cmp => {
                const S: OpSpec = OpSpec {
                    mnemonic: "CMP",
                    description: "Compare register with accumulator",
                    params: &[param("register", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Cpi => {
                const S: OpSpec = OpSpec {
                    mnemonic: "CPI",
                    description: "Compare byte immediate with accumulator",
                    params: &[param("value", ParamKind::Byte)],
                };
                &S
            }
            Opcode::Inr => {
                const S: OpSpec = OpSpec {
                    mnemonic: "INR",
                    description: "Increment register",
                    params: &[param("register", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Dcr => {
                const S: OpSpec = OpSpec {
                    mnemonic: "DCR",
                    description: "Decrement register",
                    params: &[param("register", ParamKind::Reg)],
                };
                &S
            }
            Opcode::Inx => {
                const S: OpSpec = OpSpec {
                    mnemonic: "INX",
                    description: "Increment pair address",
                    params: &[param("pair", ParamKind::Pair)],
                };
                &S
            }
            Opcode::Dcx => {
                const S: OpSpec = OpSpec {
                    mnemonic: "DCX",
                    description: "Decrement pair address",
                    params: &[param("pair", ParamKind::Pair)],
                };
                &S
            }
            Opcode::Jmp => {
                const S: OpSpec = OpSpec {
                    mnemonic: "JMP",
                    description: "Jump to label",
                    params: &[param("target", ParamKind::Label)],
                };
                &S
            }
            Opcode::Jz => {
                const S: OpSpec = OpSpec {
                    mnemonic: "JZ",
                    description: "Jump to label if zero flag set",
                    params: &[param("target", ParamKind::Label)],
                };
                &S
            }
            Opcode::Jnz => {
                const S: OpSpec = OpSpec {
                    mnemonic: "JNZ",
                    description: "Jump to label if zero flag clear",
                    params: &[param("target", ParamKind::Label)],
                };
                &S
            }
            Opcode::Jc => {
                const S: OpSpec = OpSpec {
                    mnemonic: "JC",
                    description: "Jump to label if carry flag set",
                    params: &[param("target", ParamKind::Label)],
                };
                &S
            }
            Opcode::Jnc => {
                const S: OpSpec = OpSpec {
                    mnemonic: "JNC",
                    description: "Jump to label if carry flag clear",
                    params: &[param("target", ParamKind::Label)],
                };
                &S
            }
            Opcode::Out => {
                const S: OpSpec = OpSpec {
                    mnemonic: "OUT",
                    description: "Send accumulator to the display",
                    params: &[],
                };
                &S
            }
            Opcode::Hlt => {
                const S: OpSpec = OpSpec {
                    mnemonic: "HLT",
                    description: "Halt",
                    params: &[],
                };
                &S
            }
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().mnemonic)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Reg => "register",
            ParamKind::Pair => "register pair",
            ParamKind::Byte => "byte",
            ParamKind::Word => "word",
            ParamKind::Label => "label",
        };
        write!(f, "{}", name)
    }
}
