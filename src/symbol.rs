use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use miette::SourceSpan;

/// Location of a token within an input line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: usize,
    len: usize,
}

impl Span {
    pub fn new(offs: usize, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn offs(&self) -> usize {
        self.offs
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offs..self.offs + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

/// Represents the processor registers.
///
/// `M` is a pseudo-register: it has no storage of its own, and reads or
/// writes of it are redirected to the memory cell addressed by the H/L pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    M,
}

impl Register {
    /// The seven registers with backing storage, in display order.
    pub const NAMED: [Register; 7] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::E,
        Register::H,
        Register::L,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
            Register::M => "M",
        }
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Register::A),
            "B" => Ok(Register::B),
            "C" => Ok(Register::C),
            "D" => Ok(Register::D),
            "E" => Ok(Register::E),
            "H" => Ok(Register::H),
            "L" => Ok(Register::L),
            "M" => Ok(Register::M),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A register pair, named after its high register.
///
/// A pair encodes a 16-bit value: high byte in the first register, low byte
/// in the second.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pair {
    BC,
    DE,
    HL,
}

impl Pair {
    pub fn hi(&self) -> Register {
        match self {
            Pair::BC => Register::B,
            Pair::DE => Register::D,
            Pair::HL => Register::H,
        }
    }

    pub fn lo(&self) -> Register {
        match self {
            Pair::BC => Register::C,
            Pair::DE => Register::E,
            Pair::HL => Register::L,
        }
    }
}

impl FromStr for Pair {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Ok(Pair::BC),
            "D" => Ok(Pair::DE),
            "H" => Ok(Pair::HL),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pair::BC => "BC",
            Pair::DE => "DE",
            Pair::HL => "HL",
        };
        write!(f, "{}", name)
    }
}
