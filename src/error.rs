//! Diagnostic constructors. Each recoverable user error gets a `Report`
//! with a labeled span over the offending part of the input line.

use std::num::ParseIntError;

use miette::{miette, LabeledSpan, Report, Severity};

use crate::ops::ParamKind;
use crate::symbol::{Pair, Span};

// Line preprocessor errors

pub fn parse_bad_label(span: Span, line: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::label",
        help = "a label is a name followed by a single trailing colon, like `LOOP:`",
        labels = vec![LabeledSpan::at(span, "malformed label")],
        "Encountered a malformed label token.",
    )
    .with_source_code(line.to_string())
}

pub fn parse_missing_instruction(span: Span, line: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::label",
        help = "a label must be followed by an instruction on the same line",
        labels = vec![LabeledSpan::at(span, "label without instruction")],
        "Expected an instruction after the label.",
    )
    .with_source_code(line.to_string())
}

pub fn parse_unknown_opcode(span: Span, line: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::opcode",
        help = "type `help` for the list of supported instructions",
        labels = vec![LabeledSpan::at(span, "unknown mnemonic")],
        "Unknown instruction.",
    )
    .with_source_code(line.to_string())
}

pub fn parse_bad_lit(span: Span, line: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::bad_lit",
        help = "hex literals look like `3CH` or `3344H`; the `H` suffix is optional",
        labels = vec![LabeledSpan::at(span, "not a hex literal")],
        "Encountered an invalid hex literal: {e}",
    )
    .with_source_code(line.to_string())
}

pub fn parse_lit_range(span: Span, line: &str, kind: ParamKind) -> Report {
    let help = match kind {
        ParamKind::Byte => "byte values range from 00H to FFH",
        _ => "word values range from 0000H to FFFFH",
    };
    miette!(
        severity = Severity::Error,
        code = "parse::lit_range",
        help = help,
        labels = vec![LabeledSpan::at(span, "literal too wide")],
        "Literal does not fit in a {kind}.",
    )
    .with_source_code(line.to_string())
}

// Instruction validation errors

pub fn command_arity(mnemonic: &str, expected: usize, got: usize, span: Span, line: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "command::arity",
        help = "type `help` to see the expected operands for each instruction",
        labels = vec![LabeledSpan::at(span, "wrong number of arguments")],
        "{mnemonic} takes {expected} argument{}, got {got}.",
        if expected == 1 { "" } else { "s" },
    )
    .with_source_code(line.to_string())
}

pub fn command_constraint(param: &str, kind: ParamKind, span: Span, line: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "command::constraint",
        help = "registers are A B C D E H L M; pairs are named B, D or H",
        labels = vec![LabeledSpan::at(span, "unexpected argument")],
        "Expected a {kind} for parameter `{param}`.",
    )
    .with_source_code(line.to_string())
}

// Program log errors

pub fn duplicate_label(label: &str, existing: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "log::duplicate_label",
        help = "labels are unique across the whole session",
        "Duplicate label `{label}`: already defined at entry {existing}.",
    )
}

// Evaluation errors

pub fn step_range(mnemonic: &str, pair: Pair, addr: u16) -> Report {
    miette!(
        severity = Severity::Error,
        code = "eval::step_range",
        help = "pair addresses range from 0000H to FFFFH; the pair was left unchanged",
        "{mnemonic} cannot step {pair} past {addr:04X}H.",
    )
}

// Snapshot errors

pub fn snapshot_parse(path: &std::path::Path, e: serde_json::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "db::parse",
        help = "the snapshot is a JSON object with `registers` and `memory` members",
        "Could not parse snapshot file {}: {e}",
        path.display(),
    )
}

pub fn snapshot_entry(section: &str, key: &str, value: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "db::entry",
        help = "register names are A B C D E H L; values and addresses are bare hex",
        "Snapshot {section} entry `{key}: {value}` is not valid.",
    )
}
