//! Line preprocessor: splits a raw input line into a label, a mnemonic and
//! operand tokens, converting hex literals into typed values.
//!
//! Tokens destined for register, pair or label parameters pass through
//! symbolically; judging their membership is the instruction validator's
//! job. Hex conversion is only attempted when the argument count matches
//! the table arity, so an arity fault is reported by the validator rather
//! than masked by a literal error here.

use miette::Result;

use crate::error;
use crate::ops::{Opcode, ParamKind};
use crate::symbol::Span;

/// One operand token after hex preprocessing.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    /// Register, pair or label name, passed through for the validator.
    Symbol(String),
    Byte(u8),
    Word(u16),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Arg {
    pub token: Token,
    pub span: Span,
}

/// A tokenized instruction line, ready for validation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParsedLine {
    pub label: Option<String>,
    pub opcode: Opcode,
    pub mnemonic_span: Span,
    pub args: Vec<Arg>,
}

/// Tokenize one input line. Returns `Ok(None)` for blank or comment-only
/// lines. An unparsable hex literal aborts the whole line.
pub fn parse_line(line: &str) -> Result<Option<ParsedLine>> {
    let text = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };

    let mut tokens = tokenize(text).into_iter().peekable();
    let Some(&(first, first_span)) = tokens.peek() else {
        return Ok(None);
    };

    // A leading `NAME:` token is a label definition. Any other token
    // containing a colon is malformed.
    let label = if first.contains(':') {
        if first.len() < 2 || !first.ends_with(':') || first.matches(':').count() != 1 {
            return Err(error::parse_bad_label(first_span, line));
        }
        tokens.next();
        if tokens.peek().is_none() {
            return Err(error::parse_missing_instruction(first_span, line));
        }
        Some(first[..first.len() - 1].to_string())
    } else {
        None
    };

    let (mnemonic, mnemonic_span) = tokens.next().expect("peeked above");
    let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
        return Err(error::parse_unknown_opcode(mnemonic_span, line));
    };

    let raw: Vec<(&str, Span)> = tokens.collect();
    let params = opcode.spec().params;

    let mut args = Vec::with_capacity(raw.len());
    if raw.len() == params.len() {
        for (&(tok, span), param) in raw.iter().zip(params) {
            let token = match param.kind {
                ParamKind::Byte => Token::Byte(parse_hex(tok, span, line, param.kind)? as u8),
                ParamKind::Word => Token::Word(parse_hex(tok, span, line, param.kind)?),
                ParamKind::Reg | ParamKind::Pair | ParamKind::Label => {
                    Token::Symbol(tok.to_string())
                }
            };
            args.push(Arg { token, span });
        }
    } else {
        // Arity mismatch: pass everything through so the validator can
        // report the count fault.
        for (tok, span) in raw {
            args.push(Arg {
                token: Token::Symbol(tok.to_string()),
                span,
            });
        }
    }

    Ok(Some(ParsedLine {
        label,
        opcode,
        mnemonic_span,
        args,
    }))
}

/// Parse a human hex literal: 1-4 hex digits with an optional `H` suffix.
fn parse_hex(tok: &str, span: Span, line: &str, kind: ParamKind) -> Result<u16> {
    let digits = tok
        .strip_suffix('H')
        .or_else(|| tok.strip_suffix('h'))
        .unwrap_or(tok);
    if digits.len() > 4 {
        return Err(error::parse_lit_range(span, line, ParamKind::Word));
    }
    let value =
        u16::from_str_radix(digits, 16).map_err(|e| error::parse_bad_lit(span, line, e))?;
    if kind == ParamKind::Byte && value > 0xFF {
        return Err(error::parse_lit_range(span, line, kind));
    }
    Ok(value)
}

fn tokenize(text: &str) -> Vec<(&str, Span)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push((&text[s..i], Span::new(s, i - s)));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push((&text[s..], Span::new(s, text.len() - s)));
    }
    tokens
}
