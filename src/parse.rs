//! Parsing Hartz assembly source into a [`Program`] (the first assembler pass).
//!
//! The source is read one line at a time by a [`LineReader`],
//! which tokenizes each line (see [`lex`]). The first token of each line
//! decides how the line is handled:
//! - `LABEL:` defines a label at the next instruction (and the rest of the line is parsed as usual),
//! - `; ...` is a comment,
//! - `.NAME value` defines a constant,
//! - `@NAME` declares a function, whose label is defined later,
//! - a mnemonic begins an instruction, whose operands are parsed by its [`InstrSpec`] template.
//!
//! Parsing does not stop at the first error. Each error abandons the rest of its line
//! and is recorded in the [`Program`], so that every broken line can be reported.
//!
//! [`InstrSpec`]: crate::ast::instr::InstrSpec
pub mod lex;

use std::collections::VecDeque;
use std::io::BufRead;

use logos::Logos;

use crate::asm::{AsmErr, AsmErrKind, Program, SourceInfo, SymbolKind};
use crate::ast::instr::{Opcode, Operand};
use crate::ast::term::{Pending, TermValue};
use crate::ast::{Bits, Reg, RegRole};
use lex::{Ident, LexErr, Token};

/// Parses an input stream into a [`Program`].
///
/// Errors do not stop parsing; they are held in the returned program
/// (see [`Program::errors`]). Only a failed read stops parsing early.
///
/// # Example
/// ```
/// use hartz::parse::parse_program;
///
/// let src = "
///     LOOP: ADD $S1, $S2, $D1
///     JMP LOOP
/// ";
/// let program = parse_program(src.as_bytes());
/// assert!(program.errors().is_empty());
/// assert_eq!(program.terms().instr_count(), 2);
/// assert_eq!(program.labels().lookup_by_name("LOOP").and_then(|s| s.position()), Some(0));
/// ```
pub fn parse_program<R: BufRead>(input: R) -> Program {
    let mut parser = Parser {
        reader: LineReader::new(input),
        program: Program::default(),
    };
    parser.run();

    let Parser { reader, mut program } = parser;
    program.source = reader.into_source();
    program
}

/// Reads a stream line by line, and splits each line into tokens.
///
/// Before a line is tokenized, it is upper-cased, so all tokens are in upper case.
/// The verbatim text of every line read is kept, so that diagnostics can show it.
pub struct LineReader<R> {
    input: R,
    source: SourceInfo,
    line_count: usize,
    line_start: usize,
    tokens: VecDeque<Result<Token, LexErr>>,
}
impl<R: BufRead> LineReader<R> {
    /// Creates a line reader over an input stream.
    pub fn new(input: R) -> Self {
        Self {
            input,
            source: SourceInfo::default(),
            line_count: 0,
            line_start: 0,
            tokens: VecDeque::new(),
        }
    }

    /// Reads the next line of the stream, discarding any tokens
    /// left over from the previous line.
    ///
    /// This returns `false` at the end of the stream.
    pub fn next_line(&mut self) -> std::io::Result<bool> {
        let mut buf = String::new();
        self.tokens.clear();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(false);
        }

        self.line_count += 1;
        self.line_start = self.source.push_line(&buf);
        self.tokens.extend(Token::lexer(&buf.to_uppercase()));
        Ok(true)
    }

    /// Takes the next token of the current line.
    ///
    /// This returns `None` once the line is exhausted (or if the line is blank).
    pub fn next_token(&mut self) -> Option<Result<Token, LexErr>> {
        self.tokens.pop_front()
    }

    /// Looks at the next token of the current line without taking it.
    pub fn peek_token(&self) -> Option<&Result<Token, LexErr>> {
        self.tokens.front()
    }

    /// The (1-indexed) number of the current line. This is 0 before the first line is read.
    pub fn line_no(&self) -> usize {
        self.line_count
    }

    /// The byte offset in the stream where the current line starts.
    pub fn line_start(&self) -> usize {
        self.line_start
    }

    /// The verbatim text of the current line, without surrounding whitespace.
    pub fn current_line(&self) -> &str {
        self.source.read_line(self.line_count).unwrap_or("")
    }

    /// Gets the text of every line that was read.
    pub fn into_source(self) -> SourceInfo {
        self.source
    }
}

struct Parser<R> {
    reader: LineReader<R>,
    program: Program,
}
impl<R: BufRead> Parser<R> {
    fn run(&mut self) {
        loop {
            match self.reader.next_line() {
                Ok(true) => {},
                Ok(false) => break,
                Err(e) => {
                    // The line could not be read, so it was never counted.
                    let line = self.reader.line_no() + 1;
                    self.program.fail(AsmErr::new(AsmErrKind::IoError(e.kind()), line));
                    break;
                }
            }

            if let Err(kind) = self.parse_line() {
                log::debug!("line {} ({:?}) abandoned after error: {kind}", self.reader.line_no(), self.reader.current_line());
                self.program.fail(AsmErr::new(kind, self.reader.line_no()));
            }
        }
    }

    /// Dispatches on the first token of the line.
    fn parse_line(&mut self) -> Result<(), AsmErrKind> {
        while let Some(token) = self.reader.next_token() {
            match token? {
                // A label is followed by whatever else the line holds.
                Token::LabelDef(name)           => self.define_label(name)?,
                Token::Comment                  => return Ok(()),
                Token::ConstDef(name)           => return self.define_constant(name),
                Token::FuncDecl(name)           => return self.declare_function(name),
                Token::Ident(Ident::Opcode(op)) => return self.parse_instr(op),
                t => return Err(AsmErrKind::UnexpectedIdentifier(t.to_string())),
            }
        }

        Ok(())
    }

    /// Checks that nothing but a comment remains on the line.
    fn expect_eol(&mut self) -> Result<(), AsmErrKind> {
        match self.reader.next_token() {
            None | Some(Ok(Token::Comment)) => Ok(()),
            Some(Ok(t)) => Err(AsmErrKind::UnexpectedIdentifier(t.to_string())),
            Some(Err(e)) => Err(e.into()),
        }
    }

    fn define_label(&mut self, name: String) -> Result<(), AsmErrKind> {
        if name.is_empty() {
            return Err(AsmErrKind::EmptyDefinition(SymbolKind::Label));
        }

        let line = self.reader.line_no();
        let position = self.program.terms.next_position();
        log::debug!("line {line}: label {name} at position {position}");

        self.program.labels.insert(name, position as i64, Some(position), line, SymbolKind::Label)
    }

    fn define_constant(&mut self, name: String) -> Result<(), AsmErrKind> {
        if name.is_empty() {
            return Err(AsmErrKind::EmptyDefinition(SymbolKind::Constant));
        }
        if self.program.consts.lookup_by_name(&name).is_some() {
            return Err(AsmErrKind::DuplicateDefinition(name));
        }

        let digits = match self.reader.next_token() {
            None | Some(Ok(Token::Comment)) => return Err(AsmErrKind::NoDefinitionValue(name)),
            Some(Ok(Token::Literal(d) | Token::Number(d))) => d,
            Some(Ok(t)) => return Err(AsmErrKind::ExpectedIdent { found: t.to_string(), expected: "a numeric value".to_string() }),
            Some(Err(e)) => return Err(e.into()),
        };
        let value = digits.parse::<u64>().ok()
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| AsmErrKind::LiteralTooLarge(digits))?;

        let line = self.reader.line_no();
        log::debug!("line {line}: constant {name} = {value}");
        self.program.consts.insert(name, value, None, line, SymbolKind::Constant)?;
        self.expect_eol()
    }

    fn declare_function(&mut self, name: String) -> Result<(), AsmErrKind> {
        if name.is_empty() {
            return Err(AsmErrKind::EmptyDefinition(SymbolKind::Function));
        }

        let line = self.reader.line_no();
        log::debug!("line {line}: function {name} declared");
        self.program.labels.insert(name, 0, None, line, SymbolKind::Function)?;
        self.expect_eol()
    }

    fn parse_instr(&mut self, op: Opcode) -> Result<(), AsmErrKind> {
        let spec = op.spec();
        let line = self.reader.line_no();
        log::debug!("line {line}: {op} at position {}", self.program.terms.next_position());

        let id = self.program.terms.push_instr(Bits::from_pattern(spec.code), line)?;
        for (i, &operand) in spec.template.iter().enumerate() {
            // Operands may be separated by commas.
            if i != 0 && matches!(self.reader.peek_token(), Some(Ok(Token::Comma))) {
                self.reader.next_token();
            }

            let token = match self.reader.next_token() {
                None | Some(Ok(Token::Comment)) => return Err(AsmErrKind::ExpectedToken(operand.to_string())),
                Some(t) => t?,
            };
            let value = parse_operand(operand, &token)?;
            self.program.terms.attach(id, value)?;
        }
        if let Some(ext) = spec.ext {
            self.program.terms.attach(id, TermValue::Resolved(Bits::from_pattern(ext)))?;
        }

        self.expect_eol()
    }
}

/// Parses one operand token against the operand kind the template expects.
///
/// Registers are encoded immediately.
/// Labels, constants and literals are left pending for the second pass.
fn parse_operand(operand: Operand, token: &Token) -> Result<TermValue, AsmErrKind> {
    let mismatch = || AsmErrKind::ExpectedIdent { found: token.to_string(), expected: operand.to_string() };

    match operand {
        Operand::SourceReg | Operand::DestReg => {
            let role = match operand {
                Operand::SourceReg => RegRole::Source,
                _ => RegRole::Dest,
            };
            let Token::Reg(raw) = token else { return Err(mismatch()) };

            Reg::parse(raw, role)
                .map(|reg| TermValue::Resolved(reg.bits()))
                .ok_or_else(mismatch)
        },
        Operand::Label | Operand::Constant => match token {
            Token::Ident(id) => Ok(TermValue::Pending(Pending::Symbol {
                name: id.to_string(),
                label: operand == Operand::Label,
                constant: operand == Operand::Constant,
            })),
            _ => Err(mismatch()),
        },
        Operand::Literal => match token {
            Token::Literal(digits) => Ok(TermValue::Pending(Pending::Literal(digits.clone()))),
            _ => Err(mismatch()),
        },
        Operand::Either(alts) => {
            let mut parsed = alts.iter().filter_map(|&alt| parse_operand(alt, token).ok());
            let first = parsed.next()
                .ok_or_else(|| AsmErrKind::UnexpectedOperand { found: token.to_string(), expected: operand.to_string() })?;

            Ok(parsed.fold(first, merge_symbols))
        },
    }
}

/// Combines two parses of the same symbol token, so that the symbol
/// may be resolved against any table one of them permits.
fn merge_symbols(acc: TermValue, other: TermValue) -> TermValue {
    match (acc, other) {
        (
            TermValue::Pending(Pending::Symbol { name, label, constant }),
            TermValue::Pending(Pending::Symbol { label: l, constant: c, .. })
        ) => TermValue::Pending(Pending::Symbol { name, label: label || l, constant: constant || c }),
        (acc, _) => acc,
    }
}
