//! Assembling Hartz source into instruction words.
//!
//! Assembly happens in three passes:
//! 1. [`parse_program`] reads the source into a [`Program`]:
//!    the term store and the label and constant [`SymbolTable`]s.
//! 2. [`Program::resolve`] replaces every label, constant and literal reference
//!    with its final bits, producing an [`Assembly`].
//! 3. [`Assembly::write_words`] (see [`encoding`]) writes one word per instruction.
//!
//! [`assemble`] performs the first two passes.
//!
//! If any line fails to parse or resolve, no [`Assembly`] is produced.
//! The errors are collected into a [`Report`] instead.
//!
//! [`parse_program`]: crate::parse::parse_program

pub mod encoding;

use std::collections::TryReserveError;
use std::io::BufRead;
use std::ops::Range;

use crate::ast::machine::{MAX_LITERAL, MEMORY_SIZE, OPERAND_BITS};
use crate::ast::term::{Pending, TermId, TermStore, TermValue};
use crate::ast::Bits;
use crate::err::{Diagnostic, LexErr, Severity};
use crate::parse::parse_program;

/// Assembles a source stream, performing the parsing and resolution passes.
///
/// # Example
/// ```
/// use hartz::asm::assemble;
///
/// let src = "
///     LOOP: ADD $S1, $S2, $D1
///     JMP LOOP
/// ";
/// let asm = assemble(src.as_bytes()).unwrap();
///
/// let words: Vec<_> = asm.words().map(|w| w.to_string()).collect();
/// assert_eq!(words, ["0101010000", "1010110110"]);
/// ```
pub fn assemble<R: BufRead>(input: R) -> Result<Assembly, Report> {
    parse_program(input).resolve()
}

/// The kinds of symbols held in a [`SymbolTable`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolKind {
    /// A position in the program (e.g., `LOOP:`).
    Label,
    /// A named value (e.g., `.SIZE 4`).
    Constant,
    /// A label declared ahead of its definition (e.g., `@PRINT`).
    Function
}
impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Label    => f.write_str("label"),
            SymbolKind::Constant => f.write_str("constant"),
            SymbolKind::Function => f.write_str("function"),
        }
    }
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// A token which cannot begin a line, or which follows a complete line (pass 1).
    UnexpectedIdentifier(String),
    /// An operand had the wrong shape (pass 1).
    ExpectedIdent {
        /// The token that was found.
        found: String,
        /// The shape that was expected.
        expected: String
    },
    /// The line ended before an operand (pass 1).
    ExpectedToken(String),
    /// No alternative of an operand matched (pass 1).
    UnexpectedOperand {
        /// The token that was found.
        found: String,
        /// The alternatives that were expected.
        expected: String
    },
    /// A symbol was defined more than once in its table (pass 1).
    DuplicateDefinition(String),
    /// A definition had no name (pass 1).
    EmptyDefinition(SymbolKind),
    /// A declared function's label was defined more than once (pass 1).
    FunctionAlreadyDefined(String),
    /// A constant was defined without a value (pass 1).
    NoDefinitionValue(String),
    /// A literal or constant does not fit its operand (pass 1 or 2).
    LiteralTooLarge(String),
    /// A referenced symbol was never defined (pass 2).
    SymbolNotFound(String),
    /// Not enough memory was available to hold the program (pass 1).
    AllocationError,
    /// The source could not be read (pass 1).
    IoError(std::io::ErrorKind),
    /// A token could not be lexed (pass 1).
    Lex(LexErr),
}
impl AsmErrKind {
    /// The class of this error, used as a process exit code:
    /// - `1`: malformed line
    /// - `2`: symbol error
    /// - `3`: allocation error
    /// - `4`: I/O error
    pub fn code(&self) -> u8 {
        match self {
            Self::UnexpectedIdentifier(_)
            | Self::ExpectedIdent { .. }
            | Self::ExpectedToken(_)
            | Self::UnexpectedOperand { .. }
            | Self::Lex(_) => 1,
            Self::DuplicateDefinition(_)
            | Self::EmptyDefinition(_)
            | Self::FunctionAlreadyDefined(_)
            | Self::NoDefinitionValue(_)
            | Self::LiteralTooLarge(_)
            | Self::SymbolNotFound(_) => 2,
            Self::AllocationError => 3,
            Self::IoError(_) => 4,
        }
    }
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedIdentifier(t)      => write!(f, "unexpected identifier: {t}"),
            Self::ExpectedIdent { found, expected } => write!(f, "expected {expected}, found {found}"),
            Self::ExpectedToken(expected)      => write!(f, "expected {expected}, found end of line"),
            Self::UnexpectedOperand { found, expected } => write!(f, "unexpected operand {found}, expected {expected}"),
            Self::DuplicateDefinition(name)    => write!(f, "symbol was defined multiple times: {name}"),
            Self::EmptyDefinition(kind)        => write!(f, "{kind} definition is empty"),
            Self::FunctionAlreadyDefined(name) => write!(f, "function was already defined: {name}"),
            Self::NoDefinitionValue(name)      => write!(f, "constant has no value: {name}"),
            Self::LiteralTooLarge(value)       => write!(f, "value is too large: {value}"),
            Self::SymbolNotFound(name)         => write!(f, "symbol was never defined: {name}"),
            Self::AllocationError              => f.write_str("not enough memory available to process program"),
            Self::IoError(kind)                => write!(f, "could not read source: {kind}"),
            Self::Lex(e)                       => e.fmt(f),
        }
    }
}
impl From<LexErr> for AsmErrKind {
    fn from(value: LexErr) -> Self {
        Self::Lex(value)
    }
}
impl From<TryReserveError> for AsmErrKind {
    fn from(_: TryReserveError) -> Self {
        Self::AllocationError
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The value with a line.
    pub kind: AsmErrKind,
    /// The (1-indexed) source line associated with this value.
    pub line: usize
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new(kind: AsmErrKind, line: usize) -> Self {
        AsmErr { kind, line }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::UnexpectedIdentifier(_)   => Some("a line starts with a label (NAME:), a comment (;), a constant (.NAME), a function (@NAME) or an instruction".into()),
            AsmErrKind::ExpectedIdent { expected, .. } if expected.starts_with('$') => {
                Some(format!("registers are written {expected}, where x is between 1 and {}", crate::ast::machine::MAX_REGS).into())
            },
            AsmErrKind::ExpectedIdent { .. }      => None,
            AsmErrKind::ExpectedToken(_)          => Some("this instruction needs more operands".into()),
            AsmErrKind::UnexpectedOperand { .. }  => Some("literals are written #n, and labels and constants by name".into()),
            AsmErrKind::DuplicateDefinition(_)    => Some("symbols must be unique within a file, try renaming one of them".into()),
            AsmErrKind::EmptyDefinition(_)        => Some("add a name to this definition".into()),
            AsmErrKind::FunctionAlreadyDefined(_) => Some("a declared function can only be defined once".into()),
            AsmErrKind::NoDefinitionValue(_)      => Some("add a value after the constant's name (e.g., .SIZE 4)".into()),
            AsmErrKind::LiteralTooLarge(_)        => Some(format!("the range for an operand is [0, {MAX_LITERAL}]").into()),
            AsmErrKind::SymbolNotFound(name)      => Some(format!("define the label ({name}:) or constant (.{name} 1)").into()),
            AsmErrKind::AllocationError           => None,
            AsmErrKind::IoError(_)                => None,
            AsmErrKind::Lex(e)                    => e.help(),
        }
    }
}

/// All of the errors which prevented a program from assembling.
///
/// There is always at least one error. The first error found decides
/// the [`Report::kind`] (and exit code) of the whole report.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Report {
    errors: Vec<AsmErr>,
    diagnostics: Vec<Diagnostic>,
    labels: SymbolTable,
    consts: SymbolTable,
}
impl Report {
    /// The kind of the first error.
    pub fn kind(&self) -> &AsmErrKind {
        &self.errors[0].kind
    }
    /// The process exit code of this report.
    pub fn exit_code(&self) -> u8 {
        self.kind().code()
    }
    /// Every error, in the order they were found.
    pub fn errors(&self) -> &[AsmErr] {
        &self.errors
    }
    /// Every error, as a diagnostic with its source line.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
    /// The label table, as it was when assembly stopped.
    pub fn labels(&self) -> &SymbolTable {
        &self.labels
    }
    /// The constant table, as it was when assembly stopped.
    pub fn consts(&self) -> &SymbolTable {
        &self.consts
    }
}
impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i != 0 { writeln!(f)?; }
            diag.fmt(f)?;
        }
        Ok(())
    }
}
impl std::error::Error for Report {}

/// Struct holding the source string and contains helpers
/// to index lines from a source string.
///
/// Lines are 1-indexed.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct SourceInfo {
    /// The source code.
    src: String,
    /// The index where each line starts in source code.
    line_starts: Vec<usize>
}
impl std::fmt::Debug for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceInfo")
            .field("line_starts", &self.line_starts)
            .finish_non_exhaustive()
    }
}
impl SourceInfo {
    /// Appends a line (including its newline, if any), returning the index where it starts.
    pub(crate) fn push_line(&mut self, line: &str) -> usize {
        let start = self.src.len();
        self.line_starts.push(start);
        self.src.push_str(line);
        start
    }

    /// Returns the entire source.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// Counts the number of lines in the source string.
    pub fn count_lines(&self) -> usize {
        self.line_starts.len()
    }

    /// Gets the character range for the provided line, including any whitespace
    /// and the newline character.
    ///
    /// This returns None if line is not in the interval `[1, number of lines]`.
    fn raw_line_span(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self.line_starts.get(line)
            .copied()
            .unwrap_or(self.src.len());

        Some(start..end)
    }

    /// Gets the character range for the provided line, excluding any whitespace.
    ///
    /// This returns None if line is not in the interval `[1, number of lines]`.
    pub fn line_span(&self, line: usize) -> Option<Range<usize>> {
        let Range { mut start, mut end } = self.raw_line_span(line)?;

        // shift line span by trim
        let line = &self.src[start..end];
        let end_trimmed = line.trim_end();
        end -= line.len() - end_trimmed.len();

        let line = end_trimmed;
        start += line.len() - line.trim_start().len();

        Some(start..end)
    }

    /// Reads a line from source, without surrounding whitespace.
    ///
    /// This returns None if line is not in the interval `[1, number of lines]`.
    pub fn read_line(&self, line: usize) -> Option<&str> {
        self.line_span(line).map(|r| &self.src[r])
    }

    /// Gets the index where the provided line starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.raw_line_span(line).map(|r| r.start)
    }
}
/// A named entry of a [`SymbolTable`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Symbol {
    name: String,
    value: i64,
    kind: SymbolKind,
    position: Option<usize>,
    line: usize,
    used: bool
}
impl Symbol {
    /// The symbol's identifier.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The symbol's value (a label's position, or a constant's value).
    pub fn value(&self) -> i64 {
        self.value
    }
    /// The kind of symbol.
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
    /// The ordinal position of the instruction a label points to.
    ///
    /// This is `None` for constants, and for functions which were declared but not (yet) defined.
    pub fn position(&self) -> Option<usize> {
        self.position
    }
    /// The (1-indexed) source line of the definition.
    pub fn line(&self) -> usize {
        self.line
    }
    /// Whether the symbol was referenced by any resolved operand.
    pub fn used(&self) -> bool {
        self.used
    }
}

/// An insertion-ordered table of symbols.
///
/// A program holds two of these: one for labels (and functions) and one for constants.
/// Tables are small (a program fits in [`MEMORY_SIZE`] words), so lookups are linear scans.
///
/// ## Example
/// ```
/// use hartz::parse::parse_program;
///
/// let src = "
///     .SIZE 4
///     LOOP:
///         ADD $S1, $S2, $D1
///         BEZ $S1, LOOP
///     END: HALT
/// ";
/// let program = parse_program(src.as_bytes());
///
/// let labels = program.labels();
/// assert_eq!(labels.lookup_by_name("LOOP").and_then(|s| s.position()), Some(0));
/// assert_eq!(labels.lookup_by_name("END").and_then(|s| s.position()), Some(2));
/// assert_eq!(labels.lookup_by_position(2).map(|s| s.name()), Some("END"));
/// assert_eq!(labels.lookup_by_name("SIZE"), None);
///
/// assert_eq!(program.consts().lookup_by_name("SIZE").map(|s| s.value()), Some(4));
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>
}
impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol to the table.
    ///
    /// This fails if the identifier is already in the table, except when
    /// a label definition claims a function which was declared (with no position).
    pub fn insert(&mut self, name: String, value: i64, position: Option<usize>, line: usize, kind: SymbolKind) -> Result<(), AsmErrKind> {
        if let Some(existing) = self.symbols.iter_mut().find(|s| s.name == name) {
            return match (existing.kind, kind, existing.position) {
                (SymbolKind::Function, SymbolKind::Label, None) => {
                    existing.value = value;
                    existing.position = position;
                    existing.line = line;
                    Ok(())
                },
                (SymbolKind::Function, SymbolKind::Label, Some(_)) => Err(AsmErrKind::FunctionAlreadyDefined(name)),
                _ => Err(AsmErrKind::DuplicateDefinition(name)),
            };
        }

        self.symbols.push(Symbol { name, value, kind, position, line, used: false });
        Ok(())
    }

    /// Gets the symbol with the given identifier (if it exists).
    pub fn lookup_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Gets the first symbol at a given instruction position (if it exists).
    pub fn lookup_by_position(&self, position: usize) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.position == Some(position))
    }

    /// Marks a symbol as used, returning whether it exists.
    pub fn mark_used(&mut self, name: &str) -> bool {
        match self.symbols.iter_mut().find(|s| s.name == name) {
            Some(sym) => {
                sym.used = true;
                true
            },
            None => false,
        }
    }

    /// Iterates over the symbols, in the order they were defined.
    pub fn iter(&self) -> impl Iterator<Item=&Symbol> + '_ {
        self.symbols.iter()
    }

    /// Iterates over the symbols which were never used.
    pub fn unused(&self) -> impl Iterator<Item=&Symbol> + '_ {
        self.symbols.iter().filter(|s| !s.used)
    }

    /// The number of symbols in the table.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
impl std::fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<16} {:>6} {:>8} {:>5}  kind", "identifier", "value", "position", "used")?;
        for sym in &self.symbols {
            let position = match sym.position {
                Some(p) => p.to_string(),
                None => "-".to_string(),
            };
            writeln!(f, "{:<16} {:>6} {:>8} {:>5}  {}", sym.name, sym.value, position, sym.used, sym.kind)?;
        }
        Ok(())
    }
}

/// The state of one compilation unit, built by the first pass.
///
/// This holds the source lines, both symbol tables, the term store,
/// and the errors found so far.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program {
    pub(crate) source: SourceInfo,
    pub(crate) labels: SymbolTable,
    pub(crate) consts: SymbolTable,
    pub(crate) terms: TermStore,
    errors: Vec<AsmErr>,
}
impl Program {
    /// The source lines that were read.
    pub fn source(&self) -> &SourceInfo {
        &self.source
    }
    /// The label (and function) table.
    pub fn labels(&self) -> &SymbolTable {
        &self.labels
    }
    /// The constant table.
    pub fn consts(&self) -> &SymbolTable {
        &self.consts
    }
    /// The term store.
    pub fn terms(&self) -> &TermStore {
        &self.terms
    }
    /// Every error found so far, in the order they were found.
    pub fn errors(&self) -> &[AsmErr] {
        &self.errors
    }

    /// Records an error. Any error blocks resolution and emission.
    pub(crate) fn fail(&mut self, err: AsmErr) {
        self.errors.push(err);
    }

    fn into_report(self) -> Report {
        let diagnostics = self.errors.iter()
            .map(|e| Diagnostic::from_error(Severity::Error, e, e.line, self.source.read_line(e.line).unwrap_or("")))
            .collect();

        Report { errors: self.errors, diagnostics, labels: self.labels, consts: self.consts }
    }

    /// Resolves every pending operand of the program (the second pass).
    ///
    /// This does nothing (and fails) if the first pass found any errors.
    /// Otherwise, every unresolved operand is resolved, and all resolution errors are reported.
    ///
    /// Labels resolve to the distance from the referencing instruction to the label,
    /// wrapped around [`MEMORY_SIZE`] if negative.
    /// Constants resolve to their values, and literals to themselves.
    ///
    /// # Example
    /// ```
    /// use hartz::parse::parse_program;
    /// use hartz::asm::AsmErrKind;
    ///
    /// let program = parse_program("JMP UNDEFINED".as_bytes());
    /// let report = program.resolve().unwrap_err();
    /// assert_eq!(report.kind(), &AsmErrKind::SymbolNotFound("UNDEFINED".to_string()));
    /// ```
    pub fn resolve(mut self) -> Result<Assembly, Report> {
        if !self.errors.is_empty() {
            return Err(self.into_report());
        }

        let terms = &self.terms;
        let pending: Vec<(TermId, usize, usize, Pending)> = terms.instrs()
            .flat_map(|(id, _)| terms.children(id))
            .filter_map(|(id, term)| match term.value() {
                TermValue::Pending(p) => Some((id, term.position(), term.line(), p.clone())),
                TermValue::Resolved(_) => None,
            })
            .collect();

        for (id, position, line, p) in pending {
            match self.resolve_pending(&p, position) {
                Ok(bits) => {
                    log::trace!("line {line}: {p} resolved to {bits}");
                    self.terms.resolve(id, bits);
                },
                Err(kind) => self.fail(AsmErr::new(kind, line)),
            }
        }

        match self.errors.is_empty() {
            true  => Ok(Assembly { program: self }),
            false => Err(self.into_report()),
        }
    }

    fn resolve_pending(&mut self, p: &Pending, source: usize) -> Result<Bits, AsmErrKind> {
        match p {
            Pending::Literal(digits) => digits.parse::<u64>().ok()
                .and_then(|v| Bits::new(v, OPERAND_BITS).ok())
                .ok_or_else(|| AsmErrKind::LiteralTooLarge(format!("#{digits}"))),
            // Labels are looked up before constants.
            Pending::Symbol { name, label, constant } => {
                if *label {
                    if let Some(bits) = self.resolve_label(name, source) {
                        return Ok(bits);
                    }
                }
                if *constant {
                    if let Some(bits) = self.resolve_constant(name) {
                        return bits;
                    }
                }
                Err(AsmErrKind::SymbolNotFound(name.clone()))
            },
        }
    }

    /// Resolves a label to its distance from the source position,
    /// or `None` if no label (or claimed function) has the name.
    fn resolve_label(&mut self, name: &str, source: usize) -> Option<Bits> {
        let target = self.labels.lookup_by_name(name).and_then(Symbol::position)?;
        self.labels.mark_used(name);

        let mut distance = target as i64 - source as i64;
        if distance < 0 {
            distance += MEMORY_SIZE;
        }
        if !(0..MEMORY_SIZE).contains(&distance) {
            log::warn!("offset from position {source} to {name} ({distance}) is outside of memory, it will be truncated");
        }
        Some(Bits::new_trunc(distance, OPERAND_BITS))
    }

    /// Resolves a constant to its value, or `None` if no constant has the name.
    fn resolve_constant(&mut self, name: &str) -> Option<Result<Bits, AsmErrKind>> {
        let value = self.consts.lookup_by_name(name).map(Symbol::value)?;
        self.consts.mark_used(name);

        let bits = u64::try_from(value).ok()
            .and_then(|v| Bits::new(v, OPERAND_BITS).ok())
            .ok_or_else(|| AsmErrKind::LiteralTooLarge(format!("{name} = {value}")));
        Some(bits)
    }
}

/// A fully resolved program, ready to be written as instruction words.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Assembly {
    program: Program,
}
impl Assembly {
    /// The resolved program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Warnings for every label, function and constant that was never used.
    ///
    /// # Example
    /// ```
    /// use hartz::asm::assemble;
    ///
    /// let src = "
    ///     .SIZE 4
    ///     START: HALT
    /// ";
    /// let asm = assemble(src.as_bytes()).unwrap();
    /// let warnings = asm.unused_symbol_warnings();
    /// assert_eq!(warnings.len(), 2);
    /// assert_eq!(warnings[0].message, "label START is never used");
    /// assert_eq!(warnings[1].message, "constant SIZE is never used");
    /// ```
    pub fn unused_symbol_warnings(&self) -> Vec<Diagnostic> {
        let Program { source, labels, consts, .. } = &self.program;

        labels.unused()
            .chain(consts.unused())
            .map(|sym| Diagnostic {
                severity: Severity::Warning,
                line: sym.line,
                text: source.read_line(sym.line).unwrap_or("").to_string(),
                message: format!("{} {} is never used", sym.kind, sym.name),
                help: None,
            })
            .collect()
    }
}
