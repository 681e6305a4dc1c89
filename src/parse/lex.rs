//! Tokenizing Hartz assembly.
//!
//! This module holds the tokens that characterize Hartz assembly ([`Token`]).
//! The line reader uses it to split each (upper-cased) source line into the
//! units the parser dispatches on.
//!
//! The module's key data structure is the [`Token`] enum,
//! which lists all of the tokens of Hartz assembly.

use logos::{Lexer, Logos};

use crate::ast::instr::Opcode;

/// A unit of information in Hartz source code.
///
/// Tokens are produced from upper-cased source lines,
/// so every identifier held by a token is in upper case.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+", error = LexErr)]
pub enum Token {
    // Note, like the numeric regexes, these regexes span over tokens that are
    // technically invalid (e.g., `#12AB`, `$Q9`). They collect one discernable unit
    // and leave validation to a callback or to the operand parser.

    /// An explicit numeric literal (e.g., `#0`, `#17`).
    ///
    /// This holds the digits of the literal. Its magnitude is only checked
    /// when the literal is resolved.
    #[regex(r"#\w*", lex_literal)]
    Literal(String),

    /// A bare number without the `#` sigil (e.g., `5`).
    ///
    /// This is only accepted as the value of a constant definition.
    #[regex(r"\d\w*", lex_number)]
    Number(String),

    /// A register (e.g., `$S1`, `$D2`).
    ///
    /// The role letter and index are validated by the operand parser,
    /// so that errors can name the register shape it expected.
    #[regex(r"\$\w*", |lx| lx.slice().to_string())]
    Reg(String),

    /// An identifier.
    ///
    /// This can refer to either:
    /// - an instruction mnemonic (e.g. `ADD`, `JMP`, `HALT`)
    /// - a label or constant reference (e.g., `LOOP`, `SIZE`)
    #[regex(r"[A-Za-z_]\w*", |lx| Ident::new(lx.slice()))]
    Ident(Ident),

    /// A label definition (e.g., `LOOP:`).
    ///
    /// This holds the label's name without the colon. The name may be empty.
    #[regex(r"(?:[A-Za-z_]\w*)?:", |lx| { let s = lx.slice(); s[..s.len() - 1].to_string() })]
    LabelDef(String),

    /// A constant definition (e.g., `.SIZE`).
    ///
    /// This holds the constant's name without the dot. The name may be empty.
    #[regex(r"\.(?:[A-Za-z_]\w*)?", |lx| lx.slice()[1..].to_string())]
    ConstDef(String),

    /// A function forward declaration (e.g., `@PRINT`).
    ///
    /// This holds the function's name without the `@`. The name may be empty.
    #[regex(r"@(?:[A-Za-z_]\w*)?", |lx| lx.slice()[1..].to_string())]
    FuncDecl(String),

    /// A comma, which optionally delineates operands of an instruction
    #[token(",")]
    Comma,

    /// A comment, which starts with a semicolon and spans the remaining part of the line.
    #[regex(r";.*")]
    Comment,
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Literal(digits) => write!(f, "#{digits}"),
            Token::Number(digits)  => f.write_str(digits),
            Token::Reg(reg)        => f.write_str(reg),
            Token::Ident(id)       => id.fmt(f),
            Token::LabelDef(name)  => write!(f, "{name}:"),
            Token::ConstDef(name)  => write!(f, ".{name}"),
            Token::FuncDecl(name)  => write!(f, "@{name}"),
            Token::Comma           => f.write_str(","),
            Token::Comment         => f.write_str(";"),
        }
    }
}

/// An identifier.
///
/// This can refer to either:
/// - an instruction mnemonic (e.g. `ADD`, `NOT`, `ROT1`)
/// - a label or constant (e.g., `LOOP`, `END`, `SIZE`)
///
/// This token type is case insensitive.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Ident {
    #[allow(missing_docs)]
    Opcode(Opcode),
    #[allow(missing_docs)]
    Label(String)
}
impl Ident {
    /// Classifies an identifier as either a mnemonic or a label.
    pub fn new(s: &str) -> Self {
        match s.parse::<Opcode>() {
            Ok(op) => Self::Opcode(op),
            Err(_) => Self::Label(s.to_uppercase()),
        }
    }
}
impl std::str::FromStr for Ident {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opcode(op) => op.fmt(f),
            Self::Label(id)  => f.write_str(id),
        }
    }
}

/// Any errors raised in attempting to tokenize a source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal could not be parsed because it has invalid digits (i.e., not 0-9)
    InvalidNumeric,
    /// Numeric literal has no digits in it (it's just `#`)
    InvalidDecEmpty,
    /// A symbol was used which is not allowed in Hartz assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::InvalidNumeric  => f.write_str("invalid decimal literal"),
            LexErr::InvalidDecEmpty => f.write_str("invalid decimal literal"),
            LexErr::InvalidSymbol   => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::InvalidNumeric  => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidDecEmpty => Some("there should be digits (0-9) after the #".into()),
            LexErr::InvalidSymbol   => Some("this char does not occur in any token in Hartz assembly".into()),
        }
    }
}

/// Checks that a run of characters is a non-empty run of decimal digits.
fn validate_digits(digits: &str) -> Result<String, LexErr> {
    match digits {
        "" => Err(LexErr::InvalidDecEmpty),
        d if d.bytes().all(|b| b.is_ascii_digit()) => Ok(d.to_string()),
        _ => Err(LexErr::InvalidNumeric),
    }
}
fn lex_literal(lx: &Lexer<'_, Token>) -> Result<String, LexErr> {
    validate_digits(&lx.slice()[1..])
}
fn lex_number(lx: &Lexer<'_, Token>) -> Result<String, LexErr> {
    validate_digits(lx.slice())
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::ast::instr::Opcode;
    use crate::err::LexErr;
    use crate::parse::lex::{Ident, Token};

    fn label(s: &str) -> Token {
        Token::Ident(Ident::Label(s.to_string()))
    }
    fn literal(s: &str) -> Token {
        Token::Literal(s.to_string())
    }
    fn reg(s: &str) -> Token {
        Token::Reg(s.to_string())
    }

    #[test]
    fn test_literal_success() {
        let mut tokens = Token::lexer("#0 #12 #31 #99999999999999999999");
        assert_eq!(tokens.next(), Some(Ok(literal("0"))));
        assert_eq!(tokens.next(), Some(Ok(literal("12"))));
        assert_eq!(tokens.next(), Some(Ok(literal("31"))));
        // magnitude is checked at resolution, not here
        assert_eq!(tokens.next(), Some(Ok(literal("99999999999999999999"))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer("5 012");
        assert_eq!(tokens.next(), Some(Ok(Token::Number("5".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number("012".to_string()))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_literal_invalid() {
        assert_eq!(Token::lexer("#Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("#1A").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("#").next(), Some(Err(LexErr::InvalidDecEmpty)));
    }

    #[test]
    fn test_regs() {
        // Shape is not validated by the lexer:
        let mut tokens = Token::lexer("$S1 $S2 $D1 $D2 $X1 $S9 $");
        assert_eq!(tokens.next(), Some(Ok(reg("$S1"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$S2"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$D1"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$D2"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$X1"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$S9"))));
        assert_eq!(tokens.next(), Some(Ok(reg("$"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_keywords_labels() {
        let kws = "NOT SHL SHR OR AND ADD SW LW BEZ ROT1 ROT JMP HALT NOP";
        for m_token in Token::lexer(kws) {
            let token = m_token.unwrap();
            assert!(
                matches!(token, Token::Ident(Ident::Opcode(_))),
                "Expected {token:?} to be keyword"
            );
        }

        // Case insensitivity
        let mut tokens = Token::lexer("ADD ADd AdD add");
        for _ in 0..4 {
            assert_eq!(tokens.next(), Some(Ok(Token::Ident(Ident::Opcode(Opcode::ADD)))));
        }
        assert_eq!(tokens.next(), None);

        // Labels
        let mut tokens = Token::lexer("LOOP ROT2 _ END_1");
        assert_eq!(tokens.next(), Some(Ok(label("LOOP"))));
        assert_eq!(tokens.next(), Some(Ok(label("ROT2"))));
        assert_eq!(tokens.next(), Some(Ok(label("_"))));
        assert_eq!(tokens.next(), Some(Ok(label("END_1"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_definitions() {
        let mut tokens = Token::lexer("LOOP: : .SIZE . @PRINT @");
        assert_eq!(tokens.next(), Some(Ok(Token::LabelDef("LOOP".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::LabelDef(String::new()))));
        assert_eq!(tokens.next(), Some(Ok(Token::ConstDef("SIZE".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::ConstDef(String::new()))));
        assert_eq!(tokens.next(), Some(Ok(Token::FuncDecl("PRINT".to_string()))));
        assert_eq!(tokens.next(), Some(Ok(Token::FuncDecl(String::new()))));
        assert_eq!(tokens.next(), None);

        // Defined names follow the same rules as referenced names.
        let mut tokens = Token::lexer("1X: .2Y @9");
        assert_eq!(tokens.next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(tokens.next(), Some(Ok(Token::LabelDef(String::new()))));
        assert_eq!(tokens.next(), Some(Ok(Token::ConstDef(String::new()))));
        assert_eq!(tokens.next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(tokens.next(), Some(Ok(Token::FuncDecl(String::new()))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number("9".to_string()))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_punct() {
        let mut tokens = Token::lexer("ADD $S1,$S2, $D1 ;; abc, def");
        assert_eq!(tokens.next(), Some(Ok(Token::Ident(Ident::Opcode(Opcode::ADD)))));
        assert_eq!(tokens.next(), Some(Ok(reg("$S1"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comma)));
        assert_eq!(tokens.next(), Some(Ok(reg("$S2"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comma)));
        assert_eq!(tokens.next(), Some(Ok(reg("$D1"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_invalid_symbol() {
        for c in ['!', '%', '&', '*', '(', ')', '+', '-', '/', '<', '=', '>', '?', '[', ']', '{', '}', '|', '~', '"'] {
            let string = c.to_string();
            assert_eq!(
                Token::lexer(&string).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {string:?} to be an invalid symbol"
            );
        }
    }
}
