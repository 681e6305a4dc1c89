//! Components relating to the intermediate representation
//! used in assembling Hartz source code.
//!
//! These components together are used to construct...
//! - [`instr::InstrSpec`] (the instruction catalog entry of a mnemonic),
//! - and [`term::TermStore`] (the arena holding every parsed instruction and operand).

pub mod instr;
pub mod term;

use std::fmt::Write as _;

/// The constraints of the Hartz machine.
///
/// These are compiled into the instruction catalog and the resolver.
pub mod machine {
    /// Number of registers of each role (`$S1`..`$S2`, `$D1`..`$D2`).
    pub const MAX_REGS: u8 = 2;
    /// Number of bits an encoded register takes.
    pub const REG_BITS: u32 = 1;
    /// Number of words of instruction memory.
    ///
    /// Label offsets wrap around modulo this size.
    pub const MEMORY_SIZE: i64 = 28;
    /// Number of words in the data cache.
    pub const CACHE_SIZE: u32 = 6;
    /// Number of bits an encoded label offset, constant or literal takes.
    pub const OPERAND_BITS: u32 = 5;
    /// The largest value a literal or constant operand can hold.
    pub const MAX_LITERAL: u64 = (1 << OPERAND_BITS) - 1;
    /// Number of characters in every emitted instruction word.
    pub const WORD_SIZE: usize = 10;
}

/// The role of a register operand.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum RegRole {
    /// A source register (`$S1`, `$S2`).
    Source,
    /// A destination register (`$D1`, `$D2`).
    Dest
}
impl RegRole {
    /// The letter which follows `$` in a register of this role.
    pub fn letter(self) -> char {
        match self {
            RegRole::Source => 'S',
            RegRole::Dest   => 'D',
        }
    }

    /// The generic shape of a register of this role, used in diagnostics.
    pub fn shape(self) -> &'static str {
        match self {
            RegRole::Source => "$Sx",
            RegRole::Dest   => "$Dx",
        }
    }
}

/// A register. Its index is always between 1 and [`machine::MAX_REGS`].
///
/// ## Examples
///
/// ```text
/// ADD $S1, $S2, $D1
///     ~~~  ~~~  ~~~
/// NOT $S2, $D2
///     ~~~  ~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg {
    role: RegRole,
    index: u8
}
impl Reg {
    /// Creates a register, returning `None` if the index is out of range.
    pub fn new(role: RegRole, index: u8) -> Option<Self> {
        (1..=machine::MAX_REGS).contains(&index)
            .then_some(Reg { role, index })
    }

    /// Parses a register token (e.g., `$S1`) of the given role.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hartz::ast::{Reg, RegRole};
    /// #
    /// assert!(Reg::parse("$S1", RegRole::Source).is_some());
    /// assert!(Reg::parse("$D2", RegRole::Dest).is_some());
    /// assert!(Reg::parse("$D1", RegRole::Source).is_none());
    /// assert!(Reg::parse("$S3", RegRole::Source).is_none());
    /// assert!(Reg::parse("$X1", RegRole::Source).is_none());
    /// ```
    pub fn parse(token: &str, role: RegRole) -> Option<Self> {
        let rest = token.strip_prefix('$')?
            .strip_prefix(role.letter())?;

        // reject signs and other non-digits, which u8::from_str would accept
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(role, rest.parse().ok()?)
    }

    /// Gets the role of this register.
    pub fn role(self) -> RegRole {
        self.role
    }

    /// Gets the register number of this [`Reg`]. This is always between 1 and [`machine::MAX_REGS`].
    pub fn reg_no(self) -> u8 {
        self.index
    }

    /// The encoded (zero-based) bits of this register.
    pub fn bits(self) -> Bits {
        Bits::new_trunc(i64::from(self.index) - 1, machine::REG_BITS)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}{}", self.role.letter(), self.index)
    }
}

/// A fixed-width string of binary digits.
///
/// Every value written to the output (opcodes, registers, offsets, literals)
/// is held as [`Bits`] once it is resolved.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct Bits(String);

/// The errors that can result from calling [`Bits::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BitsNewErr {
    /// The provided value cannot fit an unsigned integer of the given bitsize.
    CannotFitUnsigned(u32),
}
impl std::fmt::Display for BitsNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitsNewErr::CannotFitUnsigned(n) => write!(f, "value is too big for unsigned {n}-bit integer"),
        }
    }
}
impl std::error::Error for BitsNewErr {}
impl crate::err::Error for BitsNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            BitsNewErr::CannotFitUnsigned(n) => Some(format!("the range for an unsigned {n}-bit integer is [0, {}]", (1u64 << n) - 1).into()),
        }
    }
}

impl Bits {
    /// Creates the bits of an unsigned value.
    /// This must fit within `width` bits, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hartz::ast::Bits;
    /// #
    /// assert_eq!(Bits::new(5, 5).unwrap().as_str(), "00101");
    /// assert_eq!(Bits::new(31, 5).unwrap().as_str(), "11111");
    /// assert!(Bits::new(32, 5).is_err());
    /// ```
    pub fn new(value: u64, width: u32) -> Result<Self, BitsNewErr> {
        match width >= u64::BITS || value >> width == 0 {
            true  => Ok(Self::new_trunc(value as i64, width)),
            false => Err(BitsNewErr::CannotFitUnsigned(width)),
        }
    }

    /// Creates bits by taking the low `width` bits of the
    /// (two's complement) value, and discarding the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hartz::ast::Bits;
    /// #
    /// assert_eq!(Bits::new_trunc(27, 5).as_str(), "11011");
    /// assert_eq!(Bits::new_trunc(-1, 5).as_str(),  "11111");
    /// assert_eq!(Bits::new_trunc(33, 5).as_str(),  "00001");
    /// ```
    pub fn new_trunc(value: i64, width: u32) -> Self {
        let mut buf = String::with_capacity(width as usize);
        for bit in (0..width).rev() {
            let set = bit < i64::BITS && (value >> bit) & 1 == 1;
            buf.push(if set { '1' } else { '0' });
        }
        Self(buf)
    }

    /// Wraps a pattern of binary digits from the instruction catalog.
    pub(crate) fn from_pattern(pattern: &str) -> Self {
        debug_assert!(pattern.bytes().all(|b| matches!(b, b'0' | b'1')), "pattern should be binary: {pattern}");
        Self(pattern.to_string())
    }

    /// The number of binary digits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this holds no digits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the binary digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('b')?;
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{machine, Bits, Reg, RegRole};

    #[test]
    fn test_reg_bits() {
        let s1 = Reg::parse("$S1", RegRole::Source).unwrap();
        let d2 = Reg::parse("$D2", RegRole::Dest).unwrap();
        assert_eq!(s1.bits().as_str(), "0");
        assert_eq!(d2.bits().as_str(), "1");
        assert_eq!(s1.to_string(), "$S1");
        assert_eq!(d2.to_string(), "$D2");
    }

    #[test]
    fn test_reg_invalid() {
        assert_eq!(Reg::new(RegRole::Source, 0), None);
        assert_eq!(Reg::new(RegRole::Source, machine::MAX_REGS + 1), None);
        assert_eq!(Reg::parse("$S", RegRole::Source), None);
        assert_eq!(Reg::parse("$S+1", RegRole::Source), None);
        assert_eq!(Reg::parse("S1", RegRole::Source), None);
        assert_eq!(Reg::parse("$D1", RegRole::Source), None);
    }

    #[test]
    fn test_bits_limits() {
        assert_eq!(Bits::new(machine::MAX_LITERAL, machine::OPERAND_BITS).map(|b| b.len()), Ok(5));
        assert!(Bits::new(machine::MAX_LITERAL + 1, machine::OPERAND_BITS).is_err());
        assert_eq!(Bits::new(0, 0).map(|b| b.is_empty()), Ok(true));
        assert_eq!(Bits::new_trunc(-1, 70).len(), 70);
    }
}
