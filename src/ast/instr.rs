//! The instruction catalog.
//!
//! Each mnemonic of Hartz assembly ([`Opcode`]) maps to an [`InstrSpec`]:
//! its bit pattern, the template of operands it accepts, and the
//! extension bits (if any) appended after the operands.
//!
//! | mnemonic | code    | operands          | ext.  |
//! |----------|---------|-------------------|-------|
//! | `NOT`    | `0000`  | `$S`, `$D`        |       |
//! | `SHL`    | `0001`  | `$S`, `$D`        |       |
//! | `SHR`    | `0010`  | `$S`, `$D`        |       |
//! | `OR`     | `0011`  | `$S`, `$S`, `$D`  |       |
//! | `AND`    | `0100`  | `$S`, `$S`, `$D`  |       |
//! | `ADD`    | `0101`  | `$S`, `$S`, `$D`  |       |
//! | `SW`     | `0110`  | `$S`, `[c n]`     |       |
//! | `LW`     | `0111`  | `$D`, `[c n]`     |       |
//! | `BEZ`    | `1000`  | `$S`, `[l c n]`   |       |
//! | `ROT1`   | `1001`  |                   | `000` |
//! | `ROT`    | `10011` | `$S`              |       |
//! | `JMP`    | `1010`  | `[l c n]`         |       |
//! | `HALT`   | `1111`  |                   | `000` |
//! | `NOP`    | `1111`  |                   | `001` |

use super::machine;

macro_rules! opcode_enum {
    ($($instr:ident => ($code:literal, [$($operand:expr),*], $ext:expr)),+ $(,)?) => {
        /// An instruction mnemonic.
        ///
        /// Parsing a mnemonic from a string is case insensitive.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Opcode {
            $(
                #[allow(missing_docs)]
                $instr
            ),+
        }

        impl Opcode {
            /// Every mnemonic, in catalog order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$instr),+];

            /// Gets the catalog entry of this mnemonic.
            pub fn spec(self) -> &'static InstrSpec {
                match self {
                    $(
                        Opcode::$instr => {
                            const SPEC: InstrSpec = InstrSpec {
                                code: $code,
                                template: &[$($operand),*],
                                ext: $ext,
                            };
                            &SPEC
                        }
                    ),+
                }
            }
        }

        impl std::str::FromStr for Opcode {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_uppercase() {
                    $(stringify!($instr) => Ok(Self::$instr)),*,
                    _ => Err(())
                }
            }
        }

        impl std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$instr => f.write_str(stringify!($instr))),*
                }
            }
        }
    };
}

use Operand::{DestReg as D, Either, SourceReg as S};
const LCN: Operand = Either(&[Operand::Label, Operand::Constant, Operand::Literal]);
const CN: Operand = Either(&[Operand::Constant, Operand::Literal]);

opcode_enum! {
    NOT  => ("0000",  [S, D],    None),
    SHL  => ("0001",  [S, D],    None),
    SHR  => ("0010",  [S, D],    None),
    OR   => ("0011",  [S, S, D], None),
    AND  => ("0100",  [S, S, D], None),
    ADD  => ("0101",  [S, S, D], None),
    SW   => ("0110",  [S, CN],   None),
    LW   => ("0111",  [D, CN],   None),
    BEZ  => ("1000",  [S, LCN],  None),
    ROT1 => ("1001",  [],        Some("000")),
    ROT  => ("10011", [S],       None),
    JMP  => ("1010",  [LCN],     None),
    HALT => ("1111",  [],        Some("000")),
    NOP  => ("1111",  [],        Some("001")),
}

/// The kind of operand an instruction accepts at a given position.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Operand {
    /// A source register (e.g., `$S1`). Encoded immediately.
    SourceReg,
    /// A destination register (e.g., `$D1`). Encoded immediately.
    DestReg,
    /// A label reference. Resolved to an offset in the second pass.
    Label,
    /// A constant reference. Resolved to the constant's value in the second pass.
    Constant,
    /// An explicit literal (e.g., `#3`). Validated in the second pass.
    Literal,
    /// Any of the listed operands; the first which parses wins.
    Either(&'static [Operand])
}
impl Operand {
    /// The largest number of bits this operand can encode to.
    pub fn max_width(self) -> usize {
        match self {
            Operand::SourceReg | Operand::DestReg => machine::REG_BITS as usize,
            Operand::Label | Operand::Constant | Operand::Literal => machine::OPERAND_BITS as usize,
            Operand::Either(alts) => alts.iter().map(|o| o.max_width()).max().unwrap_or(0),
        }
    }
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::SourceReg => f.write_str("$Sx"),
            Operand::DestReg   => f.write_str("$Dx"),
            Operand::Label     => f.write_str("label"),
            Operand::Constant  => f.write_str("constant"),
            Operand::Literal   => f.write_str("#n"),
            Operand::Either(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i != 0 { f.write_str(" or ")?; }
                    alt.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

/// The catalog entry of a mnemonic.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InstrSpec {
    /// The bit pattern which starts the instruction word.
    pub code: &'static str,
    /// The operands, in the order they appear in source and in the instruction word.
    pub template: &'static [Operand],
    /// Extension bits which follow the operands.
    pub ext: Option<&'static str>,
}
impl InstrSpec {
    /// The largest number of bits an instruction of this kind can encode to.
    pub fn max_width(&self) -> usize {
        self.code.len()
            + self.template.iter().map(|o| o.max_width()).sum::<usize>()
            + self.ext.map_or(0, str::len)
    }
}

#[cfg(test)]
mod tests {
    use super::{Opcode, Operand};
    use crate::ast::machine;

    #[test]
    fn test_catalog_fits_word() {
        for &op in Opcode::ALL {
            let spec = op.spec();
            assert!(spec.max_width() <= machine::WORD_SIZE, "{op} does not fit in a word");
            assert!(spec.template.len() <= 3, "{op} has too many operands");
        }
    }

    #[test]
    fn test_catalog_codes_distinct() {
        let words: Vec<_> = Opcode::ALL.iter()
            .map(|op| {
                let spec = op.spec();
                format!("{}{}", spec.code, spec.ext.unwrap_or(""))
            })
            .collect();

        for (i, a) in words.iter().enumerate() {
            for b in &words[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_mnemonic_parse() {
        for &op in Opcode::ALL {
            assert_eq!(op.to_string().parse::<Opcode>(), Ok(op));
            assert_eq!(op.to_string().to_lowercase().parse::<Opcode>(), Ok(op));
        }
        assert_eq!("ROT2".parse::<Opcode>(), Err(()));
        assert_eq!("".parse::<Opcode>(), Err(()));
    }

    #[test]
    fn test_operand_display() {
        assert_eq!(Opcode::JMP.spec().template[0].to_string(), "label or constant or #n");
        assert_eq!(Operand::SourceReg.to_string(), "$Sx");
    }
}
