//! Encoding resolved instructions into the output format.
//!
//! Every instruction becomes one [`Word`]: its code bits, followed by the bits
//! of each operand (and any extension bits) in template order, zero-padded on the
//! right up to [`WORD_SIZE`] characters.
//!
//! The output file holds one word per line, in program order:
//! ```text
//! 0101010000
//! 1010110110
//! ```

use std::io::Write;

use super::Assembly;
use crate::ast::instr::Opcode;
use crate::ast::machine::WORD_SIZE;
use crate::ast::term::{Term, TermId, TermStore};

/// One encoded instruction: exactly [`WORD_SIZE`] binary digits.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Word(String);
impl Word {
    /// Encodes an instruction term and its operands.
    ///
    /// # Panics
    ///
    /// This panics if any operand of the instruction is still pending.
    /// This never happens for terms of an [`Assembly`].
    pub(crate) fn encode(terms: &TermStore, id: TermId) -> Self {
        let mut buf = String::with_capacity(WORD_SIZE);
        push_bits(&mut buf, &terms[id]);
        for (_, child) in terms.children(id) {
            push_bits(&mut buf, child);
        }

        Self::padded(buf)
    }

    fn padded(mut buf: String) -> Self {
        debug_assert!(buf.len() <= WORD_SIZE, "encoded instruction overflows word: {buf}");
        while buf.len() < WORD_SIZE {
            buf.push('0');
        }
        Self(buf)
    }

    /// Gets the binary digits of this word.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_bits(buf: &mut String, term: &Term) {
    match term.bits() {
        Some(bits) => buf.push_str(bits.as_str()),
        None => unreachable!("term on line {} was not resolved before encoding", term.line()),
    }
}

/// The word of a lone `HALT` instruction.
///
/// # Example
/// ```
/// assert_eq!(hartz::asm::encoding::halt_word().as_str(), "1111000000");
/// ```
pub fn halt_word() -> Word {
    let spec = Opcode::HALT.spec();
    Word::padded(format!("{}{}", spec.code, spec.ext.unwrap_or("")))
}

/// Writes words to a stream, one per line.
pub fn write_words<'w, W: Write>(mut out: W, words: impl IntoIterator<Item=&'w Word>) -> std::io::Result<()> {
    for word in words {
        writeln!(out, "{word}")?;
    }
    out.flush()
}

impl Assembly {
    /// Encodes every instruction, in program order.
    pub fn words(&self) -> impl Iterator<Item=Word> + '_ {
        let terms = self.program().terms();
        terms.instrs().map(move |(id, _)| Word::encode(terms, id))
    }

    /// Writes every instruction word to a stream, one per line.
    ///
    /// # Example
    /// ```
    /// use hartz::asm::assemble;
    ///
    /// let asm = assemble("NOP\nHALT".as_bytes()).unwrap();
    /// let mut out = vec![];
    /// asm.write_words(&mut out).unwrap();
    /// assert_eq!(out, b"1111001000\n1111000000\n");
    /// ```
    pub fn write_words<W: Write>(&self, out: W) -> std::io::Result<()> {
        let words: Vec<_> = self.words().collect();
        write_words(out, &words)
    }
}

#[cfg(test)]
mod tests {
    use super::{halt_word, write_words, Word};
    use crate::asm::assemble;
    use crate::ast::machine::WORD_SIZE;

    #[test]
    fn test_word_padding() {
        let word = Word::padded("1001000".to_string());
        assert_eq!(word.as_str(), "1001000000");
        assert_eq!(word.as_str().len(), WORD_SIZE);
        assert_eq!(halt_word().to_string(), "1111000000");
    }

    #[test]
    fn test_three_operand_words() {
        let asm = assemble("OR $S2, $S1, $D2\nAND $S1 $S1 $D1\nNOT $S2, $D1".as_bytes()).unwrap();
        let words: Vec<_> = asm.words().map(|w| w.to_string()).collect();
        assert_eq!(words, ["0011101000", "0100000000", "0000100000"]);
    }

    #[test]
    fn test_rot_words() {
        let asm = assemble("ROT1\nROT $S2".as_bytes()).unwrap();
        let words: Vec<_> = asm.words().map(|w| w.to_string()).collect();
        assert_eq!(words, ["1001000000", "1001110000"]);
    }

    #[test]
    fn test_write_words() {
        let mut out = vec![];
        write_words(&mut out, &[halt_word(), halt_word()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1111000000\n1111000000\n");

        // an empty program writes nothing
        let asm = assemble("; nothing here\n".as_bytes()).unwrap();
        let mut out = vec![];
        asm.write_words(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
