//! The term store: the intermediate representation built by the first pass.
//!
//! Every parsed instruction occupies one [`Term`] holding its code bits,
//! and owns one child term per operand. Instruction terms are chained
//! (through [`Term::next`]) in program order, and each carries an ordinal
//! position which is the coordinate space of label offsets.
//!
//! All terms live in one arena ([`TermStore`]) and refer to each other by [`TermId`].

use std::collections::TryReserveError;

use super::Bits;

/// An index of a term in a [`TermStore`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TermId(usize);

/// An operand whose bits cannot be known in the first pass.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Pending {
    /// A label or constant reference (e.g., `LOOP`).
    ///
    /// The flags hold which tables the operand may be resolved against.
    Symbol {
        /// The referenced name.
        name: String,
        /// Whether the name may refer to a label.
        label: bool,
        /// Whether the name may refer to a constant.
        constant: bool
    },
    /// The digits of an explicit literal (e.g., `12` for `#12`).
    Literal(String),
}
impl std::fmt::Display for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pending::Symbol { name, .. } => f.write_str(name),
            Pending::Literal(digits)  => write!(f, "#{digits}"),
        }
    }
}

/// The content of a term.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum TermValue {
    /// Final bits of the term.
    Resolved(Bits),
    /// A reference which the second pass replaces with [`TermValue::Resolved`].
    Pending(Pending),
}

/// A node of the term store.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Term {
    value: TermValue,
    /// The ordinal of the instruction (operand terms share the ordinal of their instruction).
    position: usize,
    /// The source line this term was parsed from.
    line: usize,
    children: Vec<TermId>,
    next: Option<TermId>,
}
impl Term {
    /// The content of this term.
    pub fn value(&self) -> &TermValue {
        &self.value
    }
    /// The final bits of this term, or `None` if it is still pending.
    pub fn bits(&self) -> Option<&Bits> {
        match &self.value {
            TermValue::Resolved(bits) => Some(bits),
            TermValue::Pending(_) => None,
        }
    }
    /// The ordinal position of the instruction this term belongs to.
    pub fn position(&self) -> usize {
        self.position
    }
    /// The (1-indexed) source line of this term.
    pub fn line(&self) -> usize {
        self.line
    }
    /// The operand terms of this term, in attachment order.
    pub fn children(&self) -> &[TermId] {
        &self.children
    }
    /// The instruction term that follows this one.
    pub fn next(&self) -> Option<TermId> {
        self.next
    }
}

/// The arena holding every term of a program.
///
/// The store is append-only during the first pass.
/// The second pass only replaces pending values with resolved ones.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct TermStore {
    terms: Vec<Term>,
    head: Option<TermId>,
    tail: Option<TermId>,
    instr_count: usize,
}
impl TermStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordinal position the next instruction will receive.
    ///
    /// Labels defined before an instruction take this as their position.
    pub fn next_position(&self) -> usize {
        self.instr_count
    }

    /// The number of instructions in the store.
    pub fn instr_count(&self) -> usize {
        self.instr_count
    }

    fn alloc(&mut self, term: Term) -> Result<TermId, TryReserveError> {
        self.terms.try_reserve(1)?;
        let id = TermId(self.terms.len());
        self.terms.push(term);
        Ok(id)
    }

    /// Appends an instruction term to the end of the program.
    pub fn push_instr(&mut self, code: Bits, line: usize) -> Result<TermId, TryReserveError> {
        let id = self.alloc(Term {
            value: TermValue::Resolved(code),
            position: self.instr_count,
            line,
            children: Vec::new(),
            next: None,
        })?;

        match self.tail.replace(id) {
            Some(tail) => self.terms[tail.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.instr_count += 1;
        Ok(id)
    }

    /// Attaches an operand term to an instruction term.
    pub fn attach(&mut self, parent: TermId, value: TermValue) -> Result<TermId, TryReserveError> {
        let Term { position, line, .. } = self[parent];
        self.terms[parent.0].children.try_reserve(1)?;

        let id = self.alloc(Term { value, position, line, children: Vec::new(), next: None })?;
        self.terms[parent.0].children.push(id);
        Ok(id)
    }

    /// Replaces the value of a term with its final bits.
    pub(crate) fn resolve(&mut self, id: TermId, bits: Bits) {
        self.terms[id.0].value = TermValue::Resolved(bits);
    }

    /// Iterates over instruction terms in program order.
    pub fn instrs(&self) -> Instrs<'_> {
        Instrs { store: self, cursor: self.head }
    }

    /// Iterates over the operand terms of an instruction term.
    pub fn children(&self, id: TermId) -> impl Iterator<Item=(TermId, &Term)> + '_ {
        self[id].children.iter()
            .map(move |&c| (c, &self[c]))
    }
}
impl std::ops::Index<TermId> for TermStore {
    type Output = Term;

    fn index(&self, index: TermId) -> &Self::Output {
        &self.terms[index.0]
    }
}

/// Iterator over the instruction terms of a [`TermStore`]. See [`TermStore::instrs`].
pub struct Instrs<'s> {
    store: &'s TermStore,
    cursor: Option<TermId>,
}
impl<'s> Iterator for Instrs<'s> {
    type Item = (TermId, &'s Term);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let term = &self.store[id];
        self.cursor = term.next;
        Some((id, term))
    }
}

#[cfg(test)]
mod tests {
    use super::{Pending, TermStore, TermValue};
    use crate::ast::Bits;

    #[test]
    fn test_chain_order() {
        let mut store = TermStore::new();
        assert_eq!(store.instrs().count(), 0);

        let a = store.push_instr(Bits::from_pattern("0101"), 1).unwrap();
        store.attach(a, TermValue::Resolved(Bits::from_pattern("0"))).unwrap();
        store.attach(a, TermValue::Pending(Pending::Symbol { name: "LOOP".to_string(), label: true, constant: false })).unwrap();
        let b = store.push_instr(Bits::from_pattern("1111"), 3).unwrap();

        let positions: Vec<_> = store.instrs().map(|(_, t)| (t.position(), t.line())).collect();
        assert_eq!(positions, [(0, 1), (1, 3)]);
        assert_eq!(store.instr_count(), 2);
        assert_eq!(store.next_position(), 2);

        // operand terms are not part of the chain, and share their instruction's position
        let children: Vec<_> = store.children(a).map(|(_, t)| t.position()).collect();
        assert_eq!(children, [0, 0]);
        assert_eq!(store.children(b).count(), 0);
    }

    #[test]
    fn test_resolve() {
        let mut store = TermStore::new();
        let a = store.push_instr(Bits::from_pattern("1010"), 1).unwrap();
        let c = store.attach(a, TermValue::Pending(Pending::Literal("3".to_string()))).unwrap();
        assert_eq!(store[c].bits(), None);

        store.resolve(c, Bits::new(3, 5).unwrap());
        assert_eq!(store[c].bits().map(Bits::as_str), Some("00011"));
    }
}
