//! Facts, patterns, and the lazy pattern-bound stream over an external
//! triple index. The index itself — beyond the `lookup`/`insert` surface
//! the reasoner and driver need — is out of this crate's scope; `MemIndex`
//! is a reference implementation good enough to run the whole stack in
//! tests.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::Result;

pub type TermId = u64;

/// A triple of ground term ids — the unit of storage once both the subject
/// and predicate and object have been dictionary- or inline-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fact {
    pub s: TermId,
    pub p: TermId,
    pub o: TermId,
}

impl Fact {
    pub fn new(s: TermId, p: TermId, o: TermId) -> Self {
        Fact { s, p, o }
    }
}

/// One slot of a triple pattern: either free (`Var`) or bound to a concrete
/// id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Var(String),
    Bound(TermId),
}

impl Slot {
    pub fn var(name: impl Into<String>) -> Self {
        Slot::Var(name.into())
    }

    pub fn bound(id: TermId) -> Self {
        Slot::Bound(id)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Slot::Var(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub s: Slot,
    pub p: Slot,
    pub o: Slot,
}

impl Pattern {
    pub fn new(s: Slot, p: Slot, o: Slot) -> Self {
        Pattern { s, p, o }
    }

    /// All three slots bound: a lookup against this pattern is an existence
    /// check, never more than one result.
    pub fn is_fully_bound(&self) -> bool {
        !self.s.is_var() && !self.p.is_var() && !self.o.is_var()
    }
}

/// The minimal interface the reasoner and driver need from the external
/// triple index: pattern-bound lookup, an existence check, and batched
/// insertion. On-disk layout, secondary indexing, and compaction are the
/// real engine's concern, not this crate's.
pub trait TripleIndex: Send + Sync {
    fn lookup(&self, pattern: &Pattern) -> Vec<Fact>;
    fn contains(&self, fact: &Fact) -> bool;
    /// Inserts `facts`, returning the subset that were not already present.
    fn insert_batch(&self, facts: &[Fact]) -> Result<Vec<Fact>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn slot_matches(slot: &Slot, value: TermId) -> bool {
    match slot {
        Slot::Var(_) => true,
        Slot::Bound(id) => *id == value,
    }
}

/// A lazy, finite, non-restartable sequence of id-triples bound to a
/// pattern. Each `TripleStream` is consumed once; constructing a new one
/// for the same pattern re-queries the index.
pub struct TripleStream {
    facts: std::vec::IntoIter<Fact>,
}

impl TripleStream {
    pub fn new(index: &dyn TripleIndex, pattern: &Pattern) -> Self {
        if pattern.is_fully_bound() {
            let (Slot::Bound(s), Slot::Bound(p), Slot::Bound(o)) = (&pattern.s, &pattern.p, &pattern.o) else {
                unreachable!("is_fully_bound guarantees every slot is Bound");
            };
            let fact = Fact::new(*s, *p, *o);
            let facts = if index.contains(&fact) { vec![fact] } else { vec![] };
            TripleStream { facts: facts.into_iter() }
        } else {
            TripleStream {
                facts: index.lookup(pattern).into_iter(),
            }
        }
    }
}

impl Iterator for TripleStream {
    type Item = Fact;

    fn next(&mut self) -> Option<Fact> {
        self.facts.next()
    }
}

/// Reference `TripleIndex`: a single in-memory set, scanned linearly for
/// pattern matches. Adequate for tests and small embedded graphs; a real
/// deployment is expected to plug in an indexed external engine.
#[derive(Default)]
pub struct MemIndex {
    facts: RwLock<HashSet<Fact>>,
}

impl MemIndex {
    pub fn new() -> Self {
        MemIndex::default()
    }

    pub fn snapshot(&self) -> Vec<Fact> {
        self.facts.read().expect("MemIndex lock poisoned").iter().copied().collect()
    }
}

impl TripleIndex for MemIndex {
    fn lookup(&self, pattern: &Pattern) -> Vec<Fact> {
        let facts = self.facts.read().expect("MemIndex lock poisoned");
        facts
            .iter()
            .filter(|f| slot_matches(&pattern.s, f.s) && slot_matches(&pattern.p, f.p) && slot_matches(&pattern.o, f.o))
            .copied()
            .collect()
    }

    fn contains(&self, fact: &Fact) -> bool {
        self.facts.read().expect("MemIndex lock poisoned").contains(fact)
    }

    fn insert_batch(&self, new_facts: &[Fact]) -> Result<Vec<Fact>> {
        let mut facts = self.facts.write().expect("MemIndex lock poisoned");
        let mut inserted = Vec::new();
        for f in new_facts {
            if facts.insert(*f) {
                inserted.push(*f);
            }
        }
        Ok(inserted)
    }

    fn len(&self) -> usize {
        self.facts.read().expect("MemIndex lock poisoned").len()
    }
}
