//! The public façade: wires `DictionaryStore`, a `TripleIndex`, and
//! `DeltaEngine` behind a small state machine (`Idle` / `Extending` /
//! `Reasoning` / `Partial`) so inserts and materialization rounds never
//! overlap against the same index.

use std::sync::{Arc, Mutex};

use crate::dictionary::DictionaryStore;
use crate::error::Result;
use crate::events::{Event, Sink};
use crate::options::StoreOptions;
use crate::reasoner::{CancellationToken, DeltaEngine, MaterializeOutcome};
use crate::rule::Rule;
use crate::storage::Storage;
use crate::term::Term;
use crate::triple::{Fact, Pattern, TermId, TripleIndex, TripleStream};

/// Driver state. `Partial` is sticky: it only clears via `resume` or
/// `reset`, or implicitly the moment a new insert moves the store back to
/// `Extending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Extending,
    Reasoning,
    Partial,
}

struct Inner {
    state: State,
    last_outcome: Option<MaterializeOutcome>,
}

pub struct Driver {
    dictionary: DictionaryStore,
    index: Arc<dyn TripleIndex>,
    opts: StoreOptions,
    sink: Option<Arc<dyn Sink>>,
    inner: Mutex<Inner>,
}

impl Driver {
    pub fn open(storage: Arc<dyn Storage>, index: Arc<dyn TripleIndex>, opts: StoreOptions) -> Result<Self> {
        Ok(Driver {
            dictionary: DictionaryStore::open(storage, &opts.sequence)?,
            index,
            opts,
            sink: None,
            inner: Mutex::new(Inner {
                state: State::Idle,
                last_outcome: None,
            }),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, event: Event) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    pub fn state(&self) -> State {
        self.inner.lock().expect("driver state lock poisoned").state
    }

    /// Resolves `term` to its id, allocating one if this is the first time
    /// it's been seen. A plain round-trip helper, not an insert — it never
    /// touches driver state.
    pub fn term_to_id(&self, term: &Term) -> Result<TermId> {
        self.dictionary.get_or_create_id(term)
    }

    pub fn id_to_term(&self, id: TermId) -> Result<Option<Term>> {
        self.dictionary.lookup_term(id)
    }

    fn begin_extending(&self) {
        let mut inner = self.inner.lock().expect("driver state lock poisoned");
        inner.state = State::Extending;
    }

    /// Encodes `s`, `p`, `o`, inserts the resulting fact into the index, and
    /// emits `insert.start`/`insert.stop`.
    pub fn insert(&self, s: &Term, p: &Term, o: &Term) -> Result<()> {
        self.insert_batch(&[(s.clone(), p.clone(), o.clone())])
    }

    /// Batched insert: encodes every triple via the dictionary, then commits
    /// all facts in a single index write.
    pub fn insert_batch(&self, triples: &[(Term, Term, Term)]) -> Result<()> {
        self.begin_extending();
        log::info!("insert: {} triples", triples.len());
        self.emit(Event::InsertStart);

        let mut terms = Vec::with_capacity(triples.len() * 3);
        for (s, p, o) in triples {
            terms.push(s.clone());
            terms.push(p.clone());
            terms.push(o.clone());
        }
        let ids = self.dictionary.get_or_create_ids(&terms)?;

        let facts: Vec<Fact> = ids.chunks_exact(3).map(|c| Fact::new(c[0], c[1], c[2])).collect();
        let inserted = self.index.insert_batch(&facts)?;

        self.inner.lock().expect("driver state lock poisoned").state = State::Idle;
        log::debug!("insert: {} new facts, {} already present", inserted.len(), facts.len() - inserted.len());
        self.emit(Event::InsertStop { count: inserted.len() });
        Ok(())
    }

    pub fn lookup(&self, pattern: &Pattern) -> TripleStream {
        TripleStream::new(self.index.as_ref(), pattern)
    }

    /// Runs the delta engine to fixpoint (or until the derivation cap or a
    /// cancellation fires), starting Δ₀ from the store's current extent.
    /// Moves the store to `Reasoning` for the duration and leaves it `Idle`
    /// on a clean fixpoint, or `Partial` if the cap was hit.
    pub fn materialize(&self, rules: &[Rule], cancel: &CancellationToken) -> Result<MaterializeOutcome> {
        {
            let mut inner = self.inner.lock().expect("driver state lock poisoned");
            inner.state = State::Reasoning;
        }

        log::info!("materialize: starting with {} rules", rules.len());
        self.emit(Event::MaterializeStart);

        let initial_delta = self.index.lookup(&Pattern::new(
            crate::triple::Slot::var("s"),
            crate::triple::Slot::var("p"),
            crate::triple::Slot::var("o"),
        ));
        let outcome = DeltaEngine::run(self.index.as_ref(), rules, initial_delta, self.opts.reason.max_derivations, cancel)?;

        self.emit(Event::MaterializeIteration { derivations: outcome.total_derived });
        log::info!(
            "materialize: {} rounds, {} total derivations, limit_reached={}, cancelled={}",
            outcome.iterations,
            outcome.total_derived,
            outcome.limit_reached,
            outcome.cancelled
        );
        self.emit(Event::MaterializeStop {
            iterations: outcome.iterations,
            total_derived: outcome.total_derived,
        });

        let mut inner = self.inner.lock().expect("driver state lock poisoned");
        inner.state = if outcome.limit_reached { State::Partial } else { State::Idle };
        inner.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Clears a `Partial` state without running any further rounds —
    /// callers who only want to inspect the partial extent use this; those
    /// who want to keep deriving call `materialize` again instead.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("driver state lock poisoned");
        inner.state = State::Idle;
        inner.last_outcome = None;
    }

    pub fn close(&self) {
        self.dictionary.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mem::MemStorage;
    use crate::triple::{MemIndex, Slot};

    fn driver() -> Driver {
        Driver::open(Arc::new(MemStorage::new()), Arc::new(MemIndex::new()), StoreOptions::default()).unwrap()
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let d = driver();
        let (a, p, b) = (Term::iri("urn:a"), Term::iri("urn:p"), Term::iri("urn:b"));
        d.insert(&a, &p, &b).unwrap();

        let aid = d.term_to_id(&a).unwrap();
        let pid = d.term_to_id(&p).unwrap();
        let bid = d.term_to_id(&b).unwrap();
        let pattern = Pattern::new(Slot::bound(aid), Slot::bound(pid), Slot::bound(bid));
        assert_eq!(d.lookup(&pattern).count(), 1);
        assert_eq!(d.state(), State::Idle);
    }

    #[test]
    fn materialize_derives_transitive_closure() {
        let d = driver();
        let p = Term::iri("urn:p");
        for (s, o) in [("urn:a", "urn:b"), ("urn:b", "urn:c"), ("urn:c", "urn:d")] {
            d.insert(&Term::iri(s), &p, &Term::iri(o)).unwrap();
        }
        let pid = d.term_to_id(&p).unwrap();
        let rule = Rule::new(
            "transitive",
            vec![
                Pattern::new(Slot::var("x"), Slot::bound(pid), Slot::var("y")),
                Pattern::new(Slot::var("y"), Slot::bound(pid), Slot::var("z")),
            ],
            Pattern::new(Slot::var("x"), Slot::bound(pid), Slot::var("z")),
        );
        let outcome = d.materialize(&[rule], &CancellationToken::new()).unwrap();
        assert_eq!(outcome.total_derived, 3);
        assert_eq!(d.state(), State::Idle);

        let aid = d.term_to_id(&Term::iri("urn:a")).unwrap();
        let did = d.term_to_id(&Term::iri("urn:d")).unwrap();
        let pattern = Pattern::new(Slot::bound(aid), Slot::bound(pid), Slot::bound(did));
        assert_eq!(d.lookup(&pattern).count(), 1);
    }

    #[test]
    fn derivation_cap_leaves_store_partial() {
        let opts = StoreOptions {
            reason: crate::options::ReasonOptions { max_derivations: 1 },
            ..StoreOptions::default()
        };
        let d = Driver::open(Arc::new(MemStorage::new()), Arc::new(MemIndex::new()), opts).unwrap();
        let p = Term::iri("urn:p");
        d.insert(&Term::iri("urn:a"), &p, &Term::iri("urn:b")).unwrap();
        d.insert(&Term::iri("urn:b"), &p, &Term::iri("urn:c")).unwrap();
        d.insert(&Term::iri("urn:c"), &p, &Term::iri("urn:d")).unwrap();
        let pid = d.term_to_id(&p).unwrap();
        let rule = Rule::new(
            "transitive",
            vec![
                Pattern::new(Slot::var("x"), Slot::bound(pid), Slot::var("y")),
                Pattern::new(Slot::var("y"), Slot::bound(pid), Slot::var("z")),
            ],
            Pattern::new(Slot::var("x"), Slot::bound(pid), Slot::var("z")),
        );
        let outcome = d.materialize(&[rule], &CancellationToken::new()).unwrap();
        assert!(outcome.limit_reached);
        assert_eq!(d.state(), State::Partial);

        d.reset();
        assert_eq!(d.state(), State::Idle);
    }
}
