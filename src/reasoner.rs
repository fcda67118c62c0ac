//! Semi-naive fixpoint evaluation over an external `TripleIndex`.
//!
//! Each round computes `Δ_{k+1} = (⋃_r apply_delta(r, E_k, Δ_k)) \ E_k` and
//! commits it to the index as `E_{k+1}`; the process stops when a round's Δ
//! is empty, a cancellation token fires, or a configured per-round
//! derivation cap is hit.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rule::{evaluate_condition, instantiate_head, unify, Binding, Rule};
use crate::triple::{Fact, Pattern, Slot, TermId, TripleIndex};

/// Observed at round boundaries and between body-pattern evaluations.
/// Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a single `DeltaEngine::run` call, covering possibly many
/// rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub total_derived: usize,
    pub iterations: usize,
    pub limit_reached: bool,
    pub cancelled: bool,
}

/// Replaces any `Var` slot already present in `binding` with the bound id,
/// so the index is queried with as much of the binding as possible.
fn specialize(pattern: &Pattern, binding: &Binding) -> Pattern {
    let spec = |slot: &Slot| match slot {
        Slot::Var(name) => binding.get(name).map(|id| Slot::Bound(*id)).unwrap_or_else(|| slot.clone()),
        Slot::Bound(_) => slot.clone(),
    };
    Pattern::new(spec(&pattern.s), spec(&pattern.p), spec(&pattern.o))
}

fn delta_candidates(specialized_pred: &Slot, delta_by_pred: &HashMap<TermId, Vec<Fact>>, delta_all: &[Fact]) -> Vec<Fact> {
    match specialized_pred {
        Slot::Bound(pred) => delta_by_pred.get(pred).cloned().unwrap_or_default(),
        Slot::Var(_) => delta_all.to_vec(),
    }
}

/// One delta variant of `apply_delta`: body position `delta_pos` is matched
/// against `delta` (the previous round's new facts); every other position is
/// matched against `index` (the full extent).
fn apply_delta_variant(
    rule: &Rule,
    delta_pos: usize,
    delta: &[Fact],
    delta_by_pred: &HashMap<TermId, Vec<Fact>>,
    index: &dyn TripleIndex,
    cancel: &CancellationToken,
) -> Result<Vec<Fact>> {
    let mut bindings = vec![Binding::new()];
    for (j, pattern) in rule.body.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }
        if bindings.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for binding in &bindings {
            let specialized = specialize(pattern, binding);
            let candidates = if j == delta_pos {
                delta_candidates(&specialized.p, delta_by_pred, delta)
            } else {
                index.lookup(&specialized)
            };
            for fact in candidates {
                if let Some(extended) = unify(pattern, &fact, binding) {
                    next.push(extended);
                }
            }
        }
        bindings = next;
    }

    let mut derived = Vec::new();
    for binding in bindings {
        if rule.conditions.iter().all(|c| evaluate_condition(c, &binding)) {
            if let Some(fact) = instantiate_head(&rule.head, &binding) {
                derived.push(fact);
            }
        }
    }
    Ok(derived)
}

/// `apply_delta(rule, E, Δ)`: the union over every eligible delta position,
/// deduplicated and with facts already present in `E` filtered out.
fn apply_delta(rule: &Rule, delta: &[Fact], index: &dyn TripleIndex, cancel: &CancellationToken) -> Result<HashSet<Fact>> {
    let mut delta_by_pred: HashMap<TermId, Vec<Fact>> = HashMap::new();
    for fact in delta {
        delta_by_pred.entry(fact.p).or_default().push(*fact);
    }

    let mut out = HashSet::new();
    for pos in rule.delta_positions() {
        if pos >= rule.body.len() {
            continue;
        }
        for fact in apply_delta_variant(rule, pos, delta, &delta_by_pred, index, cancel)? {
            if !index.contains(&fact) {
                out.insert(fact);
            }
        }
    }
    Ok(out)
}

pub struct DeltaEngine;

impl DeltaEngine {
    /// Drives rounds until Δ is empty, the cap is hit, or `cancel` fires.
    /// `initial_delta` is the extent to treat as round-0's Δ — typically the
    /// whole extent already committed to `index` at the time `materialize`
    /// is called.
    pub fn run(
        index: &dyn TripleIndex,
        rules: &[Rule],
        initial_delta: Vec<Fact>,
        max_derivations: usize,
        cancel: &CancellationToken,
    ) -> Result<MaterializeOutcome> {
        let mut delta = initial_delta;
        let mut total_derived = 0usize;
        let mut iterations = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Ok(MaterializeOutcome {
                    total_derived,
                    iterations,
                    limit_reached: false,
                    cancelled: true,
                });
            }
            if delta.is_empty() {
                break;
            }

            let mut round_derived: HashSet<Fact> = HashSet::new();
            let mut cap_hit = false;
            for rule in rules {
                match apply_delta(rule, &delta, index, cancel) {
                    Ok(facts) => {
                        for fact in facts {
                            if round_derived.len() >= max_derivations {
                                cap_hit = true;
                                break;
                            }
                            round_derived.insert(fact);
                        }
                    }
                    Err(e) if e.status() == crate::error::Status::Cancelled => {
                        return Ok(MaterializeOutcome {
                            total_derived,
                            iterations,
                            limit_reached: false,
                            cancelled: true,
                        });
                    }
                    Err(e) => return Err(e),
                }
                if cap_hit {
                    break;
                }
            }

            let round_facts: Vec<Fact> = round_derived.into_iter().collect();
            let committed = index.insert_batch(&round_facts)?;
            iterations += 1;
            total_derived += committed.len();
            log::debug!("materialize: round {} derived {} new facts", iterations, committed.len());

            if cap_hit {
                return Ok(MaterializeOutcome {
                    total_derived,
                    iterations,
                    limit_reached: true,
                    cancelled: false,
                });
            }
            delta = committed;
        }

        Ok(MaterializeOutcome {
            total_derived,
            iterations,
            limit_reached: false,
            cancelled: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::MemIndex;

    fn transitive_rule() -> Rule {
        Rule::new(
            "transitive",
            vec![
                Pattern::new(Slot::var("x"), Slot::bound(1), Slot::var("y")),
                Pattern::new(Slot::var("y"), Slot::bound(1), Slot::var("z")),
            ],
            Pattern::new(Slot::var("x"), Slot::bound(1), Slot::var("z")),
        )
    }

    #[test]
    fn semi_naive_transitive_closure() {
        let index = MemIndex::new();
        let initial = vec![Fact::new(1, 1, 2), Fact::new(2, 1, 3), Fact::new(3, 1, 4)];
        index.insert_batch(&initial).unwrap();
        let outcome = DeltaEngine::run(&index, &[transitive_rule()], initial, 100_000, &CancellationToken::new()).unwrap();

        assert_eq!(index.len(), 6);
        assert_eq!(outcome.total_derived, 3);
        assert_eq!(outcome.iterations, 3);
        assert!(!outcome.limit_reached);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn second_materialize_is_a_no_op() {
        let index = MemIndex::new();
        let initial = vec![Fact::new(1, 1, 2), Fact::new(2, 1, 3)];
        index.insert_batch(&initial).unwrap();
        DeltaEngine::run(&index, &[transitive_rule()], initial, 100_000, &CancellationToken::new()).unwrap();

        let snapshot = index.snapshot();
        let outcome = DeltaEngine::run(&index, &[transitive_rule()], snapshot, 100_000, &CancellationToken::new()).unwrap();
        assert_eq!(outcome.total_derived, 0);
    }

    #[test]
    fn cancellation_stops_before_further_rounds() {
        let index = MemIndex::new();
        let initial = vec![Fact::new(1, 1, 2), Fact::new(2, 1, 3), Fact::new(3, 1, 4)];
        index.insert_batch(&initial).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = DeltaEngine::run(&index, &[transitive_rule()], initial, 100_000, &cancel).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.total_derived, 0);
    }

    #[test]
    fn derivation_cap_truncates_round() {
        let index = MemIndex::new();
        // A star of facts all sharing object id 0 under predicate 1, plus a
        // rule with a variable-predicate body position so the candidate set
        // grows quadratically with the star's size.
        let mut initial = Vec::new();
        for i in 0..20u64 {
            initial.push(Fact::new(i, 1, 1000));
        }
        index.insert_batch(&initial).unwrap();
        let rule = Rule::new(
            "pair",
            vec![
                Pattern::new(Slot::var("x"), Slot::bound(1), Slot::var("h")),
                Pattern::new(Slot::var("y"), Slot::bound(1), Slot::var("h")),
            ],
            Pattern::new(Slot::var("x"), Slot::bound(2), Slot::var("y")),
        );
        let outcome = DeltaEngine::run(&index, &[rule], initial, 50, &CancellationToken::new()).unwrap();
        assert!(outcome.limit_reached);
        assert_eq!(outcome.total_derived, 50);
    }
}
