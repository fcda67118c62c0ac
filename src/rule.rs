//! Rules: body patterns, filter conditions, a head template, substitution
//! and unification over bindings. A rule is just a tagged-variant data
//! structure — no trait objects, no inheritance — dispatched on directly by
//! the `DeltaEngine`.

use std::collections::{HashMap, HashSet};

use crate::id_codec::{self, Kind};
use crate::triple::{Fact, Pattern, Slot, TermId};

/// A mapping from rule variable names to the ground term ids they are
/// currently bound to.
pub type Binding = HashMap<String, TermId>;

/// One operand of a `Condition`: either a body variable or a fixed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Var(String),
    Const(TermId),
}

impl Operand {
    fn resolve(&self, binding: &Binding) -> Option<TermId> {
        match self {
            Operand::Const(id) => Some(*id),
            Operand::Var(name) => binding.get(name).copied(),
        }
    }
}

/// A filter condition over body variables. Comparisons (`LessThan` etc.)
/// only hold between two operands that both decode as inline `Integer`
/// ids — comparing arbitrary dictionary ids numerically would be
/// meaningless, so such a comparison evaluates to `false` rather than
/// falling back to raw id ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal(Operand, Operand),
    NotEqual(Operand, Operand),
    LessThan(Operand, Operand),
    LessOrEqual(Operand, Operand),
    GreaterThan(Operand, Operand),
    GreaterOrEqual(Operand, Operand),
    /// True iff the operand resolves to an id whose type tag decodes to
    /// `kind`.
    IsKind(Operand, Kind),
}

fn as_integer(id: TermId) -> Option<i64> {
    let (kind, _) = id_codec::decode(id);
    (kind == Kind::Integer).then(|| id_codec::decode_integer(id))
}

/// Evaluates `cond` against `binding`. An unbound variable reference makes
/// the condition `false` — safe rules never reach this case in practice,
/// since every condition variable is required to appear in the body.
pub fn evaluate_condition(cond: &Condition, binding: &Binding) -> bool {
    match cond {
        Condition::Equal(a, b) => match (a.resolve(binding), b.resolve(binding)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        Condition::NotEqual(a, b) => match (a.resolve(binding), b.resolve(binding)) {
            (Some(x), Some(y)) => x != y,
            _ => false,
        },
        Condition::LessThan(a, b) => compare(a, b, binding, |x, y| x < y),
        Condition::LessOrEqual(a, b) => compare(a, b, binding, |x, y| x <= y),
        Condition::GreaterThan(a, b) => compare(a, b, binding, |x, y| x > y),
        Condition::GreaterOrEqual(a, b) => compare(a, b, binding, |x, y| x >= y),
        Condition::IsKind(a, kind) => match a.resolve(binding) {
            Some(id) => id_codec::decode(id).0 == *kind,
            None => false,
        },
    }
}

fn compare(a: &Operand, b: &Operand, binding: &Binding, op: impl Fn(i64, i64) -> bool) -> bool {
    match (a.resolve(binding).and_then(as_integer), b.resolve(binding).and_then(as_integer)) {
        (Some(x), Some(y)) => op(x, y),
        _ => false,
    }
}

/// `true` iff `term` is ground, i.e. not a variable.
pub fn is_ground(slot: &Slot) -> bool {
    !slot.is_var()
}

/// Resolves `slot` against `binding`: a bound slot returns its id directly;
/// a variable slot returns its binding, or `None` if unbound.
pub fn substitute(slot: &Slot, binding: &Binding) -> Option<TermId> {
    match slot {
        Slot::Bound(id) => Some(*id),
        Slot::Var(name) => binding.get(name).copied(),
    }
}

/// Substitutes all three slots of `head`; returns `None` if any slot is
/// still a variable after substitution (the head is not ground).
pub fn instantiate_head(head: &Pattern, binding: &Binding) -> Option<Fact> {
    Some(Fact::new(
        substitute(&head.s, binding)?,
        substitute(&head.p, binding)?,
        substitute(&head.o, binding)?,
    ))
}

/// Unifies one pattern slot against a concrete fact term under `binding`,
/// mutating `binding` in place. Returns `false` (leaving `binding`
/// partially mutated only with consistent extensions) on a mismatch.
fn unify_slot(slot: &Slot, value: TermId, binding: &mut Binding) -> bool {
    match slot {
        Slot::Bound(id) => *id == value,
        Slot::Var(name) => match binding.get(name) {
            Some(existing) => *existing == value,
            None => {
                binding.insert(name.clone(), value);
                true
            }
        },
    }
}

/// Unifies `pattern` against `fact` starting from `binding`, returning the
/// extended binding on success or `None` on a mismatch. `binding` itself is
/// never mutated; callers fold over candidate facts, keeping only the
/// bindings that unify.
pub fn unify(pattern: &Pattern, fact: &Fact, binding: &Binding) -> Option<Binding> {
    let mut extended = binding.clone();
    if unify_slot(&pattern.s, fact.s, &mut extended)
        && unify_slot(&pattern.p, fact.p, &mut extended)
        && unify_slot(&pattern.o, fact.o, &mut extended)
    {
        Some(extended)
    } else {
        None
    }
}

fn pattern_vars(pattern: &Pattern, out: &mut HashSet<String>) {
    for slot in [&pattern.s, &pattern.p, &pattern.o] {
        if let Slot::Var(name) = slot {
            out.insert(name.clone());
        }
    }
}

fn condition_vars(cond: &Condition, out: &mut HashSet<String>) {
    let mut push = |op: &Operand| {
        if let Operand::Var(name) = op {
            out.insert(name.clone());
        }
    };
    match cond {
        Condition::Equal(a, b)
        | Condition::NotEqual(a, b)
        | Condition::LessThan(a, b)
        | Condition::LessOrEqual(a, b)
        | Condition::GreaterThan(a, b)
        | Condition::GreaterOrEqual(a, b) => {
            push(a);
            push(b);
        }
        Condition::IsKind(a, _) => push(a),
    }
}

/// A rule: an ordered body of patterns, filter conditions over body
/// variables, a head template, and which body positions are eligible to be
/// the semi-naive "delta" position (`None` means all of them, the default).
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub body: Vec<Pattern>,
    pub conditions: Vec<Condition>,
    pub head: Pattern,
    pub delta_positions: Option<Vec<usize>>,
}

impl Rule {
    pub fn new(name: impl Into<String>, body: Vec<Pattern>, head: Pattern) -> Self {
        Rule {
            name: name.into(),
            body,
            conditions: Vec::new(),
            head,
            delta_positions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_delta_positions(mut self, positions: Vec<usize>) -> Self {
        self.delta_positions = Some(positions);
        self
    }

    /// Body positions eligible to supply the "new" fact for this round's
    /// delta-pattern rewriting; all positions unless restricted.
    pub fn delta_positions(&self) -> Vec<usize> {
        self.delta_positions
            .clone()
            .unwrap_or_else(|| (0..self.body.len()).collect())
    }

    pub fn body_vars(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for pattern in &self.body {
            pattern_vars(pattern, &mut out);
        }
        out
    }

    /// A rule is safe iff every variable in its head or its conditions also
    /// appears in some body pattern.
    pub fn is_safe(&self) -> bool {
        let body_vars = self.body_vars();
        let mut head_vars = HashSet::new();
        pattern_vars(&self.head, &mut head_vars);
        if !head_vars.is_subset(&body_vars) {
            return false;
        }
        let mut cond_vars = HashSet::new();
        for cond in &self.conditions {
            condition_vars(cond, &mut cond_vars);
        }
        cond_vars.is_subset(&body_vars)
    }
}
