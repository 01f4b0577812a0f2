//! Source ordering validation.
//!
//! [`validate_sources`] runs once when the engine is built. It checks the
//! active term list for structural errors and fixes the construction
//! order every attempt then follows.

use indexmap::IndexMap;
use nova_core::SourceKind;

use crate::source::SourceTerm;

use std::error::Error;
use std::fmt;

/// How the construction order of the active terms is chosen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceOrder {
    /// Enumeration order of [`SourceKind::ALL`], stably reordered only
    /// where a term's declared constraints demand it.
    #[default]
    Canonical,
    /// A caller-supplied permutation of the active kinds.
    Explicit(Vec<SourceKind>),
}

/// Validated construction order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct SourcePlan {
    /// `(kind, index into the term list)` in construction order.
    steps: Vec<(SourceKind, usize)>,
}

impl SourcePlan {
    /// Number of active terms.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no term is active.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Kinds in construction order.
    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.steps.iter().map(|&(k, _)| k)
    }

    /// `(kind, term index)` pairs in construction order.
    pub fn steps(&self) -> &[(SourceKind, usize)] {
        &self.steps
    }

    /// Position of `kind` in the construction order.
    pub fn position(&self, kind: SourceKind) -> Option<usize> {
        self.steps.iter().position(|&(k, _)| k == kind)
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from source-plan validation (build time, not per attempt).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// Two terms implement the same kind.
    DuplicateKind {
        /// The repeated kind.
        kind: SourceKind,
    },
    /// A term requires a kind that is not active.
    MissingDependency {
        /// The dependent term.
        kind: SourceKind,
        /// The absent kind.
        requires: SourceKind,
    },
    /// An explicit order names a kind with no active term.
    UnknownKind {
        /// The unregistered kind.
        kind: SourceKind,
    },
    /// An explicit order omits an active kind.
    Unordered {
        /// The omitted kind.
        kind: SourceKind,
    },
    /// An explicit order places a kind before one it must follow.
    OrderViolation {
        /// The misplaced term.
        kind: SourceKind,
        /// The kind that must come first.
        must_follow: SourceKind,
    },
    /// Declared ordering constraints form a cycle.
    DependencyCycle {
        /// Kinds that could not be ordered.
        kinds: Vec<SourceKind>,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKind { kind } => write!(f, "source '{kind}' registered twice"),
            Self::MissingDependency { kind, requires } => {
                write!(f, "source '{kind}' requires inactive source '{requires}'")
            }
            Self::UnknownKind { kind } => {
                write!(f, "explicit order names inactive source '{kind}'")
            }
            Self::Unordered { kind } => {
                write!(f, "explicit order omits active source '{kind}'")
            }
            Self::OrderViolation { kind, must_follow } => {
                write!(f, "source '{kind}' must be constructed after '{must_follow}'")
            }
            Self::DependencyCycle { kinds } => {
                write!(f, "source ordering constraints are cyclic among {kinds:?}")
            }
        }
    }
}

impl Error for PlanError {}

// ── Validation ─────────────────────────────────────────────────────

/// Validate the active terms and resolve their construction order.
///
/// # Checks
///
/// 1. No kind is implemented twice.
/// 2. Every `requires()` kind is active.
/// 3. The order (canonical or explicit) places every active `requires()`
///    and `after()` kind before the term declaring it.
/// 4. An explicit order is a permutation of the active kinds.
pub fn validate_sources(
    terms: &[Box<dyn SourceTerm>],
    order: &SourceOrder,
) -> Result<SourcePlan, PlanError> {
    let mut active: IndexMap<SourceKind, usize> = IndexMap::new();
    for (i, term) in terms.iter().enumerate() {
        if active.insert(term.kind(), i).is_some() {
            return Err(PlanError::DuplicateKind { kind: term.kind() });
        }
    }

    // Predecessors each term needs, restricted to active kinds.
    let mut preds: IndexMap<SourceKind, Vec<SourceKind>> = IndexMap::new();
    for term in terms {
        let kind = term.kind();
        let mut needed = Vec::new();
        for req in term.requires() {
            if !active.contains_key(&req) {
                return Err(PlanError::MissingDependency {
                    kind,
                    requires: req,
                });
            }
            needed.push(req);
        }
        needed.extend(term.after().into_iter().filter(|k| active.contains_key(k)));
        preds.insert(kind, needed);
    }

    let sequence = match order {
        SourceOrder::Canonical => canonical_order(&active, &preds)?,
        SourceOrder::Explicit(list) => explicit_order(&active, &preds, list)?,
    };

    Ok(SourcePlan {
        steps: sequence.into_iter().map(|k| (k, active[&k])).collect(),
    })
}

/// Stable topological sort keyed on the enumeration order.
fn canonical_order(
    active: &IndexMap<SourceKind, usize>,
    preds: &IndexMap<SourceKind, Vec<SourceKind>>,
) -> Result<Vec<SourceKind>, PlanError> {
    let mut pending: Vec<SourceKind> = SourceKind::ALL
        .iter()
        .copied()
        .filter(|k| active.contains_key(k))
        .collect();
    let mut placed: Vec<SourceKind> = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|k| {
            preds
                .get(k)
                .is_none_or(|ps| ps.iter().all(|p| placed.contains(p)))
        });
        match ready {
            Some(i) => placed.push(pending.remove(i)),
            None => return Err(PlanError::DependencyCycle { kinds: pending }),
        }
    }
    Ok(placed)
}

fn explicit_order(
    active: &IndexMap<SourceKind, usize>,
    preds: &IndexMap<SourceKind, Vec<SourceKind>>,
    list: &[SourceKind],
) -> Result<Vec<SourceKind>, PlanError> {
    let mut seen: Vec<SourceKind> = Vec::with_capacity(list.len());
    for &kind in list {
        if !active.contains_key(&kind) {
            return Err(PlanError::UnknownKind { kind });
        }
        if seen.contains(&kind) {
            return Err(PlanError::DuplicateKind { kind });
        }
        if let Some(ps) = preds.get(&kind) {
            if let Some(&p) = ps.iter().find(|p| !seen.contains(p)) {
                return Err(PlanError::OrderViolation {
                    kind,
                    must_follow: p,
                });
            }
        }
        seen.push(kind);
    }
    if let Some(&kind) = active.keys().find(|k| !seen.contains(k)) {
        return Err(PlanError::Unordered { kind });
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SourceContext;
    use nova_core::SourceError;

    struct Term {
        kind: SourceKind,
        requires: Vec<SourceKind>,
        after: Vec<SourceKind>,
    }

    impl Term {
        fn boxed(kind: SourceKind) -> Box<dyn SourceTerm> {
            Box::new(Self {
                kind,
                requires: Vec::new(),
                after: Vec::new(),
            })
        }
    }

    impl SourceTerm for Term {
        fn kind(&self) -> SourceKind {
            self.kind
        }
        fn requires(&self) -> Vec<SourceKind> {
            self.requires.clone()
        }
        fn after(&self) -> Vec<SourceKind> {
            self.after.clone()
        }
        fn construct(&self, _ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn kinds(plan: &SourcePlan) -> Vec<SourceKind> {
        plan.kinds().collect()
    }

    #[test]
    fn empty_list_is_valid() {
        let plan = validate_sources(&[], &SourceOrder::Canonical).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn canonical_follows_enumeration() {
        let terms = vec![
            Term::boxed(SourceKind::Rotation),
            Term::boxed(SourceKind::External),
            Term::boxed(SourceKind::Gravity),
        ];
        let plan = validate_sources(&terms, &SourceOrder::Canonical).unwrap();
        assert_eq!(
            kinds(&plan),
            vec![SourceKind::External, SourceKind::Gravity, SourceKind::Rotation]
        );
        assert_eq!(plan.steps()[0], (SourceKind::External, 1));
    }

    #[test]
    fn canonical_defers_for_after_constraints() {
        let hybrid = Box::new(Term {
            kind: SourceKind::HybridMomentum,
            requires: Vec::new(),
            after: vec![SourceKind::Gravity, SourceKind::Rotation],
        });
        let terms: Vec<Box<dyn SourceTerm>> = vec![
            hybrid,
            Term::boxed(SourceKind::Gravity),
            Term::boxed(SourceKind::Sponge),
        ];
        let plan = validate_sources(&terms, &SourceOrder::Canonical).unwrap();
        assert_eq!(
            kinds(&plan),
            vec![SourceKind::Sponge, SourceKind::Gravity, SourceKind::HybridMomentum]
        );
    }

    #[test]
    fn duplicate_kind_rejected() {
        let terms = vec![Term::boxed(SourceKind::Sponge), Term::boxed(SourceKind::Sponge)];
        match validate_sources(&terms, &SourceOrder::Canonical) {
            Err(PlanError::DuplicateKind { kind }) => assert_eq!(kind, SourceKind::Sponge),
            other => panic!("expected DuplicateKind, got {other:?}"),
        }
    }

    #[test]
    fn missing_requirement_rejected() {
        let terms: Vec<Box<dyn SourceTerm>> = vec![Box::new(Term {
            kind: SourceKind::Rotation,
            requires: vec![SourceKind::Gravity],
            after: Vec::new(),
        })];
        match validate_sources(&terms, &SourceOrder::Canonical) {
            Err(PlanError::MissingDependency { kind, requires }) => {
                assert_eq!(kind, SourceKind::Rotation);
                assert_eq!(requires, SourceKind::Gravity);
            }
            other => panic!("expected MissingDependency, got {other:?}"),
        }
    }

    #[test]
    fn explicit_order_respected() {
        let terms = vec![Term::boxed(SourceKind::External), Term::boxed(SourceKind::Gravity)];
        let order = SourceOrder::Explicit(vec![SourceKind::Gravity, SourceKind::External]);
        let plan = validate_sources(&terms, &order).unwrap();
        assert_eq!(kinds(&plan), vec![SourceKind::Gravity, SourceKind::External]);
    }

    #[test]
    fn explicit_order_violation_rejected() {
        let terms: Vec<Box<dyn SourceTerm>> = vec![
            Box::new(Term {
                kind: SourceKind::External,
                requires: Vec::new(),
                after: vec![SourceKind::Gravity],
            }),
            Term::boxed(SourceKind::Gravity),
        ];
        let order = SourceOrder::Explicit(vec![SourceKind::External, SourceKind::Gravity]);
        match validate_sources(&terms, &order) {
            Err(PlanError::OrderViolation { kind, must_follow }) => {
                assert_eq!(kind, SourceKind::External);
                assert_eq!(must_follow, SourceKind::Gravity);
            }
            other => panic!("expected OrderViolation, got {other:?}"),
        }
    }

    #[test]
    fn explicit_order_must_be_permutation() {
        let terms = vec![Term::boxed(SourceKind::External), Term::boxed(SourceKind::Gravity)];
        let partial = SourceOrder::Explicit(vec![SourceKind::Gravity]);
        assert_eq!(
            validate_sources(&terms, &partial),
            Err(PlanError::Unordered {
                kind: SourceKind::External
            })
        );
        let unknown = SourceOrder::Explicit(vec![SourceKind::Thermo]);
        assert_eq!(
            validate_sources(&terms, &unknown),
            Err(PlanError::UnknownKind {
                kind: SourceKind::Thermo
            })
        );
    }

    #[test]
    fn cycle_detected() {
        let terms: Vec<Box<dyn SourceTerm>> = vec![
            Box::new(Term {
                kind: SourceKind::External,
                requires: Vec::new(),
                after: vec![SourceKind::Sponge],
            }),
            Box::new(Term {
                kind: SourceKind::Sponge,
                requires: Vec::new(),
                after: vec![SourceKind::External],
            }),
        ];
        match validate_sources(&terms, &SourceOrder::Canonical) {
            Err(PlanError::DependencyCycle { kinds }) => assert_eq!(kinds.len(), 2),
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }
}
