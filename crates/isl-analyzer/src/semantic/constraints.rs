//! Interval reasoning over single-field comparison predicates.
//!
//! A predicate is reduced to comparison atoms (`path op literal`). Atoms on
//! the same path fold into a [`FieldConstraint`] whose emptiness decides
//! satisfiability. Predicates using `or`, `not`, `implies`, calls, or
//! comparing two fields produce no atoms and are not reasoned about.

use std::fmt;

use indexmap::IndexMap;
use isl_ast::{BinaryOp, Expr, LiteralValue, Span};

/// Atoms per field beyond which a field is not analyzed
pub const MAX_ATOMS_PER_FIELD: usize = 64;

/// A single comparison between a reference path and a literal
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub path: String,
    pub op: BinaryOp,
    pub value: LiteralValue,
    pub span: Span,
}

impl Atom {
    /// Parse a single comparison, flipping `literal op path`
    pub fn from_expr(expr: &Expr) -> Option<Atom> {
        let Expr::Binary(binary) = expr else {
            return None;
        };
        if !binary.op.is_comparison() {
            return None;
        }
        let (path, op, value) = match (binary.left.as_ref(), binary.right.as_ref()) {
            (Expr::Literal(_), Expr::Literal(_)) => return None,
            (reference, Expr::Literal(lit)) => (reference.reference_path()?, binary.op, &lit.value),
            (Expr::Literal(lit), reference) => {
                (reference.reference_path()?, binary.op.flipped(), &lit.value)
            }
            _ => return None,
        };
        Some(Atom {
            path,
            op,
            value: value.clone(),
            span: binary.span,
        })
    }

    /// The atom that holds exactly when this one does not
    pub fn negated(&self) -> Atom {
        let op = match self.op {
            BinaryOp::Eq => BinaryOp::NotEq,
            BinaryOp::NotEq => BinaryOp::Eq,
            BinaryOp::Lt => BinaryOp::GtEq,
            BinaryOp::LtEq => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::LtEq,
            BinaryOp::GtEq => BinaryOp::Lt,
            logical => logical,
        };
        Atom { op, ..self.clone() }
    }

    /// Whether every value satisfying `self` also satisfies `other`
    pub fn implies(&self, other: &Atom) -> bool {
        self.path == other.path && is_unsatisfiable(&[self, &other.negated()])
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.op.as_str(), self.value)
    }
}

/// Flatten a predicate into atoms.
///
/// Returns an empty list when any part of the predicate is outside the
/// comparison-and-conjunction fragment.
pub fn atoms(expr: &Expr) -> Vec<Atom> {
    let mut out = Vec::new();
    if collect(expr, &mut out) {
        out
    } else {
        Vec::new()
    }
}

fn collect(expr: &Expr, out: &mut Vec<Atom>) -> bool {
    match expr {
        Expr::Binary(binary) if binary.op == BinaryOp::And => {
            collect(&binary.left, out) && collect(&binary.right, out)
        }
        _ => match Atom::from_expr(expr) {
            Some(atom) => {
                out.push(atom);
                true
            }
            None => false,
        },
    }
}

/// Atoms of several predicates grouped by path, in first-appearance order
pub fn group_by_path<'a>(atoms: impl IntoIterator<Item = &'a Atom>) -> IndexMap<&'a str, Vec<&'a Atom>> {
    let mut groups: IndexMap<&str, Vec<&Atom>> = IndexMap::new();
    for atom in atoms {
        groups.entry(atom.path.as_str()).or_default().push(atom);
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bound {
    value: f64,
    inclusive: bool,
}

/// Everything known about one field from a conjunction of atoms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldConstraint {
    lower: Option<Bound>,
    upper: Option<Bound>,
    equals: Option<LiteralValue>,
    excluded: Vec<LiteralValue>,
    conflict: bool,
}

impl FieldConstraint {
    pub fn from_atoms<'a>(atoms: impl IntoIterator<Item = &'a Atom>) -> Self {
        let mut constraint = Self::default();
        for atom in atoms {
            constraint.add(atom);
        }
        constraint
    }

    pub fn add(&mut self, atom: &Atom) {
        match atom.op {
            BinaryOp::Eq => match &self.equals {
                Some(existing) if *existing != atom.value => self.conflict = true,
                Some(_) => {}
                None => self.equals = Some(atom.value.clone()),
            },
            BinaryOp::NotEq => self.excluded.push(atom.value.clone()),
            op if op.is_ordering() => {
                // Ordering on strings or booleans is not modeled
                let Some(value) = atom.value.as_number() else {
                    return;
                };
                let inclusive = matches!(op, BinaryOp::GtEq | BinaryOp::LtEq);
                let bound = Bound { value, inclusive };
                if matches!(op, BinaryOp::Gt | BinaryOp::GtEq) {
                    self.lower = Some(tighter(self.lower, bound, |a, b| a > b));
                } else {
                    self.upper = Some(tighter(self.upper, bound, |a, b| a < b));
                }
            }
            _ => {}
        }
    }

    /// Whether no value can satisfy every folded atom
    pub fn is_empty(&self) -> bool {
        if self.conflict {
            return true;
        }
        if let (Some(lo), Some(hi)) = (self.lower, self.upper) {
            if lo.value > hi.value || (lo.value == hi.value && !(lo.inclusive && hi.inclusive)) {
                return true;
            }
        }
        let Some(value) = &self.equals else {
            return false;
        };
        if self.excluded.contains(value) {
            return true;
        }
        match value.as_number() {
            Some(n) => {
                let below = self
                    .lower
                    .is_some_and(|lo| n < lo.value || (n == lo.value && !lo.inclusive));
                let above = self
                    .upper
                    .is_some_and(|hi| n > hi.value || (n == hi.value && !hi.inclusive));
                below || above
            }
            None => self.lower.is_some() || self.upper.is_some(),
        }
    }
}

fn tighter(current: Option<Bound>, new: Bound, stricter: impl Fn(f64, f64) -> bool) -> Bound {
    match current {
        None => new,
        Some(cur) if stricter(new.value, cur.value) => new,
        Some(cur) if new.value == cur.value => Bound {
            value: cur.value,
            inclusive: cur.inclusive && new.inclusive,
        },
        Some(cur) => cur,
    }
}

/// Whether the conjunction of `atoms` (all on one path) is unsatisfiable
pub fn is_unsatisfiable(atoms: &[&Atom]) -> bool {
    FieldConstraint::from_atoms(atoms.iter().copied()).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(path: &str, op: BinaryOp, value: impl Into<LiteralValue>) -> Atom {
        Atom::from_expr(&Expr::compare(path, op, value)).expect("comparison atom")
    }

    #[test]
    fn test_atom_flips_literal_on_left() {
        let expr = Expr::binary(Expr::literal(5), BinaryOp::Lt, Expr::ident("x"));
        let atom = Atom::from_expr(&expr).expect("atom");
        assert_eq!(atom.op, BinaryOp::Gt);
        assert_eq!(atom.to_string(), "x > 5");
    }

    #[test]
    fn test_atoms_flatten_conjunction() {
        let expr = Expr::and(
            Expr::compare("x", BinaryOp::Gt, 1),
            Expr::and(
                Expr::compare("y", BinaryOp::Eq, "a"),
                Expr::compare("result.total", BinaryOp::LtEq, 10),
            ),
        );
        let paths: Vec<_> = atoms(&expr).into_iter().map(|a| a.path).collect();
        assert_eq!(paths, vec!["x", "y", "result.total"]);
    }

    #[test]
    fn test_unsupported_predicates_yield_nothing() {
        let disjunction = Expr::or(
            Expr::compare("x", BinaryOp::Gt, 1),
            Expr::compare("x", BinaryOp::Lt, 0),
        );
        assert!(atoms(&disjunction).is_empty());

        let cross_field = Expr::binary(Expr::ident("x"), BinaryOp::Gt, Expr::ident("y"));
        assert!(atoms(&cross_field).is_empty());

        let partly = Expr::and(Expr::compare("x", BinaryOp::Gt, 1), Expr::not(Expr::ident("flag")));
        assert!(atoms(&partly).is_empty());
    }

    #[test]
    fn test_crossing_bounds_are_empty() {
        let a = atom("x", BinaryOp::Gt, 5);
        let b = atom("x", BinaryOp::Lt, 2);
        assert!(is_unsatisfiable(&[&a, &b]));

        let c = atom("x", BinaryOp::Lt, 10);
        assert!(!is_unsatisfiable(&[&a, &c]));
    }

    #[test]
    fn test_touching_bounds() {
        let ge = atom("x", BinaryOp::GtEq, 5);
        let le = atom("x", BinaryOp::LtEq, 5);
        let lt = atom("x", BinaryOp::Lt, 5);
        assert!(!is_unsatisfiable(&[&ge, &le]));
        assert!(is_unsatisfiable(&[&ge, &lt]));
    }

    #[test]
    fn test_equality_conflicts() {
        let eq5 = atom("x", BinaryOp::Eq, 5);
        let eq6 = atom("x", BinaryOp::Eq, 6);
        let ne5 = atom("x", BinaryOp::NotEq, 5);
        let gt7 = atom("x", BinaryOp::Gt, 7);
        assert!(is_unsatisfiable(&[&eq5, &eq6]));
        assert!(is_unsatisfiable(&[&eq5, &ne5]));
        assert!(is_unsatisfiable(&[&eq5, &gt7]));

        let null = atom("x", BinaryOp::Eq, LiteralValue::Null);
        assert!(is_unsatisfiable(&[&null, &gt7]));
        let not_null = atom("x", BinaryOp::NotEq, LiteralValue::Null);
        assert!(is_unsatisfiable(&[&null, &not_null]));
    }

    #[test]
    fn test_string_ordering_not_modeled() {
        let a = atom("name", BinaryOp::Gt, "m");
        let b = atom("name", BinaryOp::Lt, "c");
        assert!(!is_unsatisfiable(&[&a, &b]));
    }

    #[test]
    fn test_implication() {
        let gt5 = atom("x", BinaryOp::Gt, 5);
        let gt3 = atom("x", BinaryOp::Gt, 3);
        let ge5 = atom("x", BinaryOp::GtEq, 5);
        assert!(gt5.implies(&gt3));
        assert!(!gt3.implies(&gt5));
        assert!(gt5.implies(&ge5));
        assert!(!ge5.implies(&gt5));

        let other = atom("y", BinaryOp::Gt, 3);
        assert!(!gt5.implies(&other));
    }

    #[test]
    fn test_group_by_path_keeps_order() {
        let list = [
            atom("b", BinaryOp::Gt, 1),
            atom("a", BinaryOp::Gt, 1),
            atom("b", BinaryOp::Lt, 9),
        ];
        let groups = group_by_path(&list);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(groups["b"].len(), 2);
    }
}
