//! Classification of terms with respect to a [`VariableAssignments`] object.

use crate::model::{Term, VariableIndex};

use super::assignment::{GroupSlot, Side, Value, VariableAssignments};

/// Kind of a term during a pairwise check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// The term behaves like a fixed value
    Constant,
    /// Universally quantified variable
    Universal,
    /// Existentially quantified variable
    Existential,
}

/// A term of one of the two compared rules together with the information
/// currently known about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    /// Kind of the term
    pub kind: TermKind,
    /// Value the term resolves to, if any
    pub constant: Option<Value>,
    /// Group the term belongs to
    pub group: GroupSlot,
    /// Signed identifier of the original term
    pub term_id: i64,
    /// Rule the term belongs to
    pub side: Side,
}

impl TermInfo {
    fn constant(term: &Term, value: Value, side: Side) -> Self {
        Self {
            kind: TermKind::Constant,
            constant: Some(value),
            group: GroupSlot::Unassigned,
            term_id: term.id(),
            side,
        }
    }

    fn variable(
        term: &Term,
        variable: VariableIndex,
        kind: TermKind,
        lookup_side: Side,
        side: Side,
        assignments: &VariableAssignments,
    ) -> Self {
        Self {
            kind,
            constant: assignments.constant(variable, lookup_side),
            group: assignments.group(variable, lookup_side),
            term_id: term.id(),
            side,
        }
    }

    /// Return the variable this term refers to, if any.
    pub fn variable_index(&self) -> Option<VariableIndex> {
        match self.kind {
            TermKind::Constant if self.term_id == 0 => None,
            _ => u32::try_from(self.term_id.unsigned_abs()).ok(),
        }
    }

    /// Return `true` if this term resolves to a null.
    pub fn is_null(&self) -> bool {
        self.constant.is_some_and(|value| value.is_null())
    }
}

/// Classify a term for unification.
///
/// Existential variables of the [`Side::From`] rule are treated as the null they produce.
pub fn term_info_unify(term: &Term, assignments: &VariableAssignments, side: Side) -> TermInfo {
    match *term {
        Term::Constant(constant) => TermInfo::constant(term, Value::Constant(constant), side),
        Term::Existential(variable) if side == Side::From => {
            TermInfo::constant(term, Value::Null { side, variable }, side)
        }
        Term::Universal(variable) => {
            TermInfo::variable(term, variable, TermKind::Universal, side, side, assignments)
        }
        Term::Existential(variable) => {
            TermInfo::variable(term, variable, TermKind::Existential, side, side, assignments)
        }
    }
}

/// Classify a term for unification of a rule with itself.
///
/// Only the [`Side::From`] part of `assignments` is used.
/// Existential variables on the [`Side::From`] side are treated as the null they produce.
pub fn term_info_unify_self(
    term: &Term,
    assignments: &VariableAssignments,
    side: Side,
) -> TermInfo {
    match *term {
        Term::Constant(constant) => {
            TermInfo::constant(term, Value::Constant(constant), Side::From)
        }
        Term::Existential(variable) if side == Side::From => TermInfo::constant(
            term,
            Value::Null {
                side: Side::From,
                variable,
            },
            Side::From,
        ),
        Term::Universal(variable) => TermInfo::variable(
            term,
            variable,
            TermKind::Universal,
            Side::From,
            Side::From,
            assignments,
        ),
        Term::Existential(variable) => TermInfo::variable(
            term,
            variable,
            TermKind::Existential,
            Side::From,
            Side::From,
            assignments,
        ),
    }
}

/// Classify a term for an entailment check.
///
/// If `default_assign` is set, existential variables are treated as nulls
/// that differ from every null introduced during unification.
/// Otherwise an existential variable that has neither a value nor a group
/// stands for its own null.
pub fn term_info_models(
    term: &Term,
    assignments: &VariableAssignments,
    side: Side,
    default_assign: bool,
) -> TermInfo {
    match *term {
        Term::Constant(constant) => TermInfo::constant(term, Value::Constant(constant), side),
        Term::Universal(variable) => {
            TermInfo::variable(term, variable, TermKind::Universal, side, side, assignments)
        }
        Term::Existential(variable) if default_assign => TermInfo {
            kind: TermKind::Existential,
            constant: Some(Value::FreshNull { side, variable }),
            group: GroupSlot::Unassigned,
            term_id: term.id(),
            side,
        },
        Term::Existential(variable) => {
            let mut info =
                TermInfo::variable(term, variable, TermKind::Existential, side, side, assignments);

            if info.group == GroupSlot::Unassigned && info.constant.is_none() {
                info.constant = Some(Value::Null { side, variable });
            }

            info
        }
    }
}

/// Decide whether two classified terms denote the same value.
///
/// Unassigned variables are only equal to themselves.
pub fn terms_equal(left: &TermInfo, right: &TermInfo) -> bool {
    if left.kind == TermKind::Constant || right.kind == TermKind::Constant {
        return left.constant == right.constant;
    }

    if left.constant.is_some() && left.constant == right.constant {
        return true;
    }

    if let GroupSlot::Group(group) = left.group {
        if right.group == GroupSlot::Group(group) {
            return true;
        }
    }

    left.group == GroupSlot::Unassigned
        && right.group == GroupSlot::Unassigned
        && left.term_id == right.term_id
        && left.side == right.side
}

/// Unify two classified terms.
///
/// Returns `false` if they resolve to different values.
/// Otherwise the value of one term is propagated to the other
/// or the two variables are connected.
pub fn unify_terms(from: &TermInfo, to: &TermInfo, assignments: &mut VariableAssignments) -> bool {
    if let (Some(from_value), Some(to_value)) = (from.constant, to.constant) {
        if from_value != to_value {
            return false;
        }
    }

    match (from.kind, to.kind) {
        (TermKind::Constant, TermKind::Constant) => {}
        (_, TermKind::Constant) => {
            if let (Some(variable), Some(value)) = (from.variable_index(), to.constant) {
                assignments.assign_constants(variable, from.side, value);
            }
        }
        (TermKind::Constant, _) => {
            if let (Some(variable), Some(value)) = (to.variable_index(), from.constant) {
                assignments.assign_constants(variable, to.side, value);
            }
        }
        _ => {
            if let (Some(variable_from), Some(variable_to)) =
                (from.variable_index(), to.variable_index())
            {
                assignments.connect(variable_from, from.side, variable_to, to.side);
            }
        }
    }

    true
}

#[cfg(test)]
mod test {
    use test_log::test;

    use crate::{
        model::{ConstantId, Term},
        reliance::assignment::{GroupSlot, Side, Value, VariableAssignments},
    };

    use super::{
        term_info_models, term_info_unify, term_info_unify_self, terms_equal, unify_terms,
        TermKind,
    };

    #[test]
    fn existentials_of_first_rule_are_nulls() {
        let assignments = VariableAssignments::new(3, 3);

        let from = term_info_unify(&Term::Existential(2), &assignments, Side::From);
        assert_eq!(from.kind, TermKind::Constant);
        assert_eq!(
            from.constant,
            Some(Value::Null {
                side: Side::From,
                variable: 2
            })
        );

        let to = term_info_unify(&Term::Existential(2), &assignments, Side::To);
        assert_eq!(to.kind, TermKind::Existential);
        assert_eq!(to.constant, None);
    }

    #[test]
    fn unification_binds_and_connects() {
        let mut assignments = VariableAssignments::new(3, 3);

        let from = term_info_unify(&Term::Existential(2), &assignments, Side::From);
        let to = term_info_unify(&Term::Universal(1), &assignments, Side::To);
        assert!(unify_terms(&from, &to, &mut assignments));
        assert!(term_info_unify(&Term::Universal(1), &assignments, Side::To).is_null());

        let from = term_info_unify(&Term::Universal(1), &assignments, Side::From);
        let to = term_info_unify(&Term::Universal(2), &assignments, Side::To);
        assert!(unify_terms(&from, &to, &mut assignments));
        assignments.finish_group_assignments();

        let left = term_info_models(&Term::Universal(1), &assignments, Side::From, false);
        let right = term_info_models(&Term::Universal(2), &assignments, Side::To, false);
        assert!(terms_equal(&left, &right));

        let constant = Term::Constant(ConstantId(0));
        let from = term_info_unify(&constant, &assignments, Side::From);
        let to = term_info_unify(&Term::Universal(1), &assignments, Side::To);
        assert!(!unify_terms(&from, &to, &mut assignments));
    }

    #[test]
    fn free_variables_equal_only_themselves() {
        let assignments = VariableAssignments::new(3, 3);

        let left = term_info_models(&Term::Universal(1), &assignments, Side::From, false);
        let same = term_info_models(&Term::Universal(1), &assignments, Side::From, false);
        let other_side = term_info_models(&Term::Universal(1), &assignments, Side::To, false);

        assert!(terms_equal(&left, &same));
        assert!(!terms_equal(&left, &other_side));
    }

    #[test]
    fn default_assigned_existentials_are_fresh() {
        let mut assignments = VariableAssignments::new(3, 3);
        assignments.assign_constants(
            1,
            Side::To,
            Value::Null {
                side: Side::To,
                variable: 1,
            },
        );

        let fresh = term_info_models(&Term::Existential(1), &assignments, Side::To, true);
        let bound = term_info_models(&Term::Existential(1), &assignments, Side::To, false);

        assert_eq!(fresh.group, GroupSlot::Unassigned);
        assert_ne!(fresh.constant, bound.constant);
        assert!(fresh.is_null());
    }

    #[test]
    fn self_unification_stays_in_first_rule() {
        let mut assignments = VariableAssignments::new(4, 0);

        let from = term_info_unify_self(&Term::Universal(1), &assignments, Side::From);
        let to = term_info_unify_self(&Term::Existential(3), &assignments, Side::To);
        assert_eq!(to.side, Side::From);
        assert!(unify_terms(&from, &to, &mut assignments));
        assignments.finish_group_assignments();

        assert_eq!(
            assignments.group(1, Side::From),
            assignments.group(3, Side::From)
        );
    }
}
