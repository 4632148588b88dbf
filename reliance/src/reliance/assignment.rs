//! Module containing the transactional variable assignment used while comparing two rules.
//!
//! The variables of both rules share one index space:
//! variables of the first rule (the [`Side::From`] rule) occupy the slots `[0, count_from)`,
//! variables of the second rule (the [`Side::To`] rule) occupy the slots after that.
//!
//! Unified variables are connected in an undirected graph over those slots.
//! Every connected component is either assigned a [`Value`]
//! or identified by a group id, which is computed by [`VariableAssignments::finish_group_assignments`].
//! All changes can be undone by pairing [`VariableAssignments::increase_depth`]
//! with [`VariableAssignments::decrease_depth`].

use crate::model::{ConstantId, VariableIndex};

/// Which of the two compared rules a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// The first rule of the pair
    From,
    /// The second rule of the pair
    To,
}

/// A value a variable can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A named constant
    Constant(ConstantId),
    /// The null produced by an existential variable
    Null {
        /// Rule containing the existential variable
        side: Side,
        /// The existential variable
        variable: VariableIndex,
    },
    /// A null that differs from every null produced during unification
    FreshNull {
        /// Rule containing the existential variable
        side: Side,
        /// The existential variable
        variable: VariableIndex,
    },
}

impl Value {
    /// Return `true` if this value is some kind of null.
    pub fn is_null(&self) -> bool {
        !matches!(self, Value::Constant(_))
    }
}

/// State of the group assignment of a single variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupSlot {
    /// Variable was never unified with another variable
    Unassigned,
    /// Variable was unified but groups have not been recomputed yet
    Pending,
    /// Variable belongs to the given group
    Group(usize),
}

/// Single entry of the undo log
#[derive(Debug, Clone, Copy)]
enum Change {
    Constant {
        slot: usize,
        previous: Option<Value>,
    },
    Group {
        slot: usize,
        previous: GroupSlot,
    },
}

/// State recorded by [`VariableAssignments::increase_depth`]
#[derive(Debug, Clone)]
struct Checkpoint {
    /// Length of the undo log
    log_length: usize,
    /// Number of edges of each slot
    edge_counts: Vec<usize>,
    has_mapped_existential: bool,
}

/// Assignment of the variables of two rules
/// to values and groups of equal variables.
#[derive(Debug, Clone)]
pub struct VariableAssignments {
    /// Index of the first slot of the [`Side::To`] rule
    offset: usize,

    constants: Vec<Option<Value>>,
    groups: Vec<GroupSlot>,
    edges: Vec<Vec<usize>>,

    /// Next unused group id; never reused, even after rollbacks
    next_group: usize,

    log: Vec<Change>,
    checkpoints: Vec<Checkpoint>,

    /// Whether an existential variable of the [`Side::To`] rule has been unified
    has_mapped_existential: bool,
}

impl VariableAssignments {
    /// Create a new [`VariableAssignments`] object
    /// for rules with the given number of variable slots.
    pub fn new(count_from: usize, count_to: usize) -> Self {
        let count = count_from + count_to;

        Self {
            offset: count_from,
            constants: vec![None; count],
            groups: vec![GroupSlot::Unassigned; count],
            edges: vec![Vec::new(); count],
            next_group: 0,
            log: Vec::new(),
            checkpoints: Vec::new(),
            has_mapped_existential: false,
        }
    }

    /// Index of the first slot of the [`Side::To`] rule.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the slot of a variable.
    fn slot(&self, variable: VariableIndex, side: Side) -> usize {
        match side {
            Side::From => variable as usize,
            Side::To => variable as usize + self.offset,
        }
    }

    /// Return the value assigned to the given variable.
    pub fn constant(&self, variable: VariableIndex, side: Side) -> Option<Value> {
        self.constants
            .get(self.slot(variable, side))
            .copied()
            .flatten()
    }

    /// Return the group of the given variable.
    ///
    /// Only meaningful after [`VariableAssignments::finish_group_assignments`].
    pub fn group(&self, variable: VariableIndex, side: Side) -> GroupSlot {
        self.groups
            .get(self.slot(variable, side))
            .copied()
            .unwrap_or(GroupSlot::Unassigned)
    }

    /// Return `true` if an existential variable of the [`Side::To`] rule has been unified
    /// since the creation of this object or the last rollback beyond that point.
    pub fn has_mapped_existential(&self) -> bool {
        self.has_mapped_existential
    }

    /// Remember that an existential variable of the [`Side::To`] rule has been unified.
    pub fn mark_mapped_existential(&mut self) {
        self.has_mapped_existential = true;
    }

    fn set_constant(&mut self, slot: usize, value: Value) {
        let previous = self.constants[slot];
        if previous != Some(value) {
            self.log.push(Change::Constant { slot, previous });
            self.constants[slot] = Some(value);
        }
    }

    fn set_group(&mut self, slot: usize, group: GroupSlot) {
        let previous = self.groups[slot];
        if previous != group {
            self.log.push(Change::Group { slot, previous });
            self.groups[slot] = group;
        }
    }

    /// Assign `value` to `start` and to every unassigned slot reachable through unassigned slots.
    fn propagate_constant(&mut self, start: usize, value: Value) {
        self.set_constant(start, value);

        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for edge_index in 0..self.edges[node].len() {
                let successor = self.edges[node][edge_index];

                if self.constants[successor].is_none() {
                    self.set_constant(successor, value);
                    stack.push(successor);
                }
            }
        }
    }

    fn connect_slots(&mut self, slot_a: usize, slot_b: usize) {
        self.edges[slot_a].push(slot_b);
        self.edges[slot_b].push(slot_a);

        self.set_group(slot_a, GroupSlot::Pending);
        self.set_group(slot_b, GroupSlot::Pending);

        if let Some(value) = self.constants[slot_a] {
            self.propagate_constant(slot_b, value);
        } else if let Some(value) = self.constants[slot_b] {
            self.propagate_constant(slot_a, value);
        }
    }

    /// Unify a variable of the [`Side::From`] rule with a variable of the [`Side::To`] rule.
    pub fn connect_variables(&mut self, variable_from: VariableIndex, variable_to: VariableIndex) {
        let slot_from = self.slot(variable_from, Side::From);
        let slot_to = self.slot(variable_to, Side::To);

        self.connect_slots(slot_from, slot_to);
    }

    /// Unify two variables of the [`Side::From`] rule.
    ///
    /// Used when a rule is compared with itself.
    pub fn connect_variables_self(&mut self, variable_a: VariableIndex, variable_b: VariableIndex) {
        let slot_a = self.slot(variable_a, Side::From);
        let slot_b = self.slot(variable_b, Side::From);

        self.connect_slots(slot_a, slot_b);
    }

    /// Unify two variables on the given sides.
    pub fn connect(
        &mut self,
        variable_a: VariableIndex,
        side_a: Side,
        variable_b: VariableIndex,
        side_b: Side,
    ) {
        let slot_a = self.slot(variable_a, side_a);
        let slot_b = self.slot(variable_b, side_b);

        self.connect_slots(slot_a, slot_b);
    }

    /// Assign a value to a variable and to every variable connected to it
    /// that has no value yet.
    pub fn assign_constants(&mut self, variable: VariableIndex, side: Side, value: Value) {
        let slot = self.slot(variable, side);
        self.propagate_constant(slot, value);
    }

    /// Compute group ids for every pending connected component.
    ///
    /// Must be called after all terms of a pair of literals have been unified.
    pub fn finish_group_assignments(&mut self) {
        for slot in 0..self.groups.len() {
            if self.groups[slot] != GroupSlot::Pending {
                continue;
            }

            let group = GroupSlot::Group(self.next_group);
            self.next_group += 1;

            let mut stack = vec![slot];
            while let Some(node) = stack.pop() {
                if self.groups[node] == group {
                    continue;
                }

                self.set_group(node, group);

                for edge_index in 0..self.edges[node].len() {
                    let successor = self.edges[node][edge_index];

                    if self.groups[successor] != group {
                        stack.push(successor);
                    }
                }
            }
        }
    }

    /// Open a new level of changes that can be undone by [`VariableAssignments::decrease_depth`].
    pub fn increase_depth(&mut self) {
        self.checkpoints.push(Checkpoint {
            log_length: self.log.len(),
            edge_counts: self.edges.iter().map(Vec::len).collect(),
            has_mapped_existential: self.has_mapped_existential,
        });
    }

    /// Undo every change made since the matching call to [`VariableAssignments::increase_depth`].
    ///
    /// Does nothing if there is no open level.
    pub fn decrease_depth(&mut self) {
        let Some(checkpoint) = self.checkpoints.pop() else {
            return;
        };

        while self.log.len() > checkpoint.log_length {
            match self.log.pop() {
                Some(Change::Constant { slot, previous }) => self.constants[slot] = previous,
                Some(Change::Group { slot, previous }) => self.groups[slot] = previous,
                None => break,
            }
        }

        for (edges, count) in self.edges.iter_mut().zip(checkpoint.edge_counts) {
            edges.truncate(count);
        }

        self.has_mapped_existential = checkpoint.has_mapped_existential;
    }

    /// Current nesting level.
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
}

#[cfg(test)]
mod test {
    use quickcheck_macros::quickcheck;
    use test_log::test;

    use crate::model::ConstantId;

    use super::{GroupSlot, Side, Value, VariableAssignments};

    #[test]
    fn constants_spread_through_components() {
        let mut assignments = VariableAssignments::new(3, 3);

        assignments.connect_variables(1, 1);
        assignments.connect_variables(2, 1);
        assignments.finish_group_assignments();

        assert_eq!(assignments.group(1, Side::From), assignments.group(2, Side::From));
        assert_eq!(assignments.group(1, Side::From), assignments.group(1, Side::To));
        assert_eq!(assignments.group(2, Side::To), GroupSlot::Unassigned);

        let value = Value::Constant(ConstantId(0));
        assignments.assign_constants(1, Side::To, value);

        assert_eq!(assignments.constant(1, Side::From), Some(value));
        assert_eq!(assignments.constant(2, Side::From), Some(value));
        assert_eq!(assignments.constant(2, Side::To), None);
    }

    #[test]
    fn connecting_assigned_variable_propagates() {
        let mut assignments = VariableAssignments::new(2, 2);
        let null = Value::Null {
            side: Side::From,
            variable: 1,
        };

        assignments.assign_constants(1, Side::To, null);
        assignments.connect_variables(1, 1);

        assert_eq!(assignments.constant(1, Side::From), Some(null));
        assert!(null.is_null());
    }

    #[test]
    fn rollback_restores_everything() {
        let mut assignments = VariableAssignments::new(3, 3);

        assignments.connect_variables(1, 1);
        assignments.finish_group_assignments();
        let group_before = assignments.group(1, Side::From);

        assignments.increase_depth();
        assignments.mark_mapped_existential();
        assignments.connect_variables(1, 2);
        assignments.connect_variables(2, 2);
        assignments.finish_group_assignments();
        assignments.assign_constants(2, Side::From, Value::Constant(ConstantId(3)));

        assert_ne!(assignments.group(1, Side::From), group_before);
        assert!(assignments.has_mapped_existential());

        assignments.decrease_depth();

        assert_eq!(assignments.group(1, Side::From), group_before);
        assert_eq!(assignments.group(2, Side::From), GroupSlot::Unassigned);
        assert_eq!(assignments.group(2, Side::To), GroupSlot::Unassigned);
        assert_eq!(assignments.constant(1, Side::From), None);
        assert!(!assignments.has_mapped_existential());
        assert_eq!(assignments.depth(), 0);

        // Edges added at the inner level are gone, so the constant stays local.
        assignments.assign_constants(1, Side::To, Value::Constant(ConstantId(4)));
        assert_eq!(assignments.constant(2, Side::To), None);
    }

    #[test]
    fn self_connection_uses_first_rule_slots() {
        let mut assignments = VariableAssignments::new(4, 0);

        assignments.connect_variables_self(1, 3);
        assignments.finish_group_assignments();

        assert_eq!(assignments.group(1, Side::From), assignments.group(3, Side::From));
        assert_ne!(assignments.group(1, Side::From), GroupSlot::Unassigned);
    }

    /// Applies a sequence of random operations at an inner level
    /// and checks that rolling back restores the observable state.
    #[quickcheck]
    fn rollback_is_exact(operations: Vec<(u8, u8, bool)>) -> bool {
        let count = 5;
        let mut assignments = VariableAssignments::new(count, count);

        let observe = |assignments: &VariableAssignments| {
            let mut state = Vec::new();
            for variable in 0..count as u32 {
                for side in [Side::From, Side::To] {
                    state.push((assignments.constant(variable, side), assignments.group(variable, side)));
                }
            }
            state
        };

        assignments.connect_variables(1, 1);
        assignments.finish_group_assignments();
        let before = observe(&assignments);

        assignments.increase_depth();
        for (a, b, assign) in operations {
            let a = u32::from(a) % count as u32;
            let b = u32::from(b) % count as u32;

            if assign {
                assignments.assign_constants(a, Side::To, Value::Constant(ConstantId(b as usize)));
            } else {
                assignments.connect_variables(a, b);
            }
        }
        assignments.finish_group_assignments();
        assignments.decrease_depth();

        observe(&assignments) == before
    }
}
