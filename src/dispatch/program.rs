//! Backend-neutral linear program representation.
//!
//! The builder emits this instead of driving a solver API directly so that
//! backends stay swappable: the exact backend translates it 1:1, the
//! experimental annealing backend re-encodes it. The [`ProgramLayout`] maps
//! variable families back to ids for the decoder and carries the resolved
//! numeric context of the instance.

use serde::{Deserialize, Serialize};

use crate::dispatch::policy::PenaltyWeights;
use crate::domain::{BatteryParams, GridConfig, LoadClass};

/// Index of a decision variable within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// A real-valued decision variable with bounds. All dispatch variables have
/// a finite lower bound (non-negativity); penalized slack families
/// (`unmet`, `curtail`) have no upper bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub lower: f64,
    pub upper: Option<f64>,
}

/// Set of variables under construction.
#[derive(Debug, Default)]
pub struct Variables {
    defs: Vec<VarDef>,
}

impl Variables {
    pub fn add(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        let id = VarId(self.defs.len());
        self.defs.push(VarDef {
            name: name.into(),
            lower,
            upper,
        });
        id
    }

    /// One variable per hour, named `prefix[h]`.
    pub fn add_series(
        &mut self,
        prefix: &str,
        horizon: usize,
        lower: f64,
        upper: Option<f64>,
    ) -> Vec<VarId> {
        (0..horizon)
            .map(|h| self.add(format!("{prefix}[{h}]"), lower, upper))
            .collect()
    }

    pub fn into_defs(self) -> Vec<VarDef> {
        self.defs
    }
}

/// Sparse linear expression over decision variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
        self
    }

    pub fn eval(&self, assignment: &Assignment) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * assignment.value(*var))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// Labeled linear constraint `expr <relation> rhs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub label: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Constraint violation for an assignment: 0 when satisfied, positive
    /// magnitude of the breach otherwise.
    pub fn violation(&self, assignment: &Assignment) -> f64 {
        let lhs = self.expr.eval(assignment);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs(),
            Relation::Le => (lhs - self.rhs).max(0.0),
            Relation::Ge => (self.rhs - lhs).max(0.0),
        }
    }
}

/// Variable -> value mapping produced by a solver backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment(pub Vec<f64>);

impl Assignment {
    pub fn zeroed(num_vars: usize) -> Self {
        Self(vec![0.0; num_vars])
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.0[var.0]
    }

    pub fn set(&mut self, var: VarId, value: f64) {
        self.0[var.0] = value;
    }

    pub fn series(&self, vars: &[VarId]) -> Vec<f64> {
        vars.iter().map(|v| self.value(*v)).collect()
    }
}

/// Variable-family ids for the shared battery block plus the mode-specific
/// flow families, with the resolved inputs the builder derived them from.
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub horizon: usize,
    pub battery: BatteryParams,
    pub generation_kwh: Vec<f64>,
    pub weights: PenaltyWeights,
    pub charge: Vec<VarId>,
    pub discharge: Vec<VarId>,
    pub soc: Vec<VarId>,
    pub curtail: Vec<VarId>,
    pub flows: LayoutFlows,
}

#[derive(Debug, Clone)]
pub enum LayoutFlows {
    Grid {
        grid: GridConfig,
        demand_kwh: Vec<f64>,
        import: Vec<VarId>,
        export: Vec<VarId>,
        unmet: Vec<VarId>,
    },
    Island {
        classes: Vec<LoadClass>,
        served: Vec<Vec<VarId>>,
        unmet: Vec<Vec<VarId>>,
    },
}

/// A complete instance: minimize `objective` subject to `constraints` over
/// bounded non-negative variables.
#[derive(Debug, Clone)]
pub struct DispatchProgram {
    pub vars: Vec<VarDef>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: LinearExpr,
    pub layout: ProgramLayout,
}

impl DispatchProgram {
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn objective_value(&self, assignment: &Assignment) -> f64 {
        self.objective.eval(assignment)
    }

    /// Largest constraint or bound violation across the whole program.
    pub fn max_violation(&self, assignment: &Assignment) -> f64 {
        let constraint_violation = self
            .constraints
            .iter()
            .map(|c| c.violation(assignment))
            .fold(0.0_f64, f64::max);
        let bound_violation = self
            .vars
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let v = assignment.0[i];
                let below = (def.lower - v).max(0.0);
                let above = def.upper.map_or(0.0, |u| (v - u).max(0.0));
                below.max(above)
            })
            .fold(0.0_f64, f64::max);
        constraint_violation.max(bound_violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_eval_and_violation() {
        let mut vars = Variables::default();
        let x = vars.add("x", 0.0, Some(10.0));
        let y = vars.add("y", 0.0, None);

        let mut expr = LinearExpr::new();
        expr.add_term(x, 2.0).add_term(y, -1.0);

        let mut assignment = Assignment::zeroed(2);
        assignment.set(x, 3.0);
        assignment.set(y, 1.0);
        assert_eq!(expr.eval(&assignment), 5.0);

        let le = LinearConstraint {
            label: "cap".into(),
            expr: expr.clone(),
            relation: Relation::Le,
            rhs: 4.0,
        };
        assert_eq!(le.violation(&assignment), 1.0);

        let ge = LinearConstraint {
            label: "floor".into(),
            expr,
            relation: Relation::Ge,
            rhs: 4.0,
        };
        assert_eq!(ge.violation(&assignment), 0.0);
    }

    #[test]
    fn zero_coefficients_are_not_stored() {
        let mut vars = Variables::default();
        let x = vars.add("x", 0.0, None);
        let mut expr = LinearExpr::new();
        expr.add_term(x, 0.0);
        assert!(expr.terms.is_empty());
    }
}
