//! Per-variable metadata outside the assignment.
use xorsat_formula::Var;

/// Variable metadata.
///
/// Tracks which variables an external preprocessor eliminated. Eliminated
/// variables are skipped when branching and must not occur in any watched
/// clause; the preprocessor is responsible for extending a model back to
/// them via its reconstruction stack.
#[derive(Default)]
pub struct Variables {
    eliminated: Vec<bool>,
}

impl Variables {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.eliminated.resize(count, false);
    }

    /// Number of variables.
    pub fn count(&self) -> usize {
        self.eliminated.len()
    }

    /// Whether a variable was eliminated by preprocessing.
    pub fn is_eliminated(&self, var: Var) -> bool {
        self.eliminated[var.index()]
    }

    /// Mark a variable as eliminated.
    ///
    /// May only be called while the trail is empty above level 0 and no
    /// clause containing the variable remains watched.
    pub fn set_eliminated(&mut self, var: Var, eliminated: bool) {
        self.eliminated[var.index()] = eliminated;
    }
}
