//! Type-checker call budget.
//!
//! Full type resolution at every syntactic site is prohibitively slow, so
//! each scan carries a budget of checker queries and a fixed policy that
//! decides which resolution sites are worth spending one on. The budget is
//! reset at the start of every scan of a non-cached file; cached files
//! consume nothing.

use serde::Serialize;

/// Where a prospective checker query originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerContext {
    Call,
    Heritage,
    Decorator,
    Reference,
    Export,
}

/// Hints about the resolution site, used by the worth policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextHints {
    /// The name reached this file through an import.
    pub imported: bool,
    /// The name index holds more than one candidate.
    pub ambiguous: bool,
    /// Length of the identifier under resolution.
    pub name_length: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BudgetStats {
    pub remaining: u32,
    pub spent: u32,
    pub total: u32,
    pub percent_used: f32,
}

/// Budget counter plus the context worth policy.
#[derive(Debug)]
pub struct TypeCheckerBudget {
    total: u32,
    remaining: u32,
}

impl TypeCheckerBudget {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            remaining: total,
        }
    }

    /// Reset to the full budget. Called at the start of each scan.
    pub fn reset(&mut self) {
        self.remaining = self.total;
    }

    /// Whether a checker query at this site is worth the spend.
    ///
    /// Heritage and decorator contexts always try: they are rare and high
    /// value. Calls and exports try when the target is imported or
    /// ambiguous. References are the noisiest and only try when both
    /// imported and ambiguous with a name of at least three characters.
    pub fn should_use_type_checker(&self, ctx: CheckerContext, hints: ContextHints) -> bool {
        if self.remaining == 0 {
            return false;
        }
        match ctx {
            CheckerContext::Heritage | CheckerContext::Decorator => true,
            CheckerContext::Call | CheckerContext::Export => hints.imported || hints.ambiguous,
            CheckerContext::Reference => {
                hints.imported && hints.ambiguous && hints.name_length >= 3
            }
        }
    }

    /// Consume one budget unit if available. Returns whether a unit was
    /// actually consumed.
    pub fn take_budget(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn stats(&self) -> BudgetStats {
        let spent = self.total - self.remaining;
        BudgetStats {
            remaining: self.remaining,
            spent,
            total: self.total,
            percent_used: if self.total == 0 {
                0.0
            } else {
                spent as f32 * 100.0 / self.total as f32
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heritage_always_tries() {
        let budget = TypeCheckerBudget::new(10);
        assert!(budget.should_use_type_checker(CheckerContext::Heritage, ContextHints::default()));
        assert!(budget.should_use_type_checker(CheckerContext::Decorator, ContextHints::default()));
    }

    #[test]
    fn test_calls_require_imported_or_ambiguous() {
        let budget = TypeCheckerBudget::new(10);
        assert!(!budget.should_use_type_checker(CheckerContext::Call, ContextHints::default()));
        assert!(budget.should_use_type_checker(
            CheckerContext::Call,
            ContextHints {
                imported: true,
                ..Default::default()
            }
        ));
        assert!(budget.should_use_type_checker(
            CheckerContext::Call,
            ContextHints {
                ambiguous: true,
                ..Default::default()
            }
        ));
    }

    #[test]
    fn test_references_are_strict() {
        let budget = TypeCheckerBudget::new(10);
        let both_short = ContextHints {
            imported: true,
            ambiguous: true,
            name_length: 2,
        };
        assert!(!budget.should_use_type_checker(CheckerContext::Reference, both_short));

        let both_long = ContextHints {
            imported: true,
            ambiguous: true,
            name_length: 3,
        };
        assert!(budget.should_use_type_checker(CheckerContext::Reference, both_long));

        let only_imported = ContextHints {
            imported: true,
            ambiguous: false,
            name_length: 8,
        };
        assert!(!budget.should_use_type_checker(CheckerContext::Reference, only_imported));
    }

    #[test]
    fn test_budget_exhaustion_is_final() {
        let mut budget = TypeCheckerBudget::new(2);
        assert!(budget.take_budget());
        assert!(budget.take_budget());
        assert!(!budget.take_budget());
        // Once remaining == 0, every context says no, forever within the scan.
        assert!(!budget.should_use_type_checker(CheckerContext::Heritage, ContextHints::default()));
        assert!(!budget.should_use_type_checker(
            CheckerContext::Call,
            ContextHints {
                imported: true,
                ..Default::default()
            }
        ));
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut budget = TypeCheckerBudget::new(1);
        assert!(budget.take_budget());
        assert_eq!(budget.remaining(), 0);
        budget.reset();
        assert_eq!(budget.remaining(), 1);
    }

    #[test]
    fn test_stats() {
        let mut budget = TypeCheckerBudget::new(4);
        budget.take_budget();
        let stats = budget.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.spent, 1);
        assert_eq!(stats.remaining, 3);
        assert!((stats.percent_used - 25.0).abs() < f32::EPSILON);
    }
}
