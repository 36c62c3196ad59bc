//! The specification rule set.
//!
//! Each submodule exports its validators in declaration order. Order
//! matters: a requiredness check for a conditional payload runs before any
//! check that reads the payload, and grouping by producer keeps that order.

pub mod conditional;
pub mod relations;

use tabgen_core::{Validator, collect, group_by_context};

use crate::context::Specification;

/// Every rule, grouped so each document scope is walked once.
pub fn all() -> Vec<Validator<Specification>> {
    group_by_context(collect([conditional::validators(), relations::validators()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EACH_FIELD, EACH_TABLE};

    #[test]
    fn rules_are_grouped_in_declaration_order() {
        let rules = all();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].uses_producer(&EACH_FIELD));
        assert!(rules[1].uses_producer(&EACH_TABLE));

        let field_checks: Vec<_> = rules[0].check_names().collect();
        let position = |name: &str| {
            field_checks
                .iter()
                .position(|check| *check == name)
                .unwrap_or_else(|| panic!("missing check {name}"))
        };
        assert!(position("foreign_key_params_required") < position("foreign_key_reference_exists"));
        assert!(position("random_number_required") < position("random_number_ordered"));
        assert!(position("number_sequence_required") < position("looping_sequence_params_required"));

        assert_eq!(
            rules[1].check_names().collect::<Vec<_>>(),
            ["one_primary_key_per_table"]
        );
    }
}
