//! Plan modifiers for schema attributes

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Forces replacement when the planned value differs from state.
///
/// Creation (null state) and destroy (null plan) never trigger it.
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;
        let requires_replace = !state.is_null() && !plan.is_null() && !values_equal(state, plan);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Forces replacement only when a string value changes other than by case.
/// Azure echoes names and locations back with its own casing.
pub struct RequiresReplaceIgnoreCase;

impl PlanModifier for RequiresReplaceIgnoreCase {
    fn description(&self) -> String {
        "changing this value (ignoring case) forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = match (&request.state_value.value, &request.plan_value.value) {
            (Dynamic::String(s), Dynamic::String(p)) => !s.eq_ignore_ascii_case(p),
            (Dynamic::Null, _) | (_, Dynamic::Null) => false,
            (s, p) => !values_equal(s, p),
        };

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Keeps the prior state value for a computed attribute whose plan is unknown
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("field"),
        }
    }

    #[test]
    fn requires_replace_on_change_only() {
        let same = RequiresReplace.modify(request(Dynamic::from("a"), Dynamic::from("a")));
        assert!(!same.requires_replace);

        let changed = RequiresReplace.modify(request(Dynamic::from("a"), Dynamic::from("b")));
        assert!(changed.requires_replace);

        let unknown = RequiresReplace.modify(request(Dynamic::from("a"), Dynamic::Unknown));
        assert!(unknown.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create() {
        let create = RequiresReplace.modify(request(Dynamic::Null, Dynamic::from("b")));
        assert!(!create.requires_replace);
    }

    #[test]
    fn requires_replace_ignore_case() {
        let recased = RequiresReplaceIgnoreCase
            .modify(request(Dynamic::from("westeurope"), Dynamic::from("WestEurope")));
        assert!(!recased.requires_replace);

        let moved = RequiresReplaceIgnoreCase
            .modify(request(Dynamic::from("westeurope"), Dynamic::from("eastus")));
        assert!(moved.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_copies_state() {
        let response =
            UseStateForUnknown.modify(request(Dynamic::from("existing-id"), Dynamic::Unknown));
        assert_eq!(response.plan_value.value, Dynamic::from("existing-id"));

        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }
}
