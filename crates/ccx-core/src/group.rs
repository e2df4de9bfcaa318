use ccx_model::{ConcurrencyPolicy, Run, Selector};

use crate::error::GateError;

/// Build the selector for the concurrency group `run` belongs to under `policy`.
///
/// The result is the policy's selector with every `group_by` key pinned to the run's
/// value, so it selects exactly the runs that match the policy *and* share the run's
/// group values. A run with no value for some `group_by` key has no group: that is a
/// permanent [`GateError::MissingGroupLabel`], not an empty group.
pub fn group_selector(policy: &ConcurrencyPolicy, run: &Run) -> Result<Selector, GateError> {
    let mut selector = policy.selector.clone();
    for key in &policy.group_by {
        let value = run
            .labels
            .get(key)
            .ok_or_else(|| GateError::MissingGroupLabel {
                run: run.key(),
                policy: policy.name.clone(),
                key: key.clone(),
            })?;
        selector = selector.require(key.as_str(), value);
    }
    Ok(selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_group_by_returns_policy_selector() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Cancel")
            .with_selector(Selector::everything().require("app", "foo"));
        let r = Run::new("ns", "r1").with_label("app", "foo");

        assert_eq!(group_selector(&p, &r).unwrap(), p.selector);
    }

    #[test]
    fn group_by_keys_are_pinned_to_run_values() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Cancel")
            .with_selector(Selector::everything().require("app", "foo"))
            .with_group_by("team")
            .with_group_by("env");
        let r = Run::new("ns", "r1")
            .with_label("app", "foo")
            .with_label("team", "a")
            .with_label("env", "prod")
            .with_label("unrelated", "x");

        let sel = group_selector(&p, &r).unwrap();
        assert_eq!(sel.to_string(), "app=foo,env=prod,team=a");
    }

    #[test]
    fn missing_group_value_names_run_and_key() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Cancel").with_group_by("team");
        let r = Run::new("ns", "r1").with_label("app", "foo");

        let err = group_selector(&p, &r).unwrap_err();
        assert!(err.is_permanent());
        match &err {
            GateError::MissingGroupLabel { run, key, .. } => {
                assert_eq!(run, "ns/r1");
                assert_eq!(key, "team");
            }
            other => panic!("expected MissingGroupLabel, got {other:?}"),
        }
        assert!(err.to_string().contains("team"));
    }

    #[test]
    fn empty_group_value_is_still_a_value() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Cancel").with_group_by("team");
        let r = Run::new("ns", "r1").with_label("team", "");

        let sel = group_selector(&p, &r).unwrap();
        assert_eq!(sel.get("team"), Some(""));
    }
}
