use ccx_model::{ConcurrencyPolicy, Run, Strategy};

use crate::{
    error::GateError,
    matcher::{Classification, classify},
};

/// Policies of a namespace split by how they relate to one run.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub matching: Vec<&'a ConcurrencyPolicy>,
    pub non_matching: Vec<&'a ConcurrencyPolicy>,
    pub undetermined: Vec<&'a ConcurrencyPolicy>,
    /// Effective strategy; `None` iff nothing matched.
    pub strategy: Option<Strategy>,
}

impl Resolution<'_> {
    /// Returns `true` if nothing matched yet some policy could still match once
    /// the run gains more labels.
    pub fn awaiting_labels(&self) -> bool {
        self.matching.is_empty() && !self.undetermined.is_empty()
    }
}

/// Resolve the effective strategy for `run` among `policies`.
///
/// All matching policies must declare the same strategy string. The first one that
/// does not yields [`GateError::StrategyConflict`]. The agreed string is parsed last,
/// so an unsupported value is reported as [`GateError::InvalidStrategy`].
pub fn resolve<'a>(
    run: &Run,
    policies: &'a [ConcurrencyPolicy],
) -> Result<Resolution<'a>, GateError> {
    let mut res = Resolution::default();

    for policy in policies {
        match classify(run, policy) {
            Classification::Matching => {
                if let Some(first) = res.matching.first()
                    && first.strategy != policy.strategy
                {
                    return Err(GateError::StrategyConflict {
                        run: run.key(),
                        first_policy: first.name.clone(),
                        first: first.strategy.clone(),
                        second_policy: policy.name.clone(),
                        second: policy.strategy.clone(),
                    });
                }
                res.matching.push(policy);
            }
            Classification::NonMatching => res.non_matching.push(policy),
            Classification::Undetermined => res.undetermined.push(policy),
        }
    }

    if let Some(first) = res.matching.first() {
        let strategy = first
            .parsed_strategy()
            .map_err(|source| GateError::InvalidStrategy {
                policy: first.name.clone(),
                source,
            })?;
        res.strategy = Some(strategy);
    }
    Ok(res)
}
