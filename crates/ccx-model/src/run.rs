use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::{
    LABEL_CONCURRENCY_APPLIED, LABEL_START_ON_ADMISSION, Labels,
    domain::{Namespace, RunName},
    error::{ModelError, ModelResult},
};

/// Requested lifecycle state written on a run's spec.
///
/// The execution engine reads it to decide whether a run may start or must wind down.
/// `None` is the default and serializes as the empty string.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecStatus {
    /// No request: the run starts (or keeps running) normally.
    #[default]
    None,
    /// The run is held and must not start.
    Pending,
    /// Stop immediately.
    Cancelled,
    /// Cancel, running finalization steps.
    CancelledRunFinally,
    /// Stop scheduling new work, then run finalization steps.
    StoppedRunFinally,
}

impl SpecStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecStatus::None => "",
            SpecStatus::Pending => "Pending",
            SpecStatus::Cancelled => "Cancelled",
            SpecStatus::CancelledRunFinally => "CancelledRunFinally",
            SpecStatus::StoppedRunFinally => "StoppedRunFinally",
        }
    }
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecStatus {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim() {
            "" => Ok(SpecStatus::None),
            "Pending" => Ok(SpecStatus::Pending),
            "Cancelled" => Ok(SpecStatus::Cancelled),
            "CancelledRunFinally" => Ok(SpecStatus::CancelledRunFinally),
            "StoppedRunFinally" => Ok(SpecStatus::StoppedRunFinally),
            other => Err(ModelError::UnknownSpecStatus(other.to_string())),
        }
    }
}

impl Serialize for SpecStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SpecStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A workload execution request gated by concurrency controls.
///
/// Runs are owned by the execution engine. Concurrency controls only read
/// `labels`, `spec_status` and `done`, and write cancellation transitions or the
/// processed marker back through a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Namespace the run belongs to.
    pub namespace: Namespace,
    /// Name, unique within the namespace.
    pub name: RunName,
    /// Labels used for policy matching and grouping.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    /// Requested lifecycle state.
    #[serde(default)]
    pub spec_status: SpecStatus,
    /// Set once the run reached a terminal state (succeeded, failed or cancelled).
    #[serde(default)]
    pub done: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Store-assigned version used for optimistic concurrency on update.
    #[serde(default)]
    pub resource_version: u64,
}

impl Run {
    /// Create a run with no labels, created now.
    pub fn new(namespace: impl Into<Namespace>, name: impl Into<RunName>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: Labels::new(),
            spec_status: SpecStatus::None,
            done: false,
            created_at: OffsetDateTime::now_utc(),
            resource_version: 0,
        }
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }

    /// Builder-style status setter.
    pub fn with_status(mut self, status: SpecStatus) -> Self {
        self.spec_status = status;
        self
    }

    /// Builder-style terminal flag setter.
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// `namespace/name`, used in logs and errors.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Returns `true` if the run is held before start.
    pub fn is_pending(&self) -> bool {
        self.spec_status == SpecStatus::Pending
    }

    /// Returns `true` once the run reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns `true` if concurrency controls were already applied.
    pub fn concurrency_applied(&self) -> bool {
        self.labels.contains_key(LABEL_CONCURRENCY_APPLIED)
    }

    /// Returns `true` if the hold was placed by the admission layer rather than the author.
    pub fn held_by_admission(&self) -> bool {
        self.labels.contains_key(LABEL_START_ON_ADMISSION)
    }
}
