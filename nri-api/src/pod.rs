use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// A pod sandbox, as seen by the runtime when calling a hook.
///
/// This is an immutable snapshot: plugins read it, they never hand it back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSandbox {
    /// The runtime-assigned sandbox ID.
    pub id: String,
    /// The pod name.
    pub name: String,
    /// The pod UID. Shared by every sandbox the runtime creates for the pod.
    pub uid: String,
    /// The pod namespace.
    pub namespace: String,
    /// The pod labels.
    pub labels: BTreeMap<String, String>,
    /// The pod annotations.
    pub annotations: BTreeMap<String, String>,
}

impl PodSandbox {
    /// Creates a new pod sandbox with the given identity and no labels or annotations.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Sets the runtime-assigned sandbox ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Returns the pod namespace.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the pod name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pod UID.
    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the label value for `key`, if any.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns the annotation value for `key`, if any.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Returns the key identifying this sandbox across hook calls: the sandbox ID, else the pod
    /// UID, else `namespace/name`.
    ///
    /// A pod keeps its UID when the runtime recreates its sandbox, so the UID alone does not tell
    /// two sandboxes of the same pod apart.
    pub fn key(&self) -> String {
        if !self.id.is_empty() {
            self.id.clone()
        } else if !self.uid.is_empty() {
            self.uid.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for PodSandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A container known to the runtime. Only delivered during `Synchronize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    /// The container ID.
    pub id: String,
    /// The ID of the sandbox the container runs in.
    pub pod_sandbox_id: String,
    /// The container name.
    pub name: String,
    /// The container labels.
    pub labels: BTreeMap<String, String>,
    /// The container annotations.
    pub annotations: BTreeMap<String, String>,
}

/// An update instruction for an existing container, proposed during `Synchronize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerUpdate {
    /// The container to update.
    pub container_id: String,
    /// Whether a failure to apply this update may be ignored by the runtime.
    pub ignore_failure: bool,
}
