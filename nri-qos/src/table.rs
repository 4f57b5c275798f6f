use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nri_api::BandwidthSpec;

/// The bandwidth applied when a pod's class cannot be resolved and the policy says to fall back.
pub const DEFAULT_BANDWIDTH: BandwidthSpec =
    BandwidthSpec::ingress(450_000, 1_000_000).with_egress(600_000, 800_000);

/// A single QoS class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosClass {
    /// The maximum number of pods in this class. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// The bandwidth applied to pods of this class.
    #[serde(default)]
    pub bandwidth: BandwidthSpec,
}

impl QosClass {
    /// Creates a class with the given bandwidth and no capacity.
    pub const fn new(bandwidth: BandwidthSpec) -> Self {
        Self { capacity: None, bandwidth }
    }

    /// Sets the informational capacity.
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// Maps QoS class names to their [`QosClass`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandwidthTable(BTreeMap<String, QosClass>);

impl BandwidthTable {
    /// The built-in `slow`, `normal` and `fast` classes. They only limit ingress.
    pub fn builtin() -> Self {
        [
            ("slow", BandwidthSpec::ingress(100_000, 150_000)),
            ("normal", BandwidthSpec::ingress(500_000, 550_000)),
            ("fast", BandwidthSpec::ingress(1_000_000, 1_500_000)),
        ]
        .into_iter()
        .map(|(name, bandwidth)| (name, QosClass::new(bandwidth)))
        .collect()
    }

    /// Returns the class named `class`, if any.
    pub fn get(&self, class: &str) -> Option<&QosClass> {
        self.0.get(class)
    }

    /// Adds or replaces a class.
    pub fn insert(&mut self, class: impl Into<String>, qos: QosClass) {
        self.0.insert(class.into(), qos);
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the table has no class.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the classes, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QosClass)> + '_ {
        self.0.iter().map(|(name, class)| (name.as_str(), class))
    }
}

impl<S: Into<String>> FromIterator<(S, QosClass)> for BandwidthTable {
    fn from_iter<I: IntoIterator<Item = (S, QosClass)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, class)| (name.into(), class)).collect())
    }
}
