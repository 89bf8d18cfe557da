//! Metrics for the Z-Wave node stack.
//!
//! Every metric the stack records is declared once here as a [`Metric`], and
//! node-scoped metrics carry the [`MetricLabels`] of their node. The
//! `metrics` crate is re-exported so callers record through the same facade.
//!
//! # Example
//!
//! ```rust
//! use zwave_metrics::{metric_defs, MetricLabels};
//!
//! let labels = MetricLabels::new(5, "binary_switch");
//! metrics::counter!(metric_defs::FRAMES_SENT.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, Unit};

/// Label keys every node-scoped metric carries.
pub const NODE_LABELS: &[&str] = &["node", "profile"];

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// A metric declaration. All node stack metrics count frames, nodes or
/// cycles, so the unit is always [`Unit::Count`].
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    /// Label keys beyond [`NODE_LABELS`]. Driver-level metrics have none.
    pub extra_labels: &'static [&'static str],
    pub node_scoped: bool,
}

impl Metric {
    const fn node(kind: MetricKind, name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            extra_labels: &[],
            node_scoped: true,
        }
    }

    const fn driver(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
            extra_labels: &[],
            node_scoped: false,
        }
    }

    const fn labelled(mut self, extra: &'static [&'static str]) -> Self {
        self.extra_labels = extra;
        self
    }

    /// Full set of label keys this metric is recorded with.
    pub fn label_keys(&self) -> Vec<&'static str> {
        let base: &[&str] = if self.node_scoped { NODE_LABELS } else { &[] };
        base.iter().chain(self.extra_labels).copied().collect()
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => {
                describe_counter!(self.name, Unit::Count, self.description);
            }
            MetricKind::Gauge => {
                describe_gauge!(self.name, Unit::Count, self.description);
            }
        }
    }
}

/// All metric definitions for the node stack.
pub mod metric_defs {
    use super::{Metric, MetricKind::*};

    // ========================================================================
    // Transport
    // ========================================================================

    pub const FRAMES_SENT: Metric =
        Metric::node(Counter, "zwave.node.frames_sent", "Frames handed to the transport");

    pub const FRAMES_RECEIVED: Metric =
        Metric::node(Counter, "zwave.node.frames_received", "Frames delivered to a node")
            .labelled(&["kind"]);

    /// Frames parked in the wakeup queue of a sleeping node.
    pub const FRAMES_DEFERRED: Metric = Metric::node(
        Counter,
        "zwave.node.frames_deferred",
        "Frames deferred until a sleeping node wakes",
    );

    pub const FRAMES_DROPPED: Metric = Metric::node(
        Counter,
        "zwave.node.frames_dropped",
        "Inbound frames dropped without a handler",
    )
    .labelled(&["reason"]);

    /// Sampled after each tick.
    pub const WRITE_QUEUE_DEPTH: Metric = Metric::node(
        Gauge,
        "zwave.node.write_queue_depth",
        "Frames waiting in the write queue",
    );

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub const NODE_INFO_RETRIES: Metric = Metric::node(
        Counter,
        "zwave.node.node_info_retries",
        "Node-info requests re-issued after a failure",
    );

    pub const STATE_TRANSITIONS: Metric =
        Metric::node(Counter, "zwave.node.state_transitions", "Lifecycle state changes")
            .labelled(&["state"]);

    pub const NODES_STARTED: Metric =
        Metric::node(Counter, "zwave.node.started", "Nodes that completed discovery");

    // ========================================================================
    // Driver
    // ========================================================================

    pub const DRIVER_CYCLES: Metric =
        Metric::driver("zwave.driver.cycles", "Scheduling cycles run by the driver");

    pub const DRIVER_UNROUTED: Metric =
        Metric::driver("zwave.driver.unrouted_frames", "Inbound frames that matched no node");

    pub const ALL: &[&Metric] = &[
        &FRAMES_SENT,
        &FRAMES_RECEIVED,
        &FRAMES_DEFERRED,
        &FRAMES_DROPPED,
        &WRITE_QUEUE_DEPTH,
        &NODE_INFO_RETRIES,
        &STATE_TRANSITIONS,
        &NODES_STARTED,
        &DRIVER_CYCLES,
        &DRIVER_UNROUTED,
    ];
}

/// Labels identifying the node a metric belongs to.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    pub node: String,
    /// Device profile name (binary_switch, multilevel_switch, generic).
    pub profile: String,
}

impl MetricLabels {
    pub fn new(node: impl ToString, profile: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            profile: profile.into(),
        }
    }

    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("node", self.node.clone()),
            ("profile", self.profile.clone()),
        ]
    }

    /// Node labels followed by `extra`.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used by the node stack. Call once at startup,
/// after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels_new() {
        let labels = MetricLabels::new(5u8, "binary_switch");
        assert_eq!(labels.node, "5");
        assert_eq!(labels.profile, "binary_switch");
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new(5u8, "generic");
        let extended = labels.with(&[("reason", "unknown_class".to_string())]);

        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("node", "5".to_string())));
        assert!(extended.contains(&("reason", "unknown_class".to_string())));
    }

    #[test]
    fn test_label_keys() {
        assert_eq!(
            metric_defs::FRAMES_DROPPED.label_keys(),
            vec!["node", "profile", "reason"]
        );
        assert_eq!(metric_defs::FRAMES_SENT.label_keys(), vec!["node", "profile"]);
        assert!(metric_defs::DRIVER_CYCLES.label_keys().is_empty());
    }

    #[test]
    fn test_metric_kinds() {
        assert_eq!(metric_defs::FRAMES_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::WRITE_QUEUE_DEPTH.kind, MetricKind::Gauge);
    }

    #[test]
    fn test_all_metrics_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op.
        describe_metrics();
    }
}
