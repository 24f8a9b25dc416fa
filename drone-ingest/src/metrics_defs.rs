use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Drone report request duration in seconds. Tagged with status.",
};

pub const REPORTS_PUBLISHED: MetricDef = MetricDef {
    name: "reports.published",
    metric_type: MetricType::Counter,
    description: "Reports acknowledged by the broker",
};

pub const PUBLISH_FAILED: MetricDef = MetricDef {
    name: "reports.publish_failed",
    metric_type: MetricType::Counter,
    description: "Reports the broker did not acknowledge. Tagged with reason.",
};

pub const REPORTS_REJECTED: MetricDef = MetricDef {
    name: "reports.rejected",
    metric_type: MetricType::Counter,
    description: "Requests refused before publishing. Tagged with reason (validation, format).",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REPORTS_PUBLISHED,
    PUBLISH_FAILED,
    REPORTS_REJECTED,
];
