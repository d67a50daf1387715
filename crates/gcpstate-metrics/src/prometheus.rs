//! Prometheus text exposition format.
//!
//! Renders observations into the text format (version 0.0.4) for scraping
//! by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::observation::{DESCRIPTORS, Observation};

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render observations grouped by family, in `DESCRIPTORS` order.
///
/// Every family gets its HELP and TYPE lines even when it has no samples.
pub fn render_prometheus(observations: &[Observation]) -> String {
    let mut out = String::new();

    for desc in DESCRIPTORS {
        let name = desc.fq_name();
        let _ = writeln!(out, "# HELP {name} {}", desc.help);
        let _ = writeln!(out, "# TYPE {name} gauge");

        for obs in observations.iter().filter(|o| o.metric == desc) {
            let labels = desc
                .labels
                .iter()
                .zip(&obs.labels)
                .map(|(key, value)| format!("{key}=\"{}\"", escape_label_value(value)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{name}{{{labels}}} {}", obs.value);
        }
    }

    out
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
