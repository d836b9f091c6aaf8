//! Prometheus text exposition.
//!
//! Renders collector observations in the text format (version 0.0.4). Each
//! metric that has at least one observation gets a `# HELP` and `# TYPE`
//! header followed by all of its samples; metrics appear in the order the
//! collector describes them.

use netatmo_core::{MetricDesc, Observation};

/// Content type of the text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render `observations` grouped under the metrics in `descs`.
///
/// Observations whose metric is not in `descs` are skipped.
pub fn render(descs: &[&'static MetricDesc], observations: &[Observation]) -> String {
    let mut output = String::with_capacity(256 + observations.len() * 96);

    for desc in descs {
        let mut samples = observations
            .iter()
            .filter(|o| o.desc.name == desc.name)
            .peekable();
        if samples.peek().is_none() {
            continue;
        }

        output.push_str(&format!("# HELP {} {}\n", desc.name, escape_help(desc.help)));
        output.push_str(&format!("# TYPE {} {}\n", desc.name, desc.kind.as_str()));
        for sample in samples {
            output.push_str(desc.name);
            push_labels(&mut output, desc.labels, &sample.labels);
            output.push(' ');
            output.push_str(&format_value(sample.value));
            output.push('\n');
        }
    }

    output
}

fn push_labels(output: &mut String, names: &[&str], values: &[String]) {
    if names.is_empty() {
        return;
    }
    output.push('{');
    for (i, (name, value)) in names.iter().zip(values).enumerate() {
        if i > 0 {
            output.push(',');
        }
        output.push_str(&format!("{}=\"{}\"", name, escape_label_value(value)));
    }
    output.push('}');
}

/// Escape a label value for the text format.
pub fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
