use agrimon_common::types::{value_text, Hit};

/// Fallback shown when a hit carries no producer name.
pub const FALLBACK_PRODUCER: &str = "Producteur";
/// Fallback shown when a hit carries no crop name.
pub const FALLBACK_CROP: &str = "Culture";
/// Fallback shown when a hit carries no plot name.
pub const FALLBACK_PLOT: &str = "Parcelle";

/// Context fields that always substitute, falling back to a generic label
/// when the hit does not carry them.
const CONTEXT_FALLBACKS: &[(&str, &str)] = &[
    ("producer_name", FALLBACK_PRODUCER),
    ("crop_name", FALLBACK_CROP),
    ("plot_name", FALLBACK_PLOT),
];

/// Render a rule's message template against one hit.
///
/// Substitution is literal string replacement of `{field}` placeholders
/// with the hit's column values. There is no expression language and no
/// user-controlled format string: a placeholder either matches a column
/// name or passes through untouched, which gives rule authors visible
/// feedback on typos instead of a silent failure.
pub fn render(template: &str, hit: &Hit) -> String {
    let mut message = template.to_string();

    for (name, value) in &hit.fields {
        if let Some(text) = value_text(value) {
            message = message.replace(&format!("{{{name}}}"), &text);
        }
    }

    // Optional context fields substitute a generic label when absent (or
    // present but null), so a sparse hit still renders a usable message.
    for (name, fallback) in CONTEXT_FALLBACKS {
        let placeholder = format!("{{{name}}}");
        if message.contains(&placeholder) {
            message = message.replace(&placeholder, fallback);
        }
    }

    message
}
