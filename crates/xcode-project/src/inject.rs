//! Raw build-setting injection
//!
//! Text-level replacement of `KEY = value;` assignments in a pbxproj,
//! for one-off tweaks outside the structured editor. Only existing
//! assignments are rewritten; nothing is ever inserted.

use regex::Regex;
use tracing::debug;

use crate::writer::format_string;
use crate::XcodeError;

/// Replace the value of every `key = ...;` assignment in `raw`.
///
/// Returns the new text and the number of replaced assignments.
pub fn inject_build_setting(raw: &str, key: &str, value: &str) -> Result<(String, usize), XcodeError> {
    let pattern = format!(
        r#"(?m)^(?P<head>[ \t]*"?{}"?[ \t]*=[ \t]*)(?:"(?:[^"\\]|\\.)*"|[^;\n]*);"#,
        regex::escape(key)
    );
    let re = Regex::new(&pattern)?;

    let count = re.find_iter(raw).count();
    let replacement = format!("${{head}}{};", format_string(value).replace('$', "$$"));
    let text = re.replace_all(raw, replacement.as_str()).into_owned();

    debug!("Injected {} = {:?} into {} assignment(s)", key, value, count);
    Ok((text, count))
}
