//! pbxproj writer
//!
//! Emits Xcode's own layout: tab indentation, one `Begin`/`End` section per
//! isa, and single-line entries for build files and file references.

use crate::project::PbxProject;
use crate::types::{PbxNode, PbxValue};

/// Object types Xcode writes on a single line
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Serialize a whole project
pub fn write(project: &PbxProject) -> String {
    let mut out = String::from("// !$*UTF8*$!\n{\n");

    for (key, value) in &project.preamble {
        write_entry(&mut out, key, value, 1);
    }

    out.push_str("\tobjects = {\n");
    for (isa, nodes) in project.sections() {
        match isa {
            Some(isa) => {
                out.push_str(&format!("\n/* Begin {} section */\n", isa));
                for node in &nodes {
                    write_node(&mut out, node, INLINE_ISAS.contains(&isa));
                }
                out.push_str(&format!("/* End {} section */\n", isa));
            }
            None => {
                for node in &nodes {
                    write_node(&mut out, node, false);
                }
            }
        }
    }
    out.push_str("\t};\n");

    for (key, value) in &project.trailer {
        write_entry(&mut out, key, value, 1);
    }

    out.push_str("}\n");
    out
}

/// Quote and escape a string when Xcode would
pub fn format_string(text: &str) -> String {
    let bare = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.'));
    if bare {
        return text.to_string();
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn push_comment(out: &mut String, comment: Option<&str>) {
    if let Some(comment) = comment {
        out.push_str(" /* ");
        out.push_str(comment);
        out.push_str(" */");
    }
}

fn write_node(out: &mut String, node: &PbxNode, inline: bool) {
    indent(out, 2);
    out.push_str(&format_string(&node.id));
    push_comment(out, node.comment.as_deref());
    out.push_str(" = ");

    if inline {
        out.push('{');
        for (key, value) in &node.fields {
            write_inline_entry(out, key, value);
        }
        out.push('}');
    } else {
        out.push_str("{\n");
        for (key, value) in &node.fields {
            write_entry(out, key, value, 3);
        }
        indent(out, 2);
        out.push('}');
    }
    out.push_str(";\n");
}

fn write_entry(out: &mut String, key: &str, value: &PbxValue, depth: usize) {
    indent(out, depth);
    out.push_str(&format_string(key));
    out.push_str(" = ");
    write_value(out, value, depth);
    out.push_str(";\n");
}

fn write_value(out: &mut String, value: &PbxValue, depth: usize) {
    match value {
        PbxValue::String(s) => {
            out.push_str(&format_string(&s.text));
            push_comment(out, s.comment.as_deref());
        }
        PbxValue::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(')');
        }
        PbxValue::Dict(dict) => {
            out.push_str("{\n");
            for (key, value) in dict {
                write_entry(out, key, value, depth + 1);
            }
            indent(out, depth);
            out.push('}');
        }
    }
}

fn write_inline_entry(out: &mut String, key: &str, value: &PbxValue) {
    out.push_str(&format_string(key));
    out.push_str(" = ");
    write_inline_value(out, value);
    out.push_str("; ");
}

fn write_inline_value(out: &mut String, value: &PbxValue) {
    match value {
        PbxValue::String(s) => {
            out.push_str(&format_string(&s.text));
            push_comment(out, s.comment.as_deref());
        }
        PbxValue::Array(items) => {
            out.push('(');
            for item in items {
                write_inline_value(out, item);
                out.push_str(", ");
            }
            out.push(')');
        }
        PbxValue::Dict(dict) => {
            out.push('{');
            for (key, value) in dict {
                write_inline_entry(out, key, value);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_string() {
        assert_eq!(format_string("App"), "App");
        assert_eq!(format_string("$(SRCROOT)/App"), "\"$(SRCROOT)/App\"");
        assert_eq!(format_string("iphoneos"), "iphoneos");
        assert_eq!(format_string(""), "\"\"");
        assert_eq!(format_string("CODE_SIGN_IDENTITY[sdk=iphoneos*]"), "\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\"");
        assert_eq!(format_string("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(format_string("iPhone Distribution"), "\"iPhone Distribution\"");
    }
}
