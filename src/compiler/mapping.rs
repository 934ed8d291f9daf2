//! Rewrites applied to raw mapping XML before canonicalization.

use regex::{Captures, Regex};

/// Derive the compiled mapping filename from a raw descriptor filename.
///
/// The raw name encodes the originating namespace up to a `Model.` marker;
/// everything after the marker is kept and the `.xml` extension re-applied:
/// `Acme.ShopBundle.Entity.Model.Invoice.orm.xml` -> `Invoice.orm.xml`.
/// Returns `None` when the name carries no marker.
pub fn derive_mapping_filename(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".xml").unwrap_or(file_name);
    let re = Regex::new(r".*Model\.(.*)").unwrap();
    re.captures(stem).map(|c| format!("{}.xml", &c[1]))
}

/// Apply the body rewrites for a raw mapping descriptor: strip generated
/// model namespace references, normalize nullable shorthand, drop zero
/// precision/scale pairs, quote reserved words, and expand the inline
/// `<options .../>` attribute shorthand.
pub fn rewrite_mapping_body(content: &str, reserved_words: &[String]) -> String {
    let out = content.replace("Model\\", "");
    let out = out.replace("nullable=\"\"", "nullable=\"false\"");
    let out = out.replace("nullable=\"1\"", "nullable=\"true\"");
    let out = out.replace(" precision=\"0\" scale=\"0\"", "");
    let out = quote_reserved_words(&out, reserved_words);
    expand_options_shorthand(&out)
}

/// Backtick-quote reserved SQL words used as `column`/`table` attribute
/// values. Literal substitution, naturally idempotent: a quoted value no
/// longer matches the unquoted pattern.
pub fn quote_reserved_words(content: &str, words: &[String]) -> String {
    let mut out = content.to_string();
    for word in words {
        for attr in ["column", "table"] {
            let from = format!("{}=\"{}\"", attr, word);
            let to = format!("{}=\"`{}`\"", attr, word);
            out = out.replace(&from, &to);
        }
    }
    out
}

/// Expand `<options a="1" b="2"/>` into nested `<option>` children.
///
/// The attribute list goes through a small dedicated parser rather than a
/// capture regex, so values containing spaces or delimiter characters
/// survive intact.
pub fn expand_options_shorthand(content: &str) -> String {
    let re = Regex::new(r"<options\s+([^<>]*?)/>").unwrap();
    re.replace_all(content, |caps: &Captures| {
        let attrs = parse_attribute_list(&caps[1]);
        if attrs.is_empty() {
            return caps[0].to_string();
        }
        let mut out = String::from("<options>");
        for (name, value) in attrs {
            out.push_str("<option name=\"");
            out.push_str(&name);
            out.push_str("\">");
            out.push_str(&value);
            out.push_str("</option>");
        }
        out.push_str("</options>");
        out
    })
    .into_owned()
}

/// Parse an XML attribute list (`a="1" b='x y'`) into name/value pairs.
/// Parsing stops at the first malformed entry.
fn parse_attribute_list(s: &str) -> Vec<(String, String)> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        let name_start = i;
        while i < len && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name = &s[name_start..i];
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len || bytes[i] != b'=' {
            break;
        }
        i += 1;
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len || (bytes[i] != b'"' && bytes[i] != b'\'') {
            break;
        }
        let quote = bytes[i];
        i += 1;
        let value_start = i;
        while i < len && bytes[i] != quote {
            i += 1;
        }
        if i >= len {
            break;
        }
        attrs.push((name.to_string(), s[value_start..i].to_string()));
        i += 1;
    }
    attrs
}
