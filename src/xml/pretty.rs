//! XML canonicalization: deterministic reformatting plus ordered touch-ups.

use std::path::Path;

use crate::error::Error;
use crate::xml::rules::{base_rules, RuleSet};
use crate::xml::tree::Element;

/// Reformats XML deterministically and applies substitution rules.
///
/// Canonicalization parses the input (failing on malformed XML), serializes
/// it with stable whitespace and alphabetically sorted attributes, then
/// applies the base rule set followed by any caller-supplied rules, and
/// finally collapses `" />"` to `"/>"`. The parse/serialize step normalizes
/// every piece of whitespace a previous run introduced, so canonicalizing
/// already-canonical output is a no-op.
pub struct Canonicalizer {
    base: RuleSet,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Canonicalizer { base: base_rules() }
    }

    /// Build a canonicalizer around a caller-supplied base rule set.
    pub fn with_base(base: RuleSet) -> Self {
        Canonicalizer { base }
    }

    /// Canonicalize an XML string.
    pub fn canonicalize(&self, xml: &str, extra: &RuleSet) -> Result<String, Error> {
        let root = Element::parse(xml)?;
        Ok(self.canonicalize_element(&root, extra))
    }

    /// Canonicalize a file's XML content, attaching the path to parse errors.
    pub fn canonicalize_file(&self, xml: &str, path: &Path, extra: &RuleSet) -> Result<String, Error> {
        self.canonicalize(xml, extra).map_err(|e| e.at_path(path))
    }

    /// Canonicalize an already-parsed element tree.
    pub fn canonicalize_element(&self, root: &Element, extra: &RuleSet) -> String {
        let mut out = root.to_xml();
        out = self.base.apply_all(&out);
        out = extra.apply_all(&out);
        out.replace(" />", "/>")
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Canonicalizer::new()
    }
}
