//! XML parsing, deterministic serialization, and canonicalization.

pub mod pretty;
pub mod rules;
pub mod tree;

pub use pretty::Canonicalizer;
pub use rules::{base_rules, Rule, RuleSet};
pub use tree::{Element, XmlNode};
