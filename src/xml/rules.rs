//! Ordered substitution rules applied after XML serialization.
//!
//! The canonical output format is produced in two steps: a deterministic
//! serialization, then an ordered list of textual touch-up rules. Rules are
//! explicit values handed to the canonicalizer so tests can substitute
//! their own sets.

use regex::{Captures, Regex};

/// Replacement action of a rule: a literal template (with `$n` group
/// references) or a callback receiving the whole match.
pub enum RuleAction {
    Text(String),
    Call(Box<dyn Fn(&Captures) -> String + Send + Sync>),
}

/// One substitution rule.
pub struct Rule {
    pattern: Regex,
    action: RuleAction,
}

impl Rule {
    /// Literal replacement rule. The pattern is a compile-time constant.
    pub fn text(pattern: &str, replacement: &str) -> Self {
        Rule {
            pattern: Regex::new(pattern).unwrap(),
            action: RuleAction::Text(replacement.to_string()),
        }
    }

    /// Callback replacement rule.
    pub fn call<F>(pattern: &str, f: F) -> Self
    where
        F: Fn(&Captures) -> String + Send + Sync + 'static,
    {
        Rule {
            pattern: Regex::new(pattern).unwrap(),
            action: RuleAction::Call(Box::new(f)),
        }
    }

    pub fn apply(&self, input: &str) -> String {
        match &self.action {
            RuleAction::Text(replacement) => self
                .pattern
                .replace_all(input, replacement.as_str())
                .into_owned(),
            RuleAction::Call(f) => self
                .pattern
                .replace_all(input, |caps: &Captures| f(caps))
                .into_owned(),
        }
    }
}

/// An ordered list of rules, applied first to last.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply_all(&self, input: &str) -> String {
        let mut out = input.to_string();
        for rule in &self.rules {
            out = rule.apply(&out);
        }
        out
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }
}

/// The fixed base rule set shared by every stage that emits XML.
///
/// Order matters and is part of the output contract:
/// 1. a blank line before every structural element, and around the closing
///    `entity`/`class` tags;
/// 2. a blank line between adjacent sibling constraint blocks;
/// 3. namespace-declaration attributes each on their own line;
/// 4. the `name`/`repository-class`/`table` attribute triple of an entity
///    open tag split onto continuation lines (last, since it removes the
///    trailing space the structural patterns key on).
pub fn base_rules() -> RuleSet {
    RuleSet::from(vec![
        Rule::text(r"(\s+<entity )", "\n$1"),
        Rule::text(r"(\s+</entity>)", "\n$1\n"),
        Rule::text(r"(\s+<field )", "\n$1"),
        Rule::text(r"(\s+<one-to-one )", "\n$1"),
        Rule::text(r"(\s+<many-to-one )", "\n$1"),
        Rule::text(r"(\s+<one-to-many )", "\n$1"),
        Rule::text(r"(\s+<many-to-many )", "\n$1"),
        Rule::text(r"(\s+<id )", "\n$1"),
        Rule::text(r"(\s+<indexes)", "\n$1"),
        Rule::text(r"(\s+<unique-constraints)", "\n$1"),
        Rule::text(r"(\s+<lifecycle-callbacks)", "\n$1"),
        Rule::text(r"(\s+<class )", "\n$1"),
        Rule::text(r"(\s+</class>)", "\n$1\n"),
        Rule::text(r"(\s+<property )", "\n$1"),
        Rule::text(r"(/>|</constraint>)(\n\s*)(<constraint )", "$1\n$2$3"),
        Rule::text(
            r"( xmlns=| xmlns:xsi=| xmlns:gedmo=| xsi:schemaLocation=)",
            "\n       $1",
        ),
        // the captures carry their leading space, landing name/repository-
        // class/table at an 11-column continuation indent
        Rule::text(
            r#"( name=".*?")( repository-class=".*?")( table=".*?")"#,
            "\n          $1\n          $2\n          $3",
        ),
    ])
}
