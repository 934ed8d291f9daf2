//! Post-compile patch pass over the final output tree.
//!
//! Grafts cross-cutting framework behavior into the compiled artifacts:
//! audit-versioning markers in mapping XML, array serialization in entity
//! classes, type-wrapper aliasing and interface wiring in abstract model
//! classes, reserved-word quoting, and constraint-class substitution in
//! validation documents.
//!
//! The pass runs separately from the compiler, potentially much later and
//! repeatedly; every rule is guarded so re-running over an already patched
//! (or partially patched) tree changes nothing.

use std::path::Path;

use regex::{Captures, Regex};

use crate::compiler::classfile;
use crate::compiler::mapping::quote_reserved_words;
use crate::config::ProjectConfig;
use crate::error::Error;
use crate::fs_utils::{self, FileKind};
use crate::xml::{Canonicalizer, Element, Rule, RuleSet};

const GEDMO_NS: &str = "http://gediminasm.org/schemas/orm/doctrine-extensions-mapping";

const TO_ARRAY_METHOD: &str = "\n    /**\n     * get data as array\n     *\n     * @return array\n     */\n    public function toArray()\n    {\n        $res = parent::toArray();\n\n        return [$this->getShortClassName()=>$res];\n    }";

/// Idempotent patcher over a compiled bundle directory.
pub struct EntityPatcher {
    config: ProjectConfig,
    pretty: Canonicalizer,
}

impl EntityPatcher {
    pub fn new(config: ProjectConfig) -> Self {
        EntityPatcher {
            config,
            pretty: Canonicalizer::new(),
        }
    }

    /// Run every patch pass over `base_dir`. The passes are independent:
    /// a failure in one directory is reported and the remaining passes
    /// still run.
    pub fn patch(&self, base_dir: &Path) {
        let mapping_dir = base_dir.join("Resources").join("config").join("doctrine");
        if let Err(e) = self.patch_mapping_dir(&mapping_dir) {
            tracing::error!("mapping patch failed: {}", e);
        }

        let repository_dir = base_dir.join("Entity").join("Repository");
        if let Err(e) = self.patch_repository_dir(&repository_dir) {
            tracing::error!("repository patch failed: {}", e);
        }

        let entity_dir = base_dir.join("Entity");
        if let Err(e) = self.patch_entity_dir(&entity_dir) {
            tracing::error!("entity patch failed: {}", e);
        }

        let model_dir = base_dir.join("Entity").join("Model");
        if let Err(e) = self.patch_model_dir(&model_dir) {
            tracing::error!("model patch failed: {}", e);
        }

        let validation_dir = base_dir.join("Resources").join("config").join("validation");
        if let Err(e) = self.patch_validation_dir(&validation_dir) {
            tracing::error!("validation patch failed: {}", e);
        }
    }

    /// `Resources/config/doctrine`: reserved-word quoting plus audit
    /// markers for configured classes.
    fn patch_mapping_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.is_dir() {
            tracing::debug!("no mapping directory at {}", dir.display());
            return Ok(());
        }
        for file in fs_utils::classify_dir(dir)? {
            let name = match file.path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let class_name = match name.strip_suffix(".orm.xml") {
                Some(class_name) => class_name,
                None => continue,
            };

            let content = fs_utils::read_file(&file.path)?;
            let quoted = quote_reserved_words(&content, &self.config.reserved_words);
            let patched = self.add_versioning(&quoted, class_name, &file.path)?;
            if patched != content {
                fs_utils::write_file(&file.path, patched)?;
            }
        }
        Ok(())
    }

    /// Inject the audit-logging namespace, the loggable marker, and
    /// per-member versioned markers for a configured class.
    pub fn add_versioning(&self, xml: &str, class_name: &str, path: &Path) -> Result<String, Error> {
        let mut root = Element::parse_file(xml, path)?;

        if let Some(versioned) = self.config.versioned_elements.get(class_name) {
            root.set_attr("xmlns:gedmo", GEDMO_NS);

            let entity = root.find_child_mut("entity").ok_or_else(|| Error::MissingElement {
                element: "entity".to_string(),
                path: path.to_path_buf(),
            })?;

            if entity.find_child("gedmo:loggable").is_none() {
                let mut loggable = Element::new("gedmo:loggable");
                loggable.set_attr("log-entry-class", &self.config.log_entry_class);
                entity.insert_child(0, loggable);
            }

            entity.for_each_element_mut(&mut |el| {
                if !matches!(el.name.as_str(), "field" | "many-to-one" | "one-to-one") {
                    return;
                }
                // The inverse side of a relation carries mapped-by and is
                // never versioned.
                if el.attr("mapped-by").is_some() {
                    return;
                }
                let name = el.attr("name").map(str::to_string);
                let field = el.attr("field").map(str::to_string);
                let candidates: Vec<&str> = [name.as_deref(), field.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if candidates.is_empty() || !versioned.matches(&candidates) {
                    return;
                }
                if el.find_child("gedmo:versioned").is_none() {
                    el.push_child(Element::new("gedmo:versioned"));
                }
            });
        }

        let extra = RuleSet::from(vec![Rule::text(r"(\s+<gedmo:loggable)", "\n$1")]);
        Ok(self.pretty.canonicalize_element(&root, &extra))
    }

    /// `Entity/Repository`: literal substitution hook, empty by default.
    fn patch_repository_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.is_dir() || self.config.repository_substitutions.is_empty() {
            return Ok(());
        }
        for file in fs_utils::classify_dir(dir)? {
            if file.kind != FileKind::Php {
                continue;
            }
            let content = fs_utils::read_file(&file.path)?;
            let mut patched = content.clone();
            for (from, to) in &self.config.repository_substitutions {
                patched = patched.replace(from.as_str(), to.as_str());
            }
            if patched != content {
                fs_utils::write_file(&file.path, patched)?;
            }
        }
        Ok(())
    }

    /// `Entity`: inject the `toArray` override into editable subclasses.
    fn patch_entity_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.is_dir() {
            return Ok(());
        }
        for file in fs_utils::classify_dir(dir)? {
            if file.kind != FileKind::Php {
                continue;
            }
            let content = fs_utils::read_file(&file.path)?;
            let patched = inject_to_array(&content);
            if patched != content {
                fs_utils::write_file(&file.path, patched)?;
            }
        }
        Ok(())
    }

    /// `Entity/Model`: type aliasing, formatter rewrites, trait and
    /// interface wiring on the abstract base classes.
    fn patch_model_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.is_dir() {
            return Ok(());
        }
        for file in fs_utils::classify_dir(dir)? {
            if file.kind != FileKind::Php {
                continue;
            }
            let content = fs_utils::read_file(&file.path)?;
            let patched = self.patch_model_class(&content);
            if patched != content {
                fs_utils::write_file(&file.path, patched)?;
            }
        }
        Ok(())
    }

    /// All textual rewrites for one abstract model class.
    pub fn patch_model_class(&self, content: &str) -> String {
        let re_interval = Regex::new(r"([\s(,:=?])\\DateInterval\b").unwrap();
        let mut out = re_interval
            .replace_all(content, |caps: &Captures| {
                format!("{}Type\\DateInterval", &caps[1])
            })
            .into_owned();

        out = rewrite_format_calls(&out);
        out = classfile::collapse_blank_comment_lines(&out);

        if !out.contains("use Type\\ModelTrait;") {
            let re_class = Regex::new(r"(abstract class .*?)(\n\{)").unwrap();
            out = re_class
                .replacen(&out, 1, |caps: &Captures| {
                    format!("{}{}\n    use Type\\ModelTrait;\n", &caps[1], &caps[2])
                })
                .into_owned();
        }

        out = self.recompute_implements(&out);
        out = self.collapse_type_namespace(&out);
        out = collapse_use_blank_lines(&out);
        out
    }

    /// Recompute the implements clause: configured base interface, any
    /// interfaces already declared, and the array-serialization interface
    /// when a `toArray` method is present. Entries are de-duplicated in
    /// first-seen order so reapplication is stable.
    fn recompute_implements(&self, content: &str) -> String {
        let mut interfaces: Vec<String> = vec![self.config.entity_interface.clone()];

        let re_existing = Regex::new(r"abstract class [^\\\n]*?\s+implements\s+([^\n{]*)").unwrap();
        if let Some(caps) = re_existing.captures(content) {
            for raw in caps[1].split(',') {
                let item = raw.trim();
                if item.is_empty() {
                    continue;
                }
                // Expand the Type alias back to its namespace so an entry
                // survives the collapse step without duplicating.
                let fq = match item.strip_prefix("Type\\") {
                    Some(rest) => format!("\\{}\\{}", self.config.type_namespace, rest),
                    None => item.to_string(),
                };
                if !interfaces.contains(&fq) {
                    interfaces.push(fq);
                }
            }
        }

        if content.contains("toArray") && !interfaces.contains(&self.config.arrayable_interface) {
            interfaces.push(self.config.arrayable_interface.clone());
        }

        let re_strip = Regex::new(r"(abstract class \S+)\s+implements\s+[^\n{]*(\n\{)").unwrap();
        let stripped = re_strip.replacen(content, 1, "${1}${2}").into_owned();

        let implements = interfaces.join(", ");
        let re_add = Regex::new(r"(abstract class .*?)(\n\{)").unwrap();
        re_add
            .replacen(&stripped, 1, |caps: &Captures| {
                format!("{} implements {}{}", &caps[1], implements, &caps[2])
            })
            .into_owned()
    }

    /// Collapse the fully-qualified type-wrapper namespace to its `Type`
    /// alias and make sure the aliasing import exists.
    fn collapse_type_namespace(&self, content: &str) -> String {
        if !content.contains("Type\\") {
            return content.to_string();
        }
        let fq = format!("\\{}", self.config.type_namespace);
        let mut out = content.replace(&fq, "Type");

        let use_line = format!("use {};", self.config.type_namespace);
        if !out.contains(&use_line) {
            let re_ns = Regex::new(r"namespace (.*?);").unwrap();
            out = re_ns
                .replacen(&out, 1, |caps: &Captures| {
                    format!("namespace {};\n\n{}", &caps[1], use_line)
                })
                .into_owned();
        }
        out
    }

    /// `Resources/config/validation`: swap the bare DateInterval
    /// constraint for the fully-qualified custom constraint class.
    fn patch_validation_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.is_dir() {
            return Ok(());
        }
        let replacement = format!("\"{}\"", self.config.dateinterval_constraint_class);
        for file in fs_utils::classify_dir(dir)? {
            if file.kind != FileKind::Xml {
                continue;
            }
            let content = fs_utils::read_file(&file.path)?;
            let patched = content.replace("\"DateInterval\"", &replacement);
            if patched != content {
                fs_utils::write_file(&file.path, patched)?;
            }
        }
        Ok(())
    }
}

/// Inject the `toArray` override after the class opening brace. Files that
/// already define one are left untouched.
fn inject_to_array(content: &str) -> String {
    if content.contains("function toArray(") {
        return content.to_string();
    }
    let re = Regex::new(r"(class .*? extends .*?)(\n\{)").unwrap();
    re.replacen(content, 1, |caps: &Captures| {
        format!("{}{}{}", &caps[1], &caps[2], TO_ARRAY_METHOD)
    })
    .into_owned()
}

/// Rewrite inline date/time/interval format expressions to the shared
/// formatter helpers. The quoted format literal disappears with each
/// rewrite, so none of these can apply twice.
fn rewrite_format_calls(content: &str) -> String {
    let re_date = Regex::new(r"\?\s+(\$this->.*?)->format\('Y-m-d'\)\s+:").unwrap();
    let out = re_date
        .replace_all(content, |caps: &Captures| {
            format!("? {}->format(Type\\Date::DEFAULT_FORMAT) :", &caps[1])
        })
        .into_owned();

    let re_datetime = Regex::new(r"\?\s+(\$this->.*?)->format\('Y-m-d H:i:s'\)\s+:").unwrap();
    let out = re_datetime
        .replace_all(&out, |caps: &Captures| {
            format!("? {}->format(Type\\DateTime::DEFAULT_FORMAT) :", &caps[1])
        })
        .into_owned();

    let re_millisecond = Regex::new(r"\?\s+(\$this->.*?)->format\('Y-m-d H:i:s\.u'\)\s+:").unwrap();
    let out = re_millisecond
        .replace_all(&out, |caps: &Captures| {
            format!("? Type\\DateTime::formatWithMillisecond({}) :", &caps[1])
        })
        .into_owned();

    let re_interval = Regex::new(r"\?\s+(\$this->.*?)->format\('P%yY%mM%dDT%hH%iI%sS'\)\s+:").unwrap();
    re_interval
        .replace_all(&out, |caps: &Captures| {
            format!("? {}->format(null) :", &caps[1])
        })
        .into_owned()
}

/// Collapse blank lines between consecutive `use` statements.
fn collapse_use_blank_lines(content: &str) -> String {
    let re = Regex::new(r"(use [^\n]*;)\n\n+(use )").unwrap();
    let mut out = content.to_string();
    loop {
        let next = re.replace_all(&out, "${1}\n${2}").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}
