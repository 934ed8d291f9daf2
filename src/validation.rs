//! Builds one validation-constraint document per entity from its compiled
//! mapping descriptor.

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::error::Error;
use crate::fs_utils;
use crate::utils::{property_name_from_column, short_class_name};
use crate::xml::{Canonicalizer, Element, RuleSet};

const CONSTRAINT_MAPPING_NS: &str = "http://symfony.com/schema/dic/constraint-mapping";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://symfony.com/schema/dic/constraint-mapping http://symfony.com/schema/dic/services/constraint-mapping-1.0.xsd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Field,
    OneToOne,
    ManyToOne,
}

/// Derives validation constraints from mapping descriptors and writes one
/// document per entity into the sibling `validation` directory.
pub struct ValidationBuilder {
    config: ProjectConfig,
    pretty: Canonicalizer,
}

impl ValidationBuilder {
    pub fn new(config: ProjectConfig) -> Self {
        ValidationBuilder {
            config,
            pretty: Canonicalizer::new(),
        }
    }

    /// Build validation documents for every descriptor in `mapping_dir`.
    ///
    /// Files are processed in byte-wise ascending order of their derived
    /// output filename (`*.orm.xml` maps to `*.xml`). A malformed
    /// descriptor aborts only that file; the builder continues with the
    /// rest. Returns the paths written.
    pub fn build(&self, mapping_dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let validation_dir = mapping_dir
            .parent()
            .ok_or_else(|| Error::NoParentDir {
                path: mapping_dir.to_path_buf(),
            })?
            .join("validation");
        fs_utils::create_dir_idempotent(&validation_dir)?;

        let mut files: Vec<(PathBuf, String)> = Vec::new();
        for file in fs_utils::classify_dir(mapping_dir)? {
            let name = match file.path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let out_name = match name.strip_suffix(".orm.xml") {
                Some(stem) => format!("{}.xml", stem),
                None => name,
            };
            files.push((file.path, out_name));
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let mut written = Vec::new();
        for (path, out_name) in files {
            match self.build_document(&path) {
                Ok(document) => {
                    let out_path = validation_dir.join(&out_name);
                    fs_utils::write_file(&out_path, document)?;
                    written.push(out_path);
                }
                Err(e) => {
                    tracing::warn!("validation build skipped {}: {}", path.display(), e);
                }
            }
        }
        Ok(written)
    }

    /// Build the validation document text for a single mapping descriptor.
    pub fn build_document(&self, path: &Path) -> Result<String, Error> {
        let content = fs_utils::read_file(path)?;
        let root = Element::parse_file(&content, path)?;
        let entity = if root.name == "entity" {
            &root
        } else {
            root.find_child("entity").ok_or_else(|| Error::MissingElement {
                element: "entity".to_string(),
                path: path.to_path_buf(),
            })?
        };
        let class_name = entity
            .attr("name")
            .ok_or_else(|| Error::MissingAttribute {
                element: "entity".to_string(),
                attribute: "name".to_string(),
                path: path.to_path_buf(),
            })?
            .to_string();

        let mut class_el = Element::new("class");
        class_el.set_attr("name", &class_name);

        if let Some(constraints) = entity.find_child("unique-constraints") {
            for uc in constraints.children_named("unique-constraint") {
                if let Some(columns) = uc.attr("columns") {
                    class_el.push_child(self.unique_constraint(columns, &class_name));
                }
            }
        }

        for (name, kind, el) in sorted_fields(entity) {
            if self.config.ignored_fields.iter().any(|f| f == &name) {
                continue;
            }
            let property = match kind {
                FieldKind::Field => self.field_property(&name, el),
                FieldKind::OneToOne | FieldKind::ManyToOne => {
                    Some(self.relation_property(&name, el, path)?)
                }
            };
            if let Some(property) = property {
                class_el.push_child(property);
            }
        }

        let mut document = constraint_mapping_root();
        if class_el.child_element_count() > 0 || !self.config.skip_empty_validation_class {
            document.push_child(class_el);
        }
        Ok(self.pretty.canonicalize_element(&document, &RuleSet::new()))
    }

    /// Class-level uniqueness constraint. A constraint over the sole
    /// `guid` column becomes the UUID-uniqueness constraint instead of a
    /// `UniqueEntity` field list.
    fn unique_constraint(&self, columns_attr: &str, class_name: &str) -> Element {
        let columns: Vec<String> = columns_attr
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut constraint_el;
        if columns.len() == 1 && columns[0] == "guid" {
            constraint_el = constraint(&self.config.uuid_unique_constraint_class);
            constraint_el.push_child(option("strict", "false"));
            constraint_el.push_child(option("uuidProperty", "guid"));
        } else {
            constraint_el = constraint(&self.config.unique_entity_constraint_class);
            let mut fields = Element::new("option");
            fields.set_attr("name", "fields");
            for column in &columns {
                fields.push_child(Element::with_text("value", &property_name_from_column(column)));
            }
            constraint_el.push_child(fields);
        }

        let message = format!(
            "{} (with {}) already exists.",
            short_class_name(class_name),
            columns.join(", ")
        );
        constraint_el.push_child(option("message", &message));
        constraint_el
    }

    /// Constraints for a simple field, in fixed order: NotBlank, date
    /// kind, native type, length. Returns `None` when nothing applies.
    fn field_property(&self, name: &str, field: &Element) -> Option<Element> {
        let field_type = field.attr("type").unwrap_or("");
        let nullable = field.attr("nullable").unwrap_or("");

        let mut constraints = Vec::new();

        if nullable == "false" && !matches!(field_type, "boolean" | "bool") {
            constraints.push(constraint("NotBlank"));
        }

        match field_type {
            "dateinterval" => constraints.push(constraint("DateInterval")),
            "datetime" | "datetime_with_millisecond" => constraints.push(constraint("DateTime")),
            "date" => constraints.push(constraint("Date")),
            _ => {}
        }

        let native_type = match field_type {
            "decimal" | "float" => Some("float"),
            "boolean" => Some("bool"),
            "integer" => Some("integer"),
            _ => None,
        };
        if let Some(native_type) = native_type {
            let mut type_el = constraint("Type");
            type_el.push_child(option("type", native_type));
            constraints.push(type_el);
        }

        if let Some(length) = field.attr("length") {
            if length.parse::<u64>().is_ok() && field_type != "dateinterval" {
                let mut length_el = constraint("Length");
                length_el.push_child(option("max", length));
                constraints.push(length_el);
            }
        }

        if constraints.is_empty() {
            return None;
        }
        let mut property = Element::new("property");
        property.set_attr("name", name);
        for c in constraints {
            property.push_child(c);
        }
        Some(property)
    }

    /// Constraints for a to-one relation: NotBlank when the owning join
    /// column is non-nullable, plus a Type constraint on the
    /// fully-qualified target entity (exactly one leading backslash).
    fn relation_property(&self, name: &str, relation: &Element, path: &Path) -> Result<Element, Error> {
        let target = relation
            .attr("target-entity")
            .ok_or_else(|| Error::MissingAttribute {
                element: relation.name.clone(),
                attribute: "target-entity".to_string(),
                path: path.to_path_buf(),
            })?;
        let target_fq = format!("\\{}", target.trim_start_matches('\\'));

        let mut property = Element::new("property");
        property.set_attr("name", name);

        if join_column_nullable(relation) == Some("false") {
            property.push_child(constraint("NotBlank"));
        }

        let mut type_el = constraint("Type");
        type_el.push_child(option("type", &target_fq));
        property.push_child(type_el);
        Ok(property)
    }
}

/// Nullability of the owning join column, wherever it is declared.
fn join_column_nullable(relation: &Element) -> Option<&str> {
    relation
        .find_child("join-columns")
        .and_then(|jc| jc.find_child("join-column"))
        .or_else(|| relation.find_child("join-column"))
        .and_then(|jc| jc.attr("nullable"))
}

/// Collect field and to-one relation descriptors, stable-sorted by name.
/// Categories are gathered in fixed order (field, one-to-one, many-to-one)
/// so ties keep their category and declaration order. Relations are named
/// by their `field` attribute.
fn sorted_fields(entity: &Element) -> Vec<(String, FieldKind, &Element)> {
    let mut fields = Vec::new();
    for (kind, tag) in [
        (FieldKind::Field, "field"),
        (FieldKind::OneToOne, "one-to-one"),
        (FieldKind::ManyToOne, "many-to-one"),
    ] {
        for el in entity.children_named(tag) {
            match el.attr("field").or_else(|| el.attr("name")) {
                Some(name) => fields.push((name.to_string(), kind, el)),
                None => tracing::debug!("unnamed <{}> descriptor ignored", tag),
            }
        }
    }
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
}

fn constraint_mapping_root() -> Element {
    let mut root = Element::new("constraint-mapping");
    root.set_attr("xmlns", CONSTRAINT_MAPPING_NS);
    root.set_attr("xmlns:xsi", XSI_NS);
    root.set_attr("xsi:schemaLocation", SCHEMA_LOCATION);
    root
}

fn constraint(name: &str) -> Element {
    let mut el = Element::new("constraint");
    el.set_attr("name", name);
    el
}

fn option(name: &str, value: &str) -> Element {
    let mut el = Element::with_text("option", value);
    el.set_attr("name", name);
    el
}
