//! Pipeline configuration.
//!
//! Every knob the compiler, validation builder, and patcher consult lives
//! here, loaded from a YAML file with defaults matching the conventions the
//! generated tree is built around. An empty config file is valid.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::Error;

/// Which mapped members of a class receive audit-versioning markers.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedElements {
    /// Every non-inverse field and to-one relation.
    All,
    /// Only the named fields/columns.
    Fields(Vec<String>),
}

impl VersionedElements {
    pub fn matches(&self, candidates: &[&str]) -> bool {
        match self {
            VersionedElements::All => true,
            VersionedElements::Fields(fields) => {
                candidates.iter().any(|c| fields.iter().any(|f| f == c))
            }
        }
    }
}

impl<'de> Deserialize<'de> for VersionedElements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = VersionedElements;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"*\" or a list of field names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == "*" {
                    Ok(VersionedElements::All)
                } else {
                    Err(E::custom(format!(
                        "expected \"*\" or a list of field names, got \"{}\"",
                        v
                    )))
                }
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::new();
                while let Some(field) = seq.next_element::<String>()? {
                    fields.push(field);
                }
                Ok(VersionedElements::Fields(fields))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Vendor namespace the base repository class lives under.
    pub base_namespace: String,
    /// Bundle namespace as emitted by the generator.
    pub bundle_namespace: Option<String>,
    /// Target bundle namespace; when set, the final compile pass rewrites
    /// `bundle_namespace` to this value across the output tree.
    pub bundle_namespace_to: Option<String>,
    /// Fully-qualified base class for generated repository stubs. Defaults
    /// to `<base_namespace>\CoreBundle\Doctrine\ORM\EntityRepository`.
    pub base_repository_class: Option<String>,
    /// SQL reserved words backtick-quoted in `column`/`table` attributes.
    pub reserved_words: Vec<String>,
    /// Audit/versioning fields skipped by the validation builder.
    pub ignored_fields: Vec<String>,
    /// Classes whose mapping XML receives audit-logging markers.
    pub versioned_elements: IndexMap<String, VersionedElements>,
    /// Recreate the editable work subclass even when it already exists.
    /// The subclass holds hand-written code, so this defaults to off.
    pub overwrite_existing_subclass: bool,
    /// Omit the `<class>` node for entities without any constrainable
    /// member. When false, an empty class element is emitted instead.
    pub skip_empty_validation_class: bool,
    /// Constraint class for multi-column uniqueness.
    pub unique_entity_constraint_class: String,
    /// Constraint class for the sole-`guid` uniqueness special case.
    pub uuid_unique_constraint_class: String,
    /// Fully-qualified replacement for the bare `DateInterval` constraint.
    pub dateinterval_constraint_class: String,
    /// Interface every abstract model class implements.
    pub entity_interface: String,
    /// Interface added when the class carries a `toArray` method.
    pub arrayable_interface: String,
    /// Namespace collapsed to the `Type` alias in abstract model classes.
    pub type_namespace: String,
    /// Log entry class wired into the audit-logging marker.
    pub log_entry_class: String,
    /// Literal substitutions applied to repository classes by the patcher.
    pub repository_substitutions: IndexMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            base_namespace: "VN".to_string(),
            bundle_namespace: None,
            bundle_namespace_to: None,
            base_repository_class: None,
            reserved_words: vec![
                "order".to_string(),
                "from".to_string(),
                "to".to_string(),
                "user".to_string(),
            ],
            ignored_fields: vec![
                "realmCode".to_string(),
                "guid".to_string(),
                "version".to_string(),
                "createdAt".to_string(),
                "createdByUser".to_string(),
                "createdByPartyCode".to_string(),
                "changedAt".to_string(),
                "changedByUser".to_string(),
                "changedByPartyCode".to_string(),
            ],
            versioned_elements: IndexMap::new(),
            overwrite_existing_subclass: false,
            skip_empty_validation_class: true,
            unique_entity_constraint_class:
                "Symfony\\Bridge\\Doctrine\\Validator\\Constraints\\UniqueEntity".to_string(),
            uuid_unique_constraint_class:
                "Common\\DoctrineBundle\\Validator\\Constraints\\UuidUnique".to_string(),
            dateinterval_constraint_class:
                "\\Common\\CoreBundle\\Validator\\Constraints\\DateInterval".to_string(),
            entity_interface: "\\Common\\CoreBundle\\Type\\EntityInterface".to_string(),
            arrayable_interface: "\\Common\\CoreBundle\\Type\\ArraybleInterface".to_string(),
            type_namespace: "Common\\CoreBundle\\Type".to_string(),
            log_entry_class: "App\\CoreBundle\\Document\\BusEvent".to_string(),
            repository_substitutions: IndexMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = crate::fs_utils::read_file(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Base class for generated repository stubs.
    pub fn repository_base_class(&self) -> String {
        match &self.base_repository_class {
            Some(class) => class.clone(),
            None => format!(
                "{}\\CoreBundle\\Doctrine\\ORM\\EntityRepository",
                self.base_namespace
            ),
        }
    }
}
