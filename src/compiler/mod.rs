//! Model compiler: the two-phase rewrite that turns freshly generated
//! model classes into the final persisted class hierarchy and mapping
//! metadata.
//!
//! Phase A (`pre_compile`) relocates generated classes into their
//! namespace-derived directory and splits each into an abstract-base
//! candidate, an editable work subclass, and a repository stub. Phase B
//! (`post_compile`) finalizes the base classes, compiles the raw mapping
//! XML, applies the configured namespace rename, and triggers the
//! validation builder.
//!
//! Both phases assume exclusive access to the working tree for the
//! duration of a run; concurrent invocations against the same output
//! directory are not supported.

pub mod classfile;
pub mod mapping;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::error::Error;
use crate::fs_utils::{self, FileKind};
use crate::validation::ValidationBuilder;
use crate::xml::{Canonicalizer, RuleSet};

/// Outcome of the pre-compile phase.
#[derive(Debug, Default)]
pub struct PreCompileReport {
    /// Every distinct namespace-derived model directory that was visited.
    pub model_dirs: Vec<PathBuf>,
}

/// Orchestrates the compile phases over the file system.
pub struct ModelCompiler {
    config: ProjectConfig,
    pretty: Canonicalizer,
}

impl ModelCompiler {
    pub fn new(config: ProjectConfig) -> Self {
        ModelCompiler {
            config,
            pretty: Canonicalizer::new(),
        }
    }

    /// Phase A: classify the scratch directory, discard `.bak` leftovers,
    /// relocate each generated class under its namespace-derived path, and
    /// split it into work subclass + repository stub.
    ///
    /// Per-file failures are logged and skipped; the phase is idempotent.
    pub fn pre_compile(
        &self,
        scratch_dir: &Path,
        output_root: &Path,
    ) -> Result<PreCompileReport, Error> {
        let files = fs_utils::classify_dir(scratch_dir)?;
        let mut model_dirs = BTreeSet::new();

        for file in files {
            match file.kind {
                FileKind::Bak => {
                    fs_utils::remove_file(&file.path)?;
                }
                FileKind::Php => {
                    if let Err(e) = self.locate_and_split(&file.path, output_root, &mut model_dirs)
                    {
                        tracing::warn!("pre-compile skipped {}: {}", file.path.display(), e);
                    }
                }
                _ => {}
            }
        }

        Ok(PreCompileReport {
            model_dirs: model_dirs.into_iter().collect(),
        })
    }

    fn locate_and_split(
        &self,
        path: &Path,
        output_root: &Path,
        model_dirs: &mut BTreeSet<PathBuf>,
    ) -> Result<(), Error> {
        let content = fs_utils::read_file(path)?;
        let namespace =
            classfile::extract_namespace(&content).ok_or_else(|| Error::MissingNamespace {
                path: path.to_path_buf(),
            })?;

        let target_dir = output_root.join(namespace_to_path(&namespace));
        let file_name = path.file_name().ok_or_else(|| Error::NoParentDir {
            path: path.to_path_buf(),
        })?;
        let target_file = target_dir.join(file_name);

        if path.parent() != Some(target_dir.as_path()) {
            fs_utils::create_dir_idempotent(&target_dir)?;
            fs::rename(path, &target_file).map_err(|e| Error::Rename {
                from: path.to_path_buf(),
                to: target_file.clone(),
                source: e,
            })?;
        }
        model_dirs.insert(target_dir.clone());

        self.split_model_class(&target_file, &content, &namespace)
    }

    /// Split a located model class into its three artifacts.
    fn split_model_class(
        &self,
        model_file: &Path,
        content: &str,
        namespace: &str,
    ) -> Result<(), Error> {
        let normalized = classfile::normalize_trailing_whitespace(content);
        if normalized != content {
            fs_utils::write_file(model_file, &normalized)?;
        }

        let model_dir = model_file.parent().ok_or_else(|| Error::NoParentDir {
            path: model_file.to_path_buf(),
        })?;
        let entity_dir = model_dir.parent().ok_or_else(|| Error::NoParentDir {
            path: model_dir.to_path_buf(),
        })?;
        let file_name = model_file.file_name().ok_or_else(|| Error::NoParentDir {
            path: model_file.to_path_buf(),
        })?;

        // Editable subclass: only synthesized when absent, since it holds
        // hand-written code once a project is underway.
        let work_file = entity_dir.join(file_name);
        if !work_file.exists() || self.config.overwrite_existing_subclass {
            fs_utils::write_file(&work_file, classfile::make_work_subclass(&normalized))?;
        } else {
            tracing::debug!("work subclass already present: {}", work_file.display());
        }

        // Repository stub: regenerated every run.
        let class_name = model_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let work_namespace = namespace.strip_suffix("\\Model").unwrap_or(namespace);
        let stub = classfile::make_repository_stub(
            class_name,
            work_namespace,
            &self.config.repository_base_class(),
        );
        let repo_file = entity_dir
            .join("Repository")
            .join(format!("{}Repository.php", class_name));
        fs_utils::write_file(&repo_file, stub)
    }

    /// Phase B: finalize the abstract base classes under `model_dir`,
    /// compile the raw mapping XML of the owning bundle, then run the
    /// final namespace rename and the validation builder.
    pub fn post_compile(&self, model_dir: &Path) -> Result<(), Error> {
        let files = fs_utils::classify_dir(model_dir)?;
        for file in files {
            match file.kind {
                FileKind::Php => {
                    if let Err(e) = self.finalize_model_class(&file.path) {
                        tracing::warn!("post-compile skipped {}: {}", file.path.display(), e);
                    }
                }
                FileKind::Bak => {
                    fs_utils::remove_file(&file.path)?;
                }
                _ => {}
            }
        }

        let bundle_root = bundle_root_of(model_dir)?;
        let raw_dir = bundle_root
            .join("Resources")
            .join("config")
            .join("doctrine-xml");
        if raw_dir.is_dir() {
            let mapping_dir = bundle_root.join("Resources").join("config").join("doctrine");
            fs_utils::create_dir_idempotent(&mapping_dir)?;
            for file in fs_utils::classify_dir(&raw_dir)? {
                if let Err(e) = self.compile_mapping_file(&file.path, &mapping_dir) {
                    tracing::warn!("mapping compile skipped {}: {}", file.path.display(), e);
                }
            }
        }

        self.final_compile(model_dir)
    }

    fn finalize_model_class(&self, path: &Path) -> Result<(), Error> {
        let content = fs_utils::read_file(path)?;
        let out = classfile::make_abstract(&content);
        let out = out.replace("Model\\", "");
        let out = classfile::normalize_datetime_docs(&out);
        let out = classfile::strip_orm_annotations(&out);
        let out = classfile::collapse_blank_comment_lines(&out);
        let out = classfile::normalize_trailing_whitespace(&out);
        if out != content {
            fs_utils::write_file(path, out)?;
        }
        Ok(())
    }

    fn compile_mapping_file(&self, path: &Path, mapping_dir: &Path) -> Result<(), Error> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let out_name = match mapping::derive_mapping_filename(file_name) {
            Some(name) => name,
            None => {
                tracing::debug!("no model marker in {}, ignored", path.display());
                return Ok(());
            }
        };

        let content = fs_utils::read_file(path)?;
        let body = mapping::rewrite_mapping_body(&content, &self.config.reserved_words);
        let pretty = self
            .pretty
            .canonicalize_file(&body, path, &RuleSet::new())?;
        fs_utils::write_file(&mapping_dir.join(out_name), pretty)
    }

    /// Apply the configured bundle namespace rename across the compiled
    /// tree, then build the validation documents.
    fn final_compile(&self, model_dir: &Path) -> Result<(), Error> {
        let entity_dir = model_dir.parent().ok_or_else(|| Error::NoParentDir {
            path: model_dir.to_path_buf(),
        })?;
        let bundle_root = bundle_root_of(model_dir)?;
        let mapping_dir = bundle_root.join("Resources").join("config").join("doctrine");

        if let (Some(from), Some(to)) = (
            self.config.bundle_namespace.as_deref(),
            self.config.bundle_namespace_to.as_deref(),
        ) {
            for dir in [entity_dir.to_path_buf(), mapping_dir.clone()] {
                if !dir.is_dir() {
                    continue;
                }
                for file in fs_utils::walk_files(&dir)? {
                    if let Err(e) = rename_namespace_in_file(&file, from, to) {
                        tracing::warn!("namespace rename skipped {}: {}", file.display(), e);
                    }
                }
            }
        }

        if mapping_dir.is_dir() {
            ValidationBuilder::new(self.config.clone()).build(&mapping_dir)?;
        }
        Ok(())
    }
}

fn rename_namespace_in_file(path: &Path, from: &str, to: &str) -> Result<(), Error> {
    let content = fs_utils::read_file(path)?;
    let renamed = rename_namespace(&content, from, to);
    if renamed != content {
        fs_utils::write_file(path, renamed)?;
    }
    Ok(())
}

/// Replace occurrences of namespace `from` with `to`, skipping matches
/// embedded in a longer identifier on either side (so `Acme\OldBundle`
/// never rewrites inside `Acme\OldBundleExtra` or `MyAcme\OldBundle`).
pub fn rename_namespace(content: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return content.to_string();
    }
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while let Some(pos) = content[i..].find(from) {
        let start = i + pos;
        let end = start + from.len();
        let prev_ok = start == 0 || !is_identifier_byte(bytes[start - 1]);
        let next_ok = end == content.len() || !is_identifier_byte(bytes[end]);

        out.push_str(&content[i..start]);
        if prev_ok && next_ok {
            out.push_str(to);
        } else {
            out.push_str(from);
        }
        i = end;
    }
    out.push_str(&content[i..]);
    out
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn bundle_root_of(model_dir: &Path) -> Result<PathBuf, Error> {
    model_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::NoParentDir {
            path: model_dir.to_path_buf(),
        })
}

fn namespace_to_path(namespace: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in namespace.split('\\').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}
