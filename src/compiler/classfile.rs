//! Text surgery on generated entity class files.
//!
//! These are pure string transforms so each one can be pinned by a unit
//! test; the compiler composes them and owns all file I/O.

use regex::Regex;

/// Extract the declared namespace from a class file header.
pub fn extract_namespace(content: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^namespace\s+(.+?);").unwrap();
    re.captures(content).map(|c| c[1].trim().to_string())
}

/// Remove generated-model namespace references (`Model\` prefixes and the
/// trailing `\Model` segment of a namespace declaration).
pub fn strip_model_references(content: &str) -> String {
    content.replace("Model\\", "").replace("\\Model", "")
}

/// Rewrite the class declaration to extend its generated base class:
/// `class Invoice` becomes `class Invoice extends Model\Invoice`.
pub fn add_model_parent(content: &str) -> String {
    let re = Regex::new(r"(?m)^class (\S+)").unwrap();
    re.replacen(content, 1, "class $1 extends Model\\$1")
        .into_owned()
}

/// Rewrite the class declaration to be abstract. Already-abstract
/// declarations are left untouched, so re-running is safe.
pub fn make_abstract(content: &str) -> String {
    let re = Regex::new(r"(?m)^(?:abstract )?class (\S+)").unwrap();
    re.replacen(content, 1, "abstract class $1").into_owned()
}

/// Drop all top-level `use` statements.
pub fn strip_use_statements(content: &str) -> String {
    filter_lines(content, |line| !line.starts_with("use "))
}

/// Drop ORM annotation lines: docblock `* @ORM...` lines and
/// `use ... as ORM` imports.
pub fn strip_orm_annotations(content: &str) -> String {
    let annotation = Regex::new(r"\s+\*\s+@ORM").unwrap();
    let import = Regex::new(r"\s+as\s+ORM").unwrap();
    filter_lines(content, |line| {
        !annotation.is_match(line) && !import.is_match(line)
    })
}

/// Trim trailing whitespace off now-empty docblock continuation lines.
pub fn collapse_blank_comment_lines(content: &str) -> String {
    let re = Regex::new(r"(?m)^(\s*\*)[ \t]+$").unwrap();
    re.replace_all(content, "$1").into_owned()
}

/// Normalize PHPDoc `datetime` type tags to the framework's DateTime type.
pub fn normalize_datetime_docs(content: &str) -> String {
    let re = Regex::new(r"(@(?:var|param|return)\s+)datetime\b").unwrap();
    re.replace_all(content, "${1}\\DateTime").into_owned()
}

/// Truncate everything after the class declaration, leaving an empty body.
pub fn truncate_class_body(content: &str) -> String {
    let mut out = String::new();
    for line in content.lines() {
        out.push_str(line);
        out.push('\n');
        if line.starts_with("class ") {
            out.push_str("{\n\n}");
            break;
        }
    }
    out
}

/// Trim trailing whitespace and end the file with a single newline.
pub fn normalize_trailing_whitespace(content: &str) -> String {
    format!("{}\n", content.trim_end())
}

/// Build the editable work subclass from a generated model class: model
/// references stripped, `extends Model\<Class>` added, imports and ORM
/// annotations removed, body emptied.
pub fn make_work_subclass(content: &str) -> String {
    let out = strip_model_references(content);
    let out = add_model_parent(&out);
    let out = strip_use_statements(&out);
    let out = strip_orm_annotations(&out);
    let out = truncate_class_body(&out);
    normalize_trailing_whitespace(&out)
}

/// Build a repository stub for `class_name`, namespaced under the work
/// class namespace and extending the configured base repository class.
pub fn make_repository_stub(class_name: &str, work_namespace: &str, base_class: &str) -> String {
    let base_short = base_class.rsplit('\\').next().unwrap_or(base_class);
    format!(
        "<?php\n\n\
         namespace {work_namespace}\\Repository;\n\n\
         use {base_class};\n\n\
         class {class_name}Repository extends {base_short}\n\
         {{\n\
         }}\n"
    )
}

fn filter_lines<F: Fn(&str) -> bool>(content: &str, keep: F) -> String {
    let mut out = content
        .lines()
        .filter(|line| keep(line))
        .collect::<Vec<_>>()
        .join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = r#"<?php

namespace Acme\ShopBundle\Entity\Model;

use Doctrine\ORM\Mapping as ORM;

/**
 * Acme\ShopBundle\Entity\Model\Invoice
 *
 * @ORM\Entity()
 * @ORM\Table(name="invoices")
 */
class Invoice
{
    /**
     * @ORM\Id()
     * @ORM\Column(type="integer")
     * @var integer
     */
    protected $id;

    /**
     * @var datetime
     */
    protected $issuedAt;

    public function getId()
    {
        return $this->id;
    }
}
"#;

    #[test]
    fn test_extract_namespace() {
        assert_eq!(
            extract_namespace(GENERATED).as_deref(),
            Some("Acme\\ShopBundle\\Entity\\Model")
        );
        assert_eq!(extract_namespace("<?php\n$x = 1;\n"), None);
    }

    #[test]
    fn test_make_work_subclass() {
        let work = make_work_subclass(GENERATED);

        assert!(work.contains("namespace Acme\\ShopBundle\\Entity;"));
        assert!(work.contains("class Invoice extends Model\\Invoice"));
        assert!(work.ends_with("{\n\n}\n"));
        assert!(!work.contains("@ORM"));
        assert!(!work.contains("use Doctrine"));
        assert!(!work.contains("getId"));
    }

    #[test]
    fn test_make_abstract_is_idempotent() {
        let once = make_abstract(GENERATED);
        assert!(once.contains("abstract class Invoice"));
        assert_eq!(make_abstract(&once), once);
    }

    #[test]
    fn test_strip_orm_annotations() {
        let out = strip_orm_annotations(GENERATED);
        assert!(!out.contains("@ORM"));
        assert!(!out.contains("as ORM"));
        assert!(out.contains("@var datetime"));
        assert!(out.contains("protected $id;"));
    }

    #[test]
    fn test_normalize_datetime_docs() {
        let out = normalize_datetime_docs(GENERATED);
        assert!(out.contains("@var \\DateTime"));
        assert!(!out.contains("@var datetime"));
    }

    #[test]
    fn test_make_repository_stub() {
        let stub = make_repository_stub(
            "Invoice",
            "Acme\\ShopBundle\\Entity",
            "VN\\CoreBundle\\Doctrine\\ORM\\EntityRepository",
        );
        assert!(stub.contains("namespace Acme\\ShopBundle\\Entity\\Repository;"));
        assert!(stub.contains("use VN\\CoreBundle\\Doctrine\\ORM\\EntityRepository;"));
        assert!(stub.contains("class InvoiceRepository extends EntityRepository"));
    }

    #[test]
    fn test_normalize_trailing_whitespace() {
        assert_eq!(normalize_trailing_whitespace("x\n\n\n"), "x\n");
        assert_eq!(normalize_trailing_whitespace("x"), "x\n");
    }
}
