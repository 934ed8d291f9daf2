//! End-to-end tests for the compile pipeline: pre-compile, post-compile,
//! and the validation builder over a temp bundle tree.

use std::fs;
use std::path::{Path, PathBuf};

use ormweld::{ModelCompiler, ProjectConfig, ValidationBuilder};

const INVOICE_PHP: &str = r#"<?php

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
     * @ORM\Column(type="datetime")
     * @var datetime
     */
    protected $issuedAt;

    public function getId()
    {
        return $this->id;
    }
}
"#;

const CUSTOMER_PHP: &str = r#"<?php

namespace Acme\ShopBundle\Entity\Model;

use Doctrine\ORM\Mapping as ORM;

/**
 * @ORM\Entity()
 */
class Customer
{
    /**
     * @ORM\Column(type="string")
     * @var string
     */
    protected $name;
}
"#;

const INVOICE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doctrine-mapping xmlns="http://doctrine-project.org/schemas/orm/doctrine-mapping">
  <entity name="Acme\ShopBundle\Entity\Model\Invoice" repository-class="Acme\ShopBundle\Entity\Model\InvoiceRepository" table="invoices">
    <id column="id" name="id" type="integer"/>
    <field column="total" name="total" type="decimal" precision="0" scale="0" nullable="1" length="10"/>
    <field column="number" name="number" type="string" nullable="" length="20"/>
    <field column="order" name="order" type="string" nullable="1" length="10"/>
    <many-to-one field="customer" target-entity="Acme\ShopBundle\Entity\Model\Customer">
      <join-columns>
        <join-column name="customer_id" nullable=""/>
      </join-columns>
    </many-to-one>
    <unique-constraints>
      <unique-constraint name="UNIQ_INVOICE" columns="customer_id,order_number"/>
    </unique-constraints>
  </entity>
</doctrine-mapping>"#;

const CUSTOMER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doctrine-mapping xmlns="http://doctrine-project.org/schemas/orm/doctrine-mapping">
  <entity name="Acme\ShopBundle\Entity\Model\Customer" table="customers">
    <id column="id" name="id" type="integer"/>
    <field column="name" name="name" type="string" nullable="1"/>
  </entity>
</doctrine-mapping>"#;

const ACCOUNT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doctrine-mapping xmlns="http://doctrine-project.org/schemas/orm/doctrine-mapping">
  <entity name="Acme\ShopBundle\Entity\Model\account" table="accounts">
    <id column="id" name="id" type="integer"/>
    <field column="guid" name="guid" type="string" nullable="" length="36"/>
    <unique-constraints>
      <unique-constraint name="UNIQ_ACCOUNT_GUID" columns="guid"/>
    </unique-constraints>
  </entity>
</doctrine-mapping>"#;

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    scratch: PathBuf,
}

fn setup() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();

    let scratch = root.join("generated");
    fs::create_dir_all(&scratch).unwrap();
    fs::write(scratch.join("Invoice.php"), INVOICE_PHP).unwrap();
    fs::write(scratch.join("Customer.php"), CUSTOMER_PHP).unwrap();
    fs::write(scratch.join("Invoice.php.bak"), "stale backup").unwrap();
    fs::write(scratch.join("notes.txt"), "not a model").unwrap();

    let raw_dir = root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("doctrine-xml");
    fs::create_dir_all(&raw_dir).unwrap();
    fs::write(
        raw_dir.join("Acme.ShopBundle.Entity.Model.Invoice.orm.xml"),
        INVOICE_XML,
    )
    .unwrap();
    fs::write(
        raw_dir.join("Acme.ShopBundle.Entity.Model.Customer.orm.xml"),
        CUSTOMER_XML,
    )
    .unwrap();
    fs::write(
        raw_dir.join("Acme.ShopBundle.Entity.Model.account.orm.xml"),
        ACCOUNT_XML,
    )
    .unwrap();

    Fixture {
        _tmp: tmp,
        root,
        scratch,
    }
}

fn compile(fixture: &Fixture, config: ProjectConfig) -> PathBuf {
    let compiler = ModelCompiler::new(config);
    let report = compiler.pre_compile(&fixture.scratch, &fixture.root).unwrap();
    assert_eq!(report.model_dirs.len(), 1);
    let model_dir = report.model_dirs[0].clone();
    compiler.post_compile(&model_dir).unwrap();
    model_dir
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| panic!("missing file: {}", path.display()))
}

#[test]
fn test_pre_compile_relocates_and_splits() {
    let fixture = setup();
    let compiler = ModelCompiler::new(ProjectConfig::default());
    let report = compiler.pre_compile(&fixture.scratch, &fixture.root).unwrap();

    let model_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Entity")
        .join("Model");
    assert_eq!(report.model_dirs, vec![model_dir.clone()]);

    // generation-time backups discarded, non-model files ignored in place
    assert!(!fixture.scratch.join("Invoice.php.bak").exists());
    assert!(fixture.scratch.join("notes.txt").exists());
    assert!(!fixture.scratch.join("Invoice.php").exists());

    // relocated model class
    assert!(model_dir.join("Invoice.php").exists());

    // editable subclass with emptied body
    let entity_dir = model_dir.parent().unwrap();
    let work = read(&entity_dir.join("Invoice.php"));
    assert!(work.contains("namespace Acme\\ShopBundle\\Entity;"));
    assert!(work.contains("class Invoice extends Model\\Invoice"));
    assert!(work.ends_with("{\n\n}\n"));
    assert!(!work.contains("@ORM"));

    // repository stub under the configured base namespace
    let repo = read(&entity_dir.join("Repository").join("InvoiceRepository.php"));
    assert!(repo.contains("namespace Acme\\ShopBundle\\Entity\\Repository;"));
    assert!(repo.contains("use VN\\CoreBundle\\Doctrine\\ORM\\EntityRepository;"));
    assert!(repo.contains("class InvoiceRepository extends EntityRepository"));
}

#[test]
fn test_existing_work_subclass_is_preserved() {
    let fixture = setup();
    let compiler = ModelCompiler::new(ProjectConfig::default());
    compiler.pre_compile(&fixture.scratch, &fixture.root).unwrap();

    let entity_dir = fixture.root.join("Acme").join("ShopBundle").join("Entity");
    let work_file = entity_dir.join("Invoice.php");
    let custom = "<?php\n\nnamespace Acme\\ShopBundle\\Entity;\n\nclass Invoice extends Model\\Invoice\n{\n    public function total()\n    {\n        return 0;\n    }\n}\n";
    fs::write(&work_file, custom).unwrap();

    // regenerate and recompile
    fs::write(fixture.scratch.join("Invoice.php"), INVOICE_PHP).unwrap();
    compiler.pre_compile(&fixture.scratch, &fixture.root).unwrap();

    assert_eq!(read(&work_file), custom);
}

#[test]
fn test_post_compile_finalizes_model_classes() {
    let fixture = setup();
    let model_dir = compile(&fixture, ProjectConfig::default());

    let model = read(&model_dir.join("Invoice.php"));
    assert!(model.contains("abstract class Invoice"));
    assert!(model.contains("namespace Acme\\ShopBundle\\Entity\\Model;"));
    assert!(!model.contains("@ORM"));
    assert!(!model.contains("as ORM"));
    assert!(model.contains("@var \\DateTime"));
    assert!(model.contains("getId"));
}

#[test]
fn test_post_compile_produces_canonical_mapping() {
    let fixture = setup();
    compile(&fixture, ProjectConfig::default());

    let mapping_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("doctrine");
    let invoice = read(&mapping_dir.join("Invoice.orm.xml"));

    // model namespace segment stripped, attributes alphabetized
    assert!(invoice.contains("name=\"Acme\\ShopBundle\\Entity\\Invoice\""));
    assert!(invoice.contains(
        "<field column=\"number\" length=\"20\" name=\"number\" nullable=\"false\" type=\"string\"/>"
    ));
    // nullable shorthand normalized
    assert!(invoice.contains("nullable=\"true\""));
    assert!(!invoice.contains("nullable=\"1\""));
    assert!(!invoice.contains("nullable=\"\""));
    // zero precision/scale dropped
    assert!(!invoice.contains("precision"));
    // reserved column quoted
    assert!(invoice.contains("column=\"`order`\""));
    // entity attributes split onto continuation lines
    assert!(invoice.contains("<entity\n           name="));
    // no space before self-closing slash anywhere
    assert!(!invoice.contains(" />"));
}

#[test]
fn test_validation_documents_for_invoice_scenario() {
    let fixture = setup();
    compile(&fixture, ProjectConfig::default());

    let validation_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("validation");
    let invoice = read(&validation_dir.join("Invoice.xml"));

    assert!(invoice.contains("<class name=\"Acme\\ShopBundle\\Entity\\Invoice\">"));

    // non-null relation: NotBlank plus fully-qualified Type
    let customer_at = invoice.find("<property name=\"customer\">").unwrap();
    let customer_block = &invoice[customer_at..invoice[customer_at..].find("</property>").unwrap() + customer_at];
    assert!(customer_block.contains("<constraint name=\"NotBlank\"/>"));
    assert!(customer_block.contains("<option name=\"type\">\\Acme\\ShopBundle\\Entity\\Customer</option>"));

    // nullable decimal: Type float plus Length, no NotBlank
    let total_at = invoice.find("<property name=\"total\">").unwrap();
    let total_block = &invoice[total_at..invoice[total_at..].find("</property>").unwrap() + total_at];
    assert!(!total_block.contains("NotBlank"));
    assert!(total_block.contains("<option name=\"type\">float</option>"));
    assert!(total_block.contains("<option name=\"max\">10</option>"));

    // unique constraint translated to a camelCased fields list
    assert!(invoice.contains(
        "<constraint name=\"Symfony\\Bridge\\Doctrine\\Validator\\Constraints\\UniqueEntity\">"
    ));
    assert!(invoice.contains("<value>customer</value>"));
    assert!(invoice.contains("<value>orderNumber</value>"));
    assert!(invoice.contains("Invoice (with customer_id, order_number) already exists."));
}

#[test]
fn test_guid_unique_constraint_and_ignored_fields() {
    let fixture = setup();
    compile(&fixture, ProjectConfig::default());

    let validation_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("validation");
    let account = read(&validation_dir.join("account.xml"));

    assert!(account.contains(
        "<constraint name=\"Common\\DoctrineBundle\\Validator\\Constraints\\UuidUnique\">"
    ));
    assert!(account.contains("<option name=\"strict\">false</option>"));
    assert!(account.contains("<option name=\"uuidProperty\">guid</option>"));
    // the guid field itself is on the ignore list
    assert!(!account.contains("<property name=\"guid\">"));
}

#[test]
fn test_entity_without_constraints_emits_empty_wrapper() {
    let fixture = setup();
    compile(&fixture, ProjectConfig::default());

    let validation_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("validation");
    let customer = read(&validation_dir.join("Customer.xml"));
    assert!(customer.contains("<constraint-mapping"));
    assert!(!customer.contains("<class"));
}

#[test]
fn test_empty_class_policy_can_emit_wrapper_class() {
    let fixture = setup();
    let config = ProjectConfig {
        skip_empty_validation_class: false,
        ..ProjectConfig::default()
    };
    compile(&fixture, config);

    let customer = read(
        &fixture
            .root
            .join("Acme")
            .join("ShopBundle")
            .join("Resources")
            .join("config")
            .join("validation")
            .join("Customer.xml"),
    );
    assert!(customer.contains("<class name=\"Acme\\ShopBundle\\Entity\\Customer\"/>"));
}

#[test]
fn test_validation_build_order_is_bytewise_ascending() {
    let fixture = setup();
    compile(&fixture, ProjectConfig::default());

    let mapping_dir = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("doctrine");
    let written = ValidationBuilder::new(ProjectConfig::default())
        .build(&mapping_dir)
        .unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    // uppercase sorts before lowercase in a byte-wise comparison
    assert_eq!(names, vec!["Customer.xml", "Invoice.xml", "account.xml"]);
}

#[test]
fn test_namespace_rename_rewrites_tree() {
    let fixture = setup();
    let config = ProjectConfig {
        bundle_namespace: Some("Acme\\ShopBundle".to_string()),
        bundle_namespace_to: Some("Shop\\CommerceBundle".to_string()),
        ..ProjectConfig::default()
    };
    let model_dir = compile(&fixture, config);

    let model = read(&model_dir.join("Invoice.php"));
    assert!(model.contains("namespace Shop\\CommerceBundle\\Entity\\Model;"));
    assert!(!model.contains("Acme\\ShopBundle"));

    let mapping = read(
        &fixture
            .root
            .join("Acme")
            .join("ShopBundle")
            .join("Resources")
            .join("config")
            .join("doctrine")
            .join("Invoice.orm.xml"),
    );
    assert!(mapping.contains("Shop\\CommerceBundle\\Entity\\Invoice"));

    // validation documents are built after the rename
    let validation = read(
        &fixture
            .root
            .join("Acme")
            .join("ShopBundle")
            .join("Resources")
            .join("config")
            .join("validation")
            .join("Invoice.xml"),
    );
    assert!(validation.contains("<class name=\"Shop\\CommerceBundle\\Entity\\Invoice\">"));
}

#[test]
fn test_recompile_is_idempotent() {
    let fixture = setup();
    let model_dir = compile(&fixture, ProjectConfig::default());

    let mapping_path = fixture
        .root
        .join("Acme")
        .join("ShopBundle")
        .join("Resources")
        .join("config")
        .join("doctrine")
        .join("Invoice.orm.xml");
    let model_path = model_dir.join("Invoice.php");

    let mapping_once = read(&mapping_path);
    let model_once = read(&model_path);

    let compiler = ModelCompiler::new(ProjectConfig::default());
    compiler.post_compile(&model_dir).unwrap();

    assert_eq!(read(&mapping_path), mapping_once);
    assert_eq!(read(&model_path), model_once);
}
