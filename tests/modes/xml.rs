mod common;

use ssm::core::error::SettingsError;
use ssm::core::value::ValueKind;
use ssm::modes::xml_tree::XmlElement;
use ssm::modes::{Mode, XmlMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

fn open_new() -> (TempDir, PathBuf, XmlMode) {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("settings.xml");
    let mut mode = XmlMode::new();
    mode.open(&path).unwrap();
    (tmp, path, mode)
}

fn on_disk(path: &Path) -> XmlElement {
    XmlElement::parse(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_round_trip_every_kind() {
    let (_tmp, _path, mut mode) = open_new();
    common::round_trip_every_kind(&mut mode);
}

#[test]
fn test_add_twice_keeps_first() {
    let (_tmp, _path, mut mode) = open_new();
    common::add_twice_keeps_first(&mut mode);
}

#[test]
fn test_set_preserves_default() {
    let (_tmp, _path, mut mode) = open_new();
    common::set_preserves_default(&mut mode);
}

#[test]
fn test_edit_updates_group_and_description() {
    let (_tmp, _path, mut mode) = open_new();
    common::edit_changes_description_and_group(&mut mode);
}

#[test]
fn test_missing_names_are_soft() {
    let (_tmp, _path, mut mode) = open_new();
    common::missing_names_are_soft(&mut mode);
}

#[test]
fn test_delete() {
    let (_tmp, _path, mut mode) = open_new();
    common::delete_removes_variable(&mut mode);
}

#[test]
fn test_names_are_scoped_by_kind() {
    let (_tmp, _path, mut mode) = open_new();
    common::names_are_scoped_by_kind(&mut mode);
}

#[test]
fn test_invalid_names_rejected() {
    let (_tmp, _path, mut mode) = open_new();
    common::invalid_names_rejected(&mut mode);
}

#[test]
fn test_import_record_upserts() {
    let (_tmp, _path, mut mode) = open_new();
    common::import_record_upserts(&mut mode);
}

#[test]
fn test_new_file_seeds_metadata() {
    let (_tmp, _path, mode) = open_new();
    common::new_file_seeds_metadata(&mode);
}

#[test]
fn test_reopen_touches_last_access() {
    let (_tmp, path, mut mode) = open_new();
    common::reopen_touches_last_access(&mut mode, &path);
}

#[test]
fn test_migration_counter() {
    let (_tmp, _path, mut mode) = open_new();
    common::migration_counter_increments(&mut mode);
}

#[test]
fn test_closed_store() {
    let (_tmp, _path, mut mode) = open_new();
    common::closed_store_is_not_open(&mut mode);
}

#[test]
fn test_get_all_types_order() {
    let (_tmp, _path, mut mode) = open_new();
    common::get_all_types_is_kind_ordered(&mut mode);
}

#[test]
fn test_open_creates_file_with_ssm_root() {
    let (_tmp, path, _mode) = open_new();
    assert!(path.exists());
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    let root = on_disk(&path);
    assert_eq!(root.name, "SSM");
    assert!(root.child("_MetaData").is_some());
}

#[test]
fn test_edit_moves_variable_between_groups() {
    let (_tmp, path, mut mode) = open_new();
    mode.add("port", &8080i32, "server port", "g1").unwrap();
    mode.add("other", &1i32, "", "g1").unwrap();
    mode.set("port", &9090i32).unwrap();

    assert!(mode.edit::<i32>("port", "moved", "g2").unwrap());

    let root = on_disk(&path);
    let section = root.child("Int32").unwrap();
    assert!(section.child("g1").unwrap().child("port").is_none());
    let moved = section.child("g2").unwrap().child("port").unwrap();
    assert_eq!(moved.child_text("value"), Some("9090"));
    assert_eq!(moved.child_text("default"), Some("8080"));
    assert_eq!(moved.child_text("description"), Some("moved"));
}

#[test]
fn test_group_move_of_last_variable_prunes_old_group() {
    let (_tmp, path, mut mode) = open_new();
    mode.add("only", &true, "", "g1").unwrap();
    mode.edit::<bool>("only", "", "g2").unwrap();

    let section = on_disk(&path).child("Boolean").cloned().unwrap();
    assert!(section.child("g1").is_none());
    assert!(section.child("g2").is_some());
}

#[test]
fn test_delete_prunes_empty_group_then_section() {
    let (_tmp, path, mut mode) = open_new();
    mode.add("a", &1i64, "", "g1").unwrap();
    mode.add("b", &2i64, "", "g2").unwrap();

    mode.delete::<i64>("a").unwrap();
    let section = on_disk(&path).child("Int64").cloned().unwrap();
    assert!(section.child("g1").is_none());
    assert!(section.child("g2").is_some());

    mode.delete::<i64>("b").unwrap();
    assert!(on_disk(&path).child("Int64").is_none());
}

#[test]
fn test_auto_save_off_defers_writes() {
    let (_tmp, path, mut mode) = open_new();
    mode.set_auto_save(false);
    mode.add("pending", &"x".to_string(), "", "g").unwrap();
    assert!(on_disk(&path).child("String").is_none());

    mode.save().unwrap();
    assert!(on_disk(&path).child("String").is_some());

    mode.add("later", &"y".to_string(), "", "g").unwrap();
    mode.close().unwrap();
    let root = on_disk(&path);
    assert!(root.child("String").unwrap().child("g").unwrap().child("later").is_some());
}

#[test]
fn test_reopen_reads_existing_document() {
    let (_tmp, path, mut mode) = open_new();
    mode.add("motd", &"  padded  ".to_string(), "greeting", "ui").unwrap();
    mode.add("blob", &b"abc".to_vec(), "", "ui").unwrap();
    mode.close().unwrap();

    let mut reopened = XmlMode::new();
    reopened.open(&path).unwrap();
    assert_eq!(
        reopened.get::<String>("motd").unwrap().as_deref(),
        Some("  padded  ")
    );
    assert_eq!(reopened.get::<Vec<u8>>("blob").unwrap(), Some(b"abc".to_vec()));
    assert_eq!(reopened.get_all(ValueKind::String).unwrap()[0].group(), "ui");
}

#[test]
fn test_hand_written_document_with_empty_containers() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("hand.xml");
    fs::write(
        &path,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SSM>
  <Int16>
    <empty></empty>
  </Int16>
  <Boolean>
    <flags>
      <debug>
        <value>false</value>
        <description>debug mode</description>
      </debug>
    </flags>
  </Boolean>
</SSM>
"#,
    )
    .unwrap();

    let mut mode = XmlMode::new();
    mode.open(&path).unwrap();
    assert_eq!(mode.get::<bool>("debug").unwrap(), Some(false));
    // A missing <default> falls back to the value.
    let rec = &mode.get_all(ValueKind::Boolean).unwrap()[0];
    assert!(!rec.decode_default::<bool>().unwrap());
    mode.close().unwrap();

    let root = on_disk(&path);
    assert!(root.child("Int16").is_none());
    assert_eq!(root.child("_MetaData").unwrap().children.len(), 1);
}

#[test]
fn test_unparsable_value_is_format_error() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bad.xml");
    fs::write(
        &path,
        "<SSM><Int32><g><n><value>twelve</value></n></g></Int32></SSM>",
    )
    .unwrap();
    let mut mode = XmlMode::new();
    mode.open(&path).unwrap();
    assert!(matches!(mode.get::<i32>("n"), Err(SettingsError::Format(_))));
    assert!(matches!(
        mode.get_all_types(),
        Err(SettingsError::Format(_))
    ));
}

#[test]
fn test_failed_group_move_restores_variable() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("prefixed.xml");
    // Prefixed element names are well-formed XML but not valid variable names.
    fs::write(
        &path,
        "<SSM><Int32><g1><ns:port>\
         <value>7</value><default>5</default><description>original</description>\
         </ns:port></g1></Int32></SSM>",
    )
    .unwrap();

    let mut mode = XmlMode::new();
    mode.open(&path).unwrap();
    assert!(matches!(
        mode.edit::<i32>("ns:port", "moved", "g2"),
        Err(SettingsError::InvalidName(_))
    ));
    assert_eq!(mode.get::<i32>("ns:port").unwrap(), Some(7));

    // The next persisted mutation must not write the loss to disk.
    mode.add("other", &1i32, "", "g3").unwrap();
    let section = on_disk(&path).child("Int32").cloned().unwrap();
    assert!(section.child("g2").is_none());
    let kept = section.child("g1").and_then(|g| g.child("ns:port")).unwrap();
    assert_eq!(kept.child_text("value"), Some("7"));
    assert_eq!(kept.child_text("default"), Some("5"));
    assert_eq!(kept.child_text("description"), Some("original"));
}
