#![allow(dead_code)]

use ssm::core::error::SettingsError;
use ssm::core::record::TypedRecord;
use ssm::core::time;
use ssm::core::value::{SettingValue, ValueKind};
use ssm::modes::{Mode, metadata};
use std::path::Path;

fn record<M: Mode>(mode: &M, kind: ValueKind, name: &str) -> TypedRecord {
    mode.get_all(kind)
        .unwrap()
        .into_iter()
        .find(|r| r.name() == name)
        .unwrap_or_else(|| panic!("{kind}/{name} missing from get_all"))
}

fn check_round_trip<M: Mode, T: SettingValue>(mode: &mut M, name: &str, value: T) {
    assert!(mode.add(name, &value, "desc", "grp").unwrap());
    assert_eq!(mode.get::<T>(name).unwrap(), Some(value.clone()));

    let rec = record(mode, T::KIND, name);
    assert_eq!(rec.decode_value::<T>().unwrap(), value);
    assert_eq!(rec.decode_default::<T>().unwrap(), value);
    assert_eq!(rec.description(), "desc");
    assert_eq!(rec.group(), "grp");
}

/// NaN never equals itself, so floats are compared through `f64` with NaN matching NaN.
fn check_float_round_trip<M, T>(mode: &mut M, name: &str, value: T)
where
    M: Mode,
    T: SettingValue + Into<f64>,
{
    let want: f64 = value.clone().into();
    let same = |got: T| {
        let got: f64 = got.into();
        if want.is_nan() { got.is_nan() } else { got == want }
    };

    assert!(mode.add(name, &value, "desc", "grp").unwrap());
    let stored = mode.get::<T>(name).unwrap().expect("stored float");
    assert!(same(stored), "{name} did not round-trip");

    let rec = record(mode, T::KIND, name);
    assert!(same(rec.decode_value::<T>().unwrap()), "{name} value");
    assert!(same(rec.decode_default::<T>().unwrap()), "{name} default");
}

pub fn round_trip_every_kind<M: Mode>(mode: &mut M) {
    check_round_trip(mode, "i16", i16::MIN);
    check_round_trip(mode, "i32", -123_456i32);
    check_round_trip(mode, "i64", i64::MAX);
    check_round_trip(mode, "u16", u16::MAX);
    check_round_trip(mode, "u32", u32::MAX);
    check_round_trip(mode, "u64", u64::MAX);
    check_round_trip(mode, "f32", 0.1f32);
    check_round_trip(mode, "f64", std::f64::consts::PI);
    check_round_trip(mode, "text", "a < b & 'c' \"d\"".to_string());
    check_round_trip(mode, "empty", String::new());
    check_round_trip(mode, "blob", b"raw-bytes".to_vec());
    check_round_trip(mode, "flag", true);

    check_float_round_trip(mode, "f32_nan", f32::NAN);
    check_float_round_trip(mode, "f32_inf", f32::INFINITY);
    check_float_round_trip(mode, "f32_neg_inf", f32::NEG_INFINITY);
    check_float_round_trip(mode, "f64_nan", f64::NAN);
    check_float_round_trip(mode, "f64_inf", f64::INFINITY);
    check_float_round_trip(mode, "f64_neg_inf", f64::NEG_INFINITY);

    // Bulk reads must still decode every section.
    assert!(mode.get_all_types().is_ok());
}

pub fn add_twice_keeps_first<M: Mode>(mode: &mut M) {
    assert!(mode.add("retries", &3i32, "first", "net").unwrap());
    assert!(!mode.add("retries", &7i32, "second", "other").unwrap());

    assert_eq!(mode.get::<i32>("retries").unwrap(), Some(3));
    let rec = record(mode, ValueKind::Int32, "retries");
    assert_eq!(rec.description(), "first");
    assert_eq!(rec.group(), "net");
    assert_eq!(mode.get_all(ValueKind::Int32).unwrap().len(), 1);
}

pub fn set_preserves_default<M: Mode>(mode: &mut M) {
    mode.add("port", &8080i32, "server port", "network").unwrap();
    assert_eq!(mode.get::<i32>("port").unwrap(), Some(8080));
    assert!(mode.set("port", &9090i32).unwrap());
    assert_eq!(mode.get::<i32>("port").unwrap(), Some(9090));

    let rec = record(mode, ValueKind::Int32, "port");
    assert_eq!(rec.decode_value::<i32>().unwrap(), 9090);
    assert_eq!(rec.decode_default::<i32>().unwrap(), 8080);
    assert_eq!(rec.description(), "server port");
}

pub fn edit_changes_description_and_group<M: Mode>(mode: &mut M) {
    mode.add("motd", &"hello".to_string(), "old", "g1").unwrap();
    assert!(mode.edit::<String>("motd", "new", "g1").unwrap());
    assert_eq!(record(mode, ValueKind::String, "motd").description(), "new");

    assert!(mode.edit::<String>("motd", "newer", "g2").unwrap());
    let rec = record(mode, ValueKind::String, "motd");
    assert_eq!(rec.group(), "g2");
    assert_eq!(rec.description(), "newer");
    assert_eq!(rec.decode_value::<String>().unwrap(), "hello");
    assert_eq!(mode.get_all(ValueKind::String).unwrap().len(), 1);
}

pub fn missing_names_are_soft<M: Mode>(mode: &mut M) {
    assert_eq!(mode.get::<i64>("ghost").unwrap(), None);
    assert!(!mode.contains::<i64>("ghost").unwrap());
    assert!(!mode.set("ghost", &1i64).unwrap());
    assert!(!mode.set_default("ghost", &1i64).unwrap());
    assert!(!mode.edit::<i64>("ghost", "d", "g").unwrap());
    assert!(!mode.delete::<i64>("ghost").unwrap());
    assert!(mode.get_all(ValueKind::Int64).unwrap().is_empty());
}

pub fn delete_removes_variable<M: Mode>(mode: &mut M) {
    mode.add("a", &1u32, "", "g").unwrap();
    mode.add("b", &2u32, "", "g").unwrap();
    assert!(mode.delete::<u32>("a").unwrap());
    assert!(!mode.delete::<u32>("a").unwrap());
    assert_eq!(mode.get::<u32>("a").unwrap(), None);
    assert_eq!(mode.get::<u32>("b").unwrap(), Some(2));
}

pub fn names_are_scoped_by_kind<M: Mode>(mode: &mut M) {
    assert!(mode.add("limit", &5i16, "", "g").unwrap());
    assert!(mode.add("limit", &"five".to_string(), "", "g").unwrap());
    assert_eq!(mode.get::<i16>("limit").unwrap(), Some(5));
    assert_eq!(mode.get::<String>("limit").unwrap(), Some("five".to_string()));
    assert_eq!(mode.get::<i32>("limit").unwrap(), None);
}

pub fn invalid_names_rejected<M: Mode>(mode: &mut M) {
    for bad in ["", "1st", "has space", "semi;colon", "quote\"d"] {
        assert!(matches!(
            mode.add(bad, &1i32, "", "g"),
            Err(SettingsError::InvalidName(_))
        ));
    }
    assert!(matches!(
        mode.add("ok", &1i32, "", "bad group"),
        Err(SettingsError::InvalidName(_))
    ));
    assert!(mode.add("ok", &1i32, "", "good").unwrap());
    assert!(matches!(
        mode.edit::<i32>("ok", "", "bad group"),
        Err(SettingsError::InvalidName(_))
    ));
}

pub fn import_record_upserts<M: Mode>(mode: &mut M) {
    let fresh = TypedRecord::from_values("timeout", "net", &30u16, &10u16, "seconds");
    mode.import_record(&fresh).unwrap();
    let rec = record(mode, ValueKind::UInt16, "timeout");
    assert_eq!(rec.decode_value::<u16>().unwrap(), 30);
    assert_eq!(rec.decode_default::<u16>().unwrap(), 10);

    let update = TypedRecord::from_values("timeout", "io", &45u16, &15u16, "secs");
    mode.import_record(&update).unwrap();
    let rec = record(mode, ValueKind::UInt16, "timeout");
    assert_eq!(rec.decode_value::<u16>().unwrap(), 45);
    assert_eq!(rec.decode_default::<u16>().unwrap(), 15);
    assert_eq!(rec.description(), "secs");
    assert_eq!(rec.group(), "io");

    let meta = TypedRecord::metadata("Custom_Key", "Extra", "v1", "custom");
    mode.import_record(&meta).unwrap();
    mode.import_record(&TypedRecord::metadata("Custom_Key", "Extra", "v2", "custom"))
        .unwrap();
    assert_eq!(mode.get_metadata("Custom_Key").unwrap().as_deref(), Some("v2"));
}

pub fn new_file_seeds_metadata<M: Mode>(mode: &M) {
    let meta = mode.get_all(ValueKind::MetaData).unwrap();
    let mut names: Vec<&str> = meta.iter().map(|r| r.name()).collect();
    names.sort_unstable();
    let mut expected = metadata::SEEDED_KEYS.to_vec();
    expected.sort_unstable();
    assert_eq!(names, expected);

    for rec in &meta {
        assert!(!rec.text_value().unwrap().is_empty(), "{} is empty", rec.name());
        assert_eq!(rec.group(), metadata::group(rec.name()));
    }
    assert_eq!(
        mode.get_metadata(metadata::CREATION_MODE).unwrap().as_deref(),
        Some(mode.mode_name())
    );
    assert_eq!(
        mode.get_metadata(metadata::CREATION_APP_VERSION).unwrap(),
        Some(time::app_version())
    );
}

/// Reopening refreshes the last-access family and leaves creation keys alone.
pub fn reopen_touches_last_access<M: Mode>(mode: &mut M, path: &Path) {
    mode.set_metadata(metadata::LAST_ACCESS_APP_VERSION, "v0.0.1").unwrap();
    mode.set_metadata(metadata::CREATION_APP_VERSION, "v0.0.1").unwrap();
    mode.set_metadata(metadata::CREATION_TIMESTAMP, "42").unwrap();
    mode.close().unwrap();

    mode.open(path).unwrap();
    assert_eq!(
        mode.get_metadata(metadata::LAST_ACCESS_APP_VERSION).unwrap(),
        Some(time::app_version())
    );
    assert_eq!(
        mode.get_metadata(metadata::CREATION_APP_VERSION).unwrap().as_deref(),
        Some("v0.0.1")
    );
    assert_eq!(
        mode.get_metadata(metadata::CREATION_TIMESTAMP).unwrap().as_deref(),
        Some("42")
    );
    assert_eq!(mode.get_all(ValueKind::MetaData).unwrap().len(), 8);
}

pub fn migration_counter_increments<M: Mode>(mode: &mut M) {
    assert_eq!(mode.get_metadata(metadata::MIGRATION_COUNT).unwrap(), None);
    mode.update_migration_status().unwrap();
    assert_eq!(
        mode.get_metadata(metadata::MIGRATION_COUNT).unwrap().as_deref(),
        Some("1")
    );
    mode.update_migration_status().unwrap();
    assert_eq!(
        mode.get_metadata(metadata::MIGRATION_COUNT).unwrap().as_deref(),
        Some("2")
    );
    assert!(mode.get_metadata(metadata::LAST_MIGRATION).unwrap().is_some());
}

pub fn closed_store_is_not_open<M: Mode>(mode: &mut M) {
    mode.close().unwrap();
    assert!(!mode.is_open());
    // Closing twice is harmless.
    mode.close().unwrap();
    assert!(matches!(mode.get::<i32>("x"), Err(SettingsError::NotOpen)));
    assert!(matches!(
        mode.add("x", &1i32, "", "g"),
        Err(SettingsError::NotOpen)
    ));
}

pub fn get_all_types_is_kind_ordered<M: Mode>(mode: &mut M) {
    mode.add("z", &true, "", "g").unwrap();
    mode.add("y", &1i16, "", "g").unwrap();
    mode.add("x", &"s".to_string(), "", "g").unwrap();

    let kinds: Vec<ValueKind> = mode
        .get_all_types()
        .unwrap()
        .iter()
        .map(|r| r.kind())
        .filter(|k| !k.is_metadata())
        .collect();
    assert_eq!(
        kinds,
        vec![ValueKind::Int16, ValueKind::String, ValueKind::Boolean]
    );
    let all = mode.get_all_types().unwrap();
    assert!(all[0].kind().is_metadata());
}
