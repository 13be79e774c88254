//! Reserved provenance keys stored in the `_MetaData` section.

pub const CREATION_APP_VERSION: &str = "SSM_CreationAppVersion";
pub const LAST_ACCESS_APP_VERSION: &str = "SSM_LastAccessAppVersion";
pub const CREATION_FORMAT_VERSION: &str = "SSM_CreationFormatVersion";
pub const LAST_ACCESS_FORMAT_VERSION: &str = "SSM_LastAccessFormatVersion";
pub const CREATION_TIMESTAMP: &str = "SSM_CreationTimestamp";
pub const LAST_LOADED_TIMESTAMP: &str = "SSM_LastLoadedTimestamp";
pub const CREATION_MODE: &str = "SSM_CreationMode";
pub const LAST_ACCESS_MODE: &str = "SSM_LastAccessMode";
pub const LAST_MIGRATION: &str = "SSM_LastMigration";
pub const MIGRATION_COUNT: &str = "SSM_MigrationCount";

pub const GROUP_HISTORICAL: &str = "HistoricalInfo";
pub const GROUP_LAST_ACCESS: &str = "LastAccessInfo";
pub const GROUP_MIGRATION: &str = "MigrationInfo";

/// Keys written when a store file is first created.
pub const SEEDED_KEYS: [&str; 8] = [
    CREATION_APP_VERSION,
    LAST_ACCESS_APP_VERSION,
    CREATION_FORMAT_VERSION,
    LAST_ACCESS_FORMAT_VERSION,
    CREATION_TIMESTAMP,
    LAST_LOADED_TIMESTAMP,
    CREATION_MODE,
    LAST_ACCESS_MODE,
];

/// Keys refreshed on every open and after every migration.
pub const LAST_ACCESS_KEYS: [&str; 4] = [
    LAST_ACCESS_APP_VERSION,
    LAST_ACCESS_FORMAT_VERSION,
    LAST_LOADED_TIMESTAMP,
    LAST_ACCESS_MODE,
];

pub fn description(key: &str) -> &'static str {
    match key {
        CREATION_APP_VERSION => "The version of SSM used to create the SSM file.",
        LAST_ACCESS_APP_VERSION => "The version of SSM used to last edit the SSM file.",
        CREATION_FORMAT_VERSION => "The original SSM Format version of the SSM file.",
        LAST_ACCESS_FORMAT_VERSION => "The current SSM Format version of the SSM file.",
        CREATION_TIMESTAMP => "The timestamp of when the SSM file was created.",
        LAST_LOADED_TIMESTAMP => "The timestamp of when the SSM file was last loaded.",
        CREATION_MODE => "The SSM mode used to create the SSM file.",
        LAST_ACCESS_MODE => "The SSM mode used to last access the SSM file.",
        LAST_MIGRATION => "The timestamp of when the SSM file was last migrated.",
        MIGRATION_COUNT => "The total number of migrations the SSM file has gone through.",
        _ => "",
    }
}

pub fn group(key: &str) -> &'static str {
    match key {
        CREATION_APP_VERSION | CREATION_FORMAT_VERSION | CREATION_TIMESTAMP | CREATION_MODE => {
            GROUP_HISTORICAL
        }
        LAST_MIGRATION | MIGRATION_COUNT => GROUP_MIGRATION,
        _ => GROUP_LAST_ACCESS,
    }
}
