//! Tables and seed rows of the holiday-booking OLTP database.

use pgboot_db::SchemaScript;

const DEFINITION: &str = include_str!("oltp_schema.sql");
const SEED: &str = include_str!("seed.sql");

/// Script applied to a freshly created, empty database.
pub fn oltp_schema() -> SchemaScript {
    SchemaScript::from_static(DEFINITION, SEED)
}
