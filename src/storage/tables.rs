use redb::TableDefinition;

/// Resume records: uuid -> ResumeRecord (msgpack)
pub const RESUMES: TableDefinition<&str, &[u8]> = TableDefinition::new("resumes");

/// Owner index: owner_id -> msgpack Vec of resume UUIDs
pub const OWNER_RESUMES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_resumes");
