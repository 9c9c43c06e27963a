//! Stored artifact integrity records.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{ArtifactKind, ArtifactRecord};

/// Row as stored; `kind` is parsed afterwards.
struct ArtifactRow {
    reference: String,
    kind: String,
    checksum: String,
    byte_len: i64,
    created_at: String,
}

impl ArtifactRow {
    fn into_record(self) -> DbResult<ArtifactRecord> {
        let kind = ArtifactKind::parse(&self.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown artifact kind: {}", self.kind)))?;
        Ok(ArtifactRecord {
            reference: self.reference,
            kind,
            checksum: self.checksum,
            byte_len: self.byte_len.max(0) as u64,
            created_at: self.created_at,
        })
    }
}

impl Database {
    /// Record (or re-record) the fingerprint of a stored artifact.
    pub fn insert_artifact(&self, record: &ArtifactRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO artifacts (reference, kind, checksum, byte_len, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(reference) DO UPDATE SET
                kind = excluded.kind,
                checksum = excluded.checksum,
                byte_len = excluded.byte_len,
                created_at = excluded.created_at
            "#,
            params![
                record.reference,
                record.kind.as_str(),
                record.checksum,
                record.byte_len as i64,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get the fingerprint for a blob reference.
    pub fn get_artifact(&self, reference: &str) -> DbResult<Option<ArtifactRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT reference, kind, checksum, byte_len, created_at
                FROM artifacts
                WHERE reference = ?
                "#,
                [reference],
                |row| {
                    Ok(ArtifactRow {
                        reference: row.get(0)?,
                        kind: row.get(1)?,
                        checksum: row.get(2)?,
                        byte_len: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;

        row.map(ArtifactRow::into_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_artifact() {
        let db = Database::open_in_memory().unwrap();
        let record =
            ArtifactRecord::for_bytes("a1b2c3d4_document.pdf".into(), ArtifactKind::Document, b"pdf");
        db.insert_artifact(&record).unwrap();

        let retrieved = db.get_artifact("a1b2c3d4_document.pdf").unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert!(db.get_artifact("missing").unwrap().is_none());
    }

    #[test]
    fn test_rerecord_replaces_checksum() {
        let db = Database::open_in_memory().unwrap();
        let first = ArtifactRecord::for_bytes("slip.png".into(), ArtifactKind::Slip, b"v1");
        db.insert_artifact(&first).unwrap();
        let second = ArtifactRecord::for_bytes("slip.png".into(), ArtifactKind::Slip, b"version 2");
        db.insert_artifact(&second).unwrap();

        let retrieved = db.get_artifact("slip.png").unwrap().unwrap();
        assert_eq!(retrieved.checksum, second.checksum);
        assert_eq!(retrieved.byte_len, 9);
    }
}
