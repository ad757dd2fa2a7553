//! Diesel implementation of [`KeyValueStore`].

use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::models::kv_entry::{KvEntry, NewKvEntry};
use crate::repository::errors::RepositoryResult;
use crate::repository::{DieselRepository, KeyValueStore};

impl KeyValueStore for DieselRepository {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        use crate::schema::kv_entries;

        let mut conn = self.conn()?;
        let entry = kv_entries::table
            .filter(kv_entries::key.eq(key))
            .select(KvEntry::as_select())
            .first::<KvEntry>(&mut conn)
            .optional()?;

        Ok(entry.map(|entry| entry.value))
    }

    fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        use crate::schema::kv_entries;

        let mut conn = self.conn()?;
        let entry = NewKvEntry {
            key,
            value,
            updated_at: Utc::now().naive_utc(),
        };

        diesel::insert_into(kv_entries::table)
            .values(&entry)
            .on_conflict(kv_entries::key)
            .do_update()
            .set((
                kv_entries::value.eq(excluded(kv_entries::value)),
                kv_entries::updated_at.eq(excluded(kv_entries::updated_at)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> RepositoryResult<()> {
        use crate::schema::kv_entries;

        let mut conn = self.conn()?;
        diesel::delete(kv_entries::table.filter(kv_entries::key.eq(key))).execute(&mut conn)?;

        Ok(())
    }
}
