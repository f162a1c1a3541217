//! Publication repository over the SQLite database.
//!
//! Owns persistence of publication records: CRUD, filtered substring
//! search, and the experiment timeline. The vector search core never
//! touches this table directly; it receives `IndexDocument` views derived
//! from publications listed here.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use tracing::info;

use exobio_core::error::ExobioError;
use exobio_core::types::{Publication, PublicationFilters, TimelineEntry};

use crate::db::Database;
use crate::samples::sample_publications;

const PUBLICATION_COLUMNS: &str =
    "id, title, authors, year, mission, organism, experiment_type, abstract, keywords, connections";

/// Repository for publication records.
pub struct PublicationStore {
    db: Arc<Database>,
}

impl PublicationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a publication, replacing any existing record with the same id.
    pub fn save(&self, publication: &Publication) -> Result<(), ExobioError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO publications
                 (id, title, authors, year, mission, organism, experiment_type, abstract, keywords, connections)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    publication.id,
                    publication.title,
                    serde_json::to_string(&publication.authors)?,
                    publication.year,
                    publication.mission,
                    publication.organism,
                    publication.experiment_type,
                    publication.abstract_text,
                    serde_json::to_string(&publication.keywords)?,
                    serde_json::to_string(&publication.connections)?,
                ],
            )
            .map_err(|e| ExobioError::Storage(format!("Failed to save publication: {}", e)))?;
            Ok(())
        })
    }

    /// Find a publication by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Publication>, ExobioError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM publications WHERE id = ?1",
                    PUBLICATION_COLUMNS
                ))
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id], |row| Ok(row_to_publication(row)))
                .optional()
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            match result {
                Some(publication) => Ok(Some(publication?)),
                None => Ok(None),
            }
        })
    }

    /// List all publications ordered by id.
    pub fn list_all(&self) -> Result<Vec<Publication>, ExobioError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM publications ORDER BY id ASC",
                    PUBLICATION_COLUMNS
                ))
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_publication(row)))
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let mut publications = Vec::new();
            for row in rows {
                let publication = row.map_err(|e| ExobioError::Storage(e.to_string()))??;
                publications.push(publication);
            }
            Ok(publications)
        })
    }

    /// Search publications by free-text query and/or filters.
    ///
    /// The query matches case-insensitively as a substring of the title,
    /// abstract, or keywords. String filters match the same way against
    /// their column; year is exact. With no query and no filters this
    /// returns every publication.
    pub fn search(
        &self,
        query: Option<&str>,
        filters: &PublicationFilters,
    ) -> Result<Vec<Publication>, ExobioError> {
        let mut sql = format!("SELECT {} FROM publications", PUBLICATION_COLUMNS);
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push(
                "(instr(lower(title), ?) > 0 OR instr(lower(abstract), ?) > 0 \
                 OR instr(lower(keywords), ?) > 0)",
            );
            let needle = q.to_lowercase();
            params.push(Box::new(needle.clone()));
            params.push(Box::new(needle.clone()));
            params.push(Box::new(needle));
        }

        if let Some(ref organism) = filters.organism {
            conditions.push("instr(lower(organism), ?) > 0");
            params.push(Box::new(organism.to_lowercase()));
        }

        if let Some(ref experiment_type) = filters.experiment_type {
            conditions.push("instr(lower(experiment_type), ?) > 0");
            params.push(Box::new(experiment_type.to_lowercase()));
        }

        if let Some(ref mission) = filters.mission {
            conditions.push("instr(lower(mission), ?) > 0");
            params.push(Box::new(mission.to_lowercase()));
        }

        if let Some(year) = filters.year {
            conditions.push("year = ?");
            params.push(Box::new(year));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id ASC");

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(row_to_publication(row))
                })
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let mut publications = Vec::new();
            for row in rows {
                let publication = row.map_err(|e| ExobioError::Storage(e.to_string()))??;
                publications.push(publication);
            }
            Ok(publications)
        })
    }

    /// The experiment timeline: one entry per publication, ascending by year.
    pub fn timeline(&self) -> Result<Vec<TimelineEntry>, ExobioError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT year, title, mission, experiment_type, id
                     FROM publications
                     ORDER BY year ASC, id ASC",
                )
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(TimelineEntry {
                        year: row.get(0)?,
                        title: row.get(1)?,
                        mission: row.get(2)?,
                        experiment_type: row.get(3)?,
                        id: row.get(4)?,
                    })
                })
                .map_err(|e| ExobioError::Storage(e.to_string()))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(|e| ExobioError::Storage(e.to_string()))?);
            }
            Ok(entries)
        })
    }

    /// Delete a publication by id.
    ///
    /// Returns Ok(()) regardless of whether the record existed.
    pub fn delete(&self, id: i64) -> Result<(), ExobioError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM publications WHERE id = ?1",
                rusqlite::params![id],
            )
            .map_err(|e| ExobioError::Storage(format!("Failed to delete publication: {}", e)))?;
            Ok(())
        })
    }

    /// Count stored publications.
    pub fn count(&self) -> Result<u64, ExobioError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM publications", [], |row| row.get(0))
                .map_err(|e| ExobioError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    /// Seed the bundled sample publications into an empty store.
    ///
    /// Returns the number of records inserted; a non-empty store is left
    /// untouched and returns 0.
    pub fn seed_samples(&self) -> Result<usize, ExobioError> {
        if self.count()? > 0 {
            return Ok(0);
        }

        let publications = sample_publications();
        for publication in &publications {
            self.save(publication)?;
        }

        info!(count = publications.len(), "Seeded sample publications");
        Ok(publications.len())
    }
}

fn row_to_publication(row: &rusqlite::Row<'_>) -> Result<Publication, ExobioError> {
    let authors: String = row
        .get(2)
        .map_err(|e| ExobioError::Storage(e.to_string()))?;
    let keywords: String = row
        .get(8)
        .map_err(|e| ExobioError::Storage(e.to_string()))?;
    let connections: String = row
        .get(9)
        .map_err(|e| ExobioError::Storage(e.to_string()))?;

    Ok(Publication {
        id: row.get(0).map_err(|e| ExobioError::Storage(e.to_string()))?,
        title: row.get(1).map_err(|e| ExobioError::Storage(e.to_string()))?,
        authors: serde_json::from_str(&authors)?,
        year: row.get(3).map_err(|e| ExobioError::Storage(e.to_string()))?,
        mission: row.get(4).map_err(|e| ExobioError::Storage(e.to_string()))?,
        organism: row.get(5).map_err(|e| ExobioError::Storage(e.to_string()))?,
        experiment_type: row
            .get(6)
            .map_err(|e| ExobioError::Storage(e.to_string()))?,
        abstract_text: row
            .get(7)
            .map_err(|e| ExobioError::Storage(e.to_string()))?,
        keywords: serde_json::from_str(&keywords)?,
        connections: serde_json::from_str(&connections)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> PublicationStore {
        PublicationStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn seeded_store() -> PublicationStore {
        let store = make_store();
        store.seed_samples().unwrap();
        store
    }

    #[test]
    fn test_save_and_find() {
        let store = make_store();
        let publications = sample_publications();

        store.save(&publications[0]).unwrap();

        let found = store.find_by_id(1).unwrap().unwrap();
        assert_eq!(found, publications[0]);
    }

    #[test]
    fn test_find_missing_returns_none() {
        let store = make_store();
        assert!(store.find_by_id(42).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_existing() {
        let store = make_store();
        let mut publication = sample_publications().remove(0);

        store.save(&publication).unwrap();
        publication.title = "Revised title".to_string();
        store.save(&publication).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let found = store.find_by_id(publication.id).unwrap().unwrap();
        assert_eq!(found.title, "Revised title");
    }

    #[test]
    fn test_list_all_ordered_by_id() {
        let store = seeded_store();
        let publications = store.list_all().unwrap();
        assert_eq!(publications.len(), 4);
        let ids: Vec<i64> = publications.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_delete() {
        let store = seeded_store();
        store.delete(2).unwrap();
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.find_by_id(2).unwrap().is_none());

        // Deleting a nonexistent record should not error.
        store.delete(42).unwrap();
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = make_store();
        assert_eq!(store.seed_samples().unwrap(), 4);
        assert_eq!(store.seed_samples().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn test_search_by_query_matches_title() {
        let store = seeded_store();
        let results = store
            .search(Some("bone density"), &PublicationFilters::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn test_search_query_is_case_insensitive() {
        let store = seeded_store();
        let results = store
            .search(Some("MICROGRAVITY"), &PublicationFilters::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_search_query_matches_keywords() {
        let store = seeded_store();
        let results = store
            .search(Some("biofilms"), &PublicationFilters::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 3);
    }

    #[test]
    fn test_search_with_organism_filter() {
        let store = seeded_store();
        let filters = PublicationFilters {
            organism: Some("homo sapiens".to_string()),
            ..Default::default()
        };
        let results = store.search(None, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn test_search_with_year_filter() {
        let store = seeded_store();
        let filters = PublicationFilters {
            year: Some(2023),
            ..Default::default()
        };
        let results = store.search(None, &filters).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.year == 2023));
    }

    #[test]
    fn test_search_combines_query_and_filters() {
        let store = seeded_store();
        let filters = PublicationFilters {
            year: Some(2023),
            ..Default::default()
        };
        let results = store.search(Some("microbial"), &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 3);
    }

    #[test]
    fn test_search_no_criteria_returns_all() {
        let store = seeded_store();
        let results = store.search(None, &PublicationFilters::default()).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_search_no_matches() {
        let store = seeded_store();
        let results = store
            .search(Some("zebrafish"), &PublicationFilters::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_timeline_ascending_by_year() {
        let store = seeded_store();
        let timeline = store.timeline().unwrap();
        assert_eq!(timeline.len(), 4);

        let years: Vec<i32> = timeline.iter().map(|e| e.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023, 2023]);
        assert_eq!(timeline[0].id, 4);
    }
}
