//! libSQL storage layer (local file mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the cross-run
//! caches (bulk email lookups per domain, resolved websites per company) and
//! the run history (one row per pipeline run plus the contacts it emitted).
//!
//! **Access rules:**
//! - `prospector run` and `prospector cache clear`: read-write via [`Storage::open`]
//! - `prospector runs` and `prospector cache stats`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use prospector_shared::{
    DecisionMaker, EmailLookup, LookupStatus, ProspectorError, ResolvedWebsite, Result, RunId,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// One row of run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: Option<String>,
    pub stats_json: Option<String>,
    pub contacts: u64,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub email_entries: u64,
    pub website_entries: u64,
    pub runs: u64,
    pub contacts: u64,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProspectorError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ProspectorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ProspectorError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProspectorError::Storage(format!(
                "no database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ProspectorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ProspectorError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ProspectorError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ProspectorError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Email cache
    // -----------------------------------------------------------------------

    /// Cached lookup for `domain`, ignoring entries older than `ttl_days`.
    ///
    /// `ttl_days == 0` disables expiry.
    pub async fn get_emails(&self, domain: &str, ttl_days: u32) -> Result<Option<EmailLookup>> {
        let cutoff = cutoff(ttl_days);
        let mut rows = self
            .conn
            .query(
                "SELECT emails_json, status FROM email_cache
                 WHERE domain = ?1 AND fetched_at >= ?2",
                params![domain, cutoff.as_str()],
            )
            .await
            .map_err(sql)?;

        let Some(row) = rows.next().await.map_err(sql)? else {
            return Ok(None);
        };
        let emails_json: String = row.get(0).map_err(sql)?;
        let status: String = row.get(1).map_err(sql)?;
        let emails: Vec<String> = serde_json::from_str(&emails_json)
            .map_err(|e| ProspectorError::Storage(format!("corrupt email cache row: {e}")))?;

        Ok(Some(EmailLookup {
            domain: domain.to_string(),
            emails,
            status: if status == LookupStatus::Found.as_str() {
                LookupStatus::Found
            } else {
                LookupStatus::NotFound
            },
        }))
    }

    /// Store a lookup (upserts).
    pub async fn put_emails(&self, lookup: &EmailLookup) -> Result<()> {
        self.put_emails_at(lookup, Utc::now()).await
    }

    async fn put_emails_at(&self, lookup: &EmailLookup, fetched_at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        let emails_json = serde_json::to_string(&lookup.emails)
            .map_err(|e| ProspectorError::Storage(e.to_string()))?;
        let fetched_at = timestamp(fetched_at);
        self.conn
            .execute(
                "INSERT INTO email_cache (domain, emails_json, status, fetched_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(domain) DO UPDATE SET
                   emails_json = excluded.emails_json,
                   status = excluded.status,
                   fetched_at = excluded.fetched_at",
                params![
                    lookup.domain.as_str(),
                    emails_json.as_str(),
                    lookup.status.as_str(),
                    fetched_at.as_str()
                ],
            )
            .await
            .map_err(sql)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Website cache
    // -----------------------------------------------------------------------

    /// Cached website for a (company, keywords) pair.
    pub async fn get_website(
        &self,
        company: &str,
        keywords: &str,
        ttl_days: u32,
    ) -> Result<Option<ResolvedWebsite>> {
        let key = website_cache_key(company, keywords);
        let cutoff = cutoff(ttl_days);
        let mut rows = self
            .conn
            .query(
                "SELECT domain, url, is_homepage FROM website_cache
                 WHERE key_hash = ?1 AND fetched_at >= ?2",
                params![key.as_str(), cutoff.as_str()],
            )
            .await
            .map_err(sql)?;

        match rows.next().await.map_err(sql)? {
            Some(row) => Ok(Some(ResolvedWebsite {
                domain: row.get(0).map_err(sql)?,
                url: row.get(1).map_err(sql)?,
                is_homepage: row.get::<i64>(2).map_err(sql)? != 0,
            })),
            None => Ok(None),
        }
    }

    /// Store a resolved website (upserts).
    pub async fn put_website(
        &self,
        company: &str,
        keywords: &str,
        website: &ResolvedWebsite,
    ) -> Result<()> {
        self.check_writable()?;
        let key = website_cache_key(company, keywords);
        let now = timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO website_cache (key_hash, company, keywords, domain, url, is_homepage, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(key_hash) DO UPDATE SET
                   domain = excluded.domain,
                   url = excluded.url,
                   is_homepage = excluded.is_homepage,
                   fetched_at = excluded.fetched_at",
                params![
                    key.as_str(),
                    company,
                    keywords,
                    website.domain.as_str(),
                    website.url.as_str(),
                    website.is_homepage as i64,
                    now.as_str()
                ],
            )
            .await
            .map_err(sql)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Runs and contacts
    // -----------------------------------------------------------------------

    /// Record the start of a run.
    pub async fn insert_run(&self, run_id: &RunId) -> Result<()> {
        self.check_writable()?;
        let id = run_id.to_string();
        let now = timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(sql)?;
        Ok(())
    }

    /// Mark a run finished with its final status and summary counters.
    pub async fn finish_run(&self, run_id: &RunId, status: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let id = run_id.to_string();
        let now = timestamp(Utc::now());
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, status = ?2, stats_json = ?3 WHERE id = ?4",
                params![now.as_str(), status, stats_json, id.as_str()],
            )
            .await
            .map_err(sql)?;
        Ok(())
    }

    /// Append an emitted contact to a run.
    pub async fn insert_contact(&self, run_id: &RunId, contact: &DecisionMaker) -> Result<()> {
        self.check_writable()?;
        let id = run_id.to_string();
        let found_at = timestamp(contact.found_at);
        self.conn
            .execute(
                "INSERT INTO contacts (run_id, company, full_name, title, email, profile_url, found_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    contact.company_name.as_str(),
                    contact.full_name.as_str(),
                    contact.title.as_str(),
                    contact.email.as_str(),
                    contact.profile_url.as_str(),
                    found_at.as_str()
                ],
            )
            .await
            .map_err(sql)?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT r.id, r.started_at, r.finished_at, r.status, r.stats_json,
                        (SELECT COUNT(*) FROM contacts c WHERE c.run_id = r.id)
                 FROM runs r
                 ORDER BY r.id DESC
                 LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(sql)?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await.map_err(sql)? {
            runs.push(RunRecord {
                id: row.get(0).map_err(sql)?,
                started_at: row.get(1).map_err(sql)?,
                finished_at: row.get(2).map_err(sql)?,
                status: row.get(3).map_err(sql)?,
                stats_json: row.get(4).map_err(sql)?,
                contacts: row.get::<i64>(5).map_err(sql)? as u64,
            });
        }
        Ok(runs)
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            email_entries: self.count("email_cache").await?,
            website_entries: self.count("website_cache").await?,
            runs: self.count("runs").await?,
            contacts: self.count("contacts").await?,
        })
    }

    /// Drop every cached lookup. Run history is kept.
    pub async fn clear_cache(&self) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute_batch("DELETE FROM email_cache; DELETE FROM website_cache;")
            .await
            .map_err(sql)?;
        Ok(())
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), params![])
            .await
            .map_err(sql)?;
        match rows.next().await.map_err(sql)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(sql)? as u64),
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// SHA-256 hex digest of the normalized (company, keywords) pair.
pub fn website_cache_key(company: &str, keywords: &str) -> String {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(norm(company).as_bytes());
    hasher.update([0u8]);
    hasher.update(norm(keywords).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fixed-width UTC timestamp so stored values compare lexicographically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn cutoff(ttl_days: u32) -> String {
    if ttl_days == 0 {
        return String::new();
    }
    timestamp(Utc::now() - Duration::days(i64::from(ttl_days)))
}

fn sql(e: libsql::Error) -> ProspectorError {
    ProspectorError::Storage(e.to_string())
}
