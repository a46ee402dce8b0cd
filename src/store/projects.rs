//! Local project cache and the view-model operations over it.
//!
//! Mutations follow one pattern: snapshot the cached project and its
//! revision, send the change to the backend, then commit the confirmed
//! change only if the revision has not moved in the meantime. A failed
//! request never touches the cache; a stale one returns `Conflict`.
//!
//! Projects that were fetched through a token import but never saved
//! (`persisted == false`) live in the same cache. Column changes on them
//! stay local until `save` sends the whole project.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;

use crate::api::types::TokenImport;
use crate::api::ApiClient;
use crate::countdown::format_countdown;
use crate::errors::{ClientError, Result};
use crate::export::project_csv;
use crate::models::{AutoSync, NewToken, Project, SyncInterval, Token};
use crate::projection;

#[derive(Debug, Clone)]
struct CachedProject {
    project: Project,
    revision: u64,
}

#[derive(Clone)]
pub struct ProjectStore {
    api: ApiClient,
    cache: Arc<DashMap<String, CachedProject>>,
    /// Store-wide, so a uid that is evicted and re-added never gets a
    /// revision an older request may still hold.
    revisions: Arc<AtomicU64>,
}

impl ProjectStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Arc::new(DashMap::new()),
            revisions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Snapshot of every cached project, ordered by name then uid.
    pub fn projects(&self) -> Vec<Project> {
        let mut all: Vec<Project> = self.cache.iter().map(|e| e.project.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uid.cmp(&b.uid)));
        all
    }

    pub fn get(&self, uid: &str) -> Result<Project> {
        self.snapshot(uid).map(|(p, _)| p)
    }

    pub fn revision(&self, uid: &str) -> Result<u64> {
        self.snapshot(uid).map(|(_, r)| r)
    }

    /// Countdown to the next auto-sync, `None` while auto-sync is off.
    pub fn countdown(&self, uid: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let (project, _) = self.snapshot(uid)?;
        Ok(project
            .auto_sync
            .next_sync()
            .map(|at| format_countdown(at, now)))
    }

    pub fn export_csv(&self, uid: &str) -> Result<String> {
        let (project, _) = self.snapshot(uid)?;
        Ok(project_csv(&project))
    }

    // ── Loading ───────────────────────────────────────────────

    /// Replace every saved project with the backend's list. Staged
    /// (unsaved) projects the backend does not know about are kept.
    pub async fn load(&self) -> Result<usize> {
        let projects = self.api.list_projects().await?;
        let count = projects.len();

        let incoming: Vec<String> = projects.iter().map(|p| p.uid.clone()).collect();
        self.cache
            .retain(|uid, cached| !cached.project.persisted || incoming.contains(uid));

        for mut project in projects {
            project.persisted = true;
            project.normalize();
            self.replace(project);
        }

        tracing::info!(projects = count, "project cache loaded");
        Ok(count)
    }

    /// Re-fetch one project, including its submissions.
    pub async fn refresh(&self, uid: &str) -> Result<Project> {
        let mut project = self.api.get_project(uid).await?;
        project.persisted = true;
        project.normalize();
        self.replace(project.clone());
        tracing::debug!(uid, submissions = project.submissions.len(), "project refreshed");
        Ok(project)
    }

    /// Add a project that only exists locally so far.
    pub fn stage(&self, mut project: Project) {
        if self
            .cache
            .get(&project.uid)
            .map(|c| c.project.persisted)
            .unwrap_or(false)
        {
            tracing::debug!(uid = %project.uid, "already saved, not staging");
            return;
        }
        project.persisted = false;
        project.normalize();
        self.replace(project);
    }

    // ── Tokens ────────────────────────────────────────────────

    pub async fn list_tokens(&self) -> Result<Vec<Token>> {
        self.api.list_tokens().await
    }

    /// Register a token and stage every project it exposes.
    pub async fn add_token(&self, token: NewToken) -> Result<TokenImport> {
        let import = self.api.add_token(&token).await?;
        drop(token);
        for project in import.projects.iter().cloned() {
            self.stage(project);
        }
        Ok(import)
    }

    pub async fn delete_token(&self, id: &str) -> Result<()> {
        self.api.delete_token(id).await?;
        tracing::info!(token_id = id, "token deleted");
        Ok(())
    }

    // ── Project lifecycle ─────────────────────────────────────

    pub async fn save(&self, uid: &str) -> Result<Project> {
        let (project, seen) = self.snapshot(uid)?;
        self.api.save_project(&project).await?;
        let saved = self.commit(uid, seen, |p| p.persisted = true)?;
        tracing::info!(uid, "project saved");
        Ok(saved)
    }

    /// Save one project. When it is not cached yet and a token is given,
    /// the token is registered first so its projects get staged.
    pub async fn save_or_import(&self, uid: &str, token: Option<NewToken>) -> Result<Project> {
        if !self.cache.contains_key(uid) {
            if let Some(token) = token {
                let import = self.add_token(token).await?;
                tracing::debug!(uid, staged = import.projects.len(), "token imported for save");
            }
        }
        self.save(uid).await
    }

    /// Ask the backend to pull fresh submissions. Returns the new total,
    /// or the cached one when the backend did not report a count.
    pub async fn sync(&self, uid: &str) -> Result<u64> {
        let (project, seen) = self.snapshot(uid)?;
        require_saved(&project)?;

        let result = self.api.sync_project(uid).await?;
        let now = Utc::now();
        let synced = self.commit(uid, seen, |p| {
            if let Some(total) = result.total_submissions {
                p.total_submissions = total;
            }
            p.last_sync_at = Some(now);
        })?;
        tracing::info!(
            uid,
            total = synced.total_submissions,
            reported = result.total_submissions.is_some(),
            "project synced"
        );
        Ok(synced.total_submissions)
    }

    /// Sync every saved project concurrently. One failure does not stop
    /// the others.
    pub async fn sync_all(&self) -> Vec<(String, Result<u64>)> {
        let uids: Vec<String> = self
            .cache
            .iter()
            .filter(|e| e.project.persisted)
            .map(|e| e.key().clone())
            .collect();

        let results = join_all(uids.iter().map(|uid| self.sync(uid))).await;
        uids.into_iter().zip(results).collect()
    }

    pub async fn delete(&self, uid: &str) -> Result<()> {
        let (project, _) = self.snapshot(uid)?;
        if project.persisted {
            self.api.delete_project(uid).await?;
        }
        self.cache.remove(uid);
        tracing::info!(uid, persisted = project.persisted, "project removed");
        Ok(())
    }

    // ── Column projection ─────────────────────────────────────

    /// Toggle one column. Unknown columns are ignored and nothing is sent.
    pub async fn toggle_column(&self, uid: &str, column: &str) -> Result<Vec<String>> {
        let (project, seen) = self.snapshot(uid)?;
        match projection::toggled(&project, column) {
            Some(next) => self.write_columns(&project, seen, next).await,
            None => {
                tracing::debug!(uid, column, "ignoring toggle of unavailable column");
                Ok(project.selected_columns)
            }
        }
    }

    pub async fn select_all(&self, uid: &str) -> Result<Vec<String>> {
        let (project, seen) = self.snapshot(uid)?;
        let next = projection::all_selected(&project);
        self.write_columns(&project, seen, next).await
    }

    pub async fn clear_all(&self, uid: &str) -> Result<Vec<String>> {
        let (project, seen) = self.snapshot(uid)?;
        self.write_columns(&project, seen, projection::none_selected())
            .await
    }

    pub async fn set_columns(&self, uid: &str, columns: &[String]) -> Result<Vec<String>> {
        let (project, seen) = self.snapshot(uid)?;
        let next = projection::validated(&project, columns)?;
        self.write_columns(&project, seen, next).await
    }

    async fn write_columns(
        &self,
        project: &Project,
        seen: u64,
        next: Vec<String>,
    ) -> Result<Vec<String>> {
        if next == project.selected_columns {
            return Ok(next);
        }

        if project.persisted {
            if let Err(e) = self.api.update_columns(&project.uid, &next).await {
                tracing::warn!(uid = %project.uid, kind = e.kind(), error = %e, "column update failed");
                return Err(e);
            }
        }

        let committed = self.commit(&project.uid, seen, |p| {
            p.selected_columns = next;
        })?;
        Ok(committed.selected_columns)
    }

    // ── Auto-sync ─────────────────────────────────────────────

    /// Change the auto-sync schedule. On success the cached next-sync
    /// time becomes a local estimate (`now + interval`).
    pub async fn configure_auto_sync(
        &self,
        uid: &str,
        enabled: bool,
        interval_seconds: u64,
    ) -> Result<AutoSync> {
        if enabled {
            SyncInterval::from_secs(interval_seconds)?;
        }
        let (project, seen) = self.snapshot(uid)?;
        require_saved(&project)?;

        let ack = self
            .api
            .configure_auto_sync(uid, enabled, interval_seconds)
            .await?;

        let now = Utc::now();
        let committed = self.commit(uid, seen, |p| {
            p.auto_sync.reschedule(enabled, interval_seconds, now);
        })?;

        tracing::info!(
            uid,
            enabled,
            interval_seconds,
            message = ack.message.as_deref().unwrap_or_default(),
            "auto-sync configured"
        );
        Ok(committed.auto_sync)
    }

    // ── Cache internals ───────────────────────────────────────

    fn snapshot(&self, uid: &str) -> Result<(Project, u64)> {
        self.cache
            .get(uid)
            .map(|c| (c.project.clone(), c.revision))
            .ok_or_else(|| ClientError::ProjectNotFound(uid.to_string()))
    }

    /// Insert or overwrite, always moving the revision forward so any
    /// request that started before the overwrite is treated as stale.
    fn replace(&self, project: Project) {
        let uid = project.uid.clone();
        let revision = self.next_revision();
        self.cache.insert(uid, CachedProject { project, revision });
    }

    fn next_revision(&self) -> u64 {
        self.revisions.fetch_add(1, Ordering::Relaxed)
    }

    fn commit<F>(&self, uid: &str, seen: u64, apply: F) -> Result<Project>
    where
        F: FnOnce(&mut Project),
    {
        let mut entry = self
            .cache
            .get_mut(uid)
            .ok_or_else(|| ClientError::ProjectNotFound(uid.to_string()))?;

        if entry.revision != seen {
            tracing::warn!(
                uid,
                seen,
                current = entry.revision,
                "discarding stale response"
            );
            return Err(ClientError::Conflict {
                uid: uid.to_string(),
            });
        }

        apply(&mut entry.project);
        entry.revision = self.next_revision();
        Ok(entry.project.clone())
    }
}

fn require_saved(project: &Project) -> Result<()> {
    if project.persisted {
        Ok(())
    } else {
        Err(ClientError::NotSaved(project.uid.clone()))
    }
}
