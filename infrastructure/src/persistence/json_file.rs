//! JSON file ticket repository
//!
//! The whole ticket set is one JSON document. Every write serializes a new
//! snapshot to a sibling temp file and renames it over the old one, so a
//! crash leaves either the previous or the next snapshot on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use council_application::{RepositoryError, TicketRepository};
use council_domain::{EscalationTicket, RequestId, TicketId, TicketStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    tickets: Vec<EscalationTicket>,
}

pub struct JsonFileTicketRepository {
    path: PathBuf,
    /// Held across the file write so snapshots never interleave
    tickets: Mutex<Vec<EscalationTicket>>,
}

impl JsonFileTicketRepository {
    /// Open the store at `path`; a missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let tickets = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| RepositoryError::Serialization(format!("{}: {}", path.display(), e)))?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(RepositoryError::Serialization(format!(
                        "{}: unsupported snapshot version {}",
                        path.display(),
                        snapshot.version
                    )));
                }
                snapshot.tickets
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(storage(&path, e)),
        };
        debug!(path = %path.display(), tickets = tickets.len(), "Ticket store opened");
        Ok(Self {
            path,
            tickets: Mutex::new(tickets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tickets: &[EscalationTicket]) -> Result<(), RepositoryError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            tickets: tickets.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| storage(dir, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| storage(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage(&self.path, e))
    }
}

fn storage(path: &Path, e: std::io::Error) -> RepositoryError {
    RepositoryError::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl TicketRepository for JsonFileTicketRepository {
    async fn insert(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.lock().await;
        super::insert_into(&mut tickets, ticket)?;
        if let Err(e) = self.persist(&tickets).await {
            tickets.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.lock().await;
        let previous = super::replace_in(&mut tickets, ticket)?;
        if let Err(e) = self.persist(&tickets).await {
            super::replace_in(&mut tickets, &previous)?;
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &TicketId) -> Result<Option<EscalationTicket>, RepositoryError> {
        Ok(self.tickets.lock().await.iter().find(|t| &t.id == id).cloned())
    }

    async fn find_pending(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<EscalationTicket>, RepositoryError> {
        Ok(super::pending_of(&self.tickets.lock().await, request_id))
    }

    async fn list(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<EscalationTicket>, RepositoryError> {
        Ok(super::filter_status(&self.tickets.lock().await, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tickets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tickets.json");

        let repo = JsonFileTicketRepository::open(&path).await.unwrap();
        let mut ticket = EscalationTicket::pending(RequestId::new("r1"), "max rounds exceeded");
        repo.insert(&ticket).await.unwrap();
        ticket.resolve("bob", "fine");
        repo.update(&ticket).await.unwrap();
        repo.insert(&EscalationTicket::pending(RequestId::new("r2"), "deadlock"))
            .await
            .unwrap();

        let reopened = JsonFileTicketRepository::open(&path).await.unwrap();
        let all = reopened.list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, TicketStatus::Resolved);
        assert_eq!(all[0].resolution.as_deref(), Some("fine"));
        assert!(reopened.find_pending(&RequestId::new("r2")).await.unwrap().is_some());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileTicketRepository::open(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(repo.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileTicketRepository::open(&path).await,
            Err(RepositoryError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // The store path is a directory, so the rename fails
        let path = dir.path().join("blocked");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let repo = JsonFileTicketRepository {
            path: path.clone(),
            tickets: Mutex::new(Vec::new()),
        };
        let ticket = EscalationTicket::pending(RequestId::new("r1"), "x");
        assert!(matches!(
            repo.insert(&ticket).await,
            Err(RepositoryError::Storage(_))
        ));
        assert!(repo.list(None).await.unwrap().is_empty());
    }
}
