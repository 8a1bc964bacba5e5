//! Request-level orchestration: one ticket per passenger, rendered and stored
//! on the blocking pool, at most `server.worker_limit` at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::assets::FontAssets;
use crate::config::{Settings, StorageSettings};
use crate::error::AppError;
use crate::model::{Adult, RequestData, Ticket};
use crate::qr::QrEncoder;
use crate::storage::{LocalStore, ObjectStore, TicketFile};
use crate::ticket;

/// Body of a `/generate` response.
#[derive(Debug, Default, Serialize)]
pub struct TicketResponse {
    /// `{first}-{last}-local-pdf` -> filename, `{first}-{last}-s3-storage-url` -> URL
    pub files: HashMap<String, String>,
    /// `{first}-{last}` -> reason, for passengers that could not be delivered
    pub errors: HashMap<String, String>,
}

struct Job {
    ticket: Arc<Ticket>,
    adult: Adult,
    fonts: Arc<FontAssets>,
    storage: Arc<StorageSettings>,
    store: Option<Arc<ObjectStore>>,
}

/// Render and store a ticket for every passenger of the first request entry.
/// One passenger failing does not stop the others.
pub async fn generate_tickets(settings: Arc<Settings>, requests: Vec<RequestData>) -> Result<TicketResponse, AppError> {
    // Only the first entry is rendered; the rest are ignored
    let Some(request) = requests.into_iter().next() else {
        return Err(AppError::BadRequest("request body contains no tickets".to_string()));
    };
    if request.user.adults.is_empty() {
        return Err(AppError::BadRequest("request contains no passengers".to_string()));
    }

    let font_settings = settings.fonts.clone();
    let fonts = tokio::task::spawn_blocking(move || FontAssets::load(&font_settings))
        .await
        .map_err(|e| AppError::Worker(e.to_string()))??;
    let fonts = Arc::new(fonts);
    let storage = Arc::new(settings.storage.clone());
    // Built once per request and shared by every passenger's upload
    let store = if storage.upload {
        Some(Arc::new(ObjectStore::new(&storage)?))
    } else {
        None
    };

    let limiter = Arc::new(Semaphore::new(settings.server.worker_limit.max(1)));
    let response = Arc::new(Mutex::new(TicketResponse::default()));
    let mut tasks = JoinSet::new();

    let ticket = Arc::new(request.ticket);
    for adult in request.user.adults {
        let job = Job {
            ticket: Arc::clone(&ticket),
            adult,
            fonts: Arc::clone(&fonts),
            storage: Arc::clone(&storage),
            store: store.clone(),
        };
        let limiter = Arc::clone(&limiter);
        let response = Arc::clone(&response);

        tasks.spawn(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .map_err(|e| AppError::Worker(e.to_string()))?;
            tokio::task::spawn_blocking(move || deliver(&job, &response))
                .await
                .map_err(|e| AppError::Worker(e.to_string()))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("ticket worker failed: {}", e),
            Err(e) => tracing::error!("ticket task panicked: {}", e),
        }
    }

    let response = Arc::try_unwrap(response)
        .map_err(|_| AppError::Worker("ticket workers still running".to_string()))?
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    tracing::info!(
        files = response.files.len(),
        errors = response.errors.len(),
        "ticket generation finished"
    );
    Ok(response)
}

/// Render, save and upload one passenger's ticket, recording the outcome.
fn deliver(job: &Job, response: &Mutex<TicketResponse>) {
    let key = format!("{}-{}", job.adult.first_name, job.adult.last_name);

    if let Err(e) = try_deliver(job, &key, response) {
        tracing::error!(passenger = %key, ticket = job.ticket.id, "failed to deliver ticket: {}", e);
        record(response, |r| r.errors.insert(key, e.to_string()));
    }
}

fn try_deliver(job: &Job, key: &str, response: &Mutex<TicketResponse>) -> Result<(), AppError> {
    let file = TicketFile::new(job.ticket.id, &job.adult.first_name, &job.adult.last_name, &job.storage);
    let rendered = ticket::render(&job.ticket, &job.adult, &file.url, &job.fonts, &QrEncoder)?;

    if !rendered.degraded.is_empty() {
        tracing::warn!(passenger = %key, fields = ?rendered.degraded, "ticket rendered with defaulted timestamps");
    }

    if job.storage.local_save {
        LocalStore::new(&job.storage.dir_name).save(&file.filename, &rendered.bytes)?;
        record(response, |r| r.files.insert(format!("{}-local-pdf", key), file.filename.clone()));
    }

    if let Some(store) = &job.store {
        store.upload(&file.key, &rendered.bytes)?;
        record(response, |r| r.files.insert(format!("{}-s3-storage-url", key), file.url.clone()));
    }

    if !job.storage.local_save && job.store.is_none() {
        tracing::warn!(passenger = %key, "ticket rendered but no storage is enabled");
    }
    Ok(())
}

fn record<T>(response: &Mutex<TicketResponse>, update: impl FnOnce(&mut TicketResponse) -> T) {
    let mut guard = response.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    update(&mut guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontSettings, ServerSettings};
    use crate::model::{Leg, Segment, User};
    use std::path::{Path, PathBuf};

    fn settings(dir: &Path, upload: bool) -> Arc<Settings> {
        Arc::new(Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                worker_limit: 2,
            },
            storage: StorageSettings {
                local_save: true,
                dir_name: dir.to_path_buf(),
                upload,
                // Nothing listens here, so uploads fail fast
                endpoint: "127.0.0.1:9".to_string(),
                bucket: "tickets-bucket".to_string(),
                region: "us-east-1".to_string(),
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                use_ssl: false,
            },
            fonts: FontSettings {
                regular: PathBuf::from("missing-regular.ttf"),
                bold: PathBuf::from("missing-bold.ttf"),
                builtin: true,
            },
        })
    }

    fn adult(first: &str, last: &str) -> Adult {
        Adult {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        }
    }

    fn request(adults: Vec<Adult>) -> RequestData {
        RequestData {
            ticket: Ticket {
                id: 123,
                price: "450.00".to_string(),
                currency: "USD".to_string(),
                itineraries: vec![Leg {
                    segments: vec![Segment {
                        departure_time: "2024-05-01T08:00:00Z".to_string(),
                        arrival_time: "2024-05-01T11:30:00Z".to_string(),
                        departure_airport: "JFK".to_string(),
                        arrival_airport: "LAX".to_string(),
                        carrier: "AA100".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
            user: User {
                adults,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_one_ticket_per_passenger() {
        let tmp = tempfile::tempdir().unwrap();
        let adults = vec![adult("JOHN", "DOE"), adult("JANE", "DOE"), adult("MAX", "POWER")];

        let response = generate_tickets(settings(tmp.path(), false), vec![request(adults)])
            .await
            .unwrap();

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(response.files.len(), 3);
        assert_eq!(response.files["JANE-DOE-local-pdf"], "123-JANE-DOE.pdf");

        let saved = std::fs::read(tmp.path().join("123-JOHN-DOE.pdf")).unwrap();
        assert!(saved.starts_with(b"%PDF"));
        assert!(tmp.path().join("123-MAX-POWER.pdf").exists());
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported_per_passenger() {
        let tmp = tempfile::tempdir().unwrap();

        let response = generate_tickets(settings(tmp.path(), true), vec![request(vec![adult("JOHN", "DOE")])])
            .await
            .unwrap();

        // Saved locally before the upload was attempted
        assert_eq!(response.files.get("JOHN-DOE-local-pdf").map(String::as_str), Some("123-JOHN-DOE.pdf"));
        assert!(!response.files.contains_key("JOHN-DOE-s3-storage-url"));
        assert!(response.errors["JOHN-DOE"].contains("tickets/123-JOHN-DOE.pdf"));
        assert!(response.errors["JOHN-DOE"].contains("tickets-bucket"));
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();

        let err = generate_tickets(settings(tmp.path(), false), Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = generate_tickets(settings(tmp.path(), false), vec![request(Vec::new())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_only_first_entry_is_rendered() {
        let tmp = tempfile::tempdir().unwrap();
        let first = request(vec![adult("JOHN", "DOE")]);
        let mut second = request(vec![adult("JANE", "ROE")]);
        second.ticket.id = 456;

        let response = generate_tickets(settings(tmp.path(), false), vec![first, second])
            .await
            .unwrap();

        assert_eq!(response.files.len(), 1);
        assert!(response.files.contains_key("JOHN-DOE-local-pdf"));
        assert!(!tmp.path().join("456-JANE-ROE.pdf").exists());
    }

    #[tokio::test]
    async fn test_missing_fonts_fail_the_request() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = (*settings(tmp.path(), false)).clone();
        settings.fonts.builtin = false;

        let err = generate_tickets(Arc::new(settings), vec![request(vec![adult("JOHN", "DOE")])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Render(crate::error::RenderError::AssetLoad { .. })));
    }
}
