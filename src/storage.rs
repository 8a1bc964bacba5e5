//! Where finished tickets go: a local directory and/or an S3-compatible
//! object store.

use std::fs;
use std::path::PathBuf;

use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::config::StorageSettings;
use crate::error::StorageError;

/// Prefix for ticket objects inside the bucket.
const KEY_PREFIX: &str = "tickets";
const CONTENT_TYPE: &str = "application/pdf";

/// Name, object key and public URL of one passenger's ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFile {
    /// `{ticket_id}-{first}-{last}.pdf`
    pub filename: String,
    /// `tickets/{filename}`
    pub key: String,
    pub url: String,
}

impl TicketFile {
    pub fn new(ticket_id: i64, first_name: &str, last_name: &str, settings: &StorageSettings) -> Self {
        let filename = format!("{}-{}-{}.pdf", ticket_id, first_name, last_name);
        let key = format!("{}/{}", KEY_PREFIX, filename);
        let url = format!(
            "https://{}/{}/{}/{}",
            settings.endpoint.trim_end_matches('/'),
            settings.bucket,
            KEY_PREFIX,
            urlencoding::encode(&filename)
        );
        TicketFile { filename, key, url }
    }
}

/// Saves tickets under a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalStore { dir: dir.into() }
    }

    /// Write `bytes` as `filename`, creating the directory first if needed.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.display().to_string(),
            source,
        })?;

        let path = self.dir.join(filename);
        fs::write(&path, bytes).map_err(|source| StorageError::Write {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved ticket locally");
        Ok(path)
    }
}

/// Uploads tickets to an S3-compatible bucket with SigV4-signed requests.
pub struct ObjectStore {
    bucket: Box<Bucket>,
}

impl ObjectStore {
    /// Client for `settings.bucket` on `settings.endpoint`, addressed
    /// path-style so MinIO and other self-hosted stores work.
    pub fn new(settings: &StorageSettings) -> Result<Self, StorageError> {
        let client_error = |reason: String| StorageError::Client {
            bucket: settings.bucket.clone(),
            reason,
        };

        let credentials = Credentials::new(
            Some(&settings.access_key_id),
            Some(&settings.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| client_error(e.to_string()))?;

        let bucket = Bucket::new(&settings.bucket, endpoint_region(settings), credentials)
            .map_err(|e| client_error(e.to_string()))?
            .with_path_style();

        Ok(ObjectStore { bucket })
    }

    /// Blocking; call from a worker thread.
    pub fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, bytes, CONTENT_TYPE)
            .map_err(|e| StorageError::Upload {
                bucket: self.bucket.name(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            bucket = %self.bucket.name(),
            key,
            status = response.status_code(),
            bytes = bytes.len(),
            "uploaded ticket"
        );
        Ok(())
    }
}

fn endpoint_region(settings: &StorageSettings) -> Region {
    let scheme = if settings.use_ssl { "https" } else { "http" };
    Region::Custom {
        region: settings.region.clone(),
        endpoint: format!("{}://{}", scheme, settings.endpoint.trim_end_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StorageSettings {
        StorageSettings {
            local_save: true,
            dir_name: PathBuf::from("tickets"),
            upload: false,
            endpoint: "storage.example.com".to_string(),
            bucket: "tickets-bucket".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            use_ssl: true,
        }
    }

    #[test]
    fn test_ticket_file_naming() {
        let file = TicketFile::new(123, "JOHN", "DOE", &settings());
        assert_eq!(file.filename, "123-JOHN-DOE.pdf");
        assert_eq!(file.key, "tickets/123-JOHN-DOE.pdf");
        assert_eq!(file.url, "https://storage.example.com/tickets-bucket/tickets/123-JOHN-DOE.pdf");
    }

    #[test]
    fn test_ticket_url_is_escaped() {
        let file = TicketFile::new(7, "MARY ANN", "O'NEIL", &settings());
        assert_eq!(file.filename, "7-MARY ANN-O'NEIL.pdf");
        assert!(file.url.ends_with("/tickets/7-MARY%20ANN-O%27NEIL.pdf"));
    }

    #[test]
    fn test_local_store_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("tickets");

        let path = LocalStore::new(&dir).save("123-JOHN-DOE.pdf", b"%PDF-1.3").unwrap();

        assert_eq!(path, dir.join("123-JOHN-DOE.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.3");
    }

    #[test]
    fn test_local_store_reports_blocked_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("tickets");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = LocalStore::new(&blocker).save("a.pdf", b"x").unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }));
    }

    #[test]
    fn test_endpoint_scheme_follows_use_ssl() {
        let mut s = settings();
        s.endpoint = "minio.local:9000/".to_string();
        assert_eq!(endpoint_region(&s).endpoint(), "https://minio.local:9000");

        s.use_ssl = false;
        let region = endpoint_region(&s);
        assert_eq!(region.endpoint(), "http://minio.local:9000");
        assert_eq!(region.to_string(), "us-east-1");
    }

    #[test]
    fn test_upload_failure_names_bucket_and_key() {
        let mut s = settings();
        // Nothing listens here
        s.endpoint = "127.0.0.1:9".to_string();
        s.use_ssl = false;
        let store = ObjectStore::new(&s).unwrap();

        let err = store.upload("tickets/1-A-B.pdf", b"%PDF-1.3").unwrap_err();
        match err {
            StorageError::Upload { bucket, key, .. } => {
                assert_eq!(bucket, "tickets-bucket");
                assert_eq!(key, "tickets/1-A-B.pdf");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
