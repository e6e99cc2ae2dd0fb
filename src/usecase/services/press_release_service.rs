use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::domain::entities::error::{BackendError, FieldError, INVALID_PAYLOAD, ROW_NOT_FOUND};
use crate::domain::entities::row::{row_str, Row};
use crate::usecase::ports::backend::{CollectionBackend, ObjectStore};
use crate::usecase::ports::notifier::{Notification, Notifier};
use crate::usecase::services::crud_service::QueryCache;
use crate::usecase::services::record_service::RecordService;

pub const PRESS_RELEASES: &str = "press_releases";
pub const REJECTIONS: &str = "press-release-rejections";
pub const USERS: &str = "users";
pub const REPORT_BUCKET: &str = "press-release-reports";

const PDF_MAGIC: &[u8] = b"%PDF-";
const REASON_MIN: usize = 10;
const REASON_MAX: usize = 1000;

/// Trimmed rejection reason of 10 to 1000 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason(String);

impl RejectionReason {
    pub fn parse(text: &str) -> Result<Self, FieldError> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        if length < REASON_MIN {
            return Err(FieldError::new(
                "reason",
                "Reason must be at least 10 characters long",
            ));
        }
        if length > REASON_MAX {
            return Err(FieldError::new(
                "reason",
                "Reason must not exceed 1000 characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub release_id: String,
    pub user_id: String,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportReceipt {
    pub upload_path: String,
    pub report_url: String,
}

pub fn is_pdf(file_name: &str, bytes: &[u8]) -> bool {
    file_name.to_ascii_lowercase().ends_with(".pdf") && bytes.starts_with(PDF_MAGIC)
}

/// `<user>/<release>/<millis>-<name>`
pub fn report_path(upload: &ReportUpload, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}-{}",
        upload.user_id,
        upload.release_id,
        now.timestamp_millis(),
        upload.file_name
    )
}

/// Moderation actions on press releases: approve, reject, attach a report.
pub struct PressReleaseService {
    backend: Arc<dyn CollectionBackend>,
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<QueryCache>,
}

impl PressReleaseService {
    pub fn new(
        backend: Arc<dyn CollectionBackend>,
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            backend,
            store,
            notifier,
            cache,
        }
    }

    fn records(&self, collection: &str) -> RecordService {
        RecordService::new(
            collection,
            self.backend.clone(),
            self.notifier.clone(),
            self.cache.clone(),
        )
    }

    fn release_id(release: &Row) -> Result<Value, BackendError> {
        match release.get("id") {
            Some(id) if !id.is_null() => Ok(id.clone()),
            _ => Err(BackendError::new(INVALID_PAYLOAD, "No press release selected")),
        }
    }

    fn fail(&self, err: BackendError) -> BackendError {
        self.notifier.notify(Notification::error(err.message.clone()));
        err
    }

    pub fn approve(&self, release: &Row) -> Result<Row, BackendError> {
        let id = Self::release_id(release).map_err(|err| self.fail(err))?;
        if row_str(release, "admin_status") == Some("approved") {
            return Err(self.fail(BackendError::new(
                INVALID_PAYLOAD,
                "Press release already approved",
            )));
        }
        let mut patch = Row::new();
        patch.insert("admin_status".to_string(), json!("approved"));
        log::info!("approving press release {id}");
        self.records(PRESS_RELEASES).update(id, &patch)
    }

    /// Records the reason for the author and marks the release rejected.
    pub fn reject(&self, release: &Row, reason: &RejectionReason) -> Result<Row, BackendError> {
        let id = Self::release_id(release).map_err(|err| self.fail(err))?;
        let user_id = release.get("user_id").cloned().unwrap_or(Value::Null);

        let email = self
            .records(USERS)
            .fetch_one("user_id", user_id)
            .ok()
            .and_then(|user| row_str(&user, "email").map(str::to_string))
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                self.fail(BackendError::new(
                    ROW_NOT_FOUND,
                    "User email not loaded. Please try again.",
                ))
            })?;

        let mut rejection = Row::new();
        rejection.insert("release_id".to_string(), id.clone());
        rejection.insert("reason".to_string(), json!(reason.as_str()));
        rejection.insert("email".to_string(), json!(email));

        let mut patch = Row::new();
        patch.insert("admin_status".to_string(), json!("rejected"));

        let result = self
            .records(REJECTIONS)
            .create(&rejection)
            .and_then(|_| self.records(PRESS_RELEASES).update(id.clone(), &patch));
        match &result {
            Ok(_) => {
                log::info!("rejected press release {id}");
                self.notifier.notify(Notification::success(
                    "Press release has been rejected successfully",
                ));
            }
            Err(err) => {
                log::warn!("rejecting press release {id} failed: {err}");
                self.notifier.notify(Notification::error(
                    "Failed to reject press release. Please try again.",
                ));
            }
        }
        result
    }

    /// Stores the PDF and points the release at it.
    pub fn upload_report(
        &self,
        upload: &ReportUpload,
        now: DateTime<Utc>,
    ) -> Result<ReportReceipt, BackendError> {
        self.try_upload_report(upload, now).map_err(|err| {
            log::warn!("report upload for {} failed: {err}", upload.release_id);
            let message = if err.message.trim().is_empty() {
                "Failed to upload report. Please try again.".to_string()
            } else {
                err.message.clone()
            };
            self.notifier.notify(Notification::error(message));
            err
        })
    }

    fn try_upload_report(
        &self,
        upload: &ReportUpload,
        now: DateTime<Utc>,
    ) -> Result<ReportReceipt, BackendError> {
        let missing = upload.bytes.is_empty()
            || upload.release_id.trim().is_empty()
            || upload.user_id.trim().is_empty()
            || upload.user_email.trim().is_empty();
        if missing {
            return Err(BackendError::new(INVALID_PAYLOAD, "Missing required fields"));
        }
        if !is_pdf(&upload.file_name, &upload.bytes) {
            return Err(BackendError::new(INVALID_PAYLOAD, "File must be a PDF"));
        }

        let upload_path = report_path(upload, now);
        let stored = self.store.put(
            &format!("{REPORT_BUCKET}/{upload_path}"),
            &upload.bytes,
            "application/pdf",
        )?;
        let report_url = self.store.public_url(&stored);

        let mut patch = Row::new();
        patch.insert("pr_pdf_url".to_string(), json!(report_url));
        patch.insert(
            "report_sent_at".to_string(),
            json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let updated = self.backend.update(
            PRESS_RELEASES,
            "id",
            &Value::String(upload.release_id.clone()),
            &patch,
        )?;
        if updated.is_empty() {
            return Err(BackendError::new(
                ROW_NOT_FOUND,
                "Failed to update press release",
            ));
        }

        self.cache.invalidate(PRESS_RELEASES);
        log::info!("report for {} stored at {upload_path}", upload.release_id);
        self.notifier
            .notify(Notification::success("Report uploaded successfully"));
        Ok(ReportReceipt {
            upload_path,
            report_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejection_reason_bounds() {
        assert!(RejectionReason::parse("too short").is_err());
        assert_eq!(
            RejectionReason::parse("   Missing contact details  ")
                .expect("long enough")
                .as_str(),
            "Missing contact details"
        );
        let long = "x".repeat(1001);
        assert_eq!(
            RejectionReason::parse(&long).map_err(|e| e.message),
            Err("Reason must not exceed 1000 characters".to_string())
        );
    }

    #[test]
    fn pdf_detection_needs_extension_and_magic() {
        assert!(is_pdf("Report.PDF", b"%PDF-1.7 ..."));
        assert!(!is_pdf("report.pdf", b"PK\x03\x04"));
        assert!(!is_pdf("report.txt", b"%PDF-1.7"));
    }

    #[test]
    fn report_path_layout() {
        let upload = ReportUpload {
            file_name: "q2.pdf".to_string(),
            bytes: b"%PDF-".to_vec(),
            release_id: "r9".to_string(),
            user_id: "u1".to_string(),
            user_email: "u1@x.io".to_string(),
        };
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).single().expect("valid instant");
        assert_eq!(report_path(&upload, now), "u1/r9/1700000000123-q2.pdf");
    }
}
