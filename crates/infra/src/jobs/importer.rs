use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use verihire_audit::{AuditAction, AuditEntry, AuditLogStore, ActorMeta, EntityRef};
use verihire_core::TenantId;
use verihire_directory::store::DirectoryStore;
use verihire_directory::{Employee, EmployeePii};
use verihire_pii::FieldCipher;

use crate::mail::MailSender;

use super::store::JobStore;
use super::types::{BulkJob, RowError};

/// One parsed input row. The source format (CSV, spreadsheet upload) is
/// dealt with before rows reach the importer.
#[derive(Debug, Clone)]
pub struct EmployeeRow {
    pub row_number: usize,
    pub pii: EmployeePii,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("job store failure: {0}")]
    JobStore(String),
}

pub struct EmployeeBulkImporter {
    directory: Arc<dyn DirectoryStore>,
    jobs: Arc<dyn JobStore>,
    audit: Arc<dyn AuditLogStore>,
    mail: Arc<dyn MailSender>,
}

impl EmployeeBulkImporter {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        jobs: Arc<dyn JobStore>,
        audit: Arc<dyn AuditLogStore>,
        mail: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            directory,
            jobs,
            audit,
            mail,
        }
    }

    /// Import `rows` into `company`. Row failures are recorded on the job
    /// and never abort the run; the job always reaches a terminal status.
    pub async fn run(
        &self,
        company: TenantId,
        rows: Vec<EmployeeRow>,
        cipher: &FieldCipher,
        actor: ActorMeta,
        notify: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BulkJob, ImportError> {
        let mut job = BulkJob::new(company, "employee_import", now);
        job.start(rows.len(), now);
        self.save(&job).await?;

        for row in rows {
            match self.import_row(company, &row, cipher, &actor, now).await {
                Ok(()) => job.row_succeeded(now),
                Err(error) => job.row_failed(error, now),
            }
            self.save(&job).await?;
        }

        job.finish(now);
        self.save(&job).await?;

        let entry = AuditEntry::new(AuditAction::BulkImport, actor, now)
            .entity(EntityRef::new("employees", company))
            .description(format!("bulk employee import for company {company}"))
            .extra("record_count", json!(job.succeeded))
            .extra("error_count", json!(job.errors.len()));
        if let Err(err) = self.audit.append(entry).await {
            tracing::warn!(error = %err, "failed to append bulk import audit entry");
        }

        if let Some(to) = notify {
            let subject = format!("Bulk import {}", job.id);
            let body = format!(
                "Imported {} of {} rows ({} failed).",
                job.succeeded,
                job.total_rows,
                job.errors.len()
            );
            if let Err(err) = self.mail.send(to, &subject, &body).await {
                tracing::warn!(error = %err, "bulk import completion mail failed");
            }
        }

        Ok(job)
    }

    async fn import_row(
        &self,
        company: TenantId,
        row: &EmployeeRow,
        cipher: &FieldCipher,
        actor: &ActorMeta,
        now: DateTime<Utc>,
    ) -> Result<(), RowError> {
        let employee =
            Employee::new(company, &row.pii, cipher, actor.user, now).map_err(|e| RowError {
                row: row.row_number,
                field: Some("name".to_string()),
                message: e.to_string(),
            })?;

        let entry = AuditEntry::new(AuditAction::Create, actor.clone(), now)
            .entity(EntityRef::new("employees", employee.id))
            .snapshots(None, Some(employee.snapshot()))
            .description(format!("bulk import row {}", row.row_number));

        self.directory
            .create_employee(employee, entry)
            .await
            .map_err(|e| RowError {
                row: row.row_number,
                field: None,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn save(&self, job: &BulkJob) -> Result<(), ImportError> {
        self.jobs
            .put(job.clone())
            .await
            .map_err(|e| ImportError::JobStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use verihire_audit::store::AuditLogFilter;
    use verihire_directory::Company;
    use verihire_directory::store::DirectoryStore;

    use crate::jobs::types::JobStatus;
    use crate::jobs::InMemoryJobStore;
    use crate::mail::LogMailSender;
    use crate::memory::{InMemoryAuditLogStore, InMemoryDirectoryStore};

    fn cipher() -> FieldCipher {
        FieldCipher::new(&[9u8; 32])
    }

    fn row(n: usize, name: &str) -> EmployeeRow {
        EmployeeRow {
            row_number: n,
            pii: EmployeePii {
                name: name.to_string(),
                employee_ref: format!("EMP-{n:03}"),
                email: format!("e{n}@acme.example"),
                phone: String::new(),
            },
        }
    }

    async fn setup() -> (
        EmployeeBulkImporter,
        Arc<InMemoryDirectoryStore>,
        Arc<InMemoryAuditLogStore>,
        TenantId,
    ) {
        let audit = Arc::new(InMemoryAuditLogStore::new());
        let directory = Arc::new(InMemoryDirectoryStore::new(audit.clone()));
        let company = Company::new(
            "Acme",
            "REG-001",
            "2020-01-01".parse().unwrap(),
            "1 Main St",
            "J. Doe",
            "contact@acme.example",
            None,
            Utc::now(),
        )
        .unwrap();
        let tenant = directory
            .create_company(
                company,
                AuditEntry::new(AuditAction::Create, ActorMeta::system(), Utc::now()),
            )
            .await
            .unwrap();

        let importer = EmployeeBulkImporter::new(
            directory.clone() as Arc<dyn DirectoryStore>,
            Arc::new(InMemoryJobStore::new()) as Arc<dyn JobStore>,
            audit.clone() as Arc<dyn AuditLogStore>,
            Arc::new(LogMailSender) as Arc<dyn MailSender>,
        );
        (importer, directory, audit, tenant)
    }

    #[tokio::test]
    async fn a_clean_import_completes_and_audits_the_count() {
        let (importer, directory, audit, tenant) = setup().await;
        let job = importer
            .run(
                tenant,
                vec![row(1, "Jane Doe"), row(2, "John Roe")],
                &cipher(),
                ActorMeta::system(),
                None,
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.succeeded, 2);

        let employees = directory
            .list_employees(verihire_directory::EmployeeFilter::for_company(tenant))
            .await
            .unwrap();
        assert_eq!(employees.len(), 2);

        let entries = audit
            .list(AuditLogFilter {
                action: Some(AuditAction::BulkImport),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].extra.get("record_count").unwrap(), &json!(2));
    }

    #[tokio::test]
    async fn invalid_rows_are_recorded_not_fatal() {
        let (importer, directory, _, tenant) = setup().await;
        let job = importer
            .run(
                tenant,
                vec![row(1, "Jane Doe"), row(2, ""), row(3, "John Roe")],
                &cipher(),
                ActorMeta::system(),
                None,
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Partial);
        assert_eq!(job.succeeded, 2);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].row, 2);

        let employees = directory
            .list_employees(verihire_directory::EmployeeFilter::for_company(tenant))
            .await
            .unwrap();
        assert_eq!(employees.len(), 2);
    }

    #[tokio::test]
    async fn an_entirely_bad_file_fails_the_job() {
        let (importer, _, _, tenant) = setup().await;
        let job = importer
            .run(
                tenant,
                vec![row(1, ""), row(2, " ")],
                &cipher(),
                ActorMeta::system(),
                Some("hr@acme.example"),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }
}
