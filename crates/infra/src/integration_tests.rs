//! Integration tests for the full request security pipeline over the
//! in-memory stores.
//!
//! Tests: login → session → authorization → audited mutation → audit trail,
//! plus lockout and rate-limit behavior end to end.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use verihire_audit::store::{AuditLogFilter, AuditLogStore, SecurityEventStore};
    use verihire_audit::{ActorMeta, AuditAction, AuditEntry, EntityRef};
    use verihire_auth::{Principal, RoleCatalog, RoleName};
    use verihire_core::{LockReason, SecurityError, TenantId, UserId};
    use verihire_directory::store::DirectoryStore;
    use verihire_directory::{Company, Employee, EmployeePii};
    use verihire_pii::FieldCipher;
    use verihire_security::credentials::{CredentialVerifier, LoginError, TokenIssuer, UserDirectory};
    use verihire_security::rate_limit::{CounterStore, RateLimiter};
    use verihire_security::{RequestContext, SecurityPipeline};

    use crate::memory::{
        InMemoryAuditLogStore, InMemoryCounterStore, InMemoryDirectoryStore,
        InMemorySecurityEventStore, InMemorySessionStore, InMemoryUserDirectory,
    };

    struct Harness {
        users: Arc<InMemoryUserDirectory>,
        sessions: Arc<InMemorySessionStore>,
        events: Arc<InMemorySecurityEventStore>,
        audit: Arc<InMemoryAuditLogStore>,
        directory: Arc<InMemoryDirectoryStore>,
        verifier: CredentialVerifier,
        pipeline: SecurityPipeline,
        cipher: FieldCipher,
    }

    fn harness() -> Harness {
        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let events = Arc::new(InMemorySecurityEventStore::new());
        let audit = Arc::new(InMemoryAuditLogStore::new());
        let directory = Arc::new(InMemoryDirectoryStore::new(audit.clone()));

        let verifier = CredentialVerifier::new(
            users.clone() as Arc<dyn UserDirectory>,
            sessions.clone() as Arc<dyn TokenIssuer>,
            events.clone() as Arc<dyn SecurityEventStore>,
            audit.clone() as Arc<dyn AuditLogStore>,
        );
        let limiter = RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()) as Arc<dyn CounterStore>,
            events.clone() as Arc<dyn SecurityEventStore>,
        );
        let pipeline = SecurityPipeline::new(
            limiter,
            RoleCatalog::builtin(),
            audit.clone() as Arc<dyn AuditLogStore>,
            events.clone() as Arc<dyn SecurityEventStore>,
        );

        Harness {
            users,
            sessions,
            events,
            audit,
            directory,
            verifier,
            pipeline,
            cipher: FieldCipher::new(&[3u8; 32]),
        }
    }

    fn ctx(ip: &str) -> RequestContext {
        RequestContext::capture(Some(ip), None, Some("test-agent"), None, Utc::now())
    }

    fn hr_manager(tenant: TenantId) -> Principal {
        Principal::new(UserId::new(), "hr")
            .with_profile(Some(RoleName::HrManager), Some(tenant))
    }

    async fn seed_company(h: &Harness) -> TenantId {
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
        h.directory
            .create_company(
                company,
                AuditEntry::new(AuditAction::Create, ActorMeta::system(), Utc::now()),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_session_and_audited_mutation_end_to_end() {
        let h = harness();
        let tenant = seed_company(&h).await;
        h.users.seed(hr_manager(tenant), "correct horse").unwrap();

        // Login and get a usable session.
        let now = Utc::now();
        let outcome = h
            .verifier
            .login(&ctx("203.0.113.5"), "hr", "correct horse", now)
            .await
            .unwrap();
        let principal = h
            .sessions
            .validate(&outcome.token)
            .await
            .unwrap()
            .expect("session must validate");

        // Authorized, audited employee creation.
        let request = ctx("203.0.113.5").with_principal(principal.clone());
        h.pipeline
            .check_rate_limit(&request, "/api/employees", now)
            .await
            .unwrap();
        h.pipeline
            .authorize(&request, &principal, "employee", "create", Some(&tenant), now)
            .await
            .unwrap();

        let pii = EmployeePii {
            name: "Jane Doe".to_string(),
            employee_ref: "EMP-001".to_string(),
            email: "jane@acme.example".to_string(),
            phone: String::new(),
        };
        let employee =
            Employee::new(tenant, &pii, &h.cipher, Some(principal.user_id), now).unwrap();
        let entry = AuditEntry::new(AuditAction::Create, request.actor_meta(), now)
            .entity(EntityRef::new("employees", employee.id))
            .snapshots(None, Some(employee.snapshot()));
        h.directory.create_employee(employee, entry).await.unwrap();

        // The trail holds LOGIN + company CREATE + employee CREATE, and no
        // plaintext PII anywhere.
        let entries = h.audit.list(AuditLogFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 3);
        let serialized = serde_json::to_string(&entries).unwrap();
        assert!(!serialized.contains("Jane Doe"));
        assert!(!serialized.contains("jane@acme.example"));
    }

    #[tokio::test]
    async fn five_failures_lock_the_ip_but_not_others() {
        let h = harness();
        let tenant = seed_company(&h).await;
        h.users.seed(hr_manager(tenant), "correct horse").unwrap();
        let now = Utc::now();

        for _ in 0..5 {
            let err = h
                .verifier
                .login(&ctx("203.0.113.5"), "hr", "wrong", now)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                LoginError::Denied(SecurityError::AuthenticationFailed)
            ));
        }

        // Sixth attempt from the same IP: locked even with the right password.
        let err = h
            .verifier
            .login(&ctx("203.0.113.5"), "hr", "correct horse", now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoginError::Denied(SecurityError::AccountLocked {
                reason: LockReason::TooManyAttempts
            })
        ));

        // A different IP is unaffected.
        h.verifier
            .login(&ctx("198.51.100.7"), "hr", "correct horse", now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cross_tenant_access_is_denied_and_recorded() {
        let h = harness();
        let tenant = seed_company(&h).await;
        let foreign = TenantId::new();
        let principal = hr_manager(tenant);
        let request = ctx("203.0.113.5").with_principal(principal.clone());

        let err = h
            .pipeline
            .authorize(
                &request,
                &principal,
                "employee",
                "retrieve",
                Some(&foreign),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, SecurityError::AuthorizationDenied);

        let events = h
            .events
            .list(Default::default())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn the_api_rate_limit_closes_after_a_hundred_requests() {
        let h = harness();
        let request = ctx("203.0.113.5");
        let now = Utc::now();
        for _ in 0..100 {
            h.pipeline
                .check_rate_limit(&request, "/api/employees", now)
                .await
                .unwrap();
        }
        let err = h
            .pipeline
            .check_rate_limit(&request, "/api/employees", now)
            .await
            .unwrap_err();
        assert_eq!(err, SecurityError::RateLimitExceeded { class: "api" });
    }
}
