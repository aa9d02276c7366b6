use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use verihire_auth::TenantScoped;
use verihire_core::{DomainError, DomainResult, EmployeeId, TenantId, UserId};
use verihire_pii::{EncryptedText, FieldCipher, PiiError};

/// Transient plaintext view of an employee's PII.
///
/// Built on demand for serialization/processing; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePii {
    pub name: String,
    pub employee_ref: String,
    pub email: String,
    pub phone: String,
}

/// An employee record. PII attributes are stored encrypted only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub company: TenantId,
    pub name: EncryptedText,
    pub employee_ref: EncryptedText,
    pub email: EncryptedText,
    pub phone: EncryptedText,
    pub is_active: bool,
    pub date_joined: NaiveDate,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Create a record from plaintext PII, encrypting it immediately.
    pub fn new(
        company: TenantId,
        pii: &EmployeePii,
        cipher: &FieldCipher,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if pii.name.trim().is_empty() {
            return Err(DomainError::validation("employee name cannot be empty"));
        }

        let encrypt = |value: &str| -> DomainResult<EncryptedText> {
            EncryptedText::from_plaintext(cipher, value)
                .map_err(|e: PiiError| DomainError::validation(e.to_string()))
        };

        Ok(Self {
            id: EmployeeId::new(),
            company,
            name: encrypt(&pii.name)?,
            employee_ref: encrypt(&pii.employee_ref)?,
            email: encrypt(&pii.email)?,
            phone: encrypt(&pii.phone)?,
            is_active: true,
            date_joined: now.date_naive(),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the PII attributes with newly encrypted values.
    pub fn update_pii(
        &mut self,
        pii: &EmployeePii,
        cipher: &FieldCipher,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if pii.name.trim().is_empty() {
            return Err(DomainError::validation("employee name cannot be empty"));
        }
        let encrypt = |value: &str| -> DomainResult<EncryptedText> {
            EncryptedText::from_plaintext(cipher, value)
                .map_err(|e: PiiError| DomainError::validation(e.to_string()))
        };
        self.name = encrypt(&pii.name)?;
        self.employee_ref = encrypt(&pii.employee_ref)?;
        self.email = encrypt(&pii.email)?;
        self.phone = encrypt(&pii.phone)?;
        self.updated_at = now;
        Ok(())
    }

    /// Materialize the plaintext PII transiently.
    pub fn pii(&self, cipher: &FieldCipher) -> EmployeePii {
        EmployeePii {
            name: self.name.reveal(cipher),
            employee_ref: self.employee_ref.reveal(cipher),
            email: self.email.reveal(cipher),
            phone: self.phone.reveal(cipher),
        }
    }

    /// Field snapshot for audit old/new values.
    ///
    /// PII fields are snapshotted in their stored (encrypted) form; audit
    /// rows never hold plaintext PII.
    pub fn snapshot(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("company".to_string(), json!(self.company.to_string()));
        map.insert("name".to_string(), json!(self.name.as_stored()));
        map.insert(
            "employee_ref".to_string(),
            json!(self.employee_ref.as_stored()),
        );
        map.insert("email".to_string(), json!(self.email.as_stored()));
        map.insert("phone".to_string(), json!(self.phone.as_stored()));
        map.insert("is_active".to_string(), json!(self.is_active));
        map.insert(
            "date_joined".to_string(),
            json!(self.date_joined.to_string()),
        );
        map
    }
}

impl TenantScoped for Employee {
    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new(&[5u8; 32])
    }

    fn pii() -> EmployeePii {
        EmployeePii {
            name: "Jane Doe".to_string(),
            employee_ref: "EMP-042".to_string(),
            email: "jane@acme.example".to_string(),
            phone: "+263 77 000 0000".to_string(),
        }
    }

    #[test]
    fn plaintext_never_appears_in_the_record() {
        let c = cipher();
        let employee = Employee::new(TenantId::new(), &pii(), &c, None, Utc::now()).unwrap();

        let serialized = serde_json::to_string(&employee).unwrap();
        assert!(!serialized.contains("Jane Doe"));
        assert!(!serialized.contains("jane@acme.example"));

        assert_eq!(employee.pii(&c), pii());
    }

    #[test]
    fn empty_optional_fields_stay_empty() {
        let c = cipher();
        let sparse = EmployeePii {
            name: "Jane Doe".to_string(),
            ..Default::default()
        };
        let employee = Employee::new(TenantId::new(), &sparse, &c, None, Utc::now()).unwrap();
        assert!(employee.email.is_empty());
        assert!(employee.phone.is_empty());
        assert_eq!(employee.pii(&c).email, "");
    }

    #[test]
    fn name_is_required() {
        let c = cipher();
        let err = Employee::new(
            TenantId::new(),
            &EmployeePii::default(),
            &c,
            None,
            Utc::now(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_holds_ciphertext_not_plaintext() {
        let c = cipher();
        let employee = Employee::new(TenantId::new(), &pii(), &c, None, Utc::now()).unwrap();
        let snapshot = employee.snapshot();
        assert_eq!(
            snapshot.get("name").unwrap().as_str().unwrap(),
            employee.name.as_stored()
        );
        assert_ne!(snapshot.get("name").unwrap().as_str().unwrap(), "Jane Doe");
    }

    #[test]
    fn update_pii_changes_the_stored_tokens() {
        let c = cipher();
        let mut employee = Employee::new(TenantId::new(), &pii(), &c, None, Utc::now()).unwrap();
        let before = employee.snapshot();

        let mut updated = pii();
        updated.email = "jane.doe@acme.example".to_string();
        employee.update_pii(&updated, &c, Utc::now()).unwrap();

        let after = employee.snapshot();
        let changed = verihire_audit::changed_fields(&before, &after);
        // Every PII token re-randomizes under a fresh nonce.
        assert!(changed.contains(&"email".to_string()));
        assert_eq!(employee.pii(&c).email, "jane.doe@acme.example");
    }
}
