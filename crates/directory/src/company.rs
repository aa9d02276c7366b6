use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use verihire_auth::TenantScoped;
use verihire_core::{DepartmentId, DomainError, DomainResult, TenantId, UserId};

/// A registered company; the tenant boundary for all scoped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: TenantId,
    pub name: String,
    pub registration_number: String,
    pub registration_date: NaiveDate,
    pub address: String,
    pub contact_person: String,
    pub email: String,
    pub phone: Option<String>,
    pub employee_count: u32,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        registration_number: impl Into<String>,
        registration_date: NaiveDate,
        address: impl Into<String>,
        contact_person: impl Into<String>,
        email: impl Into<String>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let registration_number = registration_number.into();
        let email = email.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }
        if registration_number.trim().is_empty() {
            return Err(DomainError::validation(
                "registration number cannot be empty",
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::validation("invalid contact email"));
        }

        Ok(Self {
            id: TenantId::new(),
            name,
            registration_number,
            registration_date,
            address: address.into(),
            contact_person: contact_person.into(),
            email,
            phone: None,
            employee_count: 0,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Field snapshot for audit old/new values.
    pub fn snapshot(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name));
        map.insert(
            "registration_number".to_string(),
            json!(self.registration_number),
        );
        map.insert(
            "registration_date".to_string(),
            json!(self.registration_date.to_string()),
        );
        map.insert("address".to_string(), json!(self.address));
        map.insert("contact_person".to_string(), json!(self.contact_person));
        map.insert("email".to_string(), json!(self.email));
        map.insert("phone".to_string(), json!(self.phone));
        map.insert("employee_count".to_string(), json!(self.employee_count));
        map
    }
}

impl TenantScoped for Company {
    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.id)
    }
}

/// A department within a company. Unique per (company, name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub company: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Department {
    pub fn new(company: TenantId, name: impl Into<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("department name cannot be empty"));
        }
        Ok(Self {
            id: DepartmentId::new(),
            company,
            name,
            created_at: now,
        })
    }
}

impl TenantScoped for Department {
    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 4, 1).unwrap()
    }

    #[test]
    fn company_requires_registration_number() {
        let err = Company::new(
            "Acme",
            "   ",
            reg_date(),
            "1 Main St",
            "Jo Bloggs",
            "jo@acme.example",
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
    fn company_is_its_own_tenant() {
        let company = Company::new(
            "Acme",
            "REG-001",
            reg_date(),
            "1 Main St",
            "Jo Bloggs",
            "jo@acme.example",
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(company.tenant_id(), Some(company.id));
    }

    #[test]
    fn snapshot_diff_picks_up_renames() {
        let mut company = Company::new(
            "Acme",
            "REG-001",
            reg_date(),
            "1 Main St",
            "Jo Bloggs",
            "jo@acme.example",
            None,
            Utc::now(),
        )
        .unwrap();
        let before = company.snapshot();
        company.name = "Acme Holdings".to_string();
        let after = company.snapshot();

        let changed = verihire_audit::changed_fields(&before, &after);
        assert_eq!(changed, vec!["name".to_string()]);
    }
}
