use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use verihire_audit::AuditEntry;
use verihire_core::{DepartmentId, EmployeeId, PositionId, TenantId};
use verihire_directory::store::{DirectoryStore, DirectoryStoreError, EmployeeFilter};
use verihire_directory::{Company, Department, Employee, EmployeePosition};

use super::audit::InMemoryAuditLogStore;

#[derive(Debug, Default)]
struct State {
    companies: HashMap<TenantId, Company>,
    registration_numbers: HashMap<String, TenantId>,
    departments: HashMap<DepartmentId, Department>,
    employees: HashMap<EmployeeId, Employee>,
    positions: HashMap<PositionId, EmployeePosition>,
}

/// In-memory directory store.
///
/// Shares the audit log store with the rest of the system; a mutation and
/// its audit row are recorded while the state write lock is held, so readers
/// never see one without the other.
#[derive(Debug)]
pub struct InMemoryDirectoryStore {
    state: RwLock<State>,
    audit: Arc<InMemoryAuditLogStore>,
}

impl InMemoryDirectoryStore {
    pub fn new(audit: Arc<InMemoryAuditLogStore>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            audit,
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, DirectoryStoreError> {
        self.state
            .write()
            .map_err(|_| DirectoryStoreError::Storage("lock poisoned".to_string()))
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, State>, DirectoryStoreError> {
        self.state
            .read()
            .map_err(|_| DirectoryStoreError::Storage("lock poisoned".to_string()))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn create_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<TenantId, DirectoryStoreError> {
        let mut state = self.write()?;
        if state
            .registration_numbers
            .contains_key(&company.registration_number)
        {
            return Err(DirectoryStoreError::Duplicate(
                "company registration number".to_string(),
            ));
        }
        let id = company.id;
        state
            .registration_numbers
            .insert(company.registration_number.clone(), id);
        state.companies.insert(id, company);
        self.audit.record(audit);
        Ok(id)
    }

    async fn update_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut state = self.write()?;
        let existing = state
            .companies
            .get(&company.id)
            .ok_or(DirectoryStoreError::NotFound)?;
        if existing.registration_number != company.registration_number {
            if state
                .registration_numbers
                .contains_key(&company.registration_number)
            {
                return Err(DirectoryStoreError::Duplicate(
                    "company registration number".to_string(),
                ));
            }
            let old = existing.registration_number.clone();
            state.registration_numbers.remove(&old);
            state
                .registration_numbers
                .insert(company.registration_number.clone(), company.id);
        }
        state.companies.insert(company.id, company);
        self.audit.record(audit);
        Ok(())
    }

    async fn get_company(&self, id: TenantId) -> Result<Company, DirectoryStoreError> {
        self.read()?
            .companies
            .get(&id)
            .cloned()
            .ok_or(DirectoryStoreError::NotFound)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, DirectoryStoreError> {
        let mut companies: Vec<Company> = self.read()?.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn create_department(
        &self,
        department: Department,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut state = self.write()?;
        if !state.companies.contains_key(&department.company) {
            return Err(DirectoryStoreError::NotFound);
        }
        state.departments.insert(department.id, department);
        self.audit.record(audit);
        Ok(())
    }

    async fn list_departments(
        &self,
        company: TenantId,
    ) -> Result<Vec<Department>, DirectoryStoreError> {
        let mut departments: Vec<Department> = self
            .read()?
            .departments
            .values()
            .filter(|d| d.company == company)
            .cloned()
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn create_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<EmployeeId, DirectoryStoreError> {
        let mut state = self.write()?;
        if !state.companies.contains_key(&employee.company) {
            return Err(DirectoryStoreError::NotFound);
        }
        let id = employee.id;
        let company = employee.company;
        state.employees.insert(id, employee);
        if let Some(company) = state.companies.get_mut(&company) {
            company.employee_count += 1;
        }
        self.audit.record(audit);
        Ok(id)
    }

    async fn update_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut state = self.write()?;
        if !state.employees.contains_key(&employee.id) {
            return Err(DirectoryStoreError::NotFound);
        }
        state.employees.insert(employee.id, employee);
        self.audit.record(audit);
        Ok(())
    }

    async fn delete_employee(
        &self,
        id: EmployeeId,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut state = self.write()?;
        let employee = state
            .employees
            .remove(&id)
            .ok_or(DirectoryStoreError::NotFound)?;
        state.positions.retain(|_, p| p.employee != id);
        if let Some(company) = state.companies.get_mut(&employee.company) {
            company.employee_count = company.employee_count.saturating_sub(1);
        }
        self.audit.record(audit);
        Ok(())
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryStoreError> {
        self.read()?
            .employees
            .get(&id)
            .cloned()
            .ok_or(DirectoryStoreError::NotFound)
    }

    async fn list_employees(
        &self,
        filter: EmployeeFilter,
    ) -> Result<Vec<Employee>, DirectoryStoreError> {
        let mut employees: Vec<Employee> = self
            .read()?
            .employees
            .values()
            .filter(|e| e.company == filter.company)
            .filter(|e| !filter.active_only || e.is_active)
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if let Some(limit) = filter.limit {
            employees.truncate(limit);
        }
        Ok(employees)
    }

    async fn assign_position(
        &self,
        position: EmployeePosition,
        end_prior_on: NaiveDate,
        audit: AuditEntry,
    ) -> Result<PositionId, DirectoryStoreError> {
        let mut state = self.write()?;
        if !state.employees.contains_key(&position.employee) {
            return Err(DirectoryStoreError::NotFound);
        }
        let employee = position.employee;
        for prior in state
            .positions
            .values_mut()
            .filter(|p| p.employee == employee && p.is_current)
        {
            prior.demote(end_prior_on);
        }
        let id = position.id;
        state.positions.insert(id, position);
        self.audit.record(audit);
        Ok(id)
    }

    async fn positions_for(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<EmployeePosition>, DirectoryStoreError> {
        let mut positions: Vec<EmployeePosition> = self
            .read()?
            .positions
            .values()
            .filter(|p| p.employee == employee)
            .cloned()
            .collect();
        positions.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(positions)
    }

    async fn current_position(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<EmployeePosition>, DirectoryStoreError> {
        Ok(self
            .read()?
            .positions
            .values()
            .find(|p| p.employee == employee && p.is_current)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use verihire_audit::store::{AuditLogFilter, AuditLogStore};
    use verihire_audit::{ActorMeta, AuditAction};
    use verihire_core::UserId;
    use verihire_directory::position::EmploymentType;
    use verihire_directory::Company;
    use verihire_pii::FieldCipher;

    fn store() -> (InMemoryDirectoryStore, Arc<InMemoryAuditLogStore>) {
        let audit = Arc::new(InMemoryAuditLogStore::new());
        (InMemoryDirectoryStore::new(audit.clone()), audit)
    }

    fn company() -> Company {
        Company::new(
            "Acme",
            "REG-001",
            "2020-01-01".parse().unwrap(),
            "1 Main St",
            "J. Doe",
            "contact@acme.example",
            None,
            Utc::now(),
        )
        .unwrap()
    }

    fn entry(action: AuditAction) -> AuditEntry {
        AuditEntry::new(action, ActorMeta::system(), Utc::now())
    }

    async fn seed_employee(
        store: &InMemoryDirectoryStore,
    ) -> (TenantId, EmployeeId) {
        let cipher = FieldCipher::new(&[7u8; 32]);
        let tenant = store
            .create_company(company(), entry(AuditAction::Create))
            .await
            .unwrap();
        let pii = verihire_directory::EmployeePii {
            name: "Jane Doe".to_string(),
            ..Default::default()
        };
        let employee = Employee::new(tenant, &pii, &cipher, None, Utc::now()).unwrap();
        let id = store
            .create_employee(employee, entry(AuditAction::Create))
            .await
            .unwrap();
        (tenant, id)
    }

    #[tokio::test]
    async fn duplicate_registration_numbers_are_rejected() {
        let (store, _) = store();
        store
            .create_company(company(), entry(AuditAction::Create))
            .await
            .unwrap();
        let err = store
            .create_company(company(), entry(AuditAction::Create))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryStoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn mutations_leave_audit_rows_behind() {
        let (store, audit) = store();
        let (_, id) = seed_employee(&store).await;
        store
            .delete_employee(id, entry(AuditAction::Delete))
            .await
            .unwrap();

        let entries = audit.list(AuditLogFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn assigning_a_position_demotes_the_prior_current_one() {
        let (store, _) = store();
        let (_, employee) = seed_employee(&store).await;

        let first = EmployeePosition::new(
            employee,
            "Engineer",
            "2023-01-01".parse().unwrap(),
            EmploymentType::FullTime,
            None,
            Utc::now(),
        )
        .unwrap();
        let first_id = first.id;
        store
            .assign_position(first, "2023-01-01".parse().unwrap(), entry(AuditAction::Create))
            .await
            .unwrap();

        let second = EmployeePosition::new(
            employee,
            "Senior Engineer",
            "2024-06-01".parse().unwrap(),
            EmploymentType::FullTime,
            None,
            Utc::now(),
        )
        .unwrap();
        store
            .assign_position(
                second,
                "2024-05-31".parse().unwrap(),
                entry(AuditAction::Create),
            )
            .await
            .unwrap();

        let positions = store.positions_for(employee).await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(
            positions.iter().filter(|p| p.is_current).count(),
            1,
            "exactly one position may be current"
        );

        let current = store.current_position(employee).await.unwrap().unwrap();
        assert_eq!(current.title, "Senior Engineer");

        let prior = positions.iter().find(|p| p.id == first_id).unwrap();
        assert_eq!(prior.end_date, Some("2024-05-31".parse().unwrap()));
    }

    #[tokio::test]
    async fn employee_counts_track_create_and_delete() {
        let (store, _) = store();
        let (tenant, id) = seed_employee(&store).await;
        assert_eq!(store.get_company(tenant).await.unwrap().employee_count, 1);

        store
            .delete_employee(id, entry(AuditAction::Delete))
            .await
            .unwrap();
        assert_eq!(store.get_company(tenant).await.unwrap().employee_count, 0);
    }

    #[tokio::test]
    async fn listing_is_tenant_scoped() {
        let (store, _) = store();
        let (tenant, _) = seed_employee(&store).await;

        let other = store
            .create_company(
                Company::new(
                    "Globex",
                    "REG-002",
                    "2021-01-01".parse().unwrap(),
                    "2 Side St",
                    "P. Roe",
                    "contact@globex.example",
                    None,
                    Utc::now(),
                )
                .unwrap(),
                entry(AuditAction::Create),
            )
            .await
            .unwrap();

        let mine = store
            .list_employees(EmployeeFilter::for_company(tenant))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        let theirs = store
            .list_employees(EmployeeFilter::for_company(other))
            .await
            .unwrap();
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn missing_records_surface_not_found() {
        let (store, _) = store();
        assert!(matches!(
            store.get_employee(EmployeeId::new()).await.unwrap_err(),
            DirectoryStoreError::NotFound
        ));
        assert!(matches!(
            store.get_company(TenantId::new()).await.unwrap_err(),
            DirectoryStoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn deactivated_employees_can_be_filtered_out() {
        let (store, _) = store();
        let (tenant, id) = seed_employee(&store).await;
        let mut employee = store.get_employee(id).await.unwrap();
        employee.is_active = false;
        store
            .update_employee(employee, entry(AuditAction::Update))
            .await
            .unwrap();

        let mut filter = EmployeeFilter::for_company(tenant);
        filter.active_only = true;
        assert!(store.list_employees(filter).await.unwrap().is_empty());
    }
}
