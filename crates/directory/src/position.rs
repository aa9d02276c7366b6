use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use verihire_core::{DepartmentId, DomainError, DomainResult, EmployeeId, PositionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Intern,
    Consultant,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::PartTime => "part_time",
            Self::Contract => "contract",
            Self::Intern => "intern",
            Self::Consultant => "consultant",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "full_time" => Ok(Self::FullTime),
            "part_time" => Ok(Self::PartTime),
            "contract" => Ok(Self::Contract),
            "intern" => Ok(Self::Intern),
            "consultant" => Ok(Self::Consultant),
            other => Err(DomainError::validation(format!(
                "unknown employment type: {other}"
            ))),
        }
    }
}

/// One stint an employee holds. At most one per employee is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePosition {
    pub id: PositionId,
    pub employee: EmployeeId,
    pub department: Option<DepartmentId>,
    pub title: String,
    pub duties: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub employment_type: EmploymentType,
    /// Salary in minor currency units. Absent when undisclosed.
    pub salary_cents: Option<i64>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl EmployeePosition {
    pub fn new(
        employee: EmployeeId,
        title: impl Into<String>,
        start_date: NaiveDate,
        employment_type: EmploymentType,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("position title cannot be empty"));
        }
        Ok(Self {
            id: PositionId::new(),
            employee,
            department: None,
            title,
            duties: String::new(),
            start_date,
            end_date: None,
            is_current: true,
            employment_type,
            salary_cents: None,
            created_by,
            created_at: now,
        })
    }

    pub fn with_department(mut self, department: DepartmentId) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_duties(mut self, duties: impl Into<String>) -> Self {
        self.duties = duties.into();
        self
    }

    pub fn with_salary_cents(mut self, cents: i64) -> Self {
        self.salary_cents = Some(cents);
        self
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> DomainResult<Self> {
        if end < self.start_date {
            return Err(DomainError::validation(
                "end date cannot precede start date",
            ));
        }
        self.end_date = Some(end);
        self.is_current = false;
        Ok(self)
    }

    /// Close the stint as of `end`. Used when a newer position supersedes it.
    pub fn demote(&mut self, end: NaiveDate) {
        self.is_current = false;
        if self.end_date.is_none() {
            self.end_date = Some(end);
        }
    }

    pub fn snapshot(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("employee".to_string(), json!(self.employee.to_string()));
        map.insert(
            "department".to_string(),
            json!(self.department.map(|d| d.to_string())),
        );
        map.insert("title".to_string(), json!(self.title));
        map.insert("start_date".to_string(), json!(self.start_date.to_string()));
        map.insert(
            "end_date".to_string(),
            json!(self.end_date.map(|d| d.to_string())),
        );
        map.insert("is_current".to_string(), json!(self.is_current));
        map.insert(
            "employment_type".to_string(),
            json!(self.employment_type.as_str()),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn new_position_is_current_and_open_ended() {
        let pos = EmployeePosition::new(
            EmployeeId::new(),
            "Engineer",
            date("2024-01-15"),
            EmploymentType::FullTime,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(pos.is_current);
        assert!(pos.end_date.is_none());
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let pos = EmployeePosition::new(
            EmployeeId::new(),
            "Engineer",
            date("2024-01-15"),
            EmploymentType::FullTime,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(pos.with_end_date(date("2023-12-31")).is_err());
    }

    #[test]
    fn demote_closes_the_stint_once() {
        let mut pos = EmployeePosition::new(
            EmployeeId::new(),
            "Engineer",
            date("2024-01-15"),
            EmploymentType::Contract,
            None,
            Utc::now(),
        )
        .unwrap();
        pos.demote(date("2024-06-01"));
        assert!(!pos.is_current);
        assert_eq!(pos.end_date, Some(date("2024-06-01")));

        // A second demote keeps the original end date.
        pos.demote(date("2024-07-01"));
        assert_eq!(pos.end_date, Some(date("2024-06-01")));
    }

    #[test]
    fn employment_type_round_trips_through_strings() {
        for ty in [
            EmploymentType::FullTime,
            EmploymentType::PartTime,
            EmploymentType::Contract,
            EmploymentType::Intern,
            EmploymentType::Consultant,
        ] {
            assert_eq!(EmploymentType::parse(ty.as_str()).unwrap(), ty);
        }
        assert!(EmploymentType::parse("gig").is_err());
    }
}
