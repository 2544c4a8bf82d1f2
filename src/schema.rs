//! Table descriptors - the explicit schema of the record store
//!
//! Every engagement table is described here once. The storage layer derives
//! its DDL from these descriptors, the generator fills them column by column
//! and the quality checker reads required flags, ranges and foreign
//! references from them.

use serde::Serialize;

pub const STUDENTS: &str = "students";
pub const ATTENDANCE: &str = "attendance";
pub const ASSESSMENTS: &str = "assessments";
pub const LMS_ACTIVITY: &str = "lms_activity";
pub const ADVISOR_NOTES: &str = "advisor_notes";
pub const STUDENT_EVENTS: &str = "student_events";
pub const ANALYTIC_STUDENT_TERM: &str = "analytic_student_term";

/// Logical column types, mapped onto SQLite affinities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// ISO-8601 date, stored as TEXT
    Date,
    /// ISO-8601 date-time, stored as TEXT
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::Date | ColumnType::Timestamp => "TEXT",
        }
    }
}

/// A column pointing at another table's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignRef {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub required: bool,
    /// Inclusive numeric bounds
    pub range: Option<(f64, f64)>,
    pub references: Option<ForeignRef>,
}

impl ColumnDef {
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            required: true,
            range: None,
            references: None,
        }
    }

    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            required: false,
            range: None,
            references: None,
        }
    }

    pub const fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignRef { table, column });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
    /// Column whose value identifies a row in reports
    pub identifier: &'static str,
    /// Columns indexed after a bulk load
    pub indexes: Vec<&'static str>,
    /// Derived from other tables rather than generated directly
    pub derived: bool,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn required_columns(&self) -> Vec<&'static str> {
        self.columns.iter().filter(|c| c.required).map(|c| c.name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_refs(&self) -> impl Iterator<Item = (&'static str, ForeignRef)> + '_ {
        self.columns
            .iter()
            .filter_map(|c| c.references.map(|r| (c.name, r)))
    }
}

/// Every table in the engagement store, parents before children.
pub fn catalog() -> Vec<TableSchema> {
    use ColumnType::*;

    vec![
        TableSchema {
            name: STUDENTS,
            columns: vec![
                ColumnDef::required("student_id", Integer),
                ColumnDef::required("full_name", Text),
                ColumnDef::required("program", Text),
                ColumnDef::required("intake", Text),
                ColumnDef::optional("age", Integer).with_range(16.0, 80.0),
                ColumnDef::optional("gender", Text),
                ColumnDef::required("enrol_date", Date),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "program", "intake", "full_name"],
            derived: false,
        },
        TableSchema {
            name: ATTENDANCE,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("term", Text),
                ColumnDef::required("session_date", Date),
                ColumnDef::required("present", Integer).with_range(0.0, 1.0),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "term"],
            derived: false,
        },
        TableSchema {
            name: ASSESSMENTS,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("assessment_id", Text),
                ColumnDef::required("term", Text),
                ColumnDef::required("score", Real).with_range(0.0, 100.0),
                ColumnDef::required("assessed_on", Date),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "term"],
            derived: false,
        },
        TableSchema {
            name: LMS_ACTIVITY,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("occurred_at", Timestamp),
                ColumnDef::required("activity_type", Text),
                ColumnDef::required("clicks", Integer).with_range(0.0, f64::MAX),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "occurred_at"],
            derived: false,
        },
        TableSchema {
            name: ADVISOR_NOTES,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("created_at", Timestamp),
                ColumnDef::required("note", Text),
            ],
            identifier: "student_id",
            indexes: vec!["student_id"],
            derived: false,
        },
        TableSchema {
            name: STUDENT_EVENTS,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("event_type", Text),
                ColumnDef::required("event_date", Date),
                ColumnDef::optional("details", Text),
                ColumnDef::required("term", Text),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "event_date", "event_type"],
            derived: false,
        },
        TableSchema {
            name: ANALYTIC_STUDENT_TERM,
            columns: vec![
                ColumnDef::required("student_id", Integer).references(STUDENTS, "student_id"),
                ColumnDef::required("program", Text),
                ColumnDef::required("intake", Text),
                ColumnDef::required("term", Text),
                ColumnDef::required("attendance_rate", Real).with_range(0.0, 1.0),
                ColumnDef::required("clicks", Integer).with_range(0.0, f64::MAX),
                ColumnDef::required("activity_decile", Integer).with_range(1.0, 10.0),
                ColumnDef::required("midterm", Real).with_range(0.0, 100.0),
                ColumnDef::required("final", Real).with_range(0.0, 100.0),
                ColumnDef::required("avg_score", Real).with_range(0.0, 100.0),
                ColumnDef::required("at_risk", Integer).with_range(0.0, 1.0),
            ],
            identifier: "student_id",
            indexes: vec!["student_id", "term", "program", "intake"],
            derived: true,
        },
    ]
}

/// Look up a catalog table by name
pub fn table(name: &str) -> Option<TableSchema> {
    catalog().into_iter().find(|t| t.name == name)
}
