//! Storage Layer - SQLite-backed record store
//!
//! A single database file holds the engagement tables:
//! - students(student_id, full_name, program, intake, age, gender, enrol_date)
//! - attendance, assessments, lms_activity, advisor_notes, student_events
//! - analytic_student_term (rollup built after a load)
//!
//! The store is passive: it opens and closes the connection, answers
//! schema questions and moves rows in and out. It never interprets them.

pub mod schema;
pub mod sqlite;

pub use sqlite::{RowSet, Store};
