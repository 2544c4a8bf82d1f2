//! Per-student, per-term analytic rollup
//!
//! Built entirely in SQL from the base tables once they are loaded:
//! attendance rate, midterm and final scores per term, LMS clicks bucketed
//! into the term their timestamp falls in, an activity decile across all
//! student-terms and an at-risk flag.

use crate::schema::{self, TableSchema};
use crate::storage::Store;
use crate::{Error, Result};

/// Attendance below this rate counts towards the at-risk flag
pub const AT_RISK_ATTENDANCE: f64 = 0.8;
/// Activity deciles at or below this count towards the at-risk flag
pub const AT_RISK_DECILE: i64 = 2;
/// The flag is only raised when the midterm score is also below this
pub const AT_RISK_MIDTERM: f64 = 50.0;

fn rollup_sql() -> String {
    format!(
        r#"
WITH att AS (
    SELECT student_id, term, AVG(present) AS attendance_rate
    FROM attendance
    GROUP BY student_id, term
),
act AS (
    SELECT student_id,
           CASE
               WHEN CAST(strftime('%m', occurred_at) AS INTEGER) >= 9
                   THEN strftime('%Y', occurred_at) || '-Fall'
               WHEN CAST(strftime('%m', occurred_at) AS INTEGER) <= 6
                   THEN strftime('%Y', occurred_at) || '-Spring'
           END AS term,
           SUM(clicks) AS clicks
    FROM lms_activity
    GROUP BY 1, 2
),
scores AS (
    SELECT student_id, term,
           MAX(CASE WHEN assessment_id = 'midterm' THEN score END) AS midterm,
           MAX(CASE WHEN assessment_id = 'final' THEN score END) AS final,
           AVG(score) AS avg_score
    FROM assessments
    GROUP BY student_id, term
),
joined AS (
    SELECT s.student_id, s.program, s.intake, att.term, att.attendance_rate,
           COALESCE(act.clicks, 0) AS clicks,
           scores.midterm, scores.final, scores.avg_score
    FROM students s
    JOIN att ON att.student_id = s.student_id
    LEFT JOIN act ON act.student_id = att.student_id AND act.term = att.term
    JOIN scores ON scores.student_id = att.student_id AND scores.term = att.term
),
ranked AS (
    SELECT joined.*,
           NTILE(10) OVER (ORDER BY clicks, student_id, term) AS activity_decile
    FROM joined
)
INSERT INTO analytic_student_term
    (student_id, program, intake, term, attendance_rate, clicks, activity_decile,
     midterm, final, avg_score, at_risk)
SELECT student_id, program, intake, term, attendance_rate, clicks, activity_decile,
       midterm, final, avg_score,
       CASE
           WHEN (attendance_rate < {att} OR activity_decile <= {decile}) AND midterm < {midterm}
               THEN 1 ELSE 0
       END
FROM ranked
ORDER BY student_id, term
"#,
        att = AT_RISK_ATTENDANCE,
        decile = AT_RISK_DECILE,
        midterm = AT_RISK_MIDTERM,
    )
}

/// Rebuild `analytic_student_term`, returning its row count.
pub fn build(store: &Store) -> Result<usize> {
    let table: TableSchema = schema::table(schema::ANALYTIC_STUDENT_TERM)
        .ok_or_else(|| Error::TableNotFound(schema::ANALYTIC_STUDENT_TERM.to_string()))?;
    for source in [schema::STUDENTS, schema::ATTENDANCE, schema::LMS_ACTIVITY, schema::ASSESSMENTS] {
        store.columns(source)?;
    }

    store.recreate_table(&table)?;
    store.execute_sql(&rollup_sql())?;
    let rows = store.count_rows(table.name)?;
    tracing::debug!("built {} with {} rows", table.name, rows);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        for name in [schema::STUDENTS, schema::ATTENDANCE, schema::LMS_ACTIVITY, schema::ASSESSMENTS] {
            store.create_table(&schema::table(name).unwrap()).unwrap();
        }
        store
            .execute_sql(
                "INSERT INTO students VALUES (1, 'Ana Lee', 'Nursing', '2019-Sep', 20, 'F', '2019-09-01');
                 INSERT INTO attendance VALUES (1, '2019-Fall', '2019-09-02', 1), (1, '2019-Fall', '2019-09-09', 0);
                 INSERT INTO lms_activity VALUES (1, '2019-10-01T09:00:00', 'login', 5),
                                                 (1, '2019-11-01T09:00:00', 'quiz_attempt', 7),
                                                 (1, '2020-02-01T09:00:00', 'login', 100);
                 INSERT INTO assessments VALUES (1, 'midterm', '2019-Fall', 40.0, '2019-10-31'),
                                                (1, 'final', '2019-Fall', 50.0, '2019-12-31');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_rollup_aggregates_per_term() {
        let store = seeded_store();
        assert_eq!(build(&store).unwrap(), 1);

        let set = store.read_table(schema::ANALYTIC_STUDENT_TERM, None).unwrap();
        let row = &set.rows[0];
        let idx = |name: &str| set.columns.iter().position(|c| c == name).unwrap();

        assert_eq!(row[idx("term")], Value::from("2019-Fall"));
        assert_eq!(row[idx("attendance_rate")], Value::from(0.5));
        // the Spring click burst belongs to another term
        assert_eq!(row[idx("clicks")], Value::from(12i64));
        assert_eq!(row[idx("midterm")], Value::from(40.0));
        assert_eq!(row[idx("final")], Value::from(50.0));
        assert_eq!(row[idx("avg_score")], Value::from(45.0));
        assert_eq!(row[idx("at_risk")], Value::from(1i64));
    }

    #[test]
    fn test_rollup_requires_sources() {
        let store = Store::open_in_memory().unwrap();
        assert!(build(&store).is_err());
    }

    #[test]
    fn test_at_risk_follows_midterm() {
        let store = Store::open_in_memory().unwrap();
        for name in [schema::STUDENTS, schema::ATTENDANCE, schema::LMS_ACTIVITY, schema::ASSESSMENTS] {
            store.create_table(&schema::table(name).unwrap()).unwrap();
        }
        // clicks 1 < 2 < 3 put the students in deciles 1, 2 and 3
        store
            .execute_sql(
                "INSERT INTO students VALUES (1, 'Ana Lee', 'Nursing', '2019-Sep', 20, 'F', '2019-09-01'),
                                            (2, 'Ben Kim', 'Nursing', '2019-Sep', 21, 'M', '2019-09-01'),
                                            (3, 'Cal Ross', 'Nursing', '2019-Sep', 22, 'M', '2019-09-01');
                 INSERT INTO attendance VALUES (1, '2019-Fall', '2019-09-02', 1), (1, '2019-Fall', '2019-09-09', 0),
                                               (2, '2019-Fall', '2019-09-02', 1), (2, '2019-Fall', '2019-09-09', 0),
                                               (3, '2019-Fall', '2019-09-02', 1), (3, '2019-Fall', '2019-09-09', 1);
                 INSERT INTO lms_activity VALUES (1, '2019-10-01T09:00:00', 'login', 1),
                                                 (2, '2019-10-01T09:00:00', 'login', 2),
                                                 (3, '2019-10-01T09:00:00', 'login', 3);
                 INSERT INTO assessments VALUES (1, 'midterm', '2019-Fall', 60.0, '2019-10-31'),
                                                (1, 'final', '2019-Fall', 30.0, '2019-12-31'),
                                                (2, 'midterm', '2019-Fall', 45.0, '2019-10-31'),
                                                (2, 'final', '2019-Fall', 80.0, '2019-12-31'),
                                                (3, 'midterm', '2019-Fall', 40.0, '2019-10-31'),
                                                (3, 'final', '2019-Fall', 90.0, '2019-12-31');",
            )
            .unwrap();

        assert_eq!(build(&store).unwrap(), 3);
        let set = store.read_table(schema::ANALYTIC_STUDENT_TERM, None).unwrap();
        let idx = |name: &str| set.columns.iter().position(|c| c == name).unwrap();
        let flags: Vec<(Value, Value)> = set
            .rows
            .iter()
            .map(|row| (row[idx("activity_decile")].clone(), row[idx("at_risk")].clone()))
            .collect();

        assert_eq!(
            flags,
            vec![
                // low average but a passing midterm
                (Value::from(1i64), Value::from(0i64)),
                (Value::from(2i64), Value::from(1i64)),
                // failing midterm, full attendance, decile above the cut
                (Value::from(3i64), Value::from(0i64)),
            ]
        );
    }
}
