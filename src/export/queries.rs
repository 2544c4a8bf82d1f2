//! Analytic extracts for the BI layer

/// A read query exported under a fixed file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Average metrics per programme and intake
pub const COHORT_SUMMARY: NamedQuery = NamedQuery {
    name: "cohort_summary",
    sql: "SELECT program, intake,
                 AVG(attendance_rate) AS avg_attendance,
                 AVG(activity_decile) AS avg_activity,
                 AVG(midterm) AS avg_midterm,
                 AVG(final) AS avg_final,
                 SUM(at_risk) AS at_risk_terms
          FROM analytic_student_term
          GROUP BY program, intake
          ORDER BY program, intake",
};

/// Every student-term with its risk flag
pub const AT_RISK_STUDENTS: NamedQuery = NamedQuery {
    name: "at_risk_students",
    sql: "SELECT student_id, program, intake, term,
                 attendance_rate, activity_decile, midterm, final, at_risk
          FROM analytic_student_term
          ORDER BY student_id, term",
};

/// Engagement by calendar year and programme
pub const ENGAGEMENT_TRENDS: NamedQuery = NamedQuery {
    name: "engagement_trends",
    sql: "SELECT SUBSTR(term, 1, 4) AS year, program,
                 AVG(attendance_rate) AS avg_attendance,
                 AVG(activity_decile) AS avg_activity
          FROM analytic_student_term
          GROUP BY year, program
          ORDER BY year, program",
};

pub fn analytic_queries() -> &'static [NamedQuery] {
    &[COHORT_SUMMARY, AT_RISK_STUDENTS, ENGAGEMENT_TRENDS]
}
