//! Data Generator - synthetic engagement records
//!
//! Builds every base table from a seeded ChaCha8 RNG and loads them into
//! the record store in one transaction, replacing earlier content. The
//! rollup and indexes are rebuilt afterwards in the same transaction.
//!
//! Output is deterministic for a given [`GeneratorConfig`].

pub mod names;
pub mod rollup;
pub mod terms;

use chrono::{NaiveTime, TimeDelta};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{self, TableSchema};
use crate::storage::Store;
use crate::value::{Row, Value};
use crate::{Error, Result};
use terms::{IntakeMonth, Term};

const ACTIVITY_TYPES: &[&str] = &[
    "login",
    "page_view",
    "video_watch",
    "quiz_attempt",
    "forum_post",
    "file_download",
];

const NOTE_TEMPLATES: &[&str] = &[
    "Check-in meeting held for {term}; student on track.",
    "Discussed study plan for {term} assessments.",
    "Student reported workload concerns during {term}.",
    "Referred to learning support after {term} midterm.",
    "Followed up on missed sessions in {term}.",
];

const OUTCOMES: &[(&str, f64)] = &[("Graduated", 0.85), ("Withdrew", 0.10), ("Deferred", 0.05)];

/// A programme students can enrol in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub name: String,
    pub duration_years: u32,
    /// Relative share of students
    pub weight: f64,
}

impl ProgramSpec {
    pub fn new(name: &str, duration_years: u32, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            duration_years,
            weight,
        }
    }
}

/// Distribution parameters for the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub students: usize,
    /// First academic year (Fall) an intake may start in
    pub year_start: i32,
    /// Programmes should end by this year where the window allows
    pub year_end: i32,
    pub seed: u64,
    /// Probability of a September rather than January intake
    pub sep_intake_share: f64,
    /// Per-student attendance probability is drawn from this range
    pub attendance_min: f64,
    pub attendance_max: f64,
    pub sessions_per_term: u32,
    pub score_min: f64,
    pub score_max: f64,
    pub activity_events_per_term: u32,
    pub max_clicks: u32,
    pub probation_probability: f64,
    /// Probability of an intervention once on probation
    pub intervention_probability: f64,
    /// Probability of an advisor note per student-term
    pub note_probability: f64,
    pub programs: Vec<ProgramSpec>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            students: 500,
            year_start: 2012,
            year_end: 2025,
            seed: 42,
            sep_intake_share: 0.7,
            attendance_min: 0.6,
            attendance_max: 0.99,
            sessions_per_term: 12,
            score_min: 20.0,
            score_max: 100.0,
            activity_events_per_term: 20,
            max_clicks: 40,
            probation_probability: 0.18,
            intervention_probability: 0.6,
            note_probability: 0.25,
            programs: vec![
                ProgramSpec::new("Medicine", 6, 0.45),
                ProgramSpec::new("Nursing", 4, 0.35),
                ProgramSpec::new("Pharmacy", 5, 0.20),
            ],
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if self.students == 0 {
            return invalid("students must be at least 1".into());
        }
        if !(1900..=2200).contains(&self.year_start) || !(1900..=2200).contains(&self.year_end) {
            return invalid(format!("years {}..{} out of range", self.year_start, self.year_end));
        }
        if self.year_start > self.year_end {
            return invalid(format!("year_start {} is after year_end {}", self.year_start, self.year_end));
        }
        if self.programs.is_empty() {
            return invalid("at least one programme is required".into());
        }
        for program in &self.programs {
            if !(1..=10).contains(&program.duration_years) {
                return invalid(format!("{}: duration must be 1-10 years", program.name));
            }
            if !program.weight.is_finite() || program.weight <= 0.0 {
                return invalid(format!("{}: weight must be positive", program.name));
            }
        }
        for (name, p) in [
            ("sep_intake_share", self.sep_intake_share),
            ("attendance_min", self.attendance_min),
            ("attendance_max", self.attendance_max),
            ("probation_probability", self.probation_probability),
            ("intervention_probability", self.intervention_probability),
            ("note_probability", self.note_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} must be within [0, 1], got {}", name, p));
            }
        }
        if self.attendance_min > self.attendance_max {
            return invalid("attendance_min is above attendance_max".into());
        }
        if !(0.0..=100.0).contains(&self.score_min)
            || !(0.0..=100.0).contains(&self.score_max)
            || self.score_min > self.score_max
        {
            return invalid(format!("score range {}..{} is invalid", self.score_min, self.score_max));
        }
        // Fall is the shorter term at 122 days
        if !(1..=120).contains(&self.sessions_per_term) {
            return invalid("sessions_per_term must be 1-120".into());
        }
        if self.activity_events_per_term > 1000 {
            return invalid("activity_events_per_term must be at most 1000".into());
        }
        Ok(())
    }

    fn latest_intake(&self) -> i32 {
        let longest = self.programs.iter().map(|p| p.duration_years).max().unwrap_or(1) as i32;
        self.year_start.max(self.year_end - longest)
    }
}

/// Rows for every generated base table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedData {
    pub students: Vec<Row>,
    pub attendance: Vec<Row>,
    pub assessments: Vec<Row>,
    pub lms_activity: Vec<Row>,
    pub advisor_notes: Vec<Row>,
    pub student_events: Vec<Row>,
}

impl GeneratedData {
    pub fn rows_for(&self, table: &str) -> Option<&[Row]> {
        match table {
            schema::STUDENTS => Some(&self.students),
            schema::ATTENDANCE => Some(&self.attendance),
            schema::ASSESSMENTS => Some(&self.assessments),
            schema::LMS_ACTIVITY => Some(&self.lms_activity),
            schema::ADVISOR_NOTES => Some(&self.advisor_notes),
            schema::STUDENT_EVENTS => Some(&self.student_events),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub seed: u64,
    pub tables: Vec<TableCount>,
}

impl GenerationSummary {
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

/// Build all base-table rows without touching a store.
pub fn build(config: &GeneratorConfig) -> Result<GeneratedData> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut data = GeneratedData::default();
    let names = names::unique_names(config.students, &mut rng);
    let weights: Vec<f64> = config.programs.iter().map(|p| p.weight).collect();
    let latest_intake = config.latest_intake();

    for (i, name) in names.into_iter().enumerate() {
        let student_id = (i + 1) as i64;
        let program = &config.programs[weighted_index(&weights, &mut rng)];
        let intake_year = rng.random_range(config.year_start..=latest_intake);
        let month = if rng.random_bool(config.sep_intake_share) {
            IntakeMonth::Sep
        } else {
            IntakeMonth::Jan
        };
        let enrol_date = month.enrol_date(intake_year)?;
        let terms = terms::program_terms(intake_year, month, program.duration_years);

        data.students.push(vec![
            Value::from(student_id),
            Value::from(name),
            Value::from(program.name.as_str()),
            Value::from(month.label(intake_year)),
            Value::from(rng.random_range(18..=44i64)),
            Value::from(if rng.random_bool(0.55) { "F" } else { "M" }),
            Value::from(enrol_date.to_string()),
        ]);

        let profile = StudentProfile {
            attendance: rng.random_range(config.attendance_min..=config.attendance_max),
            ability: rng.random_range(config.score_min..=config.score_max),
            engagement: rng.random_range(0.3..=1.0),
        };
        for term in &terms {
            push_term_rows(&mut data, config, &mut rng, student_id, term, &profile)?;
        }
        push_events(&mut data, config, &mut rng, student_id, enrol_date, &terms)?;
    }

    Ok(data)
}

/// Generate and load every table, then build the rollup.
pub fn generate(store: &Store, config: &GeneratorConfig) -> Result<GenerationSummary> {
    let data = build(config)?;
    let catalog = schema::catalog();

    store.in_transaction(|store| {
        for table in catalog.iter().filter(|t| !t.derived) {
            load_table(store, table, &data)?;
        }
        rollup::build(store)?;
        for table in &catalog {
            store.create_indexes(table)?;
        }
        Ok(())
    })?;

    let mut tables = Vec::with_capacity(catalog.len());
    for table in &catalog {
        tables.push(TableCount {
            table: table.name.to_string(),
            rows: store.count_rows(table.name)?,
        });
    }
    tracing::info!("generated {} students with seed {}", config.students, config.seed);

    Ok(GenerationSummary {
        seed: config.seed,
        tables,
    })
}

fn load_table(store: &Store, table: &TableSchema, data: &GeneratedData) -> Result<()> {
    let rows = data
        .rows_for(table.name)
        .ok_or_else(|| Error::TableNotFound(table.name.to_string()))?;
    store.recreate_table(table)?;
    store.insert_rows(table.name, &table.column_names(), rows)?;
    Ok(())
}

struct StudentProfile {
    attendance: f64,
    ability: f64,
    engagement: f64,
}

fn push_term_rows(
    data: &mut GeneratedData,
    config: &GeneratorConfig,
    rng: &mut ChaCha8Rng,
    student_id: i64,
    term: &Term,
    profile: &StudentProfile,
) -> Result<()> {
    let start = term.start()?;
    let end = term.end()?;
    let days = term.days()?;
    let label = term.to_string();

    // Sessions spread evenly across the term, one date each
    let sessions = config.sessions_per_term as i64;
    for s in 0..sessions {
        let session_date = start + TimeDelta::days(s * days / sessions);
        data.attendance.push(vec![
            Value::from(student_id),
            Value::from(label.as_str()),
            Value::from(session_date.to_string()),
            Value::from(rng.random_bool(profile.attendance)),
        ]);
    }

    let midterm_date = start + TimeDelta::days(days / 2);
    for (assessment, assessed_on) in [("midterm", midterm_date), ("final", end)] {
        let noise = rng.random_range(-12.0..=12.0);
        let score = (profile.ability + noise).clamp(config.score_min, config.score_max);
        data.assessments.push(vec![
            Value::from(student_id),
            Value::from(assessment),
            Value::from(label.as_str()),
            Value::from((score * 10.0).round() / 10.0),
            Value::from(assessed_on.to_string()),
        ]);
    }

    // One event per equal slice of the term keeps timestamps distinct
    let term_start = start.and_time(NaiveTime::MIN);
    let events = config.activity_events_per_term as i64;
    if events > 0 {
        let slot = days * 86_400 / events;
        for e in 0..events {
            let at = term_start + TimeDelta::seconds(e * slot + rng.random_range(0..slot));
            let kind = ACTIVITY_TYPES[rng.random_range(0..ACTIVITY_TYPES.len())];
            let clicks = rng.random_range(0..=config.max_clicks) as f64 * profile.engagement;
            data.lms_activity.push(vec![
                Value::from(student_id),
                Value::from(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
                Value::from(kind),
                Value::from(clicks.round() as i64),
            ]);
        }
    }

    if rng.random_bool(config.note_probability) {
        let at = term_start + TimeDelta::seconds(rng.random_range(0..days * 86_400));
        let template = NOTE_TEMPLATES[rng.random_range(0..NOTE_TEMPLATES.len())];
        data.advisor_notes.push(vec![
            Value::from(student_id),
            Value::from(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::from(template.replace("{term}", &label)),
        ]);
    }

    Ok(())
}

fn push_events(
    data: &mut GeneratedData,
    config: &GeneratorConfig,
    rng: &mut ChaCha8Rng,
    student_id: i64,
    enrol_date: chrono::NaiveDate,
    terms: &[Term],
) -> Result<()> {
    let (Some(first), Some(last)) = (terms.first(), terms.last()) else {
        return Ok(());
    };
    let event = |kind: &str, date: chrono::NaiveDate, details: Option<&str>, term: &Term| -> Row {
        vec![
            Value::from(student_id),
            Value::from(kind),
            Value::from(date.to_string()),
            Value::from(details),
            Value::from(term.to_string()),
        ]
    };

    data.student_events.push(event("Enrolled", enrol_date, None, first));

    if rng.random_bool(config.probation_probability) {
        let term = &terms[1.min(terms.len() - 1)];
        data.student_events.push(event(
            "On Probation",
            enrol_date + TimeDelta::days(75),
            Some("Low attendance"),
            term,
        ));
        if rng.random_bool(config.intervention_probability) {
            data.student_events.push(event(
                "Intervention",
                enrol_date + TimeDelta::days(85),
                Some("Advisor meeting"),
                term,
            ));
        }
    }

    let weights: Vec<f64> = OUTCOMES.iter().map(|(_, w)| *w).collect();
    let (outcome, _) = OUTCOMES[weighted_index(&weights, rng)];
    data.student_events.push(event(outcome, last.end()?, None, last));

    Ok(())
}

/// Pick an index with probability proportional to its weight
fn weighted_index<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let mut roll = rng.random_range(0.0..total);
    for (i, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return i;
        }
        roll -= weight;
    }
    weights.len() - 1
}
