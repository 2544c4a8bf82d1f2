//! Academic calendar
//!
//! The academic year runs September to August:
//! - Fall   = Sep 1 .. Dec 31 of the named year
//! - Spring = Jan 1 .. Jun 30 of the named year
//!
//! A programme of `n` years covers `n` Fall/Spring pairs starting with the
//! Fall of the intake's academic year. January intakes belong to the
//! academic year that started the previous September.

use chrono::NaiveDate;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semester {
    Fall,
    Spring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Term {
    pub year: i32,
    pub semester: Semester,
}

impl Term {
    pub fn start(&self) -> Result<NaiveDate> {
        match self.semester {
            Semester::Fall => date(self.year, 9, 1),
            Semester::Spring => date(self.year, 1, 1),
        }
    }

    pub fn end(&self) -> Result<NaiveDate> {
        match self.semester {
            Semester::Fall => date(self.year, 12, 31),
            Semester::Spring => date(self.year, 6, 30),
        }
    }

    /// Inclusive length in days
    pub fn days(&self) -> Result<i64> {
        Ok((self.end()? - self.start()?).num_days() + 1)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let semester = match self.semester {
            Semester::Fall => "Fall",
            Semester::Spring => "Spring",
        };
        write!(f, "{}-{}", self.year, semester)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMonth {
    Sep,
    Jan,
}

impl IntakeMonth {
    /// Intake label such as `2018-Sep`
    pub fn label(&self, year: i32) -> String {
        match self {
            IntakeMonth::Sep => format!("{}-Sep", year),
            IntakeMonth::Jan => format!("{}-Jan", year),
        }
    }

    pub fn enrol_date(&self, year: i32) -> Result<NaiveDate> {
        match self {
            IntakeMonth::Sep => date(year, 9, 1),
            IntakeMonth::Jan => date(year, 1, 15),
        }
    }
}

/// Every term of a programme, in calendar order.
pub fn program_terms(intake_year: i32, month: IntakeMonth, duration_years: u32) -> Vec<Term> {
    let first_fall = match month {
        IntakeMonth::Sep => intake_year,
        IntakeMonth::Jan => intake_year - 1,
    };

    (0..duration_years as i32)
        .flat_map(|k| {
            let fall = first_fall + k;
            [
                Term { year: fall, semester: Semester::Fall },
                Term { year: fall + 1, semester: Semester::Spring },
            ]
        })
        .collect()
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::InvalidConfig(format!("no such date {}-{:02}-{:02}", year, month, day)))
}
