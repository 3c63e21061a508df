//! CSV-backed dinner-day repository.
//!
//! All days live in a single `dinner_days.csv` keyed by date. Collection
//! fields (cooks, ingredients, attendants) are stored as JSON inside their
//! CSV columns so the attendant flags survive round-trips unchanged.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{Reader, Writer};
use log::info;
use std::fs::File;
use std::io::BufReader;

use super::connection::CsvConnection;
use crate::domain::models::dinner_day::{Attendant, DinnerDay, Ingredient};
use crate::storage::traits::DinnerDayStorage;

const DINNER_DAYS_FILE: &str = "dinner_days.csv";
const HEADER: [&str; 5] = ["date", "cooks", "ingredients", "attendants", "used_budget"];

#[derive(Clone)]
pub struct DinnerDayRepository {
    connection: CsvConnection,
}

impl DinnerDayRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_days(&self) -> Result<Vec<DinnerDay>> {
        let file_path = self.connection.file_path(DINNER_DAYS_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut days = Vec::new();
        for result in csv_reader.records() {
            let record = result?;

            let date_str = record.get(0).unwrap_or("");
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .with_context(|| format!("Invalid dinner day date: {}", date_str))?;

            let cooks: Vec<String> = parse_json_column(record.get(1))?;
            let ingredient_names: Vec<String> = parse_json_column(record.get(2))?;
            let mut ingredients = Vec::with_capacity(ingredient_names.len());
            for name in &ingredient_names {
                let ingredient: Ingredient = name
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .with_context(|| format!("Bad ingredient on {}", date))?;
                ingredients.push(ingredient);
            }
            let attendants: Vec<Attendant> = parse_json_column(record.get(3))?;

            let used_budget = match record.get(4).unwrap_or("") {
                "" => None,
                raw => Some(
                    raw.parse::<f64>()
                        .with_context(|| format!("Bad used_budget on {}: {}", date, raw))?,
                ),
            };

            days.push(DinnerDay {
                date,
                cooks,
                ingredients,
                attendants,
                used_budget,
            });
        }

        Ok(days)
    }

    fn write_days(&self, days: &[DinnerDay]) -> Result<()> {
        let mut csv_writer = Writer::from_writer(Vec::new());
        csv_writer.write_record(HEADER)?;

        for day in days {
            let ingredient_names: Vec<&str> = day.ingredients.iter().map(|i| i.name()).collect();
            csv_writer.write_record(&[
                day.date.format("%Y-%m-%d").to_string(),
                serde_json::to_string(&day.cooks)?,
                serde_json::to_string(&ingredient_names)?,
                serde_json::to_string(&day.attendants)?,
                day.used_budget.map(|b| b.to_string()).unwrap_or_default(),
            ])?;
        }

        let contents = csv_writer.into_inner()?;
        self.connection.write_atomic(DINNER_DAYS_FILE, &contents)
    }
}

fn parse_json_column<T: serde::de::DeserializeOwned>(raw: Option<&str>) -> Result<T> {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => "[]",
    };
    serde_json::from_str(raw).with_context(|| format!("Bad JSON column: {}", raw))
}

impl DinnerDayStorage for DinnerDayRepository {
    fn get_day(&self, date: NaiveDate) -> Result<Option<DinnerDay>> {
        Ok(self.read_days()?.into_iter().find(|d| d.date == date))
    }

    fn update_day(
        &self,
        date: NaiveDate,
        mutate: &mut dyn FnMut(&mut DinnerDay),
    ) -> Result<DinnerDay> {
        // Whole cycle under the write guard: a concurrent mutation of the
        // same or another date cannot be lost to a stale rewrite.
        let _guard = self.connection.write_guard();

        let mut days = self.read_days()?;
        let day = match days.iter_mut().find(|d| d.date == date) {
            Some(existing) => existing,
            None => {
                days.push(DinnerDay::empty(date));
                days.last_mut().expect("just pushed")
            }
        };

        mutate(day);
        let updated = day.clone();

        days.sort_by_key(|d| d.date);
        self.write_days(&days)?;

        info!(
            "Updated dinner day {}: {} cooks, {} attendants",
            date,
            updated.cooks.len(),
            updated.attendants.len()
        );
        Ok(updated)
    }

    fn list_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DinnerDay>> {
        let mut days = self.read_days()?;
        days.retain(|d| d.date >= start && d.date <= end);
        days.sort_by_key(|d| d.date);
        Ok(days)
    }
}
