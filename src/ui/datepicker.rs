use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATEPICKER_CLASS: &str = "datepicker";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndDate {
    /// Dates after the current local day are rejected.
    #[default]
    Today,
    Unbounded,
}

/// Options every `.datepicker` input on a page is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePickerOptions {
    #[serde(default)]
    pub end_date: EndDate,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_autoclose")]
    pub autoclose: bool,
}

fn default_format() -> String {
    "yyyy-mm-dd".to_string()
}

fn default_autoclose() -> bool {
    true
}

impl Default for DatePickerOptions {
    fn default() -> Self {
        Self {
            end_date: EndDate::Today,
            format: default_format(),
            autoclose: default_autoclose(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateInputError {
    #[error("`{value}` does not match the date format {format}")]
    Unparsable { value: String, format: String },
    #[error("{date} is after {end}")]
    AfterEndDate { date: NaiveDate, end: NaiveDate },
}

impl DatePickerOptions {
    /// Translates the picker-style pattern (`yyyy-mm-dd`) into a chrono one.
    pub fn chrono_format(&self) -> String {
        self.format
            .replace("yyyy", "%Y")
            .replace("mm", "%m")
            .replace("dd", "%d")
    }

    pub fn parse(&self, value: &str, today: NaiveDate) -> Result<NaiveDate, DateInputError> {
        let date = NaiveDate::parse_from_str(value.trim(), &self.chrono_format()).map_err(|_| {
            DateInputError::Unparsable {
                value: value.to_string(),
                format: self.format.clone(),
            }
        })?;

        match self.end_date {
            EndDate::Today if date > today => Err(DateInputError::AfterEndDate { date, end: today }),
            _ => Ok(date),
        }
    }

    pub fn render(&self, date: NaiveDate) -> String {
        date.format(&self.chrono_format()).to_string()
    }
}

/// Editing state of one date input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateInputState {
    pub open: bool,
    pub error: Option<DateInputError>,
}

impl DateInputState {
    /// Validates a committed value. A rejected value keeps the picker open; a
    /// valid one closes it when `autoclose` is set.
    pub fn commit(
        &mut self,
        options: &DatePickerOptions,
        value: &str,
        today: NaiveDate,
    ) -> Result<NaiveDate, DateInputError> {
        match options.parse(value, today) {
            Ok(date) => {
                self.error = None;
                if options.autoclose {
                    self.open = false;
                }
                Ok(date)
            }
            Err(err) => {
                self.error = Some(err.clone());
                self.open = true;
                Err(err)
            }
        }
    }
}
