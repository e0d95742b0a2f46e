use chrono::{Duration, Month, NaiveDate};

use crate::error::{Error, Result};
use crate::timetable::grid::Row;

/// Last month (inclusive) counted towards the academic year's end year.
/// August onwards belongs to the start year.
const YEAR_SPLIT_MONTH: u32 = 7;

/// The date header of the timetable: a month row where every header spans
/// its month's columns, and a day row with one label per physical column.
/// Resolves a zero based column index to a concrete date.
#[derive(Debug)]
pub struct DateGrid {
    /// Month number and colspan of each month header
    months: Vec<(u32, usize)>,

    /// Day of month per physical column, `None` for blank filler cells
    days: Vec<Option<u32>>,

    start_year: i32,
    end_year: i32,
}

impl DateGrid {
    /// Build the grid from the month header row and the day label row.
    /// The month row starts at the first white header, the day row skips
    /// one leading label cell, both as rendered by CATe.
    pub fn from_rows(
        month_row: &Row,
        day_row: &Row,
        start_year: i32,
        end_year: i32,
    ) -> Result<Self> {
        let first_month = month_row
            .cells
            .iter()
            .position(|cell| cell.color.as_deref() == Some("white"))
            .ok_or_else(|| Error::structure("month row has no white month header"))?;

        let mut months = Vec::new();
        for cell in &month_row.cells[first_month..] {
            let month = cell
                .text
                .parse::<Month>()
                .map_err(|_| Error::structure(format!("bad month name {:?}", cell.text)))?;
            months.push((month.number_from_month(), cell.colspan));
        }

        if day_row.cells.len() < 2 {
            return Err(Error::structure("day row is missing its labels"));
        }
        let days = day_row.cells[1..]
            .iter()
            .map(|cell| {
                if cell.text.is_empty() {
                    Ok(None)
                } else {
                    cell.text
                        .parse::<u32>()
                        .map(Some)
                        .map_err(|_| Error::structure(format!("bad day label {:?}", cell.text)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let month_width: usize = months.iter().map(|(_, span)| span).sum();
        if month_width != days.len() {
            return Err(Error::structure(format!(
                "month headers cover {} columns but the day row has {}",
                month_width,
                days.len()
            )));
        }

        Ok(Self {
            months,
            days,
            start_year,
            end_year,
        })
    }

    /// Total number of physical columns
    pub fn width(&self) -> usize {
        self.days.len()
    }

    /// Month number owning a column
    pub fn month(&self, index: usize) -> Result<u32> {
        let mut remaining = index;
        for &(month, span) in &self.months {
            if remaining < span {
                return Ok(month);
            }
            remaining -= span;
        }
        Err(self.out_of_range(index))
    }

    /// Calendar date of a column
    pub fn date(&self, index: usize) -> Result<NaiveDate> {
        if index >= self.days.len() {
            return Err(self.out_of_range(index));
        }

        match self.days[index] {
            Some(day) => self.build_date(index, day),
            // Some month blocks render their terminal day as an empty
            // cell. Resolve the nearest labelled sibling and walk the
            // date back by the distance. Blanks in the first two columns
            // of their month span look right, others look left, so the
            // inferred date stays inside the span.
            None => {
                let step: isize = if self.span_offset(index)? < 2 { 1 } else { -1 };
                let mut sibling = index;
                let mut distance = 0i64;
                loop {
                    sibling = match add_signed(sibling, step) {
                        Some(s) if s < self.days.len() => s,
                        _ => {
                            return Err(Error::structure(format!(
                                "blank day cell at column {index} has no labelled sibling"
                            )))
                        }
                    };
                    distance += 1;
                    if let Some(day) = self.days[sibling] {
                        let resolved = self.build_date(sibling, day)?;
                        return Ok(resolved - Duration::days(step as i64 * distance));
                    }
                }
            }
        }
    }

    fn build_date(&self, index: usize, day: u32) -> Result<NaiveDate> {
        let month = self.month(index)?;
        let year = if month > YEAR_SPLIT_MONTH {
            self.start_year
        } else {
            self.end_year
        };
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| Error::structure(format!("no such date: {year}-{month}-{day}")))
    }

    /// Position of a column inside its month span
    fn span_offset(&self, index: usize) -> Result<usize> {
        let mut remaining = index;
        for &(_, span) in &self.months {
            if remaining < span {
                return Ok(remaining);
            }
            remaining -= span;
        }
        Err(self.out_of_range(index))
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::OutOfRange {
            index,
            width: self.width(),
        }
    }
}

fn add_signed(base: usize, step: isize) -> Option<usize> {
    base.checked_add_signed(step)
}
