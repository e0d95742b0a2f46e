use chrono::{Duration, Utc};
use ics::parameters::Value;
use ics::properties::{DtEnd, DtStart, Summary};
use ics::{escape_text, Event, ICalendar};
use uuid::Uuid;

use crate::error::Result;
use crate::timetable::models::{SubmissionType, Timetable};

/// Build the deadline calendar for one year of study: one all-day event
/// per assessed exercise, on the day the exercise is due
pub fn calendar(timetable: &Timetable, level: u8) -> ICalendar<'static> {
    let mut calendar = ICalendar::new(
        "2.0",
        format!("-//catextor {}//EN", env!("CARGO_PKG_VERSION")),
    );
    let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    for (course, exercises) in timetable.iter() {
        if course.level() != Some(level) {
            continue;
        }

        for exercise in exercises {
            if exercise.submission_type == SubmissionType::Unassessed {
                continue;
            }

            let mut event = Event::new(Uuid::new_v4().to_string(), dtstamp.clone());

            // All-day event on the deadline, DTEND exclusive
            let mut start = DtStart::new(exercise.end.format("%Y%m%d").to_string());
            start.add(Value::new("DATE"));
            event.push(start);
            let mut end = DtEnd::new((exercise.end + Duration::days(1)).format("%Y%m%d").to_string());
            end.add(Value::new("DATE"));
            event.push(end);

            let title = exercise
                .title
                .clone()
                .unwrap_or_else(|| format!("Exercise {}", exercise.number));
            event.push(Summary::new(escape_text(format!(
                "{} {}: {}",
                exercise.kind, course.id, title
            ))));

            calendar.add_event(event);
        }
    }

    calendar
}

/// Export the calendar, appending the `.ics` extension when missing
pub fn export(timetable: &Timetable, level: u8, filename: &mut String) -> Result<()> {
    if !filename.ends_with(".ics") {
        filename.push_str(".ics");
    }

    calendar(timetable, level).save_file(filename.as_str())?;
    Ok(())
}
