use crate::error::Result;
use crate::session::CateSession;

mod dates;
pub(crate) mod grid;
pub mod models;
mod parser;

pub use parser::parse;

use models::Timetable;

/// Fetch the exercise timetable behind `url` and decode it
pub async fn timetable(session: &CateSession, url: &str) -> Result<Timetable> {
    let html = session.fetch(url).await?;
    parse(&html)
}

/// Print the timetable, one block per course
pub fn display(timetable: &Timetable) {
    println!(
        "{} {}-{}",
        timetable.period, timetable.start_year, timetable.end_year
    );

    for (course, exercises) in timetable.iter() {
        println!();
        println!("{course}");

        if exercises.is_empty() {
            println!("  (no exercises)");
            continue;
        }

        for exercise in exercises {
            let window = if exercise.start == exercise.end {
                exercise.end.format("%d/%m/%Y").to_string()
            } else {
                format!(
                    "{} to {}",
                    exercise.start.format("%d/%m/%Y"),
                    exercise.end.format("%d/%m/%Y")
                )
            };

            println!(
                "  {:>2}:{:<4} {:<24} {:<32} {}",
                exercise.number,
                exercise.kind,
                window,
                exercise.title.as_deref().unwrap_or(""),
                exercise.submission_type,
            );
        }
    }
}
