use chrono::Duration;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::timetable::dates::DateGrid;
use crate::timetable::grid::{Cell, Row, Table};
use crate::timetable::models::{Course, Exercise, SubmissionType, Timetable};

/// Leading cells of the first row of a course section: course id, name
/// and the two filler cells between them and the first exercise column
const FIRST_ROW_SKIP: usize = 4;
/// Later rows only repeat the left margin cell
const ROW_SKIP: usize = 1;

/// Decode a timetable page into a [`Timetable`]. The page is expected to
/// follow the fixed CATe template; any deviation aborts the whole parse.
pub fn parse(html: &str) -> Result<Timetable> {
    let document = Html::parse_document(html);

    let (period, start_year, end_year) = parse_title(&document)?;

    let sel_table = Selector::parse("body table").unwrap();
    let table_elem = document
        .select(&sel_table)
        .next()
        .ok_or_else(|| Error::structure("timetable table not found"))?;
    let table = Table::from_element(table_elem)?;

    // First three rows are the month, week and day headers
    if table.rows.len() < 3 {
        return Err(Error::structure(format!(
            "expected at least 3 header rows, found {}",
            table.rows.len()
        )));
    }
    let grid = DateGrid::from_rows(&table.rows[0], &table.rows[2], start_year, end_year)?;

    let courses = scan_sections(&table, &grid)?;

    Ok(Timetable::new(period, start_year, end_year, courses))
}

/// Pull `(period, start year, end year)` out of the `<h1>` page title,
/// i.e. `Autumn 2023-2024`
fn parse_title(document: &Html) -> Result<(String, i32, i32)> {
    let sel_h1 = Selector::parse("h1").unwrap();
    let re_title = Regex::new(r"(?P<period>.+)\s+(?P<start>\d+)-(?P<end>\d+)$").unwrap();

    let title = document
        .select(&sel_h1)
        .next()
        .map(|h1| h1.text().collect::<Vec<_>>().join(" "))
        .ok_or_else(|| Error::structure("page title not found"))?;
    let title = title.trim();

    let captures = re_title
        .captures(title)
        .ok_or_else(|| Error::structure(format!("unexpected page title {title:?}")))?;

    Ok((
        captures["period"].trim().to_owned(),
        parse_number(&captures["start"], title)?,
        parse_number(&captures["end"], title)?,
    ))
}

/// Split the table into course sections and extract their exercises.
/// A section starts at a course marker cell and is as tall as that
/// cell's rowspan; running out of markers ends the scan.
fn scan_sections(table: &Table, grid: &DateGrid) -> Result<Vec<(Course, Vec<Exercise>)>> {
    let re_exercise = Regex::new(r"^(?P<number>\d+):(?P<kind>[A-Z]+)\s*(?P<title>.+)?").unwrap();

    let mut courses: Vec<(Course, Vec<Exercise>)> = Vec::new();
    let mut row = 0;
    while row < table.rows.len() {
        let Some(marker_cell) = table.rows[row].cells.iter().find(|c| c.marker.is_some())
        else {
            row += 1;
            continue;
        };

        let course = parse_course(marker_cell);
        let height = marker_cell.rowspan.ok_or_else(|| {
            Error::structure(format!("course marker {} has no rowspan", course.id))
        })?;
        if height == 0 || row + height > table.rows.len() {
            return Err(Error::structure(format!(
                "course {} spans {height} rows at row {row}, past the end of the table",
                course.id
            )));
        }
        if courses.iter().any(|(c, _)| *c == course) {
            return Err(Error::structure(format!(
                "course {} appears twice in the timetable",
                course.id
            )));
        }

        let exercises = parse_exercises(&table.rows[row..row + height], grid, &re_exercise)?;
        courses.push((course, exercises));
        row += height;
    }

    Ok(courses)
}

fn parse_course(marker_cell: &Cell) -> Course {
    // Cell text is the code followed by " - " and the name
    let id = marker_cell.marker.clone().unwrap_or_default();
    let name = marker_cell
        .text
        .strip_prefix(id.as_str())
        .unwrap_or(&marker_cell.text)
        .replacen(" - ", "", 1)
        .trim()
        .to_owned();

    Course { id, name }
}

/// Walk one course's rows left to right, keeping a colspan aware column
/// index, and turn every recognized cell into an [`Exercise`]. Cells
/// with an unknown background or non matching text are quietly stepped
/// over; they are legends and annotations, not exercises.
fn parse_exercises(rows: &[Row], grid: &DateGrid, re_exercise: &Regex) -> Result<Vec<Exercise>> {
    let mut exercises = Vec::new();

    for (row_number, row) in rows.iter().enumerate() {
        let skip = if row_number == 0 { FIRST_ROW_SKIP } else { ROW_SKIP };

        let mut index = 0;
        for cell in row.cells.iter().skip(skip) {
            if let Some(exercise) = parse_exercise_cell(cell, index, grid, re_exercise)? {
                exercises.push(exercise);
            }
            index += cell.colspan;
        }
    }

    Ok(exercises)
}

fn parse_exercise_cell(
    cell: &Cell,
    index: usize,
    grid: &DateGrid,
    re_exercise: &Regex,
) -> Result<Option<Exercise>> {
    let Some(submission_type) = cell
        .color
        .as_deref()
        .and_then(SubmissionType::from_color)
    else {
        return Ok(None);
    };

    let Some(captures) = re_exercise.captures(&cell.text) else {
        return Ok(None);
    };

    let start = grid.date(index)?;
    let end = start + Duration::days(cell.colspan as i64 - 1);

    Ok(Some(Exercise {
        number: parse_number(&captures["number"], &cell.text)?,
        title: captures
            .name("title")
            .map(|title| title.as_str().trim().to_owned()),
        kind: captures["kind"].to_owned(),
        submission_type,
        start,
        end,
    }))
}

fn parse_number<T: std::str::FromStr>(digits: &str, context: &str) -> Result<T> {
    digits
        .parse()
        .map_err(|_| Error::structure(format!("number {digits:?} out of range in {context:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// A minimal page following the CATe template: three header rows,
    /// then course sections marked by blue course codes with rowspans.
    fn page(body: &str) -> String {
        format!(
            "<html><body><h1>Autumn 2023-2024</h1><p><table>\
             <tr><th>Timetable</th>\
                 <th bgcolor=\"white\" colspan=\"4\">October</th>\
                 <th bgcolor=\"white\" colspan=\"2\">November</th></tr>\
             <tr><th></th><th colspan=\"6\">weeks</th></tr>\
             <tr><th></th><th>9</th><th>10</th><th>11</th><th>12</th><th>6</th><th>7</th></tr>\
             {body}\
             </table></p></body></html>"
        )
    }

    fn course_row(id: &str, name: &str, rowspan: usize, cells: &str) -> String {
        format!(
            "<tr><td rowspan=\"{rowspan}\"><font color=\"blue\">{id}</font> - {name}</td>\
             <td></td><td></td><td></td>{cells}</tr>"
        )
    }

    #[test]
    fn title_parses_period_and_years() {
        let timetable = parse(&page("")).unwrap();
        assert_eq!(timetable.period, "Autumn");
        assert_eq!(timetable.start_year, 2023);
        assert_eq!(timetable.end_year, 2024);
        assert_eq!(timetable.courses().count(), 0);
    }

    #[test]
    fn extracts_exercise_with_colspan_window() {
        // Column index 3 resolves to 2023-10-12, cell spans two days
        let html = page(&course_row(
            "395",
            "Machine Learning",
            1,
            "<td></td><td></td><td></td>\
             <td bgcolor=\"#ccffcc\" colspan=\"2\">5:CW Problem Sheet</td>",
        ));

        let timetable = parse(&html).unwrap();
        let course = timetable.courses().next().unwrap().clone();
        assert_eq!(course.id, "395");
        assert_eq!(course.name, "Machine Learning");

        let exercises = timetable.exercises_for(&course).unwrap();
        assert_eq!(exercises.len(), 1);
        let exercise = &exercises[0];
        assert_eq!(exercise.number, 5);
        assert_eq!(exercise.kind, "CW");
        assert_eq!(exercise.title.as_deref(), Some("Problem Sheet"));
        assert_eq!(exercise.submission_type, SubmissionType::AssessedIndividual);
        assert_eq!(exercise.start, date(2023, 10, 12));
        assert_eq!(exercise.end, date(2023, 10, 13));
    }

    #[test]
    fn one_exercise_per_recognized_color() {
        let html = page(&course_row(
            "395",
            "Machine Learning",
            1,
            "<td bgcolor=\"white\">1:TUT</td>\
             <td bgcolor=\"#cdcdcd\">2:PMT</td>\
             <td bgcolor=\"#ccffcc\">3:CW</td>\
             <td bgcolor=\"#f0ccf0\">4:GRP</td>\
             <td bgcolor=\"#123456\">5:CW</td>\
             <td bgcolor=\"#ccffcc\">legend, not an exercise</td>",
        ));

        let timetable = parse(&html).unwrap();
        let course = timetable.courses().next().unwrap().clone();
        let exercises = timetable.exercises_for(&course).unwrap();

        let types: Vec<_> = exercises.iter().map(|e| e.submission_type).collect();
        assert_eq!(
            types,
            vec![
                SubmissionType::Unassessed,
                SubmissionType::UnassessedSubmissionRequired,
                SubmissionType::AssessedIndividual,
                SubmissionType::AssessedGroup,
            ]
        );
        // Skipped cells still advance the column index
        assert_eq!(exercises[3].start, date(2023, 10, 12));
    }

    #[test]
    fn second_row_of_a_section_skips_one_cell() {
        let html = page(&format!(
            "{}<tr><td></td><td bgcolor=\"#ccffcc\">2:CW Late</td></tr>",
            course_row(
                "395",
                "Machine Learning",
                2,
                "<td bgcolor=\"#ccffcc\">1:CW</td>"
            )
        ));

        let timetable = parse(&html).unwrap();
        let course = timetable.courses().next().unwrap().clone();
        let exercises = timetable.exercises_for(&course).unwrap();
        assert_eq!(exercises.len(), 2);
        // Both rows start at column 0 of the grid
        assert_eq!(exercises[0].start, date(2023, 10, 9));
        assert_eq!(exercises[1].start, date(2023, 10, 9));
    }

    #[test]
    fn sections_come_out_in_document_order() {
        let html = page(&format!(
            "{}{}",
            course_row("210", "Computer Architecture", 1, ""),
            course_row("395", "Machine Learning", 1, "")
        ));

        let timetable = parse(&html).unwrap();
        let ids: Vec<_> = timetable.courses().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["210", "395"]);
    }

    #[test]
    fn marker_without_rowspan_is_structural() {
        let html = page(
            "<tr><td><font color=\"blue\">395</font> - Machine Learning</td>\
             <td></td><td></td><td></td></tr>",
        );

        assert!(matches!(parse(&html), Err(Error::Structure(_))));
    }

    #[test]
    fn missing_title_is_structural() {
        let html = "<html><body><p><table></table></p></body></html>";
        assert!(matches!(parse(html), Err(Error::Structure(_))));
    }

    #[test]
    fn missing_table_is_structural() {
        let html = "<html><body><h1>Autumn 2023-2024</h1></body></html>";
        assert!(matches!(parse(html), Err(Error::Structure(_))));
    }

    #[test]
    fn too_few_header_rows_is_structural() {
        let html = "<html><body><h1>Autumn 2023-2024</h1>\
                    <p><table><tr><th>only one row</th></tr></table></p></body></html>";
        assert!(matches!(parse(html), Err(Error::Structure(_))));
    }

    #[test]
    fn exercise_past_the_grid_is_out_of_range() {
        let html = page(&course_row(
            "395",
            "Machine Learning",
            1,
            "<td colspan=\"6\"></td><td bgcolor=\"#ccffcc\">1:CW</td>",
        ));

        assert!(matches!(parse(&html), Err(Error::OutOfRange { .. })));
    }
}
