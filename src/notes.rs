use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::session::{CateSession, CATE_HOST};
use crate::timetable::grid::collapse_text;

/// Default file name for downloaded notes
pub const DEFAULT_FORMAT: &str = "{title}.{filetype}";

/// One downloadable entry of a course's notes page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notes {
    /// Position in the notes table
    pub number: u32,

    pub title: String,

    /// File extension advertised by the page, i.e. `pdf`
    pub filetype: String,

    /// Download link, relative to the portal host
    pub url: String,

    pub course_id: String,

    pub course_name: String,
}

/// Fetch a notes page and list its entries, keyed by number
pub async fn notes(session: &CateSession, url: &str) -> Result<BTreeMap<u32, Notes>> {
    let page = session.fetch(url).await?;
    parse_notes(&page)
}

/// Decode a notes page: every table row holding a `showfile.cgi` link is
/// one notes entry, and the course banner above the table names the
/// course they all belong to.
pub fn parse_notes(html: &str) -> Result<BTreeMap<u32, Notes>> {
    let document = Html::parse_document(html);

    let re_file = Regex::new(r"showfile\.cgi\?(\w|:)").unwrap();
    let sel_link = Selector::parse("a[href]").unwrap();
    let sel_td = Selector::parse("td").unwrap();

    let (course_id, course_name) = parse_course_banner(&document)?;

    let mut notes = BTreeMap::new();
    for link in document.select(&sel_link) {
        let href = link.value().attr("href").unwrap_or_default();
        if !re_file.is_match(href) {
            continue;
        }

        let row = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "tr")
            .ok_or_else(|| Error::structure(format!("notes link {href:?} outside a table row")))?;

        let cells: Vec<_> = row.select(&sel_td).map(collapse_text).collect();
        let [number, title, filetype, ..] = cells.as_slice() else {
            return Err(Error::structure(format!(
                "notes row for {href:?} has only {} cells",
                cells.len()
            )));
        };
        let number = number
            .parse()
            .map_err(|_| Error::structure(format!("bad notes number {number:?}")))?;

        notes.insert(
            number,
            Notes {
                number,
                title: title.clone(),
                filetype: filetype.clone(),
                url: href.to_owned(),
                course_id: course_id.clone(),
                course_name: course_name.clone(),
            },
        );
    }

    Ok(notes)
}

/// Find the `<id>: <name>` course banner of a notes page
fn parse_course_banner(document: &Html) -> Result<(String, String)> {
    let re_course = Regex::new(r"(\d+H?):\s+(.+)").unwrap();

    document
        .root_element()
        .text()
        .find_map(|text| re_course.captures(text))
        .map(|captures| (captures[1].to_owned(), captures[2].trim().to_owned()))
        .ok_or_else(|| Error::structure("course banner not found on notes page"))
}

impl Notes {
    /// Render a file name from a template with `{number}`, `{title}`,
    /// `{filetype}`, `{course_id}` and `{course_name}` placeholders
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{number}", &self.number.to_string())
            .replace("{title}", &self.title)
            .replace("{filetype}", &self.filetype)
            .replace("{url}", &self.url)
            .replace("{course_id}", &self.course_id)
            .replace("{course_name}", &self.course_name)
    }

    /// Download into `output_dir`, skipping files already on disk.
    /// Returns the path of the file.
    pub async fn download(
        &self,
        session: &CateSession,
        output_dir: &Path,
        template: Option<&str>,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(self.format(template.unwrap_or(DEFAULT_FORMAT)));

        if path.exists() {
            println!("{self} already downloaded");
            return Ok(path);
        }

        println!("Downloading {self} => {}", path.display());
        let url = format!("{CATE_HOST}{}", self.url);
        session.download(&url, &path).await?;
        Ok(path)
    }
}

impl std::fmt::Display for Notes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) {}.{}", self.number, self.title, self.filetype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><body>\
        <h2>Module</h2><h3>395: Machine Learning</h3>\
        <table>\
        <tr><td>1</td><td><a href=\"showfile.cgi?key:abc\">Introduction</a></td><td>pdf</td><td>x</td></tr>\
        <tr><td>2</td><td><a href=\"showfile.cgi?key:def\">Regression</a></td><td>pdf</td><td>x</td></tr>\
        <tr><td>9</td><td><a href=\"other.cgi?x\">Not notes</a></td><td>pdf</td><td>x</td></tr>\
        </table></body></html>";

    fn sample() -> Notes {
        Notes {
            number: 1,
            title: "Introduction".to_owned(),
            filetype: "pdf".to_owned(),
            url: "showfile.cgi?key:abc".to_owned(),
            course_id: "395".to_owned(),
            course_name: "Machine Learning".to_owned(),
        }
    }

    #[test]
    fn lists_only_showfile_rows() {
        let notes = parse_notes(PAGE).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes.get(&1), Some(&sample()));
        assert_eq!(notes[&2].title, "Regression");
        assert!(!notes.contains_key(&9));
    }

    #[test]
    fn page_without_banner_is_structural() {
        let html = "<html><body>\
            <table><tr><td>1</td><td><a href=\"showfile.cgi?key:abc\">A</a></td><td>pdf</td></tr></table>\
            </body></html>";
        assert!(matches!(parse_notes(html), Err(Error::Structure(_))));
    }

    #[test]
    fn formats_with_placeholders() {
        let notes = sample();
        assert_eq!(notes.format(DEFAULT_FORMAT), "Introduction.pdf");
        assert_eq!(
            notes.format("{course_id} {course_name} ({number}) {title}.{filetype}"),
            "395 Machine Learning (1) Introduction.pdf"
        );
        assert_eq!(notes.format("plain"), "plain");
    }
}
