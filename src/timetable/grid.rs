use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::error::{Error, Result};

/// One `<th>`/`<td>` of the timetable, flattened out of the HTML tree
#[derive(Clone, Debug)]
pub struct Cell {
    /// Visible text, whitespace collapsed, empty for filler cells
    pub text: String,

    /// Number of grid columns the cell covers
    pub colspan: usize,

    /// Number of grid rows the cell covers, when the attribute is present
    pub rowspan: Option<usize>,

    /// Raw `bgcolor` attribute
    pub color: Option<String>,

    /// Course code when the cell carries the blue course marker
    pub marker: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// The whole timetable `<table>`, as an ordered list of rows of cells.
/// Everything downstream works on this flat model instead of chasing
/// siblings through the scraper tree.
#[derive(Clone, Debug)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn from_element(table: ElementRef) -> Result<Self> {
        let sel_tr = Selector::parse("tr").unwrap();
        let sel_cell = Selector::parse("th, td").unwrap();
        let sel_font = Selector::parse("font[color=\"blue\"]").unwrap();
        let re_marker = Regex::new(r"^[A-Z0-9]+$").unwrap();

        let mut rows = Vec::new();
        for tr in table.select(&sel_tr) {
            let mut cells = Vec::new();
            for cell in tr.select(&sel_cell) {
                cells.push(Cell::from_element(cell, &sel_font, &re_marker)?);
            }
            rows.push(Row { cells });
        }

        Ok(Self { rows })
    }
}

impl Cell {
    fn from_element(cell: ElementRef, sel_font: &Selector, re_marker: &Regex) -> Result<Self> {
        let text = collapse_text(cell);

        let colspan = match cell.value().attr("colspan") {
            None => 1,
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::structure(format!("bad colspan {raw:?} on cell {text:?}")))?,
        };

        let rowspan = match cell.value().attr("rowspan") {
            None => None,
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| Error::structure(format!("bad rowspan {raw:?} on cell {text:?}")))?,
            ),
        };

        let color = cell.value().attr("bgcolor").map(str::to_owned);

        // Course sections start at a cell holding a blue course code
        let marker = cell
            .select(sel_font)
            .map(collapse_text)
            .find(|code| re_marker.is_match(code));

        Ok(Self {
            text,
            colspan,
            rowspan,
            color,
            marker,
        })
    }
}

/// Visible text of an element with runs of whitespace squeezed to one space
pub(crate) fn collapse_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
