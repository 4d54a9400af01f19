// Reading and writing the spreadsheet template.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::{debug, info, warn};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use snafu::prelude::*;

use survey_tables::{QuestionSet, StatisticsConfig, TableSet, TableSpec};

use crate::tabgen::config_reader::Settings;
use crate::tabgen::*;

pub const TABLES_SHEET: &str = "tables";
pub const LABELS_SHEET: &str = "labels";

const TABLES_HEADER: [(&str, u16); 7] = [
    ("QuestionID", 15),
    ("Variables", 15),
    ("Title", 30),
    ("Subtitle\\Question", 60),
    ("Caption", 22),
    ("Corner", 10),
    ("Properties", 30),
];

const LABELS_HEADER: [(&str, u16); 4] = [
    ("QuestionID", 30),
    ("Variable", 30),
    ("Value", 15),
    ("Label", 100),
];

// Column indexes in the tables sheet
const COL_ID: usize = 0;
const COL_VARIABLES: usize = 1;
const COL_TITLE: usize = 2;
const COL_SUBTITLE: usize = 3;
const COL_CAPTION: usize = 4;
const COL_CORNER: usize = 5;
const COL_PROPERTIES: usize = 6;

// Column indexes in the labels sheet
const COL_VALUE: usize = 2;
const COL_LABEL: usize = 3;

fn write_header(ws: &mut Worksheet, header: &[(&str, u16)]) -> Result<(), XlsxError> {
    for (col, (name, width)) in header.iter().enumerate() {
        ws.write_string(0, col as u16, *name)?;
        ws.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

fn write_optional(
    ws: &mut Worksheet,
    row: u32,
    col: usize,
    text: &Option<String>,
) -> Result<(), XlsxError> {
    if let Some(t) = text {
        ws.write_string(row, col as u16, t.as_str())?;
    }
    Ok(())
}

fn tables_sheet(tables: &TableSet) -> Result<Worksheet, XlsxError> {
    let mut ws = Worksheet::new();
    ws.set_name(TABLES_SHEET)?;
    write_header(&mut ws, &TABLES_HEADER)?;
    for (idx, spec) in tables.iter().enumerate() {
        let row = idx as u32 + 1;
        ws.write_string(row, COL_ID as u16, spec.id.as_str())?;
        ws.write_string(row, COL_VARIABLES as u16, spec.rows.join(" "))?;
        write_optional(&mut ws, row, COL_TITLE, &spec.title)?;
        write_optional(&mut ws, row, COL_SUBTITLE, &spec.subtitle)?;
        write_optional(&mut ws, row, COL_CAPTION, &spec.footer)?;
        write_optional(&mut ws, row, COL_CORNER, &spec.corner)?;
        if !spec.statistics.is_empty() {
            ws.write_string(row, COL_PROPERTIES as u16, spec.statistics.to_properties())?;
        }
    }
    Ok(ws)
}

// The first row of a question carries its id and its variables, and its first
// value label. A blank row follows the value labels.
fn labels_sheet(questions: &QuestionSet) -> Result<Worksheet, XlsxError> {
    let mut ws = Worksheet::new();
    ws.set_name(LABELS_SHEET)?;
    write_header(&mut ws, &LABELS_HEADER)?;
    let mut row: u32 = 1;
    for question in questions.iter() {
        ws.write_string(row, COL_ID as u16, question.id.as_str())?;
        ws.write_string(row, 1, question.children.join(" "))?;
        for (code, label) in question.value_labels.iter() {
            ws.write_number(row, COL_VALUE as u16, *code as f64)?;
            ws.write_string(row, COL_LABEL as u16, label.as_str())?;
            row += 1;
        }
        row += 1;
    }
    Ok(ws)
}

/// Writes the template: one row per question in the tables sheet, one row per
/// value label in the labels sheet.
pub fn write_template(path: &str, questions: &QuestionSet, settings: &Settings) -> TabResult<()> {
    let tables: TableSet = questions
        .iter()
        .map(|q| TableSpec {
            footer: Some(settings.default_caption.clone()),
            ..TableSpec::for_question(q)
        })
        .collect();
    write_tables(path, &tables, questions)
}

/// Writes the given tables and the value labels of the questions.
pub fn write_tables(path: &str, tables: &TableSet, questions: &QuestionSet) -> TabResult<()> {
    let mut workbook = Workbook::new();
    let tables_ws = tables_sheet(tables).context(WritingExcelSnafu { path })?;
    let labels_ws = labels_sheet(questions).context(WritingExcelSnafu { path })?;
    workbook.push_worksheet(tables_ws);
    workbook.push_worksheet(labels_ws);
    workbook.save(path).context(WritingExcelSnafu { path })?;
    debug!(
        "write_tables: wrote {} tables and {} questions to {}",
        tables.len(),
        questions.len(),
        path
    );
    Ok(())
}

fn get_sheet(path: &str, name: &str) -> TabResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    workbook
        .worksheet_range(name)
        .context(MissingSheetSnafu { name, path })?
        .context(OpeningExcelSnafu { path })
}

// Numbers are written back without a fractional part when they have none.
fn cell_text(cell: Option<&DataType>, sheet: &str, lineno: usize) -> TabResult<String> {
    match cell {
        None | Some(DataType::Empty) => Ok(String::new()),
        Some(DataType::String(s)) => Ok(s.trim().to_string()),
        Some(DataType::Int(i)) => Ok(i.to_string()),
        Some(DataType::Float(f)) if f.fract() == 0.0 => Ok((*f as i64).to_string()),
        Some(DataType::Float(f)) => Ok(f.to_string()),
        Some(DataType::Bool(b)) => Ok(b.to_string()),
        Some(x) => ExcelWrongCellTypeSnafu {
            sheet,
            lineno: lineno as u64,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn optional(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Reads the edited template.
///
/// The subtitles replace the labels of the questions, and the labels sheet
/// replaces their value labels.
pub fn read_template(path: &str, questions: &mut QuestionSet) -> TabResult<TableSet> {
    let wrange = get_sheet(path, TABLES_SHEET)?;
    let mut tables = TableSet::new();
    // The first row is the header.
    for (idx, row) in wrange.rows().enumerate().skip(1) {
        let lineno = idx + 1;
        let id = cell_text(row.get(COL_ID), TABLES_SHEET, lineno)?;
        if id.is_empty() {
            warn!("read_template: row {} has no question id, skipping it", lineno);
            continue;
        }
        let variables = cell_text(row.get(COL_VARIABLES), TABLES_SHEET, lineno)?;
        let subtitle = cell_text(row.get(COL_SUBTITLE), TABLES_SHEET, lineno)?;
        let properties = cell_text(row.get(COL_PROPERTIES), TABLES_SHEET, lineno)?;
        if !questions.set_label(&id, &subtitle) {
            warn!("read_template: row {}: unknown question {}", lineno, id);
        }
        let spec = TableSpec {
            id: id.clone(),
            title: optional(cell_text(row.get(COL_TITLE), TABLES_SHEET, lineno)?),
            subtitle: optional(subtitle),
            footer: optional(cell_text(row.get(COL_CAPTION), TABLES_SHEET, lineno)?),
            corner: optional(cell_text(row.get(COL_CORNER), TABLES_SHEET, lineno)?),
            rows: variables.split_whitespace().map(|s| s.to_string()).collect(),
            statistics: StatisticsConfig::from_properties(&properties),
            exported: false,
        };
        debug!("read_template: row {}: {:?}", lineno, spec);
        tables.add(spec);
    }
    info!("Read {} tables from {}", tables.len(), path);

    let wrange = get_sheet(path, LABELS_SHEET)?;
    let mut previous_id = String::new();
    for (idx, row) in wrange.rows().enumerate().skip(1) {
        let lineno = idx + 1;
        let mut id = cell_text(row.get(COL_ID), LABELS_SHEET, lineno)?;
        if id.is_empty() {
            id = previous_id.clone();
        }
        let value = cell_text(row.get(COL_VALUE), LABELS_SHEET, lineno)?;
        if !id.is_empty() && !value.is_empty() {
            let label = cell_text(row.get(COL_LABEL), LABELS_SHEET, lineno)?;
            match value.parse::<i64>() {
                Ok(code) => {
                    if !questions.set_value_label(&id, code, &label) {
                        warn!("read_template: labels row {}: unknown question {}", lineno, id);
                    }
                }
                Err(_) => warn!(
                    "read_template: labels row {}: value {:?} is not an integer, skipping it",
                    lineno, value
                ),
            }
        }
        previous_id = id;
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ActionArgs;
    use crate::tabgen::config_reader::TabConfig;
    use survey_tables::{group_questions, StatRequest, Variable};

    fn settings() -> Settings {
        let args = ActionArgs {
            data_file: "survey.json".to_string(),
            responses: None,
            xlsx_file_path: None,
            multiple_choice_separator: None,
            rotation_separator: None,
            independent: vec![],
            use_unlabeled_values: false,
            encoding: None,
            reference: None,
        };
        Settings::resolve(&TabConfig::default(), &args).unwrap()
    }

    fn questions() -> QuestionSet {
        let vars = vec![
            Variable::new("Q1@1", "Brands").with_values(&[(1, "Yes"), (2, "No")]),
            Variable::new("Q1@2", ""),
            Variable::new("Q2", "Age"),
            Variable::new("Q3", "Sex").with_values(&[(1, "M"), (2, "F")]),
        ];
        group_questions(&vars, "@", None).unwrap()
    }

    #[test]
    fn unedited_template_reproduces_the_questions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.xlsx").display().to_string();
        let original = questions();
        write_template(&path, &original, &settings()).unwrap();

        let mut read_back = questions();
        let tables = read_template(&path, &mut read_back).unwrap();
        assert_eq!(read_back, original);
        assert_eq!(tables.ids(), vec!["Q1", "Q2", "Q3"]);
        let q1 = tables.get("Q1").unwrap();
        assert_eq!(q1.rows, vec!["Q1@1".to_string(), "Q1@2".to_string()]);
        assert_eq!(q1.title, None);
        assert_eq!(q1.subtitle.as_deref(), Some("Brands"));
        assert_eq!(q1.footer.as_deref(), Some("Base: all respondents"));
        assert_eq!(q1.statistics, StatisticsConfig::percentage(&[]));
    }

    #[test]
    fn edited_tables_are_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.xlsx").display().to_string();
        let edited = TableSpec {
            title: Some("Brand awareness".to_string()),
            corner: Some("%".to_string()),
            statistics: StatisticsConfig::percentage(&[StatRequest::top(2), StatRequest::bottom(1)])
                .with_mean(),
            ..TableSpec::new("Q3", &["Q3"])
        };
        let tables: TableSet = vec![TableSpec::new("Q2", &["Q2"]), edited.clone()]
            .into_iter()
            .collect();
        write_tables(&path, &tables, &questions()).unwrap();

        let read_back = read_template(&path, &mut questions()).unwrap();
        assert_eq!(read_back.get("Q3"), Some(&edited));
        // An empty Properties cell still enables the column percentages.
        assert_eq!(
            read_back.get("Q2").unwrap().statistics,
            StatisticsConfig::percentage(&[])
        );
    }

    #[test]
    fn missing_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.xlsx").display().to_string();
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name("data").unwrap();
        workbook.save(&path).unwrap();
        let res = read_template(&path, &mut questions());
        assert!(matches!(res, Err(TabError::MissingSheet { .. })));
    }
}
