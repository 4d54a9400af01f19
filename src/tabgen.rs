use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_tables::*;

use std::fs;
use text_diff::print_diff;

use crate::args::ActionArgs;
use crate::tabgen::config_reader::*;
use crate::tabgen::io_common::*;
use crate::tabgen::io_dictionary::*;

pub mod config_reader;
pub mod io_common;
pub mod io_dictionary;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The worksheet {name} is missing in {path}"))]
    MissingSheet { name: String, path: String },
    #[snafu(display("Unexpected content in sheet {sheet}, row {lineno}: {content}"))]
    ExcelWrongCellType {
        sheet: String,
        lineno: u64,
        content: String,
    },
    #[snafu(display("Error writing the spreadsheet {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening the responses file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of the responses file: {source}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error reading the reference syntax {path}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Unknown output encoding {label}"))]
    UnknownEncoding { label: String },
    #[snafu(display("Please specify the template file path with --xlsx-file-path"))]
    MissingRequiredPath {},
    #[snafu(display("Invalid survey structure: {source}"))]
    Grouping { source: GroupingError },
    #[snafu(display("Failed to compile the tables: {source}"))]
    Compiling { source: CompileError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

/// Reads the data dictionary and groups its variables into questions.
fn read_questions(args: &ActionArgs, settings: &Settings) -> TabResult<QuestionSet> {
    let source = DictionaryFile::open(&args.data_file, args.responses.as_deref())?;
    let catalog = build_catalog(&source, settings);
    info!(
        "Read {} variables from {}",
        catalog.len(),
        args.data_file.as_str()
    );
    let questions = group_questions(catalog.iter(), &settings.multiple_choice_separator, None)
        .context(GroupingSnafu {})?;
    info!("Found {} questions", questions.len());
    Ok(questions)
}

/// Writes the spreadsheet template: one table per question, and the value labels.
pub fn run_download(config_path: Option<&str>, args: &ActionArgs) -> TabResult<()> {
    let config = read_config(config_path)?;
    let settings = Settings::resolve(&config, args)?;
    debug!("run_download: settings: {:?}", settings);

    let questions = read_questions(args, &settings)?;
    let template_path = args
        .xlsx_file_path
        .clone()
        .unwrap_or_else(|| default_template_path(&args.data_file));

    io_xlsx::write_template(&template_path, &questions, &settings)?;
    info!("Template successfully created at {}", template_path);
    Ok(())
}

/// Reads the edited template and writes the table and label syntax files.
///
/// Both files are written only if everything compiled.
pub fn run_upload(config_path: Option<&str>, args: &ActionArgs) -> TabResult<()> {
    let template_path = args
        .xlsx_file_path
        .clone()
        .context(MissingRequiredPathSnafu {})?;
    let config = read_config(config_path)?;
    let settings = Settings::resolve(&config, args)?;
    debug!("run_upload: settings: {:?}", settings);

    let mut questions = read_questions(args, &settings)?;
    let mut tables = io_xlsx::read_template(&template_path, &mut questions)?;

    let options = CompileOptions {
        rotation: settings.rotation.clone(),
    };
    let output = compile_batch(&questions, &mut tables, &options).context(CompilingSnafu {})?;
    if !output.suppressed.is_empty() {
        info!(
            "Tables folded into rotated blocks: {}",
            output.suppressed.join(", ")
        );
    }
    let labels = label_syntax(&questions, |line| is_encodable(line, settings.encoding));

    let (tables_path, labels_path) = output_paths(&template_path);
    write_outputs(&[
        (
            tables_path.clone(),
            encode_text(&output.tables_syntax, settings.encoding),
        ),
        (labels_path.clone(), encode_text(&labels, settings.encoding)),
    ])?;
    info!(
        "SPSS files successfully created at {} and {}",
        tables_path.display(),
        labels_path.display()
    );

    // The reference syntax, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &output.tables_syntax)?;
    }
    Ok(())
}

fn check_reference(reference_path: &str, generated: &str) -> TabResult<()> {
    let reference = fs::read_to_string(reference_path).context(OpeningReferenceSnafu {
        path: reference_path,
    })?;
    if reference != generated {
        warn!("Found differences with the reference syntax {}", reference_path);
        print_diff(reference.as_str(), generated, "\n");
        whatever!("Difference detected between the generated syntax and the reference syntax")
    }
    info!("The generated syntax matches the reference {}", reference_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn action_args(dir: &Path, xlsx: Option<&str>) -> ActionArgs {
        ActionArgs {
            data_file: dir.join("survey.json").display().to_string(),
            responses: None,
            xlsx_file_path: xlsx.map(|s| dir.join(s).display().to_string()),
            multiple_choice_separator: None,
            rotation_separator: None,
            independent: vec![],
            use_unlabeled_values: false,
            encoding: None,
            reference: None,
        }
    }

    const DICTIONARY: &str = r#"{
        "variables": [
            { "id": "InterviewID", "label": "", "type": 0 },
            { "id": "Q1@1", "label": "Which brands do you know?", "type": 0,
              "values": { "0": "Not mentioned", "1": "Mentioned" } },
            { "id": "Q1@2", "label": "", "type": 0 },
            { "id": "S_1", "label": "Rate item one", "type": 0,
              "values": { "1": "Bad", "2": "Fair", "3": "Good", "9": "Don't know" } },
            { "id": "S_2", "label": "Rate item two", "type": 0 },
            { "id": "Q2", "label": "Age", "type": 0,
              "values": { "1": "18-34", "2": "35+" } }
        ]
    }"#;

    #[test]
    fn upload_requires_the_template_path() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_upload(None, &action_args(dir.path(), None));
        assert!(matches!(res, Err(TabError::MissingRequiredPath {})));
    }

    #[test]
    fn download_then_upload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("survey.json"), DICTIONARY).unwrap();
        let args = action_args(dir.path(), Some("survey.xlsx"));
        run_download(None, &args).unwrap();
        run_upload(None, &args).unwrap();

        let tables = fs::read_to_string(dir.path().join("survey_lin.sps")).unwrap();
        // InterviewID is a system field, S_1 and S_2 form a rotation.
        assert!(!tables.contains("InterviewID"));
        assert_eq!(tables.matches("TABLES\n").count(), 3);
        assert!(tables.contains("/make S_1 from S_1 S_2\n/index rot_idx.\n"));
        assert!(tables.contains("val lab rot_idx\n1 \"Rate item one\"\n2 \"Rate item two\".\n"));
        assert!(tables.contains("/MRGROUP $ff \"\" Q1@1 Q1@2\n"));
        assert!(tables.contains("/CAPTION \"Base: all respondents\"\n"));

        let labels = fs::read_to_string(dir.path().join("survey_lab.sps")).unwrap();
        assert!(labels.contains("var lab Q1@1 \"Which brands do you know?\".\n"));
        assert!(labels.contains("val lab Q2\n1 \"18-34\"\n2 \"35+\".\n"));
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("reference.sps");
        fs::write(&reference, "TABLES\n").unwrap();
        let path = reference.display().to_string();
        assert!(check_reference(&path, "TABLES\n").is_ok());
        assert!(check_reference(&path, "TABLES.\n").is_err());
    }

    #[test]
    fn missing_reference_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sps").display().to_string();
        assert!(matches!(
            check_reference(&path, "TABLES\n"),
            Err(TabError::OpeningReference { .. })
        ));
    }
}
