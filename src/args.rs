use clap::{Parser, Subcommand};

/// This program generates SPSS banner table syntax from a survey data dictionary,
/// through an editable spreadsheet template.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub action: Action,

    /// (file path, optional) A JSON file with the default settings. The options passed on the
    /// command line override the values of this file.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Action {
    /// Writes the spreadsheet template describing one table per question.
    Download(ActionArgs),
    /// Reads the edited spreadsheet template and writes the table and label syntax files.
    Upload(ActionArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ActionArgs {
    /// (file path) The data dictionary of the survey, in JSON format.
    #[clap(value_parser)]
    pub data_file: String,

    /// (file path, optional) The raw responses in CSV format, with one column per variable.
    #[clap(long, value_parser)]
    pub responses: Option<String>,

    /// (file path) The spreadsheet template. Optional for download (defaults to the data file
    /// path followed by .xlsx), required for upload.
    #[clap(long, value_parser)]
    pub xlsx_file_path: Option<String>,

    /// (default @) The separator between the question id and the choice in the variable ids.
    #[clap(long, value_parser)]
    pub multiple_choice_separator: Option<String>,

    /// (default _) The separator between the block id and the item in rotated questions.
    #[clap(long, value_parser)]
    pub rotation_separator: Option<String>,

    /// (list of question ids) Questions that should never be treated as rotated. May be repeated.
    #[clap(long, value_parser)]
    pub independent: Vec<String>,

    /// If passed as an argument, numeric variables without value labels get the values found in
    /// the responses.
    #[clap(long, takes_value = false)]
    pub use_unlabeled_values: bool,

    /// (default utf-8) The encoding of the generated syntax files, e.g. windows-1251.
    #[clap(long, value_parser)]
    pub encoding: Option<String>,

    /// (file path, optional) A reference table syntax file. If provided, the generated syntax is
    /// checked against it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}
