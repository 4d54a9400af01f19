use crate::args::ActionArgs;
use crate::tabgen::*;

use encoding_rs::Encoding;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use survey_tables::{question_key, RotationConfig};

/// Fields written by the survey platform itself, never tabulated.
pub const DEFAULT_IGNORED_VARIABLES: [&str; 19] = [
    "InterviewID",
    "Respondent",
    "PanelResp",
    "Page",
    "Start",
    "End",
    "ValidateCount",
    "Status",
    "QueryString",
    "Referer",
    "IP",
    "Agent",
    "Length",
    "Version",
    "SurveyStarted",
    "ValidateCount@1",
    "pre_data@resp",
    "pre_data@s",
    "pre_data@a",
];

pub const DEFAULT_MULTIPLE_CHOICE_SEPARATOR: &str = "@";
pub const DEFAULT_CAPTION: &str = "Base: all respondents";
pub const DEFAULT_ENCODING: &str = "utf-8";

/// The content of the JSON configuration file. Every field is optional.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct TabConfig {
    #[serde(rename = "multipleChoiceSeparator")]
    pub multiple_choice_separator: Option<String>,
    #[serde(rename = "rotationSeparator")]
    pub rotation_separator: Option<String>,
    #[serde(rename = "independentVariables")]
    pub independent_variables: Option<Vec<String>>,
    #[serde(rename = "rotationExcludePrefix")]
    pub rotation_exclude_prefix: Option<String>,
    #[serde(rename = "ignoredVariables")]
    pub ignored_variables: Option<Vec<String>>,
    #[serde(rename = "useUnlabeledValues")]
    pub use_unlabeled_values: Option<bool>,
    #[serde(rename = "defaultCaption")]
    pub default_caption: Option<String>,
    #[serde(rename = "encoding")]
    pub encoding: Option<String>,
}

/// Reads the configuration file, if any.
pub fn read_config(path: Option<&str>) -> TabResult<TabConfig> {
    match path {
        None => Ok(TabConfig::default()),
        Some(p) => {
            let contents = fs::read_to_string(p).context(OpeningJsonSnafu { path: p })?;
            let config: TabConfig =
                serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: p })?;
            debug!("read_config: {:?}", config);
            Ok(config)
        }
    }
}

/// The settings of one run: the command line, then the configuration file,
/// then the defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub multiple_choice_separator: String,
    pub rotation: RotationConfig,
    pub ignored_variables: BTreeSet<String>,
    pub use_unlabeled_values: bool,
    pub default_caption: String,
    pub encoding: &'static Encoding,
}

impl Settings {
    pub fn resolve(config: &TabConfig, args: &ActionArgs) -> TabResult<Settings> {
        let multiple_choice_separator = args
            .multiple_choice_separator
            .clone()
            .or_else(|| config.multiple_choice_separator.clone())
            .unwrap_or_else(|| DEFAULT_MULTIPLE_CHOICE_SEPARATOR.to_string());

        let mut independent: BTreeSet<String> = config
            .independent_variables
            .iter()
            .flatten()
            .cloned()
            .collect();
        independent.extend(args.independent.iter().cloned());

        let rotation = RotationConfig {
            separator: args
                .rotation_separator
                .clone()
                .or_else(|| config.rotation_separator.clone())
                .unwrap_or_else(|| RotationConfig::DEFAULT_SEPARATOR.to_string()),
            independent,
            exclude_prefix: config
                .rotation_exclude_prefix
                .clone()
                .unwrap_or_else(|| RotationConfig::DEFAULT_EXCLUDE_PREFIX.to_string()),
        };
        if !rotation.is_enabled() {
            info!("Rotation detection is disabled");
        }

        let ignored_variables: BTreeSet<String> = match &config.ignored_variables {
            Some(l) => l.iter().cloned().collect(),
            None => DEFAULT_IGNORED_VARIABLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let encoding_label = args
            .encoding
            .clone()
            .or_else(|| config.encoding.clone())
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());
        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).context(
            UnknownEncodingSnafu {
                label: encoding_label.clone(),
            },
        )?;

        Ok(Settings {
            multiple_choice_separator,
            rotation,
            ignored_variables,
            use_unlabeled_values: args.use_unlabeled_values
                || config.use_unlabeled_values.unwrap_or(false),
            default_caption: config
                .default_caption
                .clone()
                .unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
            encoding,
        })
    }

    /// True if the variable, or the question it belongs to, is ignored.
    pub fn is_ignored(&self, variable_id: &str) -> bool {
        self.ignored_variables.contains(variable_id)
            || self.ignored_variables.contains(question_key(
                variable_id,
                &self.multiple_choice_separator,
                None,
            ))
    }
}
