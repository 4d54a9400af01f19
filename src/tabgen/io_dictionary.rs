// Primitives for reading the data dictionary and the raw responses.

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeSet;
use std::fs;

use survey_tables::{Variable, VariableCatalog};

use crate::tabgen::config_reader::Settings;
use crate::tabgen::*;

/// Anything that can provide the variables of a survey and, optionally, the
/// raw values of the responses.
pub trait ResponseSource {
    fn variables(&self) -> Vec<Variable>;
    /// The non-empty numeric values of one variable, if the responses are known.
    fn raw_values(&self, id: &str) -> Option<Vec<f64>>;
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonVariable {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub type_code: u32,
    #[serde(default)]
    pub values: IndexMap<String, String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonDictionary {
    pub variables: Vec<JsonVariable>,
}

/// A JSON data dictionary, with the raw responses from a CSV file.
#[derive(PartialEq, Debug, Clone)]
pub struct DictionaryFile {
    dictionary: JsonDictionary,
    responses: Option<IndexMap<String, Vec<f64>>>,
}

impl DictionaryFile {
    pub fn open(path: &str, responses_path: Option<&str>) -> TabResult<DictionaryFile> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        let dictionary: JsonDictionary =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        let responses = match responses_path {
            Some(p) => Some(read_responses(p)?),
            None => None,
        };
        Ok(DictionaryFile {
            dictionary,
            responses,
        })
    }
}

// Only integral codes can be value labels.
fn parse_code(key: &str) -> Option<i64> {
    let x: f64 = key.trim().parse().ok()?;
    if x.fract() == 0.0 && x.is_finite() {
        Some(x as i64)
    } else {
        None
    }
}

impl ResponseSource for DictionaryFile {
    fn variables(&self) -> Vec<Variable> {
        let mut res = Vec::with_capacity(self.dictionary.variables.len());
        for jv in self.dictionary.variables.iter() {
            let mut v = Variable::new(&jv.id, &jv.label);
            v.type_code = jv.type_code;
            for (key, label) in jv.values.iter() {
                match parse_code(key) {
                    Some(code) => {
                        v.value_labels.insert(code, label.clone());
                    }
                    None => warn!(
                        "variables: {}: value {:?} is not an integer, skipping its label",
                        jv.id, key
                    ),
                }
            }
            res.push(v);
        }
        res
    }

    fn raw_values(&self, id: &str) -> Option<Vec<f64>> {
        self.responses.as_ref()?.get(id).cloned()
    }
}

/// Reads the raw responses, column by column. Empty and non-numeric cells are
/// left out.
fn read_responses(path: &str) -> TabResult<IndexMap<String, Vec<f64>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    let mut columns: IndexMap<String, Vec<f64>> =
        headers.iter().map(|h| (h.clone(), Vec::new())).collect();

    for (idx, line_r) in rdr.records().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        for (header, cell) in headers.iter().zip(line.iter()) {
            if let (Ok(x), Some(col)) = (cell.trim().parse::<f64>(), columns.get_mut(header)) {
                col.push(x);
            }
        }
    }
    info!("Read the responses of {} variables from {}", columns.len(), path);
    Ok(columns)
}

/// The distinct integral values, sorted.
fn distinct_codes(values: &[f64]) -> Vec<i64> {
    let codes: BTreeSet<i64> = values
        .iter()
        .filter(|x| x.fract() == 0.0 && x.is_finite())
        .map(|x| *x as i64)
        .collect();
    codes.into_iter().collect()
}

/// The variables to tabulate: the ignored ones are dropped and, if requested,
/// numeric variables without labels get the values found in the responses.
pub fn build_catalog<S: ResponseSource>(source: &S, settings: &Settings) -> VariableCatalog {
    let mut catalog = VariableCatalog::new();
    for mut v in source.variables() {
        if settings.is_ignored(&v.id) {
            debug!("build_catalog: ignoring {}", v.id);
            continue;
        }
        if settings.use_unlabeled_values && v.is_numeric() && v.value_labels.is_empty() {
            match source.raw_values(&v.id) {
                Some(values) => {
                    for code in distinct_codes(&values) {
                        v.value_labels.insert(code, String::new());
                    }
                }
                None => debug!("build_catalog: no responses for {}", v.id),
            }
        }
        catalog.add(v);
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ActionArgs;
    use crate::tabgen::config_reader::TabConfig;

    struct Fixed(Vec<Variable>, IndexMap<String, Vec<f64>>);

    impl ResponseSource for Fixed {
        fn variables(&self) -> Vec<Variable> {
            self.0.clone()
        }
        fn raw_values(&self, id: &str) -> Option<Vec<f64>> {
            self.1.get(id).cloned()
        }
    }

    fn settings(use_unlabeled_values: bool) -> Settings {
        let args = ActionArgs {
            data_file: "survey.json".to_string(),
            responses: None,
            xlsx_file_path: None,
            multiple_choice_separator: None,
            rotation_separator: None,
            independent: vec![],
            use_unlabeled_values,
            encoding: None,
            reference: None,
        };
        Settings::resolve(&TabConfig::default(), &args).unwrap()
    }

    #[test]
    fn unlabeled_values() {
        let mut text = Variable::new("T1", "Comment");
        text.type_code = 200;
        let source = Fixed(
            vec![
                Variable::new("InterviewID", ""),
                Variable::new("Q1", "Age"),
                Variable::new("Q2", "Sex").with_values(&[(1, "M")]),
                text,
            ],
            [
                ("Q1".to_string(), vec![3.0, 1.0, 3.0, 2.5]),
                ("Q2".to_string(), vec![2.0]),
                ("T1".to_string(), vec![1.0]),
            ]
            .into_iter()
            .collect(),
        );
        let catalog = build_catalog(&source, &settings(true));
        assert_eq!(catalog.ids().collect::<Vec<&str>>(), vec!["Q1", "Q2", "T1"]);
        let q1 = catalog.get("Q1").unwrap();
        assert_eq!(q1.value_labels.keys().cloned().collect::<Vec<i64>>(), vec![1, 3]);
        assert_eq!(catalog.get("Q2").unwrap().value_labels.len(), 1);
        assert!(catalog.get("T1").unwrap().value_labels.is_empty());

        let catalog = build_catalog(&source, &settings(false));
        assert!(catalog.get("Q1").unwrap().value_labels.is_empty());
    }

    #[test]
    fn read_dictionary_and_responses() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("survey.json");
        let csv = dir.path().join("survey.csv");
        fs::write(
            &json,
            r#"{ "variables": [
                { "id": "Q1", "label": "Age", "type": 0,
                  "values": { "1": "Young", "2.0": "Old", "x": "Unknown" } },
                { "id": "Q2" } ] }"#,
        )
        .unwrap();
        fs::write(&csv, "Q1,Q2\n1,4\n2,\n,5\n").unwrap();
        let source = DictionaryFile::open(
            json.to_str().unwrap(),
            Some(csv.to_str().unwrap()),
        )
        .unwrap();
        let vars = source.variables();
        assert_eq!(vars.len(), 2);
        assert_eq!(
            vars[0].value_labels,
            [(1, "Young".to_string()), (2, "Old".to_string())]
                .into_iter()
                .collect::<IndexMap<i64, String>>()
        );
        assert_eq!(vars[1].label, "");
        assert_eq!(source.raw_values("Q2"), Some(vec![4.0, 5.0]));
        assert_eq!(source.raw_values("Q3"), None);
    }

    #[test]
    fn broken_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("survey.json");
        fs::write(&json, "{ \"variables\": [ ").unwrap();
        let res = DictionaryFile::open(json.to_str().unwrap(), None);
        assert!(matches!(res, Err(TabError::ParsingJson { .. })));
    }
}
