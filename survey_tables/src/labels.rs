use log::warn;

use crate::compiler::quote;
use crate::model::{Question, QuestionSet};

// Dashes are not valid in variable names of the macro language.
fn syntax_name(variable_id: &str) -> String {
    variable_id.replace('-', "")
}

fn value_label_lines(question: &Question) -> Vec<String> {
    question
        .value_labels
        .iter()
        .filter(|(_, label)| !label.is_empty())
        .map(|(code, label)| format!("{} {}", code, quote(label)))
        .collect()
}

/// Renders the variable and value labels of all the questions.
///
/// Every line is first submitted to `accept`, typically a check that it can be
/// written in the output encoding. Rejected lines are skipped: a value label
/// statement loses only the rejected values, and disappears if none remain.
pub fn label_syntax<F>(questions: &QuestionSet, mut accept: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let mut res = String::new();
    for question in questions.iter() {
        if !question.label.is_empty() {
            for child in question.children.iter() {
                let line = format!("var lab {} {}.", syntax_name(child), quote(&question.label));
                if accept(&line) {
                    res.push_str(&line);
                    res.push('\n');
                } else {
                    warn!("label_syntax: skipping variable label of {}", child);
                }
            }
        }

        let header = format!(
            "val lab {}",
            question
                .children
                .iter()
                .map(|c| syntax_name(c))
                .collect::<Vec<String>>()
                .join(" ")
        );
        let mut values: Vec<String> = Vec::new();
        for line in value_label_lines(question) {
            if accept(&line) {
                values.push(line);
            } else {
                warn!(
                    "label_syntax: skipping value label {:?} of question {}",
                    line, question.id
                );
            }
        }
        if !values.is_empty() && accept(&header) {
            res.push_str(&header);
            res.push('\n');
            res.push_str(&values.join("\n"));
            res.push_str(".\n");
        }
    }
    res
}
