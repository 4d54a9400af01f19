use indexmap::IndexMap;
use log::debug;
use std::collections::BTreeSet;

use crate::config::GroupingError;
use crate::model::{Question, QuestionSet, Variable};

/// The id of the question a variable belongs to.
///
/// This is the part of the id before the first separator, unless the id is
/// listed in the exceptions or contains no separator.
pub fn question_key<'a>(
    variable_id: &'a str,
    separator: &str,
    except: Option<&BTreeSet<String>>,
) -> &'a str {
    if except.map_or(false, |e| e.contains(variable_id)) {
        return variable_id;
    }
    match variable_id.find(separator) {
        Some(pos) => &variable_id[..pos],
        None => variable_id,
    }
}

/// Groups the flat variables into questions.
///
/// The questions appear in the order of the first occurrence of their key.
/// Each question takes its label and type from its first member, and the
/// value labels of all the members, merged in order.
pub fn group_questions<'a, I>(
    variables: I,
    separator: &str,
    except: Option<&BTreeSet<String>>,
) -> Result<QuestionSet, GroupingError>
where
    I: IntoIterator<Item = &'a Variable>,
{
    if separator.is_empty() {
        return Err(GroupingError::EmptySeparator);
    }

    let mut groups: IndexMap<&str, Vec<&Variable>> = IndexMap::new();
    for v in variables {
        let key = question_key(v.id.as_str(), separator, except);
        groups.entry(key).or_default().push(v);
    }

    let mut res = QuestionSet::new();
    for (key, members) in groups.iter() {
        // Never empty: a key is only created together with its first member.
        let first = members[0];
        let mut question = Question {
            id: key.to_string(),
            label: first.label.clone(),
            type_code: first.type_code,
            children: Vec::with_capacity(members.len()),
            value_labels: first.value_labels.clone(),
        };
        for m in members.iter() {
            question.children.push(m.id.clone());
            for (code, label) in m.value_labels.iter() {
                question.value_labels.insert(*code, label.clone());
            }
        }
        debug!(
            "group_questions: question {} children: {:?}",
            question.id, question.children
        );
        res.push(question);
    }
    Ok(res)
}
