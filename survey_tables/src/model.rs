// ********* Input data structures ***********

use indexmap::IndexMap;

/// Value labels of a variable: integer code -> label.
///
/// The insertion order is kept: it is the order in which labels are written
/// back to the spreadsheet and to the label syntax.
pub type ValueLabels = IndexMap<i64, String>;

/// A single response variable, as delivered by the data file reader.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Variable {
    pub id: String,
    pub label: String,
    /// 0 for numeric variables, the string width otherwise.
    pub type_code: u32,
    pub value_labels: ValueLabels,
}

impl Variable {
    pub fn new(id: &str, label: &str) -> Variable {
        Variable {
            id: id.to_string(),
            label: label.to_string(),
            type_code: 0,
            value_labels: ValueLabels::new(),
        }
    }

    /// Adds the value labels, in the given order.
    pub fn with_values(mut self, values: &[(i64, &str)]) -> Variable {
        for (code, label) in values {
            self.value_labels.insert(*code, label.to_string());
        }
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.type_code <= 1
    }
}

/// The flat, ordered list of variables of a survey.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VariableCatalog {
    variables: Vec<Variable>,
    index: IndexMap<String, usize>,
}

impl VariableCatalog {
    pub fn new() -> VariableCatalog {
        VariableCatalog::default()
    }

    /// Adds a variable at the end of the catalog.
    ///
    /// A variable with the same id is replaced and moves to the end.
    pub fn add(&mut self, variable: Variable) {
        if let Some(pos) = self.index.get(&variable.id).cloned() {
            self.variables.remove(pos);
            self.reindex();
        }
        self.index.insert(variable.id.clone(), self.variables.len());
        self.variables.push(variable);
    }

    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.index.get(id).map(|pos| &self.variables[*pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .variables
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.id.clone(), idx))
            .collect();
    }
}

impl FromIterator<Variable> for VariableCatalog {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut catalog = VariableCatalog::new();
        for v in iter {
            catalog.add(v);
        }
        catalog
    }
}

/// A logical question: one or more variables sharing an id prefix.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Question {
    pub id: String,
    pub label: String,
    pub type_code: u32,
    /// Member variable ids, in first-occurrence order.
    pub children: Vec<String>,
    /// Merged value labels of all the children. On a code collision, the
    /// label of the later child wins.
    pub value_labels: ValueLabels,
}

impl Question {
    /// The value-label codes in ascending order.
    pub fn sorted_codes(&self) -> Vec<i64> {
        let mut codes: Vec<i64> = self.value_labels.keys().cloned().collect();
        codes.sort_unstable();
        codes
    }

    pub fn has_code(&self, code: i64) -> bool {
        self.value_labels.contains_key(&code)
    }
}

/// The ordered questions of a survey, with lookup by id.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
    index: IndexMap<String, usize>,
}

impl QuestionSet {
    pub fn new() -> QuestionSet {
        QuestionSet::default()
    }

    pub(crate) fn push(&mut self, question: Question) {
        self.index.insert(question.id.clone(), self.questions.len());
        self.questions.push(question);
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|pos| &self.questions[*pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Question> {
        match self.index.get(id) {
            Some(pos) => self.questions.get_mut(*pos),
            None => None,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Replaces the label of a question. Returns false for unknown ids.
    pub fn set_label(&mut self, id: &str, label: &str) -> bool {
        match self.get_mut(id) {
            Some(q) => {
                q.label = label.to_string();
                true
            }
            None => false,
        }
    }

    /// Sets the label of one code of a question (last write wins).
    /// Returns false for unknown ids.
    pub fn set_value_label(&mut self, id: &str, code: i64, label: &str) -> bool {
        match self.get_mut(id) {
            Some(q) => {
                q.value_labels.insert(code, label.to_string());
                true
            }
            None => false,
        }
    }
}
