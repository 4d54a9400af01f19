use indexmap::IndexMap;

use crate::model::Question;
use crate::statistics::StatisticsConfig;

/// The definition of one exported table, as edited in the spreadsheet.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TableSpec {
    /// The id of the question this table describes.
    pub id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub corner: Option<String>,
    /// Shown under the table ("Caption" in the spreadsheet).
    pub footer: Option<String>,
    /// The variables cross-tabulated in the rows.
    pub rows: Vec<String>,
    pub statistics: StatisticsConfig,
    pub exported: bool,
}

impl TableSpec {
    pub fn new(id: &str, rows: &[&str]) -> TableSpec {
        TableSpec {
            id: id.to_string(),
            rows: rows.iter().map(|s| s.to_string()).collect(),
            ..TableSpec::default()
        }
    }

    /// The default table of a question: all the children, the question
    /// wording as subtitle.
    pub fn for_question(question: &Question) -> TableSpec {
        TableSpec {
            id: question.id.clone(),
            subtitle: non_empty(&question.label),
            rows: question.children.clone(),
            ..TableSpec::default()
        }
    }

    /// The text used to name this table in a rotation index: the title, or
    /// the subtitle when there is no title.
    pub fn display_label(&self) -> Option<&str> {
        [self.title.as_deref(), self.subtitle.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

pub(crate) fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// The ordered tables of a batch.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TableSet {
    tables: Vec<TableSpec>,
    index: IndexMap<String, usize>,
}

impl TableSet {
    pub fn new() -> TableSet {
        TableSet::default()
    }

    /// Adds a table at the end. A table with the same id shadows the previous
    /// one for lookups, but both are kept in order.
    pub fn add(&mut self, table: TableSpec) {
        self.index.insert(table.id.clone(), self.tables.len());
        self.tables.push(table);
    }

    pub fn get(&self, id: &str) -> Option<&TableSpec> {
        self.index.get(id).map(|pos| &self.tables[*pos])
    }

    pub fn at(&self, pos: usize) -> Option<&TableSpec> {
        self.tables.get(pos)
    }

    pub(crate) fn at_mut(&mut self, pos: usize) -> Option<&mut TableSpec> {
        self.tables.get_mut(pos)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableSpec> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableSpec> for TableSet {
    fn from_iter<I: IntoIterator<Item = TableSpec>>(iter: I) -> Self {
        let mut ts = TableSet::new();
        for t in iter {
            ts.add(t);
        }
        ts
    }
}
