//! Detection and consolidation of rotated question blocks.
//!
//! A rotated block is asked several times in a random order, once per item,
//! and each repetition gets its own set of variables: `Q5_1`, `Q5_2`, ... all
//! collapse to the base `Q5`. Instead of one table per repetition, the block is
//! restructured into cases (one case per repetition, indexed by `rot_idx`) and
//! tabulated once.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::compiler::{compile_table, quote, BANNER, PERCENTAGE_BASE};
use crate::config::{CompileError, RotationConfig};
use crate::model::Question;
use crate::table::TableSet;

/// The index variable created by the consolidation.
pub const ROTATION_INDEX: &str = "rot_idx";
/// Restores the observation base after a consolidated table.
pub const RESTORE_BASE_DIRECTIVE: &str = "getbase.";

/// Tables that collapse to the same base id.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RotationGroup {
    pub base_id: String,
    /// Positions of the tables in the batch, in order.
    pub positions: Vec<usize>,
    consumed: bool,
}

impl RotationGroup {
    /// True once the group has been rendered. A consumed group renders nothing.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// The base id of a table for rotation purposes, if it can take part in one.
pub fn rotation_base<'a>(id: &'a str, config: &RotationConfig) -> Option<&'a str> {
    if !config.is_enabled() {
        return None;
    }
    if !config.exclude_prefix.is_empty() && id.starts_with(config.exclude_prefix.as_str()) {
        return None;
    }
    let pos = id.rfind(config.separator.as_str())?;
    if config.independent.contains(id) {
        Some(id)
    } else {
        Some(&id[..pos])
    }
}

/// All the rotation groups of a batch.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RotationPlan {
    groups: Vec<RotationGroup>,
    // table position -> group index
    membership: IndexMap<usize, usize>,
}

impl RotationPlan {
    /// Finds the groups among the ordered table ids. Bases with fewer than two
    /// distinct ids do not form a group.
    ///
    /// A table repeating the id of an earlier item is not stacked again: it
    /// belongs to the group, and is suppressed once the group is rendered.
    pub fn detect(ids: &[&str], config: &RotationConfig) -> RotationPlan {
        let mut bases: IndexMap<&str, IndexMap<&str, Vec<usize>>> = IndexMap::new();
        for (pos, id) in ids.iter().enumerate() {
            if let Some(base) = rotation_base(id, config) {
                bases
                    .entry(base)
                    .or_default()
                    .entry(*id)
                    .or_default()
                    .push(pos);
            }
        }

        let mut plan = RotationPlan::default();
        for (base, items) in bases.into_iter() {
            if items.len() < 2 {
                continue;
            }
            let positions: Vec<usize> = items.values().map(|p| p[0]).collect();
            debug!("detect: rotation {} at positions {:?}", base, positions);
            let group_idx = plan.groups.len();
            for pos in items.values().flatten() {
                plan.membership.insert(*pos, group_idx);
            }
            plan.groups.push(RotationGroup {
                base_id: base.to_string(),
                positions,
                consumed: false,
            });
        }
        plan
    }

    pub fn groups(&self) -> &[RotationGroup] {
        &self.groups
    }

    /// The index of the group of the table at this position.
    pub fn group_of(&self, position: usize) -> Option<usize> {
        self.membership.get(&position).cloned()
    }

    pub fn group(&self, group_idx: usize) -> Option<&RotationGroup> {
        self.groups.get(group_idx)
    }

    /// Renders a group: the consolidation directive, then its representative
    /// table, combined with the rotation index.
    ///
    /// Returns None if the group was already rendered. The group is consumed
    /// only on success.
    pub fn render(
        &mut self,
        group_idx: usize,
        tables: &TableSet,
        question: &Question,
    ) -> Result<Option<String>, CompileError> {
        let group = match self.groups.get(group_idx) {
            Some(g) if !g.consumed => g,
            _ => return Ok(None),
        };
        let consolidation = consolidate(group, tables);
        let first_pos = group.positions[0];
        let mut representative = match tables.at(first_pos) {
            Some(t) => t.clone(),
            None => return Ok(None),
        };
        representative.rows = consolidation.rows;
        let body = compile_table(&representative, question)?;

        let mut res = consolidation.directive;
        res.push_str(&combine_with_index(&body));
        res.push('\n');
        res.push_str(RESTORE_BASE_DIRECTIVE);
        res.push('\n');

        if let Some(g) = self.groups.get_mut(group_idx) {
            g.consumed = true;
        }
        Ok(Some(res))
    }
}

/// The syntax restructuring a rotated block, and the rows of the resulting table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Consolidation {
    pub directive: String,
    pub rows: Vec<String>,
}

/// Capitalizes the first letter, lowercases the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Builds the VARSTOCASES command of a group: the k-th variable of every item
/// is stacked into the k-th variable of the first item.
///
/// Items with different numbers of variables are paired in lock-step, up to
/// the shortest one.
pub fn consolidate(group: &RotationGroup, tables: &TableSet) -> Consolidation {
    let items: Vec<_> = group
        .positions
        .iter()
        .filter_map(|pos| tables.at(*pos))
        .collect();

    let lengths: Vec<usize> = items.iter().map(|t| t.rows.len()).collect();
    let common = lengths.iter().cloned().min().unwrap_or(0);
    if lengths.iter().any(|l| *l != common) {
        warn!(
            "consolidate: rotation {} has items of unequal lengths {:?}, \
             only the first {} variables are stacked",
            group.base_id, lengths, common
        );
    }

    let mut directive = String::from("VARSTOCASES\n");
    for k in 0..common {
        let stacked: Vec<&str> = items.iter().map(|t| t.rows[k].as_str()).collect();
        directive.push_str(&format!("/make {} from {}\n", stacked[0], stacked.join(" ")));
    }
    directive.push_str(&format!("/index {}.\n\n", ROTATION_INDEX));

    let labels: Vec<String> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, t)| {
            t.display_label()
                .map(|label| format!("{} {}", idx + 1, quote(&capitalize(label.trim()))))
        })
        .collect();
    if !labels.is_empty() {
        directive.push_str(&format!("val lab {}\n", ROTATION_INDEX));
        directive.push_str(&labels.join("\n"));
        directive.push_str(".\n\n");
    }

    let rows = items
        .first()
        .map(|t| t.rows[..common].to_vec())
        .unwrap_or_default();
    Consolidation { directive, rows }
}

// Splits the banner and the percentage base by the rotation index.
fn combine_with_index(body: &str) -> String {
    body.replace(
        &format!(" BY {}\n", BANNER),
        &format!(" BY {} BY {}\n", ROTATION_INDEX, BANNER),
    )
    .replace(
        &format!(": {})", PERCENTAGE_BASE),
        &format!(": {} {})", PERCENTAGE_BASE, ROTATION_INDEX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::StatisticsConfig;
    use crate::table::TableSpec;
    use std::collections::BTreeSet;

    fn item(id: &str, rows: &[&str], title: &str) -> TableSpec {
        TableSpec {
            title: Some(title.to_string()).filter(|s| !s.is_empty()),
            statistics: StatisticsConfig::percentage(&[]),
            ..TableSpec::new(id, rows)
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            ..Question::default()
        }
    }

    #[test]
    fn base_ids() {
        let config = RotationConfig::default();
        assert_eq!(rotation_base("R_1", &config), Some("R"));
        assert_eq!(rotation_base("R_a_2", &config), Some("R_a"));
        assert_eq!(rotation_base("R", &config), None);
        assert_eq!(rotation_base("pre_1", &config), None);
        let independent = RotationConfig {
            independent: ["R_1".to_string()].into_iter().collect::<BTreeSet<String>>(),
            ..RotationConfig::default()
        };
        assert_eq!(rotation_base("R_1", &independent), Some("R_1"));
        assert_eq!(rotation_base("R_1", &RotationConfig::disabled()), None);
    }

    #[test]
    fn detect_drops_singletons() {
        let plan = RotationPlan::detect(&["A_1", "B_1", "A_2", "C"], &RotationConfig::default());
        assert_eq!(plan.groups().len(), 1);
        let g = &plan.groups()[0];
        assert_eq!(g.base_id, "A");
        assert_eq!(g.positions, vec![0, 2]);
        assert_eq!(plan.group_of(2), Some(0));
        assert_eq!(plan.group_of(1), None);
    }

    #[test]
    fn repeated_item_is_stacked_once() {
        let plan = RotationPlan::detect(&["S_1", "S_1", "S_2"], &RotationConfig::default());
        assert_eq!(plan.groups().len(), 1);
        assert_eq!(plan.groups()[0].positions, vec![0, 2]);
        assert_eq!(plan.group_of(1), Some(0));

        let tables: TableSet = vec![
            item("S_1", &["S_1"], "One"),
            item("S_1", &["S_1"], "One again"),
            item("S_2", &["S_2"], "Two"),
        ]
        .into_iter()
        .collect();
        let c = consolidate(&plan.groups()[0], &tables);
        assert_eq!(
            c.directive,
            "VARSTOCASES\n/make S_1 from S_1 S_2\n/index rot_idx.\n\n\
             val lab rot_idx\n1 \"One\"\n2 \"Two\".\n\n"
        );
    }

    #[test]
    fn repeated_independent_id_is_not_a_rotation() {
        let config = RotationConfig {
            independent: ["R_1".to_string()].into_iter().collect::<BTreeSet<String>>(),
            ..RotationConfig::default()
        };
        let plan = RotationPlan::detect(&["R_1", "R_1"], &config);
        assert!(plan.groups().is_empty());
        assert_eq!(plan.group_of(1), None);
    }

    #[test]
    fn consolidation_of_two_items() {
        let tables: TableSet = vec![
            item("R_1", &["R_1a", "R_1b"], "first BRAND"),
            item("R_2", &["R_2a", "R_2b"], "second brand"),
        ]
        .into_iter()
        .collect();
        let plan = RotationPlan::detect(&tables.ids(), &RotationConfig::default());
        let c = consolidate(&plan.groups()[0], &tables);
        assert_eq!(
            c.directive,
            "VARSTOCASES\n/make R_1a from R_1a R_2a\n/make R_1b from R_1b R_2b\n/index rot_idx.\n\n\
             val lab rot_idx\n1 \"First brand\"\n2 \"Second brand\".\n\n"
        );
        assert_eq!(c.rows, vec!["R_1a".to_string(), "R_1b".to_string()]);
    }

    #[test]
    fn unequal_lengths_are_truncated() {
        let tables: TableSet = vec![
            item("R_1", &["a1", "b1", "c1"], ""),
            item("R_2", &["a2", "b2"], "Two"),
        ]
        .into_iter()
        .collect();
        let plan = RotationPlan::detect(&tables.ids(), &RotationConfig::default());
        let c = consolidate(&plan.groups()[0], &tables);
        assert_eq!(
            c.directive,
            "VARSTOCASES\n/make a1 from a1 a2\n/make b1 from b1 b2\n/index rot_idx.\n\n\
             val lab rot_idx\n2 \"Two\".\n\n"
        );
        assert_eq!(c.rows, vec!["a1".to_string(), "b1".to_string()]);
    }

    #[test]
    fn render_once() {
        let tables: TableSet = vec![
            item("R_1", &["R_1a"], "One"),
            item("R_2", &["R_2a"], "Two"),
        ]
        .into_iter()
        .collect();
        let mut plan = RotationPlan::detect(&tables.ids(), &RotationConfig::default());
        let q = question("R_1");
        let first = plan.render(0, &tables, &q).unwrap().unwrap();
        assert!(first.starts_with("VARSTOCASES\n"));
        assert!(first.contains("/TABLE=$ff+$T BY rot_idx BY tban\n"));
        assert!(first.contains("\tcpct ($ff (PCT5.0) \"\" : sban rot_idx)\n"));
        assert!(first.ends_with("/CORNER \"\".\n\n\ngetbase.\n"));
        assert_eq!(first.matches("val lab rot_idx").count(), 1);
        assert!(first.contains("1 \"One\"\n2 \"Two\".\n"));
        assert!(plan.group(0).unwrap().is_consumed());
        assert_eq!(plan.render(0, &tables, &q).unwrap(), None);
    }

    #[test]
    fn capitalize_texts() {
        assert_eq!(capitalize("hELLO world"), "Hello world");
        assert_eq!(capitalize("émile"), "Émile");
        assert_eq!(capitalize(""), "");
    }
}
