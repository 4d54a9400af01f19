mod config;
mod grouping;
mod labels;
mod model;
mod statistics;
mod table;

pub mod compiler;
pub mod manual;
pub mod rotation;

use log::{debug, info};

pub use crate::compiler::compile_table;
pub use crate::config::*;
pub use crate::grouping::{group_questions, question_key};
pub use crate::labels::label_syntax;
pub use crate::model::*;
pub use crate::rotation::{RotationGroup, RotationPlan};
pub use crate::statistics::*;
pub use crate::table::*;

/// The result of compiling a batch of tables.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BatchOutput {
    /// Recodes, filters and tables, in the order of the tables.
    pub tables_syntax: String,
    /// Number of tables written (a consolidated rotation counts once).
    pub exported: usize,
    /// Tables folded into a rotation rendered earlier.
    pub suppressed: Vec<String>,
}

/// Compiles all the tables, in order.
///
/// Arguments:
/// * `questions` the questions, providing the value labels of each table
/// * `tables` the tables to compile. Each table written gets its `exported` flag set.
/// * `options` controls the detection of rotated blocks
///
/// The first table of a rotated block is rendered as one consolidated table
/// covering the whole block; the other tables of the block produce nothing.
/// Any error aborts the whole batch.
pub fn compile_batch(
    questions: &QuestionSet,
    tables: &mut TableSet,
    options: &CompileOptions,
) -> Result<BatchOutput, CompileError> {
    let ids: Vec<&str> = tables.ids();
    let mut plan = RotationPlan::detect(&ids, &options.rotation);
    info!(
        "Compiling {} tables, {} rotated blocks",
        tables.len(),
        plan.groups().len()
    );

    let mut res = BatchOutput::default();
    for pos in 0..tables.len() {
        let rendered: Option<String> = {
            let spec = match tables.at(pos) {
                Some(t) => t,
                None => break,
            };
            let question = questions
                .get(&spec.id)
                .ok_or_else(|| CompileError::UnknownQuestion(spec.id.clone()))?;
            match plan.group_of(pos) {
                Some(group_idx) => {
                    let r = plan.render(group_idx, tables, question)?;
                    if r.is_none() {
                        debug!("compile_batch: {} already consolidated", spec.id);
                        res.suppressed.push(spec.id.clone());
                    }
                    r
                }
                None => Some(compile_table(spec, question)?),
            }
        };
        if let Some(text) = rendered {
            res.tables_syntax.push_str(&text);
            res.exported += 1;
            if let Some(t) = tables.at_mut(pos) {
                t.exported = true;
            }
        }
    }
    info!(
        "Compiled {} tables ({} folded into rotations)",
        res.exported,
        res.suppressed.len()
    );
    Ok(res)
}
