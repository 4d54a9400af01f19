use log::{debug, warn};

use crate::config::CompileError;
use crate::model::Question;
use crate::statistics::StatRequest;
use crate::table::TableSpec;

/// The multiple-response group holding the rows of every table.
pub const MRGROUP_VARIABLE: &str = "$ff";
/// The total pseudo-variable, always tabulated last.
pub const TOTAL_VARIABLE: &str = "$T";
/// The banner used for the columns.
pub const BANNER: &str = "tban";
/// The banner used as the percentage base.
pub const PERCENTAGE_BASE: &str = "sban";

const PCT_FORMAT: &str = "PCT5.0";
const MEAN_FORMAT: &str = "F5.2";
const COUNT_LINE: &str = "\tcount ($T (F5.0) \"\" )\n";

/// Quotes a free text for the macro language. Embedded quotes are doubled.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// The slots of the table template. Unset slots render as empty strings.
#[derive(Debug, Default)]
struct TableTemplate<'a> {
    preamble: Option<String>,
    obs: Option<String>,
    mrgroup: Option<String>,
    table_vars: Option<String>,
    stats: Option<String>,
    title: Option<&'a str>,
    subtitle: Option<&'a str>,
    footer: Option<&'a str>,
    corner: Option<&'a str>,
}

fn slot(s: Option<&str>) -> &str {
    s.unwrap_or("")
}

fn escaped(s: Option<&str>) -> String {
    slot(s).replace('"', "\"\"")
}

impl<'a> TableTemplate<'a> {
    fn render(&self) -> String {
        let mut res = String::new();
        res.push_str(slot(self.preamble.as_deref()));
        res.push_str("\nTABLES\n/FORMAT ZERO MISSING(\".\")");
        res.push_str(slot(self.obs.as_deref()));
        res.push_str("\n/MRGROUP ");
        res.push_str(MRGROUP_VARIABLE);
        res.push_str(" \"\" ");
        res.push_str(slot(self.mrgroup.as_deref()));
        res.push_str("\n/FTOTAL $T \"BASE\"\n/TABLE=");
        res.push_str(slot(self.table_vars.as_deref()));
        res.push_str(" BY ");
        res.push_str(BANNER);
        res.push_str("\n/STAT\n");
        res.push_str(slot(self.stats.as_deref()));
        res.push_str(COUNT_LINE);
        res.push_str(&format!(
            "/TITLE \"{}\"\n\"{}\"\n/CAPTION \"{}\"\n/CORNER \"{}\".\n\n",
            escaped(self.title.map(|t| t.to_uppercase()).as_deref()),
            escaped(self.subtitle),
            escaped(self.footer),
            escaped(self.corner),
        ));
        res
    }
}

fn join_codes(codes: &[i64]) -> String {
    codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

// Recodes the selected codes of all the rows into one derived category.
fn derived_recode(rows: &str, question: &Question, request: &StatRequest) -> Option<String> {
    let codes = request.select_codes(&question.sorted_codes());
    if codes.is_empty() {
        warn!(
            "compile_table: table {}: {} selects no value, skipping it",
            question.id,
            request.caption()
        );
        return None;
    }
    let name = request.variable_name(&question.id);
    let value = request.derived_value();
    Some(format!(
        "recode {} ({} = {})(else=sys) into {}.\nval lab {} {} {}.\n",
        rows,
        join_codes(&codes),
        value,
        name,
        name,
        value,
        quote(&request.caption())
    ))
}

// 9 and 99 are "don't know" codes, unless 8 (resp. 98) is also a valid answer,
// in which case the scale simply goes that high.
fn mean_exclusions(question: &Question) -> String {
    let mut res = String::new();
    for (missing, guard) in [(9, 8), (99, 98)] {
        if question.has_code(missing) && !question.has_code(guard) {
            res.push_str(&format!("({}=sys)", missing));
        }
    }
    res
}

/// The name of the variable holding the values averaged for a question.
pub fn mean_variable(question_id: &str) -> String {
    format!("m{}", question_id)
}

/// Compiles one table into macro syntax: the recodes and filters it needs,
/// followed by the TABLES command.
///
/// `question` provides the value labels used for the derived statistics.
pub fn compile_table(spec: &TableSpec, question: &Question) -> Result<String, CompileError> {
    if spec.rows.is_empty() {
        return Err(CompileError::EmptyTable(spec.id.clone()));
    }
    let rows = spec.rows.join(" ");

    let mut preamble = String::new();
    let mut stats = String::new();
    let mut mrgroup: Vec<String> = spec.rows.clone();
    let mut table_vars: Vec<String> = vec![MRGROUP_VARIABLE.to_string()];
    let mut obs: Option<String> = None;

    if let Some(percentage) = &spec.statistics.percentage {
        stats.push_str(&format!(
            "\tcpct ({} ({}) \"\" : {})\n",
            MRGROUP_VARIABLE, PCT_FORMAT, PERCENTAGE_BASE
        ));
        for request in percentage.requests.iter() {
            if let Some(recode) = derived_recode(&rows, question, request) {
                preamble.push_str(&recode);
                mrgroup.push(request.variable_name(&question.id));
            }
        }
    }

    let mut filter = String::new();
    if spec.statistics.mean {
        let mvar = mean_variable(&question.id);
        preamble.push_str(&format!(
            "recode {} {}(else=copy) into {}.\n",
            rows,
            mean_exclusions(question),
            mvar
        ));
        filter.push_str(&format!("temp.\nsel if ~sysmis({}).\n", mvar));
        obs = Some(format!("\n/OBS {}", mvar));
        table_vars.push(mvar.clone());
        stats.push_str(&format!(
            "\tmean ({} ({}) \"mean\")\n\tvariance ({} ({}) \"variance\")\n",
            mvar, MEAN_FORMAT, mvar, MEAN_FORMAT
        ));
    }
    preamble.push_str(&filter);
    table_vars.push(TOTAL_VARIABLE.to_string());

    debug!(
        "compile_table: {} mrgroup: {:?} table vars: {:?}",
        spec.id, mrgroup, table_vars
    );

    let template = TableTemplate {
        preamble: Some(preamble).filter(|s| !s.is_empty()),
        obs,
        mrgroup: Some(mrgroup.join(" ")),
        table_vars: Some(table_vars.join("+")),
        stats: Some(stats).filter(|s| !s.is_empty()),
        title: spec.title.as_deref(),
        subtitle: spec.subtitle.as_deref(),
        footer: spec.footer.as_deref(),
        corner: spec.corner.as_deref(),
    };
    Ok(template.render())
}
