/*!

This is the long-form manual for `survey_tables` and `survtab`.

## Workflow

1. `survtab download survey.json` groups the variables of the data dictionary
   into questions and writes the template `survey.json.xlsx`.
2. The template is edited in a spreadsheet program: titles, captions,
   statistics, value labels.
3. `survtab upload survey.json --xlsx-file-path survey.json.xlsx` writes
   `survey.json_lin.sps` (recodes and tables) and `survey.json_lab.sps`
   (variable and value labels).

The generated syntax expects a banner `tban`, and a percentage base `sban`, to
be defined beforehand.

## Data dictionary

The variables are read from a JSON export of the data file:

```json
{
  "variables": [
    { "id": "Q1@1", "label": "Which brands do you know?", "type": 0,
      "values": { "0": "Not mentioned", "1": "Mentioned" } },
    { "id": "Q2", "label": "Age", "type": 0 }
  ]
}
```

The raw responses may be provided as a CSV file (`--responses`), with one
column per variable id. They are only used with `--use-unlabeled-values`, to
build the values of numeric variables that have no value labels.

## Questions

Variables sharing the same prefix, up to the multiple choice separator
(`--multiple-choice-separator`, `@` by default), form one question: `Q1@1`,
`Q1@2` and `Q1@3` are the children of `Q1`. The question takes the label and
the type of its first child, and the value labels of all the children.

## The `tables` sheet

| Column | Content |
|---|---|
| QuestionID | the question |
| Variables | the rows of the table, separated by spaces |
| Title | upper-cased in the output |
| Subtitle\Question | the question wording, also used as variable label |
| Caption | shown under the table |
| Corner | shown in the corner of the table |
| Properties | the statistics, separated by spaces |

Properties:
* `t<N>` adds a Top-N category: the N highest codes of the scale.
* `b<N>` adds a Bottom-N category: the N lowest codes, not counting the lowest
  code of the scale, which is reserved for answers like "none of these".
* `m` adds the mean and the variance. The codes 9 and 99 are treated as
  missing, unless 8 (resp. 98) is also a code of the scale.

Column percentages are always shown.

## The `labels` sheet

One row per value label. The QuestionID may be left empty: the row then
belongs to the question of the previous row.

## Rotated blocks

Questions repeated once per item, in a random order (`R_1`, `R_2`, `R_3`,
split on the last `--rotation-separator`, `_` by default), are restructured
into one case per item and tabulated once, with the item as an additional
break variable (`rot_idx`). Ids listed with `--independent`, or starting with
`pre`, are never treated as rotated.

*/
