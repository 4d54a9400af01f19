use crate::tabgen::*;

use encoding_rs::Encoding;
use log::{debug, warn};
use snafu::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// The table syntax and the label syntax files, next to the spreadsheet.
pub fn output_paths(template_path: &str) -> (PathBuf, PathBuf) {
    let stem = Path::new(template_path).with_extension("");
    let with_suffix = |suffix: &str| {
        let mut s = stem.clone().into_os_string();
        s.push(suffix);
        PathBuf::from(s)
    };
    (with_suffix("_lin.sps"), with_suffix("_lab.sps"))
}

pub fn default_template_path(data_file: &str) -> String {
    format!("{}.xlsx", data_file)
}

/// Encodes the text, replacing the characters the encoding cannot represent.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, actual, had_errors) = encoding.encode(text);
    if had_errors {
        warn!(
            "encode_text: some characters cannot be written in {}, they were replaced",
            actual.name()
        );
    }
    match bytes {
        Cow::Borrowed(b) => b.to_vec(),
        Cow::Owned(b) => b,
    }
}

pub fn is_encodable(text: &str, encoding: &'static Encoding) -> bool {
    let (_, _, had_errors) = encoding.encode(text);
    !had_errors
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

/// Writes all the files, or none of them.
///
/// The contents first go to temporary siblings, which are renamed once all of
/// them are written. If a rename fails, the remaining temporary files are
/// removed; the files renamed before it are not restored.
pub fn write_outputs(outputs: &[(PathBuf, Vec<u8>)]) -> TabResult<()> {
    let mut written: Vec<PathBuf> = Vec::new();
    for (path, contents) in outputs.iter() {
        let tmp = temporary_path(path);
        if let Err(e) = fs::write(&tmp, contents) {
            for p in written.iter() {
                let _ = fs::remove_file(p);
            }
            return Err(e).context(WritingOutputSnafu {
                path: tmp.display().to_string(),
            });
        }
        debug!("write_outputs: wrote {} bytes to {:?}", contents.len(), tmp);
        written.push(tmp);
    }
    for (idx, ((path, _), tmp)) in outputs.iter().zip(written.iter()).enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            for p in written[idx..].iter() {
                let _ = fs::remove_file(p);
            }
            return Err(e).context(WritingOutputSnafu {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        let (lin, lab) = output_paths("/a/b/survey.xlsx");
        assert_eq!(lin, PathBuf::from("/a/b/survey_lin.sps"));
        assert_eq!(lab, PathBuf::from("/a/b/survey_lab.sps"));
        let (lin, _) = output_paths("survey.json.xlsx");
        assert_eq!(lin, PathBuf::from("survey.json_lin.sps"));
        assert_eq!(default_template_path("data/survey.json"), "data/survey.json.xlsx");
    }

    #[test]
    fn encodings() {
        let w = encoding_rs::WINDOWS_1251;
        assert!(is_encodable("val lab Q1 1 \"Да\".", w));
        assert!(!is_encodable("1 \"日本\"", w));
        assert_eq!(encode_text("Да", w), vec![0xC4, 0xE0]);
        assert_eq!(encode_text("abc", encoding_rs::UTF_8), b"abc".to_vec());
    }

    #[test]
    fn all_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.sps");
        let b = dir.path().join("b.sps");
        write_outputs(&[(a.clone(), b"one".to_vec()), (b.clone(), b"two".to_vec())]).unwrap();
        assert_eq!(fs::read_to_string(&a).unwrap(), "one");
        assert_eq!(fs::read_to_string(&b).unwrap(), "two");
        assert!(!temporary_path(&a).exists());
    }

    #[test]
    fn nothing_is_written_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.sps");
        let b = dir.path().join("missing").join("b.sps");
        let res = write_outputs(&[(a.clone(), b"one".to_vec()), (b, b"two".to_vec())]);
        assert!(matches!(res, Err(TabError::WritingOutput { .. })));
        assert!(!a.exists());
        assert!(!temporary_path(&a).exists());
    }

    #[test]
    fn failed_rename_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.sps");
        // A non-empty directory cannot be replaced by a file.
        let b = dir.path().join("b.sps");
        fs::create_dir(&b).unwrap();
        fs::write(b.join("keep"), "x").unwrap();
        let res = write_outputs(&[(a.clone(), b"one".to_vec()), (b.clone(), b"two".to_vec())]);
        assert!(matches!(res, Err(TabError::WritingOutput { .. })));
        assert_eq!(fs::read_to_string(&a).unwrap(), "one");
        assert!(!temporary_path(&a).exists());
        assert!(!temporary_path(&b).exists());
        assert!(b.is_dir());
    }
}
