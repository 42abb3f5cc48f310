// ============================================================
// Layer 4 — Record Readers
// ============================================================
// Parses dataset files into loosely-typed Records. A Record has
// every field any dataset kind might need; the dataset builder
// picks the ones its kind uses and rejects records missing them.
//
// Supported files:
//   .json   → a JSON array of records
//   .jsonl  → one JSON record per line
//   .txt    → one example per line: "label<TAB>text", or plain text
//   .csv    → numeric rows, label in the last column; a
//             non-numeric first row is treated as a header
//   .png/.jpg/.jpeg → a single unlabeled image record
//
// Example JSON record (question answering style):
//   {"question": "What is 2+2?", "context": "arithmetic", "answer": "4"}
//
// Reference: serde_json documentation, Rust Book §12 (I/O)

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::domain::error::DataError;

/// A class label as written in a dataset: either an index or a name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub context:  Option<String>,
    #[serde(default)]
    pub text:     Option<String>,
    #[serde(default)]
    pub answer:   Option<LabelValue>,
    #[serde(default)]
    pub label:    Option<LabelValue>,
    #[serde(default)]
    pub labels:   Option<Vec<usize>>,
    #[serde(default)]
    pub features: Option<Vec<f32>>,
    #[serde(default)]
    pub state:    Option<Vec<f32>>,
    #[serde(default)]
    pub action:   Option<usize>,
    #[serde(default)]
    pub reward:   Option<f32>,
    #[serde(default)]
    pub image:    Option<PathBuf>,
}

impl Record {
    /// Text content: `text`, or question and context joined.
    pub fn text_content(&self) -> Option<String> {
        if let Some(text) = &self.text {
            return Some(text.clone());
        }
        match (&self.question, &self.context) {
            (Some(q), Some(c)) => Some(format!("{q} {c}")),
            (Some(q), None)    => Some(q.clone()),
            (None, Some(c))    => Some(c.clone()),
            (None, None)       => None,
        }
    }

    /// The class label; `label` wins over `answer`.
    pub fn class_label(&self) -> Option<&LabelValue> {
        self.label.as_ref().or(self.answer.as_ref())
    }

    /// Numeric input: `features`, falling back to `state`.
    pub fn numeric_input(&self) -> Option<&[f32]> {
        self.features.as_deref().or(self.state.as_deref())
    }
}

/// Read every record from a dataset file.
pub fn read_records(path: &Path) -> Result<Vec<Record>, DataError> {
    if !path.exists() {
        return Err(DataError::Missing(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if matches!(ext.as_str(), "png" | "jpg" | "jpeg") {
        return Ok(vec![Record { image: Some(path.to_path_buf()), ..Default::default() }]);
    }

    let content = fs::read_to_string(path).map_err(|e| corrupt(path, e))?;
    let records = match ext.as_str() {
        "jsonl" => parse_jsonl(path, &content)?,
        "csv"   => parse_csv(path, &content)?,
        "txt"   => parse_lines(&content),
        _       => parse_json(path, &content)?,
    };

    tracing::debug!("Read {} records from '{}'", records.len(), path.display());
    Ok(records)
}

fn parse_json(path: &Path, content: &str) -> Result<Vec<Record>, DataError> {
    // A top-level object is a single record
    if content.trim_start().starts_with('{') {
        return parse_jsonl(path, content);
    }
    serde_json::from_str(content).map_err(|e| corrupt(path, e))
}

fn parse_jsonl(path: &Path, content: &str) -> Result<Vec<Record>, DataError> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| corrupt(path, format!("line {}: {e}", i + 1)))
        })
        .collect()
}

fn parse_lines(content: &str) -> Vec<Record> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('\t') {
            Some((label, text)) => Record {
                text:  Some(text.trim().to_string()),
                label: Some(parse_label(label.trim())),
                ..Default::default()
            },
            None => Record { text: Some(line.to_string()), ..Default::default() },
        })
        .collect()
}

fn parse_label(raw: &str) -> LabelValue {
    raw.parse::<usize>()
        .map(LabelValue::Index)
        .unwrap_or_else(|_| LabelValue::Name(raw.to_string()))
}

fn parse_csv(path: &Path, content: &str) -> Result<Vec<Record>, DataError> {
    let mut records = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed: Result<Vec<f32>, _> = cells.iter().map(|c| c.parse::<f32>()).collect();

        let values = match parsed {
            Ok(values) => values,
            Err(_) if i == 0 => continue, // header row
            Err(e) => return Err(corrupt(path, format!("row {}: {e}", i + 1))),
        };

        let Some((last, features)) = values.split_last() else { continue };
        if features.is_empty() {
            return Err(corrupt(path, format!("row {} has no feature columns", i + 1)));
        }
        if *last < 0.0 || last.fract() != 0.0 {
            return Err(corrupt(path, format!("row {}: label {last} is not a class index", i + 1)));
        }
        records.push(Record {
            features: Some(features.to_vec()),
            label:    Some(LabelValue::Index(*last as usize)),
            ..Default::default()
        });
    }
    Ok(records)
}

fn corrupt(path: &Path, message: impl ToString) -> DataError {
    DataError::Corrupt { path: path.to_path_buf(), message: message.to_string() }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_records(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, DataError::Missing(_)));
    }

    #[test]
    fn test_json_array_with_question_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "qa.json",
            r#"[{"question": "What is 2+2?", "context": "sums", "answer": "4"},
                {"text": "hello", "label": 1}]"#,
        );
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text_content().as_deref(), Some("What is 2+2? sums"));
        assert_eq!(records[0].class_label(), Some(&LabelValue::Name("4".into())));
        assert_eq!(records[1].class_label(), Some(&LabelValue::Index(1)));
    }

    #[test]
    fn test_csv_skips_header_and_splits_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.csv", "a,b,label\n0.5,1.5,2\n1,2,0\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].features, Some(vec![0.5, 1.5]));
        assert_eq!(records[0].label, Some(LabelValue::Index(2)));
    }

    #[test]
    fn test_csv_bad_row_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.csv", "1,2,0\nx,2,0\n");
        assert!(matches!(read_records(&path), Err(DataError::Corrupt { .. })));
    }

    #[test]
    fn test_txt_lines_with_and_without_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.txt", "pos\tgreat film\nno label here\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records[0].label, Some(LabelValue::Name("pos".into())));
        assert_eq!(records[1].label, None);
        assert_eq!(records[1].text.as_deref(), Some("no label here"));
    }

    #[test]
    fn test_jsonl_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.jsonl", "{\"text\": \"ok\"}\n{broken\n");
        match read_records(&path) {
            Err(DataError::Corrupt { message, .. }) => assert!(message.starts_with("line 2")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }
}
