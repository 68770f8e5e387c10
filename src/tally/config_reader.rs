use crate::tally::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
}

/// The description of the category, as written in the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub method: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// A source with the default layout: one ballot per row, choices from the
    /// first column.
    pub fn from_path(file_path: String, provider: String) -> FileSource {
        FileSource {
            provider,
            file_path,
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            id_column_index: None,
            count_column_index: None,
            excel_worksheet_name: None,
        }
    }

    /// The 0-based column of the first choice. Defaults to the first column.
    pub fn first_vote_column_index(&self) -> TallyResult<usize> {
        match &self._first_vote_column_index {
            None => Ok(0),
            x => read_js_int(x),
        }
    }

    /// The 0-based row of the first ballot. Defaults to the first row.
    pub fn first_vote_row_index(&self) -> TallyResult<usize> {
        match &self._first_vote_row_index {
            None => Ok(0),
            x => read_js_int(x),
        }
    }

    pub fn id_column_index_int(&self) -> TallyResult<Option<usize>> {
        match &self.id_column_index {
            None => Ok(None),
            x => read_js_int(x).map(Some),
        }
    }

    pub fn count_column_index_int(&self) -> TallyResult<Option<usize>> {
        match &self.count_column_index {
            None => Ok(None),
            x => read_js_int(x).map(Some),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    pub name: String,
    pub excluded: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "instantRunoff")]
    InstantRunoff,
    #[serde(rename = "ephFinalists")]
    EphFinalists,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::InstantRunoff => "instantRunoff",
            Method::EphFinalists => "ephFinalists",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub method: Method,
    pub candidates: Option<Vec<ConfigCandidate>>,
    #[serde(rename = "runoffCandidate")]
    pub runoff_candidate: Option<String>,
    #[serde(rename = "finalistCount")]
    pub finalist_count: Option<usize>,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<FileSource>,
}

impl TallyConfig {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            contest: self.output_settings.contest_name.clone(),
            date: self.output_settings.contest_date.clone(),
            method: self.method.as_str().to_string(),
        }
    }
}

pub fn read_summary(path: String) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Reads an index that starts at 1: either a number, a string holding a
/// number, or an Excel-style column name (A, B, ..., Z, AA, ...).
/// The returned index starts at 0.
fn read_js_int(x: &Option<JSValue>) -> TallyResult<usize> {
    let one_based = match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {})?,
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'a' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu {})?
        }
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu {})?,
        _ => return ParsingJsonNumberSnafu {}.fail(),
    };
    one_based
        .checked_sub(1)
        .context(ParsingJsonNumberSnafu {})
}
