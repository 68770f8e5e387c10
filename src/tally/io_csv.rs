// Primitives for reading CSV files.

use std::fs::File;

use crate::tally::{
    io_common::{make_default_id, parse_count},
    *,
};

pub fn read_csv_ballots(path: String, cfs: &FileSource) -> TallyResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;
    let count_idx_o = cfs.count_column_index_int()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let count: Option<u64> = if let Some(count_idx) = count_idx_o {
            let content = line
                .get(count_idx)
                .context(CsvLineTooShortSnafu { lineno })?;
            Some(parse_count(content, lineno)?)
        } else {
            None
        };

        let choices: Vec<String> = line
            .iter()
            .enumerate()
            .skip(choices_start_col)
            .filter(|(col, _)| Some(*col) != id_idx_o && Some(*col) != count_idx_o)
            .map(|(_, s)| s.trim().to_string())
            .collect();
        debug!("read_csv_ballots: lineno: {:?} row: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(id),
            count,
            choices,
        });
    }
    Ok(res)
}

fn get_records(
    path: &str,
    cfs: &FileSource,
) -> TallyResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
