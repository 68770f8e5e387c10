use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tally::{
    io_common::{make_default_id, parse_count},
    *,
};

pub fn read_excel_ballots(path: String, cfs: &FileSource) -> TallyResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;
    let count_idx_o = cfs.count_column_index_int()?;
    let first_row = cfs.first_vote_row_index()?;

    let wrange = get_range(&path, cfs)?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate().skip(first_row) {
        let lineno = idx + 1;
        let cells: Vec<String> = row
            .iter()
            .map(|cell| read_cell(cell, lineno))
            .collect::<TallyResult<Vec<String>>>()?;

        let id = match id_idx_o {
            Some(id_idx) => cells.get(id_idx).cloned().unwrap_or_default(),
            None => default_id(lineno),
        };
        let count = match count_idx_o.and_then(|count_idx| cells.get(count_idx)) {
            Some(content) => Some(parse_count(content, lineno)?),
            None => None,
        };
        let choices: Vec<String> = cells
            .into_iter()
            .enumerate()
            .skip(choices_start_col)
            .filter(|(col, _)| Some(*col) != id_idx_o && Some(*col) != count_idx_o)
            .map(|(_, s)| s)
            .collect();
        debug!("read_excel_ballots: lineno: {:?} row: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(id),
            count,
            choices,
        });
    }
    Ok(res)
}

fn read_cell(cell: &DataType, lineno: usize) -> TallyResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Empty => Ok("".to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok((*f as i64).to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

fn get_range(path: &str, cfs: &FileSource) -> TallyResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_excel_ballots: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_ballots: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            [] => EmptyExcelSnafu {}.fail(),
            _ => whatever!(
                "{}: several worksheets found, excelWorksheetName must be provided",
                path
            ),
        }
    }
}
