use crate::tally::*;

/// Reads an array of ballots: `[{"id": "b1", "choices": ["w1", "w2"], "count": 2}, ...]`.
/// The id and the count are optional.
pub fn read_json_ballots(path: String) -> TallyResult<Vec<ParsedBallot>> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let ballots: Vec<ParsedBallot> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(ballots)
}
