/*!

This is the long-form manual for `award_tally` and `awardtally`.

An award category goes through two counts:

1. the nomination stage, where each nominator lists up to five works. The
   finalists are selected with the EPH procedure.
2. the final ballot, where voters rank the finalists. The winner is decided
   by instant-runoff, followed by a runoff against "No Award".

## Final ballot

Every ballot counts for its highest ranked candidate still in the race.
In each round:

- the winning threshold is half of the ballots that are not exhausted,
  rounded up. Every candidate at or above it is elected.
- otherwise, the candidate with the fewest votes is rejected and its ballots
  move to their next preference. Ballots without a next preference are
  exhausted and stop counting.

When several candidates are tied for the fewest votes, the one with the
most second choice votes stays in the race. Candidates still tied after this
comparison are rejected together. There is no random draw.

Once a winner is known, each ballot is reduced to the winner and "No Award".
If more of these ballots prefer "No Award", no award is given. A tie keeps the
winner.

## Nomination stage

Each nomination ballot gives one nomination to each of its works, and shares
60 points between them (60 for one work, 30 each for two, and so on down to 12
each for five).

In each round:

- the works with the fewest points are selected. If a single work has the
  fewest points, the works with the next lowest points are added.
- among them, the works with the fewest nominations are eliminated (and if
  needed, among those the works with the fewest points).
- the eliminated works are removed from all the ballots, and the points are
  counted again.

The selection stops when the number of works reaches the number of
finalists. If the last elimination would go below that number, it is not
applied and all the remaining works become finalists.

## Configuration

`awardtally` reads a JSON configuration file describing one category.

```text
{
  "outputSettings": { "contestName": "Best Novel", "outputPath": "novel.json" },
  "method": "instantRunoff",
  "candidates": [ { "name": "Alice" }, { "name": "Bob" }, { "name": "No Award" } ],
  "ballotSources": [
    { "provider": "csv", "filePath": "novel.csv",
      "firstVoteColumnIndex": 2, "firstVoteRowIndex": 2, "idColumnIndex": 1 }
  ]
}
```

- `method`: `instantRunoff` for a final ballot, `ephFinalists` for the
  nomination stage.
- `candidates`: the finalists, mandatory for `instantRunoff`. A candidate
  marked `"excluded": true` is removed from the count.
- `runoffCandidate` (optional): the default option. If not provided, a
  candidate named "No Award" is used when there is one.
- `finalistCount`: the number of finalists, mandatory for `ephFinalists`.

Ballot sources:
 - `provider`: `csv`, `excel` or `json`.
 - `filePath`: relative to the configuration file.
 - `firstVoteColumnIndex`, `firstVoteRowIndex`: where the choices start (1-based).
 - `idColumnIndex`, `countColumnIndex` (optional): the ballot identifier and the
   number of identical ballots on this row.
 - `excelWorksheetName` (optional): for Excel inputs, the name of the worksheet.

For `csv` and `excel`, each row is one ballot and each cell one choice, in
rank order. Empty cells are skipped. A `json` source is an array of ballots:

```text
[ { "id": "b1", "choices": ["Alice", "Bob"] }, { "choices": ["Bob"], "count": 3 } ]
```

 */
