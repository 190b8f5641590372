//! Plain-text edge lists and ranked output.
//!
//! Input: one edge per line, two whitespace- or tab-separated integer ids `src dst`, with venue
//! ids already offset past `max_user_id`. Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::graph::{Edge, NodeId};
use crate::predict::ScoredPair;
use crate::{Error, Result};

pub fn parse_edge_list<R: BufRead>(reader: R) -> Result<Vec<(NodeId, NodeId)>> {
    let mut edges = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(Error::InputFormat {
                line: line_no + 1,
                reason: format!("expected 2 fields, found {}", fields.len()),
            });
        }
        let parse = |s: &str| {
            s.parse::<NodeId>().map_err(|e| Error::InputFormat {
                line: line_no + 1,
                reason: format!("bad node id {s:?}: {e}"),
            })
        };
        edges.push((parse(fields[0])?, parse(fields[1])?));
    }
    Ok(edges)
}

pub fn read_edge_list(path: impl AsRef<Path>) -> Result<Vec<(NodeId, NodeId)>> {
    let file = File::open(path)?;
    parse_edge_list(BufReader::new(file))
}

/// One `user venue` line per edge.
pub fn write_edge_list<W, I>(writer: W, edges: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Edge>,
{
    let mut w = BufWriter::new(writer);
    for e in edges {
        writeln!(w, "{}\t{}", e.user, e.venue)?;
    }
    w.flush()?;
    Ok(())
}

/// One `user venue score` line per pair, in the given order.
pub fn write_ranked<W: Write>(writer: W, ranked: &[ScoredPair]) -> Result<()> {
    let mut w = BufWriter::new(writer);
    for s in ranked {
        writeln!(w, "{}\t{}\t{}", s.user, s.venue, s.score)?;
    }
    w.flush()?;
    Ok(())
}
