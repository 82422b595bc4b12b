//! Conversion from apollo-compiler source locations to editor ranges.

use apollo_compiler::parser::{SourceMap, SourceSpan};
use graphql_types::{FileUri, Position, Range};

/// Editor range of a node location, if the location is known and its
/// source file is in `sources`.
#[must_use]
pub fn range_of(location: Option<SourceSpan>, sources: &SourceMap) -> Option<Range> {
    let line_columns = location?.line_column_range(sources)?;
    Some(Range::new(
        Position::from_one_based(line_columns.start.line, line_columns.start.column),
        Position::from_one_based(line_columns.end.line, line_columns.end.column),
    ))
}

/// URI of the file a node location points into.
#[must_use]
pub fn uri_of(location: Option<SourceSpan>, sources: &SourceMap) -> Option<FileUri> {
    let file_id = location?.file_id();
    let file = sources.get(&file_id)?;
    Some(FileUri::new(file.path().to_string_lossy()))
}
