//! Line-based output contract (v1) between the harness and the executable
//! under test: stdout must carry a line containing [`ELAPSED_MARKER`],
//! followed by the elapsed microseconds as the next whitespace-delimited
//! token. Everything else on stdout is ignored.

use tracing::warn;

pub const ELAPSED_MARKER: &str = "Elapsed time:";

/// Extract the elapsed-time measurement from captured stdout.
///
/// Only the first line carrying the marker is considered. A missing marker
/// or a malformed token after it both yield `None`; the malformed case is
/// logged since it usually means the executable drifted from the contract.
pub fn parse_elapsed(stdout: &str) -> Option<u64> {
    let line = stdout.lines().find(|line| line.contains(ELAPSED_MARKER))?;
    let (_, rest) = line.split_once(ELAPSED_MARKER)?;
    let token = rest.split_whitespace().next()?;

    match token.parse() {
        Ok(elapsed) => Some(elapsed),
        Err(error) => {
            warn!("Malformed elapsed-time token {token:?}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_elapsed_time_token() {
        assert_eq!(parse_elapsed("Elapsed time: 1234 us\n"), Some(1234));
    }

    #[test]
    fn ignores_surrounding_output() {
        let stdout = "loading 5000 tuples\nInsert done. Elapsed time:\t42 us\nbye\n";
        assert_eq!(parse_elapsed(stdout), Some(42));
    }

    #[test]
    fn absent_when_the_marker_is_missing() {
        assert_eq!(parse_elapsed("no timing in here\n"), None);
        assert_eq!(parse_elapsed(""), None);
    }

    #[test]
    fn absent_on_a_malformed_token() {
        assert_eq!(parse_elapsed("Elapsed time: fast us\n"), None);
        assert_eq!(parse_elapsed("Elapsed time:\n"), None);
    }

    #[test]
    fn only_the_first_matching_line_counts() {
        let stdout = "Elapsed time: 10 us\nElapsed time: 99 us\n";
        assert_eq!(parse_elapsed(stdout), Some(10));
    }
}
