//! Path matching utilities.
//!
//! Paths arrive from clients in mixed shapes: absolute, workspace-relative,
//! or bare file names. Matching is therefore defined as complete-segment
//! suffix equality rather than string equality.

/// True iff either path is a suffix of the other along complete path
/// segments.
///
/// `"/proj/src/utils.ts"` matches `"src/utils.ts"` and `"utils.ts"`, but
/// `"ared/utils.ts"` does not match `"shared/utils.ts"`: a partial segment
/// is never a match.
pub fn paths_match(a: &str, b: &str) -> bool {
    let a_segments: Vec<&str> = segments(a);
    let b_segments: Vec<&str> = segments(b);
    if a_segments.is_empty() || b_segments.is_empty() {
        return false;
    }
    let (short, long) = if a_segments.len() <= b_segments.len() {
        (&a_segments, &b_segments)
    } else {
        (&b_segments, &a_segments)
    };
    long[long.len() - short.len()..] == short[..]
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_of_absolute_path_matches() {
        assert!(paths_match("/proj/src/utils.ts", "src/utils.ts"));
        assert!(paths_match("src/utils.ts", "/proj/src/utils.ts"));
    }

    #[test]
    fn partial_segment_does_not_match() {
        assert!(!paths_match("ared/utils.ts", "shared/utils.ts"));
        assert!(!paths_match("shared/utils.ts", "ared/utils.ts"));
    }

    #[test]
    fn single_segment_matches_at_boundary() {
        assert!(paths_match("utils.ts", "src/utils.ts"));
        assert!(paths_match("src/utils.ts", "utils.ts"));
    }

    #[test]
    fn identical_paths_match() {
        assert!(paths_match("a/b/c.rs", "a/b/c.rs"));
    }

    #[test]
    fn different_files_do_not_match() {
        assert!(!paths_match("src/a.ts", "src/b.ts"));
        assert!(!paths_match("", "src/a.ts"));
    }

    #[test]
    fn windows_separators_are_segment_boundaries() {
        assert!(paths_match("C:\\proj\\src\\utils.ts", "src/utils.ts"));
    }
}
