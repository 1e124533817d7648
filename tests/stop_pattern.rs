use fdplane::exec::LineMatcher;
use fdplane::exec::forward::compile_stop_pattern;
use regex::Regex;

fn matcher(pattern: &str) -> LineMatcher {
    LineMatcher::new(Regex::new(pattern).unwrap())
}

#[test]
fn test_match_within_single_chunk() {
    let mut m = matcher("^ready");
    assert_eq!(m.feed(b"booting\nready to serve\nmore\n"), Some("ready to serve".to_string()));
}

#[test]
fn test_match_across_chunk_boundary() {
    let mut m = matcher("listening on \\d+");
    assert_eq!(m.feed(b"listen"), None);
    assert_eq!(m.feed(b"ing on 80"), None);
    assert_eq!(m.feed(b"80\r\n"), Some("listening on 8080".to_string()));
}

#[test]
fn test_partial_line_only_matches_at_finish() {
    let mut m = matcher("done$");
    assert_eq!(m.feed(b"all done"), None);
    assert_eq!(m.finish(), Some("all done".to_string()));
    assert_eq!(m.finish(), None);
}

#[test]
fn test_non_utf8_is_matched_lossily() {
    let mut m = matcher("ok");
    assert_eq!(m.feed(b"\xffok\n"), Some("\u{fffd}ok".to_string()));
}

#[test]
fn test_invalid_pattern_is_an_error() {
    assert!(compile_stop_pattern(Some("(")).is_err());
    assert!(compile_stop_pattern(None).unwrap().is_none());
}
