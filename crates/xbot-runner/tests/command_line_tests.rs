use std::path::Path;
use xbot_runner::command_line::{resolve_program, tokenize, working_dir};

#[test]
fn test_plain_words() {
    assert_eq!(
        tokenize("/opt/suite/run.sh --verbose  -n 3"),
        vec!["/opt/suite/run.sh", "--verbose", "-n", "3"]
    );
}

#[test]
fn test_double_and_single_quotes_are_stripped() {
    assert_eq!(
        tokenize(r#"run "two words" 'and more' tail"#),
        vec!["run", "two words", "and more", "tail"]
    );
}

#[test]
fn test_no_escape_processing_inside_quotes() {
    assert_eq!(tokenize(r#"echo "a\nb" 'c"d'"#), vec!["echo", r"a\nb", r#"c"d"#]);
}

#[test]
fn test_quote_splits_adjacent_word() {
    assert_eq!(tokenize(r#"abc"def ghi"jkl"#), vec!["abc", "def ghi", "jkl"]);
}

#[test]
fn test_empty_quotes_yield_empty_token() {
    assert_eq!(tokenize(r#"prog "" x"#), vec!["prog", "", "x"]);
}

#[test]
fn test_unterminated_quote_is_dropped() {
    assert_eq!(tokenize(r#"prog "open arg"#), vec!["prog", "open", "arg"]);
}

#[test]
fn test_blank_command_line() {
    assert!(tokenize("   \t ").is_empty());
}

#[test]
fn test_bare_program_has_no_working_dir() {
    let program = resolve_program("sh");
    assert_eq!(program, Path::new("sh"));
    assert!(working_dir(&program).is_none());
}

#[test]
fn test_absolute_program_runs_from_its_directory() {
    let program = resolve_program("/opt/suite/run.sh");
    assert_eq!(working_dir(&program), Some(Path::new("/opt/suite")));
}

#[test]
fn test_relative_program_is_anchored_to_current_dir() {
    let program = resolve_program("etc/dummy.sh");
    assert!(program.is_absolute());
    assert!(program.ends_with("etc/dummy.sh"));
}
