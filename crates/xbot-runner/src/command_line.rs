use std::path::{Path, PathBuf};

/// Split a command line into program and arguments.
///
/// A token is a run of characters that are neither whitespace nor quotes, or
/// the contents of a `"..."` or `'...'` pair. There is no escape processing.
/// A quote without a closing partner is dropped.
pub fn tokenize(command_line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = command_line;

    loop {
        rest = rest.trim_start();
        let Some(first) = rest.chars().next() else {
            break;
        };

        if first == '"' || first == '\'' {
            match rest[1..].find(first) {
                Some(end) => {
                    tokens.push(rest[1..1 + end].to_string());
                    rest = &rest[end + 2..];
                }
                None => rest = &rest[1..],
            }
            continue;
        }

        let end = rest
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(rest.len());
        tokens.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    tokens
}

/// Path to execute for the first token.
///
/// Relative paths with a directory component are anchored to our own working
/// directory, since the child runs from the program's directory.
pub fn resolve_program(first_token: &str) -> PathBuf {
    let program = PathBuf::from(first_token);
    if program.is_relative() && working_dir(&program).is_some() {
        if let Ok(cwd) = std::env::current_dir() {
            return cwd.join(program);
        }
    }
    program
}

/// Directory the program is run from: its parent, if it has one.
pub fn working_dir(program: &Path) -> Option<&Path> {
    program.parent().filter(|p| !p.as_os_str().is_empty())
}
