/// Normalize a slash-separated path the way POSIX `normpath` does.
///
/// Empty and `.` segments are dropped and `..` consumes the previous
/// segment. An absolute path never climbs above `/`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Canonical cache key for a schema locator: relative, no empty, `.` or
/// `..` segments. `"/generate/"` and `"generate"` name the same schema.
pub fn normalize_locator(locator: &str) -> String {
    normalize_path(&format!("/{locator}"))
        .trim_start_matches('/')
        .to_string()
}
