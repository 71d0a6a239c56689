//! Output path planning: normalization, joining, and relative paths.
//!
//! Paths are handled as `/`-separated strings so that the planned layout is
//! identical on every platform and can be embedded in Markdown verbatim.

/// Normalizes a path string: backslashes become `/`, repeated slashes collapse.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if !prev_slash {
                out.push('/');
            }
            prev_slash = true;
        } else {
            out.push(ch);
            prev_slash = false;
        }
    }
    out
}

/// Joins path segments with `/` and normalizes the result.
#[must_use]
pub fn join_path(segments: &[&str]) -> String {
    normalize_path(&segments.join("/"))
}

/// Destination of the Markdown note for a cite key: `{dir}/@{cite_key}.md`.
#[must_use]
pub fn markdown_path(markdown_dir: &str, cite_key: &str) -> String {
    join_path(&[markdown_dir, &format!("@{cite_key}.md")])
}

/// Per-item attachment directory: `{base}/attachment/{cite_key}`.
#[must_use]
pub fn attachment_dir(attachment_base_dir: &str, cite_key: &str) -> String {
    join_path(&[attachment_base_dir, "attachment", cite_key])
}

/// Returns the directory part of a normalized path (everything before the last `/`).
#[must_use]
pub fn parent_dir(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(index) => normalized[..index].to_string(),
        None => String::new(),
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

/// Computes the path of `target` relative to the directory containing `from_file`.
///
/// Uses the longest common component prefix; one `..` is emitted per remaining
/// source directory component, followed by the remaining target components.
/// Returns `"."` when both locations coincide. When exactly one side is
/// rooted no relative path exists, and the normalized target is returned.
#[must_use]
pub fn relative_path(from_file: &str, target: &str) -> String {
    let from_dir = parent_dir(from_file);
    let target = normalize_path(target);
    if from_dir.starts_with('/') != target.starts_with('/') {
        return target;
    }
    let from_parts = components(&from_dir);
    let target_parts = components(&target);

    let common = from_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", from_parts.len() - common));
    parts.extend(target_parts[common..].iter().copied());

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Resolves `relative` against `base_dir`, folding `..` and `.` segments.
/// A rooted `relative` ignores the base.
///
/// Inverse of [`relative_path`] for normalized inputs.
#[must_use]
pub fn resolve_relative(base_dir: &str, relative: &str) -> String {
    let base = normalize_path(base_dir);
    let relative = normalize_path(relative);
    if relative.starts_with('/') {
        return resolve_relative("/", &relative[1..]);
    }
    let absolute = base.starts_with('/');
    let mut parts: Vec<&str> = components(&base);
    for segment in components(&relative) {
        if segment == ".." {
            parts.pop();
        } else {
            parts.push(segment);
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
