//! Import-statement scanning (§4.4 step 2): a line scanner, not a proto
//! grammar — good enough to find `import "..."` statements and nothing
//! more, matching §1's non-goal of "no proto code generation; only
//! parsing for import discovery".

/// The well-known standard-library import prefix the resolver never
/// tries to resolve against the registry.
pub const WELL_KNOWN_PREFIX: &str = "google/protobuf/";

/// Extract every `import "..."` / `import public "..."` / `import weak
/// "..."` target from `source`, in line order, ignoring line (`//`) and
/// block (`/* */`) comments on a best-effort basis.
pub fn scan_imports(source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut in_block_comment = false;

    for raw_line in source.lines() {
        let mut line = raw_line;

        if in_block_comment {
            if let Some(end) = line.find("*/") {
                line = &line[end + 2..];
                in_block_comment = false;
            } else {
                continue;
            }
        }

        let line = strip_line_comment(line, &mut in_block_comment);
        let trimmed = line.trim_start();

        let Some(rest) = trimmed.strip_prefix("import") else {
            continue;
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix("public").map(str::trim_start).unwrap_or(rest);
        let rest = rest.strip_prefix("weak").map(str::trim_start).unwrap_or(rest);

        if let Some(target) = extract_quoted(rest) {
            imports.push(target);
        }
    }

    imports
}

/// Remove a trailing `//` comment, and track entry into a `/* ... */`
/// block comment that isn't closed on the same line. Quoted strings
/// containing `//` or `/*` are not specially protected — good enough for
/// import scanning, where such sequences inside an import path are not
/// realistic.
fn strip_line_comment<'a>(line: &'a str, in_block_comment: &mut bool) -> &'a str {
    if let Some(start) = line.find("/*") {
        if line[start..].find("*/").is_none() {
            *in_block_comment = true;
        }
        return &line[..start];
    }
    if let Some(start) = line.find("//") {
        return &line[..start];
    }
    line
}

fn extract_quoted(s: &str) -> Option<String> {
    let s = s.trim_start();
    let s = s.strip_prefix('"')?;
    let end = s.find('"')?;
    Some(s[..end].to_string())
}

/// `true` if `target` is satisfied by the compiler's built-in
/// well-known-types, never resolved against the registry.
pub fn is_well_known(target: &str) -> bool {
    target.starts_with(WELL_KNOWN_PREFIX)
}

/// Strip `include_prefix` (e.g. `"proto"`) from `target` if present,
/// returning the remaining registry-relative path.
pub fn strip_include_prefix<'a>(target: &'a str, include_prefix: Option<&str>) -> Option<&'a str> {
    match include_prefix {
        None => Some(target),
        Some(prefix) => target.strip_prefix(&format!("{prefix}/")),
    }
}
