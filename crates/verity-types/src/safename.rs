//! Safenames: locally unique object names derived from a download URL.
//!
//! A safename is the URL with its scheme dropped and every path separator
//! encoded, followed by `.<hex digest>`. It is used verbatim as a file name
//! in the pending and verifying zones, so it must never contain `/`.

use crate::error::TypeError;

/// Encodings of `/` that may appear inside a safename. The space form is the
/// legacy encoding; `%2F` is the percent-encoded one.
const SEPARATORS: [&str; 3] = [" ", "%2F", "%2f"];

/// Check that `name` is usable as a single path component.
pub fn validate_name(name: &str) -> Result<(), TypeError> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name == "." || name == ".." {
        "relative path component"
    } else if name.contains('/') || name.contains('\\') {
        "contains a path separator"
    } else if name.contains('\0') {
        "contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Derive the file name used in the verified zone.
///
/// Keeps the last URL path component of the safename and drops its trailing
/// `.<digest>` part: `host%2Fimages%2Fv1.img.<sha>` becomes `v1.img`.
pub fn final_filename(safename: &str) -> Result<String, TypeError> {
    let start = SEPARATORS
        .iter()
        .filter_map(|sep| safename.rfind(sep).map(|i| i + sep.len()))
        .max()
        .unwrap_or(0);
    let last = &safename[start..];
    match last.rfind('.') {
        Some(i) if i > 0 => Ok(last[..i].to_string()),
        _ => Err(TypeError::MalformedSafename(safename.to_string())),
    }
}
