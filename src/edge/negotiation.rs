//! Auto-format selection
//!
//! Resolves `format=auto` into a concrete output format from the original
//! object's extension and the client's `Accept` header.
//!
//! WebP is checked before AVIF on purpose: WebP encodes much faster, and that
//! wins over AVIF's smaller output for on-demand transforms.

/// Resolve `auto` to a concrete format name.
///
/// Starts from the extension default (`png` for `.png` originals, `jpeg`
/// otherwise), then upgrades to `webp` or `avif` when the `Accept` header
/// mentions them.
pub fn resolve_auto_format(path: &str, accept: Option<&str>) -> &'static str {
    let default = extension_default(path);

    let accept = match accept {
        Some(h) => h.to_ascii_lowercase(),
        None => return default,
    };

    if accept.contains("webp") {
        "webp"
    } else if accept.contains("avif") {
        "avif"
    } else {
        default
    }
}

/// Default output format derived from the original path extension
fn extension_default(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("png") => "png",
        _ => "jpeg",
    }
}
