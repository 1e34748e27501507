use std::path::{Component, Path, PathBuf};

/// Render a path with forward slashes regardless of the host separator.
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically join `relative` onto `base`, folding `.` and `..` segments.
///
/// `..` never climbs above a filesystem root; on relative bases unmatched `..`
/// segments are kept.
pub fn join_normalised(base: &Path, relative: &str) -> PathBuf {
    let mut joined = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match joined.components().next_back() {
                Some(Component::Normal(_)) => {
                    joined.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => joined.push(".."),
            },
            other => joined.push(other.as_os_str()),
        }
    }
    joined
}

/// Path of `target` relative to `base`, forward-slashed.
///
/// Falls back to `target` itself when no relative path exists.
pub fn relative_path(base: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());
    to_forward_slashes(&relative)
}
