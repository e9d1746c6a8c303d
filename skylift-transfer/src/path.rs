/// Computes the storage key for an item uploaded into `current_folder`.
///
/// A folder drop whose top level name equals the current folder would double
/// the segment (`docs/docs/a.txt`), so a leading `current_folder/` on the
/// relative path is stripped before joining. Trailing slashes of the folder
/// only get dropped in the final join.
pub fn resolve_key(current_folder: &str, relative_path: &str) -> String {
    if current_folder.is_empty() {
        return relative_path.to_owned();
    }

    let prefix = format!("{}/", current_folder);
    let cleaned = relative_path
        .strip_prefix(prefix.as_str())
        .unwrap_or(relative_path);

    format!("{}/{}", current_folder.trim_end_matches('/'), cleaned)
}
