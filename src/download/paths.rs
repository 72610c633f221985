use std::path::{Path, PathBuf};

use crate::types::{Category, ItemId};

/// Final location of an item: `<root>/<category>/20YY/MM/DD/<id>`.
pub fn artifact_path(root: &Path, category: Category, id: &ItemId) -> PathBuf {
    let mut path = root.join(category.dir_name());
    for component in id.shard() {
        path.push(component);
    }
    path.join(id.as_str())
}

/// Sibling temp file the payload is written to before the rename.
///
/// Named after the item so concurrent writers never share a temp file, and a
/// leftover from an interrupted run is simply truncated next time.
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    final_path.with_file_name(name)
}
