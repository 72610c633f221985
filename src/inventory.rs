//! Local inventory: which items are already on disk.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::{Category, ItemId};

/// Directory levels between a category root and an artifact (`20YY/MM/DD`).
const SHARD_DEPTH: usize = 3;

pub type Inventory = BTreeSet<String>;

/// One inventory per category, from a single origin (disk or catalog).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventories {
    pub restricted: Inventory,
    pub general: Inventory,
}

impl Inventories {
    pub fn get(&self, category: Category) -> &Inventory {
        match category {
            Category::Restricted => &self.restricted,
            Category::General => &self.general,
        }
    }
}

/// Scan both category roots under `root`.
pub fn scan_all(root: &Path) -> Inventories {
    Inventories {
        restricted: scan_local(root, Category::Restricted),
        general: scan_local(root, Category::General),
    }
}

/// [`scan_all`] on the blocking pool, keeping directory walks off the
/// async workers.
pub async fn scan_all_blocking(root: PathBuf) -> Result<Inventories, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || scan_all(&root)).await
}

/// Collect the identifiers of every artifact stored under `root/<category>`.
///
/// A missing root means nothing has been downloaded yet and yields an empty
/// set. Files that are not valid identifiers (e.g. leftover `.part` files)
/// are ignored.
pub fn scan_local(root: &Path, category: Category) -> Inventory {
    let category_root = root.join(category.dir_name());
    let mut found = Inventory::new();
    collect(&category_root, 0, &mut found);
    tracing::debug!(
        category = %category,
        root = %category_root.display(),
        count = found.len(),
        "scanned local inventory"
    );
    found
}

fn collect(dir: &Path, depth: usize, found: &mut Inventory) {
    let entries = match read_dir_sorted(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", dir.display(), e);
            return;
        }
    };

    for path in entries {
        if depth < SHARD_DEPTH {
            if path.is_dir() {
                collect(&path, depth + 1, found);
            }
            continue;
        }
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if ItemId::parse(name).is_ok() {
            found.insert(name.to_string());
        }
    }
}

fn read_dir_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}
