use crate::vfs::tree::{now_secs, Tree};

const MAX_VERSIONS: usize = 5;

/// Push `previous_content` (the file's content *before* the update that
/// triggered this call) as a new snapshot of `original_name`, then prune to
/// the five most recent, evicted oldest-first by `created_at`. Called by
/// `update_file` before the content swap. A second snapshot landing in the
/// same wall-clock second as an existing one overwrites it rather than
/// being suffix-disambiguated, matching the source's dict-keyed-by-name
/// behavior.
pub fn push_version(tree: &mut Tree, original_name: &str, previous_content: Vec<u8>) {
    let versions_id = tree.ensure_versions_folder();

    let timestamp = now_secs().floor() as u64;
    let snapshot_name = format!("{original_name}.{timestamp}.bak");
    tree.upsert_version_file(versions_id, &snapshot_name, previous_content);

    let prefix = format!("{original_name}.");
    let mut siblings: Vec<(String, f64)> = tree
        .versions_children(versions_id)
        .keys()
        .filter(|name| name.starts_with(&prefix))
        .map(|name| {
            let id = tree.versions_children(versions_id)[name];
            (name.clone(), tree.get(id).created_at)
        })
        .collect();
    siblings.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("timestamps are never NaN"));

    while siblings.len() > MAX_VERSIONS {
        let (oldest_name, _) = siblings.remove(0);
        tree.remove_version_child(versions_id, &oldest_name);
    }
}
