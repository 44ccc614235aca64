//! Breadth-first file discovery used for rule directories and scan targets.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata lookup that treats permission errors as "skip this path".
fn try_metadata(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(m) => Ok(Some(m)),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "permission denied");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Walks `root` breadth-first, invoking `callback` for every regular file
/// not rejected by `excluded`. Symlinks are never followed, so cyclic links
/// terminate; unreadable entries are skipped rather than failing the walk.
pub fn walk_files<F, C>(root: &Path, excluded: &F, callback: &mut C) -> io::Result<()>
where
    F: Fn(&Path) -> bool,
    C: FnMut(&Path) -> io::Result<()>,
{
    let mut pending: VecDeque<PathBuf> = VecDeque::from([root.to_path_buf()]);
    let mut seen: HashSet<PathBuf> = HashSet::new();

    while let Some(current) = pending.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if excluded(&current) {
            debug!(path = %current.display(), "path excluded");
            continue;
        }
        let Some(meta) = try_metadata(&current)? else {
            continue;
        };
        let ftype = meta.file_type();
        if ftype.is_symlink() {
            debug!(path = %current.display(), "symlink skipped");
        } else if ftype.is_file() {
            callback(&current)?;
        } else if ftype.is_dir() {
            let entries = match fs::read_dir(&current) {
                Ok(e) => e,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    debug!(path = %current.display(), "permission denied");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for entry in entries {
                match entry {
                    Ok(e) => pending.push_back(e.path()),
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => continue,
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::walk_files;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn collect(base: &Path) -> BTreeSet<PathBuf> {
        let mut seen = BTreeSet::new();
        walk_files(base, &|_| false, &mut |p| {
            seen.insert(p.strip_prefix(base).unwrap().to_path_buf());
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn visits_nested_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("root.yaml"), b"").unwrap();
        fs::write(tmp.path().join("a/one.yaml"), b"").unwrap();
        fs::write(tmp.path().join("a/b/two.yaml"), b"").unwrap();

        let seen = collect(tmp.path());
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(Path::new("a/b/two.yaml")));
    }

    #[test]
    fn exclusions_prune_whole_subtrees() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("skip")).unwrap();
        fs::write(tmp.path().join("keep.js"), b"").unwrap();
        fs::write(tmp.path().join("skip/lost.js"), b"").unwrap();

        let mut seen = Vec::new();
        walk_files(
            tmp.path(),
            &|p| p.ends_with("skip"),
            &mut |p| {
                seen.push(p.to_path_buf());
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("keep.js"));
    }

    #[cfg(unix)]
    #[test]
    fn terminates_on_symlink_loops() {
        use std::os::unix::fs as unix_fs;

        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a/file.js"), b"").unwrap();
        unix_fs::symlink(tmp.path(), tmp.path().join("a/loop")).unwrap();

        let seen = collect(tmp.path());
        assert_eq!(seen.len(), 1);
    }
}
