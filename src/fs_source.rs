use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::crawler::{FileCrawler, ProgressReporter, ScanIndex, ScanOptions, ScanStats};
use crate::error::{TreeError, TreeResult};
use crate::source::{NodeSource, SourceEntry};

/// Files and folders on disk.
///
/// Folder listings come from a crawl taken at scan time. File sizes are
/// read from disk on every load, so duplicates reflect the file as it is
/// now; the crawled size is used if the file can no longer be read.
/// Symbolic links are leaves sized by the link itself.
#[derive(Debug)]
pub struct FileSystemSource {
    index: ScanIndex,
    stats: ScanStats,
    options: ScanOptions,
}

impl FileSystemSource {
    pub fn scan<P: AsRef<Path> + std::fmt::Debug>(root: P, options: ScanOptions) -> TreeResult<Self> {
        Self::scan_with_progress(root, options, None)
    }

    #[instrument(level = "debug", skip(reporter))]
    pub fn scan_with_progress<P: AsRef<Path> + std::fmt::Debug>(
        root: P,
        options: ScanOptions,
        reporter: Option<ProgressReporter>,
    ) -> TreeResult<Self> {
        let mut crawler = FileCrawler::new();
        let (index, stats) = crawler.scan(root, options, reporter)?;
        Ok(Self {
            index,
            stats,
            options,
        })
    }

    /// Identity of the scanned root, suitable for `TmTree::from_source`.
    pub fn root_identity(&self) -> String {
        identity_of(&self.index.root)
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    fn live_listing(&self, path: &Path) -> TreeResult<Vec<String>> {
        let mut listing = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| TreeError::io(path, e))? {
            let entry = entry.map_err(|e| TreeError::io(path, e))?;
            let name = entry.file_name();
            if self.options.skip_hidden && name.to_string_lossy().starts_with('.') {
                continue;
            }
            if let Some(child) = entry.path().to_str() {
                listing.push(child.to_string());
            }
        }
        listing.sort();
        Ok(listing)
    }
}

impl NodeSource for FileSystemSource {
    fn load(&self, identity: &str) -> TreeResult<SourceEntry> {
        let path = PathBuf::from(identity);
        let name = display_name(&path, identity);

        if let Some(listing) = self.index.dirs.get(&path) {
            return Ok(SourceEntry::Internal {
                name,
                children: listing.iter().map(|p| identity_of(p)).collect(),
            });
        }

        // Links are not followed, matching the crawl.
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_dir() => Ok(SourceEntry::Internal {
                name,
                children: self.live_listing(&path)?,
            }),
            Ok(metadata) => Ok(SourceEntry::Leaf {
                name,
                size: metadata.len(),
            }),
            Err(e) => match self.index.files.get(&path) {
                Some(size) => {
                    debug!(identity, error = %e, "using crawled size");
                    Ok(SourceEntry::Leaf { name, size: *size })
                }
                None => Err(TreeError::io(path, e)),
            },
        }
    }

    fn separator(&self) -> &str {
        std::path::MAIN_SEPARATOR_STR
    }
}

fn identity_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn display_name(path: &Path, identity: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourGenerator;
    use crate::tree::TmTree;
    use std::sync::Arc;

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), vec![0u8; 30]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), vec![0u8; 70]).unwrap();
        dir
    }

    #[test]
    fn test_tree_from_disk() {
        let dir = sample_dir();
        let source = FileSystemSource::scan(dir.path(), ScanOptions::default()).unwrap();
        let root_identity = source.root_identity();
        let tree =
            TmTree::from_source(Arc::new(source), &root_identity, ColourGenerator::seeded(5)).unwrap();

        let root = tree.root();
        assert_eq!(tree.data_size(root), 100);
        let names: Vec<_> = tree
            .children(root)
            .into_iter()
            .map(|c| tree.name(c).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "sub"]);

        let sub = tree.children(root)[1];
        let b = tree.children(sub)[0];
        let sep = std::path::MAIN_SEPARATOR_STR;
        let root_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            tree.get_path_string(b),
            format!("{root_name}{sep}sub{sep}b.txt")
        );
        assert_eq!(tree.get_suffix(b), " (file, 70.00B)");
    }

    #[test]
    fn test_duplicate_rereads_file() {
        let dir = sample_dir();
        let source = FileSystemSource::scan(dir.path(), ScanOptions::default()).unwrap();
        let root_identity = source.root_identity();
        let mut tree =
            TmTree::from_source(Arc::new(source), &root_identity, ColourGenerator::seeded(5)).unwrap();
        let root = tree.root();
        let a = tree.children(root)[0];

        fs::write(dir.path().join("a.txt"), vec![0u8; 50]).unwrap();
        let twin = tree.duplicate(a).unwrap();
        assert_eq!(tree.data_size(twin), 50);
        assert_eq!(tree.data_size(a), 30);
        assert_eq!(tree.data_size(root), 150);
    }

    #[test]
    fn test_deleted_file_falls_back_to_crawled_size() {
        let dir = sample_dir();
        let source = FileSystemSource::scan(dir.path(), ScanOptions::default()).unwrap();
        let file = source.index.root.join("a.txt");
        fs::remove_file(&file).unwrap();

        let entry = source.load(&identity_of(&file)).unwrap();
        assert_eq!(
            entry,
            SourceEntry::Leaf {
                name: "a.txt".into(),
                size: 30,
            }
        );
        assert!(source.load(&identity_of(&source.index.root.join("nope"))).is_err());
    }

    #[test]
    fn test_live_listing_for_new_folder() {
        let dir = sample_dir();
        let source = FileSystemSource::scan(dir.path(), ScanOptions::default()).unwrap();
        let fresh = source.index.root.join("fresh");
        fs::create_dir(&fresh).unwrap();
        fs::write(fresh.join("z"), b"12").unwrap();
        fs::write(fresh.join("y"), b"1").unwrap();

        match source.load(&identity_of(&fresh)).unwrap() {
            SourceEntry::Internal { name, children } => {
                assert_eq!(name, "fresh");
                assert_eq!(
                    children,
                    vec![identity_of(&fresh.join("y")), identity_of(&fresh.join("z"))]
                );
            }
            other => panic!("expected a folder, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real").join("f"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let source = FileSystemSource::scan(dir.path(), ScanOptions::default()).unwrap();
        let crawled = source.stats().total_size;
        let root_identity = source.root_identity();
        let tree =
            TmTree::from_source(Arc::new(source), &root_identity, ColourGenerator::seeded(5)).unwrap();

        let root = tree.root();
        assert_eq!(tree.data_size(root), crawled);
        assert_eq!(tree.len(), 5);
        for name in ["link", "loop"] {
            let id = tree
                .children(root)
                .into_iter()
                .find(|&c| tree.name(c) == Some(name))
                .unwrap();
            assert!(tree.is_leaf(id));
        }
    }
}
