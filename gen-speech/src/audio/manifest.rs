//! Concat-list manifests.
//!
//! One `file '<path>'` line per fragment, in assembly order. This is the
//! list format read by FFmpeg's concat demuxer, which does not unescape
//! paths, so paths containing quotes or line breaks are rejected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pipeline::GeneratedPart;

/// File name used for the manifest inside a working directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.txt";

/// Handle to a manifest written on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    path: PathBuf,
    parts: Vec<PathBuf>,
}

impl Manifest {
    /// Write a manifest for the given parts, in slice order.
    pub async fn build(parts: &[GeneratedPart], path: &Path) -> Result<Self> {
        let paths: Vec<PathBuf> = parts.iter().map(|p| p.path.clone()).collect();
        let content = render(&paths)?;
        tokio::fs::write(path, content).await?;

        log::debug!("wrote manifest {} ({} entries)", path.display(), paths.len());
        Ok(Self {
            path: path.to_path_buf(),
            parts: paths,
        })
    }

    /// Read a manifest back from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            parts: parse(&content)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fragment paths in assembly order.
    pub fn parts(&self) -> &[PathBuf] {
        &self.parts
    }

    /// Delete every fragment the manifest names, then the manifest itself.
    ///
    /// Files that are already gone are skipped, so this can be called twice.
    pub async fn cleanup(&self) -> Result<()> {
        let parts = match Self::load(&self.path).await {
            Ok(on_disk) => on_disk.parts,
            Err(_) => self.parts.clone(),
        };

        for part in &parts {
            remove_if_present(part).await?;
        }
        remove_if_present(&self.path).await?;
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("already removed: {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Render manifest lines for a list of fragment paths.
pub fn render(paths: &[PathBuf]) -> Result<String> {
    let mut content = String::new();
    for path in paths {
        let line = path
            .to_str()
            .filter(|s| !s.contains(['\'', '\n', '\r']))
            .ok_or_else(|| Error::UnsafeManifestPath { path: path.clone() })?;
        content.push_str("file '");
        content.push_str(line);
        content.push_str("'\n");
    }
    Ok(content)
}

/// Parse manifest lines back into fragment paths.
pub fn parse(content: &str) -> Result<Vec<PathBuf>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.strip_prefix("file '")
                .and_then(|rest| rest.strip_suffix('\''))
                .map(PathBuf::from)
                .ok_or_else(|| Error::ManifestLine {
                    line: i + 1,
                    content: line.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn part(index: usize, path: &Path) -> GeneratedPart {
        GeneratedPart {
            index,
            path: path.to_path_buf(),
            text: format!("chunk {}", index),
        }
    }

    #[test]
    fn test_render_format() {
        let content = render(&[
            PathBuf::from("/tmp/work/part-00000.mp3"),
            PathBuf::from("relative/part-00001.mp3"),
        ])
        .unwrap();
        assert_eq!(
            content,
            "file '/tmp/work/part-00000.mp3'\nfile 'relative/part-00001.mp3'\n"
        );
    }

    #[test]
    fn test_render_rejects_quotes_and_newlines() {
        for bad in ["/tmp/it's.mp3", "/tmp/a\nb.mp3", "/tmp/a\rb.mp3"] {
            let err = render(&[PathBuf::from(bad)]).unwrap_err();
            assert!(matches!(err, Error::UnsafeManifestPath { .. }), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_rejects_foreign_lines() {
        assert_eq!(
            parse("file 'a.mp3'\n\nfile 'b.mp3'\n").unwrap(),
            vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")]
        );
        assert!(matches!(
            parse("file 'a.mp3'\nduration 2\n"),
            Err(Error::ManifestLine { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_build_writes_lines_in_part_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("part-00000.mp3");
        let b = dir.path().join("part-00001.mp3");
        let manifest_path = dir.path().join(MANIFEST_FILE_NAME);

        let manifest = Manifest::build(&[part(0, &a), part(1, &b)], &manifest_path)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&manifest_path).unwrap();
        assert_eq!(
            content,
            format!("file '{}'\nfile '{}'\n", a.display(), b.display())
        );
        assert_eq!(manifest.parts(), &[a, b]);

        let loaded = Manifest::load(&manifest_path).await.unwrap();
        assert_eq!(loaded, manifest);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("part-00000.pcm");
        let b = dir.path().join("part-00001.pcm");
        std::fs::write(&a, b"foo").unwrap();
        std::fs::write(&b, b"bar").unwrap();
        let manifest_path = dir.path().join(MANIFEST_FILE_NAME);

        let manifest = Manifest::build(&[part(0, &a), part(1, &b)], &manifest_path)
            .await
            .unwrap();

        // One fragment vanished before cleanup
        std::fs::remove_file(&b).unwrap();

        manifest.cleanup().await.unwrap();
        assert!(!a.exists());
        assert!(!manifest_path.exists());

        manifest.cleanup().await.unwrap();
    }
}
