//! Joins synthesized fragments into the final audio file.

use speech_client::AudioFormat;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::manifest::Manifest;
use crate::error::{Error, Result};

/// How fragments are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Stream-copy concatenation of encoded containers through FFmpeg
    Encoded,
    /// Byte-level concatenation of headerless sample data
    Raw,
}

impl AssemblyMode {
    /// Pick the mode the output format needs.
    pub fn for_format(format: AudioFormat) -> Self {
        if format.is_raw() {
            Self::Raw
        } else {
            Self::Encoded
        }
    }
}

/// Fragment assembler.
#[derive(Debug, Clone)]
pub struct Assembler {
    ffmpeg: PathBuf,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Assembler {
    /// Create an assembler that runs the given FFmpeg program.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Combine the fragments named by `manifest` into `output`.
    pub async fn assemble(
        &self,
        manifest: &Manifest,
        output: &Path,
        mode: AssemblyMode,
    ) -> Result<PathBuf> {
        match mode {
            AssemblyMode::Encoded => self.concat_encoded(manifest, output).await?,
            AssemblyMode::Raw => concat_raw(manifest, output).await?,
        }
        Ok(output.to_path_buf())
    }

    /// Uses FFmpeg's concat demuxer for lossless concatenation of same-format files.
    async fn concat_encoded(&self, manifest: &Manifest, output: &Path) -> Result<()> {
        let program = self.ffmpeg.display().to_string();
        log::info!(
            "concatenating {} fragment(s) with {}",
            manifest.parts().len(),
            program
        );

        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest.path())
            .args(["-c", "copy"])
            .arg(output)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(Error::Exit {
                program,
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(Error::NoOutput {
                program,
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Append each fragment's bytes to a freshly truncated output file.
async fn concat_raw(manifest: &Manifest, output: &Path) -> Result<()> {
    let entries = Manifest::load(manifest.path()).await?;
    let mut file = tokio::fs::File::create(output).await?;

    for part in entries.parts() {
        let bytes = tokio::fs::read(part).await?;
        file.write_all(&bytes).await?;
    }
    file.flush().await?;

    log::info!(
        "appended {} raw fragment(s) into {}",
        entries.parts().len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GeneratedPart;
    use tempfile::TempDir;

    async fn manifest_of(dir: &TempDir, contents: &[&[u8]]) -> Manifest {
        let mut parts = Vec::new();
        for (index, bytes) in contents.iter().enumerate() {
            let path = dir.path().join(format!("part-{:05}.pcm", index));
            std::fs::write(&path, bytes).unwrap();
            parts.push(GeneratedPart {
                index,
                path,
                text: String::new(),
            });
        }
        Manifest::build(&parts, &dir.path().join("manifest.txt"))
            .await
            .unwrap()
    }

    #[test]
    fn test_mode_follows_format() {
        assert_eq!(AssemblyMode::for_format(AudioFormat::Pcm), AssemblyMode::Raw);
        assert_eq!(AssemblyMode::for_format(AudioFormat::Mp3), AssemblyMode::Encoded);
        assert_eq!(AssemblyMode::for_format(AudioFormat::Ogg), AssemblyMode::Encoded);
    }

    #[tokio::test]
    async fn test_raw_concatenation() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"foo", b"bar", b"baz"]).await;
        let output = dir.path().join("out.pcm");

        let path = Assembler::default()
            .assemble(&manifest, &output, AssemblyMode::Raw)
            .await
            .unwrap();

        assert_eq!(path, output);
        assert_eq!(std::fs::read(&output).unwrap(), b"foobarbaz");
    }

    #[tokio::test]
    async fn test_raw_output_is_truncated_first() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"ab", b"cd"]).await;
        let output = dir.path().join("out.pcm");
        std::fs::write(&output, b"stale data from an earlier run").unwrap();

        Assembler::default()
            .assemble(&manifest, &output, AssemblyMode::Raw)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_missing_muxer_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"x"]).await;

        let err = Assembler::new("/nonexistent/bin/ffmpeg")
            .assemble(&manifest, &dir.path().join("out.mp3"), AssemblyMode::Encoded)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Spawn { .. }));
        assert!(err.to_string().contains("Could not start process"));
    }

    #[cfg(unix)]
    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_code_and_stderr() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"x"]).await;
        let muxer = script(&dir, "fake-ffmpeg", "echo 'concat: invalid data' >&2\nexit 3");

        let err = Assembler::new(&muxer)
            .assemble(&manifest, &dir.path().join("out.mp3"), AssemblyMode::Encoded)
            .await
            .unwrap_err();

        match &err {
            Error::Exit { code, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert!(stderr.contains("concat: invalid data"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("exit code 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encoded_invocation_and_output() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"x", b"y"]).await;
        let args_log = dir.path().join("args.txt");
        // Record the arguments, then create the last one as the output file
        let muxer = script(
            &dir,
            "fake-ffmpeg",
            &format!(
                "echo \"$@\" > '{}'\nfor last; do :; done\n: > \"$last\"",
                args_log.display()
            ),
        );
        let output = dir.path().join("out.mp3");

        let path = Assembler::new(&muxer)
            .assemble(&manifest, &output, AssemblyMode::Encoded)
            .await
            .unwrap();

        assert_eq!(path, output);
        let args = std::fs::read_to_string(&args_log).unwrap();
        assert_eq!(
            args.trim(),
            format!(
                "-y -f concat -safe 0 -i {} -c copy {}",
                manifest.path().display(),
                output.display()
            )
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_of(&dir, &[b"x"]).await;
        let muxer = script(&dir, "fake-ffmpeg", "exit 0");

        let err = Assembler::new(&muxer)
            .assemble(&manifest, &dir.path().join("out.mp3"), AssemblyMode::Encoded)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoOutput { .. }));
    }
}
