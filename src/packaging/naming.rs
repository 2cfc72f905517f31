//! Output file naming and collision-free publishing.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::PackagingError;
use crate::catalog::DEFAULT_TITLE;

/// Longest sanitized title kept, in characters.
const MAX_TITLE_CHARS: usize = 180;

/// Turn a title into a safe file name stem.
///
/// Path separators, reserved characters and control characters become `_`,
/// whitespace runs collapse to one space, and trailing dots are dropped.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() && !c.is_whitespace() => '_',
            _ => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    let name = truncated.trim().trim_end_matches('.').trim_end();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        DEFAULT_TITLE.to_string()
    } else {
        name.to_string()
    }
}

/// File name for the `version`-th copy of `base`: `base.ext`, `base v2.ext`, ...
pub fn candidate_name(base: &str, version: u32, extension: &str) -> String {
    if version <= 1 {
        format!("{}{}", base, extension)
    } else {
        format!("{} v{}{}", base, version, extension)
    }
}

/// Hidden staging file inside `dir`, created with regular file permissions
/// (0644 before umask) so published outputs are readable like any other file.
pub(crate) fn staging_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".tunegrab-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

/// Copy `source` into `output_dir` under the first free candidate name.
///
/// The content is staged in a hidden temporary file inside `output_dir` and
/// then linked to its final name with no-clobber semantics, so a name is
/// claimed atomically and only ever with the complete content. Concurrent
/// publishers with the same base therefore never overwrite each other.
pub fn publish_no_clobber(
    source: &Path,
    output_dir: &Path,
    base: &str,
    extension: &str,
    max_names: u32,
) -> Result<PathBuf, PackagingError> {
    std::fs::create_dir_all(output_dir)?;

    let mut staged = staging_file(output_dir)?;
    {
        let mut input = File::open(source)?;
        std::io::copy(&mut input, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
    }

    for version in 1..=max_names {
        let candidate = output_dir.join(candidate_name(base, version, extension));
        match staged.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!("{:?} already exists, trying next name", candidate);
                staged = e.file;
            }
            Err(e) => return Err(PackagingError::Io(e.error)),
        }
    }

    Err(PackagingError::TooManyDuplicates {
        name: format!("{}{}", base, extension),
        limit: max_names,
    })
}
