use std::{
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("No entry matched glob '{0}' in '{1}'")]
        NoEntryMatchedGlob(::glob::Pattern, PathBuf),

        #[error("Multiple entries matched glob '{0}' in '{1}': {2:?}")]
        MultipleEntriesMatchedGlob(::glob::Pattern, PathBuf, Vec<PathBuf>),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Lists the regular files directly under `dir` (no recursion).
/// Entries whose file type cannot be determined are skipped.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let Ok(ft) = entry.file_type() else {
            continue
        };
        if ft.is_dir() {
            continue;
        }
        files.push(entry.path());
    }
    Ok(files)
}

/// Finds the one file directly under `dir` whose name matches `filename_pattern`.
/// Zero or more than one match is an error.
pub fn find_unique_file(
    dir: impl AsRef<Path>,
    filename_pattern: &::glob::Pattern,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let mut matched: Vec<PathBuf> = self::list_files(dir)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| filename_pattern.matches(name.to_string_lossy().as_ref()))
                .unwrap_or(false)
        })
        .collect();

    match matched.len() {
        0 => Err(Error::NoEntryMatchedGlob(
            filename_pattern.to_owned(),
            dir.to_owned(),
        )),
        1 => Ok(matched.remove(0)),
        _ => {
            matched.sort();
            log::debug!("{} files matched '{}'", matched.len(), filename_pattern);
            Err(Error::MultipleEntriesMatchedGlob(
                filename_pattern.to_owned(),
                dir.to_owned(),
                matched,
            ))
        }
    }
}
