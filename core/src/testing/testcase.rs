use std::{
    collections::BTreeMap,
    io::Cursor,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs::File as TokioFile, io::AsyncRead};

use super::error::{Error, Result};
use super::natsort::natural_cmp;

#[async_trait]
pub trait AsyncTestcase<'a> {
    type Reader: AsyncRead + Unpin + Send;
    fn name(&self) -> &str;
    fn has_expected(&self) -> bool;
    async fn new_input_reader(&'a self) -> Result<Self::Reader>;
    /// `None` when the testcase has no expected output.
    async fn new_expected_reader(&'a self) -> Result<Option<Self::Reader>>;
}

/// A sample pair discovered on disk: `<name>.in` and optionally `<name>.out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    name: String,
    input_path: PathBuf,
    expected_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMemoryTestcase<B: AsRef<[u8]>> {
    pub name: String,
    pub input: B,
    pub expected: Option<B>,
}

impl FsTestcase {
    pub const INPUT_EXT: &str = "in";
    pub const EXPECTED_EXT: &str = "out";
    pub const RESULT_EXT: &str = "res";

    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        expected: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input.into(),
            expected_path: expected,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn expected_path(&self) -> Option<&Path> {
        self.expected_path.as_deref()
    }

    /// Where the captured stdout of this testcase is persisted: `<name>.res`
    /// beside the input file.
    pub fn result_path(&self) -> PathBuf {
        self.input_path.with_extension(Self::RESULT_EXT)
    }

    /// Opens every file of this testcase once so that an unreadable sample
    /// is reported before any program runs.
    pub fn ensure_readable(&self) -> Result<()> {
        std::iter::once(&self.input_path)
            .chain(&self.expected_path)
            .try_for_each(|path| {
                std::fs::File::open(path)
                    .map(drop)
                    .map_err(|e| Error::Io("Failed to read testcase", path.clone(), e))
            })
    }

    /// Discovers the samples directly under `dir`.
    ///
    /// Every stem with a `.in` file becomes a testcase. Testcases that also
    /// have a `.out` file come first, then input-only ones; each group is in
    /// natural order of the stem.
    pub fn enumerate(dir: impl AsRef<Path>) -> Result<Vec<Self>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::MissingSamples(dir.to_owned()));
        }

        #[derive(Default)]
        struct Found {
            input: Option<PathBuf>,
            expected: Option<PathBuf>,
        }

        let mut stems: BTreeMap<String, Found> = BTreeMap::new();
        for path in fsutil::list_files(dir)? {
            let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
                continue
            };
            let stem = stem.to_string_lossy().into_owned();
            if ext == Self::INPUT_EXT {
                stems.entry(stem).or_default().input = Some(path);
            } else if ext == Self::EXPECTED_EXT {
                stems.entry(stem).or_default().expected = Some(path);
            }
        }

        let (mut full, mut half): (Vec<_>, Vec<_>) = stems
            .into_iter()
            .filter_map(|(name, found)| {
                let input = found.input?;
                Some(Self::new(name, input, found.expected))
            })
            .partition(|t| t.expected_path.is_some());

        full.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        half.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        full.append(&mut half);

        log::debug!("Found {} testcases in {}", full.len(), dir.display());
        Ok(full)
    }
}

#[async_trait]
impl<'a> AsyncTestcase<'a> for FsTestcase {
    type Reader = TokioFile;

    fn name(&self) -> &str {
        &self.name
    }

    fn has_expected(&self) -> bool {
        self.expected_path.is_some()
    }

    async fn new_input_reader(&'a self) -> Result<TokioFile> {
        TokioFile::open(&self.input_path)
            .await
            .map_err(|e| Error::Io("Failed to read testcase", self.input_path.clone(), e))
    }

    async fn new_expected_reader(&'a self) -> Result<Option<TokioFile>> {
        let Some(path) = &self.expected_path else {
            return Ok(None)
        };
        TokioFile::open(path)
            .await
            .map(Some)
            .map_err(|e| Error::Io("Failed to read testcase", path.clone(), e))
    }
}

impl<B> OnMemoryTestcase<B>
where
    B: AsRef<[u8]>,
{
    pub fn new(name: impl Into<String>, input: impl Into<B>, expected: Option<B>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected,
        }
    }
}

#[async_trait]
impl<'a, B> AsyncTestcase<'a> for OnMemoryTestcase<B>
where
    B: AsRef<[u8]> + Sync,
{
    type Reader = Cursor<&'a [u8]>;

    fn name(&self) -> &str {
        &self.name
    }

    fn has_expected(&self) -> bool {
        self.expected.is_some()
    }

    async fn new_input_reader(&'a self) -> Result<Self::Reader> {
        Ok(Cursor::new(self.input.as_ref()))
    }

    async fn new_expected_reader(&'a self) -> Result<Option<Self::Reader>> {
        Ok(self.expected.as_ref().map(|b| Cursor::new(b.as_ref())))
    }
}
