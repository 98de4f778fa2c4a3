use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;
use serdable::GlobPattern;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    #[serde(default)]
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestConfig {
    #[serde(default = "TestConfig::default_compiler")]
    pub compiler: String,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
    #[serde(default = "TestConfig::default_source")]
    pub source: GlobPattern,
    #[serde(default = "TestConfig::default_samples_dir")]
    pub samples_dir: PathBuf,
    #[serde(default)]
    pub output: OutputMode,
    #[serde(default = "TestConfig::default_create_result_files")]
    pub create_result_files: bool,
}

/// How much of each testcase is shown after its verdict.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputMode {
    /// Verdicts only.
    Minimal,
    /// Diff of `WA`, explanation of `TLE` and `RTE`.
    #[default]
    Error,
    /// Like `Error`, plus the output of `AC` and `NI` testcases.
    Full,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            compiler: Self::default_compiler(),
            compiler_flags: Vec::new(),
            source: Self::default_source(),
            samples_dir: Self::default_samples_dir(),
            output: OutputMode::default(),
            create_result_files: Self::default_create_result_files(),
        }
    }
}

impl TestConfig {
    fn default_compiler() -> String {
        "g++".to_owned()
    }

    fn default_source() -> GlobPattern {
        GlobPattern::parse("main.*").expect("valid glob literal")
    }

    fn default_samples_dir() -> PathBuf {
        PathBuf::from("samples")
    }

    fn default_create_result_files() -> bool {
        true
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "cjudge.toml";
    const HOME_CONFIG_DIR: &str = ".cjudge";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).expect("config example is embedded");
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including `cur_dir` itself.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// `~/.cjudge/cjudge.toml`, if it exists.
    pub fn find_file_in_home_dir() -> Option<PathBuf> {
        let path = dirs::home_dir()?
            .join(Self::HOME_CONFIG_DIR)
            .join(Self::FILENAME);
        path.is_file().then_some(path)
    }

    /// Loads the nearest config file, falling back to the home dir and
    /// finally to the built-in defaults.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let found =
            Self::find_file_in_ancestors(&cur_dir).or_else(Self::find_file_in_home_dir);
        match found {
            Some(filepath) => {
                log::info!("Using config {}", filepath.display());
                Self::from_toml_file(filepath)
            }
            None => {
                log::info!("No {} found; using defaults", Self::FILENAME);
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn example_toml_is_the_default() {
        let toml = Config::example_toml();
        let cfg = dbg!(Config::from_toml(&toml)).unwrap();

        assert_eq!(cfg, Config::default());

        let Config {
            source_config_file,
            test,
        } = cfg;
        assert_eq!(source_config_file, None);
        assert_eq!(test.compiler, "g++");
        assert!(test.source.matches("main.cpp"));
        assert_eq!(test.samples_dir, Path::new("samples"));
        assert_eq!(test.output, OutputMode::Error);
        assert!(test.create_result_files);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            [test]
            compiler = "clang++"
            compiler_flags = ["-O2", "-std=c++17"]
            output = "full"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.test.compiler, "clang++");
        assert_eq!(cfg.test.compiler_flags, vec!["-O2", "-std=c++17"]);
        assert_eq!(cfg.test.output, OutputMode::Full);
        assert_eq!(cfg.test.samples_dir, Path::new("samples"));
        assert!(cfg.test.create_result_files);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn invalid_output_mode_is_rejected() {
        assert!(Config::from_toml("[test]\noutput = \"verbose\"").is_err());
    }

    #[test]
    fn nearest_config_file_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let problem = tmp.path().join("contest").join("a");
        std::fs::create_dir_all(&problem).unwrap();
        std::fs::write(
            tmp.path().join(Config::FILENAME),
            "[test]\ncompiler = \"outer\"\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("contest").join(Config::FILENAME),
            "[test]\ncompiler = \"inner\"\n",
        )
        .unwrap();

        let cfg = Config::load(&problem).unwrap();
        assert_eq!(cfg.test.compiler, "inner");
        assert_eq!(
            cfg.source_config_file,
            Some(tmp.path().join("contest").join(Config::FILENAME))
        );
    }

    #[test]
    fn broken_config_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(Config::FILENAME), "[test\n").unwrap();
        let err = Config::load(tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid config TOML"));
    }

    #[test]
    fn output_mode_from_str() {
        assert_eq!("minimal".parse::<OutputMode>().unwrap(), OutputMode::Minimal);
        assert_eq!(OutputMode::Full.to_string(), "full");
    }
}
