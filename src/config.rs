//! Configuration types.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;
use crate::pipeline::types::CandidateId;

/// Default repository URL prefix; the candidate id is appended verbatim.
pub const DEFAULT_REPOSITORY_URL: &str =
    "https://repository.apache.org/content/repositories/orgapachesling-";

/// Default public signing keys for the project.
pub const DEFAULT_KEYS_URL: &str = "https://people.apache.org/keys/group/sling.asc";

/// How the repository URL for a candidate is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlStrategy {
    /// Append the candidate id to `repository_base_url`.
    #[default]
    Constructed,
    /// Take the first repository URL found in the message body.
    Extracted,
}

impl FromStr for UrlStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constructed" => Ok(Self::Constructed),
            "extracted" => Ok(Self::Extracted),
            other => Err(format!("unknown URL strategy '{other}'")),
        }
    }
}

/// How the display body is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    /// Escape the raw body in place (`<br/>` line breaks, `&ndash;` hyphens).
    #[default]
    Inline,
    /// Substitute subject and verification result into an HTML template.
    Template,
}

impl FromStr for RenderStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "template" => Ok(Self::Template),
            other => Err(format!("unknown render strategy '{other}'")),
        }
    }
}

/// Vote check configuration.
///
/// Built once at startup and shared read-only by every pipeline run.
#[derive(Debug, Clone)]
pub struct VoteCheckConfig {
    /// Root the host writes rendered messages under.
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` receiving verification artifacts.
    pub images_subdir: String,
    /// Checkout containing the verification script.
    pub project_path: PathBuf,
    /// Verification script file name inside `project_path`.
    pub script_name: String,
    /// Interpreter used to run the script.
    pub shell: String,
    /// Directory the script stages candidates into.
    pub staging_dir: PathBuf,
    /// Repository URL prefix for candidate staging repositories.
    pub repository_base_url: String,
    pub url_strategy: UrlStrategy,
    pub render_strategy: RenderStrategy,
    /// Template file for `RenderStrategy::Template` (built-in when unset).
    pub template_path: Option<PathBuf>,
    /// Deadline for one verification run.
    pub verify_timeout: Duration,
    /// Connect + read deadline for the repository probe.
    pub probe_timeout: Duration,
    /// Signing keys imported into gpg during init.
    pub keys_url: String,
    /// Whether init imports `keys_url` into gpg.
    pub import_keys: bool,
}

impl Default for VoteCheckConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            images_subdir: "images".to_string(),
            project_path: PathBuf::from("/opt/dev/sling"),
            script_name: "check_staged_release.sh".to_string(),
            shell: "sh".to_string(),
            staging_dir: PathBuf::from("/tmp/sling-staging"),
            repository_base_url: DEFAULT_REPOSITORY_URL.to_string(),
            url_strategy: UrlStrategy::default(),
            render_strategy: RenderStrategy::default(),
            template_path: None,
            verify_timeout: Duration::from_secs(3600), // 1 hour
            probe_timeout: Duration::from_secs(30),
            keys_url: DEFAULT_KEYS_URL.to_string(),
            import_keys: false,
        }
    }
}

impl VoteCheckConfig {
    /// Build config from `VOTECHECK_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            output_dir: env_or("VOTECHECK_OUTPUT_DIR")?
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            images_subdir: env_or("VOTECHECK_IMAGES_SUBDIR")?.unwrap_or(defaults.images_subdir),
            project_path: env_or("VOTECHECK_PROJECT_PATH")?
                .map(PathBuf::from)
                .unwrap_or(defaults.project_path),
            script_name: env_or("VOTECHECK_SCRIPT_NAME")?.unwrap_or(defaults.script_name),
            shell: env_or("VOTECHECK_SHELL")?.unwrap_or(defaults.shell),
            staging_dir: env_or("VOTECHECK_STAGING_DIR")?
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            repository_base_url: env_or("VOTECHECK_REPOSITORY_URL")?
                .unwrap_or(defaults.repository_base_url),
            url_strategy: env_parse("VOTECHECK_URL_STRATEGY")?.unwrap_or(defaults.url_strategy),
            render_strategy: env_parse("VOTECHECK_RENDER")?.unwrap_or(defaults.render_strategy),
            template_path: env_or("VOTECHECK_TEMPLATE")?.map(PathBuf::from),
            verify_timeout: env_parse("VOTECHECK_VERIFY_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.verify_timeout),
            probe_timeout: env_parse("VOTECHECK_PROBE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            keys_url: env_or("VOTECHECK_KEYS_URL")?.unwrap_or(defaults.keys_url),
            import_keys: env_parse("VOTECHECK_IMPORT_KEYS")?.unwrap_or(defaults.import_keys),
        })
    }

    /// Full path of the verification script.
    pub fn script_path(&self) -> PathBuf {
        self.project_path.join(&self.script_name)
    }

    /// Directory the script writes artifacts for `id` into.
    pub fn staging_path(&self, id: &CandidateId) -> PathBuf {
        self.staging_dir.join(id.as_str())
    }

    /// Destination for the collected artifacts of `id`.
    pub fn artifact_target(&self, id: &CandidateId) -> PathBuf {
        self.output_dir.join(&self.images_subdir).join(id.as_str())
    }

    /// Repository URL for `id` under the constructed strategy.
    pub fn repository_url(&self, id: &CandidateId) -> String {
        format!("{}{}", self.repository_base_url, id)
    }
}

/// Read an env var; unset is `None`, non-UTF-8 is an error.
fn env_or(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(v) => Ok(Some(v)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key)?
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}

/// Compiled message patterns, derived once from the configuration.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// Release check command quoted in the vote announcement.
    pub command: Regex,
    /// Candidate staging repository URL.
    pub repository_url: Regex,
}

impl Patterns {
    pub fn from_config(config: &VoteCheckConfig) -> Result<Self, ConfigError> {
        let command = format!(
            r"{} (?P<id>\d+) {}",
            regex::escape(&config.script_name),
            regex::escape(&path_str(&config.staging_dir)),
        );
        let repository_url = format!(r"{}\d+", regex::escape(&config.repository_base_url));

        Ok(Self {
            command: Regex::new(&command).map_err(|source| ConfigError::Pattern {
                name: "command",
                source,
            })?,
            repository_url: Regex::new(&repository_url).map_err(|source| {
                ConfigError::Pattern {
                    name: "repository_url",
                    source,
                }
            })?,
        })
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().trim_end_matches('/').to_string()
}
