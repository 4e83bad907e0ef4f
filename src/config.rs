use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "LUCID_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LucidConfig {
    /// Query used when none is given on the command line.
    #[serde(alias = "default_query")]
    pub query: Option<String>,
    #[serde(alias = "timeout", alias = "timeout_secs")]
    pub fetch_timeout_secs: u64,
    pub backends: Vec<BackendKind>,
    pub docker: DockerSettings,
    pub podman: PodmanSettings,
    #[serde(alias = "oc")]
    pub openshift: OpenShiftSettings,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DockerSettings {
    pub containers: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PodmanSettings {
    #[serde(alias = "cmd")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenShiftSettings {
    #[serde(alias = "cmd")]
    pub command: Vec<String>,
    #[serde(alias = "all-namespaces")]
    pub all_namespaces: bool,
}

impl Default for LucidConfig {
    fn default() -> Self {
        Self {
            query: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            backends: BackendKind::ALL.to_vec(),
            docker: DockerSettings::default(),
            podman: PodmanSettings::default(),
            openshift: OpenShiftSettings::default(),
            source: None,
        }
    }
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self { containers: true }
    }
}

impl Default for PodmanSettings {
    fn default() -> Self {
        Self {
            command: vec!["podman".to_string()],
        }
    }
}

impl Default for OpenShiftSettings {
    fn default() -> Self {
        Self {
            command: vec!["oc".to_string()],
            all_namespaces: true,
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl LucidConfig {
    /// Loads `explicit` when given, otherwise the first discovered config
    /// file, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_path(),
        };
        match path {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

pub fn discover_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok().map(PathBuf::from);
    discover_config_path_in(
        std::env::var(CONFIG_ENV).ok(),
        Path::new("."),
        home.as_deref(),
    )
}

fn discover_config_path_in(
    explicit: Option<String>,
    cwd: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        cwd.join("lucid.yaml"),
        cwd.join("lucid.yml"),
        cwd.join(".lucid.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Some(home) = home {
        let user_candidates = [
            home.join(".config/lucid/config.yaml"),
            home.join(".config/lucid/config.yml"),
            home.join(".lucid.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{LucidConfig, discover_config_path_in};
    use crate::backend::BackendKind;
    use crate::error::ConfigError;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn defaults_enable_every_backend() {
        let config = LucidConfig::default();
        assert_eq!(config.backends, BackendKind::ALL.to_vec());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.podman.command, vec!["podman"]);
        assert_eq!(config.openshift.command, vec!["oc"]);
        assert!(config.openshift.all_namespaces);
        assert!(config.docker.containers);
        assert!(config.query.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lucid.yaml");
        fs::write(
            &path,
            "query: backend=podman resource=image\n\
             backends: [podman, oc]\n\
             podman:\n  command: [sudo, podman]\n\
             timeout: 3\n",
        )
        .unwrap();

        let config = LucidConfig::from_path(&path).unwrap();
        assert_eq!(config.query.as_deref(), Some("backend=podman resource=image"));
        assert_eq!(config.backends, vec![BackendKind::Podman, BackendKind::OpenShift]);
        assert_eq!(config.podman.command, vec!["sudo", "podman"]);
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.openshift.command, vec!["oc"]);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn empty_file_is_the_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lucid.yaml");
        fs::write(&path, "\n").unwrap();

        let config = LucidConfig::from_path(&path).unwrap();
        assert_eq!(config.backends, BackendKind::ALL.to_vec());
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lucid.yaml");
        fs::write(&path, "backends: [docker, lxc]\n").unwrap();

        let error = LucidConfig::from_path(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = LucidConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn discovery_prefers_env_then_cwd_then_home() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();

        assert_eq!(
            discover_config_path_in(None, cwd.path(), Some(home.path())),
            None
        );

        let user = home.path().join(".config/lucid/config.yaml");
        fs::create_dir_all(user.parent().unwrap()).unwrap();
        fs::write(&user, "backends: [docker]\n").unwrap();
        assert_eq!(
            discover_config_path_in(None, cwd.path(), Some(home.path())),
            Some(user.clone())
        );

        let local = cwd.path().join(".lucid.yaml");
        fs::write(&local, "backends: [podman]\n").unwrap();
        assert_eq!(
            discover_config_path_in(Some("  ".to_string()), cwd.path(), Some(home.path())),
            Some(local)
        );

        assert_eq!(
            discover_config_path_in(
                Some("/etc/lucid.yaml".to_string()),
                cwd.path(),
                Some(home.path())
            ),
            Some("/etc/lucid.yaml".into())
        );
    }
}
