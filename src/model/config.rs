use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};
use thiserror::Error;

use crate::model::plugin::PluginSpec;

pub const CONFIG_FILE: &str = "tester.toml";
pub const DEFAULT_TEMPLATE: &str = include_str!("../../config/default.toml");

const SEP_TOKEN: &str = "{sep}";
const HOME_TOKEN: &str = "{user.home}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not install default settings at {}: {source}", .path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{key}` uses {{user.home}} but the home directory cannot be determined")]
    MissingHome { key: String },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Result of looking for the settings file at startup.
#[derive(Debug)]
pub enum ConfigLoad {
    Loaded(TesterConfig),
    /// No settings existed; the default template was written here.
    Created(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    server_dir: String,
    server_jar: String,
    #[serde(default = "default_java")]
    java: String,
    #[serde(default)]
    plugins: Vec<RawPlugin>,
}

#[derive(Debug, Deserialize)]
struct RawPlugin {
    name: String,
    build_dir: String,
}

fn default_java() -> String {
    "java".to_string()
}

/// Settings with every placeholder resolved.
#[derive(Debug, Clone)]
pub struct TesterConfig {
    pub server_dir: PathBuf,
    pub server_jar: String,
    pub java: String,
    pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub name: String,
    pub build_dir: PathBuf,
}

impl TesterConfig {
    /// Load settings from `path`, installing the default template when the file is absent.
    pub fn load_or_init(path: &Path) -> Result<ConfigLoad, ConfigError> {
        if !path.exists() {
            install_default(path)?;
            return Ok(ConfigLoad::Created(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let home = dirs_home();
        Self::parse(&raw, path, home.as_deref()).map(ConfigLoad::Loaded)
    }

    /// Parse settings text. `origin` is only used for error messages.
    pub fn parse(raw: &str, origin: &Path, home: Option<&Path>) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        if raw.server_jar.trim().is_empty() {
            return Err(ConfigError::Invalid("`server_jar` must not be empty".into()));
        }
        if raw.java.trim().is_empty() {
            return Err(ConfigError::Invalid("`java` must not be empty".into()));
        }
        if raw.plugins.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[plugins]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut plugins = Vec::with_capacity(raw.plugins.len());
        for plugin in raw.plugins {
            let name = plugin.name.trim().to_string();
            if name.is_empty() {
                return Err(ConfigError::Invalid("plugin `name` must not be empty".into()));
            }
            if !seen.insert(name.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "plugin {name} is configured more than once"
                )));
            }
            if plugin.build_dir.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "plugin {name} has an empty `build_dir`"
                )));
            }

            let build_dir = expand_placeholders(&plugin.build_dir, home, &name)?;
            plugins.push(PluginConfig { name, build_dir });
        }

        let config = Self {
            server_dir: expand_placeholders(&raw.server_dir, home, "server_dir")?,
            server_jar: raw.server_jar,
            java: raw.java,
            plugins,
        };

        // A build inside the live directory would be removed as its own old artifact.
        let live_dir = config.plugins_dir();
        if let Some(plugin) = config
            .plugins
            .iter()
            .find(|plugin| plugin.build_dir.starts_with(&live_dir))
        {
            return Err(ConfigError::Invalid(format!(
                "plugin {} builds into the plugins directory {}",
                plugin.name,
                live_dir.display()
            )));
        }

        Ok(config)
    }

    /// The live directory the server loads plugins from.
    pub fn plugins_dir(&self) -> PathBuf {
        self.server_dir.join("plugins")
    }

    pub fn plugin_specs(&self) -> Vec<PluginSpec> {
        let live_dir = self.plugins_dir();
        self.plugins
            .iter()
            .map(|plugin| PluginSpec::new(&plugin.name, plugin.build_dir.clone(), live_dir.clone()))
            .collect()
    }
}

/// Replace `{sep}` with the platform separator, then `{user.home}` with `home`.
pub fn expand_placeholders(
    value: &str,
    home: Option<&Path>,
    key: &str,
) -> Result<PathBuf, ConfigError> {
    let value = value.replace(SEP_TOKEN, MAIN_SEPARATOR_STR);
    if !value.contains(HOME_TOKEN) {
        return Ok(PathBuf::from(value));
    }

    let home = home.ok_or_else(|| ConfigError::MissingHome {
        key: key.to_string(),
    })?;
    Ok(PathBuf::from(
        value.replace(HOME_TOKEN, &home.to_string_lossy()),
    ))
}

fn install_default(path: &Path) -> Result<(), ConfigError> {
    let install_err = |source| ConfigError::Install {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(install_err)?;
    }
    fs::write(path, DEFAULT_TEMPLATE).map_err(install_err)?;

    tracing::debug!("wrote default template to {}", path.display());
    Ok(())
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(body: &str) -> String {
        format!("server_dir = '/srv/test'\nserver_jar = 'paper.jar'\n{body}")
    }

    #[test]
    fn default_template_parses_with_home() {
        let home = Path::new("/home/dev");
        let config = TesterConfig::parse(DEFAULT_TEMPLATE, Path::new(CONFIG_FILE), Some(home))
            .unwrap();

        assert_eq!(config.server_jar, "paper.jar");
        assert_eq!(config.java, "java");
        assert_eq!(config.plugins.len(), 7);
        assert_eq!(config.plugins[0].name, "NexusCore");
        assert!(config.server_dir.starts_with(home));
        assert!(config.plugins[0].build_dir.ends_with(
            ["IdeaProjects", "NexusCore", "build", "libs"]
                .iter()
                .collect::<PathBuf>()
        ));
    }

    #[test]
    fn placeholders_expand_separator_and_home() {
        let path = expand_placeholders("{user.home}{sep}server", Some(Path::new("/home/dev")), "k")
            .unwrap();
        assert_eq!(path, Path::new("/home/dev").join("server"));
    }

    #[test]
    fn home_placeholder_without_home_is_an_error() {
        let err = expand_placeholders("{user.home}/server", None, "server_dir").unwrap_err();
        assert!(matches!(err, ConfigError::MissingHome { ref key } if key == "server_dir"));
    }

    #[test]
    fn plain_paths_need_no_home() {
        let path = expand_placeholders("/srv/test", None, "server_dir").unwrap();
        assert_eq!(path, PathBuf::from("/srv/test"));
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let raw = "server_dir = '/srv/test'\n[[plugins]]\nname = 'A'\nbuild_dir = '/b'\n";
        let err = TesterConfig::parse(raw, Path::new("t.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("t.toml"));
    }

    #[test]
    fn no_plugins_is_rejected() {
        let err = TesterConfig::parse(&settings(""), Path::new("t.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_plugin_names_are_rejected() {
        let raw = settings(
            "[[plugins]]\nname = 'StarChat'\nbuild_dir = '/a'\n\
             [[plugins]]\nname = 'StarChat'\nbuild_dir = '/b'\n",
        );
        let err = TesterConfig::parse(&raw, Path::new("t.toml"), None).unwrap_err();
        assert!(err.to_string().contains("StarChat"));
    }

    #[test]
    fn build_dir_inside_plugins_directory_is_rejected() {
        for build_dir in ["/srv/test/plugins", "/srv/test/plugins/StarChat"] {
            let raw = settings(&format!(
                "[[plugins]]\nname = 'StarChat'\nbuild_dir = '{build_dir}'\n"
            ));
            let err = TesterConfig::parse(&raw, Path::new("t.toml"), None).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
            assert!(err.to_string().contains("StarChat"));
        }
    }

    #[test]
    fn build_dir_beside_plugins_directory_is_accepted() {
        let raw = settings("[[plugins]]\nname = 'StarChat'\nbuild_dir = '/srv/test/plugins-build'\n");
        assert!(TesterConfig::parse(&raw, Path::new("t.toml"), None).is_ok());
    }

    #[test]
    fn plugin_specs_share_the_live_directory() {
        let raw = settings(
            "java = '/opt/jdk/bin/java'\n\
             [[plugins]]\nname = 'NexusCore'\nbuild_dir = '/build/core'\n\
             [[plugins]]\nname = 'StarChat'\nbuild_dir = '/build/chat'\n",
        );
        let config = TesterConfig::parse(&raw, Path::new("t.toml"), None).unwrap();
        let specs = config.plugin_specs();

        assert_eq!(config.java, "/opt/jdk/bin/java");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].name, "StarChat");
        assert_eq!(specs[1].build_dir, PathBuf::from("/build/chat"));
        assert!(specs.iter().all(|s| s.live_dir == Path::new("/srv/test").join("plugins")));
    }

    #[test]
    fn absent_settings_install_the_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let load = TesterConfig::load_or_init(&path).unwrap();
        assert!(matches!(load, ConfigLoad::Created(ref p) if p == &path));
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn existing_settings_are_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            settings("[[plugins]]\nname = 'StarCore'\nbuild_dir = '/build/core'\n"),
        )
        .unwrap();

        match TesterConfig::load_or_init(&path).unwrap() {
            ConfigLoad::Loaded(config) => assert_eq!(config.plugins[0].name, "StarCore"),
            ConfigLoad::Created(_) => panic!("settings should have been loaded"),
        }
    }
}
