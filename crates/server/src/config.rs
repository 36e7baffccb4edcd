//! Configuration for the test server
//!
//! Defaults match what test suites expect (port 8000 on loopback); a
//! simple `key = value` config file can override them, and CLI flags win
//! over both.

use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            static_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Load from the default path, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from_path(Path::new("pagetest-server.toml")).unwrap_or_default()
    }

    /// Load from a specific path (simple key=value parsing).
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;

        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "port" => {
                        if let Ok(port) = value.parse() {
                            config.port = port;
                        }
                    }
                    "bind" => {
                        config.bind = value.to_string();
                    }
                    "static_dir" => {
                        config.static_dir = PathBuf::from(value);
                    }
                    _ => {}
                }
            }
        }

        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.static_dir, PathBuf::from("."));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\n[server]\nport = 9123\nbind = \"0.0.0.0\"").unwrap();
        let config = ServerConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.port, 9123);
        assert_eq!(config.bind, "0.0.0.0");
        // Untouched keys keep their defaults
        assert_eq!(config.static_dir, PathBuf::from("."));
    }
}
