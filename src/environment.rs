use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment seen by the session: variables for `$` completion and the
/// directory relative paths are listed from.
pub trait EnvironmentSource {
    /// All variables as `(name, value)` pairs, in enumeration order.
    fn vars(&self) -> Vec<(String, String)>;
    fn var(&self, name: &str) -> Option<String>;
    fn set_var(&mut self, name: &str, value: &str);
    fn current_dir(&self) -> PathBuf;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(name, value)| {
                match (name.into_string(), value.into_string()) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    (name, _) => {
                        log::warn!("Skipping non-UTF-8 environment entry {:?}", name);
                        None
                    }
                }
            })
            .collect();
        vars.sort();
        vars
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_var(&mut self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }

    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// An isolated environment, for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
}

impl MapEnvironment {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            cwd: cwd.into(),
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_current_dir(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }
}

impl EnvironmentSource for MapEnvironment {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    fn current_dir(&self) -> PathBuf {
        self.cwd.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_map_environment() {
        let mut env = MapEnvironment::new("/tmp").with_var("HOME", "/home/me");
        env.set_var("COLUMNS", "80");
        assert_eq!(env.var("HOME").as_deref(), Some("/home/me"));
        assert_eq!(
            env.vars(),
            vec![
                ("COLUMNS".to_string(), "80".to_string()),
                ("HOME".to_string(), "/home/me".to_string())
            ]
        );
        assert_eq!(env.current_dir(), PathBuf::from("/tmp"));
    }

    #[test]
    #[serial]
    fn test_process_environment_round_trip() {
        let mut env = ProcessEnvironment;
        env.set_var("TERMLINE_TEST_VAR", "42");
        assert_eq!(env.var("TERMLINE_TEST_VAR").as_deref(), Some("42"));
        assert!(env
            .vars()
            .iter()
            .any(|(name, value)| name == "TERMLINE_TEST_VAR" && value == "42"));
        std::env::remove_var("TERMLINE_TEST_VAR");
    }
}
