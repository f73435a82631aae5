use crate::config::Config;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: Config,
    pub session_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(session_file: PathBuf) -> Self {
        Self {
            config: Config::default(),
            session_file,
        }
    }

    /// Remote commands need an API base URL; local session commands do not.
    #[must_use]
    pub fn has_api_url(&self) -> bool {
        !self.config.api_base_url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(PathBuf::from("/tmp/session.json"));
        assert_eq!(args.session_file, PathBuf::from("/tmp/session.json"));
        assert_eq!(args.config.anonymous_route, "/");
        assert!(!args.has_api_url());
    }
}
