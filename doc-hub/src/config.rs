use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Storage backend serving the document tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Filesystem tree with a git history.
    Git,
    /// Plain filesystem tree without history.
    Files,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "doc-hub")]
#[command(about = "Versioned hierarchical Markdown wiki")]
pub struct Config {
    /// Directory holding docs/, drafts/ and metadata.json
    #[arg(long, env = "DOC_HUB_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Listen address
    #[arg(long, env = "DOC_HUB_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Stemming languages, comma separated
    #[arg(
        long,
        env = "DOC_HUB_LANGUAGES",
        value_delimiter = ',',
        default_value = "english,russian"
    )]
    pub languages: Vec<String>,

    /// Seconds between metadata saves; 0 disables the background flusher
    #[arg(long, env = "DOC_HUB_METADATA_FLUSH_SECS", default_value_t = 60)]
    pub metadata_flush_secs: u64,

    #[arg(long, env = "DOC_HUB_BACKEND", value_enum, default_value = "git")]
    pub backend: Backend,

    /// Built frontend to serve for non-API paths, with index.html as fallback
    #[arg(long, env = "DOC_HUB_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn flush_period(&self) -> Option<Duration> {
        (self.metadata_flush_secs > 0).then(|| Duration::from_secs(self.metadata_flush_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["doc-hub"]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.languages, vec!["english", "russian"]);
        assert_eq!(config.backend, Backend::Git);
        assert_eq!(config.flush_period(), Some(Duration::from_secs(60)));
        assert_eq!(config.static_dir, None);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "doc-hub",
            "--languages",
            "english",
            "--metadata-flush-secs",
            "0",
            "--backend",
            "files",
            "--addr",
            "0.0.0.0:9000",
            "--static-dir",
            "web/dist",
        ])
        .unwrap();
        assert_eq!(config.languages, vec!["english"]);
        assert_eq!(config.flush_period(), None);
        assert_eq!(config.backend, Backend::Files);
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.static_dir, Some(PathBuf::from("web/dist")));
    }
}
