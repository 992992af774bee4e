// src/config.rs
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_INDEX: &str = "index.html";
pub const DEFAULT_WATCH_EXTENSION: &str = "html";

/// Figment profile holding file and environment settings.
const PROFILE: &str = "livepoll";

/// Command-line arguments for the application.
#[derive(Parser, Debug, Deserialize, Default)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Host name or IP to listen on (e.g., "localhost")
    #[clap(long, value_parser, help = "Host name or IP to listen on (e.g., \"localhost\")")]
    pub host: Option<String>,

    /// Port to listen on
    #[clap(short, long, value_parser, help = "Port to listen on (default 8000)")]
    pub port: Option<u16>,

    /// Directory to serve and watch
    #[clap(short, long, value_parser, help = "Directory to serve and watch")]
    pub root: Option<PathBuf>,

    /// Document served for "/"
    #[clap(short, long, value_parser, help = "Document served for \"/\" (default index.html)")]
    pub index: Option<String>,

    /// Extension of the files whose changes trigger a reload
    #[clap(
        short,
        long = "watch-ext",
        value_parser,
        help = "Extension of the files whose changes trigger a reload (default html)"
    )]
    pub watch_ext: Option<String>,

    /// Do not open a browser window on startup
    #[clap(long, help = "Do not open a browser window on startup")]
    pub no_open: bool,

    /// Path to a configuration file (e.g., livepoll.toml)
    #[clap(
        short,
        long,
        value_parser,
        help = "Path to a configuration file (e.g., livepoll.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Log level (e.g., trace, debug, info, warn, error)
    #[clap(
        long,
        value_parser,
        help = "Log level (e.g., trace, debug, info, warn, error)"
    )]
    pub log_level: Option<String>,
}

/// Configuration loaded from file, environment, or defaults.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Directory to serve
    pub root: Option<PathBuf>,
    /// Default document
    pub index: Option<String>,
    pub watch_ext: Option<String>,
    /// Open the browser on startup
    pub open: Option<bool>,
    pub log_level: Option<String>,
}

/// Final application configuration after merging all sources.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    /// `0` asks the OS for an ephemeral port.
    pub port: u16,
    /// Serving root; also the directory scanned for the freshness marker.
    pub root: PathBuf,
    /// Document served for `/`.
    pub index: String,
    /// Extension (without the dot) of watched files.
    pub watch_extension: String,
    pub open_browser: bool,
    pub log_level: String,
}

impl AppConfig {
    /// Configuration for serving `root` on `host:port` with all other settings at their defaults.
    pub fn new(root: impl Into<PathBuf>, host: impl Into<String>, port: u16) -> Self {
        AppConfig {
            host: host.into(),
            port,
            root: root.into(),
            index: DEFAULT_INDEX.to_string(),
            watch_extension: DEFAULT_WATCH_EXTENSION.to_string(),
            open_browser: false,
            log_level: "info".to_string(),
        }
    }

    /// Loads the application configuration by merging CLI, file, environment, and defaults.
    pub fn load() -> Result<Self, figment::Error> {
        let cli_args = CliArgs::parse();

        let config_file_path = cli_args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("livepoll.toml"));

        Self::from_sources(cli_args, Self::figment(config_file_path))
    }

    /// Layers defaults, the TOML file, and `LIVEPOLL_*` variables, later sources winning.
    ///
    /// The file's `[livepoll]` table and the environment both land in the
    /// `livepoll` profile so that environment values override the file.
    pub fn figment(config_file_path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::defaults()))
            .merge(Toml::file(config_file_path.as_ref()).nested())
            .merge(
                Env::prefixed("LIVEPOLL_")
                    .map(|key| key.as_str().replace("__", ".").into())
                    .profile(PROFILE),
            )
    }

    /// Lowest-precedence values. Log level honours `LIVEPOLL_LOG_LEVEL` before falling back to "info".
    pub fn defaults() -> FileConfig {
        let default_log_level =
            std::env::var("LIVEPOLL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        FileConfig {
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            root: None,
            index: Some(DEFAULT_INDEX.to_string()),
            watch_ext: Some(DEFAULT_WATCH_EXTENSION.to_string()),
            open: Some(true),
            log_level: Some(default_log_level),
        }
    }

    /// Applies CLI overrides on top of an already-layered figment.
    ///
    /// CLI values always win when given; `--no-open` forces the browser off.
    pub fn from_sources(cli_args: CliArgs, fig: Figment) -> Result<Self, figment::Error> {
        let mut merged: FileConfig = fig.select(PROFILE).extract()?;

        if let Some(host) = cli_args.host {
            merged.host = Some(host);
        }
        if let Some(port) = cli_args.port {
            merged.port = Some(port);
        }
        if let Some(root) = cli_args.root {
            merged.root = Some(root);
        }
        if let Some(index) = cli_args.index {
            merged.index = Some(index);
        }
        if let Some(ext) = cli_args.watch_ext {
            merged.watch_ext = Some(ext);
        }
        if let Some(level) = cli_args.log_level {
            merged.log_level = Some(level);
        }
        let open_browser = !cli_args.no_open && merged.open.unwrap_or(true);

        let root = match merged.root {
            Some(root) => root,
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        Ok(AppConfig {
            host: merged.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: merged.port.unwrap_or(DEFAULT_PORT),
            root,
            index: merged.index.unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            watch_extension: merged
                .watch_ext
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or_else(|| DEFAULT_WATCH_EXTENSION.to_string()),
            open_browser,
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }

    /// `host:port` as handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL of the default document, opened in the browser on startup.
    pub fn index_url(&self) -> String {
        format!("http://{}:{}/{}", self.host, self.port, self.index)
    }
}
