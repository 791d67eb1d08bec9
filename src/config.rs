use std::ffi::OsString;
use std::path::PathBuf;

use clap::{value_parser, Arg, Command};

pub const DEFAULT_VERTEX_PATH: &str = "shaders/core.vs";
pub const DEFAULT_FRAGMENT_PATH: &str = "shaders/core.frag";
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_TITLE: &str = "Shaders Tutorial";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub vertex_path: PathBuf,
    pub fragment_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// `tracing` filter directive. Falls back to `RUST_LOG`, then `info`.
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vertex_path: PathBuf::from(DEFAULT_VERTEX_PATH),
            fragment_path: PathBuf::from(DEFAULT_FRAGMENT_PATH),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: DEFAULT_TITLE.to_string(),
            log_filter: None,
        }
    }
}

fn command() -> Command {
    Command::new("hello_triangle")
        .about("Draws a vertex-colored triangle with a shader program built from two files")
        .arg(
            Arg::new("vertex")
                .long("vertex")
                .value_name("PATH")
                .help("Vertex shader source")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_VERTEX_PATH),
        )
        .arg(
            Arg::new("fragment")
                .long("fragment")
                .value_name("PATH")
                .help("Fragment shader source")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_FRAGMENT_PATH),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PX")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("800"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_name("PX")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("600"),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .value_name("TEXT")
                .default_value(DEFAULT_TITLE),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Log filter, e.g. `debug` or `hello_triangle=trace`"),
        )
}

impl AppConfig {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let defaults = Self::default();

        Self {
            vertex_path: matches
                .get_one::<PathBuf>("vertex")
                .cloned()
                .unwrap_or(defaults.vertex_path),
            fragment_path: matches
                .get_one::<PathBuf>("fragment")
                .cloned()
                .unwrap_or(defaults.fragment_path),
            width: matches.get_one::<u32>("width").copied().unwrap_or(defaults.width),
            height: matches
                .get_one::<u32>("height")
                .copied()
                .unwrap_or(defaults.height),
            title: matches
                .get_one::<String>("title")
                .cloned()
                .unwrap_or(defaults.title),
            log_filter: matches.get_one::<String>("log-level").cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_tutorial() {
        let config = AppConfig::try_parse_from(["hello_triangle"]).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::try_parse_from([
            "hello_triangle",
            "--vertex",
            "a.vs",
            "--fragment",
            "b.frag",
            "--width",
            "1024",
            "--height",
            "768",
            "--title",
            "Triangle",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.vertex_path, PathBuf::from("a.vs"));
        assert_eq!(config.fragment_path, PathBuf::from("b.frag"));
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.title, "Triangle");
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(AppConfig::try_parse_from(["hello_triangle", "--width", "0"]).is_err());
        assert!(AppConfig::try_parse_from(["hello_triangle", "--height", "tall"]).is_err());
    }
}
