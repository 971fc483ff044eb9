//! Command-line interface of the `newsagg` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use newsagg_client::config::CONFIG_ENV;
use newsagg_core::EntityId;

/// News aggregator client - read the feed, manage bookmarks and sources.
#[derive(Debug, Parser)]
#[command(name = "newsagg")]
#[command(version)]
pub struct Cli {
    /// TOML config file; built-in defaults apply when absent
    #[arg(long, global = true, env = CONFIG_ENV, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List articles
    Feed {
        #[arg(default_value_t = 0)]
        page: u32,
        category: Option<String>,
    },

    /// Show one article
    Article { id: EntityId },

    /// Log in and store the session
    Login { email: String, password: String },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    #[command(name = "whoami")]
    WhoAmI,

    /// List bookmarked articles
    Bookmarks,

    /// Bookmark an article
    Bookmark {
        #[arg(value_name = "ID")]
        article_id: EntityId,
    },

    /// Remove a bookmark
    Unbookmark {
        #[arg(value_name = "ID")]
        article_id: EntityId,
    },

    /// List RSS sources
    Sources,

    /// Crawl one source, or all of them
    Crawl {
        #[arg(value_name = "SOURCE_ID")]
        source_id: Option<EntityId>,
    },

    /// Crawler, cache and digest statistics
    Stats,

    /// Flush a server cache bucket
    Evict { bucket: String },

    /// Send digests to one user, or everyone
    Digest {
        #[arg(value_name = "USER_ID")]
        user_id: Option<EntityId>,
    },
}

impl Command {
    /// Commands that need a logged-in session.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Command::Bookmarks | Command::Bookmark { .. } | Command::Unbookmark { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("newsagg").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_feed_defaults() {
        assert_eq!(
            parse(&["feed"]).unwrap().command,
            Command::Feed {
                page: 0,
                category: None
            }
        );
        assert_eq!(
            parse(&["feed", "2", "olahraga"]).unwrap().command,
            Command::Feed {
                page: 2,
                category: Some("olahraga".to_string())
            }
        );
    }

    #[test]
    fn test_config_flag_in_any_position() {
        let cli = parse(&["--config", "newsagg.toml", "crawl", "3"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("newsagg.toml")));
        assert_eq!(cli.command, Command::Crawl { source_id: Some(3) });

        let cli = parse(&["--config=alt.toml", "feed"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));

        let cli = parse(&["digest", "--config", "late.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("late.toml")));
        assert_eq!(cli.command, Command::Digest { user_id: None });
    }

    #[test]
    fn test_whoami_name() {
        assert_eq!(parse(&["whoami"]).unwrap().command, Command::WhoAmI);
    }

    #[test]
    fn test_bad_number() {
        let err = parse(&["article", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_unknown_or_incomplete_command() {
        assert!(parse(&["frobnicate"]).is_err());
        assert_eq!(
            parse(&["login", "only-email"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_requires_session() {
        assert!(Command::Bookmarks.requires_session());
        assert!(!Command::Sources.requires_session());
    }
}
