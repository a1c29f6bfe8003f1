//! CLI argument definitions for the Sage application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sage: answers learner questions from the platform knowledge base.
#[derive(Parser, Debug)]
#[command(name = "sage", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the knowledge-base database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Insert the starter documents and FAQs that are missing.
    Seed,

    /// Add a document to the knowledge base.
    AddDocument {
        title: String,
        content: String,
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Add an FAQ to the knowledge base.
    AddFaq {
        question: String,
        answer: String,
        #[arg(long, default_value = "")]
        category: String,
    },

    /// List every document and FAQ.
    List,

    /// Answer a single question.
    Ask {
        query: String,
        /// Number of knowledge entries to retrieve.
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive conversation; history is kept for the session.
    Chat {
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Show the entries retrieved for a query, with scores.
    Search {
        query: String,
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SAGE_CONFIG env var > ~/.sage/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SAGE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > SAGE_DATA_DIR env var > config file value.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> String {
        if let Some(ref p) = self.data_dir {
            return p.to_string_lossy().to_string();
        }
        if let Ok(p) = std::env::var("SAGE_DATA_DIR") {
            if !p.trim().is_empty() {
                return p;
            }
        }
        config_data_dir.to_string()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_log_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_log_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".sage").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sage").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let args =
            CliArgs::try_parse_from(["sage", "ask", "How do I enroll?", "-k", "5", "--json"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Ask {
                query: "How do I enroll?".to_string(),
                top_k: Some(5),
                json: true,
            }
        );
    }

    #[test]
    fn test_parse_add_faq_with_category() {
        let args = CliArgs::try_parse_from([
            "sage",
            "add-faq",
            "Can I get a refund?",
            "Yes, within 7 days.",
            "--category",
            "Payments",
        ])
        .unwrap();
        match args.command {
            Command::AddFaq { category, .. } => assert_eq!(category, "Payments"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from(["sage", "list", "--log-level", "debug", "-c", "x.toml"])
            .unwrap();
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert_eq!(args.resolve_config_path(), PathBuf::from("x.toml"));
    }

    #[test]
    fn test_data_dir_flag_wins() {
        let args = CliArgs::try_parse_from(["sage", "seed", "--data-dir", "/tmp/sage"]).unwrap();
        assert_eq!(args.resolve_data_dir("~/.sage/data"), "/tmp/sage");
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::try_parse_from(["sage", "seed"]).unwrap();
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["sage"]).is_err());
    }
}
