//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lectern")]
#[command(about = "Citation-backed question answering over course materials", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        global = true,
        env = "LECTERN_CONFIG",
        default_value = "config/default.toml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest the corpus and (re)build the vector index
    Build {
        /// Corpus directory, overrides `corpus.dir`
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Index directory, overrides `index.path`
        #[arg(long)]
        index: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question, or every line of stdin when none is given
    Ask {
        /// Question text
        question: Option<String>,

        /// Number of passages to retrieve, overrides `retrieval.top_k`
        #[arg(short = 'k', long, value_parser = clap::value_parser!(i64).range(1..))]
        top_k: Option<i64>,

        /// Print answers as JSON, one object per line
        #[arg(long)]
        json: bool,
    },

    /// Generate a multiple-choice quiz on a topic
    Quiz {
        /// Quiz topic
        topic: String,

        /// Number of questions, 1 to 50
        #[arg(
            short = 'n',
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u8).range(1..=50)
        )]
        count: u8,

        /// Print the quiz as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("lectern").chain(args.iter().copied()))
    }

    #[test]
    fn build_with_overrides() {
        let cli = parse(&["build", "--corpus", "docs", "--index", "out/db"]).unwrap();
        let Commands::Build {
            corpus,
            index,
            json,
        } = cli.command
        else {
            panic!("expected build");
        };
        assert_eq!(corpus, Some(PathBuf::from("docs")));
        assert_eq!(index, Some(PathBuf::from("out/db")));
        assert!(!json);
    }

    #[test]
    fn ask_without_question_reads_stdin() {
        let cli = parse(&["ask", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask {
                question: None,
                top_k: None,
                json: true
            }
        ));
    }

    #[test]
    fn ask_with_top_k() {
        let cli = parse(&["ask", "What is dropout?", "-k", "6"]).unwrap();
        let Commands::Ask {
            question, top_k, ..
        } = cli.command
        else {
            panic!("expected ask");
        };
        assert_eq!(question.as_deref(), Some("What is dropout?"));
        assert_eq!(top_k, Some(6));
    }

    #[test]
    fn ask_rejects_zero_top_k() {
        assert!(parse(&["ask", "q", "--top-k", "0"]).is_err());
    }

    #[test]
    fn quiz_defaults_to_five_questions() {
        let cli = parse(&["quiz", "Backpropagation"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Quiz { ref topic, count: 5, json: false } if topic == "Backpropagation"
        ));
    }

    #[test]
    fn config_is_global() {
        let cli = parse(&["quiz", "CNNs", "--config", "custom.toml", "-n", "2"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Commands::Quiz { count: 2, .. }));
    }

    #[test]
    fn quiz_count_is_bounded() {
        assert!(parse(&["quiz", "CNNs", "-n", "0"]).is_err());
        assert!(parse(&["quiz", "CNNs", "--count", "51"]).is_err());
        assert!(parse(&["quiz", "CNNs", "--count", "18446744073709551615"]).is_err());
        let cli = parse(&["quiz", "CNNs", "--count", "50"]).unwrap();
        assert!(matches!(cli.command, Commands::Quiz { count: 50, .. }));
    }

    #[test]
    fn count_limit_matches_generator_limit() {
        assert_eq!(lectern_core::MAX_QUESTIONS, 50);
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(parse(&[]).is_err());
    }
}
