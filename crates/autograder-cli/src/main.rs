//! autograder CLI: grade a submission against an assignment file.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "autograder", version, about = "Grade programming assignment submissions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission
    Grade {
        /// Assignment file (.toml)
        #[arg(short, long)]
        assignment: PathBuf,

        /// Submission directory
        #[arg(short, long)]
        submission: PathBuf,

        /// Write the graded record as JSON
        #[arg(short, long)]
        outpath: Option<PathBuf>,

        /// Write an HTML transcript
        #[arg(long)]
        html: Option<PathBuf>,

        /// Prefix for each question line of the transcript
        #[arg(long)]
        prefix: Option<String>,

        /// Log full error chains from failing questions
        #[arg(long)]
        show_exceptions: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check an assignment file for errors and likely mistakes
    Validate {
        /// Assignment file (.toml)
        #[arg(short, long)]
        assignment: PathBuf,
    },

    /// Print the transcript of a saved JSON result
    Show {
        /// Graded record written by `grade --outpath`
        path: PathBuf,

        /// Prefix for each question line of the transcript
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autograder=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            assignment,
            submission,
            outpath,
            html,
            prefix,
            show_exceptions,
            config,
        } => {
            commands::grade::execute(commands::grade::GradeArgs {
                assignment,
                submission,
                outpath,
                html,
                prefix,
                show_exceptions,
                config,
            })
            .await
        }
        Commands::Validate { assignment } => commands::validate::execute(assignment),
        Commands::Show { path, prefix } => commands::show::execute(path, prefix),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
