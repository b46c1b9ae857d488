use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensitive-document classifier driven by a lexicon and a language model
#[derive(Parser, Debug)]
#[command(
    name = "secdoc",
    about = "Classify documents as sensitive or non-sensitive",
    version,
    author,
    long_about = "secdoc screens a document against a keyword/phrase lexicon, asks a language \
                  model whether it is sensitive and whether it could be made public, and \
                  combines both answers into a final verdict. The model endpoint is configured \
                  through SECDOC_* environment variables."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose logging (debug level)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Classify a document and print the verdict",
        long_about = "Runs the full workflow (lexicon, forward and reverse analysis, decision) \
                      and prints the final verdict.\n\n\
                      Examples:\n  \
                      secdoc classify --file memo.txt\n  \
                      secdoc classify --title \"Q3 budget\" --content \"...\"\n  \
                      cat memo.txt | secdoc classify --format json"
    )]
    Classify(ClassifyArgs),

    #[command(
        about = "Classify a document and print Server-Sent-Events frames",
        long_about = "Runs the workflow in streaming mode and writes one `data: <json>` frame \
                      per event to stdout: `token` frames while the decision is produced, \
                      then exactly one `done` or `error` frame.\n\n\
                      Examples:\n  \
                      secdoc stream --file memo.txt"
    )]
    Stream(DocumentArgs),

    #[command(
        about = "Run only the keyword/phrase matcher",
        long_about = "Checks a document against the lexicon without calling a model. \
                      Only SECDOC_KEYWORDS_FILE and SECDOC_PHRASES_FILE are read.\n\n\
                      Examples:\n  \
                      secdoc scan --file memo.txt\n  \
                      secdoc scan --content \"本文件为内部参阅材料\""
    )]
    Scan(ScanArgs),

    #[command(
        about = "Show the effective configuration",
        long_about = "Loads the configuration from the environment, validates it and prints \
                      it with the API key redacted."
    )]
    Config(ConfigArgs),
}

/// Where the document comes from
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    #[arg(short = 't', long, value_name = "TITLE", default_value = "", help = "Document title")]
    pub title: String,

    #[arg(
        short = 'f',
        long,
        value_name = "FILE",
        conflicts_with = "content",
        help = "Read the document body from a file"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        value_name = "TEXT",
        help = "Document body (read from stdin when neither --file nor --content is given)"
    )]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
