//! Clap argument types, validation, and config overrides.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use prscribe::config::{ChunkConfigError, Config};
use prscribe::models::{PromptData, ProviderName};
use prscribe::orchestrator::DraftReport;
use prscribe::output::OutputRenderer;

/// Draft pull request descriptions from a diff with an LLM.
#[derive(Parser, Debug)]
#[command(name = "prscribe", version = prscribe::constants::VERSION)]
pub struct Cli {
    /// Log debug output to stderr (overridden by PRSCRIBE_LOG / RUST_LOG).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Draft a description for a pull request.
    Draft(Box<DraftArgs>),

    /// Show how a diff would be filtered and chunked, without calling an LLM.
    Plan(PlanArgs),

    /// Print version information.
    Version,
}

/// Where the diff comes from.
#[derive(clap::Args, Debug, Default)]
pub struct InputArgs {
    /// Working directory used to find `.prscribe.toml` (default: current directory).
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Pre-computed unified diff file.
    #[arg(long)]
    pub diff_file: Option<PathBuf>,

    /// Read unified diff from stdin.
    #[arg(long, default_value_t = false)]
    pub diff_stdin: bool,

    /// Bitbucket Cloud pull request: WORKSPACE/REPO#ID or a pull request URL.
    #[arg(long, value_name = "PR")]
    pub bitbucket: Option<String>,
}

/// Selected input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    DiffFile(PathBuf),
    Stdin,
    Bitbucket(String),
}

impl InputArgs {
    /// Validate that exactly one input source is provided.
    pub fn validate_input(&self) -> Result<InputMode, String> {
        let sources = [
            self.diff_file.is_some(),
            self.diff_stdin,
            self.bitbucket.is_some(),
        ];
        let count = sources.iter().filter(|&&x| x).count();

        if count == 0 {
            return Err(
                "one input source is required: --diff-file, --diff-stdin, or --bitbucket"
                    .to_string(),
            );
        }
        if count > 1 {
            return Err(
                "only one input source allowed: --diff-file, --diff-stdin, or --bitbucket"
                    .to_string(),
            );
        }

        if let Some(ref path) = self.diff_file {
            Ok(InputMode::DiffFile(path.clone()))
        } else if self.diff_stdin {
            Ok(InputMode::Stdin)
        } else if let Some(ref pr) = self.bitbucket {
            Ok(InputMode::Bitbucket(pr.clone()))
        } else {
            unreachable!()
        }
    }
}

/// Pull request metadata. Flags override values fetched from Bitbucket.
#[derive(clap::Args, Debug, Default)]
pub struct MetadataArgs {
    #[arg(long)]
    pub title: Option<String>,

    /// Existing PR description to build on.
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub source_branch: Option<String>,

    #[arg(long)]
    pub target_branch: Option<String>,

    #[arg(long)]
    pub repository: Option<String>,

    /// Extra instructions or background for the model.
    #[arg(long)]
    pub context: Option<String>,
}

impl MetadataArgs {
    /// Overlay the given flags onto `data`.
    pub fn apply(&self, data: &mut PromptData) {
        let fields = [
            (&self.title, &mut data.title),
            (&self.description, &mut data.description),
            (&self.author, &mut data.author),
            (&self.source_branch, &mut data.source_branch),
            (&self.target_branch, &mut data.target_branch),
            (&self.repository, &mut data.repository),
        ];
        for (flag, field) in fields {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
        if let Some(ref context) = self.context {
            data.additional_context = Some(context.clone());
        }
    }
}

/// Filtering and chunking overrides.
#[derive(clap::Args, Debug, Default)]
pub struct PipelineArgs {
    /// Keep every file, ignoring configured ignore patterns.
    #[arg(long, default_value_t = false)]
    pub no_filter: bool,

    /// Never split the diff; truncate it instead.
    #[arg(long, default_value_t = false)]
    pub no_chunking: bool,

    /// Character budget per chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters repeated between size-based chunks.
    #[arg(long)]
    pub overlap_size: Option<usize>,

    /// Maximum number of chunks per pull request.
    #[arg(long)]
    pub max_chunks: Option<usize>,
}

impl PipelineArgs {
    /// Apply flag overrides to `config` and revalidate chunking.
    pub fn apply(&self, config: &mut Config) -> Result<(), ChunkConfigError> {
        if self.no_filter {
            config.filter.enabled = false;
        }
        if self.no_chunking {
            config.chunking.enabled = false;
        }
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.overlap_size {
            config.chunking.overlap_size = overlap;
        }
        if let Some(max) = self.max_chunks {
            config.chunking.max_chunks = max;
        }
        config.chunking.validate()
    }
}

/// Arguments for the `draft` subcommand.
#[derive(Parser, Debug)]
pub struct DraftArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub metadata: MetadataArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    // --- Provider ---
    /// LLM provider (overrides config).
    #[arg(long)]
    pub provider: Option<ProviderName>,

    /// Model name (overrides config).
    #[arg(long)]
    pub model: Option<String>,

    // --- Output ---
    /// Output format.
    #[arg(long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Abort if drafting takes longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Disable the live progress display.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Suppress all non-essential output. Only the description and errors are shown.
    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,
}

impl DraftArgs {
    /// Apply provider flags to `config`.
    pub fn apply_provider(&self, config: &mut Config) {
        if let Some(name) = self.provider {
            config.provider.name = name;
        }
        if let Some(ref model) = self.model {
            config.provider.model = model.clone();
        }
    }
}

/// Arguments for the `plan` subcommand.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
    Markdown,
}

impl OutputFormat {
    /// Render the report using the renderer for this format.
    pub fn render(&self, report: &DraftReport) -> String {
        match self {
            OutputFormat::Terminal => prscribe::output::terminal::TerminalRenderer.render(report),
            OutputFormat::Json => prscribe::output::json::JsonRenderer.render(report),
            OutputFormat::Markdown => prscribe::output::markdown::MarkdownRenderer.render(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prscribe::models::{AggregatedResult, ProcessingStats};

    fn input(diff_file: Option<&str>, diff_stdin: bool, bitbucket: Option<&str>) -> InputArgs {
        InputArgs {
            path: PathBuf::from("."),
            diff_file: diff_file.map(PathBuf::from),
            diff_stdin,
            bitbucket: bitbucket.map(String::from),
        }
    }

    #[test]
    fn validate_no_input() {
        let result = input(None, false, None).validate_input();
        assert!(result.unwrap_err().contains("one input source is required"));
    }

    #[test]
    fn validate_multiple_inputs() {
        let result = input(Some("pr.diff"), true, None).validate_input();
        assert!(result.unwrap_err().contains("only one input source allowed"));
        let result = input(None, true, Some("acme/web#1")).validate_input();
        assert!(result.is_err());
    }

    #[test]
    fn validate_each_input() {
        assert!(matches!(
            input(Some("pr.diff"), false, None).validate_input(),
            Ok(InputMode::DiffFile(_))
        ));
        assert_eq!(input(None, true, None).validate_input(), Ok(InputMode::Stdin));
        assert_eq!(
            input(None, false, Some("acme/web#1")).validate_input(),
            Ok(InputMode::Bitbucket("acme/web#1".into()))
        );
    }

    #[test]
    fn metadata_flags_override_fetched_values() {
        let mut data = PromptData {
            title: "Fetched".into(),
            author: "sam".into(),
            ..PromptData::default()
        };
        let args = MetadataArgs {
            title: Some("Override".into()),
            context: Some("Focus on auth".into()),
            ..MetadataArgs::default()
        };
        args.apply(&mut data);
        assert_eq!(data.title, "Override");
        assert_eq!(data.author, "sam");
        assert_eq!(data.additional_context.as_deref(), Some("Focus on auth"));
    }

    #[test]
    fn pipeline_flags_override_config() {
        let mut config = Config::default();
        let args = PipelineArgs {
            no_filter: true,
            chunk_size: Some(500),
            overlap_size: Some(50),
            max_chunks: Some(3),
            ..PipelineArgs::default()
        };
        args.apply(&mut config).unwrap();
        assert!(!config.filter.enabled);
        assert!(config.chunking.enabled);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap_size, 50);
        assert_eq!(config.chunking.max_chunks, 3);
    }

    #[test]
    fn pipeline_flags_are_validated() {
        let mut config = Config::default();
        let args = PipelineArgs {
            chunk_size: Some(100),
            ..PipelineArgs::default()
        };
        // Default overlap (200) is not below 100.
        let err = args.apply(&mut config).unwrap_err();
        assert!(matches!(err, ChunkConfigError::OverlapTooLarge { .. }));
        assert!(err.to_string().contains("--overlap-size"));
    }

    #[test]
    fn pipeline_flags_correct_invalid_file_config() {
        let mut config = Config::default();
        config.chunking.chunk_size = 100;
        config.chunking.overlap_size = 500;
        let args = PipelineArgs {
            overlap_size: Some(20),
            ..PipelineArgs::default()
        };
        args.apply(&mut config).unwrap();
        assert_eq!(config.chunking.overlap_size, 20);
    }

    #[test]
    fn draft_parses_flags() {
        let cli = Cli::try_parse_from([
            "prscribe",
            "draft",
            "--diff-file",
            "pr.diff",
            "--title",
            "Login",
            "--format",
            "json",
            "--max-chunks",
            "4",
            "--timeout",
            "30",
            "--provider",
            "ollama",
            "-q",
        ])
        .unwrap();
        match cli.command {
            Command::Draft(args) => {
                assert_eq!(args.input.diff_file, Some(PathBuf::from("pr.diff")));
                assert_eq!(args.metadata.title.as_deref(), Some("Login"));
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.pipeline.max_chunks, Some(4));
                assert_eq!(args.timeout, Some(30));
                assert_eq!(args.provider, Some(ProviderName::Ollama));
                assert!(args.quiet);
            }
            _ => panic!("expected Draft command"),
        }
    }

    #[test]
    fn plan_parses_flags() {
        let cli =
            Cli::try_parse_from(["prscribe", "--verbose", "plan", "--diff-stdin", "--json"])
                .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Plan(args) => {
                assert!(args.input.diff_stdin);
                assert!(args.json);
            }
            _ => panic!("expected Plan command"),
        }
    }

    #[test]
    fn output_format_render_all() {
        let report = DraftReport {
            result: AggregatedResult {
                success: true,
                description: "Adds login.".into(),
                chunks_processed: 1,
                failed_chunks: 0,
                error: None,
            },
            stats: ProcessingStats::default(),
        };
        assert!(OutputFormat::Terminal.render(&report).contains("Adds login."));
        let parsed: serde_json::Value =
            serde_json::from_str(&OutputFormat::Json.render(&report)).unwrap();
        assert_eq!(parsed["result"]["description"], "Adds login.");
        assert_eq!(OutputFormat::Markdown.render(&report), "Adds login.\n");
    }
}
