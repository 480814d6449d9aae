use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use wenseg::config::{IngestConfig, LexiconConfig};
use wenseg::corpus::load_corpus;
use wenseg::scorer::spaced_chars;
use wenseg::{CharNgramModel, DagSegmenter, HmmSegmenter, LexiconConstructor};

const DEFAULT_LEXICON_OUTPUT: &str = "lexicon.csv";
const DEFAULT_MODEL_OUTPUT: &str = "model.bin";

#[derive(Parser, Debug)]
#[command(author, version, about = "Classical Chinese word discovery and segmentation", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a PMI/entropy lexicon from raw text
    Lexicon(LexiconArgs),
    /// Segment text against a weighted dictionary
    Cut(CutArgs),
    /// Segment text with the position-state HMM
    HmmCut(HmmCutArgs),
    /// Train the character n-gram model used by hmm-cut
    TrainLm(TrainLmArgs),
    /// Write corpus runs as space-separated characters for external LM training
    LmText(LmTextArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Follow symbolic links while walking directories
    #[arg(long)]
    follow_symlinks: bool,
}

impl CorpusArgs {
    fn ingest_config(&self) -> IngestConfig {
        IngestConfig::builder()
            .recursive(!self.no_recursive)
            .follow_symlinks(self.follow_symlinks)
            .build()
    }

    fn load(&self) -> Result<Vec<String>> {
        let runs = load_corpus(&self.inputs, &self.ingest_config())
            .with_context(|| "failed to load corpus")?;
        let chars: usize = runs.iter().map(|run| run.chars().count()).sum();
        info!("loaded {} runs totalling {chars} characters", runs.len());
        Ok(runs)
    }
}

#[derive(Args, Debug)]
struct LexiconArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Output path for the lexicon CSV
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_LEXICON_OUTPUT)]
    output: PathBuf,

    /// Write construction metrics as JSON to this path
    #[arg(long, value_name = "PATH")]
    metrics: Option<PathBuf>,

    /// Longest word length considered
    #[arg(long, value_name = "CHARS")]
    max_word_len: Option<usize>,

    /// Minimum corpus frequency
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<u64>,

    /// Minimum PMI
    #[arg(long, value_name = "SCORE")]
    min_pmi: Option<f64>,

    /// Minimum left and right boundary entropy
    #[arg(long, value_name = "BITS")]
    min_entropy: Option<f64>,

    /// PMI assigned to single characters and upper bound for longer words
    #[arg(long, value_name = "SCORE")]
    pmi_ceiling: Option<f64>,

    /// Replace the stopchar set with the characters of this string
    #[arg(long, value_name = "CHARS")]
    stopchars: Option<String>,

    /// Number of shards for the parallel trie build
    #[arg(long, value_name = "COUNT")]
    shards: Option<usize>,

    /// Number of worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable the progress spinner and phase logging
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Input text file (defaults to stdin)
    #[arg(value_name = "PATH")]
    input: Option<PathBuf>,

    /// Emit one JSON array of tokens per line
    #[arg(long)]
    json: bool,

    /// Number of worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct CutArgs {
    /// Dictionary file with `word,weight` lines
    #[arg(short, long, value_name = "PATH")]
    dict: PathBuf,

    /// Binary cache for the parsed dictionary
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct HmmCutArgs {
    /// Character n-gram model written by train-lm
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct TrainLmArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Model order
    #[arg(long, default_value_t = 3)]
    order: usize,

    /// Output path for the model
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_MODEL_OUTPUT)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct LmTextArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Output path (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Lexicon(args) => run_lexicon(args),
        Commands::Cut(args) => run_cut(args),
        Commands::HmmCut(args) => run_hmm_cut(args),
        Commands::TrainLm(args) => run_train_lm(args),
        Commands::LmText(args) => run_lm_text(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }
    Ok(())
}

fn run_lexicon(args: LexiconArgs) -> Result<()> {
    configure_threads(args.threads)?;

    let mut cfg = LexiconConfig::builder();
    if let Some(max_word_len) = args.max_word_len {
        cfg = cfg.max_word_len(max_word_len);
    }
    if let Some(min_frequency) = args.min_frequency {
        cfg = cfg.min_frequency(min_frequency);
    }
    if let Some(min_pmi) = args.min_pmi {
        cfg = cfg.min_pmi(min_pmi);
    }
    if let Some(min_entropy) = args.min_entropy {
        cfg = cfg.min_entropy(min_entropy);
    }
    if let Some(pmi_ceiling) = args.pmi_ceiling {
        cfg = cfg.pmi_ceiling(pmi_ceiling);
    }
    if let Some(stopchars) = &args.stopchars {
        cfg = cfg.stopchars(stopchars.chars());
    }
    cfg = cfg.shards(args.shards);
    cfg = cfg.show_progress(!args.no_progress);
    let lexicon_cfg = cfg.build()?;

    let runs = args.corpus.load()?;

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} scoring candidates... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let constructor = LexiconConstructor::new(lexicon_cfg);
    let start = Instant::now();
    let artifacts = constructor.construct_lexicon(&runs)?;
    drop(runs);
    if let Some(pb) = spinner {
        pb.finish_with_message("lexicon complete");
    }
    let elapsed = start.elapsed();

    artifacts
        .lexicon
        .save_csv(&args.output)
        .with_context(|| format!("failed to write lexicon to {}", args.output.display()))?;
    if let Some(path) = &args.metrics {
        let json = serde_json::to_string_pretty(&artifacts.metrics)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    let metrics = &artifacts.metrics;
    info!(
        "lexicon complete: accepted={} scored={} nodes={} duration={elapsed:.2?}",
        metrics.accepted, metrics.candidates_scored, metrics.trie_nodes
    );
    println!(
        "wrote {} words to {} ({} candidates scored in {:.2?})",
        artifacts.lexicon.len(),
        args.output.display(),
        metrics.candidates_scored,
        elapsed
    );
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => {
            File::open(path)
                .and_then(|mut file| file.read_to_string(&mut text))
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
        }
    }
    Ok(text)
}

fn write_lines<F>(args: &OutputArgs, segment: F) -> Result<()>
where
    F: Fn(&str) -> Vec<String> + Sync,
{
    configure_threads(args.threads)?;
    let text = read_input(args.input.as_deref())?;
    let lines: Vec<&str> = text.lines().collect();
    let segmented: Vec<Vec<String>> = lines.par_iter().map(|&line| segment(line)).collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for tokens in &segmented {
        if args.json {
            serde_json::to_writer(&mut out, tokens)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", tokens.join(" "))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_cut(args: CutArgs) -> Result<()> {
    let segmenter = DagSegmenter::from_dict_file(&args.dict, args.cache.as_ref())
        .with_context(|| format!("failed to load dictionary {}", args.dict.display()))?;
    write_lines(&args.output, |line| {
        segmenter
            .tokenize(line)
            .filter(|token| !token.trim().is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn run_hmm_cut(args: HmmCutArgs) -> Result<()> {
    let model = CharNgramModel::load(&args.model)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;
    let segmenter = HmmSegmenter::new(model);
    write_lines(&args.output, |line| segmenter.cut(line))
}

fn run_train_lm(args: TrainLmArgs) -> Result<()> {
    let runs = args.corpus.load()?;
    let start = Instant::now();
    let model = CharNgramModel::train(&runs, args.order)?;
    model
        .save(&args.output)
        .with_context(|| format!("failed to save model to {}", args.output.display()))?;
    println!(
        "wrote {}-gram model ({} n-grams) to {} in {:.2?}",
        model.order(),
        model.ngram_count(),
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}

fn run_lm_text(args: LmTextArgs) -> Result<()> {
    let runs = args.corpus.load()?;
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);
    for run in &runs {
        writeln!(out, "{}", spaced_chars(run))?;
    }
    out.flush()?;
    Ok(())
}
