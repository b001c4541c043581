use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use corpus_annotator::session::ConsolePrompter;
use corpus_annotator::{Progress, RawConfig, Session, SetupRequest, Workspace, logging, vote};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "corpus-annotator")]
#[command(
    about = "Collaborative annotation of small CSV corpora by several users sharing one machine",
    long_about = None
)]
struct Cli {
    /// Directory holding the annotated corpus and its private files.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// More diagnostics on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a corpus for annotation (run once).
    Setup {
        /// The unannotated corpus (.csv).
        #[arg(long)]
        source: PathBuf,

        /// Columns holding the texts to annotate, separated by '/'.
        #[arg(long)]
        target_columns: String,

        /// str, int, float, bool, or categories separated by '/' (e.g. pos/neg/neu).
        #[arg(long)]
        label_format: String,

        /// Independent annotations needed per text.
        #[arg(long)]
        annotations_per_text: usize,

        /// How complete annotations are reduced to one label.
        #[arg(long, default_value = "majority", value_parser = vote::POLICY_NAMES)]
        voting_policy: String,

        /// Text file shown to every user before each session.
        #[arg(long)]
        instructions: PathBuf,

        /// Erase an existing setup and all of its annotations.
        #[arg(long)]
        force: bool,
    },
    /// Label texts until you quit (empty entry) or nothing is left for you.
    Annotate {
        /// Who is annotating.
        #[arg(long)]
        user: Option<String>,

        /// Give up on a commit after waiting this long for other sessions.
        #[arg(long, default_value_t = 10_000)]
        lock_timeout_ms: u64,

        /// Seed row selection (reproducible sessions).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show how much of the corpus is annotated.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Reduce complete rows to one label with the configured voting policy.
    Consensus {
        #[arg(short = 'o', long)]
        out: PathBuf,
    },
    /// Check the corpus for damage left by competing sessions.
    Recover,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let workspace = Workspace::new(&cli.dir);

    match cli.cmd {
        Commands::Setup {
            source,
            target_columns,
            label_format,
            annotations_per_text,
            voting_policy,
            instructions,
            force,
        } => {
            let request = SetupRequest {
                source,
                config: RawConfig {
                    target_columns,
                    label_format,
                    annotations_per_text,
                    voting_policy,
                },
                instructions,
                force,
            };
            workspace.setup(&request).context("setup failed")?;
            println!("Setup completed successfully. You can start annotation sessions now :)");
        }
        Commands::Annotate {
            user,
            lock_timeout_ms,
            seed,
        } => {
            let config = workspace.load_config()?;
            let store = workspace
                .store(&config)
                .with_lock_timeout(Duration::from_millis(lock_timeout_ms));
            let instructions = workspace.instructions()?;
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let session = Session::new(
                user.as_deref().unwrap_or_default(),
                &config,
                &store,
                ConsolePrompter::stdio(),
                rng,
            )?
            .with_instructions(instructions);
            session.run().context("annotation session aborted")?;
        }
        Commands::Status { json } => {
            let config = workspace.load_config()?;
            let corpus = workspace.store(&config).snapshot()?;
            let progress = Progress::of(&corpus);
            if json {
                println!("{}", serde_json::to_string(&progress)?);
            } else {
                println!("{}", progress);
            }
        }
        Commands::Consensus { out } => {
            let config = workspace.load_config()?;
            let store = workspace.store(&config);
            let corpus = store.snapshot()?;
            let policy = config.policy();
            let results = vote::consensus(
                store.corpus_path(),
                &corpus,
                &config.label_format,
                policy.as_ref(),
            )?;

            let file = File::create(&out).with_context(|| format!("create {}", out.display()))?;
            vote::write_consensus(&corpus, &results, BufWriter::new(file))?;

            let agreed = results
                .iter()
                .filter(|c| matches!(c, vote::Consensus::Agreed(_)))
                .count();
            println!(
                "Wrote {} ({} of {} texts with a '{}' consensus)",
                out.display(),
                agreed,
                results.len(),
                policy.name()
            );
        }
        Commands::Recover => {
            let config = workspace.load_config()?;
            let corpus = workspace.store(&config).snapshot()?;
            let findings = corpus.audit();
            if findings.is_empty() {
                println!("No damage found in {}.", workspace.corpus_path().display());
            } else {
                for finding in &findings {
                    println!("{}", finding);
                }
                bail!(
                    "{} problem(s) found; automatic repair is not available, \
                     restore from {} or fix the rows by hand",
                    findings.len(),
                    workspace.backup_path().display()
                );
            }
        }
    }

    Ok(())
}
