use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use posterkit::platform::SystemPrintHost;
use posterkit::session::SessionSnapshot;
use posterkit::styles::StyleOption;
use posterkit::{EditingSession, Exporter, ImageGateway, PosterPatch, PosterRecord, SettleResult, StudioConfig};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "posterkit", version)]
#[command(about = "Edit a promotional poster, generate its background and export it")]
struct Cli {
    /// Poster headline
    #[arg(long, global = true)]
    title: Option<String>,

    #[arg(long, global = true)]
    subtitle: Option<String>,

    /// Call-to-action text
    #[arg(long, global = true)]
    cta: Option<String>,

    /// Logo image reference (URL or data URL)
    #[arg(long, global = true)]
    logo: Option<String>,

    /// Featured image reference (URL or data URL)
    #[arg(long, global = true)]
    image: Option<String>,

    /// Secondary image reference (URL or data URL)
    #[arg(long, global = true)]
    secondary: Option<String>,

    /// Directory exported posters are written to
    #[arg(long, global = true, default_value = ".", env = "POSTERKIT_OUT_DIR")]
    out: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the background style presets
    Styles,
    /// Print the poster record as JSON
    Show,
    /// Generate a new background from the title and subtitle
    Generate {
        /// Preset id or a free-form style description
        #[arg(long, default_value = "modern")]
        style: String,
    },
    /// Apply a natural-language edit to the featured image
    Edit { instruction: String },
    /// Use a local image file as the featured image
    Import { path: PathBuf },
    /// Write the poster as a JPEG into the output directory
    Export,
    /// Send the poster to the system print queue
    Print,
    /// Read JSON commands from stdin, one per line, and answer on stdout
    Session,
}

impl Cli {
    fn overrides(&self) -> PosterPatch {
        PosterPatch {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            cta_text: self.cta.clone(),
            logo_url: self.logo.clone(),
            featured_image_url: self.image.clone(),
            secondary_image_url: self.secondary.clone(),
        }
    }
}

fn print_record(record: &PosterRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Turn a session error left behind by an operation into a process error
fn check<G>(session: &EditingSession<G>) -> anyhow::Result<()> {
    match session.last_error() {
        Some(err) => Err(anyhow!("{}", err)),
        None => Ok(()),
    }
}

#[derive(Deserialize, Debug)]
struct Job {
    #[serde(default)]
    id: u64,
    cmd: String,
    #[serde(default)]
    patch: PosterPatch,
    style: Option<String>,
    instruction: Option<String>,
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
}

#[derive(Serialize, Debug)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<SettleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    session: SessionSnapshot,
}

fn run_job<G: ImageGateway>(
    session: &mut EditingSession<G>,
    exporter: &Exporter,
    printer: &SystemPrintHost,
    default_dir: &Path,
    job: Job,
) -> Reply {
    let mut result = None;
    let mut exported = None;
    let mut error = None;

    match job.cmd.as_str() {
        "update" => session.update_fields(&job.patch),
        "generate" => {
            result = Some(session.request_background_generation(job.style.as_deref().unwrap_or_default()));
        }
        "edit" => match job.instruction.as_deref() {
            Some(instruction) => result = session.request_image_edit(instruction),
            None => error = Some("edit needs an instruction".to_string()),
        },
        "import" => match job.path.as_deref() {
            Some(path) => {
                if let Err(e) = session.import_local_file(path) {
                    error = Some(e.to_string());
                }
            }
            None => error = Some("import needs a path".to_string()),
        },
        "export" => {
            let dir = job.dir.as_deref().unwrap_or(default_dir);
            exported = session.export_as_image(exporter, dir);
        }
        "print" => session.export_as_print(exporter, printer),
        "show" => {}
        other => error = Some(format!("unknown command: {}", other)),
    }

    if error.is_none() {
        if let Some(SettleResult::Failed(msg)) = &result {
            error = Some(msg.clone());
        } else if job.cmd == "export" && exported.is_none() {
            error = session.last_error().map(str::to_string);
        }
    }

    Reply {
        id: job.id,
        ok: error.is_none(),
        result,
        exported,
        error,
        session: session.snapshot(),
    }
}

fn session_main<G: ImageGateway>(
    mut session: EditingSession<G>,
    exporter: &Exporter,
    out_dir: &Path,
) -> io::Result<()> {
    let printer = SystemPrintHost::default();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Job>(&line) {
            Ok(job) => run_job(&mut session, exporter, &printer, out_dir, job),
            Err(e) => Reply {
                id: 0,
                ok: false,
                result: None,
                exported: None,
                error: Some(format!("invalid request: {}", e)),
                session: session.snapshot(),
            },
        };
        let js = serde_json::to_string(&reply)
            .unwrap_or_else(|_| format!("{{\"id\":{},\"ok\":false,\"error\":\"serialization failed\"}}", reply.id));
        writeln!(out, "{}", js)?;
        out.flush()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("posterkit=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::from_env();
    let gateway = posterkit::new_gateway(&config).context("could not set up the image service client")?;
    let exporter = Exporter::new(&config).context("could not set up the exporter")?;

    let mut session = EditingSession::new(gateway);
    session.update_fields(&cli.overrides());

    match cli.command {
        Command::Styles => {
            for style in StyleOption::all() {
                println!("{}\t{}\t{}", style.id, style.label, style.prompt_fragment);
            }
        }
        Command::Show => print_record(session.record())?,
        Command::Generate { style } => {
            session.request_background_generation(&style);
            check(&session)?;
            print_record(session.record())?;
        }
        Command::Edit { instruction } => {
            if session.request_image_edit(&instruction).is_none() {
                bail!("the edit instruction is empty");
            }
            check(&session)?;
            print_record(session.record())?;
        }
        Command::Import { path } => {
            session
                .import_local_file(&path)
                .with_context(|| format!("could not import {}", path.display()))?;
            print_record(session.record())?;
        }
        Command::Export => {
            std::fs::create_dir_all(&cli.out)
                .with_context(|| format!("could not create {}", cli.out.display()))?;
            match session.export_as_image(&exporter, &cli.out) {
                Some(path) => println!("{}", path.display()),
                None => check(&session)?,
            }
        }
        Command::Print => session.export_as_print(&exporter, &SystemPrintHost::default()),
        Command::Session => session_main(session, &exporter, &cli.out)?,
    }
    Ok(())
}
