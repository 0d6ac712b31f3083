use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "server")]
use treedraw::serve::{ServeArgs, run_serve};
use treedraw::{EditorConfig, EditorEvent, EditorSession, graph_from_link};

const DEFAULT_OUTPUT_NAME: &str = "tree.svg";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5151/";
const LOG_ENV: &str = "TREEDRAW_LOG";

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "treedraw",
    about = "Render a shared binary-tree diagram link to SVG."
)]
pub struct RenderArgs {
    /// Share link or bare snapshot payload.
    #[arg(short = 'l', long = "link", conflicts_with = "input")]
    link: Option<String>,

    /// File containing a share link. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Background color for the rendered diagram.
    #[arg(short = 'b', long = "background-color")]
    background_color: Option<String>,

    /// JSON file with geometry, animation and render settings.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Fail on a malformed link instead of rendering an empty diagram.
    #[arg(long = "strict", action = ArgAction::SetTrue)]
    strict: bool,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "treedraw replay",
    about = "Apply a JSON list of editor events and print the resulting share link."
)]
pub struct ReplayArgs {
    /// JSON array of editor events. Use '-' to read from stdin.
    #[arg(short = 's', long = "script")]
    script: String,

    /// Share link to start from (defaults to an empty diagram).
    #[arg(short = 'l', long = "link")]
    link: Option<String>,

    /// Base URL for the printed share link.
    #[arg(long = "base-url", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Also write the final diagram as SVG to this path ('-' for stdout).
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// JSON file with geometry, animation and render settings.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Leave in-flight animations where the last event put them.
    #[arg(long = "no-settle", action = ArgAction::SetTrue)]
    no_settle: bool,
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let rest = || std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned());
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            #[cfg(feature = "server")]
            {
                let serve_args = ServeArgs::parse_from(rest());
                tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .context("failed to start async runtime")?
                    .block_on(run_serve(serve_args))
            }
            #[cfg(not(feature = "server"))]
            {
                Err(anyhow!(
                    "'serve' command requires the 'server' feature to be enabled"
                ))
            }
        }
        Some("replay") => run_replay(ReplayArgs::parse_from(rest())),
        Some("render") => run_render(RenderArgs::parse_from(rest())),
        _ => run_render(RenderArgs::parse_from(args.iter().cloned())),
    }
}

fn run_render(cli: RenderArgs) -> Result<()> {
    let mut config = EditorConfig::load_optional(cli.config.as_deref())?;
    if let Some(background) = cli.background_color {
        config.render.background = background;
    }

    let (link, input_path) = match (cli.link, cli.input.as_deref()) {
        (Some(link), _) => (link, None),
        (None, Some(input)) => read_input(input)?,
        (None, None) => bail!("either --link or --input must be provided"),
    };

    let session = if cli.strict {
        let graph = graph_from_link(&link).context("failed to decode share link")?;
        EditorSession::with_graph(config, graph)
    } else {
        EditorSession::from_link(config, &link)
    };

    let output_dest = parse_output(cli.output.as_deref(), input_path.as_deref())?;
    let svg = session.render_svg()?;
    write_output(output_dest, svg.as_bytes(), cli.quiet)?;

    Ok(())
}

fn run_replay(cli: ReplayArgs) -> Result<()> {
    let config = EditorConfig::load_optional(cli.config.as_deref())?;
    let (script, _) = read_input(&cli.script)?;
    let events: Vec<EditorEvent> =
        serde_json::from_str(&script).context("failed to parse event script")?;

    let mut session = match &cli.link {
        Some(link) => {
            let graph = graph_from_link(link).context("failed to decode starting link")?;
            EditorSession::with_graph(config, graph)
        }
        None => EditorSession::new(config),
    };

    let count = events.len();
    for event in events {
        session.apply(event);
    }
    if !cli.no_settle {
        let ticks = session.settle();
        tracing::debug!(ticks, "animations settled");
    }
    tracing::info!(events = count, nodes = session.graph().len(), "replay finished");

    if let Some(output) = cli.output.as_deref() {
        let dest = parse_output(Some(output), None)?;
        let quiet = matches!(dest, OutputDestination::Stdout);
        write_output(dest, session.render_svg()?.as_bytes(), quiet)?;
    }
    println!("{}", session.share_link(&cli.base_url));

    Ok(())
}

/// Contents of `arg` (a path, or `-` for stdin) and the path it came from.
fn read_input(arg: &str) -> Result<(String, Option<PathBuf>)> {
    let (text, path) = if arg == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        (buffer, None)
    } else {
        let path = PathBuf::from(arg);
        let text = fs::read_to_string(&path).with_context(|| format!("failed to read '{arg}'"))?;
        (text, Some(path))
    };
    if text.trim().is_empty() {
        bail!("input '{arg}' was empty");
    }
    Ok((text, path))
}

fn parse_output(output: Option<&str>, input: Option<&Path>) -> Result<OutputDestination> {
    match output {
        Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
        None => Ok(OutputDestination::File(
            input.map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_NAME), default_output_for),
        )),
    }
}

fn default_output_for(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!("{name}.svg"))
        .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());
    let mut path = input.to_path_buf();
    path.set_file_name(name);
    path
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("Generated diagram -> {}", path.display());
            }
        }
    }
    Ok(())
}
