use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use pdf_page_extractor::{
    ChromiumRenderer, CommandRenderer, Extractor, Outcome, PathArgs, Profile, Renderer,
};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-extractor")]
#[command(about = "Extract selected pages from a PDF and optionally prepend a Markdown intro")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract pages listed under `pages:`, taking default paths from the YAML config
    Extract {
        /// Input PDF file (default: `file` from the YAML config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output PDF file (default: `output` from the YAML config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// YAML file with page configuration
        #[arg(long, default_value = "resources/config.yaml")]
        yaml: PathBuf,

        /// Markdown file to prepend (default: `appendFirstPage` from the YAML config,
        /// then the first Markdown file in the resources directory)
        #[arg(long)]
        markdown: Option<PathBuf>,

        #[command(flatten)]
        shared: SharedArgs,
    },
    /// Export the workout pages listed under `workouts:` into a booklet
    Workout {
        /// Input PDF file
        #[arg(long, default_value = "resources/BFX.Xceed.Global.OM.EN.pdf")]
        input: PathBuf,

        /// Output PDF file
        #[arg(long, default_value = "output/Bowflex_Workout_Booklet.pdf")]
        output: PathBuf,

        /// YAML file with workout pages
        #[arg(long, default_value = "resources/workouts.yaml")]
        yaml: PathBuf,

        /// Markdown file to prepend (pass "" to auto-detect in the resources directory)
        #[arg(long, default_value = "resources/workout_plan.md")]
        markdown: String,

        #[command(flatten)]
        shared: SharedArgs,
    },
}

#[derive(Args)]
struct SharedArgs {
    /// Directory searched for a Markdown cover when none is configured
    #[arg(long = "resources-dir", default_value = "resources")]
    resources_dir: PathBuf,

    /// HTML-to-PDF backend used for the cover
    #[arg(long, value_enum, default_value_t = Backend::Command)]
    renderer: Backend,

    /// Program run by the command backend
    #[arg(long = "render-program", default_value = "node")]
    render_program: String,

    /// Script passed to the render program before the HTML and PDF paths
    #[arg(long = "render-script", default_value = "puppeteer_render.js")]
    render_script: String,

    /// Chrome or Chromium binary for the chromium backend (default: auto-detect)
    #[arg(long)]
    chrome: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Run `<program> <script> <html> <pdf>`
    Command,
    /// Print with a headless Chromium
    Chromium,
}

impl SharedArgs {
    fn renderer(&self) -> Renderer {
        match self.renderer {
            Backend::Command => Renderer::Command(
                CommandRenderer::new(&self.render_program).arg(&self.render_script),
            ),
            Backend::Chromium => {
                let renderer = ChromiumRenderer::new();
                Renderer::Chromium(match &self.chrome {
                    Some(path) => renderer.with_executable(path.clone()),
                    None => renderer,
                })
            }
        }
    }
}

async fn run(profile: Profile, args: PathArgs, renderer: Renderer) -> Result<()> {
    let job = profile.plan(&args).await?;

    if job.cover_discovered() {
        if let Some(markdown) = job.cover_path() {
            println!("Auto-using markdown file: {}", markdown.display().to_string().green());
        }
    }

    match Extractor::new(renderer).run(&job).await? {
        Outcome::InputMissing(input) => {
            println!("{}", format!("Error: '{}' not found.", input.display()).red());
        }
        Outcome::Saved(report) => {
            println!("Saved to: {}", report.output.display().to_string().blue());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr; stdout carries only user-facing messages.
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("pdf_page_extractor=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    let (profile, args, renderer) = match cli.command {
        Commands::Extract { input, output, yaml, markdown, shared } => (
            Profile::Generic,
            PathArgs {
                input,
                output,
                yaml,
                markdown,
                resources_dir: shared.resources_dir.clone(),
            },
            shared.renderer(),
        ),
        Commands::Workout { input, output, yaml, markdown, shared } => (
            Profile::Workout,
            PathArgs {
                input: Some(input),
                output: Some(output),
                yaml,
                markdown: Some(PathBuf::from(markdown)),
                resources_dir: shared.resources_dir.clone(),
            },
            shared.renderer(),
        ),
    };

    if let Err(e) = run(profile, args, renderer).await {
        error!("{}", format!("Error: {:#}", e).red());
        process::exit(1);
    }
}
