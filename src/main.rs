use clap::Parser;
use html2wt::config::SerializerOptions;
use html2wt::dom::PageBundle;
use html2wt::error::Result;
use html2wt::SelserInputs;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Serialize Parsoid-annotated HTML back to wikitext.
#[derive(Parser)]
#[command(name = "html2wt")]
#[command(version)]
struct Cli {
    /// Edited HTML document
    #[arg(required_unless_present = "all")]
    input: Option<PathBuf>,

    /// Unedited HTML to diff the input against (selective serialization)
    #[arg(long, requires = "orig_wt")]
    orig_html: Option<PathBuf>,

    /// Wikitext the original HTML was produced from
    #[arg(long)]
    orig_wt: Option<PathBuf>,

    /// YAML file with serializer options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the metadata side table as JSON to this file
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Print diagnostics as JSON to stderr
    #[arg(long)]
    diagnostics: bool,

    /// Bulk mode: serialize every .html under HTML_ROOT into WT_ROOT
    #[arg(long, num_args = 2, value_names = ["HTML_ROOT", "WT_ROOT"], conflicts_with = "input")]
    all: Option<Vec<PathBuf>>,

    /// Write wikitext here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// `* item` for new list items
    #[arg(long)]
    space_after_new_bullets: bool,

    /// `==Title==` for new headings
    #[arg(long)]
    no_space_in_new_headings: bool,

    /// Emit text as-is, without nowiki protection
    #[arg(long)]
    no_escape: bool,

    /// Serialize the tree exactly as given, without tidying it first
    #[arg(long)]
    no_scrub_wikitext: bool,
}

impl Cli {
    fn options(&self) -> Result<SerializerOptions> {
        let mut opts = match &self.config {
            Some(path) => SerializerOptions::from_path(path)?,
            None => SerializerOptions::default(),
        };
        if self.space_after_new_bullets {
            opts.space_after_new_bullets = true;
        }
        if self.no_space_in_new_headings {
            opts.space_in_new_headings = false;
        }
        if self.no_escape {
            opts.escape_text = false;
        }
        if self.no_scrub_wikitext {
            opts.scrub_wikitext = false;
        }
        Ok(opts)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run_cli(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let opts = cli.options()?;

    if let Some(dirs) = &cli.all {
        // clap guarantees exactly two values
        if let [html_root, wt_root] = dirs.as_slice() {
            return html2wt::serialize_all_in_dirs(html_root, wt_root, &opts);
        }
    }

    let Some(input) = cli.input.as_deref() else {
        return Ok(());
    };
    let selser = cli.orig_wt.clone().map(|original_wt| SelserInputs {
        original_html: cli.orig_html.clone(),
        original_wt,
    });

    let conversion = html2wt::run(input, selser.as_ref(), &opts)?;
    let output = &conversion.output;

    if cli.diagnostics {
        eprintln!("{}", serde_json::to_string_pretty(&output.diagnostics)?);
    }
    if let Some(path) = &cli.bundle {
        let bundle = PageBundle::from_document(&conversion.document, output.diagnostics.clone());
        fs::write(path, serde_json::to_string_pretty(&bundle)?)?;
    }

    match &cli.output {
        Some(path) => fs::write(path, &output.wikitext)?,
        None => println!("{}", output.wikitext),
    }
    Ok(())
}
