use crate::compute_layout;
use crate::config::{Config, load_config, merge_init_config};
use crate::layout::LinkPath;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::parser::{InputFormat, RecordOptions, detect_format, parse_input};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sankey", version, about = "Sankey diagram layout and renderer")]
pub struct Args {
    /// Input file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Layout height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Relaxation passes
    #[arg(long = "iterations")]
    pub iterations: Option<usize>,

    /// Input format
    #[arg(long = "format", value_enum, default_value = "auto")]
    pub format: FormatArg,

    /// Record column holding row weights
    #[arg(long = "value-column")]
    pub value_column: Option<String>,

    /// Drop records weighted below this
    #[arg(long = "threshold")]
    pub threshold: Option<f64>,

    /// Column names for record tables without a header row
    #[arg(long = "header", value_delimiter = ',')]
    pub header: Option<Vec<String>>,

    /// Record columns chained as stages, in order
    #[arg(long = "stages", value_delimiter = ',')]
    pub stages: Option<Vec<String>>,

    /// Keep only records whose COLUMN equals VALUE (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Log engine progress to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Auto,
    Json,
    Flows,
    Records,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let input = read_input(args.input.as_deref())?;
    let format = match args.format {
        FormatArg::Auto => detect_format(args.input.as_deref(), &input),
        FormatArg::Json => InputFormat::Json,
        FormatArg::Flows => InputFormat::Flows,
        FormatArg::Records => InputFormat::Records,
    };
    let records = RecordOptions {
        value_column: args.value_column.clone(),
        threshold: args.threshold,
        header: args.header.clone(),
        stages: args.stages.clone(),
        filters: args.filters.clone(),
        separator: config.layout.separator,
    };

    let parsed = parse_input(&input, format, &records)?;
    if let Some(init_cfg) = parsed.init_config {
        config = merge_init_config(config, init_cfg)?;
        apply_overrides(&mut config, &args);
    }

    let mut graph = parsed.graph;
    let layout = compute_layout(&mut graph, &config.layout)?;
    info!(
        nodes = layout.nodes().len(),
        links = layout.links().len(),
        bend = layout.link_bend(),
        "layout complete"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.layout, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &config.theme, &config.layout, &config.render);
            write_png(&svg, &output, &config)?;
        }
        OutputFormat::Json => {
            let path = LinkPath::new().curvature(config.layout.curvature);
            let dump = LayoutDump::from_layout(&layout, &config.theme, &path);
            match args.output.as_deref() {
                Some(output) => write_layout_dump(std::fs::File::create(output)?, &dump)?,
                None => write_layout_dump(io::stdout().lock(), &dump)?,
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Command-line sizes win over both the config file and init directives.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(width) = args.width {
        config.layout.width = width;
    }
    if let Some(height) = args.height {
        config.layout.height = height;
    }
    if let Some(iterations) = args.iterations {
        config.layout.iterations = iterations;
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    write_output_png(svg, output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{raw}`"))?;
    Ok((column.trim().to_string(), value.trim().to_string()))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
