use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use bloodstar_token::{
    CancelToken, Character, CharacterImageData, FetchOptions, FetchThrottle, FsFetcher,
    SourceImage, StyledImage, Team, ThrottledFetcher, TokenPipeline, TokenStyle, encode_png,
    is_data_uri,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "bloodstar-token", version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding `img/texture.png` and the team gradients.
    #[arg(long, default_value = ".", global = true)]
    assets: PathBuf,

    /// Image request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000, global = true)]
    timeout_ms: u64,

    /// Maximum simultaneous image requests.
    #[arg(long, default_value_t = bloodstar_token::MAX_SIMULTANEOUS_IMAGE_REQUESTS, global = true)]
    max_requests: usize,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Style one portrait into a token PNG.
    Token(TokenArgs),
    /// Style every image in a directory, in parallel.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Character team (townsfolk, outsider, minion, demon, traveler).
    #[arg(long, default_value = "townsfolk")]
    team: Team,

    /// JSON file with image settings (camelCase keys; missing keys use defaults).
    #[arg(long)]
    style: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TokenArgs {
    /// Portrait: file path, asset path, `file://` URL or `data:` URI.
    #[arg(long = "in", conflicts_with = "data", required_unless_present = "data")]
    in_path: Option<String>,

    /// Saved character image data (JSON with `unStyledImage`, `team`, `imageSettings`).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also print the token as a `data:` URI on stdout.
    #[arg(long, default_value_t = false)]
    data_uri: bool,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Directory of portraits (png, jpg, jpeg, webp, gif, bmp).
    #[arg(long = "in-dir")]
    in_dir: PathBuf,

    /// Directory the tokens are written to, one `<name>.png` per portrait.
    #[arg(long = "out-dir")]
    out_dir: PathBuf,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    #[command(flatten)]
    style: StyleArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let pipeline = build_pipeline(&cli);
    match cli.cmd {
        Command::Token(args) => cmd_token(&pipeline, args),
        Command::Batch(args) => cmd_batch(&pipeline, args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn build_pipeline(cli: &Cli) -> TokenPipeline {
    let options = FetchOptions {
        timeout_ms: cli.timeout_ms,
        max_simultaneous: cli.max_requests,
        ..FetchOptions::default()
    };
    let fetcher = ThrottledFetcher::new(
        Arc::new(FsFetcher::new(&cli.assets)),
        FetchThrottle::new(),
        options,
    );
    TokenPipeline::from_fetcher(Arc::new(fetcher))
}

fn load_style(path: Option<&Path>) -> anyhow::Result<TokenStyle> {
    let Some(path) = path else {
        return Ok(TokenStyle::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read style '{}'", path.display()))?;
    TokenStyle::from_json(&text).with_context(|| format!("parse style '{}'", path.display()))
}

fn source_from_arg(arg: &str) -> anyhow::Result<SourceImage> {
    if is_data_uri(arg) || arg.contains("://") {
        return Ok(SourceImage::from_reference(arg));
    }
    let bytes = std::fs::read(arg).with_context(|| format!("read portrait '{arg}'"))?;
    Ok(SourceImage::Encoded(Arc::new(bytes)))
}

fn cmd_token(pipeline: &TokenPipeline, args: TokenArgs) -> anyhow::Result<()> {
    let character = match (&args.data, &args.in_path) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read character data '{}'", path.display()))?;
            let data = CharacterImageData::from_json(&text)
                .with_context(|| format!("parse character data '{}'", path.display()))?;
            Character::with_data(pipeline.clone(), &data)?
        }
        (None, Some(input)) => {
            let character = Character::new(pipeline.clone());
            let style = load_style(args.style.style.as_deref())?;
            let suspended = character.suspend_regeneration();
            character.unstyled_image().set(Some(source_from_arg(input)?));
            character.team().set(args.style.team);
            character.image_settings().apply(&style);
            suspended.resume()?;
            character
        }
        (None, None) => anyhow::bail!("either --in or --data is required"),
    };
    let styled = character
        .styled_image()
        .context("the portrait has no visible pixels; no token produced")?;

    let png = styled_png(pipeline, &styled)?;
    write_png(&args.out, &png)?;
    if args.data_uri {
        println!("{}", bloodstar_token::to_data_uri(bloodstar_token::PNG_MIME, &png));
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

/// PNG bytes for a styled result; pass-through sources are re-encoded as they were loaded.
fn styled_png(pipeline: &TokenPipeline, styled: &StyledImage) -> anyhow::Result<Vec<u8>> {
    match styled {
        StyledImage::Token(token) => Ok(token.png().to_vec()),
        StyledImage::Unstyled(source) => {
            let pixels = pipeline.loader().load(
                source,
                bloodstar_token::FULL_WIDTH,
                bloodstar_token::FULL_HEIGHT,
                &CancelToken::new(),
            )?;
            Ok(encode_png(&pixels)?)
        }
    }
}

fn write_png(out: &Path, png: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, png).with_context(|| format!("write png '{}'", out.display()))
}

fn is_portrait(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|e| matches!(e.as_str(), "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp"))
}

fn cmd_batch(pipeline: &TokenPipeline, args: BatchArgs) -> anyhow::Result<()> {
    let style = load_style(args.style.style.as_deref())?;
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(&args.in_dir)
        .with_context(|| format!("read input dir '{}'", args.in_dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_portrait(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let run = || -> Vec<(PathBuf, anyhow::Result<bool>)> {
        inputs
            .par_iter()
            .map(|input| {
                let res = style_one(pipeline, input, &args.out_dir, args.style.team, &style);
                (input.clone(), res)
            })
            .collect()
    };
    let results = match args.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("build rayon thread pool")?
            .install(run),
        None => run(),
    };

    let mut failed = 0usize;
    let mut written = 0usize;
    for (input, res) in results {
        match res {
            Ok(true) => written += 1,
            Ok(false) => eprintln!("skipped {} (no visible pixels)", input.display()),
            Err(e) => {
                failed += 1;
                eprintln!("failed {}: {e:#}", input.display());
            }
        }
    }
    eprintln!("wrote {written} token(s) to {}", args.out_dir.display());
    if failed > 0 {
        anyhow::bail!("{failed} portrait(s) failed");
    }
    Ok(())
}

fn style_one(
    pipeline: &TokenPipeline,
    input: &Path,
    out_dir: &Path,
    team: Team,
    style: &TokenStyle,
) -> anyhow::Result<bool> {
    let bytes = std::fs::read(input).with_context(|| format!("read '{}'", input.display()))?;
    let source = SourceImage::Encoded(Arc::new(bytes));
    let Some(styled) = pipeline.render(Some(&source), team, style, &CancelToken::new())? else {
        return Ok(false);
    };
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("portrait file name is not valid UTF-8")?;
    let png = styled_png(pipeline, &styled)?;
    write_png(&out_dir.join(format!("{stem}.png")), &png)?;
    Ok(true)
}
