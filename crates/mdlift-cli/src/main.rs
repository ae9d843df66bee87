use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mdlift_config::Config;
use mdlift_engine::{
    BlockForest, BlockId, BlockKind, ConvertOptions, Converter, Credentials, DiagramOptions,
    DocsClient, DocumentApi, parse_only,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mdlift", version, about = "Upload Markdown documents to a rich-document service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a Markdown file and upload it
    Push {
        /// Markdown file to upload
        file: PathBuf,
        /// Document title; defaults to the file stem
        #[arg(long)]
        title: Option<String>,
        /// Folder token to create the document under
        #[arg(long)]
        folder: Option<String>,
        /// Append to an existing document instead of creating one
        #[arg(long, value_name = "DOCUMENT_ID", conflicts_with = "replace")]
        append_to: Option<String>,
        /// Replace the contents of an existing document
        #[arg(long, value_name = "DOCUMENT_ID")]
        replace: Option<String>,
        /// Base directory for relative image paths
        #[arg(long)]
        image_base_dir: Option<PathBuf>,
        /// Skip downloading remote images
        #[arg(long)]
        no_remote_images: bool,
        /// Render mermaid fences to images (requires mmdc on PATH)
        #[arg(long)]
        mermaid: bool,
        #[arg(long, default_value = "default")]
        mermaid_theme: String,
        #[arg(long, default_value = "white")]
        mermaid_background: String,
        #[arg(long)]
        mermaid_width: Option<u32>,
        #[arg(long)]
        mermaid_height: Option<u32>,
        /// Per-request block ceiling override
        #[arg(long)]
        max_blocks: Option<usize>,
        /// Transfer document ownership to this user after upload
        #[arg(long, value_name = "USER_ID")]
        transfer_to: Option<String>,
        /// Use a specific config file instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse a Markdown file and print the block forest without uploading
    Parse {
        file: PathBuf,
        /// Print the forest as JSON instead of an outline
        #[arg(long)]
        json: bool,
    },
    /// Write a starter config file to the default location
    Init,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Push {
            file,
            title,
            folder,
            append_to,
            replace,
            image_base_dir,
            no_remote_images,
            mermaid,
            mermaid_theme,
            mermaid_background,
            mermaid_width,
            mermaid_height,
            max_blocks,
            transfer_to,
            config,
        } => run_push(PushArgs {
            file,
            title,
            folder,
            append_to,
            replace,
            image_base_dir,
            no_remote_images,
            mermaid,
            mermaid_theme,
            mermaid_background,
            mermaid_width,
            mermaid_height,
            max_blocks,
            transfer_to,
            config,
        }),
        Command::Parse { file, json } => run_parse(&file, json),
        Command::Init => run_init(),
    }
}

struct PushArgs {
    file: PathBuf,
    title: Option<String>,
    folder: Option<String>,
    append_to: Option<String>,
    replace: Option<String>,
    image_base_dir: Option<PathBuf>,
    no_remote_images: bool,
    mermaid: bool,
    mermaid_theme: String,
    mermaid_background: String,
    mermaid_width: Option<u32>,
    mermaid_height: Option<u32>,
    max_blocks: Option<usize>,
    transfer_to: Option<String>,
    config: Option<PathBuf>,
}

fn run_push(args: PushArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?
            .with_context(|| format!("config file not found: {}", path.display()))?,
        None => Config::load()?.unwrap_or_default(),
    };
    config.apply_env_overrides();
    let (app_id, app_secret) = config.credentials()?;

    let markdown = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let client = DocsClient::new(
        config.base_url.clone(),
        config.web_base_url.clone(),
        Credentials { app_id, app_secret },
    )
    .context("failed to initialize http client")?;

    let title = args.title.clone().or_else(|| {
        args.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    });
    let mut options = ConvertOptions {
        title,
        destination_folder: args.folder.clone().or(config.default_folder.clone()),
        image_base_dir: args.image_base_dir.clone().or(config.image_base_dir.clone()),
        download_remote_images: !args.no_remote_images,
        diagram: DiagramOptions {
            enabled: args.mermaid,
            theme: args.mermaid_theme.clone(),
            background: args.mermaid_background.clone(),
            width: args.mermaid_width,
            height: args.mermaid_height,
        },
        ..ConvertOptions::default()
    };
    if let Some(max_blocks) = args.max_blocks {
        if max_blocks < 2 {
            bail!("--max-blocks must be at least 2");
        }
        options.max_blocks_per_request = max_blocks;
    }

    let converter = Converter::new(&client, options)?;
    let result = if let Some(document_id) = &args.replace {
        converter.replace(&markdown, document_id)?
    } else if let Some(document_id) = &args.append_to {
        converter.append(&markdown, document_id)?
    } else {
        converter.convert(&markdown)?
    };

    if let Some(user) = &args.transfer_to {
        client.transfer_ownership(&result.document_id, user)?;
        log::info!("transferred ownership of {} to {user}", result.document_id);
    }

    println!("{}", result.url);
    Ok(())
}

fn run_parse(file: &PathBuf, json: bool) -> Result<()> {
    let markdown = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let output = parse_only(&markdown, &ConvertOptions::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&output.forest)?);
    } else {
        for &root in output.forest.roots() {
            print_outline(&output.forest, root, 0);
        }
        eprintln!(
            "{} blocks, {} media references",
            output.forest.len(),
            output.media.len()
        );
    }
    Ok(())
}

fn print_outline(forest: &BlockForest, id: BlockId, depth: usize) {
    let Some(block) = forest.get(id) else { return };
    let indent = "  ".repeat(depth);
    println!("{indent}{}", describe(&block.kind));
    for &child in &block.children {
        print_outline(forest, child, depth + 1);
    }
}

fn describe(kind: &BlockKind) -> String {
    let label = match kind {
        BlockKind::Text { .. } => "text".to_string(),
        BlockKind::Heading { level, .. } => format!("heading{level}"),
        BlockKind::BulletItem { .. } => "bullet".to_string(),
        BlockKind::OrderedItem { .. } => "ordered".to_string(),
        BlockKind::Todo { done: true, .. } => "todo [x]".to_string(),
        BlockKind::Todo { done: false, .. } => "todo [ ]".to_string(),
        BlockKind::Code { language, .. } => match language {
            Some(language) => format!("code ({language})"),
            None => "code".to_string(),
        },
        BlockKind::Quote => "quote".to_string(),
        BlockKind::Divider => "divider".to_string(),
        BlockKind::Image => "image".to_string(),
        BlockKind::Table { rows, cols, .. } => return format!("table {rows}x{cols}"),
        BlockKind::TableCell => "cell".to_string(),
    };
    match first_text(kind) {
        Some(text) if !text.is_empty() => format!("{label} {text:?}"),
        _ => label,
    }
}

fn first_text(kind: &BlockKind) -> Option<String> {
    kind.runs().map(|runs| {
        let text: String = runs.iter().map(|run| run.text.as_str()).collect();
        if text.chars().count() > 40 {
            let truncated: String = text.chars().take(40).collect();
            format!("{truncated}…")
        } else {
            text
        }
    })
}

fn run_init() -> Result<()> {
    let path = Config::config_path();
    if path.exists() {
        bail!("config already exists at {}", path.display());
    }
    Config::example().save()?;
    println!("wrote {}", path.display());
    Ok(())
}
