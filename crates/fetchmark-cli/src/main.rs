//! Fetchmark CLI - Command-line interface for resilient web fetching

use clap::{Args, Parser, Subcommand, ValueEnum};
use fetchmark::{
    config, convert_to_markdown, generate_url_variations, generate_url_variations_with_aliases,
    normalize_url, CnameAliasSource, ConvertOptions, FetchOptionsPatch, FetchOutcome, Fetcher,
    FetchSuccess, RetryPolicyPatch,
};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Output format for the fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// Fetchmark - resilient web content fetching tool
#[derive(Parser, Debug)]
#[command(name = "fetchmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a URL through the variation fallback chain
    Fetch(FetchArgs),
    /// Print the canonical form of a URL
    Normalize {
        /// URL to normalize
        url: String,
    },
    /// Print the variation fallback chain for a URL
    Variations {
        /// URL to expand
        url: String,

        /// Enrich with DNS CNAME aliases
        #[arg(long)]
        dns: bool,
    },
    /// Convert HTML from a file (or stdin) to Markdown
    Convert {
        /// HTML file; stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// URL to fetch
    url: String,

    /// Output format
    #[arg(long, short, default_value = "md")]
    output: OutputFormat,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Attempts per URL variation
    #[arg(long)]
    retries: Option<u32>,

    /// Skip HTML to Markdown conversion
    #[arg(long)]
    raw: bool,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Enrich URL variations with DNS CNAME aliases
    #[arg(long)]
    dns: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Fetch(args) => run_fetch(args).await,
        Commands::Normalize { url } => writeln_safe(&normalize_url(&url)),
        Commands::Variations { url, dns } => run_variations(&url, dns).await,
        Commands::Convert { file } => run_convert(file),
    }
}

async fn run_fetch(args: FetchArgs) {
    let patch = FetchOptionsPatch {
        timeout_ms: args.timeout_ms,
        convert_to_markdown: args.raw.then_some(false),
        headers: parse_headers(&args.headers),
        retry: args.retries.map(|attempts| RetryPolicyPatch {
            attempts: Some(attempts),
            ..Default::default()
        }),
        ..Default::default()
    };
    let options = config::load_options().merged(patch);

    let mut builder = Fetcher::builder().options(options);
    if args.dns {
        if let Some(source) = CnameAliasSource::from_system_conf() {
            builder = builder.alias_source(std::sync::Arc::new(source));
        }
    }

    match builder.build().fetch(&args.url).await {
        Ok(FetchOutcome::Success(success)) => match args.output {
            OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&success)),
            OutputFormat::Json => print_json(&FetchOutcome::Success(success)),
        },
        Ok(FetchOutcome::Failure(failure)) => {
            match args.output {
                OutputFormat::Md => {
                    eprintln!("Error: {}", failure.message);
                    for attempted in &failure.attempted_urls {
                        eprintln!("  tried: {}", attempted);
                    }
                }
                OutputFormat::Json => print_json(&FetchOutcome::Failure(failure)),
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_variations(url: &str, dns: bool) {
    let variations = if dns {
        match CnameAliasSource::from_system_conf() {
            Some(source) => generate_url_variations_with_aliases(url, &source).await,
            None => generate_url_variations(url).await,
        }
    } else {
        generate_url_variations(url).await
    };

    for variation in variations {
        writeln_safe(&variation);
    }
}

fn run_convert(file: Option<PathBuf>) {
    let html = match file {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(html) => html,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut html = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut html) {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            }
            html
        }
    };

    writeln_safe(&convert_to_markdown(&html, &ConvertOptions::default()));
}

/// Parse repeated `Name: value` header flags
fn parse_headers(raw: &[String]) -> Option<HashMap<String, String>> {
    if raw.is_empty() {
        return None;
    }
    let mut headers = HashMap::new();
    for entry in raw {
        match entry.split_once(':') {
            Some((name, value)) => {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
            None => {
                eprintln!("Ignoring malformed header flag: {}", entry);
            }
        }
    }
    Some(headers)
}

fn print_json(outcome: &FetchOutcome) {
    match serde_json::to_string_pretty(outcome) {
        Ok(json) => writeln_safe(&json),
        Err(e) => {
            eprintln!("Error serializing outcome: {}", e);
            std::process::exit(1);
        }
    }
}

/// Format a success record as markdown with YAML frontmatter
fn format_md_with_frontmatter(success: &FetchSuccess) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", success.url));
    output.push_str(&format!("status: {}\n", success.status));
    if !success.content_type.is_empty() {
        output.push_str(&format!("source_content_type: {}\n", success.content_type));
    }
    output.push_str(&format!("duration_ms: {}\n", success.duration_ms));
    output.push_str(&format!("fetch_id: {}\n", success.fetch_id));
    output.push_str("---\n");

    output.push_str(&success.content);
    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_md_basic() {
        let success = FetchSuccess {
            fetch_id: "abc".to_string(),
            url: "https://example.com".to_string(),
            status: 200,
            headers: HashMap::new(),
            content_type: "text/html".to_string(),
            content: "# Hello World".to_string(),
            duration_ms: 42,
        };

        let output = format_md_with_frontmatter(&success);

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://example.com\n"));
        assert!(output.contains("status: 200\n"));
        assert!(output.contains("source_content_type: text/html\n"));
        assert!(output.contains("duration_ms: 42\n"));
        assert!(output.contains("---\n# Hello World"));
    }

    #[test]
    fn test_format_md_empty_content_type_omitted() {
        let success = FetchSuccess {
            fetch_id: "abc".to_string(),
            url: "https://example.com".to_string(),
            status: 200,
            headers: HashMap::new(),
            content_type: String::new(),
            content: "body".to_string(),
            duration_ms: 1,
        };

        let output = format_md_with_frontmatter(&success);
        assert!(!output.contains("source_content_type"));
    }

    #[test]
    fn test_parse_headers() {
        let parsed = parse_headers(&[
            "X-Api-Key: secret".to_string(),
            "Accept: text/html".to_string(),
            "malformed".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.get("X-Api-Key").unwrap(), "secret");
        assert_eq!(parsed.get("Accept").unwrap(), "text/html");
        assert_eq!(parsed.len(), 2);

        assert!(parse_headers(&[]).is_none());
    }
}
