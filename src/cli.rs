//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::packager::{NamingStrategy, PackageFormat};
use crate::walker::ExcludeRule;

/// docpack - bundle interlinked markdown documents
///
/// Resolve the documents a root document links to, bound the walk, rewrite
/// links and write a self-contained bundle.
#[derive(Parser, Debug)]
#[command(
    name = "docpack",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Bundle a markdown document and everything it links to",
    long_about = "docpack walks the links of a root markdown document, bounds the walk by \
                  depth, navigation files and exclude rules, rewrites links for their new \
                  location and writes a self-contained bundle (directory, zip, package.json, \
                  marketplace manifest).",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  docpack pack docs/guide.md\n    \
                  docpack pack docs/guide.md --depth 2 --format zip\n    \
                  docpack graph docs/guide.md --exclude-navigation\n    \
                  docpack completions --shell zsh"
)]
pub struct Cli {
    /// Project root (defaults to the current directory when it contains the root document)
    #[arg(long, short = 'C', global = true)]
    pub project_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bundle a root document and its dependencies
    Pack(PackArgs),

    /// Show the dependency graph of a root document without writing anything
    Graph(GraphArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Link-follow depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    Limited(usize),
    Unbounded,
}

impl DepthLimit {
    pub fn max_depth(self) -> Option<usize> {
        match self {
            DepthLimit::Limited(depth) => Some(depth),
            DepthLimit::Unbounded => None,
        }
    }
}

fn parse_depth(value: &str) -> Result<DepthLimit, String> {
    if value.eq_ignore_ascii_case("unbounded") || value.eq_ignore_ascii_case("all") {
        return Ok(DepthLimit::Unbounded);
    }
    value
        .parse::<usize>()
        .map(DepthLimit::Limited)
        .map_err(|_| format!("expected a number or 'unbounded', got '{value}'"))
}

/// `GLOB` or `GLOB=TEMPLATE`
fn parse_exclude_rule(value: &str) -> Result<ExcludeRule, String> {
    let (pattern, template) = match value.split_once('=') {
        Some((pattern, template)) => (pattern, Some(template)),
        None => (value, None),
    };
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err("exclude rule needs a glob pattern".to_string());
    }
    let rule = ExcludeRule::new(vec![pattern.to_string()]);
    Ok(match template {
        Some(t) => rule.with_template(t),
        None => rule,
    })
}

/// Options shared by commands that walk the graph
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WalkArgs {
    /// Link-follow depth (a number, or 'unbounded')
    #[arg(long, short = 'd', value_name = "N", value_parser = parse_depth)]
    pub depth: Option<DepthLimit>,

    /// Leave README/index/toc style files out of the bundle
    #[arg(long)]
    pub exclude_navigation: bool,

    /// Exclude matching files; links to them render TEMPLATE when given
    #[arg(long = "exclude", short = 'x', value_name = "GLOB[=TEMPLATE]", value_parser = parse_exclude_rule)]
    pub exclude_rules: Vec<ExcludeRule>,

    /// Frontmatter field holding a document's identity
    #[arg(long, value_name = "FIELD")]
    pub identity_field: Option<String>,
}

/// Arguments for the pack command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Bundle into dist/<name>:\n    docpack pack docs/guide.md\n\n\
                  Follow links two levels deep and zip the result:\n    docpack pack docs/guide.md --depth 2 --format dir,zip\n\n\
                  Drop drafts and mark links to them:\n    docpack pack docs/guide.md --exclude 'drafts/**={{ text }} (draft)'\n\n\
                  Flatten names and write package.json:\n    docpack pack docs/guide.md --naming flattened --format npm\n\n\
                  Preview without writing:\n    docpack pack docs/guide.md --dry-run")]
pub struct PackArgs {
    /// Root markdown document
    pub root: PathBuf,

    /// Output directory (default: <project root>/dist/<name>)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Output formats
    #[arg(long = "format", short = 'f', value_enum, value_delimiter = ',')]
    pub formats: Vec<PackageFormat>,

    #[command(flatten)]
    pub walk: WalkArgs,

    /// How bundled files are named
    #[arg(long, value_enum)]
    pub naming: Option<NamingStrategy>,

    /// Leading path removed before flattening names
    #[arg(long, value_name = "PREFIX")]
    pub strip_prefix: Option<String>,

    /// Template for links to excluded files that match no rule template
    #[arg(long, value_name = "TEMPLATE")]
    pub default_template: Option<String>,

    /// Template for links whose target is not part of the project
    #[arg(long, value_name = "TEMPLATE")]
    pub unresolved_template: Option<String>,

    /// Package name
    #[arg(long)]
    pub name: Option<String>,

    /// Package version
    #[arg(long = "package-version", value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Package description
    #[arg(long)]
    pub description: Option<String>,

    /// Package license
    #[arg(long)]
    pub license: Option<String>,

    /// Package author
    #[arg(long)]
    pub author: Option<String>,

    /// Write into a non-empty output directory
    #[arg(long)]
    pub force: bool,

    /// Show what would be bundled without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the graph command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show everything a document depends on:\n    docpack graph docs/guide.md\n\n\
                  Only direct dependencies, as JSON:\n    docpack graph docs/guide.md --depth 1 --json")]
pub struct GraphArgs {
    /// Root markdown document
    pub root: PathBuf,

    #[command(flatten)]
    pub walk: WalkArgs,

    /// Print the walk result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    docpack completions --shell bash > ~/.bash_completion.d/docpack\n\n\
                  Generate zsh completions:\n    docpack completions --shell zsh > ~/.zfunc/_docpack\n\n\
                  Generate fish completions:\n    docpack completions --shell fish > ~/.config/fish/completions/docpack.fish")]
pub struct CompletionsArgs {
    /// Shell type
    #[arg(long, value_enum, ignore_case = true)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_pack() {
        let cli = Cli::try_parse_from(["docpack", "pack", "docs/guide.md"]).unwrap();
        match cli.command {
            Commands::Pack(args) => {
                assert_eq!(args.root, PathBuf::from("docs/guide.md"));
                assert!(args.formats.is_empty());
                assert_eq!(args.walk.depth, None);
                assert!(!args.dry_run);
            }
            _ => panic!("Expected Pack command"),
        }
    }

    #[test]
    fn test_cli_parsing_pack_with_options() {
        let cli = Cli::try_parse_from([
            "docpack",
            "pack",
            "guide.md",
            "-o",
            "out",
            "--format",
            "dir,zip",
            "--format",
            "npm",
            "--depth",
            "2",
            "--exclude",
            "drafts/**={{ text }} (draft)",
            "--exclude",
            "private/**",
            "--naming",
            "flattened",
            "--package-version",
            "1.0.0",
            "--force",
        ])
        .unwrap();
        match cli.command {
            Commands::Pack(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out")));
                assert_eq!(
                    args.formats,
                    vec![PackageFormat::Dir, PackageFormat::Zip, PackageFormat::Npm]
                );
                assert_eq!(args.walk.depth, Some(DepthLimit::Limited(2)));
                assert_eq!(args.walk.exclude_rules.len(), 2);
                assert_eq!(
                    args.walk.exclude_rules[0].template.as_deref(),
                    Some("{{ text }} (draft)")
                );
                assert_eq!(args.walk.exclude_rules[1].template, None);
                assert_eq!(args.naming, Some(NamingStrategy::Flattened));
                assert_eq!(args.package_version.as_deref(), Some("1.0.0"));
                assert!(args.force);
            }
            _ => panic!("Expected Pack command"),
        }
    }

    #[test]
    fn test_cli_parsing_depth_values() {
        assert_eq!(parse_depth("unbounded"), Ok(DepthLimit::Unbounded));
        assert_eq!(parse_depth("0"), Ok(DepthLimit::Limited(0)));
        assert!(parse_depth("deep").is_err());
        assert!(Cli::try_parse_from(["docpack", "graph", "a.md", "--depth", "-1"]).is_err());
    }

    #[test]
    fn test_cli_parsing_rejects_unknown_format() {
        let result = Cli::try_parse_from(["docpack", "pack", "a.md", "--format", "tarball"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parsing_graph() {
        let cli = Cli::try_parse_from(["docpack", "graph", "a.md", "--exclude-navigation", "--json"])
            .unwrap();
        match cli.command {
            Commands::Graph(args) => {
                assert!(args.walk.exclude_navigation);
                assert!(args.json);
            }
            _ => panic!("Expected Graph command"),
        }
    }

    #[test]
    fn test_cli_parsing_version() {
        let cli = Cli::try_parse_from(["docpack", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from(["docpack", "-v", "-C", "/tmp/project", "graph", "a.md"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp/project")));
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["docpack", "completions", "--shell", "ZSH"]).unwrap();
        match cli.command {
            Commands::Completions(args) => {
                assert_eq!(args.shell, clap_complete::Shell::Zsh);
            }
            _ => panic!("Expected Completions command"),
        }
    }
}
