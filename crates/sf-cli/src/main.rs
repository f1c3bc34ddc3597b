//! Sifter CLI
//!
//! CLI tool for compiling rulesets, converting persisted settings and checking
//! saved listing pages against a filter configuration.

mod check;
mod fetch;

use std::fs;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use sf_compiler::{
    build_whole_word_pattern, compile_substitutions, compile_tag_ruleset, parse_sanitization_rules,
    selector_from_template,
};
use sf_core::codec;
use sf_core::text::split_lines;

use crate::check::{run_check, CheckOptions};

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "Sifter ruleset compiler and listing checker")]
struct Cli {
    /// Debug logging (RUST_LOG is honoured otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleKind {
    /// Tag expressions (`a & b`, `a | b`)
    Tags,
    /// Whole words for blacklists and whitelists
    Words,
    /// `substitute=word1,word2` sanitization rules
    Sanitize,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a ruleset file and print its optimized form
    Compile {
        /// Rule file, one rule per line
        #[arg(short, long)]
        input: String,

        #[arg(short, long, value_enum, default_value = "tags")]
        kind: RuleKind,

        /// Tag selector template, `{tag}` is replaced by the tag name
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Encode a JSON settings object into the persisted format
    Encode {
        #[arg(short, long)]
        input: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Decode persisted settings or a backup into JSON
    Decode {
        #[arg(short, long)]
        input: String,
    },

    /// Run the filters over a saved listing page
    Check {
        /// Saved HTML page
        #[arg(short, long)]
        page: String,

        #[arg(long, default_value = ".results")]
        list_selector: String,

        #[arg(long, default_value = ".result")]
        item_selector: String,

        #[arg(long, default_value = ".title")]
        name_selector: String,

        /// Link to each item's detail page (defaults to the name selector)
        #[arg(long)]
        link_selector: Option<String>,

        #[arg(long)]
        duration_selector: Option<String>,

        #[arg(long)]
        rating_selector: Option<String>,

        /// Tag selector template, `{tag}` is replaced by the tag name
        #[arg(long)]
        tag_template: Option<String>,

        /// Directory holding persisted settings (in-memory when omitted)
        #[arg(short, long)]
        settings: Option<String>,

        #[arg(long, default_value = "sifter-")]
        prefix: String,

        /// Backup file to restore before checking
        #[arg(long)]
        restore: Option<String>,

        /// `Field Name=<json>` assignment, repeatable
        #[arg(long = "set")]
        set: Vec<String>,

        /// Persist the assignments to the settings directory
        #[arg(long)]
        save: bool,

        /// Base url for fetching detail pages
        #[arg(long)]
        fetch: Option<String>,

        /// Part of the detail page deep attributes are read from
        #[arg(long)]
        detail_selector: Option<String>,

        /// View count on the detail page, enables the "Minimum Views" filter
        #[arg(long)]
        views_selector: Option<String>,

        /// Base delay between detail page requests
        #[arg(long, default_value = "250")]
        delay_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let result = match cli.command {
        Commands::Compile {
            input,
            kind,
            template,
        } => cmd_compile(&input, kind, template.as_deref()),
        Commands::Encode { input, output } => cmd_encode(&input, output.as_deref()),
        Commands::Decode { input } => cmd_decode(&input),
        Commands::Check {
            page,
            list_selector,
            item_selector,
            name_selector,
            link_selector,
            duration_selector,
            rating_selector,
            tag_template,
            settings,
            prefix,
            restore,
            set,
            save,
            fetch,
            detail_selector,
            views_selector,
            delay_ms,
        } => {
            let mut opts = CheckOptions::new(page, &list_selector, &item_selector, &name_selector);
            opts.link_selector = link_selector;
            opts.duration_selector = duration_selector;
            opts.rating_selector = rating_selector;
            opts.tag_template = tag_template;
            opts.settings_dir = settings;
            opts.prefix = prefix;
            opts.restore = restore;
            opts.set = set;
            opts.save = save;
            opts.fetch_base = fetch;
            opts.detail_selector = detail_selector;
            opts.views_selector = views_selector;
            opts.request_delay = Duration::from_millis(delay_ms);
            run_check(opts, cli.verbose)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_rules(path: &str) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(split_lines(&content))
}

fn cmd_compile(input: &str, kind: RuleKind, template: Option<&str>) -> Result<(), String> {
    let rules = read_rules(input)?;
    println!("Compiled {} rules from '{}'", rules.len(), input);

    match kind {
        RuleKind::Tags => {
            let clauses = match template {
                Some(template) => compile_tag_ruleset(&rules, &|tag: &str| selector_from_template(template, tag)),
                None => compile_tag_ruleset(&rules, &|tag: &str| tag.to_string()),
            };
            println!("  Clauses:  {}", clauses.len());
            for clause in &clauses {
                println!("    {}", clause.join(" + "));
            }
        }
        RuleKind::Words => match build_whole_word_pattern(&rules).map_err(|e| e.to_string())? {
            Some(pattern) => println!("  Pattern:  {}", pattern.as_str()),
            None => println!("  Pattern:  (none)"),
        },
        RuleKind::Sanitize => {
            let substitutions =
                compile_substitutions(&parse_sanitization_rules(&rules)).map_err(|e| e.to_string())?;
            println!("  Substitutions: {}", substitutions.len());
            for substitution in &substitutions {
                println!("    {:?} <- {}", substitution.substitute, substitution.pattern.as_str());
            }
        }
    }

    Ok(())
}

fn cmd_encode(input: &str, output: Option<&str>) -> Result<(), String> {
    let content = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in '{}': {}", input, e))?;
    let Value::Object(settings) = value else {
        return Err(format!("'{}' must contain a JSON object", input));
    };

    let encoded = codec::encode(&settings);
    match output {
        Some(path) => {
            fs::write(path, &encoded).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            println!("Encoded {} settings to '{}'", settings.len(), path);
        }
        None => println!("{}", encoded),
    }
    Ok(())
}

fn cmd_decode(input: &str) -> Result<(), String> {
    let content = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input, e))?;
    let settings = codec::decode(content.trim()).map_err(|e| format!("Invalid settings in '{}': {}", input, e))?;
    let pretty = serde_json::to_string_pretty(&Value::Object(settings)).map_err(|e| e.to_string())?;
    println!("{}", pretty);
    Ok(())
}
