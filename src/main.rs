//! handlebars-dom CLI
//!
//! Usage:
//!   handlebars-dom [OPTIONS] [DOCUMENT]
//!
//! Options:
//!   -a, --action <ACTION>         Action to run: add, get, compiled, remove [default: add]
//!   -t, --template <SELECTOR>     Template key (selector of the template source)
//!   -s, --source <FILE>           Template file; loaded for add, used as the key otherwise
//!       --target <SELECTOR>       Node to render into [default: body]
//!   -d, --data <FILE>             JSON data file
//!       --data-json <JSON>        Inline JSON data
//!   -c, --config <FILE>           Default options (TOML format)
//!       --type <TYPE>             Output type: append, html, raw, compiled
//!       --remove-type <TYPE>      Removal before adding: none, same, all
//!   -v, --verbose                 Increase log verbosity
//!   -h, --help                    Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use handlebars_dom::dispatch::{OutputType, RemoveType};
use handlebars_dom::{Action, Dispatcher, Document, FileLoader, Options, Outcome, Overrides};

#[derive(Parser)]
#[command(name = "handlebars-dom")]
#[command(about = "Render Handlebars templates into HTML documents")]
struct Cli {
    /// Input HTML document (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Action to run: add, get/find, compiled/store, clear/empty/remove
    #[arg(short, long, default_value = "add")]
    action: String,

    /// Template key: a selector whose first match holds the template
    #[arg(short, long)]
    template: Option<String>,

    /// Template file: loaded by the add action, and the key for every action
    #[arg(short, long, conflicts_with = "template")]
    source: Option<PathBuf>,

    /// Selector of the node to operate on
    #[arg(long, default_value = "body")]
    target: String,

    /// JSON data file
    #[arg(short, long, conflicts_with = "data_json")]
    data: Option<PathBuf>,

    /// Inline JSON data
    #[arg(long)]
    data_json: Option<String>,

    /// Default options file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output type: append, html, raw, compiled
    #[arg(long = "type")]
    output: Option<String>,

    /// Removal before adding: none, same, all
    #[arg(long)]
    remove_type: Option<String>,

    /// Skip rendering when the template is already rendered in the target
    #[arg(long)]
    no_refill: bool,

    /// Do not keep the compiled template after rendering
    #[arg(long)]
    no_store: bool,

    /// Render even when the data is empty
    #[arg(long)]
    no_validate: bool,

    /// Keep compiled templates of removed nodes
    #[arg(long)]
    keep_compiled: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if cli.input.is_none() && io::stdin().is_terminal() {
        eprintln!("Error: no input document (pass a file or pipe HTML on stdin)");
        std::process::exit(1);
    }

    // Load default options
    let defaults = match &cli.config {
        Some(path) => match Options::from_file(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error loading options '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    let overrides = match build_overrides(&cli) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    let data = match read_data(&cli) {
        Ok(data) => data,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    // Read input
    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut doc = Document::parse(&source);
    let mut dispatcher = Dispatcher::new().with_defaults(defaults);
    let outcome = run(&cli, &mut dispatcher, &mut doc, &data, &overrides);

    match outcome {
        Outcome::Target(_) => println!("{}", doc.to_html()),
        Outcome::Nodes(nodes) => {
            for id in nodes.iter() {
                println!("{}", doc.outer_html(id));
            }
        }
        Outcome::Compiled(snapshot) => {
            for key in snapshot.keys() {
                println!("{}", key);
            }
        }
        Outcome::Raw(fragment) => println!("{}", fragment),
        Outcome::Html(fragment) => println!("{}", fragment.to_html()),
    }
}

/// Run the requested action against the first node matching `--target`
///
/// Only the add action reads `--source` from disk; the other actions use
/// the path as the template key.
fn run(
    cli: &Cli,
    dispatcher: &mut Dispatcher,
    doc: &mut Document,
    data: &Value,
    overrides: &Overrides,
) -> Outcome {
    let target = doc.select(&cli.target).first();
    match (&cli.source, Action::resolve(&cli.action)) {
        (Some(path), Some(Action::Add)) => dispatcher.add_from_source(
            &FileLoader::new(),
            doc,
            &target,
            &path.to_string_lossy(),
            data,
            overrides,
        ),
        _ => dispatcher.dispatch(
            doc,
            &target,
            &cli.action,
            template_key(cli).as_deref(),
            data,
            overrides,
        ),
    }
}

fn template_key(cli: &Cli) -> Option<String> {
    match &cli.source {
        Some(path) => Some(path.to_string_lossy().into_owned()),
        None => cli.template.clone(),
    }
}

fn build_overrides(cli: &Cli) -> Result<Overrides, String> {
    let mut overrides = Overrides::new();
    if let Some(output) = &cli.output {
        let output = OutputType::parse(output)
            .ok_or_else(|| format!("unknown output type '{}'", output))?;
        overrides = overrides.with_output(output);
    }
    if let Some(remove_type) = &cli.remove_type {
        let remove_type = RemoveType::parse(remove_type)
            .ok_or_else(|| format!("unknown remove type '{}'", remove_type))?;
        overrides = overrides.with_remove_type(remove_type);
    }
    if cli.no_refill {
        overrides = overrides.with_refill(false);
    }
    if cli.no_store {
        overrides = overrides.with_store_compiled(false);
    }
    if cli.no_validate {
        overrides = overrides.with_validate(false);
    }
    if cli.keep_compiled {
        overrides = overrides.with_delete_compiled(false);
    }
    Ok(overrides)
}

fn read_data(cli: &Cli) -> Result<Value, String> {
    let text = match (&cli.data, &cli.data_json) {
        (Some(path), _) => fs::read_to_string(path)
            .map_err(|e| format!("reading data file '{}': {}", path.display(), e))?,
        (None, Some(json)) => json.clone(),
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON data: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("handlebars-dom").chain(args.iter().copied()))
    }

    const RENDERED: &str = concat!(
        r#"<div id="out">"#,
        r#"<div data-template-id="row.hbs"><em>a</em></div>"#,
        r##"<div data-template-id="#t"><b>b</b></div>"##,
        r#"</div>"#,
    );

    #[test]
    fn test_source_with_remove_removes_instead_of_adding() {
        let cli = cli(&["--action", "remove", "--source", "row.hbs", "--target", "#out"]);
        let mut doc = Document::parse(RENDERED);
        let mut dispatcher = Dispatcher::new();

        let outcome = run(&cli, &mut dispatcher, &mut doc, &Value::Null, &Overrides::new());

        assert!(outcome.target().is_some());
        assert_eq!(
            doc.to_html(),
            r##"<div id="out"><div data-template-id="#t"><b>b</b></div></div>"##
        );
    }

    #[test]
    fn test_source_with_get_filters_by_path() {
        let cli = cli(&["-a", "find", "-s", "row.hbs", "--target", "#out"]);
        let mut doc = Document::parse(RENDERED);
        let mut dispatcher = Dispatcher::new();

        let outcome = run(&cli, &mut dispatcher, &mut doc, &Value::Null, &Overrides::new());

        assert_eq!(outcome.nodes().map(|nodes| nodes.len()), Some(1));
        assert_eq!(doc.to_html(), RENDERED);
    }

    #[test]
    fn test_source_with_add_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("row.hbs");
        std::fs::write(&path, "<em>{{name}}</em>").unwrap();
        let path = path.to_string_lossy().into_owned();
        let cli = cli(&["--source", &path, "--target", "#out"]);
        let mut doc = Document::parse(r#"<div id="out"></div>"#);
        let mut dispatcher = Dispatcher::new();

        run(&cli, &mut dispatcher, &mut doc, &json!({"name": "z"}), &Overrides::new());

        let out = doc.select("#out").nodes()[0];
        assert_eq!(doc.text_content(out), "z");
        assert!(dispatcher.cache().contains(&path));
    }

    #[test]
    fn test_template_key_prefers_source() {
        assert_eq!(template_key(&cli(&["-t", "#t1"])), Some("#t1".to_string()));
        assert_eq!(
            template_key(&cli(&["-s", "a.hbs"])),
            Some("a.hbs".to_string())
        );
        assert_eq!(template_key(&cli(&[])), None);
    }
}
