//
// bin/xmlcat.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Small command-line demonstrator for the library: pretty-prints an
//! XML file, runs an XPath selection against it, or evaluates a
//! matching-item rule file against `name=value` parameters supplied on
//! the command line.
//!

use clap::{Parser, Subcommand};
use paramatch::dom;
use paramatch::matching::{load_from_xml_string, LoadFlags, MatchContext};
use paramatch::param::ParamMap;
use paramatch::xpath;
use std::error::Error;
use std::fs;

#[derive(Parser)]
#[command(name = "xmlcat", about = "Pretty-print, XPath-select, or rule-match an XML document")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pretty-print an XML document.
    Pretty {
        file: String,
        /// Attribute names to mask as "***" in the output.
        #[arg(long = "mask", value_name = "ATTR")]
        mask: Vec<String>,
    },
    /// Evaluate an XPath expression against an XML document and print
    /// each matching node, attribute, or text leaf.
    Xpath { file: String, path: String },
    /// Load a matching-item rule from an XML file and evaluate it
    /// against `name=value` parameters.
    Match {
        rule_file: String,
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("xmlcat: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Pretty { file, mask } => pretty(&file, &mask),
        Command::Xpath { file, path } => run_xpath(&file, &path),
        Command::Match { rule_file, params } => run_match(&rule_file, &params),
    }
}

fn pretty(file: &str, mask: &[String]) -> Result<(), Box<dyn Error>> {
    let xml_string = fs::read_to_string(file)?;
    let doc = dom::new_document(&xml_string)?;
    let mut options = dom::SerializeOptions::pretty();
    for name in mask {
        options = options.mask(name.clone());
    }
    println!("{}", doc.serialize(&options));
    Ok(())
}

fn run_xpath(file: &str, path: &str) -> Result<(), Box<dyn Error>> {
    let xml_string = fs::read_to_string(file)?;
    let doc = dom::new_document(&xml_string)?;
    let root = doc.root_element().ok_or("document has no root element")?;
    for value in xpath::select(path, &root)? {
        match value {
            xpath::XPathValue::Element(e) => println!("{}", e.to_string()),
            xpath::XPathValue::Attribute(name, value) => println!("@{}={}", name, value),
            xpath::XPathValue::Text(text) => println!("{}", text),
        }
    }
    Ok(())
}

fn run_match(rule_file: &str, raw_params: &[String]) -> Result<(), Box<dyn Error>> {
    let rule_xml = fs::read_to_string(rule_file)?;
    let item = load_from_xml_string(&rule_xml, LoadFlags::default())?;

    let mut params = ParamMap::new();
    for entry in raw_params {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, found '{}'", entry))?;
        params.add(name, value);
    }

    let ctx = MatchContext::new();
    match item.eval_match(&mut params, &ctx) {
        Some(matched) => {
            println!("match: {}", paramatch::matching::dump_text(matched, &paramatch::matching::DumpOptions::default()));
            Ok(())
        }
        None => {
            println!("no match");
            std::process::exit(1);
        }
    }
}
