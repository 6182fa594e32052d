// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod interrupt;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use coursecheck_adapters::{Capabilities, DeniedNetwork, Network, RealFs, RealNetwork};
use coursecheck_core::{
    catalog, exit_code_for_report, render_json, render_text, run_passes, RunRequest, Selectors,
};
use coursecheck_model::PassId;

use crate::logging::{init_tracing, LogFormat};

const DEFAULT_CORPUS_ROOT: &str = "courses/n8n_no_code";
const EXIT_USAGE: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "coursecheck", version)]
#[command(about = "Checks a course corpus for broken references and drift between lessons and workflows")]
struct Cli {
    /// Corpus root holding `book/` and the optional `coursecheck.toml`.
    #[arg(default_value = DEFAULT_CORPUS_ROOT)]
    root: PathBuf,
    /// Also probe every external URL over the network.
    #[arg(long)]
    live_urls: bool,
    /// Run only these passes (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "PASS")]
    only: Vec<String>,
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
    /// Config file to use instead of `<ROOT>/coursecheck.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
    /// Print the pass catalog and exit.
    #[arg(long)]
    list_passes: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

fn render_catalog() -> String {
    catalog()
        .iter()
        .map(|spec| {
            format!(
                "{:<12} {:<8} {}",
                spec.id.as_str(),
                if spec.default_enabled { "default" } else { "opt-in" },
                spec.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_only(raw: &[String]) -> Result<Vec<PassId>, String> {
    let mut ids = Vec::new();
    for value in raw {
        let id = PassId::parse(value)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn run(cli: Cli) -> i32 {
    if cli.list_passes {
        println!("{}", render_catalog());
        return 0;
    }
    let only = match parse_only(&cli.only) {
        Ok(only) => only,
        Err(err) => {
            eprintln!("coursecheck: {err}");
            return EXIT_USAGE;
        }
    };
    let allow_network = cli.live_urls || only.contains(&PassId::LiveUrls);
    let network: Box<dyn Network> = if allow_network {
        match RealNetwork::new() {
            Ok(network) => Box::new(network),
            Err(err) => {
                eprintln!("coursecheck: {err}");
                return EXIT_USAGE;
            }
        }
    } else {
        Box::new(DeniedNetwork)
    };

    let request = RunRequest {
        corpus_root: cli.root,
        config_path: cli.config,
        capabilities: Capabilities::from_cli_flags(allow_network),
    };
    let selectors = Selectors {
        only,
        include_opt_in: cli.live_urls,
    };
    let cancel = interrupt::install();

    let outcome = match run_passes(&RealFs, network.as_ref(), &request, &selectors, &cancel) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("coursecheck: {err}");
            return EXIT_USAGE;
        }
    };
    for (id, reason) in &outcome.passes_skipped {
        tracing::info!(pass = %id, reason = %reason, "pass skipped");
    }

    let rendered = match cli.format {
        FormatArg::Text => Ok(render_text(&outcome.report)),
        FormatArg::Json => render_json(&outcome.report),
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("coursecheck: report rendering failed: {err}");
            return EXIT_USAGE;
        }
    }

    if outcome.interrupted {
        eprintln!("coursecheck: interrupted; report covers completed passes only");
        return EXIT_INTERRUPTED;
    }
    exit_code_for_report(&outcome.report)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    process::exit(run(cli));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_accepts_known_ids_once() {
        let ids = parse_only(&["toc".to_string(), "naming".to_string(), "toc".to_string()])
            .expect("ids");
        assert_eq!(ids, vec![PassId::Toc, PassId::Naming]);
        assert!(parse_only(&["spelling".to_string()]).is_err());
    }

    #[test]
    fn catalog_marks_opt_in_passes() {
        let text = render_catalog();
        assert_eq!(text.lines().count(), PassId::ALL.len());
        assert!(text
            .lines()
            .any(|line| line.starts_with("live-urls") && line.contains("opt-in")));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["coursecheck"]);
        assert_eq!(cli.root, PathBuf::from(DEFAULT_CORPUS_ROOT));
        assert_eq!(cli.format, FormatArg::Text);
        assert!(!cli.live_urls);
        let cli = Cli::parse_from(["coursecheck", "x", "--only", "toc,naming", "--format", "json"]);
        assert_eq!(cli.only, vec!["toc".to_string(), "naming".to_string()]);
        assert_eq!(cli.format, FormatArg::Json);
    }
}
