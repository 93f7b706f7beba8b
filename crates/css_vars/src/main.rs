//! Command-line front end: loads a theme configuration and prints completion or hover data.
//!
//! ```text
//! css_vars <config.json> complete <partial>
//! css_vars <config.json> hover <name>
//! ```

use anyhow::{Context as _, Result, anyhow, bail};
use css_schema::{CssSchema, HttpFetcher, SchemaConfig};
use env_logger::{Builder, Env};
use log::{debug, error};
use std::env;
use std::io::{Write as _, stdout};
use std::path::{Path, PathBuf};
use std::process::exit;
use tokio::fs::read_to_string as tokio_fs_read_to_string;

/// What to print once the schema is loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Query {
    Complete(String),
    Hover(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Invocation {
    config_path: PathBuf,
    query: Query,
}

const USAGE: &str = "usage: css_vars <config.json> (complete <partial> | hover <name>)";

/// Parse the arguments following the program name.
fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let config_path = args.next().map(PathBuf::from).context(USAGE)?;
    let command = args.next().context(USAGE)?;
    // `complete` without a partial lists every property.
    let operand = args.next();
    let query = match (command.as_str(), operand) {
        ("complete", partial) => Query::Complete(partial.unwrap_or_default()),
        ("hover", Some(name)) => Query::Hover(name),
        ("hover", None) => bail!("hover needs a property name\n{USAGE}"),
        (other, _) => bail!("unknown command \"{other}\"\n{USAGE}"),
    };
    if let Some(extra) = args.next() {
        bail!("unexpected argument \"{extra}\"\n{USAGE}");
    }
    Ok(Invocation { config_path, query })
}

async fn read_config(path: &Path) -> Result<SchemaConfig> {
    let text = tokio_fs_read_to_string(path)
        .await
        .with_context(|| format!("Failed to read configuration \"{}\"", path.display()))?;
    SchemaConfig::from_json(&text)
        .with_context(|| format!("Failed to load configuration \"{}\"", path.display()))
}

/// Load the schema described by the invocation and render the query result as JSON.
async fn run(invocation: &Invocation) -> Result<String> {
    let config = read_config(&invocation.config_path).await?;
    let schema = CssSchema::new();
    schema
        .load(&config, &HttpFetcher::default())
        .await
        .map_err(|err| anyhow!(err).context("Failed to load css schema"))?;
    debug!("Loaded themes {:?}", schema.theme_names());

    let json = match &invocation.query {
        Query::Complete(partial) => serde_json::to_string_pretty(&schema.completions(partial))?,
        Query::Hover(name) => serde_json::to_string_pretty(&schema.variable_details(name))?,
    };
    Ok(json)
}

#[tokio::main]
async fn main() {
    let _log_init: Result<(), _> = Builder::from_env(Env::default().filter_or("RUST_LOG", "warn"))
        .is_test(false)
        .try_init();

    let invocation = match parse_args(env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(err) => {
            error!("{err:#}");
            exit(1);
        }
    };
    let output = match run(&invocation).await {
        Ok(output) => output,
        Err(err) => {
            error!("{err:#}");
            exit(1);
        }
    };
    if let Err(err) = writeln!(stdout().lock(), "{output}") {
        error!("Failed to write output: {err}");
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs::write as fs_write;
    use tempfile::{NamedTempFile, tempdir};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_owned()).collect()
    }

    #[test]
    fn complete_and_hover_parse() {
        assert_eq!(
            parse_args(args(&["themes.json", "complete", "--color"])).ok(),
            Some(Invocation {
                config_path: PathBuf::from("themes.json"),
                query: Query::Complete(String::from("--color")),
            })
        );
        assert_eq!(
            parse_args(args(&["themes.json", "hover", "spacing"]))
                .ok()
                .map(|invocation| invocation.query),
            Some(Query::Hover(String::from("spacing")))
        );
    }

    #[test]
    fn complete_without_partial_lists_everything() {
        let query = parse_args(args(&["themes.json", "complete"]))
            .ok()
            .map(|invocation| invocation.query);
        assert_eq!(query, Some(Query::Complete(String::new())));
    }

    #[test]
    fn malformed_invocations_are_rejected() {
        assert!(parse_args(args(&[])).ok().is_none());
        assert!(parse_args(args(&["themes.json"])).ok().is_none());
        assert!(parse_args(args(&["themes.json", "hover"])).ok().is_none());
        assert!(parse_args(args(&["themes.json", "resolve", "--a"])).ok().is_none());
        assert!(
            parse_args(args(&["themes.json", "hover", "--a", "--b"]))
                .ok()
                .is_none()
        );
    }

    #[tokio::test]
    async fn config_file_is_read_and_validated() {
        let Ok(mut file) = NamedTempFile::new() else {
            return;
        };
        let Ok(()) = file.write_all(
            br#"{ "sourceUrl": "https://example.com/theme.css",
                  "themes": [{ "name": "Light", "selector": ":root" }] }"#,
        ) else {
            return;
        };
        let config = read_config(file.path()).await.ok();
        assert_eq!(
            config.map(|loaded| (loaded.source_url.to_string(), loaded.themes.len())),
            Some((String::from("https://example.com/theme.css"), 1))
        );
    }

    #[tokio::test]
    async fn invalid_config_is_an_error() {
        let Ok(dir) = tempdir() else {
            return;
        };
        let missing = dir.path().join("missing.json");
        assert!(read_config(&missing).await.ok().is_none());

        let invalid = dir.path().join("invalid.json");
        let Ok(()) = fs_write(&invalid, r#"{ "themes": [] }"#) else {
            return;
        };
        assert!(read_config(&invalid).await.ok().is_none());
    }

    #[tokio::test]
    async fn hover_prints_resolved_values_for_file_sources() {
        let Ok(dir) = tempdir() else {
            return;
        };
        let css_path = dir.path().join("theme.css");
        let Ok(()) = fs_write(
            &css_path,
            ":root {\n  /* @description Gap */\n  --gap: 4px;\n  --gutter: var(--gap);\n}\n",
        ) else {
            return;
        };
        let Ok(css_url) = url_for(&css_path) else {
            return;
        };
        let config_path = dir.path().join("config.json");
        let config = format!(
            r#"{{ "sourceUrl": "{css_url}", "themes": [{{ "name": "Light", "selector": ":root" }}] }}"#
        );
        let Ok(()) = fs_write(&config_path, config) else {
            return;
        };
        let invocation = Invocation {
            config_path,
            query: Query::Hover(String::from("gutter")),
        };
        let value = run(&invocation)
            .await
            .ok()
            .and_then(|output| serde_json::from_str::<Value>(&output).ok())
            .unwrap_or_default();
        assert_eq!(value["name"], "--gutter");
        assert_eq!(value["perThemeValues"][0]["value"], "4px");
        assert_eq!(value["perThemeValues"][0]["originalValue"], "var(--gap)");
    }

    fn url_for(path: &Path) -> Result<String> {
        let absolute = path
            .to_str()
            .context("temporary path is not valid UTF-8")?;
        Ok(format!("file://{absolute}"))
    }
}
