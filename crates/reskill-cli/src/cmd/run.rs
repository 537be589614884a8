use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use prompt_runner::{CliProcessRunner, PromptRequest, Session};
use reskill_core::ModelSpec;

#[derive(clap::Args)]
pub struct RunArgs {
    /// Template name, resolved against the search paths (`.md` appended
    /// when no extension is given)
    template: String,

    /// Template variable as KEY=VALUE; the value is parsed as JSON when it
    /// parses, otherwise taken as a string. Repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Comma-separated model rotation, first-to-last priority
    #[arg(long, default_value = reskill_core::DEFAULT_MODELS)]
    models: String,

    /// Keep the session open for human follow-up turns after each answer
    /// (type 'exit' or 'quit' to finish)
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Template search directory, tried in order. Repeatable.
    /// Defaults to ./prompts then the current directory.
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Model CLI executable
    #[arg(long, default_value = "gemini")]
    executable: String,

    /// Render and print the final prompt without invoking any model
    #[arg(long)]
    print_prompt: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let request = PromptRequest {
        template_name: args.template,
        variables: parse_vars(&args.vars)?,
        models: ModelSpec::Csv(args.models).resolve(),
        interactive: args.interactive,
    };

    let search_paths = if args.search_paths.is_empty() {
        vec![PathBuf::from("prompts"), PathBuf::from(".")]
    } else {
        args.search_paths
    };

    let session = Session::new(search_paths)
        .with_runner(Arc::new(CliProcessRunner::new(args.executable)));

    if args.print_prompt {
        let prompt = session.render_only(&request).await?;
        println!("{prompt}");
        return Ok(());
    }

    // Model output is already mirrored live by the process runner.
    session.run(&request).await?;
    Ok(())
}

fn parse_vars(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut vars = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("invalid --var '{pair}': expected KEY=VALUE");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        vars.insert(key.to_string(), value);
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_vars_strings_and_json() {
        let vars = parse_vars(&[
            "name=World".to_string(),
            "count=3".to_string(),
            "patterns=[\"a\",\"b\"]".to_string(),
        ])
        .unwrap();
        assert_eq!(vars["name"], json!("World"));
        assert_eq!(vars["count"], json!(3));
        assert_eq!(vars["patterns"], json!(["a", "b"]));
    }

    #[test]
    fn parse_vars_value_may_contain_equals() {
        let vars = parse_vars(&["expr=a=b".to_string()]).unwrap();
        assert_eq!(vars["expr"], json!("a=b"));
    }

    #[test]
    fn parse_vars_rejects_missing_equals() {
        assert!(parse_vars(&["justakey".to_string()]).is_err());
    }
}
