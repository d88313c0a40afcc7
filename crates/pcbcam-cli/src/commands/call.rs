//! Procedure invocation commands: call, upload, walk.

use std::path::Path;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use humansize::{format_size, DECIMAL};
use pcbcam_client::{ClientConfig, FilePart, FormPayload};
use serde_json::{Map, Value};
use tracing::info;

use super::connect;
use crate::session::CliSession;

/// Build call arguments from `--data` JSON and `--arg key=value` pairs.
///
/// Pair values are parsed as JSON when possible (`page=2` is a number) and
/// kept as strings otherwise. Pairs override keys from `--data`.
pub fn build_args(data: Option<&str>, pairs: &[String]) -> Result<Value> {
    let base = match data {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
        None => Value::Object(Map::new()),
    };
    if pairs.is_empty() {
        return Ok(base);
    }

    let Value::Object(mut args) = base else {
        anyhow::bail!("--arg can only be combined with a JSON object in --data");
    };
    for pair in pairs {
        let (key, value) = parse_pair(pair)?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        args.insert(key.to_string(), value);
    }
    Ok(Value::Object(args))
}

/// Split a `key=value` pair.
pub fn parse_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => anyhow::bail!("Expected key=value, got: {}", pair),
    }
}

/// Invoke a procedure with JSON arguments and print the payload.
pub async fn execute(
    config: &ClientConfig,
    session: &CliSession,
    namespace: &str,
    procedure: &str,
    args: Value,
) -> Result<()> {
    let client = connect(config, session).await?;
    let procedure = client.procedure(namespace, procedure)?;

    let payload = procedure
        .call(args)
        .await
        .with_context(|| format!("{} failed", procedure))?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Upload a file (plus text fields) as a multipart form.
pub async fn upload(
    config: &ClientConfig,
    session: &CliSession,
    namespace: &str,
    procedure: &str,
    file: &Path,
    fields: &[String],
) -> Result<()> {
    let client = connect(config, session).await?;
    let procedure = client.procedure(namespace, procedure)?;

    let file_field = procedure
        .info()
        .file_keys()
        .into_iter()
        .next()
        .unwrap_or_else(|| "file".to_string());
    let part = FilePart::from_path(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut form = FormPayload::new();
    for pair in fields {
        let (key, value) = parse_pair(pair)?;
        form = form.text(key, value);
    }
    let form = form.file(file_field, part);

    info!(
        procedure = %procedure,
        size = %format_size(form.file_bytes(), DECIMAL),
        "Uploading file"
    );
    eprintln!(
        "📤 Uploading {} ({})",
        file.display(),
        format_size(form.file_bytes(), DECIMAL)
    );

    let payload = procedure
        .call(form)
        .await
        .with_context(|| format!("{} failed", procedure))?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Print every item of a paginated procedure, one JSON document per line.
pub async fn walk(
    config: &ClientConfig,
    session: &CliSession,
    namespace: &str,
    procedure: &str,
    args: Value,
    limit: Option<usize>,
) -> Result<()> {
    let client = connect(config, session).await?;
    let procedure = client.procedure(namespace, procedure)?;

    let Value::Object(args) = args else {
        anyhow::bail!("walk arguments must be a JSON object");
    };

    let mut items = procedure.walk(args, limit);
    let mut count = 0usize;
    while let Some(item) = items.next().await {
        let item = item.with_context(|| format!("{} failed after {} items", procedure, count))?;
        println!("{}", serde_json::to_string(&item)?);
        count += 1;
    }

    info!(procedure = %procedure, count, "Walk finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_args_defaults_to_empty_object() {
        assert_eq!(build_args(None, &[]).unwrap(), json!({}));
    }

    #[test]
    fn test_build_args_merges_pairs() {
        let pairs = vec![
            "page=2".to_string(),
            "name=my board".to_string(),
            "flags=[1,2]".to_string(),
            "side=top".to_string(),
        ];
        let args = build_args(Some(r#"{"page": 1, "limit": 10}"#), &pairs).unwrap();
        assert_eq!(
            args,
            json!({"page": 2, "limit": 10, "name": "my board", "flags": [1, 2], "side": "top"})
        );
    }

    #[test]
    fn test_build_args_errors() {
        assert!(build_args(Some("{nope"), &[]).is_err());
        assert!(build_args(Some("[1]"), &["a=1".to_string()]).is_err());
        assert!(build_args(None, &["novalue".to_string()]).is_err());
        assert!(build_args(None, &["=1".to_string()]).is_err());

        // A non-object body is fine on its own.
        assert_eq!(build_args(Some("[1]"), &[]).unwrap(), json!([1]));
    }

    #[test]
    fn test_parse_pair_keeps_later_equals() {
        assert_eq!(parse_pair("q=a=b").unwrap(), ("q", "a=b"));
        assert_eq!(parse_pair("empty=").unwrap(), ("empty", ""));
    }
}
