//! CLI command definitions

use clap::Args;

/// Present the current step of a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Pipeline id
    pub pipeline: String,
}

/// Submit input for the pipeline's pending step
#[derive(Debug, Args, Clone)]
pub struct SubmitCommand {
    /// Pipeline id
    pub pipeline: String,

    /// Field values (key=value)
    #[arg(value_parser = parse_key_value)]
    pub values: Vec<(String, String)>,
}

/// Discard a pipeline's persisted state
#[derive(Debug, Args, Clone)]
pub struct ResetCommand {
    /// Pipeline id
    pub pipeline: String,
}

/// List registered pipelines and their positions
#[derive(Debug, Args, Clone)]
pub struct ListCommand {}

/// Show when each pipeline last completed
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline id to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,
}

/// Parse a key=value pair
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value pair: '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in pair: '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("choice=B").unwrap(),
            ("choice".to_string(), "B".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("no-equals").is_err());
        assert!(parse_key_value("=value").is_err());
    }
}
