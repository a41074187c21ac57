//! Script parser
//!
//! Turns one line of script text into a [`Command`].
//!
//! ## Grammar
//! ```text
//! insert|upsert|replace|merge <table> <pk> <rk> [name=value ...]
//! delete <table> <pk> <rk>
//! delete-all <table> <pk>
//! commit [individually|batches|atomically]
//! get <table> <pk> <rk>
//! query <table> [pk<op>value] [rk<op>value] [top=n]     op: = >= > <= <
//! ```
//!
//! Tokens are separated by whitespace; double quotes group a token and force
//! a string value. `#` outside quotes starts a comment. Unquoted values are
//! typed by their literal: `true`/`false`, integers (Int64), decimals
//! (Double), otherwise String.

use crate::entity::{PropertyMap, PropertyValue};
use crate::error::{Result, TableError};
use crate::operation::{Execute, OperationKind};
use crate::query::{KeyBound, KeyRange, QueryDescriptor};

use super::{Command, CommandType};

/// A whitespace-separated word; `quoted` is set if any part was in quotes
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

// =============================================================================
// Lines
// =============================================================================

/// Parse one line. Blank lines and comments yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line).map_err(|m| script_error(line_no, m))?;
    let Some((head, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let ty = CommandType::from_keyword(&head.text)
        .ok_or_else(|| script_error(line_no, format!("unknown command '{}'", head.text)))?;

    parse_command(ty, args).map(Some).map_err(|m| script_error(line_no, m))
}

fn parse_command(ty: CommandType, args: &[Token]) -> std::result::Result<Command, String> {
    let command = match ty {
        CommandType::Insert | CommandType::Upsert | CommandType::Replace | CommandType::Merge => {
            let [table, pk, rk, rest @ ..] = args else {
                return Err(format!("expected <table> <pk> <rk> after {:?}", ty));
            };
            Command::Write {
                kind: write_kind(ty),
                table: table.text.clone(),
                partition_key: pk.text.clone(),
                row_key: rk.text.clone(),
                properties: parse_properties(rest)?,
            }
        }
        CommandType::Delete => {
            let [table, pk, rk] = args else {
                return Err("expected delete <table> <pk> <rk>".to_string());
            };
            Command::Delete {
                table: table.text.clone(),
                partition_key: pk.text.clone(),
                row_key: rk.text.clone(),
            }
        }
        CommandType::DeleteAll => {
            let [table, pk] = args else {
                return Err("expected delete-all <table> <pk>".to_string());
            };
            Command::DeleteAll {
                table: table.text.clone(),
                partition_key: pk.text.clone(),
            }
        }
        CommandType::Commit => {
            let mode = match args {
                [] => Execute::Individually,
                [mode] => parse_mode(&mode.text)?,
                _ => return Err("expected commit [individually|batches|atomically]".to_string()),
            };
            Command::Commit { mode }
        }
        CommandType::Get => {
            let [table, pk, rk] = args else {
                return Err("expected get <table> <pk> <rk>".to_string());
            };
            Command::Get {
                table: table.text.clone(),
                partition_key: pk.text.clone(),
                row_key: rk.text.clone(),
            }
        }
        CommandType::Query => {
            let [table, filters @ ..] = args else {
                return Err("expected query <table> [filters]".to_string());
            };
            Command::Query {
                table: table.text.clone(),
                descriptor: parse_filters(filters)?,
            }
        }
    };
    Ok(command)
}

fn write_kind(ty: CommandType) -> OperationKind {
    match ty {
        CommandType::Upsert => OperationKind::Upsert,
        CommandType::Replace => OperationKind::Replace,
        CommandType::Merge => OperationKind::Merge,
        _ => OperationKind::Insert,
    }
}

fn parse_mode(word: &str) -> std::result::Result<Execute, String> {
    match word {
        "individually" => Ok(Execute::Individually),
        "batches" => Ok(Execute::InBatches),
        "atomically" => Ok(Execute::Atomically),
        other => Err(format!("unknown commit mode '{}'", other)),
    }
}

fn script_error(line: usize, message: String) -> TableError {
    TableError::Script { line, message }
}

// =============================================================================
// Tokens
// =============================================================================

fn tokenize(line: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.get_or_insert_with(empty_token).quoted = true;
            }
            '#' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => {
                if let Some(token) = current.take() {
                    tokens.push(token);
                }
            }
            c => current.get_or_insert_with(empty_token).text.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    tokens.extend(current);
    Ok(tokens)
}

fn empty_token() -> Token {
    Token {
        text: String::new(),
        quoted: false,
    }
}

// =============================================================================
// Properties
// =============================================================================

fn parse_properties(tokens: &[Token]) -> std::result::Result<PropertyMap, String> {
    let mut properties = PropertyMap::new();
    for token in tokens {
        let Some((name, raw)) = token.text.split_once('=') else {
            return Err(format!("expected name=value, found '{}'", token.text));
        };
        if name.is_empty() {
            return Err(format!("missing property name in '{}'", token.text));
        }
        let value = if token.quoted {
            PropertyValue::String(raw.to_string())
        } else {
            parse_value(raw)
        };
        if properties.insert(name.to_string(), value).is_some() {
            return Err(format!("property '{}' given twice", name));
        }
    }
    Ok(properties)
}

/// Type an unquoted literal
pub fn parse_value(raw: &str) -> PropertyValue {
    match raw {
        "true" => return PropertyValue::Boolean(true),
        "false" => return PropertyValue::Boolean(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return PropertyValue::Int64(n);
    }
    if raw.contains('.') {
        if let Ok(x) = raw.parse::<f64>() {
            return PropertyValue::Double(x);
        }
    }
    PropertyValue::String(raw.to_string())
}

// =============================================================================
// Query Filters
// =============================================================================

fn parse_filters(tokens: &[Token]) -> std::result::Result<QueryDescriptor, String> {
    let mut descriptor = QueryDescriptor::default();

    for token in tokens {
        let text = token.text.as_str();
        if let Some(count) = text.strip_prefix("top=") {
            let count = count
                .parse::<usize>()
                .map_err(|_| format!("top expects a count, found '{}'", count))?;
            descriptor.top_count = Some(count);
            continue;
        }

        let (range, rest) = if let Some(rest) = text.strip_prefix("pk") {
            (&mut descriptor.partition_key_range, rest)
        } else if let Some(rest) = text.strip_prefix("rk") {
            (&mut descriptor.row_key_range, rest)
        } else {
            return Err(format!("unknown filter '{}'", text));
        };
        apply_filter(range, rest).map_err(|m| format!("{} in '{}'", m, text))?;
    }

    Ok(descriptor)
}

fn apply_filter(range: &mut KeyRange, filter: &str) -> std::result::Result<(), String> {
    // Two-character operators first so ">=" isn't read as ">"
    let (op, value) = [">=", "<=", "=", ">", "<"]
        .iter()
        .find_map(|op| filter.strip_prefix(op).map(|value| (*op, value)))
        .ok_or_else(|| "expected one of = >= > <= <".to_string())?;

    let set_lower = op == "=" || op.starts_with('>');
    let set_upper = op == "=" || op.starts_with('<');
    if (set_lower && range.lower.is_some()) || (set_upper && range.upper.is_some()) {
        return Err("bound given twice".to_string());
    }

    match op {
        "=" => *range = KeyRange::exact(value),
        ">=" => range.lower = Some(KeyBound::inclusive(value)),
        ">" => range.lower = Some(KeyBound::exclusive(value)),
        "<=" => range.upper = Some(KeyBound::inclusive(value)),
        _ => range.upper = Some(KeyBound::exclusive(value)),
    }
    Ok(())
}
