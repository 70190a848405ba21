//! Annotation block parser.
//!
//! The grammar, one annotation per line:
//!
//! ```text
//! @collection <name>
//! @connection <name>
//! @property <type>[(<size>)] <name> [- [<alias>] [<default>] [null|unique]...]
//! ```
//!
//! The field alias is the first bare token of the options region, whether it
//! appears before or after the `-` separator. A `<...>` token anywhere in
//! the options region is the default value. All other bare tokens must be
//! the `null` or `unique` flags.

use super::{ModelSchema, PropertySpec};
use crate::error::{CoreError, CoreResult};
use rowmap_storage::{parse_date_time, PropertyType, Value};
use std::collections::HashSet;

impl ModelSchema {
    /// Parses an annotation block into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] on malformed lines, unknown option
    /// tokens, duplicate property names or duplicate aliases, or when the
    /// block declares no properties at all.
    pub fn parse(model: &str, block: &str) -> CoreResult<Self> {
        let mut collection = None;
        let mut connection = None;
        let mut properties: Vec<PropertySpec> = Vec::new();

        for raw in block.lines() {
            let line = raw
                .trim()
                .trim_start_matches(['/', '*'])
                .trim();
            let Some(rest) = line.strip_prefix('@') else {
                continue;
            };
            if let Some(name) = rest.strip_prefix("collection") {
                collection = Some(annotation_argument(model, "collection", name)?);
            } else if let Some(name) = rest.strip_prefix("connection") {
                connection = Some(annotation_argument(model, "connection", name)?);
            } else if let Some(declaration) = rest.strip_prefix("property") {
                properties.push(parse_property(model, declaration.trim())?);
            }
        }

        if properties.is_empty() {
            return Err(CoreError::schema(model, "no properties declared"));
        }

        let mut names = HashSet::new();
        let mut fields = HashSet::new();
        for spec in &properties {
            if !names.insert(spec.name.as_str()) {
                return Err(CoreError::schema(
                    model,
                    format!("duplicate property: {}", spec.name),
                ));
            }
            if !fields.insert(spec.field.as_str()) {
                return Err(CoreError::schema(
                    model,
                    format!("duplicate field alias: {}", spec.field),
                ));
            }
        }

        Ok(Self::build(
            model.to_string(),
            collection,
            connection,
            properties,
        ))
    }
}

fn annotation_argument(model: &str, annotation: &str, rest: &str) -> CoreResult<String> {
    let name = rest.trim();
    if name.is_empty() || name.split_whitespace().count() != 1 {
        return Err(CoreError::schema(
            model,
            format!("@{annotation} takes exactly one name"),
        ));
    }
    Ok(name.to_string())
}

fn parse_property(model: &str, declaration: &str) -> CoreResult<PropertySpec> {
    let mut tokens = tokenize(declaration)
        .map_err(|message| CoreError::schema(model, format!("{message}: {declaration}")))?;
    if tokens.len() < 2 {
        return Err(CoreError::schema(
            model,
            format!("@property needs a type and a name: {declaration}"),
        ));
    }

    let Token::Bare(type_token) = tokens.remove(0) else {
        return Err(CoreError::schema(
            model,
            format!("@property starts with a type token: {declaration}"),
        ));
    };
    let (ty, size) = parse_type(model, &type_token)?;

    let Token::Bare(name) = tokens.remove(0) else {
        return Err(CoreError::schema(
            model,
            format!("@property needs a property name: {declaration}"),
        ));
    };

    let mut alias: Option<String> = None;
    let mut default_text: Option<String> = None;
    let mut nullable = false;
    let mut unique = false;
    let mut seen_dash = false;

    for token in tokens {
        match token {
            Token::Dash if !seen_dash => seen_dash = true,
            Token::Dash => {
                return Err(CoreError::schema(
                    model,
                    format!("repeated separator in property {name}"),
                ));
            }
            Token::Angle(text) if default_text.is_none() => default_text = Some(text),
            Token::Angle(_) => {
                return Err(CoreError::schema(
                    model,
                    format!("repeated default in property {name}"),
                ));
            }
            Token::Bare(word) => match word.as_str() {
                "null" => nullable = true,
                "unique" => unique = true,
                _ if alias.is_none() && default_text.is_none() && !nullable && !unique => {
                    alias = Some(word);
                }
                other => {
                    return Err(CoreError::schema(
                        model,
                        format!("unexpected token \"{other}\" in property {name}"),
                    ));
                }
            },
        }
    }

    let default = default_text.map_or(Value::Null, |text| coerce_default(&ty, &text));
    let field = alias.unwrap_or_else(|| name.clone());

    Ok(PropertySpec {
        name,
        ty,
        field,
        size,
        default,
        nullable,
        unique,
    })
}

fn parse_type(model: &str, token: &str) -> CoreResult<(PropertyType, Option<u32>)> {
    let Some(open) = token.find('(') else {
        return Ok((PropertyType::from_token(token), None));
    };
    let Some(inner) = token[open..].strip_prefix('(').and_then(|s| s.strip_suffix(')')) else {
        return Err(CoreError::schema(
            model,
            format!("malformed size in type token: {token}"),
        ));
    };
    let size: u32 = inner
        .parse()
        .map_err(|_| CoreError::schema(model, format!("malformed size in type token: {token}")))?;
    Ok((PropertyType::from_token(&token[..open]), Some(size)))
}

/// Coerces a default's verbatim text to the declared type where it parses;
/// otherwise the text is kept as-is.
fn coerce_default(ty: &PropertyType, text: &str) -> Value {
    match ty {
        PropertyType::Integer => text
            .parse::<i64>()
            .map_or_else(|_| Value::Text(text.to_string()), Value::Integer),
        PropertyType::Float => text
            .parse::<f64>()
            .map_or_else(|_| Value::Text(text.to_string()), Value::Float),
        PropertyType::Boolean => match text {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::Text(text.to_string()),
        },
        PropertyType::DateTime => parse_date_time(text)
            .map_or_else(|| Value::Text(text.to_string()), Value::DateTime),
        _ => Value::Text(text.to_string()),
    }
}

#[derive(Debug)]
enum Token {
    /// Whitespace-delimited word.
    Bare(String),
    /// The `-` options separator.
    Dash,
    /// `<...>` content, spaces preserved.
    Angle(String),
}

fn tokenize(declaration: &str) -> Result<Vec<Token>, &'static str> {
    let mut tokens = Vec::new();
    let mut chars = declaration.chars().peekable();
    let mut word = String::new();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                if !word.is_empty() {
                    tokens.push(Token::Bare(std::mem::take(&mut word)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '>' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err("unterminated default value");
                }
                tokens.push(Token::Angle(inner));
            }
            c if c.is_whitespace() => {
                if !word.is_empty() {
                    tokens.push(Token::Bare(std::mem::take(&mut word)));
                }
            }
            _ => word.push(c),
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Bare(word));
    }

    Ok(tokens
        .into_iter()
        .map(|token| match token {
            Token::Bare(word) if word == "-" => Token::Dash,
            other => other,
        })
        .collect())
}
