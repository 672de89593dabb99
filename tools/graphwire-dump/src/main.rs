// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! graphwire-dump - Print the field structure of a graphwire stream
//!
//! Works without the writer's types: every field is decoded from its wire
//! type alone, so any stream can be inspected.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use graphwire::wire::dump::{dump_buf, TokenPayload, WireToken};
use graphwire::CodecConfig;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

/// Dump a graphwire stream
#[derive(Parser, Debug)]
#[command(name = "graphwire-dump")]
#[command(version)]
#[command(about = "Print the field structure of a graphwire stream")]
struct Args {
    /// Input file (stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Input is hex text (whitespace ignored) instead of raw bytes
    #[arg(long)]
    hex: bool,

    /// Output format: pretty, plain, json
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Maximum object nesting
    #[arg(long, default_value_t = graphwire::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Pretty,
    Plain,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "plain" => Ok(OutputFormat::Plain),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Serialize)]
struct JsonToken {
    depth: usize,
    field_id: u32,
    wire_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracked_id: Option<u32>,
    payload: serde_json::Value,
}

impl From<&WireToken> for JsonToken {
    fn from(token: &WireToken) -> Self {
        let payload = match &token.payload {
            TokenPayload::VarInt(v) => serde_json::json!(v),
            TokenPayload::Bytes(b) => match std::str::from_utf8(b) {
                Ok(text) => serde_json::json!(text),
                Err(_) => serde_json::json!(b.to_vec()),
            },
            TokenPayload::Fixed32(v) => serde_json::json!(v),
            TokenPayload::Fixed64(v) => serde_json::json!(v),
            TokenPayload::Fixed128(v) => serde_json::json!(v.to_string()),
            TokenPayload::Reference(id) => serde_json::json!({ "ref": id }),
            TokenPayload::BeginObject => serde_json::json!("begin"),
            TokenPayload::EndObject => serde_json::json!("end"),
        };
        Self {
            depth: token.depth,
            field_id: token.field_id,
            wire_type: format!("{:?}", token.header.wire_type),
            type_tag: token.type_tag().map(ToString::to_string),
            tracked_id: token.header.tracked_id,
            payload,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let raw = read_input(args.input.as_ref())?;
    let bytes = if args.hex { parse_hex(&raw)? } else { raw };
    log::debug!("[dump] {} input bytes", bytes.len());

    let config = CodecConfig::default().with_max_depth(args.max_depth);
    let mut input = &bytes[..];
    let tokens = dump_buf(&mut input, config).context("stream is malformed")?;

    match args.format {
        OutputFormat::Json => {
            let json: Vec<JsonToken> = tokens.iter().map(JsonToken::from).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for token in &tokens {
                println!("{}", token);
            }
        }
        OutputFormat::Pretty => {
            for token in &tokens {
                print_pretty(token);
            }
            eprintln!(
                "{}",
                format!("    {} tokens, {} bytes", tokens.len(), bytes.len()).dimmed()
            );
        }
    }
    Ok(())
}

fn print_pretty(token: &WireToken) {
    let line = token.to_string();
    let colored = match token.payload {
        TokenPayload::BeginObject | TokenPayload::EndObject => line.cyan(),
        TokenPayload::Reference(_) => line.yellow(),
        _ if token.header.type_tag.is_some() => line.green(),
        _ => line.normal(),
    };
    println!("{}", colored);
}

fn read_input(path: Option<&PathBuf>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match path {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?
                .read_to_end(&mut bytes)?;
        }
        _ => {
            std::io::stdin().read_to_end(&mut bytes)?;
        }
    }
    Ok(bytes)
}

fn parse_hex(text: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).context("hex input is not ASCII")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex byte '{}'", pair))
        })
        .collect()
}
