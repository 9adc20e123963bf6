use anyhow::{bail, Result};
use log::info;
use serde::Serialize;
use std::env;
use std::path::Path;

use record_linkage::{
    compare_tables, fix_con_to_com, fuzzy_dedupe, keep_valid_email, load_csv, write_csv,
    CompareOptions, DedupeEngine, DedupeOptions, FuzzyOptions, KeyPair, Value,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    match args[0].as_str() {
        "dedupe" => run_dedupe(&args[1..]),
        "fuzzy-dedupe" => run_fuzzy_dedupe(&args[1..]),
        "compare" => run_compare(&args[1..]),
        "emails" => run_emails(&args[1..]),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => bail!("unknown command: {} (try 'record-linkage help')", other),
    }
}

fn print_usage() {
    println!("record-linkage - dedupe, fuzzy-match, and clean tabular records");
    println!();
    println!("USAGE:");
    println!("  record-linkage dedupe <in.csv> <out.csv> --keys=A,B [options]");
    println!("  record-linkage fuzzy-dedupe <in.csv> <out.csv> --keys=A,B [options]");
    println!("  record-linkage compare <left.csv> <right.csv> <out.csv> --keys=A=B,C [options]");
    println!("  record-linkage emails <in.csv> <out.csv> --column=Email [options]");
    println!();
    println!("OPTIONS:");
    println!("  --keys=A,B          key columns (compare: LEFT=RIGHT pairs)");
    println!("  --sort=COL          sort column for rank/collapse");
    println!("  --descending        sort descending");
    println!("  --keep-all          keep every row instead of one per group");
    println!("  --rank              add a per-group Rank column");
    println!("  --keep-id           keep the Dedupe_ID column");
    println!("  --simplify=A,B      strip key columns to alphanumerics first");
    println!("  --threshold=0.9     fuzzy similarity threshold");
    println!("  --window=5          fuzzy n-gram window");
    println!("  --simplify-keys     (compare) simplify the composite key");
    println!("  --bring-over=X,Y    (compare) copy columns from the right table");
    println!("  --column=Email      (emails) column to validate");
    println!("  --loose             (emails) loose validation rules");
    println!("  --fix-con           (emails) repair trailing .CON typos");
    println!("  --summary           print a JSON summary to stdout");
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{}=", name);
    args.iter()
        .find(|a| a.starts_with(&prefix))
        .map(|a| a[prefix.len()..].to_string())
}

fn has_flag(args: &[String], name: &str) -> bool {
    let bare = format!("--{}", name);
    args.iter().any(|a| *a == bare)
}

fn positional(args: &[String], count: usize) -> Result<Vec<&String>> {
    let found: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    if found.len() != count {
        bail!("expected {} file argument(s), got {}", count, found.len());
    }
    Ok(found)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// SUMMARY OUTPUT
// ============================================================================

#[derive(Serialize)]
struct RunSummary {
    command: String,
    rows_in: usize,
    rows_out: usize,
}

fn emit_summary(args: &[String], command: &str, rows_in: usize, rows_out: usize) -> Result<()> {
    if has_flag(args, "summary") {
        let summary = RunSummary {
            command: command.to_string(),
            rows_in,
            rows_out,
        };
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_dedupe(args: &[String]) -> Result<()> {
    let files = positional(args, 2)?;
    let keys = match flag_value(args, "keys") {
        Some(value) => split_list(&value),
        None => bail!("dedupe requires --keys=COL[,COL...]"),
    };

    let table = load_csv(Path::new(files[0]))?;
    info!("Loaded {} record(s) from {}", table.len(), files[0]);

    let mut options = DedupeOptions::new(keys);
    if let Some(sort) = flag_value(args, "sort") {
        options = options.with_sort(&sort, !has_flag(args, "descending"));
    }
    if let Some(simplify) = flag_value(args, "simplify") {
        options = options.with_simplify(split_list(&simplify));
    }
    if has_flag(args, "keep-all") {
        options = options.keep_all_rows();
    }
    if has_flag(args, "rank") {
        options = options.with_rank();
    }
    if has_flag(args, "keep-id") {
        options = options.keep_dedupe_id();
    }

    let result = DedupeEngine::new(options).dedupe(&table)?;
    info!("Deduped to {} record(s)", result.len());

    write_csv(&result, Path::new(files[1]))?;
    emit_summary(args, "dedupe", table.len(), result.len())
}

fn run_fuzzy_dedupe(args: &[String]) -> Result<()> {
    let files = positional(args, 2)?;
    let keys = match flag_value(args, "keys") {
        Some(value) => split_list(&value),
        None => bail!("fuzzy-dedupe requires --keys=COL[,COL...]"),
    };

    let mut options = FuzzyOptions::new();
    if let Some(threshold) = flag_value(args, "threshold") {
        options = options.with_threshold(threshold.parse()?);
    }
    if let Some(window) = flag_value(args, "window") {
        options = options.with_window(window.parse()?);
    }

    let table = load_csv(Path::new(files[0]))?;
    info!("Loaded {} record(s) from {}", table.len(), files[0]);

    let result = fuzzy_dedupe(&table, &keys, &options)?;
    info!("Fuzzy grouping complete ({} record(s))", result.len());

    write_csv(&result, Path::new(files[1]))?;
    emit_summary(args, "fuzzy-dedupe", table.len(), result.len())
}

fn run_compare(args: &[String]) -> Result<()> {
    let files = positional(args, 3)?;
    let keys: Vec<KeyPair> = match flag_value(args, "keys") {
        Some(value) => split_list(&value)
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((left, right)) => KeyPair::new(left, right),
                None => KeyPair::same(entry),
            })
            .collect(),
        None => bail!("compare requires --keys=LEFT[=RIGHT][,...]"),
    };

    let mut options = CompareOptions::new();
    if has_flag(args, "simplify-keys") {
        options = options.simplify_keys();
    }
    if let Some(bring) = flag_value(args, "bring-over") {
        options = options.bring_over(split_list(&bring));
    }

    let left = load_csv(Path::new(files[0]))?;
    let right = load_csv(Path::new(files[1]))?;
    info!(
        "Comparing {} record(s) against {}",
        left.len(),
        right.len()
    );

    let result = compare_tables(&left, &right, &keys, &options)?;
    write_csv(&result, Path::new(files[2]))?;
    emit_summary(args, "compare", left.len(), result.len())
}

fn run_emails(args: &[String]) -> Result<()> {
    let files = positional(args, 2)?;
    let column = match flag_value(args, "column") {
        Some(value) => value,
        None => bail!("emails requires --column=NAME"),
    };
    let loose = has_flag(args, "loose");
    let fix_con = has_flag(args, "fix-con");

    let table = load_csv(Path::new(files[0]))?;
    info!("Loaded {} record(s) from {}", table.len(), files[0]);

    let values: Vec<Value> = table
        .column_values(&column)?
        .iter()
        .map(|v| {
            let mut email = v.as_text().to_string();
            if fix_con {
                email = fix_con_to_com(&email);
            }
            Value::Text(keep_valid_email(&email, loose))
        })
        .collect();
    let kept = values.iter().filter(|v| !v.is_blank()).count();
    info!("{} of {} email(s) valid", kept, table.len());

    let mut result = table.clone();
    result.set_column(&column, values)?;
    write_csv(&result, Path::new(files[1]))?;
    emit_summary(args, "emails", table.len(), result.len())
}
