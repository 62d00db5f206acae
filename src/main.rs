//! # GWAS Ingest
//!
//! Parses GWAS summary statistics, UCSC BED and PLINK LD files into a
//! normalized TSV layout, detecting the GWAS column layout from the header.
//!
//! ## Quick Start
//!
//! ```bash
//! # Detect columns and normalize a SAIGE output file
//! gwas-ingest saige_results.txt.gz
//!
//! # Only print the detected column mapping
//! gwas-ingest saige_results.txt.gz --sniff-only
//!
//! # BED intervals with 4 threads, gzip output
//! gwas-ingest peaks.bed -f bed -j 4 -c -o results/
//! ```

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gwas_ingest::read_table::{read_table, TextTable};
use gwas_ingest::reformat_lines::{parse_lines, parse_lines_parallel, write_records, TsvRecord};
use gwas_ingest::{
    guess_gwas, make_plink_ld_parser, make_ucsc_bed_parser, GwasParser, GwasParserConfig,
    LineParser,
};

#[derive(Parser)]
#[command(
    name = "gwas-ingest",
    version,
    about = "🧬 GWAS summary statistics parser with automatic column detection",
    long_about = "A Rust command-line tool that reads GWAS summary statistics (plain or gzip), detects which columns hold the variant, p-value and effect size, and writes one normalized TSV row per variant. UCSC BED and PLINK LD files are supported as well.",
    after_help = "EXAMPLES:
    Detect the layout and normalize:
      gwas-ingest saige_results.txt.gz

    Print the detected column mapping as JSON:
      gwas-ingest saige_results.txt.gz --sniff-only > mapping.json

    Use a column mapping instead of detection:
      gwas-ingest results.tsv --config mapping.json -j 0 -o out/ -p study1

    Raw BED columns, failing on the first malformed line:
      gwas-ingest peaks.bed -f bed --raw --strict"
)]
struct Cli {
    /// Input file (plain text or gzip compressed)
    #[arg(value_name = "INPUT_FILE")]
    input_file: String,

    /// Input file format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = FormatCli::Gwas)]
    format: FormatCli,

    /// JSON column mapping (1-based columns); skips layout detection
    #[arg(long = "config", value_name = "FILE")]
    config: Option<String>,

    /// Field delimiter of GWAS files [default: tab, or the delimiter in --config]
    #[arg(short = 'd', long = "delimiter")]
    delimiter: Option<char>,

    /// Number of data rows inspected by layout detection
    #[arg(long = "sniff-rows", default_value_t = 100)]
    sniff_rows: usize,

    /// Print the detected column mapping and exit
    #[arg(long = "sniff-only")]
    sniff_only: bool,

    /// Keep BED / LD fields as written instead of normalizing them
    #[arg(long = "raw")]
    raw: bool,

    /// Stop at the first line that fails to parse
    #[arg(long = "strict")]
    strict: bool,

    /// Number of threads to use for parallel processing (0 = auto-detect)
    #[arg(short = 'j', long = "threads", env = "GWAS_INGEST_THREADS", default_value_t = 1)]
    threads: usize,

    /// Output directory (default: current directory)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<String>,

    /// Prefix for output files (default: input filename)
    #[arg(short = 'p', long = "prefix")]
    prefix: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Compress output files with gzip
    #[arg(short = 'c', long = "compress")]
    compress: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum FormatCli {
    /// GWAS summary statistics
    #[value(name = "gwas")]
    Gwas,
    /// UCSC BED intervals
    #[value(name = "bed")]
    Bed,
    /// PLINK --r2 linkage disequilibrium table
    #[value(name = "ld")]
    Ld,
}

impl FormatCli {
    fn name(self) -> &'static str {
        match self {
            FormatCli::Gwas => "gwas",
            FormatCli::Bed => "bed",
            FormatCli::Ld => "ld",
        }
    }
}

struct RunStats {
    records: usize,
    skipped: usize,
    process_time: Duration,
    write_time: Duration,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "gwas_ingest=debug"
    } else {
        "gwas_ingest=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if !Path::new(&cli.input_file).exists() {
        bail!("File '{}' not found", cli.input_file);
    }
    if cli.sniff_only && cli.format != FormatCli::Gwas {
        bail!("--sniff-only only applies to GWAS files");
    }

    let thread_count = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };
    let use_parallel = thread_count > 1;
    let total_start = Instant::now();

    if !cli.sniff_only {
        print_startup_info(&cli, thread_count, use_parallel);
    }

    if use_parallel {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build_global()
        {
            eprintln!("⚠️  Warning: Could not set thread pool size: {e}");
            eprintln!("   Continuing with default thread pool...");
        }
    }

    let mapping = match (cli.format, &cli.config) {
        (FormatCli::Gwas, Some(path)) => Some(
            GwasParserConfig::from_json_file(path, cli.delimiter)
                .with_context(|| format!("Error loading column mapping '{path}'"))?,
        ),
        _ => None,
    };
    let delimiter = resolve_delimiter(cli.delimiter, mapping.as_ref());

    let read_start = Instant::now();
    let table = read_table(&cli.input_file, delimiter)
        .with_context(|| format!("Error reading '{}'", cli.input_file))?;
    let read_time = read_start.elapsed();

    let gwas_config = match cli.format {
        FormatCli::Gwas => Some(resolve_gwas_config(&cli, mapping, &table, delimiter)?),
        FormatCli::Bed | FormatCli::Ld => None,
    };
    if let Some(ref config) = gwas_config {
        if cli.sniff_only {
            println!("{}", serde_json::to_string_pretty(config)?);
            return Ok(());
        }
        println!("🔍 Column mapping: {}", serde_json::to_string(config)?);
    }

    println!("✅ File read completed in {read_time:.2?}");
    println!("   📊 Data lines: {}", table.data_lines.len());
    println!("   📑 Meta lines: {}", table.meta_lines.len());
    println!();

    let (meta_file, output_file) = generate_output_filenames(&cli);
    if !table.meta_lines.is_empty() {
        write_meta_file(&meta_file, &table.meta_lines)
            .with_context(|| format!("Error writing '{meta_file}'"))?;
    }

    let stats = match (cli.format, gwas_config) {
        (FormatCli::Gwas, Some(config)) => {
            let parser = GwasParser::new(config)?;
            run(&parser, &table, &cli, &output_file, use_parallel)?
        }
        (FormatCli::Gwas, None) => bail!("No column mapping available"),
        (FormatCli::Bed, _) => {
            let parser = make_ucsc_bed_parser(!cli.raw);
            run(&parser, &table, &cli, &output_file, use_parallel)?
        }
        (FormatCli::Ld, _) => {
            let parser = make_plink_ld_parser(!cli.raw);
            run(&parser, &table, &cli, &output_file, use_parallel)?
        }
    };

    let total_time = total_start.elapsed();
    print_final_summary(
        &cli,
        &output_file,
        (!table.meta_lines.is_empty()).then_some(meta_file.as_str()),
        &stats,
        read_time,
        total_time,
    );
    Ok(())
}

/// `-d` wins, then the mapping file, then tab.
fn resolve_delimiter(flag: Option<char>, mapping: Option<&GwasParserConfig>) -> char {
    flag.or(mapping.map(|m| m.delimiter)).unwrap_or('\t')
}

fn resolve_gwas_config(
    cli: &Cli,
    mapping: Option<GwasParserConfig>,
    table: &TextTable,
    delimiter: char,
) -> Result<GwasParserConfig> {
    if let Some(config) = mapping {
        return Ok(config);
    }

    let header = table.header_fields(delimiter);
    let rows = table.sample_rows(cli.sniff_rows, delimiter);
    let mut config = guess_gwas(&header, &rows)
        .ok_or_else(|| anyhow!("Could not detect the GWAS column layout; pass --config"))?;
    config.delimiter = delimiter;
    debug!(?config, "Detected column mapping");
    Ok(config)
}

fn run<P>(
    parser: &P,
    table: &TextTable,
    cli: &Cli,
    output_file: &str,
    use_parallel: bool,
) -> Result<RunStats>
where
    P: LineParser,
    P::Record: TsvRecord,
{
    println!("🔄 Parsing {} lines...", cli.format.name());
    let process_start = Instant::now();
    let parsed = if use_parallel {
        parse_lines_parallel(parser, &table.data_lines, cli.strict)?
    } else {
        parse_lines(parser, &table.data_lines, cli.strict)?
    };
    let process_time = process_start.elapsed();
    info!(
        records = parsed.records.len(),
        skipped = parsed.skipped.len(),
        "Parsing finished"
    );
    println!("✅ Parsing completed in {process_time:.2?}");
    if !parsed.skipped.is_empty() {
        println!("   ⚠️  Skipped lines: {}", parsed.skipped.len());
    }
    println!();

    println!(
        "💾 Writing output file{}...",
        if cli.compress { " (compressed)" } else { "" }
    );
    let write_start = Instant::now();
    write_records(output_file, &parsed.records, cli.compress)
        .with_context(|| format!("Error writing '{output_file}'"))?;
    let write_time = write_start.elapsed();
    println!("✅ Output written in {write_time:.2?}");
    println!();

    Ok(RunStats {
        records: parsed.records.len(),
        skipped: parsed.skipped.len(),
        process_time,
        write_time,
    })
}

fn print_startup_info(cli: &Cli, thread_count: usize, use_parallel: bool) {
    println!("🧬 GWAS Ingest Starting...");
    println!("📁 Input file: {}", cli.input_file);
    println!("🔬 Format: {}", cli.format.name());
    if let Some(ref config) = cli.config {
        println!("🗺️  Column mapping: {config}");
    }
    println!(
        "⚡ Processing mode: {} (using {} thread{})",
        if use_parallel {
            "Parallel"
        } else {
            "Sequential"
        },
        thread_count,
        if thread_count == 1 { "" } else { "s" }
    );
    if cli.strict {
        println!("🛑 Strict mode: stopping at the first bad line");
    }
    if cli.compress {
        println!("🗜️  Output compression: Enabled (gzip)");
    }
    if let Some(ref output_dir) = cli.output_dir {
        println!("📂 Output directory: {output_dir}");
    }
    if let Some(ref prefix) = cli.prefix {
        println!("🏷️  Output prefix: {prefix}");
    }
    println!();
}

fn generate_output_filenames(cli: &Cli) -> (String, String) {
    let base_name = if let Some(ref prefix) = cli.prefix {
        prefix.clone()
    } else {
        get_base_filename(&cli.input_file)
    };

    let output_dir = cli.output_dir.as_deref().unwrap_or(".");
    let format = cli.format.name();

    let meta_file = format!("{output_dir}/{base_name}_meta.txt");
    let output_file = if cli.compress {
        format!("{output_dir}/{base_name}_{format}.tsv.gz")
    } else {
        format!("{output_dir}/{base_name}_{format}.tsv")
    };

    (meta_file, output_file)
}

fn print_final_summary(
    cli: &Cli,
    output_file: &str,
    meta_file: Option<&str>,
    stats: &RunStats,
    read_time: Duration,
    total_time: Duration,
) {
    println!("🎉 Processing completed successfully!");
    println!("📋 Summary:");
    println!("   📁 Files created:");
    println!(
        "     • Records: {}{}",
        output_file,
        if cli.compress { " (gzip compressed)" } else { "" }
    );
    if let Some(meta_file) = meta_file {
        println!("     • Meta lines: {meta_file}");
    }
    println!("   📊 Records written: {}", stats.records);
    println!("   ⚠️  Lines skipped:   {}", stats.skipped);
    println!();

    let lines_per_sec = (stats.records + stats.skipped) as f64 / stats.process_time.as_secs_f64();
    if cli.verbose {
        let share = |part: Duration| (part.as_secs_f64() / total_time.as_secs_f64()) * 100.0;
        println!("⏱️  Performance Statistics:");
        println!("   📖 File reading:     {read_time:.2?} ({:.1}% of total)", share(read_time));
        println!(
            "   🔄 Parsing:          {:.2?} ({:.1}% of total)",
            stats.process_time,
            share(stats.process_time)
        );
        println!(
            "   💾 File writing:     {:.2?} ({:.1}% of total)",
            stats.write_time,
            share(stats.write_time)
        );
        println!("   🕐 Total time:       {total_time:.2?}");
        println!("   💽 Parsing rate:     {lines_per_sec:.0} lines/sec");
    } else {
        println!("⏱️  Total time: {total_time:.2?}");
        println!("📈 Processing rate: {lines_per_sec:.0} lines/sec");
    }
}

fn write_meta_file(filename: &str, meta_lines: &[String]) -> std::io::Result<()> {
    if let Some(parent) = Path::new(filename).parent() {
        create_dir_all(parent)?;
    }

    let mut file = File::create(filename)?;
    for line in meta_lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

fn get_base_filename(file_path: &str) -> String {
    let path = Path::new(file_path);
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_str()
        .unwrap_or("output");

    let base = filename.strip_suffix(".gz").unwrap_or(filename);
    let base = [".tsv", ".txt", ".bed", ".ld", ".csv"]
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .unwrap_or(base);

    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_precedence() {
        let mut mapping = GwasParserConfig::default();
        assert_eq!(resolve_delimiter(None, None), '\t');
        assert_eq!(resolve_delimiter(Some(','), None), ',');

        mapping.delimiter = ' ';
        assert_eq!(resolve_delimiter(None, Some(&mapping)), ' ');
        assert_eq!(resolve_delimiter(Some(','), Some(&mapping)), ',');
    }
}
