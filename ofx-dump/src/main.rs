//! CLI-утилита для просмотра содержимого файлов OFX.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ofx_parser::{Balance, Document, Grammar, ParseOptions, Transaction};

/// Максимальный размер входного документа по умолчанию (16 МиБ).
const DEFAULT_MAX_SIZE: u64 = 16 * 1024 * 1024;

/// Формат вывода.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Заголовки, счет, балансы и транзакции
    Summary,
    /// Транзакции в CSV
    Csv,
}

/// Грамматика разметки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GrammarArg {
    /// OFX 1.x, незакрытые теги допускаются
    Tolerant,
    /// OFX 2.x, строгий XML
    Strict,
}

impl From<GrammarArg> for Grammar {
    fn from(arg: GrammarArg) -> Self {
        match arg {
            GrammarArg::Tolerant => Grammar::Tolerant,
            GrammarArg::Strict => Grammar::Strict,
        }
    }
}

/// OFX Dump - просмотр банковских выписок OFX.
///
/// Разбирает файл OFX 1.x или 2.x и печатает сводку или транзакции в CSV.
#[derive(Parser)]
#[command(name = "ofx-dump")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Входной файл (по умолчанию stdin)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Формат вывода
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,

    /// Принудительная грамматика (по умолчанию определяется по заголовку)
    #[arg(long, short, value_enum)]
    grammar: Option<GrammarArg>,

    /// Максимальный размер документа в байтах
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: u64,

    /// Подробный вывод
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Читает не более `max_size` байт; документ большего размера отклоняется.
fn read_limited<R: Read>(reader: R, max_size: u64) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    reader
        .take(max_size.saturating_add(1))
        .read_to_end(&mut content)
        .context("Не удалось прочитать входные данные")?;

    if content.len() as u64 > max_size {
        bail!("Документ превышает допустимый размер {} байт", max_size);
    }
    Ok(content)
}

fn read_input(args: &Args) -> Result<Vec<u8>> {
    match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Не удалось открыть файл '{}'", path.display()))?;
            read_limited(file, args.max_size)
                .with_context(|| format!("Ошибка чтения файла '{}'", path.display()))
        }
        None => read_limited(io::stdin().lock(), args.max_size).context("Ошибка чтения stdin"),
    }
}

fn write_balance<W: Write>(writer: &mut W, label: &str, balance: &Balance) -> io::Result<()> {
    match &balance.as_of {
        Some(as_of) => writeln!(writer, "{}: {} (на {})", label, balance.amount, as_of),
        None => writeln!(writer, "{}: {}", label, balance.amount),
    }
}

fn write_summary<W: Write>(document: &Document, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "Грамматика: {}", document.grammar())?;
    writeln!(writer, "Заголовки:")?;
    for (key, value) in document.headers().iter() {
        writeln!(writer, "  {}: {}", key, value)?;
    }

    if let Some(sign_on) = document.sign_on() {
        writeln!(writer)?;
        writeln!(
            writer,
            "Вход: статус {} ({})",
            sign_on.status_code.as_deref().unwrap_or("-"),
            sign_on.severity.as_deref().unwrap_or("-")
        )?;
        if let Some(org) = &sign_on.fi_org {
            writeln!(writer, "Организация: {}", org)?;
        }
        if let Some(time) = &sign_on.server_time {
            writeln!(writer, "Время сервера: {}", time)?;
        }
    }

    let account = document.account();
    writeln!(writer)?;
    writeln!(writer, "Счет: {} ({})", account.id, account.kind)?;
    if let Some(bank_id) = &account.bank_id {
        writeln!(writer, "Банк: {}", bank_id)?;
    }
    if let Some(currency) = &account.currency {
        writeln!(writer, "Валюта: {}", currency)?;
    }
    if let Some((start, end)) = &account.period {
        writeln!(writer, "Период: {} - {}", start, end)?;
    }
    if let Some(balance) = &account.balance {
        write_balance(writer, "Баланс", balance)?;
    }
    if let Some(balance) = &account.available_balance {
        write_balance(writer, "Доступно", balance)?;
    }

    writeln!(writer)?;
    writeln!(writer, "Транзакции ({}):", account.transactions.len())?;
    for (i, tx) in account.transactions.iter().enumerate() {
        writeln!(
            writer,
            "  #{} {} {:>12} {:<8} {} {}",
            i + 1,
            tx.posted_at.instant().date_naive(),
            tx.amount,
            tx.kind,
            tx.fit_id,
            tx.name
        )?;
        if !tx.memo.is_empty() {
            writeln!(writer, "      {}", tx.memo)?;
        }
    }

    Ok(())
}

/// Экранирует поле CSV: кавычки удваиваются, поле с разделителями берется в кавычки.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_csv<W: Write>(transactions: &[Transaction], writer: &mut W) -> io::Result<()> {
    writeln!(writer, "Дата,Сумма,Тип,FITID,Название,Примечание")?;

    for tx in transactions {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            tx.posted_at.instant().date_naive(),
            tx.amount,
            tx.kind,
            csv_field(&tx.fit_id),
            csv_field(&tx.name),
            csv_field(&tx.memo)
        )?;
    }

    Ok(())
}

fn run(args: Args) -> Result<()> {
    let content = read_input(&args)?;

    let options = ParseOptions {
        grammar: args.grammar.map(Grammar::from),
    };
    let document = ofx_parser::parse_bytes_with(&content, &options).context("Ошибка разбора OFX")?;
    tracing::debug!(
        transactions = document.account().transactions.len(),
        "документ разобран"
    );

    let mut stdout = io::stdout().lock();
    let written = match args.format {
        OutputFormat::Summary => write_summary(&document, &mut stdout),
        OutputFormat::Csv => write_csv(&document.account().transactions, &mut stdout),
    };
    written.context("Ошибка записи")?;

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Ошибка: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
