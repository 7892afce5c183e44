#![warn(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

mod classify;
mod parser;

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use color_eyre::eyre::Context;
use color_eyre::Result;
use parser::{DateRange, IteratorExt, StatementParser};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Converts a fixed-width bank statement pages export to pipe-delimited CSV
#[derive(Debug, Parser)]
struct Args {
    /// A plain-text export of the statement pages
    input: PathBuf,
    /// Start of the date range, e.g. 2018-1-23 (inclusive)
    start_date: String,
    /// End of the date range (inclusive)
    end_date: String,
    /// Prints the raw lines found in the export
    #[arg(long)]
    print_lines: bool,
}

const COLUMN_LABELS: [&str; 10] = [
    "date1",
    "date1",
    "description",
    "reference",
    "credit",
    "debit",
    "balance",
    "regular income",
    "cheque in",
    "regular outcome",
];

/// One output row of the normalized statement report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub date1: NaiveDate,
    pub date2: NaiveDate,
    pub description: String,
    pub reference: String,
    pub credit: Decimal,
    /// Carried negated, as it appears in the report.
    pub debit: Decimal,
    pub balance: Decimal,
    pub regular_income: Decimal,
    pub cheque_in: Decimal,
    pub regular_outcome: Decimal,
}

/// Parses a CLI range bound. An invalid date is not fatal: the bound is
/// left open and the run proceeds.
fn parse_range_date(raw: &str, which: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            warn!("{which} date {raw:?} is not valid ({err}), leaving that bound open");
            None
        }
    }
}

fn write_report<'a, I, W>(mut transactions: StatementParser<I>, writer: W) -> Result<()>
where
    I: Iterator<Item = &'a str>,
    W: io::Write,
{
    // The summary row has one more field than the others, hence `flexible`.
    // Quoting is off: the report is a raw pipe stream, not strict CSV.
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    writer.write_record(COLUMN_LABELS)?;
    for record in transactions.by_ref() {
        writer.serialize(&record)?;
    }

    let totals = transactions.totals();
    let regular_income = totals.regular_income.to_string();
    let cheque_in = totals.cheque_in.to_string();
    let regular_outcome = totals.regular_outcome.to_string();
    let net = (totals.regular_income + totals.regular_outcome).to_string();
    writer.write_record([
        "date1",
        "date1",
        "description",
        "reference",
        "credit",
        "debit",
        "balance",
        regular_income.as_str(),
        cheque_in.as_str(),
        regular_outcome.as_str(),
        net.as_str(),
    ])?;
    writer.write_record(COLUMN_LABELS)?;
    writer.flush()?;

    if let Some((length, line)) = transactions.shortest_line() {
        debug!("shortest transaction line ({length} chars): {line:?}");
    }
    debug!("final balance: {}", transactions.balance());
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let Args {
        input,
        start_date,
        end_date,
        print_lines,
    } = Args::parse();

    let range = DateRange {
        start: parse_range_date(&start_date, "starting"),
        end: parse_range_date(&end_date, "ending"),
    };

    let text = fs::read_to_string(&input)
        .with_context(|| format!("Could not read input file {input:?}"))?;
    let transactions = text
        .lines()
        .inspect(|line| {
            if print_lines {
                println!("{line}");
            }
        })
        .transactions(range);
    write_report(transactions, io::stdout().lock())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_frame_transaction_rows_with_header_summary_and_trailing_header() {
        let lines = [
            "תנועות בחשבון לחודש ינואר 2018".to_owned(),
            txn_line("15/03", "16/03", "משכורת", "123", "100.00", ""),
        ];
        assert_eq!(
            "date1|date1|description|reference|credit|debit|balance|regular income|cheque in|regular outcome\n\
             2018-03-15|2018-03-16|משכורת|123|100.00|-0|100.00|100.00|0|-0\n\
             date1|date1|description|reference|credit|debit|balance|100.00|0|-0|100.00\n\
             date1|date1|description|reference|credit|debit|balance|regular income|cheque in|regular outcome\n",
            report(&lines)
        );
    }

    #[test]
    fn should_write_a_description_with_an_embedded_quote_verbatim() {
        let lines = [
            "תנועות בחשבון לחודש ינואר 2018".to_owned(),
            txn_line("15/03", "15/03", "קניית ני\"ע", "9", "", "1,000.00"),
        ];
        assert_eq!(
            Some("2018-03-15|2018-03-15|קניית ני\"ע|9|0|-1000.00|-1000.00|0|0|0"),
            report(&lines).lines().nth(1)
        );
    }

    fn report(lines: &[String]) -> String {
        let transactions = lines
            .iter()
            .map(|line| line.as_str())
            .transactions(DateRange::default());
        let mut out = Vec::new();
        write_report(transactions, &mut out).expect("report");
        String::from_utf8(out).expect("utf-8")
    }

    fn txn_line(
        date1: &str,
        date2: &str,
        description: &str,
        reference: &str,
        credit: &str,
        debit: &str,
    ) -> String {
        format!(
            " {date1:<5} {date2:<5} {description:<33} {reference:<9}{credit:>12}  {debit:>11}"
        )
    }
}
