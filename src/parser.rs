use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::classify::{classify, CategoryAmounts};
use crate::Record;

/// Month names appearing in statement page headers.
const MONTH_NAMES: [&str; 12] = [
    "ינואר",
    "פברואר",
    "מרץ",
    "אפריל",
    "מאי",
    "יוני",
    "יולי",
    "אוגוסט",
    "ספטמבר",
    "אוקטובר",
    "נובמבר",
    "דצמבר",
];

// Fixed character offsets of the transaction line fields (0-indexed).
const DATE1_START: usize = 1;
const DATE1_SIZE: usize = 5;
const DATE2_START: usize = 7;
const DATE2_SIZE: usize = 5;
const DESCRIPTION_START: usize = 13;
const DESCRIPTION_SIZE: usize = 33;
const REFERENCE_START: usize = 47;
const REFERENCE_SIZE: usize = 9;
const CREDIT_START: usize = 56;
const CREDIT_SIZE: usize = 12;
const DEBIT_START: usize = 70;
const DEBIT_SIZE: usize = 11;

/// Extracts a fixed-width field as the at-most-`length` characters starting
/// at character `start`.
///
/// Statement lines are not guaranteed to reach full width (trailing fields
/// may be blank or truncated), so the span is clamped to the end of the line
/// and a `start` past the end yields an empty string. Offsets are character
/// positions, not bytes: the script is non-ASCII.
pub fn extract_field(line: &str, start: usize, length: usize) -> String {
    line.chars().skip(start).take(length).collect()
}

/// Digit-grouping and decimal-separator convention used for amount fields.
#[derive(Debug, Clone, Copy)]
pub struct NumberFormat {
    pub group_separator: char,
    pub decimal_separator: char,
}

impl NumberFormat {
    /// Hebrew-locale amounts: comma grouping, dot decimal point.
    pub const HEBREW: NumberFormat = NumberFormat {
        group_separator: ',',
        decimal_separator: '.',
    };

    /// Parses an amount field, or `None` when the field holds no usable
    /// number (the caller treats that as "amount absent").
    ///
    /// Page extraction sometimes leaves a line break inside a field; only the
    /// text before the first one counts.
    pub fn parse_amount(&self, raw: &str) -> Option<Decimal> {
        let raw = raw.trim().split('\n').next().unwrap_or_default().trim_end();
        if raw.is_empty() {
            return None;
        }
        let normalized: String = raw
            .chars()
            .filter(|&c| c != self.group_separator)
            .map(|c| {
                if c == self.decimal_separator {
                    '.'
                } else {
                    c
                }
            })
            .collect();
        normalized.parse().ok()
    }
}

/// Inclusive date range bounding which transactions are emitted.
///
/// A `None` bound is open: the default range passes everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start)
            && self.end.map_or(true, |end| date <= end)
    }
}

/// Iterator which parses lines from a bank statement pages export
///
/// The export is a flat text rendering of the statement pages and mixes,
/// in no guaranteed order:
///
/// 1. Month header lines: free text containing one of the twelve month names
///    and, somewhere after it, a 4-digit year. Headers carry no transaction
///    data; they only establish the year for the `DD/MM` dates that follow.
/// 2. Fixed-width transaction lines holding a value date, an entry date, a
///    description, a reference number and credit/debit amount columns.
/// 3. Stray text and blank lines, which are ignored.
///
/// Transaction lines dated outside the supplied range are dropped without
/// touching the running balance or the category totals. Nothing here is
/// fatal: unparseable amounts degrade to zero with a diagnostic, and a
/// transaction line seen before any month header is skipped because its
/// dates cannot be resolved.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct StatementParser<I> {
    iter: I,
    range: DateRange,
    number_format: NumberFormat,
    current_year: Option<i32>,
    balance: Decimal,
    totals: CategoryAmounts,
    shortest_line: Option<(usize, String)>,
}

enum TransactionParseResult {
    /// Structurally a transaction line, one record produced.
    Matched(Record),
    /// Structurally a transaction line, but filtered or unresolvable.
    Skipped,
    /// Not a transaction line at all.
    NotMatched,
}

impl<I> StatementParser<I> {
    fn new(iter: I, range: DateRange, number_format: NumberFormat) -> Self {
        Self {
            iter,
            range,
            number_format,
            current_year: None,
            balance: Decimal::ZERO,
            totals: CategoryAmounts::default(),
            shortest_line: None,
        }
    }

    /// Cumulative credit-minus-debit over the in-range transactions so far.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Category totals over the in-range transactions so far.
    pub fn totals(&self) -> CategoryAmounts {
        self.totals
    }

    /// Shortest structurally valid transaction line seen, with its character
    /// length. Useful for checking how much of the fixed width an export
    /// actually fills.
    pub fn shortest_line(&self) -> Option<(usize, &str)> {
        self.shortest_line
            .as_ref()
            .map(|(length, line)| (*length, line.as_str()))
    }

    fn try_parse_transaction(&mut self, line: &str) -> TransactionParseResult {
        static DATE_TOKEN_REGEX: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}$").expect("regex"));

        let line_length = line.chars().count();
        if line_length < DATE1_START + DATE1_SIZE {
            return TransactionParseResult::NotMatched;
        }
        let date1_token = extract_field(line, DATE1_START, DATE1_SIZE);
        if !DATE_TOKEN_REGEX.is_match(&date1_token) {
            return TransactionParseResult::NotMatched;
        }

        if self
            .shortest_line
            .as_ref()
            .map_or(true, |(shortest, _)| line_length < *shortest)
        {
            self.shortest_line = Some((line_length, line.to_owned()));
        }

        let Some(date1) = self.convert_date(&date1_token) else {
            warn!(
                "value date {date1_token:?} cannot be resolved (no month header seen yet?), \
                 skipping line"
            );
            return TransactionParseResult::Skipped;
        };
        if !self.range.contains(date1) {
            return TransactionParseResult::Skipped;
        }

        let date2_token = extract_field(line, DATE2_START, DATE2_SIZE);
        let Some(date2) = self.convert_date(&date2_token) else {
            warn!("entry date {date2_token:?} does not resolve to a valid date, skipping line");
            return TransactionParseResult::Skipped;
        };

        let description = extract_field(line, DESCRIPTION_START, DESCRIPTION_SIZE);
        let reference = extract_field(line, REFERENCE_START, REFERENCE_SIZE);
        let credit_field = extract_field(line, CREDIT_START, CREDIT_SIZE);
        let debit_field = extract_field(line, DEBIT_START, DEBIT_SIZE);

        let credit = self.number_format.parse_amount(&credit_field);
        let debit = self.number_format.parse_amount(&debit_field);
        if credit.is_none() && debit.is_none() {
            warn!(
                "neither amount field parses: {:?}, {:?}",
                credit_field.trim(),
                debit_field.trim()
            );
        }
        let credit = credit.unwrap_or(Decimal::ZERO);
        let debit = debit.unwrap_or(Decimal::ZERO);

        self.balance += credit - debit;
        let categories = classify(&description, credit, debit);
        self.totals += categories;

        TransactionParseResult::Matched(Record {
            date1,
            date2,
            description: description.trim().to_owned(),
            reference: reference.trim().to_owned(),
            credit,
            debit: -debit,
            balance: self.balance,
            regular_income: categories.regular_income,
            cheque_in: categories.cheque_in,
            regular_outcome: categories.regular_outcome,
        })
    }

    /// Recognizes a month header line and, on a match, adopts its year for
    /// every following `DD/MM` date until the next header.
    fn parse_month_header(&mut self, line: &str) -> bool {
        static MONTH_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(&format!(r"(?:{}).*?(\d{{4}})", MONTH_NAMES.join("|"))).expect("regex")
        });

        match MONTH_HEADER_REGEX
            .captures(line)
            .and_then(|groups| groups[1].parse::<i32>().ok())
        {
            Some(year) => {
                self.current_year = Some(year);
                true
            }
            None => false,
        }
    }

    /// Builds a full date from a `DD/MM` token and the current header year.
    fn convert_date(&self, token: &str) -> Option<NaiveDate> {
        let year = self.current_year?;
        let (day, month) = token.split_once('/')?;
        let day = day.parse().ok()?;
        let month = month.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for StatementParser<I> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.iter.next() {
            match self.try_parse_transaction(line) {
                TransactionParseResult::Matched(record) => return Some(record),
                TransactionParseResult::Skipped => continue,
                TransactionParseResult::NotMatched => {
                    self.parse_month_header(line);
                }
            }
        }
        None
    }
}

pub trait IteratorExt {
    fn transactions(self, range: DateRange) -> StatementParser<Self>
    where
        Self: Sized;
}

impl<'a, I: Iterator<Item = &'a str>> IteratorExt for I {
    fn transactions(self, range: DateRange) -> StatementParser<I> {
        StatementParser::new(self, range, NumberFormat::HEBREW)
    }
}
