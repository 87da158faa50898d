//! Record normalization: typed dates and amounts, settlement flags
//!
//! A field that cannot be read becomes `None` and an error is collected for it;
//! the record itself is always kept. Records with an unknown mandatory field are
//! simply never offered as candidates.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

use super::raw::*;
use crate::types::*;

/// Offset between the Thai Buddhist era and the common era
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Most fractional digits an amount may carry
pub const MAX_AMOUNT_SCALE: usize = 4;

/// Four-digit years above this are taken to be Buddhist-era years
const BUDDHIST_ERA_THRESHOLD: i32 = 2400;

/// Normalized records together with the field errors met along the way
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch<T> {
    pub records: Vec<T>,
    pub field_errors: Vec<ReconcileError>,
}

/// Converts raw records into typed ones
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    buddhist_era: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read two-digit years as Buddhist-era years (`67` is 2567 BE, 2024 CE)
    pub fn buddhist_era(mut self, enabled: bool) -> Self {
        self.buddhist_era = enabled;
        self
    }

    pub fn normalize_statement(
        &self,
        raw: Vec<RawStatementLine>,
    ) -> NormalizedBatch<StatementLine> {
        let mut field_errors = Vec::new();
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let id = record_id(row.id.as_deref(), "line", idx);
                let mut reader = FieldReader::new(&id, self, &mut field_errors);
                let timestamp = reader.datetime("datetime", row.datetime.as_deref());
                let amount = reader.amount("amount", row.amount.as_deref(), true);
                let direction = reader
                    .flag("is_deposit", row.is_deposit.as_deref(), true)
                    .map(|deposit| {
                        if deposit {
                            Direction::Deposit
                        } else {
                            Direction::Withdrawal
                        }
                    });
                let balance = reader.amount("balance", row.balance.as_deref(), false);
                let page = reader.page(row.page.as_deref());

                StatementLine {
                    id,
                    timestamp,
                    amount,
                    direction,
                    balance,
                    page,
                }
            })
            .collect();

        self.finish("statement", records, field_errors)
    }

    pub fn normalize_sales(&self, raw: Vec<RawSaleInvoice>) -> NormalizedBatch<SaleInvoice> {
        let mut field_errors = Vec::new();
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let id = record_id(row.id.as_deref(), "sale", idx);
                let mut reader = FieldReader::new(&id, self, &mut field_errors);
                let invoice_date =
                    reader.date("date_of_sale_invoice", row.date_of_sale_invoice.as_deref());
                let product_value =
                    reader.amount("product_value", row.product_value.as_deref(), false);
                let vat = reader.amount("vat", row.vat.as_deref(), false);
                let total_amount =
                    reader.amount("total_amount", row.total_amount.as_deref(), false);
                let withholding_tax =
                    reader.amount("withholding_tax", row.withholding_tax.as_deref(), false);
                let net_amount = reader.amount("net_amount", row.net_amount.as_deref(), true);
                let settled = reader
                    .flag("matched", row.matched.as_deref(), false)
                    .unwrap_or(false);

                SaleInvoice {
                    invoice_number: clean_text(row.sale_invoice_tax_number.as_deref()),
                    company_name: clean_text(row.company_name.as_deref()),
                    company_tax_id: clean_text(row.company_tax_id.as_deref()),
                    id,
                    invoice_date,
                    product_value,
                    vat,
                    total_amount,
                    withholding_tax,
                    net_amount,
                    settled,
                }
            })
            .collect();

        self.finish("sale", records, field_errors)
    }

    pub fn normalize_purchases(
        &self,
        raw: Vec<RawPurchaseInvoice>,
    ) -> NormalizedBatch<PurchaseInvoice> {
        let mut field_errors = Vec::new();
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let id = record_id(row.id.as_deref(), "purchase", idx);
                let mut reader = FieldReader::new(&id, self, &mut field_errors);
                let invoice_date = reader.date(
                    "date_of_purchase_invoice",
                    row.date_of_purchase_invoice.as_deref(),
                );
                let product_value =
                    reader.amount("product_value", row.product_value.as_deref(), false);
                let vat = reader.amount("vat", row.vat.as_deref(), false);
                let total_amount =
                    reader.amount("total_amount", row.total_amount.as_deref(), true);
                let settled = reader
                    .flag("matched", row.matched.as_deref(), false)
                    .unwrap_or(false);

                PurchaseInvoice {
                    invoice_number: clean_text(row.purchase_invoice_tax_number.as_deref()),
                    document_id: clean_text(row.purchase_invoice_id.as_deref()),
                    company_name: clean_text(row.company_name.as_deref()),
                    company_tax_id: clean_text(row.company_tax_id.as_deref()),
                    id,
                    invoice_date,
                    product_value,
                    vat,
                    total_amount,
                    settled,
                }
            })
            .collect();

        self.finish("purchase", records, field_errors)
    }

    pub fn normalize_withholdings(
        &self,
        raw: Vec<RawWithholdingRecord>,
    ) -> NormalizedBatch<WithholdingRecord> {
        let mut field_errors = Vec::new();
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let id = record_id(row.id.as_deref(), "withholding", idx);
                let mut reader = FieldReader::new(&id, self, &mut field_errors);
                let paid_date = reader.date("paid_date", row.paid_date.as_deref());
                let amount = reader.amount("amount", row.amount.as_deref(), false);
                let withholding_tax =
                    reader.amount("withholding_tax", row.withholding_tax.as_deref(), false);
                let paid_amount =
                    reader.amount("paid_amount", row.paid_amount.as_deref(), true);
                let settled = reader
                    .flag("matched", row.matched.as_deref(), false)
                    .unwrap_or(false);

                WithholdingRecord {
                    company_name: clean_text(row.company_name.as_deref()),
                    tax_id: clean_text(row.tax_id.as_deref()),
                    id,
                    paid_date,
                    amount,
                    withholding_tax,
                    paid_amount,
                    settled,
                }
            })
            .collect();

        self.finish("withholding", records, field_errors)
    }

    fn finish<T>(
        &self,
        set: &str,
        records: Vec<T>,
        field_errors: Vec<ReconcileError>,
    ) -> NormalizedBatch<T> {
        tracing::debug!(
            set,
            records = records.len(),
            field_errors = field_errors.len(),
            "normalized record set"
        );
        NormalizedBatch {
            records,
            field_errors,
        }
    }
}

/// Reads the fields of one record and collects its errors
struct FieldReader<'a> {
    record_id: &'a str,
    normalizer: &'a Normalizer,
    errors: &'a mut Vec<ReconcileError>,
}

impl<'a> FieldReader<'a> {
    fn new(
        record_id: &'a str,
        normalizer: &'a Normalizer,
        errors: &'a mut Vec<ReconcileError>,
    ) -> Self {
        Self {
            record_id,
            normalizer,
            errors,
        }
    }

    fn fail(&mut self, field: &'static str, reason: String) {
        tracing::warn!(record_id = self.record_id, field, %reason, "field could not be read");
        self.errors
            .push(ReconcileError::record_field(self.record_id, field, reason));
    }

    /// Dates are always mandatory
    fn date(&mut self, field: &'static str, raw: Option<&str>) -> Option<NaiveDate> {
        let Some(value) = present(raw) else {
            self.fail(field, "missing value".to_string());
            return None;
        };
        let parsed = parse_date(value, self.normalizer.buddhist_era);
        if parsed.is_none() {
            self.fail(field, format!("unrecognized date '{}'", value));
        }
        parsed
    }

    fn datetime(&mut self, field: &'static str, raw: Option<&str>) -> Option<NaiveDateTime> {
        let Some(value) = present(raw) else {
            self.fail(field, "missing value".to_string());
            return None;
        };
        let parsed = parse_datetime(value, self.normalizer.buddhist_era);
        if parsed.is_none() {
            self.fail(field, format!("unrecognized date/time '{}'", value));
        }
        parsed
    }

    fn amount(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        mandatory: bool,
    ) -> Option<BigDecimal> {
        let Some(value) = present(raw) else {
            if mandatory {
                self.fail(field, "missing value".to_string());
            }
            return None;
        };
        let parsed = parse_amount(value);
        if parsed.is_none() {
            self.fail(field, format!("not a number: '{}'", value));
        }
        parsed
    }

    fn flag(&mut self, field: &'static str, raw: Option<&str>, mandatory: bool) -> Option<bool> {
        let Some(value) = present(raw) else {
            if mandatory {
                self.fail(field, "missing value".to_string());
            }
            return None;
        };
        let parsed = parse_flag(value);
        if parsed.is_none() {
            self.fail(field, format!("not a yes/no value: '{}'", value));
        }
        parsed
    }

    fn page(&mut self, raw: Option<&str>) -> Option<u32> {
        let value = present(raw)?;
        // Spreadsheet exports often write integer cells as "3.0"
        let digits = value.strip_suffix(".0").unwrap_or(value);
        match digits.parse::<u32>() {
            Ok(page) => Some(page),
            Err(_) => {
                self.fail("page", format!("not a page number: '{}'", value));
                None
            }
        }
    }
}

fn record_id(raw: Option<&str>, prefix: &str, idx: usize) -> String {
    match present(raw) {
        Some(id) => id.to_string(),
        None => format!("{}-{}", prefix, idx + 1),
    }
}

/// Trimmed value, or `None` for blanks and spreadsheet null markers
fn present(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    let is_null = value.is_empty()
        || value == "-"
        || value.eq_ignore_ascii_case("nan")
        || value.eq_ignore_ascii_case("nat")
        || value.eq_ignore_ascii_case("null");
    if is_null {
        None
    } else {
        Some(value)
    }
}

/// Collapse runs of whitespace into single spaces
pub fn clean_text(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a plain decimal amount, ignoring thousands separators
///
/// Exponent notation and more than [`MAX_AMOUNT_SCALE`] fractional digits are
/// rejected.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let unsigned = cleaned.strip_prefix(['-', '+']).unwrap_or(cleaned.as_str());
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let plain_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !plain_digits(whole)
        || !plain_digits(fraction)
        || fraction.len() > MAX_AMOUNT_SCALE
    {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// Parse a yes/no flag
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a calendar date; a trailing time part is ignored
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`, `DD-MM-YYYY` and `DD/MM/YY`.
pub fn parse_date(raw: &str, buddhist_era: bool) -> Option<NaiveDate> {
    let (date_part, _) = split_date_time(raw.trim());
    parse_date_part(date_part, buddhist_era)
}

/// Parse a date with an optional `HH:MM[:SS]` time; a missing time means midnight
pub fn parse_datetime(raw: &str, buddhist_era: bool) -> Option<NaiveDateTime> {
    let (date_part, time_part) = split_date_time(raw.trim());
    let date = parse_date_part(date_part, buddhist_era)?;
    let Some(time) = time_part else {
        return date.and_hms_opt(0, 0, 0);
    };
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(date.and_time(time))
}

fn split_date_time(raw: &str) -> (&str, Option<&str>) {
    match raw.find([' ', 'T']) {
        Some(idx) => {
            let time = raw[idx + 1..].trim();
            (&raw[..idx], (!time.is_empty()).then_some(time))
        }
        None => (raw, None),
    }
}

fn parse_date_part(raw: &str, buddhist_era: bool) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split(['-', '/', '.']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    let (year, month, day) = if first.len() == 4 {
        (*first, *second, *third)
    } else {
        (*third, *second, *first)
    };

    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let year = match year.len() {
        2 => {
            let short: i32 = year.parse().ok()?;
            if buddhist_era {
                2500 + short - BUDDHIST_ERA_OFFSET
            } else {
                2000 + short
            }
        }
        4 => {
            let full: i32 = year.parse().ok()?;
            if full > BUDDHIST_ERA_THRESHOLD {
                full - BUDDHIST_ERA_OFFSET
            } else {
                full
            }
        }
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}
