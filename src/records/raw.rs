//! Raw, string-valued records as handed over by the cleaning stage
//!
//! Every field is optional text. Field names are stable regardless of the
//! display language of the exported spreadsheets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStatementLine {
    pub id: Option<String>,
    pub datetime: Option<String>,
    pub amount: Option<String>,
    pub is_deposit: Option<String>,
    pub balance: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSaleInvoice {
    pub id: Option<String>,
    pub date_of_sale_invoice: Option<String>,
    pub sale_invoice_tax_number: Option<String>,
    pub company_name: Option<String>,
    pub company_tax_id: Option<String>,
    pub product_value: Option<String>,
    pub vat: Option<String>,
    pub total_amount: Option<String>,
    pub withholding_tax: Option<String>,
    pub net_amount: Option<String>,
    pub matched: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPurchaseInvoice {
    pub id: Option<String>,
    pub date_of_purchase_invoice: Option<String>,
    pub purchase_invoice_tax_number: Option<String>,
    pub purchase_invoice_id: Option<String>,
    pub company_name: Option<String>,
    pub company_tax_id: Option<String>,
    pub product_value: Option<String>,
    pub vat: Option<String>,
    pub total_amount: Option<String>,
    pub matched: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWithholdingRecord {
    pub id: Option<String>,
    pub paid_date: Option<String>,
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub amount: Option<String>,
    pub withholding_tax: Option<String>,
    pub paid_amount: Option<String>,
    pub matched: Option<String>,
}

/// The four raw record sets of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecordSet {
    pub statement_lines: Vec<RawStatementLine>,
    pub sales: Vec<RawSaleInvoice>,
    pub purchases: Vec<RawPurchaseInvoice>,
    pub withholdings: Vec<RawWithholdingRecord>,
}
