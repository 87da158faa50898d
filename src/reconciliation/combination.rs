//! Bounded subset search over one company's sale invoices
//!
//! A deposit often pays several invoices of one customer at once. The search
//! tries subsets of one, two and then three invoices and stops at the first
//! subset whose net amounts sum to within tolerance of the deposit. It does not
//! look for the closest subset, and never looks past three invoices.

use bigdecimal::BigDecimal;

use super::candidates::within_tolerance;
use crate::types::SaleInvoice;

/// Largest number of invoices one deposit may be matched against
pub const MAX_COMBINATION_SIZE: usize = 3;

/// Find the first subset of `candidates` (at most three invoices) whose net
/// amounts sum to within `tolerance` of `target`
///
/// Candidates are tried most recent invoice first; subsets are enumerated by
/// size, then in lexicographic order of that ranking. Candidates without a
/// net amount are ignored.
pub fn find_sale_combination<'a>(
    candidates: &[&'a SaleInvoice],
    target: &BigDecimal,
    tolerance: &BigDecimal,
) -> Option<Vec<&'a SaleInvoice>> {
    let mut ranked: Vec<(&'a SaleInvoice, &'a BigDecimal)> = candidates
        .iter()
        .filter_map(|sale| sale.net_amount.as_ref().map(|net| (*sale, net)))
        .collect();
    ranked.sort_by(|a, b| b.0.invoice_date.cmp(&a.0.invoice_date));

    let n = ranked.len();
    for size in 1..=MAX_COMBINATION_SIZE.min(n) {
        let mut indices: Vec<usize> = (0..size).collect();
        loop {
            let sum: BigDecimal = indices.iter().map(|&i| ranked[i].1).sum();
            if within_tolerance(&sum, target, tolerance) {
                return Some(indices.iter().map(|&i| ranked[i].0).collect());
            }
            if !next_combination(&mut indices, n) {
                break;
            }
        }
    }

    None
}

/// Advance `indices` to the next k-combination of `0..n` in lexicographic order
///
/// Returns `false` once the last combination has been visited.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    for i in (0..k).rev() {
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
