//! Display-ready views of raw backend payloads
//!
//! The backend reports some cost fields in an integer micro-unit encoding and
//! sizes in bytes. Everything here is a pure conversion; nothing touches the
//! network or orchestrator state.

use crate::models::{DashboardSummary, JobResult, TransferRecommendation};
use serde::Serialize;
use std::collections::BTreeSet;

/// Raw units per currency unit for the dashboard average daily cost
pub const DAILY_COST_DIVISOR: f64 = 10_000_000.0;

/// Raw units per currency unit for a transfer's 30-day expected savings
///
/// Kept separate from [`DAILY_COST_DIVISOR`]: the two fields come from
/// different backend computations and are not guaranteed to share a scale.
pub const SAVINGS_30D_DIVISOR: f64 = 10_000_000.0;

/// Bytes per mebibyte
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Presented optimization result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayResult {
    pub blocks_analyzed: u64,
    pub transfers_recommended: u64,
    pub current_daily_cost: String,
    pub expected_daily_cost: String,
    pub monthly_savings: String,
    pub improvement: String,
    /// One row per category seen before or after optimization
    pub distribution: Vec<DistributionRow>,
    pub transfers: Vec<DisplayTransfer>,
}

/// Block count of one category before and after optimization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    pub category: String,
    pub current: u64,
    pub optimized: u64,
}

/// Presented transfer recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTransfer {
    pub block_id: String,
    pub from: String,
    pub to: String,
    pub size: String,
    pub avg_daily_workloads: String,
    pub savings_30d: String,
    pub break_even_days: String,
}

/// Presented dashboard summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySummary {
    pub total_blocks: String,
    pub total_workloads: String,
    pub average_cost_per_day: String,
    pub cost_savings: String,
    pub blocks_by_type: Vec<CategoryCount>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Convert a completed job's result for display
pub fn present(result: &JobResult) -> DisplayResult {
    DisplayResult {
        blocks_analyzed: result.total_blocks_analyzed,
        transfers_recommended: result.transfers_recommended,
        current_daily_cost: format_currency(result.current_avg_daily_cost),
        expected_daily_cost: format_currency(result.expected_avg_daily_cost),
        monthly_savings: format_currency(result.expected_monthly_savings),
        improvement: format_percentage(result.percentage_improvement, 2),
        distribution: distribution_rows(result),
        transfers: result.recommended_transfers.iter().map(present_transfer).collect(),
    }
}

/// Convert a dashboard summary for display
pub fn present_summary(summary: &DashboardSummary) -> DisplaySummary {
    DisplaySummary {
        total_blocks: format_grouped(summary.total_blocks, 2),
        total_workloads: format_grouped(summary.total_workloads, 2),
        average_cost_per_day: format!(
            "${}",
            format_fixed(summary.average_cost_per_day / DAILY_COST_DIVISOR, 2)
        ),
        cost_savings: format_percentage(summary.cost_savings_percentage, 1),
        blocks_by_type: summary
            .blocks_by_type
            .iter()
            .map(|(category, count)| CategoryCount {
                category: category.clone(),
                count: *count,
            })
            .collect(),
        recommendation: summary.recommendation.clone(),
    }
}

fn present_transfer(transfer: &TransferRecommendation) -> DisplayTransfer {
    DisplayTransfer {
        block_id: transfer.block_id.clone(),
        from: transfer.current_category.clone(),
        to: transfer.recommended_category.clone(),
        size: format_mebibytes(transfer.size),
        avg_daily_workloads: format_fixed(transfer.avg_daily_workloads, 2),
        savings_30d: format_currency(transfer.expected_savings_30d / SAVINGS_30D_DIVISOR),
        break_even_days: to_exponential(transfer.days_to_break_even, 2),
    }
}

fn distribution_rows(result: &JobResult) -> Vec<DistributionRow> {
    let categories: BTreeSet<&String> = result
        .current_distribution
        .keys()
        .chain(result.optimized_distribution.keys())
        .collect();

    categories
        .into_iter()
        .map(|category| DistributionRow {
            category: category.clone(),
            current: result.current_distribution.get(category).copied().unwrap_or(0),
            optimized: result
                .optimized_distribution
                .get(category)
                .copied()
                .unwrap_or(0),
        })
        .collect()
}

/// Currency with grouped thousands and at most two fractional digits
pub fn format_currency(amount: f64) -> String {
    format!("${}", format_grouped(amount, 2))
}

/// Percentage with a fixed number of decimals
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{}%", format_fixed(value, decimals))
}

/// Bytes as mebibytes with two decimals
pub fn format_mebibytes(bytes: f64) -> String {
    format!("{} MB", format_fixed(bytes / BYTES_PER_MIB, 2))
}

/// Group the integer part by thousands and keep at most `max_fraction`
/// fractional digits, dropping trailing zeros
///
/// `1234567.891` with two digits becomes `1,234,567.89`; `2.5` stays `2.5`.
pub fn format_grouped(value: f64, max_fraction: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = round_half_away(&exact_fixed(value.abs(), max_fraction), max_fraction);
    let (integer, fraction) = match rounded.split_once('.') {
        Some((integer, fraction)) => (integer, fraction.trim_end_matches('0')),
        None => (rounded.as_str(), ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    let is_zero = grouped.chars().all(|c| c == '0' || c == '.' || c == ',');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Exponential notation with a signed exponent, e.g. `1.23e+3`
///
/// Keeps the order of magnitude visible for break-even figures that range
/// from days to millennia.
pub fn to_exponential(value: f64, fraction_digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*e}", fraction_digits + GUARD_DIGITS, value.abs());
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let Ok(mut exponent) = exponent.parse::<i32>() else {
        return formatted;
    };

    let mut mantissa = round_half_away(mantissa, fraction_digits);
    // 9.995 rounds up to 10.00
    if mantissa.starts_with("10") {
        mantissa = if fraction_digits == 0 {
            "1".to_string()
        } else {
            format!("1.{}", "0".repeat(fraction_digits))
        };
        exponent += 1;
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}e{}{}", sign, mantissa, exponent_sign, exponent.abs())
}

/// Fixed decimals, with ties rounded away from zero
///
/// `1.125` becomes `1.13`, where `format!("{:.2}")` would give `1.12`.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = round_half_away(&exact_fixed(value.abs(), decimals), decimals);
    let is_zero = rounded.bytes().all(|b| b == b'0' || b == b'.');
    if value < 0.0 && !is_zero {
        format!("-{}", rounded)
    } else {
        rounded
    }
}

/// Extra digits printed past the rounding position
///
/// Enough to tell an exact binary tie from a value one ulp away from it.
const GUARD_DIGITS: usize = 20;

fn exact_fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals + GUARD_DIGITS, value)
}

/// Round an unsigned decimal string to `decimals` fractional digits
///
/// The input must carry more fractional digits than `decimals`; the first
/// dropped digit decides the direction.
fn round_half_away(text: &str, decimals: usize) -> String {
    let (integer, fraction) = text.split_once('.').unwrap_or((text, ""));
    let mut digits: Vec<u8> = integer
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .map(|b| b - b'0')
        .collect();
    let mut integer_len = integer.len();

    let round_up = fraction
        .as_bytes()
        .get(decimals)
        .is_some_and(|digit| *digit >= b'5');
    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
            integer_len += 1;
        }
    }

    let mut out = String::with_capacity(digits.len() + 1);
    for (i, digit) in digits.iter().enumerate() {
        if i == integer_len {
            out.push('.');
        }
        out.push(char::from(b'0' + digit));
    }
    out
}
