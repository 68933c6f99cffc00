use bigdecimal::BigDecimal;

pub const CURRENCY_ID: &str = "BRL";

/// Formats an amount the way the storefront shows prices, e.g. `R$ 1.234,56`.
pub fn format_brl(amount: &BigDecimal) -> String {
    let rounded = amount.round(2).with_scale(2).to_string();
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", rounded),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}R$ {},{}", sign, grouped, fraction)
}
