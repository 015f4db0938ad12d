use serde::{Deserialize, Serialize};

use crate::{DEven, InsCode, ValidationError};

/// One daily trading record as archived per instrument code.
///
/// Field names follow the feed's vocabulary: `p_closing` is the official
/// close, `p_dr_cot_val` the last traded price, `price_yesterday` the
/// reference close of the prior session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub ins_code: InsCode,
    pub deven: DEven,
    pub p_closing: f64,
    pub p_dr_cot_val: f64,
    pub z_tot_tran: f64,
    pub q_tot_tran: f64,
    pub q_tot_cap: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub price_yesterday: f64,
    pub price_first: f64,
}

impl PriceRecord {
    pub const ROW_FIELDS: usize = 11;

    /// Strict parse of one closing-price feed row. Feed order: code, date,
    /// close, last, trade count, volume, value, low, high, yesterday, open.
    pub fn parse_row(row: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != Self::ROW_FIELDS {
            return Err(ValidationError::FieldCount {
                expected: Self::ROW_FIELDS,
                got: fields.len(),
            });
        }

        Ok(Self {
            ins_code: InsCode::parse(fields[0])?,
            deven: DEven::parse(fields[1])?,
            p_closing: parse_f64("p_closing", fields[2])?,
            p_dr_cot_val: parse_f64("p_dr_cot_val", fields[3])?,
            z_tot_tran: parse_f64("z_tot_tran", fields[4])?,
            q_tot_tran: parse_f64("q_tot_tran", fields[5])?,
            q_tot_cap: parse_f64("q_tot_cap", fields[6])?,
            price_min: parse_f64("price_min", fields[7])?,
            price_max: parse_f64("price_max", fields[8])?,
            price_yesterday: parse_f64("price_yesterday", fields[9])?,
            price_first: parse_f64("price_first", fields[10])?,
        })
    }

    /// True when no shares changed hands that day.
    pub fn is_untraded(&self) -> bool {
        self.q_tot_tran == 0.0
    }
}

fn parse_f64(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NumericField {
            field,
            value: value.to_owned(),
        })?;
    if !parsed.is_finite() {
        return Err(ValidationError::NumericField {
            field,
            value: value.to_owned(),
        });
    }
    Ok(parsed)
}
