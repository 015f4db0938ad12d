use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DEven, ValidationError};

/// Stable numeric instrument identifier, invariant across renames.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct InsCode(pub u64);

impl InsCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        input
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidInsCode {
                value: input.to_owned(),
            })
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Display for InsCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InsCode {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

/// Instrument identity record as carried by the feed's 18/19-field rows.
/// `symbol_original` is set exactly when the instrument is a renamed
/// continuation of another listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub ins_code: InsCode,
    pub symbol: String,
    pub symbol_original: Option<String>,
    pub market_code: String,
    pub first_deven: DEven,
}

/// Positional indices inside an instrument feed row.
const IDX_INS_CODE: usize = 0;
const IDX_SYMBOL: usize = 5;
const IDX_FIRST_DEVEN: usize = 8;
const IDX_MARKET_CODE: usize = 13;
const IDX_SYMBOL_ORIGINAL: usize = 18;

impl Instrument {
    pub const ROW_FIELDS: usize = 18;

    /// Strict parse of one comma-separated feed row. 18 fields is a plain
    /// instrument; a 19th field carries the original symbol of a rename.
    pub fn parse_row(row: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != Self::ROW_FIELDS && fields.len() != Self::ROW_FIELDS + 1 {
            return Err(ValidationError::FieldCount {
                expected: Self::ROW_FIELDS,
                got: fields.len(),
            });
        }

        let symbol_original = fields
            .get(IDX_SYMBOL_ORIGINAL)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        Ok(Self {
            ins_code: InsCode::parse(fields[IDX_INS_CODE])?,
            symbol: fields[IDX_SYMBOL].trim().to_owned(),
            symbol_original,
            market_code: fields[IDX_MARKET_CODE].trim().to_owned(),
            first_deven: DEven::parse(fields[IDX_FIRST_DEVEN])?,
        })
    }

    /// Market flag sent with closing-price requests.
    pub fn price_flag(&self) -> u8 {
        if self.market_code == "NO" {
            0
        } else {
            1
        }
    }

    /// Root symbol of the rename chain this instrument belongs to.
    pub fn root_symbol(&self) -> &str {
        self.symbol_original.as_deref().unwrap_or(&self.symbol)
    }
}

/// One capital-structure change: the share count moved from `old_shares`
/// to `new_shares` effective on `deven`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEvent {
    pub id: u64,
    pub ins_code: InsCode,
    pub deven: DEven,
    pub old_shares: u64,
    pub new_shares: u64,
}

impl ShareEvent {
    pub const ROW_FIELDS: usize = 5;

    pub fn parse_row(row: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != Self::ROW_FIELDS {
            return Err(ValidationError::FieldCount {
                expected: Self::ROW_FIELDS,
                got: fields.len(),
            });
        }

        let id = parse_u64("id", fields[0])?;
        let ins_code = InsCode::parse(fields[1])?;
        let deven = DEven::parse(fields[2])?;
        let old_shares = parse_u64("old_shares", fields[3])?;
        let new_shares = parse_u64("new_shares", fields[4])?;

        if old_shares == 0 || new_shares == 0 {
            return Err(ValidationError::NonPositiveShares);
        }

        Ok(Self {
            id,
            ins_code,
            deven,
            old_shares,
            new_shares,
        })
    }

    /// Price-basis multiplier implied by the share change.
    pub fn ratio(&self) -> f64 {
        self.old_shares as f64 / self.new_shares as f64
    }
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ValidationError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::NumericField {
            field,
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_row() -> String {
        let mut fields = vec!["0"; Instrument::ROW_FIELDS];
        fields[IDX_INS_CODE] = "35425587644337450";
        fields[IDX_SYMBOL] = "فولاد";
        fields[IDX_FIRST_DEVEN] = "20080101";
        fields[IDX_MARKET_CODE] = "NO";
        fields.join(",")
    }

    #[test]
    fn parses_plain_instrument_row() {
        let instrument = Instrument::parse_row(&plain_row()).expect("must parse");
        assert_eq!(instrument.ins_code.value(), 35_425_587_644_337_450);
        assert_eq!(instrument.symbol, "فولاد");
        assert_eq!(instrument.symbol_original, None);
        assert_eq!(instrument.price_flag(), 0);
        assert_eq!(instrument.root_symbol(), "فولاد");
    }

    #[test]
    fn nineteenth_field_marks_a_rename() {
        let row = format!("{},فولاد", plain_row());
        let instrument = Instrument::parse_row(&row).expect("must parse");
        assert_eq!(instrument.symbol_original.as_deref(), Some("فولاد"));
        assert_eq!(instrument.root_symbol(), "فولاد");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = Instrument::parse_row("1,2,3").expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::FieldCount {
                expected: 18,
                got: 3
            }
        ));
    }

    #[test]
    fn parses_share_event_row() {
        let event = ShareEvent::parse_row("7,42,20230510,1000,2000").expect("must parse");
        assert_eq!(event.id, 7);
        assert_eq!(event.ins_code, InsCode(42));
        assert_eq!(event.deven.as_u32(), 20_230_510);
        assert!((event.ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_zero_share_counts() {
        let err = ShareEvent::parse_row("7,42,20230510,0,2000").expect_err("must fail");
        assert!(matches!(err, ValidationError::NonPositiveShares));
    }
}
