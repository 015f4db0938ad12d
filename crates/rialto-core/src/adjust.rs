//! Back-adjustment of price series.
//!
//! Historical closes are scaled by a cumulative multiplier, newest to
//! oldest, so a single continuous series stays comparable across
//! corporate actions. The most recent record is always unchanged.
//!
//! | Condition | Basis |
//! |-----------|-------|
//! | 0 | none (nominal-price cleanup only) |
//! | 1 | dividends + splits, inferred from price gaps |
//! | 2 | splits only, from explicit share-event history |
//! | 3 | dividends only (price gaps minus split gaps) |

use std::collections::HashMap;

use crate::{DEven, InsCode, PriceRecord, ShareEvent};

/// Requested adjustment basis, wire values 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjustmentCondition {
    #[default]
    Raw,
    DividendsAndSplits,
    Splits,
    Dividends,
}

impl AdjustmentCondition {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::DividendsAndSplits => 1,
            Self::Splits => 2,
            Self::Dividends => 3,
        }
    }
}

impl TryFrom<u8> for AdjustmentCondition {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Raw),
            1 => Ok(Self::DividendsAndSplits),
            2 => Ok(Self::Splits),
            3 => Ok(Self::Dividends),
            other => Err(other),
        }
    }
}

/// Adjustment knobs.
#[derive(Debug, Clone)]
pub struct AdjustConfig {
    /// Placeholder opening prices the exchange assigns on a first session
    /// after a market transfer.
    pub nominal_prices: Vec<f64>,
    /// Gap-event fraction above which the condition-1 heuristic considers
    /// a series too noisy and leaves it unadjusted.
    pub max_gap_ratio: f64,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            nominal_prices: vec![1000.0],
            max_gap_ratio: 0.08,
        }
    }
}

/// One record with its back-adjusted close (rial convention: rounded to
/// the nearest integer, uniformly across all conditions).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AdjustedRecord {
    #[serde(flatten)]
    pub record: PriceRecord,
    pub adj_close: f64,
}

/// Back-adjust a chain-merged series.
///
/// `records` must be sorted ascending by date and restricted to `codes`
/// (a chain's codes in chain order). Missing share history under
/// conditions 2 and 3 degrades to a multiplier of 1 everywhere.
pub fn adjust(
    condition: AdjustmentCondition,
    mut records: Vec<PriceRecord>,
    share_events: &[ShareEvent],
    codes: &[InsCode],
    config: &AdjustConfig,
) -> Vec<AdjustedRecord> {
    if codes.len() > 1 {
        scrub_nominal_runs(&mut records, config);
    }

    let multipliers = match condition {
        AdjustmentCondition::Raw => vec![1.0; records.len()],
        AdjustmentCondition::DividendsAndSplits => {
            let steps = price_gap_steps(&records);
            if too_noisy(&steps, records.len(), config) {
                vec![1.0; records.len()]
            } else {
                cumulative(&steps)
            }
        }
        AdjustmentCondition::Splits => cumulative(&shifted_split_steps(&records, share_events)),
        AdjustmentCondition::Dividends => {
            let split_steps = shifted_split_steps(&records, share_events);
            let steps: Vec<f64> = price_gap_steps(&records)
                .iter()
                .zip(&split_steps)
                // A gap explained by a split is not a dividend.
                .map(|(&gap, &split)| if split != 1.0 { 1.0 } else { gap })
                .collect();
            cumulative(&steps)
        }
    };

    records
        .into_iter()
        .zip(multipliers)
        .map(|(record, multiplier)| {
            let adj_close = (multiplier * record.p_closing).round();
            AdjustedRecord { record, adj_close }
        })
        .collect()
}

/// Replace nominal-price artifacts at code seams of a merged chain.
///
/// A new code segment whose first close is one of the configured nominal
/// prices, and whose reference close does not line up with the previous
/// record, starts a run of placeholder rows. The run extends while no
/// shares trade; every row in it takes the carried-forward prior close.
fn scrub_nominal_runs(records: &mut [PriceRecord], config: &AdjustConfig) {
    let mut i = 1;
    while i < records.len() {
        let seam = records[i].ins_code != records[i - 1].ins_code;
        if seam {
            let nominal = config
                .nominal_prices
                .iter()
                .any(|&price| records[i].p_closing == price);
            let discontinuous = records[i].price_yesterday != records[i - 1].p_closing;
            if nominal && discontinuous {
                let carried = records[i - 1].p_closing;
                let start = i;
                while i < records.len() && records[i].is_untraded() {
                    records[i].p_closing = carried;
                    records[i].price_yesterday = carried;
                    i += 1;
                }
                tracing::warn!(
                    code = %records[start].ins_code,
                    from = %records[start].deven,
                    rows = i - start,
                    "replaced nominal-price run with carried-forward close"
                );
                continue;
            }
        }
        i += 1;
    }
}

/// Per-position step multipliers inferred from price gaps. `steps[t]`
/// scales every record at or before `t`; the final position has no step.
fn price_gap_steps(records: &[PriceRecord]) -> Vec<f64> {
    let n = records.len();
    let mut steps = vec![1.0; n];
    for t in 0..n.saturating_sub(1) {
        let same_code = records[t].ins_code == records[t + 1].ins_code;
        if same_code
            && records[t].p_closing != records[t + 1].price_yesterday
            && records[t].p_closing != 0.0
        {
            steps[t] = records[t + 1].price_yesterday / records[t].p_closing;
        }
    }
    steps
}

/// Split steps from share-event history, shifted one position older: an
/// event effective on date D rebases prices strictly before D.
fn shifted_split_steps(records: &[PriceRecord], share_events: &[ShareEvent]) -> Vec<f64> {
    let ratios: HashMap<(InsCode, DEven), f64> = share_events
        .iter()
        .map(|event| ((event.ins_code, event.deven), event.ratio()))
        .collect();

    let n = records.len();
    let mut steps = vec![1.0; n];
    for t in 0..n.saturating_sub(1) {
        let next = &records[t + 1];
        if let Some(&ratio) = ratios.get(&(next.ins_code, next.deven)) {
            steps[t] = ratio;
        }
    }
    steps
}

/// Cumulative product of steps, newest to oldest. The newest record's
/// multiplier is 1.
fn cumulative(steps: &[f64]) -> Vec<f64> {
    let n = steps.len();
    let mut multipliers = vec![1.0; n];
    for t in (0..n.saturating_sub(1)).rev() {
        multipliers[t] = multipliers[t + 1] * steps[t];
    }
    multipliers
}

fn too_noisy(steps: &[f64], total: usize, config: &AdjustConfig) -> bool {
    if total == 0 {
        return false;
    }
    let gaps = steps.iter().filter(|&&step| step != 1.0).count();
    gaps as f64 / total as f64 > config.max_gap_ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: u64, deven: u32, close: f64, yesterday: f64, volume: f64) -> PriceRecord {
        PriceRecord {
            ins_code: InsCode(code),
            deven: DEven::parse(&deven.to_string()).expect("valid deven"),
            p_closing: close,
            p_dr_cot_val: close,
            z_tot_tran: if volume == 0.0 { 0.0 } else { 10.0 },
            q_tot_tran: volume,
            q_tot_cap: close * volume,
            price_min: close,
            price_max: close,
            price_yesterday: yesterday,
            price_first: close,
        }
    }

    fn share_event(code: u64, deven: u32, old: u64, new: u64) -> ShareEvent {
        ShareEvent {
            id: 1,
            ins_code: InsCode(code),
            deven: DEven::parse(&deven.to_string()).expect("valid deven"),
            old_shares: old,
            new_shares: new,
        }
    }

    fn closes(adjusted: &[AdjustedRecord]) -> Vec<f64> {
        adjusted.iter().map(|a| a.adj_close).collect()
    }

    #[test]
    fn raw_condition_is_the_identity() {
        let records = vec![
            record(1, 20230101, 100.0, 99.0, 500.0),
            record(1, 20230102, 102.0, 100.0, 500.0),
        ];
        let adjusted = adjust(
            AdjustmentCondition::Raw,
            records.clone(),
            &[],
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        assert_eq!(closes(&adjusted), vec![100.0, 102.0]);
        assert_eq!(adjusted[0].record, records[0]);
    }

    #[test]
    fn half_split_rebases_records_strictly_before_the_event() {
        // Share count doubles effective 2023-01-03; prices before that day
        // halve, the event day and later stay put.
        let records = vec![
            record(1, 20230101, 1000.0, 990.0, 500.0),
            record(1, 20230102, 1010.0, 1000.0, 500.0),
            record(1, 20230103, 505.0, 505.0, 500.0),
            record(1, 20230104, 510.0, 505.0, 500.0),
        ];
        let events = vec![share_event(1, 20230103, 1000, 2000)];
        let adjusted = adjust(
            AdjustmentCondition::Splits,
            records,
            &events,
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        assert_eq!(closes(&adjusted), vec![500.0, 505.0, 505.0, 510.0]);
    }

    #[test]
    fn missing_share_history_is_a_no_op() {
        let records = vec![
            record(1, 20230101, 1000.0, 990.0, 500.0),
            record(1, 20230102, 505.0, 500.0, 500.0),
        ];
        let adjusted = adjust(
            AdjustmentCondition::Splits,
            records,
            &[],
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        assert_eq!(closes(&adjusted), vec![1000.0, 505.0]);
    }

    #[test]
    fn price_gap_scales_older_records() {
        // Twenty flat sessions with one 10% dividend gap after day 10:
        // 1 gap / 20 records = 5%, inside the noise budget.
        let mut records = Vec::new();
        for day in 1..=20u32 {
            let (close, yesterday) = if day <= 10 { (100.0, 100.0) } else { (90.0, 90.0) };
            records.push(record(1, 20230100 + day, close, yesterday, 500.0));
        }
        let adjusted = adjust(
            AdjustmentCondition::DividendsAndSplits,
            records,
            &[],
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        // Older records scale by 90/100 so the series is continuous.
        assert_eq!(adjusted[0].adj_close, 90.0);
        assert_eq!(adjusted[9].adj_close, 90.0);
        assert_eq!(adjusted[10].adj_close, 90.0);
        assert_eq!(adjusted[19].adj_close, 90.0);
    }

    #[test]
    fn noisy_series_skips_the_gap_heuristic() {
        // Every boundary is a gap: 2 gaps over 3 records is far above 8%.
        let records = vec![
            record(1, 20230101, 100.0, 99.0, 500.0),
            record(1, 20230102, 95.0, 90.0, 500.0),
            record(1, 20230103, 91.0, 85.0, 500.0),
        ];
        let adjusted = adjust(
            AdjustmentCondition::DividendsAndSplits,
            records,
            &[],
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        assert_eq!(closes(&adjusted), vec![100.0, 95.0, 91.0]);
    }

    #[test]
    fn dividends_condition_ignores_split_gaps() {
        // The only price gap coincides with the share event, so the
        // dividends-only basis must leave the series untouched.
        let records = vec![
            record(1, 20230101, 1000.0, 990.0, 500.0),
            record(1, 20230102, 505.0, 500.0, 500.0),
        ];
        let events = vec![share_event(1, 20230102, 1000, 2000)];
        let adjusted = adjust(
            AdjustmentCondition::Dividends,
            records,
            &events,
            &[InsCode(1)],
            &AdjustConfig::default(),
        );
        assert_eq!(closes(&adjusted), vec![1000.0, 505.0]);
    }

    #[test]
    fn nominal_run_takes_the_carried_forward_close() {
        // Chain seam: new code lists at the nominal 1000 with no trades for
        // two sessions, then trades resume.
        let records = vec![
            record(1, 20230101, 1500.0, 1490.0, 500.0),
            record(2, 20230102, 1000.0, 1000.0, 0.0),
            record(2, 20230103, 1000.0, 1000.0, 0.0),
            record(2, 20230104, 1520.0, 1500.0, 500.0),
        ];
        let adjusted = adjust(
            AdjustmentCondition::Raw,
            records,
            &[],
            &[InsCode(1), InsCode(2)],
            &AdjustConfig::default(),
        );
        assert_eq!(adjusted[1].record.p_closing, 1500.0);
        assert_eq!(adjusted[1].record.price_yesterday, 1500.0);
        assert_eq!(adjusted[2].record.p_closing, 1500.0);
        assert_eq!(adjusted[3].record.p_closing, 1520.0);
    }

    #[test]
    fn single_code_input_skips_nominal_cleanup() {
        let records = vec![
            record(2, 20230101, 1500.0, 1490.0, 500.0),
            record(2, 20230102, 1000.0, 1000.0, 0.0),
        ];
        let adjusted = adjust(
            AdjustmentCondition::Raw,
            records,
            &[],
            &[InsCode(2)],
            &AdjustConfig::default(),
        );
        assert_eq!(adjusted[1].record.p_closing, 1000.0);
    }

    #[test]
    fn condition_codes_round_trip() {
        for value in 0..4u8 {
            let condition = AdjustmentCondition::try_from(value).expect("valid");
            assert_eq!(condition.as_u8(), value);
        }
        assert!(AdjustmentCondition::try_from(4).is_err());
    }
}
