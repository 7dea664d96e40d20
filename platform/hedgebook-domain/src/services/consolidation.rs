//! Folds raw deal legs into one [`HedgeRecord`] per position.
//!
//! Only `IN`/`OUT` legs take part. Legs are grouped by
//! [`Deal::position_key`], ordered by time inside each group (unparseable
//! times first) and summarised:
//!
//! * open fields come from the earliest entry leg;
//! * the close time is the last exit leg's, the reported close price is the
//!   first exit's price, falling back to the volume-weighted exit price;
//! * profit, commission and swap are summed over every leg;
//! * the side follows the signed entry volume;
//! * the outcome and stop/target prices come from exit reasons.
//!
//! Records are returned sorted by position key.

use crate::repositories::symbol_lookup::SymbolLookup;
use crate::services::levels::{BracketTagExtractor, LevelExtractor, LevelKind};
use crate::services::reason::classify_reason;
use crate::value_objects::deal::{Deal, DealType};
use crate::value_objects::hedge_record::{HedgeRecord, Outcome, API_SOURCE};
use crate::value_objects::side::Side;
use std::collections::BTreeMap;

pub struct ConsolidationOptions<'a> {
    pub key_prefix: String,
    pub currency_lookup: Option<&'a dyn SymbolLookup>,
    pub extractor: &'a dyn LevelExtractor,
}

impl<'a> ConsolidationOptions<'a> {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            currency_lookup: None,
            extractor: &BracketTagExtractor,
        }
    }

    pub fn with_currency_lookup(mut self, lookup: &'a dyn SymbolLookup) -> Self {
        self.currency_lookup = Some(lookup);
        self
    }

    pub fn with_extractor(mut self, extractor: &'a dyn LevelExtractor) -> Self {
        self.extractor = extractor;
        self
    }
}

pub fn consolidate(deals: &[Deal], options: &ConsolidationOptions<'_>) -> Vec<HedgeRecord> {
    let mut groups: BTreeMap<&str, Vec<&Deal>> = BTreeMap::new();
    let mut unkeyed = 0usize;
    for deal in deals.iter().filter(|deal| deal.entry_type.is_trade_leg()) {
        match deal.position_key() {
            Some(key) => groups.entry(key).or_default().push(deal),
            None => unkeyed += 1,
        }
    }
    if unkeyed > 0 {
        tracing::debug!(unkeyed, "dropped trade legs without a position key");
    }

    groups
        .into_iter()
        .map(|(key, legs)| consolidate_group(key, &legs, options))
        .collect()
}

fn consolidate_group(
    position_key: &str,
    legs: &[&Deal],
    options: &ConsolidationOptions<'_>,
) -> HedgeRecord {
    // Exit reasons are read in arrival order, before the time sort.
    let exits_as_received = legs.iter().copied().filter(|deal| deal.is_exit());
    let assessment = assess_exits(exits_as_received, options.extractor);

    let mut ordered: Vec<&Deal> = legs.to_vec();
    ordered.sort_by_cached_key(|deal| deal.timestamp());

    let entries: Vec<&Deal> = ordered.iter().copied().filter(|d| d.is_entry()).collect();
    let exits: Vec<&Deal> = ordered.iter().copied().filter(|d| d.is_exit()).collect();

    let first_entry = entries.first().copied();
    let first_exit = exits.first().copied();
    let last_exit = exits.last().copied();

    let symbol = ordered.first().and_then(|deal| deal.symbol.clone());
    let currency_id = match (options.currency_lookup, symbol.as_deref()) {
        (Some(lookup), Some(symbol)) => lookup.resolve(symbol),
        _ => None,
    };

    let weighted_close_price = volume_weighted_price(&exits);
    let close_price = first_exit
        .and_then(|deal| deal.price)
        .or(weighted_close_price);

    tracing::debug!(
        position_key,
        entries = entries.len(),
        exits = exits.len(),
        "consolidated position"
    );

    HedgeRecord {
        external_key: HedgeRecord::external_key_for(&options.key_prefix, position_key),
        position_key: position_key.to_string(),
        trading_account_id: None,
        symbol,
        currency_id,
        side: infer_side(&entries),
        total_profit: ordered.iter().map(|deal| deal.profit_or_zero()).sum(),
        total_commission: ordered.iter().map(|deal| deal.commission_or_zero()).sum(),
        total_swap: ordered.iter().map(|deal| deal.swap_or_zero()).sum(),
        open_time: first_entry.and_then(|deal| deal.timestamp()),
        open_price: first_entry.and_then(|deal| deal.price),
        open_volume: first_entry.and_then(|deal| deal.volume),
        open_source: first_entry.map(|_| API_SOURCE.to_string()),
        close_time: last_exit.and_then(|deal| deal.timestamp()),
        close_price,
        weighted_close_price,
        close_source: last_exit.map(|_| API_SOURCE.to_string()),
        outcome: assessment.outcome,
        stop_loss_price: assessment.stop_loss_price,
        take_profit_price: assessment.take_profit_price,
    }
}

/// Net entry volume decides the side; a flat net falls back to the first
/// entry's type. No entry legs, no side.
fn infer_side(entries: &[&Deal]) -> Option<Side> {
    let first = entries.first()?;
    let net: f64 = entries
        .iter()
        .map(|deal| match deal.deal_type {
            DealType::Buy => deal.volume_or_zero(),
            DealType::Sell => -deal.volume_or_zero(),
            _ => 0.0,
        })
        .sum();

    if net > 0.0 {
        Some(Side::Buy)
    } else if net < 0.0 {
        Some(Side::Sell)
    } else if first.deal_type == DealType::Sell {
        Some(Side::Sell)
    } else {
        Some(Side::Buy)
    }
}

fn volume_weighted_price(exits: &[&Deal]) -> Option<f64> {
    let (notional, volume) = exits
        .iter()
        .filter_map(|deal| match (deal.price, deal.volume) {
            (Some(price), Some(volume)) if volume > 0.0 => Some((price * volume, volume)),
            _ => None,
        })
        .fold((0.0, 0.0), |(notional, total), (value, volume)| {
            (notional + value, total + volume)
        });
    (volume > 0.0).then(|| notional / volume)
}

#[derive(Debug, Default)]
struct ExitAssessment {
    outcome: Option<Outcome>,
    stop_loss_price: Option<f64>,
    take_profit_price: Option<f64>,
}

fn assess_exits<'d>(
    exits: impl Iterator<Item = &'d Deal>,
    extractor: &dyn LevelExtractor,
) -> ExitAssessment {
    let mut assessment = ExitAssessment::default();
    let mut any_exit = false;

    for deal in exits {
        any_exit = true;
        let flags = classify_reason(deal.reason.as_deref().unwrap_or_default());
        if flags.stop_loss {
            assessment.outcome.get_or_insert(Outcome::StopLoss);
            if assessment.stop_loss_price.is_none() {
                assessment.stop_loss_price = extractor.extract(deal, LevelKind::StopLoss);
            }
        }
        if flags.take_profit {
            assessment.outcome.get_or_insert(Outcome::TakeProfit);
            if assessment.take_profit_price.is_none() {
                assessment.take_profit_price = extractor.extract(deal, LevelKind::TakeProfit);
            }
        }
    }

    if any_exit && assessment.outcome.is_none() {
        assessment.outcome = Some(Outcome::Manual);
    }
    assessment
}
