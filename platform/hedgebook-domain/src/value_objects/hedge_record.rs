use crate::value_objects::side::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance marker written on the open/close side of a record when the
/// corresponding leg came from the venue API.
pub const API_SOURCE: &str = "API";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TP")]
    TakeProfit,
    Manual,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::StopLoss => "SL",
            Outcome::TakeProfit => "TP",
            Outcome::Manual => "Manual",
        }
    }
}

/// One consolidated position, ready to be upserted by `external_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeRecord {
    pub external_key: String,
    pub position_key: String,
    pub trading_account_id: Option<String>,
    pub symbol: Option<String>,
    pub currency_id: Option<String>,
    pub side: Option<Side>,
    pub total_profit: f64,
    pub total_commission: f64,
    pub total_swap: f64,
    pub open_time: Option<DateTime<Utc>>,
    pub open_price: Option<f64>,
    pub open_volume: Option<f64>,
    pub open_source: Option<String>,
    pub close_time: Option<DateTime<Utc>>,
    /// First exit price when known, otherwise `weighted_close_price`.
    pub close_price: Option<f64>,
    pub weighted_close_price: Option<f64>,
    pub close_source: Option<String>,
    pub outcome: Option<Outcome>,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
}

impl HedgeRecord {
    pub fn external_key_for(prefix: &str, position_key: &str) -> String {
        format!("{prefix}-{position_key}")
    }

    /// Re-keys the record under `account_code` and assigns its owning
    /// trading account. A blank code keeps the current external key.
    pub fn scoped_to_account(mut self, account_code: &str, trading_account_id: &str) -> Self {
        let code = account_code.trim();
        if !code.is_empty() {
            self.external_key = Self::external_key_for(code, &self.position_key);
        }
        self.trading_account_id = Some(trading_account_id.to_string());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.close_source.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{HedgeRecord, Outcome};

    fn record() -> HedgeRecord {
        HedgeRecord {
            external_key: "AT-0010-42".to_string(),
            position_key: "42".to_string(),
            trading_account_id: None,
            symbol: Some("EURUSD".to_string()),
            currency_id: None,
            side: None,
            total_profit: 0.0,
            total_commission: 0.0,
            total_swap: 0.0,
            open_time: None,
            open_price: None,
            open_volume: None,
            open_source: None,
            close_time: None,
            close_price: None,
            weighted_close_price: None,
            close_source: None,
            outcome: None,
            stop_loss_price: None,
            take_profit_price: None,
        }
    }

    #[test]
    fn scoping_rekeys_by_account_code() {
        let scoped = record().scoped_to_account(" ACME ", "001XYZ");
        assert_eq!(scoped.external_key, "ACME-42");
        assert_eq!(scoped.trading_account_id.as_deref(), Some("001XYZ"));
    }

    #[test]
    fn scoping_with_blank_code_keeps_prefixed_key() {
        let scoped = record().scoped_to_account("", "001XYZ");
        assert_eq!(scoped.external_key, "AT-0010-42");
    }

    #[test]
    fn outcome_serializes_as_short_labels() {
        let json = serde_json::to_string(&[Outcome::StopLoss, Outcome::TakeProfit, Outcome::Manual])
            .expect("json");
        assert_eq!(json, r#"["SL","TP","Manual"]"#);
    }
}
