use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Direction of a deal leg relative to the position it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum EntryType {
    In,
    Out,
    #[default]
    Unknown,
    Other(String),
}

impl EntryType {
    pub fn is_trade_leg(&self) -> bool {
        matches!(self, EntryType::In | EntryType::Out)
    }
}

impl From<Option<String>> for EntryType {
    fn from(value: Option<String>) -> Self {
        let Some(raw) = value else {
            return EntryType::Unknown;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEAL_ENTRY_IN" | "ENTRY_IN" => EntryType::In,
            "DEAL_ENTRY_OUT" | "ENTRY_OUT" => EntryType::Out,
            "" => EntryType::Unknown,
            _ => EntryType::Other(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum DealType {
    Buy,
    Sell,
    #[default]
    Unknown,
    Other(String),
}

impl From<Option<String>> for DealType {
    fn from(value: Option<String>) -> Self {
        let Some(raw) = value else {
            return DealType::Unknown;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEAL_TYPE_BUY" | "TYPE_BUY" => DealType::Buy,
            "DEAL_TYPE_SELL" | "TYPE_SELL" => DealType::Sell,
            "" => DealType::Unknown,
            _ => DealType::Other(raw),
        }
    }
}

/// One execution leg as reported by the trading venue.
///
/// Every field is optional on the wire. Identifiers accept JSON strings or
/// numbers, numeric fields accept numbers or numeric strings; anything else
/// reads as absent instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub position_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default, rename = "type")]
    pub deal_type: DealType,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub profit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub commission: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub swap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub broker_comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stop_loss: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub take_profit: Option<f64>,
}

impl Deal {
    /// Key of the position this leg belongs to: position id, then order id,
    /// then deal id, taken verbatim. `None` when all three are absent.
    pub fn position_key(&self) -> Option<&str> {
        [&self.position_id, &self.order_id, &self.id]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .find(|value| !value.is_empty())
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time.as_deref().and_then(parse_deal_time)
    }

    pub fn is_entry(&self) -> bool {
        self.entry_type == EntryType::In
    }

    pub fn is_exit(&self) -> bool {
        self.entry_type == EntryType::Out
    }

    pub fn volume_or_zero(&self) -> f64 {
        finite_or_zero(self.volume)
    }

    pub fn profit_or_zero(&self) -> f64 {
        finite_or_zero(self.profit)
    }

    pub fn commission_or_zero(&self) -> f64 {
        finite_or_zero(self.commission)
    }

    pub fn swap_or_zero(&self) -> f64 {
        finite_or_zero(self.swap)
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parses a venue timestamp. Accepts RFC 3339 and naive
/// `YYYY-MM-DD HH:MM:SS[.fff]` / `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC).
pub fn parse_deal_time(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        // Zero is the venue's "unset" id.
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => non_blank(s),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
