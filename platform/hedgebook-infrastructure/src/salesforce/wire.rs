//! `SR_Hedge__c` row layout and composite API reply parsing.

use chrono::{DateTime, SecondsFormat, Utc};
use hedgebook_domain::repositories::record_store::StoreError;
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use hedgebook_domain::value_objects::upsert_outcome::UpsertOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct Attributes<'a> {
    #[serde(rename = "type")]
    pub sobject: &'a str,
}

/// One hedge row as the org stores it. The external id column name is
/// configurable, so it travels in the flattened `external_key` map.
#[derive(Debug, Serialize)]
pub struct HedgeRow<'a> {
    pub attributes: Attributes<'a>,
    #[serde(flatten)]
    pub external_key: BTreeMap<&'a str, &'a str>,
    #[serde(
        rename = "Actual_Trading_Account__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub trading_account: Option<&'a str>,
    #[serde(rename = "Currency__c")]
    pub currency: Option<&'a str>,
    #[serde(rename = "Side__c")]
    pub side: Option<&'static str>,
    #[serde(rename = "X1st_Trade_Profit__c")]
    pub profit: f64,
    #[serde(rename = "X1st_Trade_Open_Price__c")]
    pub open_price: Option<f64>,
    #[serde(rename = "Open_Date_Time__c")]
    pub open_time: Option<String>,
    #[serde(rename = "X1st_Trade_Units__c")]
    pub open_units: Option<f64>,
    #[serde(rename = "Open_Comments__c")]
    pub open_comments: Option<&'a str>,
    #[serde(rename = "Open_Screenshot__c")]
    pub open_screenshot: Option<&'a str>,
    #[serde(rename = "X1st_Trade_Close_Price__c")]
    pub close_price: Option<f64>,
    #[serde(rename = "Close_Date_Time__c")]
    pub close_time: Option<String>,
    #[serde(rename = "Closing_Comments__c")]
    pub closing_comments: Option<&'a str>,
    #[serde(rename = "Close_Screenshot__c")]
    pub close_screenshot: Option<&'a str>,
    #[serde(rename = "Outcome__c")]
    pub outcome: Option<&'static str>,
    #[serde(rename = "Stop_Loss_Price__c")]
    pub stop_loss_price: Option<f64>,
    #[serde(rename = "Take_Profit_Price__c")]
    pub take_profit_price: Option<f64>,
}

impl<'a> HedgeRow<'a> {
    pub fn from_record(record: &'a HedgeRecord, sobject: &'a str, external_key_field: &'a str) -> Self {
        Self {
            attributes: Attributes { sobject },
            external_key: BTreeMap::from([(external_key_field, record.external_key.as_str())]),
            trading_account: record.trading_account_id.as_deref(),
            currency: record.currency_id.as_deref(),
            side: record.side.map(|side| side.as_str()),
            profit: record.total_profit,
            open_price: record.open_price,
            open_time: record.open_time.map(format_datetime),
            open_units: record.open_volume,
            open_comments: record.open_source.as_deref(),
            open_screenshot: record.open_source.as_deref(),
            close_price: record.close_price,
            close_time: record.close_time.map(format_datetime),
            closing_comments: record.close_source.as_deref(),
            close_screenshot: record.close_source.as_deref(),
            outcome: record.outcome.map(|outcome| outcome.as_str()),
            stop_loss_price: record.stop_loss_price,
            take_profit_price: record.take_profit_price,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBody<'a> {
    pub all_or_none: bool,
    pub records: Vec<HedgeRow<'a>>,
}

impl<'a> UpsertBody<'a> {
    /// Continue-on-error body: one failing row never rolls back the others.
    pub fn new(records: &'a [HedgeRecord], sobject: &'a str, external_key_field: &'a str) -> Self {
        Self {
            all_or_none: false,
            records: records
                .iter()
                .map(|record| HedgeRow::from_record(record, sobject, external_key_field))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveError {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SaveError {
    pub fn flatten(&self) -> String {
        format!(
            "{}: {}",
            self.status_code.as_deref().unwrap_or("UNKNOWN"),
            self.message.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

impl From<SaveResult> for UpsertOutcome {
    fn from(result: SaveResult) -> Self {
        UpsertOutcome {
            id: result.id.filter(|id| !id.is_empty()),
            success: result.success,
            created: result.created,
            errors: result.errors.iter().map(SaveError::flatten).collect(),
        }
    }
}

pub fn parse_save_results(body: &str) -> Result<Vec<UpsertOutcome>, StoreError> {
    let results: Vec<SaveResult> = serde_json::from_str(body)
        .map_err(|err| StoreError::Decode(format!("invalid composite reply: {err}")))?;
    Ok(results.into_iter().map(UpsertOutcome::from).collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub records: Vec<NamedRecord>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
