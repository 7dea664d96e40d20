#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReasonFlags {
    pub stop_loss: bool,
    pub take_profit: bool,
}

/// Reads the close reason of an exit leg. Matches the short `SL`/`TP`
/// tokens anywhere in the text (`DEAL_REASON_SL`, `sl hit`) as well as the
/// spelled-out forms regardless of separators (`TAKE_PROFIT`, `Stop Loss`).
pub fn classify_reason(reason: &str) -> ReasonFlags {
    let upper = reason.to_ascii_uppercase();
    let compact: String = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    ReasonFlags {
        stop_loss: upper.contains("SL") || compact.contains("STOPLOSS"),
        take_profit: upper.contains("TP") || compact.contains("TAKEPROFIT"),
    }
}

#[cfg(test)]
mod tests {
    use super::classify_reason;

    #[test]
    fn classifies_venue_reason_codes() {
        assert!(classify_reason("DEAL_REASON_SL").stop_loss);
        assert!(classify_reason("deal_reason_tp").take_profit);
        assert!(classify_reason("TAKE_PROFIT").take_profit);
        assert!(classify_reason("Stop Loss").stop_loss);

        let client = classify_reason("DEAL_REASON_CLIENT");
        assert!(!client.stop_loss);
        assert!(!client.take_profit);
        assert_eq!(classify_reason(""), Default::default());
    }
}
