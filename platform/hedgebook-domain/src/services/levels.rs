use crate::value_objects::deal::Deal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    StopLoss,
    TakeProfit,
}

impl LevelKind {
    pub fn tag(&self) -> &'static str {
        match self {
            LevelKind::StopLoss => "sl",
            LevelKind::TakeProfit => "tp",
        }
    }
}

/// Recovers the stop-loss or take-profit price an exit leg was closed at.
pub trait LevelExtractor {
    fn extract(&self, deal: &Deal, kind: LevelKind) -> Option<f64>;
}

/// Uses the explicit level on the deal when it is finite, otherwise the
/// first `[sl <price>]` / `[tp <price>]` tag of the broker comment.
#[derive(Debug, Default, Clone, Copy)]
pub struct BracketTagExtractor;

impl LevelExtractor for BracketTagExtractor {
    fn extract(&self, deal: &Deal, kind: LevelKind) -> Option<f64> {
        let explicit = match kind {
            LevelKind::StopLoss => deal.stop_loss,
            LevelKind::TakeProfit => deal.take_profit,
        };
        explicit.filter(|value| value.is_finite()).or_else(|| {
            deal.broker_comment
                .as_deref()
                .and_then(|comment| parse_bracket_tag(comment, kind.tag()))
        })
    }
}

/// Finds the first well-formed `[<tag> <number>]` in `text`, case-insensitive.
///
/// The tag and number may be separated by whitespace, `:` or `=`. Malformed
/// brackets are skipped.
pub fn parse_bracket_tag(text: &str, tag: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let close = rest.find(']')?;
        if let Some(value) = parse_tag_body(&rest[..close], &tag) {
            return Some(value);
        }
    }
    None
}

fn parse_tag_body(body: &str, tag: &str) -> Option<f64> {
    let after_tag = body.trim_start().strip_prefix(tag)?;
    let trimmed = after_tag.trim_start();
    let number = match trimmed.strip_prefix(':').or_else(|| trimmed.strip_prefix('=')) {
        Some(value) => value.trim(),
        None if trimmed.len() < after_tag.len() => trimmed.trim_end(),
        None => return None,
    };
    parse_plain_decimal(number)
}

fn parse_plain_decimal(value: &str) -> Option<f64> {
    let digits = value.strip_prefix(&['+', '-'][..]).unwrap_or(value);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("");
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{parse_bracket_tag, BracketTagExtractor, LevelExtractor, LevelKind};
    use crate::value_objects::deal::Deal;

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!(parse_bracket_tag("[sl 1.08300]", "sl"), Some(1.083));
        assert_eq!(parse_bracket_tag("closed [TP 2051.5]", "tp"), Some(2051.5));
        assert_eq!(parse_bracket_tag("[tp:12]", "tp"), Some(12.0));
        assert_eq!(parse_bracket_tag("[sl = .5 ]", "sl"), Some(0.5));
    }

    #[test]
    fn skips_malformed_tags() {
        assert_eq!(parse_bracket_tag("[sl abc] [sl 3.5]", "sl"), Some(3.5));
        assert_eq!(parse_bracket_tag("[[sl 4]", "sl"), Some(4.0));
        assert_eq!(parse_bracket_tag("[slx 1.0]", "sl"), None);
        assert_eq!(parse_bracket_tag("[sl1.0]", "sl"), None);
        assert_eq!(parse_bracket_tag("[sl inf]", "sl"), None);
        assert_eq!(parse_bracket_tag("[sl 1.0", "sl"), None);
        assert_eq!(parse_bracket_tag("[tp 1.0]", "sl"), None);
    }

    #[test]
    fn explicit_level_wins_over_comment() {
        let deal = Deal {
            stop_loss: Some(1.1),
            broker_comment: Some("[sl 1.2]".to_string()),
            ..Deal::default()
        };
        let extractor = BracketTagExtractor;
        assert_eq!(extractor.extract(&deal, LevelKind::StopLoss), Some(1.1));
        assert_eq!(extractor.extract(&deal, LevelKind::TakeProfit), None);

        let tagged = Deal {
            broker_comment: Some("[tp 1.3]".to_string()),
            ..Deal::default()
        };
        assert_eq!(extractor.extract(&tagged, LevelKind::TakeProfit), Some(1.3));
    }
}
