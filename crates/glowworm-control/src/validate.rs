//! TCP response validation
//!
//! Projector firmware answers vary between vendors, so acceptance is by
//! token rather than exact match. Only TCP responses go through this check;
//! HTTP and PC exchanges are accepted whenever they succeed.

use crate::types::PowerAction;

/// Tokens accepted as confirmation of power-on
const POWER_ON_TOKENS: &[&str] = &["ON", "POWER1", "PWR", "1"];

/// Tokens accepted as confirmation of power-off
const POWER_OFF_TOKENS: &[&str] = &["OFF", "POWER0", "PWR", "0"];

/// Decide whether a raw TCP response answers the action.
///
/// Matching is case-insensitive. Status queries accept any non-empty
/// response since the caller interprets the payload itself.
pub fn tcp_response_ok(action: PowerAction, response: &str) -> bool {
    match action {
        PowerAction::PowerOn => contains_any(response, POWER_ON_TOKENS),
        PowerAction::PowerOff => contains_any(response, POWER_OFF_TOKENS),
        PowerAction::Status => !response.trim().is_empty(),
    }
}

fn contains_any(response: &str, tokens: &[&str]) -> bool {
    let upper = response.to_uppercase();
    tokens.iter().any(|token| upper.contains(token))
}
