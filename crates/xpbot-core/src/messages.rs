//! User-facing strings and reply templates.

use chrono::{DateTime, Utc};

use crate::rewards::{format_remaining, XpRecord};

pub const WELCOME: &str = "Welcome to Tren Finance!\n\n\
Tren Finance is a DeFi protocol developed by a team of experienced DeFi enthusiasts, aiming to unlock greater capital efficiency for a wide range of crypto assets. \
The protocol addresses a critical challenge: the limited support for diverse tokens in existing DeFi platforms, resulting in a 'metaphoric wall' that hinders effective use of these assets.\n\n\
One of the critical limitations of current DeFi lending and borrowing markets is the restricted list of eligible collateral assets, which often includes only mainstream tokens. \
This limitation bars a significant portion of DeFi assets from participation, particularly long-tail assets that, despite their potential, introduce higher risks. \
Tren Finance addresses this by implementing isolated risk modules. These modules contain risks within individual pools, allowing for asset-specific risk parameters and thus enabling a broader range of assets to be safely integrated as collateral. \
This not only expands options for users but also enhances the overall system's resilience against systemic risks.\n\n\
You can check your XP points using our bot by entering the /xp command after you have provided your wallet address.";

pub const ASK_WALLET: &str = "Please enter your wallet address.";
pub const WELCOME_BACK: &str = "Welcome back! You can check your XP points using the /xp command.";
pub const START_FIRST: &str = "Please send /start first.";

pub const WALLET_SAVED: &str =
    "Wallet address saved. Thank you! You can now use the /xp command to check your XP points.";
pub const WALLET_ALREADY_SET: &str = "You have already provided your wallet address.";
pub const WALLET_NOT_FOUND: &str =
    "Wallet address not found. Please enter your wallet address first.";

pub const NO_POINTS: &str = "You don't have any points.";
pub const XP_FETCH_ERROR: &str = "Error fetching XP data.";

pub const BROADCAST_PROMPT: &str = "Please provide a message to broadcast.";
pub const NOT_AUTHORIZED: &str = "You are not authorized to use this command.";

pub const STORAGE_ERROR: &str = "Sorry, something went wrong saving your data. Please try again later.";

pub fn broadcast_sent(delivered: usize, failed: usize) -> String {
    if failed == 0 {
        return format!("Broadcast message sent to all users. ({delivered} delivered)");
    }
    format!("Broadcast message sent to all users. ({delivered} delivered, {failed} failed)")
}

/// The `/xp` report for one wallet.
pub fn xp_report(wallet: &str, record: &XpRecord, now: DateTime<Utc>) -> String {
    let rank = record
        .rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut out = format!(
        "address: {wallet}\n\
         Your XP points: {}\n\
         Permanent Multiplier: {}\n\
         Temporary Multiplier: {}\n\
         XP Rank: {rank} {}",
        record.xp_point,
        record.multiplier_permanent,
        record.multiplier_temporary,
        record.rank_emoticon(),
    );

    if let Some(left) = record.remaining_at(now) {
        out.push_str(&format!("\nTime left: {}", format_remaining(left)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::{RANK_NEUTRAL, RANK_SAD, RANK_TROPHY};

    fn record(rank: Option<i64>, temp: i64, end: Option<i64>) -> XpRecord {
        XpRecord {
            xp_point: 1500.into(),
            multiplier_permanent: 1.into(),
            multiplier_temporary: temp.into(),
            rank,
            end_timestamp: end,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn report_layout() {
        let r = record(Some(3), 2, Some(1_700_000_000 + 2 * 86_400 + 3661));
        assert_eq!(
            xp_report("0xabc", &r, now()),
            "address: 0xabc\n\
             Your XP points: 1500\n\
             Permanent Multiplier: 1\n\
             Temporary Multiplier: 2\n\
             XP Rank: 3 🏆\n\
             Time left: 2 days, 1:01:01"
        );
    }

    #[test]
    fn report_glyph_follows_rank() {
        assert!(xp_report("w", &record(Some(0), 0, None), now()).contains(RANK_SAD));
        assert!(xp_report("w", &record(Some(5), 0, None), now()).contains(RANK_TROPHY));
        assert!(xp_report("w", &record(Some(12), 0, None), now()).contains(RANK_NEUTRAL));

        let unranked = xp_report("w", &record(None, 0, None), now());
        assert!(unranked.contains(&format!("XP Rank: N/A {RANK_NEUTRAL}")));
    }

    #[test]
    fn no_time_left_without_temporary_multiplier() {
        let r = record(Some(1), 0, Some(1_700_000_000 + 86_400));
        assert!(!xp_report("w", &r, now()).contains("Time left"));
    }

    #[test]
    fn lapsed_boost_reads_expired() {
        let r = record(Some(1), 2, Some(1_700_000_000 - 10));
        assert!(xp_report("w", &r, now()).ends_with("Time left: expired"));
    }

    #[test]
    fn broadcast_summary_mentions_failures_only_when_present() {
        assert_eq!(
            broadcast_sent(3, 0),
            "Broadcast message sent to all users. (3 delivered)"
        );
        assert_eq!(
            broadcast_sent(2, 1),
            "Broadcast message sent to all users. (2 delivered, 1 failed)"
        );
    }
}
