//! Auction board and results content.

use crate::renderer::{PopupView, StyleSheet};
use lipgloss_extras::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// Styles injected while bidding is open.
pub static BOARD_STYLES: Lazy<StyleSheet> = Lazy::new(|| {
    StyleSheet::new(
        "auction-board",
        ".company-name { font-size: 28px; font-weight: bold; text-align: center; }\n\
         .info-row { display: flex; justify-content: space-between; padding: 8px 0; }\n\
         .timer-display { font-size: 64px; font-weight: bold; text-align: center; }",
    )
});

/// Styles injected once results are shown.
pub static RESULT_STYLES: Lazy<StyleSheet> = Lazy::new(|| {
    StyleSheet::new(
        "auction-results",
        ".result-header { text-align: center; }\n\
         .result-row { display: flex; justify-content: space-between; padding: 10px 0; }\n\
         .result-value.highlight { color: #dc3545; font-weight: bold; }",
    )
});

/// Auction data shown on the board, as supplied by the host.
///
/// Values are displayed verbatim; formatting prices is the host's business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionSnapshot {
    /// Asset being auctioned.
    pub title: String,
    /// Person running the auction.
    pub auctioneer: String,
    /// Starting price.
    pub starting_price: String,
    /// Minimum increment between bids.
    pub bid_step: String,
    /// Number of bids placed so far.
    pub bid_number: u32,
    /// Current round.
    pub round: String,
    /// Current highest bidder.
    pub highest_bidder: String,
    /// Current highest bid.
    pub highest_bid: String,
}

/// Outcome of a finished auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionResults {
    /// Winning bidder, if anyone bid.
    pub winner: Option<String>,
    /// Winning price, if anyone bid.
    pub winning_price: Option<String>,
}

impl AuctionResults {
    /// Results implied by the last snapshot: the highest bidder wins.
    pub fn from_snapshot(snapshot: &AuctionSnapshot) -> Self {
        let non_empty = |value: &str| (!value.trim().is_empty()).then(|| value.to_string());
        Self {
            winner: non_empty(&snapshot.highest_bidder),
            winning_price: non_empty(&snapshot.highest_bid),
        }
    }
}

/// Styles shared by the board and results views.
#[derive(Debug, Clone)]
pub struct DisplayStyles {
    /// Company name.
    pub company: Style,
    /// Section heading.
    pub heading: Style,
    /// Row labels.
    pub label: Style,
    /// Row values.
    pub value: Style,
    /// Emphasized values.
    pub highlight: Style,
    /// Inline notices in the main window.
    pub notice: Style,
}

impl Default for DisplayStyles {
    fn default() -> Self {
        Self {
            company: Style::new().bold(true).foreground(Color::from("#1a3c6e")),
            heading: Style::new().bold(true),
            label: Style::new().foreground(Color::from("245")),
            value: Style::new(),
            highlight: Style::new().bold(true).foreground(Color::from("#dc3545")),
            notice: Style::new().foreground(Color::from("#856404")),
        }
    }
}

fn rows(styles: &DisplayStyles, rows: &[(&str, String, bool)]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|(label, _, _)| UnicodeWidthStr::width(*label))
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(label, value, highlight)| {
            let pad = " ".repeat(width - UnicodeWidthStr::width(*label) + 1);
            let value_style = if *highlight {
                &styles.highlight
            } else {
                &styles.value
            };
            format!(
                "{}{}{}",
                styles.label.render(label),
                pad,
                value_style.render(value)
            )
        })
        .collect()
}

fn header(styles: &DisplayStyles, company: &str, heading: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if !company.is_empty() {
        lines.push(styles.company.render(company));
    }
    if !heading.is_empty() {
        lines.push(styles.heading.render(heading));
    }
    lines
}

/// Live auction board: auction data and the countdown.
#[derive(Debug)]
pub struct AuctionBoardView<'a> {
    /// Company shown at the top.
    pub company: &'a str,
    /// Auction data.
    pub snapshot: &'a AuctionSnapshot,
    /// Already styled countdown.
    pub timer: String,
    /// Styles.
    pub styles: &'a DisplayStyles,
}

impl PopupView for AuctionBoardView<'_> {
    fn view(&self) -> String {
        let s = self.snapshot;
        let mut lines = header(self.styles, self.company, &s.title);
        lines.extend(rows(
            self.styles,
            &[
                ("Auctioneer:", s.auctioneer.clone(), false),
                ("Starting price:", s.starting_price.clone(), false),
                ("Bid step:", s.bid_step.clone(), false),
                ("Bid number:", s.bid_number.to_string(), false),
                ("Round:", s.round.clone(), false),
                ("Highest bidder:", s.highest_bidder.clone(), false),
                ("Highest bid:", s.highest_bid.clone(), true),
            ],
        ));
        lines.push(String::new());
        lines.push(self.timer.clone());
        lines.join("\n")
    }
}

/// Final results of an auction.
#[derive(Debug)]
pub struct AuctionResultView<'a> {
    /// Company shown at the top.
    pub company: &'a str,
    /// Last auction data.
    pub snapshot: &'a AuctionSnapshot,
    /// Outcome.
    pub results: &'a AuctionResults,
    /// Countdown value the auction ended with, already formatted.
    pub final_time: String,
    /// Styles.
    pub styles: &'a DisplayStyles,
}

impl PopupView for AuctionResultView<'_> {
    fn view(&self) -> String {
        let mut lines = header(self.styles, self.company, "AUCTION RESULTS");
        lines.extend(rows(
            self.styles,
            &[
                ("Asset:", self.snapshot.title.clone(), false),
                ("Auctioneer:", self.snapshot.auctioneer.clone(), false),
                (
                    "Winner:",
                    self.results
                        .winner
                        .clone()
                        .unwrap_or_else(|| "No winner".to_string()),
                    false,
                ),
                (
                    "Winning price:",
                    self.results
                        .winning_price
                        .clone()
                        .unwrap_or_else(|| "N/A".to_string()),
                    true,
                ),
                ("Time left at close:", self.final_time.clone(), false),
            ],
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lipgloss_extras::lipgloss;

    fn snapshot() -> AuctionSnapshot {
        AuctionSnapshot {
            title: "Lot 7: Land use rights".to_string(),
            auctioneer: "Tran Van B".to_string(),
            starting_price: "1.000.000.000".to_string(),
            bid_step: "50.000.000".to_string(),
            bid_number: 3,
            round: "2".to_string(),
            highest_bidder: "Bidder 12".to_string(),
            highest_bid: "1.150.000.000".to_string(),
        }
    }

    #[test]
    fn test_board_aligns_rows() {
        let styles = DisplayStyles::default();
        let snapshot = snapshot();
        let view = AuctionBoardView {
            company: "Acme Auctions",
            snapshot: &snapshot,
            timer: "01:00".to_string(),
            styles: &styles,
        };
        let plain = lipgloss::strip_ansi(&view.view());
        let lines: Vec<&str> = plain.lines().collect();

        assert_eq!(lines[0], "Acme Auctions");
        assert_eq!(lines[1], "Lot 7: Land use rights");
        assert_eq!(lines[2], "Auctioneer:     Tran Van B");
        assert_eq!(lines[6], "Round:          2");
        assert_eq!(lines[8], "Highest bid:    1.150.000.000");
        assert_eq!(lines.last(), Some(&"01:00"));
    }

    #[test]
    fn test_board_without_company() {
        let styles = DisplayStyles::default();
        let snapshot = AuctionSnapshot::default();
        let view = AuctionBoardView {
            company: "",
            snapshot: &snapshot,
            timer: String::new(),
            styles: &styles,
        };
        let plain = lipgloss::strip_ansi(&view.view());
        assert!(plain.starts_with("Auctioneer:"));
    }

    #[test]
    fn test_results_fall_back_without_winner() {
        let styles = DisplayStyles::default();
        let snapshot = AuctionSnapshot::default();
        let results = AuctionResults::from_snapshot(&snapshot);
        assert_eq!(results, AuctionResults::default());

        let view = AuctionResultView {
            company: "Acme Auctions",
            snapshot: &snapshot,
            results: &results,
            final_time: "00:00".to_string(),
            styles: &styles,
        };
        let plain = lipgloss::strip_ansi(&view.view());
        assert!(plain.contains("AUCTION RESULTS"));
        assert!(plain.contains("Winner:             No winner"));
        assert!(plain.contains("Winning price:      N/A"));
    }

    #[test]
    fn test_results_from_snapshot() {
        let results = AuctionResults::from_snapshot(&snapshot());
        assert_eq!(results.winner.as_deref(), Some("Bidder 12"));
        assert_eq!(results.winning_price.as_deref(), Some("1.150.000.000"));
    }

    #[test]
    fn test_snapshot_deserializes_partial_json() {
        let snapshot: AuctionSnapshot =
            serde_json::from_str(r#"{"auctioneer": "Le Thi C", "bid_number": 4}"#).unwrap();
        assert_eq!(snapshot.auctioneer, "Le Thi C");
        assert_eq!(snapshot.bid_number, 4);
        assert!(snapshot.highest_bidder.is_empty());
    }
}
