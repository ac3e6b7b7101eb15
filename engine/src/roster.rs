//! Piece roster: the table of pieces with configurable columns.
//!
//! DESIGN
//! ======
//! A column either derives its value from the piece itself (`intrinsic`,
//! looked up by column name) or reads a stored per-piece value keyed by the
//! column id. GM-only columns read from the piece's GM values so that the
//! player snapshot can drop them wholesale.
//!
//! Sorting uses a dedicated [`RosterSortKey`] with a total order, so sorts are
//! deterministic even for NaN numbers.

#[cfg(test)]
#[path = "roster_test.rs"]
mod roster_test;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::doc::{Mini, ObjectId, PieceVisibility};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterColumnType {
    /// Derived from the piece; see [`intrinsic_value`].
    Intrinsic,
    String,
    Number,
    /// A signed number shown with an explicit `+`.
    Bonus,
    Fraction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gm_only: bool,
    #[serde(rename = "type")]
    pub column_type: RosterColumnType,
}

impl RosterColumn {
    fn intrinsic(name: &str, gm_only: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            gm_only,
            column_type: RosterColumnType::Intrinsic,
        }
    }
}

/// Columns a tabletop starts with.
pub static INITIAL_PIECES_ROSTER_COLUMNS: LazyLock<Vec<RosterColumn>> = LazyLock::new(|| {
    vec![
        RosterColumn::intrinsic("Name", false),
        RosterColumn::intrinsic("Focus", false),
        RosterColumn::intrinsic("Visibility", true),
        RosterColumn::intrinsic("Locked", true),
    ]
});

/// A value such as hit points: `numerator` out of `denominator`. A missing
/// numerator means "full".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<f64>,
    pub denominator: f64,
}

impl Default for Fraction {
    fn default() -> Self {
        Self { numerator: None, denominator: 1.0 }
    }
}

/// A stored or computed roster cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RosterValue {
    Text(String),
    Number(f64),
    Fraction(Fraction),
    Flags(Vec<bool>),
}

impl fmt::Display for RosterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
            Self::Fraction(fraction) => {
                let numerator = fraction.numerator.unwrap_or(fraction.denominator);
                write!(f, "{numerator}/{}", fraction.denominator)
            }
            Self::Flags(flags) => {
                let parts: Vec<&str> = flags.iter().map(|flag| if *flag { "true" } else { "false" }).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

/// Stored roster values keyed by column id.
pub type RosterValues = BTreeMap<String, RosterValue>;

// =============================================================================
// VALUES
// =============================================================================

fn yes_no(flag: bool) -> String {
    if flag { "Y" } else { "N" }.to_owned()
}

/// Display label for a visibility setting.
#[must_use]
pub fn visibility_label(visibility: PieceVisibility) -> &'static str {
    match visibility {
        PieceVisibility::Hidden => "Hide",
        PieceVisibility::Fogged => "Fog",
        PieceVisibility::Revealed => "Show",
    }
}

/// Value of the intrinsic column `name` for `mini`; unknown names are empty.
#[must_use]
pub fn intrinsic_value(name: &str, mini: &Mini, minis: &BTreeMap<ObjectId, Mini>) -> String {
    match name {
        "Name" => mini.name.clone(),
        "Visibility" => match mini.visibility {
            PieceVisibility::Fogged if mini.gm_only => "Fog (hide)".to_owned(),
            PieceVisibility::Fogged => "Fog (show)".to_owned(),
            other => visibility_label(other).to_owned(),
        },
        "Locked" => yes_no(mini.locked),
        "Attached" => mini
            .attach_mini_id
            .as_ref()
            .and_then(|id| minis.get(id))
            .map_or_else(String::new, |base| format!("to {}", base.name)),
        "Prone" => yes_no(mini.prone),
        "Flat" => yes_no(mini.flat),
        "Base" => yes_no(!mini.hide_base),
        "Scale" => mini.scale.to_string(),
        "Template" => if mini.is_template() { "Template" } else { "Miniature" }.to_owned(),
        _ => String::new(),
    }
}

fn bonus_text(value: Option<&RosterValue>) -> String {
    match value {
        None => "+0".to_owned(),
        Some(RosterValue::Number(n)) if *n < 0.0 => n.to_string(),
        Some(RosterValue::Number(n)) => format!("+{n}"),
        Some(RosterValue::Text(text)) => match text.trim().parse::<f64>() {
            Ok(n) if n < 0.0 => text.clone(),
            _ => format!("+{text}"),
        },
        Some(other) => format!("+{other}"),
    }
}

/// The value `column` shows for `mini`.
#[must_use]
pub fn roster_value(column: &RosterColumn, mini: &Mini, minis: &BTreeMap<ObjectId, Mini>) -> RosterValue {
    let values = if column.gm_only { &mini.pieces_roster_gm_values } else { &mini.pieces_roster_values };
    let stored = values.get(&column.id);
    match column.column_type {
        RosterColumnType::Intrinsic => RosterValue::Text(intrinsic_value(&column.name, mini, minis)),
        RosterColumnType::String => stored.cloned().unwrap_or_else(|| RosterValue::Text(String::new())),
        RosterColumnType::Number => stored.cloned().unwrap_or(RosterValue::Number(0.0)),
        RosterColumnType::Bonus => RosterValue::Text(bonus_text(stored)),
        RosterColumnType::Fraction => match stored {
            Some(RosterValue::Fraction(fraction)) => RosterValue::Fraction(*fraction),
            _ => RosterValue::Fraction(Fraction::default()),
        },
    }
}

// =============================================================================
// SORTING
// =============================================================================

/// Sort key for a roster cell. Keys of different kinds order by kind.
#[derive(Debug, Clone)]
pub enum RosterSortKey {
    Rank(u8),
    Number(f64),
    /// Ratio, then denominator.
    Fraction(f64, f64),
    Text(String),
}

impl RosterSortKey {
    fn kind(&self) -> u8 {
        match self {
            Self::Rank(_) => 0,
            Self::Number(_) => 1,
            Self::Fraction(..) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Ord for RosterSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Rank(a), Self::Rank(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Fraction(a, a_den), Self::Fraction(b, b_den)) => a.total_cmp(b).then(a_den.total_cmp(b_den)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for RosterSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RosterSortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RosterSortKey {}

/// Players see revealed pieces, then fogged ones; the GM additionally sees
/// hidden pieces, then fogged pieces that are GM-only.
fn visibility_rank(mini: &Mini) -> u8 {
    match mini.visibility {
        PieceVisibility::Revealed => 1,
        PieceVisibility::Fogged if mini.gm_only => 4,
        PieceVisibility::Fogged => 2,
        PieceVisibility::Hidden => 3,
    }
}

/// Sort key of `column` for `mini`.
#[must_use]
pub fn roster_sort_key(column: &RosterColumn, mini: &Mini, minis: &BTreeMap<ObjectId, Mini>) -> RosterSortKey {
    if column.column_type == RosterColumnType::Intrinsic && column.name == "Visibility" {
        return RosterSortKey::Rank(visibility_rank(mini));
    }
    match roster_value(column, mini, minis) {
        RosterValue::Fraction(fraction) => {
            let ratio = if fraction.denominator == 0.0 {
                0.0
            } else {
                fraction.numerator.map_or(1.0, |numerator| numerator / fraction.denominator)
            };
            RosterSortKey::Fraction(ratio, fraction.denominator)
        }
        RosterValue::Number(n) => RosterSortKey::Number(n),
        other => RosterSortKey::Text(other.to_string()),
    }
}

/// Ids of `minis` ordered by `column`, ties broken by id.
#[must_use]
pub fn sorted_mini_ids(column: &RosterColumn, minis: &BTreeMap<ObjectId, Mini>, descending: bool) -> Vec<ObjectId> {
    let mut keyed: Vec<(RosterSortKey, &ObjectId)> =
        minis.iter().map(|(id, mini)| (roster_sort_key(column, mini, minis), id)).collect();
    keyed.sort_by(|(a, a_id), (b, b_id)| {
        let order = if descending { b.cmp(a) } else { a.cmp(b) };
        order.then_with(|| a_id.cmp(b_id))
    });
    keyed.into_iter().map(|(_, id)| id.clone()).collect()
}
