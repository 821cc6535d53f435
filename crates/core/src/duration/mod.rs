//! Duration codec: rational note values to LilyPond duration tokens.
//!
//! Each supported grouping owns a table mapping a whole-note fraction to one
//! of 32 rhythmic symbols. The tables are generated in closed form (32
//! subdivision steps scaled by the grouping's ratio) the first time they are
//! needed and are read-only afterwards.
//!
//! Fractions computed by repeated division carry floating point error, so both
//! table keys and lookups are rounded to five decimal digits before comparing.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::OnceLock,
};

use serde::Serialize;

use crate::{
    value::{Compound, DurationValue, Events, Neutral},
    LilyweaveError, Result,
};

/// Rhythmic symbols for 1/32 up to 32/32 of a whole note, in steps of 1/32.
pub const DURATION_TOKENS: [&str; 32] = [
    "32", "16", "16.", "8", //
    "8~32", "8.", "8..", "4", //
    "4~32", "4~16", "4~16.", "4.", //
    "4.~32", "4..", "4...", "2", //
    "2~32", "2~16", "2~16.", "2~8", //
    "2~8~32", "2~8.", "2~8..", "2.", //
    "2.~32", "2.~16", "2.~16.", "2..", //
    "2..~32", "2...", "2....", "1",
];

const TOLERANCE_SCALE: f64 = 100_000.0;

/// Registered groupings. A subdivision total selects the first grouping that
/// lists it; every total appears exactly once.
const GROUPINGS: [Grouping; 9] = [
    Grouping::plain(&[4, 8, 16, 32]),
    Grouping::tuplet(3, 2, &[3]),
    Grouping::tuplet(5, 4, &[5, 10]),
    Grouping::tuplet(6, 4, &[6, 12]),
    Grouping::tuplet(7, 4, &[7, 14]),
    Grouping::tuplet(9, 8, &[9, 18]),
    Grouping::tuplet(11, 8, &[11, 22]),
    Grouping::tuplet(13, 8, &[13, 26]),
    Grouping::tuplet(15, 8, &[15, 30]),
];

static TABLES: OnceLock<DurationTables> = OnceLock::new();

/// A canonical duration symbol such as `"4"`, `"8."` or `"2~16"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DurationToken(&'static str);

impl DurationToken {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Length as a fraction of a whole note, before any tuplet scaling.
    pub fn whole_fraction(&self) -> f64 {
        DURATION_TOKENS
            .iter()
            .position(|token| *token == self.0)
            .map_or(0.0, |step| (step + 1) as f64 / 32.0)
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// `actual` notes played in the time of `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TupletRatio {
    pub actual: u32,
    pub normal: u32,
}

impl TupletRatio {
    pub const fn new(actual: u32, normal: u32) -> Self {
        Self { actual, normal }
    }

    pub fn value(&self) -> f64 {
        f64::from(self.actual) / f64::from(self.normal)
    }

    /// Human readable form, e.g. "3 against 2".
    pub fn label(&self) -> String {
        format!("{} against {}", self.actual, self.normal)
    }
}

impl fmt::Display for TupletRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actual, self.normal)
    }
}

struct Grouping {
    name: &'static str,
    ratio: Option<TupletRatio>,
    totals: &'static [u32],
}

impl Grouping {
    const fn plain(totals: &'static [u32]) -> Self {
        Self {
            name: "base",
            ratio: None,
            totals,
        }
    }

    const fn tuplet(actual: u32, normal: u32, totals: &'static [u32]) -> Self {
        let name = match (actual, normal) {
            (3, 2) => "3:2",
            (5, 4) => "5:4",
            (6, 4) => "6:4",
            (7, 4) => "7:4",
            (9, 8) => "9:8",
            (11, 8) => "11:8",
            (13, 8) => "13:8",
            (15, 8) => "15:8",
            _ => "tuplet",
        };
        Self {
            name,
            ratio: Some(TupletRatio::new(actual, normal)),
            totals,
        }
    }
}

/// Whole-note fraction to token lookup for one grouping.
#[derive(Debug)]
pub struct DurationTable {
    name: &'static str,
    ratio: Option<TupletRatio>,
    entries: HashMap<i64, DurationToken>,
}

impl DurationTable {
    fn generate(name: &'static str, ratio: Option<TupletRatio>) -> Self {
        let entries = table_values(ratio)
            .map(|(value, token)| (tolerance_key(value), token))
            .collect();
        Self {
            name,
            ratio,
            entries,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tuplet marker attached to groups decoded through this table.
    pub fn ratio(&self) -> Option<TupletRatio> {
        self.ratio
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, value: f64) -> Option<DurationToken> {
        self.entries.get(&tolerance_key(value)).copied()
    }

    /// The exact fractions this table was generated from, with their tokens.
    pub fn values(&self) -> impl Iterator<Item = (f64, DurationToken)> {
        table_values(self.ratio)
    }
}

fn table_values(ratio: Option<TupletRatio>) -> impl Iterator<Item = (f64, DurationToken)> {
    let scale = ratio.map(|ratio| ratio.value()).unwrap_or(1.0);
    DURATION_TOKENS
        .iter()
        .enumerate()
        .map(move |(step, token)| ((step + 1) as f64 / 32.0 / scale, DurationToken(token)))
}

fn tolerance_key(value: f64) -> i64 {
    (value * TOLERANCE_SCALE).round() as i64
}

/// Every registered table plus the subdivision-total index into them.
#[derive(Debug)]
pub struct DurationTables {
    base: DurationTable,
    irregular: Vec<DurationTable>,
    by_total: BTreeMap<u32, Option<usize>>,
}

impl DurationTables {
    fn build() -> Self {
        let mut base = None;
        let mut irregular = Vec::new();
        let mut by_total = BTreeMap::new();

        for grouping in &GROUPINGS {
            let table = DurationTable::generate(grouping.name, grouping.ratio);
            let slot = match grouping.ratio {
                None => {
                    base = Some(table);
                    None
                }
                Some(_) => {
                    irregular.push(table);
                    Some(irregular.len() - 1)
                }
            };
            for total in grouping.totals {
                by_total.entry(*total).or_insert(slot);
            }
        }

        Self {
            base: base.unwrap_or_else(|| DurationTable::generate("base", None)),
            irregular,
            by_total,
        }
    }

    /// The plain (non-tuplet) table.
    pub fn base(&self) -> &DurationTable {
        &self.base
    }

    /// Tuplet tables in registration order.
    pub fn irregular(&self) -> &[DurationTable] {
        &self.irregular
    }

    /// The table selected by a compound's subdivision total.
    pub fn for_total(&self, total: u32) -> Option<&DurationTable> {
        match self.by_total.get(&total)? {
            None => Some(&self.base),
            Some(index) => self.irregular.get(*index),
        }
    }

    pub fn totals(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_total.keys().copied()
    }
}

/// Process-wide duration tables, built on first use.
pub fn tables() -> &'static DurationTables {
    TABLES.get_or_init(DurationTables::build)
}

/// Tokens of one compound value, with the marker that wraps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenGroup {
    pub tuplet: Option<TupletRatio>,
    pub tokens: Vec<DurationToken>,
}

/// A decoded duration stream element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedDuration {
    Token(DurationToken),
    /// Empty token: the event keeps the previous duration.
    Placeholder,
    Group(TokenGroup),
}

impl DecodedDuration {
    /// Tokens in event order; a placeholder yields a single `None`.
    pub fn tokens(&self) -> Vec<Option<DurationToken>> {
        match self {
            Self::Token(token) => vec![Some(*token)],
            Self::Placeholder => vec![None],
            Self::Group(group) => group.tokens.iter().copied().map(Some).collect(),
        }
    }

    pub fn tuplet(&self) -> Option<TupletRatio> {
        match self {
            Self::Group(group) => group.tuplet,
            _ => None,
        }
    }
}

impl Events for DecodedDuration {
    fn event_count(&self) -> usize {
        match self {
            Self::Group(group) => group.tokens.len(),
            _ => 1,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    fn take_events(&self, count: usize) -> Self {
        match self {
            Self::Group(group) => Self::Group(TokenGroup {
                tuplet: group.tuplet,
                tokens: group.tokens.iter().take(count).copied().collect(),
            }),
            other => other.clone(),
        }
    }
}

impl Neutral for DecodedDuration {
    fn neutral() -> Self {
        Self::Placeholder
    }
}

/// Decodes one duration value.
pub fn decode(value: &DurationValue) -> Result<DecodedDuration> {
    let tables = tables();
    match value {
        DurationValue::Placeholder => Ok(DecodedDuration::Placeholder),
        DurationValue::Simple(denominator) => decode_simple(tables, *denominator),
        DurationValue::Compound(compound) => {
            decode_compound(tables, compound).map(DecodedDuration::Group)
        }
    }
}

/// Decodes a whole duration stream, failing on the first bad element.
pub fn decode_stream(values: &[DurationValue]) -> Result<Vec<DecodedDuration>> {
    values.iter().map(decode).collect()
}

// Denominators outside the base table (3, 5, 6, ...) are tuplet values; they
// decode to a one-token group through the first irregular table that has them.
fn decode_simple(tables: &DurationTables, denominator: u32) -> Result<DecodedDuration> {
    let value = 1.0 / f64::from(denominator);
    if let Some(token) = tables.base().lookup(value) {
        return Ok(DecodedDuration::Token(token));
    }

    for table in tables.irregular() {
        if let Some(token) = table.lookup(value) {
            tracing::trace!(denominator, table = table.name(), "simple duration decoded as tuplet");
            return Ok(DecodedDuration::Group(TokenGroup {
                tuplet: table.ratio(),
                tokens: vec![token],
            }));
        }
    }

    Err(LilyweaveError::UnsupportedDuration {
        value,
        table: tables.base().name(),
    })
}

fn decode_compound(tables: &DurationTables, compound: &Compound) -> Result<TokenGroup> {
    let wide_total = compound.total();
    let (total, table) = u32::try_from(wide_total)
        .ok()
        .and_then(|total| Some((total, tables.for_total(total)?)))
        .ok_or(LilyweaveError::UnsupportedGrouping(wide_total))?;
    let step = 1.0 / f64::from(compound.unit) / f64::from(total);

    let tokens = compound
        .weights
        .iter()
        .map(|weight| {
            let value = step * f64::from(*weight);
            table
                .lookup(value)
                .ok_or(LilyweaveError::UnsupportedDuration {
                    value,
                    table: table.name(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(unit = compound.unit, total, table = table.name(), "compound decoded");
    Ok(TokenGroup {
        tuplet: table.ratio(),
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn token(text: &'static str) -> DurationToken {
        DurationToken(text)
    }

    fn compound(unit: u32, weights: &[u32]) -> DurationValue {
        DurationValue::Compound(Compound::new(unit, weights.to_vec()))
    }

    #[test]
    fn decodes_plain_denominators() {
        let cases = [(1, "1"), (2, "2"), (4, "4"), (8, "8"), (16, "16"), (32, "32")];
        for (denominator, expected) in cases {
            let decoded = decode(&DurationValue::Simple(denominator)).unwrap();
            assert_eq!(decoded, DecodedDuration::Token(token(expected)));
        }
    }

    #[test]
    fn placeholder_decodes_to_empty_token() {
        let decoded = decode(&DurationValue::Placeholder).unwrap();
        assert_eq!(decoded, DecodedDuration::Placeholder);
        assert_eq!(decoded.event_count(), 1);
        assert_eq!(decoded.tokens(), vec![None]);
    }

    #[test]
    fn triplet_group_carries_marker() {
        let decoded = decode(&compound(4, &[1, 1, 1])).unwrap();
        assert_eq!(
            decoded,
            DecodedDuration::Group(TokenGroup {
                tuplet: Some(TupletRatio::new(3, 2)),
                tokens: vec![token("8"), token("8"), token("8")],
            })
        );
    }

    #[test]
    fn quintuplet_selects_five_against_four() {
        let decoded = decode(&compound(4, &[2, 2, 1])).unwrap();
        assert_eq!(decoded.tuplet(), Some(TupletRatio::new(5, 4)));
        assert_eq!(
            decoded.tokens(),
            vec![Some(token("8")), Some(token("8")), Some(token("16"))]
        );
    }

    #[test]
    fn plain_subdivision_is_unmarked() {
        let decoded = decode(&compound(4, &[3, 1])).unwrap();
        assert_eq!(
            decoded,
            DecodedDuration::Group(TokenGroup {
                tuplet: None,
                tokens: vec![token("8."), token("16")],
            })
        );
        let tied = decode(&compound(2, &[5, 3])).unwrap();
        assert_eq!(tied.tokens(), vec![Some(token("4~16")), Some(token("8."))]);
    }

    #[test]
    fn compound_contribution_ignores_unit() {
        for unit in [1, 2, 4, 8] {
            let decoded = decode(&compound(unit, &[1, 1, 1, 1, 1])).unwrap();
            assert_eq!(decoded.event_count(), 5);
        }
    }

    #[test]
    fn unsupported_total_is_a_grouping_error() {
        let cases: [&[u32]; 3] = [&[17], &[10, 9], &[]];
        for weights in cases {
            let err = decode(&compound(4, weights)).unwrap_err();
            assert!(matches!(err, LilyweaveError::UnsupportedGrouping(_)), "{weights:?}");
        }
    }

    #[test]
    fn weight_outside_table_is_a_duration_error() {
        // 1/32 split in five lands below the smallest quintuplet step.
        let err = decode(&compound(32, &[2, 2, 1])).unwrap_err();
        assert!(matches!(
            err,
            LilyweaveError::UnsupportedDuration { table: "5:4", .. }
        ));
    }

    #[test]
    fn tuplet_denominators_fall_back_to_irregular_tables() {
        let decoded = decode(&DurationValue::Simple(3)).unwrap();
        assert_eq!(
            decoded,
            DecodedDuration::Group(TokenGroup {
                tuplet: Some(TupletRatio::new(3, 2)),
                tokens: vec![token("2")],
            })
        );
        assert_eq!(decoded.event_count(), 1);
        for (denominator, ratio) in [(5, TupletRatio::new(5, 4)), (9, TupletRatio::new(9, 8))] {
            let decoded = decode(&DurationValue::Simple(denominator)).unwrap();
            assert_eq!(decoded.tuplet(), Some(ratio));
        }
    }

    #[test]
    fn unknown_denominator_is_rejected() {
        for denominator in [17, 64, 100] {
            let err = decode(&DurationValue::Simple(denominator)).unwrap_err();
            assert!(matches!(err, LilyweaveError::UnsupportedDuration { table: "base", .. }));
        }
    }

    #[test]
    fn tables_are_total_on_their_keys() {
        let tables = tables();
        for table in std::iter::once(tables.base()).chain(tables.irregular()) {
            assert_eq!(table.len(), DURATION_TOKENS.len(), "{}", table.name());
            for (value, expected) in table.values() {
                assert_eq!(table.lookup(value), Some(expected), "{} {value}", table.name());
            }
        }
    }

    #[test]
    fn table_keys_decode_through_compounds() {
        let tables = tables();
        let mut covered: HashMap<&str, HashSet<DurationToken>> = HashMap::new();

        for total in tables.totals() {
            let Some(table) = tables.for_total(total) else {
                continue;
            };
            for unit in [1, 2, 4, 8, 16, 32] {
                let whole = f64::from(unit * total);
                for weight in 1..=total {
                    let Some(expected) = table.lookup(f64::from(weight) / whole) else {
                        continue;
                    };
                    let rest = total - weight;
                    let mut weights = vec![weight];
                    if rest > 0 {
                        if table.lookup(f64::from(rest) / whole).is_none() {
                            continue;
                        }
                        weights.push(rest);
                    }

                    let decoded = decode(&compound(unit, &weights)).unwrap();
                    assert_eq!(decoded.tuplet(), table.ratio());
                    assert_eq!(
                        decoded.tokens()[0],
                        Some(expected),
                        "{} unit {unit} weights {weights:?}",
                        table.name()
                    );
                    covered.entry(table.name()).or_default().insert(expected);
                }
            }
        }

        assert_eq!(covered["base"].len(), DURATION_TOKENS.len());
        for table in tables.irregular() {
            assert!(covered.contains_key(table.name()), "{}", table.name());
        }
    }

    #[test]
    fn simple_values_decode_to_their_base_keys() {
        for denominator in [1, 2, 4, 8, 16, 32] {
            let expected = tables().base().lookup(1.0 / f64::from(denominator));
            let decoded = decode(&DurationValue::Simple(denominator)).unwrap();
            assert_eq!(decoded.tokens(), vec![expected]);
        }
    }

    #[test]
    fn overflowing_weights_are_a_grouping_error() {
        let err = decode(&compound(4, &[u32::MAX, 1])).unwrap_err();
        assert!(matches!(err, LilyweaveError::UnsupportedGrouping(4_294_967_296)));
    }

    #[test]
    fn token_lengths() {
        assert_eq!(token("1").whole_fraction(), 1.0);
        assert_eq!(token("8.").whole_fraction(), 0.1875);
        assert_eq!(token("2~16").whole_fraction(), 0.5625);
    }

    #[test]
    fn every_total_is_registered_once() {
        let mut seen = HashSet::new();
        for grouping in &GROUPINGS {
            for total in grouping.totals {
                assert!(seen.insert(*total), "total {total} registered twice");
            }
        }
        assert_eq!(tables().totals().count(), seen.len());
        let ratio = |total| tables().for_total(total).and_then(DurationTable::ratio);
        assert_eq!(ratio(12), Some(TupletRatio::new(6, 4)));
        assert_eq!(ratio(6), Some(TupletRatio::new(6, 4)));
        assert_eq!(ratio(18), Some(TupletRatio::new(9, 8)));
        assert!(ratio(16).is_none());
    }

    #[test]
    fn ratio_formats() {
        let ratio = TupletRatio::new(3, 2);
        assert_eq!(ratio.to_string(), "3/2");
        assert_eq!(ratio.label(), "3 against 2");
    }
}
