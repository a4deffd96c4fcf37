//! Recipe Parser
//!
//! Each extracted line is classified by an ordered set of [`LineMatcher`]s
//! (first match wins) and the results are assembled into a [`Recipe`].
//!
//! ```text
//! line ──▶ IngredientMatcher ──▶ LayerHeaderMatcher ──▶ MetadataMatcher ──▶ MalformedIngredientMatcher
//!              │                     │                      │                      │
//!          Ingredient            LayerHeader              Meta            MalformedIngredient
//!                                                                        (else: Ignored)
//! ```
//!
//! # Failure policy
//!
//! - No recipe number, or no ingredient at all: the whole job fails.
//! - A single bad ingredient line (grammar mismatch, zero weight, order not
//!   increasing inside its layer) is skipped and reported in
//!   [`ParsedRecipe::skipped`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use shared::models::{DEFAULT_LAYER_NAME, IngredientTarget, Layer, Recipe, RecipeMeta};
use tracing::{debug, instrument, warn};

use crate::encoding::truncate_chars;
use crate::error::{ParseError, ParseResult};
use crate::extract::{extract_lines, job_preview};

/// Max characters kept in a parse error excerpt
const EXCERPT_CHARS: usize = 200;

/// `<orden> : <code> <quantity>[ ][g|gr|(g)|(gr)]`
static INGREDIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*:\s*([\w-]+)\s+(\d+(?:[.,]\d+)?)\s*(?:\(gr\)|\(g\)|gr|g)?\s*$")
        .expect("ingredient pattern is valid")
});

/// Anything that starts like an ingredient line
static INGREDIENT_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*:").expect("ingredient prefix pattern is valid"));

/// `Capa: Base`, `Capa 2: Barniz`, `Layer 1`
static LAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:capa|layer)(?:\s*n[º°o]\.?)?\s*(\d+)?\s*(?:[:#-]\s*(.*?))?\s*$")
        .expect("layer pattern is valid")
});

/// Metadata keys, tried in this order
static META_RES: LazyLock<Vec<(MetaKey, Regex)>> = LazyLock::new(|| {
    [
        (
            MetaKey::RecipeNumber,
            r"n[º°o]\.?\s*(?:de\s+)?receta|receta(?:\s*n[º°o]\.?)?|f[oó]rmula(?:\s*n[º°o]\.?)?|recipe(?:\s*(?:no\.?|number))?",
        ),
        (MetaKey::History, r"historia|hist[oó]rico|lote|batch"),
        (MetaKey::CarMaker, r"marca|fabricante|car\s*maker"),
        (MetaKey::SayerCode, r"c[oó]d(?:igo|\.)?\s*sayer|sayer(?:\s*code)?"),
        (
            MetaKey::ColorCode,
            r"c[oó]d(?:igo|\.)?\s*(?:de\s+)?color|color\s*code|color",
        ),
        (MetaKey::Tolerance, r"tolerancia|tolerance"),
        (MetaKey::MixType, r"tipo(?:\s+de)?\s+mezcla|tipo|mix\s*type"),
    ]
    .into_iter()
    .map(|(key, alternatives)| {
        let pattern = format!(r"(?i)^\s*(?:{alternatives})\s*[:#=]\s*(.+?)\s*$");
        (key, Regex::new(&pattern).expect("metadata pattern is valid"))
    })
    .collect()
});

/// Recognized metadata line keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    RecipeNumber,
    History,
    CarMaker,
    ColorCode,
    SayerCode,
    Tolerance,
    MixType,
}

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Meta(MetaKey, String),
    LayerHeader(String),
    Ingredient(IngredientTarget),
    /// Starts like an ingredient but does not satisfy the grammar
    MalformedIngredient,
    Ignored,
}

/// One line-type grammar
pub trait LineMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means "not mine", the next matcher gets the line
    fn classify(&self, line: &str) -> Option<LineKind>;
}

/// Parse a single ingredient line
pub fn parse_ingredient_line(line: &str) -> Option<IngredientTarget> {
    let caps = INGREDIENT_RE.captures(line)?;
    let order = caps[1].parse::<u32>().ok()?;
    let target_weight = parse_decimal(&caps[3])?;
    Some(IngredientTarget {
        order,
        sku: caps[2].to_string(),
        target_weight,
    })
}

/// Parse a quantity using `.` or `,` as the decimal separator
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.trim().replace(',', ".")).ok()
}

pub struct IngredientMatcher;

impl LineMatcher for IngredientMatcher {
    fn name(&self) -> &'static str {
        "ingredient"
    }

    fn classify(&self, line: &str) -> Option<LineKind> {
        if !INGREDIENT_RE.is_match(line) {
            return None;
        }
        // Shape matched but numbers overflowed
        Some(
            parse_ingredient_line(line)
                .map(LineKind::Ingredient)
                .unwrap_or(LineKind::MalformedIngredient),
        )
    }
}

pub struct LayerHeaderMatcher;

impl LineMatcher for LayerHeaderMatcher {
    fn name(&self) -> &'static str {
        "layer_header"
    }

    fn classify(&self, line: &str) -> Option<LineKind> {
        let caps = LAYER_RE.captures(line)?;
        let name = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
        let number = caps.get(1).map(|m| m.as_str());
        match (name, number) {
            (Some(name), _) => Some(LineKind::LayerHeader(name.to_string())),
            (None, Some(n)) => Some(LineKind::LayerHeader(format!("Capa {}", n))),
            (None, None) => None,
        }
    }
}

pub struct MetadataMatcher;

impl LineMatcher for MetadataMatcher {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn classify(&self, line: &str) -> Option<LineKind> {
        META_RES.iter().find_map(|(key, re)| {
            let value = re.captures(line)?.get(1)?.as_str();
            let value = match key {
                // "Receta: 42 - Rojo" -> "42"
                MetaKey::RecipeNumber => value.split_whitespace().next()?,
                _ => value,
            };
            Some(LineKind::Meta(*key, value.to_string()))
        })
    }
}

pub struct MalformedIngredientMatcher;

impl LineMatcher for MalformedIngredientMatcher {
    fn name(&self) -> &'static str {
        "malformed_ingredient"
    }

    fn classify(&self, line: &str) -> Option<LineKind> {
        INGREDIENT_LIKE_RE
            .is_match(line)
            .then_some(LineKind::MalformedIngredient)
    }
}

/// Ordered, first-match-wins line classifier
pub struct LineClassifier {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl LineClassifier {
    pub fn new(matchers: Vec<Box<dyn LineMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn classify(&self, line: &str) -> LineKind {
        self.matchers
            .iter()
            .find_map(|m| m.classify(line))
            .unwrap_or(LineKind::Ignored)
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(vec![
            Box::new(IngredientMatcher),
            Box::new(LayerHeaderMatcher),
            Box::new(MetadataMatcher),
            Box::new(MalformedIngredientMatcher),
        ])
    }
}

impl fmt::Debug for LineClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|m| m.name()))
            .finish()
    }
}

/// Why a line was dropped from an otherwise valid recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Looks like an ingredient but fails the grammar
    Malformed,
    /// Quantity parsed as zero
    ZeroWeight,
    /// `order` is zero or not greater than the previous ingredient in the same layer
    OutOfOrder,
    /// Tolerance value not a decimal
    InvalidTolerance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based index among extracted lines
    pub line_no: usize,
    pub text: String,
    pub reason: SkipReason,
}

/// Parser output: the recipe plus any skipped lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecipe {
    pub recipe: Recipe,
    pub skipped: Vec<SkippedLine>,
}

/// Accumulates classified lines into a recipe
#[derive(Default)]
struct RecipeBuilder {
    number: Option<String>,
    history: Option<String>,
    meta: RecipeMeta,
    tolerance: Option<Decimal>,
    mix_type: Option<String>,
    layers: Vec<Layer>,
    current: Option<Layer>,
    skipped: Vec<SkippedLine>,
}

impl RecipeBuilder {
    fn skip(&mut self, line_no: usize, text: &str, reason: SkipReason) {
        warn!(line_no, line = %text, ?reason, "Skipping recipe line");
        self.skipped.push(SkippedLine {
            line_no,
            text: text.to_string(),
            reason,
        });
    }

    fn set_meta(&mut self, line_no: usize, text: &str, key: MetaKey, value: String) {
        // First occurrence wins
        match key {
            MetaKey::RecipeNumber => {
                self.number.get_or_insert(value);
            }
            MetaKey::History => {
                self.history.get_or_insert(value);
            }
            MetaKey::CarMaker => {
                self.meta.car_maker.get_or_insert(value);
            }
            MetaKey::ColorCode => {
                self.meta.color_code.get_or_insert(value);
            }
            MetaKey::SayerCode => {
                self.meta.sayer_code.get_or_insert(value);
            }
            MetaKey::MixType => {
                self.mix_type.get_or_insert(value);
            }
            MetaKey::Tolerance => {
                let parsed = value
                    .trim_end_matches(|c: char| c.is_alphabetic() || c == '(' || c == ')')
                    .trim_start_matches('±');
                match parse_decimal(parsed).filter(|t| !t.is_sign_negative()) {
                    Some(t) => {
                        self.tolerance.get_or_insert(t);
                    }
                    None => self.skip(line_no, text, SkipReason::InvalidTolerance),
                }
            }
        }
    }

    fn start_layer(&mut self, name: String) {
        if let Some(layer) = self.current.take() {
            self.layers.push(layer);
        }
        self.current = Some(Layer::new(name));
    }

    fn add_ingredient(&mut self, line_no: usize, text: &str, target: IngredientTarget) {
        if target.target_weight <= Decimal::ZERO {
            self.skip(line_no, text, SkipReason::ZeroWeight);
            return;
        }
        let layer = self
            .current
            .get_or_insert_with(|| Layer::new(DEFAULT_LAYER_NAME));
        // Orders are 1-based and strictly increasing within a layer
        if target.order == 0
            || layer
                .ingredients
                .last()
                .is_some_and(|prev| target.order <= prev.order)
        {
            self.skip(line_no, text, SkipReason::OutOfOrder);
            return;
        }
        layer.ingredients.push(target);
    }

    fn finish(mut self, excerpt: impl FnOnce() -> String) -> ParseResult<ParsedRecipe> {
        if let Some(layer) = self.current.take() {
            self.layers.push(layer);
        }
        self.layers.retain(|l| !l.ingredients.is_empty());

        let Some(number) = self.number else {
            return Err(ParseError::MissingRecipeNumber { excerpt: excerpt() });
        };
        if self.layers.is_empty() {
            return Err(ParseError::NoIngredients { excerpt: excerpt() });
        }

        Ok(ParsedRecipe {
            recipe: Recipe {
                number,
                history: self.history,
                meta: self.meta,
                tolerance: self.tolerance,
                mix_type: self.mix_type,
                layers: self.layers,
            },
            skipped: self.skipped,
        })
    }
}

/// Line-oriented recipe parser
#[derive(Debug, Default)]
pub struct RecipeParser {
    classifier: LineClassifier,
}

impl RecipeParser {
    pub fn new(classifier: LineClassifier) -> Self {
        Self { classifier }
    }

    /// Extract text from a raw job and parse it
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub fn parse_job(&self, raw: &[u8]) -> ParseResult<ParsedRecipe> {
        let lines = extract_lines(raw);
        if lines.is_empty() {
            return Err(ParseError::NoText {
                excerpt: job_preview(raw, EXCERPT_CHARS),
            });
        }
        self.parse_lines(&lines)
    }

    /// Parse already extracted lines
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> ParseResult<ParsedRecipe> {
        if lines.is_empty() {
            return Err(ParseError::NoText {
                excerpt: String::new(),
            });
        }

        let mut builder = RecipeBuilder::default();
        for (idx, line) in lines.iter().enumerate() {
            let text = line.as_ref();
            let line_no = idx + 1;
            match self.classifier.classify(text) {
                LineKind::Meta(key, value) => builder.set_meta(line_no, text, key, value),
                LineKind::LayerHeader(name) => builder.start_layer(name),
                LineKind::Ingredient(target) => builder.add_ingredient(line_no, text, target),
                LineKind::MalformedIngredient => {
                    builder.skip(line_no, text, SkipReason::Malformed)
                }
                LineKind::Ignored => debug!(line_no, line = %text, "Ignoring line"),
            }
        }

        builder.finish(|| {
            let joined = lines
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" | ");
            truncate_chars(&joined, EXCERPT_CHARS)
        })
    }
}
