use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::title_case;

const DIRECTIONS: &[(&str, &str)] = &[
    ("N", "North"),
    ("S", "South"),
    ("E", "East"),
    ("W", "West"),
    ("NE", "Northeast"),
    ("NW", "Northwest"),
    ("SE", "Southeast"),
    ("SW", "Southwest"),
];

const STREET_TYPES: &[(&str, &str)] = &[
    ("AV", "Avenue"),
    ("AVE", "Avenue"),
    ("BLVD", "Boulevard"),
    ("CIR", "Circle"),
    ("CT", "Court"),
    ("CTR", "Center"),
    ("DR", "Drive"),
    ("EXPY", "Expressway"),
    ("FWY", "Freeway"),
    ("HTS", "Heights"),
    ("HWY", "Highway"),
    ("LN", "Lane"),
    ("PKWY", "Parkway"),
    ("PL", "Place"),
    ("PLZ", "Plaza"),
    ("RD", "Road"),
    ("SQ", "Square"),
    ("ST", "Street"),
    ("TER", "Terrace"),
    ("TRL", "Trail"),
    ("XING", "Crossing"),
];

const TRAVEL_TOKENS: &[&str] = &["NB", "SB", "EB", "WB", "RAMP", "EXIT", "OFFR", "ONR"];

const ORDINALS: &[(&str, &str)] = &[
    ("FIRST", "1ST"),
    ("SECOND", "2ND"),
    ("THIRD", "3RD"),
    ("FOURTH", "4TH"),
    ("FIFTH", "5TH"),
    ("SIXTH", "6TH"),
    ("SEVENTH", "7TH"),
    ("EIGHTH", "8TH"),
    ("NINTH", "9TH"),
    ("TENTH", "10TH"),
];

static BLK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*-?\s*BLK\b").expect("hardcoded"));
static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)(?:-\d+[A-Z]?)+\b").expect("hardcoded"));
static ORDINAL_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(FIRST|SECOND|THIRD|FOURTH|FIFTH|SIXTH|SEVENTH|EIGHTH|NINTH|TENTH)\b")
        .expect("hardcoded")
});
// STE counts only when a suite number follows (STE GENEVIEVE is a street)
static UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\s+\b(APT|APARTMENT|UNIT|SUITE|LOT|RM|ROOM|BLDG)\b.*|\s+\bSTE\.?\s+(\w*\d|[A-Z]\b).*|\s*#.*)$",
    )
    .expect("hardcoded")
});
static BLOCK_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)\s+BLOCK\s+(?:OF\s+)?(.+)$").expect("hardcoded"));
static BLOCK_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d+\s+BLOCK\s+(?:OF\s+)?").expect("hardcoded"));
static INTERSECTION_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:/|&|@|\bAND\b|\bAT\b)\s*").expect("hardcoded"));
static SEPARATOR_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([/&@])\s*").expect("hardcoded"));
static HIGHWAY_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:HWY|HIGHWAY|US|ROUTE|RTE|RT|MO)\s*-?\s*(\d+)\b").expect("hardcoded")
});
static NUMBER_STREET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[A-Za-z]?\s+\S*[A-Za-z]").expect("hardcoded"));

fn bare(token: &str) -> String {
    token.trim_end_matches(['.', ',']).to_uppercase()
}

fn lookup(table: &[(&str, &'static str)], token: &str) -> Option<&'static str> {
    let token = bare(token);
    table.iter().find(|(k, _)| *k == token).map(|(_, v)| *v)
}

fn is_direction(token: &str) -> bool {
    let token = bare(token);
    DIRECTIONS
        .iter()
        .any(|(abbr, full)| token == *abbr || token == full.to_uppercase())
}

fn is_travel(token: &str) -> bool {
    TRAVEL_TOKENS.contains(&bare(token).as_str())
}

fn is_street_type(token: &str) -> bool {
    let token = bare(token);
    STREET_TYPES
        .iter()
        .any(|(abbr, full)| token == *abbr || token == full.to_uppercase())
}

pub fn clean_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_street_tokens(s: &str) -> String {
    s.split_whitespace()
        .filter(|token| !is_travel(token))
        .map(|token| {
            if let Some(full) = lookup(DIRECTIONS, token).or_else(|| lookup(STREET_TYPES, token)) {
                full.to_string()
            } else if token.chars().any(|c| c.is_ascii_digit()) {
                token.to_string()
            } else {
                title_case(token)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_dispatch_format(s: &str) -> String {
    let s = BLK.replace_all(s, "$1 BLOCK");
    let s = RANGE.replace_all(&s, "$1");
    let s = ORDINAL_WORD.replace_all(&s, |caps: &regex::Captures| {
        let word = caps[1].to_uppercase();
        ORDINALS
            .iter()
            .find(|(k, _)| *k == word)
            .map(|(_, v)| v.to_string())
            .unwrap_or(word)
    });
    clean_whitespace(&s)
}

pub fn strip_unit(s: &str) -> String {
    clean_whitespace(&UNIT.replace(s, ""))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAddress {
    pub number: u32,
    pub street: String,
}

pub fn parse_block(s: &str) -> Option<BlockAddress> {
    let caps = BLOCK_ADDRESS.captures(s.trim())?;
    let number = caps[1].parse().ok()?;
    let street = clean_whitespace(&caps[2]);
    // a cross street makes it an intersection
    if street.is_empty() || INTERSECTION_SEPARATOR.is_match(&street) {
        return None;
    }
    Some(BlockAddress { number, street })
}

pub fn split_intersection(s: &str) -> Option<(String, String)> {
    if parse_block(s).is_some() {
        return None;
    }
    let mut parts = INTERSECTION_SEPARATOR
        .split(s)
        .map(clean_whitespace)
        .filter(|x| !x.is_empty());
    let a = parts.next()?;
    let b = parts.next()?;
    Some((a, b))
}

pub fn strip_block_prefix(s: &str) -> String {
    clean_whitespace(&BLOCK_PREFIX.replace(s.trim(), ""))
}

pub fn space_separators(s: &str) -> String {
    clean_whitespace(&SEPARATOR_SYMBOL.replace_all(s, " $1 "))
}

pub fn remove_block_words(s: &str) -> String {
    s.split_whitespace()
        .filter(|token| !matches!(bare(token).as_str(), "BLOCK" | "OF"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn strip_directions(s: &str) -> String {
    let kept: Vec<_> = s.split_whitespace().filter(|t| !is_direction(t)).collect();
    if kept.is_empty() {
        clean_whitespace(s)
    } else {
        kept.join(" ")
    }
}

pub fn strip_street_type(s: &str) -> String {
    let mut tokens: Vec<_> = s.split_whitespace().collect();
    if tokens.len() > 1 && tokens.last().is_some_and(|t| is_street_type(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

pub fn simplify(s: &str) -> String {
    let kept: Vec<_> = s
        .split_whitespace()
        .filter(|t| !is_direction(t) && !is_travel(t))
        .collect();
    if kept.is_empty() {
        clean_whitespace(s)
    } else {
        kept.join(" ")
    }
}

pub fn highway_number(s: &str) -> Option<String> {
    HIGHWAY_NUMBER.captures(s).map(|caps| caps[1].to_string())
}

pub fn looks_like_house_address(s: &str) -> bool {
    NUMBER_STREET.is_match(s.trim())
}

pub fn street_variants(fragment: &str) -> Vec<String> {
    let raw = clean_whitespace(fragment);
    let expanded = normalize_street_tokens(&raw);

    let mut candidates = vec![expanded.clone(), strip_directions(&expanded)];
    if let Some(n) = highway_number(&raw) {
        candidates.push(format!("US {n}"));
        candidates.push(format!("Route {n}"));
    }
    candidates.push(raw);

    let mut variants: Vec<String> = Vec::new();
    for x in candidates {
        if x.is_empty() || variants.iter().any(|v| v.eq_ignore_ascii_case(&x)) {
            continue;
        }
        variants.push(x);
    }
    variants.truncate(5);
    variants
}
