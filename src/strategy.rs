use std::{collections::HashSet, fmt, mem::Discriminant};

use itertools::{iproduct, Itertools};
use serde::Serialize;

use crate::normalize::{
    clean_whitespace, looks_like_house_address, normalize_dispatch_format,
    normalize_street_tokens, parse_block, remove_block_words, simplify, space_separators,
    split_intersection, street_variants, strip_block_prefix, strip_unit,
};

const SEPARATORS: [&str; 4] = ["&", "and", "at", "/"];
const MAX_INTERSECTION_QUERIES: usize = 4;
const MAX_GRAPH_VARIANTS: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Raw,
    NormalizedDispatch,
    StripUnit,
    Expanded,
    NoBlock,
    BlockToAddress,
    Intersection,
    OverpassAddr,
    OverpassWayCenter,
    OverpassIntersection,
    FinalTrim,
    CensusAddress,
    CensusBlockToAddress,
    Simplified,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Raw => "raw",
            Self::NormalizedDispatch => "normalized_dispatch",
            Self::StripUnit => "strip_unit",
            Self::Expanded => "expanded",
            Self::NoBlock => "no_block",
            Self::BlockToAddress => "block_to_address",
            Self::Intersection => "intersection",
            Self::OverpassAddr => "overpass_addr",
            Self::OverpassWayCenter => "overpass_way_center",
            Self::OverpassIntersection => "overpass_intersection",
            Self::FinalTrim => "final_trim",
            Self::CensusAddress => "census_address",
            Self::CensusBlockToAddress => "census_block_to_address",
            Self::Simplified => "simplified",
        };
        write!(f, "{s}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Search,
    Address,
    MapGraph,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Address => write!(f, "address"),
            Self::MapGraph => write!(f, "map_graph"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Search(String),
    Address(String),
    HouseNumber { number: u32, street: String },
    WayCenter { street: String },
    Intersection { a: Vec<String>, b: Vec<String> },
}

impl Target {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Search(_) => ProviderKind::Search,
            Self::Address(_) => ProviderKind::Address,
            Self::HouseNumber { .. } | Self::WayCenter { .. } | Self::Intersection { .. } => {
                ProviderKind::MapGraph
            }
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Search(x) | Self::Address(x) => x.clone(),
            Self::HouseNumber { number, street } => format!("{number} {street}"),
            Self::WayCenter { street } => street.clone(),
            Self::Intersection { a, b } => format!("{} / {}", a.join(" | "), b.join(" | ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateQuery {
    pub label: Label,
    pub target: Target,
}

impl CandidateQuery {
    pub fn kind(&self) -> ProviderKind {
        self.target.kind()
    }
}

impl fmt::Display for CandidateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.label, self.kind(), self.target.text())
    }
}

#[derive(Default)]
struct Plan {
    queries: Vec<CandidateQuery>,
    seen: HashSet<(Discriminant<Target>, String)>,
}

impl Plan {
    fn push(&mut self, label: Label, target: Target) -> bool {
        let text = clean_whitespace(&target.text());
        if text.is_empty() {
            return false;
        }
        let fresh = self
            .seen
            .insert((std::mem::discriminant(&target), text.to_uppercase()));
        if fresh {
            self.queries.push(CandidateQuery { label, target });
        }
        fresh
    }

    fn search(&mut self, label: Label, text: &str) -> bool {
        self.push(label, Target::Search(clean_whitespace(text)))
    }

    fn address(&mut self, label: Label, text: &str) -> bool {
        self.push(label, Target::Address(clean_whitespace(text)))
    }
}

pub fn plan(raw: &str, probe_offsets: &[u32]) -> Vec<CandidateQuery> {
    let raw = clean_whitespace(raw);
    let mut plan = Plan::default();
    if raw.is_empty() {
        return plan.queries;
    }

    let dispatch = normalize_dispatch_format(&raw);
    let stripped = strip_unit(&dispatch);
    let expanded = normalize_street_tokens(&space_separators(&stripped));

    plan.search(Label::Raw, &raw);
    plan.search(Label::NormalizedDispatch, &dispatch);
    plan.search(Label::StripUnit, &stripped);
    plan.search(Label::Expanded, &expanded);

    if let Some(block) = parse_block(&stripped) {
        let street_expanded = normalize_street_tokens(&block.street);
        let streets = [block.street.clone(), street_expanded.clone()];

        if block.number > 0 {
            for offset in probe_offsets {
                let number = block.number.saturating_add(*offset);
                for street in &streets {
                    let address = format!("{number} {street}");
                    plan.search(Label::BlockToAddress, &address);
                    plan.address(Label::CensusBlockToAddress, &address);
                }
            }
            for offset in probe_offsets {
                plan.push(
                    Label::OverpassAddr,
                    Target::HouseNumber {
                        number: block.number.saturating_add(*offset),
                        street: street_expanded.clone(),
                    },
                );
            }
        }

        // block 0 is "somewhere near the start of the street"
        for street in &streets {
            plan.search(Label::NoBlock, street);
        }
        plan.push(
            Label::OverpassWayCenter,
            Target::WayCenter {
                street: street_expanded,
            },
        );
    } else if let Some((a, b)) =
        split_intersection(&remove_block_words(&strip_block_prefix(&stripped)))
    {
        let a = street_variants(&a);
        let b = street_variants(&b);

        let mut emitted = 0;
        for query in iproduct!(a.iter().enumerate(), b.iter().enumerate())
            .sorted_by_key(|((i, _), (j, _))| i + j)
            .flat_map(|((_, a), (_, b))| SEPARATORS.iter().map(move |sep| format!("{a} {sep} {b}")))
        {
            if emitted == MAX_INTERSECTION_QUERIES {
                break;
            }
            if plan.search(Label::Intersection, &query) {
                emitted += 1;
            }
        }

        plan.push(
            Label::OverpassIntersection,
            Target::Intersection {
                a: a.into_iter().take(MAX_GRAPH_VARIANTS).collect(),
                b: b.into_iter().take(MAX_GRAPH_VARIANTS).collect(),
            },
        );
    } else {
        let no_block = remove_block_words(&stripped);
        plan.search(Label::NoBlock, &no_block);
        if looks_like_house_address(&no_block) {
            plan.address(Label::CensusAddress, &no_block);
        }
    }

    plan.search(Label::Simplified, &simplify(&remove_block_words(&expanded)));
    plan.search(Label::FinalTrim, &remove_block_words(&raw));

    plan.queries
}
