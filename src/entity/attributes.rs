//! Typed attributes derived from raw entity payloads.
//!
//! Every attribute an entity exposes is listed in [`ATTRIBUTES`] together
//! with the function that derives it from the page and fact payloads. Fact
//! store values take precedence; infobox fields are the fallback. Missing
//! data yields `Ok(None)`, data of the wrong shape yields an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MalformedValueError;
use crate::geo::{Dms, GeoCoord, Hemisphere};
use crate::measure::Measure;
use crate::parse;
use crate::source::{FactRecord, Page};
use crate::tz_offset::TZOffset;
use crate::value::Value;

/// Unit used for head counts.
pub const PERSON: &str = "person";
/// Unit used for surface areas.
pub const SQUARE_KM: &str = "km²";
/// Unit used for money amounts.
pub const DOLLAR: &str = "$";

/// Reference to another entity, as found in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Attribute {
    Text(String),
    Number(f64),
    Measure(Measure),
    Coord(GeoCoord),
    Offset(TZOffset),
    Link(EntityRef),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Measure(v) => write!(f, "{v}"),
            Self::Coord(v) => write!(f, "{v}"),
            Self::Offset(v) => write!(f, "{v}"),
            Self::Link(v) => write!(f, "{}", v.name),
        }
    }
}

/// Raw payloads an attribute is derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payloads<'a> {
    pub page: Option<&'a Page>,
    pub facts: Option<&'a FactRecord>,
}

type Derivation = fn(&Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError>;

/// A named attribute and its derivation.
pub struct AttributeDef {
    /// Name used by `Entity::get`.
    pub name: &'static str,
    derive: Derivation,
}

impl AttributeDef {
    /// Derives the attribute from payloads.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] when the payload holds the attribute in
    /// a shape that cannot be converted.
    pub fn derive(&self, payloads: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
        (self.derive)(payloads)
    }
}

impl fmt::Debug for AttributeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDef").field("name", &self.name).finish()
    }
}

/// Every attribute an entity can expose.
pub static ATTRIBUTES: &[AttributeDef] = &[
    AttributeDef { name: "long_name", derive: long_name },
    AttributeDef { name: "iso2_code", derive: iso2_code },
    AttributeDef { name: "iso3_code", derive: iso3_code },
    AttributeDef { name: "tld", derive: tld },
    AttributeDef { name: "calling_code", derive: calling_code },
    AttributeDef { name: "area", derive: area },
    AttributeDef { name: "population", derive: population },
    AttributeDef { name: "population_metro", derive: population_metro },
    AttributeDef { name: "gdp_ppp", derive: gdp_ppp },
    AttributeDef { name: "gdp_nominal", derive: gdp_nominal },
    AttributeDef { name: "coord", derive: coord },
    AttributeDef { name: "tz_offset", derive: tz_offset },
    AttributeDef { name: "utc_offset", derive: utc_offset },
    AttributeDef { name: "country", derive: country },
];

/// Looks an attribute definition up by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static AttributeDef> {
    ATTRIBUTES.iter().find(|def| def.name == name)
}

/// Names of all attributes, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    ATTRIBUTES.iter().map(|def| def.name)
}

/// Per-entity memo of derived attributes.
///
/// Only successful derivations are cached; a malformed value is re-derived
/// (and fails again) on the next access.
#[derive(Default)]
pub(crate) struct AttributeCache {
    values: RwLock<HashMap<&'static str, Option<Attribute>>>,
}

impl AttributeCache {
    pub(crate) fn get(&self, name: &str) -> Option<Option<Attribute>> {
        self.values.read().ok()?.get(name).cloned()
    }

    pub(crate) fn store(&self, name: &'static str, value: Option<Attribute>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(name, value);
        }
    }

    pub(crate) fn clear(&mut self) {
        match self.values.get_mut() {
            Ok(values) => values.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn snapshot(&self) -> HashMap<&'static str, Option<Attribute>> {
        self.values.read().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Clone for AttributeCache {
    fn clone(&self) -> Self {
        Self {
            values: RwLock::new(self.snapshot()),
        }
    }
}

impl fmt::Debug for AttributeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        let mut cached: Vec<_> = snapshot.keys().collect();
        cached.sort_unstable();
        f.debug_struct("AttributeCache").field("cached", &cached).finish()
    }
}

fn malformed(kind: &'static str, value: &Value, reason: &str) -> MalformedValueError {
    MalformedValueError::new(kind, value.to_string(), format!("{reason}, found {}", value.type_name()))
}

fn fact<'a>(p: &Payloads<'a>, predicate: &str) -> Option<&'a Value> {
    p.facts.and_then(|f| f.fetch(predicate))
}

fn field<'a>(p: &Payloads<'a>, keys: &[&str]) -> Option<&'a str> {
    let page = p.page?;
    keys.iter().find_map(|key| page.fetch(key))
}

fn fact_text(p: &Payloads<'_>, predicate: &str) -> Result<Option<String>, MalformedValueError> {
    match fact(p, predicate) {
        None | Some(Value::Item { label: None, .. }) => Ok(None),
        Some(Value::String(s)) => Ok(parse::text(s)),
        Some(Value::Item { label: Some(label), .. }) => Ok(parse::text(label)),
        Some(Value::Int(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(malformed("text", other, "expected text")),
    }
}

fn text_attr(p: &Payloads<'_>, predicate: Option<&str>, keys: &[&str]) -> Result<Option<Attribute>, MalformedValueError> {
    if let Some(predicate) = predicate {
        if let Some(text) = fact_text(p, predicate)? {
            return Ok(Some(Attribute::Text(text)));
        }
    }
    Ok(field(p, keys).and_then(parse::text).map(Attribute::Text))
}

fn normalize_unit<'a>(unit: &'a str, default_unit: &'a str) -> &'a str {
    match unit.trim() {
        "" | "1" => default_unit,
        "square kilometre" | "square kilometer" | "km2" => SQUARE_KM,
        "square metre" | "square meter" | "m2" => "m²",
        "United States dollar" | "USD" | "US$" => DOLLAR,
        other => other,
    }
}

fn measure_attr(
    p: &Payloads<'_>,
    predicate: Option<&str>,
    keys: &[&str],
    default_unit: &str,
) -> Result<Option<Attribute>, MalformedValueError> {
    if let Some(value) = predicate.and_then(|pred| fact(p, pred)) {
        let measure = match value {
            Value::Quantity { amount, unit } => Measure::checked(*amount, normalize_unit(unit, default_unit))?,
            Value::Int(_) | Value::Float(_) => {
                let amount = value.as_float().unwrap_or_default();
                Measure::checked(amount, default_unit)?
            }
            other => return Err(malformed("measure", other, "expected a quantity")),
        };
        return Ok(Some(Attribute::Measure(measure)));
    }

    let Some(raw) = field(p, keys) else {
        return Ok(None);
    };
    let Some(text) = parse::text(raw) else {
        return Ok(None);
    };
    let magnitude = parse::scaled_number(&text)
        .ok_or_else(|| MalformedValueError::new("measure", text.clone(), "expected a number"))?;
    Ok(Some(Attribute::Measure(Measure::checked(magnitude, default_unit)?)))
}

fn long_name(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    text_attr(p, Some("P1448"), &["conventional_long_name", "official_name"])
}

fn iso2_code(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    if let Some(code) = fact_text(p, "P297")? {
        return Ok(Some(Attribute::Text(code)));
    }
    // Settlement infoboxes put ISO 3166-2 subdivision codes (`AR-C`) here.
    Ok(field(p, &["iso_code"])
        .and_then(parse::text)
        .filter(|code| code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()))
        .map(Attribute::Text))
}

fn iso3_code(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    text_attr(p, Some("P298"), &[])
}

fn tld(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    text_attr(p, Some("P78"), &["cctld"])
}

fn calling_code(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    text_attr(p, Some("P474"), &["calling_code"])
}

fn area(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    measure_attr(p, Some("P2046"), &["area_km2", "area_total_km2"], SQUARE_KM)
}

fn population(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    measure_attr(
        p,
        Some("P1082"),
        &["population_estimate", "population_total", "population_census"],
        PERSON,
    )
}

fn population_metro(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    measure_attr(p, None, &["population_metro"], PERSON)
}

fn gdp_ppp(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    measure_attr(p, Some("P4010"), &["GDP_PPP"], DOLLAR)
}

fn gdp_nominal(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    measure_attr(p, Some("P2131"), &["GDP_nominal"], DOLLAR)
}

fn coord_template() -> Option<&'static Regex> {
    static TEMPLATE: OnceLock<Option<Regex>> = OnceLock::new();
    TEMPLATE
        .get_or_init(|| Regex::new(r"(?i)\{\{\s*coord\s*\|([^{}]*)\}\}").ok())
        .as_ref()
}

/// Reads `{{coord|34|35|58|S|58|22|54|W|...}}` or `{{coord|-34.6|-58.4}}`.
fn coord_from_template(raw: &str) -> Result<Option<GeoCoord>, MalformedValueError> {
    let Some(caps) = coord_template().and_then(|re| re.captures(raw)) else {
        return Ok(None);
    };
    let args: Vec<&str> = caps[1].split('|').map(str::trim).filter(|a| !a.contains('=')).collect();
    let bad = |reason: &str| MalformedValueError::new("coordinate", raw, reason);

    let mut components: Vec<Dms> = Vec::with_capacity(2);
    let mut numbers: Vec<f64> = Vec::with_capacity(3);
    for arg in &args {
        if components.len() == 2 {
            break;
        }
        if let Ok(n) = arg.parse::<f64>() {
            numbers.push(n);
            continue;
        }
        let mut chars = arg.chars();
        let (Some(h), None) = (chars.next(), chars.next()) else {
            // Free-form parameters such as `display=inline` or `type:city`.
            break;
        };
        if numbers.is_empty() || numbers.len() > 3 {
            return Err(bad("expected 1 to 3 numbers before each hemisphere"));
        }
        numbers.resize(3, 0.0);
        let hemisphere = Hemisphere::parse(h).map_err(|e| bad(&e.reason))?;
        components.push(Dms::new(numbers[0], numbers[1], numbers[2], Some(hemisphere)));
        numbers.clear();
    }

    match components.as_slice() {
        [lat, lng] => GeoCoord::from_dms(*lat, *lng).map(Some),
        [] => match numbers.as_slice() {
            [lat, lng] => GeoCoord::new(*lat, *lng).map(Some),
            _ => Err(bad("expected latitude and longitude")),
        },
        _ => Err(bad("expected latitude and longitude")),
    }
}

fn number_field(p: &Payloads<'_>, key: &str) -> Result<f64, MalformedValueError> {
    match field(p, &[key]) {
        None => Ok(0.0),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MalformedValueError::new("coordinate", raw, format!("{key} is not a number"))),
    }
}

fn hemisphere_field(p: &Payloads<'_>, key: &str) -> Result<Option<Hemisphere>, MalformedValueError> {
    field(p, &[key])
        .and_then(|raw| raw.trim().chars().next())
        .map(Hemisphere::parse)
        .transpose()
}

fn coord(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    if let Some(value) = fact(p, "P625") {
        return match value {
            Value::Coordinate { latitude, longitude } => Ok(Some(Attribute::Coord(GeoCoord::new(*latitude, *longitude)?))),
            other => Err(malformed("coordinate", other, "expected a coordinate")),
        };
    }

    if let Some(raw) = field(p, &["coordinates"]) {
        if let Some(coord) = coord_from_template(raw)? {
            return Ok(Some(Attribute::Coord(coord)));
        }
    }

    if field(p, &["latd"]).is_none() || field(p, &["longd"]).is_none() {
        return Ok(None);
    }
    let lat = Dms::new(
        number_field(p, "latd")?,
        number_field(p, "latm")?,
        number_field(p, "lats")?,
        hemisphere_field(p, "latNS")?,
    );
    let lng = Dms::new(
        number_field(p, "longd")?,
        number_field(p, "longm")?,
        number_field(p, "longs")?,
        hemisphere_field(p, "longEW")?,
    );
    Ok(Some(Attribute::Coord(GeoCoord::from_dms(lat, lng)?)))
}

fn offset(p: &Payloads<'_>) -> Result<Option<TZOffset>, MalformedValueError> {
    if let Some(value) = fact(p, "P421") {
        let from_fact = match value {
            Value::Item { label: None, .. } => None,
            Value::String(text) | Value::Item { label: Some(text), .. } => TZOffset::extract(text).transpose()?,
            Value::Int(_) | Value::Float(_) => Some(TZOffset::from_hours(value.as_float().unwrap_or_default())?),
            other => return Err(malformed("utc offset", other, "expected a time zone")),
        };
        if from_fact.is_some() {
            return Ok(from_fact);
        }
    }

    // Named zones such as `Argentina Time` carry no offset of their own.
    let Some(text) = field(p, &["utc_offset", "utc_offset1"]).and_then(parse::text) else {
        return Ok(None);
    };
    TZOffset::extract(&text)
        .unwrap_or_else(|| Err(MalformedValueError::new("utc offset", text.as_str(), "no offset in text")))
        .map(Some)
}

fn tz_offset(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    Ok(offset(p)?.map(Attribute::Offset))
}

fn utc_offset(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    Ok(offset(p)?.map(|o| Attribute::Number(o.hours())))
}

fn country(p: &Payloads<'_>) -> Result<Option<Attribute>, MalformedValueError> {
    match fact(p, "P17") {
        Some(Value::Item { id, label: Some(label) }) if !label.trim().is_empty() => {
            return Ok(Some(Attribute::Link(EntityRef {
                name: label.trim().to_string(),
                wikidata_id: Some(id.clone()),
            })));
        }
        Some(Value::Item { .. }) | None => {}
        Some(other) => return Err(malformed("link", other, "expected an item")),
    }

    Ok(field(p, &["subdivision_name", "country"])
        .and_then(parse::text)
        .map(|name| Attribute::Link(EntityRef { name, wikidata_id: None })))
}
