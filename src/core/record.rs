use super::money::{parse_decimal, Amount};
use predial_derive::CsvSchema;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Read;

/// Description of one CSV column, generated by `#[derive(CsvSchema)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// A property row as extracted from the valuation roll, before any cleaning.
///
/// Every cell is optional text: nulls and malformed values are dealt with by
/// the normalizer, not by the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, CsvSchema)]
pub struct RawPropertyRow {
    /// Property identifier, 20 digits (19 accepted and zero-padded)
    #[serde(rename = "objeto_numerico", default)]
    #[csv(required)]
    pub object_number: Option<String>,
    /// Property type
    #[serde(rename = "tipopred", default)]
    pub property_type: Option<String>,
    /// Prior period valuation
    #[serde(rename = "avalpred_vigant", default)]
    #[csv(required)]
    pub valuation_prior: Option<String>,
    /// Prior period usage code
    #[serde(rename = "usu_vigant", default)]
    #[csv(required)]
    pub usage_prior: Option<String>,
    /// Prior period activity code
    #[serde(rename = "actividad_vigant", default)]
    #[csv(required)]
    pub activity_prior: Option<String>,
    /// Prior period stratum (1-9, anything else is unassigned)
    #[serde(rename = "estrato_vigant", default)]
    pub stratum_prior: Option<String>,
    /// Prior period billed tax
    #[serde(rename = "predial_vigant", default)]
    #[csv(required)]
    pub prior_tax_base: Option<String>,
    /// Commune
    #[serde(rename = "comuna", default)]
    pub commune: Option<String>,
    /// Neighbourhood
    #[serde(rename = "barrio", default)]
    pub neighborhood: Option<String>,
    /// Cadastral update status
    #[serde(rename = "actualizacion", default)]
    pub update_status: Option<String>,
    /// Current period valuation
    #[serde(rename = "avalpred_vigact", default)]
    #[csv(required)]
    pub valuation_current: Option<String>,
    /// Current period usage code
    #[serde(rename = "usu_vigact", default)]
    pub usage_current: Option<String>,
    /// Current period activity code
    #[serde(rename = "actividad_vigact", default)]
    pub activity_current: Option<String>,
    /// Current period stratum (1-9, anything else is unassigned)
    #[serde(rename = "estrato_vigact", default)]
    pub stratum_current: Option<String>,
    /// Portfolio (arrears) flag, Y or N
    #[serde(rename = "cartera_vigact", default)]
    pub portfolio_flag: Option<String>,
}

/// Socioeconomic stratum, or the `N` sentinel when none is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stratum {
    Level(u8),
    Unassigned,
}

impl Stratum {
    pub const SENTINEL: &'static str = "N";

    /// Strict parse: a digit 1-9 or `N`. Used for configuration input.
    pub fn parse(s: &str) -> Option<Stratum> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::SENTINEL) {
            return Some(Stratum::Unassigned);
        }
        s.parse::<u8>().ok().and_then(Stratum::from_level)
    }

    pub fn from_level(level: u8) -> Option<Stratum> {
        (1..=9).contains(&level).then_some(Stratum::Level(level))
    }

    /// Lenient coercion of a raw cell. Integral numbers 1-9 (`"2"`, `"2.0"`)
    /// keep their level; anything else becomes [`Stratum::Unassigned`].
    ///
    /// The flag is true when the value had to be coerced, i.e. it was neither
    /// a valid level nor already the sentinel.
    pub fn coerce(raw: Option<&str>) -> (Stratum, bool) {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return (Stratum::Unassigned, true);
        };
        if raw == Self::SENTINEL {
            return (Stratum::Unassigned, false);
        }
        let level = parse_decimal(raw)
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_u8())
            .and_then(Stratum::from_level);
        match level {
            Some(stratum) => (stratum, false),
            None => (Stratum::Unassigned, true),
        }
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            Stratum::Level(level) => Some(*level),
            Stratum::Unassigned => None,
        }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stratum::Level(level) => write!(f, "{level}"),
            Stratum::Unassigned => f.write_str(Self::SENTINEL),
        }
    }
}

impl Serialize for Stratum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Stratum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StratumVisitor;

        impl<'de> de::Visitor<'de> for StratumVisitor {
            type Value = Stratum;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a stratum 1-9 or \"N\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Stratum, E> {
                u8::try_from(v)
                    .ok()
                    .and_then(Stratum::from_level)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Stratum, E> {
                u8::try_from(v)
                    .ok()
                    .and_then(Stratum::from_level)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Stratum, E> {
                Stratum::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            // serde_json with arbitrary_precision hands numbers over as a
            // single entry map holding the literal digits
            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Stratum, A::Error> {
                let Some((_, number)) = map.next_entry::<String, String>()? else {
                    return Err(de::Error::invalid_type(de::Unexpected::Map, &self));
                };
                number
                    .parse::<u8>()
                    .ok()
                    .and_then(Stratum::from_level)
                    .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(&number), &self))
            }
        }

        deserializer.deserialize_any(StratumVisitor)
    }
}

/// Whether the property is in collections/arrears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortfolioFlag {
    /// In arrears
    Y,
    /// Up to date
    N,
}

impl PortfolioFlag {
    pub fn parse(raw: Option<&str>) -> Option<PortfolioFlag> {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("Y") => Some(PortfolioFlag::Y),
            Some(s) if s.eq_ignore_ascii_case("N") => Some(PortfolioFlag::N),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioFlag::Y => "Y",
            PortfolioFlag::N => "N",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidenceType {
    Residential,
    NonResidential,
}

/// Composite usage+activity code of residential properties.
pub const RESIDENTIAL_USAGE_ACTIVITY: &str = "0101";

/// A cleaned property record. Built only by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// 1-based position of the source row in the input batch
    pub property_id: usize,
    pub object_number: String,
    pub property_type: Option<String>,
    pub commune: Option<String>,
    pub neighborhood: Option<String>,
    pub update_status: Option<String>,
    pub usage_prior: String,
    pub activity_prior: String,
    pub usage_current: String,
    pub activity_current: String,
    pub stratum_prior: Stratum,
    pub stratum_current: Stratum,
    pub valuation_prior: Amount,
    pub valuation_current: Amount,
    pub prior_tax_base: Amount,
    pub portfolio_flag: Option<PortfolioFlag>,
    pub usage_activity_current: String,
    pub is_residential: bool,
}

impl PropertyRecord {
    pub fn residence_type(&self) -> ResidenceType {
        if self.is_residential {
            ResidenceType::Residential
        } else {
            ResidenceType::NonResidential
        }
    }

    pub fn valuation_current_decimal(&self) -> Decimal {
        Decimal::from(self.valuation_current)
    }
}

impl From<&PropertyRecord> for RawPropertyRow {
    fn from(record: &PropertyRecord) -> Self {
        RawPropertyRow {
            object_number: Some(record.object_number.clone()),
            property_type: record.property_type.clone(),
            valuation_prior: Some(record.valuation_prior.to_string()),
            usage_prior: Some(record.usage_prior.clone()),
            activity_prior: Some(record.activity_prior.clone()),
            stratum_prior: Some(record.stratum_prior.to_string()),
            prior_tax_base: Some(record.prior_tax_base.to_string()),
            commune: record.commune.clone(),
            neighborhood: record.neighborhood.clone(),
            update_status: record.update_status.clone(),
            valuation_current: Some(record.valuation_current.to_string()),
            usage_current: Some(record.usage_current.clone()),
            activity_current: Some(record.activity_current.clone()),
            stratum_current: Some(record.stratum_current.to_string()),
            portfolio_flag: record.portfolio_flag.map(|f| f.as_str().to_string()),
        }
    }
}

/// Read raw property rows from delimited text.
///
/// Header names are matched case-insensitively; columns the roll carries but
/// the computation does not use are ignored.
pub fn read_rows_csv<R: Read>(reader: R, delimiter: u8) -> anyhow::Result<Vec<RawPropertyRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    if !headers.iter().any(|h| h == "objeto_numerico") {
        anyhow::bail!("input has no objeto_numerico column; check the delimiter");
    }
    rdr.set_headers(headers);

    let rows = rdr
        .deserialize::<RawPropertyRow>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write rows in the same layout [`read_rows_csv`] accepts.
pub fn write_rows_csv<W: std::io::Write>(
    rows: &[RawPropertyRow],
    writer: W,
    delimiter: u8,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
