// 🏠 Address & Name Parsing - structured fields from free-text
// The grammatical tagger itself is a caller-supplied black box behind the
// AddressTagger trait; everything around it (cleanup, fallback, street
// standardization, zip/phone/country/name handling) lives here. All lookup
// tables are immutable values constructed once and passed in explicitly.

use crate::normalize::{clean_spaces, simplify_text};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// TAGGER INTERFACE
// ============================================================================

/// Output field names the parser fills.
pub const FIELD_RECIPIENT: &str = "Recipient";
pub const FIELD_ADDRESS1: &str = "Address1";
pub const FIELD_ADDRESS2: &str = "Address2";
pub const FIELD_CITY: &str = "City";
pub const FIELD_STATE: &str = "State";
pub const FIELD_ZIP: &str = "Zip_Code";

/// Signaled by a tagger. `RepeatedLabel` is the distinct "conflicting
/// repeated label" condition; the parser catches it locally and degrades to
/// a single best-effort street line, it never propagates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tagger saw conflicting repeated label: {label}")]
    RepeatedLabel { label: String },

    #[error("tagger failed: {0}")]
    Other(String),
}

/// Grammatical label -> output field dictionary handed to the tagger.
/// Immutable after construction; `standard()` covers the usual street
/// address grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMapping {
    map: HashMap<String, String>,
}

impl LabelMapping {
    pub fn new() -> Self {
        LabelMapping {
            map: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut mapping = LabelMapping::new();
        for (label, field) in [
            ("Recipient", FIELD_RECIPIENT),
            ("AddressNumber", FIELD_ADDRESS1),
            ("AddressNumberPrefix", FIELD_ADDRESS1),
            ("AddressNumberSuffix", FIELD_ADDRESS1),
            ("StreetName", FIELD_ADDRESS1),
            ("StreetNamePreDirectional", FIELD_ADDRESS1),
            ("StreetNamePreModifier", FIELD_ADDRESS1),
            ("StreetNamePreType", FIELD_ADDRESS1),
            ("StreetNamePostDirectional", FIELD_ADDRESS1),
            ("StreetNamePostModifier", FIELD_ADDRESS1),
            ("StreetNamePostType", FIELD_ADDRESS1),
            ("CornerOf", FIELD_ADDRESS1),
            ("IntersectionSeparator", FIELD_ADDRESS1),
            ("LandmarkName", FIELD_ADDRESS1),
            ("USPSBoxGroupID", FIELD_ADDRESS1),
            ("USPSBoxGroupType", FIELD_ADDRESS1),
            ("USPSBoxID", FIELD_ADDRESS1),
            ("USPSBoxType", FIELD_ADDRESS1),
            ("BuildingName", FIELD_ADDRESS2),
            ("OccupancyType", FIELD_ADDRESS2),
            ("OccupancyIdentifier", FIELD_ADDRESS2),
            ("SubaddressIdentifier", FIELD_ADDRESS2),
            ("SubaddressType", FIELD_ADDRESS2),
            ("PlaceName", FIELD_CITY),
            ("StateName", FIELD_STATE),
            ("ZipCode", FIELD_ZIP),
        ] {
            mapping.map.insert(label.to_string(), field.to_string());
        }
        mapping
    }

    pub fn with_label(mut self, label: &str, field: &str) -> Self {
        self.map.insert(label.to_string(), field.to_string());
        self
    }

    pub fn field_for(&self, label: &str) -> Option<&str> {
        self.map.get(label).map(String::as_str)
    }
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self::standard()
    }
}

/// The external address tagger. Returns (output field, text) pairs after
/// applying the supplied label mapping, or a `TagError`.
pub trait AddressTagger {
    fn tag(&self, text: &str, labels: &LabelMapping) -> Result<Vec<(String, String)>, TagError>;
}

// ============================================================================
// PARSED OUTPUT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub zip_code_4: String,
    pub recipient: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressOptions {
    pub include_recipient: bool,
    pub standardize_streets: bool,
    pub split_zip_code: bool,
    pub clean_text: bool,
    pub include_country: bool,
    pub include_phone: bool,
}

impl Default for AddressOptions {
    fn default() -> Self {
        AddressOptions {
            include_recipient: false,
            standardize_streets: true,
            split_zip_code: true,
            clean_text: true,
            include_country: false,
            include_phone: false,
        }
    }
}

// ============================================================================
// ADDRESS PARSER
// ============================================================================

lazy_static! {
    // A zip glued to the state ("TX78701") gets a space pushed in front
    static ref ZIP_DETACH_RE: Regex = Regex::new(r"(\d{5}(\.\d+)?)").unwrap();
    static ref STRIP_MARKS_RE: Regex = Regex::new(r"[%#.]").unwrap();
    static ref PHONE_RE: Regex = Regex::new(
        r"((\([0-9]{3}\)?|[0-9]{3}\W)[0-9]{3}\W[0-9]{4}|[0-9]{10}|\([0-9]{3}\)\W[0-9]{3}\W[0-9]{4})"
    )
    .unwrap();
    static ref NON_DIGIT_RUN_RE: Regex = Regex::new(r"\D+").unwrap();
}

/// Breaks one free-text address into structured fields. Holds the tagger
/// and the immutable lookup tables; `parse` itself is pure per call and
/// never fails: malformed rows degrade to best-effort fields.
pub struct AddressParser {
    tagger: Box<dyn AddressTagger>,
    labels: LabelMapping,
    streets: StreetAbbreviations,
    countries: CountryTable,
    pub options: AddressOptions,
}

impl AddressParser {
    pub fn new(tagger: Box<dyn AddressTagger>) -> Self {
        AddressParser {
            tagger,
            labels: LabelMapping::standard(),
            streets: StreetAbbreviations::usps(),
            countries: CountryTable::builtin(),
            options: AddressOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AddressOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_labels(mut self, labels: LabelMapping) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_countries(mut self, countries: CountryTable) -> Self {
        self.countries = countries;
        self
    }

    pub fn parse(&self, text: &str) -> ParsedAddress {
        let mut result = ParsedAddress::default();
        if self.options.include_recipient {
            result.recipient = Some(String::new());
        }

        let mut text = text.to_string();
        if self.options.clean_text {
            text = ZIP_DETACH_RE.replace_all(&text, " $1").to_string();
            text = STRIP_MARKS_RE.replace_all(&text, "").to_string();
        }

        if self.options.include_country {
            let (name, matched) = self.countries.find(&text);
            if !matched.is_empty() {
                text = remove_ignore_case(&text, &matched);
            }
            result.country = Some(name);
        }

        if self.options.include_phone {
            let (phone, rest) = parse_phone(&text);
            result.phone = Some(phone);
            text = rest;
        }

        let text = text.trim();
        let tagged = match self.tagger.tag(text, &self.labels) {
            Ok(tagged) => tagged,
            // The address is most likely malformed; keep it whole rather
            // than lose it
            Err(TagError::RepeatedLabel { .. }) | Err(TagError::Other(_)) => {
                vec![(FIELD_ADDRESS1.to_string(), text.to_string())]
            }
        };

        for (field, value) in tagged {
            let value = value.to_uppercase();
            match field.as_str() {
                FIELD_ADDRESS1 => result.address1 = value,
                FIELD_ADDRESS2 => result.address2 = value,
                FIELD_CITY => result.city = value,
                FIELD_STATE => result.state = value,
                FIELD_ZIP => result.zip_code = value,
                FIELD_RECIPIENT if self.options.include_recipient => {
                    result.recipient = Some(value)
                }
                _ => {}
            }
        }

        if self.options.standardize_streets {
            result.address1 = self.streets.standardize(&result.address1);
            result.address2 = self.streets.standardize(&result.address2);
        }

        if self.options.split_zip_code {
            let split = split_zip(&result.zip_code);
            result.zip_code = split.zip_code;
            result.zip_code_4 = split.zip_code_4;
        }

        result
    }
}

// ============================================================================
// STREET SUFFIX STANDARDIZATION
// ============================================================================

/// Full names and common variants of street suffixes mapped to the official
/// USPS abbreviation (publication 28, appendix C).
const USPS_STREET_SUFFIXES: &[(&str, &str)] = &[
    ("ALLEE", "ALY"), ("ALLEY", "ALY"), ("ALLY", "ALY"), ("ANEX", "ANX"),
    ("ANNEX", "ANX"), ("ANNX", "ANX"), ("ARCADE", "ARC"), ("AV", "AVE"),
    ("AVEN", "AVE"), ("AVENU", "AVE"), ("AVENUE", "AVE"), ("AVN", "AVE"),
    ("AVNUE", "AVE"), ("BAYOO", "BYU"), ("BAYOU", "BYU"), ("BEACH", "BCH"),
    ("BEND", "BND"), ("BLUF", "BLF"), ("BLUFF", "BLF"), ("BLUFFS", "BLFS"),
    ("BOT", "BTM"), ("BOTTM", "BTM"), ("BOTTOM", "BTM"), ("BOUL", "BLVD"),
    ("BOULEVARD", "BLVD"), ("BOULV", "BLVD"), ("BRNCH", "BR"), ("BRANCH", "BR"),
    ("BRDGE", "BRG"), ("BRIDGE", "BRG"), ("BROOK", "BRK"), ("BROOKS", "BRKS"),
    ("BURG", "BG"), ("BURGS", "BGS"), ("BYPA", "BYP"), ("BYPAS", "BYP"),
    ("BYPASS", "BYP"), ("BYPS", "BYP"), ("CAMP", "CP"), ("CMP", "CP"),
    ("CANYN", "CYN"), ("CANYON", "CYN"), ("CNYN", "CYN"), ("CAPE", "CPE"),
    ("CAUSEWAY", "CSWY"), ("CAUSWA", "CSWY"), ("CEN", "CTR"), ("CENT", "CTR"),
    ("CENTER", "CTR"), ("CENTR", "CTR"), ("CENTRE", "CTR"), ("CNTER", "CTR"),
    ("CNTR", "CTR"), ("CENTERS", "CTRS"), ("CIRC", "CIR"), ("CIRCL", "CIR"),
    ("CIRCLE", "CIR"), ("CRCL", "CIR"), ("CRCLE", "CIR"), ("CIRCLES", "CIRS"),
    ("CLIFF", "CLF"), ("CLIFFS", "CLFS"), ("CLUB", "CLB"), ("COMMON", "CMN"),
    ("COMMONS", "CMNS"), ("CORNER", "COR"), ("CORNERS", "CORS"), ("COURSE", "CRSE"),
    ("COURT", "CT"), ("COURTS", "CTS"), ("COVE", "CV"), ("COVES", "CVS"),
    ("CREEK", "CRK"), ("CRESCENT", "CRES"), ("CRSENT", "CRES"), ("CRSNT", "CRES"),
    ("CREST", "CRST"), ("CROSSING", "XING"), ("CRSSNG", "XING"), ("CROSSROAD", "XRD"),
    ("CROSSROADS", "XRDS"), ("CURVE", "CURV"), ("DALE", "DL"), ("DAM", "DM"),
    ("DIV", "DV"), ("DIVIDE", "DV"), ("DVD", "DV"), ("DRIV", "DR"),
    ("DRIVE", "DR"), ("DRV", "DR"), ("DRIVES", "DRS"), ("ESTATE", "EST"),
    ("ESTATES", "ESTS"), ("EXP", "EXPY"), ("EXPR", "EXPY"), ("EXPRESS", "EXPY"),
    ("EXPRESSWAY", "EXPY"), ("EXPW", "EXPY"), ("EXTENSION", "EXT"), ("EXTN", "EXT"),
    ("EXTNSN", "EXT"), ("FALLS", "FLS"), ("FERRY", "FRY"), ("FRRY", "FRY"),
    ("FIELD", "FLD"), ("FIELDS", "FLDS"), ("FLAT", "FLT"), ("FLATS", "FLTS"),
    ("FORD", "FRD"), ("FORDS", "FRDS"), ("FOREST", "FRST"), ("FORESTS", "FRST"),
    ("FORG", "FRG"), ("FORGE", "FRG"), ("FORGES", "FRGS"), ("FORK", "FRK"),
    ("FORKS", "FRKS"), ("FORT", "FT"), ("FRT", "FT"), ("FREEWAY", "FWY"),
    ("FREEWY", "FWY"), ("FRWAY", "FWY"), ("FRWY", "FWY"), ("GARDEN", "GDN"),
    ("GARDN", "GDN"), ("GRDEN", "GDN"), ("GRDN", "GDN"), ("GARDENS", "GDNS"),
    ("GRDNS", "GDNS"), ("GATEWAY", "GTWY"), ("GATEWY", "GTWY"), ("GATWAY", "GTWY"),
    ("GTWAY", "GTWY"), ("GLEN", "GLN"), ("GLENS", "GLNS"), ("GREEN", "GRN"),
    ("GREENS", "GRNS"), ("GROV", "GRV"), ("GROVE", "GRV"), ("GROVES", "GRVS"),
    ("HARB", "HBR"), ("HARBOR", "HBR"), ("HARBR", "HBR"), ("HRBOR", "HBR"),
    ("HARBORS", "HBRS"), ("HAVEN", "HVN"), ("HT", "HTS"), ("HIGHWAY", "HWY"),
    ("HIGHWY", "HWY"), ("HIWAY", "HWY"), ("HIWY", "HWY"), ("HWAY", "HWY"),
    ("HILL", "HL"), ("HILLS", "HLS"), ("HLLW", "HOLW"), ("HOLLOW", "HOLW"),
    ("HOLLOWS", "HOLW"), ("HOLWS", "HOLW"), ("ISLAND", "IS"), ("ISLND", "IS"),
    ("ISLANDS", "ISS"), ("ISLNDS", "ISS"), ("ISLES", "ISLE"), ("JCTION", "JCT"),
    ("JCTN", "JCT"), ("JUNCTION", "JCT"), ("JUNCTN", "JCT"), ("JUNCTON", "JCT"),
    ("JCTNS", "JCTS"), ("JUNCTIONS", "JCTS"), ("KEY", "KY"), ("KEYS", "KYS"),
    ("KNOL", "KNL"), ("KNOLL", "KNL"), ("KNOLLS", "KNLS"), ("LAKE", "LK"),
    ("LAKES", "LKS"), ("LANDING", "LNDG"), ("LNDNG", "LNDG"), ("LANE", "LN"),
    ("LIGHT", "LGT"), ("LIGHTS", "LGTS"), ("LOAF", "LF"), ("LOCK", "LCK"),
    ("LOCKS", "LCKS"), ("LDGE", "LDG"), ("LODG", "LDG"), ("LODGE", "LDG"),
    ("LOOPS", "LOOP"), ("MANOR", "MNR"), ("MANORS", "MNRS"), ("MEADOW", "MDW"),
    ("MEADOWS", "MDWS"), ("MEDOWS", "MDWS"), ("MILL", "ML"), ("MILLS", "MLS"),
    ("MISSN", "MSN"), ("MSSN", "MSN"), ("MOTORWAY", "MTWY"), ("MNT", "MT"),
    ("MOUNT", "MT"), ("MNTAIN", "MTN"), ("MNTN", "MTN"), ("MOUNTAIN", "MTN"),
    ("MOUNTIN", "MTN"), ("MTIN", "MTN"), ("MNTNS", "MTNS"), ("MOUNTAINS", "MTNS"),
    ("NECK", "NCK"), ("ORCHARD", "ORCH"), ("ORCHRD", "ORCH"), ("OVL", "OVAL"),
    ("OVERPASS", "OPAS"), ("PRK", "PARK"), ("PARKS", "PARK"), ("PARKWAY", "PKWY"),
    ("PARKWY", "PKWY"), ("PKWAY", "PKWY"), ("PKY", "PKWY"), ("PARKWAYS", "PKWY"),
    ("PKWYS", "PKWY"), ("PASSAGE", "PSGE"), ("PATHS", "PATH"), ("PIKES", "PIKE"),
    ("PINE", "PNE"), ("PINES", "PNES"), ("PLAIN", "PLN"), ("PLAINS", "PLNS"),
    ("PLAZA", "PLZ"), ("PLZA", "PLZ"), ("POINT", "PT"), ("POINTS", "PTS"),
    ("PORT", "PRT"), ("PORTS", "PRTS"), ("PRAIRIE", "PR"), ("PRR", "PR"),
    ("RAD", "RADL"), ("RADIAL", "RADL"), ("RADIEL", "RADL"), ("RANCH", "RNCH"),
    ("RANCHES", "RNCH"), ("RNCHS", "RNCH"), ("RAPID", "RPD"), ("RAPIDS", "RPDS"),
    ("REST", "RST"), ("RDGE", "RDG"), ("RIDGE", "RDG"), ("RIDGES", "RDGS"),
    ("RIVER", "RIV"), ("RVR", "RIV"), ("RIVR", "RIV"), ("ROAD", "RD"),
    ("ROADS", "RDS"), ("ROUTE", "RTE"), ("SHOAL", "SHL"), ("SHOALS", "SHLS"),
    ("SHOAR", "SHR"), ("SHORE", "SHR"), ("SHOARS", "SHRS"), ("SHORES", "SHRS"),
    ("SKYWAY", "SKWY"), ("SPNG", "SPG"), ("SPRING", "SPG"), ("SPRNG", "SPG"),
    ("SPNGS", "SPGS"), ("SPRINGS", "SPGS"), ("SPRNGS", "SPGS"), ("SPURS", "SPUR"),
    ("SQR", "SQ"), ("SQRE", "SQ"), ("SQU", "SQ"), ("SQUARE", "SQ"),
    ("SQRS", "SQS"), ("SQUARES", "SQS"), ("STATION", "STA"), ("STATN", "STA"),
    ("STN", "STA"), ("STRAV", "STRA"), ("STRAVEN", "STRA"), ("STRAVENUE", "STRA"),
    ("STRAVN", "STRA"), ("STRVN", "STRA"), ("STRVNUE", "STRA"), ("STREAM", "STRM"),
    ("STREME", "STRM"), ("STREET", "ST"), ("STRT", "ST"), ("STR", "ST"),
    ("STREETS", "STS"), ("SUMIT", "SMT"), ("SUMITT", "SMT"), ("SUMMIT", "SMT"),
    ("TERR", "TER"), ("TERRACE", "TER"), ("THROUGHWAY", "TRWY"), ("TRACE", "TRCE"),
    ("TRACES", "TRCE"), ("TRACK", "TRAK"), ("TRACKS", "TRAK"), ("TRK", "TRAK"),
    ("TRKS", "TRAK"), ("TRAFFICWAY", "TRFY"), ("TRAIL", "TRL"), ("TRAILS", "TRL"),
    ("TRLS", "TRL"), ("TRAILER", "TRLR"), ("TRLRS", "TRLR"), ("TUNEL", "TUNL"),
    ("TUNLS", "TUNL"), ("TUNNEL", "TUNL"), ("TUNNELS", "TUNL"), ("TUNNL", "TUNL"),
    ("TRNPK", "TPKE"), ("TURNPIKE", "TPKE"), ("TURNPK", "TPKE"), ("UNDERPASS", "UPAS"),
    ("UNION", "UN"), ("UNIONS", "UNS"), ("VALLEY", "VLY"), ("VALLY", "VLY"),
    ("VLLY", "VLY"), ("VALLEYS", "VLYS"), ("VDCT", "VIA"), ("VIADCT", "VIA"),
    ("VIADUCT", "VIA"), ("VIEW", "VW"), ("VIEWS", "VWS"), ("VILL", "VLG"),
    ("VILLAG", "VLG"), ("VILLAGE", "VLG"), ("VILLG", "VLG"), ("VILLIAGE", "VLG"),
    ("VILLAGES", "VLGS"), ("VILLE", "VL"), ("VIST", "VIS"), ("VISTA", "VIS"),
    ("VST", "VIS"), ("VSTA", "VIS"), ("WALKS", "WALK"), ("WY", "WAY"),
    ("WELL", "WL"), ("WELLS", "WLS"),
];

/// Immutable street-suffix table. Construct once, pass in explicitly.
#[derive(Debug, Clone)]
pub struct StreetAbbreviations {
    map: HashMap<&'static str, &'static str>,
}

impl StreetAbbreviations {
    pub fn usps() -> Self {
        StreetAbbreviations {
            map: USPS_STREET_SUFFIXES.iter().copied().collect(),
        }
    }

    /// Replace whole-word suffix variants with the official abbreviation
    /// and drop periods. Word-bounded: STREET becomes ST, STREETER stays.
    pub fn standardize(&self, text: &str) -> String {
        text.to_uppercase()
            .split_whitespace()
            .map(|token| {
                let bare: String = token.chars().filter(|&c| c != '.').collect();
                match self.map.get(bare.as_str()) {
                    Some(&abbr) => abbr.to_string(),
                    None => bare,
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// COUNTRY LOOKUP
// ============================================================================

/// Country names and alpha-3 codes recognized after the zip code. Immutable
/// once built; `with_entry` extends the built-in list.
#[derive(Debug, Clone)]
pub struct CountryTable {
    entries: Vec<(String, String)>,
}

impl CountryTable {
    pub fn builtin() -> Self {
        let entries = [
            ("UNITED STATES", "USA"), ("CANADA", "CAN"), ("MEXICO", "MEX"),
            ("UNITED KINGDOM", "GBR"), ("IRELAND", "IRL"), ("FRANCE", "FRA"),
            ("GERMANY", "DEU"), ("SPAIN", "ESP"), ("PORTUGAL", "PRT"),
            ("ITALY", "ITA"), ("NETHERLANDS", "NLD"), ("BELGIUM", "BEL"),
            ("SWITZERLAND", "CHE"), ("AUSTRIA", "AUT"), ("POLAND", "POL"),
            ("CZECH REPUBLIC", "CZE"), ("CZECHIA", "CZE"), ("SLOVAKIA", "SVK"),
            ("HUNGARY", "HUN"), ("ROMANIA", "ROU"), ("GREECE", "GRC"),
            ("SWEDEN", "SWE"), ("NORWAY", "NOR"), ("DENMARK", "DNK"),
            ("FINLAND", "FIN"), ("ICELAND", "ISL"), ("RUSSIA", "RUS"),
            ("UKRAINE", "UKR"), ("TURKEY", "TUR"), ("ISRAEL", "ISR"),
            ("SAUDI ARABIA", "SAU"), ("UNITED ARAB EMIRATES", "ARE"),
            ("INDIA", "IND"), ("PAKISTAN", "PAK"), ("BANGLADESH", "BGD"),
            ("CHINA", "CHN"), ("TAIWAN", "TWN"), ("HONG KONG", "HKG"),
            ("JAPAN", "JPN"), ("SOUTH KOREA", "KOR"), ("SINGAPORE", "SGP"),
            ("MALAYSIA", "MYS"), ("THAILAND", "THA"), ("VIETNAM", "VNM"),
            ("PHILIPPINES", "PHL"), ("INDONESIA", "IDN"), ("AUSTRALIA", "AUS"),
            ("NEW ZEALAND", "NZL"), ("BRAZIL", "BRA"), ("ARGENTINA", "ARG"),
            ("CHILE", "CHL"), ("COLOMBIA", "COL"), ("PERU", "PER"),
            ("VENEZUELA", "VEN"), ("ECUADOR", "ECU"), ("URUGUAY", "URY"),
            ("PANAMA", "PAN"), ("COSTA RICA", "CRI"), ("GUATEMALA", "GTM"),
            ("DOMINICAN REPUBLIC", "DOM"), ("JAMAICA", "JAM"), ("CUBA", "CUB"),
            ("EGYPT", "EGY"), ("MOROCCO", "MAR"), ("NIGERIA", "NGA"),
            ("KENYA", "KEN"), ("SOUTH AFRICA", "ZAF"), ("GHANA", "GHA"),
        ];
        CountryTable {
            entries: entries
                .iter()
                .map(|&(n, a)| (n.to_string(), a.to_string()))
                .collect(),
        }
    }

    pub fn with_entry(mut self, name: &str, alpha3: &str) -> Self {
        self.entries
            .push((name.to_uppercase(), alpha3.to_uppercase()));
        self
    }

    /// Look for a country name or alpha-3 code in the text, scanning only
    /// the tail after the last digit run (past what is hopefully the zip).
    /// Returns (country name, matched text), both empty when none found.
    pub fn find(&self, text: &str) -> (String, String) {
        if text.is_empty() {
            return (String::new(), String::new());
        }
        let tail = NON_DIGIT_RUN_RE
            .find_iter(text)
            .last()
            .map(|m| m.as_str())
            .unwrap_or("");
        let tail_upper = tail.to_uppercase();

        for (name, alpha3) in &self.entries {
            if word_bounded_contains(&tail_upper, name) {
                return (name.clone(), name.clone());
            }
            if word_bounded_contains(&tail_upper, alpha3) {
                return (name.clone(), alpha3.clone());
            }
        }
        (String::new(), String::new())
    }
}

/// Remove the first case-insensitive occurrence of `needle` from `text`.
fn remove_ignore_case(text: &str, needle: &str) -> String {
    let upper = text.to_uppercase();
    match upper.find(&needle.to_uppercase()) {
        Some(pos)
            if upper.len() == text.len()
                && text.is_char_boundary(pos)
                && text.is_char_boundary(pos + needle.len()) =>
        {
            let mut out = text.to_string();
            out.replace_range(pos..pos + needle.len(), "");
            out
        }
        _ => text.to_string(),
    }
}

fn word_bounded_contains(haystack: &str, needle: &str) -> bool {
    // Pad with spaces and soften punctuation so "USA." still matches
    let softened: String = haystack
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", softened).contains(&format!(" {} ", needle))
}

// ============================================================================
// PHONE / ZIP / NAME HELPERS
// ============================================================================

/// Extract a US phone number (digits only) and return the text with the
/// number removed. No number found leaves the text untouched.
pub fn parse_phone(text: &str) -> (String, String) {
    match PHONE_RE.find(text) {
        Some(found) => {
            let digits: String = found.as_str().chars().filter(char::is_ascii_digit).collect();
            let rest = PHONE_RE.replace(text, "").to_string();
            (digits, clean_spaces(&rest))
        }
        None => (String::new(), text.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZipSplit {
    pub zip_code: String,
    pub zip_code_4: String,
}

/// Split a zip into zip / zip+4 with zero-fill: "123" becomes "00123",
/// nine digits split 5/4, a lone "0" clears to blank.
pub fn split_zip(zip: &str) -> ZipSplit {
    let zip: String = zip.split_whitespace().collect();

    let (mut zip_code, mut zip_code_4) = if let Some((head, tail)) = zip.split_once('-') {
        (head.to_string(), tail.to_string())
    } else if zip.len() == 9 {
        (zip[..5].to_string(), zip[5..].to_string())
    } else if zip.chars().all(|c| c.is_ascii_digit()) && zip.len() > 5 {
        let padded = format!("{:0>9}", zip);
        (padded[..5].to_string(), padded[5..].to_string())
    } else {
        (zip, String::new())
    };

    if zip_code == "0" {
        zip_code.clear();
    }
    if zip_code_4 == "0" {
        zip_code_4.clear();
    }
    if !zip_code.is_empty() {
        zip_code = format!("{:0>5}", zip_code);
    }
    if !zip_code_4.is_empty() {
        zip_code_4 = format!("{:0>4}", zip_code_4);
    }

    ZipSplit {
        zip_code,
        zip_code_4,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameOptions {
    /// "SMITH, JOHN" reorders to "JOHN SMITH"
    pub reorder_if_comma: bool,
    /// "JENSON III" keeps the suffix with the preceding name
    pub merge_roman_suffixes: bool,
}

impl Default for NameOptions {
    fn default() -> Self {
        NameOptions {
            reorder_if_comma: false,
            merge_roman_suffixes: true,
        }
    }
}

/// Split a full name into first / middle / last. More than three words
/// push the extras into the last name.
pub fn split_name(text: &str, options: &NameOptions) -> ParsedName {
    let mut text = text.to_string();
    if options.reorder_if_comma {
        if let Some((last, first)) = text.split_once(',') {
            text = format!("{} {}", first.trim(), last.trim());
        }
    }
    let cleaned = clean_spaces(&simplify_text(&text)).to_uppercase();

    let mut words: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        let roman = word.len() > 1 && word.chars().all(|c| c == 'I' || c == 'V');
        if options.merge_roman_suffixes && roman && !words.is_empty() {
            let prev = words.last_mut().unwrap();
            prev.push(' ');
            prev.push_str(word);
        } else {
            words.push(word.to_string());
        }
    }

    match words.len() {
        0 => ParsedName::default(),
        1 => ParsedName {
            first: words[0].clone(),
            ..Default::default()
        },
        2 => ParsedName {
            first: words[0].clone(),
            middle: String::new(),
            last: words[1].clone(),
        },
        3 => ParsedName {
            first: words[0].clone(),
            middle: words[1].clone(),
            last: words[2].clone(),
        },
        _ => ParsedName {
            first: words[0].clone(),
            middle: words[1].clone(),
            last: words[2..].join(" "),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal stand-in for the external tagger: splits on a fixed grammar
    /// good enough to exercise the parser around it.
    struct StubTagger {
        fail_with: Option<TagError>,
    }

    impl AddressTagger for StubTagger {
        fn tag(
            &self,
            text: &str,
            _labels: &LabelMapping,
        ) -> Result<Vec<(String, String)>, TagError> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            // "<number> <street...> <city> <state> <zip>"
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() < 5 {
                return Ok(vec![(FIELD_ADDRESS1.to_string(), text.to_string())]);
            }
            let n = words.len();
            Ok(vec![
                (FIELD_ADDRESS1.to_string(), words[..n - 3].join(" ")),
                (FIELD_CITY.to_string(), words[n - 3].to_string()),
                (FIELD_STATE.to_string(), words[n - 2].to_string()),
                (FIELD_ZIP.to_string(), words[n - 1].to_string()),
            ])
        }
    }

    fn parser() -> AddressParser {
        AddressParser::new(Box::new(StubTagger { fail_with: None }))
    }

    #[test]
    fn test_parse_breaks_address_into_fields() {
        let parsed = parser().parse("123 Main Street Austin TX 78701");
        assert_eq!(parsed.address1, "123 MAIN ST");
        assert_eq!(parsed.city, "AUSTIN");
        assert_eq!(parsed.state, "TX");
        assert_eq!(parsed.zip_code, "78701");
        assert_eq!(parsed.zip_code_4, "");
    }

    #[test]
    fn test_repeated_label_degrades_to_whole_text() {
        let parser = AddressParser::new(Box::new(StubTagger {
            fail_with: Some(TagError::RepeatedLabel {
                label: "StreetName".to_string(),
            }),
        }));
        let parsed = parser.parse("123 Main 456 Oak");
        assert_eq!(parsed.address1, "123 MAIN 456 OAK");
        assert_eq!(parsed.city, "");
    }

    #[test]
    fn test_zip_plus_four_is_split() {
        let parsed = parser().parse("123 Main Street Austin TX 78701-1234");
        assert_eq!(parsed.zip_code, "78701");
        assert_eq!(parsed.zip_code_4, "1234");
    }

    #[test]
    fn test_phone_extracted_when_requested() {
        let mut options = AddressOptions::default();
        options.include_phone = true;
        let parser = parser().with_options(options);
        let parsed = parser.parse("123 Main Street Austin TX 78701 (512) 555-0170");
        assert_eq!(parsed.phone.as_deref(), Some("5125550170"));
        assert_eq!(parsed.zip_code, "78701");
    }

    #[test]
    fn test_country_found_after_zip() {
        let mut options = AddressOptions::default();
        options.include_country = true;
        let parser = parser().with_options(options);
        let parsed = parser.parse("123 Main Street Austin TX 78701 Canada");
        assert_eq!(parsed.country.as_deref(), Some("CANADA"));
    }

    #[test]
    fn test_street_standardization_is_word_bounded() {
        let streets = StreetAbbreviations::usps();
        assert_eq!(streets.standardize("123 Main Street"), "123 MAIN ST");
        assert_eq!(streets.standardize("123 Streeter Ave."), "123 STREETER AVE");
        assert_eq!(streets.standardize("500 W Boulevard"), "500 W BLVD");
    }

    #[test]
    fn test_split_zip_zero_fills() {
        assert_eq!(
            split_zip("123"),
            ZipSplit {
                zip_code: "00123".to_string(),
                zip_code_4: String::new(),
            }
        );
        assert_eq!(
            split_zip("123456789"),
            ZipSplit {
                zip_code: "12345".to_string(),
                zip_code_4: "6789".to_string(),
            }
        );
        assert_eq!(split_zip("0").zip_code, "");
        assert_eq!(split_zip("78701-12").zip_code_4, "0012");
    }

    #[test]
    fn test_parse_phone_formats() {
        for raw in ["(512) 555-0170", "512-555-0170", "5125550170"] {
            let (phone, _) = parse_phone(raw);
            assert_eq!(phone, "5125550170", "failed on {}", raw);
        }
        let (phone, rest) = parse_phone("no phone here");
        assert_eq!(phone, "");
        assert_eq!(rest, "no phone here");
    }

    #[test]
    fn test_split_name_basic_forms() {
        let options = NameOptions::default();
        assert_eq!(split_name("", &options), ParsedName::default());
        assert_eq!(split_name("Cher", &options).first, "CHER");

        let two = split_name("John Smith", &options);
        assert_eq!((two.first.as_str(), two.last.as_str()), ("JOHN", "SMITH"));

        let four = split_name("John Allen Smith Jones", &options);
        assert_eq!(four.last, "SMITH JONES");
    }

    #[test]
    fn test_split_name_comma_reorder_and_roman_suffix() {
        let options = NameOptions {
            reorder_if_comma: true,
            merge_roman_suffixes: true,
        };
        let name = split_name("SMITH, JOHN ALLEN", &options);
        assert_eq!(name.first, "JOHN");
        assert_eq!(name.middle, "ALLEN");
        assert_eq!(name.last, "SMITH");

        let suffixed = split_name("Mike Jenson III", &NameOptions::default());
        assert_eq!(suffixed.first, "MIKE");
        assert_eq!(suffixed.last, "JENSON III");
    }

    #[test]
    fn test_custom_country_entry() {
        let countries = CountryTable::builtin().with_entry("Atlantis", "ATL");
        let (name, matched) = countries.find("123 Ocean Floor 00001 ATL");
        assert_eq!(name, "ATLANTIS");
        assert_eq!(matched, "ATL");
    }
}
