//! US jurisdictions a case can be filed in
//!
//! Cases, lawyer licenses and templates are all keyed by two-letter postal
//! code. DC is included because attorneys are admitted there separately.

use serde::{Deserialize, Serialize};

use crate::types::ParseEnumError;

/// US state (or DC) by postal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UsState {
    AL,
    AK,
    AZ,
    AR,
    CA,
    CO,
    CT,
    DE,
    DC,
    FL,
    GA,
    HI,
    ID,
    IL,
    IN,
    IA,
    KS,
    KY,
    LA,
    ME,
    MD,
    MA,
    MI,
    MN,
    MS,
    MO,
    MT,
    NE,
    NV,
    NH,
    NJ,
    NM,
    NY,
    NC,
    ND,
    OH,
    OK,
    OR,
    PA,
    RI,
    SC,
    SD,
    TN,
    TX,
    UT,
    VT,
    VA,
    WA,
    WV,
    WI,
    WY,
}

impl UsState {
    /// Every jurisdiction, alphabetical by code
    pub const ALL: [UsState; 51] = [
        UsState::AL,
        UsState::AK,
        UsState::AZ,
        UsState::AR,
        UsState::CA,
        UsState::CO,
        UsState::CT,
        UsState::DE,
        UsState::DC,
        UsState::FL,
        UsState::GA,
        UsState::HI,
        UsState::ID,
        UsState::IL,
        UsState::IN,
        UsState::IA,
        UsState::KS,
        UsState::KY,
        UsState::LA,
        UsState::ME,
        UsState::MD,
        UsState::MA,
        UsState::MI,
        UsState::MN,
        UsState::MS,
        UsState::MO,
        UsState::MT,
        UsState::NE,
        UsState::NV,
        UsState::NH,
        UsState::NJ,
        UsState::NM,
        UsState::NY,
        UsState::NC,
        UsState::ND,
        UsState::OH,
        UsState::OK,
        UsState::OR,
        UsState::PA,
        UsState::RI,
        UsState::SC,
        UsState::SD,
        UsState::TN,
        UsState::TX,
        UsState::UT,
        UsState::VT,
        UsState::VA,
        UsState::WA,
        UsState::WV,
        UsState::WI,
        UsState::WY,
    ];

    /// Two-letter postal code
    pub fn code(&self) -> &'static str {
        match self {
            UsState::AL => "AL",
            UsState::AK => "AK",
            UsState::AZ => "AZ",
            UsState::AR => "AR",
            UsState::CA => "CA",
            UsState::CO => "CO",
            UsState::CT => "CT",
            UsState::DE => "DE",
            UsState::DC => "DC",
            UsState::FL => "FL",
            UsState::GA => "GA",
            UsState::HI => "HI",
            UsState::ID => "ID",
            UsState::IL => "IL",
            UsState::IN => "IN",
            UsState::IA => "IA",
            UsState::KS => "KS",
            UsState::KY => "KY",
            UsState::LA => "LA",
            UsState::ME => "ME",
            UsState::MD => "MD",
            UsState::MA => "MA",
            UsState::MI => "MI",
            UsState::MN => "MN",
            UsState::MS => "MS",
            UsState::MO => "MO",
            UsState::MT => "MT",
            UsState::NE => "NE",
            UsState::NV => "NV",
            UsState::NH => "NH",
            UsState::NJ => "NJ",
            UsState::NM => "NM",
            UsState::NY => "NY",
            UsState::NC => "NC",
            UsState::ND => "ND",
            UsState::OH => "OH",
            UsState::OK => "OK",
            UsState::OR => "OR",
            UsState::PA => "PA",
            UsState::RI => "RI",
            UsState::SC => "SC",
            UsState::SD => "SD",
            UsState::TN => "TN",
            UsState::TX => "TX",
            UsState::UT => "UT",
            UsState::VT => "VT",
            UsState::VA => "VA",
            UsState::WA => "WA",
            UsState::WV => "WV",
            UsState::WI => "WI",
            UsState::WY => "WY",
        }
    }

    /// Full name for display
    pub fn name(&self) -> &'static str {
        match self {
            UsState::AL => "Alabama",
            UsState::AK => "Alaska",
            UsState::AZ => "Arizona",
            UsState::AR => "Arkansas",
            UsState::CA => "California",
            UsState::CO => "Colorado",
            UsState::CT => "Connecticut",
            UsState::DE => "Delaware",
            UsState::DC => "District of Columbia",
            UsState::FL => "Florida",
            UsState::GA => "Georgia",
            UsState::HI => "Hawaii",
            UsState::ID => "Idaho",
            UsState::IL => "Illinois",
            UsState::IN => "Indiana",
            UsState::IA => "Iowa",
            UsState::KS => "Kansas",
            UsState::KY => "Kentucky",
            UsState::LA => "Louisiana",
            UsState::ME => "Maine",
            UsState::MD => "Maryland",
            UsState::MA => "Massachusetts",
            UsState::MI => "Michigan",
            UsState::MN => "Minnesota",
            UsState::MS => "Mississippi",
            UsState::MO => "Missouri",
            UsState::MT => "Montana",
            UsState::NE => "Nebraska",
            UsState::NV => "Nevada",
            UsState::NH => "New Hampshire",
            UsState::NJ => "New Jersey",
            UsState::NM => "New Mexico",
            UsState::NY => "New York",
            UsState::NC => "North Carolina",
            UsState::ND => "North Dakota",
            UsState::OH => "Ohio",
            UsState::OK => "Oklahoma",
            UsState::OR => "Oregon",
            UsState::PA => "Pennsylvania",
            UsState::RI => "Rhode Island",
            UsState::SC => "South Carolina",
            UsState::SD => "South Dakota",
            UsState::TN => "Tennessee",
            UsState::TX => "Texas",
            UsState::UT => "Utah",
            UsState::VT => "Vermont",
            UsState::VA => "Virginia",
            UsState::WA => "Washington",
            UsState::WV => "West Virginia",
            UsState::WI => "Wisconsin",
            UsState::WY => "Wyoming",
        }
    }

    /// Parse a postal code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for UsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for UsState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| ParseEnumError {
            kind: "state",
            value: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = UsState::ALL.iter().map(|s| s.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 51);
    }

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(UsState::from_code("fl"), Some(UsState::FL));
        assert_eq!(UsState::from_code(" dc "), Some(UsState::DC));
        assert_eq!(UsState::from_code("XX"), None);
    }

    #[test]
    fn test_serde_uses_postal_code() {
        assert_eq!(serde_json::to_string(&UsState::NY).unwrap(), "\"NY\"");
        let parsed: UsState = serde_json::from_str("\"TX\"").unwrap();
        assert_eq!(parsed, UsState::TX);
        assert_eq!(UsState::TX.name(), "Texas");
    }

    proptest! {
        #[test]
        fn prop_code_roundtrip(idx in 0usize..51) {
            let state = UsState::ALL[idx];
            prop_assert_eq!(state.code().parse::<UsState>().unwrap(), state);
        }
    }
}
