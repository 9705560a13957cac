use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of packaging categories accepted on a standalone packaging record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PackagingType {
    #[sea_orm(string_value = "base")]
    Base,
    #[sea_orm(string_value = "pack")]
    Pack,
    #[sea_orm(string_value = "bulk")]
    Bulk,
    #[sea_orm(string_value = "retail")]
    Retail,
    #[sea_orm(string_value = "wholesale")]
    Wholesale,
    #[sea_orm(string_value = "custom")]
    Custom,
}

pub const PACKAGING_TYPE_ERROR: &str =
    "packagingType must be one of: base, pack, bulk, retail, wholesale, custom";

impl PackagingType {
    /// Trims and parses user input, failing with the field's message.
    pub fn parse(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| PACKAGING_TYPE_ERROR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("base", PackagingType::Base)]
    #[test_case("Pack", PackagingType::Pack)]
    #[test_case(" BULK ", PackagingType::Bulk)]
    #[test_case("wholesale", PackagingType::Wholesale)]
    fn parses_known_types(raw: &str, expected: PackagingType) {
        assert_eq!(PackagingType::parse(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_free_text() {
        let err = PackagingType::parse("crate").unwrap_err();
        assert_eq!(err, PACKAGING_TYPE_ERROR);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&PackagingType::Retail).unwrap();
        assert_eq!(json, "\"retail\"");
        assert_eq!(PackagingType::Wholesale.to_string(), "wholesale");
    }
}
