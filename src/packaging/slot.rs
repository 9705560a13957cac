use std::fmt;
use std::str::FromStr;

/// Position of a packaging configuration when selecting suppliers for an item.
///
/// `Base` and `Pack` name the two packaging slots embedded on the item itself;
/// `Additional(n)` names the n-th active standalone packaging record of the item,
/// counted in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SupplierSlot {
    Base,
    Pack,
    Additional(usize),
}

const ADDITIONAL_PREFIX: &str = "additional_";

impl SupplierSlot {
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SupplierSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Pack => f.write_str("pack"),
            Self::Additional(index) => write!(f, "{ADDITIONAL_PREFIX}{index}"),
        }
    }
}

impl FromStr for SupplierSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        match key {
            "base" => Ok(Self::Base),
            "pack" => Ok(Self::Pack),
            _ => key
                .strip_prefix(ADDITIONAL_PREFIX)
                .and_then(|index| index.parse::<usize>().ok())
                .map(Self::Additional)
                .ok_or_else(|| {
                    format!(
                        "invalid packaging key '{key}': expected base, pack or additional_<index>"
                    )
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("base", SupplierSlot::Base)]
    #[case("pack", SupplierSlot::Pack)]
    #[case("additional_0", SupplierSlot::Additional(0))]
    #[case("additional_12", SupplierSlot::Additional(12))]
    fn parses_and_prints_slot_keys(#[case] key: &str, #[case] slot: SupplierSlot) {
        assert_eq!(key.parse::<SupplierSlot>().unwrap(), slot);
        assert_eq!(slot.key(), key);
    }

    #[rstest]
    #[case("")]
    #[case("additional_")]
    #[case("additional_x")]
    #[case("bulk")]
    fn rejects_unknown_keys(#[case] key: &str) {
        assert!(key.parse::<SupplierSlot>().is_err());
    }
}
