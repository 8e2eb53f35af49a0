use serde::{Deserialize, Serialize};
use std::fmt;

/// Antarctic ice-sheet component a sea-level field belongs to.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceSheet {
    /// East Antarctic Ice Sheet
    Eais,
    /// West Antarctic Ice Sheet
    Wais,
    /// Combined total, always `eais + wais`
    Ais,
}

impl IceSheet {
    pub const ALL: [IceSheet; 3] = [IceSheet::Eais, IceSheet::Wais, IceSheet::Ais];

    /// Uppercase label used in dataset descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            IceSheet::Eais => "EAIS",
            IceSheet::Wais => "WAIS",
            IceSheet::Ais => "AIS",
        }
    }

    /// Fingerprint file stem, `None` for the combined total which has no
    /// fingerprint of its own.
    pub fn fingerprint_stem(&self) -> Option<&'static str> {
        match self {
            IceSheet::Eais => Some("fprint_eais"),
            IceSheet::Wais => Some("fprint_wais"),
            IceSheet::Ais => None,
        }
    }
}

impl fmt::Display for IceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::IceSheet;

    #[test]
    fn test_labels() {
        assert_eq!(IceSheet::Wais.label(), "WAIS");
        assert_eq!(IceSheet::Ais.to_string(), "AIS");
    }

    #[test]
    fn test_total_has_no_fingerprint() {
        assert_eq!(IceSheet::Eais.fingerprint_stem(), Some("fprint_eais"));
        assert_eq!(IceSheet::Wais.fingerprint_stem(), Some("fprint_wais"));
        assert!(IceSheet::Ais.fingerprint_stem().is_none());
    }
}
