//! Persistent header state derived from the active section

use serde::Serialize;

use crate::sections::SectionId;

/// Header appearance over the section beneath it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderVariant {
    /// Floating over the hero image
    Transparent,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderState {
    pub section: SectionId,
    pub label: &'static str,
    pub variant: HeaderVariant,
}

impl HeaderState {
    pub fn for_section(section: SectionId) -> Self {
        let variant = match section {
            SectionId::Hero => HeaderVariant::Transparent,
            SectionId::Spark | SectionId::Footer => HeaderVariant::Dark,
            SectionId::Main | SectionId::Building => HeaderVariant::Light,
        };
        Self {
            section,
            label: section.label(),
            variant,
        }
    }
}

impl Default for HeaderState {
    fn default() -> Self {
        Self::for_section(SectionId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_is_hero() {
        let header = HeaderState::default();
        assert_eq!(header.section, SectionId::Hero);
        assert_eq!(header.variant, HeaderVariant::Transparent);
    }

    #[test]
    fn test_variant_follows_section() {
        assert_eq!(HeaderState::for_section(SectionId::Spark).variant, HeaderVariant::Dark);
        assert_eq!(HeaderState::for_section(SectionId::Main).variant, HeaderVariant::Light);
    }
}
