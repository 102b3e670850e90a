//! District name canonicalization.
//!
//! Source layers for Peru spell the same district inconsistently
//! ("Junín" / "JUNIN" / "junin"), so name-based joins and scope filters go
//! through one canonical form: NFD-decompose, drop combining marks,
//! upper-case. UBIGEO codes carry no such ambiguity and are preferred for
//! joins wherever present.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a name: strip diacritics and upper-case.
///
/// Total (never fails) and idempotent. Non-alphabetic input passes through
/// unchanged aside from case folding.
pub fn normalize(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_uppercases() {
        assert_eq!(normalize("Junín"), "JUNIN");
        assert_eq!(normalize("Cañete"), "CANETE");
        assert_eq!(normalize("huánuco"), "HUANUCO");
        assert_eq!(normalize("MADRE DE DIOS"), "MADRE DE DIOS");
    }

    #[test]
    fn idempotent() {
        for s in ["Áncash", "san martín", "LIMA", "Ucayali", "río+*3"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn non_alphabetic_passes_through() {
        assert_eq!(normalize("150102"), "150102");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("a-b c.d"), "A-B C.D");
    }
}
