// Multi-key field lookup over loosely keyed records

use std::collections::HashMap;

use crate::table::CellValue;

/// A record as field name -> value
pub type FieldMap = HashMap<String, CellValue>;

/// Value of the first key in `candidates` that is present in `record` with a
/// non-empty value, or `default`.
pub fn first_available(record: &FieldMap, candidates: &[&str], default: CellValue) -> CellValue {
    candidates
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or(default)
}

/// [`first_available`] rendered as text, empty string when unresolved
pub fn first_text(record: &FieldMap, candidates: &[&str]) -> String {
    first_available(record, candidates, CellValue::Empty).as_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, CellValue)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_later_candidate_used_when_first_absent() {
        let r = record(&[("ref_client", "X".into())]);
        assert_eq!(
            first_available(&r, &["Ref_Client", "ref_client"], CellValue::Empty),
            CellValue::Text("X".into())
        );
    }

    #[test]
    fn test_order_is_precedence() {
        let r = record(&[("ref_client", "new".into()), ("Réf. Client", "legacy".into())]);
        assert_eq!(first_text(&r, &["Réf. Client", "ref_client"]), "legacy");
        assert_eq!(first_text(&r, &["ref_client", "Réf. Client"]), "new");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let r = record(&[("Nom", "".into()), ("nom", CellValue::Empty), ("NOM", "Rakoto".into())]);
        assert_eq!(first_text(&r, &["Nom", "nom", "NOM"]), "Rakoto");
    }

    #[test]
    fn test_default_when_unresolved() {
        let r = record(&[]);
        assert_eq!(first_text(&r, &["a", "b"]), "");
        assert_eq!(first_available(&r, &["a"], CellValue::Int(0)), CellValue::Int(0));
    }

    #[test]
    fn test_zero_is_a_value() {
        let r = record(&[("SPL", CellValue::Int(0)), ("Chambre_Single", CellValue::Int(5))]);
        assert_eq!(first_available(&r, &["SPL", "Chambre_Single"], CellValue::Empty), CellValue::Int(0));
    }
}
