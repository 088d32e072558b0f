// Quotation summaries grouped by client, city or hotel

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::StoreError;
use crate::quotation::{Quotation, QuotationFilter};
use crate::store::SheetStore;

/// Group key used for quotations with nothing to group on
pub const UNKNOWN_GROUP: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Client,
    City,
    Hotel,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" | "clients" => Ok(Self::Client),
            "city" | "ville" => Ok(Self::City),
            "hotel" | "hotels" => Ok(Self::Hotel),
            other => Err(format!("unknown grouping '{other}' (expected client, city or hotel)")),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::City => "city",
            Self::Hotel => "hotel",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationGroup {
    pub key: String,
    /// Client name for client groups, the key otherwise
    pub label: String,
    pub quotations: Vec<Quotation>,
    pub total: f64,
    /// Currency of the first quotation in the group
    pub currency: String,
}

fn group_key(q: &Quotation, by: GroupBy) -> &str {
    let key = match by {
        GroupBy::Client if q.client_ref.is_empty() => q.client_name.as_str(),
        GroupBy::Client => q.client_ref.as_str(),
        GroupBy::City => q.city.as_str(),
        GroupBy::Hotel => q.hotel_name.as_str(),
    };
    if key.trim().is_empty() {
        UNKNOWN_GROUP
    } else {
        key.trim()
    }
}

/// Partition quotations by `by`, keeping input order inside each group and
/// summing `total_price`. Mixed currencies are summed as-is.
pub fn group_quotations(quotations: &[Quotation], by: GroupBy) -> BTreeMap<String, QuotationGroup> {
    let mut groups: BTreeMap<String, QuotationGroup> = BTreeMap::new();

    for q in quotations {
        let key = group_key(q, by);
        let group = groups.entry(key.to_string()).or_insert_with(|| QuotationGroup {
            key: key.to_string(),
            label: key.to_string(),
            quotations: Vec::new(),
            total: 0.0,
            currency: q.currency_or_default().to_string(),
        });
        if by == GroupBy::Client && group.label == group.key && !q.client_name.is_empty() {
            group.label = q.client_name.clone();
        }
        group.total += q.total_price;
        group.quotations.push(q.clone());
    }

    groups
}

pub fn grand_total(groups: &BTreeMap<String, QuotationGroup>) -> f64 {
    groups.values().map(|g| g.total).sum()
}

impl SheetStore<Quotation> {
    /// Grouped view over the (cached) quotation list
    pub fn grouped(
        &self,
        by: GroupBy,
        filter: Option<&QuotationFilter>,
    ) -> Result<BTreeMap<String, QuotationGroup>, StoreError> {
        let quotations = self.load_all(filter)?;
        Ok(group_quotations(&quotations, by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(client: &str, name: &str, city: &str, total: f64) -> Quotation {
        Quotation {
            client_ref: client.to_string(),
            client_name: name.to_string(),
            city: city.to_string(),
            hotel_name: "Colbert".to_string(),
            total_price: total,
            ..Quotation::default()
        }
    }

    #[test]
    fn test_group_by_client() {
        let rows = vec![q("A", "", "Tana", 100.0), q("B", "", "Tana", 50.0), q("A", "", "Tana", 25.0)];
        let groups = group_quotations(&rows, GroupBy::Client);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["A"].total, 125.0);
        assert_eq!(groups["A"].quotations.len(), 2);
        assert_eq!(groups["B"].total, 50.0);
        assert_eq!(grand_total(&groups), 175.0);
    }

    #[test]
    fn test_client_label_uses_name() {
        let rows = vec![q("A", "", "Tana", 1.0), q("A", "Dupont", "Tana", 2.0)];
        let groups = group_quotations(&rows, GroupBy::Client);
        assert_eq!(groups["A"].label, "Dupont");
    }

    #[test]
    fn test_group_by_city_keeps_order() {
        let rows = vec![q("A", "", "Tuléar", 10.0), q("B", "", "", 5.0), q("C", "", "Tuléar", 20.0)];
        let groups = group_quotations(&rows, GroupBy::City);

        let tulear: Vec<&str> = groups["Tuléar"].quotations.iter().map(|q| q.client_ref.as_str()).collect();
        assert_eq!(tulear, vec!["A", "C"]);
        assert_eq!(groups[UNKNOWN_GROUP].total, 5.0);
        assert_eq!(groups["Tuléar"].currency, "Ariary");
    }

    #[test]
    fn test_group_by_hotel_and_empty_input() {
        let rows = vec![q("A", "", "Tana", 10.0), q("B", "", "Tana", 20.0)];
        assert_eq!(group_quotations(&rows, GroupBy::Hotel)["Colbert"].total, 30.0);
        assert!(group_quotations(&[], GroupBy::Hotel).is_empty());
    }

    #[test]
    fn test_parse_group_by() {
        assert_eq!("City".parse::<GroupBy>(), Ok(GroupBy::City));
        assert_eq!("clients".parse::<GroupBy>(), Ok(GroupBy::Client));
        assert!("room".parse::<GroupBy>().is_err());
    }
}
