// Hotel quotations issued to clients

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use lahimena_config::Settings;
use lahimena_io::{CellValue, FieldMap};
use serde::Serialize;

use crate::entity::{count_cell, extra_fields, number, number_cell, same_text, text, text_cell, with_extra, Entity};
use crate::schema::{quotation as f, FieldSpec};
use crate::store::SheetStore;

pub const NUMBER_PREFIX: &str = "DEVIS_HOTEL_";
pub const DEFAULT_CURRENCY: &str = "Ariary";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Quotation {
    pub row_number: usize,
    pub numero: String,
    pub date: String,
    pub client_ref: String,
    pub client_name: String,
    pub hotel_name: String,
    pub city: String,
    pub nights: i64,
    pub adults: i64,
    pub children: i64,
    pub room_type: String,
    pub meal_plan: String,
    pub total_price: f64,
    pub currency: String,
    pub extra: BTreeMap<String, CellValue>,
}

impl Quotation {
    /// Quote number for a quotation issued at `now`
    pub fn number_at(now: NaiveDateTime) -> String {
        format!("{}{}", NUMBER_PREFIX, now.format("%Y%m%d_%H%M%S"))
    }

    pub fn next_number() -> String {
        Self::number_at(chrono::Local::now().naive_local())
    }

    pub fn currency_or_default(&self) -> &str {
        if self.currency.is_empty() {
            DEFAULT_CURRENCY
        } else {
            &self.currency
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotationFilter {
    pub client_ref: Option<String>,
    pub city: Option<String>,
}

impl Entity for Quotation {
    type Filter = QuotationFilter;

    const KIND: &'static str = "quotations";

    fn fields() -> &'static [FieldSpec] {
        f::FIELDS
    }

    fn key_field() -> &'static FieldSpec {
        &f::NUMERO
    }

    fn from_fields(fields: &FieldMap) -> Self {
        Self {
            row_number: 0,
            numero: text(fields, &f::NUMERO),
            date: text(fields, &f::DATE),
            client_ref: text(fields, &f::CLIENT_REF),
            client_name: text(fields, &f::CLIENT_NAME),
            hotel_name: text(fields, &f::HOTEL_NAME),
            city: text(fields, &f::CITY),
            nights: number(fields, &f::NIGHTS).as_i64(),
            adults: number(fields, &f::ADULTS).as_i64(),
            children: number(fields, &f::CHILDREN).as_i64(),
            room_type: text(fields, &f::ROOM_TYPE),
            meal_plan: text(fields, &f::MEAL_PLAN),
            total_price: number(fields, &f::TOTAL_PRICE).as_f64(),
            currency: text(fields, &f::CURRENCY),
            extra: extra_fields(fields, &[f::FIELDS]),
        }
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = with_extra(&self.extra);
        let mut put = |spec: &FieldSpec, value: CellValue| {
            fields.insert(spec.name.to_string(), value);
        };
        put(&f::NUMERO, text_cell(&self.numero));
        put(&f::DATE, text_cell(&self.date));
        put(&f::CLIENT_REF, text_cell(&self.client_ref));
        put(&f::CLIENT_NAME, text_cell(&self.client_name));
        put(&f::HOTEL_NAME, text_cell(&self.hotel_name));
        put(&f::CITY, text_cell(&self.city));
        put(&f::NIGHTS, count_cell(self.nights));
        put(&f::ADULTS, count_cell(self.adults));
        put(&f::CHILDREN, count_cell(self.children));
        put(&f::ROOM_TYPE, text_cell(&self.room_type));
        put(&f::MEAL_PLAN, text_cell(&self.meal_plan));
        put(&f::TOTAL_PRICE, number_cell(self.total_price));
        put(&f::CURRENCY, text_cell(self.currency_or_default()));
        fields
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn set_row_number(&mut self, row: usize) {
        self.row_number = row;
    }

    fn matches(&self, filter: &QuotationFilter) -> bool {
        let client = filter
            .client_ref
            .as_deref()
            .map_or(true, |r| same_text(&self.client_ref, r));
        let city = filter.city.as_deref().map_or(true, |c| same_text(&self.city, c));
        client && city
    }
}

impl SheetStore<Quotation> {
    /// Quotation sheet of the client workbook
    pub fn quotations(settings: &Settings) -> Self {
        SheetStore::new(settings.client_workbook_path(), &settings.quotation_sheet)
            .with_ttl(settings.quotation_ttl())
            .with_max_column_width(settings.max_column_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_number_format() {
        let at = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap().and_hms_opt(9, 5, 3).unwrap();
        assert_eq!(Quotation::number_at(at), "DEVIS_HOTEL_20240701_090503");
        assert!(Quotation::next_number().starts_with(NUMBER_PREFIX));
    }

    #[test]
    fn test_from_summary_keys() {
        let fields: FieldMap = [
            ("client_id", CellValue::from("C1")),
            ("hotel_name", CellValue::from("Colbert")),
            ("nights", CellValue::from("3")),
            ("total_price", CellValue::Float(450.5)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let q = Quotation::from_fields(&fields);
        assert_eq!(q.client_ref, "C1");
        assert_eq!(q.nights, 3);
        assert_eq!(q.total_price, 450.5);
        assert_eq!(q.currency_or_default(), "Ariary");
        assert_eq!(q.to_fields()["currency"], CellValue::from("Ariary"));
    }

    #[test]
    fn test_filter_by_client() {
        let q = Quotation { client_ref: "C1".to_string(), city: "Tuléar".to_string(), ..Quotation::default() };
        assert!(q.matches(&QuotationFilter { client_ref: Some("C1".to_string()), city: None }));
        assert!(!q.matches(&QuotationFilter { client_ref: Some("C2".to_string()), city: None }));
        assert!(q.matches(&QuotationFilter { client_ref: None, city: Some("tuléar".to_string()) }));
    }
}
