// Hotel rate sheet: one row per hotel, prices per room type and meal

use std::collections::BTreeMap;

use lahimena_config::Settings;
use lahimena_io::{CellValue, FieldMap};
use serde::Serialize;

use crate::entity::{extra_fields, number, number_cell, same_text, text, text_cell, with_extra, Entity};
use crate::schema::{hotel as f, FieldSpec};
use crate::store::SheetStore;

/// Currency unit written when none is given
pub const DEFAULT_UNIT: &str = "$";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hotel {
    pub row_number: usize,
    /// City
    pub lieu: String,
    pub nom: String,
    pub categorie: String,
    pub unite: String,
    pub chambre_single: f64,
    pub chambre_double: f64,
    pub chambre_twin: f64,
    pub chambre_familiale: f64,
    pub lit_supp: f64,
    pub suite: f64,
    pub petit_dejeuner: f64,
    pub dejeuner: f64,
    pub diner: f64,
    pub type_hebergement: String,
    pub day_use: f64,
    pub vignette: f64,
    pub taxe_sejour: f64,
    pub description: String,
    pub contact: String,
    pub email: String,
    pub extra: BTreeMap<String, CellValue>,
}

impl Hotel {
    /// Stable identifier: "<city>_<name>"
    pub fn id(&self) -> String {
        format!("{}_{}", self.lieu, self.nom)
    }

    /// Twin price, falling back to the double price when unset
    pub fn twin_price(&self) -> f64 {
        if self.chambre_twin == 0.0 {
            self.chambre_double
        } else {
            self.chambre_twin
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotelFilter {
    pub city: Option<String>,
    pub category: Option<String>,
}

impl Entity for Hotel {
    type Filter = HotelFilter;

    const KIND: &'static str = "hotels";

    fn fields() -> &'static [FieldSpec] {
        f::FIELDS
    }

    fn key_field() -> &'static FieldSpec {
        &f::NOM
    }

    fn from_fields(fields: &FieldMap) -> Self {
        let price = |spec: &FieldSpec| number(fields, spec).as_f64();
        Self {
            row_number: 0,
            lieu: text(fields, &f::LIEU),
            nom: text(fields, &f::NOM),
            categorie: text(fields, &f::CATEGORIE),
            unite: text(fields, &f::UNITE),
            chambre_single: price(&f::SINGLE),
            chambre_double: price(&f::DOUBLE),
            chambre_twin: price(&f::TWIN),
            chambre_familiale: price(&f::FAMILIALE),
            lit_supp: price(&f::LIT_SUPP),
            suite: price(&f::SUITE),
            petit_dejeuner: price(&f::PETIT_DEJEUNER),
            dejeuner: price(&f::DEJEUNER),
            diner: price(&f::DINER),
            type_hebergement: text(fields, &f::TYPE_HEBERGEMENT),
            day_use: price(&f::DAY_USE),
            vignette: price(&f::VIGNETTE),
            taxe_sejour: price(&f::TAXE_SEJOUR),
            description: text(fields, &f::DESCRIPTION),
            contact: text(fields, &f::CONTACT),
            email: text(fields, &f::EMAIL),
            extra: extra_fields(fields, &[f::FIELDS]),
        }
    }

    /// Empty unit becomes [`DEFAULT_UNIT`]; an unset twin price is written
    /// as the double price.
    fn to_fields(&self) -> FieldMap {
        let mut fields = with_extra(&self.extra);
        let mut put = |spec: &FieldSpec, value: CellValue| {
            fields.insert(spec.name.to_string(), value);
        };
        let unite = if self.unite.trim().is_empty() { DEFAULT_UNIT } else { self.unite.as_str() };

        put(&f::LIEU, text_cell(&self.lieu));
        put(&f::NOM, text_cell(&self.nom));
        put(&f::CATEGORIE, text_cell(&self.categorie));
        put(&f::UNITE, text_cell(unite));
        put(&f::SINGLE, number_cell(self.chambre_single));
        put(&f::DOUBLE, number_cell(self.chambre_double));
        put(&f::TWIN, number_cell(self.twin_price()));
        put(&f::FAMILIALE, number_cell(self.chambre_familiale));
        put(&f::LIT_SUPP, number_cell(self.lit_supp));
        put(&f::SUITE, number_cell(self.suite));
        put(&f::PETIT_DEJEUNER, number_cell(self.petit_dejeuner));
        put(&f::DEJEUNER, number_cell(self.dejeuner));
        put(&f::DINER, number_cell(self.diner));
        put(&f::TYPE_HEBERGEMENT, text_cell(&self.type_hebergement));
        put(&f::DAY_USE, number_cell(self.day_use));
        put(&f::VIGNETTE, number_cell(self.vignette));
        put(&f::TAXE_SEJOUR, number_cell(self.taxe_sejour));
        put(&f::DESCRIPTION, text_cell(&self.description));
        put(&f::CONTACT, text_cell(&self.contact));
        put(&f::EMAIL, text_cell(&self.email));
        fields
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn set_row_number(&mut self, row: usize) {
        self.row_number = row;
    }

    fn matches(&self, filter: &HotelFilter) -> bool {
        let city = filter.city.as_deref().map_or(true, |c| same_text(&self.lieu, c));
        let category = filter
            .category
            .as_deref()
            .map_or(true, |c| same_text(&self.categorie, c));
        city && category
    }
}

impl SheetStore<Hotel> {
    pub fn hotels(settings: &Settings) -> Self {
        SheetStore::new(settings.hotel_workbook_path(), &settings.hotel_sheet)
            .with_ttl(settings.hotel_ttl())
            .with_max_column_width(settings.max_column_width)
    }

    /// Distinct cities in first-seen order
    pub fn cities(&self) -> Result<Vec<String>, crate::StoreError> {
        let mut cities: Vec<String> = Vec::new();
        for hotel in self.load_all(None)? {
            if !hotel.lieu.is_empty() && !cities.iter().any(|c| same_text(c, &hotel.lieu)) {
                cities.push(hotel.lieu);
            }
        }
        Ok(cities)
    }
}
