// Client requests: one row per request in the primary sheet, travel details
// and rooming counts in the extended sheet

use std::collections::BTreeMap;

use lahimena_config::Settings;
use lahimena_io::{CellValue, FieldMap};
use serde::Serialize;

use crate::entity::{count_cell, extra_fields, number, same_text, text, text_cell, with_extra, Entity};
use crate::schema::{client as f, Extension, FieldSpec};
use crate::store::SheetStore;

pub const TYPE_INDIVIDUEL: &str = "Individuel";
pub const TYPE_GROUPE: &str = "Groupe";

/// Rooms requested per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rooming {
    pub sgl: i64,
    pub dbl: i64,
    pub twn: i64,
    pub tpl: i64,
    pub fml: i64,
}

impl Rooming {
    pub fn total_rooms(&self) -> i64 {
        self.sgl + self.dbl + self.twn + self.tpl + self.fml
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Client {
    pub row_number: usize,
    pub date: String,
    pub ref_client: String,
    pub type_client: String,
    pub prenom: String,
    pub nom: String,
    pub telephone: String,
    pub email: String,
    pub periode: String,
    pub restauration: String,
    pub hebergement: String,
    pub chambre: String,
    pub enfant: String,
    pub age_enfant: String,
    pub forfait: String,
    pub circuit: String,

    pub date_arrivee: String,
    pub date_depart: String,
    pub duree_sejour: String,
    pub nombre_participants: i64,
    pub nombre_adultes: i64,
    pub nombre_enfants_2_12: i64,
    pub nombre_bebes_0_2: i64,
    pub telephone_whatsapp: String,
    pub rooming: Rooming,

    /// Columns outside the schema, by header
    pub extra: BTreeMap<String, CellValue>,
}

impl Client {
    /// "Prénom Nom", or whichever part is present
    pub fn display_name(&self) -> String {
        match (self.prenom.is_empty(), self.nom.is_empty()) {
            (false, false) => format!("{} {}", self.prenom, self.nom),
            (true, _) => self.nom.clone(),
            (false, true) => self.prenom.clone(),
        }
    }

    pub fn is_group(&self) -> bool {
        same_text(&self.type_client, TYPE_GROUPE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub type_client: Option<String>,
}

impl Entity for Client {
    type Filter = ClientFilter;

    const KIND: &'static str = "clients";

    fn fields() -> &'static [FieldSpec] {
        f::FIELDS
    }

    fn key_field() -> &'static FieldSpec {
        &f::REF_CLIENT
    }

    fn extension() -> Option<&'static Extension> {
        Some(&f::EXTENSION)
    }

    fn from_fields(fields: &FieldMap) -> Self {
        let count = |spec: &FieldSpec| number(fields, spec).as_i64();
        Self {
            row_number: 0,
            date: text(fields, &f::DATE),
            ref_client: text(fields, &f::REF_CLIENT),
            type_client: text(fields, &f::TYPE_CLIENT),
            prenom: text(fields, &f::PRENOM),
            nom: text(fields, &f::NOM),
            telephone: text(fields, &f::TELEPHONE),
            email: text(fields, &f::EMAIL),
            periode: text(fields, &f::PERIODE),
            restauration: text(fields, &f::RESTAURATION),
            hebergement: text(fields, &f::HEBERGEMENT),
            chambre: text(fields, &f::CHAMBRE),
            enfant: text(fields, &f::ENFANT),
            age_enfant: text(fields, &f::AGE_ENFANT),
            forfait: text(fields, &f::FORFAIT),
            circuit: text(fields, &f::CIRCUIT),
            date_arrivee: text(fields, &f::DATE_ARRIVEE),
            date_depart: text(fields, &f::DATE_DEPART),
            duree_sejour: text(fields, &f::DUREE_SEJOUR),
            nombre_participants: count(&f::NOMBRE_PARTICIPANTS),
            nombre_adultes: count(&f::NOMBRE_ADULTES),
            nombre_enfants_2_12: count(&f::NOMBRE_ENFANTS),
            nombre_bebes_0_2: count(&f::NOMBRE_BEBES),
            telephone_whatsapp: text(fields, &f::WHATSAPP),
            rooming: Rooming {
                sgl: count(&f::SGL),
                dbl: count(&f::DBL),
                twn: count(&f::TWN),
                tpl: count(&f::TPL),
                fml: count(&f::FML),
            },
            extra: extra_fields(fields, &[f::FIELDS, f::EXTENSION.fields]),
        }
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = with_extra(&self.extra);
        let mut put = |spec: &FieldSpec, value: CellValue| {
            fields.insert(spec.name.to_string(), value);
        };
        put(&f::DATE, text_cell(&self.date));
        put(&f::REF_CLIENT, text_cell(&self.ref_client));
        put(&f::TYPE_CLIENT, text_cell(&self.type_client));
        put(&f::PRENOM, text_cell(&self.prenom));
        put(&f::NOM, text_cell(&self.nom));
        put(&f::TELEPHONE, text_cell(&self.telephone));
        put(&f::EMAIL, text_cell(&self.email));
        put(&f::PERIODE, text_cell(&self.periode));
        put(&f::RESTAURATION, text_cell(&self.restauration));
        put(&f::HEBERGEMENT, text_cell(&self.hebergement));
        put(&f::CHAMBRE, text_cell(&self.chambre));
        put(&f::ENFANT, text_cell(&self.enfant));
        put(&f::AGE_ENFANT, text_cell(&self.age_enfant));
        put(&f::FORFAIT, text_cell(&self.forfait));
        put(&f::CIRCUIT, text_cell(&self.circuit));
        put(&f::DATE_ARRIVEE, text_cell(&self.date_arrivee));
        put(&f::DATE_DEPART, text_cell(&self.date_depart));
        put(&f::DUREE_SEJOUR, text_cell(&self.duree_sejour));
        put(&f::NOMBRE_PARTICIPANTS, count_cell(self.nombre_participants));
        put(&f::NOMBRE_ADULTES, count_cell(self.nombre_adultes));
        put(&f::NOMBRE_ENFANTS, count_cell(self.nombre_enfants_2_12));
        put(&f::NOMBRE_BEBES, count_cell(self.nombre_bebes_0_2));
        put(&f::WHATSAPP, text_cell(&self.telephone_whatsapp));
        put(&f::SGL, count_cell(self.rooming.sgl));
        put(&f::DBL, count_cell(self.rooming.dbl));
        put(&f::TWN, count_cell(self.rooming.twn));
        put(&f::TPL, count_cell(self.rooming.tpl));
        put(&f::FML, count_cell(self.rooming.fml));
        fields
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn set_row_number(&mut self, row: usize) {
        self.row_number = row;
    }

    fn matches(&self, filter: &ClientFilter) -> bool {
        filter
            .type_client
            .as_deref()
            .map_or(true, |t| same_text(&self.type_client, t))
    }
}

impl SheetStore<Client> {
    /// Primary and extended client sheets of the client workbook
    pub fn clients(settings: &Settings) -> Self {
        SheetStore::new(settings.client_workbook_path(), &settings.client_sheet)
            .with_extension_sheet(&settings.client_extended_sheet)
            .with_ttl(settings.client_ttl())
            .with_max_column_width(settings.max_column_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), CellValue::from(*v))).collect()
    }

    #[test]
    fn test_from_form_aliases() {
        let a = Client::from_fields(&form(&[("Ref_Client", "C1"), ("Nom", "Dupont")]));
        let b = Client::from_fields(&form(&[("ref_client", "C1"), ("nom", "Dupont")]));
        assert_eq!(a, b);
        assert_eq!(a.ref_client, "C1");
        assert!(a.extra.is_empty());
    }

    #[test]
    fn test_counts_parse_loosely() {
        let c = Client::from_fields(&form(&[
            ("Nombre_Adultes", "2 adultes"),
            ("DBL", "1"),
            ("twn_count", "abc"),
        ]));
        assert_eq!(c.nombre_adultes, 2);
        assert_eq!(c.rooming.dbl, 1);
        assert_eq!(c.rooming.twn, 0);
        assert_eq!(c.rooming.total_rooms(), 1);
    }

    #[test]
    fn test_to_fields_round_trip() {
        let mut c = Client {
            ref_client: "C7".to_string(),
            prenom: "Jean".to_string(),
            nom: "Rakoto".to_string(),
            type_client: TYPE_GROUPE.to_string(),
            nombre_participants: 12,
            ..Client::default()
        };
        c.extra.insert("Agence".to_string(), CellValue::from("Mada Tours"));

        let back = Client::from_fields(&c.to_fields());
        assert_eq!(back, c);
        assert_eq!(back.display_name(), "Jean Rakoto");
        assert!(back.is_group());
        assert_eq!(c.key(), "C7");
    }

    #[test]
    fn test_filter_by_type() {
        let c = Client { type_client: "Individuel".to_string(), ..Client::default() };
        assert!(c.matches(&ClientFilter::default()));
        assert!(c.matches(&ClientFilter { type_client: Some("individuel".to_string()) }));
        assert!(!c.matches(&ClientFilter { type_client: Some(TYPE_GROUPE.to_string()) }));
    }
}
